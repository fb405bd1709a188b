//! Routes method+path pairs to engine operations, plus the `logs`/`exec`/
//! `commit` endpoints the CLI surface needs beyond basic lifecycle and
//! build routes (see DESIGN.md).

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use hold_engine::{CreateSpec, ResourceLimits};

use crate::error::{Error, Result};
use crate::http::{Request, Response};
use crate::state::AppState;

/// Parses the request, routes it, and maps any error to a response.
/// Never fails: an unrouted path or a propagated engine error both become
/// an HTTP error response rather than a dropped connection.
pub async fn dispatch(state: &AppState, req: Request) -> Response {
    let segments: Vec<&str> = req
        .path
        .trim_start_matches('/')
        .split('/')
        .filter(|s| !s.is_empty())
        .collect();

    let result = route(state, &req.method, &segments, &req.query, req.body).await;

    match result {
        Ok(resp) => resp,
        Err(e) => Response::Json {
            status: e.status(),
            body: e.to_body(),
        },
    }
}

async fn route(
    state: &AppState,
    method: &str,
    segments: &[&str],
    query: &HashMap<String, String>,
    body: Vec<u8>,
) -> Result<Response> {
    match (method, segments) {
        ("POST", ["containers", "create"]) => containers_create(state, body).await,
        ("GET", ["containers", "json"]) => containers_json(state).await,
        ("POST", ["containers", id, "start"]) => containers_start(state, id).await,
        ("POST", ["containers", id, "stop"]) => containers_stop(state, id).await,
        ("DELETE", ["containers", id, "remove"]) => containers_remove(state, id).await,
        ("GET", ["containers", id, "logs"]) => containers_logs(state, id).await,
        ("POST", ["containers", id, "exec"]) => containers_exec(state, id, body).await,
        ("POST", ["containers", id, "commit"]) => containers_commit(state, id, body).await,
        ("POST", ["build"]) => build(state, query).await,
        ("GET", ["images", "json"]) => images_json(state).await,
        ("DELETE", ["images", name]) => images_remove(state, name).await,
        ("GET", ["version"]) => Ok(Response::json(200, &hold_api::VersionInfo::default())),
        ("GET", ["info"]) => info(state).await,
        _ => Err(Error::NotFound(format!(
            "no route for {method} /{}",
            segments.join("/")
        ))),
    }
}

/// Runs a blocking closure on the tokio blocking thread pool, folding a
/// `JoinError` (a task panic) into [`Error::Internal`] and converting the
/// closure's own error via `Into<Error>`.
async fn blocking<F, T, E>(f: F) -> Result<T>
where
    F: FnOnce() -> std::result::Result<T, E> + Send + 'static,
    T: Send + 'static,
    E: Into<Error> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::Internal(format!("background task panicked: {e}")))?
        .map_err(Into::into)
}

async fn containers_create(state: &AppState, body: Vec<u8>) -> Result<Response> {
    let req: hold_api::CreateContainerRequest = serde_json::from_slice(&body)
        .map_err(|e| Error::InvalidArgument(format!("invalid JSON body: {e}")))?;
    if req.image.trim().is_empty() {
        return Err(Error::InvalidArgument("Image is required".to_owned()));
    }

    let spec = CreateSpec {
        image: req.image,
        name: None,
        command: req.cmd,
        working_dir: req.working_dir,
        env: req.env,
        port_bindings: req.port_bindings,
        binds: req.binds,
        tty: req.attach_stdout,
        interactive: req.attach_stdin,
        detach: req.detach,
        resources: ResourceLimits::default(),
    };

    let engine = Arc::clone(&state.engine);
    let record = blocking(move || engine.create(spec)).await?;

    Ok(Response::json(
        201,
        &hold_api::CreateContainerResponse {
            id: record.id,
            warnings: Vec::new(),
        },
    ))
}

async fn containers_json(state: &AppState) -> Result<Response> {
    let engine = Arc::clone(&state.engine);
    let records = blocking(move || engine.registry().list()).await?;

    let summaries: Vec<hold_api::ContainerSummary> = records
        .into_iter()
        .map(|c| hold_api::ContainerSummary {
            id: c.id,
            names: vec![c.name],
            image: c.image,
            command: c.command.join(" "),
            created: c.created,
            status: c.status(),
        })
        .collect();

    Ok(Response::json(200, &summaries))
}

async fn containers_start(state: &AppState, id: &str) -> Result<Response> {
    let engine = Arc::clone(&state.engine);
    let id = id.to_owned();
    blocking(move || engine.start(&id)).await?;
    Ok(Response::empty(204))
}

async fn containers_stop(state: &AppState, id: &str) -> Result<Response> {
    let engine = Arc::clone(&state.engine);
    let id = id.to_owned();
    blocking(move || engine.stop(&id, None)).await?;
    Ok(Response::empty(204))
}

async fn containers_remove(state: &AppState, id: &str) -> Result<Response> {
    let engine = Arc::clone(&state.engine);
    let id = id.to_owned();
    blocking(move || engine.remove(&id)).await?;
    Ok(Response::empty(204))
}

async fn containers_logs(state: &AppState, id: &str) -> Result<Response> {
    let engine = Arc::clone(&state.engine);
    let id = id.to_owned();
    let body = blocking(move || engine.logs(&id)).await?;
    Ok(Response::Raw {
        status: 200,
        content_type: "text/plain; charset=utf-8",
        body,
    })
}

async fn containers_exec(state: &AppState, id: &str, body: Vec<u8>) -> Result<Response> {
    let req: hold_api::ExecRequest = serde_json::from_slice(&body)
        .map_err(|e| Error::InvalidArgument(format!("invalid JSON body: {e}")))?;
    if req.cmd.is_empty() {
        return Err(Error::InvalidArgument("Cmd must not be empty".to_owned()));
    }

    let engine = Arc::clone(&state.engine);
    let id = id.to_owned();
    let exit_code = blocking(move || engine.exec(&id, req.cmd, req.env)).await?;

    Ok(Response::json(200, &hold_api::ExecResponse { exit_code }))
}

async fn containers_commit(state: &AppState, id: &str, body: Vec<u8>) -> Result<Response> {
    let req: hold_api::CommitRequest = serde_json::from_slice(&body)
        .map_err(|e| Error::InvalidArgument(format!("invalid JSON body: {e}")))?;
    if req.repo.trim().is_empty() {
        return Err(Error::InvalidArgument("Repo is required".to_owned()));
    }

    let engine = Arc::clone(&state.engine);
    let id = id.to_owned();
    let image = blocking(move || {
        engine.commit(&id, &req.repo, req.tag.as_deref(), req.message.as_deref())
    })
    .await?;

    Ok(Response::json(200, &hold_api::CommitResponse { id: image.id }))
}

async fn build(state: &AppState, query: &HashMap<String, String>) -> Result<Response> {
    let target = query
        .get("t")
        .ok_or_else(|| Error::InvalidArgument("missing t= query parameter".to_owned()))?;
    let (name, tag) = split_reference(target);
    let name = name.to_owned();
    let tag = tag.map(str::to_owned);

    let context_dir = match query.get("context") {
        Some(c) => PathBuf::from(c),
        None => PathBuf::from("."),
    };
    let dockerfile_path = match query.get("dockerfile") {
        Some(p) => context_dir.join(p),
        None => context_dir.join("Dockerfile"),
    };
    let staging = staging_dir(&state.state_root, &name);

    let engine = Arc::clone(&state.engine);
    let image = blocking(move || -> std::result::Result<hold_store::Image, Error> {
        let text = std::fs::read_to_string(&dockerfile_path).map_err(|e| {
            Error::InvalidArgument(format!(
                "cannot read {}: {e}",
                dockerfile_path.display()
            ))
        })?;
        let recipe = hold_recipe::parse(&text)?;
        std::fs::create_dir_all(&staging)?;
        let executor = hold_build::BuildExecutor::new(engine.layers(), engine.catalog());
        let image = executor.execute(&recipe, &context_dir, &staging, &name, tag.as_deref())?;
        let _ = std::fs::remove_dir_all(&staging);
        Ok(image)
    })
    .await?;

    Ok(Response::json(
        200,
        &hold_api::MessageResponse::new(format!("Successfully built {}", image.reference())),
    ))
}

fn staging_dir(state_root: &std::path::Path, seed: &str) -> PathBuf {
    state_root
        .join("tmp")
        .join(format!("build-{}", hold_store::generate_id(seed)))
}

async fn images_json(state: &AppState) -> Result<Response> {
    let engine = Arc::clone(&state.engine);
    let images = blocking(move || engine.catalog().list()).await?;

    let summaries: Vec<hold_api::ImageSummary> = images
        .into_iter()
        .map(|img| hold_api::ImageSummary {
            id: img.id.clone(),
            repo_tags: vec![img.reference()],
            created: img.created,
            size: img.size,
        })
        .collect();

    Ok(Response::json(200, &summaries))
}

async fn images_remove(state: &AppState, name: &str) -> Result<Response> {
    let engine = Arc::clone(&state.engine);
    let name = name.to_owned();
    let message = format!("Deleted: {name}");
    blocking(move || engine.catalog().remove(&name)).await?;
    Ok(Response::json(200, &hold_api::MessageResponse::new(message)))
}

async fn info(state: &AppState) -> Result<Response> {
    let engine = Arc::clone(&state.engine);
    let (containers, images) = blocking(move || -> std::result::Result<(usize, usize), Error> {
        let containers = engine.registry().list().map_err(Error::from)?.len();
        let images = engine.catalog().list().map_err(Error::from)?.len();
        Ok((containers, images))
    })
    .await?;

    Ok(Response::json(
        200,
        &hold_api::InfoResponse {
            containers: containers as u64,
            images: images as u64,
            driver: "hold-layer".to_owned(),
        },
    ))
}

/// Splits `"name:tag"` into `(name, Some(tag))`, or `(s, None)` if untagged.
/// Mirrors `hold_store::Catalog`'s private helper of the same shape.
fn split_reference(s: &str) -> (&str, Option<&str>) {
    match s.rsplit_once(':') {
        Some((name, tag)) if !name.is_empty() => (name, Some(tag)),
        _ => (s, None),
    }
}
