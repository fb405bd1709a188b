//! Wire types for the daemon's HTTP API.
//!
//! JSON field names are PascalCase throughout, matching the routing
//! table's request/response shapes exactly (`Id`, `Image`,
//! `PortBindings`, ...). Plain JSON bodies over HTTP/1.1, so the types
//! here are per-endpoint structs rather than a single framed enum.

use serde::{Deserialize, Serialize};

/// Body of `POST /containers/create`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateContainerRequest {
    /// Source image reference (`name:tag` or id).
    pub image: String,
    /// Command override. Empty defers to the image's `CMD`/entrypoint.
    #[serde(default)]
    pub cmd: Vec<String>,
    /// Working directory override.
    #[serde(default)]
    pub working_dir: Option<String>,
    /// Additional environment variables (`KEY=VALUE`).
    #[serde(default)]
    pub env: Vec<String>,
    /// Host:container port mapping strings.
    #[serde(default)]
    pub port_bindings: Vec<String>,
    /// Host:container bind mount strings.
    #[serde(default)]
    pub binds: Vec<String>,
    /// Keep stdin open.
    #[serde(default)]
    pub attach_stdin: bool,
    /// Attach to stdout (also implies a TTY is desired when paired with
    /// `attach_stdin`, matching the CLI's combined `-it` flag).
    #[serde(default)]
    pub attach_stdout: bool,
    /// Run detached; `start` returns without waiting for exit.
    #[serde(default)]
    pub detach: bool,
}

/// Response body of `POST /containers/create`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateContainerResponse {
    /// The newly allocated container id.
    pub id: String,
    /// Non-fatal warnings produced during creation.
    #[serde(default)]
    pub warnings: Vec<String>,
}

/// One entry of `GET /containers/json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerSummary {
    /// Container id.
    #[serde(rename = "Id")]
    pub id: String,
    /// Container name(s); always at least one entry (defaults to the id).
    #[serde(rename = "Names")]
    pub names: Vec<String>,
    /// Source image reference.
    #[serde(rename = "Image")]
    pub image: String,
    /// Resolved command, joined for display.
    #[serde(rename = "Command")]
    pub command: String,
    /// RFC3339 creation timestamp.
    #[serde(rename = "Created")]
    pub created: String,
    /// `"running"` or `"exited"` (other lifecycle states map to their
    /// lowercase name).
    #[serde(rename = "Status")]
    pub status: String,
}

/// One entry of `GET /images/json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageSummary {
    /// Image id.
    #[serde(rename = "Id")]
    pub id: String,
    /// `"name:tag"` references pointing at this image.
    #[serde(rename = "RepoTags")]
    pub repo_tags: Vec<String>,
    /// RFC3339 creation timestamp.
    #[serde(rename = "Created")]
    pub created: String,
    /// Total byte size across all layers.
    #[serde(rename = "Size")]
    pub size: u64,
}

/// Response body of `GET /version`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionInfo {
    /// Engine version string.
    #[serde(rename = "Version")]
    pub version: String,
    /// Wire API version string.
    #[serde(rename = "ApiVersion")]
    pub api_version: String,
    /// Host OS string.
    #[serde(rename = "Os")]
    pub os: String,
    /// Host architecture string.
    #[serde(rename = "Arch")]
    pub arch: String,
}

impl Default for VersionInfo {
    fn default() -> Self {
        Self {
            version: "1.0.0".to_owned(),
            api_version: "1.0".to_owned(),
            os: std::env::consts::OS.to_owned(),
            arch: std::env::consts::ARCH.to_owned(),
        }
    }
}

/// Response body of `GET /info`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InfoResponse {
    /// Total number of container records.
    #[serde(rename = "Containers")]
    pub containers: u64,
    /// Total number of image records.
    #[serde(rename = "Images")]
    pub images: u64,
    /// Storage driver name; always `"hold-layer"` (no pluggable CoW
    /// drivers).
    #[serde(rename = "Driver")]
    pub driver: String,
}

/// Response body of `POST /build` and `DELETE /images/{name}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    /// Human-readable result message.
    pub message: String,
}

impl MessageResponse {
    /// Builds a message response from any displayable value.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Body of `POST /containers/{id}/exec`, needed for the CLI's `exec`
/// subcommand to actually reach the engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ExecRequest {
    /// Command and arguments to run inside the container's namespaces.
    pub cmd: Vec<String>,
    /// Additional environment variables, appended to the container's own.
    #[serde(default)]
    pub env: Vec<String>,
}

/// Response body of `POST /containers/{id}/exec`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ExecResponse {
    /// Exit code of the executed command.
    #[serde(rename = "ExitCode")]
    pub exit_code: i32,
}

/// Body of `POST /containers/{id}/commit`. Also not part of the closed
/// routing table; backs the CLI's `commit` subcommand.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CommitRequest {
    /// Repository name for the new image.
    pub repo: String,
    /// Tag for the new image; defaults to `latest`.
    #[serde(default)]
    pub tag: Option<String>,
    /// Optional commit message, recorded as the new layer's instruction.
    #[serde(default)]
    pub message: Option<String>,
}

/// Response body of `POST /containers/{id}/commit`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitResponse {
    /// Id of the newly published image.
    #[serde(rename = "Id")]
    pub id: String,
}

/// Error body returned for every non-2xx response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// The error message.
    pub error: String,
}

impl ApiError {
    /// Builds an error body from any displayable value.
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_container_request_round_trips_through_json() {
        let req = CreateContainerRequest {
            image: "demo:latest".to_owned(),
            cmd: vec!["echo".to_owned(), "hi".to_owned()],
            detach: true,
            ..Default::default()
        };
        let json = serde_json::to_string(&req).unwrap();
        let back: CreateContainerRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(back.image, "demo:latest");
        assert!(back.detach);
    }

    #[test]
    fn container_summary_uses_pascal_case_field_names() {
        let summary = ContainerSummary {
            id: "abc123".to_owned(),
            names: vec!["demo".to_owned()],
            image: "demo:latest".to_owned(),
            command: "echo hi".to_owned(),
            created: "2026-01-01T00:00:00Z".to_owned(),
            status: "running".to_owned(),
        };
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["Id"], "abc123");
        assert_eq!(json["Status"], "running");
    }

    #[test]
    fn exec_request_round_trips_through_json() {
        let json = r#"{"Cmd":["echo","hi"],"Env":["FOO=bar"]}"#;
        let req: ExecRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.cmd, vec!["echo".to_owned(), "hi".to_owned()]);
        assert_eq!(req.env, vec!["FOO=bar".to_owned()]);
    }

    #[test]
    fn commit_request_tolerates_missing_optional_fields() {
        let json = r#"{"Repo":"demo-snapshot"}"#;
        let req: CommitRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.repo, "demo-snapshot");
        assert!(req.tag.is_none());
        assert!(req.message.is_none());
    }

    #[test]
    fn create_container_request_tolerates_unknown_fields() {
        let json = r#"{"Image":"demo","Cmd":["true"],"Bogus":42}"#;
        let req: CreateContainerRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.image, "demo");
    }
}
