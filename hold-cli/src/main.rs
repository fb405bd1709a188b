//! CLI for the hold container engine.

#![allow(clippy::print_stdout, clippy::print_stderr)]

mod client;
mod daemon;
mod run;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use client::Client;
use run::RunArgs;

#[derive(Parser)]
#[command(name = "holdctl", version, about = "CLI for the hold container engine")]
struct Cli {
    /// Daemon address, e.g. http://127.0.0.1:2375.
    #[arg(long, env = "HOLD_HOST", default_value = "http://127.0.0.1:2375", global = true)]
    host: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the daemon if it isn't already running, and wait for it to
    /// accept connections.
    Daemon,
    /// Build an image from a recipe and a build context.
    Build {
        /// Image reference to tag the result with.
        #[arg(short = 't', long = "tag")]
        tag: String,
        /// Recipe file, relative to the context directory.
        #[arg(short = 'f', long = "file")]
        file: Option<String>,
        /// Build context directory.
        context: String,
    },
    /// Create and start a container from an image.
    Run(Box<RunArgs>),
    /// List locally stored images.
    Images {
        /// Output format.
        #[arg(long, default_value = "table")]
        format: OutputFormat,
    },
    /// List containers.
    #[command(alias = "containers")]
    Ps {
        /// Output format.
        #[arg(long, default_value = "table")]
        format: OutputFormat,
    },
    /// Stop a running container.
    Stop {
        /// Container id.
        id: String,
    },
    /// Remove a stopped container.
    Rm {
        /// Container id.
        id: String,
    },
    /// Remove an image.
    Rmi {
        /// Image reference.
        name: String,
    },
    /// Print a container's accumulated stdout/stderr.
    Logs {
        /// Container id.
        id: String,
    },
    /// Run a command inside a running container's namespaces.
    Exec {
        /// Container id.
        id: String,
        /// Command and arguments (after --).
        #[arg(last = true, required = true)]
        command: Vec<String>,
    },
    /// Snapshot a container's rootfs as a new image.
    Commit {
        /// Container id.
        id: String,
        /// Repository (and optional `:tag`) for the new image.
        image: String,
        /// Commit message.
        #[arg(short = 'm', long = "message")]
        message: Option<String>,
    },
    /// Generate shell completion scripts.
    Completion {
        /// Target shell.
        shell: Shell,
    },
}

/// Output format for list commands.
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
enum OutputFormat {
    /// Human-readable table.
    #[default]
    Table,
    /// Machine-readable JSON.
    Json,
}

fn main() {
    // Cli::parse() already exits with code 2 on a malformed invocation;
    // anything reaching dispatch() is a daemon or engine failure.
    if let Err(e) = dispatch(Cli::parse()) {
        eprintln!("holdctl: {e:#}");
        std::process::exit(1);
    }
}

fn dispatch(cli: Cli) -> Result<()> {
    if matches!(cli.command, Command::Daemon) {
        return daemon::ensure_running(&cli.host);
    }

    let client = Client::new(cli.host);
    match cli.command {
        Command::Daemon => unreachable!("handled above"),
        Command::Build { tag, file, context } => build(&client, &tag, file.as_deref(), &context),
        Command::Run(args) => args.run(&client),
        Command::Images { format } => images(&client, format),
        Command::Ps { format } => ps(&client, format),
        Command::Stop { id } => stop(&client, &id),
        Command::Rm { id } => rm(&client, &id),
        Command::Rmi { name } => rmi(&client, &name),
        Command::Logs { id } => logs(&client, &id),
        Command::Exec { id, command } => exec(&client, &id, command),
        Command::Commit { id, image, message } => commit(&client, &id, &image, message),
        Command::Completion { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "holdctl", &mut std::io::stdout());
            Ok(())
        }
    }
}

fn build(client: &Client, tag: &str, file: Option<&str>, context: &str) -> Result<()> {
    let mut path = format!(
        "/build?t={}&context={}",
        urlencode(tag),
        urlencode(context)
    );
    if let Some(f) = file {
        path.push_str(&format!("&dockerfile={}", urlencode(f)));
    }
    let resp: hold_api::MessageResponse = client.post(&path)?;
    println!("{}", resp.message);
    Ok(())
}

fn images(client: &Client, format: OutputFormat) -> Result<()> {
    let list: Vec<hold_api::ImageSummary> = client.get("/images/json")?;

    if matches!(format, OutputFormat::Json) {
        println!("{}", serde_json::to_string_pretty(&list)?);
        return Ok(());
    }
    if list.is_empty() {
        println!("No images.");
        return Ok(());
    }
    println!("{:<50} {:<14} {:>10}", "REPOSITORY:TAG", "ID", "SIZE");
    for img in &list {
        let repo = img.repo_tags.first().map(String::as_str).unwrap_or("<none>");
        let short_id = &img.id[..std::cmp::min(12, img.id.len())];
        println!(
            "{:<50} {:<14} {:>10}",
            repo,
            short_id,
            human_size(img.size)
        );
    }
    Ok(())
}

fn ps(client: &Client, format: OutputFormat) -> Result<()> {
    let list: Vec<hold_api::ContainerSummary> = client.get("/containers/json")?;

    if matches!(format, OutputFormat::Json) {
        println!("{}", serde_json::to_string_pretty(&list)?);
        return Ok(());
    }
    if list.is_empty() {
        println!("No containers.");
        return Ok(());
    }
    println!(
        "{:<14} {:<20} {:<10} {:<20} {}",
        "ID", "IMAGE", "STATUS", "CREATED", "COMMAND"
    );
    for c in &list {
        let short_id = &c.id[..std::cmp::min(12, c.id.len())];
        println!(
            "{:<14} {:<20} {:<10} {:<20} {}",
            short_id, c.image, c.status, c.created, c.command
        );
    }
    Ok(())
}

fn stop(client: &Client, id: &str) -> Result<()> {
    client.post_empty(&format!("/containers/{id}/stop"))?;
    eprintln!("Stopped: {id}");
    Ok(())
}

fn rm(client: &Client, id: &str) -> Result<()> {
    client.delete_empty(&format!("/containers/{id}/remove"))?;
    eprintln!("Removed: {id}");
    Ok(())
}

fn rmi(client: &Client, name: &str) -> Result<()> {
    let resp: hold_api::MessageResponse = client.delete(&format!("/images/{name}"))?;
    eprintln!("{}", resp.message);
    Ok(())
}

fn logs(client: &Client, id: &str) -> Result<()> {
    let body = client.get_raw(&format!("/containers/{id}/logs"))?;
    use std::io::Write;
    std::io::stdout().write_all(&body)?;
    Ok(())
}

fn exec(client: &Client, id: &str, command: Vec<String>) -> Result<()> {
    let req = hold_api::ExecRequest {
        cmd: command,
        env: Vec::new(),
    };
    let resp: hold_api::ExecResponse = client.post_json(&format!("/containers/{id}/exec"), &req)?;
    if resp.exit_code != 0 {
        std::process::exit(resp.exit_code);
    }
    Ok(())
}

fn commit(client: &Client, id: &str, image: &str, message: Option<String>) -> Result<()> {
    let (repo, tag) = image.rsplit_once(':').unwrap_or((image, "latest"));
    let req = hold_api::CommitRequest {
        repo: repo.to_owned(),
        tag: Some(tag.to_owned()),
        message,
    };
    let resp: hold_api::CommitResponse = client.post_json(&format!("/containers/{id}/commit"), &req)?;
    println!("{}", resp.id);
    Ok(())
}

/// Formats bytes into a human-readable size string.
#[allow(clippy::cast_precision_loss)]
fn human_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    for unit in UNITS {
        if size < 1024.0 {
            return format!("{size:.1} {unit}");
        }
        size /= 1024.0;
    }
    format!("{size:.1} TB")
}

/// Minimal percent-encoding for query parameters (paths and references).
fn urlencode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b'/' => {
                out.push(b as char);
            }
            _ => out.push_str(&format!("%{b:02X}")),
        }
    }
    out
}
