//! `holdctl run` — create and start a container from an image.

use anyhow::Result;

use crate::client::Client;

/// Arguments for the `holdctl run` subcommand.
#[derive(clap::Args)]
pub struct RunArgs {
    /// Keep stdin open.
    #[arg(short = 'i', long)]
    interactive: bool,

    /// Allocate a pseudo-tty.
    #[arg(short = 't', long)]
    tty: bool,

    /// Run in the background and print the container id.
    #[arg(short = 'd', long)]
    detach: bool,

    /// Assign a name to the container. Not yet wired into the daemon's
    /// create request (the JSON body has no name field); the container is
    /// named after its id until that's resolved.
    #[arg(long)]
    name: Option<String>,

    /// Host:container port mapping. Repeatable.
    #[arg(short = 'p', long = "port")]
    ports: Vec<String>,

    /// Host:container bind mount. Repeatable.
    #[arg(short = 'v', long = "volume")]
    volumes: Vec<String>,

    /// Environment variable (KEY=VALUE). Repeatable.
    #[arg(short = 'e', long = "env")]
    envs: Vec<String>,

    /// Working directory inside the container.
    #[arg(short = 'w', long = "workdir")]
    workdir: Option<String>,

    /// Source image reference.
    image: String,

    /// Command override. Empty defers to the image's configured command.
    #[arg(last = true)]
    command: Vec<String>,
}

impl RunArgs {
    pub fn run(self, client: &Client) -> Result<()> {
        if let Some(name) = &self.name {
            eprintln!("holdctl: --name {name} is not yet honored by the daemon; using the generated id");
        }

        let req = hold_api::CreateContainerRequest {
            image: self.image,
            cmd: self.command,
            working_dir: self.workdir,
            env: self.envs,
            port_bindings: self.ports,
            binds: self.volumes,
            attach_stdin: self.interactive,
            attach_stdout: self.tty || self.interactive,
            detach: self.detach,
        };

        let created: hold_api::CreateContainerResponse =
            client.post_json("/containers/create", &req)?;
        client.post_empty(&format!("/containers/{}/start", created.id))?;

        if self.detach {
            println!("{}", created.id);
        } else {
            eprintln!("{}", created.id);
        }
        Ok(())
    }
}
