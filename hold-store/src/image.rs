//! Image and runtime config types shared by the catalog and the build executor.

use std::collections::BTreeMap;

/// Runtime defaults carried by an image, set by `ENV`, `WORKDIR`, `USER`,
/// `EXPOSE`, `VOLUME`, `ENTRYPOINT`/`CMD`, and `LABEL` during a build.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct RuntimeConfig {
    /// Default command (`CMD`).
    #[serde(default)]
    pub cmd: Vec<String>,
    /// Default entrypoint (`ENTRYPOINT`).
    #[serde(default)]
    pub entrypoint: Vec<String>,
    /// Default working directory (`WORKDIR`).
    #[serde(default)]
    pub working_dir: Option<String>,
    /// Accumulated environment variables (`ENV`), `KEY=VALUE` form.
    #[serde(default)]
    pub env: Vec<String>,
    /// Declared ports (`EXPOSE`), e.g. `"8080/tcp"`.
    #[serde(default)]
    pub exposed_ports: Vec<String>,
    /// Declared volume mount points (`VOLUME`).
    #[serde(default)]
    pub volumes: Vec<String>,
    /// Default user (`USER`).
    #[serde(default)]
    pub user: Option<String>,
    /// Accumulated labels (`LABEL`).
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

impl RuntimeConfig {
    /// Returns entrypoint + cmd concatenated, the effective default command.
    pub fn command(&self) -> Vec<String> {
        let mut parts = self.entrypoint.clone();
        parts.extend(self.cmd.iter().cloned());
        parts
    }
}

/// A named, tagged handle to an ordered layer stack plus a runtime config.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Image {
    /// Opaque image id.
    pub id: String,
    /// Human-assigned repository name.
    pub name: String,
    /// Tag within the repository, defaults to `latest`.
    pub tag: String,
    /// Ordered layer ids, bottom-to-top.
    pub layers: Vec<String>,
    /// Target architecture string, e.g. `"amd64"`.
    #[serde(default = "default_arch")]
    pub architecture: String,
    /// Target OS string, e.g. `"linux"`.
    #[serde(default = "default_os")]
    pub os: String,
    /// Optional author string.
    #[serde(default)]
    pub author: Option<String>,
    /// Embedded runtime defaults.
    #[serde(default)]
    pub config: RuntimeConfig,
    /// RFC3339 creation timestamp.
    pub created: String,
    /// Total byte size across all layers.
    #[serde(default)]
    pub size: u64,
}

impl Image {
    /// Returns the `name:tag` reference string.
    pub fn reference(&self) -> String {
        format!("{}:{}", self.name, self.tag)
    }
}

fn default_arch() -> String {
    "amd64".to_owned()
}

fn default_os() -> String {
    "linux".to_owned()
}

/// Default tag applied when a caller does not specify one.
pub const DEFAULT_TAG: &str = "latest";
