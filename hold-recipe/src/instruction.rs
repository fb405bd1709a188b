//! The closed set of recipe instruction keywords and parsed instructions.

/// The closed set of recognized instruction keywords.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    /// Sets the base image for the build.
    From,
    /// Executes a shell command against the staging rootfs.
    Run,
    /// Sets the default command.
    Cmd,
    /// Appends a label to the image's label map.
    Label,
    /// Declares an exposed port.
    Expose,
    /// Appends an environment variable.
    Env,
    /// Copies files from the build context, permits remote sources (treated
    /// identically to `COPY` here; no remote fetch per Non-goals).
    Add,
    /// Copies files from the build context into staging.
    Copy,
    /// Sets the default entrypoint.
    Entrypoint,
    /// Declares a volume mount point.
    Volume,
    /// Sets the default user.
    User,
    /// Creates and sets the working directory.
    Workdir,
    /// Declares a build-time argument. Recorded, not otherwise acted on.
    Arg,
    /// Registers a trigger instruction for downstream builds. Recorded only.
    Onbuild,
    /// Sets the signal used to stop the container. Recorded only.
    Stopsignal,
    /// Declares a healthcheck. Recorded only (health checks are a Non-goal).
    Healthcheck,
    /// Sets the shell used to interpret `RUN`/`CMD`/`ENTRYPOINT` strings.
    Shell,
}

impl Keyword {
    /// Parses a keyword token case-insensitively. Returns `None` if the
    /// token is not one of the closed set.
    pub fn parse(token: &str) -> Option<Self> {
        Some(match token.to_ascii_uppercase().as_str() {
            "FROM" => Self::From,
            "RUN" => Self::Run,
            "CMD" => Self::Cmd,
            "LABEL" => Self::Label,
            "EXPOSE" => Self::Expose,
            "ENV" => Self::Env,
            "ADD" => Self::Add,
            "COPY" => Self::Copy,
            "ENTRYPOINT" => Self::Entrypoint,
            "VOLUME" => Self::Volume,
            "USER" => Self::User,
            "WORKDIR" => Self::Workdir,
            "ARG" => Self::Arg,
            "ONBUILD" => Self::Onbuild,
            "STOPSIGNAL" => Self::Stopsignal,
            "HEALTHCHECK" => Self::Healthcheck,
            "SHELL" => Self::Shell,
            _ => return None,
        })
    }

    /// Returns the canonical uppercase spelling.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::From => "FROM",
            Self::Run => "RUN",
            Self::Cmd => "CMD",
            Self::Label => "LABEL",
            Self::Expose => "EXPOSE",
            Self::Env => "ENV",
            Self::Add => "ADD",
            Self::Copy => "COPY",
            Self::Entrypoint => "ENTRYPOINT",
            Self::Volume => "VOLUME",
            Self::User => "USER",
            Self::Workdir => "WORKDIR",
            Self::Arg => "ARG",
            Self::Onbuild => "ONBUILD",
            Self::Stopsignal => "STOPSIGNAL",
            Self::Healthcheck => "HEALTHCHECK",
            Self::Shell => "SHELL",
        }
    }
}

impl std::fmt::Display for Keyword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source and destination paths parsed from an `ADD`/`COPY` argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopySpec {
    /// Source paths, relative to the build context. May be more than one
    /// when the instruction names several sources for a single directory
    /// destination.
    pub src: Vec<String>,
    /// Destination path, relative to the staging rootfs.
    pub dest: String,
}

/// A single parsed instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    /// The instruction keyword.
    pub keyword: Keyword,
    /// The raw argument string (post-continuation-join, pre-split).
    pub argument: String,
    /// 1-indexed source line number. Continuation lines attribute to the
    /// line the instruction started on.
    pub line: usize,
    /// Parsed source/destination for `ADD`/`COPY`; `None` otherwise.
    pub copy: Option<CopySpec>,
}
