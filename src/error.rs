use std::path::PathBuf;
use thiserror::Error;

/// Errors returned while observing or converging a checkout.
#[derive(Error, Debug)]
pub enum ConvergeError {
    /// A git invocation exited non-zero. `output` is the combined stdout/stderr.
    #[error("`{command}` failed ({status}): {output}")]
    Execution {
        command: String,
        status: String,
        output: String,
    },
    /// The shell could not be spawned at all.
    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    /// The requested revision matches no branch, tag, or commit of the remote.
    #[error("revision `{revision}` could not be resolved against {remote}")]
    UnresolvedRevision { revision: String, remote: String },
    /// Removing the checkout failed.
    #[error("failed to remove {}: {source}", path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The run-as identity is not in the user database.
    #[error("unknown user: {0}")]
    UnknownUser(String),
    /// The desired state was rejected before any git invocation.
    #[error("invalid desired state: {0}")]
    InvalidInput(String),
}

pub type Result<T, E = ConvergeError> = std::result::Result<T, E>;
