use thiserror::Error;

/// Errors surfaced by qcflow.
///
/// A remote command that exits non-zero is *not* an error. Many cluster
/// commands return non-zero for benign reasons ("no jobs found"), so captured
/// stderr is handed back to the caller for inspection instead.
#[derive(Debug, Error)]
pub enum Error {
    /// conflicting or ambiguous user input, caught before any remote work
    #[error("input error: {0}")]
    Input(String),

    /// SSH connection, authentication, or channel failure
    #[error("server error on {server}: {reason}")]
    Server { server: String, reason: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn server(server: &str, reason: impl ToString) -> Self {
        Self::Server {
            server: server.to_string(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
