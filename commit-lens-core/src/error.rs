// error types shared by the collector, scanner and agent modules

use thiserror::Error;

pub type Result<T> = std::result::Result<T, LensError>;

/// why a remote clone failed, derived from the libgit2 message text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloneFailure {
    NotFound,
    Auth,
    Network,
    Other(String),
}

impl std::fmt::Display for CloneFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CloneFailure::NotFound => {
                write!(f, "repository not found, check the url and that it is public")
            }
            CloneFailure::Auth => write!(
                f,
                "authentication required, the repository may be private"
            ),
            CloneFailure::Network => write!(
                f,
                "could not resolve or reach the host, check your network connection"
            ),
            CloneFailure::Other(msg) => write!(f, "{msg}"),
        }
    }
}

#[derive(Debug, Error)]
pub enum LensError {
    #[error("no commits found in repository")]
    NoCommitsFound,

    #[error("commit {0} not found")]
    CommitNotFound(String),

    #[error("no response content from the model")]
    EmptyModelResponse,

    #[error("{0} is not set")]
    MissingCredential(String),

    #[error("invalid configuration: {}", .0.join("; "))]
    InvalidConfig(Vec<String>),

    #[error("failed to parse config file {path}: {message}")]
    ConfigParse { path: String, message: String },

    #[error("failed to clone {url}: {failure}")]
    Clone { url: String, failure: CloneFailure },

    #[error("model api error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("malformed {step} response from the model: {message}")]
    ModelOutput { step: &'static str, message: String },

    #[error("github api error ({status}) for {url}")]
    GitHub { status: u16, url: String },

    #[error(transparent)]
    Git(#[from] git2::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl LensError {
    pub(crate) fn model_output(step: &'static str, err: impl std::fmt::Display) -> Self {
        LensError::ModelOutput {
            step,
            message: err.to_string(),
        }
    }
}
