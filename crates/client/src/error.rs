//! Error type for every fallible client operation.

use std::path::PathBuf;

/// Convenience alias used throughout the crate.
pub type Result<T, E = NelsonError> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum NelsonError {
    /// A declared file resolves outside the submission root.
    #[error("Submitted files must be in subdirectories of {}.", .root.display())]
    PathEscape { root: PathBuf, path: PathBuf },

    /// The finished archive is bigger than the allowed limit.
    #[error("Your zipfile exceeded the limit of {limit} bytes")]
    ArchiveTooLarge { limit: u64, actual: u64 },

    /// No cached or freshly obtained token is valid.
    #[error("{0}")]
    Authentication(String),

    /// 403 on submit.
    #[error("You don't have access to this {subject}.")]
    AccessDenied { subject: &'static str },

    /// 404/429/500 on submit, carrying the best available server text.
    #[error("{0}")]
    ServerMessage(String),

    /// Any other non-2xx response.
    #[error("HTTP {status} from {url}")]
    Http { status: u16, url: String },

    /// The CAS login page no longer has the markers we scrape.
    #[error("Login page layout changed: {0}")]
    LoginPageChanged(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Reading interactive input failed.
    #[error("Prompt failed: {0}")]
    Prompt(String),

    #[error("Unknown identity provider '{0}' (expected udacity, gt or developer)")]
    UnknownProvider(String),

    #[error("The {service} service has no '{environment}' environment")]
    UnknownEnvironment { service: String, environment: String },

    #[error("The data file {file} is missing required parameters: {}", .missing.join(", "))]
    MissingParameters { file: String, missing: Vec<String> },

    #[error("{0}")]
    GitRemote(String),

    #[error("Deploy key error: {0}")]
    DeployKey(String),

    /// `poll` called before a successful `submit`.
    #[error("No submission has been made yet")]
    NotSubmitted,
}
