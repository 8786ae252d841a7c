//! Grading service client, shared by the CLI and tests.
//!
//! Resolves a bearer token (cached, or via one of three interactive logins),
//! packages declared files into a root-confined zip, uploads it with progress
//! reporting and polls until the grader answers.
//!
//! Blocking I/O throughout. No retries: every failure surfaces to the caller.

pub mod admin;
pub mod archive;
pub mod credentials;
pub mod deploy_key;
pub mod error;
pub mod login;
pub mod progress;
pub mod prompt;
pub mod runner;
pub mod session;
pub mod submission;

pub use admin::AdminObject;
pub use archive::{build_archive, SUBMISSION_FILENAME};
pub use credentials::{default_jwt_path, CredentialStore};
pub use error::{NelsonError, Result};
pub use login::{extract_cas_form, Authenticator, CasForm, IdProvider, HOSTED_AUTH_URL};
pub use progress::{ProgressBarReporter, ProgressReporter, Silent};
pub use prompt::{Prompt, ScriptedPrompt};
pub use runner::{RunOutcome, Runner};
pub use session::{Session, SessionBuilder};
pub use submission::{
    ProjectTarget, QuizTarget, Submission, SubmissionClient, SubmissionRecord, SubmissionRequest,
    SubmissionTarget,
};
