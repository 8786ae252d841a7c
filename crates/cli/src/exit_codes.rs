//! CLI Exit Code Registry
//!
//! Single source of truth for `nelson` exit codes. Scripts (CI jobs that
//! submit on push, course tooling) rely on them.
//!
//! | Code | Meaning                                              |
//! |------|------------------------------------------------------|
//! | 0    | Success (feedback received, object created)          |
//! | 1    | General error, or grading ended without feedback     |
//! | 2    | Usage error (bad arguments, bad data file)           |
//! | 10   | Authentication failed                                |
//! | 11   | Access denied to the quiz/project                    |
//! | 12   | Server rejected the submission with a message        |
//! | 13   | Network or unexpected HTTP error                     |
//! | 14   | Archive rejected (file outside root, too large)      |
//! | 15   | Login page layout changed                            |
//! | 16   | Local I/O error                                      |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Map the error in [`exit_code`]

use nelson_client::NelsonError;

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure, or a grading run that produced an
/// error report instead of feedback.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing data file parameters.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Grading service (10-19)
// =============================================================================

/// No valid token could be obtained.
pub const EXIT_AUTH: u8 = 10;

/// 403 on submit.
pub const EXIT_ACCESS_DENIED: u8 = 11;

/// 404/429/500 on submit, with the server's explanation.
pub const EXIT_SERVER_MESSAGE: u8 = 12;

/// Transport failure or any other non-2xx response.
pub const EXIT_NETWORK: u8 = 13;

/// File outside the submission root, or archive over the size limit.
pub const EXIT_ARCHIVE: u8 = 14;

/// CAS login page no longer has the expected form.
pub const EXIT_LOGIN_PAGE: u8 = 15;

/// Reading or writing a local file failed.
pub const EXIT_IO: u8 = 16;

/// Map a client error to its exit code.
pub fn exit_code(err: &NelsonError) -> u8 {
    match err {
        NelsonError::PathEscape { .. } | NelsonError::ArchiveTooLarge { .. } => EXIT_ARCHIVE,
        NelsonError::Authentication(_) => EXIT_AUTH,
        NelsonError::AccessDenied { .. } => EXIT_ACCESS_DENIED,
        NelsonError::ServerMessage(_) => EXIT_SERVER_MESSAGE,
        NelsonError::Http { .. } | NelsonError::Network(_) => EXIT_NETWORK,
        NelsonError::LoginPageChanged(_) => EXIT_LOGIN_PAGE,
        NelsonError::Io(_) | NelsonError::Zip(_) | NelsonError::DeployKey(_) => EXIT_IO,
        NelsonError::UnknownProvider(_)
        | NelsonError::UnknownEnvironment { .. }
        | NelsonError::MissingParameters { .. }
        | NelsonError::GitRemote(_)
        | NelsonError::Json(_) => EXIT_USAGE,
        NelsonError::Prompt(_) | NelsonError::NotSubmitted => EXIT_ERROR,
    }
}
