// Configuration loading

pub mod environment;
pub mod settings;

use std::path::PathBuf;

pub use environment::{Environment, Service};
pub use settings::Settings;

const APP_NAME: &str = "nelson";

/// Per-user application data directory.
///
/// `%APPDATA%\nelson` on Windows, `~/.nelson` everywhere else. Falls back to
/// `./.nelson` when no home directory can be determined.
pub fn app_data_dir() -> PathBuf {
    #[cfg(windows)]
    {
        if let Some(dir) = std::env::var_os("APPDATA") {
            return PathBuf::from(dir).join(APP_NAME);
        }
    }

    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(format!(".{}", APP_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(not(windows))]
    fn app_data_dir_is_dot_nelson() {
        let dir = app_data_dir();
        assert!(dir.ends_with(".nelson"), "{}", dir.display());
    }
}
