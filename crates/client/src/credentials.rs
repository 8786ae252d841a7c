//! JWT cache.
//!
//! One JSON file holds `{provider: token, ...}` (0600 on Unix). A cached
//! token is only returned after the server accepts it; every failure on the
//! way (no file, no entry, bad JSON, rejected token) reads as "no token".
//! The file is read-modify-written without locking, so two concurrent runs
//! against the same cache can lose an update.

use std::fs;
use std::path::{Path, PathBuf};

use reqwest::blocking::Client;
use serde_json::{Map, Value};

use nelson_config::Service;

use crate::error::Result;
use crate::login::IdProvider;
use crate::session::http_client;

/// Default cache file for `service`: `<app data dir>/<service>_jwt`.
pub fn default_jwt_path(service: Service) -> PathBuf {
    nelson_config::app_data_dir().join(service.jwt_file_name())
}

/// On-disk token cache bound to one grading service.
pub struct CredentialStore {
    path: PathBuf,
    root_url: String,
    http: Client,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>, root_url: impl Into<String>) -> Result<Self> {
        Ok(Self {
            path: path.into(),
            root_url: root_url.into(),
            http: http_client(false)?,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Cached token for `provider`, if present and still accepted by the server.
    pub fn load(&self, provider: IdProvider) -> Option<String> {
        let cache = self.read_cache()?;
        let token = cache.get(provider.as_str())?.as_str()?.to_string();

        if self.validate(&token) {
            tracing::debug!(provider = %provider, "using cached token");
            Some(token)
        } else {
            tracing::info!(provider = %provider, "cached token rejected by server");
            None
        }
    }

    /// Store `token` for `provider`, keeping every other provider's entry.
    /// Creates the parent directory if it doesn't exist.
    pub fn save(&self, provider: IdProvider, token: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut cache = self.read_cache().unwrap_or_default();
        cache.insert(provider.as_str().to_string(), Value::String(token.to_string()));

        fs::write(&self.path, serde_json::to_string(&cache)?)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600))?;
        }

        tracing::debug!(provider = %provider, path = %self.path.display(), "token saved");
        Ok(())
    }

    /// Whether the server accepts `token`. Never fails: network errors and
    /// any non-200 status count as invalid.
    pub fn validate(&self, token: &str) -> bool {
        validate_token(&self.http, &self.root_url, token)
    }

    fn read_cache(&self) -> Option<Map<String, Value>> {
        let contents = fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str::<Value>(&contents).ok()? {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }
}

/// GET `/users/me` with `token`; true iff the server answers 200.
pub(crate) fn validate_token(http: &Client, root_url: &str, token: &str) -> bool {
    let url = format!("{}/users/me", root_url);
    match http.get(&url).bearer_auth(token).send() {
        Ok(resp) => resp.status().as_u16() == 200,
        Err(e) => {
            tracing::debug!(error = %e, "token validation request failed");
            false
        }
    }
}
