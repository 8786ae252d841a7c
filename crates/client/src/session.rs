//! Authenticated sessions.
//!
//! Blocking reqwest client (no Tokio runtime required). A [`Session`] carries
//! `Authorization: Bearer <jwt>` plus JSON content negotiation headers and
//! the root URL of the service it was built for.

use std::path::PathBuf;
use std::time::Duration;

use reqwest::blocking::{Client, Response};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};

use nelson_config::{Environment, Service};

use crate::credentials::{default_jwt_path, CredentialStore};
use crate::error::{NelsonError, Result};
use crate::login::{Authenticator, IdProvider};
use crate::prompt::Prompt;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

fn user_agent() -> String {
    format!("nelson/{}", env!("CARGO_PKG_VERSION"))
}

/// Unauthenticated client with JSON `Accept`; `cookies` keeps a jar across
/// requests for the login flows.
pub(crate) fn http_client(cookies: bool) -> Result<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

    Ok(Client::builder()
        .user_agent(user_agent())
        .timeout(REQUEST_TIMEOUT)
        .default_headers(headers)
        .cookie_store(cookies)
        .build()?)
}

/// HTTP client bound to one service and one bearer token.
#[derive(Clone)]
pub struct Session {
    http: Client,
    root_url: String,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The token stays out of debug output.
        f.debug_struct("Session").field("root_url", &self.root_url).finish_non_exhaustive()
    }
}

impl Session {
    /// Create a session that sends `jwt` on every request.
    pub fn with_token(root_url: impl Into<String>, jwt: &str) -> Result<Self> {
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", jwt))
            .map_err(|_| NelsonError::Authentication("Token contains invalid characters".into()))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = Client::builder()
            .user_agent(user_agent())
            .timeout(REQUEST_TIMEOUT)
            .default_headers(headers)
            .build()?;

        Ok(Self { http, root_url: root_url.into() })
    }

    pub fn http(&self) -> &Client {
        &self.http
    }

    pub fn root_url(&self) -> &str {
        &self.root_url
    }

    /// POST a JSON body; any non-2xx becomes [`NelsonError::Http`].
    pub fn post_json(&self, url: &str, body: &serde_json::Value) -> Result<Response> {
        let resp = self.http.post(url).json(body).send()?;
        let status = resp.status();
        if !status.is_success() {
            return Err(NelsonError::Http { status: status.as_u16(), url: url.to_string() });
        }
        Ok(resp)
    }
}

/// Produces a [`Session`], reusing a cached token when the server still
/// accepts it and logging in interactively otherwise.
pub struct SessionBuilder {
    root_url: String,
    provider: IdProvider,
    store: CredentialStore,
    authenticator: Authenticator,
}

impl SessionBuilder {
    pub fn new(root_url: impl Into<String>, provider: IdProvider, store: CredentialStore) -> Self {
        let root_url = root_url.into();
        Self {
            authenticator: Authenticator::new(root_url.clone()),
            root_url,
            provider,
            store,
        }
    }

    /// Builder for one of the known services, resolving its root URL and
    /// falling back to the service's default provider and cache file.
    pub fn for_service(
        service: Service,
        environment: Environment,
        provider: Option<IdProvider>,
        jwt_path: Option<PathBuf>,
    ) -> Result<Self> {
        let root_url = service.root_url(environment).ok_or_else(|| NelsonError::UnknownEnvironment {
            service: service.to_string(),
            environment: environment.to_string(),
        })?;
        let provider = match provider {
            Some(p) => p,
            None => service.default_id_provider().parse()?,
        };
        let jwt_path = jwt_path.unwrap_or_else(|| default_jwt_path(service));
        let store = CredentialStore::new(jwt_path, root_url)?;

        Ok(Self::new(root_url, provider, store))
    }

    /// Point the hosted login at a different authentication endpoint.
    pub fn hosted_auth_url(mut self, url: impl Into<String>) -> Self {
        self.authenticator = self.authenticator.with_hosted_auth_url(url);
        self
    }

    pub fn root_url(&self) -> &str {
        &self.root_url
    }

    pub fn provider(&self) -> IdProvider {
        self.provider
    }

    /// Resolve a working token and wrap it in a session.
    ///
    /// The prompt is only used when the cache has nothing usable: once for
    /// credentials, once to ask whether the new token should be saved.
    pub fn build(&self, prompt: &mut dyn Prompt) -> Result<Session> {
        let jwt = match self.store.load(self.provider) {
            Some(jwt) => jwt,
            None => {
                tracing::info!(provider = %self.provider, root = %self.root_url, "interactive login");
                let jwt = self.authenticator.login(self.provider, prompt)?;

                if !self.store.validate(&jwt) {
                    return Err(NelsonError::Authentication("Authentication Failed".into()));
                }

                if prompt.confirm("Save the jwt?")? {
                    self.store.save(self.provider, &jwt)?;
                }
                jwt
            }
        };

        Session::with_token(self.root_url.clone(), &jwt)
    }
}
