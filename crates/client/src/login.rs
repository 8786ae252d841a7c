//! Interactive login flows.
//!
//! Each identity provider establishes an authenticated cookie with the
//! grading service in its own way; all of them then trade that cookie for a
//! JWT at `POST /auth_tokens`.
//!
//! - `udacity`  : form POST to the hosted authentication endpoint
//! - `gt`       : scrape the CAS login form, POST it back
//! - `developer`: bare user name, no secret (local/dev servers only)

use std::fmt;
use std::str::FromStr;

use regex::Regex;
use reqwest::blocking::{Client, Response};
use reqwest::header::ACCEPT;
use reqwest::Url;

use crate::error::{NelsonError, Result};
use crate::prompt::Prompt;
use crate::session::http_client;

/// Hosted authentication endpoint used by the `udacity` provider.
pub const HOSTED_AUTH_URL: &str = "https://hoth.udacity.com/v2/authenticate";

/// Identity providers understood by the grading services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdProvider {
    /// Udacity hosted login
    Udacity,
    /// Georgia Tech CAS
    Gt,
    /// Trust-the-caller developer login
    Developer,
}

impl IdProvider {
    /// Key in the JWT cache and name on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            IdProvider::Udacity => "udacity",
            IdProvider::Gt => "gt",
            IdProvider::Developer => "developer",
        }
    }
}

impl fmt::Display for IdProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IdProvider {
    type Err = NelsonError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "udacity" => Ok(IdProvider::Udacity),
            "gt" => Ok(IdProvider::Gt),
            "developer" => Ok(IdProvider::Developer),
            other => Err(NelsonError::UnknownProvider(other.to_string())),
        }
    }
}

/// Runs the provider-specific login against one grading service.
#[derive(Debug, Clone)]
pub struct Authenticator {
    root_url: String,
    hosted_auth_url: String,
}

impl Authenticator {
    pub fn new(root_url: impl Into<String>) -> Self {
        Self {
            root_url: root_url.into(),
            hosted_auth_url: HOSTED_AUTH_URL.to_string(),
        }
    }

    /// Point the `udacity` provider at a different authentication endpoint.
    pub fn with_hosted_auth_url(mut self, url: impl Into<String>) -> Self {
        self.hosted_auth_url = url.into();
        self
    }

    /// Prompt for credentials, log in, and return a fresh JWT.
    pub fn login(&self, provider: IdProvider, prompt: &mut dyn Prompt) -> Result<String> {
        let http = http_client(true)?;

        match provider {
            IdProvider::Udacity => {
                prompt.notice("Udacity Login required.");
                let email = prompt.input("Email")?;
                let password = prompt.password("Password")?;
                udacity_login(&http, &self.root_url, &self.hosted_auth_url, &email, &password)?;
            }
            IdProvider::Gt => {
                prompt.notice("GT Login required.");
                let username = prompt.input("Username")?;
                let password = prompt.password("Password")?;
                gt_login(&http, &self.root_url, &username, &password)?;
            }
            IdProvider::Developer => {
                prompt.notice("Developer Login required.");
                let username = prompt.input("Username")?;
                developer_login(&http, &self.root_url, &username)?;
            }
        }

        exchange_token(&http, &self.root_url)
    }
}

// ── Provider flows ──────────────────────────────────────────────────

/// Hosted login: the endpoint sets the session cookie and redirects back to
/// the service callback named in `next`.
pub fn udacity_login(
    http: &Client,
    root_url: &str,
    auth_url: &str,
    email: &str,
    password: &str,
) -> Result<()> {
    let next = format!("{}/auth/udacity/callback", root_url);
    let resp = http
        .post(auth_url)
        .header(ACCEPT, "*/*")
        .form(&[("email", email), ("password", password), ("next", next.as_str())])
        .send()?;

    let status = resp.status();
    if !status.is_success() {
        tracing::info!(status = status.as_u16(), "hosted login rejected");
        return Err(NelsonError::Authentication("Authentication failed".into()));
    }
    Ok(())
}

/// CAS login: fetch the login form via the service, post the credentials
/// back, and require the redirect chain to end on the service.
pub fn gt_login(http: &Client, root_url: &str, username: &str, password: &str) -> Result<()> {
    let resp = http
        .get(format!("{}/auth/cas", root_url))
        .header(ACCEPT, "*/*")
        .send()?;
    let resp = check_login_status(resp)?;

    let origin = resp.url().origin().ascii_serialization();
    let html = resp.text()?;
    let form = extract_cas_form(&html)?;

    let action = if form.action.starts_with("http://") || form.action.starts_with("https://") {
        form.action.clone()
    } else {
        format!("{}{}", origin, form.action)
    };

    let resp = http
        .post(&action)
        .header(ACCEPT, "*/*")
        .form(&[
            ("lt", form.lt.as_str()),
            ("execution", form.execution.as_str()),
            ("_eventId", form.event_id.as_str()),
            ("warn", "false"),
            ("username", username),
            ("password", password),
        ])
        .send()?;
    let resp = check_login_status(resp)?;

    // Landing anywhere but the service means CAS kept us on its own pages:
    // wrong credentials, or a second factor we cannot complete.
    if !lands_on(resp.url(), root_url) {
        return Err(NelsonError::Authentication(
            "Username and password failed (Do you use two-factor?)".into(),
        ));
    }
    Ok(())
}

/// Whether `url` is on the service at `root_url` (same origin, under its path).
fn lands_on(url: &Url, root_url: &str) -> bool {
    match Url::parse(root_url) {
        Ok(root) => {
            url.origin() == root.origin() && url.path().starts_with(root.path().trim_end_matches('/'))
        }
        Err(_) => url.as_str().starts_with(root_url),
    }
}

/// Developer login: the service trusts the user name as given.
pub fn developer_login(http: &Client, root_url: &str, username: &str) -> Result<()> {
    let resp = http
        .post(format!("{}/auth/developer/callback", root_url))
        .header(ACCEPT, "*/*")
        .json(&serde_json::json!({ "username": username }))
        .send()?;
    check_login_status(resp)?;
    Ok(())
}

/// Trade the authenticated cookie for a JWT.
pub fn exchange_token(http: &Client, root_url: &str) -> Result<String> {
    let url = format!("{}/auth_tokens", root_url);
    let resp = http.post(&url).send()?;
    let resp = check_login_status(resp)?;

    let body: serde_json::Value = resp.json()?;
    body["auth_token"]
        .as_str()
        .map(String::from)
        .ok_or_else(|| NelsonError::Authentication("Missing auth_token in response".into()))
}

/// 403 → authentication failure, other non-2xx → plain HTTP error.
fn check_login_status(resp: Response) -> Result<Response> {
    let status = resp.status().as_u16();
    if status == 403 {
        return Err(NelsonError::Authentication("Authentication failed".into()));
    }
    if !resp.status().is_success() {
        return Err(NelsonError::Http { status, url: resp.url().to_string() });
    }
    Ok(resp)
}

// ── CAS form scraping ───────────────────────────────────────────────

/// Hidden fields and target of the CAS login form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CasForm {
    pub action: String,
    pub lt: String,
    pub execution: String,
    pub event_id: String,
}

/// Pull the login form out of a CAS login page.
///
/// Any missing marker means the page no longer looks the way we expect and
/// is reported as [`NelsonError::LoginPageChanged`].
pub fn extract_cas_form(html: &str) -> Result<CasForm> {
    Ok(CasForm {
        action: capture(html, r#"action="([^"]*)"\s+method="post"\s*>"#, "form action")?,
        lt: hidden_field(html, "lt")?,
        execution: hidden_field(html, "execution")?,
        event_id: hidden_field(html, "_eventId")?,
    })
}

fn hidden_field(html: &str, name: &str) -> Result<String> {
    let pattern = format!(
        r#"<input type="hidden" name="{}" value="([^"]*)"\s*/?>"#,
        regex::escape(name)
    );
    capture(html, &pattern, name)
}

fn capture(html: &str, pattern: &str, what: &str) -> Result<String> {
    let re = Regex::new(pattern)
        .map_err(|e| NelsonError::LoginPageChanged(format!("bad pattern for {}: {}", what, e)))?;
    re.captures(html)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| NelsonError::LoginPageChanged(format!("no {} found on the CAS login page", what)))
}
