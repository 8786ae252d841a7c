//! Instructor helpers: create courses, nanodegrees, quizzes and projects.

use std::fmt;
use std::str::FromStr;

use serde_json::{json, Value};

use nelson_config::Service;

use crate::error::{NelsonError, Result};
use crate::session::Session;

/// Something `nelson generate` can create.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminObject {
    Course,
    Nanodegree,
    Quiz,
    Project,
}

impl AdminObject {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdminObject::Course => "course",
            AdminObject::Nanodegree => "nanodegree",
            AdminObject::Quiz => "quiz",
            AdminObject::Project => "project",
        }
    }

    /// Keys the data file must define.
    pub fn required_params(&self) -> &'static [&'static str] {
        match self {
            AdminObject::Course => &["gtcode", "title"],
            AdminObject::Nanodegree => &["ndkey", "name"],
            AdminObject::Quiz => &["gtcode", "name", "executor", "docker_image"],
            AdminObject::Project => &["ndkey", "name", "executor", "docker_image"],
        }
    }

    /// Courses and quizzes live on GT OMSCS, the rest on Udacity.
    pub fn service(&self) -> Service {
        match self {
            AdminObject::Course | AdminObject::Quiz => Service::Gtomscs,
            AdminObject::Nanodegree | AdminObject::Project => Service::Udacity,
        }
    }

    /// Containers get a repository and deploy key; their children don't.
    pub fn needs_repository(&self) -> bool {
        matches!(self, AdminObject::Course | AdminObject::Nanodegree)
    }

    /// Required keys absent from `data`, in declaration order.
    pub fn missing_params(&self, data: &Value) -> Vec<String> {
        self.required_params()
            .iter()
            .filter(|key| data.get(**key).is_none())
            .map(|key| key.to_string())
            .collect()
    }

    /// Check `data` and fail with every missing key at once.
    pub fn validate(&self, file: &str, data: &Value) -> Result<()> {
        let missing = self.missing_params(data);
        if missing.is_empty() {
            Ok(())
        } else {
            Err(NelsonError::MissingParameters { file: file.to_string(), missing })
        }
    }
}

impl fmt::Display for AdminObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AdminObject {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "course" => Ok(AdminObject::Course),
            "nanodegree" => Ok(AdminObject::Nanodegree),
            "quiz" => Ok(AdminObject::Quiz),
            "project" => Ok(AdminObject::Project),
            other => Err(format!("unknown object '{}'", other)),
        }
    }
}

// ── Requests ────────────────────────────────────────────────────────

pub fn create_course(session: &Session, course: &Value) -> Result<()> {
    let url = format!("{}/courses/", session.root_url());
    session.post_json(&url, course)?;
    tracing::info!(url = %url, "course created");
    Ok(())
}

pub fn create_nanodegree(session: &Session, nanodegree: &Value) -> Result<()> {
    let url = format!("{}/nanodegrees/", session.root_url());
    session.post_json(&url, nanodegree)?;
    tracing::info!(url = %url, "nanodegree created");
    Ok(())
}

pub fn create_quiz(session: &Session, gtcode: &str, quiz: &Value) -> Result<()> {
    let url = format!("{}/courses/{}/quizzes", session.root_url(), gtcode);
    session.post_json(&url, &json!({ "quiz": quiz }))?;
    tracing::info!(url = %url, "quiz created");
    Ok(())
}

pub fn create_project(session: &Session, ndkey: &str, project: &Value) -> Result<()> {
    let url = format!("{}/nanodegrees/{}/projects", session.root_url(), ndkey);
    session.post_json(&url, &json!({ "project": project }))?;
    tracing::info!(url = %url, "project created");
    Ok(())
}

/// Create `object` from `data`, routing to the matching endpoint.
///
/// `data` must already have passed [`AdminObject::validate`].
pub fn create(session: &Session, object: AdminObject, data: &Value) -> Result<()> {
    let key = |name: &str| data.get(name).and_then(Value::as_str).unwrap_or_default().to_string();
    match object {
        AdminObject::Course => create_course(session, data),
        AdminObject::Nanodegree => create_nanodegree(session, data),
        AdminObject::Quiz => create_quiz(session, &key("gtcode"), data),
        AdminObject::Project => create_project(session, &key("ndkey"), data),
    }
}
