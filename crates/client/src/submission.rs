//! Submissions: archive → upload → poll.
//!
//! The two grading services differ only in how submission URLs are spelled
//! and what the subject is called; both are expressed as a
//! [`SubmissionTarget`] driven by the same [`Submission`] type.

use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;

use reqwest::blocking::multipart::{Form, Part};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use nelson_config::settings::DEFAULT_MAX_ZIP_SIZE;

use crate::archive::{build_archive, SUBMISSION_FILENAME};
use crate::error::{NelsonError, Result};
use crate::progress::{ProgressReader, ProgressReporter, Silent};
use crate::session::Session;

// ── Targets ─────────────────────────────────────────────────────────

/// Where a submission goes and what it is called.
pub trait SubmissionTarget {
    /// Endpoint receiving the multipart upload.
    fn submit_url(&self) -> String;

    /// Endpoint returning the state of submission `id`.
    fn poll_url(&self, id: &str) -> String {
        format!("{}/{}", self.submit_url(), id)
    }

    /// Name used for the result file (quiz or project name).
    fn subject_name(&self) -> &str;

    /// "quiz" or "project", for user-facing messages.
    fn subject_kind(&self) -> &'static str;
}

/// A quiz in a GT OMSCS course.
#[derive(Debug, Clone)]
pub struct QuizTarget {
    root_url: String,
    course: String,
    quiz: String,
}

impl QuizTarget {
    pub fn new(root_url: impl Into<String>, course: impl Into<String>, quiz: impl Into<String>) -> Self {
        Self { root_url: root_url.into(), course: course.into(), quiz: quiz.into() }
    }
}

impl SubmissionTarget for QuizTarget {
    fn submit_url(&self) -> String {
        format!("{}/student/course/{}/quiz/{}/submission", self.root_url, self.course, self.quiz)
    }

    fn subject_name(&self) -> &str {
        &self.quiz
    }

    fn subject_kind(&self) -> &'static str {
        "quiz"
    }
}

/// A project in a Udacity nanodegree.
#[derive(Debug, Clone)]
pub struct ProjectTarget {
    root_url: String,
    nanodegree: String,
    project: String,
}

impl ProjectTarget {
    pub fn new(
        root_url: impl Into<String>,
        nanodegree: impl Into<String>,
        project: impl Into<String>,
    ) -> Self {
        Self { root_url: root_url.into(), nanodegree: nanodegree.into(), project: project.into() }
    }
}

impl SubmissionTarget for ProjectTarget {
    fn submit_url(&self) -> String {
        format!(
            "{}/student/nanodegree/{}/project/{}/submission",
            self.root_url, self.nanodegree, self.project
        )
    }

    fn subject_name(&self) -> &str {
        &self.project
    }

    fn subject_kind(&self) -> &'static str {
        "project"
    }
}

// ── Request / record ────────────────────────────────────────────────

/// Files to submit and the limits they are packed under.
#[derive(Debug, Clone)]
pub struct SubmissionRequest {
    pub files: Vec<PathBuf>,
    /// Every file must resolve under this directory.
    pub root: PathBuf,
    pub max_zip_size: u64,
    /// Where the archive is written before upload.
    pub archive_path: PathBuf,
}

impl SubmissionRequest {
    pub fn new<I, P>(files: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            files: files.into_iter().map(Into::into).collect(),
            root: PathBuf::from("."),
            max_zip_size: DEFAULT_MAX_ZIP_SIZE,
            archive_path: PathBuf::from(SUBMISSION_FILENAME),
        }
    }

    pub fn root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    pub fn max_zip_size(mut self, bytes: u64) -> Self {
        self.max_zip_size = bytes;
        self
    }

    pub fn archive_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.archive_path = path.into();
        self
    }
}

/// Server view of a submission. Terminal once `feedback` or `error_report`
/// is set.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SubmissionRecord {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub feedback: Option<Value>,
    #[serde(default)]
    pub console: Option<String>,
    #[serde(default)]
    pub error_report: Option<Value>,
}

impl SubmissionRecord {
    pub fn is_complete(&self) -> bool {
        self.feedback.is_some() || self.error_report.is_some()
    }
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!("expected string or number id, got {}", other))),
    }
}

// ── Client ──────────────────────────────────────────────────────────

/// What the runner needs from a submission in flight.
pub trait SubmissionClient {
    /// Declared files, as given.
    fn filenames(&self) -> Vec<String>;
    fn subject_name(&self) -> &str;
    fn submit(&mut self) -> Result<()>;
    /// Refresh the record; true once grading has finished.
    fn poll(&mut self) -> Result<bool>;
    fn feedback(&self) -> Option<&Value>;
    fn console(&self) -> Option<&str>;
    fn error_report(&self) -> Option<&Value>;
}

/// One submission of a set of files to a target.
pub struct Submission<T> {
    session: Session,
    target: T,
    request: SubmissionRequest,
    progress: Arc<dyn ProgressReporter>,
    record: Option<SubmissionRecord>,
}

impl<T: SubmissionTarget> Submission<T> {
    pub fn new(session: Session, target: T, request: SubmissionRequest) -> Self {
        Self {
            session,
            target,
            request,
            progress: Arc::new(Silent),
            record: None,
        }
    }

    pub fn with_progress(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.progress = reporter;
        self
    }

    /// Last record received from the server.
    pub fn record(&self) -> Option<&SubmissionRecord> {
        self.record.as_ref()
    }
}

impl<T: SubmissionTarget> SubmissionClient for Submission<T> {
    fn filenames(&self) -> Vec<String> {
        self.request.files.iter().map(|f| f.display().to_string()).collect()
    }

    fn subject_name(&self) -> &str {
        self.target.subject_name()
    }

    fn submit(&mut self) -> Result<()> {
        let url = self.target.submit_url();
        let archive = build_archive(
            &self.request.root,
            &self.request.files,
            self.request.max_zip_size,
            &self.request.archive_path,
        )?;

        let file = File::open(&archive)?;
        let total = file.metadata()?.len();
        let reader = ProgressReader::new(file, total, Arc::clone(&self.progress));
        let part = Part::reader_with_length(reader, total)
            .file_name(SUBMISSION_FILENAME)
            .mime_str("application/zip")?;
        let form = Form::new().part("zipfile", part);

        tracing::info!(url = %url, bytes = total, "uploading submission");
        let sent = self.session.http().post(&url).multipart(form).send();
        self.progress.finish();
        let resp = sent?;

        let status = resp.status().as_u16();
        if !resp.status().is_success() {
            let body = resp.text().unwrap_or_default();
            return Err(classify_submit_error(status, &url, &body, self.target.subject_kind()));
        }

        let record: SubmissionRecord = resp.json()?;
        tracing::info!(id = %record.id, "submission accepted");
        self.record = Some(record);
        Ok(())
    }

    fn poll(&mut self) -> Result<bool> {
        let id = self.record.as_ref().map(|r| r.id.clone()).ok_or(NelsonError::NotSubmitted)?;
        let url = self.target.poll_url(&id);

        let resp = self.session.http().get(&url).send()?;
        let status = resp.status();
        if !status.is_success() {
            return Err(NelsonError::Http { status: status.as_u16(), url });
        }

        let record: SubmissionRecord = resp.json()?;
        let done = record.is_complete();
        tracing::debug!(id = %record.id, done, "polled submission");
        self.record = Some(record);
        Ok(done)
    }

    fn feedback(&self) -> Option<&Value> {
        self.record.as_ref()?.feedback.as_ref()
    }

    fn console(&self) -> Option<&str> {
        self.record.as_ref()?.console.as_deref()
    }

    fn error_report(&self) -> Option<&Value> {
        self.record.as_ref()?.error_report.as_ref()
    }
}

/// Map a failed upload response to the error the user should see.
pub fn classify_submit_error(status: u16, url: &str, body: &str, subject: &'static str) -> NelsonError {
    match status {
        403 => NelsonError::AccessDenied { subject },
        404 | 429 | 500 => {
            let message = match serde_json::from_str::<Value>(body) {
                Ok(json @ Value::Object(_)) => json
                    .get("message")
                    .and_then(|m| m.as_str())
                    .filter(|m| !m.is_empty())
                    .unwrap_or("An internal server error occurred.")
                    .to_string(),
                _ => "An unknown error occurred".to_string(),
            };
            NelsonError::ServerMessage(message)
        }
        _ => NelsonError::Http { status, url: url.to_string() },
    }
}
