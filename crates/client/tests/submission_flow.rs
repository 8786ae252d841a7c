//! Upload, poll and render against a mock grading service.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use httpmock::prelude::*;
use serde_json::json;

use nelson_client::{
    NelsonError, ProgressReporter, ProjectTarget, QuizTarget, RunOutcome, Runner, Session,
    Submission, SubmissionClient, SubmissionRequest,
};

const SUBMIT_PATH: &str = "/student/course/cs101/quiz/q1/submission";

struct Workspace {
    dir: tempfile::TempDir,
    files: Vec<PathBuf>,
}

impl Workspace {
    /// Two 1 KiB files under `<tmp>/work`.
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let work = dir.path().join("work");
        fs::create_dir_all(work.join("src")).unwrap();

        let mut files = Vec::new();
        for name in ["main.py", "src/helper.py"] {
            let path = work.join(name);
            let mut f = fs::File::create(&path).unwrap();
            f.write_all(&[b'x'; 1024]).unwrap();
            files.push(path);
        }
        Self { dir, files }
    }

    fn root(&self) -> PathBuf {
        self.dir.path().join("work")
    }

    fn archive(&self) -> PathBuf {
        self.dir.path().join("student.zip")
    }

    fn request(&self) -> SubmissionRequest {
        SubmissionRequest::new(self.files.clone())
            .root(self.root())
            .archive_path(self.archive())
    }
}

fn quiz(server: &MockServer, ws: &Workspace) -> Submission<QuizTarget> {
    let session = Session::with_token(server.base_url(), "jwt").unwrap();
    let target = QuizTarget::new(server.base_url(), "cs101", "q1");
    Submission::new(session, target, ws.request())
}

fn archive_names(path: &Path) -> Vec<String> {
    let zip = zip::ZipArchive::new(fs::File::open(path).unwrap()).unwrap();
    let mut names: Vec<String> = zip.file_names().map(String::from).collect();
    names.sort();
    names
}

#[test]
fn submit_uploads_archive_and_reports_progress() {
    let server = MockServer::start();
    let upload = server.mock(|when, then| {
        when.method(POST).path(SUBMIT_PATH).header("authorization", "Bearer jwt");
        then.status(201).json_body(json!({"id": "abc"}));
    });

    let ws = Workspace::new();
    let calls = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&calls);
    let reporter: Arc<dyn ProgressReporter> =
        Arc::new(move |sent: u64, total: u64| sink.lock().unwrap().push((sent, total)));

    let mut sub = quiz(&server, &ws).with_progress(reporter);
    sub.submit().unwrap();

    upload.assert();
    assert_eq!(sub.record().unwrap().id, "abc");
    assert_eq!(archive_names(&ws.archive()), ["main.py", "src/helper.py"]);

    let size = fs::metadata(ws.archive()).unwrap().len();
    let calls = calls.lock().unwrap();
    assert!(!calls.is_empty());
    assert_eq!(*calls.last().unwrap(), (size, size));
}

#[test]
fn submit_403_is_access_denied() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path(SUBMIT_PATH);
        then.status(403);
    });

    let ws = Workspace::new();
    let err = quiz(&server, &ws).submit().unwrap_err();
    assert_eq!(err.to_string(), "You don't have access to this quiz.");
}

#[test]
fn submit_429_carries_server_message() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path(SUBMIT_PATH);
        then.status(429).json_body(json!({"message": "quota exceeded"}));
    });

    let ws = Workspace::new();
    let err = quiz(&server, &ws).submit().unwrap_err();
    assert!(matches!(&err, NelsonError::ServerMessage(m) if m == "quota exceeded"));
}

#[test]
fn submit_429_without_json_uses_fallback() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path(SUBMIT_PATH);
        then.status(429).body("Too Many Requests");
    });

    let ws = Workspace::new();
    let err = quiz(&server, &ws).submit().unwrap_err();
    assert_eq!(err.to_string(), "An unknown error occurred");
}

#[test]
fn escaping_file_is_rejected_before_upload() {
    let server = MockServer::start();
    let upload = server.mock(|when, then| {
        when.method(POST).path(SUBMIT_PATH);
        then.status(201).json_body(json!({"id": "abc"}));
    });

    let ws = Workspace::new();
    let outside = ws.dir.path().join("secret.txt");
    fs::write(&outside, "do not send").unwrap();

    let session = Session::with_token(server.base_url(), "jwt").unwrap();
    let request = SubmissionRequest::new([ws.root().join("..").join("secret.txt")])
        .root(ws.root())
        .archive_path(ws.archive());
    let mut sub = Submission::new(session, QuizTarget::new(server.base_url(), "cs101", "q1"), request);

    assert!(matches!(sub.submit(), Err(NelsonError::PathEscape { .. })));
    assert!(!ws.archive().exists());
    upload.assert_calls(0);
}

#[test]
fn poll_before_submit_fails() {
    let server = MockServer::start();
    let ws = Workspace::new();
    assert!(matches!(quiz(&server, &ws).poll(), Err(NelsonError::NotSubmitted)));
}

#[test]
fn poll_turns_true_once_grading_finishes() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/student/nanodegree/nd000/project/p1/submission");
        then.status(201).json_body(json!({"id": 17}));
    });
    let poll_path = "/student/nanodegree/nd000/project/p1/submission/17";
    let mut pending = server.mock(|when, then| {
        when.method(GET).path(poll_path);
        then.status(200)
            .json_body(json!({"id": 17, "feedback": null, "console": null, "error_report": null}));
    });

    let ws = Workspace::new();
    let session = Session::with_token(server.base_url(), "jwt").unwrap();
    let target = ProjectTarget::new(server.base_url(), "nd000", "p1");
    let mut sub = Submission::new(session, target, ws.request());

    sub.submit().unwrap();
    assert!(!sub.poll().unwrap());
    assert!(sub.feedback().is_none());

    pending.delete();
    server.mock(|when, then| {
        when.method(GET).path(poll_path);
        then.status(200).json_body(
            json!({"id": 17, "feedback": null, "console": "trace", "error_report": {"error": "timeout"}}),
        );
    });

    assert!(sub.poll().unwrap());
    assert_eq!(sub.error_report(), Some(&json!({"error": "timeout"})));
    assert_eq!(sub.console(), Some("trace"));
}

#[test]
fn poll_http_error_is_not_downgraded() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path(SUBMIT_PATH);
        then.status(201).json_body(json!({"id": "abc"}));
    });
    server.mock(|when, then| {
        when.method(GET).path(format!("{}/abc", SUBMIT_PATH));
        then.status(503);
    });

    let ws = Workspace::new();
    let mut sub = quiz(&server, &ws);
    sub.submit().unwrap();
    assert!(matches!(sub.poll(), Err(NelsonError::Http { status: 503, .. })));
}

#[test]
fn runner_end_to_end() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path(SUBMIT_PATH);
        then.status(201).json_body(json!({"id": "abc"}));
    });
    let poll = server.mock(|when, then| {
        when.method(GET).path(format!("{}/abc", SUBMIT_PATH));
        then.status(200).json_body(
            json!({"id": "abc", "feedback": {"points": 5}, "console": "ok", "error_report": null}),
        );
    });

    let ws = Workspace::new();
    let results = ws.dir.path().join("results");
    fs::create_dir(&results).unwrap();

    let mut sub = quiz(&server, &ws);
    let mut runner = Runner::new(Vec::new()).refresh_time(0.0).result_dir(&results);
    let outcome = runner.run(&mut sub).unwrap();
    let out = String::from_utf8(runner.into_inner()).unwrap();

    poll.assert_calls(1);
    assert!(out.contains("Results:\n--------\nok\n"));

    let RunOutcome::Feedback { result_file } = outcome else {
        panic!("expected feedback, got {:?}", outcome);
    };
    assert!(result_file.starts_with(&results));
    let saved: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&result_file).unwrap()).unwrap();
    assert_eq!(saved, json!({"points": 5}));
}
