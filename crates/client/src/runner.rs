//! Drives a submission from upload to rendered result.

use std::io::Write;
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use nelson_config::settings::DEFAULT_REFRESH_TIME;

use crate::error::Result;
use crate::submission::SubmissionClient;

const SPIN_FREQ: f64 = 8.0;

/// Lower bound on the wait between two polls, in seconds.
pub const MIN_REFRESH_TIME: f64 = 0.05;
const WHEEL: [char; 4] = ['|', '/', '-', '\\'];

/// How a run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// Grading produced feedback, saved to `result_file`.
    Feedback { result_file: PathBuf },
    /// The grader failed; the report was printed.
    ErrorReport(Value),
    /// Polling finished with neither feedback nor an error report.
    Unknown,
}

/// Prints progress and results for one submission to `out`.
pub struct Runner<W> {
    out: W,
    refresh_time: f64,
    result_dir: PathBuf,
}

impl<W: Write> Runner<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            refresh_time: DEFAULT_REFRESH_TIME,
            result_dir: PathBuf::from("."),
        }
    }

    /// Seconds between polls, never less than [`MIN_REFRESH_TIME`].
    pub fn refresh_time(mut self, seconds: f64) -> Self {
        self.refresh_time = if seconds.is_finite() {
            seconds.max(MIN_REFRESH_TIME)
        } else {
            DEFAULT_REFRESH_TIME
        };
        self
    }

    /// Directory receiving result files.
    pub fn result_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.result_dir = dir.into();
        self
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn run(&mut self, submission: &mut dyn SubmissionClient) -> Result<RunOutcome> {
        writeln!(self.out, "Submission includes the following files:")?;
        for name in submission.filenames() {
            writeln!(self.out, "    {}", name)?;
        }
        writeln!(self.out)?;

        writeln!(self.out, "Uploading submission...")?;
        self.out.flush()?;
        submission.submit()?;
        writeln!(self.out, "\n")?;

        let tick = Duration::from_secs_f64(1.0 / SPIN_FREQ);
        let interval = Duration::from_secs_f64(self.refresh_time);
        let mut wheel = WHEEL.iter().cycle();
        while !submission.poll()? {
            // Spinner redraws are decoupled from the poll interval.
            let deadline = Instant::now() + interval;
            loop {
                let now = Instant::now();
                if now >= deadline {
                    break;
                }
                if let Some(c) = wheel.next() {
                    write!(self.out, "\rWaiting for results... {}", c)?;
                }
                self.out.flush()?;
                thread::sleep(tick.min(deadline - now));
            }
        }
        write!(self.out, "\rWaiting for results...Done!\n\n")?;

        writeln!(self.out, "Results:\n--------")?;
        if let Some(feedback) = submission.feedback() {
            if let Some(console) = submission.console() {
                writeln!(self.out, "{}", console)?;
            }

            let file_name = result_file_name(submission.subject_name(), Utc::now());
            let result_file = self.result_dir.join(&file_name);
            std::fs::write(&result_file, to_pretty_json(feedback)?)?;
            tracing::info!(file = %result_file.display(), "feedback saved");

            writeln!(self.out, "\n(Details available in {})\n", file_name)?;
            return Ok(RunOutcome::Feedback { result_file });
        }

        if let Some(report) = submission.error_report() {
            writeln!(self.out, "{}", to_pretty_json(report)?)?;
            return Ok(RunOutcome::ErrorReport(report.clone()));
        }

        writeln!(self.out, "Unknown error.")?;
        Ok(RunOutcome::Unknown)
    }
}

/// `<subject>-result-<YYYY-MM-DD-HH-MM-SS>.json`
pub fn result_file_name(subject: &str, at: DateTime<Utc>) -> String {
    format!("{}-result-{}.json", subject, at.format("%Y-%m-%d-%H-%M-%S"))
}

/// JSON with 4-space indentation.
pub fn to_pretty_json(value: &Value) -> Result<String> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut ser)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}
