//! Interactive input, injected into the login flow.
//!
//! The CLI supplies a terminal implementation; [`ScriptedPrompt`] answers
//! from a fixed script so the authentication state machine stays
//! deterministic without a terminal.

use std::collections::VecDeque;

use crate::error::{NelsonError, Result};

pub trait Prompt {
    /// Show an informational line (e.g. "GT Login required.").
    fn notice(&mut self, _message: &str) {}

    /// Ask for a visible value such as a user name.
    fn input(&mut self, label: &str) -> Result<String>;

    /// Ask for a secret; implementations must not echo it.
    fn password(&mut self, label: &str) -> Result<String>;

    /// Ask a yes/no question. Anything but an explicit yes is a no.
    fn confirm(&mut self, question: &str) -> Result<bool>;
}

/// Prompt that replays pre-recorded answers.
#[derive(Debug, Default)]
pub struct ScriptedPrompt {
    answers: VecDeque<String>,
    confirm: bool,
    asked: Vec<String>,
}

impl ScriptedPrompt {
    /// `answers` are handed out in order to `input` and `password` calls.
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            confirm: false,
            asked: Vec::new(),
        }
    }

    /// Answer every `confirm` with `yes`.
    pub fn confirming(mut self, yes: bool) -> Self {
        self.confirm = yes;
        self
    }

    /// Labels of every question asked so far, in order.
    pub fn asked(&self) -> &[String] {
        &self.asked
    }

    fn next(&mut self, label: &str) -> Result<String> {
        self.asked.push(label.to_string());
        self.answers
            .pop_front()
            .ok_or_else(|| NelsonError::Prompt(format!("no scripted answer for '{}'", label)))
    }
}

impl Prompt for ScriptedPrompt {
    fn input(&mut self, label: &str) -> Result<String> {
        self.next(label)
    }

    fn password(&mut self, label: &str) -> Result<String> {
        self.next(label)
    }

    fn confirm(&mut self, question: &str) -> Result<bool> {
        self.asked.push(question.to_string());
        Ok(self.confirm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripted_answers_in_order() {
        let mut prompt = ScriptedPrompt::new(["alice", "hunter2"]).confirming(true);
        assert_eq!(prompt.input("Username").unwrap(), "alice");
        assert_eq!(prompt.password("Password").unwrap(), "hunter2");
        assert!(prompt.confirm("Save?").unwrap());
        assert_eq!(prompt.asked(), ["Username", "Password", "Save?"]);
    }

    #[test]
    fn running_out_of_answers_is_an_error() {
        let mut prompt = ScriptedPrompt::new(Vec::<String>::new());
        assert!(matches!(prompt.input("Email"), Err(NelsonError::Prompt(_))));
    }
}
