// Terminal prompt for the interactive logins

use dialoguer::{Confirm, Input, Password};

use nelson_client::{NelsonError, Prompt, Result};

/// Reads answers from the controlling terminal. Notices go to stderr so
/// stdout stays clean for results.
pub struct TerminalPrompt;

fn prompt_error(e: dialoguer::Error) -> NelsonError {
    NelsonError::Prompt(e.to_string())
}

impl Prompt for TerminalPrompt {
    fn notice(&mut self, message: &str) {
        eprintln!("{}", message);
    }

    fn input(&mut self, label: &str) -> Result<String> {
        Input::<String>::new()
            .with_prompt(label)
            .interact_text()
            .map_err(prompt_error)
    }

    fn password(&mut self, label: &str) -> Result<String> {
        Password::new().with_prompt(label).interact().map_err(prompt_error)
    }

    fn confirm(&mut self, question: &str) -> Result<bool> {
        Confirm::new()
            .with_prompt(question)
            .default(false)
            .interact()
            .map_err(prompt_error)
    }
}
