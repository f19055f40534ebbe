//! I/O seam of the VM. Natives never touch stdin/stdout directly.

use std::collections::VecDeque;
use std::io::{self, BufRead, Write};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum InteractionError {
    #[error("no more input available")]
    InputExhausted,

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

pub trait Interaction {
    /// Shows `prompt` and reads one line, without its line terminator.
    fn get_input(&mut self, prompt: &str) -> Result<String, InteractionError>;

    /// Emits one line of program output.
    fn output(&mut self, text: &str) -> Result<(), InteractionError>;
}

/// Reads stdin, writes stdout.
#[derive(Debug, Default)]
pub struct ConsoleInteraction;

impl Interaction for ConsoleInteraction {
    fn get_input(&mut self, prompt: &str) -> Result<String, InteractionError> {
        let mut stdout = io::stdout().lock();
        write!(stdout, "{}", prompt)?;
        stdout.flush()?;

        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line)? == 0 {
            return Err(InteractionError::InputExhausted);
        }

        let trimmed = line.trim_end_matches(['\n', '\r']).len();
        line.truncate(trimmed);
        Ok(line)
    }

    fn output(&mut self, text: &str) -> Result<(), InteractionError> {
        writeln!(io::stdout().lock(), "{}", text)?;
        Ok(())
    }
}

/// Scripted input and captured output, for tests and embedding.
#[derive(Debug, Default, Clone)]
pub struct RecordingInteraction {
    inputs: VecDeque<String>,
    prompts: Vec<String>,
    outputs: Vec<String>,
}

impl RecordingInteraction {
    pub fn new<S: Into<String>>(inputs: impl IntoIterator<Item = S>) -> Self {
        Self {
            inputs: inputs.into_iter().map(Into::into).collect(),
            prompts: Vec::new(),
            outputs: Vec::new(),
        }
    }

    pub fn outputs(&self) -> &[String] {
        &self.outputs
    }

    /// Prompts shown by `input`, in order.
    pub fn prompts(&self) -> &[String] {
        &self.prompts
    }

    pub fn remaining_inputs(&self) -> usize {
        self.inputs.len()
    }
}

impl Interaction for RecordingInteraction {
    fn get_input(&mut self, prompt: &str) -> Result<String, InteractionError> {
        self.prompts.push(prompt.to_string());
        self.inputs
            .pop_front()
            .ok_or(InteractionError::InputExhausted)
    }

    fn output(&mut self, text: &str) -> Result<(), InteractionError> {
        self.outputs.push(text.to_string());
        Ok(())
    }
}
