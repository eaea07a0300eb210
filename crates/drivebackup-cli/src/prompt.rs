//! Interactive yes/no confirmation on the terminal

use std::io::{self, BufRead, IsTerminal, Write};

use drivebackup_core::ports::IConfirmation;
use tracing::warn;

/// Asks `prompt` on `output` and reads one answer line from `input`
///
/// Only `y` and `yes` (any case) count as agreement. End of input is a no.
pub fn ask(prompt: &str, input: &mut impl BufRead, output: &mut impl Write) -> io::Result<bool> {
    write!(output, "{prompt} [y/N] ")?;
    output.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(false);
    }
    let answer = line.trim().to_ascii_lowercase();
    Ok(answer == "y" || answer == "yes")
}

/// Confirmation that asks on stderr and reads stdin
///
/// The backup walk waits for the answer. Without a terminal on stdin
/// nobody can answer, so the question is declined unasked.
#[derive(Debug, Default)]
pub struct TerminalConfirmation;

impl IConfirmation for TerminalConfirmation {
    fn confirm(&self, prompt: &str) -> bool {
        let stdin = io::stdin();
        if !stdin.is_terminal() {
            warn!(prompt, "No terminal to ask on, answering no");
            return false;
        }
        let mut input = stdin.lock();
        let mut output = io::stderr();
        match ask(prompt, &mut input, &mut output) {
            Ok(answer) => answer,
            Err(e) => {
                warn!(error = %e, "Could not read answer, treating it as no");
                false
            }
        }
    }
}
