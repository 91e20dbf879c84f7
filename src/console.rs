//! Terminal implementations of the feedback capabilities.

use snplab_core::{Confirm, Notification, NotificationSink, Severity};
use std::io::{self, BufRead, Write};

/// Prints notifications to stderr so stdout stays machine-readable.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleSink;

impl NotificationSink for ConsoleSink {
    fn notify(&self, notification: Notification) {
        let label = match notification.severity {
            Severity::Success => "ok",
            Severity::Info => "info",
            Severity::Error => "error",
        };
        eprintln!("[{label}] {}", notification.message);
    }
}

/// Asks on stderr and reads `y`/`yes` from stdin. `assume_yes` skips the prompt.
#[derive(Debug, Clone, Copy)]
pub struct ConsoleConfirm {
    pub assume_yes: bool,
}

impl Confirm for ConsoleConfirm {
    fn confirm(&self, prompt: &str) -> bool {
        if self.assume_yes {
            tracing::debug!("auto-confirming: {}", prompt);
            return true;
        }
        eprint!("{prompt} [y/N] ");
        let _ = io::stderr().flush();
        let mut answer = String::new();
        if io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        is_yes(&answer)
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_explicit_yes_confirms() {
        assert!(is_yes("y\n"));
        assert!(is_yes(" YES "));
        assert!(!is_yes(""));
        assert!(!is_yes("n"));
        assert!(!is_yes("yep"));
    }

    #[test]
    fn assume_yes_skips_prompt() {
        assert!(ConsoleConfirm { assume_yes: true }.confirm("delete?"));
    }
}
