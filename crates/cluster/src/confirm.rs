use async_trait::async_trait;
use std::io::{BufRead, Write};
use std::time::Duration;

/// Gate in front of destructive or long-running workflows. `false` means the
/// caller must stop without side effects and without raising.
#[async_trait]
pub trait Confirmation: Send + Sync {
    async fn confirm(&self, prompt: &str) -> bool;
}

/// Asks on the terminal and waits at most `timeout` for an answer. Only an
/// explicit yes proceeds; silence is a decline.
#[derive(Debug, Clone)]
pub struct PromptConfirmation {
    timeout: Duration,
}

impl PromptConfirmation {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl Confirmation for PromptConfirmation {
    async fn confirm(&self, prompt: &str) -> bool {
        log::debug!("Awaiting confirmation: {prompt}");
        print!("{prompt} (timeout: {}s) [y/N] ", self.timeout.as_secs());
        let _ = std::io::stdout().flush();

        // A plain thread rather than tokio's stdin: an abandoned blocking read
        // would otherwise hold the runtime open at exit.
        let (tx, rx) = tokio::sync::oneshot::channel();
        std::thread::spawn(move || {
            let mut line = String::new();
            let read = std::io::stdin().lock().read_line(&mut line);
            let _ = tx.send(read.map(|_| line));
        });

        match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(Ok(answer))) if is_affirmative(&answer) => true,
            Ok(_) => {
                log::warn!("Action aborted by user");
                false
            }
            Err(_) => {
                println!();
                log::warn!("No answer within {}s, action aborted", self.timeout.as_secs());
                false
            }
        }
    }
}

/// Non-interactive approval (`--yes`).
#[derive(Debug, Clone, Copy, Default)]
pub struct AssumeYes;

#[async_trait]
impl Confirmation for AssumeYes {
    async fn confirm(&self, prompt: &str) -> bool {
        log::info!("{prompt} (confirmed by --yes)");
        true
    }
}

pub fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
