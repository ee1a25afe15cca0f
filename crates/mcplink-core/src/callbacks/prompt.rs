//! Interactive user input for elicitation

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin};
use tokio::sync::Mutex;

/// Source of human answers.
#[async_trait]
pub trait UserPrompt: Send + Sync {
    /// Show `message` on behalf of `peer` and read one line.
    ///
    /// `Ok(None)` means the input is closed.
    async fn ask(&self, peer: &str, message: &str) -> anyhow::Result<Option<String>>;
}

/// Prompts on stdout and reads answers from stdin.
///
/// One lock guards both the question and the answer, so concurrent peers queue up and never
/// interleave their questions.
pub struct ConsoleUserPrompt {
    input: Mutex<Lines<BufReader<Stdin>>>,
}

impl ConsoleUserPrompt {
    pub fn new() -> Self {
        Self {
            input: Mutex::new(BufReader::new(tokio::io::stdin()).lines()),
        }
    }
}

impl Default for ConsoleUserPrompt {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserPrompt for ConsoleUserPrompt {
    async fn ask(&self, peer: &str, message: &str) -> anyhow::Result<Option<String>> {
        let mut input = self.input.lock().await;

        let mut stdout = tokio::io::stdout();
        stdout
            .write_all(format!("[{peer}] {message}\n> ").as_bytes())
            .await?;
        stdout.flush().await?;

        let line = input.next_line().await?;
        Ok(line.map(|l| l.trim_end_matches('\r').to_string()))
    }
}
