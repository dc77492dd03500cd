//! Operator console protocol.
//!
//! Line-oriented prompts with no timeout: the operator is a deliberate
//! synchronization point for the assisted pagination loop. Prompts and
//! status lines go to stdout; tracing stays out of this channel.

use std::io::Write;

use async_trait::async_trait;

/// What the operator told us.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// Capture the currently visible page.
    Capture,
    /// No more pages; finish the collection.
    Stop,
}

impl Signal {
    /// Parse an operator line. Stop tokens are case-insensitive; any
    /// other input, including a bare ENTER, means capture.
    pub fn parse(line: &str) -> Signal {
        match line.trim().to_lowercase().as_str() {
            "fin" | "q" | "quit" | "done" => Signal::Stop,
            _ => Signal::Capture,
        }
    }
}

/// Abstract operator readiness, so the assisted loop can be driven by a
/// scripted console in tests or swapped for an automated pager later.
#[async_trait]
pub trait OperatorConsole: Send {
    /// Block until the operator answers the prompt. No timeout by design.
    async fn await_signal(&mut self, prompt: &str) -> std::io::Result<Signal>;

    /// Show a status line to the operator.
    fn notify(&self, message: &str);
}

/// The real console: prompts on stdout, answers on stdin.
pub struct StdinConsole;

#[async_trait]
impl OperatorConsole for StdinConsole {
    async fn await_signal(&mut self, prompt: &str) -> std::io::Result<Signal> {
        let prompt = prompt.to_string();
        // Blocking read moved off the runtime; it can block forever.
        tokio::task::spawn_blocking(move || {
            print!("{prompt} ");
            std::io::stdout().flush()?;
            let mut line = String::new();
            std::io::stdin().read_line(&mut line)?;
            Ok(Signal::parse(&line))
        })
        .await
        .map_err(|e| std::io::Error::other(e.to_string()))?
    }

    fn notify(&self, message: &str) {
        println!("{message}");
    }
}
