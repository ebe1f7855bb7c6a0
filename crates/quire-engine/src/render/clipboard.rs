use std::time::{Duration, Instant};

/// The system clipboard. Copy actions only ever write plain text.
pub trait Clipboard {
    fn write_text(&mut self, text: &str) -> Result<(), ClipboardError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClipboardError {
    #[error("Clipboard unavailable: {0}")]
    Unavailable(String),
}

/// Clipboard kept in memory, for headless hosts and tests.
#[derive(Debug, Default)]
pub struct MemoryClipboard {
    pub contents: Option<String>,
}

impl Clipboard for MemoryClipboard {
    fn write_text(&mut self, text: &str) -> Result<(), ClipboardError> {
        self.contents = Some(text.to_string());
        Ok(())
    }
}

/// Transient "copied" acknowledgment. Every copy restarts the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CopyFeedback {
    duration: Duration,
    until: Option<Instant>,
}

impl CopyFeedback {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            until: None,
        }
    }

    pub fn start(&mut self, now: Instant) {
        self.until = Some(now + self.duration);
    }

    pub fn is_active(&self, now: Instant) -> bool {
        self.until.is_some_and(|until| now < until)
    }
}
