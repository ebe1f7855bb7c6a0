use quire_engine::render::{Clipboard, ClipboardError};

/// The desktop clipboard. Opened on first use so a headless session can
/// still edit; copying then reports the clipboard as unavailable.
#[derive(Default)]
pub struct SystemClipboard {
    inner: Option<arboard::Clipboard>,
}

impl Clipboard for SystemClipboard {
    fn write_text(&mut self, text: &str) -> Result<(), ClipboardError> {
        let mut clipboard = match self.inner.take() {
            Some(clipboard) => clipboard,
            None => arboard::Clipboard::new().map_err(|e| ClipboardError::Unavailable(e.to_string()))?,
        };
        let result = clipboard
            .set_text(text)
            .map_err(|e| ClipboardError::Unavailable(e.to_string()));
        self.inner = Some(clipboard);
        result
    }
}
