//! Clipboard adapter using the OSC 52 terminal escape sequence.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use console_relay_ports::ClipboardPort;
use console_relay_shared::{ErrorEnvelope, Result};
use std::io::Write;
use std::sync::{Mutex, PoisonError};

/// Copies text by asking the terminal to set its clipboard selection.
///
/// The sequence is `ESC ] 52 ; c ; <base64> BEL`. Terminals that do not
/// support OSC 52 ignore it, so a successful write does not guarantee the
/// clipboard changed.
pub struct Osc52Clipboard {
    target: Mutex<Box<dyn Write + Send>>,
}

impl Osc52Clipboard {
    /// Write escape sequences to stdout.
    #[must_use]
    pub fn stdout() -> Self {
        Self::with_writer(Box::new(std::io::stdout()))
    }

    /// Write escape sequences to an arbitrary writer.
    #[must_use]
    pub fn with_writer(target: Box<dyn Write + Send>) -> Self {
        Self {
            target: Mutex::new(target),
        }
    }
}

impl std::fmt::Debug for Osc52Clipboard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Osc52Clipboard").finish_non_exhaustive()
    }
}

/// Encode `text` as an OSC 52 clipboard sequence.
#[must_use]
pub fn osc52_sequence(text: &str) -> String {
    format!("\x1b]52;c;{}\x07", STANDARD.encode(text.as_bytes()))
}

impl ClipboardPort for Osc52Clipboard {
    fn write_text(&self, text: &str) -> Result<()> {
        let sequence = osc52_sequence(text);
        let mut target = self.target.lock().unwrap_or_else(PoisonError::into_inner);
        target
            .write_all(sequence.as_bytes())
            .and_then(|()| target.flush())
            .map_err(ErrorEnvelope::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn sequence_wraps_base64_payload() {
        assert_eq!(osc52_sequence("hi"), "\x1b]52;c;aGk=\x07");
    }

    #[test]
    fn write_text_emits_sequence() -> Result<()> {
        let buffer = SharedBuffer::default();
        let clipboard = Osc52Clipboard::with_writer(Box::new(buffer.clone()));
        clipboard.write_text("trace logs")?;

        let written = buffer.0.lock().unwrap_or_else(PoisonError::into_inner).clone();
        assert_eq!(
            String::from_utf8_lossy(&written),
            osc52_sequence("trace logs")
        );
        Ok(())
    }
}
