use std::io::Write;
use thiserror::Error;
use tracing::{debug, instrument};

use super::CopyPayload;

#[derive(Debug, Error)]
pub enum ClipboardError {
    #[error("Clipboard unavailable: {0}")]
    Unavailable(String),

    #[error("Clipboard does not accept HTML content")]
    HtmlUnsupported,

    #[error("Clipboard write failed: {0}")]
    Write(String),

    #[error("Failed to write to stdout: {0}")]
    Io(#[from] std::io::Error),
}

/// Somewhere a copy payload can be written.
pub trait ClipboardSink {
    /// Whether text and HTML can be stored together as one item.
    fn supports_html(&self) -> bool;

    /// Store both representations as one clipboard item.
    fn write_rich(&mut self, text: &str, html: &str) -> Result<(), ClipboardError>;

    fn write_text(&mut self, text: &str) -> Result<(), ClipboardError>;
}

/// Write both formats when the sink can hold them, plain text otherwise.
#[instrument(skip_all, fields(rich = sink.supports_html()))]
pub fn write_payload(sink: &mut dyn ClipboardSink, payload: &CopyPayload) -> Result<(), ClipboardError> {
    if sink.supports_html() {
        match sink.write_rich(&payload.text, &payload.html) {
            Err(ClipboardError::HtmlUnsupported) => {
                debug!("HTML clipboard format unavailable, writing plain text");
            }
            result => return result,
        }
    }
    sink.write_text(&payload.text)
}

/// The operating system clipboard.
pub struct SystemClipboard {
    inner: arboard::Clipboard,
}

impl SystemClipboard {
    pub fn open() -> Result<Self, ClipboardError> {
        let inner =
            arboard::Clipboard::new().map_err(|err| ClipboardError::Unavailable(err.to_string()))?;
        Ok(Self { inner })
    }
}

impl ClipboardSink for SystemClipboard {
    fn supports_html(&self) -> bool {
        true
    }

    fn write_rich(&mut self, text: &str, html: &str) -> Result<(), ClipboardError> {
        self.inner
            .set_html(html, Some(text))
            .map_err(|err| match err {
                arboard::Error::ClipboardNotSupported => ClipboardError::HtmlUnsupported,
                other => ClipboardError::Write(other.to_string()),
            })
    }

    fn write_text(&mut self, text: &str) -> Result<(), ClipboardError> {
        self.inner
            .set_text(text)
            .map_err(|err| ClipboardError::Write(err.to_string()))
    }
}

/// Plain-text stand-in for environments without a clipboard.
pub struct StdoutSink<W: Write> {
    out: W,
}

impl<W: Write> StdoutSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write> ClipboardSink for StdoutSink<W> {
    fn supports_html(&self) -> bool {
        false
    }

    fn write_rich(&mut self, _text: &str, _html: &str) -> Result<(), ClipboardError> {
        Err(ClipboardError::HtmlUnsupported)
    }

    fn write_text(&mut self, text: &str) -> Result<(), ClipboardError> {
        writeln!(self.out, "{text}")?;
        self.out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// In-memory sink recording what was written.
    #[derive(Default)]
    pub(crate) struct MemoryClipboard {
        pub(crate) rich: bool,
        pub(crate) html_rejected: bool,
        pub(crate) fail: bool,
        pub(crate) text: Option<String>,
        pub(crate) html: Option<String>,
    }

    impl ClipboardSink for MemoryClipboard {
        fn supports_html(&self) -> bool {
            self.rich
        }

        fn write_rich(&mut self, text: &str, html: &str) -> Result<(), ClipboardError> {
            if self.fail {
                return Err(ClipboardError::Write("permission denied".to_string()));
            }
            if self.html_rejected {
                return Err(ClipboardError::HtmlUnsupported);
            }
            self.text = Some(text.to_string());
            self.html = Some(html.to_string());
            Ok(())
        }

        fn write_text(&mut self, text: &str) -> Result<(), ClipboardError> {
            if self.fail {
                return Err(ClipboardError::Write("permission denied".to_string()));
            }
            self.text = Some(text.to_string());
            Ok(())
        }
    }

    fn payload() -> CopyPayload {
        CopyPayload {
            text: "plain".to_string(),
            html: "<b>rich</b>".to_string(),
        }
    }

    #[test]
    fn test_rich_sink_gets_both_formats() {
        let mut sink = MemoryClipboard {
            rich: true,
            ..Default::default()
        };
        write_payload(&mut sink, &payload()).unwrap();
        assert_eq!(sink.text.as_deref(), Some("plain"));
        assert_eq!(sink.html.as_deref(), Some("<b>rich</b>"));
    }

    #[test]
    fn test_plain_sink_gets_text_only() {
        let mut sink = MemoryClipboard::default();
        write_payload(&mut sink, &payload()).unwrap();
        assert_eq!(sink.text.as_deref(), Some("plain"));
        assert_eq!(sink.html, None);
    }

    #[test]
    fn test_rejected_html_degrades_to_text() {
        let mut sink = MemoryClipboard {
            rich: true,
            html_rejected: true,
            ..Default::default()
        };
        write_payload(&mut sink, &payload()).unwrap();
        assert_eq!(sink.text.as_deref(), Some("plain"));
        assert_eq!(sink.html, None);
    }

    #[test]
    fn test_write_failure_propagates() {
        let mut sink = MemoryClipboard {
            rich: true,
            fail: true,
            ..Default::default()
        };
        assert!(matches!(
            write_payload(&mut sink, &payload()),
            Err(ClipboardError::Write(_))
        ));
    }

    #[test]
    fn test_stdout_sink_writes_text_line() {
        let mut sink = StdoutSink::new(Vec::new());
        write_payload(&mut sink, &payload()).unwrap();
        assert_eq!(String::from_utf8(sink.out).unwrap(), "plain\n");
    }
}
