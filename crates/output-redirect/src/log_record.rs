use serde::{Deserialize, Serialize};

/// One captured line. Field order is the on-disk key order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    pub index: u64,
    pub level: u32,
    pub step: u64,
    pub text: String,
}

impl LogRecord {
    pub fn new(text: &str, level: u32, step: u64, index: u64) -> Self {
        Self {
            index,
            level,
            step,
            text: sanitize_text(text),
        }
    }

    /// Human readable form written to the console, newline terminated.
    pub fn console_line(&self) -> String {
        format!(
            "{}-{} [{}] {}\n",
            self.level, self.step, self.index, self.text
        )
    }
}

/// Drops embedded line breaks and trailing whitespace.
pub fn sanitize_text(text: &str) -> String {
    let mut out: String = text.chars().filter(|c| !matches!(c, '\r' | '\n')).collect();
    out.truncate(out.trim_end().len());
    out
}

/// Decodes captured bytes, substituting U+FFFD for invalid sequences.
pub fn decode_lossy(buf: &[u8]) -> String {
    String::from_utf8_lossy(buf).into_owned()
}
