use std::io::Write;

use crate::json_log;
use crate::log_record::LogRecord;
use crate::redirect_state::RedirectContext;

/// Writes annotated lines to the original console and the active JSON logs.
pub struct SinkWriter<W: Write> {
    console: W,
    context: RedirectContext,
}

impl<W: Write> SinkWriter<W> {
    pub fn new(console: W, context: RedirectContext) -> Self {
        Self { console, context }
    }

    pub fn context(&self) -> &RedirectContext {
        &self.context
    }

    pub fn console(&self) -> &W {
        &self.console
    }

    pub fn into_console(self) -> W {
        self.console
    }

    /// Emits one line. Failures are logged and never returned to the writer
    /// whose output is being captured.
    pub fn emit(&mut self, text: &str, level: u32, step: u64, index: u64) {
        let record = LogRecord::new(text, level, step, index);

        if let Err(err) = self
            .console
            .write_all(record.console_line().as_bytes())
            .and_then(|()| self.console.flush())
        {
            tracing::warn!(error = %err, "console write failed");
        }

        // the lock is held across both appends so records keep the same order
        // in the session and test logs
        let state = self.context.lock();
        for path in state.json_targets() {
            if let Err(err) = json_log::append_record(path, &record) {
                tracing::warn!(path = %path.display(), error = %err, "json log append failed");
            }
        }
    }
}
