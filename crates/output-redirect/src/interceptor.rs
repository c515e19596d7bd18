use std::io::{self, Write};

use crate::boundary::is_boundary;
use crate::level_tracker::LevelTracker;
use crate::log_record::decode_lossy;
use crate::redirect_state::RedirectContext;
use crate::sink_writer::SinkWriter;

/// Text stream a process writes its output through once redirection is installed.
pub trait CaptureStream {
    fn write(&mut self, text: &str);
    fn flush(&mut self);
    fn is_interactive(&self) -> bool;
}

/// Replacement for stdout/stderr that annotates every line with the tracker's
/// position before handing it to the sink.
///
/// Each write is split on its own: a line spread over two writes is recorded
/// as two lines.
pub struct StreamInterceptor<T: LevelTracker, W: Write> {
    tracker: T,
    sink: SinkWriter<W>,
}

impl<T: LevelTracker, W: Write> StreamInterceptor<T, W> {
    pub fn new(tracker: T, console: W, context: RedirectContext) -> Self {
        Self {
            tracker,
            sink: SinkWriter::new(console, context),
        }
    }

    pub fn tracker(&self) -> &T {
        &self.tracker
    }

    pub fn tracker_mut(&mut self) -> &mut T {
        &mut self.tracker
    }

    pub fn context(&self) -> &RedirectContext {
        self.sink.context()
    }

    pub fn console(&self) -> &W {
        self.sink.console()
    }

    pub fn into_parts(self) -> (T, W) {
        (self.tracker, self.sink.into_console())
    }

    pub fn write_message(&mut self, message: &str) {
        if self.tracker.is_level_set() {
            self.write_in_section(message);
        } else {
            self.write_outside_section(message);
        }
    }

    // Lines written outside an annotated section sit one level below the
    // current one, or restart at level 1 on a runner banner. The level is
    // put back after every line.
    fn write_outside_section(&mut self, message: &str) {
        let boundary = is_boundary(message);
        for line in split_lines(message) {
            let level = if boundary {
                self.tracker.set_level(1)
            } else {
                self.tracker.increment_level(1)
            };
            let (step, index) = self.tracker.get_step_for_level(level);
            self.sink.emit(line, level, step, index);
            self.tracker.increment_level(-1);
        }
    }

    fn write_in_section(&mut self, message: &str) {
        let level = self.tracker.get_current_level();
        let (step, index) = self.tracker.get_current_step(level);
        if message.is_empty() {
            // a bare print() inside a test still produces a blank line
            self.sink.emit(message, level, step, index);
            return;
        }

        let mut lines = split_lines(message);
        if let Some(first) = lines.next() {
            self.sink.emit(first, level, step, index);
        }
        for line in lines {
            let (step, index) = self.tracker.get_step_for_level(level);
            self.sink.emit(line, level, step, index);
        }
    }
}

fn split_lines(message: &str) -> impl Iterator<Item = &str> {
    message.split('\n').filter(|line| !line.is_empty())
}

impl<T: LevelTracker, W: Write> CaptureStream for StreamInterceptor<T, W> {
    fn write(&mut self, text: &str) {
        self.write_message(text);
    }

    // every line is flushed as it is emitted
    fn flush(&mut self) {}

    fn is_interactive(&self) -> bool {
        false
    }
}

impl<T: LevelTracker, W: Write> Write for StreamInterceptor<T, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_message(&decode_lossy(buf));
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{CaptureStream, StreamInterceptor};
    use crate::level_tracker::{LevelCounters, LevelTracker};
    use crate::redirect_state::RedirectContext;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        SetLevel(u32),
        Increment(i32),
        CurrentStep(u32),
        StepForLevel(u32),
    }

    /// Tracker that records every mutating call. Fresh allocations return
    /// steps from 10 and indexes from 100; the current step is always (1, 1).
    #[derive(Debug, Default)]
    struct RecordingTracker {
        level_set: bool,
        level: u32,
        allocated: u64,
        calls: Vec<Call>,
    }

    impl RecordingTracker {
        fn in_section(level: u32) -> Self {
            Self {
                level_set: true,
                level,
                ..Self::default()
            }
        }
    }

    impl LevelTracker for RecordingTracker {
        fn is_level_set(&self) -> bool {
            self.level_set
        }

        fn get_current_level(&self) -> u32 {
            self.level
        }

        fn set_level(&mut self, level: u32) -> u32 {
            self.calls.push(Call::SetLevel(level));
            self.level = level;
            self.level
        }

        fn increment_level(&mut self, delta: i32) -> u32 {
            self.calls.push(Call::Increment(delta));
            self.level = self.level.saturating_add_signed(delta);
            self.level
        }

        fn get_current_step(&mut self, level: u32) -> (u64, u64) {
            self.calls.push(Call::CurrentStep(level));
            (1, 1)
        }

        fn get_step_for_level(&mut self, level: u32) -> (u64, u64) {
            self.calls.push(Call::StepForLevel(level));
            self.allocated += 1;
            (9 + self.allocated, 99 + self.allocated)
        }
    }

    fn interceptor(
        tracker: RecordingTracker,
    ) -> StreamInterceptor<RecordingTracker, Vec<u8>> {
        StreamInterceptor::new(tracker, Vec::new(), RedirectContext::default())
    }

    fn console_lines<T: LevelTracker>(interceptor: &StreamInterceptor<T, Vec<u8>>) -> Vec<String> {
        String::from_utf8_lossy(interceptor.console())
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn outside_section_lines_go_one_level_deeper() {
        let mut out = interceptor(RecordingTracker {
            level: 2,
            ..RecordingTracker::default()
        });
        out.write_message("collected 2 items\nrunning\n");

        assert_eq!(
            console_lines(&out),
            vec!["3-10 [100] collected 2 items", "3-11 [101] running"]
        );
        assert_eq!(
            out.tracker().calls,
            vec![
                Call::Increment(1),
                Call::StepForLevel(3),
                Call::Increment(-1),
                Call::Increment(1),
                Call::StepForLevel(3),
                Call::Increment(-1),
            ]
        );
        assert_eq!(out.tracker().get_current_level(), 2);
    }

    #[test]
    fn outside_section_banner_resets_to_level_one() {
        let mut out = interceptor(RecordingTracker::default());
        out.write_message("====== test session starts ======\n");

        assert_eq!(
            console_lines(&out),
            vec!["1-10 [100] ====== test session starts ======"]
        );
        assert_eq!(
            out.tracker().calls,
            vec![Call::SetLevel(1), Call::StepForLevel(1), Call::Increment(-1)]
        );
        assert_eq!(out.tracker().get_current_level(), 0);
    }

    #[test]
    fn banner_classification_applies_to_every_line_of_the_write() {
        let mut out = interceptor(RecordingTracker::default());
        out.write_message("platform linux\n------ setup begin ------");

        assert_eq!(
            console_lines(&out),
            vec!["1-10 [100] platform linux", "1-11 [101] ------ setup begin ------"]
        );
        assert_eq!(out.tracker().calls[0], Call::SetLevel(1));
        assert_eq!(out.tracker().calls[3], Call::SetLevel(1));
    }

    #[test]
    fn outside_section_empty_writes_emit_nothing() {
        let mut out = interceptor(RecordingTracker::default());
        out.write_message("");
        out.write_message("\n");
        out.write_message("\n\n");
        assert!(out.console().is_empty());
        assert!(out.tracker().calls.is_empty());
    }

    #[test]
    fn level_is_restored_after_every_outside_write() {
        let mut out = interceptor(RecordingTracker::default());
        for message in ["a", "b\nc\n", "\n", "x\n\ny", "====== begin ======"] {
            let before = out.tracker().get_current_level();
            out.write_message(message);
            assert_eq!(out.tracker().get_current_level(), before, "after {message:?}");
        }
    }

    #[test]
    fn in_section_empty_message_emits_blank_record() {
        let mut out = interceptor(RecordingTracker::in_section(2));
        out.write_message("");

        assert_eq!(console_lines(&out), vec!["2-1 [1] "]);
        assert_eq!(out.tracker().calls, vec![Call::CurrentStep(2)]);
    }

    #[test]
    fn in_section_multi_line_allocates_after_first_line() {
        let mut out = interceptor(RecordingTracker::in_section(3));
        out.write_message("a\nb\nc");

        assert_eq!(
            console_lines(&out),
            vec!["3-1 [1] a", "3-10 [100] b", "3-11 [101] c"]
        );
        assert_eq!(
            out.tracker().calls,
            vec![
                Call::CurrentStep(3),
                Call::StepForLevel(3),
                Call::StepForLevel(3),
            ]
        );
        assert_eq!(out.tracker().get_current_level(), 3);
    }

    #[test]
    fn in_section_newline_only_write_emits_nothing() {
        let mut out = interceptor(RecordingTracker::in_section(1));
        out.write_message("\n");
        assert!(out.console().is_empty());
        assert_eq!(out.tracker().calls, vec![Call::CurrentStep(1)]);
    }

    #[test]
    fn in_section_banner_does_not_touch_level() {
        let mut out = interceptor(RecordingTracker::in_section(4));
        out.write_message("====== 1 passed ======\n");
        assert_eq!(console_lines(&out), vec!["4-1 [1] ====== 1 passed ======"]);
        assert_eq!(out.tracker().calls, vec![Call::CurrentStep(4)]);
    }

    #[test]
    fn split_writes_become_separate_lines() {
        let mut out = interceptor(RecordingTracker::in_section(1));
        out.write_message("partial ");
        out.write_message("line\n");
        assert_eq!(console_lines(&out), vec!["1-1 [1] partial", "1-1 [1] line"]);
    }

    #[test]
    fn io_write_decodes_lossily_and_reports_full_length() {
        use std::io::Write;

        let mut out = interceptor(RecordingTracker::in_section(1));
        let written = match Write::write(&mut out, b"bad \xff byte\n") {
            Ok(n) => n,
            Err(err) => panic!("write failed: {err}"),
        };
        assert_eq!(written, 11);
        assert_eq!(console_lines(&out), vec!["1-1 [1] bad \u{FFFD} byte"]);
        assert!(Write::flush(&mut out).is_ok());
    }

    #[test]
    fn capture_stream_is_never_interactive() {
        let mut out = interceptor(RecordingTracker::in_section(1));
        CaptureStream::write(&mut out, "via trait");
        CaptureStream::flush(&mut out);
        assert!(!out.is_interactive());
        assert_eq!(console_lines(&out), vec!["1-1 [1] via trait"]);
    }

    #[test]
    fn works_with_reference_tracker() {
        let mut counters = LevelCounters::new();
        let mut out = StreamInterceptor::new(&mut counters, Vec::<u8>::new(), RedirectContext::default());
        out.write_message("outside\n");
        out.tracker_mut().enter_level(2);
        out.write_message("inside\nsecond");
        let (_, console) = out.into_parts();

        assert_eq!(
            String::from_utf8_lossy(&console),
            "1-1 [1] outside\n2-1 [2] inside\n2-2 [3] second\n"
        );
        assert_eq!(counters.last_index(), 3);
    }
}
