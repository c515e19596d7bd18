use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::config::ResolvedSettings;
use crate::error::{RedirectError, Result};
use crate::interceptor::StreamInterceptor;
use crate::json_log;
use crate::level_tracker::LevelTracker;

pub const SESSION_FILE_NAME: &str = "session.json";
pub const TEST_FILE_NAME: &str = "log.json";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RedirectState {
    pub redirect: bool,
    pub json_log: bool,
    pub debug: bool,
    pub root_dir: Option<PathBuf>,
    pub session_file: Option<PathBuf>,
    pub test_file: Option<PathBuf>,
}

impl RedirectState {
    /// Files a captured line is appended to, session log first.
    pub fn json_targets(&self) -> Vec<&Path> {
        if !self.json_log {
            return Vec::new();
        }
        self.session_file
            .iter()
            .chain(self.test_file.iter())
            .map(PathBuf::as_path)
            .collect()
    }
}

/// Shared handle on the redirection state of one test session.
///
/// Runner hooks drive the lifecycle through this handle while the interceptor
/// created from it reads the active log paths on every line.
#[derive(Debug, Clone, Default)]
pub struct RedirectContext {
    state: Arc<Mutex<RedirectState>>,
}

impl RedirectContext {
    pub fn new(state: RedirectState) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Session start: creates the root directory and an empty session log
    /// when JSON logging is on.
    pub fn start_session(settings: &ResolvedSettings) -> Result<Self> {
        let mut state = RedirectState {
            redirect: settings.redirect,
            json_log: settings.json_log,
            debug: settings.debug,
            root_dir: settings.root_dir.clone(),
            session_file: None,
            test_file: None,
        };
        debug_event(
            &state,
            &format!(
                "JSON logging is {}abled",
                if state.json_log { "en" } else { "dis" }
            ),
        );

        if state.json_log {
            let root = state
                .root_dir
                .clone()
                .ok_or(RedirectError::MissingRootDir)?;
            if !root.exists() {
                debug_event(&state, &format!("Creating directories {}", root.display()));
            }
            std::fs::create_dir_all(&root).map_err(|err| RedirectError::io(&root, err))?;
            let session_file = root.join(SESSION_FILE_NAME);
            json_log::create_empty(&session_file)?;
            debug_event(
                &state,
                &format!("Session log file {}", session_file.display()),
            );
            state.session_file = Some(session_file);
        }

        Ok(Self::new(state))
    }

    /// Per-test setup: (re)creates `<root>/<module>/<test>/log.json` empty and
    /// makes it the active test log. Returns `None` when JSON logging is off.
    pub fn begin_test(&self, module: &str, test: &str) -> Result<Option<PathBuf>> {
        let mut state = self.lock();
        debug_event(
            &state,
            &format!("Creating log file for module {module}, test function {test}"),
        );
        if !state.json_log {
            return Ok(None);
        }
        if state.session_file.is_none() {
            return Err(RedirectError::NoActiveSession);
        }
        let root = state.root_dir.clone().ok_or(RedirectError::MissingRootDir)?;
        let test_dir = root.join(module).join(test);
        debug_event(
            &state,
            &format!("Path to test directory: {}", test_dir.display()),
        );
        let test_file = test_dir.join(TEST_FILE_NAME);
        json_log::create_empty(&test_file)?;
        state.test_file = Some(test_file.clone());
        Ok(Some(test_file))
    }

    /// Per-test teardown: stops writing to the test log. The file stays on disk.
    pub fn end_test(&self) {
        let mut state = self.lock();
        debug_event(&state, "Last teardown message, closing test log");
        state.test_file = None;
    }

    /// Session end: later lines only reach the console.
    pub fn finish_session(&self) {
        let mut state = self.lock();
        debug_event(&state, "Session finished");
        state.test_file = None;
        state.session_file = None;
    }

    pub fn snapshot(&self) -> RedirectState {
        self.lock().clone()
    }

    /// Builds the interceptor to install in place of stdout/stderr, or `None`
    /// when redirection is disabled.
    pub fn interceptor<T, W>(&self, tracker: T, console: W) -> Option<StreamInterceptor<T, W>>
    where
        T: LevelTracker,
        W: Write,
    {
        if !self.lock().redirect {
            return None;
        }
        Some(StreamInterceptor::new(tracker, console, self.clone()))
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, RedirectState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

fn debug_event(state: &RedirectState, message: &str) {
    if state.debug {
        tracing::debug!(target: "output_redirect::redirect", "{message}");
    }
}
