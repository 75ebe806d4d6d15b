//! Test helpers shared by the integration tests.

#![allow(dead_code)]

use std::io;
use std::sync::{Arc, Mutex};

use pamgate::{LoginPolicyGate, PolicyOutcome, TableOracle};

/// Password used in every test attempt. Must never show up in logs.
pub const TEST_PASSWORD: &str = "hunter2-very-secret";

/// In-memory log sink.
#[derive(Clone, Default)]
pub struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl LogCapture {
    pub fn contents(&self) -> String {
        let buf = self.0.lock().unwrap();
        String::from_utf8_lossy(&buf).into_owned()
    }
}

impl io::Write for LogCapture {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Run `f` with a TRACE-level subscriber and return its result and the log text.
pub fn with_captured_logs<T>(f: impl FnOnce() -> T) -> (T, String) {
    let capture = LogCapture::default();
    let writer = capture.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();

    let result = tracing::subscriber::with_default(subscriber, f);
    (result, capture.contents())
}

/// Gate over a table with one account per interesting outcome.
pub fn standard_gate() -> LoginPolicyGate<TableOracle> {
    LoginPolicyGate::new(
        TableOracle::new()
            .with_account("alice", PolicyOutcome::Success)
            .with_account("mallory", PolicyOutcome::PermissionDenied)
            .with_account("olduser", PolicyOutcome::AccountExpired)
            .with_account("newpass", PolicyOutcome::Other(12)),
    )
}
