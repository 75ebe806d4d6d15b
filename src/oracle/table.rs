//! In-memory policy oracle.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tracing::trace;

use super::{NullConversation, OracleError, PolicyOracle, PolicyOutcome, PolicySession};
use crate::config::PolicyConfig;
use crate::{GateError, Result};

/// Open/close bookkeeping shared by a [`TableOracle`] and its sessions.
#[derive(Debug, Default)]
pub struct SessionCounters {
    opened: AtomicUsize,
    closed: AtomicUsize,
    checks: AtomicUsize,
    last_service: Mutex<Option<String>>,
}

impl SessionCounters {
    /// Sessions opened, including ones whose initialization failed.
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    /// Sessions released.
    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    /// Account status checks performed.
    pub fn checks(&self) -> usize {
        self.checks.load(Ordering::SeqCst)
    }

    /// Sessions opened but not yet released.
    pub fn outstanding(&self) -> usize {
        self.opened().saturating_sub(self.closed())
    }

    /// Service identity of the most recent open.
    pub fn last_service(&self) -> Option<String> {
        self.last_service.lock().ok().and_then(|s| s.clone())
    }
}

/// Oracle answering from a username -> outcome table.
#[derive(Debug)]
pub struct TableOracle {
    accounts: HashMap<String, PolicyOutcome>,
    default_outcome: PolicyOutcome,
    init_failure: Option<OracleError>,
    counters: Arc<SessionCounters>,
}

impl Default for TableOracle {
    fn default() -> Self {
        Self::new()
    }
}

impl TableOracle {
    /// Create an empty table. Unlisted accounts are unknown to the oracle.
    pub fn new() -> Self {
        Self {
            accounts: HashMap::new(),
            default_outcome: PolicyOutcome::UserUnknown,
            init_failure: None,
            counters: Arc::new(SessionCounters::default()),
        }
    }

    /// Build from the `[policy]` configuration section.
    pub fn from_config(config: &PolicyConfig) -> Result<Self> {
        let default_outcome = PolicyOutcome::parse(&config.default_outcome).ok_or_else(|| {
            GateError::Validation(format!(
                "invalid default_outcome: {}",
                config.default_outcome
            ))
        })?;

        let mut oracle = Self::new().with_default(default_outcome);
        for (username, value) in &config.accounts {
            let outcome = PolicyOutcome::parse(value).ok_or_else(|| {
                GateError::Validation(format!("invalid outcome for account {username}: {value}"))
            })?;
            oracle = oracle.with_account(username.clone(), outcome);
        }

        if config.fail_init {
            oracle = oracle.failing_init(OracleError::new(
                super::CODE_SYSTEM_ERR,
                PolicyOutcome::Other(super::CODE_SYSTEM_ERR).description(),
            ));
        }

        Ok(oracle)
    }

    /// Set the outcome for one account.
    pub fn with_account(mut self, username: impl Into<String>, outcome: PolicyOutcome) -> Self {
        self.accounts.insert(username.into(), outcome);
        self
    }

    /// Set the outcome for accounts not in the table.
    pub fn with_default(mut self, outcome: PolicyOutcome) -> Self {
        self.default_outcome = outcome;
        self
    }

    /// Make every `open` fail with `error`.
    pub fn failing_init(mut self, error: OracleError) -> Self {
        self.init_failure = Some(error);
        self
    }

    /// Replace an account's outcome in place.
    pub fn set_account(&mut self, username: impl Into<String>, outcome: PolicyOutcome) {
        self.accounts.insert(username.into(), outcome);
    }

    /// Outcome the table holds for `username`.
    pub fn lookup(&self, username: &str) -> PolicyOutcome {
        self.accounts
            .get(username)
            .copied()
            .unwrap_or(self.default_outcome)
    }

    pub fn counters(&self) -> Arc<SessionCounters> {
        Arc::clone(&self.counters)
    }
}

impl PolicyOracle for TableOracle {
    type Session = TableSession;

    fn open(
        &self,
        service: &str,
        username: &str,
        _conversation: NullConversation,
    ) -> std::result::Result<TableSession, OracleError> {
        self.counters.opened.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.counters.last_service.lock() {
            *last = Some(service.to_string());
        }

        if let Some(err) = &self.init_failure {
            // The half-open handle is released before reporting the failure.
            self.counters.closed.fetch_add(1, Ordering::SeqCst);
            return Err(err.clone());
        }

        trace!(service, username, "table session opened");
        Ok(TableSession {
            outcome: self.lookup(username),
            counters: Arc::clone(&self.counters),
            released: false,
        })
    }

    fn backend_name(&self) -> &'static str {
        "table"
    }
}

/// Session handed out by [`TableOracle`].
#[derive(Debug)]
pub struct TableSession {
    outcome: PolicyOutcome,
    counters: Arc<SessionCounters>,
    released: bool,
}

impl TableSession {
    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.counters.closed.fetch_add(1, Ordering::SeqCst);
        }
    }
}

impl PolicySession for TableSession {
    fn account_status(&mut self) -> PolicyOutcome {
        self.counters.checks.fetch_add(1, Ordering::SeqCst);
        self.outcome
    }

    fn error_string(&self, outcome: PolicyOutcome) -> String {
        outcome.description().to_string()
    }

    fn close(mut self) {
        self.release();
    }
}

impl Drop for TableSession {
    fn drop(&mut self) {
        self.release();
    }
}
