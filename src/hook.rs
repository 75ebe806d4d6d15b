//! Host login pipeline interface.
//!
//! The bouncer host resolves the username and password of an incoming client
//! and then offers the attempt to each registered [`LoginHook`]. A hook may
//! refuse the attempt and halt the pipeline, or let it continue.

use std::sync::Arc;

use tracing::error;

use crate::gate::{LoginDisposition, LoginPolicyGate};
use crate::oracle::PolicyOracle;

/// Pipeline control returned by a hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModRet {
    /// Run the remaining hooks and authentication backends.
    Continue,
    /// Stop processing this attempt.
    Halt,
}

/// A login attempt as the host presents it.
pub trait AuthAttempt {
    fn username(&self) -> &str;
    fn password(&self) -> &str;
    /// Reject the attempt, showing `message` to the client.
    fn refuse_login(&mut self, message: &str);
}

/// Host hook fired on every login attempt.
pub trait LoginHook {
    fn on_login_attempt(&self, attempt: &mut dyn AuthAttempt) -> ModRet;
}

/// Plain login attempt, for hosts without their own attempt type.
#[derive(Debug, Clone)]
pub struct LoginAttempt {
    username: String,
    password: String,
    refusal: Option<String>,
}

impl LoginAttempt {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            refusal: None,
        }
    }

    /// Message passed to `refuse_login`, if the attempt was refused.
    pub fn refusal(&self) -> Option<&str> {
        self.refusal.as_deref()
    }

    pub fn is_refused(&self) -> bool {
        self.refusal.is_some()
    }
}

impl AuthAttempt for LoginAttempt {
    fn username(&self) -> &str {
        &self.username
    }

    fn password(&self) -> &str {
        &self.password
    }

    fn refuse_login(&mut self, message: &str) {
        self.refusal = Some(message.to_string());
    }
}

impl<O: PolicyOracle> LoginHook for LoginPolicyGate<O> {
    fn on_login_attempt(&self, attempt: &mut dyn AuthAttempt) -> ModRet {
        match self.evaluate(attempt.username(), attempt.password()) {
            LoginDisposition::Continue => ModRet::Continue,
            LoginDisposition::Deny { message } => {
                attempt.refuse_login(message);
                ModRet::Halt
            }
        }
    }
}

/// Evaluate on tokio's blocking pool.
///
/// PAM modules may do file or network I/O, so async hosts should not run the
/// check on a reactor thread. If the blocking task panics the login continues,
/// like any other oracle failure.
pub async fn evaluate_blocking<O>(
    gate: Arc<LoginPolicyGate<O>>,
    username: String,
    password: String,
) -> LoginDisposition
where
    O: PolicyOracle + 'static,
{
    let task = tokio::task::spawn_blocking(move || gate.evaluate(&username, &password));
    match task.await {
        Ok(disposition) => disposition,
        Err(e) => {
            error!("PAM failure: account check task failed: {e}");
            LoginDisposition::Continue
        }
    }
}
