//! Login policy gate.
//!
//! On every login attempt the gate asks the account policy oracle whether the
//! account may use the bouncer. Only an explicit "permission denied" or
//! "account expired" stops the login. Oracle trouble of any kind is logged and
//! the login continues to the remaining authentication checks.

use tracing::{debug, error};

use crate::oracle::{OracleError, PolicyOracle, PolicyOutcome, PolicySession, NULL_CONVERSATION};

/// Target of every decision log record.
pub const LOG_TARGET: &str = "pamaccess";

/// Service identity sessions are opened under.
pub const SERVICE_NAME: &str = "znc";

/// Message shown to a user whose login is refused.
pub const DENIAL_MESSAGE: &str = "You do not have access to this service. Contact your administrator if\n you believe this to be an error.";

/// What the host should do with a login attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginDisposition {
    /// Let the remaining authentication checks decide.
    Continue,
    /// Reject the login with `message`.
    Deny { message: &'static str },
}

impl LoginDisposition {
    pub fn is_deny(&self) -> bool {
        matches!(self, Self::Deny { .. })
    }

    /// Refusal message, if the login is denied.
    pub fn message(&self) -> Option<&'static str> {
        match *self {
            Self::Deny { message } => Some(message),
            Self::Continue => None,
        }
    }
}

/// Detailed result of an account check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Assessment {
    /// The oracle allows the account.
    Allowed,
    /// The oracle refuses the account (permission denied or expired).
    Denied(PolicyOutcome),
    /// The oracle replied with something that is neither allow nor deny.
    NoOpinion {
        outcome: PolicyOutcome,
        reason: String,
    },
    /// The oracle session could not be opened.
    Unavailable(OracleError),
}

impl Assessment {
    /// Collapse to the host-facing disposition. Only `Denied` stops a login.
    pub fn disposition(&self) -> LoginDisposition {
        match self {
            Assessment::Denied(_) => LoginDisposition::Deny {
                message: DENIAL_MESSAGE,
            },
            _ => LoginDisposition::Continue,
        }
    }
}

/// Account policy gate over an oracle.
#[derive(Debug)]
pub struct LoginPolicyGate<O> {
    oracle: O,
    service: String,
}

impl<O: PolicyOracle> LoginPolicyGate<O> {
    /// Create a gate using the default service identity.
    pub fn new(oracle: O) -> Self {
        Self::with_service(oracle, SERVICE_NAME)
    }

    /// Create a gate opening sessions under `service`.
    pub fn with_service(oracle: O, service: impl Into<String>) -> Self {
        Self {
            oracle,
            service: service.into(),
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    /// Decide a login attempt.
    ///
    /// The password is accepted for interface symmetry with the host but is
    /// never inspected, logged or stored: credential checking happens
    /// elsewhere, this gate only answers whether the account may proceed.
    pub fn evaluate(&self, username: &str, _password: &str) -> LoginDisposition {
        self.assess(username).disposition()
    }

    /// Run the account check and report the detailed result.
    pub fn assess(&self, username: &str) -> Assessment {
        let mut session = match self.oracle.open(&self.service, username, NULL_CONVERSATION) {
            Ok(session) => session,
            Err(err) => {
                // Other authentication backends may still apply, so never halt here.
                error!(target: LOG_TARGET, code = err.code, "PAM failure: {}", err.message);
                return Assessment::Unavailable(err);
            }
        };

        let outcome = session.account_status();
        let assessment = match outcome {
            PolicyOutcome::Success => {
                debug!(target: LOG_TARGET, "User {username} allowed access");
                Assessment::Allowed
            }
            PolicyOutcome::PermissionDenied | PolicyOutcome::AccountExpired => {
                debug!(target: LOG_TARGET, "User {username} denied access ({outcome})");
                Assessment::Denied(outcome)
            }
            _ => {
                let reason = session.error_string(outcome);
                error!(target: LOG_TARGET, code = outcome.code(), "PAM failure: {reason}");
                debug!(target: LOG_TARGET, "Warning: {username} caused PAM to reply: {reason}");
                Assessment::NoOpinion { outcome, reason }
            }
        };

        session.close();
        assessment
    }
}
