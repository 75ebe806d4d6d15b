//! Account policy oracle abstraction.
//!
//! The oracle is the external service that decides whether an account may use
//! the bouncer (expired, locked, access-restricted). The production backend is
//! PAM's account management stack; [`TableOracle`] answers from an in-memory
//! table and doubles as a test fake.
//!
//! Result codes follow Linux-PAM numbering.

#[cfg(feature = "pam")]
mod pam;
mod table;

#[cfg(feature = "pam")]
pub use pam::{PamOracle, PamSession};
pub use table::{SessionCounters, TableOracle, TableSession};

use std::fmt;

use thiserror::Error;

use crate::config::{Backend, PolicyConfig};
use crate::Result;

/// `PAM_SUCCESS`
pub const CODE_SUCCESS: i32 = 0;
/// `PAM_SYSTEM_ERR`
pub const CODE_SYSTEM_ERR: i32 = 4;
/// `PAM_PERM_DENIED`
pub const CODE_PERM_DENIED: i32 = 6;
/// `PAM_AUTH_ERR`
pub const CODE_AUTH_ERR: i32 = 7;
/// `PAM_AUTHINFO_UNAVAIL`
pub const CODE_AUTHINFO_UNAVAIL: i32 = 9;
/// `PAM_USER_UNKNOWN`
pub const CODE_USER_UNKNOWN: i32 = 10;
/// `PAM_NEW_AUTHTOK_REQD`
pub const CODE_NEW_AUTHTOK_REQD: i32 = 12;
/// `PAM_ACCT_EXPIRED`
pub const CODE_ACCT_EXPIRED: i32 = 13;

/// Result of an account status check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PolicyOutcome {
    /// The account may use the service.
    Success,
    /// Access to the service is restricted for this account.
    PermissionDenied,
    /// The account has expired.
    AccountExpired,
    /// The oracle does not know the account.
    UserUnknown,
    /// Any other oracle reply, including service and connection failures.
    Other(i32),
}

impl PolicyOutcome {
    /// Map a raw oracle result code.
    pub fn from_code(code: i32) -> Self {
        match code {
            CODE_SUCCESS => Self::Success,
            CODE_PERM_DENIED => Self::PermissionDenied,
            CODE_ACCT_EXPIRED => Self::AccountExpired,
            CODE_USER_UNKNOWN => Self::UserUnknown,
            other => Self::Other(other),
        }
    }

    /// Raw oracle result code.
    pub fn code(self) -> i32 {
        match self {
            Self::Success => CODE_SUCCESS,
            Self::PermissionDenied => CODE_PERM_DENIED,
            Self::AccountExpired => CODE_ACCT_EXPIRED,
            Self::UserUnknown => CODE_USER_UNKNOWN,
            Self::Other(code) => code,
        }
    }

    /// Whether this outcome must stop the login.
    pub fn is_denial(self) -> bool {
        matches!(self, Self::PermissionDenied | Self::AccountExpired)
    }

    /// Parse an outcome name as written in configuration.
    ///
    /// Accepts `success`, `denied`, `expired`, `unknown` (case-insensitive)
    /// or a raw integer code.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        match s.to_lowercase().as_str() {
            "success" | "allowed" => Some(Self::Success),
            "denied" | "perm_denied" => Some(Self::PermissionDenied),
            "expired" | "acct_expired" => Some(Self::AccountExpired),
            "unknown" | "user_unknown" => Some(Self::UserUnknown),
            _ => s.parse::<i32>().ok().map(Self::from_code),
        }
    }

    /// Human-readable text for this outcome, as Linux-PAM's `pam_strerror`
    /// phrases it.
    pub fn description(self) -> &'static str {
        match self.code() {
            CODE_SUCCESS => "Success",
            1 => "Failed to load module",
            3 => "Error in service module",
            CODE_SYSTEM_ERR => "System error",
            5 => "Memory buffer error",
            CODE_PERM_DENIED => "Permission denied",
            CODE_AUTH_ERR => "Authentication failure",
            CODE_AUTHINFO_UNAVAIL => "Authentication service cannot retrieve authentication info",
            CODE_USER_UNKNOWN => "User not known to the underlying authentication module",
            CODE_NEW_AUTHTOK_REQD => "Authentication token is no longer valid; new one required",
            CODE_ACCT_EXPIRED => "User account has expired",
            19 => "Conversation error",
            25 => "The return value should be ignored by PAM dispatch",
            26 => "Critical error - immediate abort",
            _ => "Unknown PAM error",
        }
    }
}

impl fmt::Display for PolicyOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::PermissionDenied => write!(f, "permission denied"),
            Self::AccountExpired => write!(f, "account expired"),
            Self::UserUnknown => write!(f, "user unknown"),
            Self::Other(code) => write!(f, "code {code}"),
        }
    }
}

/// Failure to open a policy session.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message} (code {code})")]
pub struct OracleError {
    /// Raw oracle result code.
    pub code: i32,
    /// The oracle's own text for the failure.
    pub message: String,
}

impl OracleError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Conversation handler that never answers a prompt.
///
/// The gate only performs the authorization step; credentials are verified
/// elsewhere, so the oracle is never allowed to prompt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NullConversation;

/// The conversation every gate session is opened with.
pub const NULL_CONVERSATION: NullConversation = NullConversation;

/// One open interaction with the oracle.
///
/// Implementations release their underlying handle exactly once, either in
/// [`PolicySession::close`] or on drop if `close` was never reached.
pub trait PolicySession {
    /// Run the account management check.
    fn account_status(&mut self) -> PolicyOutcome;

    /// The oracle's text for `outcome`.
    fn error_string(&self, outcome: PolicyOutcome) -> String;

    /// Release the session.
    fn close(self);
}

/// Factory for policy sessions.
pub trait PolicyOracle: Send + Sync {
    type Session: PolicySession;

    /// Open a session for `username` under the `service` identity.
    fn open(
        &self,
        service: &str,
        username: &str,
        conversation: NullConversation,
    ) -> std::result::Result<Self::Session, OracleError>;

    /// Short backend name for status output.
    fn backend_name(&self) -> &'static str;
}

/// The oracle selected by configuration.
#[derive(Debug)]
pub enum ConfiguredOracle {
    Table(TableOracle),
    #[cfg(feature = "pam")]
    Pam(PamOracle),
}

/// Session of a [`ConfiguredOracle`].
#[derive(Debug)]
pub enum ConfiguredSession {
    Table(TableSession),
    #[cfg(feature = "pam")]
    Pam(PamSession),
}

impl PolicySession for ConfiguredSession {
    fn account_status(&mut self) -> PolicyOutcome {
        match self {
            Self::Table(s) => s.account_status(),
            #[cfg(feature = "pam")]
            Self::Pam(s) => s.account_status(),
        }
    }

    fn error_string(&self, outcome: PolicyOutcome) -> String {
        match self {
            Self::Table(s) => s.error_string(outcome),
            #[cfg(feature = "pam")]
            Self::Pam(s) => s.error_string(outcome),
        }
    }

    fn close(self) {
        match self {
            Self::Table(s) => s.close(),
            #[cfg(feature = "pam")]
            Self::Pam(s) => s.close(),
        }
    }
}

impl PolicyOracle for ConfiguredOracle {
    type Session = ConfiguredSession;

    fn open(
        &self,
        service: &str,
        username: &str,
        conversation: NullConversation,
    ) -> std::result::Result<Self::Session, OracleError> {
        match self {
            Self::Table(o) => o
                .open(service, username, conversation)
                .map(ConfiguredSession::Table),
            #[cfg(feature = "pam")]
            Self::Pam(o) => o
                .open(service, username, conversation)
                .map(ConfiguredSession::Pam),
        }
    }

    fn backend_name(&self) -> &'static str {
        match self {
            Self::Table(o) => o.backend_name(),
            #[cfg(feature = "pam")]
            Self::Pam(o) => o.backend_name(),
        }
    }
}

/// Build the oracle named by the `[policy]` section.
pub fn build_oracle(config: &PolicyConfig) -> Result<ConfiguredOracle> {
    match config.backend {
        Backend::Table => Ok(ConfiguredOracle::Table(TableOracle::from_config(config)?)),
        #[cfg(feature = "pam")]
        Backend::Pam => Ok(ConfiguredOracle::Pam(PamOracle::new())),
        #[cfg(not(feature = "pam"))]
        Backend::Pam => Err(crate::GateError::Config(
            "the pam backend requires building with the `pam` feature".to_string(),
        )),
    }
}
