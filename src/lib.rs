//! pamgate - PAM account policy gate for IRC bouncer logins.
//!
//! Asks the system's PAM account management stack whether a user may use the
//! bouncer and turns the answer into "continue" or "refuse the login".

pub mod config;
pub mod error;
pub mod gate;
pub mod hook;
pub mod logging;
pub mod module;
pub mod oracle;

pub use config::{Backend, Config, LoggingConfig, PolicyConfig};
pub use error::{GateError, Result};
pub use gate::{
    Assessment, LoginDisposition, LoginPolicyGate, DENIAL_MESSAGE, LOG_TARGET, SERVICE_NAME,
};
pub use hook::{evaluate_blocking, AuthAttempt, LoginAttempt, LoginHook, ModRet};
pub use module::{CommandCaller, ModuleInfo, PamAccessModule, MODULE_INFO};
pub use oracle::{
    build_oracle, ConfiguredOracle, NullConversation, OracleError, PolicyOracle, PolicyOutcome,
    PolicySession, TableOracle, NULL_CONVERSATION,
};
#[cfg(feature = "pam")]
pub use oracle::PamOracle;
