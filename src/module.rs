//! Bouncer module surface.
//!
//! Wraps a [`LoginPolicyGate`] with the metadata and administrative command
//! channel a host expects from a loadable module. Commands are restricted to
//! admin users; everyone else gets a flat refusal.

use tracing::info;

use crate::gate::{Assessment, LoginPolicyGate};
use crate::hook::{AuthAttempt, LoginHook, ModRet};
use crate::oracle::PolicyOracle;

/// Module name as registered with the host.
pub const MODULE_NAME: &str = "pamaccess";

/// One-line module description.
pub const MODULE_DESCRIPTION: &str =
    "Allow users to be granted or denied access by pam_access mod using the znc service.";

/// Reply sent to non-admin callers of the command channel.
pub const ACCESS_DENIED_REPLY: &str = "Access denied";

/// Static module metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModuleInfo {
    pub name: &'static str,
    pub description: &'static str,
    pub has_args: bool,
}

/// Metadata for this module. It takes no load arguments.
pub const MODULE_INFO: ModuleInfo = ModuleInfo {
    name: MODULE_NAME,
    description: MODULE_DESCRIPTION,
    has_args: false,
};

/// The user issuing a module command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandCaller {
    pub username: String,
    pub is_admin: bool,
}

impl CommandCaller {
    pub fn new(username: impl Into<String>, is_admin: bool) -> Self {
        Self {
            username: username.into(),
            is_admin,
        }
    }
}

/// Loadable module around a policy gate.
#[derive(Debug)]
pub struct PamAccessModule<O> {
    gate: LoginPolicyGate<O>,
}

impl<O: PolicyOracle> PamAccessModule<O> {
    pub fn new(gate: LoginPolicyGate<O>) -> Self {
        Self { gate }
    }

    pub fn info(&self) -> ModuleInfo {
        MODULE_INFO
    }

    pub fn gate(&self) -> &LoginPolicyGate<O> {
        &self.gate
    }

    /// Handle a line sent to the module by `caller`. Returns the reply lines.
    pub fn on_mod_command(&self, caller: &CommandCaller, command: &str) -> Vec<String> {
        if !caller.is_admin {
            return vec![ACCESS_DENIED_REPLY.to_string()];
        }
        self.handle_command(caller, command)
    }

    fn handle_command(&self, caller: &CommandCaller, command: &str) -> Vec<String> {
        let mut words = command.split_whitespace();
        let Some(name) = words.next() else {
            return self.help();
        };

        match name.to_lowercase().as_str() {
            "help" => self.help(),
            "status" => vec![
                format!("Service: {}", self.gate.service()),
                format!("Backend: {}", self.gate.oracle().backend_name()),
            ],
            "check" => match words.next() {
                Some(target) => {
                    info!(admin = %caller.username, account = target, "account check requested");
                    vec![describe(target, &self.gate.assess(target))]
                }
                None => vec!["Usage: check <username>".to_string()],
            },
            _ => vec![format!(
                "Unknown command [{name}]. Try 'help' for a list of commands."
            )],
        }
    }

    fn help(&self) -> Vec<String> {
        vec![
            "help - Show this list".to_string(),
            "status - Show the PAM service and backend in use".to_string(),
            "check <username> - Ask PAM whether an account may log in".to_string(),
        ]
    }
}

impl<O: PolicyOracle> LoginHook for PamAccessModule<O> {
    fn on_login_attempt(&self, attempt: &mut dyn AuthAttempt) -> ModRet {
        self.gate.on_login_attempt(attempt)
    }
}

fn describe(username: &str, assessment: &Assessment) -> String {
    match assessment {
        Assessment::Allowed => format!("{username}: allowed"),
        Assessment::Denied(outcome) => format!("{username}: denied ({outcome})"),
        Assessment::NoOpinion { reason, .. } => {
            format!("{username}: no decision, PAM replied: {reason}")
        }
        Assessment::Unavailable(err) => format!("{username}: PAM unavailable: {}", err.message),
    }
}
