//! Decision properties of the login policy gate.

mod common;

use common::{standard_gate, with_captured_logs, TEST_PASSWORD};
use pamgate::{
    LoginDisposition, LoginPolicyGate, OracleError, PolicyOutcome, TableOracle, DENIAL_MESSAGE,
    LOG_TARGET,
};

const ALL_OUTCOMES: [PolicyOutcome; 9] = [
    PolicyOutcome::Success,
    PolicyOutcome::PermissionDenied,
    PolicyOutcome::AccountExpired,
    PolicyOutcome::UserUnknown,
    PolicyOutcome::Other(3),
    PolicyOutcome::Other(4),
    PolicyOutcome::Other(7),
    PolicyOutcome::Other(9),
    PolicyOutcome::Other(25),
];

#[test]
fn test_deny_iff_denied_or_expired() {
    for outcome in ALL_OUTCOMES {
        let gate = LoginPolicyGate::new(TableOracle::new().with_default(outcome));
        let disposition = gate.evaluate("someone", TEST_PASSWORD);

        let expect_deny = matches!(
            outcome,
            PolicyOutcome::PermissionDenied | PolicyOutcome::AccountExpired
        );
        assert_eq!(disposition.is_deny(), expect_deny, "outcome {outcome}");
        if expect_deny {
            assert_eq!(disposition.message(), Some(DENIAL_MESSAGE));
        }
    }
}

#[test]
fn test_session_opened_and_closed_once_per_call() {
    for outcome in ALL_OUTCOMES {
        let gate = LoginPolicyGate::new(TableOracle::new().with_default(outcome));
        let counters = gate.oracle().counters();

        gate.evaluate("someone", TEST_PASSWORD);
        gate.evaluate("someone", TEST_PASSWORD);

        assert_eq!(counters.opened(), 2, "outcome {outcome}");
        assert_eq!(counters.closed(), 2, "outcome {outcome}");
        assert_eq!(counters.outstanding(), 0);
    }
}

#[test]
fn test_init_failure_continues_with_diagnostic() {
    let gate = LoginPolicyGate::new(
        TableOracle::new()
            .with_default(PolicyOutcome::PermissionDenied)
            .failing_init(OracleError::new(3, "Error in service module")),
    );
    let counters = gate.oracle().counters();

    let (disposition, logs) = with_captured_logs(|| gate.evaluate("mallory", TEST_PASSWORD));

    assert_eq!(disposition, LoginDisposition::Continue);
    assert!(logs.contains("ERROR"));
    assert!(logs.contains("Error in service module"));
    assert_eq!(counters.opened(), 1);
    assert_eq!(counters.closed(), 1);
    assert_eq!(counters.checks(), 0);
}

#[test]
fn test_success_logs_allowed() {
    let gate = standard_gate();
    let (disposition, logs) = with_captured_logs(|| gate.evaluate("alice", TEST_PASSWORD));

    assert_eq!(disposition, LoginDisposition::Continue);
    assert!(logs.contains("DEBUG"));
    assert!(logs.contains("alice"));
    assert!(logs.contains("allowed"));
}

#[test]
fn test_permission_denied_logs_denied() {
    let gate = standard_gate();
    let (disposition, logs) = with_captured_logs(|| gate.evaluate("mallory", TEST_PASSWORD));

    assert_eq!(
        disposition,
        LoginDisposition::Deny {
            message: DENIAL_MESSAGE
        }
    );
    assert!(logs.contains("mallory"));
    assert!(logs.contains("denied"));
}

#[test]
fn test_account_expired_denies_with_same_message() {
    let gate = standard_gate();
    let (disposition, logs) = with_captured_logs(|| gate.evaluate("olduser", TEST_PASSWORD));

    assert_eq!(disposition.message(), Some(DENIAL_MESSAGE));
    assert!(logs.contains("olduser"));
    assert!(logs.contains("denied"));
}

#[test]
fn test_other_code_reports_oracle_text() {
    let gate = standard_gate();
    let (disposition, logs) = with_captured_logs(|| gate.evaluate("newpass", TEST_PASSWORD));

    assert_eq!(disposition, LoginDisposition::Continue);
    assert!(logs.contains("ERROR"));
    assert!(logs.contains("Authentication token is no longer valid; new one required"));
    assert!(logs.contains("newpass"));
}

#[test]
fn test_unknown_account_reports_oracle_text() {
    let gate = standard_gate();
    let (disposition, logs) = with_captured_logs(|| gate.evaluate("ghost", TEST_PASSWORD));

    assert_eq!(disposition, LoginDisposition::Continue);
    assert!(logs.contains("User not known to the underlying authentication module"));
}

#[test]
fn test_password_never_logged() {
    let gate = standard_gate();
    let (_, logs) = with_captured_logs(|| {
        for user in ["alice", "mallory", "olduser", "newpass", "ghost"] {
            gate.evaluate(user, TEST_PASSWORD);
        }
    });

    assert!(!logs.is_empty());
    assert!(!logs.contains(TEST_PASSWORD));
}

#[test]
fn test_repeated_evaluation_is_stable() {
    let gate = standard_gate();
    for user in ["alice", "mallory", "olduser", "newpass", "ghost"] {
        let first = gate.evaluate(user, TEST_PASSWORD);
        for _ in 0..5 {
            assert_eq!(gate.evaluate(user, TEST_PASSWORD), first, "user {user}");
        }
    }
}

#[test]
fn test_fixed_service_identity_on_every_call() {
    let gate = standard_gate();
    let counters = gate.oracle().counters();

    for user in ["alice", "mallory", "ghost"] {
        gate.evaluate(user, TEST_PASSWORD);
        assert_eq!(counters.last_service().as_deref(), Some("znc"));
    }
}

#[test]
fn test_decision_logs_use_module_target() {
    let gate = standard_gate();
    let (_, logs) = with_captured_logs(|| {
        for user in ["alice", "mallory", "newpass"] {
            gate.evaluate(user, TEST_PASSWORD);
        }
    });

    let decision_lines: Vec<&str> = logs
        .lines()
        .filter(|line| line.contains("User ") || line.contains("PAM failure"))
        .collect();
    assert!(decision_lines.len() >= 3);
    for line in decision_lines {
        assert!(line.contains(&format!("{LOG_TARGET}:")), "{line}");
        assert!(!line.contains("pamgate::gate"), "{line}");
    }
}
