//! PAM account management backend.
//!
//! Drives libpam through the `pam-sys` bindings. Only the account management
//! stack of the service is consulted; no authentication is attempted, so the
//! conversation function is always null.

use std::ffi::{c_int, CStr, CString};
use std::ptr;

use pam_sys::raw::{pam_acct_mgmt, pam_end, pam_start, pam_strerror};
use pam_sys::{PamConversation, PamHandle};
use tracing::{trace, warn};

use super::{
    NullConversation, OracleError, PolicyOracle, PolicyOutcome, PolicySession, CODE_SUCCESS,
    CODE_SYSTEM_ERR,
};

fn conversation(_: NullConversation) -> PamConversation {
    PamConversation {
        conv: None,
        data_ptr: ptr::null_mut(),
    }
}

fn strerror(handle: *mut PamHandle, code: c_int) -> String {
    // SAFETY: pam_strerror returns a pointer to a static string (or null) and
    // does not require a live handle.
    let text = unsafe { pam_strerror(handle, code) };
    if text.is_null() {
        return PolicyOutcome::from_code(code).description().to_string();
    }
    // SAFETY: non-null pointers from pam_strerror are NUL-terminated.
    unsafe { CStr::from_ptr(text) }
        .to_string_lossy()
        .into_owned()
}

/// Oracle backed by the system PAM stack.
#[derive(Debug, Default, Clone, Copy)]
pub struct PamOracle;

impl PamOracle {
    pub fn new() -> Self {
        Self
    }
}

impl PolicyOracle for PamOracle {
    type Session = PamSession;

    fn open(
        &self,
        service: &str,
        username: &str,
        conversation_handler: NullConversation,
    ) -> Result<PamSession, OracleError> {
        let service_c = CString::new(service)
            .map_err(|_| OracleError::new(CODE_SYSTEM_ERR, "service name contains a NUL byte"))?;
        let user_c = CString::new(username)
            .map_err(|_| OracleError::new(CODE_SYSTEM_ERR, "username contains a NUL byte"))?;

        // pam_start copies the conversation structure, so a local is enough.
        let conv = conversation(conversation_handler);
        let mut handle: *mut PamHandle = ptr::null_mut();

        // SAFETY: all pointers are valid for the duration of the call and
        // `handle` is a valid out-pointer.
        let code = unsafe { pam_start(service_c.as_ptr(), user_c.as_ptr(), &conv, &mut handle) };

        if code != CODE_SUCCESS {
            let message = strerror(handle, code);
            // A half-open handle is released through the same path as a
            // normal session.
            PamSession {
                handle,
                last_status: code,
            }
            .close();
            return Err(OracleError::new(code, message));
        }

        trace!(service, username, "PAM transaction started");
        Ok(PamSession {
            handle,
            last_status: CODE_SUCCESS,
        })
    }

    fn backend_name(&self) -> &'static str {
        "pam"
    }
}

/// One PAM transaction.
#[derive(Debug)]
pub struct PamSession {
    handle: *mut PamHandle,
    last_status: c_int,
}

impl PamSession {
    fn end(&mut self) {
        if self.handle.is_null() {
            return;
        }
        // SAFETY: the handle is non-null, owned by this session and nulled
        // out right after, so pam_end runs once.
        let code = unsafe { pam_end(self.handle, self.last_status) };
        self.handle = ptr::null_mut();
        if code != CODE_SUCCESS {
            warn!(code, "pam_end reported failure");
        }
    }

    fn is_open(&self) -> bool {
        !self.handle.is_null()
    }
}

impl PolicySession for PamSession {
    fn account_status(&mut self) -> PolicyOutcome {
        // SAFETY: the handle is live until `end`.
        let code = unsafe { pam_acct_mgmt(self.handle, 0) };
        self.last_status = code;
        PolicyOutcome::from_code(code)
    }

    fn error_string(&self, outcome: PolicyOutcome) -> String {
        strerror(self.handle, outcome.code())
    }

    fn close(mut self) {
        self.end();
    }
}

impl Drop for PamSession {
    fn drop(&mut self) {
        self.end();
    }
}
