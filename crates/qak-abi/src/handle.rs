use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// Allocate a process-unique session id.
pub(crate) fn next_session_id() -> u64 {
    NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed)
}

/// Caller-side capability for a compiled module.
///
/// The engine's own handle stays inside the [`Session`](crate::Session) that
/// produced it. A `ModuleHandle` is only meaningful to that session and only
/// until [`Session::delete_module`](crate::Session::delete_module) runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ModuleHandle {
    session: u64,
    serial: u64,
}

impl ModuleHandle {
    pub(crate) fn new(session: u64, serial: u64) -> Self {
        Self { session, serial }
    }

    pub fn session_id(&self) -> u64 {
        self.session
    }

    pub fn serial(&self) -> u64 {
        self.serial
    }
}

impl fmt::Display for ModuleHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "module {}:{}", self.session, self.serial)
    }
}
