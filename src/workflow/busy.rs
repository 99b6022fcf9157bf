//! Per-operation-kind busy flags with scoped release.
//!
//! Flags are per kind, not per entity: one upload, one chat send, and one
//! assisted correction may run at a time. The guard releases on drop, so
//! every exit path (including errors inside the operation) clears the flag.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::errors::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Upload,
    Send,
    Correction,
}

impl OperationKind {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Upload => "upload",
            Self::Send => "send",
            Self::Correction => "correction",
        }
    }
}

/// Shared set of busy flags, cloneable across workflows.
#[derive(Debug, Clone, Default)]
pub struct BusyFlags {
    upload: Arc<AtomicBool>,
    send: Arc<AtomicBool>,
    correction: Arc<AtomicBool>,
}

impl BusyFlags {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn flag(&self, kind: OperationKind) -> &Arc<AtomicBool> {
        match kind {
            OperationKind::Upload => &self.upload,
            OperationKind::Send => &self.send,
            OperationKind::Correction => &self.correction,
        }
    }

    #[must_use]
    pub fn is_busy(&self, kind: OperationKind) -> bool {
        self.flag(kind).load(Ordering::SeqCst)
    }

    /// Claims the flag for `kind` for the lifetime of the returned guard.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::OperationInFlight`] when an operation of the same
    /// kind already holds the flag.
    pub fn try_acquire(&self, kind: OperationKind) -> Result<BusyGuard, AppError> {
        let flag = Arc::clone(self.flag(kind));
        if flag
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(AppError::OperationInFlight(kind.label()));
        }
        Ok(BusyGuard { flag })
    }
}

/// Scoped hold on one busy flag; released on drop.
#[derive(Debug)]
pub struct BusyGuard {
    flag: Arc<AtomicBool>,
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire_marks_busy_until_dropped() {
        let flags = BusyFlags::new();
        assert!(!flags.is_busy(OperationKind::Send));

        let guard = flags.try_acquire(OperationKind::Send).unwrap();
        assert!(flags.is_busy(OperationKind::Send));

        drop(guard);
        assert!(!flags.is_busy(OperationKind::Send));
    }

    #[test]
    fn test_double_acquire_same_kind_fails() {
        let flags = BusyFlags::new();
        let _guard = flags.try_acquire(OperationKind::Upload).unwrap();

        let err = flags.try_acquire(OperationKind::Upload).unwrap_err();
        assert!(matches!(err, AppError::OperationInFlight("upload")));
        assert!(err.is_user_actionable());
    }

    #[test]
    fn test_kinds_are_independent() {
        let flags = BusyFlags::new();
        let _upload = flags.try_acquire(OperationKind::Upload).unwrap();
        let _send = flags.try_acquire(OperationKind::Send).unwrap();
        let _correction = flags.try_acquire(OperationKind::Correction).unwrap();
    }

    #[test]
    fn test_release_allows_reacquire() {
        let flags = BusyFlags::new();
        drop(flags.try_acquire(OperationKind::Correction).unwrap());
        assert!(flags.try_acquire(OperationKind::Correction).is_ok());
    }
}
