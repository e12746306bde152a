//! # Error Taxonomy
//!
//! Every subsystem error classifies into one `ErrorKind`, so callers can
//! branch on the kind without knowing which subsystem raised it.

use std::fmt;

/// Caller-visible error kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Configuration failed validation.
    ConfigInvalid,
    /// The pool exhausted its retries without finding a usable slot.
    NoServiceableConnection,
    /// A deadline elapsed.
    Timeout,
    /// Every node answered but no answer reached a majority.
    NoQuorum,
    /// The node or the archive store is already archiving / restoring.
    Busy,
    /// Node pivot and store cursor have diverged.
    HeightGap,
    NothingToArchive,
    NothingToRestore,
    /// Archived payload failed its HMAC check.
    ArchiveIntegrity,
    /// The remote side answered with a non-success status.
    RemoteRejected,
    /// The operation is not supported by this backend.
    NotSupported,
    /// Transport-level failure that was not recovered.
    Transport,
    /// The operation was cancelled by the caller or by shutdown.
    Cancelled,
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::ConfigInvalid => "config invalid",
            ErrorKind::NoServiceableConnection => "no serviceable connection",
            ErrorKind::Timeout => "timeout",
            ErrorKind::NoQuorum => "no quorum",
            ErrorKind::Busy => "busy",
            ErrorKind::HeightGap => "height gap",
            ErrorKind::NothingToArchive => "nothing to archive",
            ErrorKind::NothingToRestore => "nothing to restore",
            ErrorKind::ArchiveIntegrity => "archive integrity",
            ErrorKind::RemoteRejected => "remote rejected",
            ErrorKind::NotSupported => "not supported",
            ErrorKind::Transport => "transport",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::Internal => "internal",
        };
        f.write_str(name)
    }
}
