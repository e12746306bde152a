//! # Failover Classification
//!
//! Maps a failed call's status to what the pool does next.

use shared_types::{RpcCode, RpcStatus};

/// Message a node's HTTP/2 stack emits when a stream arrives without
/// headers; the channel is unusable until re-dialed.
pub const CORRUPT_STREAM_MARKER: &str = "malformed header: missing HTTP content-type";

/// What to do after a failed call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailoverAction {
    /// Surface `Timeout`; the slot stays eligible.
    Timeout,
    /// Blacklist the slot for this call and try another.
    Blacklist,
    /// Close and re-dial the same slot, then retry.
    Repair,
    /// Surface the error.
    Fail,
}

pub fn classify(status: &RpcStatus) -> FailoverAction {
    match status.code {
        RpcCode::DeadlineExceeded => FailoverAction::Timeout,
        RpcCode::Unavailable => FailoverAction::Blacklist,
        RpcCode::Unknown if status.message.contains(CORRUPT_STREAM_MARKER) => {
            FailoverAction::Repair
        }
        _ => FailoverAction::Fail,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_classify_table() {
        assert_eq!(
            classify(&RpcStatus::deadline_exceeded("late")),
            FailoverAction::Timeout
        );
        assert_eq!(
            classify(&RpcStatus::unavailable("refused")),
            FailoverAction::Blacklist
        );
        assert_eq!(
            classify(&RpcStatus::unknown(format!("h2: {}", CORRUPT_STREAM_MARKER))),
            FailoverAction::Repair
        );
        assert_eq!(classify(&RpcStatus::unknown("other")), FailoverAction::Fail);
        assert_eq!(classify(&RpcStatus::internal("x")), FailoverAction::Fail);
    }

    const CODES: [RpcCode; 11] = [
        RpcCode::Cancelled,
        RpcCode::Unknown,
        RpcCode::InvalidArgument,
        RpcCode::DeadlineExceeded,
        RpcCode::NotFound,
        RpcCode::PermissionDenied,
        RpcCode::ResourceExhausted,
        RpcCode::Unimplemented,
        RpcCode::Internal,
        RpcCode::Unavailable,
        RpcCode::Other,
    ];

    proptest! {
        #[test]
        fn prop_only_marked_unknown_repairs(
            code in 0usize..CODES.len(),
            prefix in "[a-z :]{0,12}",
            marked in any::<bool>(),
        ) {
            let code = CODES[code];
            let message = if marked {
                format!("{}{}", prefix, CORRUPT_STREAM_MARKER)
            } else {
                prefix
            };
            let action = classify(&RpcStatus::new(code, message));
            let expected = match code {
                RpcCode::DeadlineExceeded => FailoverAction::Timeout,
                RpcCode::Unavailable => FailoverAction::Blacklist,
                RpcCode::Unknown if marked => FailoverAction::Repair,
                _ => FailoverAction::Fail,
            };
            prop_assert_eq!(action, expected);
        }
    }
}
