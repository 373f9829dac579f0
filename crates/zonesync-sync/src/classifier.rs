//! Remote error classification
//!
//! All knowledge of the service's numeric error codes lives here. The rest
//! of the crate only reasons about [`ErrorKind`].

use std::collections::BTreeMap;

use zonesync_core::ports::RemoteError;

/// Numeric codes reported by the remote change service
pub mod codes {
    /// Some items of a batch request failed; details are per item
    pub const PARTIAL_FAILURE: i64 = 2;
    /// The user is not signed in
    pub const NOT_AUTHENTICATED: i64 = 9;
    /// The server no longer accepts the supplied change token
    pub const CHANGE_TOKEN_EXPIRED: i64 = 21;
    /// The account is managed and sync is restricted
    pub const MANAGED_ACCOUNT_RESTRICTED: i64 = 36;
    /// Local code: the event stream closed without a terminal event
    pub const STREAM_CLOSED: i64 = -1;
}

/// The failure kinds the sync protocol distinguishes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    AccountUnavailable,
    TokenExpired,
    /// Per-item errors keyed by item identity
    PartialFailure(BTreeMap<String, RemoteError>),
    Transport(RemoteError),
}

/// Maps raw remote errors to an [`ErrorKind`]
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorClassifier;

impl ErrorClassifier {
    /// Classifies `error`; unknown codes are `Transport`
    pub fn classify(error: &RemoteError) -> ErrorKind {
        match error.code {
            codes::NOT_AUTHENTICATED | codes::MANAGED_ACCOUNT_RESTRICTED => {
                ErrorKind::AccountUnavailable
            }
            codes::CHANGE_TOKEN_EXPIRED => ErrorKind::TokenExpired,
            codes::PARTIAL_FAILURE if !error.partial_errors.is_empty() => {
                ErrorKind::PartialFailure(error.partial_errors.clone())
            }
            _ => ErrorKind::Transport(error.clone()),
        }
    }

    /// Shorthand for `classify(error) == TokenExpired`
    pub fn is_token_expired(error: &RemoteError) -> bool {
        error.code == codes::CHANGE_TOKEN_EXPIRED
    }
}

/// Error reported when a change stream ends without its terminal event
pub(crate) fn stream_closed() -> RemoteError {
    RemoteError::new(
        codes::STREAM_CLOSED,
        "change stream closed before completion",
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_codes() {
        assert_eq!(
            ErrorClassifier::classify(&RemoteError::new(9, "not authenticated")),
            ErrorKind::AccountUnavailable
        );
        assert_eq!(
            ErrorClassifier::classify(&RemoteError::new(36, "restricted")),
            ErrorKind::AccountUnavailable
        );
    }

    #[test]
    fn test_token_expired() {
        let err = RemoteError::new(21, "change token expired");
        assert_eq!(ErrorClassifier::classify(&err), ErrorKind::TokenExpired);
        assert!(ErrorClassifier::is_token_expired(&err));
    }

    #[test]
    fn test_partial_failure_carries_item_errors() {
        let err = RemoteError::new(2, "partial failure")
            .with_item_error("sub-a", RemoteError::new(14, "server rejected"));
        match ErrorClassifier::classify(&err) {
            ErrorKind::PartialFailure(items) => {
                assert_eq!(items.len(), 1);
                assert_eq!(items["sub-a"].code, 14);
            }
            other => panic!("expected PartialFailure, got {other:?}"),
        }
    }

    #[test]
    fn test_partial_failure_without_items_is_transport() {
        let err = RemoteError::new(2, "partial failure");
        assert_eq!(
            ErrorClassifier::classify(&err),
            ErrorKind::Transport(err.clone())
        );
    }

    #[test]
    fn test_unknown_codes_are_transport() {
        for code in [0, 3, 4, 7, 23, 1000, codes::STREAM_CLOSED] {
            let err = RemoteError::new(code, "something");
            assert!(matches!(
                ErrorClassifier::classify(&err),
                ErrorKind::Transport(_)
            ));
        }
    }
}
