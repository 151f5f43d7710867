//! Error macros for kinship

/// Macro for rejecting an invalid argument value
#[macro_export]
macro_rules! bail_invalid {
    ($context:expr, $value:expr) => {
        return Err($crate::error::KinshipError::invalid_argument(
            $context, $value,
        ))
    };
}

/// Macro for creating usage errors
#[macro_export]
macro_rules! bail_usage {
    ($msg:expr) => {
        return Err($crate::error::KinshipError::UsageError($msg.to_string()))
    };
}

/// Macro for returning early when a cancellation token has fired
#[macro_export]
macro_rules! bail_if_cancelled {
    ($token:expr, $operation:expr) => {
        if $token.is_cancelled() {
            tracing::info!(operation = $operation, "cancelled");
            return Err($crate::error::KinshipError::cancelled($operation));
        }
    };
}
