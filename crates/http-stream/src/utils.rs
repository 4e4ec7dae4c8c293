//! Utility macros and functions for the crate.

/// Returns early with an error if a condition is not met.
///
/// Like `assert!`, but the failure is handed back to the caller instead of panicking.
///
/// ```ignore
/// ensure!(!self.closed, StreamError::invalid_state("response body stream is closed"));
/// ```
macro_rules! ensure {
    ($predicate:expr, $error:expr) => {
        if !$predicate {
            return Err($error);
        }
    };
}

pub(crate) use ensure;
