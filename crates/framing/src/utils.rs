//! Utility macros shared by the codec implementation.

/// Returns early with an error if a condition is not met.
///
/// Works like `assert!`, but yields `Err($error)` from the enclosing function
/// instead of panicking. Intended for limit checks while framing a message.
///
/// # Example
///
/// ```ignore
/// ensure!(headers.len() < config.max_headers(), ParseError::too_many_headers(config.max_headers()));
/// ```
macro_rules! ensure {
    ($predicate:expr, $error:expr) => {
        if !$predicate {
            return Err($error);
        }
    };
}

pub(crate) use ensure;
