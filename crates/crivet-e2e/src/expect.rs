//! Test-failing wrappers around the driver and verifier.
//!
//! Inside a `#[test]` a failed step should end that test with a readable
//! diagnostic while the rest of the test binary keeps running. The panic
//! raised here is that failure; the message is the error's display form,
//! which already names the operation, the identifier and the cause.

use std::fmt::Display;

/// Turns a step result into its value or a test-case failure.
pub trait OrFail<T> {
    /// Returns the value, failing the current test on error.
    fn or_fail(self) -> T;

    /// Returns the value, failing the current test on error with `context`
    /// prepended to the diagnostic.
    fn or_fail_with(self, context: &str) -> T;
}

impl<T, E: Display> OrFail<T> for Result<T, E> {
    #[track_caller]
    #[allow(clippy::panic)]
    fn or_fail(self) -> T {
        match self {
            Ok(value) => value,
            Err(err) => {
                tracing::error!(error = %err, "step failed");
                panic!("{err}")
            }
        }
    }

    #[track_caller]
    #[allow(clippy::panic)]
    fn or_fail_with(self, context: &str) -> T {
        match self {
            Ok(value) => value,
            Err(err) => {
                tracing::error!(error = %err, context, "step failed");
                panic!("{context}: {err}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ok_passes_value_through() {
        let r: Result<u8, String> = Ok(7);
        assert_eq!(r.or_fail(), 7);
    }

    #[test]
    #[should_panic(expected = "StartContainer failed for c1")]
    fn err_fails_with_error_message() {
        let r: Result<(), String> = Err("StartContainer failed for c1: boom".into());
        r.or_fail();
    }

    #[test]
    #[should_panic(expected = "verify log: payload differs")]
    fn context_is_prepended() {
        let r: Result<(), &str> = Err("payload differs");
        r.or_fail_with("verify log");
    }
}
