//! Invocation of a bound method and normalization of what it returns.
//!
//! Exposed methods may return anything implementing [`IntoInvocation`]. The idiomatic shape
//! is `Result<Reply, Failure>`; the three-part `(payload, options, failure)` tuple is also
//! accepted and normalized so that a present failure always wins over the other two parts.

use crate::payload::Payload;
use crate::{Failure, ResponseOptions};
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use tracing::error;

/// A successful result: a payload and, optionally, options overriding the defaults.
pub struct Reply {
    payload: Box<dyn Payload>,
    options: Option<ResponseOptions>,
}

impl Reply {
    pub fn new<T: Payload + 'static>(payload: T) -> Self {
        Self { payload: Box::new(payload), options: None }
    }

    #[must_use]
    pub fn with_options(mut self, options: ResponseOptions) -> Self {
        self.options = Some(options);
        self
    }
}

impl fmt::Debug for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reply").field("options", &self.options).finish_non_exhaustive()
    }
}

/// The normalized result of one invocation.
pub enum InvocationResult {
    /// `payload` is only absent when a method returned neither a payload nor a failure.
    Success { payload: Option<Box<dyn Payload>>, options: Option<ResponseOptions> },
    Failure(Failure),
}

impl fmt::Debug for InvocationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvocationResult::Success { payload, options } => f
                .debug_struct("Success")
                .field("has_payload", &payload.is_some())
                .field("options", options)
                .finish(),
            InvocationResult::Failure(failure) => f.debug_tuple("Failure").field(failure).finish(),
        }
    }
}

/// Converts the return value of an exposed method into an [`InvocationResult`].
pub trait IntoInvocation {
    fn into_invocation(self) -> InvocationResult;
}

impl IntoInvocation for InvocationResult {
    #[inline]
    fn into_invocation(self) -> InvocationResult {
        self
    }
}

impl IntoInvocation for Reply {
    fn into_invocation(self) -> InvocationResult {
        InvocationResult::Success { payload: Some(self.payload), options: self.options }
    }
}

impl IntoInvocation for Failure {
    fn into_invocation(self) -> InvocationResult {
        InvocationResult::Failure(self)
    }
}

impl<T: IntoInvocation, E: Into<Failure>> IntoInvocation for Result<T, E> {
    fn into_invocation(self) -> InvocationResult {
        match self {
            Ok(t) => t.into_invocation(),
            Err(e) => InvocationResult::Failure(e.into()),
        }
    }
}

impl<T: Payload + 'static> IntoInvocation for (Option<T>, Option<ResponseOptions>, Option<Failure>) {
    fn into_invocation(self) -> InvocationResult {
        match self {
            (_, _, Some(failure)) => InvocationResult::Failure(failure),
            (payload, options, None) => InvocationResult::Success {
                payload: payload.map(|p| Box::new(p) as Box<dyn Payload>),
                options,
            },
        }
    }
}

/// A method whose arguments have been bound, waiting for the provider.
pub(crate) type BoundCall<'a, P> = Box<dyn FnOnce(&P) -> InvocationResult + 'a>;

/// Calls the bound method exactly once.
///
/// A panic inside the method is caught and turned into a generic failure.
pub(crate) fn invoke<P>(identifier: &str, call: BoundCall<'_, P>, provider: &P) -> InvocationResult {
    catch_panic(identifier, || call(provider)).unwrap_or_else(InvocationResult::Failure)
}

/// Runs `f`, turning a panic into a generic failure for `identifier`.
///
/// Provider code also runs while binding (`FromParam`, `Arg::check`) and while emitting
/// (`Payload::write_to`), each of those steps goes through here too.
pub(crate) fn catch_panic<T>(identifier: &str, f: impl FnOnce() -> T) -> Result<T, Failure> {
    panic::catch_unwind(AssertUnwindSafe(f)).map_err(|cause| {
        let cause = panic_message(cause.as_ref());
        error!(identifier, cause, "provider code panicked");
        Failure::generic(format!("method {identifier} panicked: {cause}"))
    })
}

fn panic_message(cause: &(dyn Any + Send)) -> &str {
    if let Some(s) = cause.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = cause.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown cause"
    }
}

#[cfg(test)]
mod tests {
    use super::{BoundCall, IntoInvocation, InvocationResult, Reply, catch_panic, invoke};
    use crate::{Failure, ResponseOptions};
    use http::StatusCode;

    #[test]
    fn failure_in_tuple_wins() {
        let result = (Some("ignored"), Some(ResponseOptions::default()), Some(Failure::see_other("/x")))
            .into_invocation();
        match result {
            InvocationResult::Failure(failure) => assert_eq!(failure.status_code(), StatusCode::SEE_OTHER),
            InvocationResult::Success { .. } => panic!("failure must win"),
        }
    }

    #[test]
    fn tuple_without_payload_or_failure() {
        let result = (None::<String>, None, None).into_invocation();
        assert!(matches!(result, InvocationResult::Success { payload: None, options: None }));
    }

    #[test]
    fn reply_keeps_options() {
        let result = Ok::<_, Failure>(Reply::new("body").with_options(ResponseOptions::default().with_cache(60)))
            .into_invocation();
        match result {
            InvocationResult::Success { payload, options } => {
                assert!(payload.is_some());
                assert_eq!(options.map(|o| o.cache()), Some(60));
            }
            InvocationResult::Failure(_) => panic!("expected success"),
        }
    }

    #[test]
    fn panic_becomes_generic_failure() {
        let call: BoundCall<'_, ()> = Box::new(|_: &()| -> InvocationResult { panic!("provider bug") });
        match invoke("Broken", call, &()) {
            InvocationResult::Failure(failure) => {
                assert!(!failure.is_classified());
                assert!(failure.to_string().contains("provider bug"));
            }
            InvocationResult::Success { .. } => panic!("expected failure"),
        }
    }

    #[test]
    fn catch_panic_passes_value_through() {
        assert_eq!(catch_panic("Add", || 1 + 2).unwrap(), 3);
    }

    #[test]
    fn catch_panic_with_formatted_message() {
        let failure = catch_panic("Add", || -> u8 { panic!("overflow in {}", "Add") }).unwrap_err();
        assert!(!failure.is_classified());
        assert!(failure.to_string().contains("overflow in Add"));
    }
}
