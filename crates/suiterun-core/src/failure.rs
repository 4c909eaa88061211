//! Failures raised by suite members
//!
//! A member body reports failure by returning `Err(TestFailure)` or by
//! panicking. Any `std::error::Error` converts into a [`TestFailure`] with `?`,
//! which keeps member bodies free of conversion noise.

use std::any::Any;
use std::fmt;

/// Kind prefix that marks assertion failures.
pub const ASSERTION_KIND: &str = "AssertFailed";

/// Kind given to panics that are not assertion messages.
pub const PANIC_KIND: &str = "Panic";

/// Kind given to invalid suite declarations.
pub const CONFIGURATION_KIND: &str = "ConfigurationError";

/// Result type returned by every member body.
pub type TestOutcome = Result<(), TestFailure>;

/// A failure raised while running a suite member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestFailure {
    kind: String,
    origin: Option<String>,
    message: String,
    detail: Option<String>,
}

impl TestFailure {
    /// Create a failure of an arbitrary kind
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            origin: None,
            message: message.into(),
            detail: None,
        }
    }

    /// Create an assertion failure
    pub fn assertion(message: impl Into<String>) -> Self {
        Self::new(ASSERTION_KIND, message)
    }

    /// Create a suite configuration failure
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(CONFIGURATION_KIND, message)
    }

    /// The failure raised when a method completes without its expected failure
    pub fn expected_not_raised(kind: &str) -> Self {
        Self::assertion(format!("Expected failure of kind {} was not raised", kind))
    }

    /// Convert a caught panic payload
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "panic with a non-string payload".to_string()
        };

        if message.starts_with("assertion") {
            Self::assertion(message)
        } else {
            Self::new(PANIC_KIND, message)
        }
    }

    /// Attach the component the failure originated from
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    /// Attach extended diagnostic text
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub(crate) fn or_origin(mut self, origin: &str) -> Self {
        if self.origin.is_none() {
            self.origin = Some(origin.to_string());
        }
        self
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn origin(&self) -> Option<&str> {
        self.origin.as_deref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    /// Check if this is an assertion failure
    pub fn is_assertion(&self) -> bool {
        self.kind.starts_with(ASSERTION_KIND)
    }

    /// Check if this failure is of exactly the given kind
    pub fn is_kind(&self, kind: &str) -> bool {
        self.kind == kind
    }

    /// One-line summary used in failure logs and report payloads.
    ///
    /// Assertions render as `origin - message`; anything else carries the full
    /// diagnostic (`origin - kind: message` plus detail).
    pub fn summary(&self) -> String {
        let origin = self.origin.as_deref().unwrap_or("unknown");
        if self.is_assertion() {
            format!("{} - {}", origin, self.message)
        } else {
            format!("{} - {}", origin, self)
        }
    }
}

impl fmt::Display for TestFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)?;
        if let Some(detail) = &self.detail {
            write!(f, "\n{}", detail)?;
        }
        Ok(())
    }
}

impl<E> From<E> for TestFailure
where
    E: std::error::Error + 'static,
{
    fn from(error: E) -> Self {
        let mut causes = Vec::new();
        let mut source = error.source();
        while let Some(cause) = source {
            causes.push(format!("caused by: {}", cause));
            source = cause.source();
        }

        let failure = Self::new(short_type_name::<E>(), error.to_string());
        if causes.is_empty() {
            failure
        } else {
            failure.with_detail(causes.join("\n"))
        }
    }
}

/// `core::num::error::ParseIntError` -> `ParseIntError`
fn short_type_name<T: ?Sized>() -> String {
    let full = std::any::type_name::<T>();
    let without_generics = full.split('<').next().unwrap_or(full);
    without_generics
        .rsplit("::")
        .next()
        .unwrap_or(without_generics)
        .to_string()
}

/// Fail unconditionally with an assertion failure
pub fn fail(message: impl Into<String>) -> TestOutcome {
    Err(TestFailure::assertion(message))
}

/// Fail with an assertion failure unless `condition` holds
pub fn ensure(condition: bool, message: impl Into<String>) -> TestOutcome {
    if condition {
        Ok(())
    } else {
        fail(message)
    }
}

/// Fail with an assertion failure unless `actual == expected`
pub fn ensure_eq<T>(actual: T, expected: T) -> TestOutcome
where
    T: PartialEq + fmt::Debug,
{
    if actual == expected {
        Ok(())
    } else {
        fail(format!("expected `{:?}`, found `{:?}`", expected, actual))
    }
}
