//! Static suite registration
//!
//! A [`Suite`] is the explicit registration table for one suite type: a
//! constructor plus named members tagged with their lifecycle role. The
//! metadata view is derived from it as members are added.
//!
//! ```
//! use suiterun_core::{ensure_eq, Suite};
//!
//! #[derive(Default)]
//! struct Counter {
//!     value: i32,
//! }
//!
//! let suite = Suite::<Counter>::with_default("CounterTests")
//!     .initialize("Setup", |c| {
//!         c.value = 1;
//!         Ok(())
//!     })
//!     .test("Increments", |c| {
//!         c.value += 1;
//!         ensure_eq(c.value, 2)
//!     });
//! assert_eq!(suite.metadata().eligible_tests(), vec!["Increments"]);
//! ```

use crate::failure::{TestFailure, TestOutcome};
use crate::metadata::{DeploymentItem, MemberMetadata, MemberRole, SuiteMetadata};
use crate::plan::{self, CompiledPlan};
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

pub type Constructor<S> = Arc<dyn Fn() -> Result<S, TestFailure> + Send + Sync>;
pub type SyncBody<S> = Arc<dyn Fn(&mut S) -> TestOutcome + Send + Sync>;
pub type AsyncBody<S> = Arc<dyn for<'a> Fn(&'a mut S) -> BoxFuture<'a, TestOutcome> + Send + Sync>;
pub type StaticBody = Arc<dyn Fn() -> TestOutcome + Send + Sync>;

/// Executable body of an instance member
pub(crate) enum Body<S> {
    Sync(SyncBody<S>),
    Async(AsyncBody<S>),
}

impl<S> Clone for Body<S> {
    fn clone(&self) -> Self {
        match self {
            Body::Sync(f) => Body::Sync(Arc::clone(f)),
            Body::Async(f) => Body::Async(Arc::clone(f)),
        }
    }
}

impl<S: Send> Body<S> {
    /// Run the body to completion, converting panics into failures.
    ///
    /// Async bodies are awaited in place so members of one instance never
    /// overlap.
    pub(crate) async fn invoke(&self, instance: &mut S) -> TestOutcome {
        match self {
            Body::Sync(f) => match panic::catch_unwind(AssertUnwindSafe(|| f(instance))) {
                Ok(outcome) => outcome,
                Err(payload) => Err(TestFailure::from_panic(payload)),
            },
            Body::Async(f) => {
                // The body may panic before handing back its future
                let create = move || {
                    let instance = instance;
                    f(instance)
                };
                let future = match panic::catch_unwind(AssertUnwindSafe(create)) {
                    Ok(future) => future,
                    Err(payload) => return Err(TestFailure::from_panic(payload)),
                };
                match AssertUnwindSafe(future).catch_unwind().await {
                    Ok(outcome) => outcome,
                    Err(payload) => Err(TestFailure::from_panic(payload)),
                }
            }
        }
    }
}

pub(crate) enum MemberBody<S> {
    Static(StaticBody),
    Instance(Body<S>),
}

/// One declared suite member
pub struct Member<S> {
    pub(crate) metadata: MemberMetadata,
    pub(crate) body: MemberBody<S>,
}

impl<S> Member<S> {
    fn instance(name: impl Into<String>, role: MemberRole, body: Body<S>) -> Self {
        let is_async = matches!(body, Body::Async(_));
        Self {
            metadata: MemberMetadata {
                name: name.into(),
                role,
                is_async,
                ignored: false,
                expected_failure: None,
            },
            body: MemberBody::Instance(body),
        }
    }

    /// A synchronous test method
    pub fn test<F>(name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&mut S) -> TestOutcome + Send + Sync + 'static,
    {
        Self::instance(name, MemberRole::TestMethod, Body::Sync(Arc::new(body)))
    }

    /// An asynchronous test method
    pub fn test_async<F>(name: impl Into<String>, body: F) -> Self
    where
        F: for<'a> Fn(&'a mut S) -> BoxFuture<'a, TestOutcome> + Send + Sync + 'static,
    {
        Self::instance(name, MemberRole::TestMethod, Body::Async(Arc::new(body)))
    }

    /// A synchronous per-invocation initializer
    pub fn initialize<F>(name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&mut S) -> TestOutcome + Send + Sync + 'static,
    {
        Self::instance(name, MemberRole::Initialize, Body::Sync(Arc::new(body)))
    }

    /// An asynchronous per-invocation initializer
    pub fn initialize_async<F>(name: impl Into<String>, body: F) -> Self
    where
        F: for<'a> Fn(&'a mut S) -> BoxFuture<'a, TestOutcome> + Send + Sync + 'static,
    {
        Self::instance(name, MemberRole::Initialize, Body::Async(Arc::new(body)))
    }

    /// A synchronous per-invocation cleanup
    pub fn cleanup<F>(name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&mut S) -> TestOutcome + Send + Sync + 'static,
    {
        Self::instance(name, MemberRole::Cleanup, Body::Sync(Arc::new(body)))
    }

    /// An asynchronous per-invocation cleanup
    pub fn cleanup_async<F>(name: impl Into<String>, body: F) -> Self
    where
        F: for<'a> Fn(&'a mut S) -> BoxFuture<'a, TestOutcome> + Send + Sync + 'static,
    {
        Self::instance(name, MemberRole::Cleanup, Body::Async(Arc::new(body)))
    }

    /// A once-per-type initializer, run at registration time
    pub fn class_initialize<F>(name: impl Into<String>, body: F) -> Self
    where
        F: Fn() -> TestOutcome + Send + Sync + 'static,
    {
        Self {
            metadata: MemberMetadata {
                name: name.into(),
                role: MemberRole::ClassInitialize,
                is_async: false,
                ignored: false,
                expected_failure: None,
            },
            body: MemberBody::Static(Arc::new(body)),
        }
    }

    /// Mark the member ignored
    pub fn ignore(mut self) -> Self {
        self.metadata.ignored = true;
        self
    }

    /// Require the member to raise a failure of `kind`
    pub fn expecting(mut self, kind: impl Into<String>) -> Self {
        self.metadata.expected_failure = Some(kind.into());
        self
    }

    pub fn metadata(&self) -> &MemberMetadata {
        &self.metadata
    }
}

/// Registration table for one suite type
pub struct Suite<S> {
    metadata: SuiteMetadata,
    constructor: Constructor<S>,
    members: Vec<Member<S>>,
}

impl<S: Send + 'static> Suite<S> {
    /// Register a suite with a fallible constructor
    pub fn new<F>(name: impl Into<String>, constructor: F) -> Self
    where
        F: Fn() -> Result<S, TestFailure> + Send + Sync + 'static,
    {
        Self {
            metadata: SuiteMetadata {
                name: name.into(),
                members: Vec::new(),
                ignored: false,
                deployment_items: Vec::new(),
            },
            constructor: Arc::new(constructor),
            members: Vec::new(),
        }
    }

    /// Register a suite constructed with `S::default()`
    pub fn with_default(name: impl Into<String>) -> Self
    where
        S: Default,
    {
        Self::new(name, || Ok(S::default()))
    }

    /// Declare a member
    pub fn member(mut self, member: Member<S>) -> Self {
        self.metadata.members.push(member.metadata.clone());
        self.members.push(member);
        self
    }

    pub fn test<F>(self, name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&mut S) -> TestOutcome + Send + Sync + 'static,
    {
        self.member(Member::test(name, body))
    }

    pub fn test_async<F>(self, name: impl Into<String>, body: F) -> Self
    where
        F: for<'a> Fn(&'a mut S) -> BoxFuture<'a, TestOutcome> + Send + Sync + 'static,
    {
        self.member(Member::test_async(name, body))
    }

    pub fn initialize<F>(self, name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&mut S) -> TestOutcome + Send + Sync + 'static,
    {
        self.member(Member::initialize(name, body))
    }

    pub fn initialize_async<F>(self, name: impl Into<String>, body: F) -> Self
    where
        F: for<'a> Fn(&'a mut S) -> BoxFuture<'a, TestOutcome> + Send + Sync + 'static,
    {
        self.member(Member::initialize_async(name, body))
    }

    pub fn cleanup<F>(self, name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&mut S) -> TestOutcome + Send + Sync + 'static,
    {
        self.member(Member::cleanup(name, body))
    }

    pub fn cleanup_async<F>(self, name: impl Into<String>, body: F) -> Self
    where
        F: for<'a> Fn(&'a mut S) -> BoxFuture<'a, TestOutcome> + Send + Sync + 'static,
    {
        self.member(Member::cleanup_async(name, body))
    }

    pub fn class_initialize<F>(self, name: impl Into<String>, body: F) -> Self
    where
        F: Fn() -> TestOutcome + Send + Sync + 'static,
    {
        self.member(Member::class_initialize(name, body))
    }

    /// Declare a deployment item
    pub fn deploy(mut self, item: DeploymentItem) -> Self {
        self.metadata.deployment_items.push(item);
        self
    }

    /// Mark the whole suite ignored
    pub fn ignore(mut self) -> Self {
        self.metadata.ignored = true;
        self
    }

    pub fn metadata(&self) -> &SuiteMetadata {
        &self.metadata
    }

    pub(crate) fn constructor(&self) -> Constructor<S> {
        Arc::clone(&self.constructor)
    }

    pub(crate) fn members(&self) -> &[Member<S>] {
        &self.members
    }
}

/// Object-safe view of a registered suite, as handed out by an introspector
pub trait SuiteSource: Send + Sync {
    fn metadata(&self) -> &SuiteMetadata;

    /// Run the suite's class initializer, if it declares one.
    ///
    /// On failure, returns the member name with the failure.
    fn run_class_initialize(&self) -> Result<(), (String, TestFailure)>;

    /// Compile the suite into a reusable plan
    fn compile(&self, module: &str) -> CompiledPlan;
}

impl<S: Send + 'static> SuiteSource for Suite<S> {
    fn metadata(&self) -> &SuiteMetadata {
        &self.metadata
    }

    fn run_class_initialize(&self) -> Result<(), (String, TestFailure)> {
        let declared = self.members.iter().find_map(|m| match &m.body {
            MemberBody::Static(body) => Some((m.metadata.name.as_str(), body)),
            MemberBody::Instance(_) => None,
        });

        let Some((name, body)) = declared else {
            return Ok(());
        };

        let outcome = match panic::catch_unwind(AssertUnwindSafe(|| body())) {
            Ok(outcome) => outcome,
            Err(payload) => Err(TestFailure::from_panic(payload)),
        };
        outcome.map_err(|failure| (name.to_string(), failure))
    }

    fn compile(&self, module: &str) -> CompiledPlan {
        plan::compile(self, module)
    }
}
