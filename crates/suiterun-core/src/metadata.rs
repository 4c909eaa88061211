//! Read-only metadata view of a registered suite
//!
//! This is the shape the Module Introspector exposes: names, role tags and
//! capability flags. Executable bodies live in [`crate::suite`].

use std::path::{Path, PathBuf};

/// Member name used as the failure label while the suite is being constructed.
pub const CONSTRUCTOR_MEMBER: &str = "ctor";

/// Role a member plays in the suite lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberRole {
    /// Runs once per suite type at registration time
    ClassInitialize,
    /// Runs once per suite invocation, before any test method
    Initialize,
    /// A test method
    TestMethod,
    /// Runs once per suite invocation, after the test methods
    Cleanup,
}

impl MemberRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberRole::ClassInitialize => "class-initialize",
            MemberRole::Initialize => "initialize",
            MemberRole::TestMethod => "test",
            MemberRole::Cleanup => "cleanup",
        }
    }
}

/// Metadata for one declared member
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberMetadata {
    pub name: String,
    pub role: MemberRole,
    pub is_async: bool,
    pub ignored: bool,
    /// Failure kind the member must raise to pass
    pub expected_failure: Option<String>,
}

impl MemberMetadata {
    /// Check if this member is an eligible test method (declared, not ignored)
    pub fn is_eligible_test(&self) -> bool {
        self.role == MemberRole::TestMethod && !self.ignored
    }
}

/// A file that must be staged next to the run before the suite executes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentItem {
    /// Item path, relative to the suite's source root unless absolute
    pub path: PathBuf,
    /// Optional sub-directory of the deployment root
    pub output_directory: Option<PathBuf>,
}

impl DeploymentItem {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            output_directory: None,
        }
    }

    /// Stage the item into a sub-directory of the deployment root
    pub fn to(mut self, output_directory: impl Into<PathBuf>) -> Self {
        self.output_directory = Some(output_directory.into());
        self
    }
}

/// Metadata for one suite
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuiteMetadata {
    /// Full suite name; test records are named `{name}.{method}`
    pub name: String,
    /// Members in declaration order
    pub members: Vec<MemberMetadata>,
    pub ignored: bool,
    pub deployment_items: Vec<DeploymentItem>,
}

impl SuiteMetadata {
    /// Members with the given role, in declaration order
    pub fn members_with(&self, role: MemberRole) -> impl Iterator<Item = &MemberMetadata> {
        self.members.iter().filter(move |m| m.role == role)
    }

    /// Names of the eligible test methods, in declaration order
    pub fn eligible_tests(&self) -> Vec<&str> {
        self.members
            .iter()
            .filter(|m| m.is_eligible_test())
            .map(|m| m.name.as_str())
            .collect()
    }

    /// Names of the test methods marked ignored
    pub fn ignored_tests(&self) -> Vec<&str> {
        self.members
            .iter()
            .filter(|m| m.role == MemberRole::TestMethod && m.ignored)
            .map(|m| m.name.as_str())
            .collect()
    }

    /// Check the suite against lower-cased name filters.
    ///
    /// Matches when there are no filters, or when the suite name or any
    /// `suite.test` name contains one of them (case-insensitive).
    pub fn matches_filters(&self, filters: &[String]) -> bool {
        if filters.is_empty() {
            return true;
        }

        let suite = self.name.to_lowercase();
        let candidates: Vec<String> = std::iter::once(suite.clone())
            .chain(
                self.eligible_tests()
                    .into_iter()
                    .map(|t| format!("{}.{}", suite, t.to_lowercase())),
            )
            .collect();

        filters
            .iter()
            .any(|f| candidates.iter().any(|c| c.contains(f.as_str())))
    }

    pub fn has_deployment_items(&self) -> bool {
        !self.deployment_items.is_empty()
    }
}

/// Full test name as used for identifiers and reports
pub fn qualified_name(suite: &str, member: &str) -> String {
    format!("{}.{}", suite, member)
}

/// Directory a module file lives in
pub(crate) fn module_directory(module: &Path) -> PathBuf {
    module
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default()
}
