//! Synthesis errors
//!
//! Problems with individual declarations are collected as [Issue]s so a single run reports all of them. Structural
//! problems (dangling references, cycles) abort synthesis immediately.
use crate::resource::ValidationError;
use crate::tree::NodePath;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum SynthesisError {
    #[error("{0}")]
    Invalid(Issues),
    #[error("{consumer} references {target}: {reason}")]
    UnresolvedReference {
        consumer: NodePath,
        target: NodePath,
        reason: &'static str,
    },
    #[error("dependency cycle: {}", display_chain(.chain))]
    DependencyCycle { chain: Vec<NodePath> },
}

fn display_chain(chain: &[NodePath]) -> String {
    chain
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// A problem with a single declaration
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum Issue {
    #[error("{path}: {error}")]
    Validation {
        path: NodePath,
        error: ValidationError,
    },
    #[error("{path}: no naming context declared here or above, and no explicit name given")]
    UnresolvableNamingContext { path: NodePath },
    #[error("{path}: grantee {grantee} is not a stable principal or identity")]
    UnstableGrantee { path: NodePath, grantee: String },
}

impl Issue {
    pub fn path(&self) -> &NodePath {
        match self {
            Issue::Validation { path, .. }
            | Issue::UnresolvableNamingContext { path }
            | Issue::UnstableGrantee { path, .. } => path,
        }
    }
}

/// Collected [Issue]s
#[derive(derive_new::new, Debug, Clone, Default, PartialEq)]
pub struct Issues {
    #[new(default)]
    issues: Vec<Issue>,
}

impl Issues {
    pub fn log(&mut self, issue: Issue) {
        tracing::trace!(%issue, "issue found");
        self.issues.push(issue);
    }

    pub fn extend(&mut self, issues: impl IntoIterator<Item = Issue>) {
        for issue in issues {
            self.log(issue);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Issue> {
        self.issues.iter()
    }

    pub fn as_slice(&self) -> &[Issue] {
        &self.issues
    }
}

impl From<Issue> for Issues {
    fn from(issue: Issue) -> Self {
        Self {
            issues: vec![issue],
        }
    }
}

impl std::error::Error for Issues {}

impl std::fmt::Display for Issues {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{} issue(s) found", self.issues.len())?;
        for issue in &self.issues {
            writeln!(f, "  {issue}")?;
        }
        Ok(())
    }
}
