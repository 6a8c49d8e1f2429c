//! Naming context and deterministic resource names
//!
//! A [NamingContext] is declared on a scope and inherited by every resource below it. [generate] turns the context, a
//! resource type abbreviation and a purpose (usually the node id) into a name that satisfies the type's
//! [NamingConstraints].
//!
//! Names that do not fit are not simply cut at the end. The least distinguishing tokens are shortened first and a
//! content hash of the full, untruncated candidate is appended, so:
//! - the same inputs always produce the same name (re-running synthesis targets the same resources)
//! - two different full candidates never collapse into the same short name (barring a hash collision)
use sha2::{Digest, Sha256};

/// Width of the content hash suffix (hex characters)
pub const HASH_LENGTH: usize = 8;

const SEPARATOR: char = '-';

/// Parameters shared by all generated names within a deployable unit
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NamingContext {
    organization: String,
    project: String,
    environment: String,
    geography: String,
    instance: String,
}

impl NamingContext {
    pub fn new(
        organization: impl Into<String>,
        project: impl Into<String>,
        environment: impl Into<String>,
        geography: impl Into<String>,
        instance: u32,
    ) -> Result<Self, NamingError> {
        Ok(Self {
            organization: token("organization", organization.into())?,
            project: token("project", project.into())?,
            environment: token("environment", environment.into())?,
            geography: token("geography", geography.into())?,
            instance: format!("{instance:02}"),
        })
    }

    pub fn organization(&self) -> &str {
        &self.organization
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn geography(&self) -> &str {
        &self.geography
    }

    pub fn instance(&self) -> &str {
        &self.instance
    }
}

fn token(field: &'static str, value: String) -> Result<String, NamingError> {
    if value.is_empty() {
        return Err(NamingError::EmptyToken { field });
    }

    if !value
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
    {
        return Err(NamingError::InvalidToken { field, value });
    }

    Ok(value)
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum NamingError {
    #[error("naming context field `{field}` must not be empty")]
    EmptyToken { field: &'static str },
    #[error("naming context field `{field}` must only contain a-z and 0-9, got `{value}`")]
    InvalidToken { field: &'static str, value: String },
}

/// Characters a resource type permits in its name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Charset {
    /// `a-z0-9`
    LowerAlphanumeric,
    /// `a-zA-Z0-9-`
    AlphanumericHyphen,
    /// `a-zA-Z0-9-_.`
    AlphanumericHyphenUnderscorePeriod,
}

impl Charset {
    pub fn admits(self, c: char) -> bool {
        match self {
            Charset::LowerAlphanumeric => c.is_ascii_lowercase() || c.is_ascii_digit(),
            Charset::AlphanumericHyphen => c.is_ascii_alphanumeric() || c == '-',
            Charset::AlphanumericHyphenUnderscorePeriod => {
                c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')
            }
        }
    }
}

impl std::fmt::Display for Charset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Charset::LowerAlphanumeric => f.write_str("a-z0-9"),
            Charset::AlphanumericHyphen => f.write_str("a-zA-Z0-9-"),
            Charset::AlphanumericHyphenUnderscorePeriod => f.write_str("a-zA-Z0-9-_."),
        }
    }
}

/// Length and charset rules of a resource type's name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NamingConstraints {
    pub min_length: usize,
    pub max_length: usize,
    pub allow_separators: bool,
    pub charset: Charset,
}

impl NamingConstraints {
    pub const fn new(min_length: usize, max_length: usize, charset: Charset) -> Self {
        Self {
            min_length,
            max_length,
            allow_separators: !matches!(charset, Charset::LowerAlphanumeric),
            charset,
        }
    }

    /// Checks an explicitly given name
    pub fn admits(&self, name: &str) -> bool {
        let length = name.chars().count();
        length >= self.min_length
            && length <= self.max_length
            && name.chars().all(|c| self.charset.admits(c))
    }
}

/// Short, fixed-width content hash of `input`
pub fn content_hash(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    let mut hash = hex::encode(digest);
    hash.truncate(HASH_LENGTH);
    hash
}

/// Lowercases and reduces a node id to `a-z0-9` runs separated by single separators
pub fn sanitize_purpose(purpose: &str) -> String {
    let mut sanitized = String::with_capacity(purpose.len());
    for c in purpose.chars() {
        if c.is_ascii_alphanumeric() {
            sanitized.push(c.to_ascii_lowercase());
        } else if !sanitized.is_empty() && !sanitized.ends_with(SEPARATOR) {
            sanitized.push(SEPARATOR);
        }
    }

    while sanitized.ends_with(SEPARATOR) {
        sanitized.pop();
    }

    sanitized
}

// token positions in the candidate
const ABBREVIATION: usize = 0;
const ORGANIZATION: usize = 1;
const PROJECT: usize = 2;
const PURPOSE: usize = 3;
const ENVIRONMENT: usize = 4;
const GEOGRAPHY: usize = 5;
const INSTANCE: usize = 6;

/// Tokens are shortened (and eventually dropped) in this order
const TRUNCATION_ORDER: [usize; 7] = [
    PROJECT,
    ORGANIZATION,
    GEOGRAPHY,
    ENVIRONMENT,
    ABBREVIATION,
    PURPOSE,
    INSTANCE,
];

/// Generates a resource name
///
/// See the [module documentation](self) for the truncation rules.
pub fn generate(
    context: &NamingContext,
    abbreviation: &str,
    purpose: &str,
    constraints: &NamingConstraints,
) -> String {
    let mut purpose = sanitize_purpose(purpose);
    if !constraints.allow_separators {
        purpose.retain(|c| c != SEPARATOR);
    }

    let mut tokens: Vec<String> = vec![
        abbreviation.to_ascii_lowercase(),
        context.organization.clone(),
        context.project.clone(),
        purpose,
        context.environment.clone(),
        context.geography.clone(),
        context.instance.clone(),
    ];

    let separator = if constraints.allow_separators {
        SEPARATOR.to_string()
    } else {
        String::new()
    };

    let candidate = join(&tokens, &separator);
    let candidate_length = candidate.chars().count();
    if candidate_length <= constraints.max_length && candidate_length >= constraints.min_length {
        return candidate;
    }

    let hash = content_hash(&candidate);
    tracing::trace!(%candidate, %hash, "name does not fit constraints");

    if candidate_length < constraints.min_length {
        let mut name = candidate;
        while name.chars().count() < constraints.min_length {
            let suffix = content_hash(&name);
            name = join(&[name, suffix], &separator);
        }
        name.truncate(constraints.max_length);
        trim_separators(&mut name);
        return name;
    }

    // room left for the tokens once the hash (and its separator) is appended
    let budget = constraints
        .max_length
        .saturating_sub(HASH_LENGTH + separator.len());

    for &position in TRUNCATION_ORDER.iter() {
        let excess = join(&tokens, &separator)
            .chars()
            .count()
            .saturating_sub(budget);
        if excess == 0 {
            break;
        }

        let token = &mut tokens[position];
        let keep = token.len().saturating_sub(excess).max(1);
        token.truncate(keep);
        trim_separators(token);
    }

    for &position in TRUNCATION_ORDER.iter() {
        if join(&tokens, &separator).chars().count() <= budget {
            break;
        }
        tokens[position].clear();
    }

    tokens.push(hash);
    let mut name = join(&tokens, &separator);
    // only reachable when max_length is smaller than the hash itself
    name.truncate(constraints.max_length);
    trim_separators(&mut name);
    name
}

/// Drops separators a cut left at the end
fn trim_separators(token: &mut String) {
    while token.ends_with(SEPARATOR) {
        token.pop();
    }
}

fn join(tokens: &[String], separator: &str) -> String {
    tokens
        .iter()
        .filter(|token| !token.is_empty())
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(separator)
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    fn context() -> NamingContext {
        NamingContext::new("ctso", "web", "nonprod", "eus", 1).unwrap()
    }

    const STORAGE: NamingConstraints = NamingConstraints::new(3, 24, Charset::LowerAlphanumeric);
    const VAULT: NamingConstraints = NamingConstraints::new(3, 24, Charset::AlphanumericHyphen);
    const NETWORK: NamingConstraints =
        NamingConstraints::new(2, 64, Charset::AlphanumericHyphenUnderscorePeriod);

    #[test]
    fn joins_tokens_with_separator() {
        assert_eq!(
            generate(&context(), "vnet", "hub", &NETWORK),
            "vnet-ctso-web-hub-nonprod-eus-01"
        );
    }

    #[test]
    fn omits_separators_when_forbidden() {
        // "stctsoweblogsnonprodeus01" is 25 characters, one too many
        assert_eq!(
            generate(&context(), "st", "logs", &STORAGE),
            format!(
                "stcwlogsnonpre01{}",
                content_hash("stctsoweblogsnonprodeus01")
            )
        );

        let name = generate(&context(), "st", "l-o_g s", &STORAGE);
        assert!(!name.contains('-'));
        assert!(STORAGE.admits(&name), "{name}");
    }

    #[test]
    fn purpose_is_sanitized() {
        assert_eq!(sanitize_purpose("Web_App  Front--end_"), "web-app-front-end");
        assert_eq!(sanitize_purpose("__"), "");
    }

    #[test]
    fn idempotent() {
        for purpose in ["a", "frontend", "a-really-long-purpose-for-a-resource"] {
            for constraints in [STORAGE, VAULT, NETWORK] {
                assert_eq!(
                    generate(&context(), "kv", purpose, &constraints),
                    generate(&context(), "kv", purpose, &constraints)
                );
            }
        }
    }

    #[test]
    fn truncation_keeps_hash_of_full_candidate() {
        let name = generate(&context(), "kv", "secrets", &VAULT);
        let full = "kv-ctso-web-secrets-nonprod-eus-01";
        assert!(full.len() > 24);
        assert!(name.len() <= 24, "{name}");
        assert!(name.ends_with(&content_hash(full)), "{name}");
        // the instance is shortened last
        assert_eq!(name, format!("k-c-w-se-n-e-01-{}", content_hash(full)));
    }

    #[test]
    fn short_names_are_padded_with_hash() {
        let constraints = NamingConstraints::new(40, 64, Charset::AlphanumericHyphen);
        let name = generate(&context(), "id", "x", &constraints);
        assert!(constraints.admits(&name), "{name}");
    }

    #[test]
    fn constraints_hold_for_all_generated_names() {
        let constraints = [
            STORAGE,
            VAULT,
            NETWORK,
            NamingConstraints::new(1, 12, Charset::AlphanumericHyphen),
            NamingConstraints::new(1, 9, Charset::LowerAlphanumeric),
        ];

        for index in 0..200 {
            let purpose = format!("Purpose_{}-{}", "x".repeat(index % 40), index);
            for constraint in constraints.iter() {
                let name = generate(&context(), "asp", &purpose, constraint);
                assert!(constraint.admits(&name), "{name} violates {constraint:?}");
            }
        }
    }

    #[test]
    fn cuts_never_leave_separators_behind() {
        let short = NamingConstraints::new(30, 33, Charset::AlphanumericHyphen);
        for index in 0..120 {
            let purpose = format!("{}-{}-{}", "a".repeat(index % 13 + 1), "b".repeat(index % 5 + 1), index);
            for constraint in [VAULT, NETWORK, short] {
                let name = generate(&context(), "kv", &purpose, &constraint);
                assert!(!name.contains("--"), "{name}");
                assert!(!name.ends_with('-'), "{name}");
            }
        }

        assert_eq!(
            generate(&context(), "kv", "a-bcdefghij", &VAULT),
            format!(
                "k-c-w-a-n-e-01-{}",
                content_hash("kv-ctso-web-a-bcdefghij-nonprod-eus-01")
            )
        );
    }

    #[test]
    fn truncated_names_do_not_collide() {
        let mut seen = std::collections::HashSet::new();
        for index in 0..2000 {
            let purpose = format!("application-frontend-service-{index}");
            let name = generate(&context(), "st", &purpose, &STORAGE);
            assert!(seen.insert(name.clone()), "collision on {name}");
        }
    }

    #[test]
    fn hash_differs_when_any_token_differs() {
        let other = NamingContext::new("ctso", "web", "prod", "eus", 1).unwrap();
        let a = generate(&context(), "kv", "secrets", &VAULT);
        let b = generate(&other, "kv", "secrets", &VAULT);
        assert_ne!(a, b);
    }

    #[test]
    fn invalid_context_tokens() {
        assert_eq!(
            NamingContext::new("", "web", "prod", "eus", 1),
            Err(NamingError::EmptyToken {
                field: "organization"
            })
        );
        assert_eq!(
            NamingContext::new("ctso", "web-app", "prod", "eus", 1),
            Err(NamingError::InvalidToken {
                field: "project",
                value: "web-app".to_string()
            })
        );
    }

    #[test]
    fn instance_is_zero_padded() {
        assert_eq!(context().instance(), "01");
        let context = NamingContext::new("a", "b", "c", "d", 123).unwrap();
        assert_eq!(context.instance(), "123");
    }
}
