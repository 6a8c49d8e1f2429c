//! Validation helpers
//!
//! [Validator] collects every violation instead of stopping at the first one.
use crate::reference::Property;
use std::collections::HashMap;
use std::fmt::Display;
use std::hash::Hash;
use std::ops::RangeInclusive;

/// A single violated constraint
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("`{field}` {constraint}")]
pub struct ValidationError {
    pub field: String,
    pub constraint: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, constraint: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            constraint: constraint.into(),
        }
    }
}

/// All violations found while constructing one record
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<ValidationError>);

impl ValidationErrors {
    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether any error concerns `field`
    pub fn concerns(&self, field: &str) -> bool {
        self.0.iter().any(|error| error.field == field)
    }
}

impl From<Vec<ValidationError>> for ValidationErrors {
    fn from(errors: Vec<ValidationError>) -> Self {
        Self(errors)
    }
}

impl IntoIterator for ValidationErrors {
    type Item = ValidationError;
    type IntoIter = std::vec::IntoIter<ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl std::error::Error for ValidationErrors {}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let errors: Vec<_> = self.0.iter().map(ToString::to_string).collect();
        f.write_str(&errors.join(", "))
    }
}

/// Every key that occurs more than once, each reported once, in order of first occurrence
pub fn duplicates<K: Eq + Hash + Clone>(keys: impl IntoIterator<Item = K>) -> Vec<K> {
    let mut counts: HashMap<K, usize> = HashMap::new();
    let mut order = vec![];
    for key in keys {
        let count = counts.entry(key.clone()).or_insert(0);
        *count += 1;
        if *count == 2 {
            order.push(key);
        }
    }
    order
}

/// Collects [ValidationError]s
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<ValidationError>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: impl Into<String>, constraint: impl Into<String>) {
        self.errors.push(ValidationError::new(field, constraint));
    }

    pub fn length(&mut self, field: &str, value: &str, bounds: RangeInclusive<usize>) {
        let length = value.chars().count();
        if !bounds.contains(&length) {
            self.push(
                field,
                format!(
                    "must be {} to {} characters long, got {length}",
                    bounds.start(),
                    bounds.end()
                ),
            );
        }
    }

    pub fn charset(
        &mut self,
        field: &str,
        value: &str,
        description: &str,
        admits: impl Fn(char) -> bool,
    ) {
        if let Some(invalid) = value.chars().find(|c| !admits(*c)) {
            self.push(
                field,
                format!("may only contain {description}, found `{invalid}`"),
            );
        }
    }

    pub fn range(&mut self, field: &str, value: i64, bounds: RangeInclusive<i64>) {
        if !bounds.contains(&value) {
            self.push(
                field,
                format!(
                    "must be between {} and {}, got {value}",
                    bounds.start(),
                    bounds.end()
                ),
            );
        }
    }

    pub fn one_of(&mut self, field: &str, value: &str, allowed: &[&str]) {
        if !allowed.contains(&value) {
            self.push(
                field,
                format!("must be one of {}, got `{value}`", allowed.join(", ")),
            );
        }
    }

    /// Both present or both absent
    pub fn co_occurring(&mut self, field: &str, first: (&str, bool), second: (&str, bool)) {
        if first.1 != second.1 {
            self.push(
                field,
                format!("`{}` and `{}` must be given together", first.0, second.0),
            );
        }
    }

    /// `a.b.c.d/n` or an IPv6 prefix
    pub fn cidr(&mut self, field: &str, value: &str) {
        if !is_cidr(value) {
            self.push(field, format!("must be an address prefix in CIDR notation, got `{value}`"));
        }
    }

    /// Reports every key that is used more than once
    pub fn unique<K: Eq + Hash + Clone + Display>(
        &mut self,
        field: &str,
        what: &str,
        keys: impl IntoIterator<Item = K>,
    ) {
        for duplicate in duplicates(keys) {
            self.push(field, format!("{what} `{duplicate}` is used more than once"));
        }
    }

    /// A literal string property, absence is reported when `required`
    pub fn string<'p>(
        &mut self,
        field: &str,
        property: Option<&'p Property>,
        required: bool,
    ) -> Option<&'p str> {
        match property {
            None if required => {
                self.push(field, "is required");
                None
            }
            None => None,
            Some(Property::Deferred(_)) => None,
            Some(property) => match property.as_str() {
                Some(value) => Some(value),
                None => {
                    self.push(field, "must be a string");
                    None
                }
            },
        }
    }

    /// A literal integer property, absence is reported when `required`
    pub fn integer(&mut self, field: &str, property: Option<&Property>, required: bool) -> Option<i64> {
        match property {
            None if required => {
                self.push(field, "is required");
                None
            }
            None | Some(Property::Deferred(_)) => None,
            Some(property) => match property.as_i64() {
                Some(value) => Some(value),
                None => {
                    self.push(field, "must be an integer");
                    None
                }
            },
        }
    }

    pub fn finish(self) -> Vec<ValidationError> {
        self.errors
    }
}

pub fn is_cidr(value: &str) -> bool {
    let Some((address, prefix)) = value.split_once('/') else {
        return false;
    };
    let Ok(prefix) = prefix.parse::<u8>() else {
        return false;
    };

    match address.parse::<std::net::IpAddr>() {
        Ok(std::net::IpAddr::V4(_)) => prefix <= 32,
        Ok(std::net::IpAddr::V6(_)) => prefix <= 128,
        Err(_) => false,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn every_duplicate_is_reported() {
        assert_eq!(duplicates([100, 200, 100, 300, 200]), vec![100, 200]);
        assert_eq!(duplicates([1, 1, 1]), vec![1]);
        assert!(duplicates([1, 2, 3]).is_empty());
    }

    #[test]
    fn validator_collects_all_errors() {
        let mut validator = Validator::new();
        validator.length("name", "ab", 3..=24);
        validator.charset("name", "a-b", "a-z", |c| c.is_ascii_lowercase());
        validator.range("priority", 50, 100..=4096);
        validator.one_of("direction", "Sideways", &["Inbound", "Outbound"]);
        validator.co_occurring("sku", ("name", true), ("tier", false));
        validator.cidr("addressPrefix", "10.0.0.0");
        validator.unique("rules", "priority", [100, 100]);

        let errors = validator.finish();
        assert_eq!(errors.len(), 7);
        assert_eq!(
            errors[4],
            ValidationError::new("sku", "`name` and `tier` must be given together")
        );
        assert_eq!(
            errors[6],
            ValidationError::new("rules", "priority `100` is used more than once")
        );
    }

    #[test]
    fn typed_property_access() {
        let mut validator = Validator::new();
        let number = Property::from(5i64);
        let text = Property::from("five");

        assert_eq!(validator.integer("a", Some(&number), true), Some(5));
        assert_eq!(validator.integer("b", Some(&text), true), None);
        assert_eq!(validator.string("c", None, true), None);
        assert_eq!(validator.string("d", None, false), None);
        assert_eq!(validator.string("e", Some(&text), true), Some("five"));

        let fields: Vec<_> = validator
            .finish()
            .into_iter()
            .map(|error| error.field)
            .collect();
        assert_eq!(fields, vec!["b", "c"]);
    }

    #[test]
    fn cidr_notation() {
        assert!(is_cidr("10.0.0.0/16"));
        assert!(is_cidr("fd00::/8"));
        assert!(!is_cidr("10.0.0.0/33"));
        assert!(!is_cidr("10.0.0/16"));
        assert!(!is_cidr("10.0.0.0"));
    }
}
