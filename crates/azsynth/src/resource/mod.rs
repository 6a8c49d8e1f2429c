//! Resource model
//!
//! Two layers:
//! - [ResourceRecord]: direct mapping of one provider resource. Constructed from a [Draft] and validated exhaustively
//!   by its [ResourceSchema]. No defaults are applied here.
//! - [Intent]: what a user declares on the tree. Realizing an intent supplies a generated name, the inherited location
//!   and tags, secure defaults and derived fields, and then constructs the record.
//!
//! [ResourceSchema] is the contract to the resource type catalog. A few types are built in, see [catalog].
pub mod catalog;
mod intent;
mod record;
pub mod validate;

pub use intent::Intent;
pub use record::{BoundaryKind, BoundaryRecord, ResourceRecord};
pub use validate::{ValidationError, ValidationErrors};

use crate::naming::NamingConstraints;
use crate::reference::{DeferredRef, Grant, Property};
use crate::tree::{NodePath, Tags};
use indexmap::IndexMap;

/// Per resource type rules
pub trait ResourceSchema: std::fmt::Debug + Send + Sync {
    /// Provider type, e.g. `Microsoft.Network/virtualNetworks`
    fn type_name(&self) -> &str;

    fn api_version(&self) -> &str;

    /// Short prefix used in generated names
    fn abbreviation(&self) -> &str;

    fn constraints(&self) -> NamingConstraints;

    /// Type specific checks
    ///
    /// Must report every violation, not just the first.
    fn validate(&self, _draft: &Draft) -> Vec<ValidationError> {
        vec![]
    }

    /// Secure defaults and derived fields, applied before validation
    fn apply_defaults(&self, _draft: &mut Draft) {}

    fn mutation_profile(&self) -> MutationProfile {
        MutationProfile::Safe
    }

    /// Type of the parent resource this child type must be declared in
    fn parent_type(&self) -> Option<&str> {
        None
    }

    /// The resource is itself a managed identity
    fn is_identity(&self) -> bool {
        false
    }

    /// Names are generated (or given), not derived
    fn named(&self) -> bool {
        true
    }

    fn located(&self) -> bool {
        true
    }

    fn tagged(&self) -> bool {
        true
    }
}

/// How children of a type may be created
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationProfile {
    /// Children are emitted as separate resources
    Safe,
    /// The provider rejects concurrent child mutations of one parent. Children are embedded in the parent's
    /// `collection` property instead.
    Unsafe { collection: String },
}

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct Sku {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capacity: Option<i64>,
}

impl Sku {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn with_tier(mut self, tier: impl Into<String>) -> Self {
        self.tier = Some(tier.into());
        self
    }

    pub fn with_capacity(mut self, capacity: i64) -> Self {
        self.capacity = Some(capacity);
        self
    }
}

/// Managed identities attached to a resource
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Identity {
    pub system_assigned: bool,
    /// ids of user assigned identity resources
    pub user_assigned: Vec<DeferredRef>,
}

impl Identity {
    pub fn type_name(&self) -> &'static str {
        match (self.system_assigned, self.user_assigned.is_empty()) {
            (true, true) => "SystemAssigned",
            (true, false) => "SystemAssigned,UserAssigned",
            (false, _) => "UserAssigned",
        }
    }
}

/// Raw input of [ResourceRecord::construct]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Draft {
    pub name: String,
    pub location: Option<String>,
    pub sku: Option<Sku>,
    pub kind: Option<String>,
    pub identity: Option<Identity>,
    pub properties: Option<IndexMap<String, Property>>,
    pub tags: Option<Tags>,
    pub grant: Option<Grant>,
    pub depends_on: Vec<NodePath>,
}

impl Draft {
    pub fn property(&self, key: &str) -> Option<&Property> {
        self.properties.as_ref().and_then(|properties| properties.get(key))
    }

    /// Sets a property unless the user already did
    pub fn set_default(&mut self, key: &str, value: impl Into<Property>) {
        self.properties
            .get_or_insert_with(Default::default)
            .entry(key.to_string())
            .or_insert_with(|| value.into());
    }

    pub fn set_property(&mut self, key: &str, value: impl Into<Property>) {
        self.properties
            .get_or_insert_with(Default::default)
            .insert(key.to_string(), value.into());
    }
}

/// Maps SKU names to tiers, see [derive_tier]
#[derive(Debug, Clone, Copy)]
pub struct TierRule {
    pub prefix: &'static str,
    pub suffix: &'static str,
    pub tier: &'static str,
}

impl TierRule {
    pub const fn new(prefix: &'static str, suffix: &'static str, tier: &'static str) -> Self {
        Self {
            prefix,
            suffix,
            tier,
        }
    }

    fn matches(&self, sku_name: &str) -> bool {
        let sku_name = sku_name.to_ascii_lowercase();
        sku_name.starts_with(&self.prefix.to_ascii_lowercase())
            && sku_name.ends_with(&self.suffix.to_ascii_lowercase())
    }
}

/// First matching rule wins, `baseline` if none matches
pub fn derive_tier(sku_name: &str, rules: &[TierRule], baseline: &str) -> String {
    rules
        .iter()
        .find(|rule| rule.matches(sku_name))
        .map(|rule| rule.tier)
        .unwrap_or(baseline)
        .to_string()
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn identity_type_names() {
        let mut identity = Identity {
            system_assigned: true,
            user_assigned: vec![],
        };
        assert_eq!(identity.type_name(), "SystemAssigned");

        identity
            .user_assigned
            .push(DeferredRef::id("/rg/id".parse().unwrap()));
        assert_eq!(identity.type_name(), "SystemAssigned,UserAssigned");

        identity.system_assigned = false;
        assert_eq!(identity.type_name(), "UserAssigned");
    }

    #[test]
    fn defaults_do_not_override() {
        let mut draft = Draft::default();
        draft.set_property("publicNetworkAccess", "Enabled");
        draft.set_default("publicNetworkAccess", "Disabled");
        draft.set_default("minimumTlsVersion", "TLS1_2");

        assert_eq!(
            draft.property("publicNetworkAccess").and_then(Property::as_str),
            Some("Enabled")
        );
        assert_eq!(
            draft.property("minimumTlsVersion").and_then(Property::as_str),
            Some("TLS1_2")
        );
    }

    #[test]
    fn tier_rules_are_ordered() {
        let rules = [
            TierRule::new("P", "mv3", "PremiumMV3"),
            TierRule::new("P", "v3", "PremiumV3"),
            TierRule::new("P", "", "Premium"),
        ];
        assert_eq!(derive_tier("P1mv3", &rules, "Basic"), "PremiumMV3");
        assert_eq!(derive_tier("p2V3", &rules, "Basic"), "PremiumV3");
        assert_eq!(derive_tier("P1", &rules, "Basic"), "Premium");
        assert_eq!(derive_tier("Q1", &rules, "Basic"), "Basic");
    }
}
