//! Built-in resource types
//!
//! A deliberately small set: enough to express networks, storage, vaults, compute plans and identity grants. More
//! types are added by implementing [ResourceSchema] and registering them in a [Catalog].
use super::validate::{ValidationError, Validator};
use super::{derive_tier, Draft, MutationProfile, ResourceSchema, Sku, TierRule};
use crate::naming::{Charset, NamingConstraints};
use crate::reference::{quote, DeferredRef, Property, Request};
use crate::value::Value;
use indexmap::IndexMap;
use std::sync::Arc;

/// Resource types by short key (`storage_account`, `subnet`, ...)
#[derive(Debug, Clone)]
pub struct Catalog {
    schemas: IndexMap<String, Arc<dyn ResourceSchema>>,
}

impl Catalog {
    pub fn empty() -> Self {
        Self {
            schemas: Default::default(),
        }
    }

    pub fn builtin() -> Self {
        let mut catalog = Self::empty();
        catalog.register("storage_account", StorageAccount);
        catalog.register("virtual_network", VirtualNetwork);
        catalog.register("subnet", Subnet);
        catalog.register("network_security_group", NetworkSecurityGroup);
        catalog.register("app_service_plan", AppServicePlan);
        catalog.register("key_vault", KeyVault);
        catalog.register("user_assigned_identity", UserAssignedIdentity);
        catalog.register("role_assignment", RoleAssignment);
        catalog
    }

    pub fn register(&mut self, key: impl Into<String>, schema: impl ResourceSchema + 'static) {
        self.schemas.insert(key.into(), Arc::new(schema));
    }

    pub fn get(&self, key: &str) -> Option<Arc<dyn ResourceSchema>> {
        self.schemas.get(key).cloned()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.schemas.keys().map(String::as_str)
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}

fn sku_name(draft: &Draft) -> Option<&str> {
    draft.sku.as_ref().and_then(|sku| sku.name.as_deref())
}

/// Fills in a missing sku tier from the sku name
fn default_sku(draft: &mut Draft, name: &str, rules: &[TierRule], baseline: &str) {
    let sku = draft.sku.get_or_insert_with(|| Sku::named(name));
    if sku.tier.is_none() {
        sku.tier = sku
            .name
            .as_deref()
            .map(|name| derive_tier(name, rules, baseline));
    }
}

#[derive(Debug, Clone, Copy)]
pub struct StorageAccount;

impl StorageAccount {
    const SKUS: &'static [&'static str] = &[
        "Standard_LRS",
        "Standard_GRS",
        "Standard_RAGRS",
        "Standard_ZRS",
        "Standard_GZRS",
        "Standard_RAGZRS",
        "Premium_LRS",
        "Premium_ZRS",
    ];
    const TIERS: &'static [TierRule] = &[
        TierRule::new("Premium_", "", "Premium"),
        TierRule::new("Standard_", "", "Standard"),
    ];
}

impl ResourceSchema for StorageAccount {
    fn type_name(&self) -> &str {
        "Microsoft.Storage/storageAccounts"
    }

    fn api_version(&self) -> &str {
        "2023-01-01"
    }

    fn abbreviation(&self) -> &str {
        "st"
    }

    fn constraints(&self) -> NamingConstraints {
        NamingConstraints::new(3, 24, Charset::LowerAlphanumeric)
    }

    fn apply_defaults(&self, draft: &mut Draft) {
        draft.kind.get_or_insert_with(|| "StorageV2".to_string());
        default_sku(draft, "Standard_LRS", Self::TIERS, "Standard");
        draft.set_default("supportsHttpsTrafficOnly", true);
        draft.set_default("minimumTlsVersion", "TLS1_2");
        draft.set_default("allowBlobPublicAccess", false);
        draft.set_default("publicNetworkAccess", "Disabled");
    }

    fn validate(&self, draft: &Draft) -> Vec<ValidationError> {
        let mut validator = Validator::new();
        if let Some(name) = sku_name(draft) {
            validator.one_of("sku.name", name, Self::SKUS);
        }
        if let Some(kind) = &draft.kind {
            validator.one_of(
                "kind",
                kind,
                &["StorageV2", "Storage", "BlobStorage", "BlockBlobStorage", "FileStorage"],
            );
        }
        if let Some(tier) = validator.string("accessTier", draft.property("accessTier"), false) {
            validator.one_of("accessTier", tier, &["Hot", "Cool", "Cold", "Premium"]);
        }
        if let Some(tls) = validator.string(
            "minimumTlsVersion",
            draft.property("minimumTlsVersion"),
            false,
        ) {
            validator.one_of("minimumTlsVersion", tls, &["TLS1_0", "TLS1_1", "TLS1_2"]);
        }
        validator.finish()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct VirtualNetwork;

impl ResourceSchema for VirtualNetwork {
    fn type_name(&self) -> &str {
        "Microsoft.Network/virtualNetworks"
    }

    fn api_version(&self) -> &str {
        "2023-05-01"
    }

    fn abbreviation(&self) -> &str {
        "vnet"
    }

    fn constraints(&self) -> NamingConstraints {
        NamingConstraints::new(2, 64, Charset::AlphanumericHyphenUnderscorePeriod)
    }

    fn mutation_profile(&self) -> MutationProfile {
        MutationProfile::Unsafe {
            collection: "subnets".to_string(),
        }
    }

    fn validate(&self, draft: &Draft) -> Vec<ValidationError> {
        let mut validator = Validator::new();

        let prefixes = draft
            .property("addressSpace")
            .and_then(|space| space.get("addressPrefixes"));
        match prefixes.as_ref().and_then(Property::elements) {
            None => validator.push("addressSpace.addressPrefixes", "is required"),
            Some(prefixes) if prefixes.is_empty() => {
                validator.push("addressSpace.addressPrefixes", "must not be empty")
            }
            Some(prefixes) => {
                for (index, prefix) in prefixes.iter().enumerate() {
                    let field = format!("addressSpace.addressPrefixes[{index}]");
                    if let Some(prefix) = validator.string(&field, Some(prefix), true) {
                        validator.cidr(&field, prefix);
                    }
                }
            }
        }

        validator.finish()
    }
}

/// Subnets of a [VirtualNetwork]
///
/// Adding subnets one by one to an existing network conflicts on the provider side, so they are always embedded in
/// the network's `subnets` collection.
#[derive(Debug, Clone, Copy)]
pub struct Subnet;

impl ResourceSchema for Subnet {
    fn type_name(&self) -> &str {
        "Microsoft.Network/virtualNetworks/subnets"
    }

    fn api_version(&self) -> &str {
        "2023-05-01"
    }

    fn abbreviation(&self) -> &str {
        "snet"
    }

    fn constraints(&self) -> NamingConstraints {
        NamingConstraints::new(1, 80, Charset::AlphanumericHyphenUnderscorePeriod)
    }

    fn parent_type(&self) -> Option<&str> {
        Some("Microsoft.Network/virtualNetworks")
    }

    fn located(&self) -> bool {
        false
    }

    fn tagged(&self) -> bool {
        false
    }

    fn apply_defaults(&self, draft: &mut Draft) {
        draft.set_default("defaultOutboundAccess", false);
        draft.set_default("privateEndpointNetworkPolicies", "Enabled");
    }

    fn validate(&self, draft: &Draft) -> Vec<ValidationError> {
        let mut validator = Validator::new();
        if let Some(prefix) =
            validator.string("addressPrefix", draft.property("addressPrefix"), true)
        {
            validator.cidr("addressPrefix", prefix);
        }
        validator.finish()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct NetworkSecurityGroup;

impl ResourceSchema for NetworkSecurityGroup {
    fn type_name(&self) -> &str {
        "Microsoft.Network/networkSecurityGroups"
    }

    fn api_version(&self) -> &str {
        "2023-05-01"
    }

    fn abbreviation(&self) -> &str {
        "nsg"
    }

    fn constraints(&self) -> NamingConstraints {
        NamingConstraints::new(1, 80, Charset::AlphanumericHyphenUnderscorePeriod)
    }

    /// Rule names must be unique, priorities must be unique per direction
    fn validate(&self, draft: &Draft) -> Vec<ValidationError> {
        let mut validator = Validator::new();
        let Some(rules) = draft.property("securityRules") else {
            return validator.finish();
        };
        let Some(rules) = rules.elements() else {
            validator.push("securityRules", "must be a list");
            return validator.finish();
        };

        let mut names = vec![];
        let mut priorities: IndexMap<String, Vec<i64>> = IndexMap::new();
        for (index, rule) in rules.iter().enumerate() {
            let field = format!("securityRules[{index}]");
            let name = rule.get("name");
            if let Some(name) = validator.string(&format!("{field}.name"), name.as_ref(), true) {
                validator.length(&format!("{field}.name"), name, 1..=80);
                names.push(name.to_string());
            }

            let Some(properties) = rule.get("properties") else {
                validator.push(format!("{field}.properties"), "is required");
                continue;
            };

            let priority_field = format!("{field}.properties.priority");
            let priority = validator.integer(&priority_field, properties.get("priority").as_ref(), true);
            if let Some(priority) = priority {
                validator.range(&priority_field, priority, 100..=4096);
            }

            let direction_field = format!("{field}.properties.direction");
            let direction = properties.get("direction");
            let direction = validator.string(&direction_field, direction.as_ref(), true);
            if let Some(direction) = direction {
                validator.one_of(&direction_field, direction, &["Inbound", "Outbound"]);
            }

            let access_field = format!("{field}.properties.access");
            if let Some(access) =
                validator.string(&access_field, properties.get("access").as_ref(), true)
            {
                validator.one_of(&access_field, access, &["Allow", "Deny"]);
            }

            let protocol_field = format!("{field}.properties.protocol");
            if let Some(protocol) =
                validator.string(&protocol_field, properties.get("protocol").as_ref(), true)
            {
                validator.one_of(
                    &protocol_field,
                    protocol,
                    &["Tcp", "Udp", "Icmp", "Esp", "Ah", "*"],
                );
            }

            if let (Some(priority), Some(direction)) = (priority, direction) {
                priorities
                    .entry(direction.to_string())
                    .or_default()
                    .push(priority);
            }
        }

        validator.unique("securityRules", "rule name", names);
        for (direction, priorities) in priorities {
            validator.unique(
                "securityRules",
                &format!("{direction} priority"),
                priorities,
            );
        }

        validator.finish()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AppServicePlan;

impl AppServicePlan {
    /// Ordered, more specific rules first
    pub const TIERS: &'static [TierRule] = &[
        TierRule::new("EP", "", "ElasticPremium"),
        TierRule::new("WS", "", "WorkflowStandard"),
        TierRule::new("Y", "", "Dynamic"),
        TierRule::new("F", "", "Free"),
        TierRule::new("D", "", "Shared"),
        TierRule::new("B", "", "Basic"),
        TierRule::new("S", "", "Standard"),
        TierRule::new("P", "mv3", "PremiumMV3"),
        TierRule::new("P", "v3", "PremiumV3"),
        TierRule::new("P", "v2", "PremiumV2"),
        TierRule::new("P", "", "Premium"),
        TierRule::new("I", "v2", "IsolatedV2"),
        TierRule::new("I", "", "Isolated"),
    ];
}

impl ResourceSchema for AppServicePlan {
    fn type_name(&self) -> &str {
        "Microsoft.Web/serverfarms"
    }

    fn api_version(&self) -> &str {
        "2022-09-01"
    }

    fn abbreviation(&self) -> &str {
        "asp"
    }

    fn constraints(&self) -> NamingConstraints {
        NamingConstraints::new(1, 60, Charset::AlphanumericHyphen)
    }

    fn apply_defaults(&self, draft: &mut Draft) {
        default_sku(draft, "B1", Self::TIERS, "Basic");
        let kind = draft.kind.get_or_insert_with(|| "linux".to_string());
        // linux plans must be flagged as reserved
        let reserved = *kind == "linux";
        draft.set_default("reserved", reserved);
    }

    fn validate(&self, draft: &Draft) -> Vec<ValidationError> {
        let mut validator = Validator::new();
        if let Some(kind) = &draft.kind {
            validator.one_of(
                "kind",
                kind,
                &["linux", "windows", "app", "elastic", "functionapp"],
            );
        }
        if let Some(capacity) = draft.sku.as_ref().and_then(|sku| sku.capacity) {
            validator.range("sku.capacity", capacity, 1..=30);
        }
        validator.finish()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct KeyVault;

impl ResourceSchema for KeyVault {
    fn type_name(&self) -> &str {
        "Microsoft.KeyVault/vaults"
    }

    fn api_version(&self) -> &str {
        "2023-07-01"
    }

    fn abbreviation(&self) -> &str {
        "kv"
    }

    fn constraints(&self) -> NamingConstraints {
        NamingConstraints::new(3, 24, Charset::AlphanumericHyphen)
    }

    fn apply_defaults(&self, draft: &mut Draft) {
        draft.set_default("tenantId", "[subscription().tenantId]");
        draft.set_default(
            "sku",
            Property::object([("family", "A"), ("name", "standard")]),
        );
        draft.set_default("enableRbacAuthorization", true);
        draft.set_default("enableSoftDelete", true);
        draft.set_default("softDeleteRetentionInDays", 90i64);
        draft.set_default("enablePurgeProtection", true);
        draft.set_default("publicNetworkAccess", "Disabled");
        draft.set_default(
            "networkAcls",
            Property::object([("defaultAction", "Deny"), ("bypass", "AzureServices")]),
        );
    }

    fn validate(&self, draft: &Draft) -> Vec<ValidationError> {
        let mut validator = Validator::new();

        if !draft
            .name
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic())
        {
            validator.push("name", "must start with a letter");
        }
        if draft.name.contains("--") {
            validator.push("name", "must not contain consecutive hyphens");
        }

        validator.string("tenantId", draft.property("tenantId"), true);

        let retention_field = "softDeleteRetentionInDays";
        if let Some(days) =
            validator.integer(retention_field, draft.property(retention_field), false)
        {
            validator.range(retention_field, days, 7..=90);
        }

        if let Some(sku) = draft.property("sku") {
            if let Some(name) = validator.string("sku.name", sku.get("name").as_ref(), true) {
                validator.one_of("sku.name", name, &["standard", "premium"]);
            }
        }

        validator.finish()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct UserAssignedIdentity;

impl ResourceSchema for UserAssignedIdentity {
    fn type_name(&self) -> &str {
        "Microsoft.ManagedIdentity/userAssignedIdentities"
    }

    fn api_version(&self) -> &str {
        "2023-01-31"
    }

    fn abbreviation(&self) -> &str {
        "id"
    }

    fn constraints(&self) -> NamingConstraints {
        NamingConstraints::new(3, 128, Charset::AlphanumericHyphenUnderscorePeriod)
    }

    fn is_identity(&self) -> bool {
        true
    }
}

/// Grants a role on a scope, built from a [crate::reference::Grant]
#[derive(Debug, Clone, Copy)]
pub struct RoleAssignment;

impl ResourceSchema for RoleAssignment {
    fn type_name(&self) -> &str {
        "Microsoft.Authorization/roleAssignments"
    }

    fn api_version(&self) -> &str {
        "2022-04-01"
    }

    fn abbreviation(&self) -> &str {
        "ra"
    }

    fn constraints(&self) -> NamingConstraints {
        NamingConstraints::new(36, 36, Charset::AlphanumericHyphen)
    }

    fn named(&self) -> bool {
        false
    }

    fn located(&self) -> bool {
        false
    }

    fn tagged(&self) -> bool {
        false
    }

    fn apply_defaults(&self, draft: &mut Draft) {
        let Some(grant) = draft.grant.clone() else {
            return;
        };

        draft.set_property(
            "roleDefinitionId",
            format!(
                "[subscriptionResourceId('Microsoft.Authorization/roleDefinitions', {})]",
                quote(&grant.role)
            ),
        );

        let (principal, principal_type) = match &grant.grantee {
            Property::Deferred(reference) if reference.request == Request::Id => (
                Property::Deferred(DeferredRef::principal_id(reference.target.clone())),
                grant
                    .principal_type
                    .clone()
                    .or_else(|| Some("ServicePrincipal".to_string())),
            ),
            other => (other.clone(), grant.principal_type.clone()),
        };
        draft.set_property("principalId", principal);
        if let Some(principal_type) = principal_type {
            draft.set_property("principalType", principal_type);
        }
    }

    fn validate(&self, draft: &Draft) -> Vec<ValidationError> {
        let mut validator = Validator::new();
        match &draft.grant {
            None => validator.push("grant", "is required"),
            Some(grant) => {
                if uuid::Uuid::parse_str(&grant.role).is_err() {
                    validator.push("role", format!("must be a role definition GUID, got `{}`", grant.role));
                }
                if grant.scope.request != Request::Id {
                    validator.push("scope", format!("must reference an id, got {}", grant.scope));
                }
                if let Property::Literal(Value::String(principal)) = &grant.grantee {
                    if uuid::Uuid::parse_str(principal).is_err() {
                        validator.push(
                            "grantee",
                            format!("must be a principal GUID, got `{principal}`"),
                        );
                    }
                }
                if let Some(principal_type) = &grant.principal_type {
                    validator.one_of(
                        "principalType",
                        principal_type,
                        &["User", "Group", "ServicePrincipal", "ForeignGroup", "Device"],
                    );
                }
            }
        }
        validator.finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::reference::{roles, Grant};
    use crate::resource::ResourceRecord;
    use pretty_assertions::assert_eq;

    fn draft(name: &str) -> Draft {
        Draft {
            name: name.to_string(),
            location: Some("eastus".to_string()),
            ..Default::default()
        }
    }

    fn rule(name: &str, priority: i64, direction: &str) -> Property {
        Property::object([
            ("name", Property::from(name)),
            (
                "properties",
                Property::object([
                    ("priority", Property::from(priority)),
                    ("direction", Property::from(direction)),
                    ("access", Property::from("Allow")),
                    ("protocol", Property::from("Tcp")),
                ]),
            ),
        ])
    }

    #[test]
    fn duplicate_priorities_are_all_reported() {
        let mut draft = draft("nsg-web");
        draft.set_property(
            "securityRules",
            Property::array([
                rule("a", 100, "Inbound"),
                rule("b", 200, "Inbound"),
                rule("c", 100, "Inbound"),
                rule("d", 300, "Inbound"),
                rule("e", 200, "Inbound"),
            ]),
        );

        let errors = ResourceRecord::construct(&NetworkSecurityGroup, draft).unwrap_err();
        let constraints: Vec<_> = errors.iter().map(|e| e.constraint.clone()).collect();
        assert_eq!(
            constraints,
            vec![
                "Inbound priority `100` is used more than once",
                "Inbound priority `200` is used more than once",
            ]
        );
    }

    #[test]
    fn priorities_are_unique_per_direction() {
        let mut draft = draft("nsg-web");
        draft.set_property(
            "securityRules",
            Property::array([rule("in", 100, "Inbound"), rule("out", 100, "Outbound")]),
        );
        assert!(ResourceRecord::construct(&NetworkSecurityGroup, draft).is_ok());
    }

    #[test]
    fn malformed_rules() {
        let mut draft = draft("nsg-web");
        draft.set_property(
            "securityRules",
            Property::array([rule("a", 50, "Sideways"), rule("a", 200, "Inbound")]),
        );
        let errors = ResourceRecord::construct(&NetworkSecurityGroup, draft).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec![
                "securityRules[0].properties.priority",
                "securityRules[0].properties.direction",
                "securityRules",
            ]
        );
    }

    #[test]
    fn app_service_plan_tier_is_derived() {
        for (sku, tier) in [
            ("F1", "Free"),
            ("B2", "Basic"),
            ("S1", "Standard"),
            ("P1v3", "PremiumV3"),
            ("P1mv3", "PremiumMV3"),
            ("EP1", "ElasticPremium"),
            ("I1v2", "IsolatedV2"),
            ("Z9", "Basic"),
        ] {
            let mut draft = draft("asp-web");
            draft.sku = Some(Sku::named(sku));
            AppServicePlan.apply_defaults(&mut draft);
            assert_eq!(draft.sku.unwrap().tier.as_deref(), Some(tier), "{sku}");
        }
    }

    #[test]
    fn explicit_tier_is_kept() {
        let mut draft = draft("asp-web");
        draft.sku = Some(Sku::named("P1v3").with_tier("Premium"));
        AppServicePlan.apply_defaults(&mut draft);
        assert_eq!(draft.sku.unwrap().tier.as_deref(), Some("Premium"));
    }

    #[test]
    fn storage_is_private_by_default() {
        let mut draft = draft("stdata");
        StorageAccount.apply_defaults(&mut draft);
        assert_eq!(
            draft.property("allowBlobPublicAccess"),
            Some(&Property::from(false))
        );
        assert_eq!(
            draft.property("publicNetworkAccess"),
            Some(&Property::from("Disabled"))
        );
        assert_eq!(
            draft.sku,
            Some(Sku::named("Standard_LRS").with_tier("Standard"))
        );
        assert!(ResourceRecord::construct(&StorageAccount, draft).is_ok());
    }

    #[test]
    fn opting_in_to_public_access() {
        let mut draft = draft("stdata");
        draft.set_property("publicNetworkAccess", "Enabled");
        StorageAccount.apply_defaults(&mut draft);
        assert_eq!(
            draft.property("publicNetworkAccess"),
            Some(&Property::from("Enabled"))
        );
    }

    #[test]
    fn virtual_network_requires_address_space() {
        let errors = ResourceRecord::construct(&VirtualNetwork, draft("vnet-hub")).unwrap_err();
        assert!(errors.concerns("addressSpace.addressPrefixes"));

        let mut valid = draft("vnet-hub");
        valid.set_property(
            "addressSpace",
            Property::object([("addressPrefixes", Property::array(["10.0.0.0/16"]))]),
        );
        assert!(ResourceRecord::construct(&VirtualNetwork, valid).is_ok());

        let mut invalid = draft("vnet-hub");
        invalid.set_property(
            "addressSpace",
            Property::object([("addressPrefixes", Property::array(["10.0.0.0/16", "nope"]))]),
        );
        let errors = ResourceRecord::construct(&VirtualNetwork, invalid).unwrap_err();
        assert!(errors.concerns("addressSpace.addressPrefixes[1]"));
    }

    #[test]
    fn key_vault_defaults_validate() {
        let mut draft = draft("kv-secrets");
        KeyVault.apply_defaults(&mut draft);
        assert!(ResourceRecord::construct(&KeyVault, draft.clone()).is_ok());

        draft.set_property("softDeleteRetentionInDays", 3i64);
        let errors = ResourceRecord::construct(&KeyVault, draft).unwrap_err();
        assert!(errors.concerns("softDeleteRetentionInDays"));
    }

    #[test]
    fn generated_vault_names_validate() {
        let context = crate::naming::NamingContext::new("ctso", "web", "nonprod", "eus", 1).unwrap();
        let mut purposes = vec!["a-bcdefghij".to_string(), "secrets".to_string()];
        for index in 0..60 {
            purposes.push(format!("{}-{}-x", "a".repeat(index % 13 + 1), "b".repeat(index % 7 + 1)));
        }

        for purpose in &purposes {
            let name = crate::naming::generate(&context, KeyVault.abbreviation(), purpose, &KeyVault.constraints());
            let mut draft = draft(&name);
            KeyVault.apply_defaults(&mut draft);
            assert!(ResourceRecord::construct(&KeyVault, draft).is_ok(), "{purpose} -> {name}");
        }
    }

    #[test]
    fn role_assignment_properties() {
        let grant = Grant::new(
            DeferredRef::id("/rg/st".parse().unwrap()),
            roles::READER,
            DeferredRef::id("/rg/identity".parse().unwrap()),
        );
        let mut draft = Draft {
            name: "reader".to_string(),
            grant: Some(grant),
            ..Default::default()
        };
        RoleAssignment.apply_defaults(&mut draft);

        assert_eq!(
            draft.property("principalId"),
            Some(&Property::Deferred(DeferredRef::principal_id(
                "/rg/identity".parse().unwrap()
            )))
        );
        assert_eq!(
            draft.property("principalType"),
            Some(&Property::from("ServicePrincipal"))
        );
        assert!(ResourceRecord::construct(&RoleAssignment, draft).is_ok());
    }

    #[test]
    fn role_assignment_requires_guids() {
        let grant = Grant::new(
            DeferredRef::name("/rg/st".parse().unwrap()),
            "reader",
            "not-a-guid",
        );
        let draft = Draft {
            name: "reader".to_string(),
            grant: Some(grant),
            ..Default::default()
        };
        let errors = ResourceRecord::construct(&RoleAssignment, draft).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["role", "scope", "grantee"]);
    }

    #[test]
    fn builtin_catalog_keys() {
        let catalog = Catalog::builtin();
        assert_eq!(catalog.keys().count(), 8);
        assert_eq!(
            catalog.get("subnet").map(|schema| schema.type_name().to_string()),
            Some("Microsoft.Network/virtualNetworks/subnets".to_string())
        );
        assert!(catalog.get("unknown").is_none());
    }
}
