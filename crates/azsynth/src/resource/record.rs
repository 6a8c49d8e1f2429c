use super::validate::{ValidationError, ValidationErrors, Validator};
use super::{Draft, Identity, ResourceSchema, Sku};
use crate::naming::{Charset, NamingConstraints};
use crate::reference::{Grant, Property, Request};
use crate::tree::{NodePath, Tags};
use indexmap::IndexMap;

/// One provider resource, validated and immutable
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceRecord {
    resource_type: String,
    api_version: String,
    name: String,
    location: Option<String>,
    sku: Option<Sku>,
    kind: Option<String>,
    identity: Option<Identity>,
    properties: Option<IndexMap<String, Property>>,
    tags: Option<Tags>,
    grant: Option<Grant>,
    depends_on: Vec<NodePath>,
    child: bool,
    is_identity: bool,
}

impl ResourceRecord {
    /// Validates `draft` against `schema`
    ///
    /// Either every violation is returned or the complete record; nothing is assigned before validation passed.
    pub fn construct(schema: &dyn ResourceSchema, draft: Draft) -> Result<Self, ValidationErrors> {
        let mut errors = common_errors(schema, &draft);
        errors.extend(schema.validate(&draft));

        if !errors.is_empty() {
            tracing::debug!(resource_type = schema.type_name(), name = %draft.name, ?errors, "invalid record");
            return Err(errors.into());
        }

        let Draft {
            name,
            location,
            sku,
            kind,
            identity,
            properties,
            tags,
            grant,
            depends_on,
        } = draft;

        Ok(Self {
            resource_type: schema.type_name().to_string(),
            api_version: schema.api_version().to_string(),
            name,
            location,
            sku,
            kind,
            identity,
            properties,
            tags,
            grant,
            depends_on,
            child: schema.parent_type().is_some(),
            is_identity: schema.is_identity(),
        })
    }

    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    pub fn sku(&self) -> Option<&Sku> {
        self.sku.as_ref()
    }

    pub fn kind(&self) -> Option<&str> {
        self.kind.as_deref()
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn properties(&self) -> Option<&IndexMap<String, Property>> {
        self.properties.as_ref()
    }

    pub fn tags(&self) -> Option<&Tags> {
        self.tags.as_ref()
    }

    pub fn grant(&self) -> Option<&Grant> {
        self.grant.as_ref()
    }

    pub fn depends_on(&self) -> &[NodePath] {
        &self.depends_on
    }

    /// Nested below another resource type
    pub fn is_child(&self) -> bool {
        self.child
    }

    /// A user assigned identity resource
    pub fn is_identity(&self) -> bool {
        self.is_identity
    }
}

/// Checks every type has in common
fn common_errors(schema: &dyn ResourceSchema, draft: &Draft) -> Vec<ValidationError> {
    let mut validator = Validator::new();

    if schema.named() {
        let constraints = schema.constraints();
        validator.length(
            "name",
            &draft.name,
            constraints.min_length..=constraints.max_length,
        );
        validator.charset(
            "name",
            &draft.name,
            &constraints.charset.to_string(),
            |c| constraints.charset.admits(c),
        );
    }

    match (schema.located(), &draft.location) {
        (true, None) => validator.push("location", "is required"),
        (false, Some(_)) => validator.push("location", "is not supported by this type"),
        _ => {}
    }

    if let Some(sku) = &draft.sku {
        validator.co_occurring(
            "sku",
            ("name", sku.name.is_some()),
            ("tier", sku.tier.is_some()),
        );
        if sku.name.is_none() && sku.tier.is_none() {
            validator.push("sku", "requires `name` and `tier`");
        }
    }

    if let Some(identity) = &draft.identity {
        if !identity.system_assigned && identity.user_assigned.is_empty() {
            validator.push(
                "identity",
                "must be system assigned or list at least one user assigned identity",
            );
        }
        for reference in &identity.user_assigned {
            if reference.request != Request::Id {
                validator.push(
                    "identity",
                    format!("must reference identities by id, got {reference}"),
                );
            }
        }
    }

    validator.finish()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryKind {
    Subscription,
    ResourceGroup,
}

/// A deployment boundary (subscription or resource group container), validated
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryRecord {
    kind: BoundaryKind,
    name: Option<String>,
    location: Option<String>,
    tags: Tags,
}

impl BoundaryRecord {
    pub const RESOURCE_GROUP_TYPE: &'static str = "Microsoft.Resources/resourceGroups";
    pub const RESOURCE_GROUP_API_VERSION: &'static str = "2022-09-01";
    pub const RESOURCE_GROUP_ABBREVIATION: &'static str = "rg";
    pub const RESOURCE_GROUP_CONSTRAINTS: NamingConstraints =
        NamingConstraints::new(1, 90, Charset::AlphanumericHyphenUnderscorePeriod);

    pub fn subscription() -> Self {
        Self {
            kind: BoundaryKind::Subscription,
            name: None,
            location: None,
            tags: Default::default(),
        }
    }

    pub fn resource_group(
        name: String,
        location: Option<String>,
        tags: Tags,
    ) -> Result<Self, ValidationErrors> {
        let constraints = Self::RESOURCE_GROUP_CONSTRAINTS;
        let mut validator = Validator::new();
        validator.length(
            "name",
            &name,
            constraints.min_length..=constraints.max_length,
        );
        validator.charset("name", &name, &constraints.charset.to_string(), |c| {
            constraints.charset.admits(c)
        });
        if location.is_none() {
            validator.push("location", "is required");
        }

        let errors = validator.finish();
        if !errors.is_empty() {
            return Err(errors.into());
        }

        Ok(Self {
            kind: BoundaryKind::ResourceGroup,
            name: Some(name),
            location,
            tags,
        })
    }

    pub fn kind(&self) -> BoundaryKind {
        self.kind
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    pub fn tags(&self) -> &Tags {
        &self.tags
    }
}
