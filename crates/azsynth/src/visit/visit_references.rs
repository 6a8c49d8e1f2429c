use super::Visit;
use crate::reference::{DeferredRef, Grant, Property};
use crate::resource::{Identity, ResourceRecord};

/// Recursively visit all [DeferredRef]s
pub trait VisitReferences {
    fn visit_references(&self, visitor: &mut dyn Visit<DeferredRef>);
}

impl VisitReferences for Property {
    fn visit_references(&self, visitor: &mut dyn Visit<DeferredRef>) {
        match self {
            Property::Literal(_) => {}
            Property::Deferred(reference) => visitor.visit(reference),
            Property::Array(array) => {
                for element in array {
                    element.visit_references(visitor);
                }
            }
            Property::Object(object) => {
                for value in object.values() {
                    value.visit_references(visitor);
                }
            }
        }
    }
}

impl VisitReferences for Identity {
    fn visit_references(&self, visitor: &mut dyn Visit<DeferredRef>) {
        for reference in &self.user_assigned {
            visitor.visit(reference);
        }
    }
}

impl VisitReferences for Grant {
    fn visit_references(&self, visitor: &mut dyn Visit<DeferredRef>) {
        visitor.visit(&self.scope);
        self.grantee.visit_references(visitor);
    }
}

impl VisitReferences for ResourceRecord {
    fn visit_references(&self, visitor: &mut dyn Visit<DeferredRef>) {
        if let Some(identity) = self.identity() {
            identity.visit_references(visitor);
        }
        for property in self.properties().into_iter().flat_map(|p| p.values()) {
            property.visit_references(visitor);
        }
        if let Some(grant) = self.grant() {
            grant.visit_references(visitor);
        }
    }
}
