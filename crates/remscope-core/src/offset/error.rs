use thiserror::Error;

use crate::offset::plan::{Requirement, RequirementKind};

/// Why a discovery run was abandoned. Every variant names the lookup that failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiscoveryError {
    #[error("library {key}: module {module} is not loaded")]
    ModuleNotLoaded { key: String, module: String },

    #[error("export {key}: {module} does not export {symbol}")]
    ExportNotFound {
        key: String,
        module: String,
        symbol: String,
    },

    #[error("interface {key}: no interface starting with {prefix} in {module}")]
    InterfaceNotFound {
        key: String,
        module: String,
        prefix: String,
    },

    #[error("signature {key}: pattern not found in {module}")]
    SignatureNotFound { key: String, module: String },

    #[error("console variable {key}: {name} is not registered")]
    ConvarNotFound { key: String, name: String },

    #[error("schema {key}: reflection registry not found in {module}")]
    SchemaUnavailable { key: String, module: String },

    #[error("schema scope {scope} is missing")]
    ScopeNotFound { scope: String },

    #[error("field {key}: {class}::{field} not found")]
    FieldNotFound {
        key: String,
        class: String,
        field: String,
    },

    #[error("class size {key}: class {class} not found")]
    ClassNotFound { key: String, class: String },

    #[error("class size {key}: class {class} reports size {size}")]
    InvalidClassSize { key: String, class: String, size: i32 },

    #[error("derived value {key}: {message}")]
    DerivedValue { key: String, message: String },

    /// A resolved value the plan depends on was never produced.
    #[error("{0} was not resolved")]
    MissingEntry(String),
}

impl DiscoveryError {
    /// The plan requirement this failure belongs to.
    pub fn requirement(&self) -> Requirement {
        use RequirementKind::*;

        match self {
            DiscoveryError::ModuleNotLoaded { key, .. } => Requirement::new(Library, key),
            DiscoveryError::ExportNotFound { key, .. } => Requirement::new(Export, key),
            DiscoveryError::InterfaceNotFound { key, .. } => Requirement::new(Interface, key),
            DiscoveryError::SignatureNotFound { key, .. } => Requirement::new(Signature, key),
            DiscoveryError::ConvarNotFound { key, .. } => Requirement::new(Convar, key),
            DiscoveryError::SchemaUnavailable { key, .. } => Requirement::new(Schema, key),
            DiscoveryError::ScopeNotFound { scope } => Requirement::new(Scope, scope),
            DiscoveryError::FieldNotFound { key, .. } => Requirement::new(Field, key),
            DiscoveryError::ClassNotFound { key, .. }
            | DiscoveryError::InvalidClassSize { key, .. } => Requirement::new(ClassSize, key),
            DiscoveryError::DerivedValue { key, .. } | DiscoveryError::MissingEntry(key) => {
                Requirement::new(Derived, key)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_names_lookup() {
        let error = DiscoveryError::FieldNotFound {
            key: "pawn.health".to_string(),
            class: "C_BaseEntity".to_string(),
            field: "m_iHealth".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "field pawn.health: C_BaseEntity::m_iHealth not found"
        );
        assert_eq!(
            error.requirement(),
            Requirement::new(RequirementKind::Field, "pawn.health")
        );
    }

    #[test]
    fn test_invalid_class_size_is_class_size_requirement() {
        let error = DiscoveryError::InvalidClassSize {
            key: "entity_identity.size".to_string(),
            class: "CEntityIdentity".to_string(),
            size: 0,
        };
        assert_eq!(error.requirement().kind, RequirementKind::ClassSize);
    }
}
