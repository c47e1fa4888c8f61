use std::collections::HashMap;

use serde::Serialize;

/// One reflected class: name, byte size and field offsets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaClass {
    name: String,
    size: i32,
    fields: HashMap<String, i32>,
}

impl SchemaClass {
    pub fn new(name: impl Into<String>, size: i32, fields: HashMap<String, i32>) -> Self {
        Self {
            name: name.into(),
            size,
            fields,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> i32 {
        self.size
    }

    /// Raw signed offset as recorded by the target.
    pub fn field(&self, name: &str) -> Option<i32> {
        self.fields.get(name).copied()
    }

    /// Offset usable for address arithmetic; negative offsets count as missing.
    pub fn offset(&self, name: &str) -> Option<u64> {
        self.field(name).and_then(|offset| u64::try_from(offset).ok())
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Fields sorted by offset, then name.
    pub fn fields(&self) -> Vec<(&str, i32)> {
        let mut fields: Vec<(&str, i32)> = self
            .fields
            .iter()
            .map(|(name, offset)| (name.as_str(), *offset))
            .collect();
        fields.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(b.0)));
        fields
    }
}

/// Classes registered by one library, keyed by class name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ModuleScope {
    name: String,
    classes: HashMap<String, SchemaClass>,
}

impl ModuleScope {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            classes: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add a class; a later class with the same name replaces the earlier one.
    pub fn insert(&mut self, class: SchemaClass) {
        self.classes.insert(class.name.clone(), class);
    }

    pub fn class(&self, name: &str) -> Option<&SchemaClass> {
        self.classes.get(name)
    }

    pub fn classes(&self) -> impl Iterator<Item = &SchemaClass> {
        self.classes.values()
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn lookup(&self, class: &str, field: &str) -> Option<u64> {
        self.class(class)?.offset(field)
    }

    fn absorb(&mut self, other: ModuleScope) {
        self.classes.extend(other.classes);
    }
}

/// Every type scope of the target, keyed by scope name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Schema {
    scopes: HashMap<String, ModuleScope>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a scope, merging classes into an existing scope of the same name.
    pub fn insert(&mut self, scope: ModuleScope) {
        match self.scopes.get_mut(&scope.name) {
            Some(existing) => existing.absorb(scope),
            None => {
                self.scopes.insert(scope.name.clone(), scope);
            }
        }
    }

    pub fn scope(&self, name: &str) -> Option<&ModuleScope> {
        self.scopes.get(name)
    }

    pub fn scopes(&self) -> impl Iterator<Item = &ModuleScope> {
        self.scopes.values()
    }

    pub fn into_scope(mut self, name: &str) -> Option<ModuleScope> {
        self.scopes.remove(name)
    }

    pub fn class(&self, scope: &str, class: &str) -> Option<&SchemaClass> {
        self.scope(scope)?.class(class)
    }

    pub fn lookup(&self, scope: &str, class: &str, field: &str) -> Option<u64> {
        self.scope(scope)?.lookup(class, field)
    }

    pub fn class_count(&self) -> usize {
        self.scopes.values().map(ModuleScope::len).sum()
    }
}
