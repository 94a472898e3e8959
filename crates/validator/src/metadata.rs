//! Class metadata: which constraints apply to which property of a data class.
//!
//! Data objects are JSON values, so a "class" is just a name the caller
//! associates with a value (a form's `data_class`, or the `class` of a
//! [`Valid`](crate::ConstraintKind::Valid) marker).

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::constraint::Constraint;
use crate::error::ValidatorError;

/// Constraints declared for one data class.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassMetadata {
    /// Constraints applied to the object as a whole.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constraints: Vec<Constraint>,

    /// Constraints per property, in declaration order.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub properties: IndexMap<String, Vec<Constraint>>,
}

impl ClassMetadata {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a class-level constraint (builder-style).
    #[must_use]
    pub fn with_constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    /// Adds a constraint on one property (builder-style).
    #[must_use]
    pub fn add_property_constraint(
        mut self,
        property: impl Into<String>,
        constraint: Constraint,
    ) -> Self {
        self.properties
            .entry(property.into())
            .or_default()
            .push(constraint);
        self
    }

    /// Constraints declared on `property`, empty if none.
    #[must_use]
    pub fn property_constraints(&self, property: &str) -> &[Constraint] {
        self.properties.get(property).map_or(&[], Vec::as_slice)
    }

    /// Checks every constraint definition.
    pub fn check_definition(&self) -> Result<(), ValidatorError> {
        self.constraints
            .iter()
            .chain(self.properties.values().flatten())
            .try_for_each(Constraint::check_definition)
    }
}

/// Metadata for every known data class.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetadataRegistry {
    classes: IndexMap<String, ClassMetadata>,
}

impl MetadataRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers metadata for a class, replacing any previous entry.
    pub fn register(
        &mut self,
        class: impl Into<String>,
        metadata: ClassMetadata,
    ) -> Result<&mut Self, ValidatorError> {
        metadata.check_definition()?;
        self.classes.insert(class.into(), metadata);
        Ok(self)
    }

    /// Registers metadata for a class (builder-style, consuming).
    pub fn with(
        mut self,
        class: impl Into<String>,
        metadata: ClassMetadata,
    ) -> Result<Self, ValidatorError> {
        self.register(class, metadata)?;
        Ok(self)
    }

    /// Loads a registry from a JSON document mapping class names to metadata.
    pub fn from_json_str(json: &str) -> Result<Self, ValidatorError> {
        let registry: Self = serde_json::from_str(json)?;
        registry.check_definition()?;
        Ok(registry)
    }

    /// Loads a registry from an already parsed JSON value.
    pub fn from_json_value(value: serde_json::Value) -> Result<Self, ValidatorError> {
        let registry: Self = serde_json::from_value(value)?;
        registry.check_definition()?;
        Ok(registry)
    }

    /// Metadata for `class`, if registered.
    #[must_use]
    pub fn get(&self, class: &str) -> Option<&ClassMetadata> {
        self.classes.get(class)
    }

    /// Metadata for `class`, or an error naming it.
    pub fn require(&self, class: &str) -> Result<&ClassMetadata, ValidatorError> {
        self.get(class).ok_or_else(|| ValidatorError::UnknownClass {
            class: class.to_owned(),
        })
    }

    #[must_use]
    pub fn contains(&self, class: &str) -> bool {
        self.classes.contains_key(class)
    }

    /// Registered class names in registration order.
    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.classes.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    fn check_definition(&self) -> Result<(), ValidatorError> {
        self.classes.values().try_for_each(ClassMetadata::check_definition)
    }
}
