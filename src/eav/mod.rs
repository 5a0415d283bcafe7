//! # EAV Model
//!
//! Value types and collaborator contracts for entity-attribute-value storage.
//!
//! The tasks of this crate never talk to a database directly. They resolve
//! families through a [`FamilyRegistry`], query records through an
//! [`EavFinder`] and persist changes through an [`EntityManager`]. Any storage
//! layer implementing those three traits can back a pipeline; [`memory`]
//! provides an in-process one.

use std::{collections::BTreeMap, fmt, sync::Arc};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::BatchError;

/// In-memory EAV store with a unit of work.
pub mod memory;

/// Lazy page-by-page cursor over query results.
pub mod pager;

/// An attribute declared on a family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    code: String,
    #[serde(default)]
    unique: bool,
}

impl Attribute {
    pub fn new(code: &str) -> Self {
        Self {
            code: code.to_string(),
            unique: false,
        }
    }

    /// Declares the attribute as unique within its family.
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn is_unique(&self) -> bool {
        self.unique
    }
}

/// A named entity type owning a set of attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Family {
    code: String,
    attributes: Vec<Attribute>,
    #[serde(default)]
    attribute_as_identifier: Option<String>,
}

impl Family {
    pub fn new(code: &str) -> Self {
        Self {
            code: code.to_string(),
            attributes: Vec::new(),
            attribute_as_identifier: None,
        }
    }

    pub fn with_attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Uses the given attribute as the business identifier of the family.
    ///
    /// The attribute is added to the family (as unique) if not declared yet.
    pub fn with_identifier(mut self, code: &str) -> Self {
        if !self.has_attribute(code) {
            self.attributes.push(Attribute::new(code).unique());
        }
        self.attribute_as_identifier = Some(code.to_string());
        self
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn has_attribute(&self, code: &str) -> bool {
        self.attributes.iter().any(|a| a.code == code)
    }

    /// Returns the attribute with the given code.
    ///
    /// # Errors
    /// `BatchError::MissingAttribute` if the family does not declare it.
    pub fn get_attribute(&self, code: &str) -> Result<&Attribute, BatchError> {
        self.attributes
            .iter()
            .find(|a| a.code == code)
            .ok_or_else(|| BatchError::MissingAttribute {
                family: self.code.clone(),
                attribute: code.to_string(),
            })
    }

    pub fn attribute_as_identifier(&self) -> Option<&Attribute> {
        self.attribute_as_identifier
            .as_deref()
            .and_then(|code| self.attributes.iter().find(|a| a.code == code))
    }
}

/// A family given either by its code or by an already resolved handle.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "String")]
pub enum FamilyRef {
    Code(String),
    Handle(Arc<Family>),
}

impl FamilyRef {
    /// Normalizes the reference into a family handle.
    pub fn resolve(&self, registry: &dyn FamilyRegistry) -> Result<Arc<Family>, BatchError> {
        match self {
            FamilyRef::Handle(family) => Ok(Arc::clone(family)),
            FamilyRef::Code(code) => registry.get_family(code),
        }
    }
}

impl From<String> for FamilyRef {
    fn from(code: String) -> Self {
        FamilyRef::Code(code)
    }
}

impl From<&str> for FamilyRef {
    fn from(code: &str) -> Self {
        FamilyRef::Code(code.to_string())
    }
}

impl From<Arc<Family>> for FamilyRef {
    fn from(family: Arc<Family>) -> Self {
        FamilyRef::Handle(family)
    }
}

impl From<Family> for FamilyRef {
    fn from(family: Family) -> Self {
        FamilyRef::Handle(Arc::new(family))
    }
}

/// An attribute given either by its code or by an attribute handle.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "String")]
pub enum AttributeRef {
    Code(String),
    Handle(Attribute),
}

impl AttributeRef {
    /// Normalizes the reference against `family`.
    ///
    /// A handle is only accepted if the family declares an attribute with the
    /// same code.
    pub fn resolve(&self, family: &Family) -> Result<Attribute, BatchError> {
        let code = match self {
            AttributeRef::Code(code) => code.as_str(),
            AttributeRef::Handle(attribute) => attribute.code(),
        };
        family.get_attribute(code).cloned()
    }
}

impl From<String> for AttributeRef {
    fn from(code: String) -> Self {
        AttributeRef::Code(code)
    }
}

impl From<&str> for AttributeRef {
    fn from(code: &str) -> Self {
        AttributeRef::Code(code.to_string())
    }
}

impl From<Attribute> for AttributeRef {
    fn from(attribute: Attribute) -> Self {
        AttributeRef::Handle(attribute)
    }
}

/// A single stored attribute value, owned by a [`Data`] record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Value {
    pub id: Uuid,
    pub data_id: Uuid,
    pub attribute: String,
    pub value: serde_json::Value,
}

/// An EAV record: an identifier, its family code and its values by attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Data {
    id: Uuid,
    family: String,
    values: BTreeMap<String, Value>,
}

impl Data {
    pub fn new(family: &Family) -> Self {
        Self {
            id: Uuid::new_v4(),
            family: family.code().to_string(),
            values: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn family_code(&self) -> &str {
        &self.family
    }

    /// Sets the value of an attribute, reusing the value entity if one exists.
    pub fn set(&mut self, attribute: &str, value: serde_json::Value) -> &Value {
        let data_id = self.id;
        let entry = self
            .values
            .entry(attribute.to_string())
            .or_insert_with(|| Value {
                id: Uuid::new_v4(),
                data_id,
                attribute: attribute.to_string(),
                value: serde_json::Value::Null,
            });
        entry.value = value;
        entry
    }

    /// Builder-style variant of [`Data::set`].
    pub fn with(mut self, attribute: &str, value: serde_json::Value) -> Self {
        self.set(attribute, value);
        self
    }

    pub fn get(&self, attribute: &str) -> Option<&serde_json::Value> {
        self.values.get(attribute).map(|v| &v.value)
    }

    pub fn get_value(&self, attribute: &str) -> Option<&Value> {
        self.values.get(attribute)
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.values.values()
    }

    pub(crate) fn put_value(&mut self, value: Value) {
        self.values.insert(value.attribute.clone(), value);
    }
}

/// Equality filters applied to attribute values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Criteria(BTreeMap<String, serde_json::Value>);

impl Criteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, attribute: &str, value: serde_json::Value) -> Self {
        self.0.insert(attribute.to_string(), value);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &serde_json::Value)> {
        self.0.iter()
    }

    /// Returns true if every filter matches the record's value.
    pub fn matches(&self, data: &Data) -> bool {
        self.0
            .iter()
            .all(|(attribute, expected)| data.get(attribute) == Some(expected))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    pub attribute: String,
    #[serde(default)]
    pub direction: Direction,
}

impl OrderBy {
    pub fn asc(attribute: &str) -> Self {
        Self {
            attribute: attribute.to_string(),
            direction: Direction::Asc,
        }
    }

    pub fn desc(attribute: &str) -> Self {
        Self {
            attribute: attribute.to_string(),
            direction: Direction::Desc,
        }
    }
}

/// A fully resolved query: family, filters and ordering.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub family: Arc<Family>,
    pub criteria: Criteria,
    pub order_by: Vec<OrderBy>,
}

impl Query {
    pub fn new(family: Arc<Family>) -> Self {
        Self {
            family,
            criteria: Criteria::default(),
            order_by: Vec::new(),
        }
    }

    /// Checks that every filtered or sorted attribute belongs to the family.
    pub fn validate(&self) -> Result<(), BatchError> {
        for (attribute, _) in self.criteria.iter() {
            self.family.get_attribute(attribute)?;
        }
        for order in &self.order_by {
            self.family.get_attribute(&order.attribute)?;
        }
        Ok(())
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "family={}", self.family.code())?;
        if !self.criteria.is_empty() {
            write!(f, " criteria={:?}", self.criteria.0)?;
        }
        Ok(())
    }
}

/// Resolves family codes into family handles.
pub trait FamilyRegistry {
    /// # Errors
    /// `BatchError::MissingFamily` if no family has this code.
    fn get_family(&self, code: &str) -> Result<Arc<Family>, BatchError>;
}

/// Query side of the EAV data-access layer.
pub trait EavFinder {
    /// Counts the records matching `query`.
    fn count(&self, query: &Query) -> Result<usize, BatchError>;

    /// Fetches at most `limit` matching records starting at `offset`.
    fn fetch(&self, query: &Query, offset: usize, limit: usize) -> Result<Vec<Data>, BatchError>;

    /// Finds the record of `family` whose unique `attribute` equals `value`.
    fn find_by_unique_attribute(
        &self,
        family: &Family,
        attribute: &Attribute,
        value: &serde_json::Value,
    ) -> Result<Option<Data>, BatchError>;

    /// Finds a record by identifier attribute, or by id if the family has none.
    fn find_by_identifier(
        &self,
        family: &Family,
        identifier: &serde_json::Value,
    ) -> Result<Option<Data>, BatchError>;
}

/// Persistence side of the data-access layer (unit of work).
pub trait EntityManager {
    /// Registers the value in the unit of work without writing it.
    fn persist(&self, value: &Value) -> Result<(), BatchError>;

    /// Writes this value only; other pending changes stay pending.
    fn flush_value(&self, value: &Value) -> Result<(), BatchError>;
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn product() -> Family {
        Family::new("product")
            .with_identifier("sku")
            .with_attribute(Attribute::new("name"))
    }

    #[test]
    fn family_ref_deserializes_from_code() {
        let family: FamilyRef = serde_json::from_value(json!("product")).unwrap();
        assert_eq!(family, FamilyRef::Code("product".to_string()));
    }

    #[test]
    fn attribute_ref_rejects_foreign_handle() {
        let family = product();
        let result = AttributeRef::from(Attribute::new("color")).resolve(&family);
        assert!(matches!(
            result,
            Err(BatchError::MissingAttribute { ref family, ref attribute })
                if family == "product" && attribute == "color"
        ));

        let sku = AttributeRef::from("sku").resolve(&family).unwrap();
        assert!(sku.is_unique());
    }

    #[test]
    fn identifier_is_declared_unique() {
        let family = product();
        assert_eq!(family.attribute_as_identifier().map(|a| a.code()), Some("sku"));
        assert_eq!(family.attributes().len(), 2);
    }

    #[test]
    fn set_reuses_value_entity() {
        let family = product();
        let mut data = Data::new(&family);
        let first_id = data.set("name", json!("Laptop")).id;
        let second = data.set("name", json!("Desktop")).clone();

        assert_eq!(first_id, second.id);
        assert_eq!(second.data_id, data.id());
        assert_eq!(data.get("name"), Some(&json!("Desktop")));
    }

    #[test]
    fn criteria_match_on_every_filter() {
        let family = product();
        let data = Data::new(&family)
            .with("sku", json!("A-1"))
            .with("name", json!("Laptop"));

        assert!(Criteria::new().matches(&data));
        assert!(Criteria::new().with("sku", json!("A-1")).matches(&data));
        assert!(
            !Criteria::new()
                .with("sku", json!("A-1"))
                .with("name", json!("Desktop"))
                .matches(&data)
        );
    }

    #[test]
    fn query_validation_checks_attributes() {
        let mut query = Query::new(Arc::new(product()));
        assert!(query.validate().is_ok());

        query.order_by.push(OrderBy::desc("price"));
        assert!(matches!(
            query.validate(),
            Err(BatchError::MissingAttribute { .. })
        ));
    }
}
