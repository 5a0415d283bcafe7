use std::{
    cell::{Cell, RefCell},
    cmp::Ordering,
    collections::BTreeMap,
    sync::Arc,
};

use log::debug;
use uuid::Uuid;

use crate::BatchError;

use super::{
    Attribute, Data, Direction, EavFinder, EntityManager, Family, FamilyRegistry, Query, Value,
};

/// An in-process EAV store.
///
/// Records are kept in insertion order, which is the result order of any
/// query without `order_by`. Writes go through a unit of work: persisted
/// values stay pending until flushed, and only flushed values are visible to
/// queries.
///
/// The store is meant for single-threaded pipelines and is not thread-safe.
#[derive(Default)]
pub struct MemoryStore {
    families: RefCell<BTreeMap<String, Arc<Family>>>,
    records: RefCell<Vec<Data>>,
    pending: RefCell<BTreeMap<Uuid, Value>>,
    flushed: RefCell<Vec<Uuid>>,
    fetch_count: Cell<usize>,
    count_queries: Cell<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_family(&self, family: Family) -> Arc<Family> {
        let family = Arc::new(family);
        self.families
            .borrow_mut()
            .insert(family.code().to_string(), Arc::clone(&family));
        family
    }

    /// Stores a record directly, bypassing the unit of work.
    pub fn insert(&self, data: Data) {
        self.records.borrow_mut().push(data);
    }

    pub fn get(&self, id: Uuid) -> Option<Data> {
        self.records.borrow().iter().find(|d| d.id() == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.records.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.borrow().is_empty()
    }

    /// Values persisted but not flushed yet.
    pub fn pending_values(&self) -> Vec<Value> {
        self.pending.borrow().values().cloned().collect()
    }

    /// Ids of flushed values, in flush order.
    pub fn flushed_values(&self) -> Vec<Uuid> {
        self.flushed.borrow().clone()
    }

    /// Number of page fetches served so far.
    pub fn fetch_count(&self) -> usize {
        self.fetch_count.get()
    }

    /// Number of count queries served so far.
    pub fn count_queries(&self) -> usize {
        self.count_queries.get()
    }

    fn matching(&self, query: &Query) -> Vec<Data> {
        let mut result: Vec<Data> = self
            .records
            .borrow()
            .iter()
            .filter(|d| d.family_code() == query.family.code() && query.criteria.matches(d))
            .cloned()
            .collect();

        if !query.order_by.is_empty() {
            result.sort_by(|a, b| {
                for order in &query.order_by {
                    let ordering = compare(a.get(&order.attribute), b.get(&order.attribute));
                    let ordering = match order.direction {
                        Direction::Asc => ordering,
                        Direction::Desc => ordering.reverse(),
                    };
                    if ordering != Ordering::Equal {
                        return ordering;
                    }
                }
                Ordering::Equal
            });
        }
        result
    }

    fn find_one(&self, family: &Family, attribute: &str, value: &serde_json::Value) -> Option<Data> {
        self.records
            .borrow()
            .iter()
            .find(|d| d.family_code() == family.code() && d.get(attribute) == Some(value))
            .cloned()
    }
}

/// Orders missing values first, then numbers, then everything else by text.
fn compare(a: Option<&serde_json::Value>, b: Option<&serde_json::Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
            _ => match (a.as_str(), b.as_str()) {
                (Some(a), Some(b)) => a.cmp(b),
                _ => a.to_string().cmp(&b.to_string()),
            },
        },
    }
}

impl FamilyRegistry for MemoryStore {
    fn get_family(&self, code: &str) -> Result<Arc<Family>, BatchError> {
        self.families
            .borrow()
            .get(code)
            .cloned()
            .ok_or_else(|| BatchError::MissingFamily {
                code: code.to_string(),
            })
    }
}

impl EavFinder for MemoryStore {
    fn count(&self, query: &Query) -> Result<usize, BatchError> {
        self.count_queries.set(self.count_queries.get() + 1);
        Ok(self.matching(query).len())
    }

    fn fetch(&self, query: &Query, offset: usize, limit: usize) -> Result<Vec<Data>, BatchError> {
        self.fetch_count.set(self.fetch_count.get() + 1);
        Ok(self
            .matching(query)
            .into_iter()
            .skip(offset)
            .take(limit)
            .collect())
    }

    fn find_by_unique_attribute(
        &self,
        family: &Family,
        attribute: &Attribute,
        value: &serde_json::Value,
    ) -> Result<Option<Data>, BatchError> {
        Ok(self.find_one(family, attribute.code(), value))
    }

    fn find_by_identifier(
        &self,
        family: &Family,
        identifier: &serde_json::Value,
    ) -> Result<Option<Data>, BatchError> {
        if let Some(attribute) = family.attribute_as_identifier() {
            return Ok(self.find_one(family, attribute.code(), identifier));
        }

        let id = identifier
            .as_str()
            .and_then(|id| Uuid::parse_str(id).ok())
            .ok_or_else(|| {
                BatchError::UnexpectedInput(format!("'{}' is not a valid record id", identifier))
            })?;
        Ok(self
            .get(id)
            .filter(|d| d.family_code() == family.code()))
    }
}

impl EntityManager for MemoryStore {
    fn persist(&self, value: &Value) -> Result<(), BatchError> {
        debug!("Persisting value {} ({})", value.id, value.attribute);
        self.pending.borrow_mut().insert(value.id, value.clone());
        Ok(())
    }

    fn flush_value(&self, value: &Value) -> Result<(), BatchError> {
        let pending = self.pending.borrow_mut().remove(&value.id).ok_or_else(|| {
            BatchError::Persistence(format!("Value {} is not managed by the store", value.id))
        })?;

        let mut records = self.records.borrow_mut();
        let data = records
            .iter_mut()
            .find(|d| d.id() == pending.data_id)
            .ok_or_else(|| {
                BatchError::Persistence(format!(
                    "Value {} belongs to unknown record {}",
                    pending.id, pending.data_id
                ))
            })?;
        data.put_value(pending);
        self.flushed.borrow_mut().push(value.id);

        debug!("Flushed value {}", value.id);
        Ok(())
    }
}
