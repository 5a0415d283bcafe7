use log::debug;
use serde::Deserialize;

use crate::{
    BatchError,
    core::{state::ProcessState, task::Task},
    eav::{Data, EntityManager, FamilyRegistry},
};

use super::required;

/// Options of [`EavUpdateSingleValueTask`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EavUpdateSingleValueOptions {
    pub attribute: String,
    pub value: serde_json::Value,
}

/// Updates and flushes a single value of the input record.
///
/// Only the value entity of the updated attribute is flushed. Anything else
/// pending in the entity manager's unit of work stays pending. The updated
/// record is passed through as the step output.
pub struct EavUpdateSingleValueTask<'a> {
    registry: &'a dyn FamilyRegistry,
    entity_manager: &'a dyn EntityManager,
    attribute: String,
    value: serde_json::Value,
}

impl<'a> EavUpdateSingleValueTask<'a> {
    pub fn attribute(&self) -> &str {
        &self.attribute
    }
}

impl Task<Data, Data> for EavUpdateSingleValueTask<'_> {
    fn execute(&self, state: &mut ProcessState<Data, Data>) -> Result<(), BatchError> {
        let mut data = state
            .get_input()
            .cloned()
            .ok_or_else(|| BatchError::UnexpectedInput("Expecting a Data as input".to_string()))?;

        let family = self.registry.get_family(data.family_code())?;
        let attribute = family.get_attribute(&self.attribute)?;

        let value = data.set(attribute.code(), self.value.clone()).clone();
        self.entity_manager.persist(&value)?;
        self.entity_manager.flush_value(&value)?;
        debug!(
            "Updated {} of {} record {}",
            attribute.code(),
            family.code(),
            data.id()
        );

        state.set_output(data);
        Ok(())
    }
}

#[derive(Default)]
pub struct EavUpdateSingleValueTaskBuilder<'a> {
    registry: Option<&'a dyn FamilyRegistry>,
    entity_manager: Option<&'a dyn EntityManager>,
    attribute: Option<String>,
    value: Option<serde_json::Value>,
}

impl<'a> EavUpdateSingleValueTaskBuilder<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn registry(mut self, registry: &'a dyn FamilyRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn entity_manager(mut self, entity_manager: &'a dyn EntityManager) -> Self {
        self.entity_manager = Some(entity_manager);
        self
    }

    pub fn options(mut self, options: EavUpdateSingleValueOptions) -> Self {
        self.attribute = Some(options.attribute);
        self.value = Some(options.value);
        self
    }

    pub fn attribute(mut self, attribute: &str) -> Self {
        self.attribute = Some(attribute.to_string());
        self
    }

    pub fn value(mut self, value: serde_json::Value) -> Self {
        self.value = Some(value);
        self
    }

    /// # Errors
    /// `BatchError::InvalidOption` if a collaborator, the attribute or the value is missing.
    pub fn build(self) -> Result<EavUpdateSingleValueTask<'a>, BatchError> {
        Ok(EavUpdateSingleValueTask {
            registry: self.registry.ok_or_else(|| required("registry"))?,
            entity_manager: self
                .entity_manager
                .ok_or_else(|| required("entity_manager"))?,
            attribute: self.attribute.ok_or_else(|| required("attribute"))?,
            value: self.value.ok_or_else(|| required("value"))?,
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::eav::{Attribute, Family, memory::MemoryStore};

    use super::*;

    fn seeded() -> (MemoryStore, Data) {
        let store = MemoryStore::new();
        let family = store.register_family(
            Family::new("order")
                .with_identifier("reference")
                .with_attribute(Attribute::new("status"))
                .with_attribute(Attribute::new("note")),
        );
        let order = Data::new(&family)
            .with("reference", json!("ORD-1"))
            .with("status", json!("new"))
            .with("note", json!(""));
        store.insert(order.clone());
        (store, order)
    }

    #[test]
    fn flushes_only_the_updated_value() -> Result<(), BatchError> {
        let (store, order) = seeded();

        let mut other = order.clone();
        let pending_note = other.set("note", json!("call customer")).clone();
        store.persist(&pending_note)?;

        let task = EavUpdateSingleValueTaskBuilder::new()
            .registry(&store)
            .entity_manager(&store)
            .attribute("status")
            .value(json!("shipped"))
            .build()?;
        let mut state = ProcessState::with_input(order.clone());

        task.execute(&mut state)?;

        let stored = store.get(order.id()).unwrap();
        assert_eq!(stored.get("status"), Some(&json!("shipped")));
        assert_eq!(stored.get("note"), Some(&json!("")));
        assert_eq!(store.pending_values(), vec![pending_note]);
        assert_eq!(
            store.flushed_values(),
            vec![order.get_value("status").unwrap().id]
        );
        assert_eq!(
            state.get_output().and_then(|d| d.get("status")),
            Some(&json!("shipped"))
        );
        Ok(())
    }

    #[test]
    fn missing_attribute_persists_nothing() -> Result<(), BatchError> {
        let (store, order) = seeded();
        let task = EavUpdateSingleValueTaskBuilder::new()
            .registry(&store)
            .entity_manager(&store)
            .options(serde_json::from_value(json!({ "attribute": "carrier", "value": "UPS" })).unwrap())
            .build()?;
        let mut state = ProcessState::with_input(order);

        let result = task.execute(&mut state);

        assert!(matches!(
            result,
            Err(BatchError::MissingAttribute { family, attribute })
                if family == "order" && attribute == "carrier"
        ));
        assert!(store.pending_values().is_empty());
        assert!(store.flushed_values().is_empty());
        assert!(state.get_output().is_none());
        Ok(())
    }

    #[test]
    fn input_is_required() -> Result<(), BatchError> {
        let (store, _) = seeded();
        let task = EavUpdateSingleValueTaskBuilder::new()
            .registry(&store)
            .entity_manager(&store)
            .attribute("status")
            .value(json!("shipped"))
            .build()?;

        assert!(matches!(
            task.execute(&mut ProcessState::new()),
            Err(BatchError::UnexpectedInput(_))
        ));
        Ok(())
    }

    #[test]
    fn value_option_is_required() {
        let store = MemoryStore::new();
        let result = EavUpdateSingleValueTaskBuilder::new()
            .registry(&store)
            .entity_manager(&store)
            .attribute("status")
            .build();

        assert!(matches!(
            result,
            Err(BatchError::InvalidOption { option, .. }) if option == "value"
        ));
    }
}
