use std::sync::Arc;

use log::debug;
use serde::Deserialize;

use crate::{
    BatchError,
    core::task::Transformer,
    eav::{Attribute, AttributeRef, Data, EavFinder, Family, FamilyRef, FamilyRegistry},
    task::required,
};

/// Options of [`SingleEavFinderTransformer`].
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EavFinderOptions {
    pub family: FamilyRef,
    #[serde(default)]
    pub ignore_missing: bool,
}

/// Options of [`UniqueEavFinderTransformer`].
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UniqueEavFinderOptions {
    pub family: FamilyRef,
    pub attribute: AttributeRef,
    #[serde(default)]
    pub ignore_missing: bool,
}

/// Renders a lookup value the way it appears in error messages.
fn display_value(value: &serde_json::Value) -> String {
    value
        .as_str()
        .map_or_else(|| value.to_string(), str::to_string)
}

/// Finds an EAV record from its identifier.
///
/// The family's identifier attribute is used when it declares one, the
/// record id otherwise.
pub struct SingleEavFinderTransformer<'a> {
    finder: &'a dyn EavFinder,
    family: Arc<Family>,
    ignore_missing: bool,
}

impl Transformer<serde_json::Value, Option<Data>> for SingleEavFinderTransformer<'_> {
    fn transform(&self, value: serde_json::Value) -> Result<Option<Data>, BatchError> {
        let data = self.finder.find_by_identifier(&self.family, &value)?;
        if data.is_none() && !self.ignore_missing {
            let attribute = self
                .family
                .attribute_as_identifier()
                .map_or("id", |attribute| attribute.code());
            return Err(BatchError::MissingData {
                family: self.family.code().to_string(),
                attribute: attribute.to_string(),
                value: display_value(&value),
            });
        }
        Ok(data)
    }

    fn code(&self) -> &'static str {
        "eav_finder"
    }
}

/// Finds an EAV record from a unique attribute that is not an identifier.
pub struct UniqueEavFinderTransformer<'a> {
    finder: &'a dyn EavFinder,
    family: Arc<Family>,
    attribute: Attribute,
    ignore_missing: bool,
}

impl UniqueEavFinderTransformer<'_> {
    pub fn attribute(&self) -> &Attribute {
        &self.attribute
    }
}

impl Transformer<serde_json::Value, Option<Data>> for UniqueEavFinderTransformer<'_> {
    fn transform(&self, value: serde_json::Value) -> Result<Option<Data>, BatchError> {
        let data = self
            .finder
            .find_by_unique_attribute(&self.family, &self.attribute, &value)?;
        if data.is_none() {
            if !self.ignore_missing {
                return Err(BatchError::MissingData {
                    family: self.family.code().to_string(),
                    attribute: self.attribute.code().to_string(),
                    value: display_value(&value),
                });
            }
            debug!(
                "No {} record with {} '{}', ignored",
                self.family.code(),
                self.attribute.code(),
                display_value(&value)
            );
        }
        Ok(data)
    }

    fn code(&self) -> &'static str {
        "unique_eav_finder"
    }
}

/// Builder for both finder transformers.
///
/// `build` resolves the family and returns a [`SingleEavFinderTransformer`],
/// `build_unique` additionally resolves the attribute and returns a
/// [`UniqueEavFinderTransformer`].
#[derive(Default)]
pub struct EavFinderTransformerBuilder<'a> {
    registry: Option<&'a dyn FamilyRegistry>,
    finder: Option<&'a dyn EavFinder>,
    family: Option<FamilyRef>,
    attribute: Option<AttributeRef>,
    ignore_missing: bool,
}

impl<'a> EavFinderTransformerBuilder<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn registry(mut self, registry: &'a dyn FamilyRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn finder(mut self, finder: &'a dyn EavFinder) -> Self {
        self.finder = Some(finder);
        self
    }

    pub fn family(mut self, family: impl Into<FamilyRef>) -> Self {
        self.family = Some(family.into());
        self
    }

    pub fn attribute(mut self, attribute: impl Into<AttributeRef>) -> Self {
        self.attribute = Some(attribute.into());
        self
    }

    pub fn ignore_missing(mut self, ignore_missing: bool) -> Self {
        self.ignore_missing = ignore_missing;
        self
    }

    pub fn options(mut self, options: EavFinderOptions) -> Self {
        self.family = Some(options.family);
        self.ignore_missing = options.ignore_missing;
        self
    }

    pub fn unique_options(mut self, options: UniqueEavFinderOptions) -> Self {
        self.family = Some(options.family);
        self.attribute = Some(options.attribute);
        self.ignore_missing = options.ignore_missing;
        self
    }

    fn resolve_family(&self) -> Result<(&'a dyn EavFinder, Arc<Family>), BatchError> {
        let registry = self.registry.ok_or_else(|| required("registry"))?;
        let finder = self.finder.ok_or_else(|| required("finder"))?;
        let family = self
            .family
            .as_ref()
            .ok_or_else(|| required("family"))?
            .resolve(registry)?;
        Ok((finder, family))
    }

    pub fn build(self) -> Result<SingleEavFinderTransformer<'a>, BatchError> {
        let (finder, family) = self.resolve_family()?;
        Ok(SingleEavFinderTransformer {
            finder,
            family,
            ignore_missing: self.ignore_missing,
        })
    }

    /// # Errors
    /// - `BatchError::MissingAttribute` if the family has no such attribute
    /// - `BatchError::InvalidOption` if the attribute is not declared unique
    pub fn build_unique(self) -> Result<UniqueEavFinderTransformer<'a>, BatchError> {
        let (finder, family) = self.resolve_family()?;
        let attribute = self
            .attribute
            .as_ref()
            .ok_or_else(|| required("attribute"))?
            .resolve(&family)?;

        if !attribute.is_unique() {
            return Err(BatchError::InvalidOption {
                option: "attribute".to_string(),
                message: format!(
                    "attribute {} of family {} is not unique",
                    attribute.code(),
                    family.code()
                ),
            });
        }

        Ok(UniqueEavFinderTransformer {
            finder,
            family,
            attribute,
            ignore_missing: self.ignore_missing,
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::eav::memory::MemoryStore;

    use super::*;

    fn store() -> MemoryStore {
        let store = MemoryStore::new();
        let family = store.register_family(
            Family::new("customer")
                .with_identifier("code")
                .with_attribute(Attribute::new("email").unique())
                .with_attribute(Attribute::new("city")),
        );
        store.insert(
            Data::new(&family)
                .with("code", json!("C001"))
                .with("email", json!("ada@example.com"))
                .with("city", json!("London")),
        );
        store
    }

    #[test]
    fn finds_by_unique_attribute() -> Result<(), BatchError> {
        let store = store();
        let transformer = EavFinderTransformerBuilder::new()
            .registry(&store)
            .finder(&store)
            .family("customer")
            .attribute("email")
            .build_unique()?;

        let found = transformer.transform(json!("ada@example.com"))?;

        assert_eq!(
            found.and_then(|d| d.get("code").cloned()),
            Some(json!("C001"))
        );
        assert_eq!(transformer.code(), "unique_eav_finder");
        Ok(())
    }

    #[test]
    fn missing_unique_value_fails() -> Result<(), BatchError> {
        let store = store();
        let transformer = EavFinderTransformerBuilder::new()
            .registry(&store)
            .finder(&store)
            .family("customer")
            .attribute("email")
            .build_unique()?;

        let error = transformer
            .transform(json!("bob@example.com"))
            .unwrap_err();

        assert_eq!(
            error.to_string(),
            "Missing entity for family customer and attribute email with value 'bob@example.com'"
        );
        Ok(())
    }

    #[test]
    fn ignore_missing_returns_none() -> Result<(), BatchError> {
        let store = store();
        let options: UniqueEavFinderOptions = serde_json::from_value(json!({
            "family": "customer",
            "attribute": "email",
            "ignore_missing": true,
        }))
        .unwrap();
        let transformer = EavFinderTransformerBuilder::new()
            .registry(&store)
            .finder(&store)
            .unique_options(options)
            .build_unique()?;

        assert!(transformer.transform(json!("bob@example.com"))?.is_none());
        Ok(())
    }

    #[test]
    fn attribute_must_be_unique_and_declared() {
        let store = store();
        let not_unique = EavFinderTransformerBuilder::new()
            .registry(&store)
            .finder(&store)
            .family("customer")
            .attribute("city")
            .build_unique();
        assert!(matches!(
            not_unique,
            Err(BatchError::InvalidOption { option, .. }) if option == "attribute"
        ));

        let undeclared = EavFinderTransformerBuilder::new()
            .registry(&store)
            .finder(&store)
            .family("customer")
            .attribute(Attribute::new("phone").unique())
            .build_unique();
        assert!(matches!(
            undeclared,
            Err(BatchError::MissingAttribute { attribute, .. }) if attribute == "phone"
        ));
    }

    #[test]
    fn finds_by_identifier() -> Result<(), BatchError> {
        let store = store();
        let transformer = EavFinderTransformerBuilder::new()
            .registry(&store)
            .finder(&store)
            .options(serde_json::from_value(json!({ "family": "customer" })).unwrap())
            .build()?;

        let found = transformer.transform(json!("C001"))?;
        assert_eq!(
            found.and_then(|d| d.get("city").cloned()),
            Some(json!("London"))
        );

        let error = transformer.transform(json!(42)).unwrap_err();
        assert!(matches!(
            error,
            BatchError::MissingData { ref attribute, ref value, .. }
                if attribute == "code" && value == "42"
        ));
        assert_eq!(transformer.code(), "eav_finder");
        Ok(())
    }
}
