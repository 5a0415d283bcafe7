//! Mock version of the EAV data-access layer.
use eav_batch_rs::{
    BatchError,
    eav::{Attribute, Data, EavFinder, Family, Query},
};
use mockall::mock;

mock! {
    pub Finder {}
    impl EavFinder for Finder {
        fn count(&self, query: &Query) -> Result<usize, BatchError>;
        fn fetch(&self, query: &Query, offset: usize, limit: usize) -> Result<Vec<Data>, BatchError>;
        fn find_by_unique_attribute(
            &self,
            family: &Family,
            attribute: &Attribute,
            value: &serde_json::Value,
        ) -> Result<Option<Data>, BatchError>;
        fn find_by_identifier(
            &self,
            family: &Family,
            identifier: &serde_json::Value,
        ) -> Result<Option<Data>, BatchError>;
    }
}
