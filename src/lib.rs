#![cfg_attr(docsrs, feature(doc_cfg))]
//#![warn(missing_docs)]

/*!
 # EAV Batch for Rust

 Pipeline tasks and transformers to read, query and update entity-attribute-value
 (EAV) records from a batch pipeline.

 The crate does not implement storage. It works against three small
 collaborator traits, so any EAV data layer can back a pipeline:

- **FamilyRegistry:** resolves family codes into family definitions.
- **EavFinder:** counts and fetches the records matching a query, page by page,
  and looks records up by identifier or unique attribute.
- **EntityManager:** the unit of work, with a partial flush of a single value.

 An in-memory implementation of the three, `eav::memory::MemoryStore`, is
 included for tests and small pipelines.

 ## Core Concepts

- **ProcessState:** the per-step context passed by the host on every tick:
  input, output, skipped flag and log context.
- **Task / IterableTask:** a step run by `execute` once per tick; iterable tasks
  also expose `next`, returning false once their iteration is over.
- **Transformer:** a plain conversion of one value into another.
- **IterableStep:** a driver running an iterable task to its end and handing the
  produced records to an `ItemWriter`.

 ## Tasks and transformers

| **Component**                 | **Description**                                                   |
|-------------------------------|-------------------------------------------------------------------|
| `EavReaderTask`               | Iterates over the paged result set of a static query              |
| `EavCriteriaReaderTask`       | Iterates over the records matching the criteria given as input    |
| `EavUpdateSingleValueTask`    | Sets one attribute of the input record and flushes only that value |
| `SingleEavFinderTransformer`  | Finds a record from its identifier                                 |
| `UniqueEavFinderTransformer`  | Finds a record from a unique attribute value                       |

 ## Features

| **Feature**   | **Description**                                               |
|---------------|---------------------------------------------------------------|
| logger        | Enables a logger `ItemWriter`, useful for debugging purposes  |
| full          | Enables all available features                                |

 ## Getting Started

```rust
use eav_batch_rs::{
    core::{item::{ItemWriter, ItemWriterResult}, step::IterableStepBuilder},
    eav::{Attribute, Data, Family, OrderBy, memory::MemoryStore},
    error::BatchError,
    task::eav_reader::EavReaderTaskBuilder,
};
use serde_json::json;
use std::cell::RefCell;

#[derive(Default)]
struct Titles(RefCell<Vec<String>>);

impl ItemWriter<Data> for Titles {
    fn write(&self, items: &[Data]) -> ItemWriterResult {
        for item in items {
            if let Some(title) = item.get("title").and_then(|t| t.as_str()) {
                self.0.borrow_mut().push(title.to_string());
            }
        }
        Ok(())
    }
}

fn main() -> Result<(), BatchError> {
    let store = MemoryStore::new();
    let family = store.register_family(
        Family::new("book")
            .with_identifier("isbn")
            .with_attribute(Attribute::new("title")),
    );
    for (isbn, title) in [("2", "Hyperion"), ("1", "Dune")] {
        store.insert(Data::new(&family).with("isbn", json!(isbn)).with("title", json!(title)));
    }

    let reader = EavReaderTaskBuilder::new()
        .registry(&store)
        .finder(&store)
        .family("book")
        .order_by(OrderBy::asc("isbn"))
        .log_count(true)
        .build()?;

    let writer = Titles::default();
    let step = IterableStepBuilder::<(), Data>::new()
        .name("read-books")
        .task(&reader)
        .writer(&writer)
        .build();

    let execution = step.run(None)?;

    assert_eq!(execution.read_count, 2);
    assert_eq!(*writer.0.borrow(), vec!["Dune", "Hyperion"]);
    Ok(())
}
```

 ## License
 Licensed under either of

 -   Apache License, Version 2.0
     ([LICENSE-APACHE](LICENSE-APACHE) or <http://www.apache.org/licenses/LICENSE-2.0>)
 -   MIT license
     ([LICENSE-MIT](LICENSE-MIT) or <http://opensource.org/licenses/MIT>)

 at your option.
 */

/// Core module for pipeline steps
pub mod core;

/// EAV model and data-access contracts
pub mod eav;

/// Error types for batch operations
pub mod error;

#[doc(inline)]
pub use error::*;

/// Set of item writers
pub mod item;

/// Pipeline tasks reading and updating EAV records
pub mod task;

/// Transformers resolving EAV records
pub mod transformer;

#[cfg(any(test, feature = "tests-cfg"))]
pub mod test_utils;
