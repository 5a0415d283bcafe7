pub mod mocks;

use eav_batch_rs::eav::{Attribute, Data, Family, memory::MemoryStore};
use serde_json::json;

/// Initializes logging once for the whole test binary.
#[allow(dead_code)]
pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A store holding `orders` order records.
///
/// Orders are numbered from 1, odd ones come from the "web" channel and even
/// ones from the "shop" channel. Every order starts with status "new".
#[allow(dead_code)]
pub fn order_store(orders: usize) -> MemoryStore {
    let store = MemoryStore::new();
    let family = store.register_family(
        Family::new("order")
            .with_identifier("reference")
            .with_attribute(Attribute::new("number"))
            .with_attribute(Attribute::new("channel"))
            .with_attribute(Attribute::new("status"))
            .with_attribute(Attribute::new("tracking").unique()),
    );
    for number in 1..=orders {
        let channel = if number % 2 == 1 { "web" } else { "shop" };
        store.insert(
            Data::new(&family)
                .with("reference", json!(format!("ORD-{:03}", number)))
                .with("number", json!(number))
                .with("channel", json!(channel))
                .with("status", json!("new"))
                .with("tracking", json!(format!("TRK{}", number * 100))),
        );
    }
    store
}
