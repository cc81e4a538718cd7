pub mod store;

pub use store::{eq_filter, is_null_filter, DocumentStore, StoreError};
