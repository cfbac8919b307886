pub mod aggregate;
pub mod file_store;
pub mod persistence;
pub mod query;
pub mod store;
pub mod validate;

pub use file_store::FileStore;
pub use persistence::{Diagnostic, Encoding, Loaded, Persistence};
pub use query::Predicate;
pub use store::RecordStore;
