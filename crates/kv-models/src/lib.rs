pub mod backend;
pub mod collection;
pub mod document;
pub mod error;
pub mod hooks;
pub mod index;
pub mod keys;
pub mod kv;
pub mod query;
pub mod sync;
pub mod values;

pub use backend::{DocumentBackend, MemoryBackend};
pub use collection::Collection;
pub use document::Document;
pub use error::{ModelError, ModelResult};
pub use hooks::LifecycleHooks;
pub use index::{IndexDescriptor, IndexKind, IndexRegistry};
pub use kv::{KvClient, KvError, MemoryKv};
pub use query::{ListOptions, Query, QueryEngine};
pub use sync::IndexSynchronizer;
pub use values::FieldValue;
