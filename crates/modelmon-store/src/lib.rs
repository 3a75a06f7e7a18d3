pub mod connector;
pub mod filter;
pub mod frames;
pub mod memory;
pub mod retry;
pub mod timerange;
pub mod types;
pub mod v3io;

pub use connector::{Credentials, HttpStoreConnector, HttpStoreOptions, MemoryStoreConnector, StoreConnector};
pub use filter::{FilterExpression, Predicate};
pub use frames::FramesClient;
pub use memory::{MemoryKvStore, MemoryTsdbStore};
pub use retry::RetryPolicy;
pub use types::{Attributes, Frame, KvItem, KvStore, StoreError, StoreResult, TsdbQuery, TsdbStore};
pub use v3io::V3ioKvClient;
