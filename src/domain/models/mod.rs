//! Domain models.

pub mod association;
pub mod config;
pub mod event;
pub mod memory;

pub use association::{AssociationKind, MemoryAssociation};
pub use config::{
    Config, JournalConfig, LoggingConfig, MemoryConfig, ModelConfig, VectorStoreConfig,
    VectorStoreProvider,
};
pub use event::{ContextSnapshot, ProcessorEvent, ThresholdKind, TriggerKind};
pub use memory::{
    Metadata, MetadataValue, MemoryEntry, MemoryKind, MemoryScore, META_ACCESS_COUNT,
    META_CAPTURED_AT, META_SOURCE,
};
