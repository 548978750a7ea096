//! Shared models used by every feature

pub mod entity;
pub mod type_info;

pub use entity::{AnalysisEntity, EntityData, EntityFactory, EntityId, EntitySymbol};
pub use type_info::{TypeInfo, TypeKind, BOOLEAN_TYPE_NAME};
