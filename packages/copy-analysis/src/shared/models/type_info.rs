//! Type metadata consumed by the analysis
//!
//! Only the facts the copy lattice needs: value vs reference semantics,
//! whether the type can be tracked at all, and its base types (for exception
//! filtering).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Copy semantics of a type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TypeKind {
    /// Copied by value (structs, primitives)
    Value,

    /// Copied by reference (classes, arrays, strings)
    Reference,

    /// Not analyzable (void, pointers, dynamic)
    Untracked,
}

/// Type of an analysis entity or operation
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypeInfo {
    /// Fully qualified type name
    pub name: String,

    /// Copy semantics
    pub kind: TypeKind,

    /// Base types, nearest first
    pub base_types: Vec<String>,
}

impl TypeInfo {
    /// Create a value type
    pub fn value(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: TypeKind::Value,
            base_types: Vec::new(),
        }
    }

    /// Create a reference type
    pub fn reference(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: TypeKind::Reference,
            base_types: Vec::new(),
        }
    }

    /// Create an untracked type
    pub fn untracked(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: TypeKind::Untracked,
            base_types: Vec::new(),
        }
    }

    /// The boolean type
    pub fn boolean() -> Self {
        Self::value(BOOLEAN_TYPE_NAME)
    }

    /// Add a base type
    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        self.base_types.push(base.into());
        self
    }

    #[inline]
    pub fn is_value_type(&self) -> bool {
        self.kind == TypeKind::Value
    }

    #[inline]
    pub fn is_reference_type(&self) -> bool {
        self.kind == TypeKind::Reference
    }

    #[inline]
    pub fn is_trackable(&self) -> bool {
        self.kind != TypeKind::Untracked
    }

    #[inline]
    pub fn is_boolean(&self) -> bool {
        self.name == BOOLEAN_TYPE_NAME
    }

    /// Whether this type is `name` or derives from it
    pub fn derives_from(&self, name: &str) -> bool {
        self.name == name || self.base_types.iter().any(|b| b == name)
    }
}

impl fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Name of the boolean type
pub const BOOLEAN_TYPE_NAME: &str = "bool";
