//! Operation IR
//!
//! The subset of expression/statement forms that matter for copy tracking.
//! Anything the analysis cannot relate to a storage location is modeled as
//! `Literal` or `Opaque`.

use serde::{Deserialize, Serialize};

use crate::shared::models::{AnalysisEntity, TypeInfo};

/// Conversion flavor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConversionKind {
    /// Value type to object
    Boxing,

    /// Object to value type
    Unboxing,

    /// Reference conversion (up/down cast)
    Reference { is_implicit: bool },

    /// `as`-style cast that yields null on failure
    TryCast { always_succeeds: bool },

    /// Numeric widening/narrowing (changes representation)
    Numeric,

    /// User-defined operator (arbitrary code)
    UserDefined,
}

/// Equality comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComparisonKind {
    Equals,
    NotEquals,
}

/// How an argument is passed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArgumentKind {
    Value,
    Ref,
    Out,
}

/// Invocation target
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CallTarget {
    /// Statically resolved method
    Method(String),

    /// Delegate or otherwise unresolvable target
    Unknown,
}

/// Invocation argument
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Argument {
    /// Parameter ordinal in the callee
    pub ordinal: usize,
    pub kind: ArgumentKind,
    pub value: Operation,
}

/// IR operation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    /// Read of a storage location
    Reference(AnalysisEntity),

    /// Constant
    Literal(TypeInfo),

    /// Value with no trackable origin (object creation, arithmetic, ...)
    Opaque(TypeInfo),

    /// `target = value`
    Assignment {
        target: AnalysisEntity,
        value: Box<Operation>,
    },

    /// `ref target = ref source`: both names denote the same storage
    RefAssignment {
        target: AnalysisEntity,
        source: AnalysisEntity,
    },

    Conversion {
        operand: Box<Operation>,
        kind: ConversionKind,
        ty: TypeInfo,
    },

    /// `left == right` / `left != right`
    Comparison {
        left: Box<Operation>,
        right: Box<Operation>,
        kind: ComparisonKind,
        is_reference_equality: bool,
    },

    /// `operand is null` (negated: `operand is not null`)
    IsNull {
        operand: Box<Operation>,
        negated: bool,
    },

    Invocation {
        target: CallTarget,
        arguments: Vec<Argument>,
        return_type: Option<TypeInfo>,
    },
}

impl Operation {
    pub fn reference(entity: &AnalysisEntity) -> Self {
        Operation::Reference(entity.clone())
    }

    pub fn assign(target: &AnalysisEntity, value: Operation) -> Self {
        Operation::Assignment {
            target: target.clone(),
            value: Box::new(value),
        }
    }

    /// `target = source` where both are plain references
    pub fn copy(target: &AnalysisEntity, source: &AnalysisEntity) -> Self {
        Self::assign(target, Self::reference(source))
    }

    pub fn ref_assign(target: &AnalysisEntity, source: &AnalysisEntity) -> Self {
        Operation::RefAssignment {
            target: target.clone(),
            source: source.clone(),
        }
    }

    pub fn convert(operand: Operation, kind: ConversionKind, ty: TypeInfo) -> Self {
        Operation::Conversion {
            operand: Box::new(operand),
            kind,
            ty,
        }
    }

    /// Value comparison `left == right`
    pub fn equals(left: Operation, right: Operation) -> Self {
        Self::compare(left, right, ComparisonKind::Equals, false)
    }

    /// Value comparison `left != right`
    pub fn not_equals(left: Operation, right: Operation) -> Self {
        Self::compare(left, right, ComparisonKind::NotEquals, false)
    }

    pub fn compare(
        left: Operation,
        right: Operation,
        kind: ComparisonKind,
        is_reference_equality: bool,
    ) -> Self {
        Operation::Comparison {
            left: Box::new(left),
            right: Box::new(right),
            kind,
            is_reference_equality,
        }
    }

    pub fn is_null(operand: Operation) -> Self {
        Operation::IsNull {
            operand: Box::new(operand),
            negated: false,
        }
    }

    pub fn call(method: &str, arguments: Vec<Argument>, return_type: Option<TypeInfo>) -> Self {
        Operation::Invocation {
            target: CallTarget::Method(method.to_string()),
            arguments,
            return_type,
        }
    }

    /// Type of the value produced by this operation (`None` for void calls)
    pub fn ty(&self) -> Option<TypeInfo> {
        match self {
            Operation::Reference(entity) => Some(entity.ty().clone()),
            Operation::Literal(ty) | Operation::Opaque(ty) => Some(ty.clone()),
            Operation::Assignment { target, .. } | Operation::RefAssignment { target, .. } => {
                Some(target.ty().clone())
            }
            Operation::Conversion { ty, .. } => Some(ty.clone()),
            Operation::Comparison { .. } | Operation::IsNull { .. } => Some(TypeInfo::boolean()),
            Operation::Invocation { return_type, .. } => return_type.clone(),
        }
    }

    /// Storage location denoted by this operation, if it is a plain reference
    pub fn referenced_entity(&self) -> Option<&AnalysisEntity> {
        match self {
            Operation::Reference(entity) => Some(entity),
            _ => None,
        }
    }
}

impl Argument {
    pub fn by_value(ordinal: usize, value: Operation) -> Self {
        Self {
            ordinal,
            kind: ArgumentKind::Value,
            value,
        }
    }

    pub fn by_ref(ordinal: usize, entity: &AnalysisEntity) -> Self {
        Self {
            ordinal,
            kind: ArgumentKind::Ref,
            value: Operation::reference(entity),
        }
    }

    pub fn out(ordinal: usize, entity: &AnalysisEntity) -> Self {
        Self {
            ordinal,
            kind: ArgumentKind::Out,
            value: Operation::reference(entity),
        }
    }

    /// Whether the callee may write through this argument
    pub fn is_escaped(&self) -> bool {
        matches!(self.kind, ArgumentKind::Ref | ArgumentKind::Out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::models::EntityFactory;

    #[test]
    fn test_operation_types() {
        let mut factory = EntityFactory::new();
        let a = factory.local("M", "a", TypeInfo::value("int"));

        assert_eq!(Operation::reference(&a).ty(), Some(TypeInfo::value("int")));
        assert!(Operation::equals(Operation::reference(&a), Operation::Literal(TypeInfo::value("int")))
            .ty()
            .unwrap()
            .is_boolean());
        assert_eq!(Operation::call("Log", vec![], None).ty(), None);
    }

    #[test]
    fn test_referenced_entity() {
        let mut factory = EntityFactory::new();
        let a = factory.local("M", "a", TypeInfo::value("int"));
        let b = factory.local("M", "b", TypeInfo::value("int"));

        assert_eq!(Operation::reference(&a).referenced_entity(), Some(&a));
        assert_eq!(Operation::copy(&a, &b).referenced_entity(), None);
    }

    #[test]
    fn test_escaped_arguments() {
        let mut factory = EntityFactory::new();
        let a = factory.local("M", "a", TypeInfo::value("int"));
        assert!(Argument::by_ref(0, &a).is_escaped());
        assert!(Argument::out(0, &a).is_escaped());
        assert!(!Argument::by_value(0, Operation::reference(&a)).is_escaped());
    }
}
