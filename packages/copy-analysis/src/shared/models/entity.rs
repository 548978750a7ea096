//! Analysis entities
//!
//! An analysis entity is a stable identifier for a storage location: a local,
//! a parameter, a flow capture, a member projection of another entity, `this`,
//! or a static field. Entities are interned by [`EntityFactory`] so that the
//! same location always yields the same id; equality, ordering and hashing of
//! [`AnalysisEntity`] use only that id.
//!
//! Ids are only meaningful within one factory. All CFGs that take part in one
//! (interprocedural) analysis must share a factory.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use super::type_info::TypeInfo;

/// Interned entity id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u32);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

/// What kind of storage an entity denotes
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntitySymbol {
    /// Local variable
    Local(String),

    /// Method parameter
    Parameter { name: String, ordinal: usize },

    /// Compiler-introduced capture of an intermediate value
    FlowCapture(u32),

    /// Member projection (`parent.name`)
    Field(String),

    /// The receiver of an instance method
    ThisOrMe,

    /// Static field, visible from every method
    Static { container: String, name: String },
}

/// Entity payload shared by all handles
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityData {
    pub id: EntityId,
    pub symbol: EntitySymbol,

    /// Method that owns the storage (`None` for statics and their members)
    pub owner: Option<String>,

    /// Containing entity for member projections
    pub parent: Option<AnalysisEntity>,

    pub ty: TypeInfo,

    /// The instance holding this location is not known (e.g. `Create().f`)
    pub has_unknown_instance_location: bool,
}

/// Cheap, clonable handle to an interned entity
#[derive(Clone)]
pub struct AnalysisEntity(Arc<EntityData>);

impl AnalysisEntity {
    #[inline]
    pub fn id(&self) -> EntityId {
        self.0.id
    }

    #[inline]
    pub fn symbol(&self) -> &EntitySymbol {
        &self.0.symbol
    }

    #[inline]
    pub fn ty(&self) -> &TypeInfo {
        &self.0.ty
    }

    #[inline]
    pub fn owner(&self) -> Option<&str> {
        self.0.owner.as_deref()
    }

    #[inline]
    pub fn parent(&self) -> Option<&AnalysisEntity> {
        self.0.parent.as_ref()
    }

    #[inline]
    pub fn has_unknown_instance_location(&self) -> bool {
        self.0.has_unknown_instance_location
    }

    /// Whether this entity is a member projection of another entity
    #[inline]
    pub fn is_child(&self) -> bool {
        self.0.parent.is_some()
    }

    #[inline]
    pub fn is_flow_capture(&self) -> bool {
        matches!(self.0.symbol, EntitySymbol::FlowCapture(_))
    }

    #[inline]
    pub fn is_local(&self) -> bool {
        matches!(self.0.symbol, EntitySymbol::Local(_))
    }

    #[inline]
    pub fn is_parameter(&self) -> bool {
        matches!(self.0.symbol, EntitySymbol::Parameter { .. })
    }

    /// Top-most ancestor (the entity itself when it has no parent)
    pub fn root(&self) -> &AnalysisEntity {
        let mut current = self;
        while let Some(parent) = current.parent() {
            current = parent;
        }
        current
    }

    /// Iterator over parent, grand-parent, ...
    pub fn ancestors(&self) -> impl Iterator<Item = &AnalysisEntity> {
        std::iter::successors(self.parent(), |e| e.parent())
    }

    /// Whether `other` is a (transitive) parent of this entity
    pub fn is_descendant_of(&self, other: &AnalysisEntity) -> bool {
        self.ancestors().any(|a| a == other)
    }

    /// Whether the storage belongs to `method` (locals, parameters, flow
    /// captures, `this` of that method, and member projections of those)
    pub fn is_owned_by(&self, method: &str) -> bool {
        self.root().owner() == Some(method)
    }

    pub fn data(&self) -> &EntityData {
        &self.0
    }
}

impl PartialEq for AnalysisEntity {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}

impl Eq for AnalysisEntity {}

impl Hash for AnalysisEntity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.id.hash(state);
    }
}

impl PartialOrd for AnalysisEntity {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for AnalysisEntity {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.id.cmp(&other.0.id)
    }
}

impl fmt::Debug for AnalysisEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self, self.0.id)
    }
}

impl fmt::Display for AnalysisEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0.symbol {
            EntitySymbol::Local(name) => write!(f, "{}", name),
            EntitySymbol::Parameter { name, .. } => write!(f, "{}", name),
            EntitySymbol::FlowCapture(id) => write!(f, "#capture{}", id),
            EntitySymbol::Field(name) => match self.parent() {
                Some(parent) => write!(f, "{}.{}", parent, name),
                None => write!(f, "?.{}", name),
            },
            EntitySymbol::ThisOrMe => write!(f, "this"),
            EntitySymbol::Static { container, name } => write!(f, "{}.{}", container, name),
        }
    }
}

impl Serialize for AnalysisEntity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for AnalysisEntity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        EntityData::deserialize(deserializer).map(|data| AnalysisEntity(Arc::new(data)))
    }
}

/// Interning key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct EntityKey {
    symbol: EntitySymbol,
    owner: Option<String>,
    parent: Option<EntityId>,
    unknown_instance: bool,
}

/// Creates and interns analysis entities
#[derive(Debug, Default)]
pub struct EntityFactory {
    interned: FxHashMap<EntityKey, AnalysisEntity>,
    next_id: u32,
}

impl EntityFactory {
    pub fn new() -> Self {
        Self::default()
    }

    fn intern(
        &mut self,
        symbol: EntitySymbol,
        owner: Option<String>,
        parent: Option<AnalysisEntity>,
        ty: TypeInfo,
        has_unknown_instance_location: bool,
    ) -> AnalysisEntity {
        let key = EntityKey {
            symbol: symbol.clone(),
            owner: owner.clone(),
            parent: parent.as_ref().map(|p| p.id()),
            unknown_instance: has_unknown_instance_location,
        };

        if let Some(existing) = self.interned.get(&key) {
            return existing.clone();
        }

        let id = EntityId(self.next_id);
        self.next_id += 1;
        let entity = AnalysisEntity(Arc::new(EntityData {
            id,
            symbol,
            owner,
            parent,
            ty,
            has_unknown_instance_location,
        }));
        self.interned.insert(key, entity.clone());
        entity
    }

    /// Local variable of `method`
    pub fn local(&mut self, method: &str, name: &str, ty: TypeInfo) -> AnalysisEntity {
        self.intern(
            EntitySymbol::Local(name.to_string()),
            Some(method.to_string()),
            None,
            ty,
            false,
        )
    }

    /// Parameter of `method`
    pub fn parameter(
        &mut self,
        method: &str,
        name: &str,
        ordinal: usize,
        ty: TypeInfo,
    ) -> AnalysisEntity {
        self.intern(
            EntitySymbol::Parameter {
                name: name.to_string(),
                ordinal,
            },
            Some(method.to_string()),
            None,
            ty,
            false,
        )
    }

    /// Flow capture of `method`
    pub fn flow_capture(&mut self, method: &str, capture_id: u32, ty: TypeInfo) -> AnalysisEntity {
        self.intern(
            EntitySymbol::FlowCapture(capture_id),
            Some(method.to_string()),
            None,
            ty,
            false,
        )
    }

    /// `this` of `method`
    pub fn this_or_me(&mut self, method: &str, ty: TypeInfo) -> AnalysisEntity {
        self.intern(
            EntitySymbol::ThisOrMe,
            Some(method.to_string()),
            None,
            ty,
            false,
        )
    }

    /// Static field
    pub fn static_field(&mut self, container: &str, name: &str, ty: TypeInfo) -> AnalysisEntity {
        self.intern(
            EntitySymbol::Static {
                container: container.to_string(),
                name: name.to_string(),
            },
            None,
            None,
            ty,
            false,
        )
    }

    /// Member projection `parent.name`; inherits the parent's owner and
    /// unknown-location flag
    pub fn field(&mut self, parent: &AnalysisEntity, name: &str, ty: TypeInfo) -> AnalysisEntity {
        let owner = parent.owner().map(str::to_string);
        let unknown = parent.has_unknown_instance_location();
        self.intern(
            EntitySymbol::Field(name.to_string()),
            owner,
            Some(parent.clone()),
            ty,
            unknown,
        )
    }

    /// Member of an instance the analysis cannot name (e.g. a call result)
    pub fn field_of_unknown_instance(
        &mut self,
        method: &str,
        name: &str,
        ty: TypeInfo,
    ) -> AnalysisEntity {
        self.intern(
            EntitySymbol::Field(name.to_string()),
            Some(method.to_string()),
            None,
            ty,
            true,
        )
    }

    /// Number of interned entities
    pub fn len(&self) -> usize {
        self.interned.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interned.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interning() {
        let mut factory = EntityFactory::new();
        let a1 = factory.local("M", "a", TypeInfo::value("int"));
        let a2 = factory.local("M", "a", TypeInfo::value("int"));
        let b = factory.local("M", "b", TypeInfo::value("int"));
        let other = factory.local("N", "a", TypeInfo::value("int"));

        assert_eq!(a1, a2);
        assert_ne!(a1, b);
        assert_ne!(a1, other);
        assert_eq!(factory.len(), 3);
    }

    #[test]
    fn test_field_hierarchy() {
        let mut factory = EntityFactory::new();
        let o = factory.local("M", "o", TypeInfo::reference("Node"));
        let next = factory.field(&o, "next", TypeInfo::reference("Node"));
        let value = factory.field(&next, "value", TypeInfo::value("int"));

        assert!(value.is_child());
        assert_eq!(value.root(), &o);
        assert!(value.is_descendant_of(&o));
        assert!(value.is_descendant_of(&next));
        assert!(!o.is_descendant_of(&value));
        assert!(value.is_owned_by("M"));
        assert_eq!(value.to_string(), "o.next.value");
    }

    #[test]
    fn test_unknown_instance_location_propagates() {
        let mut factory = EntityFactory::new();
        let unknown = factory.field_of_unknown_instance("M", "f", TypeInfo::reference("T"));
        let nested = factory.field(&unknown, "g", TypeInfo::value("int"));
        assert!(unknown.has_unknown_instance_location());
        assert!(nested.has_unknown_instance_location());
    }

    #[test]
    fn test_static_has_no_owner() {
        let mut factory = EntityFactory::new();
        let s = factory.static_field("Config", "Instance", TypeInfo::reference("Config"));
        assert!(!s.is_owned_by("M"));
        assert_eq!(s.to_string(), "Config.Instance");
    }

    #[test]
    fn test_serde_preserves_identity() {
        let mut factory = EntityFactory::new();
        let o = factory.parameter("M", "o", 0, TypeInfo::reference("T"));
        let f = factory.field(&o, "f", TypeInfo::value("int"));

        let json = serde_json::to_string(&f).unwrap();
        let back: AnalysisEntity = serde_json::from_str(&json).unwrap();
        assert_eq!(back, f);
        assert_eq!(back.parent(), Some(&o));
        assert_eq!(back.to_string(), "o.f");
    }
}
