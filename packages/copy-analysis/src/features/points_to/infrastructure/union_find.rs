//! Union-Find over analysis entities
//!
//! Disjoint sets with path compression and union by rank. Used to group
//! entities that denote the same storage (`ref` locals and their targets).
//! Elements are dense indices; [`EntityUnionFind`] maps entities onto them.

use rustc_hash::FxHashMap;
use std::collections::BTreeSet;

use crate::shared::models::AnalysisEntity;

/// Index-based disjoint sets
#[derive(Debug, Clone, Default)]
pub struct UnionFind {
    /// Parent pointers (self-loop = root)
    parent: Vec<u32>,

    /// Tree height upper bound, only meaningful for roots
    rank: Vec<u8>,
}

impl UnionFind {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a singleton set and return its index
    pub fn make_set(&mut self) -> u32 {
        let idx = self.parent.len() as u32;
        self.parent.push(idx);
        self.rank.push(0);
        idx
    }

    /// Representative of `x` (with path compression)
    pub fn find(&mut self, x: u32) -> u32 {
        let mut root = x;
        while self.parent[root as usize] != root {
            root = self.parent[root as usize];
        }

        let mut current = x;
        while self.parent[current as usize] != root {
            let next = self.parent[current as usize];
            self.parent[current as usize] = root;
            current = next;
        }
        root
    }

    /// Representative of `x` without mutating the structure
    pub fn find_readonly(&self, x: u32) -> u32 {
        let mut current = x;
        while self.parent[current as usize] != current {
            current = self.parent[current as usize];
        }
        current
    }

    /// Merge the sets of `x` and `y`; returns the new representative
    pub fn union(&mut self, x: u32, y: u32) -> u32 {
        let rx = self.find(x);
        let ry = self.find(y);
        if rx == ry {
            return rx;
        }

        let (child, root) = match self.rank[rx as usize].cmp(&self.rank[ry as usize]) {
            std::cmp::Ordering::Less => (rx, ry),
            std::cmp::Ordering::Greater => (ry, rx),
            std::cmp::Ordering::Equal => {
                self.rank[rx as usize] += 1;
                (ry, rx)
            }
        };
        self.parent[child as usize] = root;
        root
    }

    pub fn len(&self) -> usize {
        self.parent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }
}

/// Disjoint sets keyed by [`AnalysisEntity`]
#[derive(Debug, Clone, Default)]
pub struct EntityUnionFind {
    index: FxHashMap<AnalysisEntity, u32>,
    entities: Vec<AnalysisEntity>,
    sets: UnionFind,
}

impl EntityUnionFind {
    pub fn new() -> Self {
        Self::default()
    }

    fn index_of(&mut self, entity: &AnalysisEntity) -> u32 {
        if let Some(&idx) = self.index.get(entity) {
            return idx;
        }
        let idx = self.sets.make_set();
        self.index.insert(entity.clone(), idx);
        self.entities.push(entity.clone());
        idx
    }

    /// Record that `a` and `b` share storage
    pub fn union(&mut self, a: &AnalysisEntity, b: &AnalysisEntity) {
        let ia = self.index_of(a);
        let ib = self.index_of(b);
        self.sets.union(ia, ib);
    }

    pub fn connected(&self, a: &AnalysisEntity, b: &AnalysisEntity) -> bool {
        match (self.index.get(a), self.index.get(b)) {
            (Some(&ia), Some(&ib)) => self.sets.find_readonly(ia) == self.sets.find_readonly(ib),
            _ => a == b,
        }
    }

    /// Groups with more than one member
    pub fn groups(&self) -> Vec<BTreeSet<AnalysisEntity>> {
        let mut by_root: FxHashMap<u32, BTreeSet<AnalysisEntity>> = FxHashMap::default();
        for (idx, entity) in self.entities.iter().enumerate() {
            let root = self.sets.find_readonly(idx as u32);
            by_root.entry(root).or_default().insert(entity.clone());
        }

        let mut groups: Vec<_> = by_root.into_values().filter(|g| g.len() > 1).collect();
        groups.sort();
        groups
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::models::{EntityFactory, TypeInfo};

    #[test]
    fn test_union_find_basic() {
        let mut uf = UnionFind::new();
        let a = uf.make_set();
        let b = uf.make_set();
        let c = uf.make_set();

        uf.union(a, b);
        assert_eq!(uf.find(a), uf.find(b));
        assert_ne!(uf.find(a), uf.find(c));

        uf.union(b, c);
        assert_eq!(uf.find_readonly(a), uf.find_readonly(c));
        assert_eq!(uf.len(), 3);
    }

    #[test]
    fn test_union_is_idempotent() {
        let mut uf = UnionFind::new();
        let a = uf.make_set();
        let b = uf.make_set();
        let r1 = uf.union(a, b);
        let r2 = uf.union(b, a);
        assert_eq!(r1, r2);
    }

    #[test]
    fn test_entity_groups() {
        let mut factory = EntityFactory::new();
        let x = factory.local("M", "x", TypeInfo::value("int"));
        let y = factory.local("M", "y", TypeInfo::value("int"));
        let z = factory.local("M", "z", TypeInfo::value("int"));
        let w = factory.local("M", "w", TypeInfo::value("int"));

        let mut uf = EntityUnionFind::new();
        uf.union(&x, &y);
        uf.union(&y, &z);

        assert!(uf.connected(&x, &z));
        assert!(!uf.connected(&x, &w));
        assert!(uf.connected(&w, &w));

        let groups = uf.groups();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0], [x, y, z].into_iter().collect());
    }
}
