//! Points-to infrastructure

pub mod union_find;

pub use union_find::{EntityUnionFind, UnionFind};
