//! Shared kernel: models referenced across features

pub mod models;
