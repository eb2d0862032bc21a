//! Persistence layer for the domain trust registry.

pub mod domains;

pub use domains::{DbError, DomainPage, DomainPatch, DomainStore, ListParams};
