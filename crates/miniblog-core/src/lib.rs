//! # Miniblog Core
//!
//! The domain layer of the miniblog service.
//! This crate contains the blog entities, the list/pagination rules and the
//! port traits that infrastructure must implement. It has no infrastructure
//! dependencies.

pub mod domain;
pub mod error;
pub mod pagination;
pub mod ports;
pub mod query;

pub use error::DomainError;
