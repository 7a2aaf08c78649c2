//! Cast Engine — procedural casts of characters for dramatic situations.
//!
//! Picks archetypal situations from a template library, collapses their
//! role expressions, binds characters to roles under age, gender, aliveness
//! and relation-consistency constraints, cross-casts the remaining roles
//! with a branch-and-bound search, and derives families and relation text
//! from the resulting graph.

pub mod core;
pub mod schema;

pub use crate::core::pipeline::{Cast, CastGenerator, CastMember, GeneratorError};
pub use crate::schema::template::TemplateLibrary;
