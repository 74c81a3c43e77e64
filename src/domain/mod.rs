//! Domain types and DTOs
//!
//! These types define the data structures for estimates, scope templates,
//! pricing and AI research results.

pub mod ai;
pub mod estimates;
pub mod pricing;
pub mod settings;
pub mod templates;
