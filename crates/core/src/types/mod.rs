//! Core types for Tidepool.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod entity;
pub mod id;
pub mod money;

pub use entity::EntityKind;
pub use id::*;
pub use money::{coerce_decimal, non_negative};
