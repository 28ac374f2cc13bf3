//! # Property Value Model
//!
//! Clean DTOs shared by every layer of the engine: schema ↔ composition ↔
//! dispatch ↔ wrappers.
//!
//! Design rule: NO registry types, NO dispatch types here.
//! This module is pure data — no I/O, no state, no locks.

pub mod value;
pub mod property_map;

pub use value::{Value, ValueType};
pub use property_map::PropertyMap;
