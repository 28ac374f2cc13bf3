//! PropertyMap — the raw key-value store behind an entity handle.

use std::collections::HashMap;
use super::Value;

/// A map of property names to values.
pub type PropertyMap = HashMap<String, Value>;
