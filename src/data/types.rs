//! Record types produced by data extraction.
//!
//! These types are what `inspect` serializes to JSON, so the field names
//! follow the shape authors already know from the page console.

use indexmap::IndexMap;
use serde::Serialize;

use super::store::FieldHandle;

/// Reserved record id whose fields overlay every other record at assembly
/// time, winning on key collision.
pub const GLOBAL_RECORD_ID: &str = "Global";

/// A named field tree extracted for one widget instance.
///
/// Keys keep discovery order; substitution enumerates them in exactly
/// this order.
pub type FieldMap = IndexMap<String, FieldValue>;

/// One extracted field value.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Scalar field: a handle into the field store, resolved lazily.
    Handle(FieldHandle),
    /// Repeated group: one nested map per item, in source order.
    Items(Vec<FieldMap>),
}

/// Extracted data for one widget instance.
///
/// Created once per distinct id; additional islands carrying the same id
/// merge their fields into the existing record.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetRecord {
    pub id: String,

    /// Trimmed text of the island's title slot.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Id of the island's grandparent element, when it has one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section_id: Option<String>,

    pub data: FieldMap,
}

/// Overlay `global` onto a copy of `base`.
///
/// Global values win on key collision; keys only present in `global`
/// append after `base`'s own, so the record's substitution order is
/// preserved for its own fields.
pub fn merge_global(base: &FieldMap, global: &FieldMap) -> FieldMap {
    let mut merged = base.clone();
    for (key, value) in global {
        merged.insert(key.clone(), value.clone());
    }
    merged
}

// ============================================================================
// Tests
// ============================================================================
