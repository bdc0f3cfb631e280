//! Widget data extraction and the field store.
//!
//! Source documents carry per-widget field values as "data islands":
//! class-tagged template elements whose content is a small field tree.
//! This module turns those islands into addressable records.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                      Extraction Pass                             │
//! ├──────────────────────────────────────────────────────────────────┤
//! │                                                                  │
//! │  source document          per island            per field        │
//! │  ┌──────────────┐     ┌────────────────┐     ┌───────────────┐   │
//! │  │ .WidgetData  │ ──► │ WidgetRecord   │ ──► │ FieldStore    │   │
//! │  │ islands      │     │ (id, title,    │     │ .register()   │   │
//! │  └──────────────┘     │  section, data)│     │ → FieldHandle │   │
//! │                       └────────────────┘     └───────────────┘   │
//! │                                                                  │
//! │  Field values stay in the source tree; records hold handles.     │
//! │  The assembler resolves a handle to trimmed text or cloned       │
//! │  content only when a slot actually consumes it.                  │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Field vocabulary
//!
//! | Source shape                          | Extracted as                |
//! |---------------------------------------|-----------------------------|
//! | `<data slot="name">…`                 | handle under `name`         |
//! | `<data slot="name" data-type="boolean">` | handle flagged boolean   |
//! | `<data slot="name[]"><div>…</div>…`   | array of nested maps        |
//!
//! The record whose id is [`GLOBAL_RECORD_ID`] is not rendered itself;
//! its fields overlay every other record during assembly.

mod extract;
mod store;
mod types;

pub use extract::extract;
pub use store::{FieldHandle, FieldStore};
pub use types::{FieldMap, FieldValue, GLOBAL_RECORD_ID, WidgetRecord, merge_global};
