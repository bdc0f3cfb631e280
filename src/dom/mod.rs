//! Arena-backed markup trees.
//!
//! Every template, fragment and data island is parsed into a [`Document`]:
//! a flat arena of nodes addressed by [`NodeId`]. Detaching a node only
//! unlinks it from its parent, the arena slot is never reused, so a handle
//! taken before a mutation stays valid after it. Queries return snapshot
//! vectors for the same reason: callers walk and mutate freely without
//! invalidating what they are iterating over.
//!
//! # Processing Flow
//!
//! ```text
//! bytes ──parse──> Document ──tree ops / queries──> Document ──serialize──> bytes
//! ```
//!
//! # Storage policy
//!
//! | Content    | Stored as                                        |
//! |------------|--------------------------------------------------|
//! | Text       | escaped, exactly as read; unescaped on access    |
//! | Attributes | wire form, exactly as read; writes escape input  |
//! | Entity refs| reconstructed as literal `&name;` text           |
//! | CDATA      | folded into escaped text                         |
//!
//! Escaped text and attribute values round-trip byte for byte, including
//! references the document never resolves (`&nbsp;` and friends).
//!
//! Element queries treat `template` content as inert: the template element
//! itself is matched, its content is not entered until cloned out. This
//! mirrors the runtime the directive vocabulary targets, and it is what
//! keeps document-level directive sweeps away from markup that only
//! becomes live once a widget is instantiated.
//!
//! Input is expected to be well-formed markup: void elements must be
//! self-closed, tags must balance. The reader runs with checks relaxed and
//! tolerates stray end tags, but it is not a recovering HTML parser.

mod node;
mod parse;
mod write;

pub use node::{Document, NodeId};
