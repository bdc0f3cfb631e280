//! Template resolution: fragments, directives, widget assembly.
//!
//! The working template goes through three kinds of passes, always in
//! this order:
//!
//! | Pass          | Marker                         | When                    |
//! |---------------|--------------------------------|-------------------------|
//! | fragments     | `<include>` / `data-includable`| once, before assembly   |
//! | pruning       | `data-b-obsolete`, `data-b-if` | top level and per build |
//! | assembly      | `data-section`, `data-widget`  | once per page build     |
//!
//! Template element content is inert throughout: sweeps never descend
//! into it, so widget markup stays untouched until the assembler clones
//! it into place.

mod assemble;
mod directives;
mod fragments;

pub use assemble::{fill_widgets, AssemblyContext};
pub use fragments::inline_fragments;
