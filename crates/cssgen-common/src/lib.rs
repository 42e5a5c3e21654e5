//! Shared, dependency-light types for the `cssgen` atomic-CSS engine:
//! normalized declaration lists, the serializable ("data") half of a
//! resolved config, and a canonical content hash over it.
//!
//! The handler-bearing ("code") half of a resolved config — dynamic
//! rules, variants, shortcuts, extractors, pre/postprocess hooks — lives
//! in `cssgen-engine::config` since closures and trait objects are not
//! serializable.

pub mod config;
pub mod declaration;
pub mod hash;

pub use declaration::{Declarations, RawDeclarations, NO_MERGE_MARKER};
