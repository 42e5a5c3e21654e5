//! The on-demand atomic-CSS generator engine: extractor pipeline, variant
//! matcher, rule matcher, shortcut expander, utility stringifier, token
//! cache, and sheet assembler.
//!
//! Configuration is data in [`cssgen_common::config`] plus the
//! handler-bearing ("code") pieces registered against [`config::UserConfig`]
//! here; [`Generator`] ties the two together and owns the cache, blocked
//! set, and `parentOrders` for the lifetime of a resolved config.

pub mod cache;
pub mod config;
pub mod context;
pub mod error;
pub mod extractor;
pub mod generator;
pub mod rule;
pub mod shortcut;
pub mod sheet;
pub mod stringify;
pub mod variant;
pub mod warn;

pub use context::{ParentOrders, RuleContext};
pub use error::{EngineError, EngineResult};
pub use generator::Generator;
