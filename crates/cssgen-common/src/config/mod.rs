pub mod types;

pub use types::{
    BlocklistEntry, PreflightData, ResolvedConfigData, RuleMeta, ShortcutExpansion,
    StaticRuleData, StaticShortcutData,
};
