//! 模板处理模块
//!
//! 参数清洗、变量收集与占位符绑定

pub mod binder;
pub mod cleanse;
pub mod collector;

pub use binder::{bind, BoundQuery, TemplateBinder};
pub use cleanse::{cleanse, MAX_NAME_LEN, MAX_VALUE_LEN};
pub use collector::{CollectedVariables, VariableCollector, VariablePool};
