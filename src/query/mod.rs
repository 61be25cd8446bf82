//! 查询处理模块
//!
//! 查询标识、执行与结果格式化

pub mod executor;
pub mod format;
pub mod identity;
pub mod value;

pub use executor::{PgExecutor, QueryExecutor};
pub use format::{render_json, render_tsv, FormatTable, NumberFormat};
pub use identity::QueryIdentity;
pub use value::{CellValue, ResultSet, ValueKind};
