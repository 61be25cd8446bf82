//! 输出格式化
//!
//! 保留查询参数 `_float`、`_int` 分别指定浮点列与整数列的格式，默认为通用表示

use super::value::{CellValue, ResultSet, ValueKind};
use log::warn;
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;

/// 指定浮点列格式的保留参数
pub const FLOAT_FORMAT_PARAM: &str = "_float";
/// 指定整数列格式的保留参数
pub const INT_FORMAT_PARAM: &str = "_int";

/// `f` 未指定精度时的小数位数
const DEFAULT_FIXED_PRECISION: usize = 6;
const MAX_FIXED_PRECISION: usize = 17;

/// 数值格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NumberFormat {
    /// 最短的通用表示
    #[default]
    General,
    /// 固定小数位数
    Fixed(usize),
}

impl NumberFormat {
    /// 解析格式动词：`g`、`d`、`f`、`fN`、`.N`、`.Nf`
    pub fn parse(verb: &str) -> Option<Self> {
        let verb = verb.trim();
        match verb {
            "g" | "v" | "d" => return Some(NumberFormat::General),
            "f" => return Some(NumberFormat::Fixed(DEFAULT_FIXED_PRECISION)),
            _ => {}
        }
        let digits = verb
            .strip_prefix('f')
            .or_else(|| verb.strip_prefix('.').map(|v| v.strip_suffix('f').unwrap_or(v)))?;
        let precision: usize = digits.parse().ok()?;
        if precision > MAX_FIXED_PRECISION {
            return None;
        }
        Some(NumberFormat::Fixed(precision))
    }

    fn format_float(&self, v: f64) -> String {
        match self {
            NumberFormat::General => v.to_string(),
            NumberFormat::Fixed(precision) => format!("{:.*}", precision, v),
        }
    }

    fn format_int(&self, v: i64) -> String {
        match self {
            NumberFormat::General => v.to_string(),
            NumberFormat::Fixed(precision) => format!("{:.*}", precision, v as f64),
        }
    }
}

/// 格式表：按单元格类别选择数值格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FormatTable {
    pub float: NumberFormat,
    pub int: NumberFormat,
}

impl FormatTable {
    /// 从请求的保留参数构建，无法识别的格式动词记录告警后忽略
    pub fn from_reserved(reserved: &BTreeMap<String, String>) -> Self {
        let mut table = FormatTable::default();
        if let Some(verb) = reserved.get(FLOAT_FORMAT_PARAM) {
            match NumberFormat::parse(verb) {
                Some(format) => table.float = format,
                None => warn!("ignoring unknown {} format \"{}\"", FLOAT_FORMAT_PARAM, verb),
            }
        }
        if let Some(verb) = reserved.get(INT_FORMAT_PARAM) {
            match NumberFormat::parse(verb) {
                Some(format) => table.int = format,
                None => warn!("ignoring unknown {} format \"{}\"", INT_FORMAT_PARAM, verb),
            }
        }
        table
    }

    pub fn format_for(&self, kind: ValueKind) -> Option<NumberFormat> {
        match kind {
            ValueKind::Float => Some(self.float),
            ValueKind::Integer => Some(self.int),
            ValueKind::Text | ValueKind::Null | ValueKind::Other => None,
        }
    }

    /// 单元格的文本表示，空值为空串
    pub fn render_cell(&self, cell: &CellValue) -> String {
        match cell {
            CellValue::Text(s) | CellValue::Other(s) => s.clone(),
            CellValue::Integer(v) => self.int.format_int(*v),
            CellValue::Float(v) => self.float.format_float(*v),
            CellValue::Null => String::new(),
        }
    }

    fn json_cell(&self, cell: &CellValue) -> Value {
        match cell {
            CellValue::Text(s) | CellValue::Other(s) => Value::String(s.clone()),
            CellValue::Null => Value::Null,
            CellValue::Integer(v) => match self.int {
                NumberFormat::General => Value::Number((*v).into()),
                fixed => json_number(&fixed.format_int(*v)),
            },
            CellValue::Float(v) => json_number(&self.float.format_float(*v)),
        }
    }
}

fn json_number(rendered: &str) -> Value {
    rendered
        .parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

/// 表格形式：首行为列名，制表符分隔，每行以换行结束
pub fn render_tsv(result: &ResultSet, formats: &FormatTable) -> String {
    let mut out = result.columns.join("\t");
    out.push('\n');
    for row in &result.rows {
        let line: Vec<String> = row.iter().map(|cell| formats.render_cell(cell)).collect();
        out.push_str(&line.join("\t"));
        out.push('\n');
    }
    out
}

/// 结构化形式：以列名为键的对象数组
pub fn render_json(result: &ResultSet, formats: &FormatTable) -> String {
    let rows: Vec<Value> = result
        .rows
        .iter()
        .map(|row| {
            let object: Map<String, Value> = result
                .columns
                .iter()
                .zip(row.iter())
                .map(|(column, cell)| (column.clone(), formats.json_cell(cell)))
                .collect();
            Value::Object(object)
        })
        .collect();
    Value::Array(rows).to_string()
}
