//! 结果集与单元格取值
//!
//! 列值以显式的类型标签表示，输出格式按标签查表，不依赖运行时类型反射

/// 单元格取值的类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Text,
    Integer,
    Float,
    Null,
    Other,
}

/// 单元格取值
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Null,
    /// 其他类型，已按数据库的文本表示渲染
    Other(String),
}

impl CellValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            CellValue::Text(_) => ValueKind::Text,
            CellValue::Integer(_) => ValueKind::Integer,
            CellValue::Float(_) => ValueKind::Float,
            CellValue::Null => ValueKind::Null,
            CellValue::Other(_) => ValueKind::Other,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(CellValue::Null)
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Integer(value)
    }
}

impl From<i32> for CellValue {
    fn from(value: i32) -> Self {
        CellValue::Integer(value.into())
    }
}

impl From<i16> for CellValue {
    fn from(value: i16) -> Self {
        CellValue::Integer(value.into())
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Float(value)
    }
}

impl From<f32> for CellValue {
    fn from(value: f32) -> Self {
        CellValue::Float(value.into())
    }
}

/// 查询结果：列名与按行排列的单元格
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl ResultSet {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<CellValue>) {
        self.rows.push(row);
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_kinds() {
        assert_eq!(CellValue::from("abc").kind(), ValueKind::Text);
        assert_eq!(CellValue::from(1i32).kind(), ValueKind::Integer);
        assert_eq!(CellValue::from(1.5f64).kind(), ValueKind::Float);
        assert_eq!(CellValue::from(None::<i64>).kind(), ValueKind::Null);
        assert_eq!(CellValue::Other("t".to_string()).kind(), ValueKind::Other);
    }

    #[test]
    fn test_option_conversion() {
        assert_eq!(CellValue::from(Some(7i64)), CellValue::Integer(7));
        assert!(CellValue::from(None::<String>).is_null());
    }

    #[test]
    fn test_result_set_rows() {
        let mut rs = ResultSet::new(vec!["name".to_string(), "value".to_string()]);
        rs.push_row(vec!["abc".into(), 123i64.into()]);
        assert_eq!(rs.row_count(), 1);
        assert_eq!(rs.columns.len(), 2);
    }
}
