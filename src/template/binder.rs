//! 模板绑定
//!
//! 模板中有两类占位符：
//!
//! - `{{name}}`：动态占位符，转换为位置绑定参数 `$1`、`$2`……
//! - `{{.name}}`：静态占位符，直接以变量的字面值替换
//!
//! 例如模板
//!
//! ```text
//! select * from ({{.source}}) as source where name={{name}}::text and value={{value}}::bigint
//! ```
//!
//! 在变量 `name=abc`、`value=123`、`source=select 'abc'::text as name, 123 as value`
//! 下绑定为
//!
//! ```text
//! select * from (select 'abc'::text as name, 123 as value) as source where name=$1::text and value=$2::bigint
//! ```
//!
//! 绑定参数为 `["abc", "123"]`。取值相同的占位符共用同一个位置参数，
//! 序号按占位符在模板中首次出现的顺序分配。

use super::collector::VariablePool;
use crate::core::error::{SqlRestError, SqlRestResult};
use regex::Regex;
use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

static STATIC_PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\.([^}]+)\}\}").expect("static placeholder pattern is valid")
});

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

/// 绑定结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundQuery {
    /// 最终 SQL 文本，动态占位符已替换为 `$n`
    pub sql: String,
    /// 按序号排列的绑定参数，第 i 个元素对应 `$(i+1)`
    pub parameters: Vec<String>,
    /// 未提供取值的静态变量名，按首次出现顺序去重
    pub unresolved_statics: Vec<String>,
}

impl BoundQuery {
    pub fn is_fully_resolved(&self) -> bool {
        self.unresolved_statics.is_empty()
    }

    /// 参数列表的文本表示，如 `[abc 123]`
    pub fn parameters_repr(&self) -> String {
        format!("[{}]", self.parameters.join(" "))
    }

    /// 语句与参数的内联表示，如 `select $1 [abc]`
    pub fn inline_repr(&self) -> String {
        format!("{} {}", self.sql, self.parameters_repr())
    }
}

/// 静态替换后的模板片段
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    /// 未提供取值的静态占位符，记录变量名，动态展开时原样跳过
    Unresolved(String),
}

/// 动态绑定器
///
/// 每次绑定新建一个实例，按取值内容（而不是名称）分配位置序号
#[derive(Debug)]
pub struct TemplateBinder<'a> {
    pool: &'a VariablePool,
    ordinals: HashMap<&'a str, usize>,
    parameters: Vec<String>,
}

impl<'a> TemplateBinder<'a> {
    pub fn new(pool: &'a VariablePool) -> Self {
        Self {
            pool,
            ordinals: HashMap::with_capacity(pool.len()),
            parameters: Vec::with_capacity(pool.len()),
        }
    }

    /// 解析一个动态占位符，返回对应的绑定标记 `$n`
    ///
    /// 取值首次出现时分配下一个序号并追加到参数列表，再次出现（即使来自不同名称）时复用已有序号
    pub fn resolve(&mut self, name: &str) -> SqlRestResult<String> {
        let pool: &'a VariablePool = self.pool;
        let value = pool
            .get(name)
            .ok_or_else(|| SqlRestError::UndefinedVariable(name.to_string()))?;

        let ordinal = match self.ordinals.get(value) {
            Some(ordinal) => *ordinal,
            None => {
                self.parameters.push(value.to_string());
                let ordinal = self.parameters.len();
                self.ordinals.insert(value, ordinal);
                ordinal
            }
        };
        Ok(format!("${}", ordinal))
    }

    pub fn parameters(&self) -> &[String] {
        &self.parameters
    }

    pub fn into_parameters(self) -> Vec<String> {
        self.parameters
    }

    /// 展开一段文本中的全部动态占位符
    fn expand(&mut self, text: &str, out: &mut String) -> SqlRestResult<()> {
        let mut rest = text;
        while let Some(start) = rest.find(OPEN) {
            out.push_str(&rest[..start]);
            let after_open = &rest[start + OPEN.len()..];
            let end = after_open.find(CLOSE).ok_or_else(|| {
                SqlRestError::TemplateParse(format!("unclosed placeholder near \"{}\"", excerpt(&rest[start..])))
            })?;
            let name = placeholder_name(&after_open[..end])?;
            out.push_str(&self.resolve(name)?);
            rest = &after_open[end + CLOSE.len()..];
        }
        out.push_str(rest);
        Ok(())
    }
}

/// 校验占位符内容并返回变量名
fn placeholder_name(inner: &str) -> SqlRestResult<&str> {
    let name = inner.trim();
    if name.is_empty() {
        return Err(SqlRestError::TemplateParse("empty placeholder".to_string()));
    }
    if name.starts_with('.') {
        return Err(SqlRestError::TemplateParse(format!(
            "static placeholder {{{{{}}}}} cannot appear in substituted text",
            name
        )));
    }
    if name.chars().any(char::is_whitespace) {
        return Err(SqlRestError::TemplateParse(format!(
            "invalid placeholder {{{{{}}}}}",
            name
        )));
    }
    Ok(name)
}

fn excerpt(s: &str) -> &str {
    match s.char_indices().nth(20) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// 静态替换：已提供的变量替换为字面值，未提供的保留为 `Unresolved` 片段
fn substitute_statics(template: &str, pool: &VariablePool) -> (Vec<Segment>, Vec<String>) {
    let mut segments = Vec::new();
    let mut unresolved: Vec<String> = Vec::new();
    let mut text = String::with_capacity(template.len());
    let mut last = 0;

    for caps in STATIC_PLACEHOLDER.captures_iter(template) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        text.push_str(&template[last..whole.start()]);
        last = whole.end();

        let name = name.as_str().trim();
        match pool.get(name) {
            Some(value) => text.push_str(value),
            None => {
                if !unresolved.iter().any(|n| n == name) {
                    unresolved.push(name.to_string());
                }
                segments.push(Segment::Text(std::mem::take(&mut text)));
                segments.push(Segment::Unresolved(name.to_string()));
            }
        }
    }
    text.push_str(&template[last..]);
    segments.push(Segment::Text(text));

    (segments, unresolved)
}

/// 绑定模板
///
/// 依次执行静态替换、动态绑定、未解析静态占位符的还原。未提供的静态变量
/// 会以 `{{.name}}` 的原始写法留在结果文本中，并记录在 `unresolved_statics`。
pub fn bind(template: &str, pool: &VariablePool) -> SqlRestResult<BoundQuery> {
    let (segments, unresolved_statics) = substitute_statics(template, pool);

    let mut binder = TemplateBinder::new(pool);
    let mut sql = String::with_capacity(template.len());
    for segment in &segments {
        match segment {
            Segment::Text(text) => binder.expand(text, &mut sql)?,
            Segment::Unresolved(name) => {
                sql.push_str(OPEN);
                sql.push('.');
                sql.push_str(name);
                sql.push_str(CLOSE);
            }
        }
    }

    Ok(BoundQuery {
        sql,
        parameters: binder.into_parameters(),
        unresolved_statics,
    })
}

impl fmt::Display for BoundQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inline_repr())
    }
}
