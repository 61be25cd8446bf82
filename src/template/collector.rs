//! 变量收集
//!
//! 将 URL 查询参数与 Cookie 合并为一个变量池。同名时 Cookie 覆盖查询参数。

use super::cleanse::cleanse;
use log::warn;
use std::collections::{BTreeMap, BTreeSet};

/// 变量池：参数名 → 清洗后的取值
///
/// 每个请求构建一次，构建后不可变
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariablePool {
    vars: BTreeMap<String, String>,
}

impl VariablePool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }
}

impl<N: Into<String>, V: Into<String>> FromIterator<(N, V)> for VariablePool {
    /// 直接构建变量池，不经过清洗。用于离线绑定与测试
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        Self {
            vars: iter.into_iter().map(|(n, v)| (n.into(), v.into())).collect(),
        }
    }
}

/// 一次请求收集到的全部变量
#[derive(Debug, Clone, Default)]
pub struct CollectedVariables {
    /// 合并后的变量池，用于动态绑定与静态替换
    pub pool: VariablePool,
    /// 以 `_` 开头的系统参数（如 `_float`、`_int`），不进入变量池
    pub reserved: BTreeMap<String, String>,
}

/// 变量收集器
#[derive(Debug, Default)]
pub struct VariableCollector {
    pool: BTreeMap<String, String>,
    reserved: BTreeMap<String, String>,
}

impl VariableCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// 收集原始查询串（不含 `?`）中的参数，每个名称只取第一个值
    pub fn with_query(mut self, raw_query: Option<&str>) -> Self {
        let Some(raw_query) = raw_query else {
            return self;
        };
        let mut seen = BTreeSet::new();
        for (name, value) in url::form_urlencoded::parse(raw_query.as_bytes()) {
            if name.starts_with('_') {
                self.reserved
                    .entry(name.into_owned())
                    .or_insert_with(|| value.into_owned());
                continue;
            }
            // 数组参数不受支持，重复出现的名称只看第一个值
            if !seen.insert(name.to_string()) {
                continue;
            }
            if let Some(cleansed) = cleanse(&name, &value) {
                self.pool.insert(name.into_owned(), cleansed);
            }
        }
        self
    }

    /// 收集 `Cookie` 请求头中的参数，同名时覆盖查询参数
    pub fn with_cookies<'a, I>(mut self, cookie_headers: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        for header in cookie_headers {
            for (name, value) in parse_cookie_header(header) {
                let Some(cleansed) = cleanse(name, value) else {
                    continue;
                };
                if let Some(previous) = self.pool.get(name) {
                    warn!(
                        "cookie parameter value \"{}\" overriding query parameter value \"{}\" for \"{}\"",
                        cleansed, previous, name
                    );
                }
                self.pool.insert(name.to_string(), cleansed);
            }
        }
        self
    }

    pub fn finish(self) -> CollectedVariables {
        CollectedVariables {
            pool: VariablePool { vars: self.pool },
            reserved: self.reserved,
        }
    }
}

/// 解析单个 `Cookie` 请求头，格式为 `a=1; b=2`
///
/// 没有 `=` 或名称为空的片段会被忽略，取值两侧的双引号会被去除
fn parse_cookie_header(header: &str) -> impl Iterator<Item = (&str, &str)> {
    header.split(';').filter_map(|pair| {
        let (name, value) = pair.split_once('=')?;
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        let value = value.trim();
        let value = value
            .strip_prefix('"')
            .and_then(|v| v.strip_suffix('"'))
            .unwrap_or(value);
        Some((name, value))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_parameters_take_first_value() {
        let collected = VariableCollector::new()
            .with_query(Some("name=abc&name=def&value=123"))
            .finish();
        assert_eq!(collected.pool.get("name"), Some("abc"));
        assert_eq!(collected.pool.get("value"), Some("123"));
        assert_eq!(collected.pool.len(), 2);
    }

    #[test]
    fn test_rejected_first_value_is_not_replaced_by_later_one() {
        let collected = VariableCollector::new()
            .with_query(Some("name=&name=abc"))
            .finish();
        assert!(!collected.pool.contains("name"));
    }

    #[test]
    fn test_query_parameters_are_percent_decoded_and_cleansed() {
        let collected = VariableCollector::new()
            .with_query(Some("source=select%20%27abc%27%3B&empty="))
            .finish();
        assert_eq!(collected.pool.get("source"), Some("select abc"));
        assert!(!collected.pool.contains("empty"));
    }

    #[test]
    fn test_reserved_parameters_are_kept_apart() {
        let collected = VariableCollector::new()
            .with_query(Some("_float=f&_int=d&name=abc"))
            .finish();
        assert!(!collected.pool.contains("_float"));
        assert_eq!(collected.reserved.get("_float").map(String::as_str), Some("f"));
        assert_eq!(collected.reserved.get("_int").map(String::as_str), Some("d"));
        assert_eq!(collected.pool.len(), 1);
    }

    #[test]
    fn test_cookie_overrides_query_parameter() {
        let collected = VariableCollector::new()
            .with_query(Some("name=abc&value=1"))
            .with_cookies(["name=xyz; other=7"])
            .finish();
        assert_eq!(collected.pool.get("name"), Some("xyz"));
        assert_eq!(collected.pool.get("value"), Some("1"));
        assert_eq!(collected.pool.get("other"), Some("7"));
    }

    #[test]
    fn test_rejected_cookie_does_not_override() {
        let collected = VariableCollector::new()
            .with_query(Some("name=abc"))
            .with_cookies(["name=", "_name=x"])
            .finish();
        assert_eq!(collected.pool.get("name"), Some("abc"));
        assert_eq!(collected.pool.len(), 1);
    }

    #[test]
    fn test_cookie_only_request() {
        let collected = VariableCollector::new()
            .with_query(None)
            .with_cookies(["a=\"quoted\"", "b=2"])
            .finish();
        assert_eq!(collected.pool.get("a"), Some("quoted"));
        assert_eq!(collected.pool.get("b"), Some("2"));
        assert_eq!(collected.pool.len(), 2);
    }

    #[test]
    fn test_parse_cookie_header_skips_malformed_pairs() {
        let pairs: Vec<_> = parse_cookie_header("a=1; broken; =2; b = 3").collect();
        assert_eq!(pairs, vec![("a", "1"), ("b", "3")]);
    }
}
