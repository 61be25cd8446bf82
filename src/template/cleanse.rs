//! 参数清洗
//!
//! 在变量进入变量池之前校验名称与取值，拒绝只记录告警，不会中断请求

use log::warn;

/// 参数名的最大长度
pub const MAX_NAME_LEN: usize = 30;
/// 参数值的最大长度
pub const MAX_VALUE_LEN: usize = 50;

/// 从取值中剔除的字符
const STRIPPED_CHARS: [char; 3] = [';', '\'', '"'];

/// 清洗单个参数
///
/// 返回 `None` 表示丢弃该参数。规则依次为：名称过长、空值、`.` 前缀
/// （仅用于静态替换语义）、`_` 前缀（系统保留参数）、取值过长。
/// 通过校验后剔除所有 `;`、`'`、`"`。
pub fn cleanse(name: &str, value: &str) -> Option<String> {
    if name.len() > MAX_NAME_LEN {
        warn!(
            "skipping very long query parameter name: {}... {}",
            truncate(name, MAX_NAME_LEN),
            name.len()
        );
        return None;
    }
    if value.is_empty() {
        warn!("skipping empty value for {}", name);
        return None;
    }
    if name.starts_with('.') {
        warn!("skipping internal parameter name: {}", name);
        return None;
    }
    if name.starts_with('_') {
        warn!("skipping reserved parameter name: {}", name);
        return None;
    }
    if value.len() > MAX_VALUE_LEN {
        warn!(
            "skipping very long query parameter: {}... {}",
            truncate(value, MAX_VALUE_LEN),
            value.len()
        );
        return None;
    }

    let cleansed: String = value.chars().filter(|c| !STRIPPED_CHARS.contains(c)).collect();
    // 只由被剔除字符组成的取值不再是有效取值
    if cleansed.is_empty() {
        warn!("skipping value for {} emptied by cleansing", name);
        return None;
    }
    Some(cleansed)
}

/// 按字符边界截断，用于日志输出
fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
