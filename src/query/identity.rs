//! 查询标识
//!
//! 由绑定后的语句与有序参数列表计算 `(statementId, parameterId, queryId)`。
//! 标识只取决于内容，与请求时间、调用方无关，用作缓存键与响应头。

use hex::ToHex;
use sha2::{Digest, Sha256};

/// 查询标识三元组，均为 SHA-256 的小写十六进制
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryIdentity {
    pub statement_id: String,
    pub parameter_id: String,
    pub query_id: String,
}

impl QueryIdentity {
    pub fn compute<S: AsRef<str>>(sql: &str, parameters: &[S]) -> Self {
        let statement_id = sha256_hex(sql.as_bytes());
        let parameter_id = sha256_hex(canonical_parameters(parameters).as_bytes());
        let query_id = {
            let mut hasher = Sha256::new();
            hasher.update(statement_id.as_bytes());
            hasher.update(parameter_id.as_bytes());
            hasher.finalize().encode_hex::<String>()
        };
        Self {
            statement_id,
            parameter_id,
            query_id,
        }
    }
}

/// 参数列表的规范文本：JSON 字符串数组
///
/// 直接拼接取值会让 `["ab", "c"]` 与 `["a", "bc"]` 得到相同的摘要
pub fn canonical_parameters<S: AsRef<str>>(parameters: &[S]) -> String {
    let values: Vec<&str> = parameters.iter().map(AsRef::as_ref).collect();
    serde_json::to_string(&values).unwrap_or_else(|_| values.join("\u{0}"))
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hasher.finalize().encode_hex::<String>()
}
