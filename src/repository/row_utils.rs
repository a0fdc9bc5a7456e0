// ==========================================
// 募捐活动结项 - 行映射工具
// ==========================================
// 职责: TEXT 列到领域类型的解析（Uuid / 状态枚举）
// 解析失败统一映射为 FromSqlConversionFailure，交由 RepositoryError 分类
// ==========================================

use rusqlite::types::Type;
use rusqlite::Row;
use std::fmt;
use uuid::Uuid;

#[derive(Debug)]
struct ColumnParseError(String);

impl fmt::Display for ColumnParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ColumnParseError {}

/// 构造列解析失败错误
pub fn conversion_error(idx: usize, message: impl Into<String>) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        idx,
        Type::Text,
        Box::new(ColumnParseError(message.into())),
    )
}

/// 读取 Uuid 列（TEXT 存储）
pub fn get_uuid(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let raw: String = row.get(idx)?;
    Uuid::parse_str(&raw).map_err(|e| conversion_error(idx, format!("无效的 UUID '{}': {}", raw, e)))
}

/// 读取可空 Uuid 列
pub fn get_optional_uuid(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<Uuid>> {
    match row.get::<_, Option<String>>(idx)? {
        Some(raw) => Uuid::parse_str(&raw)
            .map(Some)
            .map_err(|e| conversion_error(idx, format!("无效的 UUID '{}': {}", raw, e))),
        None => Ok(None),
    }
}
