//! Parser 模块 - 解析 INSERT 语句的 VALUES 部分
//!
//! - [`ValuesParser`]：把 `(...),(...);` 切分为行元组（原始字段）
//! - [`Field`]：把原始字段还原为 NULL / 空串 / 字符串值

pub(crate) mod constants;
mod field;
mod values;

pub use field::Field;
pub use values::{RawRow, ValuesParser};

use crate::error::ParseError;

/// 解析整条 VALUES 文本，全部成功才返回
///
/// 任意一行出错时整条语句作废，已解析的行一并丢弃。
///
/// # 示例
///
/// ```
/// use mysqldump_csv::parser::{Field, parse_values};
///
/// let rows = parse_values(b"(1,NULL),(2,'');").unwrap();
/// assert_eq!(rows.len(), 2);
/// assert_eq!(rows[0][1], Field::Null);
/// assert_eq!(rows[1][1], Field::Empty);
/// ```
pub fn parse_values(values: &[u8]) -> Result<Vec<Vec<Field<'_>>>, ParseError> {
    ValuesParser::new(values)
        .map(|row| row.map(|raw| raw.into_iter().map(Field::normalize).collect()))
        .collect()
}

#[cfg(test)]
mod tests;
