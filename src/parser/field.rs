//! 字段归一化
//!
//! 把源格式（单引号 + 反斜杠转义）的原始字段转换成语义值。

use crate::parser::constants::*;
use memchr::memchr2;
use std::borrow::Cow;

/// 一个字段的语义值
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field<'a> {
    /// 未加引号的 `NULL`
    Null,
    /// 空字符串 `''`，与 `Null` 不同
    Empty,
    /// 其他值；数字等未加引号的字面量原样保留
    Value(Cow<'a, [u8]>),
}

impl<'a> Field<'a> {
    /// 将原始字段转换为 [`Field`]
    ///
    /// - `NULL`（不带引号）-> [`Field::Null`]
    /// - `'...'` -> 去掉引号并还原转义序列
    /// - 其他内容原样保留，不做数值解析
    ///
    /// # 示例
    ///
    /// ```
    /// use mysqldump_csv::parser::Field;
    ///
    /// assert_eq!(Field::normalize(b"NULL"), Field::Null);
    /// assert_eq!(Field::normalize(b"''"), Field::Empty);
    /// assert_eq!(Field::normalize(b"'it\\'s'").as_bytes(), Some(&b"it's"[..]));
    /// assert_eq!(Field::normalize(b"1.50").as_bytes(), Some(&b"1.50"[..]));
    /// ```
    pub fn normalize(raw: &'a [u8]) -> Field<'a> {
        if raw == NULL_LITERAL {
            return Field::Null;
        }

        match raw {
            [] => Field::Empty,
            [SINGLE_QUOTE, inner @ .., SINGLE_QUOTE] => {
                if inner.is_empty() {
                    Field::Empty
                } else {
                    Field::Value(unescape(inner))
                }
            }
            _ => Field::Value(Cow::Borrowed(raw)),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Field::Null)
    }

    /// 字段内容；`Null` 返回 `None`，`Empty` 返回空切片
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Field::Null => None,
            Field::Empty => Some(b""),
            Field::Value(v) => Some(v),
        }
    }
}

/// 还原引号内的转义序列
///
/// 没有转义时直接借用原切片。`''` 视为一个单引号。
fn unescape(inner: &[u8]) -> Cow<'_, [u8]> {
    if memchr2(BACKSLASH, SINGLE_QUOTE, inner).is_none() {
        return Cow::Borrowed(inner);
    }

    let mut out = Vec::with_capacity(inner.len());
    let mut bytes = inner.iter().copied();
    while let Some(b) = bytes.next() {
        match b {
            BACKSLASH => match bytes.next() {
                Some(escaped) => out.push(unescape_byte(escaped)),
                None => out.push(BACKSLASH),
            },
            SINGLE_QUOTE => {
                out.push(SINGLE_QUOTE);
                // `''` 中的第二个引号
                let mut peek = bytes.clone();
                if peek.next() == Some(SINGLE_QUOTE) {
                    bytes = peek;
                }
            }
            _ => out.push(b),
        }
    }
    Cow::Owned(out)
}

#[inline]
fn unescape_byte(escaped: u8) -> u8 {
    ESCAPE_SEQUENCES
        .iter()
        .find(|(code, _)| *code == escaped)
        .map(|(_, actual)| *actual)
        .unwrap_or(escaped)
}
