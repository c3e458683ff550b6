//! 错误类型定义
//!
//! 分为两层：
//! - [`ParseError`]：单条语句级别的错误，可恢复，出错的语句被跳过；
//! - [`ConvertError`]：整个转换过程级别的错误，通常是致命的。

use std::io;
use thiserror::Error;

/// 单条语句的解析错误
///
/// 出现此类错误时，当前语句被整体丢弃，转换继续处理下一行。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// 语句结构不符合 dump 格式
    #[error("malformed statement: {0}")]
    MalformedStatement(Malformed),

    /// VALUES 文本结束时仍处于引号字符串内
    #[error("unterminated quoted field starting at byte {offset}")]
    UnterminatedQuotedField {
        /// 起始单引号在 VALUES 文本中的偏移
        offset: usize,
    },
}

/// 语句结构错误的具体原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Malformed {
    /// 缺少 VALUES 子句，或其内容为空
    #[error("VALUES list is missing or empty")]
    EmptyValues,

    /// VALUES 列表没有以 `(` 开头
    #[error("VALUES list must open with '(' but found '{}'", .found.escape_ascii())]
    MissingOpenParen {
        /// 实际遇到的字节
        found: u8,
    },

    /// 两个行元组之间出现了意外的字符
    #[error("unexpected '{}' at byte {offset} between row tuples", .found.escape_ascii())]
    UnexpectedSeparator {
        /// 实际遇到的字节
        found: u8,
        /// 在 VALUES 文本中的偏移
        offset: usize,
    },

    /// 行元组打开后直到文本结束都没有关闭
    #[error("row tuple opened at byte {offset} is never closed")]
    UnclosedRow {
        /// `(` 在 VALUES 文本中的偏移
        offset: usize,
    },

    /// 缺少语句结束符 `;`（通常是被截断的语句）
    #[error("statement terminator ';' is missing")]
    MissingTerminator,

    /// `;` 之后还有非空白内容
    #[error("unexpected trailing data at byte {offset}")]
    TrailingData {
        /// 多余内容在 VALUES 文本中的偏移
        offset: usize,
    },

    /// INSERT 语句中找不到表名
    #[error("INSERT statement has no table name")]
    MissingTableName,
}

impl From<Malformed> for ParseError {
    fn from(reason: Malformed) -> Self {
        ParseError::MalformedStatement(reason)
    }
}

/// 转换过程错误
#[derive(Debug, Error)]
pub enum ConvertError {
    /// 输出目标无法创建或写入
    #[error("output sink unavailable for {destination}: {source}")]
    SinkUnavailable {
        /// 输出目标（文件路径或 `<stdout>` 等）
        destination: String,
        /// 底层 IO 错误
        #[source]
        source: io::Error,
    },

    /// 读取输入失败
    #[error("failed to read input: {0}")]
    Input(#[from] io::Error),

    /// 配置不合法
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ConvertError {
    pub(crate) fn sink(destination: &str, source: io::Error) -> Self {
        ConvertError::SinkUnavailable {
            destination: destination.to_string(),
            source,
        }
    }

    /// 输出管道的读端已经关闭（例如 `| head`）
    ///
    /// 这种情况应被视为正常结束，而不是失败。
    pub fn is_broken_pipe(&self) -> bool {
        matches!(
            self,
            ConvertError::SinkUnavailable { source, .. }
                if source.kind() == io::ErrorKind::BrokenPipe
        )
    }
}
