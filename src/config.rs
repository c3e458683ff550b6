//! 转换配置模块
//!
//! 一次运行中的所有可调项都集中在 [`ConvertConfig`] 里，运行开始时校验一次。

use crate::error::ConvertError;
use std::path::PathBuf;

/// 默认的 NULL 占位符，与 `LOAD DATA INFILE` 的约定一致
pub const DEFAULT_NULL_PLACEHOLDER: &str = "\\N";

/// 引号字段内双引号的转义方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum EscapeStyle {
    /// RFC 4180 风格：`"` 写成 `""`
    #[default]
    Double,
    /// 反斜杠风格：`"` 写成 `\"`
    Backslash,
}

/// 转换配置
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ConvertConfig {
    /// 按表输出到该目录下的 `<表名>.csv`；为 `None` 时所有行写入同一个流
    pub output_dir: Option<PathBuf>,

    /// 是否在每个输出的第一行数据前写入列名
    pub emit_column_headers: bool,

    /// NULL 字段输出时使用的占位符（原样、不加引号）
    pub null_placeholder: String,

    /// 双引号转义方式
    pub escape_style: EscapeStyle,

    /// 字段分隔符
    pub delimiter: u8,
}

impl ConvertConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    pub fn with_column_headers(mut self, enabled: bool) -> Self {
        self.emit_column_headers = enabled;
        self
    }

    pub fn with_null_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.null_placeholder = placeholder.into();
        self
    }

    pub fn with_escape_style(mut self, style: EscapeStyle) -> Self {
        self.escape_style = style;
        self
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// 校验配置
    ///
    /// NULL 占位符必须非空，且不能包含会触发加引号的字符，
    /// 否则它在输出中可能与空字符串或普通数据混淆。
    pub fn validate(&self) -> Result<(), ConvertError> {
        if matches!(self.delimiter, b'"' | b'\r' | b'\n' | b'\\') {
            return Err(ConvertError::InvalidConfig(format!(
                "delimiter {:?} is reserved",
                self.delimiter as char
            )));
        }

        if self.null_placeholder.is_empty() {
            return Err(ConvertError::InvalidConfig(
                "NULL placeholder must not be empty".to_string(),
            ));
        }

        let needs_quoting = self
            .null_placeholder
            .bytes()
            .any(|b| b == self.delimiter || matches!(b, b'"' | b'\r' | b'\n'));
        if needs_quoting {
            return Err(ConvertError::InvalidConfig(format!(
                "NULL placeholder {:?} contains a delimiter, quote or newline",
                self.null_placeholder
            )));
        }

        Ok(())
    }
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            output_dir: None,
            emit_column_headers: false,
            null_placeholder: DEFAULT_NULL_PLACEHOLDER.to_string(),
            escape_style: EscapeStyle::Double,
            delimiter: b',',
        }
    }
}
