//! ValuesParser - 将 `VALUES (...),(...);` 文本切分为行元组
//!
//! 单次前向扫描，除当前行外不占用额外内存。字段以原始字节切片（含引号）返回，
//! 由 [`Field::normalize`](crate::parser::Field::normalize) 负责去转义。

use crate::error::{Malformed, ParseError};
use crate::parser::constants::*;
use memchr::memchr2;

/// 一个行元组中的原始字段（未去转义，引号保留）
pub type RawRow<'a> = Vec<&'a [u8]>;

/// 扫描状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    /// 引号外
    Normal,
    /// 单引号字符串内
    InQuotedString,
    /// 字符串内遇到 `\`，下一个字节按普通数据处理
    EscapePending,
}

/// 行元组迭代器
///
/// 每次迭代返回一个 [`RawRow`]；遇到错误时返回 `Err` 并结束，不可重新开始。
///
/// # 示例
///
/// ```
/// use mysqldump_csv::parser::ValuesParser;
///
/// let rows: Vec<_> = ValuesParser::new(b"(1,'a'),(2,'x),(y');")
///     .collect::<Result<_, _>>()
///     .unwrap();
///
/// assert_eq!(rows.len(), 2);
/// assert_eq!(rows[1], vec![&b"2"[..], &b"'x),(y'"[..]]);
/// ```
pub struct ValuesParser<'a> {
    input: &'a [u8],
    pos: usize,
    rows: usize,
    finished: bool,
}

impl<'a> ValuesParser<'a> {
    pub fn new(input: &'a [u8]) -> Self {
        Self {
            input,
            pos: 0,
            rows: 0,
            finished: false,
        }
    }

    /// 已经产出的行数
    pub fn rows_parsed(&self) -> usize {
        self.rows
    }

    fn skip_space(&mut self) {
        while self.pos < self.input.len() && is_space(self.input[self.pos]) {
            self.pos += 1;
        }
    }

    fn fail(&mut self, err: impl Into<ParseError>) -> Option<Result<RawRow<'a>, ParseError>> {
        self.finished = true;
        Some(Err(err.into()))
    }

    /// 定位到下一个行元组的 `(`
    ///
    /// 返回 `Ok(false)` 表示已经遇到 `;`，扫描正常结束。
    fn seek_row_start(&mut self) -> Result<bool, ParseError> {
        self.skip_space();

        if self.rows == 0 {
            return match self.input.get(self.pos) {
                None => Err(Malformed::EmptyValues.into()),
                Some(&OPEN_PAREN) => Ok(true),
                Some(&b) => Err(Malformed::MissingOpenParen { found: b }.into()),
            };
        }

        match self.input.get(self.pos) {
            None => Err(Malformed::MissingTerminator.into()),
            Some(&TERMINATOR) => {
                // 结束符之后只允许空白和多余的 `;`
                while self.pos < self.input.len()
                    && (self.input[self.pos] == TERMINATOR || is_space(self.input[self.pos]))
                {
                    self.pos += 1;
                }
                if self.pos < self.input.len() {
                    return Err(Malformed::TrailingData { offset: self.pos }.into());
                }
                Ok(false)
            }
            Some(&COMMA) => {
                self.pos += 1;
                self.skip_space();
                match self.input.get(self.pos) {
                    Some(&OPEN_PAREN) => Ok(true),
                    Some(&b) => Err(Malformed::UnexpectedSeparator {
                        found: b,
                        offset: self.pos,
                    }
                    .into()),
                    None => Err(Malformed::MissingTerminator.into()),
                }
            }
            Some(&b) => Err(Malformed::UnexpectedSeparator {
                found: b,
                offset: self.pos,
            }
            .into()),
        }
    }

    /// 从 `(` 之后扫描一个完整的行元组
    fn scan_row(&mut self) -> Result<RawRow<'a>, ParseError> {
        let input = self.input;
        let row_start = self.pos;
        let mut row = Vec::new();
        let mut field_start = row_start + 1;
        let mut quote_start = 0;
        let mut state = ScanState::Normal;
        let mut i = field_start;

        while i < input.len() {
            match state {
                ScanState::Normal => match input[i] {
                    SINGLE_QUOTE => {
                        quote_start = i;
                        state = ScanState::InQuotedString;
                    }
                    COMMA => {
                        row.push(trim_space(&input[field_start..i]));
                        field_start = i + 1;
                    }
                    CLOSE_PAREN => {
                        row.push(trim_space(&input[field_start..i]));
                        self.pos = i + 1;
                        return Ok(row);
                    }
                    _ => {}
                },
                ScanState::InQuotedString => {
                    // 字符串内只有 `'` 和 `\` 有意义，直接跳过其余字节
                    match memchr2(SINGLE_QUOTE, BACKSLASH, &input[i..]) {
                        Some(offset) => {
                            i += offset;
                            state = if input[i] == BACKSLASH {
                                ScanState::EscapePending
                            } else {
                                ScanState::Normal
                            };
                        }
                        None => break,
                    }
                }
                ScanState::EscapePending => state = ScanState::InQuotedString,
            }
            i += 1;
        }

        match state {
            ScanState::Normal => Err(Malformed::UnclosedRow { offset: row_start }.into()),
            _ => Err(ParseError::UnterminatedQuotedField {
                offset: quote_start,
            }),
        }
    }
}

impl<'a> Iterator for ValuesParser<'a> {
    type Item = Result<RawRow<'a>, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        match self.seek_row_start() {
            Ok(true) => {}
            Ok(false) => {
                self.finished = true;
                return None;
            }
            Err(e) => return self.fail(e),
        }

        match self.scan_row() {
            Ok(row) => {
                self.rows += 1;
                Some(Ok(row))
            }
            Err(e) => self.fail(e),
        }
    }
}

impl std::iter::FusedIterator for ValuesParser<'_> {}

#[inline]
fn trim_space(mut bytes: &[u8]) -> &[u8] {
    while let [first, rest @ ..] = bytes {
        if is_space(*first) {
            bytes = rest;
        } else {
            break;
        }
    }
    while let [rest @ .., last] = bytes {
        if is_space(*last) {
            bytes = rest;
        } else {
            break;
        }
    }
    bytes
}
