//! 解析器使用的常量定义

// 结构字符

/// 行元组开始
pub const OPEN_PAREN: u8 = b'(';

/// 行元组结束
pub const CLOSE_PAREN: u8 = b')';

/// 字段、行元组之间的分隔符
pub const COMMA: u8 = b',';

/// 语句结束符
pub const TERMINATOR: u8 = b';';

/// 源格式的字符串引号
pub const SINGLE_QUOTE: u8 = b'\'';

/// 源格式的转义字符
pub const BACKSLASH: u8 = b'\\';

/// 未加引号的 NULL 字面量
pub const NULL_LITERAL: &[u8] = b"NULL";

// 反斜杠转义序列（`\` 之后的字节 -> 实际字节）
// 与 mysqldump 写出字符串时使用的转义一致；其余 `\x` 还原为 `x`。

pub const ESCAPE_SEQUENCES: [(u8, u8); 6] = [
    (b'0', 0x00),
    (b'n', b'\n'),
    (b'r', b'\r'),
    (b't', b'\t'),
    (b'b', 0x08),
    (b'Z', 0x1a),
];

#[inline(always)]
pub fn is_space(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r')
}
