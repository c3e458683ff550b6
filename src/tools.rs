// 语句前缀
const INSERT_PREFIXES: [&[u8]; 3] = [b"INSERT INTO", b"INSERT IGNORE INTO", b"REPLACE INTO"];
const CREATE_TABLE_PREFIX: &[u8] = b"CREATE TABLE";

// 文件名长度上限（不含 `.csv` 与去重后缀）
const MAX_FILE_STEM_LENGTH: usize = 200;

#[inline(always)]
fn starts_with_ignore_case(line: &[u8], prefix: &[u8]) -> bool {
    line.len() >= prefix.len() && line[..prefix.len()].eq_ignore_ascii_case(prefix)
}

/// 判断一行是否为 INSERT 语句的开头
///
/// 只看固定前缀（`INSERT INTO` / `INSERT IGNORE INTO` / `REPLACE INTO`），
/// 不验证语句其余部分。
#[inline]
pub fn is_insert_line(line: &[u8]) -> bool {
    INSERT_PREFIXES
        .iter()
        .any(|prefix| starts_with_ignore_case(line, prefix))
}

/// 判断一行是否为 `CREATE TABLE` 语句的开头
#[inline]
pub fn is_create_table_line(line: &[u8]) -> bool {
    starts_with_ignore_case(line, CREATE_TABLE_PREFIX)
}

///
/// 把表名转换为安全的文件名主干。
///
/// 规则
/// 1. ASCII 字母、数字、`_`、`-`、`.` 保留，其余字符（含路径分隔符）替换为 `_`。
/// 2. 非 ASCII 的字母数字保留，便于中文等表名直接可读。
/// 3. 以 `.` 开头时替换为 `_`，避免 `..` 或隐藏文件。
/// 4. 结果为空时使用 `_`，超长时截断。
pub fn sanitize_file_stem(table: &str) -> String {
    let mut stem: String = table
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.') {
                c
            } else if !c.is_ascii() && c.is_alphanumeric() {
                c
            } else {
                '_'
            }
        })
        .collect();

    if stem.starts_with('.') {
        stem.replace_range(..1, "_");
    }

    if stem.len() > MAX_FILE_STEM_LENGTH {
        let mut end = MAX_FILE_STEM_LENGTH;
        while !stem.is_char_boundary(end) {
            end -= 1;
        }
        stem.truncate(end);
    }

    if stem.is_empty() {
        stem.push('_');
    }
    stem
}
