//! 语句分类
//!
//! 逐行判断输入属于哪一类：INSERT 语句、CREATE TABLE 中的列定义、
//! 列定义结束（第一条 KEY 子句），或者与转换无关。
//!
//! 这里不是 SQL 解析器，只识别 mysqldump 输出的固定文本形态。

use crate::error::{Malformed, ParseError};
use crate::tools::{is_create_table_line, is_insert_line};
use once_cell::sync::Lazy;
use regex::bytes::Regex;
use std::fmt;
use std::hash::{Hash, Hasher};

static INSERT_HEAD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:INSERT(?:\s+IGNORE)?|REPLACE)\s+INTO\s+(?:`((?:[^`]|``)+)`|([^\s`(;]+))")
        .unwrap()
});

static COLUMNS_VALUES_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*(?:\(([^)]*)\))?\s*VALUES\s*").unwrap());

static CREATE_TABLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^CREATE\s+TABLE\s+(?:IF\s+NOT\s+EXISTS\s+)?(?:`((?:[^`]|``)+)`|([^\s`(;]+))",
    )
    .unwrap()
});

static COLUMN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*`((?:[^`]|``)+)`").unwrap());

static KEY_BOUNDARY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^\s*(?:\)|(?:PRIMARY|UNIQUE|FULLTEXT|SPATIAL|FOREIGN)\s+(?:KEY|INDEX)\b|(?:KEY|INDEX|CONSTRAINT|CHECK)\b)",
    )
    .unwrap()
});

/// 表名，作为输出路由的键
///
/// 去掉反引号；比较与哈希按忽略大小写的键进行，
/// 同一个 dump 里 `` `Users` `` 与 `users` 视为同一张表。
#[derive(Debug, Clone)]
pub struct TableName {
    name: String,
    key: String,
}

impl TableName {
    /// 从原始标识符构造，可带反引号
    pub fn new(raw: &str) -> Self {
        let name = unquote_identifier(raw.trim());
        let key = name.to_lowercase();
        Self { name, key }
    }

    /// 第一次出现时的原始写法
    pub fn as_str(&self) -> &str {
        &self.name
    }

    /// 归一化后的路由键
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl PartialEq for TableName {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for TableName {}

impl Hash for TableName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// 一行输入的分类结果
#[derive(Debug, Clone, PartialEq)]
pub enum Statement<'a> {
    /// 与转换无关的行
    Irrelevant,

    /// INSERT 语句
    Insert {
        table: TableName,
        /// `INSERT INTO t (a, b) VALUES` 形式中显式给出的列名
        columns: Option<Vec<String>>,
        /// `VALUES` 之后的全部文本，未经验证
        values: &'a [u8],
    },

    /// `CREATE TABLE` 的首行，之后的行开始累积列名
    CreateTable { table: TableName },

    /// CREATE TABLE 块中的一个列定义
    CreateTableColumn { name: String },

    /// 第一条 KEY / INDEX 子句或结尾的 `)`，列定义到此结束
    CreateTableKeyBoundary,
}

/// 逐行分类器
///
/// 需要记住当前是否处于 CREATE TABLE 块内，所以是有状态的；
/// 每个输入流使用一个实例。
#[derive(Debug, Default)]
pub struct StatementClassifier {
    in_create_table: bool,
}

impl StatementClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// 是否正处于 CREATE TABLE 的列定义部分
    pub fn in_create_table(&self) -> bool {
        self.in_create_table
    }

    /// 对一行进行分类
    ///
    /// 只有以 INSERT 前缀开头但拿不到表名的行会返回错误。
    ///
    /// # 示例
    ///
    /// ```
    /// use mysqldump_csv::statement::{Statement, StatementClassifier};
    ///
    /// let mut classifier = StatementClassifier::new();
    /// match classifier.classify(b"INSERT INTO `t` VALUES (1,'a');").unwrap() {
    ///     Statement::Insert { table, values, .. } => {
    ///         assert_eq!(table.as_str(), "t");
    ///         assert_eq!(values, b"(1,'a');");
    ///     }
    ///     other => panic!("unexpected {other:?}"),
    /// }
    /// ```
    pub fn classify<'a>(&mut self, line: &'a [u8]) -> Result<Statement<'a>, ParseError> {
        if is_insert_line(line) {
            return classify_insert(line);
        }

        if is_create_table_line(line) {
            return Ok(match identifier(&CREATE_TABLE_RE, line) {
                Some((table, _)) => {
                    self.in_create_table = true;
                    Statement::CreateTable {
                        table: TableName::new(&table),
                    }
                }
                None => Statement::Irrelevant,
            });
        }

        if self.in_create_table {
            if KEY_BOUNDARY_RE.is_match(line) {
                self.in_create_table = false;
                return Ok(Statement::CreateTableKeyBoundary);
            }
            if let Some((name, _)) = identifier(&COLUMN_RE, line) {
                return Ok(Statement::CreateTableColumn {
                    name: unquote_identifier(&name),
                });
            }
        }

        Ok(Statement::Irrelevant)
    }
}

fn classify_insert(line: &[u8]) -> Result<Statement<'_>, ParseError> {
    let (table, head_end) = identifier(&INSERT_HEAD_RE, line)
        .ok_or(ParseError::MalformedStatement(Malformed::MissingTableName))?;

    let rest = &line[head_end..];
    let (columns, values) = match COLUMNS_VALUES_RE.captures(rest) {
        Some(caps) => {
            let columns = caps.get(1).map(|m| split_column_list(m.as_bytes()));
            let end = caps.get(0).map_or(0, |m| m.end());
            (columns, &rest[end..])
        }
        // 缺少 VALUES，交给 ValuesParser 报告为空
        None => (None, &rest[rest.len()..]),
    };

    Ok(Statement::Insert {
        table: TableName::new(&table),
        columns,
        values,
    })
}

/// 取出第一个或第二个捕获组中的标识符，以及整个匹配的结束位置
fn identifier(re: &Regex, line: &[u8]) -> Option<(String, usize)> {
    let caps = re.captures(line)?;
    let name = caps.get(1).or_else(|| caps.get(2))?;
    let end = caps.get(0)?.end();
    Some((String::from_utf8_lossy(name.as_bytes()).into_owned(), end))
}

/// 解析 `` `a`, `b` `` 形式的列名列表
fn split_column_list(list: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(list)
        .split(',')
        .map(|col| unquote_identifier(col.trim()))
        .filter(|col| !col.is_empty())
        .collect()
}

/// 去掉外层反引号，并把 ``` `` ``` 还原为一个反引号
fn unquote_identifier(raw: &str) -> String {
    let inner = raw
        .strip_prefix('`')
        .and_then(|s| s.strip_suffix('`'))
        .unwrap_or(raw);
    inner.replace("``", "`")
}
