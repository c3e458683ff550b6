//! 输出：CSV 编码与按表路由
//!
//! - [`CsvEncoder`]：把一行 [`Field`] 写成一条 CSV 记录
//! - [`SinkFactory`]：决定表对应的输出目标并负责打开它
//! - [`OutputRouter`]：表名 -> 输出目标，每个目标只打开一次，列名最多写一次

use crate::config::{ConvertConfig, EscapeStyle};
use crate::error::ConvertError;
use crate::parser::Field;
use crate::statement::TableName;
use crate::tools::sanitize_file_stem;
use memchr::{memchr, memchr2, memchr3};
use std::collections::{HashMap, HashSet};
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

// 每个输出的写缓冲大小
const SINK_BUFFER_SIZE: usize = 64 * 1024;

/// 单条 CSV 记录的编码器
///
/// 最小化加引号：只有包含分隔符、双引号或换行的字段才加引号。
/// 引号字段内的 `"` 按配置写成 `""` 或 `\"`（后者同时把 `\` 写成 `\\`）。
/// NULL 写成配置的占位符，不加引号。
pub struct CsvEncoder<W: Write> {
    out: BufWriter<W>,
    destination: String,
    delimiter: u8,
    escape_style: EscapeStyle,
    null_placeholder: Vec<u8>,
    placeholder_collisions: u64,
}

impl<W: Write> CsvEncoder<W> {
    pub fn new(sink: W, destination: impl Into<String>, config: &ConvertConfig) -> Self {
        Self {
            out: BufWriter::with_capacity(SINK_BUFFER_SIZE, sink),
            destination: destination.into(),
            delimiter: config.delimiter,
            escape_style: config.escape_style,
            null_placeholder: config.null_placeholder.as_bytes().to_vec(),
            placeholder_collisions: 0,
        }
    }

    /// 输出目标的描述（文件路径或 `<stdout>`）
    pub fn destination(&self) -> &str {
        &self.destination
    }

    /// 数据值恰好等于 NULL 占位符的次数
    pub fn placeholder_collisions(&self) -> u64 {
        self.placeholder_collisions
    }

    /// 写入一行数据
    pub fn encode<'f, 'v: 'f, I>(&mut self, fields: I) -> Result<(), ConvertError>
    where
        I: IntoIterator<Item = &'f Field<'v>>,
    {
        let mut count = 0;
        let mut only_empty = true;
        for field in fields {
            if count > 0 {
                self.put(&[self.delimiter])?;
            }
            count += 1;
            match field.as_bytes() {
                None => {
                    only_empty = false;
                    self.out
                        .write_all(&self.null_placeholder)
                        .map_err(|source| ConvertError::sink(&self.destination, source))?;
                }
                Some(bytes) => {
                    only_empty &= bytes.is_empty();
                    if bytes == self.null_placeholder.as_slice() {
                        self.placeholder_collisions += 1;
                    }
                    self.write_field(bytes)?;
                }
            }
        }
        self.end_record(count == 1 && only_empty)
    }

    /// 写入列名行
    pub fn write_header<S: AsRef<str>>(&mut self, columns: &[S]) -> Result<(), ConvertError> {
        for (i, column) in columns.iter().enumerate() {
            if i > 0 {
                self.put(&[self.delimiter])?;
            }
            self.write_field(column.as_ref().as_bytes())?;
        }
        self.end_record(columns.len() == 1 && columns[0].as_ref().is_empty())
    }

    fn write_field(&mut self, bytes: &[u8]) -> Result<(), ConvertError> {
        if !self.needs_quotes(bytes) {
            return self.put(bytes);
        }

        self.put(b"\"")?;
        let mut rest = bytes;
        while let Some(pos) = self.next_escapable(rest) {
            self.put(&rest[..pos])?;
            match (self.escape_style, rest[pos]) {
                (EscapeStyle::Double, _) => self.put(b"\"\"")?,
                (EscapeStyle::Backslash, b'"') => self.put(b"\\\"")?,
                (EscapeStyle::Backslash, _) => self.put(b"\\\\")?,
            }
            rest = &rest[pos + 1..];
        }
        self.put(rest)?;
        self.put(b"\"")
    }

    #[inline]
    fn needs_quotes(&self, bytes: &[u8]) -> bool {
        memchr3(b'"', b'\n', b'\r', bytes).is_some() || memchr(self.delimiter, bytes).is_some()
    }

    #[inline]
    fn next_escapable(&self, bytes: &[u8]) -> Option<usize> {
        match self.escape_style {
            EscapeStyle::Double => memchr(b'"', bytes),
            EscapeStyle::Backslash => memchr2(b'"', b'\\', bytes),
        }
    }

    fn end_record(&mut self, single_empty_field: bool) -> Result<(), ConvertError> {
        // 只有一个空字段时写成 `""`，避免变成空行
        if single_empty_field {
            self.put(b"\"\"")?;
        }
        self.put(b"\n")
    }

    #[inline]
    fn put(&mut self, bytes: &[u8]) -> Result<(), ConvertError> {
        self.out
            .write_all(bytes)
            .map_err(|source| ConvertError::sink(&self.destination, source))
    }

    pub fn flush(&mut self) -> Result<(), ConvertError> {
        self.out
            .flush()
            .map_err(|source| ConvertError::sink(&self.destination, source))
    }

    /// 刷新并取回底层输出
    pub fn into_inner(self) -> Result<W, ConvertError> {
        let destination = self.destination;
        self.out
            .into_inner()
            .map_err(|e| ConvertError::sink(&destination, e.into_error()))
    }
}

/// 输出目标工厂
///
/// 路由器对每个新表名调用一次 [`destination`](SinkFactory::destination)；
/// 不同表返回相同的目标名时共用同一个输出，目标只会被 [`open`](SinkFactory::open) 一次。
pub trait SinkFactory {
    type Sink: Write;

    /// 表对应的输出目标名，对同一张表必须稳定
    fn destination(&mut self, table: &TableName) -> String;

    /// 打开输出目标
    fn open(&mut self, destination: &str) -> Result<Self::Sink, ConvertError>;
}

/// 每张表一个 `<表名>.csv` 文件
#[derive(Debug)]
pub struct FileSinkFactory {
    dir: PathBuf,
    used: HashSet<String>,
}

impl FileSinkFactory {
    /// 创建工厂，目录不存在时创建（已存在不报错）
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, ConvertError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| ConvertError::SinkUnavailable {
            destination: dir.display().to_string(),
            source,
        })?;
        Ok(Self {
            dir,
            used: HashSet::new(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl SinkFactory for FileSinkFactory {
    type Sink = File;

    fn destination(&mut self, table: &TableName) -> String {
        let stem = sanitize_file_stem(table.as_str());
        let mut file_name = format!("{stem}.csv");
        // 不同表名清洗后可能相同，加序号区分
        let mut n = 2;
        while !self.used.insert(file_name.to_lowercase()) {
            file_name = format!("{stem}_{n}.csv");
            n += 1;
        }
        self.dir.join(file_name).display().to_string()
    }

    fn open(&mut self, destination: &str) -> Result<File, ConvertError> {
        debug!(destination, "opening table output");
        File::create(destination).map_err(|source| ConvertError::SinkUnavailable {
            destination: destination.to_string(),
            source,
        })
    }
}

/// 所有表共用一个输出流（默认行为）
#[derive(Debug)]
pub struct SharedSink<W> {
    name: String,
    sink: Option<W>,
}

impl<W: Write> SharedSink<W> {
    pub fn new(name: impl Into<String>, sink: W) -> Self {
        Self {
            name: name.into(),
            sink: Some(sink),
        }
    }
}

impl SharedSink<io::Stdout> {
    /// 使用标准输出
    pub fn stdout() -> Self {
        SharedSink::new("<stdout>", io::stdout())
    }
}

impl<W: Write> SinkFactory for SharedSink<W> {
    type Sink = W;

    fn destination(&mut self, _table: &TableName) -> String {
        self.name.clone()
    }

    fn open(&mut self, destination: &str) -> Result<W, ConvertError> {
        self.sink.take().ok_or_else(|| ConvertError::SinkUnavailable {
            destination: destination.to_string(),
            source: io::Error::other("shared output already taken"),
        })
    }
}

struct SinkSlot<W: Write> {
    encoder: CsvEncoder<W>,
    header_written: bool,
}

/// 表名到输出目标的路由
///
/// 同一张表总是得到同一个编码器；目标在第一次路由时才打开，之后不再重新打开。
pub struct OutputRouter<F: SinkFactory> {
    factory: F,
    config: ConvertConfig,
    routes: HashMap<TableName, usize>,
    destinations: HashMap<String, usize>,
    slots: Vec<SinkSlot<F::Sink>>,
    columns: HashMap<TableName, Vec<String>>,
    missing_columns_warned: bool,
}

impl<F: SinkFactory> OutputRouter<F> {
    pub fn new(factory: F, config: &ConvertConfig) -> Self {
        Self {
            factory,
            config: config.clone(),
            routes: HashMap::new(),
            destinations: HashMap::new(),
            slots: Vec::new(),
            columns: HashMap::new(),
            missing_columns_warned: false,
        }
    }

    /// 记录从 CREATE TABLE 得到的列名
    ///
    /// 同一张表重复定义时以最后一次为准。
    pub fn record_columns(&mut self, table: TableName, columns: Vec<String>) {
        if !columns.is_empty() {
            self.columns.insert(table, columns);
        }
    }

    /// 已知的列名
    pub fn columns_for(&self, table: &TableName) -> Option<&[String]> {
        self.columns.get(table).map(Vec::as_slice)
    }

    /// 已经路由过的表数量
    pub fn table_count(&self) -> usize {
        self.routes.len()
    }

    /// 已经打开的输出数量
    pub fn sink_count(&self) -> usize {
        self.slots.len()
    }

    /// 获取表对应的编码器
    ///
    /// 第一次遇到该表时打开输出；若开启了列名输出，在第一行数据之前写入列名。
    /// `insert_columns` 是 INSERT 语句中显式给出的列名，CREATE TABLE 中没有列名时使用。
    pub fn route(
        &mut self,
        table: &TableName,
        insert_columns: Option<&[String]>,
    ) -> Result<&mut CsvEncoder<F::Sink>, ConvertError> {
        let index = match self.routes.get(table) {
            Some(&index) => index,
            None => {
                let index = self.open_route(table)?;
                self.routes.insert(table.clone(), index);
                index
            }
        };

        // 列名行只能出现在第一行数据之前；第一次路由时没有列名就不再补写
        if self.config.emit_column_headers && !self.slots[index].header_written {
            self.slots[index].header_written = true;
            let header = self
                .columns
                .get(table)
                .map(Vec::as_slice)
                .or(insert_columns);
            match header {
                Some(columns) => self.slots[index].encoder.write_header(columns)?,
                None if !self.missing_columns_warned => {
                    self.missing_columns_warned = true;
                    warn!(
                        table = %table,
                        "column names not found for at least one table; \
                         dump with --complete-insert or include CREATE TABLE statements"
                    );
                }
                None => {}
            }
        }

        Ok(&mut self.slots[index].encoder)
    }

    fn open_route(&mut self, table: &TableName) -> Result<usize, ConvertError> {
        let destination = self.factory.destination(table);
        if let Some(&index) = self.destinations.get(&destination) {
            return Ok(index);
        }

        let sink = self.factory.open(&destination)?;
        debug!(table = %table, destination = %destination, "routing table");
        let index = self.slots.len();
        self.slots.push(SinkSlot {
            encoder: CsvEncoder::new(sink, destination.clone(), &self.config),
            header_written: false,
        });
        self.destinations.insert(destination, index);
        Ok(index)
    }

    /// 数据值与 NULL 占位符相同的总次数
    pub fn placeholder_collisions(&self) -> u64 {
        self.slots
            .iter()
            .map(|slot| slot.encoder.placeholder_collisions())
            .sum()
    }

    /// 刷新所有输出
    pub fn flush(&mut self) -> Result<(), ConvertError> {
        for slot in &mut self.slots {
            slot.encoder.flush()?;
        }
        Ok(())
    }

    /// 刷新并关闭所有输出，返回底层 sink（按打开顺序）
    ///
    /// 即使其中一个失败，其余输出仍会被关闭；返回遇到的第一个错误。
    pub fn close(self) -> Result<Vec<F::Sink>, ConvertError> {
        let mut sinks = Vec::with_capacity(self.slots.len());
        let mut first_error = None;
        for slot in self.slots {
            match slot.encoder.into_inner() {
                Ok(sink) => sinks.push(sink),
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(sinks),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::borrow::Cow;

    fn encode_row(config: &ConvertConfig, fields: &[Field<'_>]) -> String {
        let mut encoder = CsvEncoder::new(Vec::new(), "<memory>", config);
        encoder.encode(fields).unwrap();
        String::from_utf8(encoder.into_inner().unwrap()).unwrap()
    }

    fn value(s: &str) -> Field<'_> {
        Field::Value(Cow::Borrowed(s.as_bytes()))
    }

    #[test]
    fn test_minimal_quoting() {
        let config = ConvertConfig::default();
        assert_eq!(encode_row(&config, &[value("a"), value("1")]), "a,1\n");
        assert_eq!(
            encode_row(&config, &[value("a,b"), value("x\ny"), value("plain")]),
            "\"a,b\",\"x\ny\",plain\n"
        );
    }

    #[test]
    fn test_quote_escape_styles() {
        let double = ConvertConfig::default();
        assert_eq!(encode_row(&double, &[value("say \"hi\"")]), "\"say \"\"hi\"\"\"\n");

        let backslash = ConvertConfig::default().with_escape_style(EscapeStyle::Backslash);
        assert_eq!(
            encode_row(&backslash, &[value("say \"hi\"")]),
            "\"say \\\"hi\\\"\"\n"
        );
    }

    #[test]
    fn test_backslash_style_escapes_backslash_only_inside_quotes() {
        let config = ConvertConfig::default().with_escape_style(EscapeStyle::Backslash);
        assert_eq!(encode_row(&config, &[value("C:\\dir")]), "C:\\dir\n");
        assert_eq!(
            encode_row(&config, &[value("a\\b,c")]),
            "\"a\\\\b,c\"\n"
        );
        // 默认占位符本身含反斜杠，仍然不加引号
        assert_eq!(encode_row(&config, &[Field::Null]), "\\N\n");
    }

    #[test]
    fn test_header_uses_same_quoting() {
        let config = ConvertConfig::default();
        let mut encoder = CsvEncoder::new(Vec::new(), "<memory>", &config);
        encoder.write_header(&["id", "full,name"]).unwrap();
        let out = String::from_utf8(encoder.into_inner().unwrap()).unwrap();
        assert_eq!(out, "id,\"full,name\"\n");
    }

    #[test]
    fn test_null_and_empty_are_distinct() {
        let config = ConvertConfig::default();
        let out = encode_row(&config, &[Field::Null, Field::Empty, value("x")]);
        assert_eq!(out, "\\N,,x\n");
    }

    #[test]
    fn test_single_empty_field_is_not_a_blank_line() {
        let config = ConvertConfig::default();
        assert_eq!(encode_row(&config, &[Field::Empty]), "\"\"\n");
    }

    #[test]
    fn test_custom_placeholder_and_delimiter() {
        let config = ConvertConfig::default()
            .with_null_placeholder("NULL")
            .with_delimiter(b'\t');
        assert_eq!(
            encode_row(&config, &[Field::Null, value("a,b")]),
            "NULL\ta,b\n"
        );
    }

    #[test]
    fn test_counts_placeholder_collisions() {
        let config = ConvertConfig::default();
        let mut encoder = CsvEncoder::new(Vec::new(), "<memory>", &config);
        encoder.encode(&[value("\\N"), Field::Null]).unwrap();
        assert_eq!(encoder.placeholder_collisions(), 1);
    }

    #[test]
    fn test_shared_sink_routes_all_tables_to_one_output() {
        let config = ConvertConfig::default();
        let mut router = OutputRouter::new(SharedSink::new("<memory>", Vec::new()), &config);

        router
            .route(&TableName::new("a"), None)
            .unwrap()
            .encode(&[value("1")])
            .unwrap();
        router
            .route(&TableName::new("b"), None)
            .unwrap()
            .encode(&[value("2")])
            .unwrap();

        assert_eq!(router.table_count(), 2);
        assert_eq!(router.sink_count(), 1);
        let sinks = router.close().unwrap();
        assert_eq!(String::from_utf8(sinks[0].clone()).unwrap(), "1\n2\n");
    }

    #[test]
    fn test_header_written_once_before_first_row() {
        let config = ConvertConfig::default().with_column_headers(true);
        let mut router = OutputRouter::new(SharedSink::new("<memory>", Vec::new()), &config);
        let table = TableName::new("t");
        router.record_columns(table.clone(), vec!["id".into(), "name".into()]);

        for id in ["1", "2"] {
            router
                .route(&table, None)
                .unwrap()
                .encode(&[value(id), value("x")])
                .unwrap();
        }

        let sinks = router.close().unwrap();
        assert_eq!(
            String::from_utf8(sinks[0].clone()).unwrap(),
            "id,name\n1,x\n2,x\n"
        );
    }

    #[test]
    fn test_insert_columns_used_when_no_create_table() {
        let config = ConvertConfig::default().with_column_headers(true);
        let mut router = OutputRouter::new(SharedSink::new("<memory>", Vec::new()), &config);
        let cols = vec!["a".to_string(), "b".to_string()];

        router
            .route(&TableName::new("t"), Some(&cols))
            .unwrap()
            .encode(&[value("1"), value("2")])
            .unwrap();

        let sinks = router.close().unwrap();
        assert_eq!(String::from_utf8(sinks[0].clone()).unwrap(), "a,b\n1,2\n");
    }

    #[test]
    fn test_no_header_without_known_columns() {
        let config = ConvertConfig::default().with_column_headers(true);
        let mut router = OutputRouter::new(SharedSink::new("<memory>", Vec::new()), &config);
        router
            .route(&TableName::new("t"), None)
            .unwrap()
            .encode(&[value("1")])
            .unwrap();

        let sinks = router.close().unwrap();
        assert_eq!(String::from_utf8(sinks[0].clone()).unwrap(), "1\n");
    }

    #[test]
    fn test_late_columns_do_not_insert_header_mid_stream() {
        let config = ConvertConfig::default().with_column_headers(true);
        let mut router = OutputRouter::new(SharedSink::new("<memory>", Vec::new()), &config);
        let cols = vec!["id".to_string()];

        router
            .route(&TableName::new("a"), None)
            .unwrap()
            .encode(&[value("1")])
            .unwrap();
        router
            .route(&TableName::new("a"), Some(&cols))
            .unwrap()
            .encode(&[value("2")])
            .unwrap();
        router.record_columns(TableName::new("b"), vec!["y".into()]);
        router
            .route(&TableName::new("b"), None)
            .unwrap()
            .encode(&[value("3")])
            .unwrap();

        let sinks = router.close().unwrap();
        assert_eq!(String::from_utf8(sinks[0].clone()).unwrap(), "1\n2\n3\n");
    }

    #[test]
    fn test_file_factory_disambiguates_colliding_names() {
        let dir = tempfile::tempdir().unwrap();
        let mut factory = FileSinkFactory::new(dir.path()).unwrap();

        let first = factory.destination(&TableName::new("a/b"));
        let second = factory.destination(&TableName::new("a_b"));

        assert!(first.ends_with("a_b.csv"));
        assert!(second.ends_with("a_b_2.csv"));
    }

    #[test]
    fn test_file_factory_creates_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("x").join("y");
        FileSinkFactory::new(&nested).unwrap();
        assert!(nested.is_dir());
        // 已存在的目录不是错误
        FileSinkFactory::new(&nested).unwrap();
    }

    #[test]
    fn test_shared_sink_opens_once() {
        let mut sink = SharedSink::new("<memory>", Vec::<u8>::new());
        assert!(sink.open("<memory>").is_ok());
        assert!(sink.open("<memory>").is_err());
    }
}
