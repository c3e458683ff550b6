//! Converter - 逐行驱动整个转换过程
//!
//! 每行输入依次经过：分类 -> (INSERT) 解析 VALUES -> 路由到表输出 -> CSV 编码。
//! CREATE TABLE 块中的列名在块结束时交给路由器，用作列名行。

use crate::config::ConvertConfig;
use crate::error::{ConvertError, ParseError};
use crate::parser::parse_values;
use crate::sink::{OutputRouter, SinkFactory};
use crate::statement::{Statement, StatementClassifier, TableName};
use std::io::BufRead;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

// 初始行缓冲容量；mysqldump 的扩展 INSERT 默认单行不超过 1MB 左右
const LINE_BUFFER_CAPACITY: usize = 1024 * 1024;

/// 一次运行的统计信息
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConvertStats {
    /// 读取的行数
    pub lines_read: u64,
    /// 识别出的 INSERT 语句数
    pub insert_statements: u64,
    /// 写出的数据行数
    pub rows_written: u64,
    /// 因格式错误被跳过的语句数
    pub statements_skipped: u64,
    /// 写入过数据的表数量
    pub tables: u64,
    /// 数据值与 NULL 占位符相同的次数
    pub placeholder_collisions: u64,
    /// 是否因外部中断提前结束
    pub interrupted: bool,
}

/// 转换驱动器
///
/// # 示例
///
/// ```
/// use mysqldump_csv::{ConvertConfig, Converter, SharedSink};
///
/// let dump = "INSERT INTO `t` VALUES (1,'a'),(2,NULL);\n";
/// let config = ConvertConfig::default();
/// let mut converter = Converter::new(SharedSink::new("<memory>", Vec::<u8>::new()), &config)?;
/// converter.convert(dump.as_bytes())?;
/// let (stats, sinks) = converter.finish()?;
///
/// assert_eq!(stats.rows_written, 2);
/// assert_eq!(sinks[0], b"1,a\n2,\\N\n");
/// # Ok::<(), mysqldump_csv::ConvertError>(())
/// ```
pub struct Converter<F: SinkFactory> {
    classifier: StatementClassifier,
    router: OutputRouter<F>,
    stats: ConvertStats,
    pending_table: Option<(TableName, Vec<String>)>,
    cancel: Option<Arc<AtomicBool>>,
    line: Vec<u8>,
}

impl<F: SinkFactory> Converter<F> {
    /// 创建转换器，配置不合法时返回 `InvalidConfig`
    pub fn new(factory: F, config: &ConvertConfig) -> Result<Self, ConvertError> {
        config.validate()?;
        Ok(Self {
            classifier: StatementClassifier::new(),
            router: OutputRouter::new(factory, config),
            stats: ConvertStats::default(),
            pending_table: None,
            cancel: None,
            line: Vec::new(),
        })
    }

    /// 设置取消标志；标志被置位后，当前行处理完即停止读取
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn stats(&self) -> &ConvertStats {
        &self.stats
    }

    pub fn router(&self) -> &OutputRouter<F> {
        &self.router
    }

    fn cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    /// 读取并转换一个输入流直到结束（或被取消）
    ///
    /// 多个输入依次调用本方法即可，输出按输入顺序追加。
    pub fn convert<R: BufRead>(&mut self, mut reader: R) -> Result<(), ConvertError> {
        let mut line = std::mem::take(&mut self.line);
        if line.capacity() == 0 {
            line.reserve(LINE_BUFFER_CAPACITY);
        }

        let result = loop {
            if self.cancelled() {
                self.stats.interrupted = true;
                debug!("conversion cancelled");
                break Ok(());
            }

            line.clear();
            match reader.read_until(b'\n', &mut line) {
                Ok(0) => break Ok(()),
                Ok(_) => {}
                Err(e) => break Err(ConvertError::Input(e)),
            }

            if let Err(e) = self.process_line(&line) {
                break Err(e);
            }
        };

        self.line = line;
        result
    }

    /// 处理一行输入
    ///
    /// 语句级错误在这里记录并跳过；只有输出错误会返回 `Err`。
    pub fn process_line(&mut self, line: &[u8]) -> Result<(), ConvertError> {
        self.stats.lines_read += 1;
        let line = trim_line_end(line);

        let statement = match self.classifier.classify(line) {
            Ok(statement) => statement,
            Err(e) => {
                self.skip(None, &e);
                return Ok(());
            }
        };

        match statement {
            Statement::Irrelevant => {}
            Statement::Insert {
                table,
                columns,
                values,
            } => {
                self.stats.insert_statements += 1;
                self.write_insert(&table, columns.as_deref(), values)?;
            }
            Statement::CreateTable { table } => {
                self.finish_create_table();
                debug!(table = %table, "collecting column names");
                self.pending_table = Some((table, Vec::new()));
            }
            Statement::CreateTableColumn { name } => {
                if let Some((_, columns)) = self.pending_table.as_mut() {
                    columns.push(name);
                }
            }
            Statement::CreateTableKeyBoundary => self.finish_create_table(),
        }

        Ok(())
    }

    fn write_insert(
        &mut self,
        table: &TableName,
        columns: Option<&[String]>,
        values: &[u8],
    ) -> Result<(), ConvertError> {
        // 整条语句解析成功才写出，被截断的语句不会留下半截数据
        let rows = match parse_values(values) {
            Ok(rows) => rows,
            Err(e) => {
                self.skip(Some(table), &e);
                return Ok(());
            }
        };

        let encoder = self.router.route(table, columns)?;
        for row in &rows {
            encoder.encode(row)?;
        }
        self.stats.rows_written += rows.len() as u64;
        Ok(())
    }

    fn finish_create_table(&mut self) {
        if let Some((table, columns)) = self.pending_table.take() {
            debug!(table = %table, columns = columns.len(), "recorded column names");
            self.router.record_columns(table, columns);
        }
    }

    fn skip(&mut self, table: Option<&TableName>, err: &ParseError) {
        self.stats.statements_skipped += 1;
        match table {
            Some(table) => warn!(
                line = self.stats.lines_read,
                table = %table,
                error = %err,
                "skipping statement"
            ),
            None => warn!(line = self.stats.lines_read, error = %err, "skipping statement"),
        }
    }

    /// 刷新所有输出，不关闭
    pub fn flush(&mut self) -> Result<(), ConvertError> {
        self.router.flush()
    }

    /// 结束转换：关闭所有输出，返回统计信息和底层 sink
    pub fn finish(mut self) -> Result<(ConvertStats, Vec<F::Sink>), ConvertError> {
        self.finish_create_table();
        self.stats.tables = self.router.table_count() as u64;
        self.stats.placeholder_collisions = self.router.placeholder_collisions();
        let stats = self.stats;

        if stats.statements_skipped > 0 {
            warn!(
                skipped = stats.statements_skipped,
                "some statements were skipped due to malformed input"
            );
        }
        if stats.placeholder_collisions > 0 {
            warn!(
                count = stats.placeholder_collisions,
                "data values identical to the NULL placeholder were written"
            );
        }
        info!(
            lines = stats.lines_read,
            inserts = stats.insert_statements,
            rows = stats.rows_written,
            tables = stats.tables,
            interrupted = stats.interrupted,
            "conversion finished"
        );

        let sinks = self.router.close()?;
        Ok((stats, sinks))
    }
}

#[inline]
fn trim_line_end(mut line: &[u8]) -> &[u8] {
    while let [rest @ .., b'\n' | b'\r'] = line {
        line = rest;
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::SharedSink;

    fn run(input: &str, config: &ConvertConfig) -> (ConvertStats, String) {
        let mut converter =
            Converter::new(SharedSink::new("<memory>", Vec::new()), config).unwrap();
        converter.convert(input.as_bytes()).unwrap();
        let (stats, sinks) = converter.finish().unwrap();
        let out = sinks
            .into_iter()
            .next()
            .map(|s| String::from_utf8(s).unwrap())
            .unwrap_or_default();
        (stats, out)
    }

    #[test]
    fn trims_line_endings() {
        assert_eq!(trim_line_end(b"abc\r\n"), b"abc");
        assert_eq!(trim_line_end(b"abc"), b"abc");
        assert_eq!(trim_line_end(b"\n"), b"");
    }

    #[test]
    fn counts_lines_statements_and_rows() {
        let input = "-- dump\nINSERT INTO `t` VALUES (1),(2);\nINSERT INTO `u` VALUES (3);\n";
        let (stats, out) = run(input, &ConvertConfig::default());
        assert_eq!(stats.lines_read, 3);
        assert_eq!(stats.insert_statements, 2);
        assert_eq!(stats.rows_written, 3);
        assert_eq!(stats.tables, 2);
        assert_eq!(stats.statements_skipped, 0);
        assert!(!stats.interrupted);
        assert_eq!(out, "1\n2\n3\n");
    }

    #[test]
    fn skips_malformed_and_continues() {
        let input = "INSERT INTO `t` VALUES (1,'a'),(2,'b'\nINSERT INTO `t` VALUES (3,'c');\n";
        let (stats, out) = run(input, &ConvertConfig::default());
        assert_eq!(stats.statements_skipped, 1);
        assert_eq!(stats.rows_written, 1);
        assert_eq!(out, "3,c\n");
    }

    #[test]
    fn insert_without_table_name_is_skipped() {
        let (stats, out) = run("INSERT INTO \nINSERT INTO t VALUES (1);\n", &ConvertConfig::default());
        assert_eq!(stats.statements_skipped, 1);
        assert_eq!(out, "1\n");
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = ConvertConfig::default().with_null_placeholder("");
        let result = Converter::new(SharedSink::new("<memory>", Vec::<u8>::new()), &config);
        assert!(matches!(result, Err(ConvertError::InvalidConfig(_))));
    }

    #[test]
    fn cancel_flag_stops_before_next_line() {
        let flag = Arc::new(AtomicBool::new(true));
        let mut converter = Converter::new(
            SharedSink::new("<memory>", Vec::<u8>::new()),
            &ConvertConfig::default(),
        )
        .unwrap()
        .with_cancel_flag(flag);

        converter
            .convert("INSERT INTO `t` VALUES (1);\n".as_bytes())
            .unwrap();
        let (stats, sinks) = converter.finish().unwrap();
        assert!(stats.interrupted);
        assert_eq!(stats.rows_written, 0);
        assert!(sinks.is_empty());
    }

    #[test]
    fn create_table_at_end_of_input_is_recorded() {
        let config = ConvertConfig::default().with_column_headers(true);
        let mut converter =
            Converter::new(SharedSink::new("<memory>", Vec::<u8>::new()), &config).unwrap();
        converter
            .convert("CREATE TABLE `t` (\n  `a` int,\n  `b` int\n".as_bytes())
            .unwrap();
        converter.finish_create_table();
        assert_eq!(
            converter.router().columns_for(&TableName::new("t")),
            Some(&["a".to_string(), "b".to_string()][..])
        );
    }
}
