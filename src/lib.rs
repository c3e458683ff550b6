//! # mysqldump-csv
//!
//! 流式地把 mysqldump 输出的 `INSERT INTO ... VALUES (...),(...);` 语句转换为 CSV，
//! 可以写到一个共享输出流，也可以按表拆分为 `<表名>.csv` 文件。
//!
//! ## 功能特性
//!
//! - **流式处理**: 逐行读取，内存占用只与单行长度有关
//! - **引号感知**: 引号字符串中的 `(`、`)`、`,` 不会被当作结构字符
//! - **NULL 与空串区分**: `NULL` 写成可配置的占位符，`''` 写成空字段
//! - **列名行**: 可从 `CREATE TABLE` 或 `INSERT INTO t (cols)` 中恢复列名
//!
//! ## 快速开始
//!
//! ### 转换到一个输出流
//!
//! ```rust
//! use mysqldump_csv::{ConvertConfig, convert_reader};
//!
//! let dump = "\
//! CREATE TABLE `t` (
//!   `id` int,
//!   `name` varchar(10),
//!   PRIMARY KEY (`id`)
//! );
//! INSERT INTO `t` VALUES (1,'a'),(2,NULL);
//! ";
//!
//! let config = ConvertConfig::default().with_column_headers(true);
//! let mut out: Vec<u8> = Vec::new();
//! let stats = convert_reader(dump.as_bytes(), &mut out, &config)?;
//!
//! assert_eq!(stats.rows_written, 2);
//! assert_eq!(String::from_utf8(out).unwrap(), "id,name\n1,a\n2,\\N\n");
//! # Ok::<(), mysqldump_csv::ConvertError>(())
//! ```
//!
//! ### 按表拆分为文件
//!
//! ```rust,no_run
//! use mysqldump_csv::{ConvertConfig, convert_to_dir};
//! use std::fs::File;
//! use std::io::BufReader;
//!
//! let reader = BufReader::new(File::open("dump.sql")?);
//! let config = ConvertConfig::default().with_column_headers(true);
//! let stats = convert_to_dir(reader, "out", &config)?;
//! println!("{} 张表, {} 行", stats.tables, stats.rows_written);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ### 直接解析 VALUES 列表
//!
//! ```rust
//! use mysqldump_csv::{Field, parse_values};
//!
//! let rows = parse_values(b"('x),(y',1),(NULL,'');").unwrap();
//! assert_eq!(rows.len(), 2);
//! assert_eq!(rows[0][0].as_bytes(), Some(&b"x),(y"[..]));
//! assert_eq!(rows[1][0], Field::Null);
//! assert_eq!(rows[1][1], Field::Empty);
//! ```

pub mod api;
pub mod config;
pub mod converter;
pub mod error;
pub mod parser;
pub mod sink;
pub mod statement;
pub mod tools;

pub use api::{convert_inputs, convert_reader, convert_to_dir};
pub use config::{ConvertConfig, DEFAULT_NULL_PLACEHOLDER, EscapeStyle};
pub use converter::{ConvertStats, Converter};
pub use error::{ConvertError, Malformed, ParseError};
pub use parser::{Field, RawRow, ValuesParser, parse_values};
pub use sink::{CsvEncoder, FileSinkFactory, OutputRouter, SharedSink, SinkFactory};
pub use statement::{Statement, StatementClassifier, TableName};
