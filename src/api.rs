//! 便捷 API 函数
//!
//! 提供了一组方便使用的高层 API，覆盖最常见的几种转换方式。
//! 需要更细的控制（自定义输出、逐行喂入）时直接使用 [`Converter`]。

use crate::config::ConvertConfig;
use crate::converter::{ConvertStats, Converter};
use crate::error::ConvertError;
use crate::sink::{FileSinkFactory, SharedSink, SinkFactory};
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use tracing::info;

// 输入文件的读缓冲大小
const INPUT_BUFFER_SIZE: usize = 256 * 1024;

// 表示标准输入的文件名
const STDIN_NAME: &str = "-";

/// 把一个 dump 流转换到单个输出
///
/// 所有表的数据按输入顺序写入 `out`。
///
/// # 示例
///
/// ```
/// use mysqldump_csv::{ConvertConfig, convert_reader};
///
/// let dump = "INSERT INTO `a` VALUES (1);\nINSERT INTO `b` VALUES ('x,y');\n";
/// let mut out: Vec<u8> = Vec::new();
/// convert_reader(dump.as_bytes(), &mut out, &ConvertConfig::default())?;
/// assert_eq!(out, b"1\n\"x,y\"\n");
/// # Ok::<(), mysqldump_csv::ConvertError>(())
/// ```
pub fn convert_reader<R, W>(
    reader: R,
    out: W,
    config: &ConvertConfig,
) -> Result<ConvertStats, ConvertError>
where
    R: BufRead,
    W: Write,
{
    let mut converter = Converter::new(SharedSink::new("<output>", out), config)?;
    converter.convert(reader)?;
    let (stats, _) = converter.finish()?;
    Ok(stats)
}

/// 把一个 dump 流按表拆分到 `dir` 下的 `<表名>.csv`
///
/// 目录不存在时自动创建。`config.output_dir` 在这里被忽略。
pub fn convert_to_dir<R, P>(
    reader: R,
    dir: P,
    config: &ConvertConfig,
) -> Result<ConvertStats, ConvertError>
where
    R: BufRead,
    P: AsRef<Path>,
{
    let mut converter = Converter::new(FileSinkFactory::new(dir.as_ref())?, config)?;
    converter.convert(reader)?;
    let (stats, _) = converter.finish()?;
    Ok(stats)
}

/// 按顺序转换多个输入文件
///
/// - `inputs` 为空或其中的 `-` 表示标准输入
/// - 设置了 `config.output_dir` 时按表拆分为文件，否则写到标准输出
/// - `cancel` 被置位后在当前行结束时停止，已写出的数据会被刷新
///
/// # 示例
///
/// ```no_run
/// use mysqldump_csv::{ConvertConfig, convert_inputs};
///
/// let config = ConvertConfig::default().with_output_dir("out");
/// let stats = convert_inputs(&["part1.sql", "part2.sql"], &config, None)?;
/// println!("跳过了 {} 条语句", stats.statements_skipped);
/// # Ok::<(), mysqldump_csv::ConvertError>(())
/// ```
pub fn convert_inputs<P>(
    inputs: &[P],
    config: &ConvertConfig,
    cancel: Option<Arc<AtomicBool>>,
) -> Result<ConvertStats, ConvertError>
where
    P: AsRef<Path>,
{
    match &config.output_dir {
        Some(dir) => run_inputs(FileSinkFactory::new(dir)?, inputs, config, cancel),
        None => run_inputs(SharedSink::stdout(), inputs, config, cancel),
    }
}

fn run_inputs<F, P>(
    factory: F,
    inputs: &[P],
    config: &ConvertConfig,
    cancel: Option<Arc<AtomicBool>>,
) -> Result<ConvertStats, ConvertError>
where
    F: SinkFactory,
    P: AsRef<Path>,
{
    let mut converter = Converter::new(factory, config)?;
    if let Some(flag) = cancel {
        converter = converter.with_cancel_flag(flag);
    }

    if inputs.is_empty() {
        converter.convert(io::stdin().lock())?;
    }

    for input in inputs {
        if converter.stats().interrupted {
            break;
        }
        let path = input.as_ref();
        if path.as_os_str() == STDIN_NAME {
            info!("reading standard input");
            converter.convert(io::stdin().lock())?;
        } else {
            info!(input = %path.display(), "reading input file");
            converter.convert(open_input(path)?)?;
        }
    }

    let (stats, _) = converter.finish()?;
    Ok(stats)
}

fn open_input(path: &Path) -> Result<BufReader<File>, ConvertError> {
    let file = File::open(path)
        .map_err(|e| io::Error::new(e.kind(), format!("{}: {e}", path.display())))?;
    Ok(BufReader::with_capacity(INPUT_BUFFER_SIZE, file))
}
