use clap::{Parser, ValueEnum};
use mysqldump_csv::{ConvertConfig, ConvertStats, EscapeStyle, convert_inputs};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{Level, debug};

// 第二次 Ctrl-C 时的提示与退出码（128 + SIGINT）
const FORCED_EXIT_NOTICE: &str =
    "mysqldump-to-csv: interrupted again, exiting without flushing; buffered rows were dropped";
const FORCED_EXIT_CODE: i32 = 130;

/// 把 mysqldump 输出转换为 CSV
#[derive(Parser, Debug)]
#[command(name = "mysqldump-to-csv", version, about)]
struct Cli {
    /// dump 文件，按顺序处理；不给或 `-` 表示标准输入
    inputs: Vec<PathBuf>,

    /// 按表拆分为 `<表名>.csv` 写入该目录（不存在时创建）
    #[arg(long = "out-dir", value_name = "DIR")]
    out_dir: Option<PathBuf>,

    /// 从 CREATE TABLE 或 INSERT 列清单恢复列名并写入首行
    #[arg(long = "col-names")]
    col_names: bool,

    /// NULL 值的占位符
    #[arg(long = "null-placeholder", value_name = "TOKEN", default_value = mysqldump_csv::DEFAULT_NULL_PLACEHOLDER)]
    null_placeholder: String,

    /// 引号字段内双引号的转义方式
    #[arg(long, value_enum, default_value_t = EscapeArg::Double)]
    escape: EscapeArg,

    /// 字段分隔符（单个 ASCII 字符，`\t` 表示制表符）
    #[arg(long, value_name = "CHAR", default_value = ",", value_parser = parse_delimiter)]
    delimiter: u8,

    /// 日志级别，日志写到标准错误
    #[arg(long, default_value = "warn", value_parser = ["debug", "info", "warn", "error"])]
    verbosity: String,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum EscapeArg {
    /// `"` 写成 `""`
    Double,
    /// `"` 写成 `\"`，`\` 写成 `\\`
    Backslash,
}

impl From<EscapeArg> for EscapeStyle {
    fn from(arg: EscapeArg) -> Self {
        match arg {
            EscapeArg::Double => EscapeStyle::Double,
            EscapeArg::Backslash => EscapeStyle::Backslash,
        }
    }
}

fn parse_delimiter(s: &str) -> Result<u8, String> {
    match s {
        "\\t" | "tab" => Ok(b'\t'),
        _ => match s.as_bytes() {
            [b] if b.is_ascii() => Ok(*b),
            _ => Err(format!("delimiter must be a single ASCII character, got {s:?}")),
        },
    }
}

fn setup_logging(verbosity: &str) {
    let level = match verbosity {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };

    // 标准输出可能承载 CSV 数据，日志只写标准错误
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

/// 在后台线程等待 Ctrl-C
///
/// 第一次置位取消标志，转换在当前行结束后刷新并关闭所有输出。
/// 第二次立即退出，用于读标准输入被阻塞的情况；此时写缓冲中的行不会落盘，
/// 退出前在标准错误上给出提示。
fn watch_interrupt(flag: Arc<AtomicBool>) -> io::Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    std::thread::Builder::new()
        .name("ctrl-c".into())
        .spawn(move || {
            runtime.block_on(async move {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    debug!(error = %e, "ctrl-c handler unavailable");
                    return;
                }
                eprintln!("\nInterrupted, flushing output...");
                flag.store(true, Ordering::Relaxed);

                if tokio::signal::ctrl_c().await.is_ok() {
                    eprintln!("{FORCED_EXIT_NOTICE}");
                    std::process::exit(FORCED_EXIT_CODE);
                }
            })
        })?;
    Ok(())
}

fn config_from(cli: &Cli) -> ConvertConfig {
    let mut config = ConvertConfig::new()
        .with_column_headers(cli.col_names)
        .with_null_placeholder(cli.null_placeholder.clone())
        .with_escape_style(cli.escape.into())
        .with_delimiter(cli.delimiter);
    if let Some(dir) = &cli.out_dir {
        config = config.with_output_dir(dir);
    }
    config
}

fn report(stats: &ConvertStats) {
    if stats.statements_skipped > 0 {
        eprintln!(
            "mysqldump-to-csv: {} malformed statement(s) skipped",
            stats.statements_skipped
        );
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_logging(&cli.verbosity);

    let cancel = Arc::new(AtomicBool::new(false));
    if let Err(e) = watch_interrupt(Arc::clone(&cancel)) {
        debug!(error = %e, "failed to install ctrl-c handler");
    }

    let config = config_from(&cli);
    match convert_inputs(&cli.inputs, &config, Some(cancel)) {
        Ok(stats) => {
            report(&stats);
            ExitCode::SUCCESS
        }
        // 下游提前关闭管道（如 `| head`）不算失败
        Err(e) if e.is_broken_pipe() => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("mysqldump-to-csv: {e}");
            ExitCode::FAILURE
        }
    }
}
