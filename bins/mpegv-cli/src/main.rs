//! mpegv-cli - MPEG-1/MPEG-2 视频基本流解码工具
//!
//! 把 .m1v/.m2v 基本流解码为逐帧的 PPM 或原始 ARGB 文件, 结束时打印摘要.

mod logging;
mod output;

use std::fs::File;
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result, bail};
use clap::Parser;
use log::{info, warn};
use serde::Serialize;

use mpegv_codec::{DecoderConfig, DecoderSession, IdctKind, OutputSize, PictureStatus};
use mpegv_core::ReadSource;

use output::{FrameWriter, OutputFormat};

/// MPEG-1/MPEG-2 视频基本流解码工具
#[derive(Parser, Debug)]
#[command(name = "mpegv-cli", version, about = "纯 Rust MPEG-1/MPEG-2 视频解码工具")]
struct Cli {
    /// 输入基本流文件
    input: PathBuf,

    /// 输出目录, 不指定时只解码并打印摘要
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// 输出文件格式
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Ppm)]
    format: OutputFormat,

    /// 最多解码的图像数
    #[arg(short = 'n', long)]
    frames: Option<u64>,

    /// JSON 格式的解码配置文件
    #[arg(long)]
    config: Option<PathBuf>,

    /// 使用双精度参考 IDCT
    #[arg(long)]
    reference_idct: bool,

    /// 输出完整宏块网格而不是显示尺寸
    #[arg(long)]
    coded_size: bool,

    /// 以 JSON 输出摘要
    #[arg(long)]
    json: bool,

    /// 文件日志目录 (级别由 MPEGV_LOG 控制)
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// 日志级别 (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// 解码摘要
#[derive(Debug, Serialize)]
struct Summary {
    input: String,
    format: &'static str,
    width: u32,
    height: u32,
    chroma_format: String,
    progressive: bool,
    frame_rate: String,
    bit_rate: u64,
    pictures_decoded: u64,
    frames_output: u64,
    frames_written: u32,
    faults: u64,
    stopped_early: bool,
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = logging::init(cli.verbose, cli.log_dir.as_deref()) {
        eprintln!("警告: {:#}", e);
    }
    if let Err(e) = run(&cli) {
        eprintln!("错误: {:#}", e);
        process::exit(1);
    }
}

/// 读取配置文件并叠加命令行选项
fn load_config(cli: &Cli) -> Result<DecoderConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let text = std::fs::read_to_string(path).with_context(|| format!("读取配置文件失败: {}", path.display()))?;
            serde_json::from_str(&text).with_context(|| format!("解析配置文件失败: {}", path.display()))?
        }
        None => DecoderConfig::default(),
    };
    if cli.reference_idct {
        config.idct = IdctKind::Reference;
    }
    if cli.coded_size {
        config.output_size = OutputSize::Coded;
    }
    Ok(config)
}

fn prepare_output_dir(dir: &Path) -> Result<()> {
    if dir.exists() && !dir.is_dir() {
        bail!("输出路径不是目录: {}", dir.display());
    }
    std::fs::create_dir_all(dir).with_context(|| format!("创建输出目录失败: {}", dir.display()))
}

fn run(cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;
    let file = File::open(&cli.input).with_context(|| format!("打开输入文件失败: {}", cli.input.display()))?;
    let (mut session, width, height) = DecoderSession::with_config(ReadSource::new(file), config)
        .with_context(|| format!("初始化解码失败: {}", cli.input.display()))?;
    let stream = session.stream_info();
    info!(
        "输入 {}: {}x{}, {:?}, {} fps",
        cli.input.display(),
        width,
        height,
        stream.chroma_format,
        stream.frame_rate
    );

    let mut writer = match &cli.output {
        Some(dir) => {
            prepare_output_dir(dir)?;
            Some(FrameWriter::new(dir, cli.format))
        }
        None => None,
    };
    let mut discard = |_x: u32, _y: u32, _argb: u32| {};

    let limit = cli.frames.unwrap_or(u64::MAX);
    let mut decoded = 0u64;
    while decoded < limit {
        let status = match writer.as_mut() {
            Some(w) => session.decode_picture(w)?,
            None => session.decode_picture(&mut discard)?,
        };
        match status {
            PictureStatus::Decoded(_) => decoded += 1,
            PictureStatus::EndOfStream => break,
        }
        if let Some(e) = writer.as_mut().and_then(FrameWriter::take_error) {
            return Err(e).context("写出帧失败");
        }
    }
    let stopped_early = decoded >= limit;
    if stopped_early {
        info!("已达到图像数上限 {}, 停止解码", limit);
    }

    let stats = session.stats();
    if stats.faults > 0 {
        warn!("解码期间出现 {} 个码流错误", stats.faults);
    }
    let summary = Summary {
        input: cli.input.display().to_string(),
        format: if stream.mpeg2 { "MPEG-2" } else { "MPEG-1" },
        width,
        height,
        chroma_format: format!("{:?}", stream.chroma_format),
        progressive: stream.progressive_sequence,
        frame_rate: stream.frame_rate.to_string(),
        bit_rate: stream.bit_rate,
        pictures_decoded: stats.pictures_decoded,
        frames_output: stats.frames_output,
        frames_written: writer.as_ref().map_or(0, FrameWriter::frames_written),
        faults: stats.faults,
        stopped_early,
    };
    session.close();
    print_summary(&summary, cli.json)
}

fn print_summary(summary: &Summary, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(summary)?);
        return Ok(());
    }
    println!("输入:     {}", summary.input);
    println!(
        "视频:     {} {}x{} {} {}",
        summary.format,
        summary.width,
        summary.height,
        summary.chroma_format,
        if summary.progressive { "逐行" } else { "隔行" }
    );
    println!("帧率:     {} fps, 码率 {} bit/s", summary.frame_rate, summary.bit_rate);
    println!(
        "解码:     {} 幅图像, 输出 {} 帧, 写出 {} 个文件",
        summary.pictures_decoded, summary.frames_output, summary.frames_written
    );
    if summary.faults > 0 {
        println!("码流错误: {}", summary.faults);
    }
    Ok(())
}
