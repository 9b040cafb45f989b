//! vidres-probe - H.264 / HEVC 裸流分辨率探测工具
//!
//! 读取 Annex B 码流, 解析第一个 SPS 得到图像分辨率, 支持批量并行探测.

mod config;
mod inspect;
mod logging;
mod report;
mod source;

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;

use crate::config::{CodecChoice, ProbeConfig};
use crate::inspect::inspect_all;
use crate::source::open_source;

/// vidres 分辨率探测工具
#[derive(Parser, Debug)]
#[command(
    name = "vidres-probe",
    version,
    about = "从 H.264 / HEVC Annex B 裸流中提取分辨率"
)]
struct Cli {
    /// 输入文件路径, `-` 表示标准输入
    #[arg(required = true)]
    inputs: Vec<String>,

    /// 编码格式
    #[arg(long, value_enum)]
    codec: Option<CodecChoice>,

    /// 输出 JSON 格式
    #[arg(long)]
    json: bool,

    /// HEVC 应用 conformance window 裁剪
    #[arg(long)]
    crop_hevc: bool,

    /// 容忍截断的 SPS, 给出尽力而为的结果
    #[arg(long)]
    tolerant: bool,

    /// 未找到 SPS 时的回退分辨率 (WxH)
    #[arg(long, value_name = "WxH")]
    fallback: Option<String>,

    /// 未找到 SPS 时视为失败, 不使用回退分辨率
    #[arg(long, conflicts_with = "fallback")]
    no_fallback: bool,

    /// JSON 配置文件
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// 日志文件目录
    #[arg(long, value_name = "DIR")]
    log_dir: Option<PathBuf>,

    /// 静默模式 (只输出探测结果)
    #[arg(short, long)]
    quiet: bool,

    /// 日志详细程度 (-v, -vv, -vvv, -vvvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    /// 命令行参数覆盖配置
    fn apply_to(&self, config: &mut ProbeConfig) {
        if let Some(codec) = self.codec {
            config.codec = codec;
        }
        config.json |= self.json;
        config.crop_hevc |= self.crop_hevc;
        config.tolerant |= self.tolerant;
        if let Some(fallback) = &self.fallback {
            config.fallback = Some(fallback.clone());
        }
        if self.no_fallback {
            config.fallback = None;
        }
        if let Some(dir) = &self.log_dir {
            config.log_dir = Some(dir.clone());
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("错误: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<ExitCode> {
    let mut config = match &cli.config {
        Some(path) => ProbeConfig::load(path)?,
        None => ProbeConfig::default(),
    };
    cli.apply_to(&mut config);

    logging::init(
        "vidres-probe",
        cli.verbose,
        cli.quiet,
        config.log_dir.as_deref(),
    )?;

    if !cli.quiet {
        eprintln!(
            "vidres-probe 版本 {} -- H.264 / HEVC 分辨率探测工具",
            env!("CARGO_PKG_VERSION")
        );
    }

    let fallback = config.fallback_resolution()?;
    let sources = cli
        .inputs
        .iter()
        .map(|arg| open_source(arg))
        .collect::<Result<Vec<_>>>()?;
    tracing::info!("探测 {} 个输入, 编码={:?}", sources.len(), config.codec);

    let reports = inspect_all(&sources, &config, fallback);

    let mut out = io::stdout().lock();
    if config.json {
        report::write_json(&mut out, &reports)?;
    } else {
        report::write_text(&mut out, &reports)?;
    }

    let failed = reports.iter().filter(|r| !r.is_ok()).count();
    if failed > 0 {
        tracing::warn!("{}/{} 个输入探测失败", failed, reports.len());
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
