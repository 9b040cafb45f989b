//! 单个输入的探测流程与批量并行探测.

use anyhow::{Context, Result, anyhow};
use rayon::prelude::*;
use serde::Serialize;
use vidres_codec::probe::SCORE_EXTENSION;
use vidres_codec::{
    CodecId, ParameterSets, Resolution, collect_parameter_sets, probe_codec, probe_sps,
};

use crate::config::ProbeConfig;
use crate::source::InputSource;

/// 编码的判定来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CodecOrigin {
    /// 命令行或配置强制指定
    Option,
    /// 码流内容
    Content,
    /// 文件扩展名
    Extension,
}

/// 分辨率来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionOrigin {
    /// 解析自 SPS
    Sps,
    /// 配置的回退值
    Fallback,
}

/// 参数集统计 (字节数含起始码)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParameterSetInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vps_size: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sps_size: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pps_size: Option<usize>,
    pub missing: Vec<&'static str>,
}

impl From<&ParameterSets> for ParameterSetInfo {
    fn from(sets: &ParameterSets) -> Self {
        Self {
            vps_size: sets.vps.as_ref().map(|b| b.len()),
            sps_size: sets.sps.as_ref().map(|b| b.len()),
            pps_size: sets.pps.as_ref().map(|b| b.len()),
            missing: sets.missing(),
        }
    }
}

/// 单个输入的探测结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamReport {
    pub input: String,
    pub size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub codec_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub codec_origin: Option<CodecOrigin>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probe_score: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution_origin: Option<ResolutionOrigin>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_idc: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level_idc: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chroma_format_idc: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sps_offset: Option<usize>,
    pub truncated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameter_sets: Option<ParameterSetInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StreamReport {
    fn new(input: &str) -> Self {
        Self {
            input: input.to_string(),
            size: 0,
            codec_name: None,
            codec_origin: None,
            probe_score: None,
            width: None,
            height: None,
            resolution_origin: None,
            profile_idc: None,
            level_idc: None,
            chroma_format_idc: None,
            sps_offset: None,
            truncated: false,
            parameter_sets: None,
            error: None,
        }
    }

    /// 是否得到了分辨率 (含回退)
    pub fn is_ok(&self) -> bool {
        self.error.is_none() && self.width.is_some()
    }

    /// 分辨率
    pub fn resolution(&self) -> Option<Resolution> {
        Some(Resolution::new(self.width?, self.height?))
    }

    fn set_resolution(&mut self, resolution: Resolution, origin: ResolutionOrigin) {
        self.width = Some(resolution.width);
        self.height = Some(resolution.height);
        self.resolution_origin = Some(origin);
    }

    fn apply_fallback(&mut self, fallback: Option<Resolution>, reason: &str) -> Result<()> {
        let resolution = fallback.ok_or_else(|| anyhow!("{reason}, 且未配置回退分辨率"))?;
        tracing::warn!("{}: {}, 使用回退分辨率 {}", self.input, reason, resolution);
        self.set_resolution(resolution, ResolutionOrigin::Fallback);
        Ok(())
    }
}

/// 探测单个输入, 失败信息记录在报告的 `error` 中
pub fn inspect(
    source: &dyn InputSource,
    config: &ProbeConfig,
    fallback: Option<Resolution>,
) -> StreamReport {
    let mut report = StreamReport::new(source.name());
    if let Err(err) = inspect_into(&mut report, source, config, fallback) {
        tracing::error!("{}: {:#}", report.input, err);
        report.error = Some(format!("{err:#}"));
    }
    report
}

fn inspect_into(
    report: &mut StreamReport,
    source: &dyn InputSource,
    config: &ProbeConfig,
    fallback: Option<Resolution>,
) -> Result<()> {
    let data = source.read_all()?;
    report.size = data.len() as u64;
    tracing::debug!("{}: 读取 {} 字节", report.input, data.len());

    let codec_id = match config.codec.codec_id() {
        Some(codec_id) => {
            report.codec_origin = Some(CodecOrigin::Option);
            codec_id
        }
        None => match probe_codec(&data, Some(source.name())) {
            Some(result) => {
                report.probe_score = Some(result.score);
                report.codec_origin = Some(if result.score == SCORE_EXTENSION {
                    CodecOrigin::Extension
                } else {
                    CodecOrigin::Content
                });
                result.codec_id
            }
            None => return report.apply_fallback(fallback, "无法识别编码格式"),
        },
    };
    report.codec_name = Some(codec_id.name().to_string());

    let summary = probe_sps(codec_id, &data, &config.extract_options())
        .with_context(|| format!("{} SPS 解析失败", codec_id))?;
    report.parameter_sets = Some(ParameterSetInfo::from(&collect_parameter_sets(
        codec_id, &data,
    )));

    match summary {
        Some(summary) => {
            tracing::info!(
                "{}: {} {} (profile={}, level={})",
                report.input,
                codec_id,
                summary.resolution,
                summary.profile_idc,
                summary.level_idc
            );
            report.set_resolution(summary.resolution, ResolutionOrigin::Sps);
            report.profile_idc = Some(summary.profile_idc);
            report.level_idc = Some(summary.level_idc);
            report.chroma_format_idc = Some(summary.chroma_format_idc);
            report.sps_offset = Some(summary.sps_offset);
            report.truncated = summary.truncated;
            Ok(())
        }
        None => report.apply_fallback(fallback, &format!("码流中没有 {} SPS", codec_id)),
    }
}

/// 并行探测多个输入, 结果保持输入顺序
pub fn inspect_all(
    sources: &[Box<dyn InputSource>],
    config: &ProbeConfig,
    fallback: Option<Resolution>,
) -> Vec<StreamReport> {
    sources
        .par_iter()
        .map(|source| inspect(source.as_ref(), config, fallback))
        .collect()
}

/// 探测到的编码
pub fn codec_of(report: &StreamReport) -> Option<CodecId> {
    report.codec_name.as_deref().and_then(CodecId::from_name)
}
