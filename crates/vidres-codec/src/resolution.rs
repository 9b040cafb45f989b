//! 分辨率提取.
//!
//! 在 Annex B 码流中定位第一个 SPS, 去掉头部与防竞争字节后按编解码器语法解析,
//! 得到像素宽高. 找不到 SPS 返回 `Ok(None)`, SPS 损坏返回错误.

use std::fmt;
use std::str::FromStr;

use vidres_core::{VidresError, VidresResult};

use crate::codec_id::CodecId;
use crate::parsers::annexb::remove_emulation_prevention;
use crate::parsers::h264::{find_first_sps, parse_sps};
use crate::parsers::h265::{find_first_hevc_sps, parse_hevc_sps};
use crate::parsers::syntax::TruncationPolicy;

/// 图像分辨率 (像素)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Resolution {
    /// 宽度
    pub width: u32,
    /// 高度
    pub height: u32,
}

impl Resolution {
    /// 创建分辨率
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for Resolution {
    type Err = VidresError;

    /// 解析 `WxH` 形式, 如 `352x288`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || VidresError::InvalidArgument(format!("分辨率格式应为 WxH, 实际: {}", s));
        let (w, h) = s
            .trim()
            .split_once(['x', 'X'])
            .ok_or_else(invalid)?;
        let width: u32 = w.trim().parse().map_err(|_| invalid())?;
        let height: u32 = h.trim().parse().map_err(|_| invalid())?;
        if width == 0 || height == 0 {
            return Err(invalid());
        }
        Ok(Self { width, height })
    }
}

/// 提取选项
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractOptions {
    /// 截断处理策略
    pub truncation: TruncationPolicy,
    /// HEVC 是否应用 conformance window 裁剪 (默认不应用)
    pub apply_conformance_window: bool,
}

/// 从 SPS 得到的码流摘要
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpsSummary {
    /// 编码
    pub codec_id: CodecId,
    /// 分辨率
    pub resolution: Resolution,
    /// profile_idc
    pub profile_idc: u8,
    /// level_idc
    pub level_idc: u8,
    /// 色度格式
    pub chroma_format_idc: u32,
    /// SPS 起始码在码流中的偏移
    pub sps_offset: usize,
    /// SPS 是否截断 (仅容错模式下可能为 true)
    pub truncated: bool,
}

/// 解析码流中第一个 SPS, 返回摘要
pub fn probe_sps(
    codec_id: CodecId,
    data: &[u8],
    options: &ExtractOptions,
) -> VidresResult<Option<SpsSummary>> {
    match codec_id {
        CodecId::H264 => probe_h264_sps(data, options),
        CodecId::H265 => probe_hevc_sps(data, options),
    }
}

fn probe_h264_sps(data: &[u8], options: &ExtractOptions) -> VidresResult<Option<SpsSummary>> {
    let Some(range) = find_first_sps(data) else {
        log::debug!("H.264: 码流中未找到 SPS, len={}", data.len());
        return Ok(None);
    };
    log::debug!("H.264: 找到 SPS, offset={}, len={}", range.start, range.len());

    let rbsp = remove_emulation_prevention(&range.payload(data)[1..]);
    let sps = parse_sps(&rbsp, options.truncation)?;
    if sps.truncated {
        log::warn!("H.264: SPS 截断, 结果为尽力而为: {}x{}", sps.width, sps.height);
    }

    Ok(Some(SpsSummary {
        codec_id: CodecId::H264,
        resolution: Resolution::new(sps.width, sps.height),
        profile_idc: sps.profile_idc,
        level_idc: sps.level_idc,
        chroma_format_idc: sps.chroma_format_idc,
        sps_offset: range.start,
        truncated: sps.truncated,
    }))
}

fn probe_hevc_sps(data: &[u8], options: &ExtractOptions) -> VidresResult<Option<SpsSummary>> {
    let Some(range) = find_first_hevc_sps(data) else {
        log::debug!("HEVC: 码流中未找到 SPS, len={}", data.len());
        return Ok(None);
    };
    log::debug!("HEVC: 找到 SPS, offset={}, len={}", range.start, range.len());

    let nal = remove_emulation_prevention(range.payload(data));
    let sps = parse_hevc_sps(&nal, options.truncation)?;
    let (width, height) = if options.apply_conformance_window {
        sps.cropped_size()?
    } else {
        sps.coded_size()
    };
    if sps.truncated {
        log::warn!("HEVC: SPS 截断, 结果为尽力而为: {}x{}", width, height);
    }

    Ok(Some(SpsSummary {
        codec_id: CodecId::H265,
        resolution: Resolution::new(width, height),
        profile_idc: sps.ptl.profile_idc,
        level_idc: sps.ptl.level_idc,
        chroma_format_idc: sps.chroma_format_idc,
        sps_offset: range.start,
        truncated: sps.truncated,
    }))
}

/// 从 H.264 Annex B 码流提取分辨率
pub fn extract_h264_resolution(
    data: &[u8],
    options: &ExtractOptions,
) -> VidresResult<Option<Resolution>> {
    Ok(probe_h264_sps(data, options)?.map(|summary| summary.resolution))
}

/// 从 HEVC Annex B 码流提取分辨率
pub fn extract_hevc_resolution(
    data: &[u8],
    options: &ExtractOptions,
) -> VidresResult<Option<Resolution>> {
    Ok(probe_hevc_sps(data, options)?.map(|summary| summary.resolution))
}

/// 按编码分派的分辨率提取
pub fn extract_resolution(
    codec_id: CodecId,
    data: &[u8],
    options: &ExtractOptions,
) -> VidresResult<Option<Resolution>> {
    Ok(probe_sps(codec_id, data, options)?.map(|summary| summary.resolution))
}
