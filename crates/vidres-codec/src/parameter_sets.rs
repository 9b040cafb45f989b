//! 参数集收集与解码器配置.
//!
//! 解码器初始化前需要 VPS/SPS/PPS (HEVC) 或 SPS/PPS (H.264).
//! 本模块从 Annex B 码流中收集每类参数集的第一个实例 (含起始码),
//! 并与 SPS 中的分辨率一起组成 [`DecoderConfig`].

use bytes::{Bytes, BytesMut};
use vidres_core::{VidresError, VidresResult};

use crate::codec_id::CodecId;
use crate::parsers::annexb::{split_annex_b_bytes, start_code_len};
use crate::parsers::h264::NalUnitType;
use crate::parsers::h265::HevcNalUnitType;
use crate::resolution::{ExtractOptions, Resolution, extract_resolution};

/// 参数集类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParameterSetKind {
    Vps,
    Sps,
    Pps,
}

/// 每类参数集的第一个 NAL 单元 (含起始码)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterSets {
    /// 编码
    pub codec_id: CodecId,
    /// 视频参数集 (仅 HEVC)
    pub vps: Option<Bytes>,
    /// 序列参数集
    pub sps: Option<Bytes>,
    /// 图像参数集
    pub pps: Option<Bytes>,
}

impl ParameterSets {
    /// 缺失的必需参数集名称
    pub fn missing(&self) -> Vec<&'static str> {
        self.codec_id
            .required_parameter_sets()
            .iter()
            .copied()
            .filter(|name| match *name {
                "VPS" => self.vps.is_none(),
                "SPS" => self.sps.is_none(),
                _ => self.pps.is_none(),
            })
            .collect()
    }

    /// 必需参数集是否齐全
    pub fn is_complete(&self) -> bool {
        self.missing().is_empty()
    }

    /// 按 VPS, SPS, PPS 顺序遍历已找到的参数集
    pub fn iter(&self) -> impl Iterator<Item = &Bytes> {
        [&self.vps, &self.sps, &self.pps].into_iter().flatten()
    }

    /// 拼接为解码器的 codec private 数据 (Annex B 格式, 含起始码)
    pub fn codec_private(&self) -> Bytes {
        let mut out = BytesMut::with_capacity(self.iter().map(Bytes::len).sum());
        for unit in self.iter() {
            out.extend_from_slice(unit);
        }
        out.freeze()
    }
}

fn classify(codec_id: CodecId, payload: &[u8]) -> Option<ParameterSetKind> {
    let &b0 = payload.first()?;
    match codec_id {
        CodecId::H264 => match NalUnitType::from_header(b0) {
            NalUnitType::Sps => Some(ParameterSetKind::Sps),
            NalUnitType::Pps => Some(ParameterSetKind::Pps),
            _ => None,
        },
        CodecId::H265 => match HevcNalUnitType::from_header(b0) {
            HevcNalUnitType::Vps => Some(ParameterSetKind::Vps),
            HevcNalUnitType::Sps => Some(ParameterSetKind::Sps),
            HevcNalUnitType::Pps => Some(ParameterSetKind::Pps),
            _ => None,
        },
    }
}

/// 收集每类参数集的第一个 NAL 单元
///
/// 返回的 [`Bytes`] 与输入共享底层缓冲区.
pub fn collect_parameter_sets(codec_id: CodecId, data: &Bytes) -> ParameterSets {
    let mut sets = ParameterSets {
        codec_id,
        vps: None,
        sps: None,
        pps: None,
    };

    for unit in split_annex_b_bytes(data) {
        let Some(header_offset) = start_code_len(&unit, 0) else {
            continue;
        };
        let slot = match classify(codec_id, &unit[header_offset..]) {
            Some(ParameterSetKind::Vps) => &mut sets.vps,
            Some(ParameterSetKind::Sps) => &mut sets.sps,
            Some(ParameterSetKind::Pps) => &mut sets.pps,
            None => continue,
        };
        if slot.is_none() {
            *slot = Some(unit);
        }
        if sets.iter().count() == codec_id.required_parameter_sets().len() {
            break;
        }
    }

    log::debug!(
        "{}: 参数集 vps={} sps={} pps={}",
        codec_id,
        sets.vps.is_some(),
        sets.sps.is_some(),
        sets.pps.is_some()
    );
    sets
}

/// 解码器配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoderConfig {
    /// 编码
    pub codec_id: CodecId,
    /// 输出分辨率
    pub resolution: Resolution,
    /// 参数集
    pub parameter_sets: ParameterSets,
}

impl DecoderConfig {
    /// 从 Annex B 码流构造解码器配置
    ///
    /// 找不到 SPS 或缺少必需参数集时返回错误.
    pub fn from_stream(
        codec_id: CodecId,
        data: &Bytes,
        options: &ExtractOptions,
    ) -> VidresResult<Self> {
        let parameter_sets = collect_parameter_sets(codec_id, data);
        let missing = parameter_sets.missing();
        if !missing.is_empty() {
            return Err(VidresError::InvalidData(format!(
                "{}: 缺少参数集 {}",
                codec_id,
                missing.join("/")
            )));
        }

        let resolution = extract_resolution(codec_id, data, options)?
            .ok_or_else(|| VidresError::InvalidData(format!("{}: 码流中没有 SPS", codec_id)))?;

        Ok(Self {
            codec_id,
            resolution,
            parameter_sets,
        })
    }

    /// MIME 类型
    pub fn mime_type(&self) -> &'static str {
        self.codec_id.mime_type()
    }
}
