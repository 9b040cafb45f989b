//! H.265/HEVC NAL (Network Abstraction Layer) 单元解析.
//!
//! HEVC NAL 头部为 2 字节 (比 H.264 多一字节):
//! - forbidden_zero_bit (1 bit)
//! - nal_unit_type (6 bits)
//! - nuh_layer_id (6 bits)
//! - nuh_temporal_id_plus1 (3 bits)

use vidres_core::{VidresError, VidresResult};

use crate::parsers::annexb::{NalRange, find_nal_ranges, remove_emulation_prevention};

/// HEVC NAL 单元类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum HevcNalUnitType {
    /// TRAIL_N (非参考尾随图像)
    TrailN,
    /// TRAIL_R (参考尾随图像)
    TrailR,
    /// TSA_N
    TsaN,
    /// TSA_R
    TsaR,
    /// STSA_N
    StsaN,
    /// STSA_R
    StsaR,
    /// RADL_N
    RadlN,
    /// RADL_R
    RadlR,
    /// RASL_N
    RaslN,
    /// RASL_R
    RaslR,
    /// BLA_W_LP (Broken Link Access)
    BlaWLp,
    /// BLA_W_RADL
    BlaWRadl,
    /// BLA_N_LP
    BlaNLp,
    /// IDR_W_RADL (Instantaneous Decoding Refresh)
    IdrWRadl,
    /// IDR_N_LP
    IdrNLp,
    /// CRA_NUT (Clean Random Access)
    Cra,
    /// VPS (Video Parameter Set)
    Vps,
    /// SPS (Sequence Parameter Set)
    Sps,
    /// PPS (Picture Parameter Set)
    Pps,
    /// AUD (Access Unit Delimiter)
    Aud,
    /// EOS (End of Sequence)
    Eos,
    /// EOB (End of Bitstream)
    Eob,
    /// FD (Filler Data)
    FillerData,
    /// PREFIX_SEI
    PrefixSei,
    /// SUFFIX_SEI
    SuffixSei,
    /// 未知或保留类型
    Unknown(u8),
}

impl HevcNalUnitType {
    /// 从类型编号创建
    pub fn from_type_id(id: u8) -> Self {
        match id {
            0 => Self::TrailN,
            1 => Self::TrailR,
            2 => Self::TsaN,
            3 => Self::TsaR,
            4 => Self::StsaN,
            5 => Self::StsaR,
            6 => Self::RadlN,
            7 => Self::RadlR,
            8 => Self::RaslN,
            9 => Self::RaslR,
            16 => Self::BlaWLp,
            17 => Self::BlaWRadl,
            18 => Self::BlaNLp,
            19 => Self::IdrWRadl,
            20 => Self::IdrNLp,
            21 => Self::Cra,
            32 => Self::Vps,
            33 => Self::Sps,
            34 => Self::Pps,
            35 => Self::Aud,
            36 => Self::Eos,
            37 => Self::Eob,
            38 => Self::FillerData,
            39 => Self::PrefixSei,
            40 => Self::SuffixSei,
            _ => Self::Unknown(id),
        }
    }

    /// 从 NAL 头部首字节提取类型 (`(byte >> 1) & 0x3F`)
    pub fn from_header(first_byte: u8) -> Self {
        Self::from_type_id((first_byte >> 1) & 0x3F)
    }

    /// 获取类型编号
    pub fn type_id(&self) -> u8 {
        match self {
            Self::TrailN => 0,
            Self::TrailR => 1,
            Self::TsaN => 2,
            Self::TsaR => 3,
            Self::StsaN => 4,
            Self::StsaR => 5,
            Self::RadlN => 6,
            Self::RadlR => 7,
            Self::RaslN => 8,
            Self::RaslR => 9,
            Self::BlaWLp => 16,
            Self::BlaWRadl => 17,
            Self::BlaNLp => 18,
            Self::IdrWRadl => 19,
            Self::IdrNLp => 20,
            Self::Cra => 21,
            Self::Vps => 32,
            Self::Sps => 33,
            Self::Pps => 34,
            Self::Aud => 35,
            Self::Eos => 36,
            Self::Eob => 37,
            Self::FillerData => 38,
            Self::PrefixSei => 39,
            Self::SuffixSei => 40,
            Self::Unknown(id) => *id,
        }
    }

    /// 是否为 VCL (Video Coding Layer) NAL
    pub fn is_vcl(&self) -> bool {
        self.type_id() < 32
    }

    /// 是否为 IRAP (Intra Random Access Point) NAL
    pub fn is_irap(&self) -> bool {
        matches!(self.type_id(), 16..=21)
    }

    /// 是否为参数集 (VPS/SPS/PPS)
    pub fn is_parameter_set(&self) -> bool {
        matches!(self, Self::Vps | Self::Sps | Self::Pps)
    }
}

impl std::fmt::Display for HevcNalUnitType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TrailN => write!(f, "TRAIL_N"),
            Self::TrailR => write!(f, "TRAIL_R"),
            Self::TsaN => write!(f, "TSA_N"),
            Self::TsaR => write!(f, "TSA_R"),
            Self::StsaN => write!(f, "STSA_N"),
            Self::StsaR => write!(f, "STSA_R"),
            Self::RadlN => write!(f, "RADL_N"),
            Self::RadlR => write!(f, "RADL_R"),
            Self::RaslN => write!(f, "RASL_N"),
            Self::RaslR => write!(f, "RASL_R"),
            Self::BlaWLp => write!(f, "BLA_W_LP"),
            Self::BlaWRadl => write!(f, "BLA_W_RADL"),
            Self::BlaNLp => write!(f, "BLA_N_LP"),
            Self::IdrWRadl => write!(f, "IDR_W_RADL"),
            Self::IdrNLp => write!(f, "IDR_N_LP"),
            Self::Cra => write!(f, "CRA"),
            Self::Vps => write!(f, "VPS"),
            Self::Sps => write!(f, "SPS"),
            Self::Pps => write!(f, "PPS"),
            Self::Aud => write!(f, "AUD"),
            Self::Eos => write!(f, "EOS"),
            Self::Eob => write!(f, "EOB"),
            Self::FillerData => write!(f, "FD"),
            Self::PrefixSei => write!(f, "PREFIX_SEI"),
            Self::SuffixSei => write!(f, "SUFFIX_SEI"),
            Self::Unknown(id) => write!(f, "Unknown({id})"),
        }
    }
}

/// HEVC NAL 单元, 借用源缓冲区
#[derive(Debug, Clone, Copy)]
pub struct HevcNalUnit<'a> {
    /// NAL 类型
    pub nal_type: HevcNalUnitType,
    /// nuh_layer_id
    pub layer_id: u8,
    /// nuh_temporal_id_plus1
    pub temporal_id_plus1: u8,
    /// 在源缓冲区中的位置
    pub range: NalRange,
    /// NAL 数据 (不含起始码, 含 2 字节 NAL 头)
    pub data: &'a [u8],
}

impl<'a> HevcNalUnit<'a> {
    /// 从原始 NAL 数据 (含 2 字节头) 解析
    pub fn parse(data: &'a [u8], range: NalRange) -> VidresResult<Self> {
        let &[b0, b1, ..] = data else {
            return Err(VidresError::InvalidData(format!(
                "HEVC: NAL 数据太短, offset={}, len={}",
                range.start,
                data.len()
            )));
        };
        if b0 & 0x80 != 0 {
            return Err(VidresError::InvalidData(format!(
                "HEVC: forbidden_zero_bit 非法, offset={}",
                range.start
            )));
        }

        Ok(Self {
            nal_type: HevcNalUnitType::from_header(b0),
            layer_id: ((b0 & 1) << 5) | (b1 >> 3),
            temporal_id_plus1: b1 & 0x07,
            range,
            data,
        })
    }

    /// 获取移除防竞争字节后的数据 (保留 2 字节 NAL 头)
    pub fn rbsp_with_header(&self) -> Vec<u8> {
        remove_emulation_prevention(self.data)
    }
}

/// 从 Annex B 格式分割 HEVC NAL 单元
///
/// 跳过头部不完整或 forbidden_zero_bit 非法的单元.
pub fn split_hevc_annex_b(data: &[u8]) -> Vec<HevcNalUnit<'_>> {
    let mut nalus = Vec::new();
    for range in find_nal_ranges(data) {
        match HevcNalUnit::parse(range.payload(data), range) {
            Ok(nalu) => nalus.push(nalu),
            Err(err) => log::debug!("跳过 HEVC NAL 单元: {}", err),
        }
    }
    nalus
}

/// 查找第一个 SPS (nal_unit_type == 33)
///
/// 只检查类型字段, 不校验头部其他位.
pub fn find_first_hevc_sps(data: &[u8]) -> Option<NalRange> {
    find_nal_ranges(data).into_iter().find(|range| {
        range
            .payload(data)
            .first()
            .is_some_and(|&b0| HevcNalUnitType::from_header(b0) == HevcNalUnitType::Sps)
    })
}
