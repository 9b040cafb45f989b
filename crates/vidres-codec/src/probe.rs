//! 编码格式探测.
//!
//! 通过分析码流中的参数集 NAL 头部和文件扩展名, 识别 H.264 或 HEVC.

use crate::codec_id::CodecId;
use crate::parsers::annexb::find_nal_ranges;
use crate::parsers::h264::NalUnitType;
use crate::parsers::h265::HevcNalUnitType;

/// 探测置信度
///
/// 数值越高, 表示对格式判断越有信心.
pub type ProbeScore = u32;

/// 最低探测分数 (仅根据扩展名)
pub const SCORE_EXTENSION: ProbeScore = 50;

/// 中等探测分数 (只找到部分参数集)
pub const SCORE_PARTIAL: ProbeScore = 75;

/// 最高探测分数 (找到 SPS 且头部语法一致)
pub const SCORE_MAX: ProbeScore = 100;

/// 探测结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeResult {
    /// 识别出的编码
    pub codec_id: CodecId,
    /// 置信度分数
    pub score: ProbeScore,
}

/// 参数集命中统计
#[derive(Debug, Default, Clone, Copy)]
struct ParameterSetHits {
    /// 命中的参数集 NAL 数量
    count: usize,
    /// 是否找到 SPS
    has_sps: bool,
}

impl ParameterSetHits {
    fn score(&self) -> Option<ProbeScore> {
        match (self.count, self.has_sps) {
            (0, _) => None,
            (_, true) => Some(SCORE_MAX),
            (_, false) => Some(SCORE_PARTIAL),
        }
    }
}

/// 根据码流内容探测编码
///
/// 统计两种语法下的参数集 NAL 头部, 命中多者胜出; 数量相同时无法判断.
pub fn detect_codec(data: &[u8]) -> Option<ProbeResult> {
    let mut avc = ParameterSetHits::default();
    let mut hevc = ParameterSetHits::default();

    for range in find_nal_ranges(data) {
        let payload = range.payload(data);
        let Some(&b0) = payload.first() else {
            continue;
        };
        if b0 & 0x80 != 0 {
            continue;
        }

        let avc_type = NalUnitType::from_header(b0);
        if avc_type.is_parameter_set() {
            avc.count += 1;
            avc.has_sps |= avc_type == NalUnitType::Sps;
        }

        // HEVC 参数集: nuh_layer_id == 0 且 nuh_temporal_id_plus1 != 0
        if let Some(&b1) = payload.get(1) {
            let hevc_type = HevcNalUnitType::from_header(b0);
            let layer_id = ((b0 & 1) << 5) | (b1 >> 3);
            if hevc_type.is_parameter_set() && layer_id == 0 && b1 & 0x07 != 0 {
                hevc.count += 1;
                hevc.has_sps |= hevc_type == HevcNalUnitType::Sps;
            }
        }
    }

    log::debug!(
        "编码探测: H.264 参数集={}, HEVC 参数集={}",
        avc.count,
        hevc.count
    );

    let (codec_id, hits) = match avc.count.cmp(&hevc.count) {
        std::cmp::Ordering::Greater => (CodecId::H264, avc),
        std::cmp::Ordering::Less => (CodecId::H265, hevc),
        std::cmp::Ordering::Equal => return None,
    };
    hits.score().map(|score| ProbeResult { codec_id, score })
}

/// 综合码流内容与文件名探测编码
///
/// 内容探测成功时优先采用; 否则退回到扩展名推断.
pub fn probe_codec(data: &[u8], filename: Option<&str>) -> Option<ProbeResult> {
    let by_extension = filename.and_then(CodecId::from_extension);

    match (detect_codec(data), by_extension) {
        (Some(result), Some(ext)) if result.codec_id != ext => {
            log::warn!(
                "扩展名提示 {} 与码流内容 {} 不一致, 以内容为准",
                ext,
                result.codec_id
            );
            Some(result)
        }
        (Some(result), _) => Some(result),
        (None, Some(codec_id)) => Some(ProbeResult {
            codec_id,
            score: SCORE_EXTENSION,
        }),
        (None, None) => None,
    }
}
