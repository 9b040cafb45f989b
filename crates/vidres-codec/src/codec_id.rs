//! 编解码器标识符.
//!
//! 标识 Annex B 码流所使用的视频编码, 决定 NAL 头部与 SPS 的解析方式.

use std::fmt;
use std::path::Path;

/// 编解码器标识符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum CodecId {
    /// H.264 / AVC / MPEG-4 Part 10
    H264,
    /// H.265 / HEVC / MPEG-H Part 2
    H265,
}

impl CodecId {
    /// 获取编解码器的短名称, 与解码器注册名一致
    pub const fn name(&self) -> &'static str {
        match self {
            Self::H264 => "h264",
            Self::H265 => "hevc",
        }
    }

    /// 获取编解码器的完整名称
    pub const fn long_name(&self) -> &'static str {
        match self {
            Self::H264 => "H.264 / AVC / MPEG-4 AVC / MPEG-4 part 10",
            Self::H265 => "H.265 / HEVC (High Efficiency Video Coding)",
        }
    }

    /// 获取 MIME 类型
    pub const fn mime_type(&self) -> &'static str {
        match self {
            Self::H264 => "video/avc",
            Self::H265 => "video/hevc",
        }
    }

    /// 解码器初始化所需的参数集类型名称
    pub const fn required_parameter_sets(&self) -> &'static [&'static str] {
        match self {
            Self::H264 => &["SPS", "PPS"],
            Self::H265 => &["VPS", "SPS", "PPS"],
        }
    }

    /// 从名称解析 (不区分大小写)
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "h264" | "h.264" | "avc" => Some(Self::H264),
            "hevc" | "h265" | "h.265" => Some(Self::H265),
            _ => None,
        }
    }

    /// 根据文件扩展名推断
    ///
    /// `.bit` 为 HEVC 一致性测试码流的惯用扩展名.
    pub fn from_extension(path: impl AsRef<Path>) -> Option<Self> {
        let ext = path.as_ref().extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "h264" | "264" | "avc" | "jsv" => Some(Self::H264),
            "h265" | "265" | "hevc" | "bit" => Some(Self::H265),
            _ => None,
        }
    }
}

impl fmt::Display for CodecId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codec_name() {
        assert_eq!(CodecId::H264.name(), "h264");
        assert_eq!(CodecId::H265.name(), "hevc");
        assert_eq!(CodecId::H265.to_string(), "hevc");
        assert_eq!(CodecId::H264.mime_type(), "video/avc");
    }

    #[test]
    fn test_from_name() {
        assert_eq!(CodecId::from_name("H264"), Some(CodecId::H264));
        assert_eq!(CodecId::from_name("avc"), Some(CodecId::H264));
        assert_eq!(CodecId::from_name("HEVC"), Some(CodecId::H265));
        assert_eq!(CodecId::from_name("h265"), Some(CodecId::H265));
        assert_eq!(CodecId::from_name("vp9"), None);
    }

    #[test]
    fn test_from_extension() {
        assert_eq!(CodecId::from_extension("clip.h264"), Some(CodecId::H264));
        assert_eq!(CodecId::from_extension("conf/BA1_Sony_D.jsv"), Some(CodecId::H264));
        assert_eq!(CodecId::from_extension("AMP_A_Samsung.BIT"), Some(CodecId::H265));
        assert_eq!(CodecId::from_extension("x.265"), Some(CodecId::H265));
        assert_eq!(CodecId::from_extension("movie.mp4"), None);
        assert_eq!(CodecId::from_extension("noext"), None);
    }

    #[test]
    fn test_required_parameter_sets() {
        assert_eq!(CodecId::H264.required_parameter_sets(), &["SPS", "PPS"]);
        assert_eq!(CodecId::H265.required_parameter_sets().len(), 3);
    }
}
