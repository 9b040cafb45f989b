//! # vidres-codec
//!
//! vidres 码流解析库, 从 H.264 / HEVC Annex B 裸流中提取图像分辨率.
//!
//! 处理流程: 起始码分割 → 定位第一个 SPS → 移除防竞争字节 → 按语法逐字段解析.
//!
//! ## 使用示例
//!
//! ```rust
//! use vidres_codec::{CodecId, ExtractOptions, Resolution, extract_resolution};
//!
//! // Baseline profile, 22x18 宏块
//! let stream = [
//!     0x00, 0x00, 0x00, 0x01, 0x67, 0x42, 0xC0, 0x1E, 0xF4, 0x0B, 0x04, 0xB2,
//! ];
//! let res = extract_resolution(CodecId::H264, &stream, &ExtractOptions::default()).unwrap();
//! assert_eq!(res, Some(Resolution::new(352, 288)));
//! ```

pub mod codec_id;
pub mod parameter_sets;
pub mod parsers;
pub mod probe;
pub mod resolution;

// 重导出常用类型
pub use codec_id::CodecId;
pub use parameter_sets::{DecoderConfig, ParameterSets, collect_parameter_sets};
pub use parsers::TruncationPolicy;
pub use probe::{ProbeResult, ProbeScore, detect_codec, probe_codec};
pub use resolution::{
    ExtractOptions, Resolution, SpsSummary, extract_h264_resolution, extract_hevc_resolution,
    extract_resolution, probe_sps,
};
