//! # vidres
//!
//! 从 H.264 / HEVC Annex B 裸流中提取图像分辨率.
//!
//! 只解析到 SPS 中的尺寸字段为止, 不做解码; 用于在创建解码器之前
//! 确定输出尺寸, 或批量检查码流文件.
//!
//! # 快速开始
//!
//! ```rust
//! use vidres::codec::{CodecId, ExtractOptions, extract_resolution};
//!
//! let stream = [
//!     0x00, 0x00, 0x00, 0x01, 0x67, 0x42, 0xC0, 0x1E, 0xF4, 0x0B, 0x04, 0xB2,
//! ];
//! match extract_resolution(CodecId::H264, &stream, &ExtractOptions::default()) {
//!     Ok(Some(res)) => println!("分辨率: {res}"),
//!     Ok(None) => println!("码流中没有 SPS"),
//!     Err(e) => println!("SPS 损坏: {e}"),
//! }
//! ```
//!
//! # Crate 结构
//!
//! | Crate | 功能 |
//! |-------|------|
//! | `vidres-core` | 错误类型, 位读写器 |
//! | `vidres-codec` | Annex B 分割, SPS 解析, 分辨率提取 |
//! | `vidres-probe` | 命令行探测工具 |

/// 核心类型与工具
pub use vidres_core as core;

/// 码流解析
pub use vidres_codec as codec;

pub use vidres_codec::{
    CodecId, DecoderConfig, ExtractOptions, Resolution, TruncationPolicy, extract_resolution,
};
pub use vidres_core::{VidresError, VidresResult};

/// 获取 vidres 版本号
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
