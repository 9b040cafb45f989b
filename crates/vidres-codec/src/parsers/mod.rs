//! 码流解析器.
//!
//! - [`annexb`]: 起始码分割与防竞争字节移除 (H.264/HEVC 共用)
//! - [`h264`]: H.264 NAL 与 SPS
//! - [`h265`]: HEVC NAL 与 SPS

pub mod annexb;
pub mod h264;
pub mod h265;
pub(crate) mod syntax;

pub use annexb::{
    NalRange, find_nal_ranges, remove_emulation_prevention, split_annex_b_bytes,
    split_annex_b_inclusive,
};
pub use syntax::TruncationPolicy;
