//! H.265/HEVC 码流解析器.
//!
//! 提供对 H.265 HEVC Annex B 码流的解析能力:
//! - NAL 单元分割与类型识别 (2 字节 NAL 头)
//! - SPS (Sequence Parameter Set) 解析
//!
//! # HEVC NAL 头部 (2 字节)
//! ```text
//! ┌────────────────────────────────────────────┐
//! │ forbidden(1) | type(6) | layer_id(6) | tid(3) │
//! └────────────────────────────────────────────┘
//! ```

pub mod nal;
pub mod sps;

pub use nal::{HevcNalUnit, HevcNalUnitType, find_first_hevc_sps, split_hevc_annex_b};
pub use sps::{HevcSps, ProfileTierLevel, parse_hevc_sps};
