//! H.264/AVC 码流解析器.
//!
//! 提供对 H.264 Annex B 码流的解析能力:
//! - NAL 单元分割与类型识别
//! - SPS (Sequence Parameter Set) 解析

pub mod nal;
pub mod sps;

pub use nal::{NalUnit, NalUnitType, find_first_sps, split_annex_b};
pub use sps::{ConstraintFlags, Sps, parse_sps};
