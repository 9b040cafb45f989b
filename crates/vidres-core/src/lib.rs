//! # vidres-core
//!
//! vidres 核心库, 提供比特流读写和统一错误处理.
//!
//! 上层的 NAL 分割与参数集解析 (`vidres-codec`) 都建立在本 crate 的
//! [`BitReader`](bitreader::BitReader) 之上.

pub mod bitreader;
pub mod bitwriter;
pub mod error;

// 重导出常用类型
pub use bitreader::{BitReader, ExpGolomb};
pub use bitwriter::BitWriter;
pub use error::{VidresError, VidresResult};
