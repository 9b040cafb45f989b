//! 探测配置.
//!
//! 配置来源优先级: 命令行参数 > JSON 配置文件 > 默认值.
//! 配置文件中缺省的字段取默认值.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use vidres_codec::{CodecId, ExtractOptions, Resolution, TruncationPolicy};

/// 未找到 SPS 时的默认回退分辨率
pub const DEFAULT_FALLBACK: &str = "352x288";

/// 编码选择
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CodecChoice {
    /// 根据内容和扩展名自动识别
    #[default]
    Auto,
    /// 强制按 H.264 解析
    H264,
    /// 强制按 HEVC 解析
    Hevc,
}

impl CodecChoice {
    /// 强制指定的编码, `Auto` 返回 `None`
    pub fn codec_id(self) -> Option<CodecId> {
        match self {
            Self::Auto => None,
            Self::H264 => Some(CodecId::H264),
            Self::Hevc => Some(CodecId::H265),
        }
    }
}

/// 探测配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// 编码选择
    pub codec: CodecChoice,
    /// 输出 JSON
    pub json: bool,
    /// HEVC 应用 conformance window 裁剪
    pub crop_hevc: bool,
    /// 容忍截断的 SPS
    pub tolerant: bool,
    /// 回退分辨率 (`WxH`), `null` 表示不回退
    pub fallback: Option<String>,
    /// 日志文件目录, 缺省时只输出到 console
    pub log_dir: Option<PathBuf>,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            codec: CodecChoice::Auto,
            json: false,
            crop_hevc: false,
            tolerant: false,
            fallback: Some(DEFAULT_FALLBACK.to_string()),
            log_dir: None,
        }
    }
}

impl ProbeConfig {
    /// 从 JSON 文件加载
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("读取配置文件失败, path={}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("解析配置文件失败, path={}", path.display()))
    }

    /// 转换为提取选项
    pub fn extract_options(&self) -> ExtractOptions {
        ExtractOptions {
            truncation: if self.tolerant {
                TruncationPolicy::Tolerant
            } else {
                TruncationPolicy::Strict
            },
            apply_conformance_window: self.crop_hevc,
        }
    }

    /// 解析回退分辨率
    pub fn fallback_resolution(&self) -> Result<Option<Resolution>> {
        self.fallback
            .as_deref()
            .map(|text| {
                text.parse::<Resolution>()
                    .with_context(|| format!("回退分辨率无效: {text}"))
            })
            .transpose()
    }
}
