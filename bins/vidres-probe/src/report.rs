//! 探测结果输出 (文本 / JSON).

use std::io::{self, Write};

use serde::Serialize;

use crate::inspect::{ResolutionOrigin, StreamReport, codec_of};

/// JSON 顶层结构
#[derive(Serialize)]
struct ProbeOutput<'a> {
    streams: &'a [StreamReport],
}

/// JSON 输出
pub fn write_json(out: &mut impl Write, reports: &[StreamReport]) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *out, &ProbeOutput { streams: reports })?;
    writeln!(out)
}

/// 文本输出
pub fn write_text(out: &mut impl Write, reports: &[StreamReport]) -> io::Result<()> {
    for (index, report) in reports.iter().enumerate() {
        writeln!(out, "[STREAM #{index}]")?;
        writeln!(out, "  输入         : {}", report.input)?;
        writeln!(out, "  大小         : {} 字节", report.size)?;
        if let Some(codec_id) = codec_of(report) {
            writeln!(out, "  编解码器     : {} ({})", codec_id, codec_id.long_name())?;
        }
        if let Some(score) = report.probe_score {
            writeln!(out, "  探测置信度   : {score}")?;
        }
        if let Some(resolution) = report.resolution() {
            let origin = match report.resolution_origin {
                Some(ResolutionOrigin::Fallback) => " (回退值)",
                _ => "",
            };
            writeln!(out, "  分辨率       : {resolution}{origin}")?;
        }
        if let Some(profile) = report.profile_idc {
            writeln!(out, "  profile_idc  : {profile}")?;
        }
        if let Some(level) = report.level_idc {
            writeln!(out, "  level_idc    : {level}")?;
        }
        if let Some(chroma) = report.chroma_format_idc {
            writeln!(out, "  色度格式     : {}", chroma_format_name(chroma))?;
        }
        if let Some(offset) = report.sps_offset {
            writeln!(out, "  SPS 偏移     : {offset}")?;
        }
        if report.truncated {
            writeln!(out, "  SPS 截断     : 是 (尽力而为)")?;
        }
        if let Some(sets) = &report.parameter_sets {
            if !sets.missing.is_empty() {
                writeln!(out, "  缺少参数集   : {}", sets.missing.join("/"))?;
            }
        }
        if let Some(error) = &report.error {
            writeln!(out, "  错误         : {error}")?;
        }
        writeln!(out, "[/STREAM]")?;
        writeln!(out)?;
    }
    Ok(())
}

fn chroma_format_name(chroma_format_idc: u32) -> &'static str {
    match chroma_format_idc {
        0 => "4:0:0",
        1 => "4:2:0",
        2 => "4:2:2",
        3 => "4:4:4",
        _ => "未知",
    }
}
