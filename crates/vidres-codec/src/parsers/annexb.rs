//! Annex B 字节流分割与防竞争字节移除.
//!
//! H.264 与 HEVC 共用同一套起始码语法:
//! - 3 字节起始码: `00 00 01`
//! - 4 字节起始码: `00 00 00 01`
//!
//! 两种起始码可以在同一码流中混用. 本模块只负责定位 NAL 边界,
//! NAL 头部的解释由各编解码器的 `nal` 模块完成.

use bytes::Bytes;

/// 一个 NAL 单元在源缓冲区中的位置
///
/// `start` 指向起始码首字节, `end` 是下一个起始码的位置或缓冲区长度.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NalRange {
    /// 起始码位置
    pub start: usize,
    /// 结束位置 (不含)
    pub end: usize,
    /// 起始码长度 (3 或 4), 即 NAL 头部相对 `start` 的偏移
    pub header_offset: usize,
}

impl NalRange {
    /// NAL 头部在源缓冲区中的位置
    pub fn header_pos(&self) -> usize {
        self.start + self.header_offset
    }

    /// 含起始码的总长度
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// 范围是否为空 (与 [`NalRange::len`] 一致, 起始码也计入长度)
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 起始码之后是否还有 NAL 数据
    pub fn has_payload(&self) -> bool {
        self.header_pos() < self.end
    }

    /// 从 NAL 头部到 `end` 的数据 (不含起始码)
    pub fn payload<'a>(&self, data: &'a [u8]) -> &'a [u8] {
        &data[self.header_pos()..self.end]
    }

    /// 含起始码的完整数据
    pub fn inclusive<'a>(&self, data: &'a [u8]) -> &'a [u8] {
        &data[self.start..self.end]
    }
}

/// 判断 `pos` 处是否为起始码, 返回起始码长度
///
/// 先匹配 4 字节形式, 再匹配 3 字节形式.
pub fn start_code_len(data: &[u8], pos: usize) -> Option<usize> {
    match data.get(pos..)? {
        [0x00, 0x00, 0x00, 0x01, ..] => Some(4),
        [0x00, 0x00, 0x01, ..] => Some(3),
        _ => None,
    }
}

/// 查找所有 NAL 单元的位置
///
/// 逐字节扫描, 命中起始码后从起始码之后继续, 同一起始码不会被重复计数.
/// 没有起始码时返回空列表, 最后一个单元延伸到缓冲区末尾.
pub fn find_nal_ranges(data: &[u8]) -> Vec<NalRange> {
    let mut starts: Vec<(usize, usize)> = Vec::new();
    let mut i = 0;

    while i + 2 < data.len() {
        if let Some(len) = start_code_len(data, i) {
            starts.push((i, len));
            i += len;
            continue;
        }
        i += 1;
    }

    let mut ranges = Vec::with_capacity(starts.len());
    for (idx, &(start, header_offset)) in starts.iter().enumerate() {
        let end = starts.get(idx + 1).map_or(data.len(), |&(next, _)| next);
        ranges.push(NalRange {
            start,
            end,
            header_offset,
        });
    }

    log::trace!("Annex B: 找到 {} 个 NAL 单元", ranges.len());
    ranges
}

/// 按起始码分割, 每个切片都包含起始码和 NAL 头部
pub fn split_annex_b_inclusive(data: &[u8]) -> Vec<&[u8]> {
    find_nal_ranges(data)
        .iter()
        .map(|range| range.inclusive(data))
        .collect()
}

/// 与 [`split_annex_b_inclusive`] 相同, 但返回共享底层缓冲区的 [`Bytes`]
pub fn split_annex_b_bytes(data: &Bytes) -> Vec<Bytes> {
    find_nal_ranges(data)
        .iter()
        .map(|range| data.slice(range.start..range.end))
        .collect()
}

/// 移除防竞争字节 (`00 00 03` → `00 00`), 得到 RBSP
///
/// 从左到右贪心匹配, 每次命中消耗全部 3 个输入字节,
/// 扫描从 `03` 之后继续. 不含 `00 00 03` 的数据原样返回.
pub fn remove_emulation_prevention(data: &[u8]) -> Vec<u8> {
    let mut rbsp = Vec::with_capacity(data.len());
    let mut i = 0;

    while i < data.len() {
        if i + 2 < data.len() && data[i] == 0x00 && data[i + 1] == 0x00 && data[i + 2] == 0x03 {
            rbsp.push(0x00);
            rbsp.push(0x00);
            i += 3;
        } else {
            rbsp.push(data[i]);
            i += 1;
        }
    }

    rbsp
}
