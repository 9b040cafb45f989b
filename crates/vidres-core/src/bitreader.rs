//! 比特流读取器.
//!
//! 提供从字节缓冲区中按位读取数据的能力, 是 H.264 / HEVC 参数集解析的基础设施.
//!
//! 按大端位序读取 (MSB first), 这是视频编解码器语法中使用的位序.
//!
//! # Exp-Golomb 编码
//!
//! 参数集中大量使用 Exp-Golomb 可变长编码:
//! - `ue(v)`: 无符号 Exp-Golomb
//! - `se(v)`: 有符号 Exp-Golomb
//!
//! 码流可能被截断, 因此 [`BitReader::read_ue`] 与 [`BitReader::read_se`]
//! 在流末尾不会失败, 而是返回已知部分的值并通过 [`ExpGolomb::truncated`] 标记截断.

use crate::{VidresError, VidresResult};

/// Exp-Golomb 解码结果
///
/// `truncated == true` 表示码流在码字中途结束, `value` 只是尽力而为的值.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpGolomb<T> {
    /// 解码值
    pub value: T,
    /// 码字是否被截断
    pub truncated: bool,
}

impl<T> ExpGolomb<T> {
    /// 完整解码的值
    pub fn complete(value: T) -> Self {
        Self {
            value,
            truncated: false,
        }
    }

    /// 截断时的尽力值
    pub fn partial(value: T) -> Self {
        Self {
            value,
            truncated: true,
        }
    }

    /// 转换解码值, 保留截断标记
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ExpGolomb<U> {
        ExpGolomb {
            value: f(self.value),
            truncated: self.truncated,
        }
    }
}

/// 比特流读取器
///
/// 从字节缓冲区中按位读取数据, 使用大端位序 (MSB first).
/// 游标只会前进, 读取失败时已消耗的位不会回退.
///
/// # 示例
/// ```
/// use vidres_core::bitreader::BitReader;
///
/// let data = [0b10110001, 0b01010101];
/// let mut br = BitReader::new(&data);
/// assert_eq!(br.read_bits(4).unwrap(), 0b1011);
/// assert_eq!(br.read_bits(4).unwrap(), 0b0001);
/// assert_eq!(br.read_bits(8).unwrap(), 0b01010101);
/// assert!(!br.has_more());
/// ```
pub struct BitReader<'a> {
    /// 源数据
    data: &'a [u8],
    /// 当前字节索引
    byte_pos: usize,
    /// 当前字节中的位位置 (0-7, 0 表示最高位)
    bit_pos: u8,
}

impl<'a> BitReader<'a> {
    /// 创建新的比特流读取器
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            byte_pos: 0,
            bit_pos: 0,
        }
    }

    /// 获取已读取的总位数
    pub fn bits_read(&self) -> usize {
        self.byte_pos * 8 + self.bit_pos as usize
    }

    /// 获取剩余可读位数
    pub fn bits_left(&self) -> usize {
        if self.byte_pos >= self.data.len() {
            return 0;
        }
        (self.data.len() - self.byte_pos) * 8 - self.bit_pos as usize
    }

    /// 是否还有未读取的字节 (当前字节未读完也算)
    pub fn has_more(&self) -> bool {
        self.byte_pos < self.data.len()
    }

    /// 是否已到达末尾
    pub fn is_eof(&self) -> bool {
        !self.has_more()
    }

    /// 读取 1 个位
    pub fn read_bit(&mut self) -> VidresResult<u32> {
        if self.byte_pos >= self.data.len() {
            return Err(VidresError::Eof);
        }

        let bit = (self.data[self.byte_pos] >> (7 - self.bit_pos)) & 1;
        self.bit_pos += 1;
        if self.bit_pos >= 8 {
            self.bit_pos = 0;
            self.byte_pos += 1;
        }

        Ok(u32::from(bit))
    }

    /// 读取 1 个位并转换为标志
    pub fn read_flag(&mut self) -> VidresResult<bool> {
        Ok(self.read_bit()? == 1)
    }

    /// 读取 N 个位 (最多 32 位)
    ///
    /// 按大端位序读取, 返回值的低 N 位有效.
    /// 剩余位数不足时消耗到末尾并返回 [`VidresError::Eof`].
    pub fn read_bits(&mut self, n: u32) -> VidresResult<u32> {
        if n == 0 {
            return Ok(0);
        }
        if n > 32 {
            return Err(VidresError::InvalidArgument(format!(
                "read_bits: n={} 超过 32 位",
                n,
            )));
        }
        if (n as usize) > self.bits_left() {
            self.seek_to_end();
            return Err(VidresError::Eof);
        }

        let mut result: u32 = 0;
        let mut remaining = n;

        while remaining > 0 {
            let available = 8 - self.bit_pos as u32;
            let to_read = remaining.min(available);

            // 从当前字节中提取位
            let shift = available - to_read;
            let mask = ((1u32 << to_read) - 1) as u8;
            let bits = (self.data[self.byte_pos] >> shift) & mask;

            result = (result << to_read) | u32::from(bits);

            self.bit_pos += to_read as u8;
            if self.bit_pos >= 8 {
                self.bit_pos = 0;
                self.byte_pos += 1;
            }
            remaining -= to_read;
        }

        Ok(result)
    }

    /// 窥视 N 个位 (不移动位置)
    pub fn peek_bits(&mut self, n: u32) -> VidresResult<u32> {
        let saved_byte = self.byte_pos;
        let saved_bit = self.bit_pos;
        let result = self.read_bits(n);
        self.byte_pos = saved_byte;
        self.bit_pos = saved_bit;
        result
    }

    /// 跳过 N 个位
    ///
    /// 剩余位数不足时消耗到末尾并返回 [`VidresError::Eof`].
    pub fn skip_bits(&mut self, n: u32) -> VidresResult<()> {
        if (n as usize) > self.bits_left() {
            self.seek_to_end();
            return Err(VidresError::Eof);
        }

        let total_bits = self.bit_pos as usize + n as usize;
        self.byte_pos += total_bits / 8;
        self.bit_pos = (total_bits % 8) as u8;

        Ok(())
    }

    /// 对齐到下一个字节边界
    ///
    /// 如果当前已在字节边界, 则不做任何事.
    pub fn align_to_byte(&mut self) {
        if self.bit_pos > 0 {
            self.bit_pos = 0;
            self.byte_pos += 1;
        }
    }

    /// 获取当前字节位置
    pub fn byte_position(&self) -> usize {
        self.byte_pos
    }

    /// 读取无符号 Exp-Golomb 编码值 ue(v)
    ///
    /// 前导零计数遇到流末尾时视为结束; 后缀位不足时返回 `(1 << zeros) - 1`.
    /// 两种情况都会设置截断标记. 唯一的错误是完整码字的前导零超过 31 个.
    pub fn read_ue(&mut self) -> VidresResult<ExpGolomb<u32>> {
        let mut leading_zeros = 0u32;
        loop {
            match self.read_bit() {
                Ok(1) => break,
                Ok(_) => leading_zeros += 1,
                Err(VidresError::Eof) => {
                    log::trace!("ue(v) 前导零计数遇到流末尾, zeros={}", leading_zeros);
                    return Ok(ExpGolomb::partial(saturating_code_base(leading_zeros)));
                }
                Err(err) => return Err(err),
            }
        }

        if leading_zeros == 0 {
            return Ok(ExpGolomb::complete(0));
        }
        if leading_zeros > 31 {
            return Err(VidresError::InvalidData(format!(
                "Exp-Golomb 前导零过多, zeros={}",
                leading_zeros
            )));
        }

        let base = (1u32 << leading_zeros) - 1;
        match self.read_bits(leading_zeros) {
            Ok(suffix) => Ok(ExpGolomb::complete(base + suffix)),
            Err(VidresError::Eof) => {
                log::trace!("ue(v) 后缀遇到流末尾, zeros={}", leading_zeros);
                Ok(ExpGolomb::partial(base))
            }
            Err(err) => Err(err),
        }
    }

    /// 读取有符号 Exp-Golomb 编码值 se(v)
    ///
    /// 映射: 0→0, 1→1, 2→-1, 3→2, 4→-2, ... 超出 i32 范围时饱和.
    pub fn read_se(&mut self) -> VidresResult<ExpGolomb<i32>> {
        let code = self.read_ue()?;
        Ok(code.map(|code| {
            let magnitude = i32::try_from(u64::from(code).div_ceil(2)).unwrap_or(i32::MAX);
            if code & 1 == 0 { -magnitude } else { magnitude }
        }))
    }

    fn seek_to_end(&mut self) {
        self.byte_pos = self.data.len();
        self.bit_pos = 0;
    }
}

/// `(1 << zeros) - 1`, 超出 u32 时饱和
fn saturating_code_base(zeros: u32) -> u32 {
    if zeros >= 32 {
        u32::MAX
    } else {
        (1u32 << zeros) - 1
    }
}
