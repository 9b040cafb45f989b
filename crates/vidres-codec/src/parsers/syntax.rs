//! 参数集语法元素读取.
//!
//! 在 [`BitReader`] 之上按 [`TruncationPolicy`] 处理截断:
//! 严格模式下任何截断都视为参数集损坏, 容错模式下缺失的位按 0 处理,
//! 并记录截断标记, 由调用方决定如何使用尽力而为的结果.

use vidres_core::{BitReader, ExpGolomb, VidresError, VidresResult};

/// 截断处理策略
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum TruncationPolicy {
    /// 截断即失败 (默认)
    #[default]
    Strict,
    /// 缺失位按 0 处理, 结果带截断标记
    Tolerant,
}

impl TruncationPolicy {
    /// 是否为容错模式
    pub fn is_tolerant(&self) -> bool {
        matches!(self, Self::Tolerant)
    }
}

/// 容错模式下截断的 ue(v) 取值上限, 保证由它推导的尺寸不会溢出 u32
const MAX_TRUNCATED_UE: u32 = 0xFFFF;

/// 带截断策略的语法元素读取器
pub(crate) struct SyntaxReader<'a> {
    br: BitReader<'a>,
    policy: TruncationPolicy,
    /// 错误信息前缀, 如 "H.264"
    codec: &'static str,
    /// 首个截断发生的字段
    truncated_at: Option<&'static str>,
}

impl<'a> SyntaxReader<'a> {
    pub(crate) fn new(data: &'a [u8], policy: TruncationPolicy, codec: &'static str) -> Self {
        Self {
            br: BitReader::new(data),
            policy,
            codec,
            truncated_at: None,
        }
    }

    /// 是否发生过截断
    pub(crate) fn truncated(&self) -> bool {
        self.truncated_at.is_some()
    }

    /// 已读取的位数
    pub(crate) fn bits_read(&self) -> usize {
        self.br.bits_read()
    }

    /// 读取 u(n)
    pub(crate) fn u(&mut self, n: u32, field: &'static str) -> VidresResult<u32> {
        let left = u32::try_from(self.br.bits_left()).unwrap_or(u32::MAX);
        if n <= left {
            return self.br.read_bits(n);
        }

        self.on_truncated(field)?;
        // 读出剩余的位, 缺失部分补 0
        let partial = self.br.read_bits(left)?;
        Ok(partial.checked_shl(n - left).unwrap_or(0))
    }

    /// 读取 u(1) 标志
    pub(crate) fn flag(&mut self, field: &'static str) -> VidresResult<bool> {
        Ok(self.u(1, field)? == 1)
    }

    /// 跳过 n 个保留位或不关心的位
    pub(crate) fn skip(&mut self, n: u32, field: &'static str) -> VidresResult<()> {
        match self.br.skip_bits(n) {
            Ok(()) => Ok(()),
            Err(VidresError::Eof) => self.on_truncated(field),
            Err(err) => Err(err),
        }
    }

    /// 读取 ue(v)
    ///
    /// 截断的码字在容错模式下限制为 [`MAX_TRUNCATED_UE`], 前导零计数遇到
    /// 流末尾时读取器给出的饱和值不会进入后续运算.
    pub(crate) fn ue(&mut self, field: &'static str) -> VidresResult<u32> {
        let code = self.br.read_ue()?;
        let truncated = code.truncated;
        let value = self.accept(code, field)?;
        Ok(if truncated {
            value.min(MAX_TRUNCATED_UE)
        } else {
            value
        })
    }

    /// 读取 se(v)
    pub(crate) fn se(&mut self, field: &'static str) -> VidresResult<i32> {
        let code = self.br.read_se()?;
        self.accept(code, field)
    }

    fn accept<T>(&mut self, code: ExpGolomb<T>, field: &'static str) -> VidresResult<T> {
        if code.truncated {
            self.on_truncated(field)?;
        }
        Ok(code.value)
    }

    fn on_truncated(&mut self, field: &'static str) -> VidresResult<()> {
        if !self.policy.is_tolerant() {
            return Err(VidresError::InvalidData(format!(
                "{}: SPS 在 {} 处截断, bits_read={}",
                self.codec,
                field,
                self.br.bits_read()
            )));
        }
        if self.truncated_at.is_none() {
            log::warn!(
                "{}: SPS 在 {} 处截断, 按 0 继续解析",
                self.codec,
                field
            );
            self.truncated_at = Some(field);
        }
        Ok(())
    }
}
