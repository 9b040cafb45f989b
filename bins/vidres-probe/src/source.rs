//! 输入源抽象.
//!
//! 解析库只接收内存中的字节; 文件和标准输入的读取集中在这里.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::PathBuf;

use anyhow::{Context, Result};
use bytes::{Buf, Bytes};

/// 标准输入的参数写法
pub const STDIN_ARG: &str = "-";

/// 输入源
pub trait InputSource: Send + Sync {
    /// 显示名称, 文件输入时用于扩展名推断
    fn name(&self) -> &str;

    /// 字节长度
    fn len(&self) -> Result<u64>;

    /// 是否为空
    fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// 打开读取流
    fn open(&self) -> Result<Box<dyn Read + Send + '_>>;

    /// 读取全部内容
    fn read_all(&self) -> Result<Bytes> {
        let capacity = usize::try_from(self.len()?).unwrap_or(0);
        let mut buf = Vec::with_capacity(capacity);
        self.open()?
            .read_to_end(&mut buf)
            .with_context(|| format!("读取输入失败: {}", self.name()))?;
        Ok(Bytes::from(buf))
    }
}

/// 本地文件
#[derive(Debug, Clone)]
pub struct LocalFile {
    path: PathBuf,
    name: String,
}

impl LocalFile {
    /// 创建本地文件输入源 (不检查文件是否存在)
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path.display().to_string();
        Self { path, name }
    }
}

impl InputSource for LocalFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn len(&self) -> Result<u64> {
        let meta = std::fs::metadata(&self.path)
            .with_context(|| format!("无法访问文件 '{}'", self.name))?;
        Ok(meta.len())
    }

    fn open(&self) -> Result<Box<dyn Read + Send + '_>> {
        let file =
            File::open(&self.path).with_context(|| format!("无法打开文件 '{}'", self.name))?;
        Ok(Box::new(BufReader::new(file)))
    }
}

/// 内存数据
#[derive(Debug, Clone)]
pub struct MemorySource {
    name: String,
    data: Bytes,
}

impl MemorySource {
    /// 用已有数据创建
    pub fn new(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }

    /// 读取整个流到内存
    pub fn from_reader(name: impl Into<String>, mut reader: impl Read) -> Result<Self> {
        let name = name.into();
        let mut buf = Vec::new();
        reader
            .read_to_end(&mut buf)
            .with_context(|| format!("读取输入失败: {name}"))?;
        Ok(Self::new(name, buf))
    }
}

impl InputSource for MemorySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn len(&self) -> Result<u64> {
        Ok(self.data.len() as u64)
    }

    fn open(&self) -> Result<Box<dyn Read + Send + '_>> {
        Ok(Box::new(self.data.clone().reader()))
    }

    fn read_all(&self) -> Result<Bytes> {
        Ok(self.data.clone())
    }
}

/// 按命令行参数创建输入源
///
/// `-` 表示标准输入, 立即读入内存; 其它参数视为文件路径.
pub fn open_source(arg: &str) -> Result<Box<dyn InputSource>> {
    if arg == STDIN_ARG {
        let source = MemorySource::from_reader("<stdin>", io::stdin().lock())?;
        tracing::debug!("标准输入读取 {} 字节", source.data.len());
        return Ok(Box::new(source));
    }
    Ok(Box::new(LocalFile::new(arg)))
}
