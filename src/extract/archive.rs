use std::io::{Cursor, Read};
use tracing::debug;
use zip::ZipArchive;

use crate::extract::error::{ExtractError, Result};
use crate::extract::sniff::{FormatTag, find_embedded_zip_offset};

/// 单个条目读取的字节上限
const MAX_ENTRY_BYTES: u64 = 64 * 1024 * 1024;
const UTF8_BOM: &str = "\u{feff}";

/// 归档在输入中的位置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveOrigin {
    /// 输入本身就是ZIP（EPUB）
    Standalone,
    /// ZIP嵌在其它二进制包装中（AZW3/MOBI）
    Embedded { offset: usize },
}

/// 已打开的ZIP归档
///
/// 条目按存储路径大小写敏感地查找，路径规范化由调用方负责。
pub struct ArchiveHandle<'a> {
    archive: ZipArchive<Cursor<&'a [u8]>>,
    origin: ArchiveOrigin,
}

impl<'a> ArchiveHandle<'a> {
    /// 把整个缓冲区作为ZIP打开
    pub fn open(buffer: &'a [u8]) -> Result<Self> {
        let archive = ZipArchive::new(Cursor::new(buffer))?;
        debug!(entries = archive.len(), "opened archive");
        Ok(Self {
            archive,
            origin: ArchiveOrigin::Standalone,
        })
    }

    /// 在二进制包装中定位内嵌ZIP并从该偏移打开
    ///
    /// # 返回值
    /// * 找不到ZIP签名时返回 `ContainerParse` 错误，调用方应回退到纯文本提取
    pub fn open_embedded(buffer: &'a [u8]) -> Result<Self> {
        let offset = find_embedded_zip_offset(buffer).ok_or_else(|| {
            ExtractError::ContainerParse("no structured container".to_string())
        })?;

        let archive = ZipArchive::new(Cursor::new(&buffer[offset..]))?;
        debug!(offset, entries = archive.len(), "opened embedded archive");
        Ok(Self {
            archive,
            origin: ArchiveOrigin::Embedded { offset },
        })
    }

    /// 按格式选择打开方式
    pub fn open_for(buffer: &'a [u8], format: FormatTag) -> Result<Self> {
        match format {
            FormatTag::Mobi => Self::open_embedded(buffer),
            _ => Self::open(buffer),
        }
    }

    pub fn origin(&self) -> ArchiveOrigin {
        self.origin
    }

    pub fn is_embedded(&self) -> bool {
        matches!(self.origin, ArchiveOrigin::Embedded { .. })
    }

    pub fn len(&self) -> usize {
        self.archive.len()
    }

    pub fn is_empty(&self) -> bool {
        self.archive.len() == 0
    }

    /// 按归档中存储的顺序列出所有条目
    pub fn entry_names(&self) -> Vec<String> {
        self.archive.file_names().map(str::to_string).collect()
    }

    /// 精确路径是否存在
    pub fn contains(&self, path: &str) -> bool {
        self.archive.index_for_name(path).is_some()
    }

    /// 按条件查找条目，结果保持归档顺序
    pub fn find_entries<F>(&self, predicate: F) -> Vec<String>
    where
        F: Fn(&str) -> bool,
    {
        self.archive
            .file_names()
            .filter(|name| !name.ends_with('/') && predicate(name))
            .map(str::to_string)
            .collect()
    }

    /// 查找扩展名匹配（大小写不敏感）的条目
    pub fn find_by_extension(&self, extension: &str) -> Vec<String> {
        let suffix = format!(".{}", extension.trim_start_matches('.').to_ascii_lowercase());
        self.find_entries(|name| name.to_ascii_lowercase().ends_with(&suffix))
    }

    /// 读取条目的二进制内容
    pub fn read_bytes(&mut self, path: &str) -> Result<Vec<u8>> {
        let file = self.archive.by_name(path)?;
        let mut buffer = Vec::new();
        file.take(MAX_ENTRY_BYTES).read_to_end(&mut buffer)?;
        Ok(buffer)
    }

    /// 以文本方式读取条目
    ///
    /// 非法UTF-8序列替换为U+FFFD，开头的BOM被移除。
    pub fn read_text(&mut self, path: &str) -> Result<String> {
        let bytes = self.read_bytes(path)?;
        let text = String::from_utf8_lossy(&bytes);
        Ok(text.strip_prefix(UTF8_BOM).unwrap_or(text.as_ref()).to_string())
    }
}
