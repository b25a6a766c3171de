//! 格式识别模块
//!
//! 根据声明的扩展名或文件头魔数把输入归类为 [`FormatTag`]，并提供在二进制包装中查找内嵌ZIP的扫描。

use std::fmt;

/// ZIP本地文件头签名
pub const ZIP_SIGNATURE: [u8; 4] = [0x50, 0x4B, 0x03, 0x04];

const PDF_MAGIC: &[u8] = b"%PDF-";
const EPUB_MIMETYPE_ENTRY: &[u8] = b"mimetypeapplication/epub+zip";
/// PDB头中 type/creator 字段的偏移
const PDB_TYPE_OFFSET: usize = 60;
const PDB_MOBI_TYPES: [&[u8; 8]; 2] = [b"BOOKMOBI", b"TEXtREAd"];

/// 格式标签
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatTag {
    Pdf,
    PlainText,
    WordDocument,
    Epub,
    /// AZW3/MOBI 系列
    Mobi,
    Unknown,
}

impl FormatTag {
    /// 根据扩展名或MIME类型识别格式
    ///
    /// 扩展名可以带前导点，大小写不敏感；无法识别时返回 `None`。
    pub fn from_hint(hint: &str) -> Option<FormatTag> {
        let hint = hint.trim().trim_start_matches('.').to_ascii_lowercase();
        let tag = match hint.as_str() {
            "pdf" | "application/pdf" => FormatTag::Pdf,
            "txt" | "text" | "md" | "markdown" | "text/plain" | "text/markdown" => FormatTag::PlainText,
            "doc"
            | "docx"
            | "application/msword"
            | "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => {
                FormatTag::WordDocument
            }
            "epub" | "application/epub+zip" => FormatTag::Epub,
            "azw3" | "azw" | "mobi" | "prc" | "kf8" | "application/x-mobipocket-ebook"
            | "application/x-mobi8-ebook" | "application/vnd.amazon.ebook" => FormatTag::Mobi,
            _ => return None,
        };
        Some(tag)
    }

    /// 原样透传或结构化结果使用的MIME类型
    pub fn mime(&self) -> &'static str {
        match self {
            FormatTag::Pdf => "application/pdf",
            FormatTag::PlainText => "text/plain",
            FormatTag::WordDocument => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            FormatTag::Epub => "application/epub+zip",
            FormatTag::Mobi => "application/x-mobi8-ebook",
            FormatTag::Unknown => "application/octet-stream",
        }
    }
}

impl fmt::Display for FormatTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FormatTag::Pdf => "pdf",
            FormatTag::PlainText => "plain-text",
            FormatTag::WordDocument => "word-document",
            FormatTag::Epub => "epub",
            FormatTag::Mobi => "azw3/mobi",
            FormatTag::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// 一次提取请求的原始输入
///
/// 创建后不可变，由发起请求的调用持有。
#[derive(Debug, Clone)]
pub struct SourceBuffer {
    bytes: Vec<u8>,
    format_hint: Option<String>,
    media_type: Option<String>,
}

impl SourceBuffer {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            format_hint: None,
            media_type: None,
        }
    }

    /// 附加声明的格式（通常来自文件扩展名）
    pub fn with_format_hint(mut self, hint: impl Into<String>) -> Self {
        let hint = hint.into();
        self.format_hint = (!hint.trim().is_empty()).then_some(hint);
        self
    }

    /// 附加声明的媒体类型
    pub fn with_media_type(mut self, media_type: impl Into<String>) -> Self {
        let media_type = media_type.into();
        self.media_type = (!media_type.trim().is_empty()).then_some(media_type);
        self
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn format_hint(&self) -> Option<&str> {
        self.format_hint.as_deref()
    }

    pub fn media_type(&self) -> Option<&str> {
        self.media_type.as_deref()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// 识别此输入的格式：扩展名 > 媒体类型 > 魔数
    pub fn classify(&self) -> FormatTag {
        if let Some(tag) = self.format_hint().and_then(FormatTag::from_hint) {
            return tag;
        }
        if let Some(tag) = self.media_type().and_then(FormatTag::from_hint) {
            return tag;
        }
        sniff_magic(&self.bytes)
    }
}

/// 识别格式
///
/// 声明的扩展名非空且可识别时以其为准，否则只在魔数无歧义时根据内容推断。
///
/// # 参数
/// * `buffer` - 原始字节
/// * `declared_extension` - 声明的扩展名（可选）
pub fn classify(buffer: &[u8], declared_extension: Option<&str>) -> FormatTag {
    declared_extension
        .filter(|ext| !ext.trim().is_empty())
        .and_then(FormatTag::from_hint)
        .unwrap_or_else(|| sniff_magic(buffer))
}

fn sniff_magic(buffer: &[u8]) -> FormatTag {
    if buffer.starts_with(PDF_MAGIC) {
        return FormatTag::Pdf;
    }

    // EPUB要求mimetype作为第一个未压缩条目，内容紧跟在30字节的本地文件头之后
    if buffer.starts_with(&ZIP_SIGNATURE)
        && buffer.get(30..30 + EPUB_MIMETYPE_ENTRY.len()) == Some(EPUB_MIMETYPE_ENTRY)
    {
        return FormatTag::Epub;
    }

    if let Some(pdb_type) = buffer.get(PDB_TYPE_OFFSET..PDB_TYPE_OFFSET + 8) {
        if PDB_MOBI_TYPES.iter().any(|t| pdb_type == &t[..]) {
            return FormatTag::Mobi;
        }
    }

    FormatTag::Unknown
}

/// 查找第一个ZIP本地文件头签名的偏移
pub fn find_embedded_zip_offset(buffer: &[u8]) -> Option<usize> {
    buffer
        .windows(ZIP_SIGNATURE.len())
        .position(|window| window == ZIP_SIGNATURE)
}
