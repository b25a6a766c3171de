pub mod extract;

// === 核心API重新导出 ===

/// 提取管线（主要接口）
pub use extract::{Extraction, Pipeline, Strategy};

/// 异步入口
pub use extract::{extract_book, extract_preview};

/// 错误处理
pub use extract::{ErrorKind, ExtractError, Result};

/// 配置
pub use extract::{ExtractionConfig, ExtractionLimits, MetadataTagConfig, MetadataTagConfigs, TextHeuristics};

// === 数据结构 ===

/// 输入与格式
pub use extract::{FormatTag, SourceBuffer};

/// 请求与响应
pub use extract::{BookResponse, ExtractionRequest, Preview, PreviewResponse};

/// 书籍视图
pub use extract::{BookMetadata, BookViewData, SpineEntry};

// === 底层组件（高级用法） ===

/// 格式识别与DRM检测
pub use extract::{classify, find_embedded_zip_offset, is_encrypted};

/// 容器与包文档
pub use extract::{
    ArchiveHandle,
    ArchiveOrigin,
    Container,
    RootFile,
    ManifestItem,
    PackageModel,
    SpineRef,
    XmlNode,
    get_attribute,
    resolve_manifest,
    assemble,
};

/// 净化与文本回退
pub use extract::{
    extract_readable_text,
    is_meaningful_text,
    markup_to_text,
    sanitize_embedded_content,
    sanitize_markup,
    sanitize_plain_text,
};

/// Word文档转换
pub use extract::{DocumentConverter, DocxHtmlConverter};

// === 库信息 ===

/// BookProbe库的版本信息
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// BookProbe库的描述
pub const DESCRIPTION: &str = "电子书内容提取库：格式识别、DRM检测、结构化解析与纯文本回退";

// === 便捷函数 ===

/// 使用默认配置预览内存中的书籍
///
/// 这是 `Pipeline::default().preview` 的便捷包装函数。
///
/// # 参数
/// * `bytes` - 书籍的原始字节
/// * `format` - 声明的格式或扩展名（可选）
///
/// # 示例
///
/// ```rust
/// let extraction = bookprobe::preview(b"%PDF-1.7".to_vec(), Some("pdf"))?;
/// assert_eq!(extraction.kind(), "dataUrl");
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn preview(bytes: Vec<u8>, format: Option<&str>) -> Result<Extraction> {
    let mut source = SourceBuffer::from_bytes(bytes);
    if let Some(format) = format {
        source = source.with_format_hint(format);
    }
    Pipeline::default().preview(&source)
}
