//! 提取管线
//!
//! 识别格式后按格式对应的策略链依次尝试，第一个成功的策略给出结果。
//! 每次请求都是独立的：管线不持有可变状态，也不缓存任何结果。

use crate::extract::api::{BookResponse, ExtractionRequest, Preview, PreviewResponse, encode_base64};
use crate::extract::archive::ArchiveHandle;
use crate::extract::assemble::{BookViewData, assemble, preview_entry};
use crate::extract::config::ExtractionConfig;
use crate::extract::docx::{DocumentConverter, DocxHtmlConverter};
use crate::extract::drm;
use crate::extract::error::{ExtractError, Result};
use crate::extract::opf::metadata::BookMetadata;
use crate::extract::opf::parser::resolve_manifest;
use crate::extract::sanitize::{sanitize_embedded_content, sanitize_plain_text};
use crate::extract::sniff::{FormatTag, SourceBuffer};
use crate::extract::text::{extract_readable_text, truncate_chars};
use tracing::{debug, info, warn};

/// 单个提取策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// 原样返回字节，交给下游渲染
    PassThrough,
    /// 按UTF-8读取的纯文本文件
    PlainText,
    /// Word文档转HTML
    Document,
    /// 容器 → 包文档 → 内容组装
    Structured,
    /// 归档中的第一个HTML条目
    ArchiveHtml,
    /// 对整个缓冲区做纯文本回退
    FlatText,
}

impl Strategy {
    /// 格式对应的策略链，按优先级排列
    pub fn chain(format: FormatTag) -> &'static [Strategy] {
        match format {
            FormatTag::Pdf => &[Strategy::PassThrough],
            FormatTag::PlainText => &[Strategy::PlainText, Strategy::FlatText],
            FormatTag::WordDocument => &[Strategy::Document, Strategy::FlatText],
            FormatTag::Epub | FormatTag::Mobi => {
                &[Strategy::Structured, Strategy::ArchiveHtml, Strategy::FlatText]
            }
            FormatTag::Unknown => &[Strategy::FlatText],
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Strategy::PassThrough => "pass-through",
            Strategy::PlainText => "plain-text",
            Strategy::Document => "document",
            Strategy::Structured => "structured",
            Strategy::ArchiveHtml => "archive-html",
            Strategy::FlatText => "flat-text",
        }
    }
}

/// 提取结果
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    /// 未解析的原始字节
    PassThrough { mime: &'static str },
    /// 净化后的纯文本
    Text(String),
    /// 净化后的单文档HTML
    Html(String),
    /// 结构化书籍
    Book { mime: &'static str, book: BookViewData },
}

impl Extraction {
    pub fn kind(&self) -> &'static str {
        match self {
            Extraction::PassThrough { .. } => "dataUrl",
            Extraction::Text(_) => "text",
            Extraction::Html(_) => "html",
            Extraction::Book { .. } => "foliate",
        }
    }

    /// 转换为线上格式
    ///
    /// # 参数
    /// * `source` - 原始字节，透传与结构化结果需要携带其base64编码
    pub fn into_preview(self, source: &[u8]) -> Preview {
        match self {
            Extraction::PassThrough { mime } => Preview::DataUrl {
                mime: mime.to_string(),
                data: encode_base64(source),
            },
            Extraction::Text(content) => Preview::Text { content },
            Extraction::Html(content) => Preview::Html { content },
            Extraction::Book { mime, book } => Preview::Foliate {
                mime: mime.to_string(),
                data: encode_base64(source),
                book,
            },
        }
    }
}

/// 提取管线
pub struct Pipeline {
    config: ExtractionConfig,
    converter: Box<dyn DocumentConverter + Send + Sync>,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(ExtractionConfig::default())
    }
}

impl Pipeline {
    pub fn new(config: ExtractionConfig) -> Self {
        Self {
            config,
            converter: Box::new(DocxHtmlConverter),
        }
    }

    /// 替换Word文档转换器
    pub fn with_converter<C>(mut self, converter: C) -> Self
    where
        C: DocumentConverter + Send + Sync + 'static,
    {
        self.converter = Box::new(converter);
        self
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// 通用预览
    ///
    /// # 返回值
    /// * `DrmProtected` - MOBI系列输入带有加密标记，不再尝试任何策略
    /// * `UnsupportedFormat` - 未知格式且回退也没有结果
    /// * `EmptyExtraction` - 已知格式但所有策略都失败
    pub fn preview(&self, source: &SourceBuffer) -> Result<Extraction> {
        let format = source.classify();
        info!(%format, bytes = source.len(), "classified input");
        check_drm(format, source.bytes())?;

        for strategy in Strategy::chain(format) {
            match self.run(*strategy, format, source.bytes()) {
                Ok(extraction) => {
                    info!(strategy = strategy.name(), kind = extraction.kind(), "extraction succeeded");
                    return Ok(extraction);
                }
                Err(e) if e.is_terminal() => {
                    warn!(strategy = strategy.name(), "strategy failed terminally: {}", e);
                    return Err(e);
                }
                Err(e) => log_fallback(*strategy, &e),
            }
        }

        warn!(%format, "every extraction strategy failed");
        Err(match format {
            FormatTag::Unknown => ExtractError::UnsupportedFormat(
                "the file type could not be recognized and contains no readable text".to_string(),
            ),
            _ => ExtractError::EmptyExtraction,
        })
    }

    /// 结构化阅读：只接受EPUB与MOBI系列
    pub fn book(&self, source: &SourceBuffer) -> Result<BookViewData> {
        let format = source.classify();
        info!(%format, bytes = source.len(), "classified input for structured view");
        if !matches!(format, FormatTag::Epub | FormatTag::Mobi) {
            return Err(ExtractError::UnsupportedFormat(format!(
                "structured view is not available for {} files",
                format
            )));
        }
        check_drm(format, source.bytes())?;
        self.structured(source.bytes(), format)
    }

    fn run(&self, strategy: Strategy, format: FormatTag, bytes: &[u8]) -> Result<Extraction> {
        match strategy {
            Strategy::PassThrough => Ok(Extraction::PassThrough { mime: format.mime() }),
            Strategy::PlainText => self.plain_text(bytes).map(Extraction::Text),
            Strategy::Document => {
                let html = sanitize_embedded_content(&self.converter.to_html(bytes)?);
                Ok(Extraction::Html(html))
            }
            Strategy::Structured => self.structured(bytes, format).map(|book| Extraction::Book {
                mime: format.mime(),
                book,
            }),
            Strategy::ArchiveHtml => {
                let mut archive = ArchiveHandle::open_for(bytes, format)?;
                preview_entry(&mut archive)
                    .map(|entry| Extraction::Html(entry.content))
                    .ok_or(ExtractError::EmptyExtraction)
            }
            Strategy::FlatText => {
                let text = extract_readable_text(bytes, &self.config.heuristics, &self.config.limits);
                if text.is_empty() {
                    return Err(ExtractError::EmptyExtraction);
                }
                Ok(Extraction::Text(text))
            }
        }
    }

    fn structured(&self, bytes: &[u8], format: FormatTag) -> Result<BookViewData> {
        let mut archive = ArchiveHandle::open_for(bytes, format)?;
        let book = match resolve_manifest(&mut archive) {
            Ok(package) => assemble(&mut archive, &package, &self.config),
            Err(ExtractError::NoManifest) => self.discovered_book(&mut archive),
            Err(e) => return Err(e),
        };
        if book.is_empty() {
            return Err(ExtractError::EmptyExtraction);
        }
        info!(
            title = %book.metadata.title,
            entries = book.spine.len(),
            styles = book.styles.len(),
            "assembled book"
        );
        Ok(book)
    }

    /// 没有包文档时，以归档中第一个HTML条目构造单章节的书籍
    fn discovered_book(&self, archive: &mut ArchiveHandle<'_>) -> BookViewData {
        let metadata = BookMetadata::from_node(None, &self.config.metadata, &self.config.default_language);
        let spine: Vec<_> = preview_entry(archive).into_iter().collect();
        info!(found = !spine.is_empty(), "no package document, discovered html entry");
        BookViewData {
            metadata,
            spine,
            styles: Vec::new(),
        }
    }

    /// 声明为纯文本的文件不做有意义文本判定
    fn plain_text(&self, bytes: &[u8]) -> Result<String> {
        let text = sanitize_plain_text(&String::from_utf8_lossy(bytes));
        let text = text.trim();
        if text.is_empty() {
            return Err(ExtractError::EmptyExtraction);
        }
        Ok(truncate_chars(text, self.config.limits.max_text_chars))
    }
}

fn check_drm(format: FormatTag, bytes: &[u8]) -> Result<()> {
    if format == FormatTag::Mobi && drm::is_encrypted(bytes) {
        warn!("input is DRM protected, extraction stopped");
        return Err(ExtractError::DrmProtected);
    }
    Ok(())
}

fn log_fallback(strategy: Strategy, error: &ExtractError) {
    match error {
        ExtractError::Io(_) | ExtractError::Xml(_) => {
            warn!(strategy = strategy.name(), "strategy failed, falling back: {}", error)
        }
        _ => debug!(strategy = strategy.name(), "strategy produced nothing, falling back: {}", error),
    }
}

/// 预览入口
///
/// 读取请求指向的字节并运行完整管线。任何失败都转换为 `success: false` 的响应。
///
/// # 参数
/// * `request` - 提取请求
/// * `config` - 提取配置
pub async fn extract_preview(request: &ExtractionRequest, config: &ExtractionConfig) -> PreviewResponse {
    let source = match request.load().await {
        Ok(source) => source,
        Err(e) => {
            warn!("rejecting request: {}", e);
            return PreviewResponse::failure(&e);
        }
    };

    let pipeline = Pipeline::new(config.clone());
    match pipeline.preview(&source) {
        Ok(extraction) => PreviewResponse::success(extraction.into_preview(source.bytes())),
        Err(e) => PreviewResponse::failure(&e),
    }
}

/// 结构化阅读入口
pub async fn extract_book(request: &ExtractionRequest, config: &ExtractionConfig) -> BookResponse {
    let result = match request.load().await {
        Ok(source) => Pipeline::new(config.clone()).book(&source),
        Err(e) => Err(e),
    };
    if let Err(e) = &result {
        debug!("structured view unavailable: {}", e);
    }
    BookResponse::from(result)
}
