//! 请求与响应类型
//!
//! 与宿主应用之间交换的JSON结构。响应只有成功与失败两种形态，失败时不携带任何内容字段。

use crate::extract::assemble::BookViewData;
use crate::extract::error::{ExtractError, ErrorKind, Result};
use crate::extract::sniff::SourceBuffer;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// 提取请求
///
/// `path` 与 `data`（base64）必须且只能提供一个；`format` 缺省时由路径扩展名推断。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

impl ExtractionRequest {
    /// 从文件路径创建请求
    pub fn from_path(path: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    /// 从内存中的字节创建请求
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            data: Some(STANDARD.encode(bytes)),
            ..Self::default()
        }
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    fn path(&self) -> Option<&str> {
        self.path.as_deref().filter(|p| !p.trim().is_empty())
    }

    fn data(&self) -> Option<&str> {
        self.data.as_deref().filter(|d| !d.trim().is_empty())
    }

    /// 声明的格式：显式的 `format` 优先，其次是路径扩展名
    pub fn declared_format(&self) -> Option<String> {
        if let Some(format) = self.format.as_deref().map(str::trim).filter(|f| !f.is_empty()) {
            return Some(format.to_string());
        }
        self.path()
            .and_then(|path| Path::new(path).extension())
            .map(|ext| ext.to_string_lossy().into_owned())
    }

    /// 读取请求指向的字节
    ///
    /// 只有这一步会访问文件系统。
    ///
    /// # 返回值
    /// * 两个来源都缺失时返回 "Missing book data"
    /// * 文件不可读或base64非法时返回 `InvalidInput`
    pub async fn load(&self) -> Result<SourceBuffer> {
        let bytes = match (self.path(), self.data()) {
            (None, None) => return Err(ExtractError::missing_data()),
            (Some(_), Some(_)) => {
                return Err(ExtractError::InvalidInput(
                    "Provide either a path or book data, not both".to_string(),
                ));
            }
            (Some(path), None) => tokio::fs::read(path)
                .await
                .map_err(|e| ExtractError::InvalidInput(format!("Cannot read {}: {}", path, e)))?,
            (None, Some(data)) => STANDARD
                .decode(data.trim())
                .map_err(|e| ExtractError::InvalidInput(format!("Invalid book data: {}", e)))?,
        };
        debug!(bytes = bytes.len(), "loaded request source");

        let mut source = SourceBuffer::from_bytes(bytes);
        if let Some(format) = self.declared_format() {
            source = source.with_format_hint(format);
        }
        Ok(source)
    }
}

/// 成功预览的内容
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Preview {
    /// 原样透传的二进制（如PDF）
    DataUrl { mime: String, data: String },
    /// 净化后的纯文本
    Text { content: String },
    /// 净化后的单文档HTML
    Html { content: String },
    /// 多章节的结构化书籍
    Foliate {
        mime: String,
        data: String,
        book: BookViewData,
    },
}

impl Preview {
    pub fn kind(&self) -> &'static str {
        match self {
            Preview::DataUrl { .. } => "dataUrl",
            Preview::Text { .. } => "text",
            Preview::Html { .. } => "html",
            Preview::Foliate { .. } => "foliate",
        }
    }
}

/// 预览入口的响应
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreviewResponse {
    pub success: bool,
    #[serde(flatten)]
    pub preview: Option<Preview>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// 失败分类，仅在本地使用
    #[serde(skip)]
    pub error_kind: Option<ErrorKind>,
}

impl PreviewResponse {
    pub fn success(preview: Preview) -> Self {
        Self {
            success: true,
            preview: Some(preview),
            error: None,
            error_kind: None,
        }
    }

    pub fn failure(error: &ExtractError) -> Self {
        Self {
            success: false,
            preview: None,
            error: Some(error.to_string()),
            error_kind: Some(error.kind()),
        }
    }
}

impl From<Result<Preview>> for PreviewResponse {
    fn from(result: Result<Preview>) -> Self {
        match result {
            Ok(preview) => Self::success(preview),
            Err(e) => Self::failure(&e),
        }
    }
}

/// 结构化阅读入口的响应
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub book: Option<BookViewData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip)]
    pub error_kind: Option<ErrorKind>,
}

impl BookResponse {
    pub fn success(book: BookViewData) -> Self {
        Self {
            success: true,
            book: Some(book),
            error: None,
            error_kind: None,
        }
    }

    pub fn failure(error: &ExtractError) -> Self {
        Self {
            success: false,
            book: None,
            error: Some(error.to_string()),
            error_kind: Some(error.kind()),
        }
    }
}

impl From<Result<BookViewData>> for BookResponse {
    fn from(result: Result<BookViewData>) -> Self {
        match result {
            Ok(book) => Self::success(book),
            Err(e) => Self::failure(&e),
        }
    }
}

/// base64编码（标准字母表，带填充）
pub fn encode_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}
