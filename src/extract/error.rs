use std::io;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ExtractError>;

/// 提取管线的错误类型
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Zip archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XML parse error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("{0}")]
    InvalidInput(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("This book is protected by DRM and cannot be opened")]
    DrmProtected,

    #[error("Container parse failure: {0}")]
    ContainerParse(String),

    #[error("No usable package document found")]
    NoManifest,

    #[error("No readable content could be extracted")]
    EmptyExtraction,

    #[error("Config error: {0}")]
    Config(String),
}

/// 面向调用方的错误分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    UnsupportedFormat,
    DrmProtected,
    ContainerParseFailure,
    EmptyExtraction,
}

impl ExtractError {
    /// 请求缺少 path 与 data 时的错误
    pub fn missing_data() -> Self {
        ExtractError::InvalidInput("Missing book data".to_string())
    }

    /// 将内部错误归入对外的错误分类
    ///
    /// 容器、XML、IO 层面的错误统一视为容器解析失败，它们在管线内部总是可以回退。
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExtractError::InvalidInput(_) | ExtractError::Config(_) => ErrorKind::InvalidInput,
            ExtractError::UnsupportedFormat(_) => ErrorKind::UnsupportedFormat,
            ExtractError::DrmProtected => ErrorKind::DrmProtected,
            ExtractError::EmptyExtraction => ErrorKind::EmptyExtraction,
            ExtractError::Io(_)
            | ExtractError::Zip(_)
            | ExtractError::Xml(_)
            | ExtractError::ContainerParse(_)
            | ExtractError::NoManifest => ErrorKind::ContainerParseFailure,
        }
    }

    /// 是否为终止性错误（不再尝试后续回退策略）
    pub fn is_terminal(&self) -> bool {
        matches!(self, ExtractError::DrmProtected | ExtractError::InvalidInput(_))
    }
}
