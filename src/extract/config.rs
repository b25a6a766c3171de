//! 提取配置模块
//!
//! 提供提取管线的上限、文本判定阈值以及元数据标签别名配置，支持从YAML文件加载。

use crate::extract::error::{ExtractError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// 单个元数据字段的标签配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataTagConfig {
    /// 标签列表（按优先级排列）
    pub tags: Vec<String>,
    /// 可选的描述
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl MetadataTagConfig {
    /// 创建带描述的标签配置
    pub fn with_description(tags: &[&str], description: &str) -> Self {
        Self {
            tags: tags.iter().map(|t| t.to_string()).collect(),
            description: Some(description.to_string()),
        }
    }
}

/// 元数据标签配置，定义每个逻辑字段可能出现的元素名
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataTagConfigs {
    /// 标题
    pub title: MetadataTagConfig,
    /// 创建者
    pub creator: MetadataTagConfig,
    /// 语言
    pub language: MetadataTagConfig,
}

impl Default for MetadataTagConfigs {
    fn default() -> Self {
        Self {
            title: MetadataTagConfig::with_description(&["title"], "书籍标题"),
            creator: MetadataTagConfig::with_description(&["creator", "author"], "作者/创建者"),
            language: MetadataTagConfig::with_description(&["language"], "书籍语言"),
        }
    }
}

/// 内容组装的上限
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionLimits {
    /// 最多收集的脊柱条目数
    pub max_spine_entries: usize,
    /// 累计净化后内容的字符上限
    pub max_content_chars: usize,
    /// 纯文本回退结果的截断长度
    pub max_text_chars: usize,
}

impl Default for ExtractionLimits {
    fn default() -> Self {
        Self {
            max_spine_entries: 15,
            max_content_chars: 250_000,
            max_text_chars: 40_000,
        }
    }
}

/// "是否为有意义文本" 的判定阈值
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TextHeuristics {
    /// 去除首尾空白后的最小长度
    pub min_text_len: usize,
    /// 最少的字母字符数
    pub min_letter_count: usize,
    /// 替换字符（U+FFFD）占比上限
    pub max_replacement_ratio: f64,
}

impl Default for TextHeuristics {
    fn default() -> Self {
        Self {
            min_text_len: 32,
            min_letter_count: 16,
            max_replacement_ratio: 0.05,
        }
    }
}

/// 提取管线配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    pub limits: ExtractionLimits,
    pub heuristics: TextHeuristics,
    pub metadata: MetadataTagConfigs,
    /// 元数据缺少语言时使用的默认值
    pub default_language: String,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            limits: ExtractionLimits::default(),
            heuristics: TextHeuristics::default(),
            metadata: MetadataTagConfigs::default(),
            default_language: "en".to_string(),
        }
    }
}

impl ExtractionConfig {
    /// 从YAML配置文件加载
    ///
    /// 文件中缺失的字段使用默认值。
    ///
    /// # 参数
    /// * `path` - 配置文件路径
    ///
    /// # 示例
    ///
    /// ```rust,no_run
    /// use bookprobe::ExtractionConfig;
    /// let config = ExtractionConfig::from_file("bookprobe.yaml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| ExtractError::Config(format!("cannot read config file: {}", e)))?;
        Self::from_yaml(&content)
    }

    /// 从YAML字符串解析
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yml::from_str(content)
            .map_err(|e| ExtractError::Config(format!("malformed config file: {}", e)))
    }

    /// 将默认配置写入指定路径
    pub fn generate_default_config<P: AsRef<Path>>(path: P) -> Result<()> {
        let yaml_content = serde_yml::to_string(&Self::default())
            .map_err(|e| ExtractError::Config(format!("cannot serialize config: {}", e)))?;

        let content_with_header = format!(
            "# bookprobe 提取配置文件\n# limits: 内容组装上限; heuristics: 纯文本判定阈值; metadata: 元数据元素别名\n\n{}",
            yaml_content
        );

        fs::write(path.as_ref(), content_with_header)
            .map_err(|e| ExtractError::Config(format!("cannot write config file: {}", e)))?;

        Ok(())
    }
}
