//! 元数据模块
//!
//! 从包文档的 `<metadata>` 中读取标题、作者与语言。元素名与属性一样使用探测式匹配，
//! 任何字段缺失都不会中断提取。

use crate::extract::config::{MetadataTagConfig, MetadataTagConfigs};
use crate::extract::opf::xml::XmlNode;
use serde::{Deserialize, Serialize};

/// 书籍基本信息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookMetadata {
    pub title: String,
    pub creator: String,
    pub language: String,
}

impl Default for BookMetadata {
    fn default() -> Self {
        Self {
            title: String::new(),
            creator: String::new(),
            language: "en".to_string(),
        }
    }
}

impl BookMetadata {
    /// 从 `<metadata>` 元素读取元数据
    ///
    /// # 参数
    /// * `metadata` - 元数据元素，缺失时传 `None`
    /// * `tags` - 每个字段的元素名别名
    /// * `default_language` - 语言为空时的默认值
    pub fn from_node(metadata: Option<&XmlNode>, tags: &MetadataTagConfigs, default_language: &str) -> Self {
        let lookup = |config: &MetadataTagConfig| {
            metadata
                .and_then(|node| find_by_tags(node, &config.tags))
                .unwrap_or_default()
        };

        let language = lookup(&tags.language);
        Self {
            title: lookup(&tags.title),
            creator: lookup(&tags.creator),
            language: if language.is_empty() {
                default_language.to_string()
            } else {
                language
            },
        }
    }
}

/// 按标签优先级查找第一个非空值
fn find_by_tags(metadata: &XmlNode, tags: &[String]) -> Option<String> {
    tags.iter().find_map(|tag| find_value(metadata, tag))
}

/// 查找单个标签的值
///
/// 依次尝试：子元素（包括OPF 1.x 的 `<dc-metadata>` 嵌套）的文本，
/// 以及 `<meta name="..." content="...">` 形式。
fn find_value(metadata: &XmlNode, tag: &str) -> Option<String> {
    let local = tag.rsplit_once(':').map_or(tag, |(_, local)| local);

    let element_text = metadata
        .children
        .iter()
        .chain(metadata.children.iter().flat_map(|child| child.children.iter()))
        .filter(|node| node.is(local))
        .map(|node| node.text.trim())
        .find(|text| !text.is_empty());
    if let Some(text) = element_text {
        return Some(text.to_string());
    }

    metadata
        .children_named("meta")
        .filter(|meta| meta.attribute("name").is_some_and(|name| name.eq_ignore_ascii_case(tag)))
        .filter_map(|meta| meta.attribute("content"))
        .map(str::trim)
        .find(|content| !content.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_metadata(xml: &str) -> BookMetadata {
        let node = XmlNode::parse(xml).unwrap();
        BookMetadata::from_node(Some(&node), &MetadataTagConfigs::default(), "en")
    }

    #[test]
    fn test_dublin_core_metadata() {
        let metadata = parse_metadata(
            r#"<metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
                <dc:title>测试书籍</dc:title>
                <dc:creator opf:role="aut">测试作者</dc:creator>
                <dc:creator>第二作者</dc:creator>
                <dc:language>zh-CN</dc:language>
            </metadata>"#,
        );
        assert_eq!(metadata.title, "测试书籍");
        assert_eq!(metadata.creator, "测试作者");
        assert_eq!(metadata.language, "zh-CN");
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let metadata = parse_metadata("<metadata><dc:title>Only Title</dc:title><dc:language> </dc:language></metadata>");
        assert_eq!(metadata.title, "Only Title");
        assert_eq!(metadata.creator, "");
        assert_eq!(metadata.language, "en");

        let empty = BookMetadata::from_node(None, &MetadataTagConfigs::default(), "fr");
        assert_eq!(empty.title, "");
        assert_eq!(empty.language, "fr");
    }

    #[test]
    fn test_legacy_nested_and_case_variants() {
        let metadata = parse_metadata(
            "<metadata><dc-metadata><dc:Title>Legacy</dc:Title><dc:Creator>Old Author</dc:Creator></dc-metadata></metadata>",
        );
        assert_eq!(metadata.title, "Legacy");
        assert_eq!(metadata.creator, "Old Author");
    }

    #[test]
    fn test_meta_name_fallback() {
        let metadata = parse_metadata(r#"<metadata><meta name="author" content="Meta Author"/></metadata>"#);
        assert_eq!(metadata.creator, "Meta Author");
    }
}
