//! 清单模块
//!
//! 提供包文档中清单项、脊柱引用的结构定义，以及href到归档路径的解析。

use once_cell::sync::Lazy;
use percent_encoding::percent_decode_str;
use regex::Regex;
use serde::Serialize;

static MARKUP_MEDIA_TYPE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)html|xml").unwrap());

/// 清单项信息
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestItem {
    /// 项目ID
    pub id: String,
    /// 文件路径(相对于OPF文件)
    pub href: String,
    /// 媒体类型
    pub media_type: String,
    /// 属性(如nav、cover-image等)
    pub properties: Option<String>,
}

impl ManifestItem {
    pub fn new(id: impl Into<String>, href: impl Into<String>, media_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            href: href.into(),
            media_type: media_type.into(),
            properties: None,
        }
    }

    /// 检查是否包含指定属性
    pub fn has_property(&self, property: &str) -> bool {
        self.properties
            .as_deref()
            .is_some_and(|properties| properties.split_whitespace().any(|p| p == property))
    }

    /// 检查是否为导航文档
    pub fn is_nav(&self) -> bool {
        self.has_property("nav")
    }

    /// 检查是否为封面图片
    pub fn is_cover_image(&self) -> bool {
        self.has_property("cover-image")
    }

    /// 检查是否为样式表
    pub fn is_css(&self) -> bool {
        self.media_type.to_ascii_lowercase().contains("css")
    }

    /// 检查媒体类型是否为HTML/XML文档
    pub fn is_markup(&self) -> bool {
        MARKUP_MEDIA_TYPE.is_match(&self.media_type)
    }
}

/// 脊柱引用(阅读顺序)
#[derive(Debug, Clone, PartialEq)]
pub struct SpineRef {
    /// 引用的清单项ID
    pub idref: String,
    /// 是否线性阅读
    pub linear: bool,
}

impl SpineRef {
    pub fn new(idref: impl Into<String>) -> Self {
        Self {
            idref: idref.into(),
            linear: true,
        }
    }
}

/// 包文档所在目录（不含结尾斜杠）
pub fn parent_dir(path: &str) -> &str {
    path.rsplit_once('/').map_or("", |(dir, _)| dir)
}

/// 把清单中的href解析为归档内路径
///
/// 先与包文档目录拼接并去掉开头的斜杠，再对每个路径段单独做百分号解码；
/// 解码失败的段保留原样。`.` 与 `..` 段会被折叠。
///
/// # 参数
/// * `base_dir` - 包文档所在目录，如 `OEBPS`
/// * `href` - 清单中声明的href
pub fn resolve_href(base_dir: &str, href: &str) -> String {
    let href = href.split(['#', '?']).next().unwrap_or_default();
    let joined = if base_dir.is_empty() {
        href.to_string()
    } else {
        format!("{}/{}", base_dir.trim_end_matches('/'), href)
    };

    let mut segments: Vec<String> = Vec::new();
    for segment in joined.trim_start_matches('/').split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            _ => segments.push(decode_segment(segment)),
        }
    }
    segments.join("/")
}

fn decode_segment(segment: &str) -> String {
    percent_decode_str(segment)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| segment.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_properties() {
        let mut item = ManifestItem::new("nav", "nav.xhtml", "application/xhtml+xml");
        assert!(!item.is_nav());
        item.properties = Some("nav scripted".to_string());
        assert!(item.is_nav());
        assert!(item.has_property("scripted"));
        assert!(!item.is_cover_image());
    }

    #[test]
    fn test_media_type_helpers() {
        assert!(ManifestItem::new("a", "a.html", "text/html").is_markup());
        assert!(ManifestItem::new("a", "a.xhtml", "application/xhtml+xml").is_markup());
        assert!(ManifestItem::new("a", "a.css", "text/CSS").is_css());
        assert!(!ManifestItem::new("a", "a.jpg", "image/jpeg").is_markup());
    }

    #[test]
    fn test_resolve_href() {
        assert_eq!(resolve_href("OEBPS", "ch1.html"), "OEBPS/ch1.html");
        assert_eq!(resolve_href("", "ch1.html"), "ch1.html");
        assert_eq!(resolve_href("OEBPS/", "Text/ch1.html"), "OEBPS/Text/ch1.html");
        assert_eq!(resolve_href("OEBPS", "/Text/ch1.html"), "OEBPS/Text/ch1.html");
        assert_eq!(resolve_href("", "/ch1.html"), "ch1.html");
        assert_eq!(resolve_href("OEBPS/Text", "../Styles/a.css"), "OEBPS/Styles/a.css");
        assert_eq!(resolve_href("OEBPS", "ch1.html#start"), "OEBPS/ch1.html");
    }

    #[test]
    fn test_resolve_href_percent_decoding() {
        assert_eq!(resolve_href("OEBPS", "Chapter%201.html"), "OEBPS/Chapter 1.html");
        assert_eq!(resolve_href("O%45BPS", "%E7%AC%AC1%E7%AB%A0.xhtml"), "OEBPS/第1章.xhtml");
        // 非法UTF-8的段保留原样
        assert_eq!(resolve_href("OEBPS", "bad%FF/ok%20name.html"), "OEBPS/bad%FF/ok name.html");
    }

    #[test]
    fn test_parent_dir() {
        assert_eq!(parent_dir("OEBPS/content.opf"), "OEBPS");
        assert_eq!(parent_dir("a/b/content.opf"), "a/b");
        assert_eq!(parent_dir("content.opf"), "");
    }
}
