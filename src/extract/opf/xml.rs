//! XML树模块
//!
//! 把包文档解析成一棵轻量的元素树，并提供按固定优先级探测属性的访问器。
//! 同一个逻辑属性在不同文件中可能以普通名、带前缀名、大小写变体甚至子元素的形式出现。

use crate::extract::error::Result;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

/// 属性名的探测方式，按声明顺序依次尝试
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrForm {
    /// 完全相同的属性名，如 `id`
    Exact,
    /// 带命名空间前缀的属性名，如 `opf:id`
    Prefixed,
    /// 大小写不同的属性名，如 `ID`、`Media-Type`
    CaseInsensitive,
    /// 忽略 `-`、`_` 与大小写，如 `mediaType`、`media_type`
    Compact,
    /// 以同名子元素的文本出现，如 `<item><href>a.html</href></item>`
    ChildElement,
}

/// 属性探测的固定优先级
pub const ATTR_FORM_ORDER: [AttrForm; 5] = [
    AttrForm::Exact,
    AttrForm::Prefixed,
    AttrForm::CaseInsensitive,
    AttrForm::Compact,
    AttrForm::ChildElement,
];

/// XML元素节点
#[derive(Debug, Clone, Default, PartialEq)]
pub struct XmlNode {
    /// 限定名（保留前缀）
    pub name: String,
    /// 属性（限定名, 值），保持文档顺序
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
    /// 直接文本内容
    pub text: String,
}

fn local_part(name: &str) -> &str {
    name.rsplit_once(':').map_or(name, |(_, local)| local)
}

fn compact(name: &str) -> String {
    local_part(name)
        .chars()
        .filter(|c| *c != '-' && *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

fn key_matches(key: &str, logical: &str, form: AttrForm) -> bool {
    match form {
        AttrForm::Exact => key == logical,
        AttrForm::Prefixed => key.contains(':') && local_part(key) == logical,
        AttrForm::CaseInsensitive => {
            key.eq_ignore_ascii_case(logical) || local_part(key).eq_ignore_ascii_case(logical)
        }
        AttrForm::Compact => compact(key) == compact(logical),
        AttrForm::ChildElement => false,
    }
}

impl XmlNode {
    fn from_start(e: &BytesStart) -> Self {
        let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
        let attributes = e
            .attributes()
            .with_checks(false)
            .filter_map(|attr| attr.ok())
            .map(|attr| {
                let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
                let value = attr
                    .unescape_value()
                    .map(|v| v.into_owned())
                    .unwrap_or_else(|_| String::from_utf8_lossy(&attr.value).into_owned());
                (key, value)
            })
            .collect();

        XmlNode {
            name,
            attributes,
            ..Default::default()
        }
    }

    /// 解析XML文档，返回根元素
    ///
    /// 对结束标签不做严格匹配，未闭合的元素在文档结束时自动闭合。
    pub fn parse(xml_content: &str) -> Result<XmlNode> {
        let mut reader = Reader::from_str(xml_content);
        reader.config_mut().trim_text(true);
        reader.config_mut().check_end_names = false;

        // 栈底是一个虚拟的文档节点
        let mut stack: Vec<XmlNode> = vec![XmlNode::default()];
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(ref e) => {
                    stack.push(XmlNode::from_start(e));
                }
                Event::Empty(ref e) => {
                    let node = XmlNode::from_start(e);
                    if let Some(parent) = stack.last_mut() {
                        parent.children.push(node);
                    }
                }
                Event::End(_) => {
                    if stack.len() > 1 {
                        if let Some(node) = stack.pop() {
                            if let Some(parent) = stack.last_mut() {
                                parent.children.push(node);
                            }
                        }
                    }
                }
                Event::Text(e) => {
                    let text = e
                        .unescape()
                        .map(|t| t.into_owned())
                        .unwrap_or_else(|_| String::from_utf8_lossy(&e).into_owned());
                    if let Some(node) = stack.last_mut() {
                        node.text.push_str(&text);
                    }
                }
                Event::CData(e) => {
                    if let Some(node) = stack.last_mut() {
                        node.text.push_str(&String::from_utf8_lossy(&e));
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        while stack.len() > 1 {
            if let Some(node) = stack.pop() {
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(node);
                }
            }
        }

        let document = stack.pop().unwrap_or_default();
        Ok(document.children.into_iter().next().unwrap_or_default())
    }

    /// 去掉前缀后的元素名
    pub fn local_name(&self) -> &str {
        local_part(&self.name)
    }

    /// 元素名是否匹配逻辑名（忽略前缀和大小写）
    pub fn is(&self, logical: &str) -> bool {
        self.local_name().eq_ignore_ascii_case(logical)
    }

    /// 按固定优先级探测逻辑属性，返回第一个存在的值
    ///
    /// # 参数
    /// * `logical` - 逻辑属性名，如 `"media-type"`
    pub fn attribute(&self, logical: &str) -> Option<&str> {
        ATTR_FORM_ORDER.iter().find_map(|form| self.lookup(logical, *form))
    }

    /// 使用单一探测方式查找属性
    pub fn lookup(&self, logical: &str, form: AttrForm) -> Option<&str> {
        match form {
            AttrForm::ChildElement => self
                .children
                .iter()
                .find(|child| child.is(logical) || compact(&child.name) == compact(logical))
                .map(|child| child.text.trim()),
            _ => self
                .attributes
                .iter()
                .find(|(key, _)| key_matches(key, logical, form))
                .map(|(_, value)| value.as_str()),
        }
    }

    /// 第一个名称匹配的子元素
    pub fn child(&self, logical: &str) -> Option<&XmlNode> {
        self.children.iter().find(|child| child.is(logical))
    }

    /// 所有名称匹配的子元素
    pub fn children_named<'a>(&'a self, logical: &'a str) -> impl Iterator<Item = &'a XmlNode> + 'a {
        self.children.iter().filter(move |child| child.is(logical))
    }

    /// 第一个名称匹配的子元素的文本，去除首尾空白
    pub fn child_text(&self, logical: &str) -> Option<&str> {
        self.child(logical).map(|child| child.text.trim())
    }
}

/// 按逻辑名读取属性，等价于 [`XmlNode::attribute`]
pub fn get_attribute<'a>(node: &'a XmlNode, logical: &str) -> Option<&'a str> {
    node.attribute(logical)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tree() {
        let root = XmlNode::parse(
            r#"<?xml version="1.0"?>
<opf:package xmlns:opf="http://www.idpf.org/2007/opf" version="2.0">
  <opf:manifest>
    <opf:item id="a" href="a.html"/>
    <opf:item id="b" href="b&amp;c.html"></opf:item>
  </opf:manifest>
</opf:package>"#,
        )
        .unwrap();

        assert_eq!(root.name, "opf:package");
        assert!(root.is("package"));
        assert_eq!(root.attribute("version"), Some("2.0"));

        let manifest = root.child("manifest").unwrap();
        let items: Vec<_> = manifest.children_named("item").collect();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].attribute("href"), Some("b&c.html"));
    }

    #[test]
    fn test_attribute_form_priority() {
        let node = XmlNode {
            name: "item".to_string(),
            attributes: vec![
                ("ID".to_string(), "upper".to_string()),
                ("opf:id".to_string(), "prefixed".to_string()),
                ("id".to_string(), "plain".to_string()),
            ],
            ..Default::default()
        };
        assert_eq!(node.attribute("id"), Some("plain"));

        let node = XmlNode {
            attributes: vec![
                ("ID".to_string(), "upper".to_string()),
                ("opf:id".to_string(), "prefixed".to_string()),
            ],
            ..node
        };
        assert_eq!(node.attribute("id"), Some("prefixed"));
    }

    #[test]
    fn test_attribute_form_variants() {
        let node = XmlNode::parse(r#"<item ID="x" mediaType="text/css"><href> style.css </href></item>"#).unwrap();
        assert_eq!(get_attribute(&node, "id"), Some("x"));
        assert_eq!(get_attribute(&node, "media-type"), Some("text/css"));
        assert_eq!(get_attribute(&node, "href"), Some("style.css"));
        assert_eq!(get_attribute(&node, "properties"), None);
        assert_eq!(node.lookup("id", AttrForm::Exact), None);
    }

    #[test]
    fn test_unclosed_elements_are_kept() {
        let root = XmlNode::parse("<package><metadata><title>Broken").unwrap();
        assert!(root.is("package"));
        assert_eq!(root.child("metadata").and_then(|m| m.child_text("title")), Some("Broken"));
    }

    #[test]
    fn test_empty_document() {
        let root = XmlNode::parse("").unwrap();
        assert!(root.name.is_empty());
        assert!(root.children.is_empty());
    }
}
