//! Word文档转换模块
//!
//! DOCX本身是ZIP归档，正文位于 `word/document.xml`。这里只做段落级转换，
//! 足够渲染端预览；更完整的转换器可以通过 [`DocumentConverter`] 替换。

use crate::extract::archive::ArchiveHandle;
use crate::extract::error::{ExtractError, Result};
use crate::extract::sanitize::escape_html;
use once_cell::sync::Lazy;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use regex::Regex;
use tracing::debug;

/// DOCX正文在归档中的路径
pub const DOCUMENT_PATH: &str = "word/document.xml";

static HEADING_STYLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^heading\s*([1-6])$").unwrap());

/// 文字处理文档到HTML的转换器
pub trait DocumentConverter {
    /// 把文档字节转换为HTML片段
    fn to_html(&self, bytes: &[u8]) -> Result<String>;
}

/// 内置的DOCX转换器
#[derive(Debug, Clone, Copy, Default)]
pub struct DocxHtmlConverter;

impl DocumentConverter for DocxHtmlConverter {
    fn to_html(&self, bytes: &[u8]) -> Result<String> {
        let mut archive = ArchiveHandle::open(bytes)?;
        let document = archive.read_text(DOCUMENT_PATH)?;
        let html = document_to_html(&document)?;
        if html.is_empty() {
            return Err(ExtractError::EmptyExtraction);
        }
        debug!(chars = html.len(), "converted word document");
        Ok(html)
    }
}

/// 正在构建的段落
#[derive(Default)]
struct Paragraph {
    heading: Option<u8>,
    body: String,
}

impl Paragraph {
    fn render(&self) -> Option<String> {
        if self.body.trim().is_empty() {
            return None;
        }
        Some(match self.heading {
            Some(level) => format!("<h{}>{}</h{}>", level, self.body, level),
            None => format!("<p>{}</p>", self.body),
        })
    }
}

/// 把 `word/document.xml` 转换为HTML
///
/// 每个 `w:p` 输出一个 `<p>`，`HeadingN` 样式的段落输出 `<hN>`；
/// 只保留 `w:t` 中的文字，`w:br`/`w:cr` 转为 `<br/>`，`w:tab` 转为空格。
pub fn document_to_html(xml_content: &str) -> Result<String> {
    let mut reader = Reader::from_str(xml_content);
    reader.config_mut().check_end_names = false;

    let mut paragraphs = Vec::new();
    let mut current: Option<Paragraph> = None;
    let mut in_text = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) => match e.local_name().as_ref() {
                b"p" => current = Some(Paragraph::default()),
                b"t" => in_text = true,
                _ => {}
            },
            Event::Empty(ref e) => {
                if let Some(paragraph) = current.as_mut() {
                    match e.local_name().as_ref() {
                        b"pStyle" => paragraph.heading = heading_level(e),
                        b"br" | b"cr" => paragraph.body.push_str("<br/>"),
                        b"tab" => paragraph.body.push(' '),
                        _ => {}
                    }
                }
            }
            Event::Text(e) if in_text => {
                if let Some(paragraph) = current.as_mut() {
                    let text = e
                        .unescape()
                        .map(|t| t.into_owned())
                        .unwrap_or_else(|_| String::from_utf8_lossy(&e).into_owned());
                    paragraph.body.push_str(&escape_html(&text));
                }
            }
            Event::End(ref e) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => {
                    if let Some(html) = current.take().and_then(|p| p.render()) {
                        paragraphs.push(html);
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(paragraphs.join("\n"))
}

fn heading_level(element: &BytesStart) -> Option<u8> {
    let value = element
        .attributes()
        .with_checks(false)
        .flatten()
        .find(|attr| attr.key.local_name().as_ref() == b"val")?
        .unescape_value()
        .ok()?
        .into_owned();

    HEADING_STYLE
        .captures(value.trim())
        .and_then(|caps| caps[1].parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::test_support::build_zip;

    const DOCUMENT: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:body>
    <w:p><w:pPr><w:pStyle w:val="Heading1"/></w:pPr><w:r><w:t>第一章</w:t></w:r></w:p>
    <w:p><w:r><w:t xml:space="preserve">Fish &amp; </w:t></w:r><w:r><w:t>chips</w:t></w:r></w:p>
    <w:p><w:r><w:t>line one</w:t><w:br/><w:t>line two</w:t></w:r></w:p>
    <w:p><w:pPr><w:pStyle w:val="Normal"/></w:pPr></w:p>
    <w:sectPr/>
  </w:body>
</w:document>"#;

    #[test]
    fn test_document_to_html() {
        let html = document_to_html(DOCUMENT).unwrap();
        assert_eq!(
            html,
            "<h1>第一章</h1>\n<p>Fish &amp; chips</p>\n<p>line one<br/>line two</p>"
        );
    }

    #[test]
    fn test_converter_reads_document_part() {
        let data = build_zip(&[
            ("[Content_Types].xml", "<Types/>"),
            ("word/document.xml", DOCUMENT),
        ]);
        let html = DocxHtmlConverter.to_html(&data).unwrap();
        assert!(html.starts_with("<h1>"));
    }

    #[test]
    fn test_converter_errors() {
        let no_document = build_zip(&[("word/styles.xml", "<w:styles/>")]);
        assert!(DocxHtmlConverter.to_html(&no_document).is_err());

        let empty = build_zip(&[("word/document.xml", "<w:document><w:body/></w:document>")]);
        assert!(matches!(
            DocxHtmlConverter.to_html(&empty),
            Err(ExtractError::EmptyExtraction)
        ));

        assert!(DocxHtmlConverter.to_html(b"not a zip").is_err());
    }
}
