//! 内容组装模块
//!
//! 按脊柱顺序读取章节、净化并收集样式表，生成交给渲染端的 [`BookViewData`]。

use crate::extract::archive::ArchiveHandle;
use crate::extract::config::ExtractionConfig;
use crate::extract::opf::metadata::BookMetadata;
use crate::extract::opf::parser::PackageModel;
use crate::extract::sanitize::sanitize_embedded_content;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

static CSS_IMPORT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)@import[^;\n]*;?").unwrap());
static HTML_ENTRY: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\.x?html?$").unwrap());

/// 回退预览条目使用的ID与标签
pub const PREVIEW_ID: &str = "preview";

/// 输出的单个章节
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpineEntry {
    pub id: String,
    /// 清单中声明的原始href
    pub href: String,
    /// 清单项的properties（如 `nav`、`cover-image`），可为空
    pub label: String,
    /// 净化后的HTML
    pub content: String,
}

/// 组装结果
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BookViewData {
    pub metadata: BookMetadata,
    pub spine: Vec<SpineEntry>,
    pub styles: Vec<String>,
}

impl BookViewData {
    /// 没有任何可渲染内容
    pub fn is_empty(&self) -> bool {
        self.spine.is_empty()
    }

    /// 所有章节内容的长度（UTF-16码元）
    pub fn content_chars(&self) -> usize {
        self.spine.iter().map(|entry| content_len(&entry.content)).sum()
    }
}

/// 组装书籍视图
///
/// 章节数达到 `max_spine_entries` 或累计字符数超过 `max_content_chars` 后停止追加。
/// 脊柱没有产生任何条目时，使用归档中第一个HTML条目作为预览。
///
/// # 参数
/// * `archive` - 已打开的归档
/// * `package` - 包文档模型
/// * `config` - 提取配置
pub fn assemble(archive: &mut ArchiveHandle<'_>, package: &PackageModel, config: &ExtractionConfig) -> BookViewData {
    let metadata = BookMetadata::from_node(package.metadata.as_ref(), &config.metadata, &config.default_language);
    let styles = collect_styles(archive, package);
    let mut spine = collect_spine(archive, package, config);

    if spine.is_empty() {
        if let Some(entry) = preview_entry(archive) {
            info!(href = %entry.href, "spine produced no content, using first html entry");
            spine.push(entry);
        }
    }

    BookViewData { metadata, spine, styles }
}

fn collect_styles(archive: &mut ArchiveHandle<'_>, package: &PackageModel) -> Vec<String> {
    let mut styles = Vec::new();
    for item in package.stylesheets() {
        let path = package.archive_path(item);
        match archive.read_text(&path) {
            Ok(css) => styles.push(strip_css_imports(&css)),
            Err(e) => debug!(path = %path, "skipping unreadable stylesheet: {}", e),
        }
    }
    styles
}

fn collect_spine(archive: &mut ArchiveHandle<'_>, package: &PackageModel, config: &ExtractionConfig) -> Vec<SpineEntry> {
    let limits = &config.limits;
    let mut entries = Vec::new();
    let mut total_chars = 0usize;

    for item in package.spine_items() {
        if entries.len() >= limits.max_spine_entries || total_chars > limits.max_content_chars {
            info!(
                entries = entries.len(),
                chars = total_chars,
                "spine bound reached, remaining items skipped"
            );
            break;
        }

        if !item.is_markup() {
            debug!(id = %item.id, media_type = %item.media_type, "skipping non-markup spine item");
            continue;
        }

        let path = package.archive_path(item);
        let content = match archive.read_text(&path) {
            Ok(raw) => sanitize_embedded_content(&raw),
            Err(e) => {
                debug!(path = %path, "skipping unreadable spine item: {}", e);
                continue;
            }
        };
        if content.trim().is_empty() {
            debug!(path = %path, "skipping empty spine item");
            continue;
        }

        total_chars += content_len(&content);
        entries.push(SpineEntry {
            id: item.id.clone(),
            href: item.href.clone(),
            label: item.properties.clone().unwrap_or_default(),
            content,
        });
    }

    entries
}

/// 章节长度按UTF-16码元计算，与渲染端的字符串长度一致
fn content_len(content: &str) -> usize {
    content.encode_utf16().count()
}

/// 移除样式表中的 `@import` 指令
pub fn strip_css_imports(css: &str) -> String {
    CSS_IMPORT.replace_all(css, "").into_owned()
}

/// 归档中第一个HTML/XHTML条目的路径
pub fn find_html_entry(archive: &ArchiveHandle<'_>) -> Option<String> {
    archive
        .find_entries(|name| HTML_ENTRY.is_match(name))
        .into_iter()
        .next()
}

/// 读取第一个HTML条目并构造预览章节
///
/// # 返回值
/// * 找不到HTML条目、读取失败或净化后为空时返回 `None`
pub fn preview_entry(archive: &mut ArchiveHandle<'_>) -> Option<SpineEntry> {
    let path = find_html_entry(archive)?;
    let content = match archive.read_text(&path) {
        Ok(raw) => sanitize_embedded_content(&raw),
        Err(e) => {
            debug!(path = %path, "html entry unreadable: {}", e);
            return None;
        }
    };
    if content.trim().is_empty() {
        return None;
    }

    Some(SpineEntry {
        id: PREVIEW_ID.to_string(),
        href: path,
        label: PREVIEW_ID.to_string(),
        content,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::config::ExtractionLimits;
    use crate::extract::test_support::{build_zip, container_xml};

    fn package_with(manifest: &str, spine: &str) -> String {
        format!(
            r#"<package version="3.0"><metadata><dc:title>Book</dc:title></metadata>
<manifest>{}</manifest><spine>{}</spine></package>"#,
            manifest, spine
        )
    }

    fn assemble_zip(files: &[(&str, &str)], config: &ExtractionConfig) -> BookViewData {
        let data = build_zip(files);
        let mut archive = ArchiveHandle::open(&data).unwrap();
        let (_, opf) = files.iter().find(|(name, _)| name.ends_with(".opf")).unwrap();
        let package = PackageModel::parse("OEBPS/content.opf", opf).unwrap();
        assemble(&mut archive, &package, config)
    }

    #[test]
    fn test_assemble_spine_and_styles() {
        let opf = package_with(
            r#"<item id="ch1" href="ch1.html" media-type="application/xhtml+xml" properties="cover"/>
               <item id="img" href="a.png" media-type="image/png"/>
               <item id="ch2" href="Text/ch2.html" media-type="text/html"/>
               <item id="css1" href="style.css" media-type="text/css"/>"#,
            r#"<itemref idref="ch2"/><itemref idref="img"/><itemref idref="ch1"/>"#,
        );
        let container = container_xml("OEBPS/content.opf");
        let book = assemble_zip(
            &[
                ("META-INF/container.xml", container.as_str()),
                ("OEBPS/content.opf", opf.as_str()),
                ("OEBPS/ch1.html", "<p>one</p><script>x()</script>"),
                ("OEBPS/Text/ch2.html", "<p>two</p>"),
                ("OEBPS/style.css", "@import url(\"other.css\");\np { color: red; }"),
            ],
            &ExtractionConfig::default(),
        );

        assert_eq!(book.metadata.title, "Book");
        let ids: Vec<&str> = book.spine.iter().map(|entry| entry.id.as_str()).collect();
        assert_eq!(ids, vec!["ch2", "ch1"]);
        assert_eq!(book.spine[0].href, "Text/ch2.html");
        assert_eq!(book.spine[1].label, "cover");
        assert_eq!(book.spine[1].content, "<p>one</p>");
        assert_eq!(book.styles, vec!["\np { color: red; }".to_string()]);
    }

    #[test]
    fn test_missing_and_empty_entries_are_skipped() {
        let opf = package_with(
            r#"<item id="gone" href="gone.html" media-type="text/html"/>
               <item id="blank" href="blank.html" media-type="text/html"/>
               <item id="ok" href="ok.html" media-type="text/html"/>"#,
            r#"<itemref idref="gone"/><itemref idref="blank"/><itemref idref="ok"/>"#,
        );
        let book = assemble_zip(
            &[
                ("OEBPS/content.opf", opf.as_str()),
                ("OEBPS/blank.html", "  <script>only()</script> "),
                ("OEBPS/ok.html", "<p>ok</p>"),
            ],
            &ExtractionConfig::default(),
        );
        assert_eq!(book.spine.len(), 1);
        assert_eq!(book.spine[0].id, "ok");
    }

    #[test]
    fn test_entry_count_bound() {
        let mut files = Vec::new();
        let mut manifest = String::new();
        let mut spine = String::new();
        for i in 0..20 {
            manifest.push_str(&format!(r#"<item id="c{i}" href="c{i}.html" media-type="text/html"/>"#));
            spine.push_str(&format!(r#"<itemref idref="c{i}"/>"#));
            files.push((format!("OEBPS/c{i}.html"), format!("<p>chapter {i}</p>")));
        }
        let opf = package_with(&manifest, &spine);
        let mut refs: Vec<(&str, &str)> = files.iter().map(|(n, c)| (n.as_str(), c.as_str())).collect();
        refs.push(("OEBPS/content.opf", opf.as_str()));

        let book = assemble_zip(&refs, &ExtractionConfig::default());
        assert_eq!(book.spine.len(), 15);
        assert_eq!(book.spine[14].id, "c14");
    }

    #[test]
    fn test_character_bound() {
        let big = format!("<p>{}</p>", "a".repeat(120));
        let opf = package_with(
            r#"<item id="a" href="a.html" media-type="text/html"/>
               <item id="b" href="b.html" media-type="text/html"/>
               <item id="c" href="c.html" media-type="text/html"/>"#,
            r#"<itemref idref="a"/><itemref idref="b"/><itemref idref="c"/>"#,
        );
        let config = ExtractionConfig {
            limits: ExtractionLimits {
                max_content_chars: 200,
                ..ExtractionLimits::default()
            },
            ..ExtractionConfig::default()
        };
        let book = assemble_zip(
            &[
                ("OEBPS/content.opf", opf.as_str()),
                ("OEBPS/a.html", big.as_str()),
                ("OEBPS/b.html", big.as_str()),
                ("OEBPS/c.html", big.as_str()),
            ],
            &config,
        );
        // 第二章使累计长度越过上限，之后不再追加
        assert_eq!(book.spine.len(), 2);
        assert!(book.content_chars() > 200);
    }

    #[test]
    fn test_character_bound_counts_utf16_units() {
        let opf = package_with(
            r#"<item id="a" href="a.html" media-type="text/html"/>
               <item id="b" href="b.html" media-type="text/html"/>"#,
            r#"<itemref idref="a"/><itemref idref="b"/>"#,
        );
        let config = ExtractionConfig {
            limits: ExtractionLimits {
                max_content_chars: 8,
                ..ExtractionLimits::default()
            },
            ..ExtractionConfig::default()
        };
        // 5个字符，但占10个UTF-16码元
        let book = assemble_zip(
            &[
                ("OEBPS/content.opf", opf.as_str()),
                ("OEBPS/a.html", "😀😀😀😀😀"),
                ("OEBPS/b.html", "b"),
            ],
            &config,
        );
        assert_eq!(book.spine.len(), 1);
        assert_eq!(book.content_chars(), 10);
    }

    #[test]
    fn test_preview_fallback() {
        let opf = package_with(r#"<item id="css" href="s.css" media-type="text/css"/>"#, "");
        let book = assemble_zip(
            &[
                ("OEBPS/content.opf", opf.as_str()),
                ("OEBPS/s.css", "body{}"),
                ("OEBPS/notes.txt", "not html"),
                ("OEBPS/Text/intro.XHTML", "<p>intro</p><img src='x.png'>"),
            ],
            &ExtractionConfig::default(),
        );
        assert_eq!(book.spine.len(), 1);
        let entry = &book.spine[0];
        assert_eq!(entry.id, "preview");
        assert_eq!(entry.label, "preview");
        assert_eq!(entry.href, "OEBPS/Text/intro.XHTML");
        assert!(entry.content.starts_with("<p>intro</p><span class=\"image-placeholder\""));
        assert_eq!(book.styles, vec!["body{}".to_string()]);
    }

    #[test]
    fn test_strip_css_imports() {
        assert_eq!(strip_css_imports("@IMPORT 'a.css';b{}"), "b{}");
        assert_eq!(strip_css_imports("@import url(x.css)\nb{}"), "\nb{}");
    }
}
