//! 内容净化模块
//!
//! 移除可执行脚本、把无法解析的图片替换为占位元素，并规范化纯文本。

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use scraper::{ElementRef, Html, Selector, node::Node};

static SCRIPT_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<script\b[^>]*>.*?</script[^>]*>").unwrap());
/// 成对删除之后残留的孤立标签或未闭合的片段
static SCRIPT_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)</?script[^>]*>?").unwrap());
static IMG_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)<img\b(?:[^>"']|"[^"]*"|'[^']*')*>"#).unwrap());
static IMG_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("img").unwrap());
static BODY_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("body").unwrap());

static LINE_ENDINGS: Lazy<Regex> =
    Lazy::new(|| Regex::new("\r\n?|\u{0085}|\u{2028}|\u{2029}").unwrap());
static HORIZONTAL_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]{2,}").unwrap());
static EXCESS_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n(?:[ \t]*\n){3,}").unwrap());

/// 移除所有 `<script>…</script>` 块
///
/// 大小写不敏感，不关心脚本内容。重复执行直到结果不再变化，
/// 因此输出中不会残留任何 `<script` 子串，且再次调用结果相同。
pub fn sanitize_markup(html: &str) -> String {
    let mut current = html.to_string();
    loop {
        let without_blocks = SCRIPT_BLOCK.replace_all(&current, "");
        let next = SCRIPT_TAG.replace_all(&without_blocks, "").into_owned();
        if next == current {
            return next;
        }
        current = next;
    }
}

/// 在 [`sanitize_markup`] 的基础上替换所有 `<img>` 标签
///
/// 有非空 `alt` 的图片替换为携带转义后alt文本的占位元素，否则替换为对辅助技术隐藏的空占位。
pub fn sanitize_embedded_content(html: &str) -> String {
    let without_scripts = sanitize_markup(html);
    IMG_TAG
        .replace_all(&without_scripts, |caps: &Captures| image_placeholder(&caps[0]))
        .into_owned()
}

fn image_placeholder(tag: &str) -> String {
    match image_alt(tag) {
        Some(alt) => {
            let alt = escape_html(&alt);
            format!(
                r#"<span class="image-placeholder" role="img" aria-label="{}">{}</span>"#,
                alt, alt
            )
        }
        None => r#"<span class="image-placeholder" aria-hidden="true"></span>"#.to_string(),
    }
}

fn image_alt(tag: &str) -> Option<String> {
    let fragment = Html::parse_fragment(tag);
    let img = fragment.select(&IMG_SELECTOR).next()?;
    img.value()
        .attr("alt")
        .map(str::trim)
        .filter(|alt| !alt.is_empty())
        .map(str::to_string)
}

/// HTML转义
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// 规范化纯文本
///
/// 1. 所有换行变体统一为 `\n`
/// 2. 除换行和制表符外的ASCII控制字符替换为空格
/// 3. 连续的水平空白折叠为一个空格
/// 4. 三个及以上的连续空行折叠为一个空行
pub fn sanitize_plain_text(text: &str) -> String {
    let unified = LINE_ENDINGS.replace_all(text, "\n");

    let printable: String = unified
        .chars()
        .map(|c| {
            if c.is_ascii_control() && c != '\n' && c != '\t' {
                ' '
            } else {
                c
            }
        })
        .collect();

    let collapsed = HORIZONTAL_RUN.replace_all(&printable, " ");
    EXCESS_BLANK_LINES.replace_all(&collapsed, "\n\n").into_owned()
}

/// 把HTML转换为便于终端阅读的纯文本
///
/// 只处理body中的内容，跳过脚本、样式与媒体元素，块级元素之间以换行分隔。
pub fn markup_to_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut result = String::new();
    match document.select(&BODY_SELECTOR).next() {
        Some(body) => collect_text(body, &mut result),
        None => collect_text(document.root_element(), &mut result),
    }
    sanitize_plain_text(&result).trim().to_string()
}

fn collect_text(element: ElementRef, result: &mut String) {
    let tag_name = element.value().name();
    if matches!(
        tag_name,
        "head" | "script" | "style" | "meta" | "link" | "title" | "noscript" | "img" | "svg" | "video"
            | "audio" | "canvas" | "object" | "iframe"
    ) {
        return;
    }

    for node in element.children() {
        match node.value() {
            Node::Text(text) => result.push_str(text),
            Node::Element(_) => {
                if let Some(child) = ElementRef::wrap(node) {
                    collect_text(child, result);
                }
            }
            _ => {}
        }
    }

    if matches!(
        tag_name,
        "div" | "p" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "li" | "br" | "tr" | "section"
    ) {
        result.push('\n');
    }
}
