//! 纯文本回退提取
//!
//! 结构化解析失败时，把原始字节按UTF-8与Latin-1分别解码，选出看起来像真实文本的结果。

use crate::extract::config::{ExtractionLimits, TextHeuristics};
use crate::extract::sanitize::sanitize_plain_text;
use encoding_rs::mem::decode_latin1;
use tracing::debug;

/// 截断后追加的标记
pub const TRUNCATION_MARKER: char = '…';

/// 判断文本是否"有意义"
///
/// 要求：去除首尾空白后至少 `min_text_len` 个字符；字母至少 `min_letter_count` 个；
/// 替换字符占总长度的比例不超过 `max_replacement_ratio`。
pub fn is_meaningful_text(text: &str, heuristics: &TextHeuristics) -> bool {
    let trimmed_len = text.trim().chars().count();
    if trimmed_len < heuristics.min_text_len {
        return false;
    }

    let mut total = 0usize;
    let mut letters = 0usize;
    let mut replacements = 0usize;
    for ch in text.chars() {
        total += 1;
        if ch.is_alphabetic() {
            letters += 1;
        } else if ch == char::REPLACEMENT_CHARACTER {
            replacements += 1;
        }
    }

    letters >= heuristics.min_letter_count
        && (replacements as f64) <= heuristics.max_replacement_ratio * total as f64
}

/// 按字符数截断，超长时追加省略标记
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => {
            let mut truncated = text[..byte_index].to_string();
            truncated.push(TRUNCATION_MARKER);
            truncated
        }
        None => text.to_string(),
    }
}

/// 从任意字节中提取可读文本
///
/// 先按UTF-8解码并净化；不满足有意义文本判定时再按Latin-1解码。
/// 两种候选中通过判定的取较长者；都不通过时返回空字符串。
///
/// # 参数
/// * `buffer` - 原始字节
/// * `heuristics` - 文本判定阈值
/// * `limits` - 截断长度
pub fn extract_readable_text(buffer: &[u8], heuristics: &TextHeuristics, limits: &ExtractionLimits) -> String {
    let utf8 = sanitize_plain_text(&String::from_utf8_lossy(buffer));
    let best = if is_meaningful_text(&utf8, heuristics) {
        Some(utf8)
    } else {
        let latin1 = sanitize_plain_text(&decode_latin1(buffer));
        debug!(
            utf8_chars = utf8.chars().count(),
            latin1_chars = latin1.chars().count(),
            "utf-8 decoding not meaningful, trying latin-1"
        );
        [utf8, latin1]
            .into_iter()
            .filter(|candidate| is_meaningful_text(candidate, heuristics))
            .max_by_key(|candidate| candidate.chars().count())
    };

    match best {
        Some(text) => truncate_chars(text.trim(), limits.max_text_chars),
        None => String::new(),
    }
}
