//! 文本统计与占位符识别

use once_cell::sync::Lazy;
use regex::Regex;

/// 空格占位：连续 3 个以上下划线，或括号包裹的 BLANK
pub static BLANK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)_{3,}|\(\s*blank\s*\)").expect("valid blank regex"));

static SENTENCE_END_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[.!?]+(\s+|$)").expect("valid sentence regex"));

/// 文本中是否带有空格占位
pub fn has_blank(text: &str) -> bool {
    BLANK_RE.is_match(text)
}

pub fn count_blanks(text: &str) -> usize {
    BLANK_RE.find_iter(text).count()
}

/// 去掉空格占位
pub fn strip_blanks(text: &str) -> String {
    BLANK_RE.replace_all(text, "").into_owned()
}

/// 折叠所有空白为单个空格并去掉首尾空白
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// 词数（至少包含一个字母或数字的词）
pub fn word_count(text: &str) -> usize {
    text.split_whitespace()
        .filter(|w| w.chars().any(char::is_alphanumeric))
        .count()
}

/// 句子数（至少算一句）
pub fn sentence_count(text: &str) -> usize {
    SENTENCE_END_RE
        .split(text)
        .filter(|s| word_count(s) > 0)
        .count()
        .max(1)
}

/// 是否包含韩文
pub fn contains_hangul(text: &str) -> bool {
    text.chars()
        .any(|c| matches!(c, '\u{AC00}'..='\u{D7A3}' | '\u{1100}'..='\u{11FF}' | '\u{3130}'..='\u{318F}'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_detection() {
        assert!(has_blank("He ___ home."));
        assert!(has_blank("He (BLANK) home."));
        assert!(has_blank("He ( blank ) home."));
        assert!(!has_blank("snake__case"));
        assert_eq!(count_blanks("___ and _____"), 2);
    }

    #[test]
    fn test_counts() {
        assert_eq!(word_count("One two, three - four."), 4);
        assert_eq!(sentence_count("One. Two! Three? Four"), 4);
        assert_eq!(sentence_count(""), 1);
        assert_eq!(normalize_whitespace("  a \n b\t c "), "a b c");
    }

    #[test]
    fn test_hangul() {
        assert!(contains_hangul("남자의 의견"));
        assert!(!contains_hangul("The man's opinion"));
    }
}
