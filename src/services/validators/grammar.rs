//! 语法题（下划线标记）校验
//!
//! 原文中的 5 个标记可能使用多种写法，按固定优先级尝试，第一个有匹配的写法即为检测结果。

use crate::error::TypeSpecificError;
use crate::models::{CanonicalItem, GrammarMetaEntry, ValidationOutcome};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

/// 需要的标记数量
pub const MARKER_COUNT: usize = 5;

static TAGGED_SPAN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<u>.+?</u>").expect("valid regex"));
static CIRCLED_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[①②③④⑤]").expect("valid regex"));
static PAREN_NUMBER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\([1-5]\)").expect("valid regex"));
static DOUBLE_UNDERSCORE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"__[^_\s](?:[^_]*[^_\s])?__").expect("valid regex"));
static BRACKET_NUMBER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[[1-5]\]").expect("valid regex"));

/// 标记写法
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerDialect {
    /// `<u>word</u>`
    TaggedSpan,
    /// `①word`
    CircledNumeral,
    /// `(1)word`
    ParenthesizedNumber,
    /// `__word__`
    DoubleUnderscore,
    /// `[1]word`
    BracketedNumber,
}

impl MarkerDialect {
    pub const PRIORITY: [MarkerDialect; 5] = [
        MarkerDialect::TaggedSpan,
        MarkerDialect::CircledNumeral,
        MarkerDialect::ParenthesizedNumber,
        MarkerDialect::DoubleUnderscore,
        MarkerDialect::BracketedNumber,
    ];

    fn regex(self) -> &'static Regex {
        match self {
            MarkerDialect::TaggedSpan => &TAGGED_SPAN_RE,
            MarkerDialect::CircledNumeral => &CIRCLED_RE,
            MarkerDialect::ParenthesizedNumber => &PAREN_NUMBER_RE,
            MarkerDialect::DoubleUnderscore => &DOUBLE_UNDERSCORE_RE,
            MarkerDialect::BracketedNumber => &BRACKET_NUMBER_RE,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            MarkerDialect::TaggedSpan => "tagged_span",
            MarkerDialect::CircledNumeral => "circled_numeral",
            MarkerDialect::ParenthesizedNumber => "parenthesized_number",
            MarkerDialect::DoubleUnderscore => "double_underscore",
            MarkerDialect::BracketedNumber => "bracketed_number",
        }
    }

    pub fn count(self, text: &str) -> usize {
        self.regex().find_iter(text).count()
    }
}

impl fmt::Display for MarkerDialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 标记扫描结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkerScan {
    pub dialect: Option<MarkerDialect>,
    pub count: usize,
}

impl MarkerScan {
    pub fn is_complete(&self) -> bool {
        self.count == MARKER_COUNT
    }
}

/// 检测原文使用的标记写法与数量
pub fn scan_markers(text: &str) -> MarkerScan {
    MarkerDialect::PRIORITY
        .iter()
        .map(|d| (*d, d.count(text)))
        .find(|(_, count)| *count > 0)
        .map(|(dialect, count)| MarkerScan {
            dialect: Some(dialect),
            count,
        })
        .unwrap_or(MarkerScan {
            dialect: None,
            count: 0,
        })
}

/// 元数据结构是否完整：5 项，每项都有序号与正误标记
pub fn meta_is_well_formed(entries: &[GrammarMetaEntry]) -> bool {
    entries.len() == MARKER_COUNT
        && entries
            .iter()
            .all(|e| e.index.is_some() && e.is_correct.is_some())
}

/// 语法题校验报告
#[derive(Debug, Clone)]
pub struct GrammarReport {
    pub outcome: ValidationOutcome,
    pub scan: MarkerScan,
    /// 标记数量不符但元数据完整，可以尝试修复
    pub repair_eligible: bool,
}

/// 校验语法题
pub fn validate_grammar(item: &CanonicalItem) -> GrammarReport {
    let mut outcome = ValidationOutcome::pass();
    let scan = scan_markers(item.passage_text());
    let entries = item.meta.grammar_entries().unwrap_or(&[]);

    if !scan.is_complete() {
        outcome.reject(TypeSpecificError::MarkerCountMismatch {
            dialect: scan.dialect.map(|d| d.name()).unwrap_or("none").to_string(),
            found: scan.count,
        });
    }

    if let Err(detail) = check_meta(entries) {
        outcome.reject(TypeSpecificError::GrammarMetaMismatch { detail });
    } else if let Some(wrong) = entries.iter().find(|e| e.is_correct == Some(false)) {
        if wrong.index != Some(item.answer_index) {
            outcome.warn(format!(
                "答案 {} 与元数据中的错误位置 {:?} 不一致",
                item.answer_index, wrong.index
            ));
        }
    }

    GrammarReport {
        repair_eligible: !scan.is_complete() && meta_is_well_formed(entries),
        outcome,
        scan,
    }
}

fn check_meta(entries: &[GrammarMetaEntry]) -> Result<(), String> {
    if entries.len() != MARKER_COUNT {
        return Err(format!("需要 {} 项元数据，实际 {} 项", MARKER_COUNT, entries.len()));
    }
    if let Some(pos) = entries.iter().position(|e| e.index.is_none()) {
        return Err(format!("第 {} 项缺少序号", pos + 1));
    }
    if let Some(pos) = entries.iter().position(|e| e.is_correct.is_none()) {
        return Err(format!("第 {} 项缺少正误标记", pos + 1));
    }
    let incorrect = entries
        .iter()
        .filter(|e| e.is_correct == Some(false))
        .count();
    if incorrect != 1 {
        return Err(format!("应恰好有 1 项标记为错误，实际 {} 项", incorrect));
    }
    Ok(())
}
