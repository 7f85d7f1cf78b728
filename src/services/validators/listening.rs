//! 听力题格式校验
//!
//! 按子题型查规则表：发言轮数、说话人标记、选项语言。只做计数与标记检查。

use crate::error::TypeSpecificError;
use crate::models::{CanonicalItem, ValidationOutcome};
use crate::services::text;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;
use std::ops::RangeInclusive;

static SPEAKER_TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*([MW])\s*:").expect("valid speaker regex"));

/// 选项语言
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseLanguage {
    English,
    Korean,
}

/// 一个听力子题型的格式规则
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListeningRule {
    pub turns: RangeInclusive<usize>,
    /// 至少出现的不同说话人数量
    pub min_speakers: usize,
    pub language: ResponseLanguage,
}

/// 查规则表，非听力题型返回 `None`
pub fn rule_for(code: u8) -> Option<ListeningRule> {
    let rule = match code {
        1..=2 => ListeningRule {
            turns: 2..=4,
            min_speakers: 2,
            language: ResponseLanguage::English,
        },
        3..=12 => ListeningRule {
            turns: 4..=14,
            min_speakers: 2,
            language: ResponseLanguage::Korean,
        },
        13..=15 => ListeningRule {
            turns: 4..=14,
            min_speakers: 2,
            language: ResponseLanguage::English,
        },
        16..=17 => ListeningRule {
            turns: 1..=3,
            min_speakers: 1,
            language: ResponseLanguage::English,
        },
        _ => return None,
    };
    Some(rule)
}

pub fn validate_listening(item: &CanonicalItem) -> ValidationOutcome {
    let Some(rule) = rule_for(item.item_type.code()) else {
        return ValidationOutcome::pass();
    };

    let script = item.passage_text();
    if script.trim().is_empty() {
        return ValidationOutcome::fail(mismatch("缺少听力脚本".to_string()));
    }

    let mut outcome = ValidationOutcome::pass();
    let tags: Vec<&str> = SPEAKER_TAG_RE
        .captures_iter(script)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect();

    if !rule.turns.contains(&tags.len()) {
        outcome.reject(mismatch(format!(
            "发言轮数 {} 不在 {}-{} 之间",
            tags.len(),
            rule.turns.start(),
            rule.turns.end()
        )));
    }

    let speakers: BTreeSet<&str> = tags.iter().copied().collect();
    if speakers.len() < rule.min_speakers {
        outcome.reject(mismatch(format!(
            "需要 {} 个说话人 (M:/W:)，实际 {} 个",
            rule.min_speakers,
            speakers.len()
        )));
    }

    let wrong_language = item
        .options
        .iter()
        .filter(|o| !o.trim().is_empty())
        .filter(|o| match rule.language {
            ResponseLanguage::Korean => !text::contains_hangul(o),
            ResponseLanguage::English => text::contains_hangul(o),
        })
        .count();
    if wrong_language > 0 {
        let expected = match rule.language {
            ResponseLanguage::Korean => "韩语",
            ResponseLanguage::English => "英语",
        };
        outcome.reject(mismatch(format!("{} 个选项不是{}", wrong_language, expected)));
    }

    outcome
}

fn mismatch(detail: String) -> TypeSpecificError {
    TypeSpecificError::ListeningFormatMismatch { detail }
}
