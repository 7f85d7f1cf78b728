//! 内容规则：答案范围、选项区分度、解析

use crate::models::CanonicalItem;
use crate::services::normalizer::OPTION_COUNT;
use std::collections::HashSet;

const ANSWER_WEIGHT: f64 = 0.40;
const DISTINCTNESS_WEIGHT: f64 = 0.35;
const EXPLANATION_WEIGHT: f64 = 0.25;

/// 解析至少要有的字符数
const MIN_EXPLANATION_CHARS: usize = 20;

pub fn answer_in_range_score(item: &CanonicalItem) -> f64 {
    let in_range = (1..=OPTION_COUNT).contains(&(item.answer_index as usize))
        && (item.answer_index as usize) <= item.options.len();
    if in_range {
        100.0
    } else {
        0.0
    }
}

/// 不重复选项占比（忽略大小写与空白）
pub fn distinctness_score(options: &[String]) -> f64 {
    if options.is_empty() {
        return 0.0;
    }
    let unique: HashSet<String> = options
        .iter()
        .map(|o| {
            o.chars()
                .filter(|c| !c.is_whitespace())
                .flat_map(char::to_lowercase)
                .collect()
        })
        .collect();
    100.0 * unique.len() as f64 / options.len() as f64
}

pub fn explanation_score(explanation: &str) -> f64 {
    match explanation.trim().chars().count() {
        0 => 0.0,
        n if n < MIN_EXPLANATION_CHARS => 50.0,
        _ => 100.0,
    }
}

pub fn content_rule_score(item: &CanonicalItem) -> f64 {
    ANSWER_WEIGHT * answer_in_range_score(item)
        + DISTINCTNESS_WEIGHT * distinctness_score(&item.options)
        + EXPLANATION_WEIGHT * explanation_score(&item.explanation)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_distinctness_ignores_case_and_space() {
        assert_eq!(distinctness_score(&strings(&["a", "b", "c", "d", "e"])), 100.0);
        assert_eq!(distinctness_score(&strings(&["Go home", "go  home", "c", "d", "e"])), 80.0);
    }

    #[test]
    fn test_explanation_tiers() {
        assert_eq!(explanation_score(""), 0.0);
        assert_eq!(explanation_score("Too short."), 50.0);
        assert_eq!(explanation_score("The third option is plural, so it is wrong."), 100.0);
    }
}
