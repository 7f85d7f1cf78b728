//! 质量评分 - 业务能力层
//!
//! 三个必选评分层各自独立计算（0–100）：
//! - 结构层：结构校验通过为 100，否则为 0（硬门槛）
//! - 语料贴合层：见 `corpus_fit`
//! - 内容规则层：见 `content_rule`
//!
//! 可选的语义层只影响重试决策，不参与综合分。

pub mod content_rule;
pub mod corpus_fit;
pub mod semantic;

pub use semantic::{SemanticDimensions, SemanticJudgment, DIMENSION_BUDGETS};

use crate::config::{Config, WordCountTarget};
use crate::models::{CanonicalItem, Grade, QualityScore, Recommendation, RegenerationTriggers};
use crate::services::validators::validate_structure;

const STRUCTURAL_WEIGHT: f64 = 0.40;
const CORPUS_FIT_WEIGHT: f64 = 0.35;
const CONTENT_RULE_WEIGHT: f64 = 0.25;

/// 结构层失败时的分数上限
pub const STRUCTURAL_FAIL_CAP: f64 = 40.0;
const STRUCTURAL_FAIL_FRACTION: f64 = 0.2;

pub const APPROVE_THRESHOLD: f64 = 85.0;
pub const REVIEW_THRESHOLD: f64 = 65.0;
/// 低于此分的评分层会出现在 REVIEW 标记中
const LAYER_FLAG_THRESHOLD: f64 = 75.0;

/// 质量评分器
#[derive(Debug, Clone)]
pub struct QualityScorer {
    /// 下标为题型编码
    targets: Vec<WordCountTarget>,
}

impl QualityScorer {
    pub fn new(config: &Config) -> Self {
        Self {
            targets: (0..=crate::models::ItemType::MAX)
                .map(|code| config.word_count_target(code))
                .collect(),
        }
    }

    pub fn target(&self, code: u8) -> WordCountTarget {
        self.targets
            .get(code as usize)
            .copied()
            .unwrap_or_else(|| crate::config::default_word_count_target(code))
    }

    /// 计算三层评分、等级与建议
    pub fn score(&self, item: &CanonicalItem) -> QualityScore {
        let structural_passed = validate_structure(item).passed;
        let structural_score = if structural_passed { 100.0 } else { 0.0 };
        let corpus_fit_score = corpus_fit::corpus_fit_score(item, self.target(item.item_type.code()));
        let content_rule_score = content_rule::content_rule_score(item);

        let final_score = if structural_passed {
            STRUCTURAL_WEIGHT * structural_score
                + CORPUS_FIT_WEIGHT * corpus_fit_score
                + CONTENT_RULE_WEIGHT * content_rule_score
        } else {
            (STRUCTURAL_FAIL_FRACTION * (corpus_fit_score + content_rule_score)).min(STRUCTURAL_FAIL_CAP)
        };

        let recommendation = if !structural_passed {
            Recommendation::Reject
        } else if final_score >= APPROVE_THRESHOLD {
            Recommendation::Approve
        } else if final_score >= REVIEW_THRESHOLD {
            Recommendation::Review
        } else {
            Recommendation::Reject
        };

        let review_flags = if recommendation == Recommendation::Review {
            review_flags(corpus_fit_score, content_rule_score)
        } else {
            Vec::new()
        };

        QualityScore {
            structural_score,
            corpus_fit_score,
            content_rule_score,
            semantic_score: None,
            final_score,
            grade: Grade::from_score(final_score),
            recommendation,
            regeneration_triggers: RegenerationTriggers::default(),
            review_flags,
        }
    }
}

impl Default for QualityScorer {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}

fn review_flags(corpus_fit: f64, content_rule: f64) -> Vec<String> {
    let layers = [("corpus_fit", corpus_fit), ("content_rule", content_rule)];
    let mut flags: Vec<String> = layers
        .iter()
        .filter(|(_, score)| *score < LAYER_FLAG_THRESHOLD)
        .map(|(name, score)| format!("{} 偏低 ({:.1})", name, score))
        .collect();
    if flags.is_empty() {
        let (name, score) = if corpus_fit <= content_rule { layers[0] } else { layers[1] };
        flags.push(format!("{} 偏低 ({:.1})", name, score));
    }
    flags
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ItemType, TypeSpecificMeta};

    /// 22 号题型默认目标词数为 (100, 150, 210)
    fn item(words: usize, explanation: &str) -> CanonicalItem {
        let sentence = "Students often study together in the library after their classes end for the day.";
        let per_sentence = sentence.split_whitespace().count();
        let passage = std::iter::repeat(sentence)
            .take(words / per_sentence)
            .collect::<Vec<_>>()
            .join(" ");
        CanonicalItem {
            item_type: ItemType::new(22).unwrap(),
            stem: "What is the main idea?".to_string(),
            passage: Some(passage),
            blank_passage: None,
            options: vec!["one", "two", "three", "four", "five"].into_iter().map(String::from).collect(),
            answer_index: 2,
            explanation: explanation.to_string(),
            meta: TypeSpecificMeta::None,
            auxiliary: Default::default(),
        }
    }

    const LONG_EXPLANATION: &str = "The passage repeatedly says students study together.";

    #[test]
    fn test_ideal_item_is_approved() {
        // 14 词/句，10 句 = 140 词
        let score = QualityScorer::default().score(&item(140, LONG_EXPLANATION));
        assert_eq!(score.structural_score, 100.0);
        assert!(score.final_score >= APPROVE_THRESHOLD, "{score:?}");
        assert_eq!(score.recommendation, Recommendation::Approve);
        assert!(score.review_flags.is_empty());
    }

    #[test]
    fn test_short_passage_goes_to_review_with_flag() {
        // 28 词：词数得分为 0
        let score = QualityScorer::default().score(&item(28, LONG_EXPLANATION));
        assert_eq!(score.recommendation, Recommendation::Review);
        assert!(score.review_flags[0].starts_with("corpus_fit"));
    }

    #[test]
    fn test_answer_out_of_range_never_approves() {
        for answer in [0u8, 6, 9, 255] {
            let mut bad = item(140, LONG_EXPLANATION);
            bad.answer_index = answer;
            let score = QualityScorer::default().score(&bad);
            assert_eq!(score.structural_score, 0.0);
            assert!(score.final_score <= STRUCTURAL_FAIL_CAP);
            assert_eq!(score.recommendation, Recommendation::Reject);
            assert_eq!(score.grade, Grade::F);
        }
    }

    #[test]
    fn test_configured_targets_are_used() {
        let mut config = Config::default();
        config
            .word_count_targets
            .insert("22".to_string(), WordCountTarget::new(10, 28, 60));
        let scorer = QualityScorer::new(&config);
        assert_eq!(scorer.target(22), WordCountTarget::new(10, 28, 60));
        let score = scorer.score(&item(28, LONG_EXPLANATION));
        assert_eq!(score.recommendation, Recommendation::Approve);
    }
}
