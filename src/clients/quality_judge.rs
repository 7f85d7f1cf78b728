//! 基于 LLM 的语义质量评审

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use crate::clients::{ModelClient, QualityJudge};
use crate::error::CollaboratorError;
use crate::models::CanonicalItem;
use crate::services::normalizer::parse_object;
use crate::services::quality::SemanticJudgment;

const SYSTEM: &str = "You review multiple-choice English test items. Reply with one JSON object only.";

pub struct LlmQualityJudge {
    model: Arc<dyn ModelClient>,
}

impl LlmQualityJudge {
    pub fn new(model: Arc<dyn ModelClient>) -> Self {
        Self { model }
    }

    fn instruction(item: &CanonicalItem) -> String {
        let options = item
            .options
            .iter()
            .enumerate()
            .map(|(i, o)| format!("{}. {}", i + 1, o))
            .collect::<Vec<_>>()
            .join("\n");
        format!(
            "Item type {} ({}).
Passage:
{}

Question: {}
Options:
{}
Keyed answer: {}
Explanation: {}

Score the item with integer points:
\"answer_validity\" (0-30), \"distractor_quality\" (0-25), \"discrimination\" (0-20),
\"type_appropriateness\" (0-15), \"naturalness\" (0-10).
Also return \"regeneration_triggers\" with booleans: \"multiple_correct_answers\", \"weak_distractors\",
\"answer_copied_from_passage\", \"too_easy\", \"type_mismatch\", \"insufficient_distractor_diversity\".
Optionally add a short \"comment\".",
            item.item_type.code(),
            item.item_type.name(),
            item.passage_text(),
            item.stem,
            options,
            item.answer_index,
            item.explanation,
        )
    }
}

#[async_trait]
impl QualityJudge for LlmQualityJudge {
    async fn judge(&self, item: &CanonicalItem) -> Result<SemanticJudgment, CollaboratorError> {
        let reply = self
            .model
            .invoke(SYSTEM, &Self::instruction(item))
            .await
            .map_err(|e| CollaboratorError::QualityJudge {
                message: e.to_string(),
            })?;

        let obj = parse_object(&reply).map_err(|e| CollaboratorError::QualityJudge {
            message: e.to_string(),
        })?;
        let judgment = SemanticJudgment::from_object(&obj)
            .map_err(|message| CollaboratorError::QualityJudge { message })?;

        debug!(
            "语义评审: {:.1} 分, 触发: {:?}",
            judgment.score(),
            judgment.triggers.active()
        );
        Ok(judgment)
    }
}
