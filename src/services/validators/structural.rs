//! 结构校验：所有题型共有的字段

use crate::error::ValidationError;
use crate::models::{CanonicalItem, ValidationOutcome};
use crate::services::normalizer::{prompt_fix, CanonicalField, OPTION_COUNT};

/// 校验通用字段
///
/// 失败：题干为空、选项不是 5 个、答案不在 1–5。
/// 警告：超过一个空选项、原文为空、解析为空。
pub fn validate_structure(item: &CanonicalItem) -> ValidationOutcome {
    let mut outcome = ValidationOutcome::pass();

    if item.stem.trim().is_empty() {
        outcome.reject(ValidationError::MissingField {
            field: CanonicalField::Stem.name().to_string(),
        });
        suggest(&mut outcome, CanonicalField::Stem);
    }

    if item.options.len() != OPTION_COUNT {
        outcome.reject(ValidationError::ShapeMismatch {
            field: CanonicalField::Options.name().to_string(),
            detail: format!("期望 {} 个选项，实际 {} 个", OPTION_COUNT, item.options.len()),
        });
        suggest(&mut outcome, CanonicalField::Options);
    }

    if !(1..=OPTION_COUNT as u8).contains(&item.answer_index) {
        outcome.reject(ValidationError::OutOfRange {
            field: CanonicalField::Answer.name().to_string(),
            value: item.answer_index.to_string(),
        });
        suggest(&mut outcome, CanonicalField::Answer);
    }

    let empty_options = item.options.iter().filter(|o| o.trim().is_empty()).count();
    if empty_options > 1 {
        outcome.warn(format!("有 {} 个选项为空", empty_options));
    }
    if item.passage_text().trim().is_empty() {
        outcome.warn("原文为空");
    }
    if item.explanation.trim().is_empty() {
        outcome.warn("解析为空");
    }

    outcome
}

/// 修正建议同时写入诊断，第一条建议作为 `suggested_prompt_fix`
fn suggest(outcome: &mut ValidationOutcome, field: CanonicalField) {
    let fix = prompt_fix(field);
    outcome.diagnostics.push(fix.clone());
    if outcome.suggested_prompt_fix.is_none() {
        outcome.suggested_prompt_fix = Some(fix);
    }
}
