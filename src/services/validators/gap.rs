//! 填空题校验

use crate::error::{TypeSpecificError, ValidationError};
use crate::models::{CanonicalItem, ValidationOutcome};
use crate::services::normalizer::{prompt_fix, CanonicalField};
use crate::services::text;

/// 校验填空题
///
/// `drift_reference` 只有在请求自带原文时才是 `Some`，否则跳过一致性检查。
///
/// 一致性检查是去掉空格后的子串比较：挖掉的是中间的单个词时，前后文本不再连续，
/// 所以这种情况必然报告 `PassageDrift`。
pub fn validate_gap(item: &CanonicalItem, drift_reference: Option<&str>) -> ValidationOutcome {
    let blank_passage = item.blank_passage.as_deref().unwrap_or("");
    if blank_passage.trim().is_empty() {
        let mut outcome = ValidationOutcome::fail(ValidationError::MissingField {
            field: CanonicalField::BlankPassage.name().to_string(),
        });
        outcome.suggested_prompt_fix = Some(prompt_fix(CanonicalField::BlankPassage));
        return outcome;
    }

    let mut outcome = ValidationOutcome::pass();
    let found = text::count_blanks(blank_passage);
    if found != 1 {
        outcome.reject(TypeSpecificError::BlankCountMismatch { found });
    }

    if let Some(original) = drift_reference {
        let stripped = text::normalize_whitespace(&text::strip_blanks(blank_passage));
        let original = text::normalize_whitespace(original);
        if !original.contains(&stripped) {
            outcome.reject(TypeSpecificError::PassageDrift);
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use crate::models::{ItemType, TypeSpecificMeta};

    fn item(blank_passage: Option<&str>) -> CanonicalItem {
        CanonicalItem {
            item_type: ItemType::new(31).unwrap(),
            stem: "Fill in the blank.".to_string(),
            passage: blank_passage.map(String::from),
            blank_passage: blank_passage.map(String::from),
            options: vec!["a", "b", "c", "d", "e"].into_iter().map(String::from).collect(),
            answer_index: 1,
            explanation: String::new(),
            meta: TypeSpecificMeta::None,
            auxiliary: Default::default(),
        }
    }

    #[test]
    fn test_missing_blank_passage() {
        let outcome = validate_gap(&item(None), None);
        assert!(!outcome.passed);
        assert!(outcome.suggested_prompt_fix.is_some());
    }

    #[test]
    fn test_exactly_one_blank() {
        assert!(validate_gap(&item(Some("He ___ home.")), None).passed);
        assert!(validate_gap(&item(Some("He (BLANK) home.")), None).passed);

        let outcome = validate_gap(&item(Some("He ___ home ___.")), None);
        assert_eq!(
            outcome.error,
            Some(PipelineError::TypeSpecific(TypeSpecificError::BlankCountMismatch { found: 2 }))
        );
        assert!(!validate_gap(&item(Some("He went home.")), None).passed);
    }

    #[test]
    fn test_interior_blank_reports_drift() {
        let original = "The cat sat on the mat and looked at the bird.";
        let blanked = item(Some("The cat sat on the mat and ___ at the bird."));
        let outcome = validate_gap(&blanked, Some(original));
        assert!(!outcome.passed);
        assert_eq!(
            outcome.error,
            Some(PipelineError::TypeSpecific(TypeSpecificError::PassageDrift))
        );
    }

    #[test]
    fn test_trailing_blank_passes_drift() {
        let original = "The cat sat on   the mat and looked at the bird.";
        let blanked = item(Some("The cat sat on the mat and looked at the ___"));
        assert!(validate_gap(&blanked, Some(original)).passed);
    }

    #[test]
    fn test_drift_skipped_without_supplied_passage() {
        let blanked = item(Some("An entirely different text with a ___ in it."));
        assert!(validate_gap(&blanked, None).passed);
    }
}
