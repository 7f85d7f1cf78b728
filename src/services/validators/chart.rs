//! 图表题校验（只检查结构）

use crate::error::TypeSpecificError;
use crate::models::{CanonicalItem, ValidationOutcome};
use crate::services::normalizer::OPTION_COUNT;
use serde_json::Value;

/// 校验图表题：5 个选项，且图表数据存在并非空
pub fn validate_chart(item: &CanonicalItem, payload: Option<&Value>) -> ValidationOutcome {
    let mut outcome = ValidationOutcome::pass();

    if item.options.len() != OPTION_COUNT {
        outcome.reject(TypeSpecificError::ChartShapeMismatch {
            detail: format!("期望 {} 个选项，实际 {} 个", OPTION_COUNT, item.options.len()),
        });
    }

    if !payload.is_some_and(payload_present) {
        outcome.reject(TypeSpecificError::ChartShapeMismatch {
            detail: "缺少图表数据".to_string(),
        });
    }

    outcome
}

fn payload_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
        _ => true,
    }
}
