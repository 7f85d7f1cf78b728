//! 校验器 - 业务能力层
//!
//! 全部是纯函数。语法题的修复不在这里发生，只通过 `repair_eligible` 告知调用方。

pub mod chart;
pub mod gap;
pub mod grammar;
pub mod listening;
pub mod set_pattern;
pub mod structural;

pub use chart::validate_chart;
pub use gap::validate_gap;
pub use grammar::{meta_is_well_formed, scan_markers, validate_grammar, GrammarReport, MarkerDialect, MarkerScan};
pub use listening::{rule_for, validate_listening, ListeningRule, ResponseLanguage};
pub use set_pattern::SetPatternValidator;
pub use structural::validate_structure;

use crate::models::{CanonicalItem, ItemCategory, ValidationOutcome};
use serde_json::Value;

/// 题型校验需要的外部信息
#[derive(Debug, Clone, Copy, Default)]
pub struct TypeCheckInput<'a> {
    /// 请求自带的原文（用于填空题一致性检查）
    pub drift_reference: Option<&'a str>,
    /// 图表数据
    pub chart_payload: Option<&'a Value>,
}

/// 题型校验报告
#[derive(Debug, Clone)]
pub struct TypeCheckReport {
    pub outcome: ValidationOutcome,
    pub repair_eligible: bool,
}

/// 按题型类别选择校验器
pub fn validate_type_specific(item: &CanonicalItem, input: TypeCheckInput<'_>) -> TypeCheckReport {
    let outcome = match item.item_type.category() {
        ItemCategory::Grammar => {
            let report = validate_grammar(item);
            return TypeCheckReport {
                outcome: report.outcome,
                repair_eligible: report.repair_eligible,
            };
        }
        ItemCategory::Gap => validate_gap(item, input.drift_reference),
        ItemCategory::Chart => validate_chart(item, input.chart_payload),
        ItemCategory::Listening => validate_listening(item),
        ItemCategory::Reading => ValidationOutcome::pass(),
    };
    TypeCheckReport {
        outcome,
        repair_eligible: false,
    }
}
