//! 语法题标记修复 - 业务能力层
//!
//! 只在标记数量不是 5、但元数据完整时调用一次模型，请它按元数据补上标记。
//! 修复失败不升级为错误，调用方按原样继续校验。

use serde_json::{json, Value};

use crate::clients::ModelClient;
use crate::models::{CanonicalItem, GrammarMetaEntry};
use crate::services::normalizer::{coerce_passage, parse_object, resolve, CanonicalField};
use crate::services::validators::grammar::{scan_markers, MarkerDialect, MARKER_COUNT};

const SYSTEM: &str = "You edit English grammar test passages. Reply with one JSON object only.";

/// 修复结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepairOutcome {
    /// 修复后的原文恰好有 5 个标记
    Repaired { passage: String },
    /// 未采用修复，原文保持不变
    NotApplied { reason: String },
}

impl RepairOutcome {
    fn not_applied(reason: impl Into<String>) -> Self {
        RepairOutcome::NotApplied {
            reason: reason.into(),
        }
    }
}

/// 组装修复指令
pub fn repair_instruction(passage: &str, entries: &[GrammarMetaEntry], dialect: MarkerDialect) -> String {
    let marker_hint = match dialect {
        MarkerDialect::TaggedSpan => "<u>word</u>",
        MarkerDialect::CircledNumeral => "①word",
        MarkerDialect::ParenthesizedNumber => "(1)word",
        MarkerDialect::DoubleUnderscore => "__word__",
        MarkerDialect::BracketedNumber => "[1]word",
    };
    let meta = Value::Array(
        entries
            .iter()
            .map(|e| {
                json!({
                    "index": e.index,
                    "is_correct": e.is_correct,
                    "explanation": e.explanation,
                })
            })
            .collect(),
    );

    format!(
        "Insert the five markers at the positions implied by these meta entries; change nothing else.
Marker style: {}
Meta entries:
{}

Passage:
{}

Reply with JSON: {{\"passage\": \"<passage with exactly five markers>\"}}",
        marker_hint, meta, passage
    )
}

/// 调用一次模型修复标记
pub async fn repair_markers(model: &dyn ModelClient, item: &CanonicalItem) -> RepairOutcome {
    let Some(entries) = item.meta.grammar_entries() else {
        return RepairOutcome::not_applied("没有语法元数据");
    };
    let dialect = scan_markers(item.passage_text())
        .dialect
        .unwrap_or(MarkerDialect::TaggedSpan);

    let instruction = repair_instruction(item.passage_text(), entries, dialect);
    let reply = match model.invoke(SYSTEM, &instruction).await {
        Ok(reply) => reply,
        Err(e) => return RepairOutcome::not_applied(e.to_string()),
    };

    let obj = match parse_object(&reply) {
        Ok(obj) => obj,
        Err(e) => return RepairOutcome::not_applied(e.to_string()),
    };
    let Some((_, value)) = resolve(&obj, CanonicalField::Passage) else {
        return RepairOutcome::not_applied("回复中没有 passage 字段");
    };

    let passage = coerce_passage(value);
    let scan = scan_markers(&passage);
    if scan.count != MARKER_COUNT {
        return RepairOutcome::not_applied(format!("修复后仍有 {} 个标记", scan.count));
    }
    RepairOutcome::Repaired { passage }
}
