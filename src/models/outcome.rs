//! 校验、评分与流水线结果

use crate::error::PipelineError;
use crate::models::item::CanonicalItem;
use crate::models::item_type::ItemType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 校验结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationOutcome {
    pub passed: bool,
    /// 按发现顺序排列的诊断信息（失败原因与警告）
    pub diagnostics: Vec<String>,
    /// 提示上游生成器应使用的规范字段名
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_prompt_fix: Option<String>,
    /// 失败时的类型化原因
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<PipelineError>,
}

impl ValidationOutcome {
    pub fn pass() -> Self {
        Self {
            passed: true,
            diagnostics: Vec::new(),
            suggested_prompt_fix: None,
            error: None,
        }
    }

    pub fn fail(error: impl Into<PipelineError>) -> Self {
        let error = error.into();
        Self {
            passed: false,
            diagnostics: vec![error.to_string()],
            suggested_prompt_fix: None,
            error: Some(error),
        }
    }

    /// 记录警告，不改变通过状态
    pub fn warn(&mut self, message: impl Into<String>) {
        self.diagnostics.push(message.into());
    }

    /// 记录失败；保留第一个失败原因作为类型化错误
    pub fn reject(&mut self, error: impl Into<PipelineError>) {
        let error = error.into();
        self.passed = false;
        self.diagnostics.push(error.to_string());
        if self.error.is_none() {
            self.error = Some(error);
        }
    }
}

/// 质量等级
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
    F,
}

impl Grade {
    pub fn from_score(score: f64) -> Self {
        match score {
            s if s >= 90.0 => Grade::A,
            s if s >= 80.0 => Grade::B,
            s if s >= 70.0 => Grade::C,
            s if s >= 60.0 => Grade::D,
            _ => Grade::F,
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::F => "F",
        };
        f.write_str(s)
    }
}

/// 审核建议
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Recommendation {
    Approve,
    Review,
    Reject,
}

/// 语义质量层给出的重新生成触发条件
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegenerationTriggers {
    pub multiple_correct_answers: bool,
    pub weak_distractors: bool,
    pub answer_copied_from_passage: bool,
    pub too_easy: bool,
    pub type_mismatch: bool,
    pub insufficient_distractor_diversity: bool,
}

impl RegenerationTriggers {
    pub fn any(&self) -> bool {
        !self.active().is_empty()
    }

    /// 已触发条件的名称
    pub fn active(&self) -> Vec<&'static str> {
        [
            (self.multiple_correct_answers, "multiple_correct_answers"),
            (self.weak_distractors, "weak_distractors"),
            (self.answer_copied_from_passage, "answer_copied_from_passage"),
            (self.too_easy, "too_easy"),
            (self.type_mismatch, "type_mismatch"),
            (
                self.insufficient_distractor_diversity,
                "insufficient_distractor_diversity",
            ),
        ]
        .into_iter()
        .filter_map(|(on, name)| on.then_some(name))
        .collect()
    }
}

/// 质量评分
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityScore {
    pub structural_score: f64,
    pub corpus_fit_score: f64,
    pub content_rule_score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub semantic_score: Option<f64>,
    pub final_score: f64,
    pub grade: Grade,
    pub recommendation: Recommendation,
    pub regeneration_triggers: RegenerationTriggers,
    /// 表现不佳的评分层（REVIEW 时填写）
    pub review_flags: Vec<String>,
}

/// 单次尝试的结论
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AttemptOutcome {
    Accepted,
    Rejected { error: PipelineError },
}

/// 单次尝试的审计记录，写入后不再修改
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttemptRecord {
    pub attempt_number: u32,
    pub raw_response: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canonical_item: Option<CanonicalItem>,
    pub outcome: AttemptOutcome,
    pub diagnostics: Vec<String>,
    pub repair_applied: bool,
    pub timestamp: DateTime<Utc>,
}

impl AttemptRecord {
    pub fn is_accepted(&self) -> bool {
        matches!(self.outcome, AttemptOutcome::Accepted)
    }
}

/// 终态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FinalStatus {
    Success,
    Failed,
}

/// 单个请求的最终结果，每个请求只写一次
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineResult {
    pub request_id: String,
    pub item_type: ItemType,
    pub final_status: FinalStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canonical_item: Option<CanonicalItem>,
    pub attempts: Vec<AttemptRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality_score: Option<QualityScore>,
    /// 失败时的最后一条诊断
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_diagnostic: Option<String>,
}

impl PipelineResult {
    pub fn is_success(&self) -> bool {
        self.final_status == FinalStatus::Success
    }
}

/// 套题的整体结论（仅供参考，不改变成员终态）
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SetVerdict {
    pub passed: bool,
    pub diagnostics: Vec<String>,
    pub preflight_diagnostics: Vec<String>,
    pub failed_members: Vec<String>,
}

/// 套题结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SetResult {
    pub set_id: String,
    pub members: Vec<PipelineResult>,
    pub verdict: SetVerdict,
}
