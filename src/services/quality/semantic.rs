//! 语义质量层（外部评审的结果）

use crate::models::{Grade, QualityScore, RegenerationTriggers};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 五个评审维度与各自满分
pub const DIMENSION_BUDGETS: [(&str, f64); 5] = [
    ("answer_validity", 30.0),
    ("distractor_quality", 25.0),
    ("discrimination", 20.0),
    ("type_appropriateness", 15.0),
    ("naturalness", 10.0),
];

/// 各维度得分，已按满分截断
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SemanticDimensions {
    pub answer_validity: f64,
    pub distractor_quality: f64,
    pub discrimination: f64,
    pub type_appropriateness: f64,
    pub naturalness: f64,
}

impl SemanticDimensions {
    pub fn total(&self) -> f64 {
        self.answer_validity
            + self.distractor_quality
            + self.discrimination
            + self.type_appropriateness
            + self.naturalness
    }
}

/// 一次语义评审
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SemanticJudgment {
    pub dimensions: SemanticDimensions,
    pub triggers: RegenerationTriggers,
    pub comment: Option<String>,
}

impl SemanticJudgment {
    /// 从评审回复的 JSON 对象中读取
    ///
    /// 触发条件可以放在 `regeneration_triggers` 对象里，也可以平铺在顶层。
    pub fn from_object(obj: &Map<String, Value>) -> Result<Self, String> {
        let mut scores = [0.0f64; 5];
        for (slot, (key, budget)) in scores.iter_mut().zip(DIMENSION_BUDGETS) {
            let value = obj
                .get(key)
                .and_then(Value::as_f64)
                .ok_or_else(|| format!("缺少评审维度 {}", key))?;
            *slot = value.clamp(0.0, budget);
        }
        let [answer_validity, distractor_quality, discrimination, type_appropriateness, naturalness] =
            scores;

        let triggers_value = obj
            .get("regeneration_triggers")
            .cloned()
            .unwrap_or_else(|| Value::Object(obj.clone()));
        let triggers: RegenerationTriggers =
            serde_json::from_value(triggers_value).map_err(|e| format!("触发条件格式错误: {}", e))?;

        Ok(Self {
            dimensions: SemanticDimensions {
                answer_validity,
                distractor_quality,
                discrimination,
                type_appropriateness,
                naturalness,
            },
            triggers,
            comment: obj.get("comment").and_then(Value::as_str).map(String::from),
        })
    }

    pub fn score(&self) -> f64 {
        self.dimensions.total()
    }

    pub fn grade(&self) -> Grade {
        Grade::from_score(self.score())
    }

    /// 需要重新生成时返回原因
    pub fn rejection_reason(&self) -> Option<String> {
        let active = self.triggers.active();
        if !active.is_empty() {
            return Some(format!("触发重新生成: {}", active.join(", ")));
        }
        if self.grade() == Grade::F {
            return Some(format!("语义评分 {:.1} 为 F 级", self.score()));
        }
        None
    }

    /// 把评审结果附加到质量评分上，不改变三层综合分
    pub fn apply_to(&self, score: &mut QualityScore) {
        score.semantic_score = Some(self.score());
        score.regeneration_triggers = self.triggers;
    }
}
