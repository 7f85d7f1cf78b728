use crate::models::item_type::ItemType;
use serde::{Deserialize, Serialize};

/// 生成请求
///
/// 流水线开始后不再修改。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub id: String,
    pub item_type: ItemType,
    /// 外部（人工）提供的原文
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supplied_passage: Option<String>,
    #[serde(default)]
    pub difficulty_hint: String,
    #[serde(default)]
    pub topic_hint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart_ref: Option<String>,
}

impl GenerationRequest {
    pub fn new(id: impl Into<String>, item_type: ItemType) -> Self {
        Self {
            id: id.into(),
            item_type,
            supplied_passage: None,
            difficulty_hint: String::new(),
            topic_hint: String::new(),
            set_id: None,
            chart_ref: None,
        }
    }

    pub fn with_passage(mut self, passage: impl Into<String>) -> Self {
        self.supplied_passage = Some(passage.into());
        self
    }

    pub fn with_hints(mut self, topic: impl Into<String>, difficulty: impl Into<String>) -> Self {
        self.topic_hint = topic.into();
        self.difficulty_hint = difficulty.into();
        self
    }

    pub fn with_set_id(mut self, set_id: impl Into<String>) -> Self {
        self.set_id = Some(set_id.into());
        self
    }

    pub fn with_chart_ref(mut self, chart_ref: impl Into<String>) -> Self {
        self.chart_ref = Some(chart_ref.into());
        self
    }
}

/// 原文来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PassageOrigin {
    /// 请求携带（人工或外部提供），挖空题需要做漂移检查
    Supplied,
    /// 由题源服务生成，跳过漂移检查
    Provisioned,
}

/// 一次流水线运行所使用的原文
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Passage {
    pub text: String,
    pub origin: PassageOrigin,
}

impl Passage {
    pub fn supplied(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            origin: PassageOrigin::Supplied,
        }
    }

    pub fn provisioned(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            origin: PassageOrigin::Provisioned,
        }
    }

    /// 只有外部提供的原文才作为漂移检查的基准
    pub fn drift_reference(&self) -> Option<&str> {
        match self.origin {
            PassageOrigin::Supplied => Some(&self.text),
            PassageOrigin::Provisioned => None,
        }
    }
}
