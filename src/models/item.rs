use crate::models::item_type::ItemType;
use serde::Serialize;
use serde_json::{Map, Value};

/// 规范化后的题目
///
/// 由规范化器建立 `options.len() == 5` 与 `answer_index ∈ [1, 5]` 两条不变式，
/// 下游组件可以直接依赖。字段保持公开，结构校验器仍会再检查一次。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalItem {
    pub item_type: ItemType,
    pub stem: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blank_passage: Option<String>,
    /// 顺序即选项顺序
    pub options: Vec<String>,
    /// 1-based
    pub answer_index: u8,
    pub explanation: String,
    pub meta: TypeSpecificMeta,
    /// 未识别的辅助字段（词汇提示、图表数据、渲染提示等），原样保留
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub auxiliary: Map<String, Value>,
}

impl CanonicalItem {
    pub fn passage_text(&self) -> &str {
        self.passage.as_deref().unwrap_or("")
    }
}

/// 题型专属元数据
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TypeSpecificMeta {
    Grammar { entries: Vec<GrammarMetaEntry> },
    Chart(ChartMeta),
    None,
}

impl TypeSpecificMeta {
    pub fn grammar_entries(&self) -> Option<&[GrammarMetaEntry]> {
        match self {
            TypeSpecificMeta::Grammar { entries } => Some(entries),
            _ => None,
        }
    }
}

/// 语法题的一个标记位置
///
/// 字段保持可选，由校验器报告缺失。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GrammarMetaEntry {
    pub index: Option<u8>,
    pub is_correct: Option<bool>,
    pub explanation: String,
}

/// 图表题元数据
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartMeta {
    /// 模型在回复中嵌入的图表数据
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}
