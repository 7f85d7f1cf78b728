//! 字段别名表
//!
//! 每个规范字段有一组按优先级排列的来源键，第一个存在（且非 null）的键生效。
//! 同一张表也是 `suggested_prompt_fix` 的词汇来源。

use serde_json::{Map, Value};

/// 多题容器的键
pub const CONTAINER_KEYS: &[&str] = &["questions", "items", "problems"];

/// 容器子项声明题号的键
pub const NUMBER_KEYS: &[&str] = &["question_number", "number", "item_type", "no"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanonicalField {
    Stem,
    Passage,
    BlankPassage,
    Options,
    Answer,
    Explanation,
    GrammarMeta,
    Chart,
}

impl CanonicalField {
    pub fn name(self) -> &'static str {
        match self {
            CanonicalField::Stem => "stem",
            CanonicalField::Passage => "passage",
            CanonicalField::BlankPassage => "blank_passage",
            CanonicalField::Options => "options",
            CanonicalField::Answer => "answer",
            CanonicalField::Explanation => "explanation",
            CanonicalField::GrammarMeta => "grammar_meta",
            CanonicalField::Chart => "chart",
        }
    }

    /// 来源键，按优先级排列；第一个即推荐给生成器的键名
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            CanonicalField::Stem => &["question", "stem", "question_text", "prompt"],
            CanonicalField::Passage => &["passage", "text", "script", "transcript", "stimulus"],
            CanonicalField::BlankPassage => &[
                "gapped_passage",
                "blank_passage",
                "passage_with_blank",
                "blanked_passage",
            ],
            CanonicalField::Options => &["options", "choices", "answer_options"],
            CanonicalField::Answer => &["correct_answer", "answer", "answer_index", "correct"],
            CanonicalField::Explanation => &["explanation", "rationale", "solution", "commentary"],
            CanonicalField::GrammarMeta => {
                &["grammar_meta", "underlines", "markers", "marker_meta"]
            }
            CanonicalField::Chart => &["chart", "chart_data", "graph"],
        }
    }

    pub fn preferred_key(self) -> &'static str {
        self.aliases()[0]
    }
}

/// 按别名优先级查找字段，返回命中的键与值
pub fn resolve<'a>(
    obj: &'a Map<String, Value>,
    field: CanonicalField,
) -> Option<(&'static str, &'a Value)> {
    field
        .aliases()
        .iter()
        .find_map(|key| match obj.get(*key) {
            Some(Value::Null) | None => None,
            Some(value) => Some((*key, value)),
        })
}

/// 生成给上游提示词的修正建议
pub fn prompt_fix(field: CanonicalField) -> String {
    format!(
        "请使用字段 \"{}\" 输出 {} (可识别的键: {})",
        field.preferred_key(),
        field.name(),
        field.aliases().join(", ")
    )
}
