//! 响应规范化器 - 业务能力层
//!
//! 只负责"模型原始文本 → CanonicalItem"，纯函数，没有副作用。
//!
//! 处理顺序：
//! 1. 截取第一个完整的 JSON 对象（`json_scan`）
//! 2. 修复裸露的圆圈数字
//! 3. 解析为 `serde_json::Value`
//! 4. 多题容器 → 按题号选择子项
//! 5. 按别名表提取各规范字段，转换原文结构，补齐选项，解析答案

pub mod aliases;
pub mod json_scan;
pub mod passage;

pub use aliases::{prompt_fix, resolve, CanonicalField};
pub use json_scan::{circled_digit, extract_object_region, repair_bare_glyphs};
pub use passage::{coerce_passage, PassageBody, PassageShape};

use crate::error::{PipelineError, StageResult, ValidationError};
use crate::models::{CanonicalItem, ChartMeta, GrammarMetaEntry, ItemCategory, ItemType, TypeSpecificMeta};
use crate::services::text;
use serde_json::{Map, Value};
use tracing::debug;

/// 固定的选项数量
pub const OPTION_COUNT: usize = 5;

/// 规范化一次模型回复
///
/// # 参数
/// - `raw`: 模型原始文本
/// - `item_type`: 请求的题型
/// - `selector`: 多题容器中要选取的题号，缺省时使用 `item_type` 的编码
pub fn normalize(raw: &str, item_type: ItemType, selector: Option<u8>) -> StageResult<CanonicalItem> {
    let root = parse_object(raw)?;
    let obj = select_sub_item(root, selector.unwrap_or(item_type.code()))?;
    build_item(&obj, item_type)
}

/// 截取并解析回复中的 JSON 对象
pub fn parse_object(raw: &str) -> StageResult<Map<String, Value>> {
    let region = extract_object_region(raw)?;
    let repaired = repair_bare_glyphs(region);

    match serde_json::from_str::<Value>(&repaired) {
        Ok(Value::Object(obj)) => Ok(obj),
        Ok(_) => Err(PipelineError::parse("顶层不是 JSON 对象", &repaired)),
        Err(e) => Err(PipelineError::parse(format!("JSON 语法错误: {}", e), &repaired)),
    }
}

/// 多题容器：按题号选择子项，找不到则取第一个
///
/// 子项缺少的字段从容器外层继承（例如套题共享的原文）。
fn select_sub_item(mut root: Map<String, Value>, selector: u8) -> StageResult<Map<String, Value>> {
    let Some(container_key) = aliases::CONTAINER_KEYS
        .iter()
        .find(|key| matches!(root.get(**key), Some(Value::Array(_))))
    else {
        return Ok(root);
    };

    let Some(Value::Array(items)) = root.remove(*container_key) else {
        return Ok(root);
    };
    if items.is_empty() {
        return Err(PipelineError::parse("多题容器为空", container_key));
    }

    let position = items
        .iter()
        .position(|item| declared_number(item) == Some(selector))
        .unwrap_or_else(|| {
            debug!("多题容器中没有题号 {}，使用第一个子项", selector);
            0
        });

    let Some(Value::Object(mut selected)) = items.into_iter().nth(position) else {
        return Err(PipelineError::parse("多题容器的子项不是 JSON 对象", container_key));
    };

    for (key, value) in root {
        selected.entry(key).or_insert(value);
    }
    Ok(selected)
}

fn declared_number(item: &Value) -> Option<u8> {
    let obj = item.as_object()?;
    aliases::NUMBER_KEYS
        .iter()
        .find_map(|key| obj.get(*key))
        .and_then(number_from_value)
}

fn number_from_value(value: &Value) -> Option<u8> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| u8::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn build_item(obj: &Map<String, Value>, item_type: ItemType) -> StageResult<CanonicalItem> {
    let stem = resolve(obj, CanonicalField::Stem)
        .map(|(_, v)| coerce_passage(v))
        .unwrap_or_default();

    let passage = resolve(obj, CanonicalField::Passage).map(|(_, v)| coerce_passage(v));

    let options = normalize_options(resolve(obj, CanonicalField::Options))?;
    let answer_index = normalize_answer(resolve(obj, CanonicalField::Answer))?;

    let explanation = resolve(obj, CanonicalField::Explanation)
        .map(|(_, v)| coerce_passage(v))
        .unwrap_or_default();

    let blank_passage = match resolve(obj, CanonicalField::BlankPassage) {
        Some((_, v)) => Some(coerce_passage(v)),
        None => passage.clone().filter(|p| text::has_blank(p)),
    };

    let meta = match item_type.category() {
        ItemCategory::Grammar => TypeSpecificMeta::Grammar {
            entries: grammar_entries(resolve(obj, CanonicalField::GrammarMeta).map(|(_, v)| v)),
        },
        ItemCategory::Chart => TypeSpecificMeta::Chart(chart_meta(
            resolve(obj, CanonicalField::Chart).map(|(_, v)| v),
        )),
        _ => TypeSpecificMeta::None,
    };

    let auxiliary = obj
        .iter()
        .filter(|(key, _)| !is_consumed(key, item_type))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    Ok(CanonicalItem {
        item_type,
        stem,
        passage,
        blank_passage,
        options,
        answer_index,
        explanation,
        meta,
        auxiliary,
    })
}

/// 规范字段（以及本题型用到的元数据字段）不进入辅助字段
fn is_consumed(key: &str, item_type: ItemType) -> bool {
    let fields: &[CanonicalField] = match item_type.category() {
        ItemCategory::Grammar => &[CanonicalField::GrammarMeta],
        ItemCategory::Chart => &[CanonicalField::Chart],
        _ => &[],
    };
    [
        CanonicalField::Stem,
        CanonicalField::Passage,
        CanonicalField::BlankPassage,
        CanonicalField::Options,
        CanonicalField::Answer,
        CanonicalField::Explanation,
    ]
    .iter()
    .chain(fields)
    .any(|field| field.aliases().contains(&key))
}

/// 选项：超过 5 个截断，不足 5 个用空串补齐（补齐由结构校验器报告）
fn normalize_options(found: Option<(&'static str, &Value)>) -> StageResult<Vec<String>> {
    let Some((key, value)) = found else {
        return Ok(vec![String::new(); OPTION_COUNT]);
    };

    let mut options: Vec<String> = match value {
        Value::Array(items) => items.iter().map(option_text).collect(),
        Value::Object(map) => map.values().map(option_text).collect(),
        Value::String(s) => s
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect(),
        other => {
            return Err(ValidationError::ShapeMismatch {
                field: key.to_string(),
                detail: format!("期望数组或对象，实际为 {}", other),
            }
            .into())
        }
    };

    options.truncate(OPTION_COUNT);
    options.resize(OPTION_COUNT, String::new());
    Ok(options)
}

fn option_text(value: &Value) -> String {
    match value {
        Value::Object(obj) => ["text", "option", "content", "value"]
            .iter()
            .find_map(|k| obj.get(*k))
            .map(coerce_passage)
            .unwrap_or_else(|| coerce_passage(value)),
        other => coerce_passage(other),
    }
}

/// 答案：1–5 的整数原样通过；字符串取第一个 1–5 数字（或圆圈数字）
fn normalize_answer(found: Option<(&'static str, &Value)>) -> StageResult<u8> {
    let Some((key, value)) = found else {
        return Err(ValidationError::MissingField {
            field: CanonicalField::Answer.name().to_string(),
        }
        .into());
    };

    let parsed = match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0 && *f >= 0.0).map(|f| f as u64))
            .and_then(|n| u8::try_from(n).ok()),
        Value::String(s) => answer_digit(s),
        _ => None,
    };

    parsed
        .filter(|n| (1..=OPTION_COUNT as u8).contains(n))
        .ok_or_else(|| {
            ValidationError::OutOfRange {
                field: key.to_string(),
                value: value.to_string(),
            }
            .into()
        })
}

/// 字符串中第一个 1–5 的数字
pub fn answer_digit(s: &str) -> Option<u8> {
    s.chars().find_map(|c| match c {
        '1'..='5' => c.to_digit(10).map(|d| d as u8),
        _ => circled_digit(c),
    })
}

fn grammar_entries(value: Option<&Value>) -> Vec<GrammarMetaEntry> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(Value::as_object)
        .map(|entry| GrammarMetaEntry {
            index: ["index", "number", "position", "no"]
                .iter()
                .find_map(|k| entry.get(*k))
                .and_then(|v| match v {
                    Value::String(s) => answer_digit(s),
                    other => number_from_value(other),
                }),
            is_correct: ["is_correct", "correct", "grammatical"]
                .iter()
                .find_map(|k| entry.get(*k))
                .and_then(correctness_flag),
            explanation: ["explanation", "reason"]
                .iter()
                .find_map(|k| entry.get(*k))
                .map(coerce_passage)
                .unwrap_or_default(),
        })
        .collect()
}

fn correctness_flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "o" | "yes" | "correct" => Some(true),
            "false" | "x" | "no" | "incorrect" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn chart_meta(value: Option<&Value>) -> ChartMeta {
    ChartMeta {
        data: value.cloned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grammar() -> ItemType {
        ItemType::GRAMMAR
    }

    fn reading() -> ItemType {
        ItemType::new(22).unwrap()
    }

    #[test]
    fn test_glyph_answer_scenario() {
        let raw = r#"{"question":"Q?","options":["a","b","c","d","e"],"answer":"③"}"#;
        let item = normalize(raw, reading(), None).unwrap();
        assert_eq!(item.answer_index, 3);
        assert_eq!(item.stem, "Q?");
        assert_eq!(item.options, vec!["a", "b", "c", "d", "e"]);
    }

    #[test]
    fn test_bare_glyph_answer() {
        let raw = r#"{"question":"Q?","options":["① a","② b","③ c","④ d","⑤ e"],"answer":④}"#;
        let item = normalize(raw, reading(), None).unwrap();
        assert_eq!(item.answer_index, 4);
        assert_eq!(item.options[0], "① a");
    }

    #[test]
    fn test_answer_forms() {
        let opts = r#""options":["a","b","c","d","e"]"#;
        for (answer, expected) in [("2", 2), ("\"Answer: 5\"", 5), ("1.0", 1), ("\"(4)\"", 4)] {
            let raw = format!(r#"{{"question":"Q",{},"answer":{}}}"#, opts, answer);
            assert_eq!(normalize(&raw, reading(), None).unwrap().answer_index, expected);
        }
    }

    #[test]
    fn test_answer_out_of_range_and_missing() {
        let raw = r#"{"question":"Q","options":["a","b","c","d","e"],"answer":7}"#;
        assert!(matches!(
            normalize(raw, reading(), None),
            Err(PipelineError::Validation(ValidationError::OutOfRange { .. }))
        ));
        let raw = r#"{"question":"Q","options":["a","b","c","d","e"],"answer":"none"}"#;
        assert!(matches!(
            normalize(raw, reading(), None),
            Err(PipelineError::Validation(ValidationError::OutOfRange { .. }))
        ));
        let raw = r#"{"question":"Q","options":["a","b","c","d","e"]}"#;
        assert!(matches!(
            normalize(raw, reading(), None),
            Err(PipelineError::Validation(ValidationError::MissingField { .. }))
        ));
    }

    #[test]
    fn test_options_truncated_and_padded() {
        let raw = r#"{"question":"Q","choices":["a","b","c","d","e","f"],"answer":1}"#;
        assert_eq!(normalize(raw, reading(), None).unwrap().options.len(), 5);

        let raw = r#"{"question":"Q","options":["a","b","c"],"answer":1}"#;
        let item = normalize(raw, reading(), None).unwrap();
        assert_eq!(item.options, vec!["a", "b", "c", "", ""]);

        // 没有选项字段时同样补齐，由结构校验器报告
        let raw = r#"{"question":"Q","answer":1}"#;
        let item = normalize(raw, reading(), None).unwrap();
        assert_eq!(item.options, vec![String::new(); 5]);
        let outcome = crate::services::validators::validate_structure(&item);
        assert!(outcome.passed);
        assert!(outcome.diagnostics.iter().any(|d| d.contains("5 个选项为空")));
    }

    #[test]
    fn test_options_as_objects_and_map() {
        let raw = r#"{"question":"Q","options":[{"text":"a"},{"text":"b"},"c",4,{"label":"e"}],"answer":1}"#;
        let item = normalize(raw, reading(), None).unwrap();
        assert_eq!(item.options, vec!["a", "b", "c", "4", "e"]);

        let raw = r#"{"question":"Q","options":{"1":"a","2":"b","3":"c","4":"d","5":"e"},"answer":1}"#;
        assert_eq!(
            normalize(raw, reading(), None).unwrap().options,
            vec!["a", "b", "c", "d", "e"]
        );
    }

    #[test]
    fn test_option_map_keeps_written_order() {
        let raw = r#"{"question":"Q","options":{"first":"a","second":"b","third":"c","fourth":"d","fifth":"e"},"answer":1}"#;
        let item = normalize(raw, reading(), None).unwrap();
        assert_eq!(item.options, vec!["a", "b", "c", "d", "e"]);
        assert_eq!(item.options[item.answer_index as usize - 1], "a");
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            normalize("sorry, I cannot help", reading(), None),
            Err(PipelineError::Parse { .. })
        ));
        match normalize(r#"{"question": "Q", oops}"#, reading(), None) {
            Err(PipelineError::Parse { fragment, .. }) => assert!(fragment.starts_with("{\"question\"")),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_container_selects_matching_number() {
        let raw = r#"{
            "passage": "Shared passage.",
            "questions": [
                {"question_number": 41, "question": "Title?", "options": ["a","b","c","d","e"], "answer": 1},
                {"question_number": 42, "question": "Word?", "options": ["a","b","c","d","e"], "answer": 2}
            ]
        }"#;
        let item = normalize(raw, ItemType::new(42).unwrap(), None).unwrap();
        assert_eq!(item.stem, "Word?");
        assert_eq!(item.answer_index, 2);
        // 外层原文被子项继承
        assert_eq!(item.passage.as_deref(), Some("Shared passage."));

        let item = normalize(raw, ItemType::new(43).unwrap(), None).unwrap();
        assert_eq!(item.stem, "Title?");

        let item = normalize(raw, ItemType::new(41).unwrap(), Some(42)).unwrap();
        assert_eq!(item.stem, "Word?");
    }

    #[test]
    fn test_empty_container_is_parse_error() {
        assert!(matches!(
            normalize(r#"{"questions": []}"#, reading(), None),
            Err(PipelineError::Parse { .. })
        ));
    }

    #[test]
    fn test_blank_passage_auto_detected() {
        let raw = r#"{"question":"Q","passage":"He ___ home.","options":["a","b","c","d","e"],"answer":1}"#;
        let item = normalize(raw, ItemType::new(31).unwrap(), None).unwrap();
        assert_eq!(item.blank_passage.as_deref(), Some("He ___ home."));
        assert_eq!(item.passage, item.blank_passage);

        let raw = r#"{"question":"Q","passage":"He went home.","options":["a","b","c","d","e"],"answer":1}"#;
        let item = normalize(raw, ItemType::new(31).unwrap(), None).unwrap();
        assert!(item.blank_passage.is_none());
    }

    #[test]
    fn test_structured_passage_and_auxiliary() {
        let raw = r#"{
            "question": "Order?",
            "passage": {"intro": "Start.", "sentences": {"B": "Bee.", "A": "Ay."}},
            "options": ["a","b","c","d","e"],
            "answer": 2,
            "vocabulary": [{"word": "ay", "meaning": "yes"}],
            "render_hint": "two-column"
        }"#;
        let item = normalize(raw, ItemType::new(36).unwrap(), None).unwrap();
        assert_eq!(item.passage.as_deref(), Some("Start.\n(A) Ay.\n(B) Bee."));
        assert!(item.auxiliary.contains_key("vocabulary"));
        assert!(item.auxiliary.contains_key("render_hint"));
        assert!(!item.auxiliary.contains_key("question"));
    }

    #[test]
    fn test_grammar_meta_parsed() {
        let raw = r#"{
            "question": "Which is wrong?",
            "passage": "text",
            "options": ["1","2","3","4","5"],
            "answer": 3,
            "grammar_meta": [
                {"index": 1, "is_correct": true, "explanation": "ok"},
                {"index": "②", "correct": "O"},
                {"index": 3, "is_correct": false, "explanation": "should be 'were'"},
                {"number": 4, "is_correct": true},
                {"index": 5}
            ]
        }"#;
        let item = normalize(raw, grammar(), None).unwrap();
        let entries = item.meta.grammar_entries().unwrap();
        assert_eq!(entries.len(), 5);
        assert_eq!(entries[1].index, Some(2));
        assert_eq!(entries[1].is_correct, Some(true));
        assert_eq!(entries[2].is_correct, Some(false));
        assert_eq!(entries[3].index, Some(4));
        assert_eq!(entries[4].is_correct, None);
        assert!(!item.auxiliary.contains_key("grammar_meta"));
    }

    #[test]
    fn test_well_formed_inputs_hold_invariants() {
        let answers = ["1", "2", "3", "4", "5", "\"1\"", "\"no. 2\"", "\"③\"", "\"⑤번\""];
        for answer in answers {
            let raw = format!(
                r#"noise {{"stem":"S","options":["a","b","c","d","e"],"answer":{}}} noise"#,
                answer
            );
            let item = normalize(&raw, reading(), None).unwrap();
            assert_eq!(item.options.len(), 5);
            assert!((1..=5).contains(&item.answer_index));
        }
    }

    #[test]
    fn test_passage_renormalization_is_identity() {
        let raw = r#"{"question":"Q","passage":["One.","Two."],"options":["a","b","c","d","e"],"answer":1}"#;
        let item = normalize(raw, reading(), None).unwrap();
        let passage = item.passage.clone().unwrap();
        assert_eq!(coerce_passage(&Value::String(passage.clone())), passage);
    }
}
