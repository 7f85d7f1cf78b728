//! 原文结构的统一表示
//!
//! 模型返回的原文可能是纯文本、片段数组，或 `{intro, sentences}` 结构
//! （sentences 为数组或 标号→句子 的映射）。统一转换为纯文本；转换结果
//! 再次转换保持不变。

use serde_json::{Map, Value};
use std::collections::BTreeMap;

const INTRO_KEYS: &[&str] = &["intro", "introduction", "lead"];
const BODY_KEYS: &[&str] = &["sentences", "paragraphs", "body", "parts"];

#[derive(Debug, Clone, PartialEq)]
pub enum PassageShape {
    Text(String),
    Fragments(Vec<String>),
    Structured {
        intro: Option<String>,
        body: PassageBody,
    },
    Unknown(Value),
}

#[derive(Debug, Clone, PartialEq)]
pub enum PassageBody {
    Ordered(Vec<String>),
    Labeled(BTreeMap<String, String>),
    Empty,
}

impl PassageShape {
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::String(s) => PassageShape::Text(s.clone()),
            Value::Array(items) => PassageShape::Fragments(items.iter().map(flatten).collect()),
            Value::Object(obj) => Self::from_object(obj).unwrap_or_else(|| PassageShape::Unknown(value.clone())),
            other => PassageShape::Unknown(other.clone()),
        }
    }

    fn from_object(obj: &Map<String, Value>) -> Option<Self> {
        let intro = first_of(obj, INTRO_KEYS);
        let body = first_of(obj, BODY_KEYS);
        if intro.is_none() && body.is_none() {
            return None;
        }

        let body = match body {
            None => PassageBody::Empty,
            Some(Value::Array(items)) => PassageBody::Ordered(items.iter().map(flatten).collect()),
            Some(Value::Object(map)) => {
                PassageBody::Labeled(map.iter().map(|(k, v)| (k.clone(), flatten(v))).collect())
            }
            Some(Value::String(s)) => PassageBody::Ordered(vec![s.clone()]),
            Some(_) => return None,
        };

        Some(PassageShape::Structured {
            intro: intro.map(flatten),
            body,
        })
    }

    /// 渲染为纯文本
    pub fn render(&self) -> String {
        let rendered = match self {
            PassageShape::Text(s) => s.clone(),
            PassageShape::Fragments(parts) => join_spaced(parts),
            PassageShape::Structured { intro, body } => {
                let mut lines = Vec::new();
                if let Some(intro) = intro.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
                    lines.push(intro.to_string());
                }
                match body {
                    PassageBody::Ordered(parts) => {
                        let joined = join_spaced(parts);
                        if !joined.is_empty() {
                            lines.push(joined);
                        }
                    }
                    PassageBody::Labeled(map) => {
                        lines.extend(
                            map.iter()
                                .map(|(label, text)| format!("({}) {}", label.trim(), text.trim())),
                        );
                    }
                    PassageBody::Empty => {}
                }
                lines.join("\n")
            }
            PassageShape::Unknown(value) => flatten(value),
        };
        rendered.trim().to_string()
    }
}

/// 把任意原文值转换为纯文本
pub fn coerce_passage(value: &Value) -> String {
    PassageShape::from_value(value).render()
}

fn first_of<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .find_map(|k| obj.get(*k).filter(|v| !v.is_null()))
}

fn join_spaced(parts: &[String]) -> String {
    parts
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// 尽力把任意值转成文本：收集所有字符串叶子，按出现顺序用空格连接
fn flatten(value: &Value) -> String {
    fn collect(value: &Value, out: &mut Vec<String>) {
        match value {
            Value::Null => {}
            Value::String(s) => {
                let s = s.trim();
                if !s.is_empty() {
                    out.push(s.to_string());
                }
            }
            Value::Array(items) => items.iter().for_each(|v| collect(v, out)),
            Value::Object(map) => map.values().for_each(|v| collect(v, out)),
            other => out.push(other.to_string()),
        }
    }

    let mut out = Vec::new();
    collect(value, &mut out);
    out.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plain_text() {
        assert_eq!(coerce_passage(&json!("  Hello world.  ")), "Hello world.");
    }

    #[test]
    fn test_fragments_join_with_spaces() {
        assert_eq!(coerce_passage(&json!(["First.", " Second. ", ""])), "First. Second.");
    }

    #[test]
    fn test_labeled_map_sorted_by_label() {
        let value = json!({
            "intro": "Read the text.",
            "sentences": {"C": "Third.", "A": "First.", "B": "Second."}
        });
        assert_eq!(
            coerce_passage(&value),
            "Read the text.\n(A) First.\n(B) Second.\n(C) Third."
        );
    }

    #[test]
    fn test_ordered_list_with_intro() {
        let value = json!({"intro": "Intro.", "sentences": ["One.", "Two."]});
        assert_eq!(coerce_passage(&value), "Intro.\nOne. Two.");
    }

    #[test]
    fn test_unknown_object_best_effort() {
        let value = json!({"alpha": "A text", "beta": {"gamma": "nested"}});
        assert_eq!(coerce_passage(&value), "A text nested");
        assert_eq!(coerce_passage(&json!(42)), "42");
    }

    #[test]
    fn test_coercion_is_idempotent() {
        let shapes = [
            json!("  padded  "),
            json!(["a", "b"]),
            json!({"intro": "I", "sentences": {"2": "two", "1": "one"}}),
            json!({"intro": "", "sentences": ["x", "y"]}),
            json!({"misc": ["deep", {"v": 1}]}),
        ];
        for shape in shapes {
            let once = coerce_passage(&shape);
            let twice = coerce_passage(&Value::String(once.clone()));
            assert_eq!(once, twice);
        }
    }
}
