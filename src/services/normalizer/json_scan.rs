//! 从模型回复中截取 JSON 对象
//!
//! 回复里常带有说明文字或 ``` 围栏，这里用深度计数找到第一个完整的花括号区域。

use crate::error::{PipelineError, StageResult};
use std::borrow::Cow;

/// 找到第一个 `{` 与其匹配的 `}`，字符串字面量中的括号与转义不计数
pub fn extract_object_region(raw: &str) -> StageResult<&str> {
    let start = raw
        .find('{')
        .ok_or_else(|| PipelineError::parse("回复中没有找到 JSON 对象", raw))?;

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in raw[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    let end = start + offset + c.len_utf8();
                    return Ok(&raw[start..end]);
                }
            }
            _ => {}
        }
    }

    Err(PipelineError::parse("花括号不匹配", &raw[start..]))
}

/// 圆圈数字 → 整数
pub fn circled_digit(c: char) -> Option<u8> {
    match c {
        '①' => Some(1),
        '②' => Some(2),
        '③' => Some(3),
        '④' => Some(4),
        '⑤' => Some(5),
        _ => None,
    }
}

/// 把出现在值位置、未加引号的圆圈数字改写为整数
///
/// 引号内的圆圈数字（例如选项文本）保持不变。
pub fn repair_bare_glyphs(region: &str) -> Cow<'_, str> {
    if !region.chars().any(|c| circled_digit(c).is_some()) {
        return Cow::Borrowed(region);
    }

    let mut out = String::with_capacity(region.len());
    let mut in_string = false;
    let mut escaped = false;

    for c in region.chars() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            out.push(c);
            continue;
        }
        if c == '"' {
            in_string = true;
        }
        match circled_digit(c) {
            Some(d) => out.push(char::from(b'0' + d)),
            None => out.push(c),
        }
    }

    Cow::Owned(out)
}
