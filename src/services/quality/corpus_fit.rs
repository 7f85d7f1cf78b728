//! 语料贴合度：词数、平均句长、选项完整度

use crate::config::WordCountTarget;
use crate::models::CanonicalItem;
use crate::services::text;

const WORD_COUNT_WEIGHT: f64 = 0.5;
const SENTENCE_LENGTH_WEIGHT: f64 = 0.3;
const OPTIONS_WEIGHT: f64 = 0.2;

/// 满分的平均句长区间（词/句）
pub const SENTENCE_BAND: (f64, f64) = (12.0, 28.0);

/// 词数得分：理想值满分，向区间两端线性递减到 0
pub fn word_count_score(words: usize, target: WordCountTarget) -> f64 {
    let (w, min, ideal, max) = (
        words as f64,
        target.min as f64,
        target.ideal as f64,
        target.max as f64,
    );
    if w <= min || w >= max {
        return 0.0;
    }
    if w <= ideal {
        if ideal <= min {
            return 100.0;
        }
        100.0 * (w - min) / (ideal - min)
    } else {
        if max <= ideal {
            return 100.0;
        }
        100.0 * (max - w) / (max - ideal)
    }
}

/// 平均句长得分：区间内满分，每偏离一个词扣 10 分
pub fn sentence_length_score(avg_words: f64) -> f64 {
    let (lo, hi) = SENTENCE_BAND;
    let distance = if avg_words < lo {
        lo - avg_words
    } else if avg_words > hi {
        avg_words - hi
    } else {
        0.0
    };
    (100.0 - 10.0 * distance).max(0.0)
}

pub fn options_completeness_score(options: &[String]) -> f64 {
    if options.is_empty() {
        return 0.0;
    }
    let filled = options.iter().filter(|o| !o.trim().is_empty()).count();
    100.0 * filled as f64 / options.len() as f64
}

/// 参与统计的文本：原文，其次挖空原文，最后题干
fn corpus_text(item: &CanonicalItem) -> &str {
    [item.passage.as_deref(), item.blank_passage.as_deref()]
        .into_iter()
        .flatten()
        .find(|t| !t.trim().is_empty())
        .unwrap_or(&item.stem)
}

pub fn corpus_fit_score(item: &CanonicalItem, target: WordCountTarget) -> f64 {
    let body = corpus_text(item);
    let words = text::word_count(body);
    let avg = words as f64 / text::sentence_count(body) as f64;

    WORD_COUNT_WEIGHT * word_count_score(words, target)
        + SENTENCE_LENGTH_WEIGHT * sentence_length_score(avg)
        + OPTIONS_WEIGHT * options_completeness_score(&item.options)
}
