//! 题型编码（1–45 的封闭集合）

use phf::phf_map;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 题型名称表
static ITEM_TYPE_NAMES: phf::Map<u8, &'static str> = phf_map! {
    1u8 => "listening: purpose of speech",
    2u8 => "listening: speaker opinion",
    3u8 => "listening: main point",
    4u8 => "listening: picture mismatch",
    5u8 => "listening: task to do",
    6u8 => "listening: payment amount",
    7u8 => "listening: reason",
    8u8 => "listening: unmentioned detail",
    9u8 => "listening: notice mismatch",
    10u8 => "listening: chart selection",
    11u8 => "listening: short response (man)",
    12u8 => "listening: short response (woman)",
    13u8 => "listening: long response (man)",
    14u8 => "listening: long response (woman)",
    15u8 => "listening: situational remark",
    16u8 => "listening set: topic",
    17u8 => "listening set: unmentioned item",
    18u8 => "reading: purpose",
    19u8 => "reading: mood change",
    20u8 => "reading: claim",
    21u8 => "reading: implied meaning",
    22u8 => "reading: gist",
    23u8 => "reading: topic",
    24u8 => "reading: title",
    25u8 => "reading: chart",
    26u8 => "reading: biography mismatch",
    27u8 => "reading: notice mismatch",
    28u8 => "reading: notice match",
    29u8 => "reading: grammar",
    30u8 => "reading: vocabulary",
    31u8 => "blank: word",
    32u8 => "blank: phrase",
    33u8 => "blank: clause",
    34u8 => "blank: long clause",
    35u8 => "reading: irrelevant sentence",
    36u8 => "order: paragraphs (a)",
    37u8 => "order: paragraphs (b)",
    38u8 => "insertion: sentence (a)",
    39u8 => "insertion: sentence (b)",
    40u8 => "summary completion",
    41u8 => "long passage: title",
    42u8 => "long passage: vocabulary",
    43u8 => "long set: order",
    44u8 => "long set: reference",
    45u8 => "long set: detail mismatch",
};

/// 题型大类，决定使用哪一个题型校验器
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemCategory {
    Listening,
    Chart,
    Grammar,
    Gap,
    Reading,
}

/// 题型编码
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct ItemType(u8);

impl ItemType {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 45;
    /// 语法（下划线标记）题
    pub const GRAMMAR: ItemType = ItemType(29);
    /// 图表题
    pub const CHART: ItemType = ItemType(25);

    /// 从编码创建，超出 1–45 返回 None
    pub fn new(code: u8) -> Option<Self> {
        (Self::MIN..=Self::MAX).contains(&code).then_some(Self(code))
    }

    /// 获取编码
    pub fn code(self) -> u8 {
        self.0
    }

    /// 获取题型名称
    pub fn name(self) -> &'static str {
        ITEM_TYPE_NAMES.get(&self.0).copied().unwrap_or("unknown")
    }

    pub fn category(self) -> ItemCategory {
        match self.0 {
            1..=17 => ItemCategory::Listening,
            25 => ItemCategory::Chart,
            29 => ItemCategory::Grammar,
            31..=34 => ItemCategory::Gap,
            _ => ItemCategory::Reading,
        }
    }
}

impl TryFrom<u8> for ItemType {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        ItemType::new(code).ok_or_else(|| format!("题型编码 {} 超出范围 [1, 45]", code))
    }
}

impl From<ItemType> for u8 {
    fn from(item_type: ItemType) -> Self {
        item_type.0
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
