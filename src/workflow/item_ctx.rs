//! 题目处理上下文
//!
//! 封装"我正在处理哪个请求的第几次尝试"这一信息

use std::fmt::Display;

use crate::models::ItemType;

/// 题目处理上下文
///
/// 只用于日志前缀
#[derive(Debug, Clone)]
pub struct ItemCtx {
    /// 请求ID
    pub request_id: String,

    /// 题型
    pub item_type: ItemType,

    /// 当前尝试（从1开始，0 表示尚未开始）
    pub attempt: u32,

    /// 最大尝试次数
    pub max_attempts: u32,

    /// 所属套题
    pub set_id: Option<String>,
}

impl ItemCtx {
    pub fn new(request_id: impl Into<String>, item_type: ItemType, max_attempts: u32) -> Self {
        Self {
            request_id: request_id.into(),
            item_type,
            attempt: 0,
            max_attempts,
            set_id: None,
        }
    }

    pub fn with_set_id(mut self, set_id: Option<String>) -> Self {
        self.set_id = set_id;
        self
    }

    pub fn is_final_attempt(&self) -> bool {
        self.attempt >= self.max_attempts
    }
}

impl Display for ItemCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[")?;
        if let Some(set_id) = &self.set_id {
            write!(f, "套题#{} ", set_id)?;
        }
        write!(
            f,
            "请求#{} 题型#{} 尝试 {}/{}]",
            self.request_id,
            self.item_type.code(),
            self.attempt,
            self.max_attempts
        )
    }
}
