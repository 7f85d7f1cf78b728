//! 套题题型组合校验

use crate::error::TypeSpecificError;
use crate::models::ValidationOutcome;

/// 套题白名单校验器
///
/// 成员题型的最小值/最大值必须恰好等于某个白名单区间的两端，并且区间内每个编码都出现。
#[derive(Debug, Clone)]
pub struct SetPatternValidator {
    patterns: Vec<(u8, u8)>,
}

impl SetPatternValidator {
    pub fn new(patterns: Vec<(u8, u8)>) -> Self {
        Self { patterns }
    }

    pub fn patterns(&self) -> &[(u8, u8)] {
        &self.patterns
    }

    pub fn validate(&self, codes: &[u8]) -> ValidationOutcome {
        let (Some(&min), Some(&max)) = (codes.iter().min(), codes.iter().max()) else {
            return ValidationOutcome::fail(TypeSpecificError::SetPatternMismatch {
                detail: "套题没有成员".to_string(),
            });
        };

        // 区间不完整时，找一个包含全部成员的白名单区间来报告缺失的编码
        let pattern = self
            .patterns
            .iter()
            .find(|(lo, hi)| *lo == min && *hi == max)
            .or_else(|| self.patterns.iter().find(|(lo, hi)| *lo <= min && max <= *hi));

        let Some(&(lo, hi)) = pattern else {
            return ValidationOutcome::fail(TypeSpecificError::SetPatternMismatch {
                detail: format!(
                    "题型 {:?} 不属于任何白名单区间 {}",
                    sorted(codes),
                    self.describe_patterns()
                ),
            });
        };

        let missing: Vec<u8> = (lo..=hi).filter(|c| !codes.contains(c)).collect();
        if missing.is_empty() {
            return ValidationOutcome::pass();
        }
        ValidationOutcome::fail(TypeSpecificError::SetPatternMismatch {
            detail: format!("区间 {}-{} 缺少题型 {:?}", lo, hi, missing),
        })
    }

    fn describe_patterns(&self) -> String {
        self.patterns
            .iter()
            .map(|(lo, hi)| format!("{}-{}", lo, hi))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl Default for SetPatternValidator {
    fn default() -> Self {
        Self::new(vec![(16, 17), (41, 42), (43, 45)])
    }
}

fn sorted(codes: &[u8]) -> Vec<u8> {
    let mut codes = codes.to_vec();
    codes.sort_unstable();
    codes
}
