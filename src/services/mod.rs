//! 业务能力层：全部是纯函数，唯一的例外是 `repair`（单次模型调用）

pub mod normalizer;
pub mod quality;
pub mod repair;
pub mod text;
pub mod validators;

pub use normalizer::normalize;
pub use quality::{QualityScorer, SemanticJudgment};
pub use repair::{repair_markers, RepairOutcome};
pub use validators::{validate_structure, validate_type_specific, SetPatternValidator, TypeCheckInput};
