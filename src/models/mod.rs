pub mod item;
pub mod item_type;
pub mod loaders;
pub mod outcome;
pub mod request;

pub use item::{CanonicalItem, ChartMeta, GrammarMetaEntry, TypeSpecificMeta};
pub use item_type::{ItemCategory, ItemType};
pub use loaders::{group_requests, load_requests, RequestGroups};
pub use outcome::{
    AttemptOutcome, AttemptRecord, FinalStatus, Grade, PipelineResult, QualityScore,
    Recommendation, RegenerationTriggers, SetResult, SetVerdict, ValidationOutcome,
};
pub use request::{GenerationRequest, Passage, PassageOrigin};
