pub mod model;
pub mod project;
pub mod resolve;
pub mod stage;

pub use model::{
    EncodingDetail, Item, LogBatch, LogEvent, LogFileChunk, Progress, QueueSnapshot, Totals,
    Unit, ValidationDetail,
};
pub use project::{project, PipelineView, StageCell};
pub use resolve::resolve_active_unit;
pub use stage::{normalize, Stage, STAGE_ORDER};
