pub mod batch_processor;
pub mod market_pipeline;

pub use batch_processor::{BatchOrchestrator, BatchOutcome, BatchSettings};
pub use market_pipeline::{MarketPipeline, PipelineInput, PipelineOutcome, PipelineStats};
