pub mod assessment_service;
pub mod grading;
pub mod market_aggregator;
pub mod metrics;
pub mod preliminary_scorer;
pub mod report_writer;

pub use assessment_service::AssessmentService;
pub use grading::{grade, GradeResult, GradingSignals};
pub use market_aggregator::{aggregate, AggregationError, CandidateCounts};
pub use metrics::calculate_metrics;
pub use preliminary_scorer::{rank_and_truncate, score_candidate, PreliminaryScore};
pub use report_writer::ReportWriter;
