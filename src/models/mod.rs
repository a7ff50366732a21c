pub mod candidate;
pub mod enrichment;
pub mod grade;
pub mod product;
pub mod report;

pub use candidate::Candidate;
pub use enrichment::{
    ConsistencyRating, Dimensions, EnrichmentBundle, KeywordRecord, QualitativeAssessment,
    RiskClassification, SalesPrediction,
};
pub use grade::{grade_rank, Grade, GRADE_TABLE_VERSION};
pub use product::{sort_by_grade, CalculatedMetrics, ReviewBucket, VerifiedProduct};
pub use report::{MarketAverages, MarketReport};
