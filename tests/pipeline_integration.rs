mod common;

use std::sync::Arc;
use std::time::Duration;

use common::*;
use market_scout::error::AppError;
use market_scout::models::{ConsistencyRating, Grade};
use market_scout::orchestrator::{
    BatchOrchestrator, BatchSettings, MarketPipeline, PipelineInput, PipelineOutcome,
};
use market_scout::progress::{NoopObserver, Phase, ProgressEmitter};
use market_scout::workflow::FailureReason;
use tokio_test::{assert_err, assert_ok};
use tokio_util::sync::CancellationToken;

fn settings(batch_size: usize) -> BatchSettings {
    BatchSettings {
        batch_size,
        batch_pause: Duration::from_millis(10),
    }
}

fn pipeline(
    discovery: MockDiscovery,
    sales: Arc<ScriptedSales>,
    triage_limit: usize,
    sink: Arc<MemorySink>,
) -> MarketPipeline {
    let orchestrator = BatchOrchestrator::new(Arc::new(flow(sales)), settings(3));
    MarketPipeline::new(Arc::new(discovery), orchestrator, triage_limit).with_sink(sink)
}

fn keyword(term: &str) -> PipelineInput {
    PipelineInput::Keyword {
        term: term.to_string(),
        limit: 20,
    }
}

/// 20 个候选：5 个强候选 S1..S5 穿插在 15 个弱候选之间
fn twenty_candidates() -> Vec<market_scout::Candidate> {
    let mut strong = 0;
    (1..=20)
        .map(|i| {
            if i % 4 == 0 {
                strong += 1;
                strong_candidate(&format!("S{}", strong))
            } else {
                weak_candidate(&format!("W{}", i))
            }
        })
        .collect()
}

#[tokio::test]
async fn test_batches_run_strictly_in_sequence() {
    let sales = Arc::new(
        ScriptedSales::new()
            .with("S1", SalesBehavior::Ok(Duration::from_millis(40)))
            .with("S2", SalesBehavior::Ok(Duration::from_millis(10)))
            .with("S3", SalesBehavior::Ok(Duration::from_millis(25))),
    );
    let orchestrator = BatchOrchestrator::new(Arc::new(flow(sales.clone())), settings(3));
    let candidates: Vec<_> = (1..=6).map(|i| strong_candidate(&format!("S{}", i))).collect();

    let outcome = orchestrator
        .run("board", &candidates, &NoopObserver, &CancellationToken::new())
        .await;
    assert_eq!(outcome.verified.len(), 6);

    let timeline = sales.timeline();
    let position = |entry: &str| timeline.iter().position(|e| e == entry).unwrap();

    let last_end_first_batch = ["S1", "S2", "S3"]
        .iter()
        .map(|a| position(&format!("end:{}", a)))
        .max()
        .unwrap();
    let first_start_second_batch = ["S4", "S5", "S6"]
        .iter()
        .map(|a| position(&format!("start:{}", a)))
        .min()
        .unwrap();
    assert!(last_end_first_batch < first_start_second_batch);

    // 批内并发：三个请求都先开始，再依次结束
    let first_end = timeline.iter().position(|e| e.starts_with("end:")).unwrap();
    assert!(first_end >= 3);
}

#[tokio::test]
async fn test_single_failure_is_isolated() {
    let sales = Arc::new(
        ScriptedSales::new()
            .with("S2", SalesBehavior::Panic)
            .with("S4", SalesBehavior::Missing),
    );
    let orchestrator = BatchOrchestrator::new(Arc::new(flow(sales.clone())), settings(3));
    let candidates: Vec<_> = (1..=5).map(|i| strong_candidate(&format!("S{}", i))).collect();
    let observer = RecordingObserver::default();

    let outcome = orchestrator
        .run("board", &candidates, &observer, &CancellationToken::new())
        .await;

    assert_eq!(outcome.attempted, 5);
    assert_eq!(outcome.verified.len(), 3);
    assert_eq!(outcome.failed(), 2);
    assert!(!outcome.cancelled);

    // 没有销量数据的候选会重试到上限
    assert_eq!(sales.calls_for("S4"), 3);
    let missing = outcome
        .failures
        .iter()
        .find(|f| f.candidate_id == "S4")
        .unwrap();
    assert_eq!(missing.reason, FailureReason::NoSalesData);

    let batches = observer.batches.lock().unwrap().clone();
    assert_eq!(batches.len(), 2);
    assert_eq!(batches[0].settled, 3);
    assert_eq!(batches[1].settled, 5);
    assert_eq!(batches[1].failed, 2);
}

#[tokio::test]
async fn test_end_to_end_partial_success() {
    let sales = Arc::new(
        ScriptedSales::new()
            .with("S4", SalesBehavior::Hang)
            .with("S5", SalesBehavior::Fail),
    );
    let sink = Arc::new(MemorySink::default());
    let pipeline = pipeline(
        MockDiscovery::returning(twenty_candidates()),
        sales.clone(),
        5,
        sink.clone(),
    );
    let observer = RecordingObserver::default();

    let outcome = assert_ok!(
        pipeline
            .run(keyword("bamboo cutting board"), &observer, &CancellationToken::new())
            .await
    );

    let PipelineOutcome::Completed {
        report,
        products,
        stats,
    } = outcome
    else {
        panic!("expected a completed run");
    };

    assert_eq!(report.verified_count, 3);
    assert_eq!(report.total_candidates, 20);
    assert_eq!(report.analyzed_count, 5);
    assert_eq!(report.failed_count, 2);
    assert!(Grade::all().any(|g| g == report.market_grade));
    assert_eq!(report.consistency_rating, ConsistencyRating::High);
    assert!((1..=100).contains(&report.opportunity_score));

    // 只有强候选进入验证
    assert!(products.iter().all(|p| p.asin().starts_with('S')));
    assert!(products.windows(2).all(|w| w[0].grade >= w[1].grade));

    // 超时不重试，数据源错误重试到上限
    assert_eq!(sales.calls_for("S4"), 1);
    assert_eq!(sales.calls_for("S5"), 3);
    assert!(sales.timeline().iter().all(|e| !e.contains('W')));

    assert_eq!(stats.discovered, 20);
    assert_eq!(stats.verified, 3);
    assert_eq!(sink.stored.lock().unwrap().len(), 1);

    assert_eq!(
        observer.events(),
        vec![
            "discovering",
            "discovered:5/20",
            "batch_start:1",
            "batch_complete:1",
            "batch_start:2",
            "batch_complete:2",
            "grading:3",
            "complete",
        ]
    );
}

#[tokio::test]
async fn test_cancellation_stops_further_batches() {
    let sales = Arc::new(ScriptedSales::new());
    let sink = Arc::new(MemorySink::default());
    let candidates: Vec<_> = (1..=6).map(|i| strong_candidate(&format!("S{}", i))).collect();
    let pipeline = pipeline(MockDiscovery::returning(candidates), sales.clone(), 6, sink.clone());

    let cancel = CancellationToken::new();
    let observer = RecordingObserver {
        cancel_after_first_batch: Some(cancel.clone()),
        ..RecordingObserver::default()
    };

    let outcome = assert_ok!(pipeline.run(keyword("board"), &observer, &cancel).await);
    match outcome {
        PipelineOutcome::Cancelled { stats } => {
            assert_eq!(stats.verified, 3);
            assert_eq!(stats.analyzed, 6);
        }
        other => panic!("expected cancellation, got {:?}", other),
    }

    for asin in ["S4", "S5", "S6"] {
        assert_eq!(sales.calls_for(asin), 0);
    }
    assert!(sink.stored.lock().unwrap().is_empty());
    assert!(!observer.events().contains(&"grading:3".to_string()));
}

#[tokio::test]
async fn test_discovery_failure_is_no_results() {
    let sink = Arc::new(MemorySink::default());
    let pipeline = pipeline(
        MockDiscovery::failing(),
        Arc::new(ScriptedSales::new()),
        5,
        sink,
    );
    let observer = RecordingObserver::default();

    let outcome = assert_ok!(
        pipeline
            .run(keyword("zzzz"), &observer, &CancellationToken::new())
            .await
    );
    assert!(matches!(outcome, PipelineOutcome::NoResults { .. }));
    assert_eq!(observer.events(), vec!["discovering", "no_results"]);
}

#[tokio::test]
async fn test_zero_verified_is_an_error() {
    let sales = Arc::new(
        ScriptedSales::new()
            .with("S1", SalesBehavior::Missing)
            .with("S2", SalesBehavior::Fail),
    );
    let candidates = vec![strong_candidate("S1"), strong_candidate("S2")];
    let sink = Arc::new(MemorySink::default());
    let pipeline = pipeline(MockDiscovery::returning(candidates), sales, 5, sink.clone());
    let observer = RecordingObserver::default();

    let err = assert_err!(
        pipeline
            .run(keyword("kettle"), &observer, &CancellationToken::new())
            .await
    );
    assert!(matches!(err, AppError::Pipeline(_)));

    let errors = observer.errors.lock().unwrap().clone();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].retryable);
    assert!(errors[0].suggestion.is_some());
    assert!(sink.stored.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_asin_input_mode() {
    let sink = Arc::new(MemorySink::default());
    let pipeline = pipeline(
        MockDiscovery::returning(twenty_candidates()),
        Arc::new(ScriptedSales::new()),
        5,
        sink,
    );

    let input = PipelineInput::Asins(vec!["S1".into(), " S2 ".into(), "W1".into()]);
    let outcome = assert_ok!(
        pipeline
            .run(input, &NoopObserver, &CancellationToken::new())
            .await
    );
    let PipelineOutcome::Completed { report, .. } = outcome else {
        panic!("expected a completed run");
    };
    assert_eq!(report.total_candidates, 3);
    assert_eq!(report.keyword, "ASIN: S1, S2, W1");
}

#[tokio::test]
async fn test_progress_stream_for_full_run() {
    let sales = Arc::new(ScriptedSales::new().with("S5", SalesBehavior::Fail));
    let sink = Arc::new(MemorySink::default());
    let pipeline = pipeline(
        MockDiscovery::returning(twenty_candidates()),
        sales,
        5,
        sink,
    );

    let cancel = CancellationToken::new();
    let (emitter, mut rx) = ProgressEmitter::channel(cancel.clone());
    assert_ok!(pipeline.run(keyword("cutting board"), &emitter, &cancel).await);
    drop(emitter);

    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }

    let phases: Vec<Phase> = events.iter().map(|e| e.phase).collect();
    assert_eq!(
        phases,
        vec![
            Phase::Discovering,
            Phase::Verifying,
            Phase::Verifying,
            Phase::Verifying,
            Phase::Grading,
            Phase::Complete,
        ]
    );
    assert_eq!(events.last().unwrap().progress, 100);
    assert_eq!(events.last().unwrap().data["verifiedCount"], 4);
    assert_eq!(events[3].data["current"], 5);
    assert_eq!(events[3].data["failed"], 1);
}
