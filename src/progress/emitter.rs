//! 进度推送
//!
//! `ProgressEmitter` 把观察者检查点翻译成 `ProgressEvent`，写入无界通道。
//! 接收端断开或收到取消信号后，发送变成空操作（事件直接丢弃，不排队），
//! 流水线本身不受影响。

use std::sync::Mutex;

use serde::Serialize;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{ApiError, AppError};
use crate::models::MarketReport;
use crate::progress::events::{Phase, ProgressEvent};
use crate::progress::observer::{BatchProgress, PipelineObserver};

/// 各阶段的进度百分比
const DISCOVERING_PROGRESS: u8 = 5;
const VERIFYING_START: u8 = 15;
const VERIFYING_SPAN: u8 = 70;
const GRADING_PROGRESS: u8 = 90;

const NO_RESULTS_SUGGESTION: &str = "try a more specific term";

/// 展示给用户的错误
///
/// 不包含任何数据源返回的原始错误文本。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserFacingError {
    pub message: String,
    pub retryable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl UserFacingError {
    pub fn new(message: impl Into<String>, retryable: bool, suggestion: Option<&str>) -> Self {
        Self {
            message: message.into(),
            retryable,
            suggestion: suggestion.map(str::to_string),
        }
    }
}

impl From<&AppError> for UserFacingError {
    fn from(err: &AppError) -> Self {
        let retryable = err.is_retryable();
        match err {
            AppError::Pipeline(_) => UserFacingError::new(
                "没有商品通过验证，无法生成市场报告",
                retryable,
                Some(NO_RESULTS_SUGGESTION),
            ),
            AppError::Api(ApiError::RateLimited { .. }) => UserFacingError::new(
                "数据服务请求过于频繁",
                retryable,
                Some("wait a minute and retry"),
            ),
            AppError::Api(_) | AppError::Llm(_) => {
                UserFacingError::new("外部数据服务暂时不可用", retryable, None)
            }
            AppError::Config(_) => UserFacingError::new(
                "配置不完整",
                retryable,
                Some("check the API credentials in the config file"),
            ),
            AppError::File(_) | AppError::Other(_) => {
                UserFacingError::new("处理失败", retryable, None)
            }
        }
    }
}

#[derive(Debug, Default)]
struct EmitterState {
    phase: Option<Phase>,
    closed: bool,
    sent: usize,
}

/// 进度推送器
pub struct ProgressEmitter {
    tx: mpsc::UnboundedSender<ProgressEvent>,
    cancel: CancellationToken,
    state: Mutex<EmitterState>,
}

impl ProgressEmitter {
    pub fn new(tx: mpsc::UnboundedSender<ProgressEvent>, cancel: CancellationToken) -> Self {
        Self {
            tx,
            cancel,
            state: Mutex::new(EmitterState::default()),
        }
    }

    /// 创建推送器和对应的接收端
    pub fn channel(cancel: CancellationToken) -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx, cancel), rx)
    }

    /// 当前阶段
    pub fn phase(&self) -> Option<Phase> {
        self.state.lock().ok().and_then(|s| s.phase)
    }

    /// 是否已经停止发送
    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled() || self.state.lock().map(|s| s.closed).unwrap_or(true)
    }

    /// 已成功发送的事件数量
    pub fn sent(&self) -> usize {
        self.state.lock().map(|s| s.sent).unwrap_or(0)
    }

    /// 发送一个事件，返回是否真正发送
    pub fn emit(&self, phase: Phase, message: impl Into<String>, progress: u8, data: Value) -> bool {
        let Ok(mut state) = self.state.lock() else {
            return false;
        };

        if state.closed || self.cancel.is_cancelled() {
            return false;
        }
        if !phase.can_follow(state.phase) {
            debug!("忽略非法的阶段切换: {:?} → {}", state.phase, phase);
            return false;
        }

        let event = ProgressEvent::new(phase, message, progress, data);
        state.phase = Some(phase);
        if phase.is_terminal() {
            state.closed = true;
        }
        if self.tx.send(event).is_err() {
            debug!("进度接收端已断开，后续事件将被丢弃");
            state.closed = true;
            return false;
        }
        state.sent += 1;
        true
    }
}

fn verifying_progress(settled: usize, total: usize) -> u8 {
    if total == 0 {
        return VERIFYING_START + VERIFYING_SPAN;
    }
    let done = settled.min(total) * usize::from(VERIFYING_SPAN) / total;
    VERIFYING_START + done as u8
}

impl PipelineObserver for ProgressEmitter {
    fn on_discovering(&self, query: &str) {
        self.emit(
            Phase::Discovering,
            format!("正在搜索 \"{}\" 的候选商品", query),
            DISCOVERING_PROGRESS,
            json!({ "query": query }),
        );
    }

    fn on_discovered(&self, found: usize, kept: usize) {
        self.emit(
            Phase::Verifying,
            format!("发现 {} 个商品，验证前 {} 个", found, kept),
            VERIFYING_START,
            json!({ "current": 0, "total": kept, "found": found }),
        );
    }

    fn on_batch_complete(&self, progress: &BatchProgress) {
        self.emit(
            Phase::Verifying,
            format!(
                "已验证 {}/{} 个商品 (第 {}/{} 批)",
                progress.settled, progress.total, progress.batch, progress.total_batches
            ),
            verifying_progress(progress.settled, progress.total),
            json!({
                "current": progress.settled,
                "total": progress.total,
                "batch": progress.batch,
                "totalBatches": progress.total_batches,
                "verified": progress.verified,
                "failed": progress.failed,
            }),
        );
    }

    fn on_grading(&self, verified: usize) {
        self.emit(
            Phase::Grading,
            format!("正在汇总 {} 个已验证商品", verified),
            GRADING_PROGRESS,
            json!({ "verified": verified }),
        );
    }

    fn on_complete(&self, report: &MarketReport) {
        self.emit(
            Phase::Complete,
            format!("分析完成: 市场等级 {}", report.market_grade),
            100,
            json!({
                "keyword": report.keyword,
                "marketGrade": report.market_grade,
                "opportunityScore": report.opportunity_score,
                "verifiedCount": report.verified_count,
                "totalCandidates": report.total_candidates,
            }),
        );
    }

    fn on_no_results(&self, query: &str) {
        self.emit(
            Phase::Complete,
            format!("没有找到 \"{}\" 的候选商品", query),
            100,
            json!({ "results": 0, "suggestion": NO_RESULTS_SUGGESTION }),
        );
    }

    fn on_error(&self, error: &UserFacingError) {
        let progress = match self.phase() {
            Some(Phase::Grading) => GRADING_PROGRESS,
            Some(Phase::Verifying) => VERIFYING_START,
            _ => 0,
        };
        let data = serde_json::to_value(error).unwrap_or(Value::Null);
        self.emit(Phase::Error, error.message.clone(), progress, data);
    }
}
