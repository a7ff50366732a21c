//! 进度事件

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// 流水线阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Discovering,
    Verifying,
    Grading,
    Complete,
    Error,
}

impl Phase {
    /// `complete` 和 `error` 之后不再有事件
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Complete | Phase::Error)
    }

    /// 状态机：discovering → verifying(可重复) → grading → complete，
    /// 任何非终止状态都可以进入 error。
    ///
    /// discovering 可以直接进入 complete（没有发现任何商品）。
    pub fn can_follow(self, previous: Option<Phase>) -> bool {
        match (previous, self) {
            (Some(prev), _) if prev.is_terminal() => false,
            (_, Phase::Error) => true,
            (None, Phase::Discovering) => true,
            (Some(Phase::Discovering), Phase::Verifying | Phase::Complete) => true,
            (Some(Phase::Verifying), Phase::Verifying | Phase::Grading) => true,
            (Some(Phase::Grading), Phase::Complete) => true,
            _ => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Discovering => "discovering",
            Phase::Verifying => "verifying",
            Phase::Grading => "grading",
            Phase::Complete => "complete",
            Phase::Error => "error",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 推送给调用方的进度事件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    pub phase: Phase,
    pub message: String,
    /// 0-100
    pub progress: u8,
    /// 各阶段自定义的数据
    #[serde(default)]
    pub data: Value,
    pub timestamp: DateTime<Utc>,
}

impl ProgressEvent {
    pub fn new(phase: Phase, message: impl Into<String>, progress: u8, data: Value) -> Self {
        Self {
            phase,
            message: message.into(),
            progress: progress.min(100),
            data,
            timestamp: Utc::now(),
        }
    }
}
