//! # Market Scout
//!
//! 一个用于电商选品分析的 Rust 应用程序：
//! 搜索词（或商品标识列表）→ 候选初筛 → 多数据源富化 → 确定性评级 → 市场报告
//!
//! ## 架构设计
//!
//! 本系统采用分层架构：
//!
//! ### ① 数据源层（Sources / Clients）
//! - `sources/` - 外部世界的 trait 边界（发现、销量、关键词、定性评估、报告落盘）
//! - `clients/` - 基于 reqwest 的 HTTP 实现
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单个商品或单个报告
//! - `preliminary_scorer` - 发现阶段的快速打分，用于初筛
//! - `grading` - 41 级评级引擎（纯函数）
//! - `metrics` - 派生指标计算
//! - `AssessmentService` - LLM 定性评估
//! - `market_aggregator` - 市场级统计与评级
//! - `ReportWriter` - 报告写入 JSON 文件
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一个候选商品"的完整验证流程
//! - `VerificationCtx` - 上下文封装（批次 + 候选编号 + ASIN）
//! - `VerificationFlow` - 富化 → 指标 → 评级，带超时和有界重试
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/batch_processor` - 分批并发验证，批间串行
//! - `orchestrator/market_pipeline` - 一次完整分析的端到端流水线
//!
//! ### ⑤ 进度（Progress）
//! - `progress/` - 阶段状态机 + 进度事件推送，只做观察，不影响流水线
//!
//! ## 模块结构

pub mod app;
pub mod cli;
pub mod clients;
pub mod config;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod progress;
pub mod services;
pub mod sources;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use app::App;
pub use cli::Cli;
pub use config::Config;
pub use error::{AppError, AppResult};
pub use models::{Candidate, Grade, MarketReport, VerifiedProduct};
pub use orchestrator::{
    BatchOrchestrator, BatchSettings, MarketPipeline, PipelineInput, PipelineOutcome,
};
pub use progress::{Phase, PipelineObserver, ProgressEmitter, ProgressEvent};
pub use workflow::{RetryPolicy, VerificationCtx, VerificationFlow};
