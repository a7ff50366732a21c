//! 报告写入服务 - 业务能力层
//!
//! 只负责"把市场报告写成 JSON 文件"能力，不关心流程

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use std::path::PathBuf;
use tokio::fs;
use tracing::debug;

use crate::error::AppError;
use crate::models::{MarketReport, VerifiedProduct};
use crate::sources::ReportSink;

/// 报告写入服务
///
/// 每次运行写一个文件：`{dir}/{keyword}-{时间戳}.json`
pub struct ReportWriter {
    output_dir: PathBuf,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReportFile<'a> {
    report: &'a MarketReport,
    products: &'a [VerifiedProduct],
}

impl ReportWriter {
    /// 使用自定义目录创建
    pub fn with_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: dir.into(),
        }
    }

    /// 报告文件路径
    pub fn report_path(&self, report: &MarketReport) -> PathBuf {
        let file_name = format!(
            "{}-{}.json",
            slugify(&report.keyword),
            report.generated_at.format("%Y%m%d-%H%M%S")
        );
        self.output_dir.join(file_name)
    }
}

impl Default for ReportWriter {
    fn default() -> Self {
        Self::with_dir("reports")
    }
}

#[async_trait]
impl ReportSink for ReportWriter {
    async fn store(&self, report: &MarketReport, products: &[VerifiedProduct]) -> Result<()> {
        let path = self.report_path(report);
        debug!("写入报告: {}", path.display());

        fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|e| AppError::file_write_failed(self.output_dir.display().to_string(), e))?;

        let body = serde_json::to_string_pretty(&ReportFile { report, products })?;
        fs::write(&path, body)
            .await
            .map_err(|e| AppError::file_write_failed(path.display().to_string(), e))?;

        Ok(())
    }
}

/// 搜索词 → 文件名安全的片段
fn slugify(keyword: &str) -> String {
    let slug: String = keyword
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect();
    let slug = slug
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-");
    if slug.is_empty() {
        "report".to_string()
    } else {
        slug
    }
}
