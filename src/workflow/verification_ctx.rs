//! 候选商品验证上下文
//!
//! 封装"我正在验证哪个搜索词的第几个候选"这一信息

use std::fmt::Display;

/// 验证上下文
#[derive(Debug, Clone)]
pub struct VerificationCtx {
    /// 搜索词（按商品标识查询时为空）
    pub keyword: String,

    /// 批次编号（从1开始，仅用于日志显示）
    pub batch_index: usize,

    /// 候选在初筛结果中的索引（从1开始）
    pub candidate_index: usize,

    pub asin: String,
}

impl VerificationCtx {
    pub fn new(
        keyword: impl Into<String>,
        batch_index: usize,
        candidate_index: usize,
        asin: impl Into<String>,
    ) -> Self {
        Self {
            keyword: keyword.into(),
            batch_index,
            candidate_index,
            asin: asin.into(),
        }
    }
}

impl Display for VerificationCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[候选 {} {}]", self.candidate_index, self.asin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let ctx = VerificationCtx::new("garlic press", 2, 4, "B0PRESS004");
        assert_eq!(ctx.to_string(), "[候选 4 B0PRESS004]");
    }
}
