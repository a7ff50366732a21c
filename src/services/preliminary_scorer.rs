//! 初筛打分 - 业务能力层
//!
//! 只用发现阶段已有的数据给候选商品打一个便宜的启发式分数，
//! 用于在昂贵的富化之前排序并截断候选列表。纯函数，无 I/O，
//! 缺失字段按最差情况计分。

use crate::models::{Candidate, Grade};
use crate::services::grading::grade_for_score;
use tracing::debug;

/// 初筛分数
#[derive(Debug, Clone, PartialEq)]
pub struct PreliminaryScore {
    pub candidate_id: String,
    /// 0-100
    pub score: u8,
    pub estimated_grade: Grade,
}

/// 给单个候选商品打分
pub fn score_candidate(candidate: &Candidate) -> PreliminaryScore {
    let total = price_points(candidate.price)
        + review_points(candidate.review_count)
        + rating_points(candidate.rating)
        + rank_points(candidate.sales_rank);
    let score = total.min(100);

    PreliminaryScore {
        candidate_id: candidate.asin.clone(),
        score,
        estimated_grade: grade_for_score(score),
    }
}

/// 按初筛分数降序排列，只保留前 `limit` 个
///
/// 分数相同的保持发现顺序。
pub fn rank_and_truncate(candidates: Vec<Candidate>, limit: usize) -> Vec<Candidate> {
    let mut scored: Vec<(PreliminaryScore, Candidate)> = candidates
        .into_iter()
        .map(|c| (score_candidate(&c), c))
        .collect();

    scored.sort_by(|a, b| b.0.score.cmp(&a.0.score));

    for (score, _) in scored.iter().take(limit) {
        debug!(
            "初筛保留 {} - 分数 {} (预估等级 {})",
            score.candidate_id, score.score, score.estimated_grade
        );
    }

    scored.into_iter().take(limit).map(|(_, c)| c).collect()
}

fn price_points(price: f64) -> u8 {
    if (15.0..=50.0).contains(&price) {
        25
    } else if (10.0..15.0).contains(&price) || (50.0..=75.0).contains(&price) {
        15
    } else if price > 0.0 {
        5
    } else {
        0
    }
}

fn review_points(reviews: Option<u32>) -> u8 {
    match reviews {
        Some(r) if r < 50 => 25,
        Some(r) if r < 200 => 20,
        Some(r) if r < 500 => 15,
        Some(r) if r < 1000 => 10,
        Some(_) => 5,
        None => 0,
    }
}

fn rating_points(rating: Option<f64>) -> u8 {
    match rating {
        Some(r) if r >= 4.5 => 20,
        Some(r) if r >= 4.0 => 15,
        Some(r) if r >= 3.5 => 10,
        Some(r) if r > 0.0 => 5,
        _ => 0,
    }
}

fn rank_points(rank: Option<u32>) -> u8 {
    match rank {
        Some(0) | None => 0,
        Some(r) if r <= 1_000 => 30,
        Some(r) if r <= 5_000 => 25,
        Some(r) if r <= 20_000 => 20,
        Some(r) if r <= 50_000 => 12,
        Some(r) if r <= 100_000 => 6,
        Some(_) => 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(asin: &str, price: f64, reviews: Option<u32>, rating: Option<f64>, rank: Option<u32>) -> Candidate {
        Candidate {
            price,
            review_count: reviews,
            rating,
            sales_rank: rank,
            ..Candidate::new(asin, "test product")
        }
    }

    #[test]
    fn test_missing_fields_score_zero() {
        let score = score_candidate(&Candidate::new("B0EMPTY", "nothing known"));
        assert_eq!(score.score, 0);
        assert_eq!(score.estimated_grade, Grade::WORST);
    }

    #[test]
    fn test_ideal_candidate_scores_full() {
        let score = score_candidate(&candidate("B0IDEAL", 24.99, Some(12), Some(4.6), Some(800)));
        assert_eq!(score.score, 100);
        assert_eq!(score.estimated_grade, Grade::BEST);
    }

    #[test]
    fn test_rank_and_truncate_keeps_best() {
        let candidates = vec![
            candidate("B0LOW", 5.0, Some(5000), Some(3.0), Some(300_000)),
            candidate("B0HIGH", 24.99, Some(12), Some(4.6), Some(800)),
            candidate("B0MID", 60.0, Some(300), Some(4.1), Some(15_000)),
        ];
        let kept = rank_and_truncate(candidates, 2);
        let ids: Vec<&str> = kept.iter().map(|c| c.asin.as_str()).collect();
        assert_eq!(ids, vec!["B0HIGH", "B0MID"]);
    }

    #[test]
    fn test_rank_and_truncate_limit_larger_than_input() {
        let kept = rank_and_truncate(vec![Candidate::new("B01", "a")], 5);
        assert_eq!(kept.len(), 1);
    }
}
