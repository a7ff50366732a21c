//! 等级表
//!
//! 41 个有序等级：A10 > A9 > ... > A1 > B10 > ... > D1 > F1。
//! 等级与名次的对应关系只在 `GRADE_RANKS` 这一张表里定义，
//! 商品级评级与市场级评级都必须通过这张表换算，避免两处语义漂移。

use phf::phf_map;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 等级表版本，修改 `GRADE_RANKS` 时递增
pub const GRADE_TABLE_VERSION: u32 = 1;

/// 等级数量
pub const GRADE_COUNT: u8 = 41;

/// 等级标签 → 名次（41 最好，1 最差）
static GRADE_RANKS: phf::Map<&'static str, u8> = phf_map! {
    "A10" => 41,
    "A9" => 40,
    "A8" => 39,
    "A7" => 38,
    "A6" => 37,
    "A5" => 36,
    "A4" => 35,
    "A3" => 34,
    "A2" => 33,
    "A1" => 32,
    "B10" => 31,
    "B9" => 30,
    "B8" => 29,
    "B7" => 28,
    "B6" => 27,
    "B5" => 26,
    "B4" => 25,
    "B3" => 24,
    "B2" => 23,
    "B1" => 22,
    "C10" => 21,
    "C9" => 20,
    "C8" => 19,
    "C7" => 18,
    "C6" => 17,
    "C5" => 16,
    "C4" => 15,
    "C3" => 14,
    "C2" => 13,
    "C1" => 12,
    "D10" => 11,
    "D9" => 10,
    "D8" => 9,
    "D7" => 8,
    "D6" => 7,
    "D5" => 6,
    "D4" => 5,
    "D3" => 4,
    "D2" => 3,
    "D1" => 2,
    "F1" => 1,
};

/// 等级
///
/// 内部保存名次，比较大小时名次高者更好。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Grade(u8);

impl Grade {
    pub const BEST: Grade = Grade(GRADE_COUNT);
    pub const WORST: Grade = Grade(1);

    /// 由名次创建等级，超出范围时截断到 [F1, A10]
    pub fn from_rank(rank: u8) -> Self {
        Grade(rank.clamp(1, GRADE_COUNT))
    }

    /// 解析等级标签，未知标签返回 None
    pub fn parse(label: &str) -> Option<Self> {
        GRADE_RANKS.get(label.trim()).copied().map(Grade)
    }

    pub fn rank(self) -> u8 {
        self.0
    }

    pub fn label(self) -> &'static str {
        GRADE_RANKS
            .entries()
            .find(|(_, rank)| **rank == self.0)
            .map(|(label, _)| *label)
            .unwrap_or("F1")
    }

    /// 等级字母（A/B/C/D/F）
    pub fn letter(self) -> char {
        self.label().chars().next().unwrap_or('F')
    }

    /// 从最好到最差的全部等级
    pub fn all() -> impl Iterator<Item = Grade> {
        (1..=GRADE_COUNT).rev().map(Grade)
    }
}

/// 等级标签 → 名次，未知标签按最差名次处理
pub fn grade_rank(label: &str) -> u8 {
    Grade::parse(label).unwrap_or(Grade::WORST).rank()
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl From<Grade> for String {
    fn from(grade: Grade) -> Self {
        grade.label().to_string()
    }
}

impl TryFrom<String> for Grade {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Grade::parse(&value).ok_or_else(|| format!("未知等级: {}", value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_table_covers_every_label_once() {
        assert_eq!(GRADE_RANKS.len(), GRADE_COUNT as usize);
        let ranks: HashSet<u8> = GRADE_RANKS.values().copied().collect();
        assert_eq!(ranks.len(), GRADE_COUNT as usize);
        assert_eq!(ranks, (1..=GRADE_COUNT).collect());
    }

    #[test]
    fn test_rank_strictly_descending_from_a10_to_f1() {
        let mut expected = Vec::new();
        for letter in ['A', 'B', 'C', 'D'] {
            for step in (1..=10).rev() {
                expected.push(format!("{}{}", letter, step));
            }
        }
        expected.push("F1".to_string());

        let ranks: Vec<u8> = expected.iter().map(|l| grade_rank(l)).collect();
        assert!(ranks.windows(2).all(|w| w[0] > w[1]));
        assert_eq!(ranks[0], 41);
        assert_eq!(*ranks.last().unwrap(), 1);
    }

    #[test]
    fn test_label_roundtrip_through_table() {
        for grade in Grade::all() {
            assert_eq!(Grade::parse(grade.label()), Some(grade));
        }
        assert_eq!(Grade::all().count(), 41);
    }

    #[test]
    fn test_unknown_label_ranks_worst() {
        assert_eq!(grade_rank("Z9"), 1);
        assert_eq!(grade_rank(""), 1);
        assert_eq!(grade_rank("A11"), 1);
    }

    #[test]
    fn test_from_rank_clamps() {
        assert_eq!(Grade::from_rank(0), Grade::WORST);
        assert_eq!(Grade::from_rank(200), Grade::BEST);
        assert_eq!(Grade::BEST.label(), "A10");
        assert_eq!(Grade::WORST.label(), "F1");
    }

    #[test]
    fn test_serde_as_label() {
        let json = serde_json::to_string(&Grade::parse("B5").unwrap()).unwrap();
        assert_eq!(json, "\"B5\"");
        let grade: Grade = serde_json::from_str("\"C3\"").unwrap();
        assert_eq!(grade.letter(), 'C');
        assert!(serde_json::from_str::<Grade>("\"Q1\"").is_err());
    }
}
