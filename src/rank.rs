use crate::predict::{round2, term_score};
use rusqlite::Connection;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Standing {
    /// 1-based competition rank; 0 when the score is absent from the cohort
    /// (e.g. racing an in-flight write). Not an error.
    pub rank: usize,
    /// How many cohort scores equal this one (including the student's own).
    pub tied: usize,
    pub cohort: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RankError {
    pub code: String,
    pub message: String,
}

impl RankError {
    fn db(e: rusqlite::Error) -> Self {
        Self {
            code: "db_query_failed".to_string(),
            message: e.to_string(),
        }
    }
}

/// Competition ranking: rank = 1 + count of strictly greater scores; tied
/// scores share the rank. No secondary tie-break key.
pub fn rank_among(scores: &[f64], mine: f64) -> Standing {
    let cohort = scores.len();
    let tied = scores.iter().filter(|s| **s == mine).count();
    if tied == 0 {
        return Standing {
            rank: 0,
            tied: 0,
            cohort,
        };
    }
    let greater = scores.iter().filter(|s| **s > mine).count();
    Standing {
        rank: greater + 1,
        tied,
        cohort,
    }
}

/// Exam-score standing among all scored submissions for (subject, round).
pub fn exam_standing(
    conn: &Connection,
    subject: &str,
    round: i64,
    total: f64,
) -> Result<Standing, RankError> {
    let mut stmt = conn
        .prepare(
            "SELECT total FROM submissions
             WHERE subject = ? AND round = ? AND total IS NOT NULL",
        )
        .map_err(RankError::db)?;
    let scores: Vec<f64> = stmt
        .query_map((subject, round), |r| r.get(0))
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(RankError::db)?;
    Ok(rank_among(&scores, total))
}

/// Standing among composite term scores. Only rows with exam, mid-term and
/// performance scores all present participate; composites are rounded to two
/// decimals before comparison, matching what students see.
pub fn term_standing(
    conn: &Connection,
    subject: &str,
    round: i64,
    my_term_score: f64,
) -> Result<Standing, RankError> {
    let mut stmt = conn
        .prepare(
            "SELECT total, mid_score, perf_score FROM submissions
             WHERE subject = ? AND round = ?
               AND total IS NOT NULL AND mid_score IS NOT NULL AND perf_score IS NOT NULL",
        )
        .map_err(RankError::db)?;
    let scores: Vec<f64> = stmt
        .query_map((subject, round), |r| {
            let total: f64 = r.get(0)?;
            let mid: f64 = r.get(1)?;
            let perf: f64 = r.get(2)?;
            Ok(term_score(total, mid, perf))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(RankError::db)?;
    Ok(rank_among(&scores, round2(my_term_score)))
}
