use chrono::Utc;
use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;

/// One row per (username, subject, round), upserted. A row with a NULL total
/// and a final grade is a retroactive confirmation with no exam score.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionRecord {
    pub username: String,
    pub subject: String,
    pub round: i64,
    pub total: Option<f64>,
    pub prev_grade: Option<i64>,
    pub marks: Option<Vec<i64>>,
    pub sub_vals: Option<Vec<f64>>,
    pub final_grade: Option<i64>,
    pub mid_score: Option<f64>,
    pub perf_score: Option<f64>,
    pub updated_at: Option<String>,
}

/// Explicit submission state instead of presence/absence branching.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SubmissionStatus {
    Empty,
    Scored(f64),
    Confirmed(i64),
    ScoredAndConfirmed(f64, i64),
}

impl SubmissionRecord {
    pub fn status(&self) -> SubmissionStatus {
        match (self.total, self.final_grade) {
            (Some(t), Some(g)) => SubmissionStatus::ScoredAndConfirmed(t, g),
            (Some(t), None) => SubmissionStatus::Scored(t),
            (None, Some(g)) => SubmissionStatus::Confirmed(g),
            (None, None) => SubmissionStatus::Empty,
        }
    }
}

fn parse_vec<T: serde::de::DeserializeOwned>(raw: Option<String>) -> Option<Vec<T>> {
    raw.and_then(|s| serde_json::from_str(&s).ok())
}

pub fn fetch(
    conn: &Connection,
    username: &str,
    subject: &str,
    round: i64,
) -> rusqlite::Result<Option<SubmissionRecord>> {
    conn.query_row(
        "SELECT total, prev_grade, marks, sub_vals, final_grade, mid_score, perf_score, updated_at
         FROM submissions
         WHERE username = ? AND subject = ? AND round = ?",
        (username, subject, round),
        |r| {
            Ok(SubmissionRecord {
                username: username.to_string(),
                subject: subject.to_string(),
                round,
                total: r.get(0)?,
                prev_grade: r.get(1)?,
                marks: parse_vec(r.get(2)?),
                sub_vals: parse_vec(r.get(3)?),
                final_grade: r.get(4)?,
                mid_score: r.get(5)?,
                perf_score: r.get(6)?,
                updated_at: r.get(7)?,
            })
        },
    )
    .optional()
}

pub fn fetch_for_round(
    conn: &Connection,
    username: &str,
    round: i64,
) -> rusqlite::Result<Vec<SubmissionRecord>> {
    let mut stmt = conn.prepare(
        "SELECT subject, total, prev_grade, marks, sub_vals, final_grade, mid_score, perf_score, updated_at
         FROM submissions
         WHERE username = ? AND round = ?
         ORDER BY subject",
    )?;
    let rows = stmt
        .query_map((username, round), |r| {
            Ok(SubmissionRecord {
                username: username.to_string(),
                subject: r.get(0)?,
                round,
                total: r.get(1)?,
                prev_grade: r.get(2)?,
                marks: parse_vec(r.get(3)?),
                sub_vals: parse_vec(r.get(4)?),
                final_grade: r.get(5)?,
                mid_score: r.get(6)?,
                perf_score: r.get(7)?,
                updated_at: r.get(8)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Record (or replace) a scored submission. Term inputs and any confirmed
/// final grade on the row survive a resubmission.
pub fn upsert_scored(
    conn: &Connection,
    username: &str,
    subject: &str,
    round: i64,
    total: f64,
    prev_grade: i64,
    marks: &[i64],
    sub_vals: &[f64],
) -> anyhow::Result<()> {
    let marks_json = serde_json::to_string(marks)?;
    let sub_vals_json = serde_json::to_string(sub_vals)?;
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO submissions(username, subject, round, total, prev_grade, marks, sub_vals, updated_at)
         VALUES(?, ?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT(username, subject, round) DO UPDATE SET
           total = excluded.total,
           prev_grade = excluded.prev_grade,
           marks = excluded.marks,
           sub_vals = excluded.sub_vals,
           updated_at = excluded.updated_at",
        (
            username,
            subject,
            round,
            total,
            prev_grade,
            &marks_json,
            &sub_vals_json,
            &now,
        ),
    )?;
    Ok(())
}

/// Store the student's term-end inputs on an existing scored row. Returns
/// false when there is no submission to attach them to.
pub fn set_term_inputs(
    conn: &Connection,
    username: &str,
    subject: &str,
    round: i64,
    mid_score: f64,
    perf_score: f64,
) -> rusqlite::Result<bool> {
    let now = Utc::now().to_rfc3339();
    let changed = conn.execute(
        "UPDATE submissions SET mid_score = ?, perf_score = ?, updated_at = ?
         WHERE username = ? AND subject = ? AND round = ?",
        (mid_score, perf_score, &now, username, subject, round),
    )?;
    Ok(changed > 0)
}

/// Attach a confirmed official grade, creating a NULL-total placeholder when
/// the student never submitted that round.
pub fn upsert_final_grade(
    conn: &Connection,
    username: &str,
    subject: &str,
    round: i64,
    grade: i64,
) -> rusqlite::Result<()> {
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO submissions(username, subject, round, total, final_grade, updated_at)
         VALUES(?, ?, ?, NULL, ?, ?)
         ON CONFLICT(username, subject, round) DO UPDATE SET
           final_grade = excluded.final_grade,
           updated_at = excluded.updated_at",
        (username, subject, round, grade, &now),
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(total: Option<f64>, final_grade: Option<i64>) -> SubmissionRecord {
        SubmissionRecord {
            username: "s1".to_string(),
            subject: "Physics".to_string(),
            round: 1,
            total,
            prev_grade: None,
            marks: None,
            sub_vals: None,
            final_grade,
            mid_score: None,
            perf_score: None,
            updated_at: None,
        }
    }

    #[test]
    fn status_is_a_tagged_view_of_field_presence() {
        assert_eq!(record(None, None).status(), SubmissionStatus::Empty);
        assert_eq!(record(Some(81.5), None).status(), SubmissionStatus::Scored(81.5));
        assert_eq!(record(None, Some(2)).status(), SubmissionStatus::Confirmed(2));
        assert_eq!(
            record(Some(81.5), Some(2)).status(),
            SubmissionStatus::ScoredAndConfirmed(81.5, 2)
        );
    }
}
