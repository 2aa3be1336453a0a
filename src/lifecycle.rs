use crate::settings::{load_system_config, save_system_config, SystemConfig};
use crate::submission;
use rusqlite::Connection;
use std::collections::BTreeMap;

/// Highest grade bucket the predictor distinguishes. Report cards go to 9;
/// everything from 5 down behaves the same for calibration.
pub const MAX_PREDICTION_BUCKET: i64 = 5;

/// Start the next exam round. Closed/term flags never carry over.
pub fn advance_round(conn: &Connection) -> anyhow::Result<SystemConfig> {
    let mut cfg = load_system_config(conn);
    cfg.current_round += 1;
    cfg.exam_closed = false;
    cfg.term_end_mode = false;
    save_system_config(conn, &cfg)?;
    Ok(cfg)
}

/// Toggle the closed/term flags without touching the round counter.
pub fn apply_flags(
    conn: &Connection,
    exam_closed: bool,
    term_end_mode: bool,
) -> anyhow::Result<SystemConfig> {
    let mut cfg = load_system_config(conn);
    cfg.exam_closed = exam_closed;
    cfg.term_end_mode = term_end_mode;
    save_system_config(conn, &cfg)?;
    Ok(cfg)
}

/// A user who has not confirmed grades for the round that just ended must do
/// so before anything else. Round 1 has nothing to confirm.
pub fn pending_confirmation(last_confirmed_round: i64, cfg: &SystemConfig) -> bool {
    cfg.current_round > 1 && last_confirmed_round < cfg.current_round
}

/// Record confirmed report-card grades for `confirm_round`.
///
/// Grades are clamped to the prediction bucket ceiling, written back as the
/// user's prev_grades, and attached as final grades to that round's
/// submission rows (placeholder rows for subjects never submitted). Upsert
/// semantics make re-confirmation idempotent.
pub fn confirm_grades(
    conn: &Connection,
    username: &str,
    confirm_round: i64,
    grades: &BTreeMap<String, i64>,
) -> anyhow::Result<()> {
    let cfg = load_system_config(conn);
    let clamped: BTreeMap<String, i64> = grades
        .iter()
        .map(|(s, g)| (s.clone(), (*g).min(MAX_PREDICTION_BUCKET)))
        .collect();

    let blob = serde_json::to_string(&clamped)?;
    conn.execute(
        "UPDATE users SET prev_grades = ?, last_confirmed_round = ? WHERE username = ?",
        (&blob, cfg.current_round, username),
    )?;

    if confirm_round > 0 {
        for (subject, grade) in &clamped {
            submission::upsert_final_grade(conn, username, subject, confirm_round, *grade)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth;
    use crate::db;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_workspace(prefix: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "{}-{}",
            prefix,
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .expect("clock")
                .as_nanos()
        ))
    }

    #[test]
    fn advancing_resets_flags_and_bumps_round() {
        let conn = db::open_db(&temp_workspace("gradecut-lifecycle-adv")).expect("open");
        apply_flags(&conn, true, true).expect("flags");
        let cfg = advance_round(&conn).expect("advance");
        assert_eq!(cfg.current_round, 2);
        assert!(!cfg.exam_closed);
        assert!(!cfg.term_end_mode);
        let cfg = advance_round(&conn).expect("advance");
        assert_eq!(cfg.current_round, 3);
    }

    #[test]
    fn flags_do_not_touch_round() {
        let conn = db::open_db(&temp_workspace("gradecut-lifecycle-flags")).expect("open");
        let cfg = apply_flags(&conn, true, false).expect("flags");
        assert_eq!(cfg.current_round, 1);
        assert!(cfg.exam_closed);
        assert!(!cfg.term_end_mode);
    }

    #[test]
    fn pending_confirmation_only_after_round_one() {
        let mut cfg = crate::settings::SystemConfig::default();
        assert!(!pending_confirmation(1, &cfg));
        cfg.current_round = 3;
        assert!(pending_confirmation(2, &cfg));
        assert!(!pending_confirmation(3, &cfg));
    }

    #[test]
    fn confirm_grades_is_idempotent_and_backfills_placeholders() {
        let conn = db::open_db(&temp_workspace("gradecut-lifecycle-confirm")).expect("open");
        let mut prev = BTreeMap::new();
        prev.insert("Physics".to_string(), 3);
        auth::signup(&conn, "stu", "pw", "year2", &prev).expect("signup");
        advance_round(&conn).expect("advance");

        let mut grades = BTreeMap::new();
        grades.insert("Physics".to_string(), 7);
        confirm_grades(&conn, "stu", 1, &grades).expect("confirm");
        confirm_grades(&conn, "stu", 1, &grades).expect("confirm again");

        let rows: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM submissions WHERE username = 'stu' AND subject = 'Physics' AND round = 1",
                [],
                |r| r.get(0),
            )
            .expect("count");
        assert_eq!(rows, 1);

        let rec = crate::submission::fetch(&conn, "stu", "Physics", 1)
            .expect("fetch")
            .expect("row");
        // Clamped to the bucket ceiling, placeholder total stays NULL.
        assert_eq!(rec.final_grade, Some(5));
        assert_eq!(rec.total, None);

        let (prev_grades, last_confirmed): (String, i64) = conn
            .query_row(
                "SELECT prev_grades, last_confirmed_round FROM users WHERE username = 'stu'",
                [],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .expect("user");
        assert_eq!(last_confirmed, 2);
        let parsed: BTreeMap<String, i64> = serde_json::from_str(&prev_grades).expect("json");
        assert_eq!(parsed.get("Physics"), Some(&5));
    }
}
