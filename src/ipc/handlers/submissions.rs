use crate::auth;
use crate::catalog;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{param_f64, param_i64, param_str, require_db, resolve_round};
use crate::ipc::types::{AppState, Request};
use crate::lifecycle;
use crate::predict::TERM_BASE_POINTS;
use crate::scoring;
use crate::settings::{load_subject_settings, load_system_config};
use crate::submission::{self, SubmissionStatus};
use serde_json::json;
use std::collections::BTreeMap;

fn status_label(status: SubmissionStatus) -> &'static str {
    match status {
        SubmissionStatus::Empty => "empty",
        SubmissionStatus::Scored(_) => "scored",
        SubmissionStatus::Confirmed(_) => "confirmed",
        SubmissionStatus::ScoredAndConfirmed(_, _) => "scoredAndConfirmed",
    }
}

fn parse_i64_array(
    params: &serde_json::Value,
    id: &str,
    key: &str,
) -> Result<Vec<i64>, serde_json::Value> {
    let Some(arr) = params.get(key).and_then(|v| v.as_array()) else {
        return Err(err(id, "bad_params", format!("params.{} must be an array", key), None));
    };
    arr.iter()
        .map(|v| v.as_i64())
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| err(id, "bad_params", format!("params.{} must be integers", key), None))
}

fn parse_f64_array(
    params: &serde_json::Value,
    id: &str,
    key: &str,
) -> Result<Vec<f64>, serde_json::Value> {
    let Some(arr) = params.get(key).and_then(|v| v.as_array()) else {
        return Err(err(id, "bad_params", format!("params.{} must be an array", key), None));
    };
    arr.iter()
        .map(|v| v.as_f64())
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| err(id, "bad_params", format!("params.{} must be numbers", key), None))
}

fn handle_submit(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match require_db(state, &req.id) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let username = match param_str(&req.params, &req.id, "username") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let subject = match param_str(&req.params, &req.id, "subject") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Some(def) = catalog::subject_def(subject) else {
        return err(&req.id, "not_found", "unknown subject", None);
    };
    let marks = match parse_i64_array(&req.params, &req.id, "marks") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let sub_vals = match parse_f64_array(&req.params, &req.id, "subVals") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let cfg = load_system_config(conn);
    if cfg.exam_closed {
        return err(
            &req.id,
            "exam_closed",
            "scoring is closed for this round; confirm official grades instead",
            None,
        );
    }
    let settings = load_subject_settings(conn, def, subject, cfg.current_round);
    if !settings.active {
        return err(&req.id, "subject_inactive", "subject is not open this round", None);
    }

    let account = match auth::fetch_account(conn, username) {
        Ok(a) => a,
        Err(e) => return err(&req.id, &e.code, e.message, None),
    };
    let Some(prev_grade) = account.prev_grades.get(subject).copied() else {
        return err(
            &req.id,
            "validation_failed",
            "user is not enrolled in this subject",
            None,
        );
    };

    let total = match scoring::score_submission(def, &settings, &marks, &sub_vals) {
        Ok(t) => t,
        Err(e) => return err(&req.id, &e.code, e.message, e.details),
    };

    match submission::upsert_scored(
        conn,
        username,
        subject,
        cfg.current_round,
        total,
        prev_grade,
        &marks,
        &sub_vals,
    ) {
        Ok(()) => ok(
            &req.id,
            json!({
                "username": username,
                "subject": subject,
                "round": cfg.current_round,
                "total": total,
            }),
        ),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn handle_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match require_db(state, &req.id) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let username = match param_str(&req.params, &req.id, "username") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let subject = match param_str(&req.params, &req.id, "subject") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let (round, _) = match resolve_round(conn, &req.params, &req.id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match submission::fetch(conn, username, subject, round) {
        Ok(Some(rec)) => {
            let status = status_label(rec.status());
            ok(
                &req.id,
                json!({ "found": true, "status": status, "record": rec }),
            )
        }
        Ok(None) => ok(&req.id, json!({ "found": false, "status": "empty" })),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn handle_save_term_inputs(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match require_db(state, &req.id) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let username = match param_str(&req.params, &req.id, "username") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let subject = match param_str(&req.params, &req.id, "subject") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let mid_score = match param_f64(&req.params, &req.id, "midScore") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let perf_score = match param_f64(&req.params, &req.id, "perfScore") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let cfg = load_system_config(conn);
    if !cfg.term_end_mode {
        return err(&req.id, "term_mode_off", "term-end mode is not active", None);
    }
    if !(0.0..=100.0).contains(&mid_score) {
        return err(&req.id, "validation_failed", "midScore must be in 0..=100", None);
    }
    if !(0.0..=TERM_BASE_POINTS).contains(&perf_score) {
        return err(
            &req.id,
            "validation_failed",
            format!("perfScore must be in 0..={}", TERM_BASE_POINTS),
            None,
        );
    }

    match submission::set_term_inputs(conn, username, subject, cfg.current_round, mid_score, perf_score)
    {
        Ok(true) => ok(
            &req.id,
            json!({ "subject": subject, "round": cfg.current_round }),
        ),
        Ok(false) => err(
            &req.id,
            "not_found",
            "no scored submission to attach term inputs to",
            None,
        ),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn handle_confirm_grades(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match require_db(state, &req.id) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let username = match param_str(&req.params, &req.id, "username") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let confirm_round = match param_i64(&req.params, &req.id, "round") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Some(obj) = req.params.get("grades").and_then(|v| v.as_object()) else {
        return err(&req.id, "bad_params", "params.grades must be an object", None);
    };

    let cfg = load_system_config(conn);
    if confirm_round < 0 || confirm_round > cfg.current_round {
        return err(
            &req.id,
            "bad_params",
            "round must be a past or current round",
            None,
        );
    }
    if let Err(e) = auth::fetch_account(conn, username) {
        return err(&req.id, &e.code, e.message, None);
    }

    let mut grades = BTreeMap::new();
    for (subject, grade) in obj {
        if catalog::subject_def(subject).is_none() {
            return err(&req.id, "not_found", format!("unknown subject: {}", subject), None);
        }
        let Some(g) = grade.as_i64() else {
            return err(&req.id, "bad_params", "grades must be integers", None);
        };
        if !(1..=9).contains(&g) {
            return err(&req.id, "bad_params", "grades must be in 1..=9", None);
        }
        grades.insert(subject.clone(), g);
    }

    match lifecycle::confirm_grades(conn, username, confirm_round, &grades) {
        Ok(()) => ok(
            &req.id,
            json!({
                "username": username,
                "confirmedRound": confirm_round,
                "lastConfirmedRound": cfg.current_round,
            }),
        ),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "submission.submit" => Some(handle_submit(state, req)),
        "submission.get" => Some(handle_get(state, req)),
        "submission.saveTermInputs" => Some(handle_save_term_inputs(state, req)),
        "grades.confirm" => Some(handle_confirm_grades(state, req)),
        _ => None,
    }
}
