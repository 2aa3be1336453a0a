use crate::catalog;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{param_f64, param_str, require_db, resolve_round};
use crate::ipc::types::{AppState, Request};
use crate::predict;
use crate::rank;
use crate::settings::load_subject_settings;
use crate::submission::{self, SubmissionStatus};
use serde_json::json;

fn handle_prediction_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match require_db(state, &req.id) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let subject = match param_str(&req.params, &req.id, "subject") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Some(def) = catalog::subject_def(subject) else {
        return err(&req.id, "not_found", "unknown subject", None);
    };
    let (round, _) = match resolve_round(conn, &req.params, &req.id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let settings = load_subject_settings(conn, def, subject, round);
    match predict::predict_cuts(conn, &settings, subject, round) {
        Ok(p) => ok(
            &req.id,
            json!({
                "subject": subject,
                "round": round,
                "cuts": p.cuts,
                "homerCuts": p.homer_cuts,
                "displayCuts": p.display_cuts(),
                "submissionCount": p.submission_count,
                "homerActive": p.homer_active,
            }),
        ),
        Err(e) => err(&req.id, &e.code, e.message, None),
    }
}

fn handle_prediction_term(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match require_db(state, &req.id) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let subject = match param_str(&req.params, &req.id, "subject") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Some(def) = catalog::subject_def(subject) else {
        return err(&req.id, "not_found", "unknown subject", None);
    };
    let (round, cfg) = match resolve_round(conn, &req.params, &req.id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    if !cfg.term_end_mode {
        return err(&req.id, "term_mode_off", "term-end mode is not active", None);
    }

    let settings = load_subject_settings(conn, def, subject, round);
    let prediction = match predict::predict_cuts(conn, &settings, subject, round) {
        Ok(p) => p,
        Err(e) => return err(&req.id, &e.code, e.message, None),
    };
    let exam_cuts = prediction.display_cuts();
    let term_cuts = predict::term_cuts(&settings, exam_cuts);
    ok(
        &req.id,
        json!({
            "subject": subject,
            "round": round,
            "examCuts": exam_cuts,
            "termCuts": term_cuts,
            "homerActive": prediction.homer_active,
        }),
    )
}

fn handle_rank_exam(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match require_db(state, &req.id) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let subject = match param_str(&req.params, &req.id, "subject") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let total = match param_f64(&req.params, &req.id, "total") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let (round, _) = match resolve_round(conn, &req.params, &req.id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match rank::exam_standing(conn, subject, round, total) {
        Ok(s) => ok(&req.id, json!(s)),
        Err(e) => err(&req.id, &e.code, e.message, None),
    }
}

fn handle_rank_term(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match require_db(state, &req.id) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let subject = match param_str(&req.params, &req.id, "subject") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let term_score = match param_f64(&req.params, &req.id, "termScore") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let (round, _) = match resolve_round(conn, &req.params, &req.id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match rank::term_standing(conn, subject, round, term_score) {
        Ok(s) => ok(&req.id, json!(s)),
        Err(e) => err(&req.id, &e.code, e.message, None),
    }
}

/// Per-subject report rows for one user and round. Confirmed grades win over
/// predictions; unscored, unconfirmed rows are skipped.
fn handle_transcript(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match require_db(state, &req.id) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let username = match param_str(&req.params, &req.id, "username") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let (round, _) = match resolve_round(conn, &req.params, &req.id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let records = match submission::fetch_for_round(conn, username, round) {
        Ok(r) => r,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    let mut rows = Vec::new();
    for rec in records {
        match rec.status() {
            SubmissionStatus::Empty => continue,
            SubmissionStatus::Confirmed(g) => {
                rows.push(json!({
                    "subject": rec.subject,
                    "total": serde_json::Value::Null,
                    "grade": g.to_string(),
                    "confirmed": true,
                }));
            }
            SubmissionStatus::ScoredAndConfirmed(total, g) => {
                rows.push(json!({
                    "subject": rec.subject,
                    "total": total,
                    "grade": g.to_string(),
                    "confirmed": true,
                }));
            }
            SubmissionStatus::Scored(total) => {
                let Some(def) = catalog::subject_def(&rec.subject) else {
                    continue;
                };
                let settings = load_subject_settings(conn, def, &rec.subject, round);
                let prediction = match predict::predict_cuts(conn, &settings, &rec.subject, round)
                {
                    Ok(p) => p,
                    Err(e) => return err(&req.id, &e.code, e.message, None),
                };
                let grade = predict::classify(total, &prediction.display_cuts());
                rows.push(json!({
                    "subject": rec.subject,
                    "total": total,
                    "grade": grade.label(),
                    "confirmed": false,
                }));
            }
        }
    }
    ok(&req.id, json!({ "round": round, "rows": rows }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "prediction.get" => Some(handle_prediction_get(state, req)),
        "prediction.term" => Some(handle_prediction_term(state, req)),
        "rank.exam" => Some(handle_rank_exam(state, req)),
        "rank.term" => Some(handle_rank_term(state, req)),
        "report.transcript" => Some(handle_transcript(state, req)),
        _ => None,
    }
}
