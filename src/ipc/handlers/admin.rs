use crate::catalog;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{param_bool, param_str, require_db, resolve_round};
use crate::ipc::types::{AppState, Request};
use crate::lifecycle;
use crate::settings::{
    load_subject_settings, load_system_config, save_subject_settings, SubjectSettings,
};
use serde_json::json;

fn system_payload(cfg: &crate::settings::SystemConfig) -> serde_json::Value {
    json!({
        "currentRound": cfg.current_round,
        "examClosed": cfg.exam_closed,
        "termEndMode": cfg.term_end_mode,
    })
}

fn handle_system_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match require_db(state, &req.id) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    ok(&req.id, system_payload(&load_system_config(conn)))
}

fn handle_apply_flags(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match require_db(state, &req.id) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let exam_closed = match param_bool(&req.params, &req.id, "examClosed") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let term_end_mode = match param_bool(&req.params, &req.id, "termEndMode") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match lifecycle::apply_flags(conn, exam_closed, term_end_mode) {
        Ok(cfg) => ok(&req.id, system_payload(&cfg)),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn handle_advance_round(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match require_db(state, &req.id) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    match lifecycle::advance_round(conn) {
        Ok(cfg) => ok(&req.id, system_payload(&cfg)),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn handle_subjects_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let _ = state;
    let year_level = req.params.get("yearLevel").and_then(|v| v.as_str());
    let names: Vec<&str> = match year_level {
        Some(y) => match catalog::year_level_subjects(y) {
            Some(subs) => subs.to_vec(),
            None => return err(&req.id, "bad_params", "unknown year level", None),
        },
        None => catalog::subject_names(),
    };
    let subjects: Vec<serde_json::Value> = names
        .iter()
        .filter_map(|n| {
            catalog::subject_def(n).map(|d| {
                json!({
                    "name": n,
                    "objective": d.objective,
                    "subjective": d.subjective,
                })
            })
        })
        .collect();
    ok(&req.id, json!({ "subjects": subjects }))
}

fn handle_settings_get(state: &mut AppState, req: &Request) -> serde_json::Value {
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
    ok(
        &req.id,
        json!({
            "subject": subject,
            "round": round,
            "settings": settings,
        }),
    )
}

fn handle_settings_save(state: &mut AppState, req: &Request) -> serde_json::Value {
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
    let Some(raw) = req.params.get("settings") else {
        return err(&req.id, "bad_params", "missing params.settings", None);
    };
    let settings: SubjectSettings = match serde_json::from_value(raw.clone()) {
        Ok(s) => s,
        Err(e) => {
            return err(
                &req.id,
                "bad_params",
                format!("invalid settings: {}", e),
                None,
            )
        }
    };
    let settings = settings.normalized(def);
    match save_subject_settings(conn, subject, round, &settings) {
        Ok(()) => ok(
            &req.id,
            json!({ "subject": subject, "round": round, "settings": settings }),
        ),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "system.get" => Some(handle_system_get(state, req)),
        "system.applyFlags" => Some(handle_apply_flags(state, req)),
        "system.advanceRound" => Some(handle_advance_round(state, req)),
        "subjects.list" => Some(handle_subjects_list(state, req)),
        "settings.get" => Some(handle_settings_get(state, req)),
        "settings.save" => Some(handle_settings_save(state, req)),
        _ => None,
    }
}
