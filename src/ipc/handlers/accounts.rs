use crate::auth;
use crate::catalog;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{param_str, require_db};
use crate::ipc::types::{AppState, Request};
use crate::lifecycle;
use crate::settings::load_system_config;
use serde_json::json;
use std::collections::BTreeMap;

fn parse_prev_grades(
    params: &serde_json::Value,
    id: &str,
    year_level: &str,
) -> Result<BTreeMap<String, i64>, serde_json::Value> {
    let Some(obj) = params.get("prevGrades").and_then(|v| v.as_object()) else {
        return Err(err(id, "bad_params", "params.prevGrades must be an object", None));
    };
    let allowed = catalog::year_level_subjects(year_level).unwrap_or(&[]);

    let mut out = BTreeMap::new();
    for (subject, grade) in obj {
        if !allowed.contains(&subject.as_str()) {
            return Err(err(
                id,
                "bad_params",
                format!("subject {} is not offered at {}", subject, year_level),
                None,
            ));
        }
        let Some(g) = grade.as_i64() else {
            return Err(err(id, "bad_params", "grades must be integers", None));
        };
        if !(1..=9).contains(&g) {
            return Err(err(id, "bad_params", "grades must be in 1..=9", None));
        }
        out.insert(subject.clone(), g);
    }
    Ok(out)
}

fn handle_sign_up(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match require_db(state, &req.id) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let username = match param_str(&req.params, &req.id, "username") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let password = match param_str(&req.params, &req.id, "password") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let year_level = match param_str(&req.params, &req.id, "yearLevel") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    if username.trim().is_empty() || password.is_empty() {
        return err(&req.id, "bad_params", "username and password are required", None);
    }
    if !catalog::is_year_level(year_level) {
        return err(&req.id, "bad_params", "unknown year level", None);
    }
    let prev_grades = match parse_prev_grades(&req.params, &req.id, year_level) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match auth::signup(conn, username.trim(), password, year_level, &prev_grades) {
        Ok(()) => ok(&req.id, json!({ "username": username.trim() })),
        Err(e) => err(&req.id, &e.code, e.message, None),
    }
}

fn handle_log_in(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match require_db(state, &req.id) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let username = match param_str(&req.params, &req.id, "username") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let password = match param_str(&req.params, &req.id, "password") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let account = match auth::login(conn, username, password) {
        Ok(a) => a,
        Err(e) => return err(&req.id, &e.code, e.message, None),
    };
    let cfg = load_system_config(conn);
    let pending = lifecycle::pending_confirmation(account.last_confirmed_round, &cfg);

    ok(
        &req.id,
        json!({
            "username": account.username,
            "role": account.role,
            "yearLevel": account.year_level,
            "prevGrades": account.prev_grades,
            "lastConfirmedRound": account.last_confirmed_round,
            "currentRound": cfg.current_round,
            "examClosed": cfg.exam_closed,
            "termEndMode": cfg.term_end_mode,
            "pendingGradeConfirmation": pending,
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "auth.signUp" => Some(handle_sign_up(state, req)),
        "auth.logIn" => Some(handle_log_in(state, req)),
        _ => None,
    }
}
