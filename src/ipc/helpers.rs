use crate::ipc::error::err;
use crate::ipc::types::AppState;
use crate::settings::{load_system_config, SystemConfig};
use rusqlite::Connection;

pub fn require_db<'a>(
    state: &'a AppState,
    id: &str,
) -> Result<&'a Connection, serde_json::Value> {
    state
        .db
        .as_ref()
        .ok_or_else(|| err(id, "no_workspace", "no workspace selected", None))
}

pub fn param_str<'a>(
    params: &'a serde_json::Value,
    id: &str,
    key: &str,
) -> Result<&'a str, serde_json::Value> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| err(id, "bad_params", format!("missing params.{}", key), None))
}

pub fn param_bool(
    params: &serde_json::Value,
    id: &str,
    key: &str,
) -> Result<bool, serde_json::Value> {
    params
        .get(key)
        .and_then(|v| v.as_bool())
        .ok_or_else(|| err(id, "bad_params", format!("params.{} must be boolean", key), None))
}

pub fn param_f64(
    params: &serde_json::Value,
    id: &str,
    key: &str,
) -> Result<f64, serde_json::Value> {
    params
        .get(key)
        .and_then(|v| v.as_f64())
        .ok_or_else(|| err(id, "bad_params", format!("params.{} must be a number", key), None))
}

pub fn param_i64(
    params: &serde_json::Value,
    id: &str,
    key: &str,
) -> Result<i64, serde_json::Value> {
    params
        .get(key)
        .and_then(|v| v.as_i64())
        .ok_or_else(|| err(id, "bad_params", format!("params.{} must be an integer", key), None))
}

/// Resolve the round a request targets: explicit `round` param, else the
/// system's current round.
pub fn resolve_round(
    conn: &Connection,
    params: &serde_json::Value,
    id: &str,
) -> Result<(i64, SystemConfig), serde_json::Value> {
    let cfg = load_system_config(conn);
    match params.get("round") {
        None => Ok((cfg.current_round, cfg)),
        Some(v) if v.is_null() => Ok((cfg.current_round, cfg)),
        Some(v) => {
            let round = v.as_i64().ok_or_else(|| {
                err(id, "bad_params", "params.round must be an integer", None)
            })?;
            if round < 1 {
                return Err(err(id, "bad_params", "params.round must be >= 1", None));
            }
            Ok((round, cfg))
        }
    }
}
