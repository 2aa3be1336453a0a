
use serde_json::json;
use test_support::{error_code, request_err, request_ok, spawn_sidecar, temp_dir};

const SUBJECT: &str = "Physics";

#[test]
fn advancing_increments_round_and_clears_flags() {
    let workspace = temp_dir("gradecut-lifecycle-advance");
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let fresh = request_ok(&mut stdin, &mut reader, "2", "system.get", json!({}));
    assert_eq!(fresh.get("currentRound").and_then(|v| v.as_i64()), Some(1));
    assert_eq!(fresh.get("examClosed").and_then(|v| v.as_bool()), Some(false));
    assert_eq!(fresh.get("termEndMode").and_then(|v| v.as_bool()), Some(false));

    let flagged = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "system.applyFlags",
        json!({ "examClosed": true, "termEndMode": true }),
    );
    assert_eq!(flagged.get("currentRound").and_then(|v| v.as_i64()), Some(1));
    assert_eq!(flagged.get("examClosed").and_then(|v| v.as_bool()), Some(true));
    assert_eq!(flagged.get("termEndMode").and_then(|v| v.as_bool()), Some(true));

    let advanced = request_ok(&mut stdin, &mut reader, "4", "system.advanceRound", json!({}));
    assert_eq!(advanced.get("currentRound").and_then(|v| v.as_i64()), Some(2));
    assert_eq!(advanced.get("examClosed").and_then(|v| v.as_bool()), Some(false));
    assert_eq!(advanced.get("termEndMode").and_then(|v| v.as_bool()), Some(false));

    let advanced = request_ok(&mut stdin, &mut reader, "5", "system.advanceRound", json!({}));
    assert_eq!(advanced.get("currentRound").and_then(|v| v.as_i64()), Some(3));
}

#[test]
fn closed_exam_freezes_submissions() {
    let workspace = temp_dir("gradecut-lifecycle-closed");
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let got = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "settings.get",
        json!({ "subject": SUBJECT }),
    );
    let mut settings = got.get("settings").cloned().expect("settings");
    settings["active"] = json!(true);
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "settings.save",
        json!({ "subject": SUBJECT, "settings": settings }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "auth.signUp",
        json!({
            "username": "stu",
            "password": "pw",
            "yearLevel": "year2",
            "prevGrades": { SUBJECT: 4 },
        }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "system.applyFlags",
        json!({ "examClosed": true, "termEndMode": false }),
    );

    let e = request_err(
        &mut stdin,
        &mut reader,
        "6",
        "submission.submit",
        json!({
            "username": "stu",
            "subject": SUBJECT,
            "marks": vec![1; 20],
            "subVals": vec![0.0; 6],
        }),
    );
    assert_eq!(error_code(&e), "exam_closed");
}

#[test]
fn login_flags_pending_confirmation_after_advance() {
    let workspace = temp_dir("gradecut-lifecycle-pending");
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "auth.signUp",
        json!({
            "username": "stu",
            "password": "pw",
            "yearLevel": "year2",
            "prevGrades": { SUBJECT: 3 },
        }),
    );

    let first = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "auth.logIn",
        json!({ "username": "stu", "password": "pw" }),
    );
    assert_eq!(
        first.get("pendingGradeConfirmation").and_then(|v| v.as_bool()),
        Some(false)
    );

    let _ = request_ok(&mut stdin, &mut reader, "4", "system.advanceRound", json!({}));

    let second = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "auth.logIn",
        json!({ "username": "stu", "password": "pw" }),
    );
    assert_eq!(
        second.get("pendingGradeConfirmation").and_then(|v| v.as_bool()),
        Some(true)
    );
    assert_eq!(second.get("currentRound").and_then(|v| v.as_i64()), Some(2));

    // Confirming the previous round clears the pending state.
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "grades.confirm",
        json!({ "username": "stu", "round": 1, "grades": { SUBJECT: 2 } }),
    );
    let third = request_ok(
        &mut stdin,
        &mut reader,
        "7",
        "auth.logIn",
        json!({ "username": "stu", "password": "pw" }),
    );
    assert_eq!(
        third.get("pendingGradeConfirmation").and_then(|v| v.as_bool()),
        Some(false)
    );
}
