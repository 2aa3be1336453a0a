
use serde_json::json;
use test_support::{error_code, request_err, request_ok, spawn_sidecar, temp_dir};

#[test]
fn signup_validates_year_level_and_enrolment() {
    let workspace = temp_dir("gradecut-auth-signup");
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let e = request_err(
        &mut stdin,
        &mut reader,
        "2",
        "auth.signUp",
        json!({
            "username": "stu",
            "password": "pw",
            "yearLevel": "year9",
            "prevGrades": {},
        }),
    );
    assert_eq!(error_code(&e), "bad_params");

    // Physics is a year2 subject.
    let e = request_err(
        &mut stdin,
        &mut reader,
        "3",
        "auth.signUp",
        json!({
            "username": "stu",
            "password": "pw",
            "yearLevel": "year1",
            "prevGrades": { "Physics": 3 },
        }),
    );
    assert_eq!(error_code(&e), "bad_params");

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "auth.signUp",
        json!({
            "username": "stu",
            "password": "pw",
            "yearLevel": "year2",
            "prevGrades": { "Physics": 3, "Chemistry": 8 },
        }),
    );

    let e = request_err(
        &mut stdin,
        &mut reader,
        "5",
        "auth.signUp",
        json!({
            "username": "stu",
            "password": "other",
            "yearLevel": "year2",
            "prevGrades": {},
        }),
    );
    assert_eq!(error_code(&e), "duplicate_user");

    // Report-card grade 8 clamps to the prediction bucket ceiling.
    let login = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "auth.logIn",
        json!({ "username": "stu", "password": "pw" }),
    );
    assert_eq!(
        login
            .get("prevGrades")
            .and_then(|g| g.get("Chemistry"))
            .and_then(|v| v.as_i64()),
        Some(5)
    );
    assert_eq!(login.get("role").and_then(|v| v.as_str()), Some("user"));
    assert_eq!(login.get("yearLevel").and_then(|v| v.as_str()), Some("year2"));
}

#[test]
fn login_failures_are_indistinguishable() {
    let workspace = temp_dir("gradecut-auth-login");
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
            "password": "right",
            "yearLevel": "year1",
            "prevGrades": {},
        }),
    );

    let wrong_pw = request_err(
        &mut stdin,
        &mut reader,
        "3",
        "auth.logIn",
        json!({ "username": "stu", "password": "wrong" }),
    );
    let unknown_user = request_err(
        &mut stdin,
        &mut reader,
        "4",
        "auth.logIn",
        json!({ "username": "ghost", "password": "right" }),
    );
    assert_eq!(error_code(&wrong_pw), "auth_failed");
    assert_eq!(error_code(&unknown_user), "auth_failed");
    assert_eq!(
        wrong_pw.get("message").and_then(|v| v.as_str()),
        unknown_user.get("message").and_then(|v| v.as_str())
    );
}
