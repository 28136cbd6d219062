use chrono::{Datelike, Days, Utc};
use sea_orm::DatabaseConnection;
use serde_json::{Value, json};

use crate::helpers::{TestApp, make_test_app};
use api::auth::generate_jwt;
use db::models::attendance_session::Model as Session;
use db::models::timetable::Model as Timetable;
use db::models::user::{Model as User, Role};
use db::test_utils::{ClassFixture, seed_class};

/// Class with three students plus a timetable slot that meets today and
/// spans the whole day, so its session is open for scanning during the test.
async fn seed_open_class(db: &DatabaseConnection) -> (ClassFixture, Timetable) {
    let class = seed_class(db, 3).await;
    let weekday = Utc::now().date_naive().weekday().num_days_from_sunday() as i32;
    let today_slot = Timetable::create(db, class.batch.id, weekday, "00:00", "23:59")
        .await
        .expect("create today slot");
    (class, today_slot)
}

fn teacher_token(class: &ClassFixture) -> String {
    generate_jwt(class.teacher.user_id, Role::Teacher).0
}

fn student_token(class: &ClassFixture, i: usize) -> String {
    generate_jwt(class.students[i].user_id, Role::Student).0
}

async fn list_sessions(test: &TestApp, class: &ClassFixture) -> Value {
    let uri = format!("/api/attendances/teachers/{}/sessions", class.teacher.id);
    let (status, body) = test
        .request("GET", &uri, Some(&teacher_token(class)), None)
        .await;
    assert_eq!(status, 200, "list sessions failed: {body}");
    body["data"].clone()
}

/// The session row for today's slot, materialized by the listing itself.
async fn todays_session(test: &TestApp, class: &ClassFixture, slot: &Timetable) -> Value {
    let data = list_sessions(test, class).await;
    data["sessions"]
        .as_array()
        .unwrap()
        .iter()
        .find(|s| s["timetable_id"] == slot.id)
        .expect("today's session missing from listing")
        .clone()
}

fn scan_token_of(session: &Value) -> String {
    let qr_url = session["qr_url"].as_str().unwrap();
    qr_url.split("token=").nth(1).unwrap().to_owned()
}

#[tokio::test]
async fn listing_materializes_todays_session_with_counts_and_qr_url() {
    let test = make_test_app().await;
    let (class, slot) = seed_open_class(test.state.db()).await;

    let session = todays_session(&test, &class, &slot).await;

    assert_eq!(session["status"], "pending");
    assert_eq!(session["batch_name"], "Math 2026-A");
    assert_eq!(session["present_count"], 0);
    assert_eq!(session["total_count"], 3);
    assert!(
        session["qr_url"]
            .as_str()
            .unwrap()
            .starts_with("http://localhost:3001/student/attendances/scan?token=")
    );

    // listing again reuses the same session
    let again = todays_session(&test, &class, &slot).await;
    assert_eq!(again["id"], session["id"]);
}

#[tokio::test]
async fn listing_requires_the_teacher_themselves() {
    let test = make_test_app().await;
    let (class, _) = seed_open_class(test.state.db()).await;

    let intruder = User::create(
        test.state.db(),
        "other.teacher",
        "other.teacher@school.test",
        "password1",
        Role::Teacher,
    )
    .await
    .unwrap();
    let other = db::models::teacher::Model::create(test.state.db(), intruder.id, "Other", None)
        .await
        .unwrap();
    let token = generate_jwt(other.user_id, Role::Teacher).0;

    let uri = format!("/api/attendances/teachers/{}/sessions", class.teacher.id);
    let (status, _) = test.request("GET", &uri, Some(&token), None).await;
    assert_eq!(status, 403);

    let (status, _) = test.request("GET", &uri, None, None).await;
    assert_eq!(status, 401);
}

#[tokio::test]
async fn generate_is_idempotent_over_http() {
    let test = make_test_app().await;
    let (class, slot) = seed_open_class(test.state.db()).await;
    let session = todays_session(&test, &class, &slot).await;
    let uri = format!("/api/attendances/sessions/{}/generate", session["id"].as_str().unwrap());

    let (status, body) = test
        .request("POST", &uri, Some(&teacher_token(&class)), None)
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["records"].as_array().unwrap().len(), 3);

    let (status, body) = test
        .request("POST", &uri, Some(&teacher_token(&class)), None)
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["records"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn generate_rejects_unknown_session_and_foreign_teacher() {
    let test = make_test_app().await;
    let (class, slot) = seed_open_class(test.state.db()).await;
    let session = todays_session(&test, &class, &slot).await;

    let (status, _) = test
        .request(
            "POST",
            "/api/attendances/sessions/no-such-session/generate",
            Some(&teacher_token(&class)),
            None,
        )
        .await;
    assert_eq!(status, 404);

    let intruder = User::create(
        test.state.db(),
        "foreign.teacher",
        "foreign.teacher@school.test",
        "password1",
        Role::Teacher,
    )
    .await
    .unwrap();
    db::models::teacher::Model::create(test.state.db(), intruder.id, "Foreign", None)
        .await
        .unwrap();
    let token = generate_jwt(intruder.id, Role::Teacher).0;

    let uri = format!("/api/attendances/sessions/{}/generate", session["id"].as_str().unwrap());
    let (status, _) = test.request("POST", &uri, Some(&token), None).await;
    assert_eq!(status, 403);
}

#[tokio::test]
async fn generate_on_a_finished_session_is_a_conflict() {
    let test = make_test_app().await;
    let (class, _) = seed_open_class(test.state.db()).await;

    // a session on a past date finishes on first touch
    let past = Utc::now().date_naive() - Days::new(7);
    let session = Session::find_or_create_for(test.state.db(), &class.timetable, past)
        .await
        .unwrap();

    let uri = format!("/api/attendances/sessions/{}/generate", session.id);
    let (status, body) = test
        .request("POST", &uri, Some(&teacher_token(&class)), None)
        .await;
    assert_eq!(status, 409);
    assert_eq!(body["message"], "Attendance session already finished");

    let records = db::models::attendance_record::Model::for_session(test.state.db(), &session.id)
        .await
        .unwrap();
    assert!(records.is_empty());
}

#[tokio::test]
async fn scan_marks_present_and_repeating_is_a_success_noop() {
    let test = make_test_app().await;
    let (class, slot) = seed_open_class(test.state.db()).await;
    let session = todays_session(&test, &class, &slot).await;
    let token = scan_token_of(&session);
    let uri = format!("/api/attendances/records/scan/{token}");

    let (status, body) = test
        .request("POST", &uri, Some(&student_token(&class, 0)), None)
        .await;
    assert_eq!(status, 200, "scan failed: {body}");
    assert_eq!(body["data"]["present"], true);

    // flaky networks retry the POST; the second call must also succeed
    let (status, body) = test
        .request("POST", &uri, Some(&student_token(&class, 0)), None)
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["present"], true);

    let records = db::models::attendance_record::Model::for_session(
        test.state.db(),
        session["id"].as_str().unwrap(),
    )
    .await
    .unwrap();
    assert_eq!(records.iter().filter(|r| r.present).count(), 1);
}

#[tokio::test]
async fn scan_rejects_unknown_tokens_and_outsiders() {
    let test = make_test_app().await;
    let (class, slot) = seed_open_class(test.state.db()).await;
    let session = todays_session(&test, &class, &slot).await;
    let token = scan_token_of(&session);

    let (status, _) = test
        .request(
            "POST",
            "/api/attendances/records/scan/not-a-real-token",
            Some(&student_token(&class, 0)),
            None,
        )
        .await;
    assert_eq!(status, 404);

    // a student with no enrollment in the batch
    let outsider = User::create(
        test.state.db(),
        "outsider",
        "outsider@school.test",
        "password1",
        Role::Student,
    )
    .await
    .unwrap();
    db::models::student::Model::create(test.state.db(), outsider.id, "Outsider", None)
        .await
        .unwrap();
    let outsider_token = generate_jwt(outsider.id, Role::Student).0;

    let uri = format!("/api/attendances/records/scan/{token}");
    let (status, body) = test.request("POST", &uri, Some(&outsider_token), None).await;
    assert_eq!(status, 403);
    assert_eq!(body["message"], "You are not enrolled in this class");

    // teachers cannot scan themselves in
    let (status, _) = test
        .request("POST", &uri, Some(&teacher_token(&class)), None)
        .await;
    assert_eq!(status, 403);
}

#[tokio::test]
async fn expired_token_scan_is_gone_and_mutates_nothing() {
    let test = make_test_app().await;
    let (class, _) = seed_open_class(test.state.db()).await;

    // a session on a past date is expired the moment it exists
    let past = Utc::now().date_naive() - Days::new(30);
    let session = Session::find_or_create_for(test.state.db(), &class.timetable, past)
        .await
        .unwrap();

    let uri = format!("/api/attendances/records/scan/{}", session.token);
    let (status, body) = test
        .request("POST", &uri, Some(&student_token(&class, 0)), None)
        .await;
    assert_eq!(status, 410);
    assert_eq!(body["message"], "Attendance token expired");

    let records =
        db::models::attendance_record::Model::for_session(test.state.db(), &session.id)
            .await
            .unwrap();
    assert!(records.is_empty());
}

#[tokio::test]
async fn override_marks_records_present_and_is_teacher_only() {
    let test = make_test_app().await;
    let (class, slot) = seed_open_class(test.state.db()).await;
    let session = todays_session(&test, &class, &slot).await;

    let generate_uri = format!(
        "/api/attendances/sessions/{}/generate",
        session["id"].as_str().unwrap()
    );
    let (_, body) = test
        .request("POST", &generate_uri, Some(&teacher_token(&class)), None)
        .await;
    let record_id = body["data"]["records"][0]["id"].as_i64().unwrap();

    // students lack the update capability
    let (status, _) = test
        .request(
            "PUT",
            "/api/attendances/records",
            Some(&student_token(&class, 0)),
            Some(json!({"record_ids": [record_id]})),
        )
        .await;
    assert_eq!(status, 403);

    let (status, body) = test
        .request(
            "PUT",
            "/api/attendances/records",
            Some(&teacher_token(&class)),
            Some(json!({"record_ids": [record_id]})),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["updated"], json!([record_id]));

    // repeating the override is harmless
    let (status, _) = test
        .request(
            "PUT",
            "/api/attendances/records",
            Some(&teacher_token(&class)),
            Some(json!({"record_ids": [record_id]})),
        )
        .await;
    assert_eq!(status, 200);

    let (status, _) = test
        .request(
            "PUT",
            "/api/attendances/records",
            Some(&teacher_token(&class)),
            Some(json!({"record_ids": [999_999]})),
        )
        .await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn summary_counts_follow_scans_through_the_cache() {
    let test = make_test_app().await;
    let (class, slot) = seed_open_class(test.state.db()).await;
    let session = todays_session(&test, &class, &slot).await;
    let token = scan_token_of(&session);
    let scan_uri = format!("/api/attendances/records/scan/{token}");

    // prime the cached summary
    assert_eq!(session["present_count"], 0);

    test.request("POST", &scan_uri, Some(&student_token(&class, 0)), None)
        .await;
    let after_first = todays_session(&test, &class, &slot).await;
    assert_eq!(after_first["present_count"], 1);
    assert_eq!(after_first["total_count"], 3);

    test.request("POST", &scan_uri, Some(&student_token(&class, 1)), None)
        .await;
    let after_second = todays_session(&test, &class, &slot).await;
    assert_eq!(after_second["present_count"], 2);
    assert_eq!(after_second["total_count"], 3);
}

#[tokio::test]
async fn enrolling_a_student_refreshes_cached_summary_totals() {
    let test = make_test_app().await;
    let db = test.state.db();
    let (class, slot) = seed_open_class(db).await;

    // prime the cached summary at three enrollments
    let session = todays_session(&test, &class, &slot).await;
    assert_eq!(session["total_count"], 3);

    let late_user = User::create(
        db,
        "latecomer",
        "latecomer@school.test",
        "password1",
        Role::Student,
    )
    .await
    .unwrap();
    let late = db::models::student::Model::create(db, late_user.id, "Latecomer", None)
        .await
        .unwrap();

    let admin = User::create(db, "admin", "admin@school.test", "password1", Role::Admin)
        .await
        .unwrap();
    let admin_token = generate_jwt(admin.id, Role::Admin).0;
    let (status, _) = test
        .request(
            "POST",
            "/api/enrollments",
            Some(&admin_token),
            Some(json!({"batch_id": class.batch.id, "student_id": late.id})),
        )
        .await;
    assert_eq!(status, 201);

    let after = todays_session(&test, &class, &slot).await;
    assert_eq!(after["total_count"], 4);
    assert_eq!(after["present_count"], 0);
}

#[tokio::test]
async fn record_listing_shows_student_names() {
    let test = make_test_app().await;
    let (class, slot) = seed_open_class(test.state.db()).await;
    let session = todays_session(&test, &class, &slot).await;
    let session_id = session["id"].as_str().unwrap();

    let generate_uri = format!("/api/attendances/sessions/{session_id}/generate");
    test.request("POST", &generate_uri, Some(&teacher_token(&class)), None)
        .await;

    let records_uri = format!("/api/attendances/sessions/{session_id}/records");
    let (status, body) = test
        .request("GET", &records_uri, Some(&teacher_token(&class)), None)
        .await;
    assert_eq!(status, 200);
    let records = body["data"]["records"].as_array().unwrap();
    assert_eq!(records.len(), 3);
    let names: Vec<&str> = records
        .iter()
        .map(|r| r["student_name"].as_str().unwrap())
        .collect();
    assert!(names.contains(&"Student 0"));
    assert_eq!(body["data"]["total_count"], 3);

    // a second read comes from the cache and must agree
    let (status, cached) = test
        .request("GET", &records_uri, Some(&teacher_token(&class)), None)
        .await;
    assert_eq!(status, 200);
    assert_eq!(cached["data"], body["data"]);
}
