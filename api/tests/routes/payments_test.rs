use serde_json::json;

use crate::helpers::make_test_app;
use api::auth::generate_jwt;
use db::models::user::{Model as User, Role};
use db::test_utils::seed_class;

#[tokio::test]
async fn recording_a_payment_is_admin_only() {
    let test = make_test_app().await;
    let db = test.state.db();
    let class = seed_class(db, 2).await;

    let admin = User::create(db, "bursar", "bursar@school.test", "password1", Role::Admin)
        .await
        .unwrap();
    let admin_token = generate_jwt(admin.id, Role::Admin).0;
    let student_token = generate_jwt(class.students[0].user_id, Role::Student).0;

    let payload = json!({
        "enrollment_id": class.enrollments[0].id,
        "amount": 150_000,
        "method": "kpay"
    });

    // students hold no create capability on payments
    let (status, _) = test
        .request(
            "POST",
            "/api/payments",
            Some(&student_token),
            Some(payload.clone()),
        )
        .await;
    assert_eq!(status, 403);

    let (status, body) = test
        .request("POST", "/api/payments", Some(&admin_token), Some(payload))
        .await;
    assert_eq!(status, 201, "create payment failed: {body}");
    assert_eq!(body["data"]["method"], "kpay");
    assert_eq!(body["data"]["amount"], 150_000);

    // unknown enrollments are rejected before anything is written
    let (status, _) = test
        .request(
            "POST",
            "/api/payments",
            Some(&admin_token),
            Some(json!({"enrollment_id": 999_999, "amount": 1, "method": "cash"})),
        )
        .await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn students_only_ever_see_their_own_payments() {
    let test = make_test_app().await;
    let db = test.state.db();
    let class = seed_class(db, 2).await;

    let admin = User::create(db, "bursar", "bursar@school.test", "password1", Role::Admin)
        .await
        .unwrap();
    let admin_token = generate_jwt(admin.id, Role::Admin).0;

    for (enrollment, method) in class.enrollments.iter().zip(["kpay", "cash"]) {
        let (status, _) = test
            .request(
                "POST",
                "/api/payments",
                Some(&admin_token),
                Some(json!({
                    "enrollment_id": enrollment.id,
                    "amount": 150_000,
                    "method": method
                })),
            )
            .await;
        assert_eq!(status, 201);
    }

    let (status, body) = test
        .request("GET", "/api/payments", Some(&admin_token), None)
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["items"].as_array().unwrap().len(), 2);

    // the student_id filter in the query is ignored for students
    let student_token = generate_jwt(class.students[0].user_id, Role::Student).0;
    let uri = format!("/api/payments?student_id={}", class.students[1].id);
    let (status, body) = test.request("GET", &uri, Some(&student_token), None).await;
    assert_eq!(status, 200);
    let items = body["data"]["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["enrollment_id"], class.enrollments[0].id);

    // admins may scope by student
    let uri = format!("/api/payments?student_id={}", class.students[1].id);
    let (status, body) = test.request("GET", &uri, Some(&admin_token), None).await;
    assert_eq!(status, 200);
    let items = body["data"]["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["method"], "cash");
}
