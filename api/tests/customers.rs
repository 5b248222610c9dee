use actix_web::{
    http::{header, StatusCode},
    test, web, App,
};
use api::{
    auth::{create_token, AuthenticationMiddleware},
    routes,
    state::AppState,
};
use bill::BillSettings;
use chrono::FixedOffset;
use common::{
    service::CustomerService,
    store::{AnyStore, MemoryStore},
};
use serde_json::{json, Value};

const SECRET: &str = "test-secret";

fn state() -> web::Data<AppState> {
    web::Data::new(AppState {
        service: CustomerService::new(AnyStore::Memory(MemoryStore::new())),
        bill: BillSettings::default(),
        utc_offset: FixedOffset::east_opt(0).unwrap(),
        page_size: 10,
    })
}

fn bearer() -> (header::HeaderName, String) {
    let token = create_token("user-1", Some("owner@shop.test"), SECRET, 600).unwrap();
    (header::AUTHORIZATION, format!("Bearer {}", token))
}

macro_rules! app {
    ($state:expr) => {
        test::init_service(
            App::new()
                .app_data($state.clone())
                .wrap(AuthenticationMiddleware::new(SECRET.to_string()))
                .configure(routes::configure),
        )
        .await
    };
}

fn customer(name: &str, day: &str) -> Value {
    json!({
        "name": name,
        "phone": "9876543210",
        "date": day,
        "trial_date": day,
        "delivery_date": day,
    })
}

#[actix_web::test]
async fn health_needs_no_token() {
    let state = state();
    let app = app!(state);

    let resp = test::call_service(&app, test::TestRequest::get().uri("/health").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn customer_routes_require_a_valid_token() {
    let state = state();
    let app = app!(state);

    let missing = test::TestRequest::get().uri("/customers").to_request();
    let err = test::try_call_service(&app, missing).await.unwrap_err();
    assert_eq!(err.as_response_error().status_code(), StatusCode::UNAUTHORIZED);

    let forged = create_token("user-1", None, "another-secret", 600).unwrap();
    let req = test::TestRequest::get()
        .uri("/customers")
        .insert_header((header::AUTHORIZATION, format!("Bearer {}", forged)))
        .to_request();
    let err = test::try_call_service(&app, req).await.unwrap_err();
    assert_eq!(err.as_response_error().status_code(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn amit_is_listed_today_and_leaves_the_pending_deliveries() {
    let state = state();
    let today = state.today().to_string();
    let app = app!(state);

    let req = test::TestRequest::post()
        .uri("/customers")
        .insert_header(bearer())
        .set_json(customer("Amit", &today))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created: Value = test::read_body_json(resp).await;
    assert_eq!(created["success"], true);
    assert_eq!(created["data"]["selected_garments"], json!([]));
    assert_eq!(created["data"]["recorded_by"], "owner@shop.test");
    let id = created["data"]["id"].as_str().unwrap().to_string();

    let req = test::TestRequest::get()
        .uri("/customers?filter=today")
        .insert_header(bearer())
        .to_request();
    let listed: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(listed["count"], 1);
    assert_eq!(listed["customers"][0]["id"], id.as_str());

    let req = test::TestRequest::post()
        .uri(&format!("/customers/{}/delivery", id))
        .insert_header(bearer())
        .set_json(json!({ "value": true }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = test::TestRequest::get()
        .uri("/dashboard/deliveries?filter=not_delivered")
        .insert_header(bearer())
        .to_request();
    let pending: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(pending, json!([]));

    let req = test::TestRequest::get()
        .uri("/dashboard/deliveries?filter=delivered")
        .insert_header(bearer())
        .to_request();
    let delivered: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(delivered[0]["id"], id.as_str());
}

#[actix_web::test]
async fn same_day_duplicates_are_renamed() {
    let state = state();
    let app = app!(state);

    let mut names = Vec::new();
    for _ in 0..3 {
        let req = test::TestRequest::post()
            .uri("/customers")
            .insert_header(bearer())
            .set_json(customer("Rajesh", "2024-01-10"))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        names.push(body["data"]["name"].as_str().unwrap().to_string());
    }
    assert_eq!(names, ["Rajesh", "Rajesh Size 2", "Rajesh Size 3"]);
}

#[actix_web::test]
async fn validation_failures_name_the_field() {
    let state = state();
    let app = app!(state);

    let mut body = customer("Amit", "2024-01-10");
    body["phone"] = json!("12345");
    let req = test::TestRequest::post()
        .uri("/customers")
        .insert_header(bearer())
        .set_json(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let error: Value = test::read_body_json(resp).await;
    assert_eq!(error["success"], false);
    assert_eq!(error["field"], "phone");

    let mut body = customer("Amit", "2024-01-10");
    body["delivery_date"] = json!("2024-01-05");
    let req = test::TestRequest::post()
        .uri("/customers")
        .insert_header(bearer())
        .set_json(body)
        .to_request();
    let error: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(error["field"], "trial_date");
}

#[actix_web::test]
async fn unknown_customers_are_not_found() {
    let state = state();
    let app = app!(state);

    let req = test::TestRequest::get()
        .uri("/customers/5f0c2a9e-3b1d-4c7e-9a55-2b8f0e6d1c44")
        .insert_header(bearer())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let error: Value = test::read_body_json(resp).await;
    assert_eq!(error["success"], false);
}

#[actix_web::test]
async fn unknown_filters_are_rejected() {
    let state = state();
    let app = app!(state);

    let req = test::TestRequest::get()
        .uri("/customers?filter=fortnight")
        .insert_header(bearer())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn bill_downloads_as_a_pdf_attachment() {
    let state = state();
    let app = app!(state);

    let mut body = customer("Amit Kumar", "2024-01-10");
    body["selected_garments"] = json!(["Shirt"]);
    body["measurements"] = json!({ "Shirt": { "chest": "40 1/4", "length": 30 } });
    body["notes"] = json!("Slim fit");
    let req = test::TestRequest::post()
        .uri("/customers")
        .insert_header(bearer())
        .set_json(body)
        .to_request();
    let created: Value = test::call_and_read_body_json(&app, req).await;
    let id = created["data"]["id"].as_str().unwrap().to_string();

    let req = test::TestRequest::get()
        .uri(&format!("/customers/{}/bill", id))
        .insert_header(bearer())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/pdf"
    );
    let disposition = resp
        .headers()
        .get(header::CONTENT_DISPOSITION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.contains("Amit_Kumar_10-01-2024.pdf"));

    let bytes = test::read_body(resp).await;
    assert!(bytes.starts_with(b"%PDF"));
}

#[actix_web::test]
async fn edit_form_splits_measurements_for_editing() {
    let state = state();
    let app = app!(state);

    let mut body = customer("Amit", "2024-01-10");
    body["selected_garments"] = json!(["Pant"]);
    body["measurements"] = json!({ "Pant": { "waist": 32.5 } });
    let req = test::TestRequest::post()
        .uri("/customers")
        .insert_header(bearer())
        .set_json(body)
        .to_request();
    let created: Value = test::call_and_read_body_json(&app, req).await;
    let id = created["data"]["id"].as_str().unwrap().to_string();

    let req = test::TestRequest::get()
        .uri(&format!("/customers/{}/form", id))
        .insert_header(bearer())
        .to_request();
    let form: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(form["measurements"]["Pant"]["waist"], "32 1/2");
    assert_eq!(form["editing"]["Pant"]["waist"], json!({ "whole": "32", "fraction": "1/2" }));
}

#[actix_web::test]
async fn dashboard_counts_todays_customers() {
    let state = state();
    let today = state.today().to_string();
    let app = app!(state);

    for name in ["Amit", "Bhavesh"] {
        let req = test::TestRequest::post()
            .uri("/customers")
            .insert_header(bearer())
            .set_json(customer(name, &today))
            .to_request();
        test::call_service(&app, req).await;
    }

    let req = test::TestRequest::get()
        .uri("/dashboard/stats")
        .insert_header(bearer())
        .to_request();
    let stats: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(stats["total"], 2);
    assert_eq!(stats["today"], 2);

    let req = test::TestRequest::get()
        .uri("/dashboard/inbox?kind=delivery&status=pending")
        .insert_header(bearer())
        .to_request();
    let inbox: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(inbox.as_array().unwrap().len(), 2);
    assert_eq!(inbox[0]["type"], "delivery");
}
