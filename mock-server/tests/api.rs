use axum::http::{self, Request, StatusCode};
use base64::Engine;
use http_body_util::BodyExt;
use mock_server::{app, APPLICATION_ID, SECRET};
use serde_json::Value;
use tower::ServiceExt;

fn authorization() -> String {
    let token = base64::engine::general_purpose::STANDARD.encode(format!("{APPLICATION_ID}:{SECRET}"));
    format!("Basic {token}")
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn get(uri: &str) -> Request<String> {
    Request::builder()
        .uri(uri)
        .header(http::header::AUTHORIZATION, authorization())
        .body(String::new())
        .unwrap()
}

fn json_request(method: &str, uri: &str, body: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::AUTHORIZATION, authorization())
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(body.to_string())
        .unwrap()
}

// --- auth ---

#[tokio::test]
async fn missing_credentials_return_401() {
    let resp = app(3)
        .oneshot(Request::builder().uri("/people/v2/people").body(String::new()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(resp).await;
    assert_eq!(body["errors"][0]["status"], "401");
}

// --- list ---

#[tokio::test]
async fn list_people_defaults_to_25_per_page() {
    let resp = app(40).oneshot(get("/people/v2/people")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 25);
    assert_eq!(body["meta"]["total_count"], 40);
}

#[tokio::test]
async fn list_people_honors_window() {
    let resp = app(237)
        .oneshot(get("/people/v2/people?per_page=100&offset=200"))
        .await
        .unwrap();

    let body = body_json(resp).await;
    let data = body["data"].as_array().unwrap();
    assert_eq!(data.len(), 37);
    assert_eq!(data[0]["id"], "201");
}

#[tokio::test]
async fn list_people_caps_per_page_at_100() {
    let resp = app(150)
        .oneshot(get("/people/v2/people?per_page=500"))
        .await
        .unwrap();

    let body = body_json(resp).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 100);
}

#[tokio::test]
async fn list_people_filters_with_where() {
    let resp = app(20)
        .oneshot(get("/people/v2/people?where[id][gte]=18"))
        .await
        .unwrap();

    let body = body_json(resp).await;
    let ids: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["18", "19", "20"]);
}

#[tokio::test]
async fn list_people_orders_descending() {
    let resp = app(5)
        .oneshot(get("/people/v2/people?order=-id&per_page=2"))
        .await
        .unwrap();

    let body = body_json(resp).await;
    assert_eq!(body["data"][0]["id"], "5");
    assert_eq!(body["data"][1]["id"], "4");
}

#[tokio::test]
async fn list_people_side_loads_emails() {
    let resp = app(5)
        .oneshot(get("/people/v2/people?per_page=2&include=emails"))
        .await
        .unwrap();

    let body = body_json(resp).await;
    let included = body["included"].as_array().unwrap();
    assert_eq!(included.len(), 2);
    assert_eq!(included[0]["type"], "Email");
}

// --- nested ---

#[tokio::test]
async fn list_emails_for_person() {
    let resp = app(3).oneshot(get("/people/v2/people/2/emails")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["data"][0]["attributes"]["address"], "person2@example.com");
}

#[tokio::test]
async fn get_email_by_nested_id() {
    let resp = app(3).oneshot(get("/people/v2/people/3/emails/1003")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["data"]["id"], "1003");
}

// --- get ---

#[tokio::test]
async fn get_person_not_found() {
    let resp = app(3).oneshot(get("/people/v2/people/99")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body = body_json(resp).await;
    assert_eq!(body["errors"][0]["title"], "Not Found");
}

#[tokio::test]
async fn get_person_bad_id_returns_400() {
    let resp = app(3).oneshot(get("/people/v2/people/not-a-number")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// --- write ---

#[tokio::test]
async fn create_person_returns_201() {
    let resp = app(3)
        .oneshot(json_request(
            "POST",
            "/people/v2/people",
            r#"{"data":{"attributes":{"first_name":"Ann","last_name":"Lee"}}}"#,
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::CREATED);
    let body = body_json(resp).await;
    assert_eq!(body["data"]["id"], "4");
    assert_eq!(body["data"]["attributes"]["first_name"], "Ann");
}

#[tokio::test]
async fn create_person_without_first_name_returns_422() {
    let resp = app(3)
        .oneshot(json_request("POST", "/people/v2/people", r#"{"data":{"attributes":{}}}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(resp).await;
    assert_eq!(body["errors"][0]["status"], "422");
}

#[tokio::test]
async fn patch_person_updates_given_fields() {
    let resp = app(3)
        .oneshot(json_request(
            "PATCH",
            "/people/v2/people/1",
            r#"{"data":{"attributes":{"last_name":"Changed"}}}"#,
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["data"]["attributes"]["first_name"], "First1");
    assert_eq!(body["data"]["attributes"]["last_name"], "Changed");
}

#[tokio::test]
async fn broken_endpoint_returns_500() {
    let resp = app(0).oneshot(get("/people/v2/broken")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

// --- services ---

#[tokio::test]
async fn list_service_types() {
    let resp = app(0).oneshot(get("/services/v2/service_types")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 3);
    assert_eq!(body["data"][0]["type"], "ServiceType");
    assert_eq!(body["data"][0]["attributes"]["name"], "Sunday Morning");
}

#[tokio::test]
async fn list_plans_pages_within_service_type() {
    let resp = app(0)
        .oneshot(get("/services/v2/service_types/2/plans?per_page=10&offset=20"))
        .await
        .unwrap();

    let body = body_json(resp).await;
    let data = body["data"].as_array().unwrap();
    assert_eq!(data.len(), 10);
    assert_eq!(data[0]["id"], "221");
    assert_eq!(body["meta"]["total_count"], 30);
}

#[tokio::test]
async fn get_plan_by_nested_id() {
    let resp = app(0).oneshot(get("/services/v2/service_types/1/plans/105")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["data"]["attributes"]["title"], "Sunday Morning #5");
}

#[tokio::test]
async fn list_items_for_plan() {
    let resp = app(0)
        .oneshot(get("/services/v2/service_types/3/plans/312/items"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    let data = body["data"].as_array().unwrap();
    assert_eq!(data.len(), 4);
    assert_eq!(data[0]["id"], "3121");
    assert_eq!(data[3]["attributes"]["sequence"], 4);
}

#[tokio::test]
async fn plan_under_wrong_service_type_not_found() {
    let resp = app(0)
        .oneshot(get("/services/v2/service_types/2/plans/105/items"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = app(0).oneshot(get("/services/v2/service_types/9/plans")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
