use std::{cmp::Ordering, collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, Query, Request, State},
    http::{header::AUTHORIZATION, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use base64::Engine;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};

pub const APPLICATION_ID: &str = "test-app";
pub const SECRET: &str = "test-secret";

const DEFAULT_PER_PAGE: usize = 25;
const MAX_PER_PAGE: usize = 100;

const SERVICE_TYPE_NAMES: [&str; 3] = ["Sunday Morning", "Wednesday Night", "Youth"];
const PLANS_PER_SERVICE_TYPE: u64 = 30;
const ITEMS_PER_PLAN: u64 = 4;

#[derive(Clone, Debug)]
pub struct Person {
    pub id: u64,
    pub first_name: String,
    pub last_name: String,
}

impl Person {
    fn field(&self, name: &str) -> Option<String> {
        match name {
            "id" => Some(self.id.to_string()),
            "first_name" => Some(self.first_name.clone()),
            "last_name" => Some(self.last_name.clone()),
            _ => None,
        }
    }

    fn resource(&self) -> Value {
        json!({
            "type": "Person",
            "id": self.id.to_string(),
            "attributes": {
                "first_name": self.first_name,
                "last_name": self.last_name,
            },
        })
    }
}

#[derive(Clone, Debug)]
pub struct Email {
    pub id: u64,
    pub person_id: u64,
    pub address: String,
}

impl Email {
    fn resource(&self) -> Value {
        json!({
            "type": "Email",
            "id": self.id.to_string(),
            "attributes": { "address": self.address },
            "relationships": {
                "person": { "data": { "type": "Person", "id": self.person_id.to_string() } },
            },
        })
    }
}

#[derive(Clone, Debug)]
pub struct ServiceType {
    pub id: u64,
    pub name: String,
}

impl ServiceType {
    fn resource(&self) -> Value {
        json!({
            "type": "ServiceType",
            "id": self.id.to_string(),
            "attributes": { "name": self.name },
        })
    }
}

#[derive(Clone, Debug)]
pub struct Plan {
    pub id: u64,
    pub service_type_id: u64,
    pub title: String,
}

impl Plan {
    fn resource(&self) -> Value {
        json!({
            "type": "Plan",
            "id": self.id.to_string(),
            "attributes": { "title": self.title },
            "relationships": {
                "service_type": { "data": { "type": "ServiceType", "id": self.service_type_id.to_string() } },
            },
        })
    }
}

#[derive(Clone, Debug)]
pub struct Item {
    pub id: u64,
    pub plan_id: u64,
    pub title: String,
    pub sequence: u64,
}

impl Item {
    fn resource(&self) -> Value {
        json!({
            "type": "Item",
            "id": self.id.to_string(),
            "attributes": { "title": self.title, "sequence": self.sequence },
        })
    }
}

/// JSON:API write payload: `{"data": {"attributes": {...}}}`.
#[derive(Deserialize)]
pub struct PersonPayload {
    pub data: PersonData,
}

#[derive(Deserialize)]
pub struct PersonData {
    pub attributes: PersonAttributes,
}

#[derive(Deserialize)]
pub struct PersonAttributes {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Default)]
pub struct Store {
    pub people: Vec<Person>,
    pub emails: Vec<Email>,
    pub service_types: Vec<ServiceType>,
    pub plans: Vec<Plan>,
    pub items: Vec<Item>,
    next_id: u64,
}

impl Store {
    /// `count` people numbered from 1, each with one email address, plus a
    /// fixed Services tree: service types 1..=3 with 30 plans each (plan ids
    /// `type * 100 + n`) and 4 items per plan (item ids `plan * 10 + n`).
    pub fn seeded(count: usize) -> Self {
        let mut store = Store::default();
        for n in 1..=count as u64 {
            store.people.push(Person {
                id: n,
                first_name: format!("First{n}"),
                last_name: format!("Last{:03}", n % 7),
            });
            store.emails.push(Email {
                id: 1000 + n,
                person_id: n,
                address: format!("person{n}@example.com"),
            });
        }
        store.next_id = count as u64 + 1;
        store.seed_services();
        store
    }

    fn seed_services(&mut self) {
        for (type_id, name) in (1..).zip(SERVICE_TYPE_NAMES) {
            self.service_types.push(ServiceType {
                id: type_id,
                name: name.to_string(),
            });
            for n in 1..=PLANS_PER_SERVICE_TYPE {
                let plan_id = type_id * 100 + n;
                self.plans.push(Plan {
                    id: plan_id,
                    service_type_id: type_id,
                    title: format!("{name} #{n}"),
                });
                for sequence in 1..=ITEMS_PER_PLAN {
                    self.items.push(Item {
                        id: plan_id * 10 + sequence,
                        plan_id,
                        title: format!("Item {sequence}"),
                        sequence,
                    });
                }
            }
        }
    }

    fn plan(&self, service_type_id: u64, plan_id: u64) -> Option<&Plan> {
        self.plans
            .iter()
            .find(|p| p.service_type_id == service_type_id && p.id == plan_id)
    }
}

pub type Db = Arc<RwLock<Store>>;

#[derive(Clone)]
struct AppState {
    db: Db,
    authorization: Arc<String>,
}

pub fn app(seed: usize) -> Router {
    let token = base64::engine::general_purpose::STANDARD.encode(format!("{APPLICATION_ID}:{SECRET}"));
    let state = AppState {
        db: Arc::new(RwLock::new(Store::seeded(seed))),
        authorization: Arc::new(format!("Basic {token}")),
    };
    Router::new()
        .route("/people/v2/people", get(list_people).post(create_person))
        .route(
            "/people/v2/people/{id}",
            get(get_person).put(update_person).patch(update_person),
        )
        .route("/people/v2/people/{id}/emails", get(list_emails))
        .route("/people/v2/people/{id}/emails/{email_id}", get(get_email))
        .route("/people/v2/broken", get(broken))
        .route("/services/v2/service_types", get(list_service_types))
        .route("/services/v2/service_types/{id}", get(get_service_type))
        .route("/services/v2/service_types/{id}/plans", get(list_plans))
        .route("/services/v2/service_types/{id}/plans/{plan_id}", get(get_plan))
        .route(
            "/services/v2/service_types/{id}/plans/{plan_id}/items",
            get(list_items),
        )
        .layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state)
}

pub async fn run(listener: TcpListener, seed: usize) -> Result<(), std::io::Error> {
    axum::serve(listener, app(seed)).await
}

fn error(status: StatusCode, title: &str) -> Response {
    let body = json!({
        "errors": [{ "status": status.as_u16().to_string(), "title": title }],
    });
    (status, Json(body)).into_response()
}

async fn require_auth(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let authorized = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value == state.authorization.as_str());
    if !authorized {
        tracing::warn!(uri = %request.uri(), "rejecting unauthenticated request");
        return error(StatusCode::UNAUTHORIZED, "Unauthorized");
    }
    next.run(request).await
}

/// Split `where[field]` or `where[field][op]` into `(field, op)`.
fn parse_where(key: &str) -> Option<(&str, &str)> {
    let rest = key.strip_prefix("where[")?;
    let (field, remainder) = rest.split_once(']')?;
    let op = remainder
        .strip_prefix('[')
        .and_then(|r| r.strip_suffix(']'))
        .unwrap_or("eq");
    Some((field, op))
}

fn compare(actual: &str, expected: &str) -> Ordering {
    match (actual.parse::<i64>(), expected.parse::<i64>()) {
        (Ok(a), Ok(b)) => a.cmp(&b),
        _ => actual.cmp(expected),
    }
}

fn matches(person: &Person, params: &HashMap<String, String>) -> bool {
    params.iter().all(|(key, expected)| {
        let Some((field, op)) = parse_where(key) else {
            return true;
        };
        let Some(actual) = person.field(field) else {
            return false;
        };
        let ordering = compare(&actual, expected);
        match op {
            "gt" => ordering == Ordering::Greater,
            "gte" => ordering != Ordering::Less,
            "lt" => ordering == Ordering::Less,
            "lte" => ordering != Ordering::Greater,
            _ => ordering == Ordering::Equal,
        }
    })
}

/// `(offset, per_page)` from the query string; `per_page` is capped at 100.
fn window(params: &HashMap<String, String>) -> (usize, usize) {
    let offset = params
        .get("offset")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    let per_page = params
        .get("per_page")
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_PER_PAGE)
        .clamp(1, MAX_PER_PAGE);
    (offset, per_page)
}

fn paged<T>(items: Vec<T>, params: &HashMap<String, String>) -> (Vec<T>, usize) {
    let total = items.len();
    let (offset, per_page) = window(params);
    (items.into_iter().skip(offset).take(per_page).collect(), total)
}

/// One page of `resources` as a JSON:API collection document.
fn collection(resources: Vec<Value>, params: &HashMap<String, String>) -> Response {
    let (page, total) = paged(resources, params);
    Json(json!({
        "data": page,
        "included": [],
        "meta": { "total_count": total, "count": page.len() },
    }))
    .into_response()
}

async fn list_people(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let store = state.db.read().await;
    let mut people: Vec<Person> = store
        .people
        .iter()
        .filter(|p| matches(p, &params))
        .cloned()
        .collect();

    if let Some(order) = params.get("order") {
        let (field, descending) = match order.strip_prefix('-') {
            Some(field) => (field, true),
            None => (order.as_str(), false),
        };
        people.sort_by(|a, b| {
            let ordering = compare(
                &a.field(field).unwrap_or_default(),
                &b.field(field).unwrap_or_default(),
            );
            if descending { ordering.reverse() } else { ordering }
        });
    }

    let (page, total) = paged(people, &params);
    let include_emails = params
        .get("include")
        .is_some_and(|include| include.split(',').any(|name| name == "emails"));
    let included: Vec<Value> = if include_emails {
        store
            .emails
            .iter()
            .filter(|e| page.iter().any(|p| p.id == e.person_id))
            .map(Email::resource)
            .collect()
    } else {
        Vec::new()
    };

    Json(json!({
        "data": page.iter().map(Person::resource).collect::<Vec<_>>(),
        "included": included,
        "meta": { "total_count": total, "count": page.len() },
    }))
    .into_response()
}

async fn create_person(State(state): State<AppState>, Json(input): Json<PersonPayload>) -> Response {
    let PersonAttributes {
        first_name,
        last_name,
    } = input.data.attributes;
    let Some(first_name) = first_name.filter(|name| !name.is_empty()) else {
        return error(StatusCode::UNPROCESSABLE_ENTITY, "first_name can't be blank");
    };

    let mut store = state.db.write().await;
    let person = Person {
        id: store.next_id,
        first_name,
        last_name: last_name.unwrap_or_default(),
    };
    store.next_id += 1;
    store.people.push(person.clone());
    (StatusCode::CREATED, Json(json!({ "data": person.resource() }))).into_response()
}

async fn get_person(State(state): State<AppState>, Path(id): Path<u64>) -> Response {
    let store = state.db.read().await;
    match store.people.iter().find(|p| p.id == id) {
        Some(person) => Json(json!({ "data": person.resource() })).into_response(),
        None => error(StatusCode::NOT_FOUND, "Not Found"),
    }
}

async fn update_person(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(input): Json<PersonPayload>,
) -> Response {
    let mut store = state.db.write().await;
    let Some(person) = store.people.iter_mut().find(|p| p.id == id) else {
        return error(StatusCode::NOT_FOUND, "Not Found");
    };
    if let Some(first_name) = input.data.attributes.first_name {
        person.first_name = first_name;
    }
    if let Some(last_name) = input.data.attributes.last_name {
        person.last_name = last_name;
    }
    Json(json!({ "data": person.resource() })).into_response()
}

async fn list_emails(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let store = state.db.read().await;
    if !store.people.iter().any(|p| p.id == id) {
        return error(StatusCode::NOT_FOUND, "Not Found");
    }
    let emails = store
        .emails
        .iter()
        .filter(|e| e.person_id == id)
        .map(Email::resource)
        .collect();
    collection(emails, &params)
}

async fn get_email(State(state): State<AppState>, Path((id, email_id)): Path<(u64, u64)>) -> Response {
    let store = state.db.read().await;
    match store
        .emails
        .iter()
        .find(|e| e.person_id == id && e.id == email_id)
    {
        Some(email) => Json(json!({ "data": email.resource() })).into_response(),
        None => error(StatusCode::NOT_FOUND, "Not Found"),
    }
}

async fn broken() -> Response {
    error(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
}

async fn list_service_types(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let store = state.db.read().await;
    let service_types = store.service_types.iter().map(ServiceType::resource).collect();
    collection(service_types, &params)
}

async fn get_service_type(State(state): State<AppState>, Path(id): Path<u64>) -> Response {
    let store = state.db.read().await;
    match store.service_types.iter().find(|t| t.id == id) {
        Some(service_type) => Json(json!({ "data": service_type.resource() })).into_response(),
        None => error(StatusCode::NOT_FOUND, "Not Found"),
    }
}

async fn list_plans(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let store = state.db.read().await;
    if !store.service_types.iter().any(|t| t.id == id) {
        return error(StatusCode::NOT_FOUND, "Not Found");
    }
    let plans = store
        .plans
        .iter()
        .filter(|p| p.service_type_id == id)
        .map(Plan::resource)
        .collect();
    collection(plans, &params)
}

async fn get_plan(State(state): State<AppState>, Path((id, plan_id)): Path<(u64, u64)>) -> Response {
    let store = state.db.read().await;
    match store.plan(id, plan_id) {
        Some(plan) => Json(json!({ "data": plan.resource() })).into_response(),
        None => error(StatusCode::NOT_FOUND, "Not Found"),
    }
}

async fn list_items(
    State(state): State<AppState>,
    Path((id, plan_id)): Path<(u64, u64)>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let store = state.db.read().await;
    if store.plan(id, plan_id).is_none() {
        return error(StatusCode::NOT_FOUND, "Not Found");
    }
    let items = store
        .items
        .iter()
        .filter(|i| i.plan_id == plan_id)
        .map(Item::resource)
        .collect();
    collection(items, &params)
}
