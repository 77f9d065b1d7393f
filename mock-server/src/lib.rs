//! In-memory stand-in for the pet-store service.
//!
//! Serves the `/pet` endpoints with the status codes and body shapes the
//! public service uses, so client tests can run without the network. Pets
//! are stored as the JSON the client sent; no validation beyond "is an
//! object" is done, mirroring how lenient the real service is.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};

/// Reply body for everything that is not a pet.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ApiResponse {
    pub code: i64,
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
}

impl ApiResponse {
    fn new(code: i64, kind: &str, message: impl Into<String>) -> Self {
        Self {
            code,
            kind: kind.to_string(),
            message: message.into(),
        }
    }
}

#[derive(Deserialize)]
pub struct FormUpdate {
    pub name: Option<String>,
    pub status: Option<String>,
}

#[derive(Clone, Default)]
pub struct Store {
    pets: Arc<RwLock<BTreeMap<i64, Value>>>,
    next_id: Arc<AtomicI64>,
}

impl Store {
    /// Id from the payload when present and non-zero, otherwise the next
    /// counter value not already in `pets`.
    fn assign_id(
        &self,
        pets: &BTreeMap<i64, Value>,
        pet: &mut serde_json::Map<String, Value>,
    ) -> i64 {
        if let Some(id) = pet.get("id").and_then(Value::as_i64).filter(|id| *id != 0) {
            return id;
        }
        let id = loop {
            let candidate = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
            if !pets.contains_key(&candidate) {
                break candidate;
            }
        };
        pet.insert("id".to_string(), json!(id));
        id
    }

    async fn upsert(&self, body: &[u8]) -> Response {
        let Ok(Value::Object(mut pet)) = serde_json::from_slice::<Value>(body) else {
            return error(StatusCode::BAD_REQUEST, ApiResponse::new(400, "unknown", "bad input"));
        };
        // Choosing the id and storing the pet happen under one write lock.
        let mut pets = self.pets.write().await;
        let id = self.assign_id(&pets, &mut pet);
        let pet = Value::Object(pet);
        pets.insert(id, pet.clone());
        drop(pets);
        tracing::debug!(id, "stored pet");
        (StatusCode::OK, Json(pet)).into_response()
    }
}

pub fn app() -> Router {
    Router::new()
        .route("/pet", post(create_pet).put(update_pet))
        .route("/pet/findByStatus", get(find_by_status))
        .route("/pet/findByTags", get(find_by_tags))
        .route(
            "/pet/{id}",
            get(get_pet).post(update_with_form).delete(delete_pet),
        )
        .route("/pet/{id}/uploadImage", post(upload_image))
        .with_state(Store::default())
}

/// Base path the public service serves its API under.
pub const BASE_PATH: &str = "/v2";

/// Serve `app()` under `BASE_PATH` until the listener fails.
pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, Router::new().nest(BASE_PATH, app())).await
}

fn error(status: StatusCode, body: ApiResponse) -> Response {
    (status, Json(body)).into_response()
}

fn parse_id(raw: &str) -> Result<i64, Response> {
    raw.parse().map_err(|_| {
        error(
            StatusCode::NOT_FOUND,
            ApiResponse::new(404, "unknown", format!("For input string: \"{raw}\"")),
        )
    })
}

async fn create_pet(State(store): State<Store>, body: Bytes) -> Response {
    store.upsert(&body).await
}

async fn update_pet(State(store): State<Store>, body: Bytes) -> Response {
    store.upsert(&body).await
}

async fn get_pet(State(store): State<Store>, Path(raw): Path<String>) -> Response {
    let id = match parse_id(&raw) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match store.pets.read().await.get(&id) {
        Some(pet) => (StatusCode::OK, Json(pet.clone())).into_response(),
        None => error(StatusCode::NOT_FOUND, ApiResponse::new(1, "error", "Pet not found")),
    }
}

async fn delete_pet(State(store): State<Store>, Path(raw): Path<String>) -> Response {
    let id = match parse_id(&raw) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match store.pets.write().await.remove(&id) {
        Some(_) => (
            StatusCode::OK,
            Json(ApiResponse::new(200, "unknown", id.to_string())),
        )
            .into_response(),
        // The public service answers a missing id with an empty 404.
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn update_with_form(
    State(store): State<Store>,
    Path(raw): Path<String>,
    Form(form): Form<FormUpdate>,
) -> Response {
    let id = match parse_id(&raw) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let mut pets = store.pets.write().await;
    let Some(pet) = pets.get_mut(&id).and_then(Value::as_object_mut) else {
        return error(StatusCode::NOT_FOUND, ApiResponse::new(404, "unknown", "not found"));
    };
    if let Some(name) = form.name {
        pet.insert("name".to_string(), json!(name));
    }
    if let Some(status) = form.status {
        pet.insert("status".to_string(), json!(status));
    }
    (
        StatusCode::OK,
        Json(ApiResponse::new(200, "unknown", id.to_string())),
    )
        .into_response()
}

async fn upload_image(Path(raw): Path<String>, mut multipart: Multipart) -> Response {
    if let Err(resp) = parse_id(&raw) {
        return resp;
    }
    let mut metadata = None;
    let mut file: Option<(String, usize)> = None;
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                return error(
                    StatusCode::BAD_REQUEST,
                    ApiResponse::new(400, "unknown", e.to_string()),
                )
            }
        };
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let Ok(data) = field.bytes().await else {
            return error(
                StatusCode::BAD_REQUEST,
                ApiResponse::new(400, "unknown", "unreadable part"),
            );
        };
        match name.as_str() {
            "file" => file = Some((file_name.unwrap_or_default(), data.len())),
            "additionalMetadata" => metadata = Some(String::from_utf8_lossy(&data).into_owned()),
            _ => {}
        }
    }
    let Some((file_name, size)) = file else {
        return error(
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ApiResponse::new(415, "unknown", "missing file part"),
        );
    };
    let message = format!(
        "additionalMetadata: {}\nFile uploaded to ./{file_name}, {size} bytes",
        metadata.unwrap_or_else(|| "null".to_string())
    );
    (
        StatusCode::OK,
        Json(ApiResponse::new(200, "unknown", message)),
    )
        .into_response()
}

/// Comma-separated values of `key`, ignoring empty entries.
fn csv_param(params: &HashMap<String, String>, key: &str) -> HashSet<String> {
    params
        .get(key)
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

async fn find_by_status(
    State(store): State<Store>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Vec<Value>> {
    let wanted = csv_param(&params, "status");
    let pets = store.pets.read().await;
    Json(
        pets.values()
            .filter(|pet| {
                pet.get("status")
                    .and_then(Value::as_str)
                    .is_some_and(|status| wanted.contains(status))
            })
            .cloned()
            .collect(),
    )
}

async fn find_by_tags(
    State(store): State<Store>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Vec<Value>> {
    let wanted = csv_param(&params, "tags");
    let pets = store.pets.read().await;
    Json(
        pets.values()
            .filter(|pet| {
                pet.get("tags")
                    .and_then(Value::as_array)
                    .is_some_and(|tags| {
                        tags.iter()
                            .filter_map(|tag| tag.get("name").and_then(Value::as_str))
                            .any(|name| wanted.contains(name))
                    })
            })
            .cloned()
            .collect(),
    )
}
