//! Pet-store API client.
//!
//! # Design
//! Every remote capability has two halves. `build_*` turns typed arguments
//! into an `HttpRequest` without touching the network; the operation method
//! of the same name runs that request through the transport context and
//! normalizes the reply into an `Envelope<Value>`. Status codes are returned,
//! never judged: this is a contract-testing client.
//!
//! The transport context has an explicit lifecycle. `init` opens it,
//! `dispose` releases it, and dropping the client releases it as well, so a
//! panicking test cannot leak it. Any operation issued outside that window
//! fails with `ApiError::Uninitialized` before a request is attempted.
//!
//! Operations take `&self`, so one initialized client can issue concurrent
//! calls from scoped threads. Nothing is cached, retried or deduplicated.

use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Value};
use url::form_urlencoded;
use uuid::Uuid;

use crate::config::Config;
use crate::endpoints;
use crate::error::{ApiError, Result};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::logging::{Logger, TracingLogger};
use crate::transport::{Transport, UreqTransport};
use crate::types::{Envelope, PetStatus};

/// File name and MIME type of the `file` part of an image upload.
pub const UPLOAD_FILE_NAME: &str = "pet-image.jpg";
pub const UPLOAD_MIME_TYPE: &str = "image/jpeg";

const JSON: &str = "application/json";
const FORM: &str = "application/x-www-form-urlencoded";

/// What `create_pet_with` does with a caller-supplied `id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdPolicy {
    /// Drop it and let the service assign one.
    #[default]
    Strip,
    /// Send it, to probe how the service treats preset ids.
    Keep,
}

pub struct PetStoreClient<T: Transport = UreqTransport> {
    base_url: String,
    config: Config,
    logger: Arc<dyn Logger>,
    transport: Option<T>,
}

impl PetStoreClient<UreqTransport> {
    /// Client for `config.base_url`, logging through `tracing`.
    pub fn new(config: &Config) -> Self {
        Self::with_logger(config, Arc::new(TracingLogger))
    }

    /// Open the ureq transport context with the configured timeout.
    pub fn init(&mut self) {
        let transport = UreqTransport::new(self.config.timeout);
        self.init_with(transport);
    }
}

impl<T: Transport> PetStoreClient<T> {
    pub fn with_logger(config: &Config, logger: Arc<dyn Logger>) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            config: config.clone(),
            logger,
            transport: None,
        }
    }

    /// Install `transport` as the context. A context that is already open is
    /// disposed first.
    pub fn init_with(&mut self, transport: T) {
        self.dispose();
        self.transport = Some(transport);
        self.logger.debug(
            "PetStoreClient initialized",
            &json!({ "baseURL": self.base_url }),
        );
    }

    /// Release the context. No-op when nothing is open.
    pub fn dispose(&mut self) {
        if self.transport.take().is_some() {
            self.logger.debug("PetStoreClient disposed", &Value::Null);
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.transport.is_some()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn transport(&self) -> Result<&T> {
        self.transport.as_ref().ok_or(ApiError::Uninitialized)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn exchange(&self, request: &HttpRequest) -> Result<Envelope<Value>> {
        let transport = self.transport()?;
        let response = transport.execute(request)?;
        let body = decode_body(&response)?;
        Ok(Envelope {
            status: response.status,
            body,
        })
    }

    fn log_reply(&self, message: &str, envelope: &Envelope<Value>) {
        self.logger.debug(
            message,
            &json!({ "status": envelope.status, "body": envelope.body }),
        );
    }

    fn log_count(&self, envelope: &Envelope<Value>) {
        let count = envelope.body.as_array().map(Vec::len);
        self.logger.debug(
            "Pets found",
            &json!({ "status": envelope.status, "count": count }),
        );
    }

    // ---------------------------------------------------------------------
    // Request builders
    // ---------------------------------------------------------------------

    pub fn build_create_pet<P: Serialize + ?Sized>(
        &self,
        pet: &P,
        policy: IdPolicy,
    ) -> Result<HttpRequest> {
        let mut payload = serde_json::to_value(pet)?;
        if policy == IdPolicy::Strip {
            if let Some(fields) = payload.as_object_mut() {
                fields.remove("id");
            }
        }
        json_request(HttpMethod::Post, self.url(endpoints::PET), &payload)
    }

    pub fn build_get_pet(&self, id: i64) -> HttpRequest {
        bare_request(HttpMethod::Get, self.url(&endpoints::pet_by_id(id)))
    }

    pub fn build_update_pet<P: Serialize + ?Sized>(&self, pet: &P) -> Result<HttpRequest> {
        json_request(HttpMethod::Put, self.url(endpoints::PET), pet)
    }

    pub fn build_delete_pet(&self, id: i64) -> HttpRequest {
        bare_request(HttpMethod::Delete, self.url(&endpoints::pet_by_id(id)))
    }

    pub fn build_find_by_status(&self, status: PetStatus) -> HttpRequest {
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("status", status.as_str())
            .finish();
        bare_request(
            HttpMethod::Get,
            format!("{}?{query}", self.url(endpoints::PET_FIND_BY_STATUS)),
        )
    }

    pub fn build_find_by_tags<S: AsRef<str>>(&self, tags: &[S]) -> HttpRequest {
        let csv = tags.iter().map(AsRef::as_ref).collect::<Vec<_>>().join(",");
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("tags", &csv)
            .finish();
        bare_request(
            HttpMethod::Get,
            format!("{}?{query}", self.url(endpoints::PET_FIND_BY_TAGS)),
        )
    }

    /// Only non-empty `name` / `status` values are encoded.
    pub fn build_update_with_form(
        &self,
        id: i64,
        name: Option<&str>,
        status: Option<&str>,
    ) -> HttpRequest {
        let mut form = form_urlencoded::Serializer::new(String::new());
        for (key, value) in [("name", name), ("status", status)] {
            if let Some(value) = value.filter(|v| !v.is_empty()) {
                form.append_pair(key, value);
            }
        }
        HttpRequest {
            method: HttpMethod::Post,
            url: self.url(&endpoints::pet_by_id(id)),
            headers: vec![("content-type".to_string(), FORM.to_string())],
            body: Some(form.finish().into_bytes()),
        }
    }

    pub fn build_upload_image(
        &self,
        id: i64,
        image: &[u8],
        metadata: Option<&str>,
    ) -> HttpRequest {
        let boundary = format!("petstore-{}", Uuid::new_v4().simple());
        let body = multipart_body(&boundary, image, metadata.filter(|m| !m.is_empty()));
        HttpRequest {
            method: HttpMethod::Post,
            url: self.url(&endpoints::pet_upload_image(id)),
            headers: vec![(
                "content-type".to_string(),
                format!("multipart/form-data; boundary={boundary}"),
            )],
            body: Some(body),
        }
    }

    // ---------------------------------------------------------------------
    // Operations
    // ---------------------------------------------------------------------

    /// Create a pet. Any `id` in `pet` is stripped; the service assigns one.
    pub fn create_pet<P: Serialize + ?Sized>(&self, pet: &P) -> Result<Envelope<Value>> {
        self.create_pet_with(pet, IdPolicy::Strip)
    }

    pub fn create_pet_with<P: Serialize + ?Sized>(
        &self,
        pet: &P,
        policy: IdPolicy,
    ) -> Result<Envelope<Value>> {
        self.transport()?;
        let request = self.build_create_pet(pet, policy)?;
        self.logger
            .debug("Creating pet", &serde_json::to_value(pet)?);
        let envelope = self.exchange(&request)?;
        self.log_reply("Pet created", &envelope);
        Ok(envelope)
    }

    /// Body is a pet, or an `ApiResponse` when the service has no such id.
    pub fn get_pet_by_id(&self, id: i64) -> Result<Envelope<Value>> {
        self.logger.debug("Getting pet by ID", &json!({ "id": id }));
        let envelope = self.exchange(&self.build_get_pet(id))?;
        self.log_reply("Pet retrieved", &envelope);
        Ok(envelope)
    }

    /// Full-resource update; `pet` should carry the id to replace.
    pub fn update_pet<P: Serialize + ?Sized>(&self, pet: &P) -> Result<Envelope<Value>> {
        self.transport()?;
        let request = self.build_update_pet(pet)?;
        self.logger
            .debug("Updating pet", &serde_json::to_value(pet)?);
        let envelope = self.exchange(&request)?;
        self.log_reply("Pet updated", &envelope);
        Ok(envelope)
    }

    pub fn delete_pet(&self, id: i64) -> Result<Envelope<Value>> {
        self.logger.debug("Deleting pet", &json!({ "id": id }));
        let envelope = self.exchange(&self.build_delete_pet(id))?;
        self.log_reply("Pet deleted", &envelope);
        Ok(envelope)
    }

    pub fn find_pets_by_status(&self, status: PetStatus) -> Result<Envelope<Value>> {
        self.logger
            .debug("Finding pets by status", &json!({ "status": status }));
        let envelope = self.exchange(&self.build_find_by_status(status))?;
        self.log_count(&envelope);
        Ok(envelope)
    }

    pub fn find_pets_by_tags<S: AsRef<str>>(&self, tags: &[S]) -> Result<Envelope<Value>> {
        let listed: Vec<&str> = tags.iter().map(AsRef::as_ref).collect();
        self.logger
            .debug("Finding pets by tags", &json!({ "tags": listed }));
        let envelope = self.exchange(&self.build_find_by_tags(tags))?;
        self.log_count(&envelope);
        Ok(envelope)
    }

    pub fn update_pet_with_form(
        &self,
        id: i64,
        name: Option<&str>,
        status: Option<&str>,
    ) -> Result<Envelope<Value>> {
        self.logger.debug(
            "Updating pet with form",
            &json!({ "id": id, "name": name, "status": status }),
        );
        let envelope = self.exchange(&self.build_update_with_form(id, name, status))?;
        self.log_reply("Pet updated with form", &envelope);
        Ok(envelope)
    }

    pub fn upload_pet_image(
        &self,
        id: i64,
        image: &[u8],
        metadata: Option<&str>,
    ) -> Result<Envelope<Value>> {
        self.logger.debug(
            "Uploading pet image",
            &json!({ "id": id, "additionalMetadata": metadata, "bytes": image.len() }),
        );
        let envelope = self.exchange(&self.build_upload_image(id, image, metadata))?;
        self.log_reply("Pet image uploaded", &envelope);
        Ok(envelope)
    }
}

impl<T: Transport> Drop for PetStoreClient<T> {
    fn drop(&mut self) {
        self.dispose();
    }
}

fn bare_request(method: HttpMethod, url: String) -> HttpRequest {
    HttpRequest {
        method,
        url,
        headers: Vec::new(),
        body: None,
    }
}

fn json_request<P: Serialize + ?Sized>(
    method: HttpMethod,
    url: String,
    payload: &P,
) -> Result<HttpRequest> {
    Ok(HttpRequest {
        method,
        url,
        headers: vec![("content-type".to_string(), JSON.to_string())],
        body: Some(serde_json::to_vec(payload)?),
    })
}

fn multipart_body(boundary: &str, image: &[u8], metadata: Option<&str>) -> Vec<u8> {
    let mut body = Vec::with_capacity(image.len() + 512);
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{UPLOAD_FILE_NAME}\"\r\nContent-Type: {UPLOAD_MIME_TYPE}\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(image);
    body.extend_from_slice(b"\r\n");
    if let Some(metadata) = metadata {
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"additionalMetadata\"\r\n\r\n{metadata}\r\n"
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
    body
}

/// Empty bodies become `null`; anything else must be JSON.
fn decode_body(response: &HttpResponse) -> Result<Value> {
    if response.body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(&response.body)
        .map_err(|_| ApiError::bad_body(response.status, &response.text()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use crate::fixtures;
    use crate::schema::PET;

    /// Returns canned responses in order and records every request.
    #[derive(Default)]
    struct ScriptedTransport {
        replies: Mutex<Vec<HttpResponse>>,
        seen: Arc<Mutex<Vec<HttpRequest>>>,
    }

    impl ScriptedTransport {
        fn replying(status: u16, body: &str) -> Self {
            Self {
                replies: Mutex::new(vec![HttpResponse {
                    status,
                    headers: Vec::new(),
                    body: body.as_bytes().to_vec(),
                }]),
                seen: Arc::default(),
            }
        }
    }

    impl Transport for ScriptedTransport {
        fn execute(&self, request: &HttpRequest) -> Result<HttpResponse> {
            self.seen.lock().unwrap().push(request.clone());
            let mut replies = self.replies.lock().unwrap();
            Ok(replies.remove(0))
        }
    }

    #[derive(Default)]
    struct RecordingLogger {
        lines: Mutex<Vec<String>>,
    }

    impl Logger for RecordingLogger {
        fn debug(&self, message: &str, _data: &Value) {
            self.lines.lock().unwrap().push(format!("DEBUG {message}"));
        }
        fn info(&self, message: &str, _data: &Value) {
            self.lines.lock().unwrap().push(format!("INFO {message}"));
        }
        fn warn(&self, message: &str, _data: &Value) {
            self.lines.lock().unwrap().push(format!("WARN {message}"));
        }
        fn error(&self, message: &str, _data: &Value) {
            self.lines.lock().unwrap().push(format!("ERROR {message}"));
        }
    }

    fn config() -> Config {
        Config::default().with_base_url("http://localhost:8080/v2/")
    }

    fn client() -> PetStoreClient<ScriptedTransport> {
        PetStoreClient::with_logger(&config(), Arc::new(RecordingLogger::default()))
    }

    fn connected(status: u16, body: &str) -> (PetStoreClient<ScriptedTransport>, Arc<Mutex<Vec<HttpRequest>>>) {
        let transport = ScriptedTransport::replying(status, body);
        let seen = Arc::clone(&transport.seen);
        let mut client = client();
        client.init_with(transport);
        (client, seen)
    }

    fn body_json(req: &HttpRequest) -> Value {
        serde_json::from_slice(req.body.as_deref().unwrap()).unwrap()
    }

    #[test]
    fn trailing_slash_is_stripped() {
        assert_eq!(client().base_url(), "http://localhost:8080/v2");
    }

    #[test]
    fn build_create_pet_strips_id_by_default() {
        let pet = fixtures::create_pet_with_id(77);
        let req = client().build_create_pet(&pet, IdPolicy::Strip).unwrap();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.url, "http://localhost:8080/v2/pet");
        assert_eq!(req.header("Content-Type"), Some("application/json"));
        let body = body_json(&req);
        assert!(body.get("id").is_none());
        assert_eq!(body["name"], "Pet-77");
    }

    #[test]
    fn build_create_pet_can_keep_id() {
        let pet = fixtures::create_pet_with_id(77);
        let req = client().build_create_pet(&pet, IdPolicy::Keep).unwrap();
        assert_eq!(body_json(&req)["id"], 77);
    }

    #[test]
    fn build_create_pet_passes_malformed_payloads_through() {
        let req = client()
            .build_create_pet(&fixtures::pet_without_name(), IdPolicy::Strip)
            .unwrap();
        assert!(body_json(&req).get("name").is_none());
    }

    #[test]
    fn build_get_and_delete_use_id_paths() {
        let c = client();
        let get = c.build_get_pet(5);
        assert_eq!(get.method, HttpMethod::Get);
        assert_eq!(get.url, "http://localhost:8080/v2/pet/5");
        assert!(get.body.is_none());
        let delete = c.build_delete_pet(5);
        assert_eq!(delete.method, HttpMethod::Delete);
        assert_eq!(delete.url, "http://localhost:8080/v2/pet/5");
    }

    #[test]
    fn build_update_pet_keeps_id() {
        let mut pet = fixtures::updated_pet();
        pet.id = Some(9);
        let req = client().build_update_pet(&pet).unwrap();
        assert_eq!(req.method, HttpMethod::Put);
        assert_eq!(req.url, "http://localhost:8080/v2/pet");
        assert_eq!(body_json(&req)["id"], 9);
    }

    #[test]
    fn build_find_queries_encode_parameters() {
        let c = client();
        let req = c.build_find_by_status(PetStatus::Pending);
        assert_eq!(req.url, "http://localhost:8080/v2/pet/findByStatus?status=pending");
        let req = c.build_find_by_tags(&["friendly", "small dog"]);
        assert_eq!(
            req.url,
            "http://localhost:8080/v2/pet/findByTags?tags=friendly%2Csmall+dog"
        );
    }

    #[test]
    fn build_update_with_form_includes_only_supplied_fields() {
        let c = client();
        let req = c.build_update_with_form(3, Some("Rex"), None);
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.url, "http://localhost:8080/v2/pet/3");
        assert_eq!(req.header("content-type"), Some(FORM));
        assert_eq!(req.body.as_deref(), Some(&b"name=Rex"[..]));

        let req = c.build_update_with_form(3, Some(""), Some("sold"));
        assert_eq!(req.body.as_deref(), Some(&b"status=sold"[..]));

        let req = c.build_update_with_form(3, None, None);
        assert_eq!(req.body.as_deref(), Some(&b""[..]));
    }

    #[test]
    fn build_upload_image_writes_multipart_parts() {
        let req = client().build_upload_image(4, b"JPEGDATA", Some("front view"));
        assert_eq!(req.url, "http://localhost:8080/v2/pet/4/uploadImage");
        let content_type = req.header("content-type").unwrap().to_string();
        let boundary = content_type
            .strip_prefix("multipart/form-data; boundary=")
            .unwrap();
        let body = String::from_utf8(req.body.clone().unwrap()).unwrap();
        assert!(body.starts_with(&format!("--{boundary}\r\n")));
        assert!(body.contains("name=\"file\"; filename=\"pet-image.jpg\"\r\nContent-Type: image/jpeg\r\n\r\nJPEGDATA\r\n"));
        assert!(body.contains("name=\"additionalMetadata\"\r\n\r\nfront view\r\n"));
        assert!(body.ends_with(&format!("--{boundary}--\r\n")));
    }

    #[test]
    fn build_upload_image_omits_absent_metadata() {
        let req = client().build_upload_image(4, b"x", None);
        let body = String::from_utf8(req.body.unwrap()).unwrap();
        assert!(!body.contains("additionalMetadata"));
    }

    #[test]
    fn operations_fail_before_init() {
        let c = client();
        assert!(matches!(c.get_pet_by_id(1), Err(ApiError::Uninitialized)));
        assert!(matches!(
            c.create_pet(&fixtures::valid_pet()),
            Err(ApiError::Uninitialized)
        ));
        assert!(matches!(
            c.update_pet(&fixtures::valid_pet()),
            Err(ApiError::Uninitialized)
        ));
        assert!(matches!(c.delete_pet(1), Err(ApiError::Uninitialized)));
        assert!(matches!(
            c.find_pets_by_status(PetStatus::Sold),
            Err(ApiError::Uninitialized)
        ));
        assert!(matches!(c.find_pets_by_tags(&["a"]), Err(ApiError::Uninitialized)));
        assert!(matches!(
            c.update_pet_with_form(1, Some("n"), None),
            Err(ApiError::Uninitialized)
        ));
        assert!(matches!(
            c.upload_pet_image(1, b"", None),
            Err(ApiError::Uninitialized)
        ));
    }

    #[test]
    fn operations_fail_after_dispose_without_touching_transport() {
        let (mut c, seen) = connected(200, "{}");
        c.dispose();
        assert!(!c.is_initialized());
        assert!(matches!(c.delete_pet(1), Err(ApiError::Uninitialized)));
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn dispose_without_init_is_a_noop() {
        let mut c = client();
        c.dispose();
        c.dispose();
        assert!(!c.is_initialized());
    }

    #[test]
    fn create_returns_status_and_decoded_body() {
        let (c, seen) = connected(
            200,
            r#"{"id":12,"name":"Fluffy","photoUrls":["https://example.com/fluffy.jpg"],"status":"available"}"#,
        );
        let envelope = c.create_pet(&fixtures::valid_pet()).unwrap();
        assert_eq!(envelope.status, 200);
        assert_eq!(envelope.id(), Some(12));
        assert_eq!(envelope.decode(&PET).unwrap().body.name, "Fluffy");
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn non_json_body_is_a_bad_response_body() {
        let html = format!("<html>{}</html>", "x".repeat(500));
        let (c, _) = connected(502, &html);
        match c.create_pet(&fixtures::minimal_pet()).unwrap_err() {
            ApiError::BadResponseBody { status, snippet } => {
                assert_eq!(status, 502);
                assert!(snippet.starts_with("<html>"));
                assert_eq!(snippet.chars().count(), 200);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_body_decodes_to_null() {
        let (c, _) = connected(404, "");
        let envelope = c.delete_pet(999_999_999).unwrap();
        assert_eq!(envelope.status, 404);
        assert!(envelope.body.is_null());
    }

    #[test]
    fn error_statuses_are_returned_not_raised() {
        let (c, _) = connected(404, r#"{"code":1,"type":"error","message":"Pet not found"}"#);
        let envelope = c.get_pet_by_id(999_999_999).unwrap();
        assert_eq!(envelope.status, 404);
        assert_eq!(envelope.body["message"], "Pet not found");
    }

    #[test]
    fn lifecycle_and_calls_are_logged() {
        let logger = Arc::new(RecordingLogger::default());
        let mut c: PetStoreClient<ScriptedTransport> =
            PetStoreClient::with_logger(&config(), logger.clone());
        c.init_with(ScriptedTransport::replying(200, "[]"));
        c.find_pets_by_status(PetStatus::Available).unwrap();
        drop(c);
        let lines = logger.lines.lock().unwrap().clone();
        assert_eq!(
            lines,
            vec![
                "DEBUG PetStoreClient initialized",
                "DEBUG Finding pets by status",
                "DEBUG Pets found",
                "DEBUG PetStoreClient disposed",
            ]
        );
    }
}
