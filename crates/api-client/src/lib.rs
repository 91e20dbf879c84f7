//! # SNP Lab Client
//!
//! HTTP implementation of the `snplab-core` backend traits.
//!
//! Handles:
//! - Bearer authentication from the injected session provider
//! - Status handling (401/403 clear the session; other failures carry the backend's message)
//! - Response decoding, including the `{ "data": [...] }` list envelope some endpoints use
//!
//! Uses `reqwest` for transport; all workflow decisions stay in `snplab-core`.

#![warn(rust_2018_idioms)]

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use snplab_core::catalogue::record_id;
use snplab_core::constants::{
    GENERATE_REPORT_ENDPOINT, INTERPRETATION_ENDPOINT, LOGIN_ENDPOINT, REPORT_ENDPOINT,
    SCHEMA_SUFFIX, SUBJECTS_ENDPOINT, SUBJECT_REPORTS_ENDPOINT,
};
use snplab_core::schema::ColumnSchema;
use snplab_core::{
    AuthBackend, ClientConfig, LabError, LabResult, Record, ReferenceMarker, ReportBackend,
    ReportDetail, ReportPayload, ReportSummary, ResourceBackend, ResourceKind, SessionProvider,
    Subject,
};
use snplab_types::{GenotypeId, MarkerId, NonEmptyText, ReportId, SubjectId};
use std::sync::Arc;

/// Whether a request carries the session's bearer token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Auth {
    Bearer,
    Anonymous,
}

/// Backend reached over HTTP.
pub struct HttpBackend<S> {
    client: reqwest::Client,
    config: ClientConfig,
    session: Arc<S>,
}

impl<S: SessionProvider> HttpBackend<S> {
    /// Build a client for `config`, authenticating with tokens from `session`.
    ///
    /// # Errors
    ///
    /// Returns `LabError::Transport` if the underlying HTTP client cannot be constructed.
    pub fn new(config: ClientConfig, session: Arc<S>) -> LabResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| LabError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            config,
            session,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn session(&self) -> &Arc<S> {
        &self.session
    }

    // ========================================================================
    // REQUEST PLUMBING
    // ========================================================================

    fn request(&self, method: Method, endpoint: &str, auth: Auth) -> LabResult<RequestBuilder> {
        let builder = self
            .client
            .request(method, self.config.endpoint_url(endpoint))
            .header(ACCEPT, "application/json");
        match auth {
            Auth::Anonymous => Ok(builder),
            Auth::Bearer => {
                let token = self.session.token().ok_or(LabError::MissingToken)?;
                Ok(builder.bearer_auth(token))
            }
        }
    }

    async fn send(&self, endpoint: &str, auth: Auth, builder: RequestBuilder) -> LabResult<Response> {
        let response = builder.send().await.map_err(|e| self.transport_error(e))?;
        let status = response.status();
        tracing::debug!("{} -> {}", endpoint, status);
        if status.is_success() {
            return Ok(response);
        }

        if auth == Auth::Bearer
            && (status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN)
        {
            tracing::warn!("{} rejected the session ({}); clearing token", endpoint, status);
            self.session.clear();
            return Err(LabError::Unauthorized);
        }

        let reason = status.canonical_reason().unwrap_or("request failed");
        let body = response.bytes().await.unwrap_or_default();
        let message = error_message(&body).unwrap_or_else(|| reason.to_string());
        tracing::error!("{} failed with {}: {}", endpoint, status, message);
        Err(LabError::Backend {
            status: status.as_u16(),
            message,
        })
    }

    fn transport_error(&self, err: reqwest::Error) -> LabError {
        if err.is_timeout() {
            LabError::Timeout(self.config.timeout().as_secs())
        } else if err.is_connect() {
            LabError::Transport(format!("cannot reach {}", self.config.api_url()))
        } else {
            LabError::Transport(err.to_string())
        }
    }

    async fn get_value(&self, endpoint: &str) -> LabResult<Value> {
        let builder = self.request(Method::GET, endpoint, Auth::Bearer)?;
        let response = self.send(endpoint, Auth::Bearer, builder).await?;
        read_body(endpoint, response).await
    }

    async fn get_list<T: DeserializeOwned>(&self, endpoint: &str) -> LabResult<Vec<T>> {
        let value = self.get_value(endpoint).await?;
        decode(endpoint, unwrap_list(value))
    }

    async fn send_json(
        &self,
        method: Method,
        endpoint: &str,
        body: &impl serde::Serialize,
    ) -> LabResult<Value> {
        let builder = self.request(method, endpoint, Auth::Bearer)?.json(body);
        let response = self.send(endpoint, Auth::Bearer, builder).await?;
        read_body(endpoint, response).await
    }
}

// ============================================================================
// RESPONSE DECODING
// ============================================================================

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Deserialize)]
struct LoginResponse {
    token: String,
}

/// The `message` field of a JSON error body, if there is a non-blank one.
fn error_message(body: &[u8]) -> Option<String> {
    serde_json::from_slice::<ErrorBody>(body)
        .ok()?
        .message
        .filter(|m| !m.trim().is_empty())
}

/// JSON bodies are parsed; anything else is returned as a string. Empty bodies become `null`.
async fn read_body(endpoint: &str, response: Response) -> LabResult<Value> {
    let is_json = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("json"));
    let bytes = response
        .bytes()
        .await
        .map_err(|e| LabError::Transport(e.to_string()))?;
    if bytes.is_empty() {
        return Ok(Value::Null);
    }
    if is_json {
        serde_json::from_slice(&bytes).map_err(|e| LabError::Decode {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        })
    } else {
        Ok(Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    }
}

fn decode<T: DeserializeOwned>(endpoint: &str, value: Value) -> LabResult<T> {
    serde_json::from_value(value).map_err(|e| LabError::Decode {
        endpoint: endpoint.to_string(),
        reason: e.to_string(),
    })
}

/// Lists arrive either bare or wrapped as `{ "data": [...] }`; `null` is an empty list.
fn unwrap_list(value: Value) -> Value {
    match value {
        Value::Object(mut map) if map.get("data").is_some_and(Value::is_array) => {
            map.remove("data").unwrap_or_default()
        }
        Value::Null => Value::Array(Vec::new()),
        other => other,
    }
}

/// Interpretation text from `{ "interpretation" }`, a one-element list of those, or a bare string.
fn interpretation_text(value: Value) -> String {
    match value {
        Value::String(text) => text,
        Value::Object(map) => map
            .get("interpretation")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        Value::Array(items) => items
            .into_iter()
            .next()
            .map(interpretation_text)
            .unwrap_or_default(),
        _ => String::new(),
    }
}

/// Id of a freshly created row, from `{ "id" }` or `{ "data": { "id" } }`.
fn created_id(value: &Value) -> Option<i64> {
    let map = value.as_object()?;
    record_id(map).or_else(|| map.get("data")?.as_object().and_then(record_id))
}

// ============================================================================
// TRAIT IMPLEMENTATIONS
// ============================================================================

impl<S: SessionProvider> ReportBackend for HttpBackend<S> {
    async fn reference_markers(&self) -> LabResult<Vec<ReferenceMarker>> {
        self.get_list(REPORT_ENDPOINT).await
    }

    async fn report_detail(&self, report: ReportId) -> LabResult<ReportDetail> {
        let endpoint = format!("{REPORT_ENDPOINT}/{report}");
        let value = self.get_value(&endpoint).await?;
        decode(&endpoint, value)
    }

    async fn interpretation(&self, marker: MarkerId, genotype: GenotypeId) -> LabResult<String> {
        let endpoint = format!("{INTERPRETATION_ENDPOINT}/{marker}/{genotype}");
        let value = self.get_value(&endpoint).await?;
        Ok(interpretation_text(value))
    }

    async fn create_report(&self, payload: &ReportPayload) -> LabResult<Option<ReportId>> {
        let value = self.send_json(Method::POST, REPORT_ENDPOINT, payload).await?;
        Ok(created_id(&value).map(ReportId::new))
    }

    async fn update_report(&self, payload: &ReportPayload) -> LabResult<()> {
        if payload.id.is_none() {
            return Err(LabError::InvalidInput("update requires a report id".into()));
        }
        self.send_json(Method::PUT, REPORT_ENDPOINT, payload).await?;
        Ok(())
    }

    async fn delete_report(&self, report: ReportId) -> LabResult<()> {
        self.send_json(Method::DELETE, REPORT_ENDPOINT, &json!({ "id": report }))
            .await?;
        Ok(())
    }

    async fn render_report_pdf(&self, report: ReportId) -> LabResult<Vec<u8>> {
        let endpoint = format!("{GENERATE_REPORT_ENDPOINT}/{report}");
        let builder = self.request(Method::POST, &endpoint, Auth::Bearer)?;
        let response = self.send(&endpoint, Auth::Bearer, builder).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| LabError::Transport(e.to_string()))?;
        Ok(bytes.to_vec())
    }

    async fn subjects(&self) -> LabResult<Vec<Subject>> {
        self.get_list(SUBJECTS_ENDPOINT).await
    }

    async fn subject_reports(&self, subject: SubjectId) -> LabResult<Vec<ReportSummary>> {
        self.get_list(&format!("{SUBJECT_REPORTS_ENDPOINT}/{subject}"))
            .await
    }
}

impl<S: SessionProvider> ResourceBackend for HttpBackend<S> {
    async fn list_records(&self, kind: ResourceKind) -> LabResult<Vec<Record>> {
        self.get_list(kind.endpoint()).await
    }

    async fn record_schema(&self, kind: ResourceKind) -> LabResult<Vec<ColumnSchema>> {
        self.get_list(&format!("{}/{SCHEMA_SUFFIX}", kind.endpoint()))
            .await
    }

    async fn create_record(&self, kind: ResourceKind, record: &Record) -> LabResult<Option<i64>> {
        let value = self.send_json(Method::POST, kind.endpoint(), record).await?;
        Ok(created_id(&value))
    }

    async fn update_record(&self, kind: ResourceKind, id: i64, record: &Record) -> LabResult<()> {
        let mut body = record.clone();
        body.insert("id".into(), Value::from(id));
        self.send_json(Method::PUT, kind.endpoint(), &body).await?;
        Ok(())
    }

    async fn delete_record(&self, kind: ResourceKind, id: i64) -> LabResult<()> {
        self.send_json(Method::DELETE, kind.endpoint(), &json!({ "id": id }))
            .await?;
        Ok(())
    }
}

impl<S: SessionProvider> AuthBackend for HttpBackend<S> {
    async fn login(&self, username: &NonEmptyText, password: &NonEmptyText) -> LabResult<String> {
        let builder = self
            .request(Method::POST, LOGIN_ENDPOINT, Auth::Anonymous)?
            .json(&json!({ "username": username.as_str(), "password": password.as_str() }));
        let response = self.send(LOGIN_ENDPOINT, Auth::Anonymous, builder).await?;
        let value = read_body(LOGIN_ENDPOINT, response).await?;
        let login: LoginResponse = decode(LOGIN_ENDPOINT, value)?;
        tracing::info!("signed in as {}", username);
        Ok(login.token)
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::{Path, State};
    use axum::http::{HeaderMap, StatusCode as AxumStatus};
    use axum::response::IntoResponse;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use chrono::NaiveDate;
    use snplab_core::MemorySession;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    /// Requests seen by the stub server: route, bearer header, body.
    #[derive(Clone, Default)]
    struct Seen {
        requests: Arc<Mutex<Vec<(String, Option<String>, Value)>>>,
    }

    impl Seen {
        fn record(&self, route: &str, headers: &HeaderMap, body: Value) {
            let auth = headers
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            self.requests
                .lock()
                .unwrap()
                .push((route.to_string(), auth, body));
        }

        fn all(&self) -> Vec<(String, Option<String>, Value)> {
            self.requests.lock().unwrap().clone()
        }
    }

    async fn markers(State(seen): State<Seen>, headers: HeaderMap) -> Json<Value> {
        seen.record("GET report", &headers, Value::Null);
        Json(json!([
            {"id": 1, "rs_name": "rs1801133", "genotypes": [
                {"genotype_id": 10, "genotype_name": "CC"},
                {"genotype_id": 11, "genotype_name": "CT"}
            ]},
            {"id": 2, "rs_name": "rs4680", "genotypes": null}
        ]))
    }

    async fn create_report(
        State(seen): State<Seen>,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> impl IntoResponse {
        seen.record("POST report", &headers, body.clone());
        if body["observations"] == "duplicate" {
            return (
                AxumStatus::CONFLICT,
                Json(json!({"message": "document already exists"})),
            );
        }
        (AxumStatus::CREATED, Json(json!({"id": 42})))
    }

    async fn update_report(
        State(seen): State<Seen>,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> AxumStatus {
        seen.record("PUT report", &headers, body);
        AxumStatus::NO_CONTENT
    }

    async fn delete_report(
        State(seen): State<Seen>,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> Json<Value> {
        seen.record("DELETE report", &headers, body);
        Json(json!({"message": "deleted"}))
    }

    async fn report_detail(Path(id): Path<i64>) -> impl IntoResponse {
        if id != 7 {
            return (
                AxumStatus::NOT_FOUND,
                Json(json!({"message": "report not found"})),
            );
        }
        (
            AxumStatus::OK,
            Json(json!({
                "id": 7,
                "user": 4,
                "report_date": "2024-03-09T05:00:00.000Z",
                "observations": null,
                "results": [{"reference_snp_id": 1, "genotype_id": 11, "genotype_name": "CT"}]
            })),
        )
    }

    async fn interpretation(Path((marker, genotype)): Path<(i64, i64)>) -> Json<Value> {
        Json(json!({"interpretation": format!("marker {marker} genotype {genotype}")}))
    }

    async fn subject_reports(Path(subject): Path<i64>) -> Json<Value> {
        Json(json!([{"id": subject * 10, "reportDate": "2024-04-01"}]))
    }

    async fn subjects() -> Json<Value> {
        Json(json!({"data": [{"id": 4, "document": "1020", "name": "Ana"}]}))
    }

    async fn render_pdf(Path(id): Path<i64>) -> impl IntoResponse {
        if id == 13 {
            return (AxumStatus::INTERNAL_SERVER_ERROR, "boom").into_response();
        }
        ([("content-type", "application/pdf")], b"%PDF-1.4".to_vec()).into_response()
    }

    async fn login(Json(body): Json<Value>) -> impl IntoResponse {
        if body["password"] == "secret" {
            (AxumStatus::OK, Json(json!({"token": "header.payload.sig"})))
        } else {
            (
                AxumStatus::UNAUTHORIZED,
                Json(json!({"message": "Invalid credentials"})),
            )
        }
    }

    async fn forbidden() -> AxumStatus {
        AxumStatus::FORBIDDEN
    }

    async fn snp_schema() -> Json<Value> {
        Json(json!([
            {"column_name": "id", "type": "number"},
            {"column_name": "rs_name", "type": "text"}
        ]))
    }

    async fn snp_list() -> Json<Value> {
        Json(json!([{"id": 1, "rs_name": "rs4680"}]))
    }

    async fn snp_write(
        State(seen): State<Seen>,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> Json<Value> {
        seen.record("PUT referenceSnp", &headers, body);
        Json(json!({"message": "ok"}))
    }

    async fn spawn_server(seen: Seen) -> String {
        let app = Router::new()
            .route(
                "/api/report",
                get(markers)
                    .post(create_report)
                    .put(update_report)
                    .delete(delete_report),
            )
            .route("/api/report/:id", get(report_detail))
            .route("/api/report/userReports/:id", get(subject_reports))
            .route("/api/interpretation/:marker/:genotype", get(interpretation))
            .route("/api/generate-report/:id", post(render_pdf))
            .route("/api/users/user", get(subjects))
            .route("/api/users/login", post(login))
            .route("/api/genotype", get(forbidden))
            .route("/api/referenceSnp", get(snp_list).put(snp_write))
            .route("/api/referenceSnp/schema", get(snp_schema))
            .with_state(seen);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/api")
    }

    async fn backend_with(session: MemorySession) -> (HttpBackend<MemorySession>, Seen) {
        let seen = Seen::default();
        let url = spawn_server(seen.clone()).await;
        let config =
            ClientConfig::new(&url, std::time::Duration::from_secs(5), "unused".into()).unwrap();
        (HttpBackend::new(config, Arc::new(session)).unwrap(), seen)
    }

    async fn backend() -> (HttpBackend<MemorySession>, Seen) {
        backend_with(MemorySession::with_token("tok")).await
    }

    fn payload(id: Option<i64>, observations: &str) -> ReportPayload {
        let mut detail = BTreeMap::new();
        detail.insert(MarkerId::new(1), GenotypeId::new(10));
        detail.insert(MarkerId::new(2), GenotypeId::new(20));
        ReportPayload {
            id: id.map(ReportId::new),
            user: SubjectId::new(4),
            report_date: NaiveDate::from_ymd_opt(2024, 5, 2).unwrap(),
            sampling_date: None,
            observations: observations.to_string(),
            detail,
        }
    }

    #[tokio::test]
    async fn reference_markers_are_fetched_with_bearer_token() {
        let (backend, seen) = backend().await;
        let markers = backend.reference_markers().await.unwrap();

        assert_eq!(markers.len(), 2);
        assert_eq!(markers[0].genotypes.len(), 2);
        assert!(markers[1].genotypes.is_empty());
        let requests = seen.all();
        assert_eq!(requests[0].1.as_deref(), Some("Bearer tok"));
    }

    #[tokio::test]
    async fn missing_token_fails_without_a_request() {
        let (backend, seen) = backend_with(MemorySession::new()).await;
        let err = backend.reference_markers().await.unwrap_err();
        assert!(matches!(err, LabError::MissingToken));
        assert!(seen.all().is_empty());
    }

    #[tokio::test]
    async fn create_posts_payload_and_returns_new_id() {
        let (backend, seen) = backend().await;
        let id = backend.create_report(&payload(None, "ok")).await.unwrap();
        assert_eq!(id, Some(ReportId::new(42)));

        let (route, _, body) = seen.all().remove(0);
        assert_eq!(route, "POST report");
        assert_eq!(body["detail"], json!({"1": 10, "2": 20}));
        assert_eq!(body["reportDate"], "2024-05-02");
        assert!(body.get("id").is_none());
    }

    #[tokio::test]
    async fn backend_message_is_preserved() {
        let (backend, _) = backend().await;
        let err = backend
            .create_report(&payload(None, "duplicate"))
            .await
            .unwrap_err();
        match err {
            LabError::Backend { status, message } => {
                assert_eq!(status, 409);
                assert_eq!(message, "document already exists");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn update_and_delete_send_the_report_id() {
        let (backend, seen) = backend().await;
        backend.update_report(&payload(Some(7), "")).await.unwrap();
        backend.delete_report(ReportId::new(7)).await.unwrap();

        let requests = seen.all();
        assert_eq!(requests[0].0, "PUT report");
        assert_eq!(requests[0].2["id"], 7);
        assert_eq!(requests[1].0, "DELETE report");
        assert_eq!(requests[1].2, json!({"id": 7}));
    }

    #[tokio::test]
    async fn update_without_id_is_rejected_locally() {
        let (backend, seen) = backend().await;
        assert!(matches!(
            backend.update_report(&payload(None, "")).await,
            Err(LabError::InvalidInput(_))
        ));
        assert!(seen.all().is_empty());
    }

    #[tokio::test]
    async fn report_detail_and_interpretation_decode() {
        let (backend, _) = backend().await;
        let detail = backend.report_detail(ReportId::new(7)).await.unwrap();
        assert_eq!(detail.results.len(), 1);
        assert_eq!(detail.report_date, NaiveDate::from_ymd_opt(2024, 3, 9));

        let err = backend.report_detail(ReportId::new(8)).await.unwrap_err();
        assert!(matches!(err, LabError::Backend { status: 404, .. }));

        let text = backend
            .interpretation(MarkerId::new(1), GenotypeId::new(11))
            .await
            .unwrap();
        assert_eq!(text, "marker 1 genotype 11");
    }

    #[tokio::test]
    async fn lists_accept_data_envelope() {
        let (backend, _) = backend().await;
        let subjects = backend.subjects().await.unwrap();
        assert_eq!(subjects.len(), 1);
        assert_eq!(subjects[0].display_label(), "1020 - Ana");

        let reports = backend.subject_reports(SubjectId::new(4)).await.unwrap();
        assert_eq!(reports[0].id, ReportId::new(40));
    }

    #[tokio::test]
    async fn forbidden_response_clears_session() {
        let (backend, _) = backend().await;
        let err = backend
            .list_records(ResourceKind::Genotype)
            .await
            .unwrap_err();
        assert!(matches!(err, LabError::Unauthorized));
        assert_eq!(backend.session().token(), None);
    }

    #[tokio::test]
    async fn pdf_bytes_and_reason_phrase_fallback() {
        let (backend, _) = backend().await;
        let bytes = backend.render_report_pdf(ReportId::new(7)).await.unwrap();
        assert_eq!(bytes, b"%PDF-1.4");

        let err = backend
            .render_report_pdf(ReportId::new(13))
            .await
            .unwrap_err();
        match err {
            LabError::Backend { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "Internal Server Error");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn login_is_anonymous_and_keeps_credential_errors() {
        let (backend, _) = backend_with(MemorySession::new()).await;
        let user = NonEmptyText::new("lab").unwrap();
        let token = backend
            .login(&user, &NonEmptyText::new("secret").unwrap())
            .await
            .unwrap();
        assert_eq!(token, "header.payload.sig");

        let err = backend
            .login(&user, &NonEmptyText::new("wrong").unwrap())
            .await
            .unwrap_err();
        match err {
            LabError::Backend { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "Invalid credentials");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn catalogue_records_schema_and_update() {
        let (backend, seen) = backend().await;
        let rows = backend.list_records(ResourceKind::ReferenceSnp).await.unwrap();
        assert_eq!(rows.len(), 1);

        let schema = backend
            .record_schema(ResourceKind::ReferenceSnp)
            .await
            .unwrap();
        assert_eq!(schema[1].column_name, "rs_name");

        let mut record = Record::new();
        record.insert("rs_name".into(), json!("rs4680"));
        backend
            .update_record(ResourceKind::ReferenceSnp, 1, &record)
            .await
            .unwrap();
        let body = &seen.all()[0].2;
        assert_eq!(body, &json!({"rs_name": "rs4680", "id": 1}));
    }

    #[tokio::test]
    async fn unreachable_backend_is_a_transport_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let config = ClientConfig::new(
            &format!("http://{addr}/api"),
            std::time::Duration::from_secs(5),
            "unused".into(),
        )
        .unwrap();
        let backend = HttpBackend::new(config, Arc::new(MemorySession::with_token("tok"))).unwrap();
        let err = backend.reference_markers().await.unwrap_err();
        assert!(matches!(err, LabError::Transport(_)));
    }

    #[test]
    fn interpretation_text_accepts_several_shapes() {
        assert_eq!(interpretation_text(json!("plain")), "plain");
        assert_eq!(
            interpretation_text(json!([{"interpretation": "first"}])),
            "first"
        );
        assert_eq!(interpretation_text(Value::Null), "");
    }
}
