//! World generation service client.

use std::collections::HashMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use threshold_net::{
    AcceptPolicy, HttpResponse, LogicalRequest, NetworkFailure, PathOutcome, Resolver,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{SERVICE_UNAVAILABLE, WorldgenError, sanitize_message};
use crate::types::{
    GenerationRequest, Operation, PreparedImage, ProgressUpdate, display_name, extension_for,
};

/// Settings for talking to the generation service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub base_url: String,
    pub api_key: String,
    pub api_key_header: String,
    /// Sent as `model` when set; the service default applies otherwise.
    pub model: Option<String>,
    pub poll_interval_secs: u64,
    pub deadline_secs: u64,
    /// Poll statuses expected while the job runs. Other non-2xx polls are
    /// retried too, but logged as unexpected.
    pub transient_statuses: Vec<u16>,
    pub display_name_max_chars: usize,
    pub error_message_max_chars: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.worldlabs.ai/marble/v1".into(),
            api_key: String::new(),
            api_key_header: "WLT-Api-Key".into(),
            model: None,
            poll_interval_secs: 10,
            deadline_secs: 15 * 60,
            transient_statuses: vec![404, 502, 522],
            display_name_max_chars: 50,
            error_message_max_chars: 200,
        }
    }
}

impl ClientConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.deadline_secs)
    }
}

#[derive(Deserialize)]
struct StartResponse {
    #[serde(alias = "name")]
    operation_id: String,
}

#[derive(Deserialize)]
struct PollResponse {
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<Value>,
    #[serde(default)]
    response: Option<Value>,
}

#[derive(Deserialize)]
struct PrepareUploadResponse {
    media_asset: MediaAssetInfo,
    upload_info: UploadInfo,
}

#[derive(Deserialize)]
struct MediaAssetInfo {
    #[serde(alias = "media_asset_id")]
    id: String,
}

#[derive(Deserialize)]
struct UploadInfo {
    upload_url: String,
    #[serde(default)]
    required_headers: HashMap<String, String>,
}

/// Outcome of a single poll.
#[derive(Debug)]
enum PollStep {
    /// Not ready yet (or a transient failure); poll again.
    Pending(String),
    /// Rejected with an unexpected status; poll again.
    Retry(String),
    /// Completed with a result payload.
    Done(Value),
}

/// Starts and polls remote world generations.
#[derive(Debug, Clone)]
pub struct GenerationClient {
    resolver: Resolver,
    config: ClientConfig,
}

impl GenerationClient {
    pub fn new(resolver: Resolver, config: ClientConfig) -> Self {
        Self { resolver, config }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url.trim_end_matches('/'))
    }

    fn authorize(&self, request: LogicalRequest) -> LogicalRequest {
        request.with_header(&self.config.api_key_header, &self.config.api_key)
    }

    /// Submits `request` and returns the pending operation.
    pub async fn start_generation(
        &self,
        request: &GenerationRequest,
    ) -> Result<Operation, WorldgenError> {
        let mut body = json!({
            "display_name": display_name(request.theme(), self.config.display_name_max_chars),
            "world_prompt": request.prompt(),
        });
        if let Some(model) = &self.config.model {
            body["model"] = Value::String(model.clone());
        }
        let http = self.authorize(LogicalRequest::post_json(self.url("/worlds:generate"), &body)?);

        info!(
            theme = %request.theme(),
            image = request.image().is_some(),
            "starting world generation"
        );

        let resp = match self.resolver.resolve(&http, AcceptPolicy::SuccessOnly).await {
            Ok(resp) => resp,
            Err(failure) => return Err(self.start_failure(failure)),
        };

        let parsed: StartResponse =
            serde_json::from_slice(&resp.body).map_err(|e| WorldgenError::Start {
                status: resp.status,
                message: format!("response carried no operation id ({e})"),
            })?;
        let id = parsed
            .operation_id
            .strip_prefix("operations/")
            .unwrap_or(&parsed.operation_id)
            .to_string();
        if id.is_empty() {
            return Err(WorldgenError::Start {
                status: resp.status,
                message: "response carried an empty operation id".into(),
            });
        }

        info!(operation_id = %id, "generation started");
        Ok(Operation::new(id, self.config.deadline()))
    }

    fn start_failure(&self, failure: NetworkFailure) -> WorldgenError {
        if let Some(resp) = &failure.last_response {
            let message = if resp.is_markup() {
                SERVICE_UNAVAILABLE.to_string()
            } else {
                sanitize_message(&error_text(resp), self.config.error_message_max_chars)
            };
            warn!(status = resp.status, %message, "generation start rejected");
            return WorldgenError::Start {
                status: resp.status,
                message,
            };
        }
        warn!(error = %failure, "generation start unreachable");
        WorldgenError::Network(failure)
    }

    /// Polls `operation` until it completes, fails, times out, or `cancel`
    /// fires. `on_progress` is called once per poll.
    pub async fn poll_operation(
        &self,
        operation: &mut Operation,
        on_progress: &(dyn Fn(ProgressUpdate) + Send + Sync),
        cancel: &CancellationToken,
    ) -> Result<Value, WorldgenError> {
        let interval = self.config.poll_interval();
        let base = self.url(&format!("/operations/{}", operation.id()));
        let mut attempt: u32 = 0;

        loop {
            let elapsed = operation.elapsed();
            if elapsed >= operation.deadline() {
                warn!(
                    operation_id = %operation.id(),
                    elapsed_secs = elapsed.as_secs(),
                    "operation deadline exceeded"
                );
                return Err(WorldgenError::Timeout {
                    operation_id: operation.id().to_string(),
                    elapsed,
                });
            }

            attempt += 1;
            on_progress(ProgressUpdate::polling(attempt, elapsed));

            let request = self.authorize(LogicalRequest::get(format!(
                "{base}?t={}",
                cache_buster()
            )));
            let result = self.resolver.resolve(&request, AcceptPolicy::SuccessOnly).await;

            if cancel.is_cancelled() {
                debug!(operation_id = %operation.id(), "polling cancelled");
                return Err(WorldgenError::Cancelled);
            }

            match self.classify(result) {
                Ok(PollStep::Done(payload)) => {
                    operation.finish(true);
                    info!(operation_id = %operation.id(), attempt, "operation completed");
                    return Ok(payload);
                }
                Ok(PollStep::Pending(reason)) => {
                    debug!(operation_id = %operation.id(), attempt, %reason, "operation pending");
                }
                Ok(PollStep::Retry(reason)) => {
                    warn!(
                        operation_id = %operation.id(),
                        attempt,
                        %reason,
                        "poll rejected, retrying"
                    );
                }
                Err(e) => {
                    operation.finish(false);
                    warn!(operation_id = %operation.id(), error = %e, "operation failed");
                    return Err(e);
                }
            }

            let remaining = operation.deadline().saturating_sub(operation.elapsed());
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!(operation_id = %operation.id(), "polling cancelled");
                    return Err(WorldgenError::Cancelled);
                }
                _ = tokio::time::sleep(interval.min(remaining)) => {}
            }
        }
    }

    fn classify(
        &self,
        result: Result<HttpResponse, NetworkFailure>,
    ) -> Result<PollStep, WorldgenError> {
        let max = self.config.error_message_max_chars;
        let resp = match result {
            Ok(resp) => resp,
            Err(failure) => return Ok(self.retry_step(&failure)),
        };

        if resp.is_markup() {
            return Ok(PollStep::Pending("markup response".into()));
        }

        let parsed: PollResponse = serde_json::from_slice(&resp.body).map_err(|_| {
            WorldgenError::Poll(format!(
                "unreadable status: {}",
                sanitize_message(&resp.text(), max)
            ))
        })?;

        if !parsed.done {
            return Ok(PollStep::Pending("in progress".into()));
        }
        if let Some(error) = parsed.error.filter(|e| !e.is_null()) {
            return Err(WorldgenError::Poll(sanitize_message(&error_detail(&error), max)));
        }
        match parsed.response.filter(|r| !r.is_null()) {
            Some(payload) => Ok(PollStep::Done(payload)),
            None => Err(WorldgenError::Poll(
                "operation completed without a result".into(),
            )),
        }
    }

    /// A failed poll never ends the operation. Transport errors, configured
    /// transient statuses and markup pages are expected noise; any other
    /// status is still retried but surfaces as [`PollStep::Retry`].
    fn retry_step(&self, failure: &NetworkFailure) -> PollStep {
        let expected = failure.attempts.iter().any(|a| match &a.outcome {
            PathOutcome::Transport(_) => true,
            PathOutcome::Rejected { status, .. } => self.config.transient_statuses.contains(status),
        }) || failure
            .last_response
            .as_ref()
            .is_some_and(HttpResponse::is_markup);

        let reason = match failure.last_status() {
            Some(status) => format!("status {status}"),
            None => "no path reachable".into(),
        };
        if expected {
            PollStep::Pending(reason)
        } else {
            PollStep::Retry(reason)
        }
    }

    /// Uploads an inline image to the media store and returns a reference
    /// to it.
    pub async fn upload_media_asset(
        &self,
        mime_type: &str,
        data_base64: &str,
    ) -> Result<PreparedImage, WorldgenError> {
        let bytes = BASE64
            .decode(data_base64)
            .map_err(|e| WorldgenError::Upload(format!("invalid base64: {e}")))?;
        let extension = extension_for(mime_type);

        let body = json!({
            "file_name": format!("concept.{extension}"),
            "kind": "image",
            "extension": extension,
        });
        let prepare = self.authorize(LogicalRequest::post_json(
            self.url("/media-assets:prepare_upload"),
            &body,
        )?);
        let resp = self
            .resolver
            .resolve(&prepare, AcceptPolicy::SuccessOnly)
            .await
            .map_err(|f| WorldgenError::Upload(f.to_string()))?;
        let prepared: PrepareUploadResponse = serde_json::from_slice(&resp.body)?;

        let mut put = LogicalRequest::put_bytes(&prepared.upload_info.upload_url, bytes);
        for (name, value) in &prepared.upload_info.required_headers {
            put = put.with_header(name, value);
        }
        if put.header("content-type").is_none() {
            put = put.with_header("Content-Type", mime_type);
        }
        self.resolver
            .resolve(&put, AcceptPolicy::SuccessOnly)
            .await
            .map_err(|f| WorldgenError::Upload(f.to_string()))?;

        info!(media_asset_id = %prepared.media_asset.id, "concept image uploaded");
        Ok(PreparedImage::MediaAsset {
            id: prepared.media_asset.id,
        })
    }
}

fn cache_buster() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
}

/// Best human-readable text from an error response body.
fn error_text(resp: &HttpResponse) -> String {
    match serde_json::from_slice::<Value>(&resp.body) {
        Ok(value) => error_detail(&value),
        Err(_) => resp.text(),
    }
}

fn error_detail(value: &Value) -> String {
    for key in ["message", "detail", "error"] {
        match value.get(key) {
            Some(Value::String(s)) => return s.clone(),
            Some(nested @ Value::Object(_)) => return error_detail(nested),
            _ => {}
        }
    }
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};
    use threshold_net::testing::ScriptedTransport;
    use threshold_net::{Method, NetworkPath, ResolverConfig, TransportError};

    const RELAY: &str = "https://relay.test/?";

    fn client(transport: &Arc<ScriptedTransport>) -> GenerationClient {
        let resolver = Resolver::new(
            transport.clone(),
            &ResolverConfig {
                paths: vec![NetworkPath::Direct, NetworkPath::relay(RELAY)],
            },
        );
        GenerationClient::new(
            resolver,
            ClientConfig {
                base_url: "https://api.test/v1".into(),
                api_key: "k".into(),
                ..Default::default()
            },
        )
    }

    fn no_progress() -> impl Fn(ProgressUpdate) + Send + Sync {
        |_| {}
    }

    fn pending() -> HttpResponse {
        HttpResponse::json(200, r#"{"done": false}"#)
    }

    fn done() -> HttpResponse {
        HttpResponse::json(
            200,
            r#"{"done": true, "response": {"assets": {"splats": {"spz_urls": {"full_res": "https://cdn.test/w.spz"}}}}}"#,
        )
    }

    #[tokio::test]
    async fn start_sends_prompt_and_key() {
        let transport = ScriptedTransport::new(|_| {
            Ok(HttpResponse::json(200, r#"{"operation_id": "op-42"}"#))
        });
        let op = client(&transport)
            .start_generation(&GenerationRequest::text("x".repeat(80)))
            .await
            .unwrap();

        assert_eq!(op.id(), "op-42");
        let sent = &transport.requests()[0];
        assert_eq!(sent.method, Method::Post);
        assert_eq!(sent.url, "https://api.test/v1/worlds:generate");
        assert_eq!(sent.header("wlt-api-key"), Some("k"));

        let body: Value = serde_json::from_slice(sent.body.as_ref().unwrap()).unwrap();
        assert_eq!(body["display_name"].as_str().unwrap().chars().count(), 50);
        assert_eq!(body["world_prompt"]["type"], "text");
    }

    #[tokio::test]
    async fn start_accepts_operation_name_alias() {
        let transport = ScriptedTransport::new(|_| {
            Ok(HttpResponse::json(200, r#"{"name": "operations/op-7"}"#))
        });
        let op = client(&transport)
            .start_generation(&GenerationRequest::text("t"))
            .await
            .unwrap();
        assert_eq!(op.id(), "op-7");
    }

    #[tokio::test]
    async fn start_rejection_is_sanitized() {
        let transport = ScriptedTransport::new(|req| {
            if req.url.starts_with(RELAY) {
                Ok(HttpResponse::new(403, Some("text/html"), "<html>blocked</html>"))
            } else {
                Ok(HttpResponse::json(401, r#"{"message": "invalid api key"}"#))
            }
        });
        let err = client(&transport)
            .start_generation(&GenerationRequest::text("t"))
            .await
            .unwrap_err();

        match err {
            WorldgenError::Start { status, message } => {
                assert_eq!(status, 403);
                assert_eq!(message, SERVICE_UNAVAILABLE);
            }
            other => panic!("expected start failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn start_json_rejection_keeps_message() {
        let transport = ScriptedTransport::new(|_| {
            Ok(HttpResponse::json(400, r#"{"error": {"message": "prompt too long"}}"#))
        });
        let err = client(&transport)
            .start_generation(&GenerationRequest::text("t"))
            .await
            .unwrap_err();
        match err {
            WorldgenError::Start { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "prompt too long");
            }
            other => panic!("expected start failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn start_unreachable_is_network_failure() {
        let transport = ScriptedTransport::new(|_| Err(TransportError::Other("down".into())));
        let err = client(&transport)
            .start_generation(&GenerationRequest::text("t"))
            .await
            .unwrap_err();
        assert!(matches!(err, WorldgenError::Network(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn poll_until_done_reports_progress() {
        let polls = Arc::new(AtomicU32::new(0));
        let counter = polls.clone();
        let transport = ScriptedTransport::new(move |_| {
            if counter.fetch_add(1, Ordering::SeqCst) < 3 {
                Ok(pending())
            } else {
                Ok(done())
            }
        });
        let updates = Arc::new(Mutex::new(Vec::new()));
        let sink = updates.clone();
        let on_progress = move |u: ProgressUpdate| sink.lock().unwrap().push(u);

        let mut op = Operation::new("op-1", Duration::from_secs(900));
        let payload = client(&transport)
            .poll_operation(&mut op, &on_progress, &CancellationToken::new())
            .await
            .unwrap();

        assert!(payload["assets"].is_object());
        assert_eq!(op.state(), crate::OperationState::DoneSuccess);
        let updates = updates.lock().unwrap();
        assert_eq!(updates.len(), 4);
        assert!(updates.windows(2).all(|w| w[0].elapsed <= w[1].elapsed));
        assert!(updates[3].elapsed >= Duration::from_secs(30));
        assert!(updates[3].elapsed < Duration::from_secs(31));
        assert!(transport.urls()[0].starts_with("https://api.test/v1/operations/op-1?t="));
    }

    #[tokio::test(start_paused = true)]
    async fn transient_statuses_keep_polling() {
        let polls = Arc::new(AtomicU32::new(0));
        let counter = polls.clone();
        let transport = ScriptedTransport::new(move |req| {
            if req.url.starts_with(RELAY) {
                return Ok(HttpResponse::json(522, "{}"));
            }
            match counter.fetch_add(1, Ordering::SeqCst) {
                0 => Ok(HttpResponse::json(404, "{}")),
                1 => Ok(HttpResponse::new(200, Some("text/html"), "<html></html>")),
                2 => Err(TransportError::Other("reset".into())),
                _ => Ok(done()),
            }
        });
        let mut op = Operation::new("op-2", Duration::from_secs(900));
        let result = client(&transport)
            .poll_operation(&mut op, &no_progress(), &CancellationToken::new())
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn transient_direct_status_is_not_masked_by_relay() {
        let polls = Arc::new(AtomicU32::new(0));
        let counter = polls.clone();
        let transport = ScriptedTransport::new(move |req| {
            if req.url.starts_with(RELAY) {
                return Ok(HttpResponse::json(403, r#"{"message": "forbidden origin"}"#));
            }
            if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                Ok(HttpResponse::json(404, "{}"))
            } else {
                Ok(done())
            }
        });
        let mut op = Operation::new("op-3", Duration::from_secs(900));
        let payload = client(&transport)
            .poll_operation(&mut op, &no_progress(), &CancellationToken::new())
            .await
            .unwrap();
        assert!(payload["assets"].is_object());
        assert_eq!(op.state(), crate::OperationState::DoneSuccess);
        assert_eq!(polls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limited_poll_is_retried() {
        let polls = Arc::new(AtomicU32::new(0));
        let counter = polls.clone();
        let transport = ScriptedTransport::new(move |_| {
            if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                Ok(HttpResponse::json(429, r#"{"message": "rate limited"}"#))
            } else {
                Ok(done())
            }
        });
        let mut op = Operation::new("op-8", Duration::from_secs(900));
        let result = client(&transport)
            .poll_operation(&mut op, &no_progress(), &CancellationToken::new())
            .await;
        assert!(result.is_ok());
        assert_eq!(op.state(), crate::OperationState::DoneSuccess);
    }

    #[tokio::test(start_paused = true)]
    async fn persistent_server_error_runs_to_deadline() {
        let transport = ScriptedTransport::new(|_| {
            Ok(HttpResponse::json(500, r#"{"message": "internal"}"#))
        });
        let mut op = Operation::new("op-9", Duration::from_secs(30));
        let err = client(&transport)
            .poll_operation(&mut op, &no_progress(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, WorldgenError::Timeout { .. }));
        assert_eq!(op.state(), crate::OperationState::Pending);
    }

    #[tokio::test(start_paused = true)]
    async fn unreadable_success_body_is_poll_failure() {
        let transport =
            ScriptedTransport::new(|_| Ok(HttpResponse::new(200, None, "not json at all")));
        let mut op = Operation::new("op-10", Duration::from_secs(900));
        let err = client(&transport)
            .poll_operation(&mut op, &no_progress(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, WorldgenError::Poll(ref m) if m.contains("unreadable")));
        assert_eq!(op.state(), crate::OperationState::DoneFailure);
    }

    #[tokio::test(start_paused = true)]
    async fn remote_error_and_empty_result_are_failures() {
        let transport = ScriptedTransport::new(|_| {
            Ok(HttpResponse::json(200, r#"{"done": true, "error": {"message": "content policy"}}"#))
        });
        let mut op = Operation::new("op-4", Duration::from_secs(900));
        let err = client(&transport)
            .poll_operation(&mut op, &no_progress(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, WorldgenError::Poll(ref m) if m == "content policy"));

        let transport =
            ScriptedTransport::new(|_| Ok(HttpResponse::json(200, r#"{"done": true}"#)));
        let mut op = Operation::new("op-5", Duration::from_secs(900));
        let err = client(&transport)
            .poll_operation(&mut op, &no_progress(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, WorldgenError::Poll(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_produces_timeout() {
        let transport = ScriptedTransport::new(|_| Ok(pending()));
        let count = Arc::new(AtomicU32::new(0));
        let seen = count.clone();
        let on_progress = move |_: ProgressUpdate| {
            seen.fetch_add(1, Ordering::SeqCst);
        };

        let mut op = Operation::new("op-6", Duration::from_secs(60));
        let err = client(&transport)
            .poll_operation(&mut op, &on_progress, &CancellationToken::new())
            .await
            .unwrap_err();

        match err {
            WorldgenError::Timeout { elapsed, .. } => {
                assert!(elapsed >= Duration::from_secs(60));
                assert!(elapsed < Duration::from_secs(61));
            }
            other => panic!("expected timeout, got {other:?}"),
        }
        // Polls at 0, 10, ..., 50s.
        assert_eq!(count.load(Ordering::SeqCst), 6);
        assert_eq!(op.state(), crate::OperationState::Pending);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_stops_polling() {
        let transport = ScriptedTransport::new(|_| Ok(pending()));
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(25)).await;
            trigger.cancel();
        });

        let mut op = Operation::new("op-7", Duration::from_secs(900));
        let err = client(&transport)
            .poll_operation(&mut op, &no_progress(), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, WorldgenError::Cancelled));
        assert_eq!(transport.count_matching("/operations/op-7"), 3);
    }

    #[tokio::test]
    async fn upload_prepares_then_puts() {
        let transport = ScriptedTransport::new(|req| match req.method {
            Method::Post => Ok(HttpResponse::json(
                200,
                r#"{"media_asset": {"id": "ma_9"}, "upload_info": {"upload_url": "https://upload.test/put", "required_headers": {"x-goog-meta": "1"}}}"#,
            )),
            _ => Ok(HttpResponse::new(200, None, Vec::new())),
        });
        let image = client(&transport)
            .upload_media_asset("image/png", "aGVsbG8=")
            .await
            .unwrap();

        assert_eq!(image, PreparedImage::MediaAsset { id: "ma_9".into() });
        let requests = transport.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].method, Method::Put);
        assert_eq!(requests[1].url, "https://upload.test/put");
        assert_eq!(requests[1].body.as_deref(), Some(&b"hello"[..]));
        assert_eq!(requests[1].header("x-goog-meta"), Some("1"));
    }

    #[tokio::test]
    async fn upload_rejects_bad_base64() {
        let transport = ScriptedTransport::new(|_| Ok(HttpResponse::json(200, "{}")));
        let err = client(&transport)
            .upload_media_asset("image/png", "@@@")
            .await
            .unwrap_err();
        assert!(matches!(err, WorldgenError::Upload(_)));
        assert!(transport.requests().is_empty());
    }
}
