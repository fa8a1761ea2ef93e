//! End-to-end ingestion: multipart transfer alongside extraction, joined at finalize.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span};
use uuid::Uuid;

use crate::client::{CompletedPart, CreateDocumentRequest, DocumentRecord, IngestApiClient};
use crate::config::{IngestConfig, UploadConfig};
use crate::error::{ApiError, ExtractionError, IngestError, IngestResult};
use crate::extraction::{ExtractionResult, extract_with_format, resolve_format};
use crate::pool::parallel_limit;
use crate::progress::{BandReporter, ProgressReporter, ProgressUpdate};
use crate::retry::RetryPolicy;
use crate::source::SourceFile;

use super::plan::{PlannedChunk, plan_chunks};
use super::session::UploadSession;
use super::{EXTRACTION_BAND, PARTS_BAND, UploadStage};

/// Drives one file through initiate → parts → complete → finalize
#[derive(Debug, Clone)]
pub struct UploadOrchestrator {
    client: IngestApiClient,
    upload: UploadConfig,
    retry: RetryPolicy,
    progress: ProgressReporter,
}

/// Shared state for the part workers of one session
struct PartContext<'a> {
    source: &'a SourceFile,
    upload_id: &'a str,
    file_key: &'a str,
    cancel: &'a CancellationToken,
    completed: AtomicUsize,
    total: usize,
    band: BandReporter,
}

impl UploadOrchestrator {
    pub fn new(client: IngestApiClient, upload: UploadConfig, progress: ProgressReporter) -> Self {
        Self {
            retry: RetryPolicy::from_config(&upload).for_operation("part_upload"),
            client,
            upload,
            progress,
        }
    }

    pub fn from_config(config: &IngestConfig, progress: ProgressReporter) -> IngestResult<Self> {
        config.validate()?;
        let client = IngestApiClient::new(&config.api)?;
        Ok(Self::new(client, config.upload.clone(), progress))
    }

    pub fn progress(&self) -> &ProgressReporter {
        &self.progress
    }

    /// Upload `source` and create its document record.
    ///
    /// `concurrency` overrides the configured part concurrency. Cancelling
    /// `cancel` stops new parts and retries from starting; requests already
    /// in flight run to completion. Any error leaves the progress record in
    /// the `error` state with progress reset to 0.
    pub async fn ingest(
        &self,
        source: &SourceFile,
        concurrency: Option<usize>,
        cancel: CancellationToken,
    ) -> IngestResult<DocumentRecord> {
        let session_id = Uuid::new_v4();
        let span = info_span!("ingest", session = %session_id, file = %source.name());
        let started = Instant::now();

        let result = async {
            let result = self.run(source, concurrency, &cancel).await;
            if let Err(e) = &result {
                error!(code = e.code(), error = %e, "Ingestion failed");
                self.progress.fail(
                    &UploadStage::Error.to_string(),
                    ProgressUpdate::new().with("error_code", e.code()),
                );
            }
            result
        }
        .instrument(span)
        .await;

        let outcome = if result.is_ok() { "done" } else { "error" };
        metrics::counter!("ingest_sessions_total", "outcome" => outcome).increment(1);
        metrics::histogram!("ingest_session_seconds").record(started.elapsed().as_secs_f64());

        result
    }

    async fn run(
        &self,
        source: &SourceFile,
        concurrency: Option<usize>,
        cancel: &CancellationToken,
    ) -> IngestResult<DocumentRecord> {
        self.progress.reset();

        // Unknown types are rejected before any request is made
        let format = resolve_format(source.content_type())?;
        let file_type = format.content_type();
        self.progress
            .update(ProgressUpdate::new().with("file_type", file_type));

        let extraction = {
            let source = source.clone();
            let band = self.progress.band(EXTRACTION_BAND.0, EXTRACTION_BAND.1);
            tokio::spawn(
                async move { extract_with_format(&source, format, &band).await }
                    .in_current_span(),
            )
        };

        let session = match self.transfer(source, file_type, concurrency, cancel).await {
            Ok(session) => session,
            Err(e) => {
                extraction.abort();
                return Err(e);
            }
        };

        self.enter(UploadStage::Finalizing, cancel)?;
        let extracted = match extraction.await {
            Ok(result) => result?,
            Err(e) => return Err(ExtractionError::Join(e).into()),
        };

        let document = self
            .finalize(source, file_type, &session, &extracted)
            .await?;

        self.progress.update(
            ProgressUpdate::new()
                .status(UploadStage::Done.to_string())
                .progress(UploadStage::Done.progress())
                .with("document_upload_id", document.id.as_str()),
        );
        info!(document_id = %document.id, "Ingestion complete");

        Ok(document)
    }

    /// Initiate, upload every part, and complete the multipart upload
    async fn transfer(
        &self,
        source: &SourceFile,
        file_type: &str,
        concurrency: Option<usize>,
        cancel: &CancellationToken,
    ) -> IngestResult<UploadSession> {
        self.enter(UploadStage::Initiated, cancel)?;
        let upload = self
            .client
            .initiate_multipart(source.name(), file_type)
            .await
            .map_err(|e| stage_error(UploadStage::Initiated, e))?;
        info!(upload_id = %upload.upload_id, file_key = %upload.file_key, "Multipart upload initiated");
        self.progress.update(
            ProgressUpdate::new()
                .with("upload_id", upload.upload_id.as_str())
                .with("file_key", upload.file_key.as_str()),
        );

        self.enter(UploadStage::Planned, cancel)?;
        let plan = plan_chunks(source.size(), self.upload.chunk_size_bytes);
        self.progress.update(
            ProgressUpdate::new()
                .with("parts_total", plan.len())
                .with("parts_completed", 0),
        );
        let mut session = UploadSession::new(upload, plan);

        self.enter(UploadStage::UploadingParts, cancel)?;
        let limit = concurrency.unwrap_or(self.upload.concurrency);
        let parts = {
            let context = PartContext {
                source,
                upload_id: session.upload_id(),
                file_key: session.file_key(),
                cancel,
                completed: AtomicUsize::new(0),
                total: session.plan().len(),
                band: self.progress.band(PARTS_BAND.0, PARTS_BAND.1),
            };
            info!(parts = context.total, concurrency = limit, "Uploading parts");

            let context = &context;
            let parts = parallel_limit(session.plan(), limit, move |chunk, _| {
                let chunk = *chunk;
                self.upload_part(context, chunk)
            })
            .await?;
            parts
        };

        for part in parts {
            session.record_part(part);
        }
        if !session.is_complete() {
            return Err(IngestError::Internal {
                message: format!(
                    "{} of {} parts recorded",
                    session.completed_count(),
                    session.plan().len()
                ),
            });
        }
        // Part updates race, so settle the final count once
        self.progress
            .update(ProgressUpdate::new().with("parts_completed", session.completed_count()));

        self.enter(UploadStage::Completing, cancel)?;
        self.client
            .complete_multipart(session.upload_id(), session.file_key(), &session.sorted_parts())
            .await
            .map_err(|e| stage_error(UploadStage::Completing, e))?;

        Ok(session)
    }

    /// Fetch a presigned URL for one part and PUT its bytes under the retry policy
    async fn upload_part(
        &self,
        context: &PartContext<'_>,
        chunk: PlannedChunk,
    ) -> IngestResult<CompletedPart> {
        if context.cancel.is_cancelled() {
            return Err(IngestError::Cancelled);
        }

        let part_number = chunk.part_number;
        let url = self
            .client
            .presigned_url(context.upload_id, context.file_key, part_number)
            .await
            .map_err(|e| stage_error(UploadStage::UploadingParts, e))?;
        let body = context.source.read_range(chunk.start, chunk.end).await?;

        let url = url.as_str();
        let timeout = self.upload.part_timeout();
        let part = self
            .retry
            .run(&format!("part {}", part_number), |attempt| {
                let body = body.clone();
                async move {
                    if attempt > 1 && context.cancel.is_cancelled() {
                        return Err(IngestError::Cancelled);
                    }
                    self.client
                        .upload_part(url, body, part_number, timeout)
                        .await
                        .map_err(|source| IngestError::PartUpload {
                            part_number,
                            attempts: attempt,
                            source,
                        })
                }
            })
            .await?;

        metrics::counter!("ingest_parts_uploaded_total").increment(1);
        metrics::counter!("ingest_bytes_uploaded_total").increment(chunk.len());

        let done = context.completed.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(part_number, done, total = context.total, "Part complete");
        context.band.update(
            ProgressUpdate::new()
                .status(UploadStage::UploadingParts.to_string())
                .progress(done as f64 / context.total as f64 * 100.0)
                .with("parts_completed", done),
        );

        Ok(part)
    }

    async fn finalize(
        &self,
        source: &SourceFile,
        file_type: &str,
        session: &UploadSession,
        extracted: &ExtractionResult,
    ) -> IngestResult<DocumentRecord> {
        let request = CreateDocumentRequest {
            file_name: source.name(),
            file_type,
            file_key: session.file_key(),
            extracted_text: Some(&extracted.text),
            extracted_metadata: Some(&extracted.metadata),
        };

        self.client
            .create_document(&request)
            .await
            .map_err(|e| stage_error(UploadStage::Finalizing, e))
    }

    /// Log and report a stage transition, refusing to start it once cancelled
    fn enter(&self, stage: UploadStage, cancel: &CancellationToken) -> IngestResult<()> {
        if cancel.is_cancelled() {
            info!(stage = %stage, "Ingestion cancelled");
            return Err(IngestError::Cancelled);
        }

        info!(stage = %stage, "Entering stage");
        self.progress
            .update(ProgressUpdate::new().status(stage.to_string()).progress(stage.progress()));
        Ok(())
    }
}

fn stage_error(stage: UploadStage, source: ApiError) -> IngestError {
    IngestError::Stage { stage, source }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ApiConfig, MIN_CHUNK_SIZE};
    use serde_json::{Value, json};
    use std::collections::HashSet;
    use wiremock::matchers::{method, path, path_regex};
    use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

    const MIB: usize = 1024 * 1024;

    /// Hands out a distinct bucket URL per part number
    struct PresignResponder {
        base: String,
    }

    impl Respond for PresignResponder {
        fn respond(&self, request: &Request) -> ResponseTemplate {
            let body: Value = serde_json::from_slice(&request.body).unwrap();
            let part = body["part_number"].as_u64().unwrap();
            ResponseTemplate::new(200).set_body_json(
                json!({"presigned_url": format!("{}/bucket/part-{}", self.base, part)}),
            )
        }
    }

    /// Accepts a part PUT and answers with an ETag derived from the URL
    struct BucketResponder;

    impl Respond for BucketResponder {
        fn respond(&self, request: &Request) -> ResponseTemplate {
            let part = request.url.path().rsplit('-').next().unwrap_or_default();
            ResponseTemplate::new(200).insert_header("ETag", format!("\"etag-{}\"", part))
        }
    }

    async fn mount_transfer(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/multipart-upload/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"upload_id": "up-1", "file_key": "uploads/key-1"})),
            )
            .mount(server)
            .await;
        Mock::given(method("POST"))
            .and(path("/upload-url/"))
            .respond_with(PresignResponder { base: server.uri() })
            .mount(server)
            .await;
        Mock::given(method("PUT"))
            .and(path_regex(r"^/bucket/part-\d+$"))
            .respond_with(BucketResponder)
            .mount(server)
            .await;
    }

    async fn mount_complete(server: &MockServer, status: u16) {
        Mock::given(method("PUT"))
            .and(path("/multipart-upload/up-1"))
            .respond_with(ResponseTemplate::new(status))
            .mount(server)
            .await;
    }

    async fn mount_finalize(server: &MockServer, expected_calls: u64) {
        Mock::given(method("POST"))
            .and(path("/document-uploads/"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "id": "doc-1",
                "file_name": "notes.txt",
                "file_type": "text/plain",
                "url_friendly_file_name": "notes-txt",
            })))
            .expect(expected_calls)
            .mount(server)
            .await;
    }

    fn orchestrator(server: &MockServer) -> UploadOrchestrator {
        let client = IngestApiClient::new(&ApiConfig {
            base_url: server.uri(),
            bearer_token: Some("token".to_string()),
            request_timeout_secs: 10,
        })
        .unwrap();
        let upload = UploadConfig {
            chunk_size_bytes: MIN_CHUNK_SIZE,
            concurrency: 4,
            max_retries: 3,
            retry_delay_ms: 0,
            part_timeout_secs: 10,
        };
        UploadOrchestrator::new(client, upload, ProgressReporter::new())
    }

    async fn text_file(
        dir: &tempfile::TempDir,
        len: usize,
        content_type: &str,
    ) -> SourceFile {
        let path = dir.path().join("notes.txt");
        let line = b"ingest me\n";
        let contents: Vec<u8> = line.iter().copied().cycle().take(len).collect();
        std::fs::write(&path, contents).unwrap();
        SourceFile::open(&path, content_type).await.unwrap()
    }

    async fn requests_to(server: &MockServer, verb: &str, prefix: &str) -> Vec<Request> {
        server
            .received_requests()
            .await
            .unwrap()
            .into_iter()
            .filter(|r| r.method.as_str() == verb && r.url.path().starts_with(prefix))
            .collect()
    }

    #[tokio::test]
    async fn test_twelve_mib_file_end_to_end() {
        let server = MockServer::start().await;
        mount_transfer(&server).await;
        mount_complete(&server, 200).await;
        mount_finalize(&server, 1).await;

        let dir = tempfile::tempdir().unwrap();
        let source = text_file(&dir, 12 * MIB, "text/plain").await;
        let orchestrator = orchestrator(&server);

        let document = orchestrator
            .ingest(&source, Some(2), CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(document.id, "doc-1");
        assert_eq!(document.url_friendly_file_name.as_deref(), Some("notes-txt"));

        // One presigned URL per part, each PUT to its own URL
        assert_eq!(requests_to(&server, "POST", "/upload-url/").await.len(), 3);
        let puts = requests_to(&server, "PUT", "/bucket/").await;
        let urls: HashSet<String> = puts.iter().map(|r| r.url.path().to_string()).collect();
        assert_eq!(urls.len(), 3);
        let sizes: HashSet<usize> = puts.iter().map(|r| r.body.len()).collect();
        assert_eq!(sizes, HashSet::from([5 * MIB, 2 * MIB]));
        assert!(puts.iter().all(|r| !r.headers.contains_key("authorization")));

        let complete = requests_to(&server, "PUT", "/multipart-upload/up-1").await;
        assert_eq!(complete.len(), 1);
        let body: Value = serde_json::from_slice(&complete[0].body).unwrap();
        assert_eq!(body["file_key"], json!("uploads/key-1"));
        assert_eq!(
            body["parts"],
            json!([
                {"ETag": "\"etag-1\"", "PartNumber": 1},
                {"ETag": "\"etag-2\"", "PartNumber": 2},
                {"ETag": "\"etag-3\"", "PartNumber": 3},
            ])
        );

        // Finalize comes after complete and carries the extracted text
        let all = server.received_requests().await.unwrap();
        let complete_at = all
            .iter()
            .position(|r| r.url.path() == "/multipart-upload/up-1")
            .unwrap();
        let finalize_at = all
            .iter()
            .position(|r| r.url.path() == "/document-uploads/")
            .unwrap();
        assert!(complete_at < finalize_at);

        let finalize: Value = serde_json::from_slice(&all[finalize_at].body).unwrap();
        assert_eq!(finalize["file_key"], json!("uploads/key-1"));
        assert_eq!(finalize["file_type"], json!("text/plain"));
        assert_eq!(finalize["extracted_text"].as_str().map(str::len), Some(12 * MIB));

        let record = orchestrator.progress().snapshot();
        assert_eq!(record.status, "done");
        assert_eq!(record.progress, 100.0);
        assert_eq!(record.payload.get("file_type"), Some(&json!("text/plain")));
        assert_eq!(record.payload.get("parts_total"), Some(&json!(3)));
        assert_eq!(record.payload.get("parts_completed"), Some(&json!(3)));
        assert_eq!(record.payload.get("document_upload_id"), Some(&json!("doc-1")));
    }

    #[tokio::test]
    async fn test_unsupported_type_makes_no_requests() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let source = text_file(&dir, 64, "application/x-unknown").await;
        let orchestrator = orchestrator(&server);

        let err = orchestrator
            .ingest(&source, None, CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::UnsupportedFileType { .. }));
        assert!(err.is_side_effect_free());
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_put_is_retried() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/bucket/part-1"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .with_priority(1)
            .mount(&server)
            .await;
        mount_transfer(&server).await;
        mount_complete(&server, 200).await;
        mount_finalize(&server, 1).await;

        let dir = tempfile::tempdir().unwrap();
        let source = text_file(&dir, 1024, "text/plain").await;

        orchestrator(&server)
            .ingest(&source, None, CancellationToken::new())
            .await
            .unwrap();

        // Two failures then a success, all against the same presigned URL
        assert_eq!(requests_to(&server, "PUT", "/bucket/part-1").await.len(), 3);
        assert_eq!(requests_to(&server, "POST", "/upload-url/").await.len(), 1);
    }

    #[tokio::test]
    async fn test_exhausted_retries_fail_session() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/bucket/part-1"))
            .respond_with(ResponseTemplate::new(500))
            .with_priority(1)
            .mount(&server)
            .await;
        mount_transfer(&server).await;
        mount_complete(&server, 200).await;
        mount_finalize(&server, 0).await;

        let dir = tempfile::tempdir().unwrap();
        let source = text_file(&dir, 1024, "text/plain").await;
        let orchestrator = orchestrator(&server);

        let err = orchestrator
            .ingest(&source, None, CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            IngestError::PartUpload {
                part_number: 1,
                attempts: 3,
                source: ApiError::Status { status: 500, .. }
            }
        ));
        assert_eq!(err.code(), "part_upload_failed");
        assert_eq!(requests_to(&server, "PUT", "/bucket/part-1").await.len(), 3);
        assert!(requests_to(&server, "PUT", "/multipart-upload/").await.is_empty());
    }

    #[tokio::test]
    async fn test_complete_failure_is_stage_error() {
        let server = MockServer::start().await;
        mount_transfer(&server).await;
        mount_complete(&server, 500).await;
        mount_finalize(&server, 0).await;

        let dir = tempfile::tempdir().unwrap();
        let source = text_file(&dir, 1024, "text/plain").await;
        let orchestrator = orchestrator(&server);

        let err = orchestrator
            .ingest(&source, None, CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            IngestError::Stage {
                stage: UploadStage::Completing,
                ..
            }
        ));

        // Not retried
        assert_eq!(requests_to(&server, "PUT", "/multipart-upload/up-1").await.len(), 1);

        let record = orchestrator.progress().snapshot();
        assert_eq!(record.status, "error");
        assert_eq!(record.progress, 0.0);
        assert_eq!(record.payload.get("error_code"), Some(&json!("complete_failed")));
        assert_eq!(record.payload.get("file_type"), Some(&json!("text/plain")));
    }

    #[tokio::test]
    async fn test_extraction_error_surfaces_after_transfer() {
        let server = MockServer::start().await;
        mount_transfer(&server).await;
        mount_complete(&server, 200).await;
        mount_finalize(&server, 0).await;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, b"{\"unterminated\": ").unwrap();
        let source = SourceFile::open(&path, "application/json").await.unwrap();

        let err = orchestrator(&server)
            .ingest(&source, None, CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::Extraction(ExtractionError::Parse { .. })));

        // The bytes were stored even though extraction failed
        assert_eq!(requests_to(&server, "PUT", "/multipart-upload/up-1").await.len(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let source = text_file(&dir, 1024, "text/plain").await;
        let orchestrator = orchestrator(&server);

        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = orchestrator.ingest(&source, None, cancel).await.unwrap_err();
        assert!(matches!(err, IngestError::Cancelled));
        assert!(server.received_requests().await.unwrap().is_empty());
        assert_eq!(orchestrator.progress().snapshot().status, "error");
    }

    /// Cancels the session as soon as a part PUT arrives, then answers late
    struct CancellingBucket {
        cancel: CancellationToken,
    }

    impl Respond for CancellingBucket {
        fn respond(&self, request: &Request) -> ResponseTemplate {
            self.cancel.cancel();
            BucketResponder
                .respond(request)
                .set_delay(std::time::Duration::from_millis(200))
        }
    }

    #[tokio::test]
    async fn test_cancel_mid_transfer_lets_in_flight_part_finish() {
        let server = MockServer::start().await;
        let cancel = CancellationToken::new();
        Mock::given(method("PUT"))
            .and(path_regex(r"^/bucket/part-\d+$"))
            .respond_with(CancellingBucket {
                cancel: cancel.clone(),
            })
            .with_priority(1)
            .mount(&server)
            .await;
        mount_transfer(&server).await;
        mount_complete(&server, 200).await;
        mount_finalize(&server, 0).await;

        let dir = tempfile::tempdir().unwrap();
        let source = text_file(&dir, 5 * MIB + 10, "text/plain").await;
        let orchestrator = orchestrator(&server);

        let err = orchestrator
            .ingest(&source, Some(1), cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::Cancelled));
        assert_eq!(err.code(), "cancelled");

        // Part 1 was in flight when the token fired and still completed;
        // part 2 was never started
        assert_eq!(requests_to(&server, "POST", "/upload-url/").await.len(), 1);
        assert_eq!(requests_to(&server, "PUT", "/bucket/").await.len(), 1);
        assert!(requests_to(&server, "PUT", "/multipart-upload/").await.is_empty());

        let record = orchestrator.progress().snapshot();
        assert_eq!(record.status, "error");
        assert_eq!(record.payload.get("parts_completed"), Some(&json!(1)));
        assert_eq!(record.payload.get("error_code"), Some(&json!("cancelled")));
    }

    #[tokio::test]
    async fn test_presign_failure_is_stage_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/upload-url/"))
            .respond_with(ResponseTemplate::new(500).set_body_string("no url"))
            .with_priority(1)
            .mount(&server)
            .await;
        mount_transfer(&server).await;
        mount_complete(&server, 200).await;
        mount_finalize(&server, 0).await;

        let dir = tempfile::tempdir().unwrap();
        let source = text_file(&dir, 1024, "text/plain").await;

        let err = orchestrator(&server)
            .ingest(&source, None, CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            IngestError::Stage {
                stage: UploadStage::UploadingParts,
                source: ApiError::Status { status: 500, .. }
            }
        ));
        assert_eq!(err.code(), "presign_failed");

        // Presign is not retried and no bytes were sent
        assert_eq!(requests_to(&server, "POST", "/upload-url/").await.len(), 1);
        assert!(requests_to(&server, "PUT", "/bucket/").await.is_empty());
    }

    #[tokio::test]
    async fn test_empty_file_completes_with_no_parts() {
        let server = MockServer::start().await;
        mount_transfer(&server).await;
        mount_complete(&server, 200).await;
        mount_finalize(&server, 1).await;

        let dir = tempfile::tempdir().unwrap();
        let source = text_file(&dir, 0, "text/plain").await;
        let orchestrator = orchestrator(&server);

        orchestrator
            .ingest(&source, None, CancellationToken::new())
            .await
            .unwrap();

        assert!(requests_to(&server, "POST", "/upload-url/").await.is_empty());
        let complete = requests_to(&server, "PUT", "/multipart-upload/up-1").await;
        assert_eq!(complete.len(), 1);
        let body: Value = serde_json::from_slice(&complete[0].body).unwrap();
        assert_eq!(body["parts"], json!([]));

        let record = orchestrator.progress().snapshot();
        assert_eq!(record.status, "done");
        assert_eq!(record.payload.get("parts_total"), Some(&json!(0)));
    }

    #[tokio::test]
    async fn test_reused_orchestrator_recovers_after_failure() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/multipart-upload/up-1"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(1)
            .with_priority(1)
            .mount(&server)
            .await;
        mount_transfer(&server).await;
        mount_complete(&server, 200).await;
        mount_finalize(&server, 1).await;

        let dir = tempfile::tempdir().unwrap();
        let source = text_file(&dir, 1024, "text/plain").await;
        let orchestrator = orchestrator(&server);

        let err = orchestrator
            .ingest(&source, None, CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "complete_failed");
        assert_eq!(orchestrator.progress().snapshot().status, "error");

        let mut rx = orchestrator.progress().subscribe();
        let _ = rx.borrow_and_update();
        let document = orchestrator
            .ingest(&source, None, CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(document.id, "doc-1");

        let record = orchestrator.progress().snapshot();
        assert_eq!(record.status, "done");
        assert_eq!(record.progress, 100.0);
        assert_eq!(record.payload.get("document_upload_id"), Some(&json!("doc-1")));
        assert_eq!(record.payload.get("error_code"), None);
        assert!(rx.has_changed().unwrap());
    }
}
