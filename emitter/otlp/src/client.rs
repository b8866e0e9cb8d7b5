use std::{
    fmt,
    future::Future,
    path::{Path, PathBuf},
    pin::Pin,
    sync::Arc,
};

use bytes::Bytes;
use metrix_core::MetricBatch;

use crate::{
    data::{build_payload, Encoding},
    internal_metrics::{ExporterMetrics, InternalMetrics},
    Error,
};

use self::http::HttpUri;

pub use self::http::HttpTransport;

mod http;
mod replay;

/**
A boxed future, as returned by [`Transport`]s.
*/
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/**
A POST request to a collector.
*/
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub uri: String,
    /**
    The headers to send, including `Content-Type`.
    */
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl HttpRequest {
    /**
    Get the value of a header, ignoring the case of its name.
    */
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| &**v)
    }
}

/**
The response from a collector.
*/
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    /**
    The response body, read on a best-effort basis.
    */
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/**
Something that can deliver requests to a collector.

Implementations only report transport-level failures as errors. Any response the collector
sends, successful or not, is returned as an [`HttpResponse`].
*/
pub trait Transport: Send + Sync {
    fn post(&self, request: HttpRequest) -> BoxFuture<'_, Result<HttpResponse, Error>>;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn post(&self, request: HttpRequest) -> BoxFuture<'_, Result<HttpResponse, Error>> {
        (**self).post(request)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn post(&self, request: HttpRequest) -> BoxFuture<'_, Result<HttpResponse, Error>> {
        (**self).post(request)
    }
}

/**
The outcome of a successful [`Exporter::send`].
*/
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sent {
    /**
    The status the collector responded with.

    This is `None` in dry-run mode, where nothing is sent.
    */
    pub status_code: Option<u16>,
}

/**
A builder for an [`Exporter`].
*/
pub struct ExporterBuilder {
    endpoint: String,
    encoding: Encoding,
    headers: Vec<(String, String)>,
    dry_run: bool,
    debug: bool,
    replay_dir: Option<PathBuf>,
}

impl ExporterBuilder {
    pub fn http(endpoint: impl Into<String>) -> Self {
        ExporterBuilder {
            endpoint: endpoint.into(),
            encoding: Encoding::default(),
            headers: Vec::new(),
            dry_run: false,
            debug: false,
            replay_dir: None,
        }
    }

    pub fn encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    /**
    Send payloads as OTLP/JSON. This is the default.
    */
    pub fn json(self) -> Self {
        self.encoding(Encoding::Json)
    }

    /**
    Send payloads as binary OTLP/protobuf.
    */
    pub fn proto(self) -> Self {
        self.encoding(Encoding::Proto)
    }

    /**
    Add a header to every request.

    Headers replace any default header with the same name, ignoring case. This can be used to
    override the `Content-Type`.
    */
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn headers<K: Into<String>, V: Into<String>>(
        mut self,
        headers: impl IntoIterator<Item = (K, V)>,
    ) -> Self {
        self.headers
            .extend(headers.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /**
    Print payloads to stdout as indented JSON instead of sending them.
    */
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /**
    Write a replay script for every request, not just failed ones.
    */
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /**
    The directory replay scripts are written to.

    This defaults to a `metrix` directory under the system temporary directory.
    */
    pub fn replay_dir(mut self, replay_dir: impl Into<PathBuf>) -> Self {
        self.replay_dir = Some(replay_dir.into());
        self
    }

    /**
    Build an exporter that sends over HTTP.
    */
    pub fn build(self) -> Result<Exporter, Error> {
        let metrics = Arc::new(InternalMetrics::default());
        let transport = HttpTransport::with_metrics(metrics.clone());

        self.build_inner(Box::new(transport), metrics)
    }

    /**
    Build an exporter that sends through the given transport.
    */
    pub fn build_with(self, transport: impl Transport + 'static) -> Result<Exporter, Error> {
        self.build_inner(Box::new(transport), Arc::new(InternalMetrics::default()))
    }

    fn build_inner(
        self,
        transport: Box<dyn Transport>,
        metrics: Arc<InternalMetrics>,
    ) -> Result<Exporter, Error> {
        validate_endpoint(&self.endpoint)?;

        Ok(Exporter {
            headers: merge_headers(self.encoding, self.headers),
            endpoint: self.endpoint,
            encoding: self.encoding,
            dry_run: self.dry_run,
            debug: self.debug,
            replay_dir: self
                .replay_dir
                .unwrap_or_else(|| std::env::temp_dir().join("metrix")),
            transport,
            metrics,
        })
    }
}

/**
Check that `endpoint` is an absolute `http` or `https` URL with a host.
*/
pub fn validate_endpoint(endpoint: &str) -> Result<(), Error> {
    HttpUri::parse(endpoint).map(|_| ())
}

fn merge_headers(
    encoding: Encoding,
    custom: impl IntoIterator<Item = (String, String)>,
) -> Vec<(String, String)> {
    let mut headers = vec![("Content-Type".to_owned(), encoding.content_type().to_owned())];

    for (name, value) in custom {
        match headers
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(&name))
        {
            Some(existing) => *existing = (name, value),
            None => headers.push((name, value)),
        }
    }

    headers
}

/**
Sends metric batches to an OTLP collector.

Each call to [`Exporter::send`] makes at most one request. Nothing is retried or queued.
*/
pub struct Exporter {
    endpoint: String,
    encoding: Encoding,
    headers: Vec<(String, String)>,
    dry_run: bool,
    debug: bool,
    replay_dir: PathBuf,
    transport: Box<dyn Transport>,
    metrics: Arc<InternalMetrics>,
}

impl fmt::Debug for Exporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Exporter")
            .field("endpoint", &self.endpoint)
            .field("encoding", &self.encoding)
            .field("dry_run", &self.dry_run)
            .field("debug", &self.debug)
            .field("replay_dir", &self.replay_dir)
            .finish_non_exhaustive()
    }
}

impl Exporter {
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn replay_dir(&self) -> &Path {
        &self.replay_dir
    }

    /**
    The headers sent with every request, including `Content-Type`.
    */
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /**
    Get the self-diagnostics collected by this exporter.
    */
    pub fn metrics(&self) -> ExporterMetrics<'_> {
        ExporterMetrics {
            metrics: &self.metrics,
        }
    }

    /**
    Encode a batch and deliver it to the collector.

    A response with a non-2xx status is returned as an error carrying that status.
    In dry-run mode the batch is printed as JSON instead and no request is made.
    */
    pub async fn send(&self, batch: &MetricBatch) -> Result<Sent, Error> {
        let envelope = build_payload(batch);

        if self.dry_run {
            let json = envelope.to_json_pretty().map_err(|err| {
                self.metrics.payload_encode_failed.increment();
                err
            })?;

            println!("{json}");
            self.metrics.dry_run_printed.increment();

            return Ok(Sent { status_code: None });
        }

        let payload = envelope.encode(self.encoding).map_err(|err| {
            self.metrics.payload_encode_failed.increment();
            err
        })?;

        let request = HttpRequest {
            uri: self.endpoint.clone(),
            headers: self.headers.clone(),
            body: payload.into_bytes(),
        };

        let result = match self.transport.post(request.clone()).await {
            Ok(res) if res.is_success() => {
                self.metrics.export_succeeded.increment();

                let metrics = batch.len();
                let status = res.status;
                emit::debug!("exported {metrics} metrics with status {status}");

                Ok(Sent {
                    status_code: Some(res.status),
                })
            }
            Ok(res) => {
                self.metrics.export_rejected.increment();

                Err(Error::http_status(res.status, &res.body))
            }
            Err(err) => Err(err),
        };

        if self.debug || result.is_err() {
            self.write_replay(&request);
        }

        result
    }

    fn write_replay(&self, request: &HttpRequest) {
        match replay::write(&self.replay_dir, request, self.encoding) {
            Ok(path) => {
                self.metrics.replay_written.increment();

                emit::info!("wrote a replay script for the last request to {path}", #[emit::as_debug] path);
            }
            Err(err) => {
                self.metrics.replay_failed.increment();

                let dir = &self.replay_dir;
                emit::warn!("failed to write a replay script to {dir}: {err}", #[emit::as_debug] dir, err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Mutex;

    use metrix_core::{DataPoint, Metric, ResourceAttributes};

    #[derive(Default)]
    struct FakeTransport {
        requests: Mutex<Vec<HttpRequest>>,
        response: Option<(u16, &'static str)>,
    }

    impl FakeTransport {
        fn responding(status: u16, body: &'static str) -> Self {
            FakeTransport {
                requests: Mutex::new(Vec::new()),
                response: Some((status, body)),
            }
        }

        fn failing() -> Self {
            FakeTransport {
                requests: Mutex::new(Vec::new()),
                response: None,
            }
        }

        fn requests(&self) -> Vec<HttpRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    impl Transport for FakeTransport {
        fn post(&self, request: HttpRequest) -> BoxFuture<'_, Result<HttpResponse, Error>> {
            self.requests.lock().unwrap().push(request);

            let response = self.response;

            Box::pin(async move {
                match response {
                    Some((status, body)) => Ok(HttpResponse {
                        status,
                        body: body.to_owned(),
                    }),
                    None => Err(Error::new(
                        "failed to connect TCP stream",
                        std::io::Error::new(
                            std::io::ErrorKind::ConnectionRefused,
                            "connection refused",
                        ),
                    )),
                }
            })
        }
    }

    fn batch() -> MetricBatch {
        MetricBatch::new(
            Arc::new(ResourceAttributes::new("build-host", "ci")),
            vec![Metric::gauge("system.uptime", "s", "System uptime")
                .with_point(DataPoint::new(1_700_000_000_000u64, 3600.0))],
        )
    }

    fn builder(replay_dir: &Path) -> ExporterBuilder {
        ExporterBuilder::http("https://collector.example.com/v1/metrics").replay_dir(replay_dir)
    }

    #[tokio::test]
    async fn send_json() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(FakeTransport::responding(200, ""));

        let exporter = builder(dir.path())
            .json()
            .build_with(transport.clone())
            .unwrap();

        let sent = exporter.send(&batch()).await.unwrap();

        assert_eq!(Some(200), sent.status_code);

        let requests = transport.requests();
        assert_eq!(1, requests.len());

        let request = &requests[0];
        assert_eq!("https://collector.example.com/v1/metrics", request.uri);
        assert_eq!(Some("application/json"), request.header("content-type"));

        let body: serde_json::Value = serde_json::from_slice(&request.body).unwrap();
        assert_eq!(
            "host.name",
            body["resourceMetrics"][0]["resource"]["attributes"][0]["key"]
        );

        assert_eq!(1, exporter.metrics().export_succeeded());
        assert_eq!(0, exporter.metrics().replay_written());
    }

    #[tokio::test]
    async fn send_proto() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(FakeTransport::responding(200, ""));

        let exporter = builder(dir.path())
            .proto()
            .build_with(transport.clone())
            .unwrap();

        exporter.send(&batch()).await.unwrap();

        let request = &transport.requests()[0];
        assert_eq!(Some("application/x-protobuf"), request.header("Content-Type"));
        assert!(!request.body.is_empty());
        assert!(serde_json::from_slice::<serde_json::Value>(&request.body).is_err());
    }

    #[tokio::test]
    async fn send_custom_headers() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(FakeTransport::responding(204, ""));

        let exporter = builder(dir.path())
            .header("Authorization", "Bearer token123")
            .header("X-Axiom-Dataset", "metrics")
            .build_with(transport.clone())
            .unwrap();

        exporter.send(&batch()).await.unwrap();

        let request = &transport.requests()[0];
        assert_eq!(Some("Bearer token123"), request.header("Authorization"));
        assert_eq!(Some("metrics"), request.header("x-axiom-dataset"));
        assert_eq!(Some("application/json"), request.header("Content-Type"));
    }

    #[tokio::test]
    async fn send_custom_content_type_replaces_default() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(FakeTransport::responding(200, ""));

        let exporter = builder(dir.path())
            .header("content-type", "application/vnd.custom+json")
            .build_with(transport.clone())
            .unwrap();

        exporter.send(&batch()).await.unwrap();

        let request = &transport.requests()[0];
        let content_types = request
            .headers
            .iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case("content-type"))
            .collect::<Vec<_>>();

        assert_eq!(1, content_types.len());
        assert_eq!("application/vnd.custom+json", content_types[0].1);
    }

    #[tokio::test]
    async fn send_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(FakeTransport::responding(401, "invalid token\n"));

        let exporter = builder(dir.path())
            .build_with(transport.clone())
            .unwrap();

        let err = exporter.send(&batch()).await.unwrap_err();

        assert_eq!(Some(401), err.status_code());
        assert_eq!("HTTP 401: invalid token", err.to_string());
        assert_eq!(1, exporter.metrics().export_rejected());

        // Failed sends always leave a replay script behind
        assert!(dir.path().join("last-request.sh").exists());
        assert_eq!(1, exporter.metrics().replay_written());
    }

    #[tokio::test]
    async fn send_network_failure() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(FakeTransport::failing());

        let exporter = builder(dir.path())
            .build_with(transport.clone())
            .unwrap();

        let err = exporter.send(&batch()).await.unwrap_err();

        assert_eq!(None, err.status_code());
        assert!(err.to_string().contains("connection refused"));
        assert!(dir.path().join("last-request.sh").exists());
    }

    #[tokio::test]
    async fn send_dry_run() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(FakeTransport::failing());

        let exporter = builder(dir.path())
            .proto()
            .dry_run(true)
            .build_with(transport.clone())
            .unwrap();

        let sent = exporter.send(&batch()).await.unwrap();

        assert_eq!(None, sent.status_code);
        assert!(transport.requests().is_empty());
        assert_eq!(1, exporter.metrics().dry_run_printed());
        assert!(!dir.path().join("last-request.sh").exists());
    }

    #[tokio::test]
    async fn send_debug_writes_replay() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(FakeTransport::responding(200, ""));

        let exporter = builder(dir.path())
            .proto()
            .debug(true)
            .header("Authorization", "Bearer token123")
            .build_with(transport.clone())
            .unwrap();

        exporter.send(&batch()).await.unwrap();

        let script = std::fs::read_to_string(dir.path().join("last-request.sh")).unwrap();
        assert!(script.contains("'https://collector.example.com/v1/metrics'"));
        assert!(script.contains("-H 'Authorization: Bearer token123'"));
        assert!(script.contains("--data-binary @"));

        let body = std::fs::read(dir.path().join("last-request.bin")).unwrap();
        assert_eq!(&transport.requests()[0].body[..], &body[..]);
    }

    #[tokio::test]
    async fn replay_failure_does_not_change_result() {
        let dir = tempfile::tempdir().unwrap();

        // A file where the replay directory should be
        let blocked = dir.path().join("blocked");
        std::fs::write(&blocked, b"").unwrap();

        let transport = Arc::new(FakeTransport::responding(200, ""));

        let exporter = builder(&blocked)
            .debug(true)
            .build_with(transport.clone())
            .unwrap();

        let sent = exporter.send(&batch()).await.unwrap();

        assert_eq!(Some(200), sent.status_code);
        assert_eq!(1, exporter.metrics().replay_failed());
    }

    #[test]
    fn build_invalid_endpoint() {
        for endpoint in ["", "not a url", "ftp://collector.example.com", "/v1/metrics"] {
            assert!(
                ExporterBuilder::http(endpoint)
                    .build_with(FakeTransport::default())
                    .is_err(),
                "{endpoint:?} should be rejected"
            );
        }
    }

    #[test]
    fn merge_headers_is_case_insensitive() {
        let headers = merge_headers(
            Encoding::Proto,
            vec![
                ("authorization".to_owned(), "Bearer a".to_owned()),
                ("CONTENT-TYPE".to_owned(), "text/plain".to_owned()),
                ("Authorization".to_owned(), "Bearer b".to_owned()),
            ],
        );

        assert_eq!(
            vec![
                ("CONTENT-TYPE".to_owned(), "text/plain".to_owned()),
                ("Authorization".to_owned(), "Bearer b".to_owned()),
            ],
            headers
        );
    }
}
