use std::{
    convert::Infallible,
    fmt,
    pin::{pin, Pin},
    sync::{Arc, Mutex},
    task::{Context, Poll},
};

use bytes::{Bytes, BytesMut};
use hyper::{
    body::{self, Body, Frame, SizeHint},
    client::conn::http1,
    Method, Request, Uri,
};

use crate::{
    client::{BoxFuture, HttpRequest, HttpResponse, Transport},
    internal_metrics::InternalMetrics,
    Error,
};

type HttpSender = http1::SendRequest<HttpContent>;

async fn connect(metrics: &InternalMetrics, uri: &HttpUri) -> Result<HttpSender, Error> {
    let io = tokio::net::TcpStream::connect((uri.host(), uri.port()))
        .await
        .map_err(|e| {
            metrics.transport_conn_failed.increment();

            Error::new("failed to connect TCP stream", e)
        })?;

    metrics.transport_conn_established.increment();

    if uri.is_https() {
        #[cfg(feature = "tls")]
        {
            let io = tls_handshake(metrics, io, uri).await?;

            http1_handshake(metrics, io).await
        }
        #[cfg(not(feature = "tls"))]
        {
            Err(Error::msg("https support requires the `tls` Cargo feature"))
        }
    } else {
        http1_handshake(metrics, io).await
    }
}

#[cfg(feature = "tls")]
async fn tls_handshake(
    metrics: &InternalMetrics,
    io: tokio::net::TcpStream,
    uri: &HttpUri,
) -> Result<tokio_rustls::client::TlsStream<tokio::net::TcpStream>, Error> {
    use tokio_rustls::{rustls, TlsConnector};

    let domain = uri.host().to_owned().try_into().map_err(|e| {
        metrics.transport_conn_tls_failed.increment();

        Error::new(format_args!("could not extract a DNS name from {uri}"), e)
    })?;

    let tls = {
        let mut root_store = rustls::RootCertStore::empty();

        for cert in rustls_native_certs::load_native_certs().map_err(|e| {
            metrics.transport_conn_tls_failed.increment();

            Error::new("failed to load native certificates", e)
        })? {
            let _ = root_store.add(cert);
        }

        Arc::new(
            rustls::ClientConfig::builder()
                .with_root_certificates(root_store)
                .with_no_client_auth(),
        )
    };

    let conn = TlsConnector::from(tls);

    let io = conn.connect(domain, io).await.map_err(|e| {
        metrics.transport_conn_tls_failed.increment();

        Error::new("failed to connect TLS stream", e)
    })?;

    metrics.transport_conn_tls_handshake.increment();

    Ok(io)
}

async fn http1_handshake(
    metrics: &InternalMetrics,
    io: impl tokio::io::AsyncRead + tokio::io::AsyncWrite + Send + Sync + Unpin + 'static,
) -> Result<HttpSender, Error> {
    let (sender, conn) = http1::handshake(HttpIo(io)).await.map_err(|e| {
        metrics.transport_conn_failed.increment();

        Error::new("failed to perform HTTP1 handshake", e)
    })?;

    tokio::task::spawn(async move {
        let _ = conn.await;
    });

    Ok(sender)
}

async fn send_request(
    metrics: &InternalMetrics,
    sender: &mut HttpSender,
    uri: &HttpUri,
    headers: &[(String, String)],
    content: HttpContent,
) -> Result<hyper::Response<body::Incoming>, Error> {
    let req = {
        let mut req = Request::builder()
            .uri(uri.path_and_query())
            .method(Method::POST)
            .header("host", uri.authority())
            .header("content-length", content.len());

        for (k, v) in headers {
            req = req.header(&**k, &**v);
        }

        req.body(content).map_err(|e| {
            metrics.transport_request_failed.increment();

            Error::new("failed to build HTTP request", e)
        })?
    };

    let res = sender.send_request(req).await.map_err(|e| {
        metrics.transport_request_failed.increment();

        Error::new("failed to send HTTP request", e)
    })?;

    metrics.transport_request_sent.increment();

    Ok(res)
}

async fn read_body(res: hyper::Response<body::Incoming>) -> Result<Bytes, Error> {
    let mut body = pin!(res.into_body());
    let mut buf = BytesMut::new();

    while let Some(frame) = std::future::poll_fn(|cx| body.as_mut().poll_frame(cx)).await {
        let frame = frame.map_err(|e| Error::new("failed to read HTTP response body", e))?;

        if let Some(data) = frame.data_ref() {
            buf.extend_from_slice(data);
        }
    }

    Ok(buf.freeze())
}

/**
A [`Transport`] that POSTs requests over HTTP/1.1 using `hyper`.

`https` endpoints are supported when the `tls` Cargo feature is enabled, using the platform's
native root certificates.

A connection is kept open between requests to the same endpoint. A connection that fails is
discarded and a new one is established for the next request.
*/
pub struct HttpTransport {
    metrics: Arc<InternalMetrics>,
    conn: Mutex<Option<(String, HttpSender)>>,
}

impl Default for HttpTransport {
    fn default() -> Self {
        HttpTransport::new()
    }
}

impl HttpTransport {
    pub fn new() -> Self {
        HttpTransport::with_metrics(Arc::new(InternalMetrics::default()))
    }

    pub(crate) fn with_metrics(metrics: Arc<InternalMetrics>) -> Self {
        HttpTransport {
            metrics,
            conn: Mutex::new(None),
        }
    }

    fn poison(&self, uri: &HttpUri) -> Option<HttpSender> {
        let mut conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());

        match conn.take() {
            Some((origin, sender)) if origin == uri.origin() => Some(sender),
            _ => None,
        }
    }

    fn unpoison(&self, uri: &HttpUri, sender: HttpSender) {
        *self.conn.lock().unwrap_or_else(|e| e.into_inner()) = Some((uri.origin(), sender));
    }

    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, Error> {
        let uri = HttpUri::parse(&request.uri)?;

        let mut sender = match self.poison(&uri) {
            Some(mut sender) => match sender.ready().await {
                Ok(()) => sender,
                // The collector closed the idle connection
                Err(_) => connect(&self.metrics, &uri).await?,
            },
            None => connect(&self.metrics, &uri).await?,
        };

        let res = send_request(
            &self.metrics,
            &mut sender,
            &uri,
            &request.headers,
            HttpContent::new(request.body),
        )
        .await?;

        let status = res.status().as_u16();

        let body = match read_body(res).await {
            Ok(body) => {
                self.unpoison(&uri, sender);

                String::from_utf8_lossy(&body).into_owned()
            }
            Err(_) => String::new(),
        };

        Ok(HttpResponse { status, body })
    }
}

impl Transport for HttpTransport {
    fn post(&self, request: HttpRequest) -> BoxFuture<'_, Result<HttpResponse, Error>> {
        Box::pin(self.send(request))
    }
}

/**
An absolute `http` or `https` URI.
*/
pub(crate) struct HttpUri(Uri);

impl fmt::Display for HttpUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl HttpUri {
    pub(crate) fn parse(url: &str) -> Result<Self, Error> {
        let uri: Uri = url
            .parse()
            .map_err(|e| Error::new(format_args!("failed to parse {url:?}"), e))?;

        match uri.scheme_str() {
            Some("http") | Some("https") => (),
            _ => {
                return Err(Error::msg(format_args!(
                    "{url:?} is not an http or https URL"
                )))
            }
        }

        match uri.host() {
            Some(host) if !host.is_empty() => Ok(HttpUri(uri)),
            _ => Err(Error::msg(format_args!("{url:?} is missing a host"))),
        }
    }

    pub fn is_https(&self) -> bool {
        self.0.scheme_str() == Some("https")
    }

    pub fn host(&self) -> &str {
        self.0.host().unwrap_or_default()
    }

    pub fn authority(&self) -> &str {
        self.0
            .authority()
            .map(|authority| authority.as_str())
            .unwrap_or_default()
    }

    pub fn port(&self) -> u16 {
        self.0
            .port_u16()
            .unwrap_or(if self.is_https() { 443 } else { 80 })
    }

    pub fn path_and_query(&self) -> &str {
        self.0
            .path_and_query()
            .map(|path| path.as_str())
            .unwrap_or("/")
    }

    fn origin(&self) -> String {
        format!(
            "{}://{}",
            self.0.scheme_str().unwrap_or_default(),
            self.authority()
        )
    }
}

pub(crate) struct HttpContent {
    payload: Option<Bytes>,
    len: usize,
}

impl HttpContent {
    fn new(payload: Bytes) -> Self {
        HttpContent {
            len: payload.len(),
            payload: Some(payload),
        }
    }

    fn len(&self) -> usize {
        self.len
    }
}

impl Body for HttpContent {
    type Data = Bytes;

    type Error = Infallible;

    fn poll_frame(
        self: Pin<&mut Self>,
        _: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let unpinned = self.get_mut();

        Poll::Ready(unpinned.payload.take().map(|payload| Ok(Frame::data(payload))))
    }

    fn is_end_stream(&self) -> bool {
        self.payload.is_none()
    }

    fn size_hint(&self) -> SizeHint {
        SizeHint::with_exact(self.len as u64)
    }
}

struct HttpIo<T>(T);

impl<T: tokio::io::AsyncRead> hyper::rt::Read for HttpIo<T> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        mut buf: hyper::rt::ReadBufCursor<'_>,
    ) -> Poll<Result<(), std::io::Error>> {
        // SAFETY: `io` inherits the pinning requirements of `self`
        let io = unsafe { self.map_unchecked_mut(|io| &mut io.0) };

        // SAFETY: `io` does not uninitialize any bytes
        let mut read_buf = tokio::io::ReadBuf::uninit(unsafe { buf.as_mut() });

        match tokio::io::AsyncRead::poll_read(io, cx, &mut read_buf) {
            Poll::Ready(Ok(())) => {
                let read = read_buf.filled().len();

                // SAFETY: The bytes being advanced have been initialized by `read_buf`
                unsafe { buf.advance(read) };

                Poll::Ready(Ok(()))
            }
            Poll::Ready(Err(e)) => Poll::Ready(Err(e)),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<T: tokio::io::AsyncWrite> hyper::rt::Write for HttpIo<T> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<Result<usize, std::io::Error>> {
        // SAFETY: `io` inherits the pinning requirements of `self`
        let io = unsafe { self.map_unchecked_mut(|io| &mut io.0) };

        tokio::io::AsyncWrite::poll_write(io, cx, buf)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), std::io::Error>> {
        // SAFETY: `io` inherits the pinning requirements of `self`
        let io = unsafe { self.map_unchecked_mut(|io| &mut io.0) };

        tokio::io::AsyncWrite::poll_flush(io, cx)
    }

    fn poll_shutdown(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<(), std::io::Error>> {
        // SAFETY: `io` inherits the pinning requirements of `self`
        let io = unsafe { self.map_unchecked_mut(|io| &mut io.0) };

        tokio::io::AsyncWrite::poll_shutdown(io, cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::{TcpListener, TcpStream},
    };

    async fn read_request(stream: &mut TcpStream) -> (String, Vec<u8>) {
        let mut buf = Vec::new();
        let mut chunk = [0; 1024];

        let head_len = loop {
            if let Some(i) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                break i + 4;
            }

            let read = stream.read(&mut chunk).await.unwrap();
            assert_ne!(0, read, "connection closed before the request head was read");
            buf.extend_from_slice(&chunk[..read]);
        };

        let head = String::from_utf8(buf[..head_len].to_vec()).unwrap();

        let content_len = head
            .lines()
            .find_map(|line| {
                let (name, value) = line.split_once(':')?;

                name.eq_ignore_ascii_case("content-length")
                    .then(|| value.trim().parse::<usize>().unwrap())
            })
            .unwrap_or(0);

        while buf.len() < head_len + content_len {
            let read = stream.read(&mut chunk).await.unwrap();
            assert_ne!(0, read, "connection closed before the request body was read");
            buf.extend_from_slice(&chunk[..read]);
        }

        (head, buf[head_len..head_len + content_len].to_vec())
    }

    fn request(uri: String) -> HttpRequest {
        HttpRequest {
            uri,
            headers: vec![
                ("Content-Type".to_owned(), "application/json".to_owned()),
                ("Authorization".to_owned(), "Bearer token123".to_owned()),
            ],
            body: Bytes::from_static(b"{\"resourceMetrics\":[]}"),
        }
    }

    #[tokio::test]
    async fn post() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();

            let request = read_request(&mut stream).await;

            stream
                .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 2\r\n\r\n{}")
                .await
                .unwrap();

            request
        });

        let transport = HttpTransport::new();

        let res = transport
            .post(request(format!("http://{addr}/v1/metrics")))
            .await
            .unwrap();

        assert_eq!(200, res.status);
        assert_eq!("{}", res.body);

        let (head, body) = server.await.unwrap();
        let head = head.to_ascii_lowercase();

        assert!(head.starts_with("post /v1/metrics http/1.1\r\n"), "{head}");
        assert!(head.contains("content-type: application/json\r\n"), "{head}");
        assert!(head.contains("authorization: bearer token123\r\n"), "{head}");
        assert!(head.contains("content-length: 22\r\n"), "{head}");
        assert_eq!(b"{\"resourceMetrics\":[]}".to_vec(), body);
    }

    #[tokio::test]
    async fn post_unsuccessful_status() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();

            read_request(&mut stream).await;

            stream
                .write_all(b"HTTP/1.1 500 Internal Server Error\r\ncontent-length: 4\r\n\r\nboom")
                .await
                .unwrap();
        });

        let res = HttpTransport::new()
            .post(request(format!("http://{addr}/v1/metrics")))
            .await
            .unwrap();

        assert_eq!(500, res.status);
        assert_eq!("boom", res.body);
        assert!(!res.is_success());

        server.await.unwrap();
    }

    #[tokio::test]
    async fn post_connection_refused() {
        let addr = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap()
        };

        let metrics = Arc::new(InternalMetrics::default());
        let transport = HttpTransport::with_metrics(metrics.clone());

        let err = transport
            .post(request(format!("http://{addr}/v1/metrics")))
            .await
            .unwrap_err();

        assert_eq!(None, err.status_code());
        assert!(err.to_string().starts_with("failed to connect TCP stream"));
        assert_eq!(1, metrics.transport_conn_failed.sample());
    }

    #[test]
    fn parse_uri() {
        let uri = HttpUri::parse("https://api.axiom.co/v1/metrics").unwrap();

        assert!(uri.is_https());
        assert_eq!("api.axiom.co", uri.host());
        assert_eq!(443, uri.port());
        assert_eq!("/v1/metrics", uri.path_and_query());

        let uri = HttpUri::parse("http://localhost:4318").unwrap();

        assert!(!uri.is_https());
        assert_eq!(4318, uri.port());
        assert_eq!("localhost:4318", uri.authority());
        assert_eq!("/", uri.path_and_query());

        assert!(HttpUri::parse("localhost:4318").is_err());
        assert!(HttpUri::parse("grpc://localhost:4317").is_err());
    }
}
