//! Minimal container daemon client.
//!
//! Speaks just enough HTTP to issue one push request over a Unix socket or
//! TCP connection. Requests are sent as HTTP/1.0 so the daemon replies with a
//! close-delimited body instead of chunked encoding, which lets the response
//! stream be handed straight to the event decoder.

use std::path::PathBuf;

use opsdeck_core::error::{OpsError, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::{TcpStream, UnixStream};

/// Response body of an accepted push, positioned after the headers.
pub type PushStream = Box<dyn AsyncBufRead + Unpin + Send>;

/// Largest error body read from a rejected request.
const MAX_ERROR_BODY: u64 = 64 * 1024;

/// Where the daemon listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DaemonEndpoint {
    Unix(PathBuf),
    Tcp(String),
}

impl DaemonEndpoint {
    /// Parse a `unix:///path` or `tcp://host:port` endpoint.
    pub fn parse(host: &str) -> Result<Self> {
        if let Some(path) = host.strip_prefix("unix://") {
            if path.is_empty() {
                return Err(OpsError::ConfigError(format!("empty socket path in '{}'", host)));
            }
            return Ok(Self::Unix(PathBuf::from(path)));
        }
        if let Some(addr) = host.strip_prefix("tcp://") {
            let addr = addr.trim_end_matches('/');
            if addr.is_empty() {
                return Err(OpsError::ConfigError(format!("empty address in '{}'", host)));
            }
            return Ok(Self::Tcp(addr.to_string()));
        }
        Err(OpsError::ConfigError(format!(
            "unsupported daemon endpoint '{}' (expected unix:// or tcp://)",
            host
        )))
    }
}

impl std::fmt::Display for DaemonEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unix(path) => write!(f, "unix://{}", path.display()),
            Self::Tcp(addr) => write!(f, "tcp://{}", addr),
        }
    }
}

/// Client for the daemon's image push endpoint.
#[derive(Debug, Clone)]
pub struct DaemonClient {
    endpoint: DaemonEndpoint,
}

impl DaemonClient {
    pub fn new(endpoint: DaemonEndpoint) -> Self {
        Self { endpoint }
    }

    /// Create a client from a `unix://` or `tcp://` host string.
    pub fn from_host(host: &str) -> Result<Self> {
        Ok(Self::new(DaemonEndpoint::parse(host)?))
    }

    pub fn endpoint(&self) -> &DaemonEndpoint {
        &self.endpoint
    }

    /// Ask the daemon to push `name` (all tags when `tag` is `None`) and
    /// return the streaming response body.
    pub async fn push(&self, name: &str, tag: Option<&str>, auth_token: &str) -> Result<PushStream> {
        let mut path = format!("/images/{}/push", name);
        if let Some(tag) = tag {
            path.push_str("?tag=");
            path.push_str(tag);
        }
        let request = format!(
            "POST {} HTTP/1.0\r\nHost: docker\r\nUser-Agent: opsdeck/{}\r\nX-Registry-Auth: {}\r\nContent-Length: 0\r\n\r\n",
            path,
            crate::VERSION,
            auth_token,
        );

        tracing::debug!(endpoint = %self.endpoint, path = %path, "Sending push request");

        match &self.endpoint {
            DaemonEndpoint::Unix(socket) => {
                let stream = UnixStream::connect(socket).await.map_err(|e| {
                    OpsError::Other(format!(
                        "Failed to connect to daemon at {}: {}",
                        socket.display(),
                        e
                    ))
                })?;
                send_request(stream, &request).await
            }
            DaemonEndpoint::Tcp(addr) => {
                let stream = TcpStream::connect(addr.as_str()).await.map_err(|e| {
                    OpsError::Other(format!("Failed to connect to daemon at {}: {}", addr, e))
                })?;
                send_request(stream, &request).await
            }
        }
    }
}

async fn send_request<S>(mut stream: S, request: &str) -> Result<PushStream>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    stream.write_all(request.as_bytes()).await?;
    stream.flush().await?;

    let mut reader = BufReader::new(stream);
    let status = read_head(&mut reader).await?;

    if !(200..300).contains(&status) {
        let mut body = Vec::new();
        (&mut reader).take(MAX_ERROR_BODY).read_to_end(&mut body).await?;
        return Err(OpsError::DaemonError {
            status,
            message: error_message(&body),
        });
    }

    Ok(Box::new(reader))
}

/// Read the status line and headers, returning the status code.
async fn read_head<R: AsyncBufRead + Unpin>(reader: &mut R) -> Result<u16> {
    let mut line = String::new();
    if reader.read_line(&mut line).await? == 0 {
        return Err(OpsError::Other("daemon closed the connection without a response".to_string()));
    }

    let status = line
        .split_whitespace()
        .nth(1)
        .and_then(|code| code.parse::<u16>().ok())
        .ok_or_else(|| OpsError::Other(format!("malformed response status line: {}", line.trim_end())))?;

    loop {
        line.clear();
        if reader.read_line(&mut line).await? == 0 {
            break;
        }
        let header = line.trim_end();
        if header.is_empty() {
            break;
        }
        if let Some((name, value)) = header.split_once(':') {
            if name.eq_ignore_ascii_case("transfer-encoding") && value.trim().eq_ignore_ascii_case("chunked") {
                return Err(OpsError::Other(
                    "daemon replied with chunked encoding to an HTTP/1.0 request".to_string(),
                ));
            }
        }
    }

    Ok(status)
}

/// Pull the `message` field out of a daemon error body, else the body itself.
fn error_message(body: &[u8]) -> String {
    #[derive(serde::Deserialize)]
    struct ErrorBody {
        message: String,
    }

    match serde_json::from_slice::<ErrorBody>(body) {
        Ok(parsed) => parsed.message,
        Err(_) => String::from_utf8_lossy(body).trim().to_string(),
    }
}
