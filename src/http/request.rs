//! Minimal HTTP/1.1 request reader.
//!
//! # Responsibilities
//! - Read one request from a fresh connection in bounded chunks
//! - Recognise request framing (end of head, then Content-Length)
//! - Enforce the total size ceiling while reading
//! - Hand back the body bytes; method and path are ignored
//!
//! # Design Decisions
//! - Head parsing is delegated to `httparse`
//! - Only Content-Length framing; chunked bodies are rejected
//! - A missing Content-Length means an empty body

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::security::RequestLimits;

/// Maximum number of request headers accepted.
const MAX_HEADERS: usize = 64;

/// Errors raised while reading a request. None of them produce a response.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    /// Request exceeded the configured ceiling.
    #[error("request did not fit in {limit} bytes")]
    TooLarge { limit: usize },

    /// Byte stream is not a valid HTTP/1.1 request.
    #[error("malformed request: {0}")]
    Malformed(String),

    /// Socket read failed.
    #[error("read failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Framing learned from a complete request head.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Frame {
    head_len: usize,
    content_length: usize,
}

impl Frame {
    fn total_len(&self) -> usize {
        self.head_len.saturating_add(self.content_length)
    }
}

/// Read exactly one request and return its body.
pub async fn read_request<R>(reader: &mut R, limits: &RequestLimits) -> Result<Vec<u8>, RequestError>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::with_capacity(limits.read_chunk_bytes);
    let mut chunk = vec![0u8; limits.read_chunk_bytes];
    let mut frame = None;

    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            return Err(RequestError::Malformed(format!(
                "connection closed after {} bytes, before the request was complete",
                buf.len()
            )));
        }

        buf.extend_from_slice(&chunk[..n]);
        if !limits.allows(buf.len()) {
            return Err(RequestError::TooLarge {
                limit: limits.max_request_bytes,
            });
        }

        if frame.is_none() {
            frame = parse_head(&buf)?;
            if let Some(f) = frame {
                tracing::trace!(head_len = f.head_len, content_length = f.content_length, "Request head parsed");
                if !limits.allows(f.total_len()) {
                    return Err(RequestError::TooLarge {
                        limit: limits.max_request_bytes,
                    });
                }
            }
        }

        if let Some(f) = frame {
            if buf.len() >= f.total_len() {
                buf.truncate(f.total_len());
                return Ok(buf.split_off(f.head_len));
            }
        }
    }
}

/// Parse the request head if it is complete.
fn parse_head(buf: &[u8]) -> Result<Option<Frame>, RequestError> {
    let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
    let mut request = httparse::Request::new(&mut headers);

    let head_len = match request.parse(buf) {
        Ok(httparse::Status::Complete(len)) => len,
        Ok(httparse::Status::Partial) => return Ok(None),
        Err(e) => return Err(RequestError::Malformed(e.to_string())),
    };

    let mut content_length: Option<usize> = None;
    for header in request.headers.iter() {
        if header.name.eq_ignore_ascii_case("transfer-encoding") {
            return Err(RequestError::Malformed(
                "transfer-encoding is not supported".to_string(),
            ));
        }
        if header.name.eq_ignore_ascii_case("content-length") {
            let value = std::str::from_utf8(header.value)
                .ok()
                .and_then(|v| v.trim().parse::<usize>().ok())
                .ok_or_else(|| RequestError::Malformed("invalid content-length".to_string()))?;
            if content_length.is_some_and(|previous| previous != value) {
                return Err(RequestError::Malformed(
                    "conflicting content-length headers".to_string(),
                ));
            }
            content_length = Some(value);
        }
    }

    Ok(Some(Frame {
        head_len,
        content_length: content_length.unwrap_or(0),
    }))
}
