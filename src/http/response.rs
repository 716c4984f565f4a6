//! Response framing.
//!
//! # Responsibilities
//! - Serialise the single reply a connection gets
//! - Always close: every response carries `Connection: close`
//!
//! # Design Decisions
//! - Failures map to one fixed plain-text 500; causes stay in the logs

use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Body of every error response.
pub const SERVER_ERROR_BODY: &str = "Server Error";

/// The one reply written to a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// 200 with the upstream JSON body, byte for byte.
    Json(Vec<u8>),
    /// 500 with [`SERVER_ERROR_BODY`].
    ServerError,
}

impl Reply {
    pub fn status(&self) -> u16 {
        match self {
            Self::Json(_) => 200,
            Self::ServerError => 500,
        }
    }

    /// Full wire bytes, head and body.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Self::Json(body) => {
                let head = format!(
                    "HTTP/1.1 200 OK\r\n\
                     Content-Type: application/json\r\n\
                     Content-Length: {}\r\n\
                     Connection: close\r\n\r\n",
                    body.len()
                );
                let mut bytes = Vec::with_capacity(head.len() + body.len());
                bytes.extend_from_slice(head.as_bytes());
                bytes.extend_from_slice(body);
                bytes
            }
            Self::ServerError => format!(
                "HTTP/1.1 500 Internal Server Error\r\n\
                 Content-Type: text/plain\r\n\
                 Content-Length: {}\r\n\
                 Connection: close\r\n\r\n\
                 {}",
                SERVER_ERROR_BODY.len(),
                SERVER_ERROR_BODY
            )
            .into_bytes(),
        }
    }

    /// Write the reply and flush.
    pub async fn write_to<W>(&self, writer: &mut W) -> std::io::Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        writer.write_all(&self.to_bytes()).await?;
        writer.flush().await
    }
}
