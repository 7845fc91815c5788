// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Socket endpoints: `tcp://host:port` and `ipc:///path` forms.
//!
//! TCP endpoints carry host and port; IPC endpoints carry a filesystem path
//! and nothing else. A `*` host means "every interface" on bind.

use std::fmt;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::task::{Context, Poll};

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::{TcpListener, TcpStream, UnixListener, UnixStream};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    Tcp { host: String, port: u16 },
    Ipc { path: PathBuf },
}

#[derive(Debug, Error)]
pub enum EndpointError {
    #[error("unsupported protocol: {0}")]
    UnsupportedProtocol(String),

    #[error("invalid tcp address: {0}")]
    InvalidTcpAddress(String),

    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("bind failed on {0}: {1}")]
    Bind(String, std::io::Error),

    #[error("refusing to remove non-socket file: {0}")]
    NotASocket(PathBuf),

    #[error("cannot remove busy socket file: {0}")]
    SocketBusy(PathBuf),

    #[error("failed to remove existing file {0}: {1}")]
    RemoveFailed(PathBuf, std::io::Error),
}

impl Endpoint {
    /// Build an endpoint from separate protocol and address parts, the form
    /// configuration carries them in.
    pub fn new(protocol: &str, address: &str) -> Result<Self, EndpointError> {
        match protocol {
            "tcp" => {
                let (host, port) = address
                    .rsplit_once(':')
                    .ok_or_else(|| EndpointError::InvalidTcpAddress(address.to_string()))?;
                let port = port
                    .parse::<u16>()
                    .map_err(|_| EndpointError::InvalidTcpAddress(address.to_string()))?;
                let host = match host {
                    "" | "*" => "0.0.0.0",
                    other => other,
                };
                Ok(Endpoint::Tcp { host: host.to_string(), port })
            }
            "ipc" => Ok(Endpoint::Ipc { path: PathBuf::from(address) }),
            other => Err(EndpointError::UnsupportedProtocol(other.to_string())),
        }
    }

    /// Parse a full `protocol://address` endpoint string.
    pub fn parse(endpoint: &str) -> Result<Self, EndpointError> {
        let (protocol, address) = endpoint
            .split_once("://")
            .ok_or_else(|| EndpointError::InvalidEndpoint(endpoint.to_string()))?;
        Self::new(protocol, address)
    }

    pub async fn connect(&self) -> std::io::Result<Conn> {
        match self {
            Endpoint::Tcp { host, port } => {
                Ok(Conn::Tcp(TcpStream::connect((host.as_str(), *port)).await?))
            }
            Endpoint::Ipc { path } => Ok(Conn::Unix(UnixStream::connect(path).await?)),
        }
    }

    /// Bind a listener. IPC endpoints first refresh a stale socket file.
    pub async fn bind(&self) -> Result<BoundListener, EndpointError> {
        match self {
            Endpoint::Tcp { host, port } => {
                let listener = TcpListener::bind((host.as_str(), *port))
                    .await
                    .map_err(|e| EndpointError::Bind(self.to_string(), e))?;
                Ok(BoundListener::Tcp(listener))
            }
            Endpoint::Ipc { path } => {
                refresh_ipc_socket(path, true)?;
                let listener = UnixListener::bind(path)
                    .map_err(|e| EndpointError::Bind(self.to_string(), e))?;
                Ok(BoundListener::Unix(listener))
            }
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Tcp { host, port } => write!(f, "tcp://{host}:{port}"),
            Endpoint::Ipc { path } => write!(f, "ipc://{}", path.display()),
        }
    }
}

/// Refresh a stale IPC endpoint file so a fresh bind can succeed.
///
/// In strict mode an existing file that is not a socket is refused rather
/// than removed.
pub fn refresh_ipc_socket(path: &Path, strict: bool) -> Result<(), EndpointError> {
    use std::os::unix::fs::FileTypeExt;

    if !path.exists() {
        return Ok(());
    }
    if strict {
        let is_socket = std::fs::metadata(path)
            .map(|m| m.file_type().is_socket())
            .unwrap_or(false);
        if !is_socket {
            return Err(EndpointError::NotASocket(path.to_path_buf()));
        }
    }
    const EBUSY: i32 = 16;
    std::fs::remove_file(path).map_err(|err| {
        if err.raw_os_error() == Some(EBUSY) {
            EndpointError::SocketBusy(path.to_path_buf())
        } else {
            EndpointError::RemoveFailed(path.to_path_buf(), err)
        }
    })
}

/// A connected stream over either transport.
pub enum Conn {
    Tcp(TcpStream),
    Unix(UnixStream),
}

impl AsyncRead for Conn {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            Conn::Tcp(stream) => Pin::new(stream).poll_read(cx, buf),
            Conn::Unix(stream) => Pin::new(stream).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for Conn {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        match self.get_mut() {
            Conn::Tcp(stream) => Pin::new(stream).poll_write(cx, buf),
            Conn::Unix(stream) => Pin::new(stream).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            Conn::Tcp(stream) => Pin::new(stream).poll_flush(cx),
            Conn::Unix(stream) => Pin::new(stream).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            Conn::Tcp(stream) => Pin::new(stream).poll_shutdown(cx),
            Conn::Unix(stream) => Pin::new(stream).poll_shutdown(cx),
        }
    }
}

/// A bound listener over either transport.
pub enum BoundListener {
    Tcp(TcpListener),
    Unix(UnixListener),
}

impl BoundListener {
    pub async fn accept(&self) -> std::io::Result<Conn> {
        match self {
            BoundListener::Tcp(listener) => {
                let (stream, _) = listener.accept().await?;
                Ok(Conn::Tcp(stream))
            }
            BoundListener::Unix(listener) => {
                let (stream, _) = listener.accept().await?;
                Ok(Conn::Unix(stream))
            }
        }
    }

    /// The endpoint actually bound. Lets callers bind port 0 and learn the
    /// assigned port.
    pub fn local_endpoint(&self) -> Option<Endpoint> {
        match self {
            BoundListener::Tcp(listener) => listener.local_addr().ok().map(|addr| Endpoint::Tcp {
                host: addr.ip().to_string(),
                port: addr.port(),
            }),
            BoundListener::Unix(listener) => listener
                .local_addr()
                .ok()
                .and_then(|addr| addr.as_pathname().map(Path::to_path_buf))
                .map(|path| Endpoint::Ipc { path }),
        }
    }
}

#[cfg(test)]
#[path = "endpoint_tests.rs"]
mod tests;
