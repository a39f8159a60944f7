//! Single-shot TCP server.
//!
//! Serves exactly one client per process run: accept, read one buffer,
//! then either the store exchange (append to the artifact, stream it
//! back, delete it) or a drain (log and discard). Everything is blocking
//! I/O on the calling thread; there is no accept loop.

use crate::config::{Config, Mode};
use crate::storage::{Artifact, ArtifactError};
use bytes::BytesMut;
use std::io::{self, Read};
use std::net::{SocketAddr, TcpListener, TcpStream};
use tracing::{info, warn};

/// Receive buffer capacity. One message is whatever arrives in a single
/// read, truncated at this size.
const RECV_BUFFER_SIZE: usize = 1024;

/// Listen backlog. Exactly one client is ever served, so one pending
/// connection slot is enough.
const LISTEN_BACKLOG: i32 = 1;

/// Server instance holding the bound listener.
pub struct Server {
    listener: TcpListener,
    config: Config,
}

impl Server {
    /// Bind the listener at the configured address.
    pub fn bind(config: Config) -> Result<Self, ServerError> {
        let listener = create_listener(config.listen).map_err(ServerError::Bind)?;
        info!(addr = %config.listen, "Server listening");

        Ok(Server { listener, config })
    }

    /// The address actually bound, which differs from the configured one
    /// when port 0 was requested.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept one client, run the exchange, release the sockets, and
    /// return. Any error has already closed whatever was open.
    pub fn run(self) -> Result<(), ServerError> {
        let Server { listener, config } = self;

        let (mut stream, peer) = listener.accept().map_err(ServerError::Accept)?;
        info!(peer = %peer, "Client connected");

        let message = read_message(&mut stream)?;
        info!(bytes = message.len(), "Message received");

        match config.mode {
            Mode::Store => {
                let artifact = Artifact::new(&config.storage_path);
                store_and_respond(&mut stream, &artifact, &message)?;

                drop(stream);
                drop(listener);
                info!("Connection closed");

                remove_artifact(&artifact);
            }
            Mode::Drain => {
                info!(
                    bytes = message.len(),
                    payload = %String::from_utf8_lossy(&message),
                    "Drained message without storing"
                );

                drop(stream);
                drop(listener);
                info!("Connection closed");
            }
        }

        Ok(())
    }
}

/// Perform the single blocking read, bounded at the bytes actually
/// received. A peer that closes without sending yields an empty message.
fn read_message(stream: &mut TcpStream) -> Result<BytesMut, ServerError> {
    let mut buf = BytesMut::zeroed(RECV_BUFFER_SIZE);
    let n = stream.read(&mut buf).map_err(ServerError::Io)?;
    buf.truncate(n);
    Ok(buf)
}

/// Append the message to the artifact, then stream the artifact's full
/// contents back over the same connection.
fn store_and_respond(
    stream: &mut TcpStream,
    artifact: &Artifact,
    message: &[u8],
) -> Result<(), ServerError> {
    artifact.append(message)?;
    info!(
        path = %artifact.path().display(),
        bytes = message.len(),
        "Message appended to artifact"
    );

    let sent = artifact.stream_to(stream)?;
    info!(bytes = sent, "Artifact contents sent to client");

    Ok(())
}

/// Delete the artifact. Failure here is logged and otherwise ignored;
/// the exchange already completed.
fn remove_artifact(artifact: &Artifact) {
    match artifact.remove() {
        Ok(()) => info!(path = %artifact.path().display(), "Artifact deleted"),
        Err(e) => warn!(
            path = %artifact.path().display(),
            error = %e,
            "Failed to delete artifact"
        ),
    }
}

/// Create a TCP listener with the backlog pinned to one pending
/// connection. The std listener offers no backlog control, so the socket
/// is built through socket2 and converted.
fn create_listener(addr: SocketAddr) -> io::Result<TcpListener> {
    let socket = socket2::Socket::new(
        match addr {
            SocketAddr::V4(_) => socket2::Domain::IPV4,
            SocketAddr::V6(_) => socket2::Domain::IPV6,
        },
        socket2::Type::STREAM,
        Some(socket2::Protocol::TCP),
    )?;

    socket.bind(&addr.into())?;
    socket.listen(LISTEN_BACKLOG)?;

    Ok(socket.into())
}

/// Fatal server errors. All of them terminate the process; sockets still
/// held are released on drop before the error surfaces.
#[derive(Debug)]
pub enum ServerError {
    /// Listener creation or bind failed (port in use, no permission).
    Bind(io::Error),
    /// The blocking accept failed.
    Accept(io::Error),
    /// A connection read or write failed.
    Io(io::Error),
    /// The storage artifact could not be opened.
    Storage(io::Error),
}

impl std::fmt::Display for ServerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServerError::Bind(e) => write!(f, "Failed to bind listener: {e}"),
            ServerError::Accept(e) => write!(f, "Failed to accept client connection: {e}"),
            ServerError::Io(e) => write!(f, "Connection I/O failed: {e}"),
            ServerError::Storage(e) => write!(f, "Failed to open storage artifact: {e}"),
        }
    }
}

impl std::error::Error for ServerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ServerError::Bind(e)
            | ServerError::Accept(e)
            | ServerError::Io(e)
            | ServerError::Storage(e) => Some(e),
        }
    }
}

impl From<ArtifactError> for ServerError {
    fn from(e: ArtifactError) -> Self {
        match e {
            ArtifactError::Open(e) => ServerError::Storage(e),
            ArtifactError::Read(e) | ArtifactError::Write(e) => ServerError::Io(e),
        }
    }
}
