//! Rule fetch server
//!
//! Request/reply over a Unix socket. Every frame is a 4-byte big-endian
//! payload length followed by the payload. A request carries a group or
//! classifier name; the reply carries its serialized ruleset, or [`NOT_FOUND`].

use crate::core::gpc_service::GpcService;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use futures::{SinkExt, StreamExt};
use std::path::Path;
use tokio::net::{UnixListener, UnixStream};
use tokio_util::codec::{Decoder, Encoder, Framed};
use tracing::{debug, info, warn};

/// Reply payload when no group or classifier has the requested name
pub const NOT_FOUND: &[u8] = b"None";

/// Largest accepted frame payload
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

const HEADER_LEN: usize = 4;

#[derive(Debug, Default, Clone, Copy)]
enum State {
    #[default]
    Header,
    Payload(usize),
}

/// Length-prefixed frame codec
#[derive(Debug, Default)]
pub struct FrameCodec {
    state: State,
}

impl FrameCodec {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Decoder for FrameCodec {
    type Item = Bytes;
    type Error = std::io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            match self.state {
                State::Header => {
                    if src.len() < HEADER_LEN {
                        return Ok(None);
                    }

                    let size = src.get_u32() as usize;
                    if size > MAX_FRAME_LEN {
                        return Err(std::io::Error::new(
                            std::io::ErrorKind::InvalidData,
                            format!("frame of {size} bytes exceeds {MAX_FRAME_LEN}"),
                        ));
                    }
                    src.reserve(size);
                    self.state = State::Payload(size);
                }
                State::Payload(size) => {
                    if src.len() < size {
                        return Ok(None);
                    }

                    let payload = src.split_to(size).freeze();
                    self.state = State::Header;
                    return Ok(Some(payload));
                }
            }
        }
    }
}

impl Encoder<Bytes> for FrameCodec {
    type Error = std::io::Error;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let size = u32::try_from(item.len()).map_err(|_| {
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "frame too large")
        })?;
        dst.reserve(HEADER_LEN + item.len());
        dst.put_u32(size);
        dst.put(item);
        Ok(())
    }
}

/// Binds the fetch socket, replacing a stale socket file.
pub fn bind(path: &Path) -> std::io::Result<UnixListener> {
    match std::fs::remove_file(path) {
        Ok(()) => debug!("Removed stale socket {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }
    crate::utils::ensure_parent_dir(path)?;
    UnixListener::bind(path)
}

async fn handle_connection(stream: UnixStream, service: &mut GpcService) -> std::io::Result<()> {
    let mut framed = Framed::new(stream, FrameCodec::new());

    while let Some(request) = framed.next().await {
        let request = request?;
        let name = String::from_utf8_lossy(&request);
        debug!("Ruleset request for '{}'", name);

        let reply = match service.lookup(&name) {
            Some(bytes) => bytes,
            None => {
                debug!("No group or classifier named '{}'", name);
                Bytes::from_static(NOT_FOUND)
            }
        };
        framed.send(reply).await?;
        debug!("Sent ruleset for '{}'", name);
    }

    Ok(())
}

/// Serves lookups until the listener fails. Connections are handled one at a time.
pub async fn serve(listener: UnixListener, mut service: GpcService) -> std::io::Result<()> {
    info!("Serving rulesets");

    loop {
        let (stream, _) = listener.accept().await?;
        if let Err(e) = handle_connection(stream, &mut service).await {
            warn!("Fetch connection failed: {}", e);
        }
    }
}

/// Requests one ruleset; `None` when the server has no such name.
pub async fn fetch(path: &Path, name: &str) -> std::io::Result<Option<Bytes>> {
    let stream = UnixStream::connect(path).await?;
    let mut framed = Framed::new(stream, FrameCodec::new());

    framed.send(Bytes::copy_from_slice(name.as_bytes())).await?;
    let reply = framed.next().await.ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            "server closed the connection",
        )
    })??;

    Ok((reply.as_ref() != NOT_FOUND).then_some(reply))
}
