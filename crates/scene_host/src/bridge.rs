//! Frame transport to and from the browser extension.

use async_trait::async_trait;
use scene_engine::{
    decode_message, read_frame, write_frame, CodecError, Inbound, Outbound, MAX_INBOUND_FRAME,
};
use scene_logging::{scene_info, scene_trace, scene_warn};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, Mutex};

use crate::coordinator::HostEvent;

/// Outbound half of the extension connection.
#[async_trait]
pub trait ExtensionPort: Send + Sync {
    async fn send(&self, message: Outbound) -> Result<(), CodecError>;
}

/// Writes frames to an async writer, normally the process stdout.
pub struct StdioPort<W> {
    writer: Mutex<W>,
}

impl<W> StdioPort<W>
where
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }
}

#[async_trait]
impl<W> ExtensionPort for StdioPort<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn send(&self, message: Outbound) -> Result<(), CodecError> {
        let mut writer = self.writer.lock().await;
        write_frame(&mut *writer, &message).await
    }
}

/// Reads frames until the stream closes and forwards them as host events.
/// A frame that does not decode is reported and skipped; a broken stream
/// ends the pump.
pub async fn pump_inbound<R>(mut reader: R, events: mpsc::UnboundedSender<HostEvent>)
where
    R: AsyncRead + Unpin,
{
    loop {
        let frame = match read_frame(&mut reader, MAX_INBOUND_FRAME).await {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                scene_info!("Extension closed the connection");
                break;
            }
            Err(err) => {
                scene_warn!("Inbound stream failed: {}", err);
                break;
            }
        };
        let event = match decode_message::<Inbound>(&frame) {
            Ok(message) => {
                scene_trace!("Inbound frame of {} bytes: {:?}", frame.len(), message);
                HostEvent::Inbound(message)
            }
            Err(err) => {
                scene_warn!("Dropping malformed frame of {} bytes: {}", frame.len(), err);
                HostEvent::Malformed(err.to_string())
            }
        };
        if events.send(event).is_err() {
            return;
        }
    }
    let _ = events.send(HostEvent::Disconnected);
}
