//! TCP transport.
//!
//! Used for WiFi companion firmware and serial-over-TCP bridges. Outgoing
//! payloads are framed and queued to a connection task that also reads the
//! socket and feeds received bytes to the engine.

use std::io;

use meshcore_companion_protocol::encode_frame;
use parking_lot::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::config::TcpConfig;
use crate::error::TransportError;
use crate::transport::{FeedHandle, Transport};

/// Outgoing frames buffered before `send` starts dropping.
const SEND_QUEUE_DEPTH: usize = 256;

struct Connection {
    outgoing: mpsc::Sender<Vec<u8>>,
    task: JoinHandle<()>,
}

pub struct TcpTransport {
    address: String,
    connection: Mutex<Option<Connection>>,
}

impl TcpTransport {
    pub fn new(host: &str, port: u16) -> Self {
        TcpTransport {
            address: format!("{host}:{port}"),
            connection: Mutex::new(None),
        }
    }

    pub fn from_config(config: &TcpConfig) -> Self {
        Self::new(&config.host, config.port)
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn is_connected(&self) -> bool {
        self.connection
            .lock()
            .as_ref()
            .is_some_and(|c| !c.task.is_finished())
    }
}

impl Transport for TcpTransport {
    async fn connect(&self, feed: FeedHandle) -> Result<(), TransportError> {
        let stream = TcpStream::connect(self.address.as_str()).await?;
        stream.set_nodelay(true)?;

        let (outgoing, outgoing_rx) = mpsc::channel(SEND_QUEUE_DEPTH);
        let address = self.address.clone();
        let task = tokio::spawn(async move {
            if let Err(e) = run_connection(stream, outgoing_rx, feed).await {
                warn!(%address, "connection error: {}", e);
            }
        });

        let previous = self.connection.lock().replace(Connection { outgoing, task });
        if let Some(previous) = previous {
            previous.task.abort();
        }
        info!(address = %self.address, "connected");
        Ok(())
    }

    fn send(&self, payload: &[u8]) {
        let guard = self.connection.lock();
        let Some(connection) = guard.as_ref() else {
            warn!(address = %self.address, "{}", TransportError::NotConnected);
            return;
        };

        let frame = encode_frame(payload);
        trace!(bytes = %hex::encode(&frame), "sending frame");
        if let Err(e) = connection.outgoing.try_send(frame) {
            match e {
                mpsc::error::TrySendError::Full(_) => {
                    warn!(address = %self.address, "send queue full, frame dropped");
                }
                mpsc::error::TrySendError::Closed(_) => {
                    warn!(address = %self.address, "connection closed, frame dropped");
                }
            }
        }
    }

    fn disconnect(&self) {
        if let Some(connection) = self.connection.lock().take() {
            connection.task.abort();
            info!(address = %self.address, "disconnected");
        }
    }
}

impl Drop for TcpTransport {
    fn drop(&mut self) {
        if let Some(connection) = self.connection.get_mut().take() {
            connection.task.abort();
        }
    }
}

async fn run_connection(
    mut stream: TcpStream,
    mut outgoing: mpsc::Receiver<Vec<u8>>,
    feed: FeedHandle,
) -> io::Result<()> {
    let (mut reader, mut writer) = stream.split();
    let mut read_buf = [0u8; 1024];

    loop {
        tokio::select! {
            result = reader.read(&mut read_buf) => {
                match result {
                    Ok(0) => {
                        debug!("connection closed by peer");
                        return Ok(());
                    }
                    Ok(n) => feed.feed(&read_buf[..n]),
                    Err(e) => return Err(e),
                }
            }

            Some(frame) = outgoing.recv() => {
                writer.write_all(&frame).await?;
                writer.flush().await?;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::EventDispatcher;
    use meshcore_companion_protocol::{
        encode_frame_with_marker, AttributeFilter, EventKind, EventPayload, FRAME_MARKER_INBOUND,
    };
    use std::time::Duration;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_round_trip_over_loopback() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let device = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 4];
            socket.read_exact(&mut request).await.unwrap();
            let reply = encode_frame_with_marker(FRAME_MARKER_INBOUND, &[0x0c, 0x10, 0x0e]);
            socket.write_all(&reply).await.unwrap();
            request
        });

        let dispatcher = EventDispatcher::new();
        let transport = TcpTransport::new("127.0.0.1", port);
        transport
            .connect(FeedHandle::new(dispatcher.clone(), 1024))
            .await
            .unwrap();
        assert!(transport.is_connected());

        let waiter = dispatcher.waiter(EventKind::Battery, AttributeFilter::any());
        transport.send(&[0x14]);
        let event = waiter.wait(Duration::from_secs(2)).await.unwrap();
        assert_eq!(event.payload, EventPayload::Battery(3600));
        assert_eq!(device.await.unwrap(), [b'<', 1, 0, 0x14]);

        transport.disconnect();
        assert!(!transport.is_connected());
    }

    #[tokio::test]
    async fn test_connect_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let transport = TcpTransport::new("127.0.0.1", port);
        let err = transport
            .connect(FeedHandle::new(EventDispatcher::new(), 1024))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Io(_)));
        transport.send(&[0x14]);
    }
}
