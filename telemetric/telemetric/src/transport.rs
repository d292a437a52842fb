use std::{
    net::{IpAddr, SocketAddr},
    sync::Arc,
    time::Duration,
};

use telemetric_protobuf::{DecodeOptions, SchemaRegistry, decode_compact};
use tokio::{
    net::{TcpListener, TcpSocket, TcpStream, UdpSocket},
    time,
};
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::{
    error::TransportError,
    frame::DEFAULT_MAX_MESSAGE_LEN,
    session::Session,
    sink::{DecodedMessage, MessageSink},
};

/// Largest datagram accepted by the UDP loop.
pub const MAX_DATAGRAM_LEN: usize = 64 * 1024;

const LISTEN_BACKLOG: u32 = 1024;

/// Pause after a failed accept before trying again.
pub const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// The TCP listener and UDP socket sharing one port.
#[derive(Debug)]
pub struct Listeners {
    pub tcp: TcpListener,
    pub udp: UdpSocket,
}

impl Listeners {
    pub fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        Ok(self.tcp.local_addr()?)
    }
}

/// Bind TCP and UDP on `address:port`.
///
/// The address family follows the address text. With port 0 the UDP socket
/// takes the ephemeral port the TCP listener was given.
pub async fn bind(address: &str, port: u16) -> Result<Listeners, TransportError> {
    let ip: IpAddr = address
        .parse()
        .map_err(|source| TransportError::InvalidAddress {
            address: address.to_string(),
            source,
        })?;
    let addr = SocketAddr::new(ip, port);
    let bind_error = |source| TransportError::Bind { addr, source };

    let socket = match ip {
        IpAddr::V4(_) => TcpSocket::new_v4(),
        IpAddr::V6(_) => TcpSocket::new_v6(),
    }
    .map_err(bind_error)?;
    socket.set_reuseaddr(true).map_err(bind_error)?;
    socket.bind(addr).map_err(bind_error)?;
    let tcp = socket.listen(LISTEN_BACKLOG).map_err(bind_error)?;

    let local = tcp.local_addr()?;
    let udp = UdpSocket::bind(local)
        .await
        .map_err(|source| TransportError::Bind {
            addr: local,
            source,
        })?;

    info!(tcp = %local, udp = %udp.local_addr()?, "listening");
    Ok(Listeners { tcp, udp })
}

/// Accepts TCP sessions and UDP datagrams and feeds them to one sink.
pub struct TelemetryServer {
    registry: Arc<SchemaRegistry>,
    sink: Arc<dyn MessageSink>,
    options: DecodeOptions,
    max_message_len: usize,
}

pub struct TelemetryServerBuilder {
    registry: Arc<SchemaRegistry>,
    sink: Arc<dyn MessageSink>,
    options: DecodeOptions,
    max_message_len: usize,
}

impl TelemetryServerBuilder {
    pub fn with_options(mut self, options: DecodeOptions) -> Self {
        self.options = options;
        self
    }

    /// Upper bound on any declared TCP envelope or payload length.
    pub fn with_max_message_len(mut self, max_message_len: usize) -> Self {
        self.max_message_len = max_message_len;
        self
    }

    pub fn build(self) -> TelemetryServer {
        TelemetryServer {
            registry: self.registry,
            sink: self.sink,
            options: self.options,
            max_message_len: self.max_message_len,
        }
    }
}

impl TelemetryServer {
    pub fn builder(
        registry: Arc<SchemaRegistry>,
        sink: impl MessageSink + 'static,
    ) -> TelemetryServerBuilder {
        TelemetryServerBuilder {
            registry,
            sink: Arc::new(sink),
            options: DecodeOptions::default(),
            max_message_len: DEFAULT_MAX_MESSAGE_LEN,
        }
    }

    /// Serve both sockets. Runs until the future is dropped.
    pub async fn serve(&self, listeners: Listeners) {
        tokio::join!(self.serve_tcp(listeners.tcp), self.serve_udp(listeners.udp));
    }

    /// Accept connections, running each as its own session task.
    ///
    /// A session ending, for whatever reason, does not affect the others.
    /// Accept failures such as descriptor exhaustion are logged and retried
    /// after [`ACCEPT_BACKOFF`].
    pub async fn serve_tcp(&self, listener: TcpListener) {
        loop {
            let (stream, peer) = match listener.accept().await {
                Ok(accepted) => accepted,
                Err(err) => {
                    error!(error = %err, "failed to accept TCP connection");
                    time::sleep(ACCEPT_BACKOFF).await;
                    continue;
                }
            };
            info!(%peer, "accepted TCP connection");
            let session = self.session(stream);
            tokio::spawn(
                async move {
                    // Errors are logged by the session itself.
                    let _ = session.run().await;
                }
                .instrument(info_span!("tcp", %peer)),
            );
        }
    }

    /// Decode each datagram as a compact GPB message.
    pub async fn serve_udp(&self, socket: UdpSocket) {
        let mut buf = vec![0u8; MAX_DATAGRAM_LEN];
        loop {
            let (len, peer) = match socket.recv_from(&mut buf).await {
                Ok(received) => received,
                Err(err) => {
                    error!(error = %err, "failed to receive UDP datagram");
                    continue;
                }
            };
            debug!(%peer, length = len, "received UDP datagram");
            match decode_compact(&self.registry, &buf[..len], self.options) {
                Ok(message) => self.sink.emit(DecodedMessage::Compact(message)),
                Err(err) => warn!(%peer, error = %err, "failed to decode datagram"),
            }
        }
    }

    fn session(&self, stream: TcpStream) -> Session<TcpStream> {
        Session::new(stream, Arc::clone(&self.registry), Arc::clone(&self.sink))
            .with_options(self.options)
            .with_max_message_len(self.max_message_len)
    }
}
