//! WebSocket link to an Archipelago server.
//!
//! A worker thread owns the socket. It reconnects after every transport
//! failure, turns inbound packets into [`ServerEvent`]s and wakes the client
//! loop for each one. Outbound packets go through a queue and are written
//! between reads, so the client thread never blocks on the network.

use std::io::ErrorKind;
use std::net::TcpStream;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, unbounded};
use tracing::{debug, info, warn};
use tungstenite::stream::MaybeTlsStream;
use tungstenite::{Message, WebSocket};
use uuid::Uuid;

use super::protocol::{
    self, CLIENT_GOAL, ClientPacket, ITEMS_HANDLING_ALL, PROTOCOL_VERSION, ServerPacket,
};
use super::{MessageChannel, ServerEvent};
use crate::config::normalize_endpoint;
use crate::error::{Error, Result};
use crate::memory::layout::timing;
use crate::retry::{FixedDelay, RetryStrategy};
use crate::signal::WakeSignal;
use crate::world::CheckId;

type Socket = WebSocket<MaybeTlsStream<TcpStream>>;

/// Connection settings for [`ArchipelagoChannel`]
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Passed through as given; `ws://` and the default port are filled in
    pub endpoint: String,
    pub password: Option<String>,
    /// Game name sent in `Connect`
    pub game: String,
    pub retry: FixedDelay,
}

/// State shared with the worker thread
struct Shared {
    url: String,
    ready: AtomicBool,
    /// Stops the worker; also used for its reconnect sleeps
    stop: WakeSignal,
    /// Wakes the client loop
    wake: Arc<WakeSignal>,
    events: Sender<ServerEvent>,
    retry: FixedDelay,
}

pub struct ArchipelagoChannel {
    shared: Arc<Shared>,
    outbound: Sender<ClientPacket>,
    inbound: Receiver<ServerEvent>,
    worker: Option<JoinHandle<()>>,
    game: String,
    password: String,
    uuid: String,
}

impl ArchipelagoChannel {
    /// Start the worker thread; connection happens in the background.
    pub fn connect(config: ChannelConfig, wake: Arc<WakeSignal>) -> Result<Self> {
        let (outbound, outbound_rx) = unbounded();
        let (events, inbound) = unbounded();
        let shared = Arc::new(Shared {
            url: normalize_endpoint(&config.endpoint),
            ready: AtomicBool::new(false),
            stop: WakeSignal::new(),
            wake,
            events,
            retry: config.retry,
        });

        let worker = {
            let shared = Arc::clone(&shared);
            thread::Builder::new()
                .name("pikap-net".to_string())
                .spawn(move || run_worker(&shared, &outbound_rx))?
        };

        Ok(Self {
            shared,
            outbound,
            inbound,
            worker: Some(worker),
            game: config.game,
            password: config.password.unwrap_or_default(),
            uuid: Uuid::new_v4().to_string(),
        })
    }

    pub fn url(&self) -> &str {
        &self.shared.url
    }

    fn send(&self, packet: ClientPacket) -> Result<()> {
        if !self.is_ready() {
            return Err(Error::NotConnected);
        }
        self.outbound.send(packet).map_err(|_| Error::NotConnected)
    }
}

impl MessageChannel for ArchipelagoChannel {
    fn is_ready(&self) -> bool {
        self.shared.ready.load(Ordering::SeqCst)
    }

    fn authenticate(&mut self, slot_name: &str) -> Result<()> {
        self.send(ClientPacket::Connect {
            password: self.password.clone(),
            game: self.game.clone(),
            name: slot_name.to_string(),
            uuid: self.uuid.clone(),
            version: PROTOCOL_VERSION,
            items_handling: ITEMS_HANDLING_ALL,
            tags: Vec::new(),
            slot_data: false,
        })
    }

    fn send_checks(&mut self, checks: &[CheckId]) -> Result<()> {
        self.send(ClientPacket::LocationChecks {
            locations: checks.iter().map(|c| c.0).collect(),
        })
    }

    fn send_goal(&mut self) -> Result<()> {
        self.send(ClientPacket::StatusUpdate {
            status: CLIENT_GOAL,
        })
    }

    fn request_resync(&mut self) -> Result<()> {
        self.send(ClientPacket::Sync)
    }

    fn poll_event(&mut self) -> Option<ServerEvent> {
        self.inbound.try_recv().ok()
    }

    fn close(&mut self) {
        self.shared.stop.trigger();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("Network thread panicked");
            }
        }
        self.shared.ready.store(false, Ordering::SeqCst);
    }
}

impl Drop for ArchipelagoChannel {
    fn drop(&mut self) {
        self.close();
    }
}

fn run_worker(shared: &Shared, outbound: &Receiver<ClientPacket>) {
    let mut attempts = 0u32;
    while !shared.stop.is_shutdown() {
        attempts += 1;
        match tungstenite::connect(shared.url.as_str()) {
            Ok((mut socket, _)) => {
                info!("Connected to {}", shared.url);
                attempts = 0;
                set_read_timeout(&socket);
                // Anything queued for a previous connection is stale
                while outbound.try_recv().is_ok() {}

                let outcome = run_session(shared, &mut socket, outbound);
                shared.ready.store(false, Ordering::SeqCst);
                let event = match outcome {
                    Ok(()) => ServerEvent::Disconnected,
                    Err(e) => {
                        warn!("Connection to {} lost: {}", shared.url, e);
                        ServerEvent::ProtocolError(e.to_string())
                    }
                };
                if shared.stop.is_shutdown() {
                    break;
                }
                emit(shared, event);
            }
            Err(e) => {
                if attempts == 1 {
                    warn!("Cannot connect to {}: {}", shared.url, e);
                } else {
                    debug!("Connect attempt {} failed: {}", attempts, e);
                }
            }
        }

        if shared.stop.sleep(shared.retry.delay(attempts)) {
            break;
        }
    }
    debug!("Network thread stopped");
}

/// Pump one connection until it fails, the server closes it, or we stop.
fn run_session(shared: &Shared, socket: &mut Socket, outbound: &Receiver<ClientPacket>) -> Result<()> {
    loop {
        while let Ok(packet) = outbound.try_recv() {
            let frame = protocol::encode(&[packet])?;
            socket.send(Message::Text(frame)).map_err(transport)?;
        }

        if shared.stop.is_shutdown() {
            let _ = socket.close(None);
            let _ = socket.flush();
            return Ok(());
        }

        match socket.read() {
            Ok(Message::Text(frame)) => handle_frame(shared, &frame),
            Ok(Message::Close(frame)) => {
                debug!("Server closed the connection: {:?}", frame);
                return Ok(());
            }
            Ok(_) => {}
            Err(tungstenite::Error::Io(e)) if is_timeout(&e) => {
                // Pending pongs are queued by `read`
                match socket.flush() {
                    Ok(()) => {}
                    Err(tungstenite::Error::Io(e)) if is_timeout(&e) => {}
                    Err(e) => return Err(transport(e)),
                }
            }
            Err(tungstenite::Error::ConnectionClosed) => return Ok(()),
            Err(e) => return Err(transport(e)),
        }
    }
}

fn handle_frame(shared: &Shared, frame: &str) {
    let packets = match protocol::decode(frame) {
        Ok(packets) => packets,
        Err(e) => {
            warn!("Ignoring undecodable frame: {}", e);
            return;
        }
    };

    for packet in packets {
        match packet {
            ServerPacket::RoomInfo { seed_name, .. } => {
                debug!("Room info received (seed {:?})", seed_name);
                shared.ready.store(true, Ordering::SeqCst);
                shared.wake.wake();
            }
            ServerPacket::Connected {
                slot,
                checked_locations,
                ..
            } => emit(
                shared,
                ServerEvent::AuthAccepted {
                    slot,
                    checked: checked_locations.into_iter().map(CheckId).collect(),
                },
            ),
            ServerPacket::ConnectionRefused { errors } => {
                emit(shared, ServerEvent::AuthRejected { reasons: errors })
            }
            ServerPacket::ReceivedItems { index, items } => {
                emit(shared, ServerEvent::Deltas { start: index, items })
            }
            ServerPacket::PrintJson { data } => {
                let text = ServerPacket::print_text(&data);
                if !text.is_empty() {
                    info!("[server] {}", text);
                }
            }
            ServerPacket::Unknown => {}
        }
    }
}

fn emit(shared: &Shared, event: ServerEvent) {
    // The receiver lives as long as the channel, which joins this thread on drop
    let _ = shared.events.send(event);
    shared.wake.wake();
}

fn set_read_timeout(socket: &Socket) {
    let timeout = Some(Duration::from_millis(timing::SOCKET_READ_TIMEOUT_MS));
    let result = match socket.get_ref() {
        MaybeTlsStream::Plain(stream) => stream.set_read_timeout(timeout),
        MaybeTlsStream::Rustls(stream) => stream.get_ref().set_read_timeout(timeout),
        _ => Ok(()),
    };
    if let Err(e) = result {
        warn!("Failed to set socket read timeout: {}", e);
    }
}

fn is_timeout(e: &std::io::Error) -> bool {
    matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut)
}

fn transport(e: tungstenite::Error) -> Error {
    Error::Protocol(e.to_string())
}
