//! Simulated stove for tests.
//!
//! [`StoveModel`] holds the stove state and answers raw request frames.
//! [`MockTransport`] serves it in memory; [`FakeStove`] serves it over TCP.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use crate::error::ClientError;
use crate::protocol::{
    Command, DecodedFrame, FrameDecoder, MessageKind, Request, decode_frame, encode_ack,
    encode_primary_status, encode_secondary_status,
};
use crate::transport::{Transport, TransportFuture};
use crate::types::{PrimaryStatus, SecondaryStatus, StoveStatusCode};

pub(crate) fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Misbehaviour injected into the next reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Fault {
    CorruptChecksum,
    Truncate,
    NoReply,
    WrongKind,
}

#[derive(Debug, Default)]
pub(crate) struct Stats {
    pub connects: AtomicUsize,
    pub primary_queries: AtomicUsize,
    pub secondary_queries: AtomicUsize,
    pub commands: AtomicUsize,
}

pub(crate) enum Reply {
    Frame(Bytes),
    Truncated(Bytes, usize),
    Silent,
}

struct ModelState {
    primary: PrimaryStatus,
    secondary: SecondaryStatus,
    // `None` matches any request kind.
    faults: VecDeque<(Option<MessageKind>, Fault)>,
    reply_delay: Duration,
}

#[derive(Clone)]
pub(crate) struct StoveModel {
    state: Arc<Mutex<ModelState>>,
    stats: Arc<Stats>,
    refusing: Arc<AtomicBool>,
}

impl Default for StoveModel {
    fn default() -> Self {
        let primary = PrimaryStatus {
            status: StoveStatusCode::On,
            power_on: true,
            eco_mode: false,
            ambient_temperature: 21.5,
            desired_temperature: 22.0,
            desired_temperature_min: 10.0,
            desired_temperature_max: 50.0,
            smoke_temperature: 135.0,
            power_percentage: 60,
            smoke_fan_rpm: 1500,
        };
        Self {
            state: Arc::new(Mutex::new(ModelState {
                primary,
                secondary: SecondaryStatus { fan1_percentage: 45 },
                faults: VecDeque::new(),
                reply_delay: Duration::ZERO,
            })),
            stats: Arc::new(Stats::default()),
            refusing: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl StoveModel {
    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    pub fn primary(&self) -> PrimaryStatus {
        self.state.lock().unwrap().primary
    }

    pub fn update_primary(&self, update: impl FnOnce(&mut PrimaryStatus)) {
        update(&mut self.state.lock().unwrap().primary);
    }

    pub fn set_fan1(&self, percentage: u8) {
        self.state.lock().unwrap().secondary.fan1_percentage = percentage;
    }

    /// Applies `fault` to the next reply of any kind.
    pub fn fail_next(&self, fault: Fault) {
        self.state.lock().unwrap().faults.push_back((None, fault));
    }

    /// Applies `fault` to the next reply to a request of `kind`.
    pub fn fail_next_on(&self, kind: MessageKind, fault: Fault) {
        self.state
            .lock()
            .unwrap()
            .faults
            .push_back((Some(kind), fault));
    }

    pub fn set_refusing(&self, refusing: bool) {
        self.refusing.store(refusing, Ordering::SeqCst);
    }

    pub fn is_refusing(&self) -> bool {
        self.refusing.load(Ordering::SeqCst)
    }

    pub fn set_reply_delay(&self, delay: Duration) {
        self.state.lock().unwrap().reply_delay = delay;
    }

    pub fn reply_delay(&self) -> Duration {
        self.state.lock().unwrap().reply_delay
    }

    /// Answers one raw request frame.
    pub fn respond(&self, raw: &[u8]) -> Reply {
        let Ok(DecodedFrame::Request(request)) = decode_frame(raw) else {
            return Reply::Silent;
        };

        let mut state = self.state.lock().unwrap();
        let kind = request.kind();
        let fault = state
            .faults
            .iter()
            .position(|(target, _)| target.is_none_or(|target| target == kind))
            .and_then(|index| state.faults.remove(index))
            .map(|(_, fault)| fault);

        let reply = match request {
            Request::QueryPrimary => {
                self.stats.primary_queries.fetch_add(1, Ordering::SeqCst);
                if fault == Some(Fault::WrongKind) {
                    encode_secondary_status(&state.secondary)
                } else {
                    encode_primary_status(&state.primary)
                }
            }
            Request::QuerySecondary => {
                self.stats.secondary_queries.fetch_add(1, Ordering::SeqCst);
                if fault == Some(Fault::WrongKind) {
                    encode_primary_status(&state.primary)
                } else {
                    encode_secondary_status(&state.secondary)
                }
            }
            Request::Command(command) => {
                self.stats.commands.fetch_add(1, Ordering::SeqCst);
                apply(&mut state.primary, command);
                if fault == Some(Fault::WrongKind) {
                    encode_primary_status(&state.primary)
                } else {
                    encode_ack(&command)
                }
            }
        };

        match fault {
            Some(Fault::CorruptChecksum) => {
                let mut corrupted = reply.to_vec();
                if let Some(last) = corrupted.last_mut() {
                    *last = last.wrapping_add(1);
                }
                Reply::Frame(Bytes::from(corrupted))
            }
            Some(Fault::Truncate) => {
                let keep = reply.len() / 2;
                Reply::Truncated(reply, keep)
            }
            Some(Fault::NoReply) => Reply::Silent,
            Some(Fault::WrongKind) | None => Reply::Frame(reply),
        }
    }
}

fn apply(primary: &mut PrimaryStatus, command: Command) {
    match command {
        Command::TurnOn => {
            primary.power_on = true;
            primary.status = StoveStatusCode::CheckingBeforeStart;
        }
        Command::TurnOff => {
            primary.power_on = false;
            primary.status = StoveStatusCode::TurningOff;
        }
        Command::SetDesiredTemperature(value) => {
            primary.desired_temperature = value.celsius();
        }
    }
}

/// In-memory transport backed by a [`StoveModel`].
pub(crate) struct MockTransport {
    model: StoveModel,
    connected: bool,
    pending: VecDeque<Reply>,
}

impl MockTransport {
    pub fn new(model: StoveModel) -> Self {
        Self {
            model,
            connected: false,
            pending: VecDeque::new(),
        }
    }

    fn not_connected() -> ClientError {
        ClientError::connection(
            "mock",
            std::io::Error::new(std::io::ErrorKind::NotConnected, "not connected"),
        )
    }
}

impl Transport for MockTransport {
    fn connect(&mut self) -> TransportFuture<'_, ()> {
        Box::pin(async move {
            if self.model.is_refusing() {
                return Err(ClientError::connection(
                    "mock",
                    std::io::Error::from(std::io::ErrorKind::ConnectionRefused),
                ));
            }
            self.model.stats().connects.fetch_add(1, Ordering::SeqCst);
            self.connected = true;
            self.pending.clear();
            Ok(())
        })
    }

    fn disconnect(&mut self) -> TransportFuture<'_, ()> {
        Box::pin(async move {
            self.connected = false;
            self.pending.clear();
            Ok(())
        })
    }

    fn send(&mut self, frame: Bytes) -> TransportFuture<'_, ()> {
        Box::pin(async move {
            if !self.connected {
                return Err(Self::not_connected());
            }
            let reply = self.model.respond(&frame);
            self.pending.push_back(reply);
            Ok(())
        })
    }

    fn receive(&mut self) -> TransportFuture<'_, Bytes> {
        Box::pin(async move {
            if !self.connected {
                return Err(Self::not_connected());
            }
            let delay = self.model.reply_delay();
            match self.pending.pop_front() {
                Some(Reply::Frame(frame)) => {
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    Ok(frame)
                }
                Some(Reply::Truncated(frame, keep)) => {
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    Err(ClientError::ShortRead {
                        expected: frame.len(),
                        got: keep,
                    })
                }
                Some(Reply::Silent) | None => {
                    std::future::pending::<Result<Bytes, ClientError>>().await
                }
            }
        })
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

/// TCP server backed by a [`StoveModel`].
pub(crate) struct FakeStove {
    model: StoveModel,
    port: u16,
    task: JoinHandle<()>,
}

impl FakeStove {
    pub async fn start(model: StoveModel) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let served = model.clone();
        let task = tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                served.stats().connects.fetch_add(1, Ordering::SeqCst);
                tokio::spawn(serve(socket, served.clone()));
            }
        });

        Self { model, port, task }
    }

    pub const fn port(&self) -> u16 {
        self.port
    }

    pub const fn model(&self) -> &StoveModel {
        &self.model
    }
}

impl Drop for FakeStove {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn serve(mut socket: TcpStream, model: StoveModel) {
    let mut decoder = FrameDecoder::new();
    let mut buf = [0u8; 256];
    loop {
        let Ok(n) = socket.read(&mut buf).await else {
            return;
        };
        if n == 0 {
            return;
        }
        decoder.feed(&buf[..n]);

        while let Some(request) = decoder.decode() {
            match model.respond(&request) {
                Reply::Frame(frame) => {
                    let delay = model.reply_delay();
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    if socket.write_all(&frame).await.is_err() {
                        return;
                    }
                }
                Reply::Truncated(frame, keep) => {
                    let _ = socket.write_all(&frame[..keep]).await;
                    return;
                }
                Reply::Silent => {}
            }
        }
    }
}
