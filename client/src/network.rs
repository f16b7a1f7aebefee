use crate::bot::ScriptedInput;
use crate::clock::LocalClock;
use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::frame_loop::FrameLoop;
use crate::rendering::HeadlessRenderer;
use log::{debug, error, info, trace, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::protocol::{decode, encode};
use shared::{ClientEvent, ServerEvent, CLIENT_VERSION};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, MissedTickBehavior};

/// Artificial network impairment applied to both directions.
#[derive(Debug, Clone, Copy, Default)]
pub struct NetworkConditions {
    /// Simulated round trip; half is added to each direction.
    pub fake_ping_ms: u64,
    /// Probability in `[0, 1]` that a datagram is dropped.
    pub packet_loss: f64,
}

impl NetworkConditions {
    fn one_way_delay(&self) -> Duration {
        Duration::from_millis(self.fake_ping_ms / 2)
    }

    fn should_drop(&self, rng: &mut StdRng) -> bool {
        self.packet_loss > 0.0 && rng.gen_bool(self.packet_loss.min(1.0))
    }
}

/// Decodes a server datagram. Text frames starting with `{` carry the JSON
/// wire format; everything else is bincode.
pub fn decode_datagram(bytes: &[u8]) -> Result<ServerEvent, SyncError> {
    if bytes.first() == Some(&b'{') {
        return Ok(serde_json::from_slice(bytes)?);
    }
    Ok(decode(bytes)?)
}

/// Connection handshake and control messages are never dropped by the simulation.
fn is_control(event: &ClientEvent) -> bool {
    matches!(event, ClientEvent::Connect { .. } | ClientEvent::Disconnect)
}

pub struct Client {
    socket: Arc<UdpSocket>,
    server_addr: SocketAddr,
    conditions: NetworkConditions,
    frame_loop: FrameLoop,
    local_clock: LocalClock,
    renderer: HeadlessRenderer,
    bot: Option<ScriptedInput>,
    rng: StdRng,
    seed: u64,
}

impl Client {
    pub async fn new(
        server_addr: &str,
        config: SyncConfig,
        conditions: NetworkConditions,
        bot: Option<ScriptedInput>,
        seed: u64,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        let server_addr = server_addr.parse()?;

        Ok(Client {
            socket: Arc::new(socket),
            server_addr,
            conditions,
            frame_loop: FrameLoop::new(config),
            local_clock: LocalClock::new(),
            renderer: HeadlessRenderer::new(60),
            bot,
            rng: StdRng::seed_from_u64(seed),
            seed,
        })
    }

    pub fn frame_loop(&self) -> &FrameLoop {
        &self.frame_loop
    }

    pub fn local_addr(&self) -> Result<SocketAddr, SyncError> {
        Ok(self.socket.local_addr()?)
    }

    async fn send_event(&mut self, event: ClientEvent) -> Result<(), SyncError> {
        if !is_control(&event) && self.conditions.should_drop(&mut self.rng) {
            trace!("Simulated loss of outbound {:?}", event);
            return Ok(());
        }

        let data = encode(&event)?;
        let delay = self.conditions.one_way_delay();
        if delay.is_zero() || is_control(&event) {
            self.socket.send_to(&data, self.server_addr).await?;
            return Ok(());
        }

        let socket = Arc::clone(&self.socket);
        let server_addr = self.server_addr;
        tokio::spawn(async move {
            sleep(delay).await;
            if let Err(e) = socket.send_to(&data, server_addr).await {
                error!("Error sending delayed packet: {}", e);
            }
        });
        Ok(())
    }

    async fn flush_outbound(&mut self) {
        for event in self.frame_loop.drain_outbound() {
            if let Err(e) = self.send_event(event).await {
                error!("Error sending packet: {}", e);
            }
        }
    }

    /// Reads datagrams on its own task so that simulated delay never blocks the frame loop.
    fn spawn_receiver(&self, tx: mpsc::UnboundedSender<ServerEvent>) -> JoinHandle<()> {
        let socket = Arc::clone(&self.socket);
        let server_addr = self.server_addr;
        let conditions = self.conditions;
        let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(1));

        tokio::spawn(async move {
            let mut buffer = [0u8; 4096];
            loop {
                let (len, from) = match socket.recv_from(&mut buffer).await {
                    Ok(received) => received,
                    Err(e) => {
                        error!("Error receiving packet: {}", e);
                        continue;
                    }
                };
                if from != server_addr {
                    debug!("Ignoring datagram from {}", from);
                    continue;
                }

                let event = match decode_datagram(&buffer[..len]) {
                    Ok(event) => event,
                    Err(e) => {
                        warn!("Dropping malformed datagram: {}", e);
                        continue;
                    }
                };
                if conditions.should_drop(&mut rng) {
                    trace!("Simulated loss of inbound {:?}", event);
                    continue;
                }

                let delay = conditions.one_way_delay();
                if delay.is_zero() {
                    if tx.send(event).is_err() {
                        break;
                    }
                } else {
                    let tx = tx.clone();
                    tokio::spawn(async move {
                        sleep(delay).await;
                        let _ = tx.send(event);
                    });
                }
            }
        })
    }

    /// Runs the session until the server disconnects us, ctrl-c, or `duration` elapses.
    pub async fn run(&mut self, duration: Option<Duration>) -> Result<(), SyncError> {
        info!("Connecting to {}...", self.server_addr);
        self.send_event(ClientEvent::Connect {
            client_version: CLIENT_VERSION,
        })
        .await?;

        let (tx, mut rx) = mpsc::unbounded_channel();
        let receiver = self.spawn_receiver(tx);
        self.frame_loop.start();

        let frame_ms = self.frame_loop.config().frame_interval_ms.max(1);
        let mut frame_interval = interval(Duration::from_millis(frame_ms));
        frame_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let deadline = async {
            match duration {
                Some(duration) => sleep(duration).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::pin!(deadline);

        let mut outcome = Ok(());
        loop {
            tokio::select! {
                Some(event) = rx.recv() => {
                    let now = self.local_clock.now_ms();
                    match self.frame_loop.dispatch(event, now) {
                        Ok(()) => {}
                        Err(SyncError::Disconnected(reason)) => {
                            outcome = Err(SyncError::Disconnected(reason));
                            break;
                        }
                        Err(e) => error!("Error handling server event: {}", e),
                    }
                },

                _ = frame_interval.tick() => {
                    let now = self.local_clock.now_ms();
                    if let Some(bot) = self.bot.as_mut() {
                        for event in bot.poll(now) {
                            self.frame_loop.handle_input(event, now);
                        }
                    }
                    if let Some(report) = self.frame_loop.step(now, &mut self.renderer) {
                        if let Some(outcome) = report.reconciliation.filter(|o| o.history_gap) {
                            debug!("Frame {} reconciled across a history gap at tick {}", report.frame, outcome.last_processed_tick);
                        }
                    }
                    self.flush_outbound().await;
                },

                _ = tokio::signal::ctrl_c() => {
                    info!("Interrupted");
                    break;
                },

                _ = &mut deadline => {
                    info!("Session time elapsed");
                    break;
                },
            }
        }

        self.frame_loop.stop();
        receiver.abort();

        let latency = self.frame_loop.latency();
        info!(
            "Session ended after {} frame(s); latency mean {:?}ms, min {:?}ms, max {:?}ms, {} lost probe(s)",
            self.frame_loop.frame(),
            latency.latency_ms(),
            latency.min_ms(),
            latency.max_ms(),
            latency.lost_probes()
        );

        if outcome.is_ok() {
            self.send_event(ClientEvent::Disconnect).await?;
        }
        outcome
    }
}
