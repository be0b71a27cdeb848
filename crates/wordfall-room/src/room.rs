//! Room actor: an isolated Tokio task that owns one room's simulation.
//!
//! The actor multiplexes two event sources in a single `select!` loop:
//! commands from the outside world and ticks from its own
//! [`TickScheduler`]. Because both run on the same task, a tick always
//! finishes (every player updated, snapshot sent) before the next command
//! or tick is looked at, and key input can never race a simulation step.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, error, info, warn};
use wordfall_game::{GameError, Key, PlayerSession, WordEngine, WordSupplier};
use wordfall_protocol::{PlayerId, RoomId, RoomSnapshot, RoomStatus, ServerMessage};
use wordfall_tick::{TickConfig, TickScheduler};

use crate::{RoomConfig, RoomError};

/// Channel sender for delivering outbound messages to a player's
/// connection handler.
pub type PlayerSender = mpsc::UnboundedSender<ServerMessage>;

/// Commands sent to a room actor through its channel.
///
/// The `oneshot::Sender` in some variants is a reply channel: the caller
/// sends a command and waits for the response on it.
pub(crate) enum RoomCommand {
    Join {
        player_id: PlayerId,
        name: String,
        sender: PlayerSender,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },

    /// Replies with the number of players left.
    Leave {
        player_id: PlayerId,
        reply: oneshot::Sender<Result<usize, RoomError>>,
    },

    Start {
        requester: PlayerId,
        width: f64,
        height: f64,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },

    /// A keystroke from a player (fire-and-forget).
    Key { player_id: PlayerId, key: Key },

    GetState {
        reply: oneshot::Sender<RoomSnapshot>,
    },

    Shutdown,
}

/// Room metadata (not the game state itself).
#[derive(Debug, Clone, PartialEq)]
pub struct RoomInfo {
    pub room_id: RoomId,
    pub host_id: PlayerId,
    pub status: RoomStatus,
    pub player_count: usize,
    pub max_players: usize,
}

impl RoomInfo {
    pub fn is_full(&self) -> bool {
        self.player_count >= self.max_players
    }

    /// Still in the lobby with a free slot.
    pub fn is_available(&self) -> bool {
        self.status.is_joinable() && !self.is_full()
    }
}

/// Handle to a running room actor.
///
/// Cheap to clone: an `mpsc::Sender` for commands plus a `watch` view of
/// the room's metadata. The registry holds one per room.
#[derive(Clone)]
pub struct RoomHandle {
    room_id: RoomId,
    sender: mpsc::Sender<RoomCommand>,
    info: watch::Receiver<RoomInfo>,
}

impl RoomHandle {
    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    /// `true` once the actor has stopped.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Adds a player to the room. `sender` receives every snapshot the
    /// room broadcasts from now on.
    pub async fn join(
        &self,
        player_id: PlayerId,
        name: String,
        sender: PlayerSender,
    ) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::Join {
            player_id,
            name,
            sender,
            reply,
        })
        .await?
    }

    /// Removes a player. Returns how many players remain.
    pub async fn leave(&self, player_id: PlayerId) -> Result<usize, RoomError> {
        self.request(|reply| RoomCommand::Leave { player_id, reply })
            .await?
    }

    /// Starts the game on behalf of `requester`, who must be the host.
    ///
    /// Resolves once every player's words are loaded and the room is
    /// playing.
    pub async fn start(&self, requester: PlayerId, width: f64, height: f64) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::Start {
            requester,
            width,
            height,
            reply,
        })
        .await?
    }

    /// Delivers a keystroke. The room applies it on its own task; it is
    /// read by the next tick.
    pub async fn send_key(&self, player_id: PlayerId, key: Key) -> Result<(), RoomError> {
        self.sender
            .send(RoomCommand::Key { player_id, key })
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id.clone()))
    }

    /// A deep copy of the room's current state.
    pub async fn snapshot(&self) -> Result<RoomSnapshot, RoomError> {
        self.request(|reply| RoomCommand::GetState { reply }).await
    }

    /// The metadata the room last published. Never waits on the actor,
    /// so it stays answerable while the room is loading words.
    pub fn info(&self) -> RoomInfo {
        self.info.borrow().clone()
    }

    /// Tells the room to stop its timer and exit.
    pub async fn shutdown(&self) -> Result<(), RoomError> {
        self.sender
            .send(RoomCommand::Shutdown)
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id.clone()))
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> RoomCommand,
    ) -> Result<T, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(command(reply_tx))
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id.clone()))?;
        reply_rx
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id.clone()))
    }
}

/// The internal room actor state. Runs inside a Tokio task.
struct RoomActor<S> {
    room_id: RoomId,
    host_id: PlayerId,
    status: RoomStatus,
    config: RoomConfig,
    supplier: Arc<S>,
    players: HashMap<PlayerId, PlayerSession<S>>,
    senders: HashMap<PlayerId, PlayerSender>,
    /// Dead players. Frozen, but still in every snapshot.
    non_playing: HashSet<PlayerId>,
    arena: (f64, f64),
    scheduler: TickScheduler,
    receiver: mpsc::Receiver<RoomCommand>,
    info_tx: watch::Sender<RoomInfo>,
}

impl<S: WordSupplier> RoomActor<S> {
    async fn run(mut self) {
        info!(room_id = %self.room_id, host_id = %self.host_id, "room actor started");

        loop {
            tokio::select! {
                cmd = self.receiver.recv() => {
                    let Some(cmd) = cmd else { break };
                    if !self.handle_command(cmd).await {
                        break;
                    }
                }
                tick = self.scheduler.wait_for_tick() => {
                    self.on_tick(tick.dt_secs()).await;
                    self.scheduler.record_tick_end();
                }
            }
        }

        self.scheduler.stop();
        info!(room_id = %self.room_id, "room actor stopped");
    }

    /// Returns `false` when the actor should exit.
    async fn handle_command(&mut self, cmd: RoomCommand) -> bool {
        match cmd {
            RoomCommand::Join {
                player_id,
                name,
                sender,
                reply,
            } => {
                let result = self.handle_join(player_id, name, sender);
                let _ = reply.send(result);
            }
            RoomCommand::Leave { player_id, reply } => {
                let result = self.handle_leave(player_id);
                let _ = reply.send(result);
            }
            RoomCommand::Start {
                requester,
                width,
                height,
                reply,
            } => {
                let result = self.handle_start(requester, width, height).await;
                let _ = reply.send(result);
            }
            RoomCommand::Key { player_id, key } => self.handle_key(player_id, key),
            RoomCommand::GetState { reply } => {
                let _ = reply.send(self.snapshot());
            }
            RoomCommand::Shutdown => {
                info!(room_id = %self.room_id, "room shutting down");
                self.scheduler.stop();
                return false;
            }
        }
        true
    }

    fn handle_join(
        &mut self,
        player_id: PlayerId,
        name: String,
        sender: PlayerSender,
    ) -> Result<(), RoomError> {
        if !self.status.is_joinable() {
            return Err(RoomError::InvalidState(format!(
                "cannot join room in state {}",
                self.status
            )));
        }
        if self.players.contains_key(&player_id) {
            return Err(RoomError::AlreadyInRoom(player_id, self.room_id.clone()));
        }
        if self.players.len() >= self.config.max_players {
            return Err(RoomError::RoomFull(self.room_id.clone()));
        }

        let engine = WordEngine::new(self.supplier.clone(), self.config.engine.clone());
        let session = PlayerSession::new(
            player_id.clone(),
            name,
            engine,
            self.config.session.clone(),
        );
        self.players.insert(player_id.clone(), session);
        self.senders.insert(player_id.clone(), sender);

        info!(
            room_id = %self.room_id,
            %player_id,
            players = self.players.len(),
            "player joined"
        );
        self.publish_info();
        self.broadcast_snapshot();
        Ok(())
    }

    fn handle_leave(&mut self, player_id: PlayerId) -> Result<usize, RoomError> {
        if self.players.remove(&player_id).is_none() {
            return Err(RoomError::NotInRoom(player_id, self.room_id.clone()));
        }
        self.senders.remove(&player_id);
        self.non_playing.remove(&player_id);

        info!(
            room_id = %self.room_id,
            %player_id,
            players = self.players.len(),
            "player left"
        );
        self.publish_info();

        // While playing, the next tick's broadcast carries the change.
        if self.status == RoomStatus::Lobby {
            self.broadcast_snapshot();
        }
        Ok(self.players.len())
    }

    async fn handle_start(
        &mut self,
        requester: PlayerId,
        width: f64,
        height: f64,
    ) -> Result<(), RoomError> {
        if requester != self.host_id {
            return Err(RoomError::NotHost(requester, self.room_id.clone()));
        }
        if !self.players.contains_key(&requester) {
            return Err(RoomError::NotInRoom(requester, self.room_id.clone()));
        }
        if !self.status.can_transition_to(RoomStatus::Playing) {
            return Err(RoomError::InvalidState(format!(
                "cannot start game in state {}",
                self.status
            )));
        }

        let mut failure = None;
        for session in self.players.values_mut() {
            if let Err(e) = session.initialize_words().await {
                failure = Some(e);
                break;
            }
        }
        if let Some(e) = failure {
            self.terminate(&e);
            return Err(e.into());
        }

        self.arena = (width, height);
        self.status = RoomStatus::Playing;
        self.scheduler.start();
        self.publish_info();
        info!(
            room_id = %self.room_id,
            players = self.players.len(),
            width,
            height,
            "game started"
        );
        self.broadcast_snapshot();
        Ok(())
    }

    fn handle_key(&mut self, player_id: PlayerId, key: Key) {
        if self.status != RoomStatus::Playing {
            debug!(room_id = %self.room_id, %player_id, "key outside of a game, ignoring");
            return;
        }
        match self.players.get_mut(&player_id) {
            Some(session) => session.on_key_input(key),
            None => warn!(room_id = %self.room_id, %player_id, "key from non-member, ignoring"),
        }
    }

    async fn on_tick(&mut self, dt: f64) {
        if self.status != RoomStatus::Playing {
            return;
        }
        let (width, height) = self.arena;

        let mut failure = None;
        for (player_id, session) in self.players.iter_mut() {
            if session.is_dead() {
                self.non_playing.insert(player_id.clone());
                continue;
            }
            if let Err(e) = session.update(width, height, dt).await {
                error!(room_id = %self.room_id, %player_id, error = %e, "player update failed");
                failure = Some(e);
                break;
            }
        }
        if let Some(e) = failure {
            self.terminate(&e);
            return;
        }

        let everyone_out = self
            .players
            .keys()
            .all(|id| self.non_playing.contains(id));
        if self.players.is_empty() || everyone_out {
            self.finish();
            return;
        }

        self.broadcast_snapshot();
    }

    fn finish(&mut self) {
        self.status = RoomStatus::Finished;
        self.scheduler.stop();
        self.publish_info();
        info!(
            room_id = %self.room_id,
            ticks = self.scheduler.tick_count(),
            "game finished"
        );
    }

    /// Ends the room after an unrecoverable simulation error and tells
    /// everyone why.
    fn terminate(&mut self, cause: &GameError) {
        self.status = RoomStatus::Finished;
        self.scheduler.stop();
        self.publish_info();
        error!(room_id = %self.room_id, error = %cause, "room terminated");

        let msg = ServerMessage::Error {
            code: 500,
            message: format!("room {} terminated: {cause}", self.room_id),
        };
        for sender in self.senders.values() {
            let _ = sender.send(msg.clone());
        }
    }

    fn broadcast_snapshot(&self) {
        let msg = ServerMessage::GameInstanceUpdate(self.snapshot());
        for sender in self.senders.values() {
            // Receiver gone means the player disconnected; the registry
            // removes them shortly.
            let _ = sender.send(msg.clone());
        }
    }

    fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            room_id: self.room_id.clone(),
            status: self.status,
            players: self
                .players
                .iter()
                .map(|(id, session)| (id.clone(), session.state().clone()))
                .collect::<BTreeMap<_, _>>(),
        }
    }

    fn publish_info(&self) {
        self.info_tx.send_replace(self.info());
    }

    fn info(&self) -> RoomInfo {
        RoomInfo {
            room_id: self.room_id.clone(),
            host_id: self.host_id.clone(),
            status: self.status,
            player_count: self.players.len(),
            max_players: self.config.max_players,
        }
    }
}

/// Spawns a new room actor task and returns a handle to it.
///
/// The room starts empty in `Lobby`; the caller joins the host.
pub(crate) fn spawn_room<S: WordSupplier>(
    room_id: RoomId,
    config: RoomConfig,
    supplier: Arc<S>,
) -> RoomHandle {
    let (tx, rx) = mpsc::channel(config.channel_size.max(1));
    let host_id = room_id.host();
    let (info_tx, info_rx) = watch::channel(RoomInfo {
        room_id: room_id.clone(),
        host_id: host_id.clone(),
        status: RoomStatus::Lobby,
        player_count: 0,
        max_players: config.max_players,
    });

    let scheduler = TickScheduler::new(TickConfig::with_rate(config.tick_rate_hz));
    let arena = (config.arena_width, config.arena_height);

    let actor = RoomActor {
        room_id: room_id.clone(),
        host_id,
        status: RoomStatus::Lobby,
        config,
        supplier,
        players: HashMap::new(),
        senders: HashMap::new(),
        non_playing: HashSet::new(),
        arena,
        scheduler,
        receiver: rx,
        info_tx,
    };

    tokio::spawn(actor.run());

    RoomHandle {
        room_id,
        sender: tx,
        info: info_rx,
    }
}
