//! Position sync against the controller's canonical playback position.
//!
//! One [`PositionSync`] exists per player kind. When a player instance can
//! start, the engine asks the controller where playback should be, seeks only
//! if the drift exceeds the threshold, and matches play/pause. This runs once
//! per instance; afterwards only explicit `sync` commands re-run the
//! correction, and only when the policy enables periodic re-sync.

use tracing::{debug, warn};

use stagecast_ipc::{PlaybackPosition, QueryReply, QueryRequest};

use crate::config::SyncPolicy;
use crate::error::EngineError;
use crate::surface::MediaPlayer;

/// Which player a sync controller drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlayerKind {
    /// Local video element.
    Video,

    /// Embedded third-party widget.
    Embedded,
}

impl PlayerKind {
    /// Query that returns the canonical position for this player.
    pub fn position_request(self) -> QueryRequest {
        match self {
            Self::Video => QueryRequest::VideoPosition,
            Self::Embedded => QueryRequest::YoutubePosition,
        }
    }
}

/// What to do to a player to match the canonical position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriftCorrection {
    /// Seek target, if the drift exceeded the threshold.
    pub seek_to: Option<f64>,

    /// Whether the player should be playing afterwards.
    pub play: bool,
}

impl DriftCorrection {
    /// Apply the correction to a borrowed player.
    pub fn apply(&self, player: &mut dyn MediaPlayer) {
        if let Some(time) = self.seek_to {
            player.seek(time);
        }
        if self.play {
            if player.is_paused() {
                player.play();
            }
        } else if !player.is_paused() {
            player.pause();
        }
    }
}

/// Compare local and canonical positions.
pub fn reconcile(local_time: f64, canonical: PlaybackPosition, threshold: f64) -> DriftCorrection {
    let drift = (local_time - canonical.time).abs();
    DriftCorrection {
        seek_to: (drift > threshold).then_some(canonical.time),
        play: canonical.is_playing,
    }
}

/// Next step of a sync sequence.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncStep {
    /// Send this query to the controller.
    Query(QueryRequest),

    /// Apply a correction to the player.
    Apply(DriftCorrection),

    /// The query failed; keep the local position and optionally play.
    Fallback { play: bool, error: EngineError },

    /// Nothing to do.
    Idle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    AwaitingReady,
    AwaitingPosition,
    Synced,
}

/// One-shot alignment plus optional periodic correction for one player kind.
#[derive(Debug)]
pub struct PositionSync {
    kind: PlayerKind,
    policy: SyncPolicy,
    phase: Phase,
    generation: u64,
    intends_playing: bool,
}

impl PositionSync {
    /// Create a sync controller for a player kind.
    pub fn new(kind: PlayerKind, policy: SyncPolicy) -> Self {
        Self {
            kind,
            policy,
            phase: Phase::Idle,
            generation: 0,
            intends_playing: true,
        }
    }

    /// Forget the current player instance. Outstanding replies become stale.
    pub fn reset(&mut self) {
        self.generation += 1;
        self.phase = Phase::Idle;
        self.intends_playing = true;
    }

    /// The player can start. Returns the first query, or `None` if this
    /// instance already synced or is syncing.
    pub fn begin(&mut self) -> Option<QueryRequest> {
        if self.phase != Phase::Idle {
            debug!(kind = ?self.kind, "Sync already ran for this player");
            return None;
        }

        let request = match self.kind {
            PlayerKind::Video => {
                self.phase = Phase::AwaitingReady;
                QueryRequest::VideoReady
            }
            PlayerKind::Embedded => {
                self.phase = Phase::AwaitingPosition;
                QueryRequest::YoutubePosition
            }
        };
        Some(request)
    }

    /// Handle a query reply. `local_time` is the player's current position.
    pub fn on_reply(&mut self, generation: u64, reply: QueryReply, local_time: f64) -> SyncStep {
        if generation != self.generation {
            debug!(kind = ?self.kind, "Dropping reply for superseded player");
            return SyncStep::Idle;
        }

        match (self.phase, reply) {
            (Phase::AwaitingReady, QueryReply::VideoReady { controller_started }) => {
                if controller_started {
                    debug!("Controller started playback, skipping local alignment");
                    self.phase = Phase::Synced;
                    SyncStep::Idle
                } else {
                    self.phase = Phase::AwaitingPosition;
                    SyncStep::Query(self.kind.position_request())
                }
            }
            (Phase::AwaitingPosition, QueryReply::Position(position)) => {
                self.phase = Phase::Synced;
                self.intends_playing = position.is_playing;
                let correction = reconcile(local_time, position, self.policy.drift_threshold_secs);
                debug!(
                    kind = ?self.kind,
                    local_time,
                    canonical = position.time,
                    seek = ?correction.seek_to,
                    "Initial sync"
                );
                SyncStep::Apply(correction)
            }
            (Phase::AwaitingReady | Phase::AwaitingPosition, QueryReply::Failed { message }) => {
                let request = self.pending_request();
                self.fallback(EngineError::QueryFailed {
                    request: format!("{request:?}"),
                    message,
                })
            }
            (phase, reply) => {
                warn!(kind = ?self.kind, ?phase, ?reply, "Unexpected query reply");
                if matches!(phase, Phase::AwaitingReady | Phase::AwaitingPosition) {
                    let request = self.pending_request();
                    self.fallback(EngineError::QueryFailed {
                        request: format!("{request:?}"),
                        message: "unexpected reply".to_string(),
                    })
                } else {
                    SyncStep::Idle
                }
            }
        }
    }

    /// The query could not be sent or was not answered in time.
    pub fn on_query_failed(&mut self, generation: u64, error: EngineError) -> SyncStep {
        if generation != self.generation
            || !matches!(self.phase, Phase::AwaitingReady | Phase::AwaitingPosition)
        {
            return SyncStep::Idle;
        }
        self.fallback(error)
    }

    /// A periodic `sync` command from the controller.
    pub fn on_periodic(
        &mut self,
        position: PlaybackPosition,
        local_time: f64,
    ) -> Option<DriftCorrection> {
        if !self.policy.periodic_resync {
            debug!(kind = ?self.kind, "Periodic re-sync disabled, ignoring");
            return None;
        }
        self.intends_playing = position.is_playing;
        Some(reconcile(local_time, position, self.policy.drift_threshold_secs))
    }

    /// Record the playback intent carried by a transport command.
    pub fn set_intent(&mut self, playing: bool) {
        self.intends_playing = playing;
    }

    fn fallback(&mut self, error: EngineError) -> SyncStep {
        warn!(kind = ?self.kind, "Sync query failed, continuing locally: {}", error);
        self.phase = Phase::Synced;
        SyncStep::Fallback {
            play: self.intends_playing,
            error,
        }
    }

    fn pending_request(&self) -> QueryRequest {
        match self.phase {
            Phase::AwaitingReady => QueryRequest::VideoReady,
            _ => self.kind.position_request(),
        }
    }

    pub fn kind(&self) -> PlayerKind {
        self.kind
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_synced(&self) -> bool {
        self.phase == Phase::Synced
    }

    pub fn intends_playing(&self) -> bool {
        self.intends_playing
    }
}
