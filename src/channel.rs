//! Telemetry channels.
//!
//! A channel takes raw frames from whatever transport delivers them, decodes
//! each one and stores the result. Frames on one channel are handled in
//! arrival order; nothing orders the state channel against the display
//! channel.

use std::sync::Arc;

use serde::{Serialize, Deserialize};
use thiserror::Error;
use tracing::{debug, info, trace, warn};

use crate::protocol::{self, FrameError, ScreenSize, StateLayout};
use crate::store::SnapshotStore;

/// Which of the two push channels a frame belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChannelKind {
    /// CPU-state frames.
    State,
    /// Packed display frames.
    Display,
}

impl std::fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChannelKind::State => write!(f, "state"),
            ChannelKind::Display => write!(f, "display"),
        }
    }
}

/// Errors surfaced by a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ChannelError {
    /// The frame was rejected. The store is untouched and the channel stays open.
    #[error(transparent)]
    Frame(#[from] FrameError),

    /// The transport ended. Reported once, by [`TelemetryChannel::close`].
    #[error("{0} channel closed")]
    TransportClosed(ChannelKind),
}

/// What happened to a frame handed to [`TelemetryChannel::receive`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Decoded and stored.
    Stored,
    /// The channel is closed; the frame was dropped unread.
    Dropped,
}

/// Per-kind decoding settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    /// `screen` is recorded with each state when `layout` carries no
    /// screen size of its own.
    State { layout: StateLayout, screen: ScreenSize },
    /// Dimensions come from the store.
    Display,
}

/// Owner of one channel's lifecycle.
#[derive(Debug)]
pub struct TelemetryChannel {
    role: Role,
    store: Arc<SnapshotStore>,
    closed: bool,
    accepted: u64,
    rejected: u64,
}

impl TelemetryChannel {
    /// A state channel decoding `layout` frames. `screen` is recorded with
    /// each state when the layout carries no screen size of its own.
    pub fn state(store: Arc<SnapshotStore>, layout: StateLayout, screen: ScreenSize) -> Self {
        Self::new(Role::State { layout, screen }, store)
    }

    /// A display channel. Dimensions come from the store.
    pub fn display(store: Arc<SnapshotStore>) -> Self {
        Self::new(Role::Display, store)
    }

    fn new(role: Role, store: Arc<SnapshotStore>) -> Self {
        Self {
            role,
            store,
            closed: false,
            accepted: 0,
            rejected: 0,
        }
    }

    pub fn kind(&self) -> ChannelKind {
        match self.role {
            Role::State { .. } => ChannelKind::State,
            Role::Display => ChannelKind::Display,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Frames decoded and stored.
    pub fn accepted(&self) -> u64 {
        self.accepted
    }

    /// Frames that failed to decode.
    pub fn rejected(&self) -> u64 {
        self.rejected
    }

    /// Decode one frame and store it.
    ///
    /// A bad frame is logged and returned as an error; the store keeps its
    /// previous snapshot. Frames arriving after [`close`](Self::close) are
    /// dropped without error.
    pub fn receive(&mut self, frame: &[u8]) -> Result<Delivery, ChannelError> {
        if self.closed {
            trace!(channel = %self.kind(), len = frame.len(), "frame after close dropped");
            return Ok(Delivery::Dropped);
        }

        let result = match self.role {
            Role::State { layout, screen } => self.store_state(frame, layout, screen),
            Role::Display => self.store_display(frame),
        };

        match result {
            Ok(()) => {
                self.accepted += 1;
                Ok(Delivery::Stored)
            }
            Err(err) => {
                self.rejected += 1;
                warn!(channel = %self.kind(), len = frame.len(), error = %err, "frame rejected");
                Err(err.into())
            }
        }
    }

    fn store_state(&self, frame: &[u8], layout: StateLayout, screen: ScreenSize) -> Result<(), FrameError> {
        let decoded = protocol::decode_state(frame, layout)?;
        debug!(
            pc = decoded.state.pc,
            opcode = %decoded.state.fields(),
            "state frame"
        );
        self.store.replace_state(decoded.state, decoded.screen.unwrap_or(screen));
        Ok(())
    }

    fn store_display(&self, frame: &[u8]) -> Result<(), FrameError> {
        let size = self.store.screen_size().ok_or(FrameError::MissingDimensions)?;
        let decoded = protocol::decode_display(frame, size)?;
        self.store.replace_frame(decoded);
        Ok(())
    }

    /// Mark the transport as ended.
    ///
    /// The first call notifies subscribers and returns
    /// [`ChannelError::TransportClosed`]; later calls return `None`.
    pub fn close(&mut self) -> Option<ChannelError> {
        if self.closed {
            return None;
        }
        self.closed = true;
        let kind = self.kind();
        info!(
            channel = %kind,
            accepted = self.accepted,
            rejected = self.rejected,
            "channel closed"
        );
        self.store.mark_closed(kind);
        Some(ChannelError::TransportClosed(kind))
    }
}
