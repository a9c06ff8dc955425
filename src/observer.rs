//! Observer session.
//!
//! Ties one configuration to one snapshot store, the channels that feed it
//! and the command client. This is the surface a presentation layer uses.

use std::sync::mpsc::Receiver;
use std::sync::Arc;

use crate::channel::TelemetryChannel;
use crate::command::{Ack, Command, CommandClient, CommandTransport, CommandTransportError, HttpTransport};
use crate::config::ObserverConfig;
use crate::protocol::{CpuState, Framebuffer};
use crate::store::{SnapshotEvent, SnapshotStore};

/// A session against one running instance.
pub struct Observer<T = HttpTransport> {
    config: ObserverConfig,
    store: Arc<SnapshotStore>,
    commands: CommandClient<T>,
}

impl Observer<HttpTransport> {
    /// Observer sending commands over HTTP to `config.target`.
    pub fn new(config: ObserverConfig) -> Self {
        let transport = HttpTransport::new(config.target.clone(), config.command_timeout());
        Self::with_transport(config, transport)
    }
}

impl<T: CommandTransport> Observer<T> {
    /// Observer with a caller-supplied command transport.
    pub fn with_transport(config: ObserverConfig, transport: T) -> Self {
        Self {
            config,
            store: Arc::new(SnapshotStore::new()),
            commands: CommandClient::new(transport),
        }
    }

    pub fn config(&self) -> &ObserverConfig {
        &self.config
    }

    /// Shared handle to the store.
    pub fn store(&self) -> Arc<SnapshotStore> {
        Arc::clone(&self.store)
    }

    /// Open a state channel. The caller's transport feeds it frames.
    pub fn state_channel(&self) -> TelemetryChannel {
        TelemetryChannel::state(self.store(), self.config.layout, self.config.screen)
    }

    /// Open a display channel.
    pub fn display_channel(&self) -> TelemetryChannel {
        TelemetryChannel::display(self.store())
    }

    pub fn latest_state(&self) -> Option<Arc<CpuState>> {
        self.store.latest_state()
    }

    pub fn latest_frame(&self) -> Option<Arc<Framebuffer>> {
        self.store.latest_frame()
    }

    pub fn subscribe(&self) -> Receiver<SnapshotEvent> {
        self.store.subscribe()
    }

    pub fn send(&self, command: Command) -> Result<Ack, CommandTransportError> {
        self.commands.send(command)
    }

    pub fn start(&self) -> Result<Ack, CommandTransportError> {
        self.commands.start()
    }

    pub fn stop(&self) -> Result<Ack, CommandTransportError> {
        self.commands.stop()
    }

    pub fn step(&self) -> Result<Ack, CommandTransportError> {
        self.commands.step()
    }

    pub fn reset(&self) -> Result<Ack, CommandTransportError> {
        self.commands.reset()
    }
}
