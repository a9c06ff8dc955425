//! Snapshot store.
//!
//! Holds the latest decoded `CpuState` and `Framebuffer` in two independent
//! slots. Each slot is replaced whole behind its own lock, so a reader sees
//! either the previous snapshot or the next one, never a mix. The two slots
//! are not cross-checked: they may describe different emulator ticks.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::channel::ChannelKind;
use crate::protocol::{CpuState, Framebuffer, ScreenSize};

/// Events queued per subscriber before new ones are dropped.
pub const SUBSCRIBER_BACKLOG: usize = 64;

/// Change notifications delivered to subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotEvent {
    /// A new `CpuState` replaced the previous one.
    StateUpdated,
    /// A new `Framebuffer` replaced the previous one.
    FrameUpdated,
    /// A telemetry channel closed. Sent once per channel.
    ChannelClosed(ChannelKind),
}

#[derive(Debug, Default)]
struct StateSlot {
    state: Option<Arc<CpuState>>,
    screen: Option<ScreenSize>,
}

/// Latest-value store shared between the channels and the presentation side.
#[derive(Debug, Default)]
pub struct SnapshotStore {
    state: RwLock<StateSlot>,
    frame: RwLock<Option<Arc<Framebuffer>>>,
    state_version: AtomicU64,
    frame_version: AtomicU64,
    state_closed: AtomicBool,
    display_closed: AtomicBool,
    subscribers: Mutex<Vec<SyncSender<SnapshotEvent>>>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recent CPU snapshot, if any.
    pub fn latest_state(&self) -> Option<Arc<CpuState>> {
        self.state.read().state.clone()
    }

    /// The most recent display snapshot, if any.
    pub fn latest_frame(&self) -> Option<Arc<Framebuffer>> {
        self.frame.read().clone()
    }

    /// Screen size recorded with the latest state frame. `None` until the
    /// first state frame is stored.
    pub fn screen_size(&self) -> Option<ScreenSize> {
        self.state.read().screen
    }

    /// Replace the CPU snapshot and the screen size that came with it.
    pub fn replace_state(&self, state: CpuState, screen: ScreenSize) {
        {
            let mut slot = self.state.write();
            slot.state = Some(Arc::new(state));
            slot.screen = Some(screen);
        }
        self.state_version.fetch_add(1, Ordering::Release);
        self.notify(SnapshotEvent::StateUpdated);
    }

    /// Replace the display snapshot.
    pub fn replace_frame(&self, frame: Framebuffer) {
        *self.frame.write() = Some(Arc::new(frame));
        self.frame_version.fetch_add(1, Ordering::Release);
        self.notify(SnapshotEvent::FrameUpdated);
    }

    /// Number of state replacements so far. Pollers compare against the
    /// last value they saw.
    pub fn state_version(&self) -> u64 {
        self.state_version.load(Ordering::Acquire)
    }

    /// Number of frame replacements so far.
    pub fn frame_version(&self) -> u64 {
        self.frame_version.load(Ordering::Acquire)
    }

    /// Whether the given channel has reported its transport closed. Stays
    /// set even if the matching event was dropped from a full queue.
    pub fn is_channel_closed(&self, kind: ChannelKind) -> bool {
        self.closed_flag(kind).load(Ordering::Acquire)
    }

    /// Record that a channel closed and tell subscribers.
    pub(crate) fn mark_closed(&self, kind: ChannelKind) {
        self.closed_flag(kind).store(true, Ordering::Release);
        self.notify(SnapshotEvent::ChannelClosed(kind));
    }

    fn closed_flag(&self, kind: ChannelKind) -> &AtomicBool {
        match kind {
            ChannelKind::State => &self.state_closed,
            ChannelKind::Display => &self.display_closed,
        }
    }

    /// Register for change notifications. Dropping the receiver unsubscribes.
    ///
    /// Each subscriber queues at most [`SUBSCRIBER_BACKLOG`] events. While
    /// its queue is full, new events for it are dropped; the snapshots,
    /// version counters and closed flags stay authoritative.
    pub fn subscribe(&self) -> Receiver<SnapshotEvent> {
        let (tx, rx) = mpsc::sync_channel(SUBSCRIBER_BACKLOG);
        self.subscribers.lock().push(tx);
        rx
    }

    fn notify(&self, event: SnapshotEvent) {
        self.subscribers.lock().retain(|tx| match tx.try_send(event) {
            Ok(()) | Err(TrySendError::Full(_)) => true,
            Err(TrySendError::Disconnected(_)) => false,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_store() {
        let store = SnapshotStore::new();
        assert!(store.latest_state().is_none());
        assert!(store.latest_frame().is_none());
        assert!(store.screen_size().is_none());
        assert_eq!(store.state_version(), 0);
    }

    #[test]
    fn test_replace_not_patch() {
        let store = SnapshotStore::new();
        let first = CpuState { pc: 0x200, ..CpuState::default() };
        store.replace_state(first, ScreenSize::SMALL);
        let held = store.latest_state().unwrap();

        let second = CpuState { pc: 0x202, ..CpuState::default() };
        store.replace_state(second, ScreenSize::LARGE);

        assert_eq!(held.pc, 0x200);
        assert_eq!(store.latest_state().unwrap().pc, 0x202);
        assert_eq!(store.screen_size(), Some(ScreenSize::LARGE));
        assert_eq!(store.state_version(), 2);
        assert_eq!(store.frame_version(), 0);
    }

    #[test]
    fn test_slots_are_independent() {
        let store = SnapshotStore::new();
        store.replace_frame(Framebuffer::blank(ScreenSize::SMALL));
        assert!(store.latest_state().is_none());
        assert_eq!(store.latest_frame().unwrap().width(), 64);
        assert_eq!(store.frame_version(), 1);
    }

    #[test]
    fn test_subscribers_notified() {
        let store = SnapshotStore::new();
        let rx = store.subscribe();
        store.replace_state(CpuState::default(), ScreenSize::SMALL);
        store.replace_frame(Framebuffer::blank(ScreenSize::SMALL));
        assert_eq!(rx.try_recv(), Ok(SnapshotEvent::StateUpdated));
        assert_eq!(rx.try_recv(), Ok(SnapshotEvent::FrameUpdated));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_dropped_subscriber_removed() {
        let store = SnapshotStore::new();
        let rx = store.subscribe();
        drop(rx);
        store.replace_frame(Framebuffer::blank(ScreenSize::SMALL));
        assert!(store.subscribers.lock().is_empty());
    }

    #[test]
    fn test_slow_subscriber_is_bounded() {
        let store = SnapshotStore::new();
        let rx = store.subscribe();
        for _ in 0..SUBSCRIBER_BACKLOG * 4 {
            store.replace_frame(Framebuffer::blank(ScreenSize::SMALL));
        }
        assert_eq!(rx.try_iter().count(), SUBSCRIBER_BACKLOG);
        assert_eq!(store.frame_version(), (SUBSCRIBER_BACKLOG * 4) as u64);

        // Still subscribed once drained.
        assert_eq!(store.subscribers.lock().len(), 1);
        store.replace_state(CpuState::default(), ScreenSize::SMALL);
        assert_eq!(rx.try_recv(), Ok(SnapshotEvent::StateUpdated));
    }

    #[test]
    fn test_closed_flag_survives_full_queue() {
        let store = SnapshotStore::new();
        let rx = store.subscribe();
        for _ in 0..SUBSCRIBER_BACKLOG {
            store.replace_frame(Framebuffer::blank(ScreenSize::SMALL));
        }
        store.mark_closed(ChannelKind::Display);

        assert!(rx.try_iter().all(|e| e == SnapshotEvent::FrameUpdated));
        assert!(store.is_channel_closed(ChannelKind::Display));
        assert!(!store.is_channel_closed(ChannelKind::State));
    }

    #[test]
    fn test_concurrent_readers_see_whole_values() {
        let store = Arc::new(SnapshotStore::new());
        let writer = {
            let store = Arc::clone(&store);
            std::thread::spawn(move || {
                for n in 0..500u16 {
                    let state = CpuState { pc: n, i: n, ..CpuState::default() };
                    store.replace_state(state, ScreenSize::SMALL);
                }
            })
        };
        for _ in 0..500 {
            if let Some(state) = store.latest_state() {
                assert_eq!(state.pc, state.i);
            }
        }
        writer.join().unwrap();
        assert_eq!(store.latest_state().unwrap().pc, 499);
    }
}
