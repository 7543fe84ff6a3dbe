//! Audio Engine Capability
//!
//! The scheduler never decodes, mixes or ramps audio itself. It drives an
//! external engine through [`AudioEngine`] and listens to the engine's
//! `load`/`end` notifications through an [`EngineEventSender`].
//!
//! ## Event path
//!
//! ```text
//!   Engine (any thread)                   Scheduler thread
//!   ┌──────────────────┐                 ┌────────────────────┐
//!   │ sender.load()    │───EngineEvent──▶│ ChannelScheduler   │
//!   │ sender.end(id)   │   (lock-free)   │ .process(elapsed)  │
//!   └──────────────────┘                 └────────────────────┘
//! ```

use parking_lot::Mutex;
use rtrb::{Consumer, Producer, RingBuffer};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::sprite::SpriteMap;

/// Engine event queue capacity
pub const EVENT_QUEUE_CAPACITY: usize = 256;

// ═══════════════════════════════════════════════════════════════════════════════
// SOUND ID
// ═══════════════════════════════════════════════════════════════════════════════

/// Engine play instance identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SoundId(pub u64);

impl fmt::Display for SoundId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ENGINE EVENT
// ═══════════════════════════════════════════════════════════════════════════════

/// Notification from the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineEvent {
    /// Source finished loading; duration is now known
    Load,
    /// A play instance reached its end
    End(SoundId),
}

// ═══════════════════════════════════════════════════════════════════════════════
// AUDIO ENGINE
// ═══════════════════════════════════════════════════════════════════════════════

/// Playback primitives provided by the host audio engine
pub trait AudioEngine {
    /// Start a new play instance of a sprite region
    fn play(&mut self, region: &str) -> SoundId;

    /// Resume a paused play instance
    fn resume(&mut self, sound: SoundId);

    /// Stop every play instance of the source
    fn stop(&mut self);

    fn pause(&mut self, sound: SoundId);

    /// Linear volume ramp on one play instance
    fn fade(&mut self, from: f32, to: f32, duration_ms: u64, sound: SoundId);

    /// Current source volume (0.0 - 1.0)
    fn volume(&self) -> f32;

    /// Source duration in seconds (0.0 until loaded)
    fn duration(&self) -> f64;

    /// Register named regions
    fn sprite(&mut self, regions: &SpriteMap);

    /// Engine-level looping for subsequent plays
    fn set_loop(&mut self, looping: bool);

    /// Receive the sender for `load`/`end` notifications
    ///
    /// Called once, when the scheduler is constructed.
    fn subscribe(&mut self, events: EngineEventSender);
}

// ═══════════════════════════════════════════════════════════════════════════════
// EVENT SENDER
// ═══════════════════════════════════════════════════════════════════════════════

/// Producer end of the engine event queue
///
/// Cheap to clone and safe to use from the engine's own threads.
#[derive(Clone)]
pub struct EngineEventSender {
    tx: Arc<Mutex<Producer<EngineEvent>>>,
}

impl EngineEventSender {
    /// Push an event; returns `false` when the queue is full and the event
    /// was dropped
    pub fn send(&self, event: EngineEvent) -> bool {
        let mut tx = self.tx.lock();
        match tx.push(event) {
            Ok(()) => true,
            Err(_) => {
                log::warn!("[EngineEvents] Queue full, dropping {:?}", event);
                false
            }
        }
    }

    pub fn load(&self) -> bool {
        self.send(EngineEvent::Load)
    }

    pub fn end(&self, sound: SoundId) -> bool {
        self.send(EngineEvent::End(sound))
    }
}

impl fmt::Debug for EngineEventSender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineEventSender").finish_non_exhaustive()
    }
}

/// Create the engine event queue
pub fn event_queue(capacity: usize) -> (EngineEventSender, Consumer<EngineEvent>) {
    let (tx, rx) = RingBuffer::new(capacity);
    (
        EngineEventSender {
            tx: Arc::new(Mutex::new(tx)),
        },
        rx,
    )
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_arrive_in_order() {
        let (sender, mut rx) = event_queue(8);
        let clone = sender.clone();

        assert!(sender.load());
        assert!(clone.end(SoundId(4)));

        assert_eq!(rx.pop().ok(), Some(EngineEvent::Load));
        assert_eq!(rx.pop().ok(), Some(EngineEvent::End(SoundId(4))));
        assert!(rx.pop().is_err());
    }

    #[test]
    fn test_full_queue_drops() {
        let (sender, _rx) = event_queue(1);
        assert!(sender.load());
        assert!(!sender.end(SoundId(1)));
    }

    #[test]
    fn test_sender_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<EngineEventSender>();
    }
}
