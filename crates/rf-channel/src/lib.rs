//! FluxForge Channel Scheduler
//!
//! Higher-level playback behaviors layered on an external audio engine:
//! - Looped playback with fade-in/fade-out envelopes
//! - Randomized re-trigger scheduling with jitter
//! - Crossfading between overlapping one-shot plays
//! - Sprite-region trimming (skip-front / play-for)
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                   CHANNEL SCHEDULER ARCHITECTURE                 │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                  │
//! │   Host                                ChannelScheduler           │
//! │   ┌─────────────────┐                ┌─────────────────┐        │
//! │   │ random()        │                │ ChannelConfig   │        │
//! │   │ crossfade()     │───mutators────▶│ SpriteMap       │        │
//! │   │ play_for() ...  │                │ RandomSchedule  │        │
//! │   │ process(ms)     │───clock───────▶│ TimerRegistry   │        │
//! │   └─────────────────┘                └───────┬─────────┘        │
//! │                                              │ play/fade/stop    │
//! │   ┌─────────────────┐   load / end   ┌───────▼─────────┐        │
//! │   │ EventSender     │◀───────────────│ AudioEngine     │        │
//! │   └─────────────────┘   (lock-free)  └─────────────────┘        │
//! │                                                                  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use rf_channel::{ChannelOptions, ChannelScheduler};
//!
//! let options = ChannelOptions::new("rain").with_crossfade(1500).with_fades(800, 800);
//! let mut channel = ChannelScheduler::new(options, engine)?;
//!
//! channel.play();
//!
//! // From the host's tick
//! channel.process(16);
//! ```

pub mod channel;
pub mod config;
pub mod engine;
pub mod error;
pub mod fade;
pub mod schedule;
pub mod sprite;
pub mod timer;

// Re-exports
pub use channel::{ChannelScheduler, ChannelState, PlaybackMode};
pub use config::{ChannelConfig, ChannelId, ChannelOptions, ParamValue};
pub use engine::{AudioEngine, EngineEvent, EngineEventSender, SoundId};
pub use error::{ChannelError, ChannelResult};
pub use fade::FadeEnvelope;
pub use schedule::{RandomCursor, RandomSchedule};
pub use sprite::{SpriteMap, SpriteRegion, TrimWindow};
pub use timer::{Timer, TimerRegistry, TimerSlot};
