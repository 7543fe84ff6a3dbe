//! Channel Scheduler
//!
//! Playback scheduling and timing state machine for one channel:
//! - Looped playback with a single fade envelope
//! - Crossfade cycles of overlapping one-shot plays
//! - Randomized one-shot re-triggers driven by a cyclic schedule
//! - End-of-play pauses and fade re-application
//!
//! ## Driving the scheduler
//!
//! Time only advances through [`ChannelScheduler::process`]. Each call drains
//! pending engine events, then fires every timer whose deadline falls inside
//! the elapsed window, earliest first. The clock is set to a timer's deadline
//! before it is handled, so re-armed timers keep their cadence regardless of
//! how coarse the host's process calls are.
//!
//! ```text
//!            play()
//!   Idle ───────────────▶ Running ──┬── random ────▶ Random ⟲ (re-arm, play once)
//!    ▲                              ├── crossfade ─▶ Offset → Crossfade ⟲ (play once, re-arm)
//!    │        stop()                └── looped ────▶ Offset → play looped
//!    └──────────────────────────────── (cancels every timer)
//! ```

use rand::SeedableRng;
use rand::rngs::StdRng;
use rtrb::Consumer;

use crate::config::{
    self, ChannelConfig, ChannelId, ChannelOptions, ParamValue, normalize_random_count,
    normalize_random_interval,
};
use crate::engine::{AudioEngine, EVENT_QUEUE_CAPACITY, EngineEvent, SoundId, event_queue};
use crate::error::ChannelResult;
use crate::fade::FadeEnvelope;
use crate::schedule::{RandomCursor, RandomSchedule};
use crate::sprite::{self, SpriteMap, TrimWindow};
use crate::timer::{Timer, TimerRegistry, TimerSlot};

// ═══════════════════════════════════════════════════════════════════════════════
// CHANNEL STATE
// ═══════════════════════════════════════════════════════════════════════════════

/// Playback state of a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum ChannelState {
    /// Not playing, no timers armed
    #[default]
    Idle = 0,
    /// `play()` was called and not yet stopped
    Running = 1,
}

/// Playback mode selected by the configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackMode {
    Looped,
    Crossfade,
    Random,
}

// ═══════════════════════════════════════════════════════════════════════════════
// CHANNEL SCHEDULER
// ═══════════════════════════════════════════════════════════════════════════════

/// Scheduler for one channel over an external audio engine
pub struct ChannelScheduler<E: AudioEngine> {
    config: ChannelConfig,
    engine: E,
    events: Consumer<EngineEvent>,
    timers: TimerRegistry,
    /// User-registered regions (without the derived ones)
    user_regions: SpriteMap,
    sprite: SpriteMap,
    window: TrimWindow,
    schedule: Option<RandomSchedule>,
    cursor: RandomCursor,
    rng: StdRng,
    state: ChannelState,
    now_ms: u64,
}

impl<E: AudioEngine> ChannelScheduler<E> {
    /// Create a channel from construction options
    ///
    /// Fails with [`ChannelError::MissingId`](crate::ChannelError::MissingId)
    /// without touching the engine when no id is given.
    pub fn new(options: ChannelOptions, engine: E) -> ChannelResult<Self> {
        let config = ChannelConfig::from_options(options)?;
        Ok(Self::with_config(config, engine))
    }

    /// Create a channel from an already validated configuration
    pub fn with_config(config: ChannelConfig, mut engine: E) -> Self {
        let (sender, events) = event_queue(EVENT_QUEUE_CAPACITY);
        engine.subscribe(sender);

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        let mut channel = Self {
            config,
            engine,
            events,
            timers: TimerRegistry::new(),
            user_regions: SpriteMap::new(),
            sprite: SpriteMap::new(),
            window: TrimWindow::derive(0, None, 0),
            schedule: None,
            cursor: RandomCursor::new(),
            rng,
            state: ChannelState::Idle,
            now_ms: 0,
        };
        channel.refresh_regions();
        channel
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // QUERIES
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn id(&self) -> &ChannelId {
        &self.config.id
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    /// Regions currently registered with the engine
    pub fn sprite_map(&self) -> &SpriteMap {
        &self.sprite
    }

    pub fn timers(&self) -> &TimerRegistry {
        &self.timers
    }

    /// Current random schedule, if one was generated
    pub fn random_schedule(&self) -> Option<&RandomSchedule> {
        self.schedule.as_ref()
    }

    pub fn state(&self) -> ChannelState {
        self.state
    }

    #[inline]
    pub fn is_playing(&self) -> bool {
        self.state == ChannelState::Running
    }

    pub fn mode(&self) -> PlaybackMode {
        if self.config.random {
            PlaybackMode::Random
        } else if self.config.crossfade {
            PlaybackMode::Crossfade
        } else {
            PlaybackMode::Looped
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    /// Virtual clock (ms)
    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    /// Source duration in ms (0 until loaded)
    pub fn duration_ms(&self) -> u64 {
        let secs = self.engine.duration();
        if secs.is_finite() && secs > 0.0 {
            (secs * 1000.0).round() as u64
        } else {
            0
        }
    }

    /// Length of one play instance (normalized playFor)
    pub fn play_length_ms(&self) -> u64 {
        self.window.play_for_ms
    }

    /// UI element selector for a property of this channel
    pub fn element_selector(&self, name: &str) -> String {
        self.config.element_selector(name)
    }

    fn envelope(&self) -> FadeEnvelope {
        FadeEnvelope::new(
            self.config.fade_in_ms,
            self.config.fade_out_ms,
            self.play_length_ms(),
        )
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // CONFIGURATION MUTATORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Configure random re-triggering; restarts a running channel
    pub fn random(&mut self, active: bool, count: u32, interval_ms: u64) {
        self.config.random = active;
        self.config.random_count = normalize_random_count(&self.config.id, count);
        self.config.random_interval_ms = normalize_random_interval(&self.config.id, interval_ms);
        if active {
            self.generate_schedule();
        }
        self.refresh_regions();
        self.restart_if_playing();
    }

    /// Toggle crossfade cycling; restarts a running channel
    pub fn crossfade(&mut self, active: bool) {
        self.config.crossfade = active;
        self.refresh_regions();
        self.restart_if_playing();
    }

    /// Fade length used by crossfade cycles when a fade is disabled
    pub fn crossfade_overlap(&mut self, overlap_ms: u64) {
        self.config.crossfade_overlap_ms = overlap_ms;
        self.refresh_regions();
    }

    /// `false` disables the fade-in, a number sets its length (ms)
    pub fn fade_in(&mut self, value: impl Into<ParamValue>) {
        self.config.fade_in_ms = config::fade_setting(value.into());
        self.refresh_regions();
    }

    /// `false` disables the fade-out, a number sets its length (ms)
    pub fn fade_out(&mut self, value: impl Into<ParamValue>) {
        self.config.fade_out_ms = config::fade_setting(value.into());
        self.refresh_regions();
    }

    /// Play length per instance; a boolean selects the full duration.
    /// Restarts a running channel.
    pub fn play_for(&mut self, value: impl Into<ParamValue>) {
        self.config.play_for_ms = config::play_for_ms(value.into(), self.duration_ms());
        self.refresh_regions();
        self.restart_if_playing();
    }

    /// Skipped source front; a boolean resets it to zero.
    /// Restarts a running channel.
    pub fn skip_front(&mut self, value: impl Into<ParamValue>) {
        self.config.skip_front_ms = config::skip_front_ms(value.into(), self.duration_ms());
        self.refresh_regions();
        self.restart_if_playing();
    }

    /// Pause between plays outside looped/random/crossfade re-triggering;
    /// `false` disables it
    pub fn pausetime(&mut self, value: impl Into<ParamValue>) {
        self.config.pausetime_ms = config::pausetime_setting(value.into());
        self.refresh_regions();
    }

    /// Delay before the first looped or crossfade play
    pub fn offset(&mut self, offset_ms: u64) {
        self.config.offset_ms = offset_ms;
        self.refresh_regions();
    }

    /// Register additional named regions alongside the derived ones
    pub fn sprite(&mut self, regions: SpriteMap) {
        self.user_regions = regions;
        self.refresh_regions();
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // PLAYBACK
    // ═══════════════════════════════════════════════════════════════════════════

    /// Start playback in the configured mode
    pub fn play(&mut self) {
        if self.is_playing() {
            log::debug!("[Channel {}] play while running, restarting", self.config.id);
            self.stop();
        }
        self.state = ChannelState::Running;

        match self.mode() {
            PlaybackMode::Random => self.start_random(),
            PlaybackMode::Crossfade | PlaybackMode::Looped => {
                let offset = self.config.offset_ms;
                if offset > 0 {
                    log::debug!("[Channel {}] start in {}ms", self.config.id, offset);
                    self.timers.arm(Timer::Offset, self.now_ms, offset);
                } else {
                    self.start_delayed();
                }
            }
        }
    }

    /// Stop the engine and cancel every pending timer
    pub fn stop(&mut self) {
        self.engine.stop();
        self.timers.clear();
        self.cursor.reset();
        self.state = ChannelState::Idle;
        log::debug!("[Channel {}] stopped", self.config.id);
    }

    /// Advance the virtual clock by `elapsed_ms`
    ///
    /// Engine events queued so far are handled first, then every timer due
    /// within the window fires in deadline order.
    pub fn process(&mut self, elapsed_ms: u64) {
        self.drain_events();

        let until = self.now_ms.saturating_add(elapsed_ms);
        while let Some((due_ms, timer)) = self.timers.pop_due(until) {
            self.now_ms = self.now_ms.max(due_ms);
            self.on_timer(timer);
        }
        self.now_ms = until;
    }

    /// Handle an engine notification directly
    pub fn handle_event(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::Load => self.on_load(),
            EngineEvent::End(sound) => self.on_end(sound),
        }
    }

    fn drain_events(&mut self) {
        while let Ok(event) = self.events.pop() {
            log::trace!("[Channel {}] event {:?}", self.config.id, event);
            self.handle_event(event);
        }
    }

    fn restart_if_playing(&mut self) {
        if self.is_playing() {
            log::debug!("[Channel {}] reconfigured while playing, restarting", self.config.id);
            self.stop();
            self.play();
        }
    }

    /// Re-derive the trim regions and register them with the engine
    fn refresh_regions(&mut self) {
        let duration_ms = self.duration_ms();
        self.window = TrimWindow::derive(
            self.config.skip_front_ms,
            self.config.play_for_ms,
            duration_ms,
        );
        if duration_ms > 0 {
            self.config.skip_front_ms = self.window.skip_front_ms;
            if let Some(play_for) = self.config.play_for_ms {
                self.config.play_for_ms = Some(play_for.min(duration_ms));
                self.window.play_for_ms = self.window.play_for_ms.min(duration_ms);
            }
        }
        self.sprite = SpriteMap::derive(self.window, &self.user_regions, duration_ms);
        self.engine.sprite(&self.sprite);
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // TIMER DISPATCH
    // ═══════════════════════════════════════════════════════════════════════════

    fn on_timer(&mut self, timer: Timer) {
        log::debug!(
            "[Channel {}] {} fired at {}ms",
            self.config.id,
            timer.slot().name(),
            self.now_ms
        );

        match timer {
            Timer::Offset => self.start_delayed(),
            Timer::Random => {
                self.arm_next_random();
                self.play_with_fade();
            }
            Timer::FadeOut { sound, duration_ms } => {
                let volume = self.engine.volume();
                self.engine.fade(volume, 0.0, duration_ms, sound);
            }
            Timer::Pausetime { sound } => {
                self.engine.resume(sound);
                self.apply_fades(sound, 0);
            }
            Timer::Crossfade => self.crossfade_cycle(),
        }
    }

    fn start_delayed(&mut self) {
        match self.mode() {
            PlaybackMode::Crossfade => self.crossfade_cycle(),
            PlaybackMode::Looped => self.start_looped(),
            // Mode switched while the offset was pending
            PlaybackMode::Random => self.start_random(),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // MODES
    // ═══════════════════════════════════════════════════════════════════════════

    fn start_looped(&mut self) {
        self.engine.set_loop(true);
        let sound = self.engine.play(sprite::LOOPED);
        log::debug!("[Channel {}] looped play {}", self.config.id, sound);
        self.apply_fades(sound, 0);
    }

    fn crossfade_cycle(&mut self) {
        let overlap = self.config.crossfade_overlap_ms;
        let sound = self.engine.play(sprite::ONCE);
        self.apply_fades(sound, overlap);

        let period = self
            .envelope()
            .fade_out_start(overlap)
            .unwrap_or_else(|| self.play_length_ms());
        if period > 0 {
            log::debug!("[Channel {}] next crossfade in {}ms", self.config.id, period);
            self.timers.arm(Timer::Crossfade, self.now_ms, period);
        } else {
            log::warn!(
                "[Channel {}] crossfade period is zero, not re-arming",
                self.config.id
            );
        }
    }

    fn start_random(&mut self) {
        self.engine.set_loop(false);
        self.generate_schedule();
        self.cursor.reset();
        self.arm_next_random();
    }

    fn generate_schedule(&mut self) {
        let schedule = RandomSchedule::generate(
            self.config.random_count,
            self.config.random_interval_ms,
            &mut self.rng,
        );
        log::debug!(
            "[Channel {}] random schedule: first {}ms, gaps {:?}",
            self.config.id,
            schedule.initial_delay,
            schedule.gaps
        );
        self.schedule = Some(schedule);
    }

    fn arm_next_random(&mut self) {
        if self.schedule.is_none() {
            self.generate_schedule();
        }
        let Some(schedule) = self.schedule.as_ref() else {
            return;
        };
        let delay = self.cursor.next_delay(schedule);
        self.timers.arm(Timer::Random, self.now_ms, delay);
    }

    fn play_with_fade(&mut self) {
        let sound = self.engine.play(sprite::ONCE);
        self.apply_fades(sound, 0);
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // FADES
    // ═══════════════════════════════════════════════════════════════════════════

    fn apply_fades(&mut self, sound: SoundId, min: u64) {
        self.start_fade(sound, min);
        self.end_fade(sound, min);
    }

    fn start_fade(&mut self, sound: SoundId, min: u64) {
        let fade_in = self.envelope().fade_in(min);
        if fade_in > 0 {
            let volume = self.engine.volume();
            self.engine.fade(0.0, volume, fade_in, sound);
        }
    }

    /// Arm the fade-out of `sound`; fade-outs of earlier instances that are
    /// still playing stay armed
    fn end_fade(&mut self, sound: SoundId, min: u64) {
        let envelope = self.envelope();
        if let Some(start) = envelope.fade_out_start(min) {
            let duration_ms = envelope.fade_out(min);
            self.timers
                .arm_instance(Timer::FadeOut { sound, duration_ms }, self.now_ms, start);
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // ENGINE EVENTS
    // ═══════════════════════════════════════════════════════════════════════════

    fn on_load(&mut self) {
        log::debug!(
            "[Channel {}] loaded, duration {}ms",
            self.config.id,
            self.duration_ms()
        );
        self.refresh_regions();
        self.restart_if_playing();
    }

    fn on_end(&mut self, sound: SoundId) {
        if !self.is_playing() {
            log::trace!("[Channel {}] end of {} while idle", self.config.id, sound);
            return;
        }
        if self.config.random || self.config.crossfade {
            return;
        }

        match self.config.pausetime_ms {
            Some(pause) if pause > 0 => {
                self.engine.pause(sound);
                self.timers
                    .arm(Timer::Pausetime { sound }, self.now_ms, pause);
            }
            _ => self.apply_fades(sound, 0),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineEventSender;

    #[derive(Default)]
    struct NullEngine {
        next_id: u64,
        plays: Vec<String>,
        stops: usize,
        events: Option<EngineEventSender>,
    }

    impl AudioEngine for NullEngine {
        fn play(&mut self, region: &str) -> SoundId {
            self.next_id += 1;
            self.plays.push(region.to_string());
            SoundId(self.next_id)
        }
        fn resume(&mut self, _sound: SoundId) {}
        fn stop(&mut self) {
            self.stops += 1;
        }
        fn pause(&mut self, _sound: SoundId) {}
        fn fade(&mut self, _from: f32, _to: f32, _duration_ms: u64, _sound: SoundId) {}
        fn volume(&self) -> f32 {
            1.0
        }
        fn duration(&self) -> f64 {
            10.0
        }
        fn sprite(&mut self, _regions: &SpriteMap) {}
        fn set_loop(&mut self, _looping: bool) {}
        fn subscribe(&mut self, events: EngineEventSender) {
            self.events = Some(events);
        }
    }

    fn channel(options: ChannelOptions) -> ChannelScheduler<NullEngine> {
        ChannelScheduler::new(options.with_seed(11), NullEngine::default()).unwrap()
    }

    #[test]
    fn test_construction_subscribes() {
        let ch = channel(ChannelOptions::new("a"));
        assert!(ch.engine().events.is_some());
        assert_eq!(ch.state(), ChannelState::Idle);
        assert_eq!(ch.play_length_ms(), 10_000);
        assert!(ch.sprite_map().contains(sprite::LOOPED));
    }

    #[test]
    fn test_missing_id_leaves_engine_untouched() {
        let result = ChannelScheduler::new(ChannelOptions::default(), NullEngine::default());
        assert!(result.is_err());
    }

    #[test]
    fn test_mode_selection() {
        let mut ch = channel(ChannelOptions::new("a"));
        assert_eq!(ch.mode(), PlaybackMode::Looped);
        ch.crossfade(true);
        assert_eq!(ch.mode(), PlaybackMode::Crossfade);
        ch.random(true, 2, 1000);
        assert_eq!(ch.mode(), PlaybackMode::Random);
    }

    #[test]
    fn test_looped_play_is_immediate_without_offset() {
        let mut ch = channel(ChannelOptions::new("a"));
        ch.play();
        assert_eq!(ch.engine().plays, vec![sprite::LOOPED.to_string()]);
        assert!(ch.timers().is_empty());
    }

    #[test]
    fn test_offset_delays_start() {
        let mut ch = channel(ChannelOptions::new("a").with_offset(250));
        ch.play();
        assert!(ch.engine().plays.is_empty());
        assert_eq!(ch.timers().due_at(TimerSlot::Offset), Some(250));

        ch.process(249);
        assert!(ch.engine().plays.is_empty());
        ch.process(1);
        assert_eq!(ch.engine().plays.len(), 1);
    }

    #[test]
    fn test_play_while_running_restarts() {
        let mut ch = channel(ChannelOptions::new("a").with_random(2, 1000));
        ch.play();
        ch.play();
        assert_eq!(ch.engine().stops, 1);
        assert_eq!(ch.timers().len(), 1);
    }

    #[test]
    fn test_end_while_idle_is_ignored() {
        let mut ch = channel(ChannelOptions::new("a").with_pausetime(500u64));
        ch.handle_event(EngineEvent::End(SoundId(1)));
        assert!(ch.timers().is_empty());
    }
}
