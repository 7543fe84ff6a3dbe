//! Timer Registry
//!
//! Fixed set of named, individually cancellable timer slots. Arming a slot
//! replaces whatever it held, except for per-instance timers armed with
//! [`TimerRegistry::arm_instance`]: those stack, one per play instance.
//! Deadlines are absolute milliseconds on the channel's virtual clock.

use crate::engine::SoundId;

// ═══════════════════════════════════════════════════════════════════════════════
// TIMER SLOT
// ═══════════════════════════════════════════════════════════════════════════════

/// Timer slot identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TimerSlot {
    /// Delayed start of looped/crossfade playback
    Offset = 0,
    /// Next random re-trigger
    Random = 1,
    /// Fade-out of the most recent play instance
    FadeOut = 2,
    /// Resume after an end-of-play pause
    Pausetime = 3,
    /// Next crossfade cycle
    Crossfade = 4,
}

impl TimerSlot {
    /// Number of slots
    pub const COUNT: usize = 5;

    /// All slots in index order
    pub const ALL: [TimerSlot; Self::COUNT] = [
        TimerSlot::Offset,
        TimerSlot::Random,
        TimerSlot::FadeOut,
        TimerSlot::Pausetime,
        TimerSlot::Crossfade,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(&self) -> &'static str {
        match self {
            TimerSlot::Offset => "offset",
            TimerSlot::Random => "random",
            TimerSlot::FadeOut => "fadeOut",
            TimerSlot::Pausetime => "pausetime",
            TimerSlot::Crossfade => "crossfade",
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TIMER
// ═══════════════════════════════════════════════════════════════════════════════

/// Pending timer with its firing payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timer {
    Offset,
    Random,
    FadeOut { sound: SoundId, duration_ms: u64 },
    Pausetime { sound: SoundId },
    Crossfade,
}

impl Timer {
    #[inline]
    pub fn slot(&self) -> TimerSlot {
        match self {
            Timer::Offset => TimerSlot::Offset,
            Timer::Random => TimerSlot::Random,
            Timer::FadeOut { .. } => TimerSlot::FadeOut,
            Timer::Pausetime { .. } => TimerSlot::Pausetime,
            Timer::Crossfade => TimerSlot::Crossfade,
        }
    }

    /// Play instance the timer acts on
    #[inline]
    pub fn sound(&self) -> Option<SoundId> {
        match self {
            Timer::FadeOut { sound, .. } | Timer::Pausetime { sound } => Some(*sound),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    timer: Timer,
    due_ms: u64,
    /// Arming order, breaks deadline ties
    seq: u64,
}

// ═══════════════════════════════════════════════════════════════════════════════
// TIMER REGISTRY
// ═══════════════════════════════════════════════════════════════════════════════

/// Slot-indexed pending timers
#[derive(Debug, Default)]
pub struct TimerRegistry {
    slots: [Vec<Entry>; TimerSlot::COUNT],
    next_seq: u64,
}

impl TimerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&mut self, timer: Timer, now_ms: u64, delay_ms: u64) -> Entry {
        let seq = self.next_seq;
        self.next_seq += 1;
        Entry {
            timer,
            due_ms: now_ms.saturating_add(delay_ms),
            seq,
        }
    }

    /// Arm `timer` to fire `delay_ms` after `now_ms`, replacing everything
    /// pending in its slot
    pub fn arm(&mut self, timer: Timer, now_ms: u64, delay_ms: u64) {
        let entry = self.entry(timer, now_ms, delay_ms);
        let slot = &mut self.slots[timer.slot().index()];
        slot.clear();
        slot.push(entry);
    }

    /// Arm a per-instance timer
    ///
    /// Replaces only the pending timer of the same play instance; timers of
    /// other instances in the slot stay armed.
    pub fn arm_instance(&mut self, timer: Timer, now_ms: u64, delay_ms: u64) {
        let entry = self.entry(timer, now_ms, delay_ms);
        let slot = &mut self.slots[timer.slot().index()];
        slot.retain(|e| e.timer.sound() != timer.sound());
        slot.push(entry);
    }

    /// Cancel one slot, returning how many timers were pending
    pub fn cancel(&mut self, slot: TimerSlot) -> usize {
        self.slots[slot.index()].drain(..).count()
    }

    /// Cancel every slot
    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(Vec::clear);
    }

    #[inline]
    pub fn is_armed(&self, slot: TimerSlot) -> bool {
        !self.slots[slot.index()].is_empty()
    }

    /// Earliest deadline within a slot
    pub fn due_at(&self, slot: TimerSlot) -> Option<u64> {
        self.slots[slot.index()].iter().map(|e| e.due_ms).min()
    }

    /// Number of timers pending in a slot
    pub fn count(&self, slot: TimerSlot) -> usize {
        self.slots[slot.index()].len()
    }

    /// Earliest deadline across all slots
    pub fn next_due(&self) -> Option<u64> {
        self.slots.iter().flatten().map(|e| e.due_ms).min()
    }

    pub fn len(&self) -> usize {
        self.slots.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Vec::is_empty)
    }

    /// Remove and return the earliest timer due at or before `until_ms`
    ///
    /// Ties fire in arming order. The entry is removed before the timer is
    /// handed out, so the handler may re-arm its slot.
    pub fn pop_due(&mut self, until_ms: u64) -> Option<(u64, Timer)> {
        let (slot, pos) = self
            .slots
            .iter()
            .enumerate()
            .flat_map(|(slot, entries)| {
                entries.iter().enumerate().map(move |(pos, e)| (slot, pos, e))
            })
            .filter(|(_, _, e)| e.due_ms <= until_ms)
            .min_by_key(|(_, _, e)| (e.due_ms, e.seq))
            .map(|(slot, pos, _)| (slot, pos))?;

        let entry = self.slots[slot].swap_remove(pos);
        Some((entry.due_ms, entry.timer))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════
