//! Fade Envelope Computation
//!
//! Resolves effective fade-in/fade-out lengths and the fade-out start offset
//! for a single play instance. Ramps themselves are linear and run inside the
//! engine.

/// Fade settings of a channel, resolved against its current play length
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FadeEnvelope {
    /// Configured fade-in (`None` = disabled)
    pub fade_in_ms: Option<u64>,
    /// Configured fade-out (`None` = disabled)
    pub fade_out_ms: Option<u64>,
    /// Length of one play instance (normalized playFor)
    pub play_length_ms: u64,
}

impl FadeEnvelope {
    pub fn new(fade_in_ms: Option<u64>, fade_out_ms: Option<u64>, play_length_ms: u64) -> Self {
        Self {
            fade_in_ms,
            fade_out_ms,
            play_length_ms,
        }
    }

    /// Effective fade-in length; `min` replaces a disabled setting
    #[inline]
    pub fn fade_in(&self, min: u64) -> u64 {
        self.fade_in_ms.unwrap_or(min)
    }

    /// Effective fade-out length; `min` replaces a disabled setting
    #[inline]
    pub fn fade_out(&self, min: u64) -> u64 {
        self.fade_out_ms.unwrap_or(min)
    }

    /// Offset from play start at which the fade-out begins
    ///
    /// `None` when there is no fade-out or it would start at or before the
    /// play start.
    pub fn fade_out_start(&self, min: u64) -> Option<u64> {
        let fade_out = self.fade_out(min);
        if fade_out == 0 {
            return None;
        }
        self.play_length_ms
            .checked_sub(fade_out)
            .filter(|&start| start > 0)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fade_out_start() {
        let envelope = FadeEnvelope::new(None, Some(1000), 5000);
        assert_eq!(envelope.fade_out_start(0), Some(4000));
    }

    #[test]
    fn test_disabled_fade_uses_min() {
        let envelope = FadeEnvelope::new(None, None, 8000);
        assert_eq!(envelope.fade_in(0), 0);
        assert_eq!(envelope.fade_out_start(0), None);
        assert_eq!(envelope.fade_in(1000), 1000);
        assert_eq!(envelope.fade_out_start(1000), Some(7000));
    }

    #[test]
    fn test_zero_fade_ignores_min() {
        let envelope = FadeEnvelope::new(Some(0), Some(0), 8000);
        assert_eq!(envelope.fade_in(1000), 0);
        assert_eq!(envelope.fade_out_start(1000), None);
    }

    #[test]
    fn test_fade_longer_than_play() {
        let envelope = FadeEnvelope::new(None, Some(3000), 3000);
        assert_eq!(envelope.fade_out_start(0), None);

        let envelope = FadeEnvelope::new(None, Some(4000), 3000);
        assert_eq!(envelope.fade_out_start(0), None);
    }
}
