//! Sprite Regions
//!
//! Named sub-ranges of the source registered with the engine. Every channel
//! derives two trim regions from `skipFront`/`playFor` plus the implicit
//! full-length default region.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Region used for continuous (engine-looped) playback
pub const LOOPED: &str = "looped";

/// Region used for single-shot crossfade and random plays
pub const ONCE: &str = "once";

/// Implicit region spanning the whole source
pub const DEFAULT: &str = "__default";

// ═══════════════════════════════════════════════════════════════════════════════
// SPRITE REGION
// ═══════════════════════════════════════════════════════════════════════════════

/// Sub-range of the source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpriteRegion {
    /// Start offset into the source (ms)
    pub start_ms: u64,
    /// Region length (ms)
    pub length_ms: u64,
    /// Engine-level looping
    pub looping: bool,
}

impl SpriteRegion {
    pub fn new(start_ms: u64, length_ms: u64, looping: bool) -> Self {
        Self {
            start_ms,
            length_ms,
            looping,
        }
    }

    /// End offset into the source (ms)
    #[inline]
    pub fn end_ms(&self) -> u64 {
        self.start_ms.saturating_add(self.length_ms)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TRIM WINDOW
// ═══════════════════════════════════════════════════════════════════════════════

/// Normalized `[skipFront, playFor]` window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrimWindow {
    pub skip_front_ms: u64,
    pub play_for_ms: u64,
}

impl TrimWindow {
    /// Normalize trim settings against the source duration
    ///
    /// `skip_front_ms` is clamped to the duration once it is known. An
    /// undefined or zero `play_for_ms` becomes the remainder of the source
    /// after the skipped front.
    pub fn derive(skip_front_ms: u64, play_for_ms: Option<u64>, duration_ms: u64) -> Self {
        let skip_front_ms = if duration_ms > 0 {
            skip_front_ms.min(duration_ms)
        } else {
            skip_front_ms
        };

        let play_for_ms = match play_for_ms {
            Some(ms) if ms > 0 => ms,
            _ => duration_ms.saturating_sub(skip_front_ms),
        };

        Self {
            skip_front_ms,
            play_for_ms,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SPRITE MAP
// ═══════════════════════════════════════════════════════════════════════════════

/// Region name → region mapping registered with the engine
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpriteMap {
    regions: BTreeMap<String, SpriteRegion>,
}

impl SpriteMap {
    /// Empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge user regions with the default region
    ///
    /// The default region always spans the whole source, even when the user
    /// map carries its own `__default` entry.
    pub fn merge(user_regions: &SpriteMap, duration_ms: u64) -> Self {
        let mut map = user_regions.clone();
        map.insert(DEFAULT, SpriteRegion::new(0, duration_ms, false));
        map
    }

    /// Derive the trim regions for a channel
    ///
    /// `looped` and `once` share the same window with the loop flag set.
    pub fn derive(window: TrimWindow, user_regions: &SpriteMap, duration_ms: u64) -> Self {
        let mut trimmed = user_regions.clone();
        let region = SpriteRegion::new(window.skip_front_ms, window.play_for_ms, true);
        trimmed.insert(LOOPED, region);
        trimmed.insert(ONCE, region);
        Self::merge(&trimmed, duration_ms)
    }

    pub fn insert(&mut self, name: impl Into<String>, region: SpriteRegion) {
        self.regions.insert(name.into(), region);
    }

    pub fn get(&self, name: &str) -> Option<&SpriteRegion> {
        self.regions.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.regions.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SpriteRegion)> {
        self.regions.iter().map(|(name, region)| (name.as_str(), region))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_defaults_to_rest_of_source() {
        let window = TrimWindow::derive(2000, None, 10_000);
        assert_eq!(window.skip_front_ms, 2000);
        assert_eq!(window.play_for_ms, 8000);

        let window = TrimWindow::derive(0, Some(0), 10_000);
        assert_eq!(window.play_for_ms, 10_000);
    }

    #[test]
    fn test_window_clamps_skip_front() {
        let window = TrimWindow::derive(15_000, None, 10_000);
        assert_eq!(window.skip_front_ms, 10_000);
        assert_eq!(window.play_for_ms, 0);
    }

    #[test]
    fn test_window_before_load() {
        let window = TrimWindow::derive(500, None, 0);
        assert_eq!(window.skip_front_ms, 500);
        assert_eq!(window.play_for_ms, 0);
    }

    #[test]
    fn test_derive_regions() {
        let window = TrimWindow::derive(1000, Some(5000), 10_000);
        let map = SpriteMap::derive(window, &SpriteMap::new(), 10_000);

        assert_eq!(map.len(), 3);
        assert_eq!(map.get(LOOPED), Some(&SpriteRegion::new(1000, 5000, true)));
        assert_eq!(map.get(ONCE), Some(&SpriteRegion::new(1000, 5000, true)));
        assert_eq!(map.get(DEFAULT), Some(&SpriteRegion::new(0, 10_000, false)));
        assert_eq!(map.get(LOOPED).map(|r| r.end_ms()), Some(6000));
    }

    #[test]
    fn test_default_region_wins_merge() {
        let mut user = SpriteMap::new();
        user.insert("intro", SpriteRegion::new(0, 1200, false));
        user.insert(DEFAULT, SpriteRegion::new(50, 50, true));

        let map = SpriteMap::merge(&user, 8000);
        assert!(map.contains("intro"));
        assert_eq!(map.get(DEFAULT), Some(&SpriteRegion::new(0, 8000, false)));
    }
}
