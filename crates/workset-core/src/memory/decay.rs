//! Time-based activation decay.
//!
//! `decay = base_rate * elapsed_minutes * (1 - protection)` where
//! `protection = clamp(ln(access_count + 1) * 0.1, 0, max_protection)`.
//! The clamp keeps `1 - protection` positive, so activation never rises with
//! time however often an item has been accessed.

use chrono::{DateTime, Utc};
use workset_state::Item;

use crate::config::EngineConfig;

const PROTECTION_SCALE: f64 = 0.1;
const MS_PER_MINUTE: f64 = 60_000.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecayEngine {
    base_rate: f64,
    max_protection: f64,
}

impl DecayEngine {
    pub fn new(base_rate: f64, max_protection: f64) -> Self {
        Self {
            base_rate,
            max_protection,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.base_decay_rate, config.max_protection)
    }

    /// Access-frequency protection for an item, clamped to `[0, max_protection]`.
    pub fn protection(&self, access_count: u32) -> f64 {
        let raw = (f64::from(access_count) + 1.0).ln() * PROTECTION_SCALE;
        raw.clamp(0.0, self.max_protection)
    }

    /// Activation lost over `elapsed_minutes` by an item accessed `access_count` times.
    pub fn decay_amount(&self, access_count: u32, elapsed_minutes: f64) -> f64 {
        self.base_rate * elapsed_minutes.max(0.0) * (1.0 - self.protection(access_count))
    }

    /// Decay every item in place from the `last_update` anchor to `now`.
    ///
    /// A `now` earlier than `last_update` counts as zero elapsed time.
    pub fn apply(&self, items: &mut [Item], last_update: DateTime<Utc>, now: DateTime<Utc>) {
        let minutes = elapsed_minutes(last_update, now);
        if minutes == 0.0 {
            return;
        }
        for item in items.iter_mut() {
            let lost = self.decay_amount(item.access_count, minutes);
            item.activation = (item.activation - lost).clamp(0.0, 1.0);
        }
    }

    /// Decayed copy of `items`, leaving the input untouched.
    pub fn project(&self, items: &[Item], last_update: DateTime<Utc>, now: DateTime<Utc>) -> Vec<Item> {
        let mut projected = items.to_vec();
        self.apply(&mut projected, last_update, now);
        projected
    }
}

impl Default for DecayEngine {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

fn elapsed_minutes(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    let ms = (to - from).num_milliseconds();
    if ms <= 0 {
        0.0
    } else {
        ms as f64 / MS_PER_MINUTE
    }
}
