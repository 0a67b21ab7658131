//! Presence palette allocator.
//!
//! Colors come from `frames::consts::PRESENCE_PALETTE`. The first palette
//! entry not held by an active member wins, so small sessions get stable,
//! predictable colors. Once every entry is taken, a random entry is reused.

use std::collections::HashSet;

use frames::consts::PRESENCE_PALETTE;
use rand::seq::IndexedRandom;

/// Pick a display color distinct from `in_use` where possible.
#[must_use]
pub fn allocate(in_use: &HashSet<&str>) -> String {
    if let Some(free) = PRESENCE_PALETTE.iter().find(|c| !in_use.contains(*c)) {
        return (*free).to_owned();
    }
    PRESENCE_PALETTE
        .choose(&mut rand::rng())
        .copied()
        .unwrap_or(PRESENCE_PALETTE[0])
        .to_owned()
}

#[cfg(test)]
#[path = "palette_test.rs"]
mod tests;
