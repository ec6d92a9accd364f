use crate::models::{Eligibility, Player, Prize};

/// Derive today's remaining quota from stored state alone.
///
/// A day boundary implicitly resets the quota: when `last_spin_date` is not
/// `today`, the stored `spins_used` belongs to an earlier day and the full
/// quota applies. No reset write ever happens.
pub fn can_spin(player: &Player, today: &str) -> Eligibility {
    let remaining = if player.last_spin_date.as_deref() == Some(today) {
        player.max_spins_per_day.saturating_sub(player.spins_used)
    } else {
        player.max_spins_per_day
    };
    Eligibility {
        eligible: remaining > 0,
        remaining,
    }
}

/// Weighted prize selection over the catalog snapshot.
///
/// Zero-weight entries are filtered out before anything else, so they can
/// never be hit through rounding. The remaining weights are normalized to
/// sum to 100 regardless of what the catalog authors configured, and the
/// filtered set is walked in catalog order accumulating normalized weight
/// until `roll <= cumulative`. `roll` is injected (uniform in `[0, 100)`)
/// so tests can pin the draw.
pub fn select_prize<'a>(catalog: &'a [Prize], roll: f64) -> Option<&'a Prize> {
    let available: Vec<&Prize> = catalog.iter().filter(|p| p.probability > 0.0).collect();

    if available.is_empty() {
        // Defensive default; the calling contract assumes a non-empty catalog.
        return catalog.first();
    }

    let total: f64 = available.iter().map(|p| p.probability).sum();
    let factor = 100.0 / total;

    let mut cumulative = 0.0;
    for prize in &available {
        cumulative += prize.probability * factor;
        if roll <= cumulative {
            return Some(prize);
        }
    }

    // Floating point drift can leave the last segment a hair short of 100.
    available.last().copied()
}
