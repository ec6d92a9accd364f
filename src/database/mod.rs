use std::sync::Arc;

use async_trait::async_trait;

use crate::error::AppResult;
use crate::models::{GameStats, Player, ProfileUpdate, SpinRecord, StatsDelta};

pub mod firebase;
pub mod memory;

pub use firebase::FirebaseDatabase;
pub use memory::MemoryDatabase;

/// The `(spins_used, last_spin_date)` pair the caller observed when it
/// decided the player was eligible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpinPrecondition {
    pub spins_used: u32,
    pub last_spin_date: Option<String>,
}

impl SpinPrecondition {
    pub fn of(player: &Player) -> Self {
        Self {
            spins_used: player.spins_used,
            last_spin_date: player.last_spin_date.clone(),
        }
    }
}

/// Result of the conditional spin commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpinCommit {
    /// The counters were updated; `spin_number` is `spins_used` after the
    /// increment (1 on a day rollover).
    Committed { spin_number: u32 },
    /// The precondition no longer held: another request recorded a spin
    /// for this player since it was read.
    Conflict,
}

#[async_trait]
pub trait PlayerStore: Send + Sync {
    async fn get(&self, phone: &str) -> AppResult<Option<Player>>;

    /// Create-if-absent. Returns the stored record, which is the existing
    /// one when another request created the player first.
    async fn create(&self, player: Player) -> AppResult<Player>;

    /// Merge profile fields only; game-state fields are untouched.
    async fn update_profile(&self, phone: &str, update: &ProfileUpdate) -> AppResult<()>;

    /// Atomic increment-with-precondition. Commits `spins_used` (with day
    /// rollover), `last_spin_date` and `last_spin_at` all-or-nothing, but
    /// only if the stored counters still match `expected`.
    async fn record_spin(
        &self,
        phone: &str,
        expected: &SpinPrecondition,
        today: &str,
        now_ms: i64,
    ) -> AppResult<SpinCommit>;

    /// Append a won prize's name to the player's prize log.
    async fn append_prize(&self, phone: &str, prize_name: &str) -> AppResult<()>;

    async fn list_all(&self) -> AppResult<Vec<Player>>;
}

#[async_trait]
pub trait SpinHistoryLog: Send + Sync {
    async fn append(&self, record: &SpinRecord) -> AppResult<()>;
    async fn list_all_spins(&self) -> AppResult<Vec<SpinRecord>>;
}

#[async_trait]
pub trait StatsStore: Send + Sync {
    async fn get_stats(&self) -> AppResult<GameStats>;
    async fn increment_stats(&self, delta: StatsDelta) -> AppResult<()>;
    async fn reset_stats(&self) -> AppResult<()>;
}

/// Umbrella over the three store facets; both backends implement all of
/// them against the same underlying database.
pub trait GameDatabase: PlayerStore + SpinHistoryLog + StatsStore {}

impl<T: PlayerStore + SpinHistoryLog + StatsStore> GameDatabase for T {}

pub type SharedDatabase = Arc<dyn GameDatabase>;
