use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::database::{PlayerStore, SpinCommit, SpinHistoryLog, SpinPrecondition, StatsStore};
use crate::error::{AppError, AppResult};
use crate::models::{GameStats, Player, ProfileUpdate, SpinRecord, StatsDelta};

/// Process-local store. Used by tests and as the fallback backend when no
/// realtime database is configured; state does not survive a restart.
///
/// Every operation takes the map lock for its whole read-modify-write, so
/// per-key updates are serialized and `record_spin` is genuinely atomic.
#[derive(Default)]
pub struct MemoryDatabase {
    players: Mutex<HashMap<String, Player>>,
    spins: Mutex<Vec<SpinRecord>>,
    stats: Mutex<GameStats>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PlayerStore for MemoryDatabase {
    async fn get(&self, phone: &str) -> AppResult<Option<Player>> {
        Ok(self.players.lock().await.get(phone).cloned())
    }

    async fn create(&self, player: Player) -> AppResult<Player> {
        let mut players = self.players.lock().await;
        let stored = players
            .entry(player.phone.clone())
            .or_insert_with(|| player);
        Ok(stored.clone())
    }

    async fn update_profile(&self, phone: &str, update: &ProfileUpdate) -> AppResult<()> {
        let mut players = self.players.lock().await;
        let player = players
            .get_mut(phone)
            .ok_or_else(|| AppError::NotFound(format!("Player not found: {phone}")))?;
        if let Some(name) = &update.name {
            player.name = name.clone();
        }
        if let Some(address) = &update.address {
            player.address = Some(address.clone());
        }
        if let Some(gender) = update.gender {
            player.gender = Some(gender);
        }
        if let Some(dob) = &update.date_of_birth {
            player.date_of_birth = Some(dob.clone());
        }
        Ok(())
    }

    async fn record_spin(
        &self,
        phone: &str,
        expected: &SpinPrecondition,
        today: &str,
        now_ms: i64,
    ) -> AppResult<SpinCommit> {
        let mut players = self.players.lock().await;
        let player = players
            .get_mut(phone)
            .ok_or_else(|| AppError::StoreError(format!("Player disappeared: {phone}")))?;

        if player.spins_used != expected.spins_used
            || player.last_spin_date != expected.last_spin_date
        {
            return Ok(SpinCommit::Conflict);
        }

        let spin_number = if player.last_spin_date.as_deref() == Some(today) {
            player.spins_used + 1
        } else {
            1
        };
        player.spins_used = spin_number;
        player.last_spin_date = Some(today.to_string());
        player.last_spin_at = Some(now_ms);
        Ok(SpinCommit::Committed { spin_number })
    }

    async fn append_prize(&self, phone: &str, prize_name: &str) -> AppResult<()> {
        let mut players = self.players.lock().await;
        let player = players
            .get_mut(phone)
            .ok_or_else(|| AppError::NotFound(format!("Player not found: {phone}")))?;
        player.prizes.push(prize_name.to_string());
        Ok(())
    }

    async fn list_all(&self) -> AppResult<Vec<Player>> {
        Ok(self.players.lock().await.values().cloned().collect())
    }
}

#[async_trait]
impl SpinHistoryLog for MemoryDatabase {
    async fn append(&self, record: &SpinRecord) -> AppResult<()> {
        self.spins.lock().await.push(record.clone());
        Ok(())
    }

    async fn list_all_spins(&self) -> AppResult<Vec<SpinRecord>> {
        Ok(self.spins.lock().await.clone())
    }
}

#[async_trait]
impl StatsStore for MemoryDatabase {
    async fn get_stats(&self) -> AppResult<GameStats> {
        Ok(self.stats.lock().await.sanitized())
    }

    async fn increment_stats(&self, delta: StatsDelta) -> AppResult<()> {
        let mut stats = self.stats.lock().await;
        stats.total_players += delta.players;
        stats.total_spins += delta.spins;
        stats.total_prizes_won += delta.prizes_won;
        stats.total_scores += delta.scores;
        *stats = stats.sanitized();
        Ok(())
    }

    async fn reset_stats(&self) -> AppResult<()> {
        *self.stats.lock().await = GameStats::default();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(phone: &str) -> Player {
        Player::new(phone.to_string(), "Anh".to_string(), None, None, None, 1, 0)
    }

    #[tokio::test]
    async fn test_create_is_first_writer_wins() {
        let db = MemoryDatabase::new();
        let first = db.create(player("0912345678")).await.unwrap();
        assert_eq!(first.spins_used, 0);

        // Simulate a spin having happened between the two creates.
        let commit = db
            .record_spin(
                "0912345678",
                &SpinPrecondition {
                    spins_used: 0,
                    last_spin_date: None,
                },
                "2024-01-01",
                1,
            )
            .await
            .unwrap();
        assert_eq!(commit, SpinCommit::Committed { spin_number: 1 });

        // A racing create must not reset the counters.
        let second = db.create(player("0912345678")).await.unwrap();
        assert_eq!(second.spins_used, 1);
        assert_eq!(second.last_spin_date.as_deref(), Some("2024-01-01"));
    }

    #[tokio::test]
    async fn test_record_spin_conflict_on_stale_precondition() {
        let db = MemoryDatabase::new();
        db.create(player("0912345678")).await.unwrap();

        let stale = SpinPrecondition {
            spins_used: 0,
            last_spin_date: None,
        };
        let first = db
            .record_spin("0912345678", &stale, "2024-01-01", 1)
            .await
            .unwrap();
        assert_eq!(first, SpinCommit::Committed { spin_number: 1 });

        // Same precondition again: the counters moved, so this must lose.
        let second = db
            .record_spin("0912345678", &stale, "2024-01-01", 2)
            .await
            .unwrap();
        assert_eq!(second, SpinCommit::Conflict);
    }

    #[tokio::test]
    async fn test_record_spin_day_rollover_resets_counter() {
        let db = MemoryDatabase::new();
        let mut p = player("0912345678");
        p.spins_used = 1;
        p.last_spin_date = Some("2024-01-01".to_string());
        db.create(p.clone()).await.unwrap();

        let commit = db
            .record_spin("0912345678", &SpinPrecondition::of(&p), "2024-01-02", 5)
            .await
            .unwrap();
        // New day: 1, not 2.
        assert_eq!(commit, SpinCommit::Committed { spin_number: 1 });
        let stored = db.get("0912345678").await.unwrap().unwrap();
        assert_eq!(stored.spins_used, 1);
        assert_eq!(stored.last_spin_date.as_deref(), Some("2024-01-02"));
        assert_eq!(stored.last_spin_at, Some(5));
    }

    #[tokio::test]
    async fn test_profile_update_never_touches_game_state() {
        let db = MemoryDatabase::new();
        let mut p = player("0912345678");
        p.spins_used = 1;
        p.last_spin_date = Some("2024-01-01".to_string());
        p.prizes.push("Voucher".to_string());
        db.create(p).await.unwrap();

        db.update_profile(
            "0912345678",
            &ProfileUpdate {
                name: Some("Binh".to_string()),
                address: Some("Hà Nội".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let stored = db.get("0912345678").await.unwrap().unwrap();
        assert_eq!(stored.name, "Binh");
        assert_eq!(stored.spins_used, 1);
        assert_eq!(stored.prizes, vec!["Voucher"]);
    }

    #[tokio::test]
    async fn test_stats_roundtrip() {
        let db = MemoryDatabase::new();
        db.increment_stats(StatsDelta {
            players: 1,
            spins: 2,
            prizes_won: 2,
            scores: 0,
        })
        .await
        .unwrap();
        let stats = db.get_stats().await.unwrap();
        assert_eq!(stats.total_players, 1);
        assert_eq!(stats.total_spins, 2);

        db.reset_stats().await.unwrap();
        let stats = db.get_stats().await.unwrap();
        assert_eq!(stats.total_spins, 0);
    }
}
