use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde_json::json;

use crate::config::FirebaseConfig;
use crate::database::{PlayerStore, SpinCommit, SpinHistoryLog, SpinPrecondition, StatsStore};
use crate::error::{AppError, AppResult};
use crate::models::{GameStats, Player, ProfileUpdate, SpinRecord, StatsDelta};

const PLAYERS_PATH: &str = "players";
const SPINS_PATH: &str = "recentSpins";
const STATS_PATH: &str = "gameStats";

/// Firebase Realtime Database REST backend.
///
/// Conditional writes use the RTDB ETag protocol: a read with
/// `X-Firebase-ETag: true` returns the location's ETag, and a write with
/// `if-match` fails with 412 when the location changed in between. That is
/// what makes `record_spin` an atomic increment-with-precondition.
pub struct FirebaseDatabase {
    client: Client,
    config: FirebaseConfig,
}

impl FirebaseDatabase {
    pub fn new(config: FirebaseConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn url(&self, path: &str) -> String {
        let base = self.config.database_url.trim_end_matches('/');
        match &self.config.auth_token {
            Some(token) => format!("{base}/{path}.json?auth={token}"),
            None => format!("{base}/{path}.json"),
        }
    }

    fn store_err(context: &str, err: impl std::fmt::Display) -> AppError {
        AppError::StoreError(format!("{context}: {err}"))
    }

    /// GET a location together with its ETag.
    async fn get_with_etag<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
    ) -> AppResult<(Option<T>, String)> {
        let response = self
            .client
            .get(self.url(path))
            .header("X-Firebase-ETag", "true")
            .send()
            .await
            .map_err(|e| Self::store_err("read failed", e))?;

        if !response.status().is_success() {
            return Err(AppError::StoreError(format!(
                "read of {path} returned {}",
                response.status()
            )));
        }

        let etag = response
            .headers()
            .get("ETag")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        let value: serde_json::Value = response
            .json()
            .await
            .map_err(|e| Self::store_err("read body failed", e))?;
        if value.is_null() {
            return Ok((None, etag));
        }
        let parsed = serde_json::from_value(value)
            .map_err(|e| Self::store_err("malformed document", e))?;
        Ok((Some(parsed), etag))
    }

    async fn get_value<T: serde::de::DeserializeOwned>(&self, path: &str) -> AppResult<Option<T>> {
        let (value, _etag) = self.get_with_etag(path).await?;
        Ok(value)
    }

    /// PUT guarded by the ETag captured at read time. `Ok(false)` means the
    /// location changed since the read.
    async fn put_if_match<T: Serialize>(&self, path: &str, etag: &str, body: &T) -> AppResult<bool> {
        let response = self
            .client
            .put(self.url(path))
            .header("if-match", etag)
            .json(body)
            .send()
            .await
            .map_err(|e| Self::store_err("conditional write failed", e))?;

        if response.status() == StatusCode::PRECONDITION_FAILED {
            return Ok(false);
        }
        if !response.status().is_success() {
            return Err(AppError::StoreError(format!(
                "conditional write of {path} returned {}",
                response.status()
            )));
        }
        Ok(true)
    }

    async fn put<T: Serialize>(&self, path: &str, body: &T) -> AppResult<()> {
        let response = self
            .client
            .put(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(|e| Self::store_err("write failed", e))?;
        if !response.status().is_success() {
            return Err(AppError::StoreError(format!(
                "write of {path} returned {}",
                response.status()
            )));
        }
        Ok(())
    }

    async fn patch<T: Serialize>(&self, path: &str, body: &T) -> AppResult<()> {
        let response = self
            .client
            .patch(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(|e| Self::store_err("patch failed", e))?;
        if !response.status().is_success() {
            return Err(AppError::StoreError(format!(
                "patch of {path} returned {}",
                response.status()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl PlayerStore for FirebaseDatabase {
    async fn get(&self, phone: &str) -> AppResult<Option<Player>> {
        self.get_value(&format!("{PLAYERS_PATH}/{phone}")).await
    }

    async fn create(&self, player: Player) -> AppResult<Player> {
        let path = format!("{PLAYERS_PATH}/{}", player.phone);
        let (existing, etag) = self.get_with_etag::<Player>(&path).await?;
        if let Some(existing) = existing {
            return Ok(existing);
        }
        if self.put_if_match(&path, &etag, &player).await? {
            return Ok(player);
        }
        // Lost the creation race; the other writer's record wins.
        self.get(&player.phone)
            .await?
            .ok_or_else(|| AppError::StoreError(format!("player vanished after create race: {}", player.phone)))
    }

    async fn update_profile(&self, phone: &str, update: &ProfileUpdate) -> AppResult<()> {
        self.patch(&format!("{PLAYERS_PATH}/{phone}"), update).await
    }

    async fn record_spin(
        &self,
        phone: &str,
        expected: &SpinPrecondition,
        today: &str,
        now_ms: i64,
    ) -> AppResult<SpinCommit> {
        let path = format!("{PLAYERS_PATH}/{phone}");
        let (player, etag) = self.get_with_etag::<Player>(&path).await?;
        let mut player =
            player.ok_or_else(|| AppError::StoreError(format!("player disappeared: {phone}")))?;

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

        if self.put_if_match(&path, &etag, &player).await? {
            Ok(SpinCommit::Committed { spin_number })
        } else {
            Ok(SpinCommit::Conflict)
        }
    }

    async fn append_prize(&self, phone: &str, prize_name: &str) -> AppResult<()> {
        let path = format!("{PLAYERS_PATH}/{phone}");
        let player: Player = self
            .get_value(&path)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Player not found: {phone}")))?;
        let mut prizes = player.prizes;
        prizes.push(prize_name.to_string());
        self.patch(&path, &json!({ "prizes": prizes })).await
    }

    async fn list_all(&self) -> AppResult<Vec<Player>> {
        let map: Option<HashMap<String, Player>> = self.get_value(PLAYERS_PATH).await?;
        Ok(map.map(|m| m.into_values().collect()).unwrap_or_default())
    }
}

#[async_trait]
impl SpinHistoryLog for FirebaseDatabase {
    async fn append(&self, record: &SpinRecord) -> AppResult<()> {
        // Keyed by the derived id, so a retried append is idempotent.
        self.put(&format!("{SPINS_PATH}/{}", record.id), record).await
    }

    async fn list_all_spins(&self) -> AppResult<Vec<SpinRecord>> {
        let map: Option<HashMap<String, SpinRecord>> = self.get_value(SPINS_PATH).await?;
        Ok(map.map(|m| m.into_values().collect()).unwrap_or_default())
    }
}

#[async_trait]
impl StatsStore for FirebaseDatabase {
    async fn get_stats(&self) -> AppResult<GameStats> {
        let stats: Option<GameStats> = self.get_value(STATS_PATH).await?;
        Ok(stats.unwrap_or_default().sanitized())
    }

    async fn increment_stats(&self, delta: StatsDelta) -> AppResult<()> {
        // The aggregate row is display-only, not quota truth; plain
        // read-then-patch is accepted here.
        let current = self.get_stats().await?;
        let updated = GameStats {
            total_players: current.total_players + delta.players,
            total_spins: current.total_spins + delta.spins,
            total_prizes_won: current.total_prizes_won + delta.prizes_won,
            total_scores: current.total_scores + delta.scores,
        }
        .sanitized();
        self.patch(STATS_PATH, &updated).await
    }

    async fn reset_stats(&self) -> AppResult<()> {
        self.put(STATS_PATH, &GameStats::default()).await
    }
}
