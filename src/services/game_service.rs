use rand::Rng;

use crate::database::{
    PlayerStore, SharedDatabase, SpinCommit, SpinHistoryLog, SpinPrecondition, StatsStore,
};
use crate::error::{AppError, AppResult};
use crate::models::{
    GameStats, Player, ProfileUpdate, SpinOutcome, SpinRecord, SpinRequest, StatsDelta,
};
use crate::services::spin_rules::{can_spin, select_prize};
use crate::services::sync_service::SyncService;
use crate::services::wheel_service::WheelConfigService;
use crate::utils::{now_millis, validate_phone, vietnam_today};

const DEFAULT_RECENT_LIMIT: usize = 1000;

/// Drives a spin attempt end to end: registration-or-lookup, quota check,
/// weighted selection, durable recording, then a fire-and-forget mirror
/// republication.
#[derive(Clone)]
pub struct GameService {
    db: SharedDatabase,
    wheel: WheelConfigService,
    sync: SyncService,
    max_spins_per_day: u32,
}

impl GameService {
    pub fn new(
        db: SharedDatabase,
        wheel: WheelConfigService,
        sync: SyncService,
        max_spins_per_day: u32,
    ) -> Self {
        Self {
            db,
            wheel,
            sync,
            max_spins_per_day: max_spins_per_day.max(1),
        }
    }

    pub async fn spin(&self, request: SpinRequest) -> AppResult<SpinOutcome> {
        self.spin_on(request, &vietnam_today(), now_millis()).await
    }

    async fn spin_on(
        &self,
        request: SpinRequest,
        today: &str,
        now_ms: i64,
    ) -> AppResult<SpinOutcome> {
        // Input is rejected before any state mutation.
        let name = request.name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::ValidationError(
                "Name must not be empty".to_string(),
            ));
        }
        let phone = validate_phone(&request.phone)?;

        // LOOKUP, then CREATE or UPDATE. Absence is first-time registration,
        // not an error; an update merges profile fields only.
        let (mut player, created) = match self.db.get(&phone).await? {
            Some(_) => {
                let update = ProfileUpdate {
                    name: Some(name.clone()),
                    address: request.address.clone(),
                    gender: request.gender,
                    date_of_birth: request.date_of_birth.clone(),
                };
                self.db.update_profile(&phone, &update).await?;
                let player = self.db.get(&phone).await?.ok_or_else(|| {
                    AppError::StoreError(format!("player disappeared after update: {phone}"))
                })?;
                (player, false)
            }
            None => {
                let fresh = Player::new(
                    phone.clone(),
                    name.clone(),
                    request.address.clone(),
                    request.gender,
                    request.date_of_birth.clone(),
                    self.max_spins_per_day,
                    now_ms,
                );
                let stored = self.db.create(fresh).await?;
                // A lost creation race returns the other writer's record.
                let created = stored.created_at == now_ms;
                (stored, created)
            }
        };

        // ELIGIBILITY_CHECK must short-circuit before any selection; the
        // player is never shown a prize they are not entitled to.
        let eligibility = can_spin(&player, today);
        if !eligibility.eligible {
            return Ok(SpinOutcome::blocked());
        }

        // SELECTING over the current catalog snapshot.
        let catalog = self.wheel.get_configuration().await?;
        if catalog.is_empty() {
            return Err(AppError::CatalogUnavailable(
                "catalog is empty".to_string(),
            ));
        }
        let roll = rand::thread_rng().gen_range(0.0..100.0);
        let prize = select_prize(&catalog, roll)
            .ok_or_else(|| AppError::CatalogUnavailable("no selectable prize".to_string()))?
            .clone();

        // RECORDING: the conditional counter commit is what settles the
        // quota under concurrent requests. On a lost race, eligibility is
        // re-evaluated from fresh state instead of blindly retrying, so a
        // second prize is never granted.
        let spin_number = match self
            .db
            .record_spin(&phone, &SpinPrecondition::of(&player), today, now_ms)
            .await?
        {
            SpinCommit::Committed { spin_number } => spin_number,
            SpinCommit::Conflict => {
                let fresh = self.db.get(&phone).await?.ok_or_else(|| {
                    AppError::StoreError(format!("player disappeared: {phone}"))
                })?;
                if !can_spin(&fresh, today).eligible {
                    return Ok(SpinOutcome::blocked());
                }
                match self
                    .db
                    .record_spin(&phone, &SpinPrecondition::of(&fresh), today, now_ms)
                    .await?
                {
                    SpinCommit::Committed { spin_number } => spin_number,
                    SpinCommit::Conflict => {
                        return Err(AppError::StoreError(
                            "spin commit contention, please try again".to_string(),
                        ));
                    }
                }
            }
        };

        // The remaining sub-writes are independent and best-effort: the
        // counters above are the source of quota truth, the rest is
        // display/audit state.
        player.name = name;
        let record = SpinRecord::new(&player, &prize, now_ms, spin_number);
        if let Err(e) = self.db.append(&record).await {
            log::error!("Failed to append spin record {}: {e}", record.id);
        }
        if let Err(e) = self.db.append_prize(&phone, &prize.name).await {
            log::error!("Failed to append prize to player {phone}: {e}");
        }
        let delta = StatsDelta {
            players: i64::from(created),
            spins: 1,
            prizes_won: 1,
            scores: 0,
        };
        if let Err(e) = self.db.increment_stats(delta).await {
            log::error!("Failed to update game stats: {e}");
        }

        // MIRRORING is out-of-band; the caller never waits on it.
        self.sync.request_sync();

        Ok(SpinOutcome::Won {
            remaining_today: player.max_spins_per_day.saturating_sub(spin_number),
            spin_number,
            prize,
        })
    }

    /// Recent winners, newest first.
    pub async fn recent_spins(&self, limit: Option<usize>) -> AppResult<Vec<SpinRecord>> {
        let mut spins = self.db.list_all_spins().await?;
        spins.sort_by_key(|s| std::cmp::Reverse(s.timestamp));
        spins.truncate(limit.unwrap_or(DEFAULT_RECENT_LIMIT));
        Ok(spins)
    }

    pub async fn stats(&self) -> AppResult<GameStats> {
        self.db.get_stats().await
    }

    /// Administrative reset of the game-wide aggregates. Player records and
    /// the spin history are never deleted by normal operation.
    pub async fn reset_stats(&self) -> AppResult<()> {
        self.db.reset_stats().await
    }
}
