use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One player per unique phone number. Field names match the realtime
/// database document shape (camelCase).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    /// Normalized digits; the record's identity, immutable after creation.
    pub phone: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<String>,
    #[serde(default)]
    pub total_score: i64,
    /// Spins consumed on `last_spin_date`. Meaningless for any other day;
    /// the effective quota is always derived via `can_spin`.
    #[serde(default)]
    pub spins_used: u32,
    #[serde(default = "default_max_spins")]
    pub max_spins_per_day: u32,
    /// Calendar date (YYYY-MM-DD, Vietnam time) of the most recent spin.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_spin_date: Option<String>,
    /// Prize names ever won, append-only.
    #[serde(default)]
    pub prizes: Vec<String>,
    pub created_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_spin_at: Option<i64>,
}

fn default_max_spins() -> u32 {
    1
}

impl Player {
    pub fn new(
        phone: String,
        name: String,
        address: Option<String>,
        gender: Option<Gender>,
        date_of_birth: Option<String>,
        max_spins_per_day: u32,
        created_at: i64,
    ) -> Self {
        Self {
            phone,
            name,
            address,
            gender,
            date_of_birth,
            total_score: 0,
            spins_used: 0,
            max_spins_per_day: max_spins_per_day.max(1),
            last_spin_date: None,
            prizes: Vec::new(),
            created_at,
            last_spin_at: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
}

/// Mutable profile fields. Game-state fields are never touched by a
/// profile update.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<String>,
}

/// Prize catalog entry. Read-only from the game engine's perspective;
/// the catalog is replaced wholesale on refresh.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Prize {
    pub id: String,
    pub name: String,
    pub icon: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Non-negative selection weight, not necessarily summing to 100.
    pub probability: f64,
    pub color: String,
    pub description: String,
    pub category: String,
}

/// Immutable history log entry, one per accepted spin.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SpinRecord {
    /// `spin_{timestamp}_{phone}_{spin_number}`; unique even under rapid
    /// repeated spins.
    pub id: String,
    pub phone: String,
    /// The player's name at spin time, denormalized for display.
    pub name: String,
    pub prize_name: String,
    pub prize_id: String,
    pub timestamp: i64,
    /// The player's spin sequence number for that day (spins_used after
    /// the increment).
    pub spin_number: u32,
}

impl SpinRecord {
    pub fn new(player: &Player, prize: &Prize, timestamp: i64, spin_number: u32) -> Self {
        Self {
            id: format!("spin_{}_{}_{}", timestamp, player.phone, spin_number),
            phone: player.phone.clone(),
            name: player.name.clone(),
            prize_name: prize.name.clone(),
            prize_id: prize.id.clone(),
            timestamp,
            spin_number,
        }
    }
}

/// Game-wide aggregate counters, updated via additive increments only.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GameStats {
    #[serde(default)]
    pub total_players: i64,
    #[serde(default)]
    pub total_spins: i64,
    #[serde(default)]
    pub total_prizes_won: i64,
    #[serde(default)]
    pub total_scores: i64,
}

impl GameStats {
    /// Clamp whatever was stored to non-negative integers.
    pub fn sanitized(self) -> Self {
        Self {
            total_players: self.total_players.max(0),
            total_spins: self.total_spins.max(0),
            total_prizes_won: self.total_prizes_won.max(0),
            total_scores: self.total_scores.max(0),
        }
    }
}

/// Additive stats update.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatsDelta {
    pub players: i64,
    pub spins: i64,
    pub prizes_won: i64,
    pub scores: i64,
}

/// Result of the quota derivation, re-derivable from stored state alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Eligibility {
    pub eligible: bool,
    pub remaining: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_tolerates_sparse_documents() {
        // Old documents may miss game-state fields entirely.
        let player: Player = serde_json::from_str(
            r#"{"phone":"0912345678","name":"Anh","createdAt":1700000000000}"#,
        )
        .unwrap();
        assert_eq!(player.spins_used, 0);
        assert_eq!(player.max_spins_per_day, 1);
        assert!(player.prizes.is_empty());
        assert!(player.last_spin_date.is_none());
    }

    #[test]
    fn test_stats_sanitized_clamps_negatives() {
        let stats = GameStats {
            total_players: -3,
            total_spins: 7,
            total_prizes_won: -1,
            total_scores: 0,
        }
        .sanitized();
        assert_eq!(stats.total_players, 0);
        assert_eq!(stats.total_spins, 7);
        assert_eq!(stats.total_prizes_won, 0);
    }

    #[test]
    fn test_spin_record_id_is_unique_per_sequence() {
        let player = Player::new("0912345678".into(), "Anh".into(), None, None, None, 1, 0);
        let prize = Prize {
            id: "p1".into(),
            name: "Voucher".into(),
            icon: "🎁".into(),
            image_url: None,
            probability: 10.0,
            color: "#FFFFFF".into(),
            description: String::new(),
            category: "Khác".into(),
        };
        let a = SpinRecord::new(&player, &prize, 1700000000000, 1);
        let b = SpinRecord::new(&player, &prize, 1700000000000, 2);
        assert_ne!(a.id, b.id);
        assert_eq!(a.id, "spin_1700000000000_0912345678_1");
    }
}
