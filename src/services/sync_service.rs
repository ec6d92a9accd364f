use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::sync::{Mutex, mpsc};

use crate::config::SyncSheetConfig;
use crate::database::{PlayerStore, SharedDatabase, SpinHistoryLog};
use crate::error::AppResult;
use crate::models::{Gender, Player, SpinRecord};
use crate::utils::format_vietnam_time;

/// Destination-side spreadsheet operations. The sink has no transactional
/// update primitive, which is why the mirror policy below is full replace.
#[async_trait]
pub trait SheetsWriter: Send + Sync {
    /// Clear the sheet entirely, then write all rows (header included) in
    /// one batch.
    async fn replace_all(&self, sheet: &str, rows: Vec<Vec<Value>>) -> AppResult<()>;

    /// Append rows after the current last row.
    async fn append_rows(&self, sheet: &str, rows: Vec<Vec<Value>>) -> AppResult<()>;
}

/// Read side of the same spreadsheet API. Rows come back as strings the
/// way the values endpoint returns them; trailing empty cells are absent.
#[async_trait]
pub trait SheetsReader: Send + Sync {
    async fn read_rows(&self, sheet: &str) -> AppResult<Vec<Vec<String>>>;
}

const SPINS_HEADER: [&str; 8] = [
    "No.",
    "Timestamp",
    "Time",
    "Phone",
    "Player",
    "Prize",
    "Spin #",
    "Notes",
];

const PLAYERS_HEADER: [&str; 8] = [
    "No.",
    "Phone",
    "Name",
    "Address",
    "Gender",
    "Date of birth",
    "Spins used",
    "Last spin",
];

/// Republishes the authoritative store into the mirror spreadsheet.
///
/// The mirror is derived and non-authoritative: each sync reads the
/// complete state at call time and clear-rewrites both sheets, so a failed
/// write leaves either the old complete table or a new complete one, never
/// a mix. Overlapping invocations are collapsed by an in-process
/// single-flight flag; the in-flight sync covers the later caller's data
/// up to its own read point (an accepted staleness window).
#[derive(Clone)]
pub struct SyncService {
    db: SharedDatabase,
    writer: Arc<dyn SheetsWriter>,
    spins_sheet: String,
    players_sheet: String,
    syncing: Arc<AtomicBool>,
    tx: mpsc::Sender<()>,
    rx: Arc<Mutex<Option<mpsc::Receiver<()>>>>,
}

impl SyncService {
    pub fn new(db: SharedDatabase, writer: Arc<dyn SheetsWriter>, config: &SyncSheetConfig) -> Self {
        let spins_sheet = if config.spins_sheet_name.is_empty() {
            "RecentSpins".to_string()
        } else {
            config.spins_sheet_name.clone()
        };
        let players_sheet = if config.players_sheet_name.is_empty() {
            format!("{spins_sheet}_Players")
        } else {
            config.players_sheet_name.clone()
        };
        let (tx, rx) = mpsc::channel(8);
        Self {
            db,
            writer,
            spins_sheet,
            players_sheet,
            syncing: Arc::new(AtomicBool::new(false)),
            tx,
            rx: Arc::new(Mutex::new(Some(rx))),
        }
    }

    /// Fire-and-forget: queue a sync for the background worker. A full
    /// queue means a rewrite is already pending that will read state newer
    /// than now, so the request is dropped.
    pub fn request_sync(&self) {
        match self.tx.try_send(()) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(())) => {
                log::debug!("Mirror sync queue full, dropping request");
            }
            Err(mpsc::error::TrySendError::Closed(())) => {
                log::warn!("Mirror sync worker is gone, dropping request");
            }
        }
    }

    /// Background worker loop; consumes queued sync requests one at a time.
    /// Returns immediately if the worker was already taken.
    pub async fn run_worker(&self) {
        let Some(mut rx) = self.rx.lock().await.take() else {
            log::warn!("Mirror sync worker already running");
            return;
        };
        while rx.recv().await.is_some() {
            if let Err(e) = self.sync_all().await {
                log::error!("Mirror sync failed: {e}");
            }
        }
    }

    /// Full mirror rewrite. Returns `false` when another sync was already
    /// in flight (reported as success without performing work).
    pub async fn sync_all(&self) -> AppResult<bool> {
        if self
            .syncing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            log::debug!("Mirror sync already in progress, skipping");
            return Ok(false);
        }

        let result = self.sync_inner().await;
        self.syncing.store(false, Ordering::SeqCst);
        result.map(|()| true)
    }

    async fn sync_inner(&self) -> AppResult<()> {
        let spins = self.db.list_all_spins().await?;
        let players = self.db.list_all().await?;
        log::info!(
            "Mirroring {} spins and {} players to sheets",
            spins.len(),
            players.len()
        );

        self.writer
            .replace_all(&self.spins_sheet, spin_rows(spins))
            .await?;
        self.writer
            .replace_all(&self.players_sheet, player_rows(players))
            .await?;

        log::info!("Mirror sync complete");
        Ok(())
    }
}

/// Header plus one row per spin, oldest first.
fn spin_rows(mut spins: Vec<SpinRecord>) -> Vec<Vec<Value>> {
    spins.sort_by_key(|s| s.timestamp);

    let mut rows: Vec<Vec<Value>> = Vec::with_capacity(spins.len() + 1);
    rows.push(SPINS_HEADER.iter().map(|h| json!(h)).collect());
    for (index, spin) in spins.iter().enumerate() {
        rows.push(vec![
            json!(index + 1),
            json!(spin.timestamp),
            json!(format_vietnam_time(spin.timestamp)),
            json!(spin.phone),
            json!(spin.name),
            json!(spin.prize_name),
            json!(spin.spin_number),
            json!(""),
        ]);
    }
    rows
}

/// Header plus one row per player, most recently active first; players who
/// never spun sort last.
fn player_rows(mut players: Vec<Player>) -> Vec<Vec<Value>> {
    players.sort_by_key(|p| std::cmp::Reverse(p.last_spin_at.unwrap_or(0)));

    let mut rows: Vec<Vec<Value>> = Vec::with_capacity(players.len() + 1);
    rows.push(PLAYERS_HEADER.iter().map(|h| json!(h)).collect());
    for (index, player) in players.iter().enumerate() {
        rows.push(vec![
            json!(index + 1),
            json!(player.phone),
            json!(player.name),
            json!(player.address.clone().unwrap_or_default()),
            json!(match player.gender {
                Some(Gender::Male) => "male",
                Some(Gender::Female) => "female",
                Some(Gender::Other) => "other",
                None => "",
            }),
            json!(player.date_of_birth.clone().unwrap_or_default()),
            json!(player.spins_used),
            json!(player.last_spin_at.map(format_vietnam_time).unwrap_or_default()),
        ]);
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryDatabase;
    use crate::database::{PlayerStore, SpinHistoryLog};
    use crate::models::Prize;
    use std::collections::HashMap;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    #[derive(Default)]
    pub struct MemorySheets {
        pub sheets: Mutex<HashMap<String, Vec<Vec<Value>>>>,
        pub replace_calls: AtomicUsize,
        pub delay: Option<Duration>,
    }

    #[async_trait]
    impl SheetsWriter for MemorySheets {
        async fn replace_all(&self, sheet: &str, rows: Vec<Vec<Value>>) -> AppResult<()> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.replace_calls.fetch_add(1, Ordering::SeqCst);
            self.sheets.lock().await.insert(sheet.to_string(), rows);
            Ok(())
        }

        async fn append_rows(&self, sheet: &str, rows: Vec<Vec<Value>>) -> AppResult<()> {
            self.sheets
                .lock()
                .await
                .entry(sheet.to_string())
                .or_default()
                .extend(rows);
            Ok(())
        }
    }

    fn record(phone: &str, timestamp: i64) -> SpinRecord {
        let player = Player::new(phone.to_string(), "Anh".to_string(), None, None, None, 1, 0);
        let prize = Prize {
            id: "p1".to_string(),
            name: "Voucher".to_string(),
            icon: "🎁".to_string(),
            image_url: None,
            probability: 100.0,
            color: "#FFFFFF".to_string(),
            description: String::new(),
            category: "Khác".to_string(),
        };
        SpinRecord::new(&player, &prize, timestamp, 1)
    }

    fn player_with_activity(phone: &str, last_spin_at: Option<i64>) -> Player {
        let mut p = Player::new(phone.to_string(), "Anh".to_string(), None, None, None, 1, 0);
        p.last_spin_at = last_spin_at;
        p
    }

    #[test]
    fn test_spin_rows_sorted_oldest_first() {
        let rows = spin_rows(vec![
            record("0912345671", 300),
            record("0912345672", 100),
            record("0912345673", 200),
        ]);
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0][0], json!("No."));
        assert_eq!(rows[1][1], json!(100));
        assert_eq!(rows[2][1], json!(200));
        assert_eq!(rows[3][1], json!(300));
        // Sequence column restarts from 1 on every rewrite.
        assert_eq!(rows[1][0], json!(1));
        assert_eq!(rows[3][0], json!(3));
    }

    #[test]
    fn test_player_rows_most_recent_first_never_played_last() {
        let rows = player_rows(vec![
            player_with_activity("0912345671", None),
            player_with_activity("0912345672", Some(200)),
            player_with_activity("0912345673", Some(900)),
        ]);
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[1][1], json!("0912345673"));
        assert_eq!(rows[2][1], json!("0912345672"));
        assert_eq!(rows[3][1], json!("0912345671"));
    }

    #[tokio::test]
    async fn test_sync_replaces_stale_larger_table() {
        let db = Arc::new(MemoryDatabase::new());
        db.append(&record("0912345678", 100)).await.unwrap();
        db.create(player_with_activity("0912345678", Some(100)))
            .await
            .unwrap();

        let writer = Arc::new(MemorySheets::default());
        // A prior sync left a bigger table behind.
        writer
            .replace_all("RecentSpins", vec![vec![json!("old")]; 10])
            .await
            .unwrap();

        let service = SyncService::new(db, writer.clone(), &SyncSheetConfig::default());
        assert!(service.sync_all().await.unwrap());

        let sheets = writer.sheets.lock().await;
        let spins = sheets.get("RecentSpins").unwrap();
        // Exactly one header row plus one row per current record.
        assert_eq!(spins.len(), 2);
        let players = sheets.get("RecentSpins_Players").unwrap();
        assert_eq!(players.len(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_sync_is_single_flight() {
        let db = Arc::new(MemoryDatabase::new());
        db.append(&record("0912345678", 100)).await.unwrap();

        let writer = Arc::new(MemorySheets {
            delay: Some(Duration::from_millis(50)),
            ..Default::default()
        });
        let service = SyncService::new(db, writer.clone(), &SyncSheetConfig::default());

        let a = service.clone();
        let b = service.clone();
        let (ra, rb) = tokio::join!(
            tokio::spawn(async move { a.sync_all().await }),
            tokio::spawn(async move { b.sync_all().await }),
        );
        let (ra, rb) = (ra.unwrap().unwrap(), rb.unwrap().unwrap());

        // One performed the rewrite, the other reported success idle.
        assert!(ra ^ rb);
        assert_eq!(writer.replace_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_request_sync_drops_when_queue_full() {
        let db = Arc::new(MemoryDatabase::new());
        let writer = Arc::new(MemorySheets::default());
        let service = SyncService::new(db, writer, &SyncSheetConfig::default());

        // No worker is draining; filling past capacity must not panic or block.
        for _ in 0..32 {
            service.request_sync();
        }
    }
}
