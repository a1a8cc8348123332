//! Ledger store: every player record plus the activity feed
//!
//! The whole ledger is one JSON document. Each command loads it, mutates a
//! working copy, and writes the whole document back. The file store writes
//! to a sibling temp file and renames it into place, so a reader never sees
//! a half-written ledger.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, error, warn};

use crate::activity::ActivityLog;
use crate::error::StringError;
use crate::{EconomyError, PlayerId, PlayerRecord, Rank, Result};

/// Document key holding the activity feed; no player may use it
pub const ACTIVITY_KEY: &str = "activity";

/// In-memory view of the persisted ledger document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ledger {
    #[serde(default)]
    pub activity: ActivityLog,

    #[serde(flatten)]
    players: BTreeMap<PlayerId, PlayerRecord>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, player: &PlayerId) -> Option<&PlayerRecord> {
        self.players.get(player)
    }

    pub fn get_mut(&mut self, player: &PlayerId) -> Option<&mut PlayerRecord> {
        self.players.get_mut(player)
    }

    /// Like [`Ledger::get`], but an unknown player is an error
    pub fn player(&self, player: &PlayerId) -> Result<&PlayerRecord> {
        self.players
            .get(player)
            .ok_or_else(|| EconomyError::player_not_found(player))
    }

    pub fn player_mut(&mut self, player: &PlayerId) -> Result<&mut PlayerRecord> {
        self.players
            .get_mut(player)
            .ok_or_else(|| EconomyError::player_not_found(player))
    }

    pub fn contains(&self, player: &PlayerId) -> bool {
        self.players.contains_key(player)
    }

    /// Register a new player with `rank`, ten doubloons and nothing else
    pub fn create_if_absent(&mut self, player: &PlayerId, rank: Rank) -> Result<&PlayerRecord> {
        if player.as_str() == ACTIVITY_KEY {
            return Err(EconomyError::invalid_argument(
                "player",
                format!("'{}' is reserved for the activity feed", ACTIVITY_KEY),
            ));
        }
        if let Some(existing) = self.players.get(player) {
            return Err(EconomyError::AlreadyJoined {
                player: player.clone(),
                rank: existing.rank,
            });
        }
        Ok(self
            .players
            .entry(player.clone())
            .or_insert_with(|| PlayerRecord::new(rank)))
    }

    pub fn players(&self) -> impl Iterator<Item = (&PlayerId, &PlayerRecord)> {
        self.players.iter()
    }

    pub fn players_mut(&mut self) -> impl Iterator<Item = (&PlayerId, &mut PlayerRecord)> {
        self.players.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn record_activity(&mut self, entry: impl Into<String>) {
        self.activity.push(entry);
    }
}

/// Durable home of the ledger
pub trait LedgerStore: Send {
    /// Read the ledger. Unparseable data is replaced by an empty ledger,
    /// which is persisted before `StorageCorrupt` is returned.
    fn load(&mut self) -> Result<Ledger>;

    /// Persist every record and the activity feed in one step
    fn save(&mut self, ledger: &Ledger) -> Result<()>;

    /// Human readable location for diagnostics
    fn location(&self) -> String;
}

fn parse_document(raw: &str) -> std::result::Result<Ledger, serde_json::Error> {
    if raw.trim().is_empty() {
        return Ok(Ledger::new());
    }
    serde_json::from_str(raw)
}

/// JSON file backed ledger
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name: OsString = self.path.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }

    fn write_atomically(&self, content: &str) -> Result<()> {
        let location = self.location();
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| EconomyError::persistence_failed(&location, "create directory for", e))?;
        }

        let tmp = self.temp_path();
        let mut file = fs::File::create(&tmp)
            .map_err(|e| EconomyError::persistence_failed(&location, "create temp file for", e))?;
        file.write_all(content.as_bytes())
            .and_then(|_| file.sync_all())
            .map_err(|e| EconomyError::persistence_failed(&location, "write", e))?;
        fs::rename(&tmp, &self.path)
            .map_err(|e| EconomyError::persistence_failed(&location, "replace", e))?;
        Ok(())
    }
}

impl LedgerStore for JsonFileStore {
    fn load(&mut self) -> Result<Ledger> {
        if !self.path.exists() {
            debug!("No ledger at {}, starting empty", self.path.display());
            self.write_atomically("{}")?;
            return Ok(Ledger::new());
        }

        let raw = fs::read_to_string(&self.path)
            .map_err(|e| EconomyError::persistence_failed(self.location(), "read", e))?;

        match parse_document(&raw) {
            Ok(ledger) => Ok(ledger),
            Err(e) => {
                warn!(
                    "Ledger at {} is unreadable ({}), resetting to an empty ledger",
                    self.path.display(),
                    e
                );
                if let Err(reset) = self.write_atomically("{}") {
                    error!("Failed to reset corrupt ledger: {}", reset);
                    return Err(reset);
                }
                Err(EconomyError::storage_corrupt(self.location(), e))
            }
        }
    }

    fn save(&mut self, ledger: &Ledger) -> Result<()> {
        let content = serde_json::to_string_pretty(ledger)
            .map_err(|e| EconomyError::persistence_failed(self.location(), "serialize", e))?;
        self.write_atomically(&content)
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

/// Ledger kept as a JSON string in memory.
///
/// Goes through the same serialization as the file store, and can be told
/// to fail writes so callers can exercise their persistence error paths.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    document: String,
    fail_saves: bool,
    saves: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_document("{}")
    }

    pub fn with_document(document: impl Into<String>) -> Self {
        Self {
            document: document.into(),
            fail_saves: false,
            saves: 0,
        }
    }

    /// Make every subsequent save fail until switched off again
    pub fn fail_saves(&mut self, fail: bool) {
        self.fail_saves = fail;
    }

    pub fn document(&self) -> &str {
        &self.document
    }

    /// Number of successful saves
    pub fn saves(&self) -> usize {
        self.saves
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl LedgerStore for MemoryStore {
    fn load(&mut self) -> Result<Ledger> {
        match parse_document(&self.document) {
            Ok(ledger) => Ok(ledger),
            Err(e) => {
                warn!("In-memory ledger is unreadable ({}), resetting", e);
                self.document = "{}".to_string();
                Err(EconomyError::storage_corrupt(self.location(), e))
            }
        }
    }

    fn save(&mut self, ledger: &Ledger) -> Result<()> {
        if self.fail_saves {
            return Err(EconomyError::persistence_failed(
                self.location(),
                "write",
                StringError("simulated write failure".to_string()),
            ));
        }
        self.document = serde_json::to_string(ledger)
            .map_err(|e| EconomyError::persistence_failed(self.location(), "serialize", e))?;
        self.saves += 1;
        Ok(())
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}
