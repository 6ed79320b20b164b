// Application state management

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

use crate::asset::AssetInfo;
use crate::bank::{Bank, BankError, InMemoryBank, RemoteBank};
use crate::engine::{EngineInit, SettlementEngine};
use crate::error::EngineError;
use crate::oracle::OracleService;

pub type SharedState = Arc<Mutex<AppState>>;

const STATE_FILE: &str = "data/state.json";
const ACTIVITY_LIMIT: usize = 1000;

/// Current wall-clock time in seconds. Read once per request.
pub fn now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Funds ledger the service runs against: self-contained in local mode,
/// an external custody service when `BANK_URL` is set.
pub enum BankBackend {
    Memory(InMemoryBank),
    Remote(RemoteBank),
}

impl Bank for BankBackend {
    fn debit(&mut self, account: &str, amount: u64, asset: &AssetInfo) -> Result<(), BankError> {
        match self {
            BankBackend::Memory(bank) => bank.debit(account, amount, asset),
            BankBackend::Remote(bank) => bank.debit(account, amount, asset),
        }
    }

    fn credit(&mut self, account: &str, amount: u64, asset: &AssetInfo) -> Result<(), BankError> {
        match self {
            BankBackend::Memory(bank) => bank.credit(account, amount, asset),
            BankBackend::Remote(bank) => bank.credit(account, amount, asset),
        }
    }
}

pub struct AppState {
    pub engine: SettlementEngine,
    pub oracle: OracleService,
    pub bank: BankBackend,
    /// Bounded human-readable feed of recent state changes.
    pub activity: Vec<String>,
}

#[derive(Serialize, Deserialize)]
struct PersistedState {
    engine: SettlementEngine,
    oracle: OracleService,
    balances: Option<InMemoryBank>,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

impl AppState {
    /// Build the service state from environment variables, restoring the
    /// previous snapshot from disk when one exists.
    pub fn from_env() -> Result<Self, EngineError> {
        dotenv::dotenv().ok();

        let owner = env_or("OWNER", "owner");
        let fee_rate: Decimal = env_or("FEE_RATE", "0.03")
            .parse()
            .map_err(|_| EngineError::InvalidFeeRate)?;
        let interval: u64 = env_or("ROUND_INTERVAL", "18000").parse().unwrap_or(18000);
        let grace_interval: u64 = env_or("GRACE_INTERVAL", "18000").parse().unwrap_or(18000);

        let engine = SettlementEngine::new(EngineInit {
            owner: owner.clone(),
            operator: env_or("OPERATOR", "operator"),
            treasury: env_or("TREASURY", "treasury"),
            bet_asset: AssetInfo::native(&env_or("BET_DENOM", "uatom")),
            oracle_addr: env_or("ORACLE_ADDR", "oracle"),
            oracle_code_hash: env_or("ORACLE_CODE_HASH", ""),
            fee_rate,
            interval,
            grace_interval,
            chain_id: env_or("CHAIN_ID", "updown-1"),
            contract_addr: env_or("CONTRACT_ADDR", "updown_engine"),
            prng_seed: env_or("PRNG_SEED", "updown prng seed"),
        })?;

        let bank = match std::env::var("BANK_URL").ok() {
            Some(url) => BankBackend::Remote(RemoteBank::new(Some(url))),
            None => BankBackend::Memory(InMemoryBank::new()),
        };

        let mut state = Self {
            engine,
            oracle: OracleService::new(&owner),
            bank,
            activity: Vec::new(),
        };

        match state.load_from_disk() {
            Ok(()) => info!("restored persisted state from {}", STATE_FILE),
            Err(e) => info!("starting fresh ({})", e),
        }

        Ok(state)
    }

    pub fn log_activity(&mut self, action: &str, details: &str) {
        let timestamp = chrono::Local::now().format("%H:%M:%S");
        let entry = format!("[{}] {} | {}", timestamp, action, details);
        info!("{}", entry);
        self.activity.push(entry);
        if self.activity.len() > ACTIVITY_LIMIT {
            self.activity.remove(0);
        }
    }

    pub fn save_to_disk(&self) -> Result<(), String> {
        let balances = match &self.bank {
            BankBackend::Memory(bank) => Some(bank.clone()),
            BankBackend::Remote(_) => None,
        };

        let state = PersistedState {
            engine: self.engine.clone(),
            oracle: self.oracle.clone(),
            balances,
        };

        let json = serde_json::to_string_pretty(&state)
            .map_err(|e| format!("Failed to serialize state: {}", e))?;

        std::fs::create_dir_all("data")
            .map_err(|e| format!("Failed to create data directory: {}", e))?;
        std::fs::write(STATE_FILE, json).map_err(|e| format!("Failed to write state file: {}", e))?;

        info!("state saved to {}", STATE_FILE);
        Ok(())
    }

    fn load_from_disk(&mut self) -> Result<(), String> {
        let json =
            std::fs::read_to_string(STATE_FILE).map_err(|_| "no state file found".to_string())?;

        let state: PersistedState = serde_json::from_str(&json)
            .map_err(|e| format!("Failed to deserialize state: {}", e))?;

        self.engine = state.engine;
        self.oracle = state.oracle;
        match (state.balances, &mut self.bank) {
            (Some(balances), BankBackend::Memory(_)) => {
                self.bank = BankBackend::Memory(balances);
            }
            (Some(_), BankBackend::Remote(_)) => {
                warn!("persisted balances ignored: remote bank configured");
            }
            (None, _) => {}
        }

        Ok(())
    }
}
