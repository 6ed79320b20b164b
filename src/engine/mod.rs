/// Round-based up/down settlement engine.
pub mod round;
pub mod settlement;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::asset::AssetInfo;

pub use round::{Bet, Round};
pub use settlement::{EngineInit, ReceiveMsg, SettlementEngine};

/// Side of an up/down stake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Position {
    Up,
    Down,
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Position::Up => write!(f, "up"),
            Position::Down => write!(f, "down"),
        }
    }
}

/// Owner-mutable engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub owner: String,
    pub operator: String,
    pub treasury: String,
    pub bet_asset: AssetInfo,
    pub oracle_addr: String,
    pub oracle_code_hash: String,
    /// Fraction of the round's total pool taken as fee, in [0, 1].
    pub fee_rate: Decimal,
    /// Round length in seconds.
    pub interval: u64,
    /// How long after end_time the operator may still resolve a round.
    pub grace_interval: u64,
    /// Chain id permits must be issued for.
    pub chain_id: String,
    /// This engine instance's address, matched against permit targets.
    pub contract_addr: String,
    /// Hashed seed feeding viewing-key generation.
    pub prng_seed: Vec<u8>,
}

/// Engine-wide mutable state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineState {
    /// Id of the round currently accepting bets (0 before genesis).
    pub epoch: u64,
    /// Accrued, not yet withdrawn, protocol fee.
    pub total_fee: u64,
    /// Gates betting and resolution, not claiming.
    pub paused: bool,
}

/// Per-field config update; absent fields stay unchanged.
/// Validation happens against the merged result before anything is applied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigUpdate {
    pub owner: Option<String>,
    pub operator: Option<String>,
    pub treasury: Option<String>,
    pub oracle_addr: Option<String>,
    pub oracle_code_hash: Option<String>,
    pub fee_rate: Option<Decimal>,
    pub interval: Option<u64>,
    pub grace_interval: Option<u64>,
}
