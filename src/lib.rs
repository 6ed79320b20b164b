/// UpDown Parimutuel Prediction Engine
/// Exports all modules for use as a library crate

pub mod app_state;
pub mod asset;
pub mod bank;
pub mod engine;
pub mod error;
pub mod events;
pub mod handlers;
pub mod models;
pub mod oracle;
pub mod permit;
pub mod viewing_key;

// Core state machines
pub use engine::{
    Bet, ConfigUpdate, EngineConfig, EngineInit, EngineState, Position, ReceiveMsg, Round,
    SettlementEngine,
};
pub use oracle::{OracleService, PriceInfo, PriceSource};

// Collaborator boundaries and auth
pub use asset::AssetInfo;
pub use bank::{Bank, BankError, InMemoryBank, RemoteBank};
pub use error::EngineError;
pub use events::{attr, Attribute, Response};
pub use permit::{derive_address, Permission, Permit, PermitParams};
pub use viewing_key::{ViewingKey, VIEWING_KEY_PREFIX};

// Application state for the HTTP service
pub use app_state::{AppState, SharedState};
