use serde::{Deserialize, Serialize};

/// Every way an engine or oracle call can be rejected.
///
/// All of these are terminal, synchronous rejections: the triggering call
/// performed no state change and the caller decides whether retrying later
/// makes sense (e.g. `ExecuteRound` once a fresh price lands).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineError {
    /// Caller failed a role check (owner, operator or feeder).
    Unauthorized,
    /// Unregistered asset, unknown round or unknown bet.
    NotFound,
    InvalidFeeRate,
    InvalidGraceInterval,
    /// Genesis round requested while rounds are already running.
    AlreadyRunning,
    AlreadyBet,
    AlreadyClaimed,
    Paused,
    NotPaused,
    AmountIsZero,
    CannotBet,
    CannotExecute,
    /// The finishing round drifted past its grace window unresolved.
    Expired,
    /// Oracle price is not newer than the finishing round's start.
    PriceNotUpdated,
    NotAbleToClaim,
    NothingToClaim,
    NoStackedFee,
    InvalidViewingKey,
    /// Stake arrived in an asset the engine is not configured for.
    InvalidAsset,
    InvalidPermit(String),
    /// The funds collaborator rejected a debit or credit.
    Funds(String),
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::Unauthorized => write!(f, "unauthorized"),
            EngineError::NotFound => write!(f, "not found"),
            EngineError::InvalidFeeRate => write!(f, "Invalid fee rate"),
            EngineError::InvalidGraceInterval => write!(f, "Invalid grace interval"),
            EngineError::AlreadyRunning => write!(f, "Already running"),
            EngineError::AlreadyBet => write!(f, "Already bet"),
            EngineError::AlreadyClaimed => write!(f, "Already claimed"),
            EngineError::Paused => write!(f, "Paused"),
            EngineError::NotPaused => write!(f, "Not paused"),
            EngineError::AmountIsZero => write!(f, "Amount is zero"),
            EngineError::CannotBet => write!(f, "Cannot bet"),
            EngineError::CannotExecute => write!(f, "Cannot execute"),
            EngineError::Expired => write!(f, "Expired"),
            EngineError::PriceNotUpdated => write!(f, "Price not updated"),
            EngineError::NotAbleToClaim => write!(f, "Not able to claim"),
            EngineError::NothingToClaim => write!(f, "Nothing to claim"),
            EngineError::NoStackedFee => write!(f, "No stacked fee"),
            EngineError::InvalidViewingKey => write!(f, "Invalid viewing key"),
            EngineError::InvalidAsset => write!(f, "invalid asset"),
            EngineError::InvalidPermit(msg) => write!(f, "Invalid permit: {}", msg),
            EngineError::Funds(msg) => write!(f, "Funds transfer failed: {}", msg),
        }
    }
}

impl std::error::Error for EngineError {}
