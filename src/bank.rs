/// Funds collaborator boundary.
///
/// The engine never moves value itself; it asks a `Bank` to debit stakes in
/// and credit payouts out. A failed transfer aborts the calling operation
/// before any engine state is touched.
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;

use crate::asset::AssetInfo;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BankError {
    AccountNotFound(String),
    InsufficientBalance { available: u64, required: u64 },
    Transport(String),
}

impl std::fmt::Display for BankError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BankError::AccountNotFound(account) => write!(f, "Account not found: {}", account),
            BankError::InsufficientBalance {
                available,
                required,
            } => write!(f, "Insufficient balance: {} < {}", available, required),
            BankError::Transport(msg) => write!(f, "Bank request failed: {}", msg),
        }
    }
}

impl std::error::Error for BankError {}

pub trait Bank {
    /// Pull `amount` of `asset` out of `account` into the engine's custody.
    fn debit(&mut self, account: &str, amount: u64, asset: &AssetInfo) -> Result<(), BankError>;

    /// Push `amount` of `asset` from the engine's custody to `account`.
    fn credit(&mut self, account: &str, amount: u64, asset: &AssetInfo) -> Result<(), BankError>;
}

/// A transfer receipt kept by the in-memory bank.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferReceipt {
    pub id: String,
    pub account: String,
    pub amount: u64,
    pub asset_key: String,
    pub direction: TransferDirection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferDirection {
    Debit,
    Credit,
}

/// Self-contained account ledger, used by the server in local mode and by
/// every test. Accounts must be funded before they can stake.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InMemoryBank {
    balances: HashMap<String, u64>,
    receipts: Vec<TransferReceipt>,
}

impl InMemoryBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint balance into an account (deposit endpoint / test setup).
    pub fn fund(&mut self, account: &str, amount: u64) -> u64 {
        let balance = self.balances.entry(account.to_string()).or_insert(0);
        *balance += amount;
        info!(account, amount, balance = *balance, "account funded");
        *balance
    }

    pub fn balance(&self, account: &str) -> u64 {
        self.balances.get(account).copied().unwrap_or(0)
    }

    pub fn receipts(&self) -> &[TransferReceipt] {
        &self.receipts
    }

    fn record(&mut self, account: &str, amount: u64, asset: &AssetInfo, direction: TransferDirection) {
        self.receipts.push(TransferReceipt {
            id: uuid::Uuid::new_v4().to_string(),
            account: account.to_string(),
            amount,
            asset_key: asset.asset_key(),
            direction,
        });
    }
}

impl Bank for InMemoryBank {
    fn debit(&mut self, account: &str, amount: u64, asset: &AssetInfo) -> Result<(), BankError> {
        let balance = self
            .balances
            .get_mut(account)
            .ok_or_else(|| BankError::AccountNotFound(account.to_string()))?;
        if *balance < amount {
            return Err(BankError::InsufficientBalance {
                available: *balance,
                required: amount,
            });
        }
        *balance -= amount;
        self.record(account, amount, asset, TransferDirection::Debit);
        Ok(())
    }

    fn credit(&mut self, account: &str, amount: u64, asset: &AssetInfo) -> Result<(), BankError> {
        let balance = self.balances.entry(account.to_string()).or_insert(0);
        *balance += amount;
        self.record(account, amount, asset, TransferDirection::Credit);
        Ok(())
    }
}

/// HTTP client against an external settlement service.
///
/// When no URL is configured the client runs in mock mode and accepts every
/// transfer, so the engine can be exercised without the custody service.
pub struct RemoteBank {
    pub url: Option<String>,
    client: reqwest::blocking::Client,
}

#[derive(Serialize)]
struct RemoteTransferRequest<'a> {
    id: String,
    account: &'a str,
    amount: u64,
    asset_key: String,
    direction: &'a str,
}

#[derive(Deserialize)]
struct RemoteTransferResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

impl RemoteBank {
    pub fn new(url: Option<String>) -> Self {
        match &url {
            Some(u) => info!(url = %u, "remote bank configured"),
            None => info!("remote bank in mock mode"),
        }
        Self {
            url,
            client: reqwest::blocking::Client::new(),
        }
    }

    fn transfer(
        &self,
        account: &str,
        amount: u64,
        asset: &AssetInfo,
        direction: &str,
    ) -> Result<(), BankError> {
        let base = match &self.url {
            Some(u) => u,
            None => return Ok(()), // mock mode
        };

        let request = RemoteTransferRequest {
            id: uuid::Uuid::new_v4().to_string(),
            account,
            amount,
            asset_key: asset.asset_key(),
            direction,
        };

        let resp = self
            .client
            .post(format!("{}/transfers", base))
            .json(&request)
            .send()
            .map_err(|e| BankError::Transport(e.to_string()))?;

        let body: RemoteTransferResponse = resp
            .json()
            .map_err(|e| BankError::Transport(e.to_string()))?;

        if body.ok {
            Ok(())
        } else {
            Err(BankError::Transport(
                body.error.unwrap_or_else(|| "rejected".to_string()),
            ))
        }
    }
}

impl Bank for RemoteBank {
    fn debit(&mut self, account: &str, amount: u64, asset: &AssetInfo) -> Result<(), BankError> {
        self.transfer(account, amount, asset, "debit")
    }

    fn credit(&mut self, account: &str, amount: u64, asset: &AssetInfo) -> Result<(), BankError> {
        self.transfer(account, amount, asset, "credit")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset() -> AssetInfo {
        AssetInfo::native("uatom")
    }

    #[test]
    fn test_fund_and_debit() {
        let mut bank = InMemoryBank::new();
        bank.fund("alice", 1000);
        assert_eq!(bank.balance("alice"), 1000);

        bank.debit("alice", 100, &asset()).unwrap();
        assert_eq!(bank.balance("alice"), 900);
        assert_eq!(bank.receipts().len(), 1);
    }

    #[test]
    fn test_debit_insufficient() {
        let mut bank = InMemoryBank::new();
        bank.fund("alice", 50);

        let err = bank.debit("alice", 100, &asset()).unwrap_err();
        assert_eq!(
            err,
            BankError::InsufficientBalance {
                available: 50,
                required: 100
            }
        );
        // balance untouched on failure
        assert_eq!(bank.balance("alice"), 50);
        assert!(bank.receipts().is_empty());
    }

    #[test]
    fn test_debit_unknown_account() {
        let mut bank = InMemoryBank::new();
        let err = bank.debit("ghost", 1, &asset()).unwrap_err();
        assert_eq!(err, BankError::AccountNotFound("ghost".to_string()));
    }

    #[test]
    fn test_credit_creates_account() {
        let mut bank = InMemoryBank::new();
        bank.credit("treasury", 45, &asset()).unwrap();
        assert_eq!(bank.balance("treasury"), 45);
    }

    #[test]
    fn test_remote_bank_mock_mode_accepts() {
        let mut bank = RemoteBank::new(None);
        bank.debit("alice", 100, &asset()).unwrap();
        bank.credit("alice", 100, &asset()).unwrap();
    }
}
