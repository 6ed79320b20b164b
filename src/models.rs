// Request/response models for the UpDown engine API

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::asset::AssetInfo;
use crate::engine::{ConfigUpdate, Position, ReceiveMsg};
use crate::permit::Permit;

/// Mutations carry the caller in the body; role checks happen in the engine.
#[derive(Debug, Deserialize)]
pub struct GenesisRequest {
    pub sender: String,
}

#[derive(Debug, Deserialize)]
pub struct BetRequest {
    pub sender: String,
    pub position: Position,
    pub amount: u64,
}

/// Token transfer callback: the token contract notifies the engine that
/// `from` sent `amount`, with the bet instruction embedded in `msg`.
#[derive(Debug, Deserialize)]
pub struct ReceiveRequest {
    pub sender: String,
    pub from: String,
    pub amount: u64,
    pub msg: ReceiveMsg,
}

#[derive(Debug, Deserialize)]
pub struct ExecuteRequest {
    pub sender: String,
}

#[derive(Debug, Deserialize)]
pub struct ClaimRequest {
    pub sender: String,
    pub epoch: u64,
}

#[derive(Debug, Deserialize)]
pub struct WithdrawRequest {
    pub sender: String,
}

#[derive(Debug, Deserialize)]
pub struct PauseRequest {
    pub sender: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateConfigRequest {
    pub sender: String,
    #[serde(flatten)]
    pub update: ConfigUpdate,
}

#[derive(Debug, Deserialize)]
pub struct SetViewingKeyRequest {
    pub sender: String,
    pub key: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateViewingKeyRequest {
    pub sender: String,
    pub entropy: String,
}

#[derive(Debug, Deserialize)]
pub struct RevokePermitRequest {
    pub sender: String,
    pub permit_name: String,
}

#[derive(Debug, Deserialize)]
pub struct BetQueryParams {
    pub key: String,
}

#[derive(Debug, Deserialize)]
pub struct PermitQueryRequest {
    pub permit: Permit,
    pub query: PermitQuery,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermitQuery {
    Bet { epoch: u64 },
}

#[derive(Debug, Deserialize)]
pub struct RegisterAssetRequest {
    pub sender: String,
    pub asset: AssetInfo,
    pub feeder: String,
}

#[derive(Debug, Deserialize)]
pub struct FeedPriceRequest {
    pub sender: String,
    pub prices: Vec<(AssetInfo, Decimal)>,
}

#[derive(Debug, Deserialize)]
pub struct OracleConfigRequest {
    pub sender: String,
    pub owner: String,
}

/// Query-string asset selector for the oracle read endpoints.
#[derive(Debug, Deserialize)]
pub struct AssetQueryParams {
    pub denom: Option<String>,
    pub contract_addr: Option<String>,
}

impl AssetQueryParams {
    pub fn to_asset(&self) -> Option<AssetInfo> {
        match (&self.denom, &self.contract_addr) {
            (Some(denom), _) => Some(AssetInfo::native(denom)),
            (None, Some(addr)) => Some(AssetInfo::token(addr, "", "")),
            (None, None) => None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct FundRequest {
    pub account: String,
    pub amount: u64,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl ToString) -> Self {
        Self {
            success: false,
            error: error.to_string(),
        }
    }
}
