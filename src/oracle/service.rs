use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;

use crate::asset::AssetInfo;
use crate::error::EngineError;
use crate::events::{attr, Attribute, Response};

/// Latest quote for one asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceInfo {
    pub price: Decimal,
    pub last_updated_time: u64,
}

/// Read boundary the settlement engine consumes prices through.
pub trait PriceSource {
    fn latest_price(&self, asset: &AssetInfo) -> Result<PriceInfo, EngineError>;
}

/// Asset registry + price store.
///
/// One feeder per asset; registration is owner-gated, price submission is
/// feeder-gated. Prices for unregistered assets are rejected outright.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleService {
    owner: String,
    /// asset key -> feeder account
    feeders: HashMap<String, String>,
    /// asset key -> latest price
    prices: HashMap<String, PriceInfo>,
}

impl OracleService {
    pub fn new(owner: &str) -> Self {
        Self {
            owner: owner.to_string(),
            feeders: HashMap::new(),
            prices: HashMap::new(),
        }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Reassign the oracle owner.
    pub fn update_config(&mut self, caller: &str, new_owner: &str) -> Result<Response, EngineError> {
        if caller != self.owner {
            return Err(EngineError::Unauthorized);
        }
        self.owner = new_owner.to_string();
        info!(new_owner, "oracle owner updated");
        Ok(Response::new(vec![attr("action", "update_config")]))
    }

    /// Register (or replace) the feeder for an asset.
    pub fn register_asset(
        &mut self,
        caller: &str,
        asset: &AssetInfo,
        feeder: &str,
    ) -> Result<Response, EngineError> {
        if caller != self.owner {
            return Err(EngineError::Unauthorized);
        }

        let asset_key = asset.asset_key();
        self.feeders.insert(asset_key.clone(), feeder.to_string());
        info!(asset_key = %asset_key, feeder, "asset registered");

        Ok(Response::new(vec![
            attr("action", "register_asset"),
            attr("asset_key", &asset_key),
            attr("feeder", feeder),
        ]))
    }

    /// Submit a batch of prices.
    ///
    /// The batch is all-or-nothing: every pair is checked against the feeder
    /// registry before any price is written, so a single bad pair cannot
    /// leave a partial price state behind.
    pub fn feed_price(
        &mut self,
        caller: &str,
        prices: &[(AssetInfo, Decimal)],
        now: u64,
    ) -> Result<Response, EngineError> {
        for (asset, _) in prices {
            let feeder = self
                .feeders
                .get(&asset.asset_key())
                .ok_or(EngineError::NotFound)?;
            if caller != feeder {
                return Err(EngineError::Unauthorized);
            }
        }

        let mut log: Vec<Attribute> = vec![attr("action", "feed_price")];
        for (asset, price) in prices {
            let asset_key = asset.asset_key();
            self.prices.insert(
                asset_key.clone(),
                PriceInfo {
                    price: *price,
                    last_updated_time: now,
                },
            );
            info!(asset_key = %asset_key, price = %price, now, "price fed");
            log.push(attr("asset_key", &asset_key));
            log.push(attr("price", price));
        }

        Ok(Response::new(log))
    }

    pub fn feeder(&self, asset: &AssetInfo) -> Result<&str, EngineError> {
        self.feeders
            .get(&asset.asset_key())
            .map(|f| f.as_str())
            .ok_or(EngineError::NotFound)
    }
}

impl PriceSource for OracleService {
    fn latest_price(&self, asset: &AssetInfo) -> Result<PriceInfo, EngineError> {
        self.prices
            .get(&asset.asset_key())
            .cloned()
            .ok_or(EngineError::NotFound)
    }
}
