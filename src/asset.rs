use serde::{Deserialize, Serialize};

/// Asset descriptor for stakes and price feeds.
///
/// Either a native coin identified by its denomination, or a token contract
/// identified by its address. Token descriptors also carry the code hash and
/// a viewing key for talking to the token itself, but neither participates
/// in asset identity: two descriptors naming the same contract address are
/// the same asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetInfo {
    NativeToken {
        denom: String,
    },
    Token {
        contract_addr: String,
        token_code_hash: String,
        viewing_key: String,
    },
}

impl AssetInfo {
    pub fn native(denom: &str) -> Self {
        AssetInfo::NativeToken {
            denom: denom.to_string(),
        }
    }

    pub fn token(contract_addr: &str, token_code_hash: &str, viewing_key: &str) -> Self {
        AssetInfo::Token {
            contract_addr: contract_addr.to_string(),
            token_code_hash: token_code_hash.to_string(),
            viewing_key: viewing_key.to_string(),
        }
    }

    /// Canonical storage/log key for this asset. Pure and total.
    pub fn asset_key(&self) -> String {
        match self {
            AssetInfo::NativeToken { denom } => format!("native_token_{}", denom),
            AssetInfo::Token { contract_addr, .. } => format!("token_{}", contract_addr),
        }
    }

    pub fn is_native(&self) -> bool {
        matches!(self, AssetInfo::NativeToken { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_native_asset_key() {
        let asset = AssetInfo::native("uatom");
        assert_eq!(asset.asset_key(), "native_token_uatom");
        assert!(asset.is_native());
    }

    #[test]
    fn test_token_asset_key() {
        let asset = AssetInfo::token("market_token", "code_hash", "vk");
        assert_eq!(asset.asset_key(), "token_market_token");
        assert!(!asset.is_native());
    }

    #[test]
    fn test_token_key_ignores_code_hash_and_viewing_key() {
        let a = AssetInfo::token("market_token", "hash_a", "vk_a");
        let b = AssetInfo::token("market_token", "hash_b", "vk_b");
        assert_eq!(a.asset_key(), b.asset_key());
    }

    #[test]
    fn test_serde_round_trip() {
        let asset = AssetInfo::native("uatom");
        let json = serde_json::to_string(&asset).unwrap();
        assert!(json.contains("native_token"));
        let back: AssetInfo = serde_json::from_str(&json).unwrap();
        assert_eq!(asset, back);
    }
}
