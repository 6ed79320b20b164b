//! Signed query permits.
//!
//! A permit is a self-contained, Ed25519-signed delegation that lets its
//! holder run private queries for the signer's account without a pre-shared
//! viewing key. Verification is stateless: signature, chain id, allowed
//! targets and permissions are all checked against the permit itself plus
//! the engine's config; only revocations are persisted.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashSet;

use crate::error::EngineError;

/// Query kinds a permit may delegate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    /// Full read access to the account's own records.
    Owner,
    Balance,
    History,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermitParams {
    pub permit_name: String,
    /// Engine instances this permit is valid for.
    pub allowed_tokens: Vec<String>,
    pub chain_id: String,
    pub permissions: Vec<Permission>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permit {
    pub params: PermitParams,
    /// Signer's Ed25519 public key (64 hex chars).
    pub pub_key: String,
    /// Ed25519 signature over the canonical params digest (128 hex chars).
    pub signature: String,
}

/// Account address derived from an Ed25519 public key.
/// Format: UP_[32 hex characters].
pub fn derive_address(pub_key_bytes: &[u8]) -> String {
    let digest = hex::encode(Sha256::digest(pub_key_bytes));
    format!("UP_{}", digest[..32].to_uppercase())
}

/// Storage key for a revoked permit.
pub fn revoked_key(account: &str, permit_name: &str) -> String {
    format!("{}:{}", account, permit_name)
}

impl Permit {
    /// Canonical bytes the signature covers: SHA256 of the params JSON.
    fn signing_bytes(params: &PermitParams) -> Vec<u8> {
        let payload = serde_json::to_vec(params).unwrap_or_default();
        Sha256::digest(&payload).to_vec()
    }

    /// Sign `params` with a key. Test harnesses and client tooling use this;
    /// the engine itself only ever verifies.
    pub fn sign(signing_key: &SigningKey, params: PermitParams) -> Self {
        let digest = Self::signing_bytes(&params);
        let signature = signing_key.sign(&digest);
        Permit {
            params,
            pub_key: hex::encode(signing_key.verifying_key().as_bytes()),
            signature: hex::encode(signature.to_bytes()),
        }
    }

    /// The account this permit speaks for.
    pub fn account(&self) -> Result<String, EngineError> {
        let pub_key_bytes = hex::decode(&self.pub_key)
            .map_err(|e| EngineError::InvalidPermit(format!("bad pubkey: {}", e)))?;
        Ok(derive_address(&pub_key_bytes))
    }

    pub fn check_permission(&self, needed: &Permission) -> bool {
        self.params.permissions.contains(needed)
    }

    /// Verify the Ed25519 signature against the claimed public key.
    pub fn verify_signature(&self) -> Result<bool, EngineError> {
        let pub_key_bytes = hex::decode(&self.pub_key)
            .map_err(|e| EngineError::InvalidPermit(format!("bad pubkey: {}", e)))?;
        let pub_key_array: [u8; 32] = pub_key_bytes
            .try_into()
            .map_err(|_| EngineError::InvalidPermit("pubkey must be 32 bytes".to_string()))?;
        let verifying_key = VerifyingKey::from_bytes(&pub_key_array)
            .map_err(|e| EngineError::InvalidPermit(format!("bad pubkey: {}", e)))?;

        let sig_bytes = hex::decode(&self.signature)
            .map_err(|e| EngineError::InvalidPermit(format!("bad signature: {}", e)))?;
        let sig_array: [u8; 64] = sig_bytes
            .try_into()
            .map_err(|_| EngineError::InvalidPermit("signature must be 64 bytes".to_string()))?;
        let signature = Signature::from_bytes(&sig_array);

        let digest = Self::signing_bytes(&self.params);
        Ok(verifying_key.verify(&digest, &signature).is_ok())
    }

    /// Full validation: target, chain id, signature and revocation list.
    /// Returns the signer's account on success.
    pub fn validate(
        &self,
        contract_addr: &str,
        chain_id: &str,
        revoked: &HashSet<String>,
    ) -> Result<String, EngineError> {
        if !self
            .params
            .allowed_tokens
            .iter()
            .any(|t| t == contract_addr)
        {
            return Err(EngineError::InvalidPermit(format!(
                "permit is not valid for {}",
                contract_addr
            )));
        }

        if self.params.chain_id != chain_id {
            return Err(EngineError::InvalidPermit(format!(
                "wrong chain id: {}",
                self.params.chain_id
            )));
        }

        if !self.verify_signature()? {
            return Err(EngineError::InvalidPermit(
                "signature does not match".to_string(),
            ));
        }

        let account = self.account()?;
        if revoked.contains(&revoked_key(&account, &self.params.permit_name)) {
            return Err(EngineError::InvalidPermit(format!(
                "permit \"{}\" was revoked",
                self.params.permit_name
            )));
        }

        Ok(account)
    }
}
