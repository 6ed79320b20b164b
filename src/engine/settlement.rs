use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use tracing::info;

use super::round::{Bet, Round};
use super::{ConfigUpdate, EngineConfig, EngineState, Position};
use crate::asset::AssetInfo;
use crate::bank::Bank;
use crate::error::EngineError;
use crate::events::{attr, Response};
use crate::oracle::PriceSource;
use crate::permit::{revoked_key, Permission, Permit};
use crate::viewing_key::ViewingKey;

/// Instruction payload embedded in a token transfer callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReceiveMsg {
    Bet { position: Position },
}

/// The round lifecycle state machine.
///
/// Owns the config, the engine state, the round table, the betting ledger
/// and the private-query stores. The price oracle and the funds ledger are
/// collaborators passed into the operations that need them; every operation
/// is synchronous and either completes fully or leaves no trace.
///
/// `state.epoch` is the round currently accepting bets. Executing a round
/// resolves round `epoch - 1`, locks round `epoch` with the close price as
/// its open, schedules round `epoch + 1` and advances the epoch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementEngine {
    config: EngineConfig,
    state: EngineState,
    rounds: HashMap<u64, Round>,
    /// epoch -> account -> bet
    bets: HashMap<u64, HashMap<String, Bet>>,
    /// account -> hashed viewing key
    viewing_keys: HashMap<String, String>,
    /// "<account>:<permit_name>" entries
    revoked_permits: HashSet<String>,
}

pub struct EngineInit {
    pub owner: String,
    pub operator: String,
    pub treasury: String,
    pub bet_asset: AssetInfo,
    pub oracle_addr: String,
    pub oracle_code_hash: String,
    pub fee_rate: Decimal,
    pub interval: u64,
    pub grace_interval: u64,
    pub chain_id: String,
    pub contract_addr: String,
    pub prng_seed: String,
}

fn validate_rates(fee_rate: Decimal, interval: u64, grace_interval: u64) -> Result<(), EngineError> {
    if fee_rate < Decimal::ZERO || fee_rate > Decimal::ONE {
        return Err(EngineError::InvalidFeeRate);
    }
    if grace_interval > interval {
        return Err(EngineError::InvalidGraceInterval);
    }
    Ok(())
}

impl SettlementEngine {
    /// Build a fresh, paused engine. Rounds start with `start_genesis_round`.
    pub fn new(init: EngineInit) -> Result<Self, EngineError> {
        validate_rates(init.fee_rate, init.interval, init.grace_interval)?;

        let config = EngineConfig {
            owner: init.owner,
            operator: init.operator,
            treasury: init.treasury,
            bet_asset: init.bet_asset,
            oracle_addr: init.oracle_addr,
            oracle_code_hash: init.oracle_code_hash,
            fee_rate: init.fee_rate,
            interval: init.interval,
            grace_interval: init.grace_interval,
            chain_id: init.chain_id,
            contract_addr: init.contract_addr,
            prng_seed: Sha256::digest(init.prng_seed.as_bytes()).to_vec(),
        };

        Ok(Self {
            config,
            state: EngineState {
                epoch: 0,
                total_fee: 0,
                paused: true,
            },
            rounds: HashMap::new(),
            bets: HashMap::new(),
            viewing_keys: HashMap::new(),
            revoked_permits: HashSet::new(),
        })
    }

    // ===== role checks =====

    fn assert_owner(&self, caller: &str) -> Result<(), EngineError> {
        if caller != self.config.owner {
            return Err(EngineError::Unauthorized);
        }
        Ok(())
    }

    fn assert_operator(&self, caller: &str) -> Result<(), EngineError> {
        if caller != self.config.operator {
            return Err(EngineError::Unauthorized);
        }
        Ok(())
    }

    // ===== queries =====

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn round(&self, epoch: u64) -> Result<&Round, EngineError> {
        self.rounds.get(&epoch).ok_or(EngineError::NotFound)
    }

    fn bet_record(&self, epoch: u64, account: &str) -> Result<&Bet, EngineError> {
        self.bets
            .get(&epoch)
            .and_then(|by_account| by_account.get(account))
            .ok_or(EngineError::NotFound)
    }

    /// Viewing-key-gated bet query.
    pub fn query_bet(&self, epoch: u64, account: &str, key: &str) -> Result<&Bet, EngineError> {
        let stored = self
            .viewing_keys
            .get(account)
            .ok_or(EngineError::InvalidViewingKey)?;
        if !ViewingKey(key.to_string()).check(stored) {
            return Err(EngineError::InvalidViewingKey);
        }
        self.bet_record(epoch, account)
    }

    /// Permit-gated bet query; the account is taken from the permit signer.
    pub fn query_bet_with_permit(&self, permit: &Permit, epoch: u64) -> Result<&Bet, EngineError> {
        let account = permit.validate(
            &self.config.contract_addr,
            &self.config.chain_id,
            &self.revoked_permits,
        )?;
        if !permit.check_permission(&Permission::Owner) {
            return Err(EngineError::InvalidPermit(format!(
                "no permission to query bet, got permissions {:?}",
                permit.params.permissions
            )));
        }
        self.bet_record(epoch, &account)
    }

    // ===== round lifecycle =====

    /// Open the schedule: a pre-dated genesis round 1 plus the first real
    /// betting round 2, then unpause.
    pub fn start_genesis_round(&mut self, caller: &str, now: u64) -> Result<Response, EngineError> {
        self.assert_owner(caller)?;
        if self.state.epoch > 0 {
            return Err(EngineError::AlreadyRunning);
        }

        self.rounds
            .insert(1, Round::genesis(now, self.config.interval));
        self.rounds.insert(2, Round::new(now, self.config.interval));
        self.state.epoch = 2;
        self.state.paused = false;

        info!(now, "genesis round started");
        Ok(Response::new(vec![attr("action", "start_genesis_round")]))
    }

    fn check_bet(&self, user: &str, amount: u64, now: u64) -> Result<(), EngineError> {
        if amount == 0 {
            return Err(EngineError::AmountIsZero);
        }
        if self.state.paused {
            return Err(EngineError::Paused);
        }
        let round = self.round(self.state.epoch)?;
        if !round.bettable(now) {
            return Err(EngineError::CannotBet);
        }
        if self
            .bets
            .get(&self.state.epoch)
            .map(|by_account| by_account.contains_key(user))
            .unwrap_or(false)
        {
            return Err(EngineError::AlreadyBet);
        }
        Ok(())
    }

    /// Record a validated stake. Callers have already moved the funds.
    fn apply_bet(
        &mut self,
        user: &str,
        position: Position,
        amount: u64,
        now: u64,
    ) -> Result<Response, EngineError> {
        self.check_bet(user, amount, now)?;

        let epoch = self.state.epoch;
        let round = self.rounds.get_mut(&epoch).ok_or(EngineError::NotFound)?;
        round.total_amount += amount;
        match position {
            Position::Up => round.up_amount += amount,
            Position::Down => round.down_amount += amount,
        }

        self.bets.entry(epoch).or_default().insert(
            user.to_string(),
            Bet {
                amount,
                position,
                claimed: false,
            },
        );

        info!(user, epoch, amount, position = %position, "bet recorded");
        Ok(Response::new(vec![
            attr("action", "bet"),
            attr("amount", amount),
            attr("position", position),
        ]))
    }

    /// Stake in the native bet asset; the bank is debited before anything is
    /// recorded, so a failed debit leaves no trace.
    pub fn bet_native(
        &mut self,
        bank: &mut dyn Bank,
        user: &str,
        position: Position,
        amount: u64,
        now: u64,
    ) -> Result<Response, EngineError> {
        if !self.config.bet_asset.is_native() {
            return Err(EngineError::InvalidAsset);
        }
        self.check_bet(user, amount, now)?;
        bank.debit(user, amount, &self.config.bet_asset)
            .map_err(|e| EngineError::Funds(e.to_string()))?;
        self.apply_bet(user, position, amount, now)
    }

    /// Token stake arriving as a transfer callback. The callback sender must
    /// be the configured token contract; the funds already moved with the
    /// transfer itself.
    pub fn receive(
        &mut self,
        sender: &str,
        from: &str,
        amount: u64,
        msg: ReceiveMsg,
        now: u64,
    ) -> Result<Response, EngineError> {
        let contract_addr = match &self.config.bet_asset {
            AssetInfo::Token { contract_addr, .. } => contract_addr,
            AssetInfo::NativeToken { .. } => return Err(EngineError::InvalidAsset),
        };
        if sender != contract_addr {
            return Err(EngineError::InvalidAsset);
        }

        let ReceiveMsg::Bet { position } = msg;
        self.apply_bet(from, position, amount, now)
    }

    /// Resolve the round in flight against the oracle, lock the betting
    /// round and open the next one.
    pub fn execute_round(
        &mut self,
        caller: &str,
        now: u64,
        prices: &dyn PriceSource,
    ) -> Result<Response, EngineError> {
        self.assert_operator(caller)?;
        if self.state.paused {
            return Err(EngineError::Paused);
        }

        let epoch_finish = self
            .state
            .epoch
            .checked_sub(1)
            .filter(|e| *e > 0)
            .ok_or(EngineError::CannotExecute)?;
        let mut finishing = self.round(epoch_finish)?.clone();
        if finishing.expired(now, self.config.grace_interval) {
            return Err(EngineError::Expired);
        }
        if !finishing.executable(now) {
            return Err(EngineError::CannotExecute);
        }

        let quote = prices.latest_price(&self.config.bet_asset)?;
        if quote.last_updated_time <= finishing.start_time {
            return Err(EngineError::PriceNotUpdated);
        }

        let fee = finishing.settle(quote.price, self.config.fee_rate);
        self.state.total_fee += fee;
        self.rounds.insert(epoch_finish, finishing);

        let epoch_lock = self.state.epoch;
        let locking = self
            .rounds
            .get_mut(&epoch_lock)
            .ok_or(EngineError::NotFound)?;
        locking.open_price = Some(quote.price);

        self.rounds
            .insert(epoch_lock + 1, Round::new(now, self.config.interval));
        self.state.epoch = epoch_lock + 1;

        info!(
            epoch_finish,
            epoch_lock,
            close_price = %quote.price,
            fee,
            "round executed"
        );
        Ok(Response::new(vec![
            attr("action", "execute"),
            attr("epoch_finish", epoch_finish),
            attr("epoch_lock", epoch_lock),
            attr("close_price", quote.price),
        ]))
    }

    /// Pay out a winning or refundable bet. Not gated by pause.
    pub fn claim(
        &mut self,
        bank: &mut dyn Bank,
        caller: &str,
        epoch: u64,
        now: u64,
    ) -> Result<Response, EngineError> {
        let round = self.round(epoch)?.clone();
        let grace = self.config.grace_interval;
        if !round.claimable(now) && !round.refundable(now, grace) {
            return Err(EngineError::NotAbleToClaim);
        }

        let bet = self.bet_record(epoch, caller)?.clone();
        if bet.claimed {
            return Err(EngineError::AlreadyClaimed);
        }

        let claim_amount = round.claimable_amount(now, &bet, grace);
        if claim_amount == 0 {
            return Err(EngineError::NothingToClaim);
        }

        bank.credit(caller, claim_amount, &self.config.bet_asset)
            .map_err(|e| EngineError::Funds(e.to_string()))?;

        if let Some(stored) = self.bets.get_mut(&epoch).and_then(|b| b.get_mut(caller)) {
            stored.claimed = true;
        }

        info!(caller, epoch, amount = bet.amount, claim_amount, "claim paid");
        Ok(Response::new(vec![
            attr("action", "claim"),
            attr("epoch", epoch),
            attr("amount", bet.amount),
            attr("claim_amount", claim_amount),
        ]))
    }

    /// Move the accrued protocol fee to the treasury.
    pub fn withdraw(&mut self, bank: &mut dyn Bank, caller: &str) -> Result<Response, EngineError> {
        self.assert_owner(caller)?;
        if self.state.total_fee == 0 {
            return Err(EngineError::NoStackedFee);
        }

        let amount = self.state.total_fee;
        bank.credit(&self.config.treasury, amount, &self.config.bet_asset)
            .map_err(|e| EngineError::Funds(e.to_string()))?;
        self.state.total_fee = 0;

        info!(amount, treasury = %self.config.treasury, "fee withdrawn");
        Ok(Response::new(vec![
            attr("action", "withdraw"),
            attr("amount", amount),
        ]))
    }

    pub fn pause(&mut self, caller: &str) -> Result<Response, EngineError> {
        self.assert_owner(caller)?;
        if self.state.paused {
            return Err(EngineError::Paused);
        }
        self.state.paused = true;
        info!("engine paused");
        Ok(Response::new(vec![attr("action", "pause")]))
    }

    pub fn unpause(&mut self, caller: &str) -> Result<Response, EngineError> {
        self.assert_owner(caller)?;
        if !self.state.paused {
            return Err(EngineError::NotPaused);
        }
        self.state.paused = false;
        info!("engine unpaused");
        Ok(Response::new(vec![attr("action", "unpause")]))
    }

    /// Apply a partial config update; validation runs against the merged
    /// result before any field is written.
    pub fn update_config(
        &mut self,
        caller: &str,
        update: ConfigUpdate,
    ) -> Result<Response, EngineError> {
        self.assert_owner(caller)?;

        let fee_rate = update.fee_rate.unwrap_or(self.config.fee_rate);
        let interval = update.interval.unwrap_or(self.config.interval);
        let grace_interval = update.grace_interval.unwrap_or(self.config.grace_interval);
        validate_rates(fee_rate, interval, grace_interval)?;

        if let Some(owner) = update.owner {
            self.config.owner = owner;
        }
        if let Some(operator) = update.operator {
            self.config.operator = operator;
        }
        if let Some(treasury) = update.treasury {
            self.config.treasury = treasury;
        }
        if let Some(oracle_addr) = update.oracle_addr {
            self.config.oracle_addr = oracle_addr;
        }
        if let Some(oracle_code_hash) = update.oracle_code_hash {
            self.config.oracle_code_hash = oracle_code_hash;
        }
        self.config.fee_rate = fee_rate;
        self.config.interval = interval;
        self.config.grace_interval = grace_interval;

        info!("engine config updated");
        Ok(Response::new(vec![attr("action", "update_config")]))
    }

    // ===== private-query auth =====

    /// Generate and store a viewing key for the caller.
    pub fn create_viewing_key(
        &mut self,
        caller: &str,
        entropy: &str,
        now: u64,
    ) -> Result<Response, EngineError> {
        let key = ViewingKey::new(&self.config.prng_seed, entropy.as_bytes(), now);
        self.viewing_keys
            .insert(caller.to_string(), key.hashed());
        info!(caller, "viewing key created");
        Ok(Response::new(vec![
            attr("action", "create_viewing_key"),
            attr("key", &key),
        ]))
    }

    /// Store a caller-chosen viewing key.
    pub fn set_viewing_key(&mut self, caller: &str, key: &str) -> Result<Response, EngineError> {
        let key = ViewingKey(key.to_string());
        self.viewing_keys
            .insert(caller.to_string(), key.hashed());
        info!(caller, "viewing key set");
        Ok(Response::new(vec![
            attr("action", "set_viewing_key"),
            attr("success", true),
        ]))
    }

    /// Blacklist one of the caller's named permits.
    pub fn revoke_permit(
        &mut self,
        caller: &str,
        permit_name: &str,
    ) -> Result<Response, EngineError> {
        self.revoked_permits
            .insert(revoked_key(caller, permit_name));
        info!(caller, permit_name, "permit revoked");
        Ok(Response::new(vec![
            attr("action", "revoke_permit"),
            attr("permit_name", permit_name),
        ]))
    }
}
