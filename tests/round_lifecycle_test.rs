// Full round lifecycle against the library: genesis, a betting round with
// three participants, resolution against the oracle, claims and the fee
// withdrawal — the money in the bank has to add up at every step.

use rust_decimal_macros::dec;
use updown_engine::{
    AssetInfo, EngineError, EngineInit, InMemoryBank, OracleService, Position, SettlementEngine,
};

const INTERVAL: u64 = 18000;
const GRACE: u64 = 18000;
const T0: u64 = 1_700_000_000;

fn setup() -> (SettlementEngine, OracleService, InMemoryBank) {
    let engine = SettlementEngine::new(EngineInit {
        owner: "owner".to_string(),
        operator: "operator".to_string(),
        treasury: "treasury".to_string(),
        bet_asset: AssetInfo::native("uatom"),
        oracle_addr: "oracle".to_string(),
        oracle_code_hash: "oracle_code_hash".to_string(),
        fee_rate: dec!(0.03),
        interval: INTERVAL,
        grace_interval: GRACE,
        chain_id: "updown-1".to_string(),
        contract_addr: "engine".to_string(),
        prng_seed: "integration seed".to_string(),
    })
    .unwrap();

    let mut oracle = OracleService::new("owner");
    oracle
        .register_asset("owner", &AssetInfo::native("uatom"), "feeder")
        .unwrap();

    let mut bank = InMemoryBank::new();
    for account in ["alice", "bob", "carol"] {
        bank.fund(account, 10_000);
    }

    (engine, oracle, bank)
}

fn feed(oracle: &mut OracleService, price: rust_decimal::Decimal, time: u64) {
    oracle
        .feed_price("feeder", &[(AssetInfo::native("uatom"), price)], time)
        .unwrap();
}

#[test]
fn test_full_round_lifecycle_with_claims_and_withdraw() {
    let (mut engine, mut oracle, mut bank) = setup();

    // Nothing runs before genesis: the engine starts paused.
    assert_eq!(
        engine
            .bet_native(&mut bank, "alice", Position::Up, 100, T0)
            .unwrap_err(),
        EngineError::Paused
    );

    feed(&mut oracle, dec!(3), T0 - 10);
    engine.start_genesis_round("owner", T0).unwrap();
    assert_eq!(engine.state().epoch, 2);

    // Three stakes into round 2 while it is open.
    engine
        .bet_native(&mut bank, "alice", Position::Down, 100, T0 + 5)
        .unwrap();
    engine
        .bet_native(&mut bank, "bob", Position::Up, 1000, T0 + 6)
        .unwrap();
    engine
        .bet_native(&mut bank, "carol", Position::Down, 400, T0 + 7)
        .unwrap();

    let round2 = engine.round(2).unwrap();
    assert_eq!(round2.total_amount, 1500);
    assert_eq!(round2.total_amount, round2.up_amount + round2.down_amount);
    assert_eq!(bank.balance("alice"), 9_900);
    assert_eq!(bank.balance("bob"), 9_000);
    assert_eq!(bank.balance("carol"), 9_600);

    // Resolve the genesis round: locks round 2 at the fed price.
    feed(&mut oracle, dec!(5), T0 + INTERVAL - 5);
    engine
        .execute_round("operator", T0 + INTERVAL, &oracle)
        .unwrap();
    assert_eq!(engine.round(2).unwrap().open_price, Some(dec!(5)));
    assert_eq!(engine.state().epoch, 3);

    // Round 2 closes lower: down wins, 3% fee on 1500 is 45.
    feed(&mut oracle, dec!(3), T0 + 2 * INTERVAL - 5);
    let resp = engine
        .execute_round("operator", T0 + 2 * INTERVAL, &oracle)
        .unwrap();
    assert_eq!(resp.get("epoch_finish"), Some("2"));
    assert_eq!(resp.get("close_price"), Some("3"));

    let round2 = engine.round(2).unwrap();
    assert_eq!(round2.close_price, Some(dec!(3)));
    assert_eq!(round2.reward_amount, 1455);
    assert_eq!(engine.state().total_fee, 45);

    // Round 3 chains off round 2's close.
    assert_eq!(engine.round(3).unwrap().open_price, Some(dec!(3)));

    // Winners split the reward pro rata, floored.
    let now = T0 + 2 * INTERVAL + 10;
    let resp = engine.claim(&mut bank, "alice", 2, now).unwrap();
    assert_eq!(resp.get("claim_amount"), Some("291"));
    assert_eq!(bank.balance("alice"), 10_191);

    let resp = engine.claim(&mut bank, "carol", 2, now).unwrap();
    assert_eq!(resp.get("claim_amount"), Some("1164"));
    assert_eq!(bank.balance("carol"), 10_764);

    // The loser gets nothing, and nobody claims twice.
    assert_eq!(
        engine.claim(&mut bank, "bob", 2, now).unwrap_err(),
        EngineError::NothingToClaim
    );
    assert_eq!(
        engine.claim(&mut bank, "alice", 2, now).unwrap_err(),
        EngineError::AlreadyClaimed
    );

    // Payouts plus fee account for the whole pool.
    assert_eq!(291 + 1164 + 45, 1500);

    // Fee goes to the treasury exactly once.
    let resp = engine.withdraw(&mut bank, "owner").unwrap();
    assert_eq!(resp.get("amount"), Some("45"));
    assert_eq!(bank.balance("treasury"), 45);
    assert_eq!(
        engine.withdraw(&mut bank, "owner").unwrap_err(),
        EngineError::NoStackedFee
    );
}

#[test]
fn test_missed_execution_turns_into_refunds() {
    let (mut engine, mut oracle, mut bank) = setup();

    feed(&mut oracle, dec!(3), T0 - 10);
    engine.start_genesis_round("owner", T0).unwrap();
    engine
        .bet_native(&mut bank, "alice", Position::Down, 100, T0 + 5)
        .unwrap();
    engine
        .bet_native(&mut bank, "bob", Position::Up, 1000, T0 + 6)
        .unwrap();

    feed(&mut oracle, dec!(5), T0 + INTERVAL - 5);
    engine
        .execute_round("operator", T0 + INTERVAL, &oracle)
        .unwrap();

    // The operator misses round 2's grace window entirely.
    let late = T0 + 2 * INTERVAL + GRACE + 1;
    feed(&mut oracle, dec!(9), late);
    assert_eq!(
        engine.execute_round("operator", late, &oracle).unwrap_err(),
        EngineError::Expired
    );

    // Everyone gets exactly their stake back, winner-formula never applies.
    let resp = engine.claim(&mut bank, "alice", 2, late).unwrap();
    assert_eq!(resp.get("claim_amount"), Some("100"));
    let resp = engine.claim(&mut bank, "bob", 2, late).unwrap();
    assert_eq!(resp.get("claim_amount"), Some("1000"));
    assert_eq!(bank.balance("alice"), 10_000);
    assert_eq!(bank.balance("bob"), 10_000);
    assert_eq!(engine.state().total_fee, 0);
}

#[test]
fn test_push_round_refunds_everyone() {
    let (mut engine, mut oracle, mut bank) = setup();

    feed(&mut oracle, dec!(3), T0 - 10);
    engine.start_genesis_round("owner", T0).unwrap();
    engine
        .bet_native(&mut bank, "alice", Position::Down, 250, T0 + 5)
        .unwrap();
    engine
        .bet_native(&mut bank, "bob", Position::Up, 750, T0 + 6)
        .unwrap();

    feed(&mut oracle, dec!(4), T0 + INTERVAL - 5);
    engine
        .execute_round("operator", T0 + INTERVAL, &oracle)
        .unwrap();

    // Close equals open: push, no fee, refund-only.
    feed(&mut oracle, dec!(4), T0 + 2 * INTERVAL - 5);
    engine
        .execute_round("operator", T0 + 2 * INTERVAL, &oracle)
        .unwrap();
    assert_eq!(engine.state().total_fee, 0);

    let now = T0 + 2 * INTERVAL + 1;
    engine.claim(&mut bank, "alice", 2, now).unwrap();
    engine.claim(&mut bank, "bob", 2, now).unwrap();
    assert_eq!(bank.balance("alice"), 10_000);
    assert_eq!(bank.balance("bob"), 10_000);
}

#[test]
fn test_schedule_keeps_chaining_across_rounds() {
    let (mut engine, mut oracle, mut bank) = setup();

    feed(&mut oracle, dec!(3), T0 - 10);
    engine.start_genesis_round("owner", T0).unwrap();

    // Run four consecutive executions with a drifting price and a fresh
    // bettor per round; every next round must open at the previous close.
    let prices = [dec!(4), dec!(5), dec!(4.5), dec!(6)];
    for (i, price) in prices.iter().enumerate() {
        let epoch = engine.state().epoch;
        let round_end = engine.round(epoch - 1).unwrap().end_time;

        engine
            .bet_native(&mut bank, "alice", Position::Up, 10 + i as u64, round_end - 100)
            .unwrap_or_else(|e| panic!("bet in epoch {} failed: {}", epoch, e));

        feed(&mut oracle, *price, round_end - 5);
        engine.execute_round("operator", round_end, &oracle).unwrap();

        assert_eq!(engine.state().epoch, epoch + 1);
        assert_eq!(engine.round(epoch).unwrap().open_price, Some(*price));
        if let Some(previous) = prices.get(i.wrapping_sub(1)) {
            assert_eq!(engine.round(epoch - 1).unwrap().close_price, Some(*previous));
        }
    }
}
