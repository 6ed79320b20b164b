// HTTP request handlers for the UpDown engine API

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde_json::{json, Value};

use crate::app_state::{now, BankBackend, SharedState};
use crate::error::EngineError;
use crate::models::*;

type ApiError = (StatusCode, Json<Value>);

fn reject(error: EngineError) -> ApiError {
    let status = match &error {
        EngineError::Unauthorized
        | EngineError::InvalidViewingKey
        | EngineError::InvalidPermit(_) => StatusCode::UNAUTHORIZED,
        EngineError::NotFound => StatusCode::NOT_FOUND,
        _ => StatusCode::BAD_REQUEST,
    };
    (status, Json(json!(ErrorResponse::new(&error))))
}

// ===== ENGINE QUERIES =====

pub async fn get_config(State(state): State<SharedState>) -> Json<Value> {
    let app_state = state.lock().unwrap();
    let config = app_state.engine.config();
    // prng_seed stays internal
    Json(json!({
        "owner": config.owner,
        "operator": config.operator,
        "treasury": config.treasury,
        "bet_asset": config.bet_asset,
        "oracle_addr": config.oracle_addr,
        "oracle_code_hash": config.oracle_code_hash,
        "fee_rate": config.fee_rate,
        "interval": config.interval,
        "grace_interval": config.grace_interval,
        "chain_id": config.chain_id,
        "contract_addr": config.contract_addr,
    }))
}

pub async fn get_state(State(state): State<SharedState>) -> Json<Value> {
    let app_state = state.lock().unwrap();
    Json(json!(app_state.engine.state()))
}

pub async fn get_round(
    State(state): State<SharedState>,
    Path(epoch): Path<u64>,
) -> Result<Json<Value>, ApiError> {
    let app_state = state.lock().unwrap();
    let round = app_state.engine.round(epoch).map_err(reject)?;
    Ok(Json(json!(round)))
}

pub async fn get_bet(
    State(state): State<SharedState>,
    Path((epoch, account)): Path<(u64, String)>,
    Query(params): Query<BetQueryParams>,
) -> Result<Json<Value>, ApiError> {
    let app_state = state.lock().unwrap();
    let bet = app_state
        .engine
        .query_bet(epoch, &account, &params.key)
        .map_err(reject)?;
    Ok(Json(json!(bet)))
}

pub async fn permit_query(
    State(state): State<SharedState>,
    Json(payload): Json<PermitQueryRequest>,
) -> Result<Json<Value>, ApiError> {
    let app_state = state.lock().unwrap();
    match payload.query {
        PermitQuery::Bet { epoch } => {
            let bet = app_state
                .engine
                .query_bet_with_permit(&payload.permit, epoch)
                .map_err(reject)?;
            Ok(Json(json!(bet)))
        }
    }
}

// ===== ROUND LIFECYCLE =====

pub async fn start_genesis(
    State(state): State<SharedState>,
    Json(payload): Json<GenesisRequest>,
) -> Result<Json<Value>, ApiError> {
    let mut app_state = state.lock().unwrap();
    let resp = app_state
        .engine
        .start_genesis_round(&payload.sender, now())
        .map_err(reject)?;
    app_state.log_activity("GENESIS", &format!("started by {}", payload.sender));
    Ok(Json(resp.to_json()))
}

pub async fn place_bet(
    State(state): State<SharedState>,
    Json(payload): Json<BetRequest>,
) -> Result<Json<Value>, ApiError> {
    let mut guard = state.lock().unwrap();
    let app_state = &mut *guard;
    let resp = app_state
        .engine
        .bet_native(
            &mut app_state.bank,
            &payload.sender,
            payload.position,
            payload.amount,
            now(),
        )
        .map_err(reject)?;
    app_state.log_activity(
        "BET",
        &format!(
            "{} staked {} on {}",
            payload.sender, payload.amount, payload.position
        ),
    );
    Ok(Json(resp.to_json()))
}

pub async fn receive_tokens(
    State(state): State<SharedState>,
    Json(payload): Json<ReceiveRequest>,
) -> Result<Json<Value>, ApiError> {
    let mut app_state = state.lock().unwrap();
    let resp = app_state
        .engine
        .receive(
            &payload.sender,
            &payload.from,
            payload.amount,
            payload.msg,
            now(),
        )
        .map_err(reject)?;
    app_state.log_activity(
        "BET",
        &format!("{} staked {} via token transfer", payload.from, payload.amount),
    );
    Ok(Json(resp.to_json()))
}

pub async fn execute_round(
    State(state): State<SharedState>,
    Json(payload): Json<ExecuteRequest>,
) -> Result<Json<Value>, ApiError> {
    let mut guard = state.lock().unwrap();
    let app_state = &mut *guard;
    let resp = app_state
        .engine
        .execute_round(&payload.sender, now(), &app_state.oracle)
        .map_err(reject)?;
    let detail = format!(
        "finished epoch {} at {}",
        resp.get("epoch_finish").unwrap_or("?"),
        resp.get("close_price").unwrap_or("?")
    );
    app_state.log_activity("EXECUTE", &detail);
    Ok(Json(resp.to_json()))
}

pub async fn claim(
    State(state): State<SharedState>,
    Json(payload): Json<ClaimRequest>,
) -> Result<Json<Value>, ApiError> {
    let mut guard = state.lock().unwrap();
    let app_state = &mut *guard;
    let resp = app_state
        .engine
        .claim(&mut app_state.bank, &payload.sender, payload.epoch, now())
        .map_err(reject)?;
    let detail = format!(
        "{} claimed {} from epoch {}",
        payload.sender,
        resp.get("claim_amount").unwrap_or("?"),
        payload.epoch
    );
    app_state.log_activity("CLAIM", &detail);
    Ok(Json(resp.to_json()))
}

pub async fn withdraw(
    State(state): State<SharedState>,
    Json(payload): Json<WithdrawRequest>,
) -> Result<Json<Value>, ApiError> {
    let mut guard = state.lock().unwrap();
    let app_state = &mut *guard;
    let resp = app_state
        .engine
        .withdraw(&mut app_state.bank, &payload.sender)
        .map_err(reject)?;
    let detail = format!("{} to treasury", resp.get("amount").unwrap_or("?"));
    app_state.log_activity("WITHDRAW", &detail);
    Ok(Json(resp.to_json()))
}

pub async fn pause(
    State(state): State<SharedState>,
    Json(payload): Json<PauseRequest>,
) -> Result<Json<Value>, ApiError> {
    let mut app_state = state.lock().unwrap();
    let resp = app_state.engine.pause(&payload.sender).map_err(reject)?;
    app_state.log_activity("PAUSE", &payload.sender);
    Ok(Json(resp.to_json()))
}

pub async fn unpause(
    State(state): State<SharedState>,
    Json(payload): Json<PauseRequest>,
) -> Result<Json<Value>, ApiError> {
    let mut app_state = state.lock().unwrap();
    let resp = app_state.engine.unpause(&payload.sender).map_err(reject)?;
    app_state.log_activity("UNPAUSE", &payload.sender);
    Ok(Json(resp.to_json()))
}

pub async fn update_config(
    State(state): State<SharedState>,
    Json(payload): Json<UpdateConfigRequest>,
) -> Result<Json<Value>, ApiError> {
    let mut app_state = state.lock().unwrap();
    let resp = app_state
        .engine
        .update_config(&payload.sender, payload.update)
        .map_err(reject)?;
    app_state.log_activity("UPDATE_CONFIG", &payload.sender);
    Ok(Json(resp.to_json()))
}

// ===== PRIVATE-QUERY AUTH =====

pub async fn set_viewing_key(
    State(state): State<SharedState>,
    Json(payload): Json<SetViewingKeyRequest>,
) -> Result<Json<Value>, ApiError> {
    let mut app_state = state.lock().unwrap();
    let resp = app_state
        .engine
        .set_viewing_key(&payload.sender, &payload.key)
        .map_err(reject)?;
    Ok(Json(resp.to_json()))
}

pub async fn create_viewing_key(
    State(state): State<SharedState>,
    Json(payload): Json<CreateViewingKeyRequest>,
) -> Result<Json<Value>, ApiError> {
    let mut app_state = state.lock().unwrap();
    let resp = app_state
        .engine
        .create_viewing_key(&payload.sender, &payload.entropy, now())
        .map_err(reject)?;
    Ok(Json(resp.to_json()))
}

pub async fn revoke_permit(
    State(state): State<SharedState>,
    Json(payload): Json<RevokePermitRequest>,
) -> Result<Json<Value>, ApiError> {
    let mut app_state = state.lock().unwrap();
    let resp = app_state
        .engine
        .revoke_permit(&payload.sender, &payload.permit_name)
        .map_err(reject)?;
    Ok(Json(resp.to_json()))
}

// ===== ORACLE =====

pub async fn oracle_register_asset(
    State(state): State<SharedState>,
    Json(payload): Json<RegisterAssetRequest>,
) -> Result<Json<Value>, ApiError> {
    let mut app_state = state.lock().unwrap();
    let resp = app_state
        .oracle
        .register_asset(&payload.sender, &payload.asset, &payload.feeder)
        .map_err(reject)?;
    app_state.log_activity(
        "REGISTER_ASSET",
        &format!("{} -> {}", payload.asset.asset_key(), payload.feeder),
    );
    Ok(Json(resp.to_json()))
}

pub async fn oracle_feed_price(
    State(state): State<SharedState>,
    Json(payload): Json<FeedPriceRequest>,
) -> Result<Json<Value>, ApiError> {
    let mut app_state = state.lock().unwrap();
    let resp = app_state
        .oracle
        .feed_price(&payload.sender, &payload.prices, now())
        .map_err(reject)?;
    app_state.log_activity("FEED_PRICE", &format!("{} quotes", payload.prices.len()));
    Ok(Json(resp.to_json()))
}

pub async fn oracle_update_config(
    State(state): State<SharedState>,
    Json(payload): Json<OracleConfigRequest>,
) -> Result<Json<Value>, ApiError> {
    let mut app_state = state.lock().unwrap();
    let resp = app_state
        .oracle
        .update_config(&payload.sender, &payload.owner)
        .map_err(reject)?;
    Ok(Json(resp.to_json()))
}

pub async fn oracle_get_config(State(state): State<SharedState>) -> Json<Value> {
    let app_state = state.lock().unwrap();
    Json(json!({ "owner": app_state.oracle.owner() }))
}

pub async fn oracle_get_price(
    State(state): State<SharedState>,
    Query(params): Query<AssetQueryParams>,
) -> Result<Json<Value>, ApiError> {
    use crate::oracle::PriceSource;

    let asset = params.to_asset().ok_or_else(|| {
        (
            StatusCode::BAD_REQUEST,
            Json(json!(ErrorResponse::new("denom or contract_addr required"))),
        )
    })?;

    let app_state = state.lock().unwrap();
    let price = app_state.oracle.latest_price(&asset).map_err(reject)?;
    Ok(Json(json!(price)))
}

pub async fn oracle_get_feeder(
    State(state): State<SharedState>,
    Query(params): Query<AssetQueryParams>,
) -> Result<Json<Value>, ApiError> {
    let asset = params.to_asset().ok_or_else(|| {
        (
            StatusCode::BAD_REQUEST,
            Json(json!(ErrorResponse::new("denom or contract_addr required"))),
        )
    })?;

    let app_state = state.lock().unwrap();
    let feeder = app_state.oracle.feeder(&asset).map_err(reject)?;
    Ok(Json(json!({ "feeder": feeder })))
}

// ===== BANK HELPERS =====

pub async fn get_balance(
    State(state): State<SharedState>,
    Path(account): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let app_state = state.lock().unwrap();
    match &app_state.bank {
        BankBackend::Memory(bank) => Ok(Json(json!({
            "account": account,
            "balance": bank.balance(&account),
        }))),
        BankBackend::Remote(_) => Err((
            StatusCode::BAD_REQUEST,
            Json(json!(ErrorResponse::new(
                "balances live on the remote bank"
            ))),
        )),
    }
}

pub async fn fund_account(
    State(state): State<SharedState>,
    Json(payload): Json<FundRequest>,
) -> Result<Json<Value>, ApiError> {
    let mut app_state = state.lock().unwrap();
    match &mut app_state.bank {
        BankBackend::Memory(bank) => {
            let balance = bank.fund(&payload.account, payload.amount);
            Ok(Json(json!({
                "success": true,
                "account": payload.account,
                "balance": balance,
            })))
        }
        BankBackend::Remote(_) => Err((
            StatusCode::BAD_REQUEST,
            Json(json!(ErrorResponse::new(
                "funding is managed by the remote bank"
            ))),
        )),
    }
}

// ===== MISC =====

pub async fn get_activity(State(state): State<SharedState>) -> Json<Value> {
    let app_state = state.lock().unwrap();
    Json(json!({ "activity": app_state.activity }))
}

pub async fn health_check() -> &'static str {
    "UpDown Prediction Engine - Online"
}
