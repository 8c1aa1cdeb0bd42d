//! # Operation Table
//!
//! The wire surface of the ledger: a name-to-handler registry built once
//! at process startup and owned by whoever runs invocations. There is no
//! global dispatcher and no implicit registration; the host constructs an
//! [`OperationRegistry`] and routes each incoming call through
//! [`OperationRegistry::dispatch`] with the invocation's store.
//!
//! Every request arrives as a single serialized JSON payload. Malformed
//! payload JSON is an input validation error, unlike corrupt *stored*
//! bytes, which surface as deserialization errors.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::config::LedgerConfig;
use crate::entity::{Asset, Token};
use crate::error::{LedgerError, LedgerResult};
use crate::history::{GetHistoryRequest, GetOwnerHistoryRequest};
use crate::store::StateStore;
use crate::transfer::{BurnTokenRequest, TransferAssetRequest, TransferTokenRequest};
use crate::{assets, balances, history, tokens, transfer};

// ---------------------------------------------------------------------------
// Requests without a richer home
// ---------------------------------------------------------------------------

/// Input for a balance lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceOfRequest {
    pub owner: String,
    pub token_id: String,
}

/// Input for listing every holding of one owner.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetOwnerHoldingsRequest {
    pub owner: String,
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

type Handler = Box<dyn Fn(&mut dyn StateStore, &str) -> LedgerResult<Value> + Send + Sync>;

fn parse<T: serde::de::DeserializeOwned>(payload: &str) -> LedgerResult<T> {
    serde_json::from_str(payload)
        .map_err(|err| LedgerError::Validation(format!("malformed request payload: {err}")))
}

fn respond<T: serde::Serialize>(value: &T) -> LedgerResult<Value> {
    serde_json::to_value(value).map_err(|err| LedgerError::Store(err.to_string()))
}

/// The explicit operation table. Construct once, dispatch per invocation.
pub struct OperationRegistry {
    handlers: HashMap<&'static str, Handler>,
}

impl OperationRegistry {
    /// Builds the full operation table with the given configuration.
    pub fn new(config: LedgerConfig) -> Self {
        let mut handlers: HashMap<&'static str, Handler> = HashMap::new();

        handlers.insert(
            "CreateAsset",
            Box::new(|store, payload| {
                let input: Asset = parse(payload)?;
                assets::create_asset(store, input)?;
                Ok(Value::Null)
            }),
        );

        handlers.insert("MintToken", {
            let config = config.clone();
            Box::new(move |store, payload| {
                let input: Token = parse(payload)?;
                tokens::mint_token(store, &config, input)?;
                Ok(Value::Null)
            })
        });

        handlers.insert(
            "BalanceOf",
            Box::new(|store, payload| {
                let request: BalanceOfRequest = parse(payload)?;
                let balance = balances::balance_of(store, &request.owner, &request.token_id)?;
                respond(&balance)
            }),
        );

        handlers.insert(
            "TransferToken",
            Box::new(|store, payload| {
                let request: TransferTokenRequest = parse(payload)?;
                transfer::transfer_token(store, &request)?;
                Ok(Value::Null)
            }),
        );

        handlers.insert(
            "TransferAsset",
            Box::new(|store, payload| {
                let request: TransferAssetRequest = parse(payload)?;
                transfer::transfer_asset(store, &request)?;
                Ok(Value::Null)
            }),
        );

        handlers.insert(
            "BurnToken",
            Box::new(|store, payload| {
                let request: BurnTokenRequest = parse(payload)?;
                transfer::burn_token(store, &request)?;
                Ok(Value::Null)
            }),
        );

        handlers.insert(
            "GetHistory",
            Box::new(|store, payload| {
                let request: GetHistoryRequest = parse(payload)?;
                respond(&history::get_history(store, &request)?)
            }),
        );

        handlers.insert(
            "GetOwnerHistory",
            Box::new(|store, payload| {
                let request: GetOwnerHistoryRequest = parse(payload)?;
                respond(&history::get_owner_history(store, &request)?)
            }),
        );

        handlers.insert(
            "GetOwnerHoldings",
            Box::new(|store, payload| {
                let request: GetOwnerHoldingsRequest = parse(payload)?;
                respond(&balances::owner_holdings(store, &request.owner)?)
            }),
        );

        Self { handlers }
    }

    /// Routes one call to its handler.
    ///
    /// # Errors
    ///
    /// Validation error for an unknown operation name or malformed
    /// payload; otherwise whatever the operation itself produces.
    pub fn dispatch(
        &self,
        store: &mut dyn StateStore,
        operation: &str,
        payload: &str,
    ) -> LedgerResult<Value> {
        let handler = self
            .handlers
            .get(operation)
            .ok_or_else(|| LedgerError::Validation(format!("unknown operation: {operation}")))?;
        debug!(operation, tx_id = store.tx_id(), "dispatching operation");
        handler(store, payload)
    }

    /// The registered operation names, sorted.
    pub fn operations(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.handlers.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

impl Default for OperationRegistry {
    fn default() -> Self {
        Self::new(LedgerConfig::default())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
