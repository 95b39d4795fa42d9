//! Asset transfer contract
//!
//! Typed entry points for every public operation. Each takes a [`Context`]
//! scoped to one invocation; the string-argument surface lives in
//! [`crate::registry`].
//!
//! Mutating an existing asset (`UpdateAsset`, `DeleteAsset`,
//! `TransferAsset`) requires the caller to be its recorded owner.
//! `ConfirmOrder` requires the caller to be the order's business.

use crate::assets::AssetStore;
use crate::auth::AuthorizationGuard;
use crate::config::SeedAsset;
use crate::identity::IdentityResolver;
use crate::orders::OrderStore;
use crate::transfer::{TransferEngine, TransferSummary};
use crate::types::{Asset, Order};
use crate::world_state::WorldState;
use crate::Result;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

/// Contract metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContractInfo {
    /// Contract name used for routing
    pub name: &'static str,
    /// Human readable title
    pub title: &'static str,
    /// Description
    pub description: &'static str,
    /// Contract version
    pub version: &'static str,
}

/// Per-invocation facts supplied by the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Transaction ID (UUIDv7 for time-ordering)
    pub tx_id: String,
    /// Opaque caller identity token
    pub caller: String,
    /// Invocation timestamp
    pub timestamp: DateTime<Utc>,
}

impl Invocation {
    /// New invocation for `caller` with a fresh transaction ID
    pub fn new(caller: impl Into<String>) -> Self {
        Self {
            tx_id: Uuid::now_v7().to_string(),
            caller: caller.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Everything an operation may touch during one invocation
pub struct Context<'a> {
    /// World state view
    pub stub: &'a mut dyn WorldState,
    /// Caller and transaction
    pub invocation: &'a Invocation,
}

impl<'a> Context<'a> {
    /// Create context
    pub fn new(stub: &'a mut dyn WorldState, invocation: &'a Invocation) -> Self {
        Self { stub, invocation }
    }
}

impl std::fmt::Debug for Context<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("invocation", &self.invocation)
            .finish_non_exhaustive()
    }
}

/// The asset transfer contract
#[derive(Debug, Clone)]
pub struct AssetTransfer {
    assets: AssetStore,
    orders: OrderStore,
    engine: TransferEngine,
    seeds: Vec<SeedAsset>,
}

impl AssetTransfer {
    /// Create contract with the seed set used by `InitLedger`
    pub fn new(seeds: Vec<SeedAsset>) -> Result<Self> {
        let guard = AuthorizationGuard::new(IdentityResolver::new()?);
        Ok(Self {
            assets: AssetStore,
            orders: OrderStore,
            engine: TransferEngine::new(guard),
            seeds,
        })
    }

    /// Contract metadata
    pub fn info() -> ContractInfo {
        ContractInfo {
            name: "basic",
            title: "Asset Transfer",
            description: "Asset ownership, wallets and purchase orders",
            version: env!("CARGO_PKG_VERSION"),
        }
    }

    fn guard(&self) -> &AuthorizationGuard {
        self.engine.guard()
    }

    /// Create the seed assets
    ///
    /// Fails with `AlreadyExists` if any seed is already present, so a
    /// second run changes nothing.
    pub fn init_ledger(&self, ctx: &mut Context<'_>) -> Result<()> {
        for seed in &self.seeds {
            self.assets.create(
                &mut *ctx.stub,
                &seed.asset_id,
                &seed.asset_type,
                seed.price,
                &seed.owner,
            )?;
        }
        tracing::info!(assets = self.seeds.len(), "Ledger initialized");
        Ok(())
    }

    /// Create a new asset
    pub fn create_asset(
        &self,
        ctx: &mut Context<'_>,
        asset_id: &str,
        asset_type: &str,
        price: Decimal,
        owner: &str,
    ) -> Result<Asset> {
        self.assets
            .create(&mut *ctx.stub, asset_id, asset_type, price, owner)
    }

    /// Read an asset
    pub fn read_asset(&self, ctx: &mut Context<'_>, asset_id: &str) -> Result<Asset> {
        self.assets.read(&*ctx.stub, asset_id)
    }

    /// Replace an asset's fields; caller must own it
    pub fn update_asset(
        &self,
        ctx: &mut Context<'_>,
        asset_id: &str,
        asset_type: &str,
        price: Decimal,
        owner: &str,
    ) -> Result<Asset> {
        let current = self.assets.read(&*ctx.stub, asset_id)?;
        self.guard()
            .require_owner(&ctx.invocation.caller, current.owner())?;

        self.assets
            .update(&mut *ctx.stub, asset_id, asset_type, price, owner)
    }

    /// Delete an asset; caller must own it
    pub fn delete_asset(&self, ctx: &mut Context<'_>, asset_id: &str) -> Result<()> {
        let current = self.assets.read(&*ctx.stub, asset_id)?;
        self.guard()
            .require_owner(&ctx.invocation.caller, current.owner())?;

        self.assets.delete(&mut *ctx.stub, asset_id)
    }

    /// Whether an asset exists
    pub fn asset_exists(&self, ctx: &mut Context<'_>, asset_id: &str) -> Result<bool> {
        self.assets.exists(&*ctx.stub, asset_id)
    }

    /// Sell an asset to `new_owner` at its price; caller must own it
    pub fn transfer_asset(
        &self,
        ctx: &mut Context<'_>,
        asset_id: &str,
        new_owner: &str,
    ) -> Result<TransferSummary> {
        let current = self.assets.read(&*ctx.stub, asset_id)?;
        self.guard()
            .require_owner(&ctx.invocation.caller, current.owner())?;

        self.engine
            .transfer_direct(&mut *ctx.stub, asset_id, new_owner)
    }

    /// Every asset in lexical ID order
    pub fn get_all_assets(&self, ctx: &mut Context<'_>) -> Result<Vec<Asset>> {
        self.assets.list_all(&*ctx.stub)
    }

    /// Create an unconfirmed order without moving funds
    pub fn create_order(
        &self,
        ctx: &mut Context<'_>,
        purchaser: &str,
        business: &str,
        asset_id: &str,
    ) -> Result<Order> {
        self.engine.create_order(
            &mut *ctx.stub,
            &ctx.invocation.tx_id,
            purchaser,
            business,
            asset_id,
        )
    }

    /// Read an order
    pub fn read_order(&self, ctx: &mut Context<'_>, order_id: &str) -> Result<Order> {
        self.orders.read(&*ctx.stub, order_id)
    }

    /// Settle an order; caller must be its business
    pub fn confirm_order(&self, ctx: &mut Context<'_>, order_id: &str) -> Result<Order> {
        self.engine
            .confirm_order(&mut *ctx.stub, &ctx.invocation.caller, order_id)
    }

    /// Order an asset as the caller, paying up front; returns the order ID
    pub fn buy_asset(&self, ctx: &mut Context<'_>, asset_id: &str) -> Result<String> {
        let order = self.engine.buy(
            &mut *ctx.stub,
            &ctx.invocation.caller,
            &ctx.invocation.tx_id,
            asset_id,
        )?;
        Ok(order.order_id().to_string())
    }
}
