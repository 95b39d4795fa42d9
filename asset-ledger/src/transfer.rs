//! Balance movements between wallets
//!
//! Every operation here issues several independent writes (asset, one or
//! two wallets, maybe an order). Nothing in this module makes them atomic
//! with respect to each other: a fault between two writes would leave the
//! ledger inconsistent. The host's all-or-nothing commit of an invocation's
//! write set is the only thing preventing that, and the engine performs no
//! compensation of its own.

use crate::assets::AssetStore;
use crate::auth::AuthorizationGuard;
use crate::orders::OrderStore;
use crate::types::{wallet_id, Asset, Order};
use crate::world_state::WorldState;
use crate::{Error, Result};
use rust_decimal::Decimal;
use serde::Serialize;

/// Wallet and its balance after a movement
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletBalance {
    /// Wallet asset ID
    pub wallet_id: String,
    /// Resulting balance
    pub balance: Decimal,
}

/// Outcome of a direct transfer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferSummary {
    /// Transferred asset
    #[serde(rename = "assetID")]
    pub asset_id: String,
    /// Asset category
    #[serde(rename = "type")]
    pub asset_type: String,
    /// Price paid
    pub price: Decimal,
    /// Owner before the transfer
    pub previous_owner: String,
    /// Owner after the transfer
    pub new_owner: String,
    /// Seller's wallet after being credited
    pub origin_wallet: WalletBalance,
    /// Buyer's wallet after being debited
    pub destination_wallet: WalletBalance,
}

fn debit(wallet: &Asset, amount: Decimal) -> Result<Decimal> {
    wallet.price().checked_sub(amount).ok_or_else(|| {
        Error::InvalidArgument(format!("Balance overflow debiting {}", wallet.asset_id()))
    })
}

fn credit(wallet: &Asset, amount: Decimal) -> Result<Decimal> {
    wallet.price().checked_add(amount).ok_or_else(|| {
        Error::InvalidArgument(format!("Balance overflow crediting {}", wallet.asset_id()))
    })
}

/// Wallets carry the balance a trade moves, so they are never the traded asset
fn ensure_tradable(asset: &Asset) -> Result<()> {
    if asset.is_wallet() {
        tracing::info!(asset_id = asset.asset_id(), "Wallet cannot be traded");
        return Err(Error::InvalidArgument(format!(
            "{} is a wallet and cannot be traded",
            asset.asset_id()
        )));
    }
    Ok(())
}

fn require_funds(wallet: &Asset, required: Decimal) -> Result<()> {
    if wallet.price() < required {
        tracing::info!(
            wallet = wallet.asset_id(),
            balance = %wallet.price(),
            required = %required,
            "Insufficient funds"
        );
        return Err(Error::InsufficientFunds {
            wallet: wallet.asset_id().to_string(),
            balance: wallet.price(),
            required,
        });
    }
    Ok(())
}

/// Direct transfers and the buy/confirm order flow
#[derive(Debug, Clone)]
pub struct TransferEngine {
    assets: AssetStore,
    orders: OrderStore,
    guard: AuthorizationGuard,
}

impl TransferEngine {
    /// Create new engine
    pub fn new(guard: AuthorizationGuard) -> Self {
        Self {
            assets: AssetStore,
            orders: OrderStore,
            guard,
        }
    }

    /// Guard used for caller checks
    pub fn guard(&self) -> &AuthorizationGuard {
        &self.guard
    }

    /// Move `asset_id` to `new_owner`, paid from `new_owner`'s wallet
    ///
    /// Writes, in order: the reassigned asset, the debited destination
    /// wallet (its owner field rewritten to `new_owner`), the credited
    /// origin wallet. If both wallets are the same record the movement
    /// nets to zero.
    pub fn transfer_direct(
        &self,
        state: &mut dyn WorldState,
        asset_id: &str,
        new_owner: &str,
    ) -> Result<TransferSummary> {
        let asset = self.assets.read(state, asset_id)?;
        ensure_tradable(&asset)?;
        let price = asset.price();

        let origin_id = wallet_id(asset.owner());
        let destination_id = wallet_id(new_owner);

        let destination = self.assets.read(state, &destination_id)?;
        let origin = self.assets.read(state, &origin_id)?;

        require_funds(&destination, price)?;

        self.assets.put(state, &asset.with_owner(new_owner))?;

        let (origin_after, destination_after) = if origin_id == destination_id {
            let unchanged = destination.with_owner(new_owner);
            (unchanged.clone(), unchanged)
        } else {
            (
                origin.with_price(credit(&origin, price)?),
                destination
                    .with_price(debit(&destination, price)?)
                    .with_owner(new_owner),
            )
        };

        self.assets.put(state, &destination_after)?;
        if origin_id != destination_id {
            self.assets.put(state, &origin_after)?;
        }

        tracing::info!(
            asset_id,
            asset_type = asset.asset_type(),
            price = %price,
            from = asset.owner(),
            to = new_owner,
            origin_balance = %origin_after.price(),
            destination_balance = %destination_after.price(),
            "Asset ownership transferred"
        );

        Ok(TransferSummary {
            asset_id: asset_id.to_string(),
            asset_type: asset.asset_type().to_string(),
            price,
            previous_owner: asset.owner().to_string(),
            new_owner: new_owner.to_string(),
            origin_wallet: WalletBalance {
                wallet_id: origin_id,
                balance: origin_after.price(),
            },
            destination_wallet: WalletBalance {
                wallet_id: destination_id,
                balance: destination_after.price(),
            },
        })
    }

    /// Place an order for `asset_id` as the caller, paying up front
    ///
    /// The caller's wallet is debited now (and its owner field rewritten to
    /// the seller); the asset itself only moves on confirmation.
    pub fn buy(
        &self,
        state: &mut dyn WorldState,
        caller_token: &str,
        tx_id: &str,
        asset_id: &str,
    ) -> Result<Order> {
        let purchaser = self.guard.caller(caller_token)?;
        let asset = self.assets.read(state, asset_id)?;
        ensure_tradable(&asset)?;

        let wallet = self.assets.read(state, &purchaser.wallet_id())?;
        require_funds(&wallet, asset.price())?;

        let order_id = OrderStore::derive_id(asset_id, purchaser.as_str(), tx_id);
        let order = self.orders.create(
            state,
            Order::new(order_id, purchaser.as_str(), asset.owner(), asset_id)
                .with_paid(asset.price()),
        )?;

        let debited = wallet
            .with_price(debit(&wallet, asset.price())?)
            .with_owner(asset.owner());
        self.assets.put(state, &debited)?;

        tracing::info!(
            order_id = order.order_id(),
            asset_id,
            purchaser = %purchaser,
            business = asset.owner(),
            price = %asset.price(),
            balance = %debited.price(),
            "Order placed"
        );

        Ok(order)
    }

    /// Create an unconfirmed order without moving funds
    pub fn create_order(
        &self,
        state: &mut dyn WorldState,
        tx_id: &str,
        purchaser: &str,
        business: &str,
        asset_id: &str,
    ) -> Result<Order> {
        let order_id = OrderStore::derive_id(asset_id, purchaser, tx_id);
        let order = self
            .orders
            .create(state, Order::new(order_id, purchaser, business, asset_id))?;

        tracing::info!(
            order_id = order.order_id(),
            asset_id,
            purchaser,
            business,
            "Order created"
        );

        Ok(order)
    }

    /// Settle an order as its business
    ///
    /// Credits the business wallet, hands the asset to the purchaser and
    /// marks the order confirmed. The credit is the amount recorded as paid
    /// when the order was placed; orders created without payment credit the
    /// asset's current price.
    pub fn confirm_order(
        &self,
        state: &mut dyn WorldState,
        caller_token: &str,
        order_id: &str,
    ) -> Result<Order> {
        let order = self.orders.read(state, order_id)?;
        if order.is_confirmed() {
            tracing::info!(order_id, "Order already confirmed");
            return Err(Error::AlreadyConfirmed(order_id.to_string()));
        }

        self.guard.require_owner(caller_token, order.business())?;

        let asset = self.assets.read(state, order.asset_id())?;
        ensure_tradable(&asset)?;
        let wallet = self.assets.read(state, &wallet_id(order.business()))?;

        let amount = order.paid().unwrap_or_else(|| asset.price());
        let credited = wallet.with_price(credit(&wallet, amount)?);
        self.assets.put(state, &credited)?;
        self.assets.put(state, &asset.with_owner(order.purchaser()))?;

        let confirmed = self.orders.update(state, &order.confirmed())?;

        tracing::info!(
            order_id,
            asset_id = order.asset_id(),
            purchaser = order.purchaser(),
            business = order.business(),
            amount = %amount,
            "Order confirmed"
        );

        Ok(confirmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::IdentityResolver;
    use crate::memory::MemoryStorage;
    use crate::world_state::TxState;

    const SELLER: &str = "x509::CN=alice, OU=client::CN=ca.org1.example.com, O=org1.example.com";
    const BUYER: &str = "x509::CN=bob, OU=client::CN=ca.org2.example.com, O=org2.example.com";
    const SELLER_ID: &str = "alice@org1.example.com";
    const BUYER_ID: &str = "bob@org2.example.com";

    fn engine() -> TransferEngine {
        TransferEngine::new(AuthorizationGuard::new(IdentityResolver::new().unwrap()))
    }

    fn create(state: &mut dyn WorldState, id: &str, asset_type: &str, price: i64, owner: &str) {
        AssetStore
            .create(state, id, asset_type, Decimal::from(price), owner)
            .unwrap();
    }

    fn balance(state: &dyn WorldState, id: &str) -> Decimal {
        AssetStore.read(state, id).unwrap().price()
    }

    #[test]
    fn test_transfer_direct_moves_asset_and_funds() {
        let backend = MemoryStorage::new();
        let mut state = TxState::new(&backend);
        create(&mut state, "A-wallet", "money", 5000, "A");
        create(&mut state, "B-wallet", "money", 5000, "B");
        create(&mut state, "asset1", "water", 1000, "A");

        let summary = engine().transfer_direct(&mut state, "asset1", "B").unwrap();

        assert_eq!(AssetStore.read(&state, "asset1").unwrap().owner(), "B");
        assert_eq!(balance(&state, "B-wallet"), Decimal::from(4000));
        assert_eq!(balance(&state, "A-wallet"), Decimal::from(6000));

        assert_eq!(summary.previous_owner, "A");
        assert_eq!(summary.new_owner, "B");
        assert_eq!(summary.origin_wallet.balance, Decimal::from(6000));
        assert_eq!(summary.destination_wallet.balance, Decimal::from(4000));
    }

    #[test]
    fn test_transfer_direct_exact_balance_succeeds() {
        let backend = MemoryStorage::new();
        let mut state = TxState::new(&backend);
        create(&mut state, "A-wallet", "money", 0, "A");
        create(&mut state, "B-wallet", "money", 1000, "B");
        create(&mut state, "asset1", "water", 1000, "A");

        engine().transfer_direct(&mut state, "asset1", "B").unwrap();
        assert_eq!(balance(&state, "B-wallet"), Decimal::ZERO);
    }

    #[test]
    fn test_transfer_direct_insufficient_funds() {
        let backend = MemoryStorage::new();
        let mut state = TxState::new(&backend);
        create(&mut state, "A-wallet", "money", 5000, "A");
        create(&mut state, "B-wallet", "money", 500, "B");
        create(&mut state, "asset1", "water", 1000, "A");

        let err = engine().transfer_direct(&mut state, "asset1", "B").unwrap_err();

        assert!(matches!(err, Error::InsufficientFunds { .. }));
        assert_eq!(AssetStore.read(&state, "asset1").unwrap().owner(), "A");
        assert_eq!(balance(&state, "B-wallet"), Decimal::from(500));
        assert_eq!(balance(&state, "A-wallet"), Decimal::from(5000));
    }

    #[test]
    fn test_transfer_direct_missing_records() {
        let backend = MemoryStorage::new();
        let mut state = TxState::new(&backend);
        let engine = engine();

        let err = engine.transfer_direct(&mut state, "ghost", "B").unwrap_err();
        assert_eq!(err.code(), "ASSET_NOT_FOUND");

        create(&mut state, "asset1", "water", 1000, "A");
        create(&mut state, "A-wallet", "money", 5000, "A");
        let err = engine.transfer_direct(&mut state, "asset1", "B").unwrap_err();
        assert!(matches!(err, Error::NotFound { ref id, .. } if id == "B-wallet"));
    }

    #[test]
    fn test_transfer_to_current_owner_nets_to_zero() {
        let backend = MemoryStorage::new();
        let mut state = TxState::new(&backend);
        create(&mut state, "A-wallet", "money", 5000, "A");
        create(&mut state, "asset1", "water", 1000, "A");

        engine().transfer_direct(&mut state, "asset1", "A").unwrap();
        assert_eq!(balance(&state, "A-wallet"), Decimal::from(5000));
    }

    #[test]
    fn test_buy_then_confirm() {
        let backend = MemoryStorage::new();
        let mut state = TxState::new(&backend);
        let engine = engine();
        create(&mut state, &wallet_id(SELLER_ID), "money", 100, SELLER_ID);
        create(&mut state, &wallet_id(BUYER_ID), "money", 1500, BUYER_ID);
        create(&mut state, "asset1", "water", 1000, SELLER_ID);

        let order = engine.buy(&mut state, BUYER, "tx-1", "asset1").unwrap();
        assert_eq!(order.purchaser(), BUYER_ID);
        assert_eq!(order.business(), SELLER_ID);
        assert!(!order.is_confirmed());

        // Paid up front, asset not yet moved
        assert_eq!(balance(&state, &wallet_id(BUYER_ID)), Decimal::from(500));
        assert_eq!(AssetStore.read(&state, "asset1").unwrap().owner(), SELLER_ID);

        let confirmed = engine
            .confirm_order(&mut state, SELLER, order.order_id())
            .unwrap();
        assert!(confirmed.is_confirmed());
        assert_eq!(AssetStore.read(&state, "asset1").unwrap().owner(), BUYER_ID);
        assert_eq!(balance(&state, &wallet_id(SELLER_ID)), Decimal::from(1100));

        let again = engine
            .confirm_order(&mut state, SELLER, order.order_id())
            .unwrap_err();
        assert!(matches!(again, Error::AlreadyConfirmed(_)));
        assert!(OrderStore.read(&state, order.order_id()).unwrap().is_confirmed());
    }

    #[test]
    fn test_buy_insufficient_funds_creates_nothing() {
        let backend = MemoryStorage::new();
        let mut state = TxState::new(&backend);
        create(&mut state, &wallet_id(BUYER_ID), "money", 10, BUYER_ID);
        create(&mut state, "asset1", "water", 1000, SELLER_ID);

        let err = engine().buy(&mut state, BUYER, "tx-1", "asset1").unwrap_err();
        assert!(matches!(err, Error::InsufficientFunds { .. }));
        assert!(OrderStore.list_all(&state).unwrap().is_empty());
    }

    #[test]
    fn test_buy_replay_collides() {
        let backend = MemoryStorage::new();
        let mut state = TxState::new(&backend);
        let engine = engine();
        create(&mut state, &wallet_id(BUYER_ID), "money", 5000, BUYER_ID);
        create(&mut state, "asset1", "water", 1000, SELLER_ID);

        engine.buy(&mut state, BUYER, "tx-1", "asset1").unwrap();
        let err = engine.buy(&mut state, BUYER, "tx-1", "asset1").unwrap_err();
        assert_eq!(err.code(), "ORDER_ALREADY_EXISTS");
    }

    #[test]
    fn test_buy_with_malformed_identity() {
        let backend = MemoryStorage::new();
        let mut state = TxState::new(&backend);
        create(&mut state, "asset1", "water", 1000, SELLER_ID);

        let err = engine().buy(&mut state, "nobody", "tx-1", "asset1").unwrap_err();
        assert!(matches!(err, Error::MalformedIdentity(_)));
    }

    #[test]
    fn test_confirm_requires_business() {
        let backend = MemoryStorage::new();
        let mut state = TxState::new(&backend);
        let engine = engine();
        create(&mut state, &wallet_id(SELLER_ID), "money", 0, SELLER_ID);
        create(&mut state, "asset1", "water", 1000, SELLER_ID);

        let order = engine
            .create_order(&mut state, "tx-1", BUYER_ID, SELLER_ID, "asset1")
            .unwrap();

        let err = engine
            .confirm_order(&mut state, BUYER, order.order_id())
            .unwrap_err();
        assert!(matches!(err, Error::Unauthorized { .. }));
        assert!(!OrderStore.read(&state, order.order_id()).unwrap().is_confirmed());
    }

    #[test]
    fn test_confirm_missing_asset() {
        let backend = MemoryStorage::new();
        let mut state = TxState::new(&backend);
        let engine = engine();
        create(&mut state, &wallet_id(SELLER_ID), "money", 0, SELLER_ID);

        let order = engine
            .create_order(&mut state, "tx-1", BUYER_ID, SELLER_ID, "gone")
            .unwrap();
        let err = engine
            .confirm_order(&mut state, SELLER, order.order_id())
            .unwrap_err();
        assert_eq!(err.code(), "ASSET_NOT_FOUND");
    }

    #[test]
    fn test_wallet_cannot_be_traded_directly() {
        let backend = MemoryStorage::new();
        let mut state = TxState::new(&backend);
        create(&mut state, "A-wallet", "money", 5000, "A");
        create(&mut state, "B-wallet", "money", 5000, "B");

        let err = engine().transfer_direct(&mut state, "A-wallet", "B").unwrap_err();
        assert_eq!(err.code(), "INVALID_ARGUMENT");

        let wallet = AssetStore.read(&state, "A-wallet").unwrap();
        assert_eq!(wallet.owner(), "A");
        assert_eq!(wallet.price(), Decimal::from(5000));
        assert_eq!(balance(&state, "B-wallet"), Decimal::from(5000));
    }

    #[test]
    fn test_wallet_cannot_be_bought() {
        let backend = MemoryStorage::new();
        let mut state = TxState::new(&backend);
        create(&mut state, &wallet_id(SELLER_ID), "money", 1000, SELLER_ID);
        create(&mut state, &wallet_id(BUYER_ID), "money", 1500, BUYER_ID);

        let err = engine()
            .buy(&mut state, BUYER, "tx-1", &wallet_id(SELLER_ID))
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_ARGUMENT");
        assert!(OrderStore.list_all(&state).unwrap().is_empty());
        assert_eq!(balance(&state, &wallet_id(BUYER_ID)), Decimal::from(1500));
    }

    #[test]
    fn test_confirm_rejects_wallet_order() {
        let backend = MemoryStorage::new();
        let mut state = TxState::new(&backend);
        let engine = engine();
        create(&mut state, &wallet_id(SELLER_ID), "money", 1000, SELLER_ID);

        let order = engine
            .create_order(&mut state, "tx-1", BUYER_ID, SELLER_ID, &wallet_id(SELLER_ID))
            .unwrap();
        let err = engine
            .confirm_order(&mut state, SELLER, order.order_id())
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_ARGUMENT");

        let wallet = AssetStore.read(&state, &wallet_id(SELLER_ID)).unwrap();
        assert_eq!(wallet.owner(), SELLER_ID);
        assert_eq!(wallet.price(), Decimal::from(1000));
        assert!(!OrderStore.read(&state, order.order_id()).unwrap().is_confirmed());
    }

    #[test]
    fn test_confirm_credits_amount_paid() {
        let backend = MemoryStorage::new();
        let mut state = TxState::new(&backend);
        let engine = engine();
        create(&mut state, &wallet_id(SELLER_ID), "money", 100, SELLER_ID);
        create(&mut state, &wallet_id(BUYER_ID), "money", 1500, BUYER_ID);
        create(&mut state, "asset1", "water", 1000, SELLER_ID);

        let order = engine.buy(&mut state, BUYER, "tx-1", "asset1").unwrap();
        assert_eq!(order.paid(), Some(Decimal::from(1000)));

        // Repricing between buy and confirm must not mint or burn money
        AssetStore
            .update(&mut state, "asset1", "water", Decimal::from(5000), SELLER_ID)
            .unwrap();
        engine
            .confirm_order(&mut state, SELLER, order.order_id())
            .unwrap();

        assert_eq!(balance(&state, &wallet_id(SELLER_ID)), Decimal::from(1100));
        assert_eq!(balance(&state, &wallet_id(BUYER_ID)), Decimal::from(500));
        assert_eq!(AssetStore.read(&state, "asset1").unwrap().owner(), BUYER_ID);
    }

    #[test]
    fn test_unpaid_order_credits_current_price() {
        let backend = MemoryStorage::new();
        let mut state = TxState::new(&backend);
        let engine = engine();
        create(&mut state, &wallet_id(SELLER_ID), "money", 0, SELLER_ID);
        create(&mut state, "asset1", "water", 1000, SELLER_ID);

        let order = engine
            .create_order(&mut state, "tx-1", BUYER_ID, SELLER_ID, "asset1")
            .unwrap();
        assert_eq!(order.paid(), None);

        engine
            .confirm_order(&mut state, SELLER, order.order_id())
            .unwrap();
        assert_eq!(balance(&state, &wallet_id(SELLER_ID)), Decimal::from(1000));
    }
}
