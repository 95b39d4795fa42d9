//! Property-based tests for ledger invariants
//!
//! These tests use proptest to verify:
//! - Conservation: a transfer moves exactly the price between two wallets
//! - Funds boundary: a transfer fails iff the buyer's balance is below the price
//! - Listing: assets come back in lexical order and orders never appear
//! - Atomicity: a failed submit leaves the ledger unchanged

use asset_ledger::{
    assets::AssetStore,
    auth::AuthorizationGuard,
    config::StorageKind,
    orders::OrderStore,
    Config, Error, IdentityResolver, Ledger, MemoryStorage, Order, TransferEngine, TxState,
    WorldState,
};
use proptest::prelude::*;
use rust_decimal::Decimal;
use serde_json::Value;

const ALICE: &str = "x509::CN=alice, OU=client::CN=ca.org1.example.com, O=org1.example.com";
const BOB: &str = "x509::CN=bob, OU=client::CN=ca.org2.example.com, O=org2.example.com";
const ALICE_ID: &str = "alice@org1.example.com";
const BOB_ID: &str = "bob@org2.example.com";

/// Strategy for generating non-negative amounts with two decimal places
fn amount_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..1_000_000_00i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy for generating asset IDs outside the wallet convention
fn asset_id_strategy() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9]{0,8}"
}

fn engine() -> TransferEngine {
    TransferEngine::new(AuthorizationGuard::new(IdentityResolver::new().unwrap()))
}

fn price_of(state: &dyn WorldState, id: &str) -> Decimal {
    AssetStore.read(state, id).unwrap().price()
}

fn args(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

async fn create_test_ledger() -> Ledger {
    let config = Config {
        storage: StorageKind::Memory,
        ..Config::default()
    };
    Ledger::open(config).await.unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Transfers conserve the combined balance and respect the funds boundary
    #[test]
    fn prop_transfer_conserves_balances(
        origin in amount_strategy(),
        destination in amount_strategy(),
        price in amount_strategy(),
    ) {
        let backend = MemoryStorage::new();
        let mut state = TxState::new(&backend);
        let store = AssetStore;

        store.create(&mut state, "A-wallet", "money", origin, "A").unwrap();
        store.create(&mut state, "B-wallet", "money", destination, "B").unwrap();
        store.create(&mut state, "asset1", "water", price, "A").unwrap();

        let result = engine().transfer_direct(&mut state, "asset1", "B");

        if destination < price {
            let is_insufficient = matches!(result, Err(Error::InsufficientFunds { .. }));
            prop_assert!(is_insufficient);
            prop_assert_eq!(price_of(&state, "A-wallet"), origin);
            prop_assert_eq!(price_of(&state, "B-wallet"), destination);
            let asset1 = store.read(&state, "asset1").unwrap();
            prop_assert_eq!(asset1.owner(), "A");
        } else {
            let summary = result.unwrap();
            prop_assert_eq!(summary.new_owner.as_str(), "B");
            prop_assert_eq!(price_of(&state, "A-wallet"), origin + price);
            prop_assert_eq!(price_of(&state, "B-wallet"), destination - price);
            prop_assert_eq!(
                price_of(&state, "A-wallet") + price_of(&state, "B-wallet"),
                origin + destination
            );
            let asset1 = store.read(&state, "asset1").unwrap();
            prop_assert_eq!(asset1.owner(), "B");
        }
    }

    /// Listing returns exactly the created assets, sorted, with orders excluded
    #[test]
    fn prop_listing_sorted_and_isolated(
        ids in prop::collection::btree_set(asset_id_strategy(), 0..12),
        orders in 0usize..5,
    ) {
        let backend = MemoryStorage::new();
        let mut state = TxState::new(&backend);

        // Insert in reverse to make sure order comes from the keys
        for id in ids.iter().rev() {
            AssetStore.create(&mut state, id, "thing", Decimal::ONE, "A").unwrap();
        }
        for n in 0..orders {
            let order_id = OrderStore::derive_id("asset1", "B", &n.to_string());
            OrderStore
                .create(&mut state, Order::new(order_id, "B", "A", "asset1"))
                .unwrap();
        }

        let listed: Vec<String> = AssetStore
            .list_all(&state)
            .unwrap()
            .iter()
            .map(|a| a.asset_id().to_string())
            .collect();
        let expected: Vec<String> = ids.into_iter().collect();

        prop_assert_eq!(listed, expected);
        prop_assert_eq!(OrderStore.list_all(&state).unwrap().len(), orders);
    }

    /// Create then read returns the same record; a second create fails
    #[test]
    fn prop_create_then_read(
        id in asset_id_strategy(),
        asset_type in "[a-z]{1,10}",
        price in amount_strategy(),
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let ledger = create_test_ledger().await;
            let price_arg = price.to_string();

            let created = ledger
                .submit(ALICE, "CreateAsset", args(&[&id, &asset_type, &price_arg, ALICE_ID]))
                .await
                .unwrap();
            let read = ledger
                .evaluate(ALICE, "ReadAsset", args(&[&id]))
                .await
                .unwrap();
            assert_eq!(created, read);

            let json: Value = serde_json::from_str(&read).unwrap();
            assert_eq!(json["price"].as_str().unwrap().parse::<Decimal>().unwrap(), price);

            let err = ledger
                .submit(ALICE, "CreateAsset", args(&[&id, "other", "1", BOB_ID]))
                .await
                .unwrap_err();
            assert_eq!(err.code(), "ASSET_ALREADY_EXISTS");

            ledger.shutdown().await.unwrap();
        });
    }
}

#[cfg(test)]
mod integration_tests {
    use super::*;

    async fn seed_marketplace(ledger: &Ledger) {
        for (id, asset_type, price, owner) in [
            ("alice@org1.example.com-wallet", "money", "100", ALICE_ID),
            ("bob@org2.example.com-wallet", "money", "1500", BOB_ID),
            ("asset1", "water", "1000", ALICE_ID),
        ] {
            ledger
                .submit(ALICE, "CreateAsset", args(&[id, asset_type, price, owner]))
                .await
                .unwrap();
        }
    }

    async fn read(ledger: &Ledger, op: &str, id: &str) -> Value {
        serde_json::from_str(&ledger.evaluate(ALICE, op, args(&[id])).await.unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_full_order_lifecycle() {
        let ledger = create_test_ledger().await;
        seed_marketplace(&ledger).await;

        // Bob orders and pays up front
        let order_id: String = serde_json::from_str(
            &ledger.submit(BOB, "BuyAsset", args(&["asset1"])).await.unwrap(),
        )
        .unwrap();
        assert!(order_id.starts_with("order-"));

        let wallet = read(&ledger, "ReadAsset", "bob@org2.example.com-wallet").await;
        assert_eq!(wallet["price"], "500");
        assert_eq!(wallet["owner"], ALICE_ID);

        let order = read(&ledger, "ReadOrder", &order_id).await;
        assert_eq!(order["confirm"], false);
        assert_eq!(order["business"], ALICE_ID);

        // Only the business may confirm
        let err = ledger
            .submit(BOB, "ConfirmOrder", args(&[&order_id]))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "UNAUTHORIZED");

        ledger
            .submit(ALICE, "ConfirmOrder", args(&[&order_id]))
            .await
            .unwrap();

        let order = read(&ledger, "ReadOrder", &order_id).await;
        assert_eq!(order["confirm"], true);
        assert_eq!(read(&ledger, "ReadAsset", "asset1").await["owner"], BOB_ID);
        assert_eq!(
            read(&ledger, "ReadAsset", "alice@org1.example.com-wallet").await["price"],
            "1100"
        );

        let err = ledger
            .submit(ALICE, "ConfirmOrder", args(&[&order_id]))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "ORDER_ALREADY_CONFIRMED");

        // Orders stay out of the asset listing
        let all: Value =
            serde_json::from_str(&ledger.evaluate(ALICE, "GetAllAssets", vec![]).await.unwrap())
                .unwrap();
        assert_eq!(all.as_array().unwrap().len(), 3);

        ledger.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_transfer_requires_owner_and_funds() {
        let ledger = create_test_ledger().await;
        seed_marketplace(&ledger).await;

        let err = ledger
            .submit(BOB, "TransferAsset", args(&["asset1", BOB_ID]))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "UNAUTHORIZED");

        let err = ledger
            .submit(ALICE, "TransferAsset", args(&["ghost", BOB_ID]))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "ASSET_NOT_FOUND");

        let summary: Value = serde_json::from_str(
            &ledger
                .submit(ALICE, "TransferAsset", args(&["asset1", BOB_ID]))
                .await
                .unwrap(),
        )
        .unwrap();
        assert_eq!(summary["previousOwner"], ALICE_ID);
        assert_eq!(summary["newOwner"], BOB_ID);

        // Bob, now the owner, sells it back and alice pays from 1100
        ledger
            .submit(BOB, "TransferAsset", args(&["asset1", ALICE_ID]))
            .await
            .unwrap();
        assert_eq!(
            read(&ledger, "ReadAsset", "alice@org1.example.com-wallet").await["price"],
            "100"
        );
        assert_eq!(
            read(&ledger, "ReadAsset", "bob@org2.example.com-wallet").await["price"],
            "1500"
        );

        ledger.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_insufficient_funds_leaves_state_unchanged() {
        let ledger = create_test_ledger().await;
        for (id, asset_type, price, owner) in [
            ("alice@org1.example.com-wallet", "money", "0", ALICE_ID),
            ("bob@org2.example.com-wallet", "money", "500", BOB_ID),
            ("asset1", "water", "1000", ALICE_ID),
        ] {
            ledger
                .submit(ALICE, "CreateAsset", args(&[id, asset_type, price, owner]))
                .await
                .unwrap();
        }

        let err = ledger
            .submit(ALICE, "TransferAsset", args(&["asset1", BOB_ID]))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "INSUFFICIENT_FUNDS");

        assert_eq!(read(&ledger, "ReadAsset", "asset1").await["owner"], ALICE_ID);
        assert_eq!(
            read(&ledger, "ReadAsset", "bob@org2.example.com-wallet").await["price"],
            "500"
        );
        assert_eq!(
            read(&ledger, "ReadAsset", "alice@org1.example.com-wallet").await["price"],
            "0"
        );

        ledger.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_init_ledger_seeds_once() {
        let ledger = create_test_ledger().await;

        assert_eq!(ledger.submit(ALICE, "InitLedger", vec![]).await.unwrap(), "null");
        let err = ledger.submit(ALICE, "InitLedger", vec![]).await.unwrap_err();
        assert_eq!(err.code(), "ASSET_ALREADY_EXISTS");

        let all: Value =
            serde_json::from_str(&ledger.evaluate(ALICE, "GetAllAssets", vec![]).await.unwrap())
                .unwrap();
        let ids: Vec<&str> = all
            .as_array()
            .unwrap()
            .iter()
            .map(|a| a["assetID"].as_str().unwrap())
            .collect();
        assert_eq!(
            ids,
            vec!["A-wallet", "B-wallet", "asset1", "asset2", "asset3", "asset5", "asset6"]
        );

        ledger.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_malformed_caller_is_rejected() {
        let ledger = create_test_ledger().await;
        seed_marketplace(&ledger).await;

        let err = ledger
            .submit("not-a-token", "BuyAsset", args(&["asset1"]))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "MALFORMED_IDENTITY");
        assert!(err.is_authorization_failure());

        ledger.shutdown().await.unwrap();
    }
}
