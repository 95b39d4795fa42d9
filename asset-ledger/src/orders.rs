//! Order records on the world state
//!
//! Orders live in [`Namespace::Order`] and are never deleted. Order IDs are
//! content hashes of `(asset, purchaser, transaction)`, so the same
//! invocation always derives the same ID and replays collide instead of
//! minting a second order.

use crate::error::RecordKind;
use crate::types::{decode_record, encode_record, Order};
use crate::world_state::{Namespace, WorldState};
use crate::{Error, Result};
use sha2::{Digest, Sha256};

/// Prefix of derived order IDs
pub const ORDER_ID_PREFIX: &str = "order-";

/// Hex characters of the digest kept in an order ID
const ORDER_ID_HEX_LEN: usize = 32;

/// CRUD over [`Order`] records
#[derive(Debug, Clone, Copy, Default)]
pub struct OrderStore;

impl OrderStore {
    /// Deterministic order ID for a purchase made in transaction `tx_id`
    pub fn derive_id(asset_id: &str, purchaser: &str, tx_id: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(asset_id.as_bytes());
        hasher.update([0u8]);
        hasher.update(purchaser.as_bytes());
        hasher.update([0u8]);
        hasher.update(tx_id.as_bytes());
        let digest = hex::encode(hasher.finalize());

        format!("{}{}", ORDER_ID_PREFIX, &digest[..ORDER_ID_HEX_LEN])
    }

    /// True iff a non-empty value is stored under `order_id`
    pub fn exists(&self, state: &dyn WorldState, order_id: &str) -> Result<bool> {
        let value = state.get_state(&Namespace::Order.key(order_id))?;
        Ok(value.is_some_and(|bytes| !bytes.is_empty()))
    }

    /// Store a new order; `AlreadyExists` on collision
    pub fn create(&self, state: &mut dyn WorldState, order: Order) -> Result<Order> {
        if self.exists(state, order.order_id())? {
            tracing::info!(order_id = order.order_id(), "Order already exists");
            return Err(Error::AlreadyExists {
                kind: RecordKind::Order,
                id: order.order_id().to_string(),
            });
        }

        self.put(state, &order)?;
        Ok(order)
    }

    /// Load an order; `NotFound` if absent, `Corrupt` if undecodable
    pub fn read(&self, state: &dyn WorldState, order_id: &str) -> Result<Order> {
        let key = Namespace::Order.key(order_id);
        match state.get_state(&key)? {
            Some(bytes) if !bytes.is_empty() => decode_record(RecordKind::Order, &key, &bytes),
            _ => {
                tracing::info!(order_id, "Order does not exist");
                Err(Error::order_not_found(order_id))
            }
        }
    }

    /// Replace an existing order; `NotFound` if absent
    pub fn update(&self, state: &mut dyn WorldState, order: &Order) -> Result<Order> {
        if !self.exists(state, order.order_id())? {
            return Err(Error::order_not_found(order.order_id()));
        }
        self.put(state, order)?;
        Ok(order.clone())
    }

    /// Write a whole record under its own ID
    pub fn put(&self, state: &mut dyn WorldState, order: &Order) -> Result<()> {
        let value = encode_record(order)?;
        state.put_state(&Namespace::Order.key(order.order_id()), value)
    }

    /// Every order, in lexical key order
    pub fn list_all(&self, state: &dyn WorldState) -> Result<Vec<Order>> {
        let (start, end) = Namespace::Order.range();

        state
            .get_state_by_range(start, end)?
            .into_iter()
            .filter(|(_, bytes)| !bytes.is_empty())
            .map(|(key, bytes)| decode_record(RecordKind::Order, &key, &bytes))
            .collect()
    }
}
