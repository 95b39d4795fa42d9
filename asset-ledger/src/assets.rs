//! Asset records on the world state
//!
//! Assets live in [`Namespace::Asset`]. The store performs no authorization;
//! callers check ownership before `update`/`delete`.

use crate::error::RecordKind;
use crate::types::{decode_record, encode_record, Asset};
use crate::world_state::{Namespace, WorldState};
use crate::{Error, Result};
use rust_decimal::Decimal;

/// CRUD over [`Asset`] records
#[derive(Debug, Clone, Copy, Default)]
pub struct AssetStore;

impl AssetStore {
    /// True iff a non-empty value is stored under `id`
    pub fn exists(&self, state: &dyn WorldState, id: &str) -> Result<bool> {
        let value = state.get_state(&Namespace::Asset.key(id))?;
        Ok(value.is_some_and(|bytes| !bytes.is_empty()))
    }

    /// Store a new asset; `AlreadyExists` if the ID is taken
    pub fn create(
        &self,
        state: &mut dyn WorldState,
        id: &str,
        asset_type: &str,
        price: Decimal,
        owner: &str,
    ) -> Result<Asset> {
        if self.exists(state, id)? {
            tracing::info!(asset_id = id, "Asset already exists");
            return Err(Error::AlreadyExists {
                kind: RecordKind::Asset,
                id: id.to_string(),
            });
        }

        let asset = Asset::new(id, asset_type, price, owner);
        self.put(state, &asset)?;
        Ok(asset)
    }

    /// Load an asset; `NotFound` if absent or empty, `Corrupt` if undecodable
    pub fn read(&self, state: &dyn WorldState, id: &str) -> Result<Asset> {
        let key = Namespace::Asset.key(id);
        match state.get_state(&key)? {
            Some(bytes) if !bytes.is_empty() => decode_record(RecordKind::Asset, &key, &bytes),
            _ => {
                tracing::info!(asset_id = id, "Asset does not exist");
                Err(Error::asset_not_found(id))
            }
        }
    }

    /// Replace every field of an existing asset
    pub fn update(
        &self,
        state: &mut dyn WorldState,
        id: &str,
        asset_type: &str,
        price: Decimal,
        owner: &str,
    ) -> Result<Asset> {
        if !self.exists(state, id)? {
            tracing::info!(asset_id = id, "Asset does not exist");
            return Err(Error::asset_not_found(id));
        }

        let asset = Asset::new(id, asset_type, price, owner);
        self.put(state, &asset)?;
        Ok(asset)
    }

    /// Remove an asset; `NotFound` if absent
    pub fn delete(&self, state: &mut dyn WorldState, id: &str) -> Result<()> {
        if !self.exists(state, id)? {
            tracing::info!(asset_id = id, "Asset does not exist");
            return Err(Error::asset_not_found(id));
        }

        state.del_state(&Namespace::Asset.key(id))
    }

    /// Write a whole record under its own ID
    pub fn put(&self, state: &mut dyn WorldState, asset: &Asset) -> Result<()> {
        let value = encode_record(asset)?;
        state.put_state(&Namespace::Asset.key(asset.asset_id()), value)
    }

    /// Every asset, in lexical key order
    ///
    /// Scans the asset namespace only, so order records are never decoded
    /// here. Cost is linear in the number of assets.
    pub fn list_all(&self, state: &dyn WorldState) -> Result<Vec<Asset>> {
        let (start, end) = Namespace::Asset.range();

        state
            .get_state_by_range(start, end)?
            .into_iter()
            .filter(|(_, bytes)| !bytes.is_empty())
            .map(|(key, bytes)| decode_record(RecordKind::Asset, &key, &bytes))
            .collect()
    }
}
