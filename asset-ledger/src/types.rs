//! Core record types for the ledger
//!
//! Records are immutable values: every state transition builds a new record
//! and replaces the stored one wholesale. JSON field names are fixed because
//! they are the on-ledger format.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Suffix that turns a principal into its wallet asset ID
pub const WALLET_SUFFIX: &str = "-wallet";

/// Asset type carried by wallets
pub const MONEY_TYPE: &str = "money";

/// Wallet asset ID for a principal (`<principal>-wallet`)
pub fn wallet_id(principal: &str) -> String {
    format!("{}{}", principal, WALLET_SUFFIX)
}

/// Ledger-resident asset
///
/// A wallet is an ordinary asset whose ID is [`wallet_id`] of its owner and
/// whose price is the owner's money balance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Asset {
    #[serde(rename = "assetID")]
    asset_id: String,

    #[serde(rename = "type")]
    asset_type: String,

    price: Decimal,

    owner: String,
}

impl Asset {
    /// Create new asset value
    pub fn new(
        asset_id: impl Into<String>,
        asset_type: impl Into<String>,
        price: Decimal,
        owner: impl Into<String>,
    ) -> Self {
        Self {
            asset_id: asset_id.into(),
            asset_type: asset_type.into(),
            price,
            owner: owner.into(),
        }
    }

    /// Asset ID (also the ledger key inside the asset namespace)
    pub fn asset_id(&self) -> &str {
        &self.asset_id
    }

    /// Free-form category
    pub fn asset_type(&self) -> &str {
        &self.asset_type
    }

    /// Price, or balance for wallets
    pub fn price(&self) -> Decimal {
        self.price
    }

    /// Owning principal
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Whether the ID follows the wallet convention
    pub fn is_wallet(&self) -> bool {
        self.asset_id.ends_with(WALLET_SUFFIX)
    }

    /// Same asset with a different owner
    pub fn with_owner(&self, owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            ..self.clone()
        }
    }

    /// Same asset with a different price
    pub fn with_price(&self, price: Decimal) -> Self {
        Self {
            price,
            ..self.clone()
        }
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Asset [assetID={}, type={}, price={}, owner={}]",
            self.asset_id, self.asset_type, self.price, self.owner
        )
    }
}

/// Purchase intent of one asset by one principal from another
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Order {
    #[serde(rename = "orderId")]
    order_id: String,

    purchaser: String,

    business: String,

    #[serde(rename = "assetId")]
    asset_id: String,

    confirm: bool,

    /// Amount taken from the purchaser when the order was placed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    paid: Option<Decimal>,
}

impl Order {
    /// Create an unconfirmed order
    pub fn new(
        order_id: impl Into<String>,
        purchaser: impl Into<String>,
        business: impl Into<String>,
        asset_id: impl Into<String>,
    ) -> Self {
        Self {
            order_id: order_id.into(),
            purchaser: purchaser.into(),
            business: business.into(),
            asset_id: asset_id.into(),
            confirm: false,
            paid: None,
        }
    }

    /// Same order, recording the amount already debited from the purchaser
    pub fn with_paid(&self, amount: Decimal) -> Self {
        Self {
            paid: Some(amount),
            ..self.clone()
        }
    }

    /// Amount debited at placement; `None` for orders created without payment
    pub fn paid(&self) -> Option<Decimal> {
        self.paid
    }

    /// Order ID
    pub fn order_id(&self) -> &str {
        &self.order_id
    }

    /// Buying principal
    pub fn purchaser(&self) -> &str {
        &self.purchaser
    }

    /// Selling principal (asset owner when the order was placed)
    pub fn business(&self) -> &str {
        &self.business
    }

    /// Traded asset
    pub fn asset_id(&self) -> &str {
        &self.asset_id
    }

    /// Whether the order has been settled
    pub fn is_confirmed(&self) -> bool {
        self.confirm
    }

    /// Confirmed copy of this order
    ///
    /// The only state transition an order has.
    pub fn confirmed(&self) -> Self {
        Self {
            confirm: true,
            ..self.clone()
        }
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Order [orderId={}, purchaser={}, business={}, assetId={}, confirm={}]",
            self.order_id, self.purchaser, self.business, self.asset_id, self.confirm
        )
    }
}

/// Encode a record for storage
pub(crate) fn encode_record<T: Serialize>(record: &T) -> crate::Result<Vec<u8>> {
    Ok(serde_json::to_vec(record)?)
}

/// Decode a stored record
///
/// A present value that fails to decode is `Corrupt`, never `NotFound`.
pub(crate) fn decode_record<T: serde::de::DeserializeOwned>(
    kind: crate::error::RecordKind,
    key: &str,
    bytes: &[u8],
) -> crate::Result<T> {
    serde_json::from_slice(bytes).map_err(|e| crate::Error::Corrupt {
        kind,
        key: key.to_string(),
        reason: e.to_string(),
    })
}
