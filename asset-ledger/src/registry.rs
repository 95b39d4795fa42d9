//! Operation registry
//!
//! Maps public operation names to typed handlers on [`AssetTransfer`]. The
//! table is explicit and validated once at construction; dispatch never
//! reflects on names.

use crate::contract::{AssetTransfer, Context, ContractInfo};
use crate::config::SeedAsset;
use crate::{Error, Result};
use rust_decimal::Decimal;
use serde_json::Value;
use std::collections::BTreeMap;
use std::str::FromStr;

/// Whether an operation's writes are committed
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum Intent {
    /// Writes are committed on success
    Submit,
    /// Read-only; writes are never committed
    Evaluate,
}

/// Positional string arguments of one invocation
#[derive(Debug, Clone, Copy)]
pub struct Args<'a> {
    operation: &'a str,
    values: &'a [String],
}

impl<'a> Args<'a> {
    /// Wrap raw arguments
    pub fn new(operation: &'a str, values: &'a [String]) -> Self {
        Self { operation, values }
    }

    /// Argument `index` as text
    pub fn str(&self, index: usize) -> Result<&'a str> {
        self.values
            .get(index)
            .map(String::as_str)
            .ok_or_else(|| {
                Error::InvalidArgument(format!(
                    "{} is missing argument {}",
                    self.operation, index
                ))
            })
    }

    /// Argument `index` as a decimal amount
    pub fn decimal(&self, index: usize) -> Result<Decimal> {
        let raw = self.str(index)?;
        Decimal::from_str(raw.trim()).map_err(|e| {
            Error::InvalidArgument(format!(
                "{} argument {} is not a decimal ({}): {}",
                self.operation, index, raw, e
            ))
        })
    }
}

/// Typed handler behind an operation name
pub type Handler = fn(&AssetTransfer, &mut Context<'_>, &Args<'_>) -> Result<Value>;

/// One registered operation
#[derive(Clone, Copy)]
pub struct Operation {
    /// Public name
    pub name: &'static str,
    /// Submit or evaluate
    pub intent: Intent,
    /// Parameter names, in positional order
    pub params: &'static [&'static str],
    handler: Handler,
}

impl Operation {
    /// Describe an operation
    pub const fn new(
        name: &'static str,
        intent: Intent,
        params: &'static [&'static str],
        handler: Handler,
    ) -> Self {
        Self {
            name,
            intent,
            params,
            handler,
        }
    }
}

impl std::fmt::Debug for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Operation")
            .field("name", &self.name)
            .field("intent", &self.intent)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// Name to handler table
#[derive(Debug, Clone)]
pub struct Registry {
    operations: BTreeMap<&'static str, Operation>,
}

impl Registry {
    /// Build a table; rejects empty, non-alphanumeric and duplicate names
    pub fn new(operations: impl IntoIterator<Item = Operation>) -> Result<Self> {
        let mut table = BTreeMap::new();

        for op in operations {
            if op.name.is_empty() || !op.name.chars().all(|c| c.is_ascii_alphanumeric()) {
                return Err(Error::Registry(format!("Invalid operation name: {:?}", op.name)));
            }
            if table.insert(op.name, op).is_some() {
                return Err(Error::Registry(format!("Duplicate operation: {}", op.name)));
            }
        }

        Ok(Self { operations: table })
    }

    /// Table of the asset transfer contract
    pub fn asset_transfer() -> Result<Self> {
        Self::new([
            Operation::new("InitLedger", Intent::Submit, &[], init_ledger),
            Operation::new(
                "CreateAsset",
                Intent::Submit,
                &["assetID", "type", "price", "owner"],
                create_asset,
            ),
            Operation::new("ReadAsset", Intent::Evaluate, &["assetID"], read_asset),
            Operation::new(
                "UpdateAsset",
                Intent::Submit,
                &["assetID", "type", "price", "owner"],
                update_asset,
            ),
            Operation::new("DeleteAsset", Intent::Submit, &["assetID"], delete_asset),
            Operation::new("AssetExists", Intent::Evaluate, &["assetID"], asset_exists),
            Operation::new(
                "TransferAsset",
                Intent::Submit,
                &["assetID", "newOwner"],
                transfer_asset,
            ),
            Operation::new("GetAllAssets", Intent::Evaluate, &[], get_all_assets),
            Operation::new(
                "CreateOrder",
                Intent::Submit,
                &["purchaser", "business", "assetId"],
                create_order,
            ),
            Operation::new("ReadOrder", Intent::Evaluate, &["orderId"], read_order),
            Operation::new("ConfirmOrder", Intent::Submit, &["orderId"], confirm_order),
            Operation::new("BuyAsset", Intent::Submit, &["assetId"], buy_asset),
        ])
    }

    /// Look up an operation
    pub fn get(&self, name: &str) -> Result<&Operation> {
        self.operations
            .get(name)
            .ok_or_else(|| Error::UnknownOperation(name.to_string()))
    }

    /// All operations, sorted by name
    pub fn operations(&self) -> impl Iterator<Item = &Operation> {
        self.operations.values()
    }

    /// Number of operations
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

/// Contract plus its operation table
#[derive(Debug, Clone)]
pub struct Contract {
    logic: AssetTransfer,
    registry: Registry,
}

impl Contract {
    /// Build the asset transfer contract
    pub fn new(seeds: Vec<SeedAsset>) -> Result<Self> {
        Ok(Self {
            logic: AssetTransfer::new(seeds)?,
            registry: Registry::asset_transfer()?,
        })
    }

    /// Contract metadata
    pub fn info() -> ContractInfo {
        AssetTransfer::info()
    }

    /// Operation table
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Intent of a named operation
    pub fn intent(&self, name: &str) -> Result<Intent> {
        Ok(self.registry.get(name)?.intent)
    }

    /// Run a named operation and render its JSON response
    pub fn invoke(&self, ctx: &mut Context<'_>, name: &str, args: &[String]) -> Result<String> {
        let op = self.registry.get(name)?;

        if args.len() != op.params.len() {
            return Err(Error::InvalidArgument(format!(
                "{} expects {} argument(s) ({}), got {}",
                op.name,
                op.params.len(),
                op.params.join(", "),
                args.len()
            )));
        }

        let value = (op.handler)(&self.logic, ctx, &Args::new(op.name, args))?;
        Ok(serde_json::to_string(&value)?)
    }
}

fn init_ledger(c: &AssetTransfer, ctx: &mut Context<'_>, _args: &Args<'_>) -> Result<Value> {
    c.init_ledger(ctx)?;
    Ok(Value::Null)
}

fn create_asset(c: &AssetTransfer, ctx: &mut Context<'_>, args: &Args<'_>) -> Result<Value> {
    let asset = c.create_asset(
        ctx,
        args.str(0)?,
        args.str(1)?,
        args.decimal(2)?,
        args.str(3)?,
    )?;
    Ok(serde_json::to_value(asset)?)
}

fn read_asset(c: &AssetTransfer, ctx: &mut Context<'_>, args: &Args<'_>) -> Result<Value> {
    Ok(serde_json::to_value(c.read_asset(ctx, args.str(0)?)?)?)
}

fn update_asset(c: &AssetTransfer, ctx: &mut Context<'_>, args: &Args<'_>) -> Result<Value> {
    let asset = c.update_asset(
        ctx,
        args.str(0)?,
        args.str(1)?,
        args.decimal(2)?,
        args.str(3)?,
    )?;
    Ok(serde_json::to_value(asset)?)
}

fn delete_asset(c: &AssetTransfer, ctx: &mut Context<'_>, args: &Args<'_>) -> Result<Value> {
    c.delete_asset(ctx, args.str(0)?)?;
    Ok(Value::Null)
}

fn asset_exists(c: &AssetTransfer, ctx: &mut Context<'_>, args: &Args<'_>) -> Result<Value> {
    Ok(Value::Bool(c.asset_exists(ctx, args.str(0)?)?))
}

fn transfer_asset(c: &AssetTransfer, ctx: &mut Context<'_>, args: &Args<'_>) -> Result<Value> {
    let summary = c.transfer_asset(ctx, args.str(0)?, args.str(1)?)?;
    Ok(serde_json::to_value(summary)?)
}

fn get_all_assets(c: &AssetTransfer, ctx: &mut Context<'_>, _args: &Args<'_>) -> Result<Value> {
    Ok(serde_json::to_value(c.get_all_assets(ctx)?)?)
}

fn create_order(c: &AssetTransfer, ctx: &mut Context<'_>, args: &Args<'_>) -> Result<Value> {
    let order = c.create_order(ctx, args.str(0)?, args.str(1)?, args.str(2)?)?;
    Ok(serde_json::to_value(order)?)
}

fn read_order(c: &AssetTransfer, ctx: &mut Context<'_>, args: &Args<'_>) -> Result<Value> {
    Ok(serde_json::to_value(c.read_order(ctx, args.str(0)?)?)?)
}

fn confirm_order(c: &AssetTransfer, ctx: &mut Context<'_>, args: &Args<'_>) -> Result<Value> {
    Ok(serde_json::to_value(c.confirm_order(ctx, args.str(0)?)?)?)
}

fn buy_asset(c: &AssetTransfer, ctx: &mut Context<'_>, args: &Args<'_>) -> Result<Value> {
    Ok(Value::String(c.buy_asset(ctx, args.str(0)?)?))
}
