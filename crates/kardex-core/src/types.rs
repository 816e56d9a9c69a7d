//! # Domain Types
//!
//! Core domain types of the Kardex.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Movement     │   │     Origin      │   │  PartitionKey   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (ordering)  │   │  Sale           │   │  product_id     │       │
//! │  │  partition      │   │  Purchase       │   │  warehouse_id   │       │
//! │  │  in / out       │   │  Transfer       │   └─────────────────┘       │
//! │  │  balance        │   │  ManualAdjust.  │                              │
//! │  └─────────────────┘   └─────────────────┘                              │
//! │                                                                         │
//! │  Inputs:  SaleLine, PurchaseLine, TransferLine, Adjustment              │
//! │  Outputs: PostingReceipt, StockCheck, StockLevel                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Identity
//! Catalog entities (products, warehouses) and business documents (orders,
//! purchase orders, transfers) are owned by other services and identified by
//! their integer ids. Movement ids are assigned by the ledger store and are
//! the ordering authority within a partition.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::quantity::Quantity;
use crate::DEFAULT_HISTORY_LIMIT;

// =============================================================================
// Identifiers
// =============================================================================

/// Product variant id (`product_product` in the catalog).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(transparent)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type), sqlx(transparent))]
#[ts(export)]
pub struct ProductId(i64);

impl ProductId {
    #[inline]
    pub const fn new(id: i64) -> Self {
        ProductId(id)
    }

    #[inline]
    pub const fn get(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Warehouse id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(transparent)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type), sqlx(transparent))]
#[ts(export)]
pub struct WarehouseId(i64);

impl WarehouseId {
    #[inline]
    pub const fn new(id: i64) -> Self {
        WarehouseId(id)
    }

    #[inline]
    pub const fn get(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for WarehouseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Ledger row id. Monotonic; the total order of a partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(transparent)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type), sqlx(transparent))]
#[ts(export)]
pub struct MovementId(i64);

impl MovementId {
    #[inline]
    pub const fn new(id: i64) -> Self {
        MovementId(id)
    }

    #[inline]
    pub const fn get(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for MovementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The (product, warehouse) pair a movement belongs to.
///
/// Every balance lives in exactly one partition; partitions never share rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PartitionKey {
    pub product_id: ProductId,
    pub warehouse_id: WarehouseId,
}

impl PartitionKey {
    #[inline]
    pub const fn new(product_id: ProductId, warehouse_id: WarehouseId) -> Self {
        PartitionKey {
            product_id,
            warehouse_id,
        }
    }
}

impl fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "product {} @ warehouse {}", self.product_id, self.warehouse_id)
    }
}

// =============================================================================
// Origin
// =============================================================================

/// Discriminant of [`Origin`], as stored in the `origin_kind` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum OriginKind {
    Sale,
    Purchase,
    Transfer,
    ManualAdjustment,
}

impl OriginKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            OriginKind::Sale => "sale",
            OriginKind::Purchase => "purchase",
            OriginKind::Transfer => "transfer",
            OriginKind::ManualAdjustment => "manual_adjustment",
        }
    }
}

impl fmt::Display for OriginKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The business document that caused a movement.
///
/// A movement has exactly one origin, so at most one document reference can
/// ever be populated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[ts(export)]
pub enum Origin {
    /// A completed restaurant order.
    Sale {
        #[serde(rename = "orderId")]
        order_id: i64,
    },
    /// A received purchase order.
    Purchase {
        #[serde(rename = "purchaseOrderId")]
        purchase_order_id: i64,
    },
    /// A received stock transfer (both legs share it).
    Transfer {
        #[serde(rename = "transferId")]
        transfer_id: i64,
    },
    /// A manual correction; the reason goes in `detail`.
    ManualAdjustment,
}

impl Origin {
    pub const fn kind(&self) -> OriginKind {
        match self {
            Origin::Sale { .. } => OriginKind::Sale,
            Origin::Purchase { .. } => OriginKind::Purchase,
            Origin::Transfer { .. } => OriginKind::Transfer,
            Origin::ManualAdjustment => OriginKind::ManualAdjustment,
        }
    }

    /// The referenced document id (`origin_id` column).
    pub const fn document_id(&self) -> Option<i64> {
        match self {
            Origin::Sale { order_id } => Some(*order_id),
            Origin::Purchase { purchase_order_id } => Some(*purchase_order_id),
            Origin::Transfer { transfer_id } => Some(*transfer_id),
            Origin::ManualAdjustment => None,
        }
    }

    /// Rebuilds an origin from its stored columns.
    ///
    /// ## Errors
    /// `CoreError::InvalidOrigin` when a document kind lacks its id or a
    /// manual adjustment carries one.
    pub fn from_parts(kind: OriginKind, origin_id: Option<i64>) -> CoreResult<Self> {
        match (kind, origin_id) {
            (OriginKind::Sale, Some(order_id)) => Ok(Origin::Sale { order_id }),
            (OriginKind::Purchase, Some(purchase_order_id)) => Ok(Origin::Purchase { purchase_order_id }),
            (OriginKind::Transfer, Some(transfer_id)) => Ok(Origin::Transfer { transfer_id }),
            (OriginKind::ManualAdjustment, None) => Ok(Origin::ManualAdjustment),
            (kind, origin_id) => Err(CoreError::InvalidOrigin {
                kind: kind.to_string(),
                origin_id,
            }),
        }
    }

    /// Default `detail` text for a movement of this origin.
    ///
    /// ## Example
    /// ```rust
    /// use kardex_core::{Direction, Origin};
    ///
    /// let origin = Origin::Transfer { transfer_id: 1 };
    /// assert_eq!(origin.describe(Direction::Out), "Transfer out - Transfer #1");
    /// ```
    pub fn describe(&self, direction: Direction) -> String {
        match (self, direction) {
            (Origin::Sale { order_id }, _) => format!("Sale - Order #{}", order_id),
            (Origin::Purchase { purchase_order_id }, _) => {
                format!("Purchase - Purchase Order #{}", purchase_order_id)
            }
            (Origin::Transfer { transfer_id }, Direction::Out) => {
                format!("Transfer out - Transfer #{}", transfer_id)
            }
            (Origin::Transfer { transfer_id }, Direction::In) => {
                format!("Transfer in - Transfer #{}", transfer_id)
            }
            (Origin::ManualAdjustment, Direction::In) => "Manual adjustment (in)".to_string(),
            (Origin::ManualAdjustment, Direction::Out) => "Manual adjustment (out)".to_string(),
        }
    }
}

/// Which side of the ledger a movement posts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Direction {
    In,
    Out,
}

// =============================================================================
// Movement
// =============================================================================

/// A committed ledger entry.
///
/// Immutable once written. The balance columns describe the partition *after*
/// this movement and are never recomputed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Movement {
    pub id: MovementId,
    pub product_id: ProductId,
    pub warehouse_id: WarehouseId,
    pub origin: Origin,

    /// Latest movement of the partition when this one was appended
    /// (`None` for the first movement of a partition).
    pub previous_movement_id: Option<MovementId>,

    /// Shared by all movements written by the same engine call.
    pub batch_id: String,

    pub detail: String,

    pub quantity_in: Quantity,
    pub cost_in: Money,
    pub total_in: Money,

    pub quantity_out: Quantity,
    pub cost_out: Money,
    pub total_out: Money,

    pub quantity_balance: Quantity,
    pub cost_balance: Money,
    pub total_balance: Money,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Movement {
    #[inline]
    pub fn key(&self) -> PartitionKey {
        PartitionKey::new(self.product_id, self.warehouse_id)
    }

    pub fn direction(&self) -> Direction {
        if self.quantity_in.is_positive() {
            Direction::In
        } else {
            Direction::Out
        }
    }
}

// =============================================================================
// Engine Inputs
// =============================================================================

/// One line of a completed order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SaleLine {
    pub product_id: ProductId,
    pub quantity: Quantity,
}

impl SaleLine {
    pub const fn new(product_id: ProductId, quantity: Quantity) -> Self {
        SaleLine { product_id, quantity }
    }
}

/// One line of a received purchase order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PurchaseLine {
    pub product_id: ProductId,
    pub quantity: Quantity,
    /// Price paid per unit.
    pub unit_cost: Money,
}

impl PurchaseLine {
    pub const fn new(product_id: ProductId, quantity: Quantity, unit_cost: Money) -> Self {
        PurchaseLine {
            product_id,
            quantity,
            unit_cost,
        }
    }
}

/// One line of a received stock transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct TransferLine {
    pub product_id: ProductId,
    pub quantity: Quantity,
}

impl TransferLine {
    pub const fn new(product_id: ProductId, quantity: Quantity) -> Self {
        TransferLine { product_id, quantity }
    }
}

/// A manual stock correction (count differences, waste, breakage, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Adjustment {
    pub product_id: ProductId,
    pub warehouse_id: WarehouseId,
    pub direction: Direction,
    pub quantity: Quantity,
    /// Cost per unit for an inbound adjustment. Defaults to the partition's
    /// current average cost. Ignored for outbound adjustments.
    pub unit_cost: Option<Money>,
    pub reason: String,
}

// =============================================================================
// Engine Outputs
// =============================================================================

/// Movements written by one engine call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PostingReceipt {
    pub batch_id: String,
    /// In write order.
    pub movements: Vec<Movement>,
}

impl PostingReceipt {
    pub fn empty(batch_id: impl Into<String>) -> Self {
        PostingReceipt {
            batch_id: batch_id.into(),
            movements: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.movements.is_empty()
    }

    pub fn len(&self) -> usize {
        self.movements.len()
    }
}

/// Result of an advisory stock check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct StockCheck {
    pub sufficient: bool,
    pub available: Quantity,
}

/// Current position of one partition, taken from its latest movement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct StockLevel {
    pub product_id: ProductId,
    pub warehouse_id: WarehouseId,
    pub quantity: Quantity,
    pub unit_cost: Money,
    pub total_value: Money,
    pub last_movement_id: MovementId,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl From<&Movement> for StockLevel {
    fn from(m: &Movement) -> Self {
        StockLevel {
            product_id: m.product_id,
            warehouse_id: m.warehouse_id,
            quantity: m.quantity_balance,
            unit_cost: m.cost_balance,
            total_value: m.total_balance,
            last_movement_id: m.id,
            updated_at: m.created_at,
        }
    }
}

// =============================================================================
// Queries
// =============================================================================

/// Filter for movement history listings.
///
/// ## Example
/// ```rust
/// use kardex_core::{MovementFilter, OriginKind, WarehouseId};
///
/// let filter = MovementFilter::default()
///     .warehouse(WarehouseId::new(4))
///     .origin_kind(OriginKind::Sale)
///     .limit(20);
/// assert_eq!(filter.limit, 20);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct MovementFilter {
    pub product_id: Option<ProductId>,
    pub warehouse_id: Option<WarehouseId>,
    pub origin_kind: Option<OriginKind>,
    pub batch_id: Option<String>,
    /// Only movements with an id greater than this (keyset pagination).
    pub after_id: Option<MovementId>,
    pub limit: u32,
}

impl Default for MovementFilter {
    fn default() -> Self {
        MovementFilter {
            product_id: None,
            warehouse_id: None,
            origin_kind: None,
            batch_id: None,
            after_id: None,
            limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

impl MovementFilter {
    pub fn product(mut self, product_id: ProductId) -> Self {
        self.product_id = Some(product_id);
        self
    }

    pub fn warehouse(mut self, warehouse_id: WarehouseId) -> Self {
        self.warehouse_id = Some(warehouse_id);
        self
    }

    pub fn partition(self, key: PartitionKey) -> Self {
        self.product(key.product_id).warehouse(key.warehouse_id)
    }

    pub fn origin_kind(mut self, kind: OriginKind) -> Self {
        self.origin_kind = Some(kind);
        self
    }

    pub fn batch(mut self, batch_id: impl Into<String>) -> Self {
        self.batch_id = Some(batch_id.into());
        self
    }

    pub fn after(mut self, id: MovementId) -> Self {
        self.after_id = Some(id);
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin_round_trips_through_columns() {
        let origins = [
            Origin::Sale { order_id: 1 },
            Origin::Purchase { purchase_order_id: 2 },
            Origin::Transfer { transfer_id: 3 },
            Origin::ManualAdjustment,
        ];
        for origin in origins {
            let rebuilt = Origin::from_parts(origin.kind(), origin.document_id()).unwrap();
            assert_eq!(rebuilt, origin);
        }
    }

    #[test]
    fn test_origin_rejects_inconsistent_columns() {
        assert!(Origin::from_parts(OriginKind::Sale, None).is_err());
        assert!(Origin::from_parts(OriginKind::ManualAdjustment, Some(9)).is_err());
    }

    #[test]
    fn test_origin_wire_format() {
        let json = serde_json::to_value(Origin::Purchase { purchase_order_id: 1 }).unwrap();
        assert_eq!(json, serde_json::json!({ "kind": "purchase", "purchaseOrderId": 1 }));

        let json = serde_json::to_value(Origin::ManualAdjustment).unwrap();
        assert_eq!(json, serde_json::json!({ "kind": "manual_adjustment" }));
    }

    #[test]
    fn test_origin_describe() {
        assert_eq!(Origin::Sale { order_id: 7 }.describe(Direction::Out), "Sale - Order #7");
        assert_eq!(
            Origin::Purchase { purchase_order_id: 1 }.describe(Direction::In),
            "Purchase - Purchase Order #1"
        );
        assert_eq!(
            Origin::Transfer { transfer_id: 3 }.describe(Direction::In),
            "Transfer in - Transfer #3"
        );
    }

    #[test]
    fn test_partition_display() {
        let key = PartitionKey::new(ProductId::new(10), WarehouseId::new(4));
        assert_eq!(key.to_string(), "product 10 @ warehouse 4");
    }

    #[test]
    fn test_filter_builder() {
        let key = PartitionKey::new(ProductId::new(10), WarehouseId::new(4));
        let filter = MovementFilter::default().partition(key).batch("b-1");
        assert_eq!(filter.product_id, Some(ProductId::new(10)));
        assert_eq!(filter.warehouse_id, Some(WarehouseId::new(4)));
        assert_eq!(filter.batch_id.as_deref(), Some("b-1"));
        assert_eq!(filter.limit, DEFAULT_HISTORY_LIMIT);
    }
}
