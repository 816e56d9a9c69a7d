//! # kardex-core: Pure Inventory Ledger Logic
//!
//! This crate holds the domain model of the Kardex (inventory ledger) used by
//! the restaurant POS backend. Everything here is a pure function or a plain
//! data type; the storage layer lives in `kardex-db`.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Kardex Architecture                              │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 POS workflows (callers)                         │   │
//! │  │  complete order ─ receive purchase ─ receive transfer ─ adjust  │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              kardex-db: InventoryEngine                         │   │
//! │  │      transactions, latest-row reads, append, CAS retry          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ pure calls                             │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ kardex-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │  ledger   │  │ quantity  │  │ validation│  │   │
//! │  │   │ Movement  │  │  Balance  │  │  money    │  │   rules   │  │   │
//! │  │   │  Origin   │  │  Posting  │  │           │  │           │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Ids, `Origin`, `Movement`, line items, receipts
//! - [`ledger`] - Carry-forward balance computation (weighted average cost)
//! - [`quantity`] - Fixed-point stock quantities (4 decimals)
//! - [`money`] - Integer cents
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation for engine calls
//!
//! ## Example Usage
//!
//! ```rust
//! use kardex_core::ledger::{post_inflow, post_outflow, Balance};
//! use kardex_core::{Money, PartitionKey, ProductId, Quantity, WarehouseId};
//!
//! let key = PartitionKey::new(ProductId::new(10), WarehouseId::new(4));
//!
//! let received = post_inflow(&Balance::zero(), key, Quantity::from_units(50), Money::from_cents(200)).unwrap();
//! assert_eq!(received.balance.quantity, Quantity::from_units(50));
//!
//! let sold = post_outflow(&received.balance, key, Quantity::from_units(20)).unwrap();
//! assert_eq!(sold.balance.quantity, Quantity::from_units(30));
//!
//! // Selling more than the balance is refused
//! assert!(post_outflow(&sold.balance, key, Quantity::from_units(40)).is_err());
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod ledger;
pub mod money;
pub mod quantity;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use quantity::Quantity;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum length of a movement's `detail` text (matches the ledger column).
pub const MAX_DETAIL_LEN: usize = 500;

/// Maximum number of line items accepted in a single engine call.
///
/// ## Business Reason
/// A restaurant order or purchase order never comes close; anything larger is
/// a runaway client and would hold the ledger write lock for too long.
pub const MAX_BATCH_LINES: usize = 500;

/// Largest quantity one line may move: 999999.9999, the `decimal(10,4)`
/// range of the source quantity columns.
pub const MAX_LINE_QUANTITY: Quantity = Quantity::from_scaled(9_999_999_999);

/// Largest unit cost one line may carry: 99999999.99, the `decimal(10,2)`
/// range of the source cost columns.
pub const MAX_UNIT_COST: Money = Money::from_cents(9_999_999_999);

/// Default page size for movement history queries.
pub const DEFAULT_HISTORY_LIMIT: u32 = 100;

/// Upper bound for movement history page size.
pub const MAX_HISTORY_LIMIT: u32 = 1000;
