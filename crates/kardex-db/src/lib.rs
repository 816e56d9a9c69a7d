//! # kardex-db: Ledger Storage and Inventory Engine
//!
//! SQLite storage for the Kardex and the engine that posts stock movements
//! into it.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Kardex Data Flow                                 │
//! │                                                                         │
//! │  POS workflow (order completed, PO received, transfer received, ...)   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     kardex-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │InventoryEngine│    │  Repository   │    │  Migrations  │  │   │
//! │  │   │  (engine.rs)  │───►│ (movement.rs) │    │  (embedded)  │  │   │
//! │  │   │ batches, CAS  │    │ latest/append │    │ 001_inventory│  │   │
//! │  │   │ retry, timeout│    │ history       │    │ _movements   │  │   │
//! │  │   └───────┬───────┘    └───────┬───────┘    └──────────────┘  │   │
//! │  │           │ pure calls         │                               │   │
//! │  │           ▼                    ▼                               │   │
//! │  │      kardex-core         Database (pool.rs)                    │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │           SQLite (WAL): inventory_movements                     │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`engine`] - `InventoryEngine`: the public write and query operations
//! - [`pool`] - Connection pool creation and configuration
//! - [`config`] - Engine tuning (`EngineConfig`)
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - `DbError` and `InventoryError`
//! - [`repository`] - `MovementRepository`
//!
//! ## Usage
//!
//! ```rust,ignore
//! use kardex_core::{ProductId, Quantity, SaleLine, WarehouseId};
//! use kardex_db::{Database, DbConfig, EngineConfig};
//!
//! let db = Database::new(DbConfig::from_env()?).await?;
//! let engine = db.inventory(EngineConfig::from_env()?);
//!
//! let lines = [SaleLine::new(ProductId::new(10), Quantity::from_units(2))];
//! let receipt = engine.register_sale(7, &lines, WarehouseId::new(4)).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod engine;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{ConfigError, EngineConfig};
pub use engine::InventoryEngine;
pub use error::{DbError, DbResult, InventoryError, InventoryResult};
pub use pool::{Database, DbConfig};

pub use repository::movement::MovementRepository;
