//! # Repository Module
//!
//! SQL access for the Kardex.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  InventoryEngine                                                       │
//! │       │                                                                 │
//! │       │  movements.latest(&mut *tx, key)                               │
//! │       │  movements.append(&mut *tx, new_movement)                      │
//! │       ▼                                                                 │
//! │  MovementRepository                                                    │
//! │  ├── latest / append        (any executor: pool or transaction)        │
//! │  ├── get_by_id / history    (pool)                                     │
//! │  └── latest_per_partition   (pool)                                     │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite: inventory_movements                                           │
//! │                                                                         │
//! │  No update or delete methods exist; the table is append-only.          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod movement;
