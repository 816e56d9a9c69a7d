//! # Database & Engine Error Types
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbError ← classifies constraint, CAS conflict, busy/locked            │
//! │       │                                                                 │
//! │       │        CoreError (InsufficientStock, Validation)               │
//! │       │              │                                                  │
//! │       ▼              ▼                                                  │
//! │  InventoryError (this module) ← what engine callers match on           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  HTTP layer maps business errors to 4xx, Storage to 5xx/503            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::time::Duration;

use kardex_core::{CoreError, MovementId, ProductId, Quantity, ValidationError, WarehouseId};
use thiserror::Error;

// =============================================================================
// SQLite Result Codes
// =============================================================================

/// Primary result codes (the low byte of an extended code).
const SQLITE_BUSY: i32 = 5;
const SQLITE_LOCKED: i32 = 6;

/// `SQLITE_CONSTRAINT_TRIGGER`: a trigger called `RAISE(ABORT, ...)`.
const SQLITE_CONSTRAINT_TRIGGER: i32 = 1811;

/// Column whose uniqueness per partition serializes appends.
const CAS_COLUMN: &str = "previous_movement_id";

/// Message raised by the UPDATE/DELETE guard triggers.
const APPEND_ONLY_MARKER: &str = "append-only";

// =============================================================================
// Database Error
// =============================================================================

/// Database operation errors.
///
/// These errors wrap sqlx errors and categorize them so the engine can tell a
/// lost append race (retry) from a real failure (give up).
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found in database.
    ///
    /// ## When This Occurs
    /// - `fetch_one` returns no rows
    /// - Movement id doesn't exist
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation other than the append guard.
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Foreign key constraint violation.
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// CHECK constraint or guard trigger refused the statement.
    ///
    /// ## When This Occurs
    /// - A row would carry a negative `quantity_balance`
    /// - Origin columns disagree (`manual_adjustment` with an id, ...)
    /// - Anyone attempts to UPDATE or DELETE a movement
    #[error("Constraint violation: {message}")]
    CheckViolation { message: String },

    /// Another writer appended to the partition first.
    ///
    /// ## When This Occurs
    /// ```text
    /// Writer A: read latest(10 @ 4) = #41      Writer B: read latest = #41
    /// Writer A: append prev=#41 → #42 ✓
    ///                                          Writer B: append prev=#41
    ///                                            → UNIQUE(partition, prev) ✗
    ///                                            → Conflict
    /// ```
    /// Also raised when SQLite reports the database busy or locked (a stale
    /// read snapshot cannot be upgraded to a write).
    #[error("Write conflict: {0}")]
    Conflict(String),

    /// A transaction did not finish within the configured time.
    #[error("Transaction timed out after {0:?}")]
    Timeout(Duration),

    /// Database connection failed.
    ///
    /// ## When This Occurs
    /// - Database file doesn't exist and can't be created
    /// - File permissions issue
    /// - Disk full
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Internal database error (including rows that fail to decode).
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Whether repeating the whole operation may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DbError::Conflict(_) | DbError::Timeout(_) | DbError::PoolExhausted)
    }

    /// Whether this is a lost append race the engine retries on its own.
    pub fn is_conflict(&self) -> bool {
        matches!(self, DbError::Conflict(_))
    }
}

/// Extended SQLite result code of a database error, if it reported one.
fn sqlite_code(db_err: &dyn sqlx::error::DatabaseError) -> Option<i32> {
    db_err.code().and_then(|code| code.parse().ok())
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound              → DbError::NotFound
/// SQLITE_BUSY / SQLITE_LOCKED (+ ext.)  → DbError::Conflict
/// UNIQUE on previous_movement_id        → DbError::Conflict
/// other UNIQUE                          → DbError::UniqueViolation
/// FOREIGN KEY                           → DbError::ForeignKeyViolation
/// CHECK / RAISE(ABORT) trigger          → DbError::CheckViolation
/// sqlx::Error::PoolTimedOut             → DbError::PoolExhausted
/// Other                                 → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound {
                entity: "Record".to_string(),
                id: "unknown".to_string(),
            },

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();
                let code = sqlite_code(&*db_err);

                if let Some(code) = code {
                    let primary = code & 0xff;
                    if primary == SQLITE_BUSY || primary == SQLITE_LOCKED {
                        return DbError::Conflict(msg.to_string());
                    }
                }

                if msg.contains("UNIQUE constraint failed") {
                    let field = msg
                        .split("UNIQUE constraint failed: ")
                        .nth(1)
                        .unwrap_or("unknown")
                        .to_string();
                    if field.contains(CAS_COLUMN) {
                        DbError::Conflict("partition advanced since it was read".to_string())
                    } else {
                        DbError::UniqueViolation {
                            field,
                            value: "unknown".to_string(),
                        }
                    }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else if msg.contains("CHECK constraint failed")
                    || msg.contains(APPEND_ONLY_MARKER)
                    || code == Some(SQLITE_CONSTRAINT_TRIGGER)
                {
                    DbError::CheckViolation {
                        message: msg.to_string(),
                    }
                } else if msg.contains("database is locked") {
                    DbError::Conflict(msg.to_string())
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

// =============================================================================
// Inventory Error
// =============================================================================

/// Errors returned by [`crate::InventoryEngine`].
///
/// Business errors (the caller sent something that can't be posted) are kept
/// apart from storage errors (the ledger couldn't be read or written).
#[derive(Debug, Error)]
pub enum InventoryError {
    /// Not enough stock to post an outflow. Nothing was written.
    #[error(
        "Insufficient stock for product {product_id} in warehouse {warehouse_id}: \
         available {available}, required {required}"
    )]
    InsufficientStock {
        product_id: ProductId,
        warehouse_id: WarehouseId,
        available: Quantity,
        required: Quantity,
    },

    /// The partition has no movements yet.
    #[error("No inventory for product {product_id} in warehouse {warehouse_id}")]
    NotFound {
        product_id: ProductId,
        warehouse_id: WarehouseId,
    },

    /// The posting would push a partition's balance out of range. Nothing was
    /// written.
    #[error("Balance of product {product_id} in warehouse {warehouse_id} would overflow")]
    BalanceOverflow {
        product_id: ProductId,
        warehouse_id: WarehouseId,
    },

    /// No movement with this id.
    #[error("Movement not found: {movement_id}")]
    MovementNotFound { movement_id: MovementId },

    /// Bad input; rejected before any I/O.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The ledger store failed.
    #[error("Storage error: {0}")]
    Storage(#[from] DbError),
}

impl InventoryError {
    /// True for errors caused by the request rather than the store.
    pub fn is_business_error(&self) -> bool {
        !matches!(self, InventoryError::Storage(_))
    }

    /// True when the caller may repeat the request unchanged.
    pub fn is_retryable(&self) -> bool {
        match self {
            InventoryError::Storage(err) => err.is_retryable(),
            _ => false,
        }
    }
}

impl From<CoreError> for InventoryError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InsufficientStock {
                product_id,
                warehouse_id,
                available,
                required,
            } => InventoryError::InsufficientStock {
                product_id,
                warehouse_id,
                available,
                required,
            },
            CoreError::BalanceOverflow {
                product_id,
                warehouse_id,
            } => InventoryError::BalanceOverflow {
                product_id,
                warehouse_id,
            },
            CoreError::Validation(err) => InventoryError::Validation(err),
            other @ CoreError::InvalidOrigin { .. } => InventoryError::Storage(DbError::Internal(other.to_string())),
        }
    }
}

/// Result type for engine operations.
pub type InventoryResult<T> = Result<T, InventoryError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(DbError::Conflict("x".into()).is_retryable());
        assert!(DbError::Timeout(Duration::from_secs(1)).is_retryable());
        assert!(DbError::PoolExhausted.is_retryable());

        assert!(!DbError::NotFound {
            entity: "Movement".into(),
            id: "1".into()
        }
        .is_retryable());
        assert!(!DbError::CheckViolation { message: "x".into() }.is_retryable());
        assert!(!DbError::QueryFailed("x".into()).is_retryable());
    }

    #[test]
    fn test_core_error_conversion() {
        let err: InventoryError = CoreError::InsufficientStock {
            product_id: ProductId::new(10),
            warehouse_id: WarehouseId::new(4),
            available: Quantity::from_units(30),
            required: Quantity::from_units(40),
        }
        .into();
        assert!(err.is_business_error());
        assert!(matches!(err, InventoryError::InsufficientStock { .. }));

        let err: InventoryError = CoreError::BalanceOverflow {
            product_id: ProductId::new(10),
            warehouse_id: WarehouseId::new(4),
        }
        .into();
        assert!(err.is_business_error());
        assert!(!err.is_retryable());

        let err: InventoryError = CoreError::InvalidOrigin {
            kind: "sale".into(),
            origin_id: None,
        }
        .into();
        assert!(!err.is_business_error());
    }

    #[test]
    fn test_storage_errors_are_not_business_errors() {
        let err: InventoryError = DbError::Timeout(Duration::from_millis(10)).into();
        assert!(!err.is_business_error());
        assert!(err.is_retryable());

        let err = InventoryError::NotFound {
            product_id: ProductId::new(1),
            warehouse_id: WarehouseId::new(1),
        };
        assert!(err.is_business_error());
        assert!(!err.is_retryable());
    }
}
