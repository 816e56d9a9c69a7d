//! # Movement Repository
//!
//! Database operations for the `inventory_movements` ledger.
//!
//! ## Append-Only Ledger
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                inventory_movements (product 10 @ warehouse 4)           │
//! │                                                                         │
//! │  id  prev  origin           in   out  balance                           │
//! │  ──  ────  ───────────────  ───  ───  ───────                           │
//! │  41     0  purchase #1       50         50                              │
//! │  42    41  sale #7                20    30                              │
//! │  57    42  transfer #3            30     0   ← latest: authoritative    │
//! │                                                                         │
//! │  latest()  = ORDER BY id DESC LIMIT 1                                   │
//! │  append()  = INSERT with prev = latest().id                             │
//! │              UNIQUE(product, warehouse, prev) → at most one successor   │
//! │                                                                         │
//! │  No UPDATE, no DELETE: triggers abort both.                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Executors
//! `latest` and `append` take any SQLite executor so the engine can run them
//! inside its transaction (`&mut *tx`); the listing queries run on the pool.

use chrono::{DateTime, Utc};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use kardex_core::ledger::NewMovement;
use kardex_core::{
    Money, Movement, MovementFilter, MovementId, Origin, OriginKind, PartitionKey, ProductId, Quantity,
    WarehouseId,
};

/// Stored value of `previous_movement_id` for the first movement of a
/// partition. `NULL` would defeat the unique index (NULLs never collide).
const NO_PREVIOUS_MOVEMENT: i64 = 0;

const MOVEMENT_COLUMNS: &str = r#"
    id,
    product_id,
    warehouse_id,
    origin_kind,
    origin_id,
    previous_movement_id,
    batch_id,
    detail,
    quantity_in,
    cost_in,
    total_in,
    quantity_out,
    cost_out,
    total_out,
    quantity_balance,
    cost_balance,
    total_balance,
    created_at
"#;

// =============================================================================
// Row Mapping
// =============================================================================

/// Raw `inventory_movements` row. Quantities are stored scaled (ten-thousandths),
/// money in cents.
#[derive(Debug, FromRow)]
struct MovementRow {
    id: i64,
    product_id: i64,
    warehouse_id: i64,
    origin_kind: OriginKind,
    origin_id: Option<i64>,
    previous_movement_id: i64,
    batch_id: String,
    detail: String,
    quantity_in: i64,
    cost_in: i64,
    total_in: i64,
    quantity_out: i64,
    cost_out: i64,
    total_out: i64,
    quantity_balance: i64,
    cost_balance: i64,
    total_balance: i64,
    created_at: DateTime<Utc>,
}

impl TryFrom<MovementRow> for Movement {
    type Error = DbError;

    fn try_from(row: MovementRow) -> Result<Self, Self::Error> {
        let origin = Origin::from_parts(row.origin_kind, row.origin_id)
            .map_err(|e| DbError::Internal(format!("corrupt movement {}: {}", row.id, e)))?;

        Ok(Movement {
            id: MovementId::new(row.id),
            product_id: ProductId::new(row.product_id),
            warehouse_id: WarehouseId::new(row.warehouse_id),
            origin,
            previous_movement_id: match row.previous_movement_id {
                NO_PREVIOUS_MOVEMENT => None,
                id => Some(MovementId::new(id)),
            },
            batch_id: row.batch_id,
            detail: row.detail,
            quantity_in: Quantity::from_scaled(row.quantity_in),
            cost_in: Money::from_cents(row.cost_in),
            total_in: Money::from_cents(row.total_in),
            quantity_out: Quantity::from_scaled(row.quantity_out),
            cost_out: Money::from_cents(row.cost_out),
            total_out: Money::from_cents(row.total_out),
            quantity_balance: Quantity::from_scaled(row.quantity_balance),
            cost_balance: Money::from_cents(row.cost_balance),
            total_balance: Money::from_cents(row.total_balance),
            created_at: row.created_at,
        })
    }
}

fn into_movements(rows: Vec<MovementRow>) -> DbResult<Vec<Movement>> {
    rows.into_iter().map(Movement::try_from).collect()
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for ledger movements.
#[derive(Debug, Clone)]
pub struct MovementRepository {
    pool: SqlitePool,
}

impl MovementRepository {
    /// Creates a new MovementRepository.
    pub fn new(pool: SqlitePool) -> Self {
        MovementRepository { pool }
    }

    /// Latest movement of a partition, or `None` if it has no history.
    pub async fn latest<'e, E>(&self, executor: E, key: PartitionKey) -> DbResult<Option<Movement>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let sql = format!(
            "SELECT {} FROM inventory_movements \
             WHERE product_id = ?1 AND warehouse_id = ?2 \
             ORDER BY id DESC LIMIT 1",
            MOVEMENT_COLUMNS
        );

        let row: Option<MovementRow> = sqlx::query_as(&sql)
            .bind(key.product_id.get())
            .bind(key.warehouse_id.get())
            .fetch_optional(executor)
            .await?;

        let latest = row.map(Movement::try_from).transpose()?;
        debug!(
            partition = %key,
            latest_id = ?latest.as_ref().map(|m| m.id.get()),
            "Read latest movement"
        );
        Ok(latest)
    }

    /// Appends a movement.
    ///
    /// ## Errors
    /// - `DbError::Conflict` when the partition gained a movement after
    ///   `new.previous_movement_id` was read
    /// - `DbError::CheckViolation` when the row breaks a table constraint
    pub async fn append<'e, E>(&self, executor: E, new: NewMovement) -> DbResult<Movement>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let p = &new.posting;

        let result = sqlx::query(
            r#"
            INSERT INTO inventory_movements (
                product_id, warehouse_id,
                origin_kind, origin_id,
                previous_movement_id, batch_id, detail,
                quantity_in, cost_in, total_in,
                quantity_out, cost_out, total_out,
                quantity_balance, cost_balance, total_balance,
                created_at
            ) VALUES (
                ?1, ?2,
                ?3, ?4,
                ?5, ?6, ?7,
                ?8, ?9, ?10,
                ?11, ?12, ?13,
                ?14, ?15, ?16,
                ?17
            )
            "#,
        )
        .bind(new.key.product_id.get())
        .bind(new.key.warehouse_id.get())
        .bind(new.origin.kind())
        .bind(new.origin.document_id())
        .bind(new.previous_movement_id.map_or(NO_PREVIOUS_MOVEMENT, |id| id.get()))
        .bind(&new.batch_id)
        .bind(&new.detail)
        .bind(p.quantity_in.scaled())
        .bind(p.cost_in.cents())
        .bind(p.total_in.cents())
        .bind(p.quantity_out.scaled())
        .bind(p.cost_out.cents())
        .bind(p.total_out.cents())
        .bind(p.balance.quantity.scaled())
        .bind(p.balance.unit_cost.cents())
        .bind(p.balance.total.cents())
        .bind(new.created_at)
        .execute(executor)
        .await?;

        let id = MovementId::new(result.last_insert_rowid());
        debug!(
            id = %id,
            partition = %new.key,
            origin = %new.origin.kind(),
            quantity_in = %p.quantity_in,
            quantity_out = %p.quantity_out,
            balance = %p.balance.quantity,
            "Appended movement"
        );

        Ok(new.into_movement(id))
    }

    /// Gets a movement by ID.
    pub async fn get_by_id(&self, id: MovementId) -> DbResult<Option<Movement>> {
        let sql = format!("SELECT {} FROM inventory_movements WHERE id = ?1", MOVEMENT_COLUMNS);

        let row: Option<MovementRow> = sqlx::query_as(&sql)
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Movement::try_from).transpose()
    }

    /// Lists movements matching a filter, oldest first.
    pub async fn history(&self, filter: &MovementFilter) -> DbResult<Vec<Movement>> {
        debug!(?filter, "Listing movements");

        let sql = format!(
            "SELECT {} FROM inventory_movements \
             WHERE (?1 IS NULL OR product_id = ?1) \
               AND (?2 IS NULL OR warehouse_id = ?2) \
               AND (?3 IS NULL OR origin_kind = ?3) \
               AND (?4 IS NULL OR batch_id = ?4) \
               AND id > ?5 \
             ORDER BY id ASC \
             LIMIT ?6",
            MOVEMENT_COLUMNS
        );

        let rows: Vec<MovementRow> = sqlx::query_as(&sql)
            .bind(filter.product_id.map(|id| id.get()))
            .bind(filter.warehouse_id.map(|id| id.get()))
            .bind(filter.origin_kind)
            .bind(filter.batch_id.as_deref())
            .bind(filter.after_id.map_or(0, |id| id.get()))
            .bind(i64::from(filter.limit))
            .fetch_all(&self.pool)
            .await?;

        into_movements(rows)
    }

    /// Latest movement of every partition, optionally restricted to one
    /// warehouse and to balances below `below`.
    ///
    /// Ordered by warehouse, then product.
    pub async fn latest_per_partition(
        &self,
        warehouse_id: Option<WarehouseId>,
        below: Option<Quantity>,
    ) -> DbResult<Vec<Movement>> {
        let sql = format!(
            "SELECT {} FROM inventory_movements \
             WHERE id IN ( \
                 SELECT MAX(id) FROM inventory_movements \
                 WHERE (?1 IS NULL OR warehouse_id = ?1) \
                 GROUP BY product_id, warehouse_id \
             ) \
               AND (?2 IS NULL OR quantity_balance < ?2) \
             ORDER BY warehouse_id ASC, product_id ASC",
            MOVEMENT_COLUMNS
        );

        let rows: Vec<MovementRow> = sqlx::query_as(&sql)
            .bind(warehouse_id.map(|id| id.get()))
            .bind(below.map(|q| q.scaled()))
            .fetch_all(&self.pool)
            .await?;

        into_movements(rows)
    }

    /// Total number of movements in the ledger.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM inventory_movements")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use kardex_core::ledger::{post_inflow, post_outflow, Balance};

    fn key() -> PartitionKey {
        PartitionKey::new(ProductId::new(10), WarehouseId::new(4))
    }

    fn inflow(prev: Option<&Movement>, units: i64) -> NewMovement {
        let prior = Balance::from_latest(prev);
        NewMovement {
            key: key(),
            origin: Origin::Purchase { purchase_order_id: 1 },
            previous_movement_id: prev.map(|m| m.id),
            batch_id: "batch-1".to_string(),
            detail: "Purchase - Purchase Order #1".to_string(),
            posting: post_inflow(&prior, key(), Quantity::from_units(units), Money::from_cents(200)).unwrap(),
            created_at: Utc::now(),
        }
    }

    async fn setup() -> (Database, MovementRepository) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.movements();
        (db, repo)
    }

    #[tokio::test]
    async fn test_append_and_read_back() {
        let (db, repo) = setup().await;

        assert!(repo.latest(db.pool(), key()).await.unwrap().is_none());

        let first = repo.append(db.pool(), inflow(None, 50)).await.unwrap();
        assert_eq!(first.previous_movement_id, None);

        let latest = repo.latest(db.pool(), key()).await.unwrap().unwrap();
        assert_eq!(latest.id, first.id);
        assert_eq!(latest.quantity_balance, Quantity::from_units(50));
        assert_eq!(latest.total_balance.cents(), 10_000);
        assert_eq!(latest.origin, Origin::Purchase { purchase_order_id: 1 });

        let by_id = repo.get_by_id(first.id).await.unwrap().unwrap();
        assert_eq!(by_id.detail, "Purchase - Purchase Order #1");
        assert!(repo.get_by_id(MovementId::new(999)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_stale_predecessor_is_a_conflict() {
        let (db, repo) = setup().await;

        let first = repo.append(db.pool(), inflow(None, 50)).await.unwrap();
        repo.append(db.pool(), inflow(Some(&first), 5)).await.unwrap();

        // second writer computed from `first` as well
        let err = repo.append(db.pool(), inflow(Some(&first), 7)).await.unwrap_err();
        assert!(matches!(err, DbError::Conflict(_)), "got {:?}", err);

        // and a second "first movement" collides with the original one
        let err = repo.append(db.pool(), inflow(None, 1)).await.unwrap_err();
        assert!(matches!(err, DbError::Conflict(_)), "got {:?}", err);

        assert_eq!(repo.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_negative_balance_rejected_by_storage() {
        let (db, repo) = setup().await;
        let first = repo.append(db.pool(), inflow(None, 5)).await.unwrap();

        // bypass the ledger check to prove the table enforces it too
        let mut posting = post_outflow(&Balance::from_movement(&first), key(), Quantity::from_units(5)).unwrap();
        posting.balance.quantity = Quantity::from_units(-1);
        let bad = NewMovement {
            key: key(),
            origin: Origin::Sale { order_id: 1 },
            previous_movement_id: Some(first.id),
            batch_id: "batch-2".to_string(),
            detail: "Sale - Order #1".to_string(),
            posting,
            created_at: Utc::now(),
        };

        let err = repo.append(db.pool(), bad).await.unwrap_err();
        assert!(matches!(err, DbError::CheckViolation { .. }), "got {:?}", err);
    }

    #[tokio::test]
    async fn test_movements_are_immutable() {
        let (db, repo) = setup().await;
        let first = repo.append(db.pool(), inflow(None, 5)).await.unwrap();

        let err: DbError = sqlx::query("UPDATE inventory_movements SET quantity_balance = 0 WHERE id = ?1")
            .bind(first.id.get())
            .execute(db.pool())
            .await
            .unwrap_err()
            .into();
        assert!(matches!(err, DbError::CheckViolation { .. }), "got {:?}", err);

        let err: DbError = sqlx::query("DELETE FROM inventory_movements")
            .execute(db.pool())
            .await
            .unwrap_err()
            .into();
        assert!(matches!(err, DbError::CheckViolation { .. }), "got {:?}", err);

        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_history_filters_and_pages() {
        let (db, repo) = setup().await;

        let mut prev = None;
        for units in [10, 20, 30] {
            let m = repo.append(db.pool(), inflow(prev.as_ref(), units)).await.unwrap();
            prev = Some(m);
        }

        let all = repo.history(&MovementFilter::default().partition(key())).await.unwrap();
        assert_eq!(all.len(), 3);
        assert!(all.windows(2).all(|w| w[0].id < w[1].id));

        let page = repo
            .history(&MovementFilter::default().after(all[0].id).limit(1))
            .await
            .unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].id, all[1].id);

        let none = repo
            .history(&MovementFilter::default().origin_kind(OriginKind::Sale))
            .await
            .unwrap();
        assert!(none.is_empty());

        let batch = repo.history(&MovementFilter::default().batch("batch-1")).await.unwrap();
        assert_eq!(batch.len(), 3);
    }

    #[tokio::test]
    async fn test_latest_per_partition() {
        let (db, repo) = setup().await;

        let first = repo.append(db.pool(), inflow(None, 50)).await.unwrap();
        repo.append(db.pool(), inflow(Some(&first), 5)).await.unwrap();

        let levels = repo.latest_per_partition(None, None).await.unwrap();
        assert_eq!(levels.len(), 1);
        assert_eq!(levels[0].quantity_balance, Quantity::from_units(55));

        let low = repo
            .latest_per_partition(Some(WarehouseId::new(4)), Some(Quantity::from_units(10)))
            .await
            .unwrap();
        assert!(low.is_empty());

        let elsewhere = repo.latest_per_partition(Some(WarehouseId::new(5)), None).await.unwrap();
        assert!(elsewhere.is_empty());
    }
}
