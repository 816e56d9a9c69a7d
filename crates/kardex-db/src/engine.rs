//! # Inventory Engine
//!
//! Records stock movements for completed business events and answers stock
//! queries. Every write goes through one batch executor.
//!
//! ## Write Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  register_sale / register_purchase / register_transfer / adjustment    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  validate lines (no I/O)          empty? → empty receipt, no tx        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Batch { origin, steps }  ──►  run()                                   │
//! │                                  │                                      │
//! │          ┌───────────────────────┘                                      │
//! │          ▼                                                              │
//! │   ┌─ attempt (bounded by transaction_timeout) ──────────────────────┐   │
//! │   │  BEGIN                                                          │   │
//! │   │  for each step:                                                 │   │
//! │   │     latest(partition) → Balance → post_inflow / post_outflow    │   │
//! │   │     append(prev = latest.id)                                    │   │
//! │   │  COMMIT                      any error → ROLLBACK               │   │
//! │   └─────────────────────────────────────────────────────────────────┘   │
//! │          │                                                              │
//! │          ├── Ok → PostingReceipt                                        │
//! │          ├── Conflict (lost append race) → back off, retry whole batch  │
//! │          └── anything else → returned as is                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Guarantees
//! - A call never partially commits: all lines (and both legs of a transfer)
//!   land in one transaction.
//! - Two concurrent writers can't both append after the same movement, so
//!   concurrent sales never oversell.
//! - Business errors (insufficient stock, bad input) are never retried.

use std::time::Duration;

use chrono::Utc;
use sqlx::{Sqlite, Transaction};
use tracing::{debug, info, warn};
use uuid::Uuid;

use kardex_core::ledger::{post_inflow, post_outflow, post_valued_inflow, Balance, NewMovement, Posting};
use kardex_core::validation::{
    validate_adjustment, validate_history_limit, validate_purchase_lines, validate_required_quantity,
    validate_sale_lines, validate_transfer_lines,
};
use kardex_core::{
    Adjustment, Direction, Money, Movement, MovementFilter, MovementId, Origin, PartitionKey, PostingReceipt,
    ProductId, PurchaseLine, Quantity, SaleLine, StockCheck, StockLevel, TransferLine, WarehouseId,
};

use crate::config::EngineConfig;
use crate::error::{DbError, InventoryError, InventoryResult};
use crate::pool::Database;
use crate::repository::movement::MovementRepository;

/// First pause after a lost append race; doubles per retry.
const RETRY_BACKOFF_BASE: Duration = Duration::from_millis(2);

/// Upper bound for the pause between retries.
const RETRY_BACKOFF_MAX: Duration = Duration::from_millis(50);

// =============================================================================
// Batch Model
// =============================================================================

/// How an inflow is valued.
#[derive(Debug, Clone, Copy)]
enum InboundCost {
    /// Price paid per unit.
    Unit(Money),
    /// The partition's current average cost (manual "in" without a cost).
    CurrentAverage,
}

/// One unit of work inside a batch.
#[derive(Debug, Clone, Copy)]
enum Step {
    /// Outflow with a sufficiency check.
    Issue { key: PartitionKey, quantity: Quantity },
    /// Inflow, never refused.
    Receive {
        key: PartitionKey,
        quantity: Quantity,
        cost: InboundCost,
    },
    /// Outflow at `from` then inflow at `to` carrying the outflow's value.
    Move {
        product_id: ProductId,
        from: WarehouseId,
        to: WarehouseId,
        quantity: Quantity,
    },
}

/// Everything one engine call writes.
#[derive(Debug)]
struct Batch {
    operation: &'static str,
    origin: Origin,
    /// Replaces the generated detail text (manual adjustments store the reason).
    detail: Option<String>,
    steps: Vec<Step>,
}

impl Batch {
    fn new(operation: &'static str, origin: Origin) -> Self {
        Batch {
            operation,
            origin,
            detail: None,
            steps: Vec::new(),
        }
    }

    fn detail(&self, direction: Direction) -> String {
        match &self.detail {
            Some(detail) => detail.clone(),
            None => self.origin.describe(direction),
        }
    }
}

// =============================================================================
// Engine
// =============================================================================

/// The Kardex engine.
///
/// Stateless between calls; clone it freely. All state lives in the ledger.
///
/// ## Example
/// ```rust,ignore
/// let engine = InventoryEngine::new(db.clone(), EngineConfig::default());
///
/// engine
///     .register_purchase(1, &[PurchaseLine::new(ProductId::new(10), Quantity::from_units(50), Money::from_cents(200))], WarehouseId::new(4))
///     .await?;
/// let stock = engine.get_current_stock(ProductId::new(10), WarehouseId::new(4)).await?;
/// assert_eq!(stock, Quantity::from_units(50));
/// ```
#[derive(Debug, Clone)]
pub struct InventoryEngine {
    db: Database,
    movements: MovementRepository,
    config: EngineConfig,
}

impl InventoryEngine {
    pub fn new(db: Database, config: EngineConfig) -> Self {
        let movements = db.movements();
        InventoryEngine { db, movements, config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Posts the outflows of a completed order.
    ///
    /// Lines are applied in order; a later line for the same product sees the
    /// balance left by the earlier ones.
    ///
    /// ## Errors
    /// `InsufficientStock` for the first line the warehouse can't cover.
    /// Nothing is written in that case.
    pub async fn register_sale(
        &self,
        order_id: i64,
        items: &[SaleLine],
        warehouse_id: WarehouseId,
    ) -> InventoryResult<PostingReceipt> {
        validate_sale_lines(items)?;

        let mut batch = Batch::new("sale", Origin::Sale { order_id });
        batch.steps = items
            .iter()
            .map(|line| Step::Issue {
                key: PartitionKey::new(line.product_id, warehouse_id),
                quantity: line.quantity,
            })
            .collect();

        self.run(batch).await
    }

    /// Posts the inflows of a received purchase order.
    pub async fn register_purchase(
        &self,
        purchase_order_id: i64,
        items: &[PurchaseLine],
        warehouse_id: WarehouseId,
    ) -> InventoryResult<PostingReceipt> {
        validate_purchase_lines(items)?;

        let mut batch = Batch::new("purchase", Origin::Purchase { purchase_order_id });
        batch.steps = items
            .iter()
            .map(|line| Step::Receive {
                key: PartitionKey::new(line.product_id, warehouse_id),
                quantity: line.quantity,
                cost: InboundCost::Unit(line.unit_cost),
            })
            .collect();

        self.run(batch).await
    }

    /// Posts a received stock transfer: per line, an outflow at the source
    /// and an inflow at the destination.
    ///
    /// ## Errors
    /// `InsufficientStock` (scoped to the source warehouse) rolls back every
    /// leg of every line.
    pub async fn register_transfer(
        &self,
        transfer_id: i64,
        from_warehouse_id: WarehouseId,
        to_warehouse_id: WarehouseId,
        items: &[TransferLine],
    ) -> InventoryResult<PostingReceipt> {
        validate_transfer_lines(from_warehouse_id, to_warehouse_id, items)?;

        let mut batch = Batch::new("transfer", Origin::Transfer { transfer_id });
        batch.steps = items
            .iter()
            .map(|line| Step::Move {
                product_id: line.product_id,
                from: from_warehouse_id,
                to: to_warehouse_id,
                quantity: line.quantity,
            })
            .collect();

        self.run(batch).await
    }

    /// Posts a manual stock correction. The reason becomes the movement detail.
    pub async fn register_adjustment(&self, adjustment: &Adjustment) -> InventoryResult<PostingReceipt> {
        let reason = validate_adjustment(adjustment)?;

        let key = PartitionKey::new(adjustment.product_id, adjustment.warehouse_id);
        let step = match adjustment.direction {
            Direction::In => Step::Receive {
                key,
                quantity: adjustment.quantity,
                cost: adjustment
                    .unit_cost
                    .map_or(InboundCost::CurrentAverage, InboundCost::Unit),
            },
            Direction::Out => Step::Issue {
                key,
                quantity: adjustment.quantity,
            },
        };

        let mut batch = Batch::new("adjustment", Origin::ManualAdjustment);
        batch.detail = Some(reason);
        batch.steps.push(step);

        self.run(batch).await
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Advisory stock check. Takes no locks; a later write may still fail.
    ///
    /// A partition with no history is reported as `(false, 0)`, even when
    /// `required` is zero. Storage failures are returned as errors.
    pub async fn validate_stock(
        &self,
        product_id: ProductId,
        warehouse_id: WarehouseId,
        required: Quantity,
    ) -> InventoryResult<StockCheck> {
        validate_required_quantity(required)?;

        let key = PartitionKey::new(product_id, warehouse_id);
        let check = match self.movements.latest(self.db.pool(), key).await? {
            Some(latest) => StockCheck {
                sufficient: latest.quantity_balance >= required,
                available: latest.quantity_balance,
            },
            None => StockCheck {
                sufficient: false,
                available: Quantity::zero(),
            },
        };

        debug!(partition = %key, %required, available = %check.available, sufficient = check.sufficient, "Stock check");
        Ok(check)
    }

    /// Current balance of a partition.
    ///
    /// ## Errors
    /// `NotFound` when the partition has no movements.
    pub async fn get_current_stock(&self, product_id: ProductId, warehouse_id: WarehouseId) -> InventoryResult<Quantity> {
        let latest = self.latest_movement(product_id, warehouse_id).await?;
        Ok(latest.quantity_balance)
    }

    /// Latest movement of a partition (its full balance, cost included).
    pub async fn latest_movement(&self, product_id: ProductId, warehouse_id: WarehouseId) -> InventoryResult<Movement> {
        let key = PartitionKey::new(product_id, warehouse_id);
        self.movements
            .latest(self.db.pool(), key)
            .await?
            .ok_or(InventoryError::NotFound {
                product_id,
                warehouse_id,
            })
    }

    pub async fn get_movement(&self, movement_id: MovementId) -> InventoryResult<Movement> {
        self.movements
            .get_by_id(movement_id)
            .await?
            .ok_or(InventoryError::MovementNotFound { movement_id })
    }

    /// Movements matching `filter`, oldest first.
    pub async fn history(&self, filter: &MovementFilter) -> InventoryResult<Vec<Movement>> {
        validate_history_limit(filter.limit)?;
        Ok(self.movements.history(filter).await?)
    }

    /// Current position of every partition, optionally for one warehouse.
    pub async fn stock_levels(&self, warehouse_id: Option<WarehouseId>) -> InventoryResult<Vec<StockLevel>> {
        let latest = self.movements.latest_per_partition(warehouse_id, None).await?;
        Ok(latest.iter().map(StockLevel::from).collect())
    }

    /// Partitions whose balance is below `threshold`
    /// (default: `EngineConfig::low_stock_threshold`).
    pub async fn low_stock(
        &self,
        warehouse_id: Option<WarehouseId>,
        threshold: Option<Quantity>,
    ) -> InventoryResult<Vec<StockLevel>> {
        let threshold = threshold.unwrap_or(self.config.low_stock_threshold);
        let latest = self
            .movements
            .latest_per_partition(warehouse_id, Some(threshold))
            .await?;
        Ok(latest.iter().map(StockLevel::from).collect())
    }

    // =========================================================================
    // Batch Executor
    // =========================================================================

    /// Runs a batch, retrying the whole of it after a lost append race.
    async fn run(&self, batch: Batch) -> InventoryResult<PostingReceipt> {
        let batch_id = Uuid::new_v4().to_string();

        if batch.steps.is_empty() {
            debug!(operation = batch.operation, "Empty batch, nothing to post");
            return Ok(PostingReceipt::empty(batch_id));
        }

        let mut retries = 0u32;
        let mut backoff = RETRY_BACKOFF_BASE;

        loop {
            let attempt = self.attempt(&batch, &batch_id);
            let result = match tokio::time::timeout(self.config.transaction_timeout, attempt).await {
                Ok(result) => result,
                // Dropping the attempt dropped its transaction, which rolls it back
                Err(_) => Err(DbError::Timeout(self.config.transaction_timeout).into()),
            };

            match result {
                Ok(receipt) => {
                    info!(
                        operation = batch.operation,
                        origin = ?batch.origin,
                        batch_id = %batch_id,
                        movements = receipt.len(),
                        retries,
                        "Batch committed"
                    );
                    return Ok(receipt);
                }
                Err(InventoryError::Storage(err)) if err.is_conflict() && retries < self.config.max_conflict_retries => {
                    retries += 1;
                    warn!(
                        operation = batch.operation,
                        batch_id = %batch_id,
                        retry = retries,
                        error = %err,
                        "Ledger write conflict, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                    backoff = (backoff * 2).min(RETRY_BACKOFF_MAX);
                }
                Err(err) => {
                    warn!(
                        operation = batch.operation,
                        batch_id = %batch_id,
                        retries,
                        error = %err,
                        "Batch rolled back"
                    );
                    return Err(err);
                }
            }
        }
    }

    /// One transaction over the whole batch.
    async fn attempt(&self, batch: &Batch, batch_id: &str) -> InventoryResult<PostingReceipt> {
        let mut tx = self.db.pool().begin().await.map_err(DbError::from)?;

        match self.apply_steps(&mut tx, batch, batch_id).await {
            Ok(movements) => {
                tx.commit().await.map_err(DbError::from)?;
                Ok(PostingReceipt {
                    batch_id: batch_id.to_string(),
                    movements,
                })
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(batch_id = %batch_id, error = %rollback_err, "Rollback failed");
                }
                Err(err)
            }
        }
    }

    async fn apply_steps(
        &self,
        tx: &mut Transaction<'static, Sqlite>,
        batch: &Batch,
        batch_id: &str,
    ) -> InventoryResult<Vec<Movement>> {
        let mut written = Vec::with_capacity(batch.steps.len());

        for step in &batch.steps {
            match *step {
                Step::Issue { key, quantity } => {
                    written.push(self.issue(tx, batch, batch_id, key, quantity).await?);
                }
                Step::Receive { key, quantity, cost } => {
                    written.push(self.receive(tx, batch, batch_id, key, quantity, cost).await?);
                }
                Step::Move {
                    product_id,
                    from,
                    to,
                    quantity,
                } => {
                    let out = self
                        .issue(tx, batch, batch_id, PartitionKey::new(product_id, from), quantity)
                        .await?;
                    let key = PartitionKey::new(product_id, to);
                    let latest = self.movements.latest(&mut **tx, key).await?;
                    let posting = post_valued_inflow(
                        &Balance::from_latest(latest.as_ref()),
                        key,
                        quantity,
                        out.cost_out,
                        out.total_out,
                    )?;
                    let inbound = self
                        .append(tx, batch, batch_id, key, latest.as_ref(), Direction::In, posting)
                        .await?;
                    written.push(out);
                    written.push(inbound);
                }
            }
        }

        Ok(written)
    }

    async fn issue(
        &self,
        tx: &mut Transaction<'static, Sqlite>,
        batch: &Batch,
        batch_id: &str,
        key: PartitionKey,
        quantity: Quantity,
    ) -> InventoryResult<Movement> {
        let latest = self.movements.latest(&mut **tx, key).await?;
        let posting = post_outflow(&Balance::from_latest(latest.as_ref()), key, quantity)?;
        self.append(tx, batch, batch_id, key, latest.as_ref(), Direction::Out, posting)
            .await
    }

    async fn receive(
        &self,
        tx: &mut Transaction<'static, Sqlite>,
        batch: &Batch,
        batch_id: &str,
        key: PartitionKey,
        quantity: Quantity,
        cost: InboundCost,
    ) -> InventoryResult<Movement> {
        let latest = self.movements.latest(&mut **tx, key).await?;
        let prior = Balance::from_latest(latest.as_ref());
        let unit_cost = match cost {
            InboundCost::Unit(cost) => cost,
            InboundCost::CurrentAverage => prior.unit_cost,
        };
        let posting = post_inflow(&prior, key, quantity, unit_cost)?;
        self.append(tx, batch, batch_id, key, latest.as_ref(), Direction::In, posting)
            .await
    }

    #[allow(clippy::too_many_arguments)]
    async fn append(
        &self,
        tx: &mut Transaction<'static, Sqlite>,
        batch: &Batch,
        batch_id: &str,
        key: PartitionKey,
        latest: Option<&Movement>,
        direction: Direction,
        posting: Posting,
    ) -> InventoryResult<Movement> {
        let new = NewMovement {
            key,
            origin: batch.origin,
            previous_movement_id: latest.map(|m| m.id),
            batch_id: batch_id.to_string(),
            detail: batch.detail(direction),
            posting,
            created_at: Utc::now(),
        };

        Ok(self.movements.append(&mut **tx, new).await?)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
