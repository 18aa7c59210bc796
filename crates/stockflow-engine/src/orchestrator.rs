//! # Transaction Orchestrator
//!
//! Turns a shipment request into one atomic unit of work.
//!
//! ## Request Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     create_incoming / write_off / transfer              │
//! │                                                                         │
//! │  validate route + items ─────────────────► InvalidArgument              │
//! │       │                                                                 │
//! │  resolve warehouses (and user) ──────────► NotFound                     │
//! │       │                                                                 │
//! │  ┌────▼──────────────── stage (timeout) ───────────────────────────┐   │
//! │  │ BEGIN                                                           │   │
//! │  │ INSERT shipment header      ← takes the write lock              │   │
//! │  │ for each item, in order:                                        │   │
//! │  │   product exists? ──────────────────────► InvalidArgument       │   │
//! │  │   INSERT shipment item                                          │   │
//! │  │   apply movements ──────────────────────► InsufficientStock     │   │
//! │  └────┬────────────────────────────────────────────────────────────┘   │
//! │       │  deadline passed ─────────────────► Timeout (rolled back)       │
//! │  COMMIT (outside the deadline)                                          │
//! │       │  any error: unit of work dropped, nothing persisted             │
//! │       │                                                                 │
//! │       ├── Conflict and retries left ──► back off, fresh attempt        │
//! │       └── otherwise ──► result to caller                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use chrono::Utc;
use tracing::{debug, info, warn};

use crate::balance::StockBalanceManager;
use crate::config::TransactionSettings;
use crate::error::{EngineError, EngineResult};
use stockflow_core::validation::{validate_items, validate_route};
use stockflow_core::{CoreError, Id, ItemRequest, Route, Shipment};
use stockflow_db::{Database, ProductRepository, ShipmentRepository, UnitOfWork};

/// Executes stock transactions.
///
/// Cheap to clone; all clones share the same pool.
#[derive(Debug, Clone)]
pub struct TransactionOrchestrator {
    db: Database,
    balances: StockBalanceManager,
    settings: TransactionSettings,
}

impl TransactionOrchestrator {
    pub fn new(db: Database, settings: TransactionSettings) -> Self {
        TransactionOrchestrator {
            db,
            balances: StockBalanceManager::new(),
            settings,
        }
    }

    /// Receives goods into `warehouse_id` on behalf of `user_id`.
    ///
    /// ## Errors
    /// - `InvalidArgument`: empty items, non-positive count, unknown product
    /// - `NotFound`: unknown warehouse or user
    pub async fn create_incoming(
        &self,
        warehouse_id: Id,
        items: &[ItemRequest],
        user_id: Id,
    ) -> EngineResult<Shipment> {
        self.execute(Route::Incoming { warehouse: warehouse_id }, Some(user_id), items)
            .await
    }

    /// Removes goods from `warehouse_id`.
    ///
    /// ## Errors
    /// - `InvalidArgument`, `NotFound` as for incoming
    /// - `InsufficientStock`: any item exceeds the balance; no item is applied
    pub async fn create_write_off(
        &self,
        warehouse_id: Id,
        items: &[ItemRequest],
    ) -> EngineResult<Shipment> {
        self.execute(Route::WriteOff { warehouse: warehouse_id }, None, items)
            .await
    }

    /// Moves goods from one warehouse to another.
    ///
    /// ## Errors
    /// - `InvalidArgument`: same source and destination, bad items
    /// - `NotFound`: either warehouse is unknown
    /// - `InsufficientStock`: the source lacks an item; no item is moved
    pub async fn create_transfer(
        &self,
        from_warehouse_id: Id,
        to_warehouse_id: Id,
        items: &[ItemRequest],
    ) -> EngineResult<Shipment> {
        let route = Route::Transfer {
            from: from_warehouse_id,
            to: to_warehouse_id,
        };
        self.execute(route, None, items).await
    }

    /// Validates, resolves collaborators, then runs attempts until one
    /// succeeds, fails for good, or the retry budget is spent.
    async fn execute(
        &self,
        route: Route,
        user_id: Option<Id>,
        items: &[ItemRequest],
    ) -> EngineResult<Shipment> {
        validate_route(&route)?;
        validate_items(items)?;
        self.resolve(&route, user_id).await?;

        let mut backoff = self.create_backoff();
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;

            match self.attempt(route, user_id, items).await {
                Ok(shipment) => return Ok(shipment),
                Err(err) if err.is_retryable() && attempt <= self.settings.max_retries => {
                    let delay = backoff
                        .next_backoff()
                        .unwrap_or_else(|| self.settings.max_backoff());
                    warn!(
                        kind = %route.kind(),
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Transaction conflicted, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => {
                    if err.is_retryable() {
                        warn!(kind = %route.kind(), attempt, "Retries exhausted");
                    }
                    return Err(err);
                }
            }
        }
    }

    /// Checks that every referenced warehouse (and the user) exists.
    async fn resolve(&self, route: &Route, user_id: Option<Id>) -> EngineResult<()> {
        let warehouses = self.db.warehouses();
        for warehouse_id in route.warehouses() {
            if warehouses.get_by_id(warehouse_id).await?.is_none() {
                return Err(CoreError::not_found("Warehouse", warehouse_id).into());
            }
        }

        if let Some(user_id) = user_id {
            if self.db.users().get_by_id(user_id).await?.is_none() {
                return Err(CoreError::not_found("User", user_id).into());
            }
        }

        Ok(())
    }

    /// One unit of work. The deadline covers everything before COMMIT, so
    /// a `Timeout` result never leaves a committed shipment behind.
    async fn attempt(
        &self,
        route: Route,
        user_id: Option<Id>,
        items: &[ItemRequest],
    ) -> EngineResult<Shipment> {
        let budget = self.settings.timeout();

        let staged = match tokio::time::timeout(budget, self.stage(route, user_id, items)).await {
            Ok(staged) => staged,
            Err(_) => {
                warn!(
                    kind = %route.kind(),
                    timeout_ms = budget.as_millis() as u64,
                    "Transaction timed out, rolled back"
                );
                return Err(EngineError::Timeout {
                    operation: route.kind().as_str(),
                    after: budget,
                });
            }
        };

        let (uow, shipment) = staged.map_err(|err| {
            debug!(kind = %route.kind(), error = %err, "Unit of work rolled back");
            err
        })?;

        uow.commit().await?;

        info!(
            shipment_id = shipment.id,
            kind = %shipment.kind,
            items = shipment.items.len(),
            units = shipment.total_units(),
            "Shipment committed"
        );
        Ok(shipment)
    }

    /// Writes the header, items and movements into an open unit of work
    /// and hands it back uncommitted. Returning early drops the unit of
    /// work, which rolls back everything written so far.
    async fn stage(
        &self,
        route: Route,
        user_id: Option<Id>,
        items: &[ItemRequest],
    ) -> EngineResult<(UnitOfWork, Shipment)> {
        let mut uow = self.db.begin(route.kind().as_str()).await?;
        let today = Utc::now().date_naive();

        let mut shipment =
            ShipmentRepository::insert_header(uow.conn(), &route, today, user_id).await?;

        for line in items {
            if !ProductRepository::exists_in(uow.conn(), line.product_id).await? {
                return Err(CoreError::invalid(format!(
                    "product {} does not exist",
                    line.product_id
                ))
                .into());
            }

            let item =
                ShipmentRepository::insert_item(uow.conn(), shipment.id, line.product_id, line.count)
                    .await?;

            for movement in route.movements(line) {
                self.balances.apply(uow.conn(), &movement).await?;
            }

            shipment.items.push(item);
        }

        Ok((uow, shipment))
    }

    /// Creates the exponential backoff configuration.
    fn create_backoff(&self) -> ExponentialBackoff {
        Self::backoff_for(&self.settings)
    }

    fn backoff_for(settings: &TransactionSettings) -> ExponentialBackoff {
        ExponentialBackoff {
            current_interval: settings.initial_backoff(),
            initial_interval: settings.initial_backoff(),
            max_interval: settings.max_backoff(),
            multiplier: 2.0,
            max_elapsed_time: None, // attempts are capped by max_retries
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use stockflow_core::{NewProduct, NewWarehouse, ShipmentKind};
    use stockflow_db::DbConfig;

    struct Fixture {
        db: Database,
        engine: TransactionOrchestrator,
        product: Id,
        north: Id,
        south: Id,
        user: Id,
    }

    async fn fixture() -> Fixture {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product = db
            .products()
            .create(&NewProduct {
                name: "Drill bit".to_string(),
                unit: "pcs".to_string(),
                description: None,
            })
            .await
            .unwrap()
            .id;
        let warehouse = |name: &str| NewWarehouse {
            name: name.to_string(),
            location: "Site".to_string(),
        };
        let north = db.warehouses().create(&warehouse("North")).await.unwrap().id;
        let south = db.warehouses().create(&warehouse("South")).await.unwrap().id;
        let user = db.users().create("receiver", None).await.unwrap().id;
        let engine = TransactionOrchestrator::new(db.clone(), TransactionSettings::default());

        Fixture { db, engine, product, north, south, user }
    }

    async fn count(f: &Fixture, warehouse: Id) -> Option<i64> {
        f.db.stock()
            .get(f.product, warehouse)
            .await
            .unwrap()
            .map(|b| b.count)
    }

    #[tokio::test]
    async fn test_incoming_then_transfer() {
        let f = fixture().await;

        let incoming = f
            .engine
            .create_incoming(f.north, &[ItemRequest::new(f.product, 10)], f.user)
            .await
            .unwrap();
        assert_eq!(incoming.kind, ShipmentKind::Incoming);
        assert_eq!(incoming.user_id, Some(f.user));
        assert_eq!(incoming.items.len(), 1);

        let transfer = f
            .engine
            .create_transfer(f.north, f.south, &[ItemRequest::new(f.product, 4)])
            .await
            .unwrap();
        assert_eq!(transfer.destination_warehouse_id, Some(f.south));
        assert_eq!(transfer.user_id, None);

        assert_eq!(count(&f, f.north).await, Some(6));
        assert_eq!(count(&f, f.south).await, Some(4));
    }

    #[tokio::test]
    async fn test_validation_happens_before_any_write() {
        let f = fixture().await;

        let err = f.engine.create_write_off(f.north, &[]).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);

        let err = f
            .engine
            .create_transfer(f.north, f.north, &[ItemRequest::new(f.product, 1)])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);

        let err = f
            .engine
            .create_incoming(f.north, &[ItemRequest::new(f.product, 1)], f.user + 50)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = f
            .engine
            .create_transfer(f.north, f.south + 50, &[ItemRequest::new(f.product, 1)])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        assert_eq!(f.db.shipments().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unknown_product_rolls_back_header() {
        let f = fixture().await;

        let err = f
            .engine
            .create_incoming(
                f.north,
                &[ItemRequest::new(f.product, 5), ItemRequest::new(f.product + 99, 5)],
                f.user,
            )
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(f.db.shipments().count().await.unwrap(), 0);
        assert_eq!(count(&f, f.north).await, None);
    }

    #[tokio::test]
    async fn test_repeated_product_lines_apply_in_order() {
        let f = fixture().await;
        f.engine
            .create_incoming(f.north, &[ItemRequest::new(f.product, 5)], f.user)
            .await
            .unwrap();

        // 3 + 3 exceeds 5 only on the second line
        let err = f
            .engine
            .create_write_off(
                f.north,
                &[ItemRequest::new(f.product, 3), ItemRequest::new(f.product, 3)],
            )
            .await
            .unwrap_err();
        match err.as_domain() {
            Some(CoreError::InsufficientStock { available, requested, .. }) => {
                assert_eq!((*available, *requested), (2, 3));
            }
            other => panic!("expected insufficient stock, got {other:?}"),
        }
        assert_eq!(count(&f, f.north).await, Some(5));
    }

    #[test]
    fn test_backoff_grows_to_cap() {
        let settings = TransactionSettings {
            initial_backoff_ms: 10,
            max_backoff_ms: 40,
            ..TransactionSettings::default()
        };
        let mut backoff = ExponentialBackoff {
            randomization_factor: 0.0,
            ..TransactionOrchestrator::backoff_for(&settings)
        };

        let delays: Vec<u128> = (0..4)
            .map(|_| backoff.next_backoff().unwrap().as_millis())
            .collect();
        assert_eq!(delays, vec![10, 20, 40, 40]);
    }
}
