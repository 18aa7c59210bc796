//! # Read Surfaces
//!
//! Read-only access to shipments and stock. Nothing here takes the write
//! lock; readers see the last committed state through WAL snapshots.

use tracing::{debug, warn};

use crate::config::QuerySettings;
use crate::error::EngineResult;
use stockflow_core::validation::{validate_date_range, validate_page};
use stockflow_core::{
    CoreError, Id, Page, PageRequest, Reconciliation, Shipment, ShipmentFilter, ShipmentItem,
    StockBalance, StockFilter,
};
use stockflow_db::{Database, ShipmentRepository, StockRepository};

// =============================================================================
// Shipments
// =============================================================================

/// Shipment lookups and listings.
#[derive(Debug, Clone)]
pub struct ShipmentQuery {
    db: Database,
    settings: QuerySettings,
}

impl ShipmentQuery {
    pub fn new(db: Database, settings: QuerySettings) -> Self {
        ShipmentQuery { db, settings }
    }

    /// First page with the configured default size.
    pub fn default_page(&self) -> PageRequest {
        PageRequest::new(0, self.settings.default_page_size)
    }

    /// Gets a shipment with its items.
    ///
    /// ## Errors
    /// - `NotFound` if no shipment has this id
    pub async fn get(&self, id: Id) -> EngineResult<Shipment> {
        self.db
            .shipments()
            .get_by_id(id)
            .await?
            .ok_or_else(|| CoreError::not_found("Shipment", id).into())
    }

    /// Gets one shipment line item by its id.
    pub async fn item(&self, id: Id) -> EngineResult<ShipmentItem> {
        self.db
            .shipments()
            .get_item(id)
            .await?
            .ok_or_else(|| CoreError::not_found("ShipmentItem", id).into())
    }

    /// Lists shipments matching the filter.
    ///
    /// ## Errors
    /// - `InvalidArgument` for an inverted date range or a bad page size
    pub async fn list(
        &self,
        filter: &ShipmentFilter,
        page: PageRequest,
    ) -> EngineResult<Page<Shipment>> {
        validate_page(&page, self.settings.max_page_size)?;
        validate_date_range(filter.date_from, filter.date_to)?;

        Ok(self.db.shipments().list(filter, page).await?)
    }
}

// =============================================================================
// Stock
// =============================================================================

/// Balance lookups and ledger reconciliation.
#[derive(Debug, Clone)]
pub struct StockQuery {
    db: Database,
    settings: QuerySettings,
}

impl StockQuery {
    pub fn new(db: Database, settings: QuerySettings) -> Self {
        StockQuery { db, settings }
    }

    /// Balance of one pair; `None` if nothing ever moved there.
    pub async fn balance(&self, product_id: Id, warehouse_id: Id) -> EngineResult<Option<StockBalance>> {
        Ok(self.db.stock().get(product_id, warehouse_id).await?)
    }

    /// Gets a balance row by id.
    pub async fn get(&self, id: Id) -> EngineResult<StockBalance> {
        self.db
            .stock()
            .get_by_id(id)
            .await?
            .ok_or_else(|| CoreError::not_found("StockBalance", id).into())
    }

    /// Lists balances by product name fragment and/or warehouse.
    pub async fn list(
        &self,
        filter: &StockFilter,
        page: PageRequest,
    ) -> EngineResult<Page<StockBalance>> {
        validate_page(&page, self.settings.max_page_size)?;

        Ok(self.db.stock().list(filter, page).await?)
    }

    /// Compares one pair's balance with the signed sum of its journal.
    ///
    /// Both numbers come from the same read snapshot.
    pub async fn reconcile(&self, product_id: Id, warehouse_id: Id) -> EngineResult<Reconciliation> {
        let mut snapshot = self.db.begin("reconcile").await?;

        let balance = StockRepository::count_in(snapshot.conn(), product_id, warehouse_id)
            .await?
            .unwrap_or(0);
        let ledger_total =
            ShipmentRepository::ledger_total_in(snapshot.conn(), product_id, warehouse_id).await?;

        snapshot.rollback().await?;

        Ok(Reconciliation {
            product_id,
            warehouse_id,
            balance,
            ledger_total,
        })
    }

    /// Reconciles every balance row and returns the ones that disagree.
    pub async fn audit(&self) -> EngineResult<Vec<Reconciliation>> {
        let mut snapshot = self.db.begin("audit").await?;

        let balances = StockRepository::all_in(snapshot.conn()).await?;
        let mut mismatches = Vec::new();

        for balance in &balances {
            let ledger_total = ShipmentRepository::ledger_total_in(
                snapshot.conn(),
                balance.product_id,
                balance.warehouse_id,
            )
            .await?;

            let check = Reconciliation {
                product_id: balance.product_id,
                warehouse_id: balance.warehouse_id,
                balance: balance.count,
                ledger_total,
            };

            if !check.is_consistent() {
                warn!(
                    product_id = check.product_id,
                    warehouse_id = check.warehouse_id,
                    balance = check.balance,
                    ledger_total = check.ledger_total,
                    "Stock balance disagrees with shipment journal"
                );
                mismatches.push(check);
            }
        }

        snapshot.rollback().await?;

        debug!(
            checked = balances.len(),
            mismatches = mismatches.len(),
            "Ledger audit finished"
        );
        Ok(mismatches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use chrono::NaiveDate;
    use stockflow_db::DbConfig;

    async fn queries() -> (ShipmentQuery, StockQuery) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        (
            ShipmentQuery::new(db.clone(), QuerySettings::default()),
            StockQuery::new(db, QuerySettings::default()),
        )
    }

    #[tokio::test]
    async fn test_missing_entities_are_not_found() {
        let (shipments, stock) = queries().await;

        assert_eq!(shipments.get(1).await.unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(shipments.item(1).await.unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(stock.get(1).await.unwrap_err().kind(), ErrorKind::NotFound);
        assert!(stock.balance(1, 1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_rejects_bad_requests() {
        let (shipments, stock) = queries().await;

        let inverted = ShipmentFilter::default().between(
            NaiveDate::from_ymd_opt(2026, 5, 2).unwrap(),
            NaiveDate::from_ymd_opt(2026, 5, 1).unwrap(),
        );
        let err = shipments.list(&inverted, shipments.default_page()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);

        let err = stock
            .list(&StockFilter::default(), PageRequest::new(0, 1000))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);

        let empty = shipments
            .list(&ShipmentFilter::default(), shipments.default_page())
            .await
            .unwrap();
        assert_eq!(empty.total_items, 0);
    }

    #[tokio::test]
    async fn test_empty_ledger_reconciles() {
        let (_, stock) = queries().await;

        let check = stock.reconcile(1, 1).await.unwrap();
        assert!(check.is_consistent());
        assert!(stock.audit().await.unwrap().is_empty());
    }
}
