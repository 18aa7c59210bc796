//! Shared fixtures for the engine integration tests.

#![allow(dead_code)]

use stockflow_core::{Id, ItemRequest, NewProduct, NewWarehouse};
use stockflow_engine::{Inventory, StockflowConfig};
use tempfile::TempDir;

/// An open inventory with a small catalog.
pub struct Harness {
    pub inventory: Inventory,
    pub products: Vec<Id>,
    pub north: Id,
    pub south: Id,
    pub user: Id,
    // Keeps the database file alive for on-disk harnesses.
    _dir: Option<TempDir>,
}

impl Harness {
    /// Private in-memory database (single connection).
    pub async fn in_memory() -> Harness {
        let inventory = Inventory::open(StockflowConfig::in_memory()).await.unwrap();
        Harness::populate(inventory, None).await
    }

    /// Database file in a fresh temporary directory, with a real pool.
    pub async fn on_disk(configure: impl FnOnce(&mut StockflowConfig)) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let mut config = StockflowConfig::with_database(dir.path().join("stockflow.db"));
        configure(&mut config);

        let inventory = Inventory::open(config).await.unwrap();
        Harness::populate(inventory, Some(dir)).await
    }

    async fn populate(inventory: Inventory, dir: Option<TempDir>) -> Harness {
        let catalog = inventory.catalog();

        let mut products = Vec::new();
        for name in ["Hinge", "Bracket", "Latch"] {
            let product = catalog
                .create_product(NewProduct {
                    name: name.to_string(),
                    unit: "pcs".to_string(),
                    description: None,
                })
                .await
                .unwrap();
            products.push(product.id);
        }

        let warehouse = |name: &str| NewWarehouse {
            name: name.to_string(),
            location: format!("{name} yard"),
        };
        let north = catalog.create_warehouse(warehouse("North")).await.unwrap().id;
        let south = catalog.create_warehouse(warehouse("South")).await.unwrap().id;
        let user = catalog.create_user("receiver", None).await.unwrap().id;

        Harness {
            inventory,
            products,
            north,
            south,
            user,
            _dir: dir,
        }
    }

    pub fn product(&self, n: usize) -> Id {
        self.products[n]
    }

    /// Current count of a pair, `None` if the row was never created.
    pub async fn count(&self, product: Id, warehouse: Id) -> Option<i64> {
        self.inventory
            .stock()
            .balance(product, warehouse)
            .await
            .unwrap()
            .map(|b| b.count)
    }

    /// Receives `count` units of `product` into `warehouse`.
    pub async fn receive(&self, warehouse: Id, product: Id, count: i64) {
        self.inventory
            .transactions()
            .create_incoming(warehouse, &[ItemRequest::new(product, count)], self.user)
            .await
            .unwrap();
    }

    pub async fn shipment_count(&self) -> i64 {
        self.inventory.db().shipments().count().await.unwrap()
    }
}
