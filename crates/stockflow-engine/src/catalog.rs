//! # Catalog
//!
//! Products, warehouses and users: the entities stock is tracked against.
//! Input is validated here; the repositories only persist.

use tracing::info;

use crate::error::EngineResult;
use stockflow_core::validation::{validate_name, validate_page, validate_username};
use stockflow_core::{
    CoreError, Id, NewProduct, NewWarehouse, Page, PageRequest, Product, User, Warehouse,
};
use stockflow_db::{Database, DbError};

/// Catalog maintenance and lookups.
#[derive(Debug, Clone)]
pub struct Catalog {
    db: Database,
    max_page_size: u32,
}

impl Catalog {
    pub fn new(db: Database, max_page_size: u32) -> Self {
        Catalog { db, max_page_size }
    }

    // =========================================================================
    // Products
    // =========================================================================

    pub async fn create_product(&self, product: NewProduct) -> EngineResult<Product> {
        let product = normalize_product(product)?;
        let created = self.db.products().create(&product).await?;

        info!(id = created.id, name = %created.name, "Product registered");
        Ok(created)
    }

    pub async fn product(&self, id: Id) -> EngineResult<Product> {
        self.db
            .products()
            .get_by_id(id)
            .await?
            .ok_or_else(|| CoreError::not_found("Product", id).into())
    }

    pub async fn update_product(&self, id: Id, product: NewProduct) -> EngineResult<Product> {
        let product = normalize_product(product)?;
        Ok(self.db.products().update(id, &product).await?)
    }

    /// Case-insensitive name search; `None` lists everything.
    pub async fn search_products(
        &self,
        query: Option<&str>,
        page: PageRequest,
    ) -> EngineResult<Page<Product>> {
        validate_page(&page, self.max_page_size)?;
        Ok(self.db.products().search(query, page).await?)
    }

    pub async fn count_products(&self) -> EngineResult<i64> {
        Ok(self.db.products().count().await?)
    }

    // =========================================================================
    // Warehouses
    // =========================================================================

    pub async fn create_warehouse(&self, warehouse: NewWarehouse) -> EngineResult<Warehouse> {
        let warehouse = normalize_warehouse(warehouse)?;
        let created = self.db.warehouses().create(&warehouse).await?;

        info!(id = created.id, name = %created.name, "Warehouse registered");
        Ok(created)
    }

    pub async fn warehouse(&self, id: Id) -> EngineResult<Warehouse> {
        self.db
            .warehouses()
            .get_by_id(id)
            .await?
            .ok_or_else(|| CoreError::not_found("Warehouse", id).into())
    }

    pub async fn update_warehouse(
        &self,
        id: Id,
        warehouse: NewWarehouse,
    ) -> EngineResult<Warehouse> {
        let warehouse = normalize_warehouse(warehouse)?;
        Ok(self.db.warehouses().update(id, &warehouse).await?)
    }

    pub async fn search_warehouses(
        &self,
        query: Option<&str>,
        page: PageRequest,
    ) -> EngineResult<Page<Warehouse>> {
        validate_page(&page, self.max_page_size)?;
        Ok(self.db.warehouses().search(query, page).await?)
    }

    pub async fn count_warehouses(&self) -> EngineResult<i64> {
        Ok(self.db.warehouses().count().await?)
    }

    // =========================================================================
    // Users
    // =========================================================================

    /// Registers a user.
    ///
    /// ## Errors
    /// - `InvalidArgument` if the username is malformed or already taken
    pub async fn create_user(&self, username: &str, email: Option<&str>) -> EngineResult<User> {
        let username = username.trim();
        validate_username(username)?;

        match self.db.users().create(username, email).await {
            Ok(user) => {
                info!(id = user.id, username = %user.username, "User registered");
                Ok(user)
            }
            Err(DbError::UniqueViolation { .. }) => Err(CoreError::invalid(format!(
                "username '{}' is already taken",
                username
            ))
            .into()),
            Err(other) => Err(other.into()),
        }
    }

    pub async fn user(&self, id: Id) -> EngineResult<User> {
        self.db
            .users()
            .get_by_id(id)
            .await?
            .ok_or_else(|| CoreError::not_found("User", id).into())
    }

    pub async fn user_by_username(&self, username: &str) -> EngineResult<User> {
        self.db
            .users()
            .get_by_username(username.trim())
            .await?
            .ok_or_else(|| CoreError::not_found("User", username.trim()).into())
    }
}

fn normalize_product(product: NewProduct) -> EngineResult<NewProduct> {
    validate_name("name", &product.name)?;
    validate_name("unit", &product.unit)?;

    Ok(NewProduct {
        name: product.name.trim().to_string(),
        unit: product.unit.trim().to_string(),
        description: product
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty()),
    })
}

fn normalize_warehouse(warehouse: NewWarehouse) -> EngineResult<NewWarehouse> {
    validate_name("name", &warehouse.name)?;
    validate_name("location", &warehouse.location)?;

    Ok(NewWarehouse {
        name: warehouse.name.trim().to_string(),
        location: warehouse.location.trim().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use stockflow_db::DbConfig;

    async fn catalog() -> Catalog {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        Catalog::new(db, 100)
    }

    #[tokio::test]
    async fn test_product_lifecycle() {
        let catalog = catalog().await;

        let created = catalog
            .create_product(NewProduct {
                name: "  Wood screw 4x40 ".to_string(),
                unit: "box".to_string(),
                description: Some("   ".to_string()),
            })
            .await
            .unwrap();
        assert_eq!(created.name, "Wood screw 4x40");
        assert_eq!(created.description, None);

        let updated = catalog
            .update_product(
                created.id,
                NewProduct {
                    name: "Wood screw 4x45".to_string(),
                    unit: "box".to_string(),
                    description: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(catalog.product(created.id).await.unwrap(), updated);

        let found = catalog
            .search_products(Some("SCREW"), PageRequest::first())
            .await
            .unwrap();
        assert_eq!(found.total_items, 1);
        assert_eq!(catalog.count_products().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_invalid_input_is_invalid_argument() {
        let catalog = catalog().await;

        let err = catalog
            .create_product(NewProduct {
                name: String::new(),
                unit: "pcs".to_string(),
                description: None,
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);

        let err = catalog
            .create_warehouse(NewWarehouse {
                name: "East".to_string(),
                location: "x".repeat(201),
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[tokio::test]
    async fn test_missing_entities() {
        let catalog = catalog().await;

        assert_eq!(catalog.product(5).await.unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(catalog.warehouse(5).await.unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(
            catalog.user_by_username("ghost").await.unwrap_err().kind(),
            ErrorKind::NotFound
        );
        let err = catalog
            .update_warehouse(
                5,
                NewWarehouse {
                    name: "West".to_string(),
                    location: "Pier".to_string(),
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_duplicate_username() {
        let catalog = catalog().await;

        let user = catalog.create_user("picker", None).await.unwrap();
        assert_eq!(catalog.user(user.id).await.unwrap(), user);

        let err = catalog.create_user("picker", None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }
}
