use sqlx::error::ErrorKind;
use sqlx::sqlite::{Sqlite, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{QueryBuilder, Row};

use products_core::model::{Product, ProductInput};

const PRODUCT_COLUMNS: &str = "id, name, description, price, created_at";

/// Rows inserted by `Database::seed`.
pub const SEED_PRODUCTS: &[(&str, &str, f64)] = &[
    (
        "Licensed Wooden Computer",
        "Eligendi est dolore iusto est eos laborum. Ipsam iste excepturi quam aliquid aliquam esse omnis consectetur in. \
         Ut officiis nostrum totam sit veritatis saepe qui omnis. Et cumque impedit architecto esse vero.",
        31.00,
    ),
    (
        "Handmade Concrete Soap",
        "Doloremque ipsam perferendis praesentium minima. Et ratione ut sint aliquid recusandae quos repudiandae dicta. \
         Harum placeat beatae dolorum placeat. Necessitatibus suscipit magnam consequuntur officia porro fugiat quia odio. \
         Cupiditate ipsa qui quibusdam laborum.",
        72.00,
    ),
    (
        "Incredible Frozen Gloves",
        "Accusamus aliquam eligendi vero sit. Quidem hic inventore eos dignissimos quae totam autem eaque ratione. \
         Quo veniam sit qui voluptas nisi fugiat beatae. Minima impedit numquam consectetur eius facere quas molestiae accusamus laudantium. \
         Non qui voluptatem.",
        68.98,
    ),
];

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("constraint violation: {0}")]
    ConstraintViolation(#[source] sqlx::Error),
    #[error("database error: {0}")]
    Connectivity(#[source] sqlx::Error),
}

impl From<sqlx::Error> for DbError {
    fn from(e: sqlx::Error) -> Self {
        let constraint = match &e {
            sqlx::Error::Database(db) => !matches!(db.kind(), ErrorKind::Other),
            _ => false,
        };
        if constraint {
            DbError::ConstraintViolation(e)
        } else {
            DbError::Connectivity(e)
        }
    }
}

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(url: &str, max_connections: u32) -> Result<Self, DbError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        let db = Self { pool };
        db.run_migrations().await?;
        Ok(db)
    }

    async fn run_migrations(&self) -> Result<(), DbError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS products (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                description TEXT NOT NULL,
                price REAL NOT NULL,
                created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now'))
            )",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Replace the table contents with the demo rows.
    pub async fn seed(&self) -> Result<(), DbError> {
        sqlx::query("DELETE FROM products")
            .execute(&self.pool)
            .await?;
        for (name, description, price) in SEED_PRODUCTS {
            self.create_product(&ProductInput::new(name, description, *price))
                .await?;
        }
        tracing::info!(count = SEED_PRODUCTS.len(), "seeded products");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Products
    // -----------------------------------------------------------------------

    pub async fn list_products(&self) -> Result<Vec<Product>, DbError> {
        tracing::debug!("listing products");
        let rows = sqlx::query(&format!("SELECT {PRODUCT_COLUMNS} FROM products ORDER BY id"))
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_product).collect()
    }

    /// Zero or one row. `id` is the raw path segment.
    pub async fn get_product(&self, id: &str) -> Result<Vec<Product>, DbError> {
        let id = parse_id(id)?;
        tracing::debug!(id, "fetching product");
        let rows = sqlx::query(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?"))
            .bind(id)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_product).collect()
    }

    /// Absent fields are bound as NULL and rejected by the NOT NULL constraints.
    pub async fn create_product(&self, input: &ProductInput) -> Result<Vec<Product>, DbError> {
        tracing::debug!(name = ?input.name(), "creating product");
        let rows = sqlx::query(&format!(
            "INSERT INTO products (name, description, price) VALUES (?, ?, ?)
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(input.name())
        .bind(input.description())
        .bind(input.price())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_product).collect()
    }

    /// Empty when no row has `id`. Only the keys present in `input` are
    /// written; an explicit null is written as NULL.
    pub async fn update_product(
        &self,
        id: &str,
        input: &ProductInput,
    ) -> Result<Vec<Product>, DbError> {
        let id = parse_id(id)?;
        if input.is_empty() {
            return Err(DbError::InvalidArgument(
                "update needs at least one of name, description, price".into(),
            ));
        }
        tracing::debug!(id, "updating product");

        let mut query = QueryBuilder::<Sqlite>::new("UPDATE products SET ");
        let mut columns = query.separated(", ");
        if let Some(name) = &input.name {
            columns.push("name = ").push_bind_unseparated(name.as_deref());
        }
        if let Some(description) = &input.description {
            columns
                .push("description = ")
                .push_bind_unseparated(description.as_deref());
        }
        if let Some(price) = input.price {
            columns.push("price = ").push_bind_unseparated(price);
        }
        query
            .push(" WHERE id = ")
            .push_bind(id)
            .push(format!(" RETURNING {PRODUCT_COLUMNS}"));

        let rows = query.build().fetch_all(&self.pool).await?;
        rows.iter().map(row_to_product).collect()
    }

    /// Returns the removed rows, empty when no row has `id`.
    pub async fn delete_product(&self, id: &str) -> Result<Vec<Product>, DbError> {
        let id = parse_id(id)?;
        tracing::debug!(id, "deleting product");
        let rows = sqlx::query(&format!(
            "DELETE FROM products WHERE id = ? RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_product).collect()
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_id(raw: &str) -> Result<i64, DbError> {
    raw.parse::<i64>()
        .map_err(|_| DbError::InvalidArgument(format!("product id must be an integer, got {raw:?}")))
}

fn row_to_product(row: &SqliteRow) -> Result<Product, DbError> {
    Ok(Product {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        price: row.try_get("price")?,
        created_at: row.try_get("created_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_db() -> Database {
        Database::new("sqlite::memory:", 1).await.unwrap()
    }

    fn input(name: &str, price: f64) -> ProductInput {
        ProductInput::new(name, &format!("{name} description"), price)
    }

    #[tokio::test]
    async fn test_product_crud() {
        let db = test_db().await;

        // Create
        let created = db.create_product(&input("Widget", 9.5)).await.unwrap();
        assert_eq!(created.len(), 1);
        let p = &created[0];
        assert_eq!(p.name, "Widget");
        assert_eq!(p.description, "Widget description");
        assert_eq!(p.price, 9.5);
        assert!(p.id > 0);

        // List
        let products = db.list_products().await.unwrap();
        assert_eq!(products, created);

        // Get
        let fetched = db.get_product(&p.id.to_string()).await.unwrap();
        assert_eq!(fetched, created);

        // Update
        let updated = db
            .update_product(&p.id.to_string(), &input("Gadget", 12.25))
            .await
            .unwrap();
        assert_eq!(updated.len(), 1);
        assert_eq!(updated[0].id, p.id);
        assert_eq!(updated[0].name, "Gadget");
        assert_eq!(updated[0].price, 12.25);
        assert_eq!(updated[0].created_at, p.created_at);

        // Delete
        let deleted = db.delete_product(&p.id.to_string()).await.unwrap();
        assert_eq!(deleted, updated);
        assert!(db.get_product(&p.id.to_string()).await.unwrap().is_empty());
        assert!(db.list_products().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_ids_are_unique() {
        let db = test_db().await;
        let a = db.create_product(&input("A", 1.0)).await.unwrap();
        let b = db.create_product(&input("B", 2.0)).await.unwrap();
        assert_ne!(a[0].id, b[0].id);
    }

    #[tokio::test]
    async fn test_missing_ids_yield_empty() {
        let db = test_db().await;
        assert!(db.get_product("9999").await.unwrap().is_empty());
        assert!(
            db.update_product("9999", &input("X", 1.0))
                .await
                .unwrap()
                .is_empty()
        );
        assert!(db.delete_product("9999").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_non_integer_id_is_invalid_argument() {
        let db = test_db().await;
        for raw in ["null", "abc", "1.5", "", " 1"] {
            assert!(matches!(
                db.get_product(raw).await,
                Err(DbError::InvalidArgument(_))
            ));
        }
        assert!(matches!(
            db.update_product("x", &input("X", 1.0)).await,
            Err(DbError::InvalidArgument(_))
        ));
        assert!(matches!(
            db.delete_product("x").await,
            Err(DbError::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn test_duplicate_name_is_constraint_violation() {
        let db = test_db().await;
        let first = db.create_product(&input("Dup", 1.0)).await.unwrap();
        let second = db.create_product(&input("Dup", 2.0)).await;
        assert!(matches!(second, Err(DbError::ConstraintViolation(_))));

        let still_there = db.get_product(&first[0].id.to_string()).await.unwrap();
        assert_eq!(still_there, first);
    }

    #[tokio::test]
    async fn test_missing_field_is_constraint_violation() {
        let db = test_db().await;
        let no_price = ProductInput {
            price: None,
            ..input("test product", 0.0)
        };
        let result = db.create_product(&no_price).await;
        assert!(matches!(result, Err(DbError::ConstraintViolation(_))));
        assert!(db.list_products().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_keeps_absent_fields() {
        let db = test_db().await;
        let p = db.create_product(&input("Lamp", 40.0)).await.unwrap();
        let partial = ProductInput {
            price: Some(Some(35.0)),
            ..ProductInput::default()
        };
        let updated = db
            .update_product(&p[0].id.to_string(), &partial)
            .await
            .unwrap();
        assert_eq!(updated[0].name, "Lamp");
        assert_eq!(updated[0].description, "Lamp description");
        assert_eq!(updated[0].price, 35.0);
    }

    #[tokio::test]
    async fn test_update_to_duplicate_name_fails() {
        let db = test_db().await;
        db.create_product(&input("One", 1.0)).await.unwrap();
        let two = db.create_product(&input("Two", 2.0)).await.unwrap();
        let result = db
            .update_product(&two[0].id.to_string(), &input("One", 3.0))
            .await;
        assert!(matches!(result, Err(DbError::ConstraintViolation(_))));
    }

    #[tokio::test]
    async fn test_update_with_null_field_is_constraint_violation() {
        let db = test_db().await;
        let p = db.create_product(&input("Chair", 15.0)).await.unwrap();
        let null_name = ProductInput {
            name: Some(None),
            ..input("ignored", 2.0)
        };
        let result = db.update_product(&p[0].id.to_string(), &null_name).await;
        assert!(matches!(result, Err(DbError::ConstraintViolation(_))));

        let unchanged = db.get_product(&p[0].id.to_string()).await.unwrap();
        assert_eq!(unchanged, p);
    }

    #[tokio::test]
    async fn test_empty_update_is_invalid_argument() {
        let db = test_db().await;
        let p = db.create_product(&input("Desk", 80.0)).await.unwrap();
        let result = db
            .update_product(&p[0].id.to_string(), &ProductInput::default())
            .await;
        assert!(matches!(result, Err(DbError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn test_seed_replaces_contents() {
        let db = test_db().await;
        db.create_product(&input("Stale", 1.0)).await.unwrap();
        db.seed().await.unwrap();

        let products = db.list_products().await.unwrap();
        assert_eq!(products.len(), SEED_PRODUCTS.len());
        for (product, (name, description, price)) in products.iter().zip(SEED_PRODUCTS) {
            assert_eq!(product.name, *name);
            assert_eq!(product.description, *description);
            assert_eq!(product.price, *price);
        }
        assert!(products[0].description.ends_with("Et cumque impedit architecto esse vero."));
        assert!(products[2].description.ends_with("Non qui voluptatem."));
    }

    #[tokio::test]
    async fn test_create_then_delete_counts() {
        let db = test_db().await;
        let mut ids = Vec::new();
        for i in 0..5 {
            let p = db.create_product(&input(&format!("P{i}"), i as f64)).await.unwrap();
            ids.push(p[0].id);
        }
        for id in &ids[..2] {
            assert_eq!(db.delete_product(&id.to_string()).await.unwrap().len(), 1);
        }
        assert_eq!(db.list_products().await.unwrap().len(), 3);
    }
}
