//! Postgres-backed catalog store.
//!
//! Schema lives in `migrations/0001_init.sql`. Review uniqueness per
//! (product, user) is a table constraint, so concurrent duplicates surface
//! as `StoreError::Conflict` from the insert itself.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use uuid::Uuid;

use prodreview_catalog::{
    OrderBy, Price, Product, ProductOrderField, ProductQuery, Rating, Review, ReviewOrderField, ReviewQuery,
    Window,
};
use prodreview_core::{ProductId, ReviewId, UserId};

use super::{DUPLICATE_REVIEW, ProductStore, ReviewStore, StoreError, StoreResult};

const SCHEMA: &str = include_str!("../../migrations/0001_init.sql");

const PRODUCT_COLUMNS: &str = "p.id, p.name, p.price, p.owner_id, p.created_at";
const REVIEW_COLUMNS: &str = "r.id, r.product_id, r.user_id, r.username, r.rating, r.title, r.comment, r.created_at";

#[derive(Debug, Clone)]
pub struct PostgresCatalogStore {
    pool: PgPool,
}

impl PostgresCatalogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a connection pool against `database_url`.
    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create tables and indexes if they do not exist yet.
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
        tracing::info!("catalog schema ready");
        Ok(())
    }
}

#[async_trait]
impl ProductStore for PostgresCatalogStore {
    async fn insert_product(&self, product: Product) -> StoreResult<Product> {
        sqlx::query(
            r#"
            INSERT INTO products (id, name, price, owner_id, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(*product.id.as_uuid())
        .bind(&product.name)
        .bind(product.price.amount())
        .bind(product.owner.map(Uuid::from))
        .bind(product.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_product", e))?;
        Ok(product)
    }

    async fn get_product(&self, id: ProductId) -> StoreResult<Option<Product>> {
        let row = sqlx::query(&format!("SELECT {PRODUCT_COLUMNS} FROM products p WHERE p.id = $1"))
            .bind(*id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_product", e))?;
        row.as_ref().map(product_from_row).transpose()
    }

    async fn update_product(&self, product: Product) -> StoreResult<Product> {
        let result = sqlx::query("UPDATE products SET name = $2, price = $3 WHERE id = $1")
            .bind(*product.id.as_uuid())
            .bind(&product.name)
            .bind(product.price.amount())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("update_product", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(product)
    }

    async fn delete_product(&self, id: ProductId) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(*id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_product", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_products(&self, query: &ProductQuery) -> StoreResult<usize> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM products p");
        push_product_filters(&mut qb, query);
        let count: i64 = qb
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_products", e))?;
        Ok(count as usize)
    }

    async fn list_products(&self, query: &ProductQuery, window: Window) -> StoreResult<Vec<Product>> {
        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {PRODUCT_COLUMNS} FROM products p"));
        push_product_filters(&mut qb, query);
        push_order_by(&mut qb, &query.ordering, product_column, "p.id");
        push_window(&mut qb, window);

        let rows = qb
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_products", e))?;
        rows.iter().map(product_from_row).collect()
    }
}

#[async_trait]
impl ReviewStore for PostgresCatalogStore {
    async fn insert_review(&self, review: Review) -> StoreResult<Review> {
        sqlx::query(
            r#"
            INSERT INTO reviews (id, product_id, user_id, username, rating, title, comment, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(*review.id.as_uuid())
        .bind(*review.product.as_uuid())
        .bind(*review.user.as_uuid())
        .bind(&review.username)
        .bind(i16::from(review.rating.value()))
        .bind(&review.title)
        .bind(&review.comment)
        .bind(review.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_review", e))?;
        Ok(review)
    }

    async fn get_review(&self, id: ReviewId) -> StoreResult<Option<Review>> {
        let row = sqlx::query(&format!("SELECT {REVIEW_COLUMNS} FROM reviews r WHERE r.id = $1"))
            .bind(*id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_review", e))?;
        row.as_ref().map(review_from_row).transpose()
    }

    async fn update_review(&self, review: Review) -> StoreResult<Review> {
        let result = sqlx::query(
            r#"
            UPDATE reviews
            SET product_id = $2, rating = $3, title = $4, comment = $5
            WHERE id = $1
            "#,
        )
        .bind(*review.id.as_uuid())
        .bind(*review.product.as_uuid())
        .bind(i16::from(review.rating.value()))
        .bind(&review.title)
        .bind(&review.comment)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_review", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(review)
    }

    async fn delete_review(&self, id: ReviewId) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM reviews WHERE id = $1")
            .bind(*id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_review", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn review_exists(
        &self,
        product: ProductId,
        user: UserId,
        except: Option<ReviewId>,
    ) -> StoreResult<bool> {
        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM reviews
                WHERE product_id = $1 AND user_id = $2 AND ($3::uuid IS NULL OR id <> $3)
            )
            "#,
        )
        .bind(*product.as_uuid())
        .bind(*user.as_uuid())
        .bind(except.map(Uuid::from))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("review_exists", e))
    }

    async fn count_reviews(&self, query: &ReviewQuery) -> StoreResult<usize> {
        let mut qb = QueryBuilder::<Postgres>::new(
            "SELECT COUNT(*) FROM reviews r JOIN products p ON p.id = r.product_id",
        );
        push_review_filters(&mut qb, query);
        let count: i64 = qb
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_reviews", e))?;
        Ok(count as usize)
    }

    async fn list_reviews(&self, query: &ReviewQuery, window: Window) -> StoreResult<Vec<Review>> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews r JOIN products p ON p.id = r.product_id"
        ));
        push_review_filters(&mut qb, query);
        push_order_by(&mut qb, &query.ordering, review_column, "r.id");
        push_window(&mut qb, window);

        let rows = qb
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_reviews", e))?;
        rows.iter().map(review_from_row).collect()
    }
}

fn push_product_filters(qb: &mut QueryBuilder<'_, Postgres>, query: &ProductQuery) {
    if let Some(term) = &query.search {
        qb.push(" WHERE p.name ILIKE ").push_bind(like_pattern(term));
    }
}

fn push_review_filters(qb: &mut QueryBuilder<'_, Postgres>, query: &ReviewQuery) {
    qb.push(" WHERE TRUE");
    if let Some(product) = query.product {
        qb.push(" AND r.product_id = ").push_bind(*product.as_uuid());
    }
    if let Some(term) = &query.search {
        let pattern = like_pattern(term);
        qb.push(" AND (p.name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR r.username ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

fn push_order_by<F: Copy>(
    qb: &mut QueryBuilder<'_, Postgres>,
    ordering: &[OrderBy<F>],
    column: fn(F) -> &'static str,
    tie_break: &'static str,
) {
    qb.push(" ORDER BY ");
    for term in ordering {
        qb.push(column(term.field))
            .push(if term.descending { " DESC, " } else { " ASC, " });
    }
    qb.push(tie_break).push(" ASC");
}

fn push_window(qb: &mut QueryBuilder<'_, Postgres>, window: Window) {
    let limit = i64::try_from(window.limit).unwrap_or(i64::MAX);
    let offset = i64::try_from(window.offset).unwrap_or(i64::MAX);
    qb.push(" LIMIT ").push_bind(limit).push(" OFFSET ").push_bind(offset);
}

fn product_column(field: ProductOrderField) -> &'static str {
    match field {
        ProductOrderField::Id => "p.id",
        ProductOrderField::Name => "p.name",
        ProductOrderField::Price => "p.price",
        ProductOrderField::CreatedAt => "p.created_at",
    }
}

fn review_column(field: ReviewOrderField) -> &'static str {
    match field {
        ReviewOrderField::Id => "r.id",
        ReviewOrderField::Product => "r.product_id",
        ReviewOrderField::Rating => "r.rating",
        ReviewOrderField::Title => "r.title",
        ReviewOrderField::CreatedAt => "r.created_at",
    }
}

/// Case-insensitive substring pattern with LIKE wildcards escaped.
fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

fn product_from_row(row: &PgRow) -> StoreResult<Product> {
    let decode = |e: sqlx::Error| StoreError::Storage(format!("decode product: {e}"));
    let price: Decimal = row.try_get("price").map_err(decode)?;
    Ok(Product {
        id: ProductId::from_uuid(row.try_get("id").map_err(decode)?),
        name: row.try_get("name").map_err(decode)?,
        price: Price::new(price).map_err(StoreError::Storage)?,
        owner: row.try_get::<Option<Uuid>, _>("owner_id").map_err(decode)?.map(UserId::from_uuid),
        created_at: row.try_get::<DateTime<Utc>, _>("created_at").map_err(decode)?,
    })
}

fn review_from_row(row: &PgRow) -> StoreResult<Review> {
    let decode = |e: sqlx::Error| StoreError::Storage(format!("decode review: {e}"));
    let rating: i16 = row.try_get("rating").map_err(decode)?;
    Ok(Review {
        id: ReviewId::from_uuid(row.try_get("id").map_err(decode)?),
        product: ProductId::from_uuid(row.try_get("product_id").map_err(decode)?),
        user: UserId::from_uuid(row.try_get("user_id").map_err(decode)?),
        username: row.try_get("username").map_err(decode)?,
        rating: Rating::new(i64::from(rating)).map_err(StoreError::Storage)?,
        title: row.try_get("title").map_err(decode)?,
        comment: row.try_get("comment").map_err(decode)?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at").map_err(decode)?,
    })
}

/// Unique constraint backing one review per user per product.
const REVIEW_UNIQUE_CONSTRAINT: &str = "reviews_product_user_key";

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            let mapped = classify_database_error(db_err.code().as_deref(), db_err.constraint(), msg);
            if let StoreError::Storage(msg) = &mapped {
                tracing::error!(operation, error = %msg, "catalog store failure");
            }
            mapped
        }
        sqlx::Error::RowNotFound => StoreError::NotFound,
        other => {
            tracing::error!(operation, error = %other, "catalog store failure");
            StoreError::Storage(format!("database error in {operation}: {other}"))
        }
    }
}

/// Map a Postgres SQLSTATE (and violated constraint, if any) to a store error.
fn classify_database_error(code: Option<&str>, constraint: Option<&str>, msg: String) -> StoreError {
    match code {
        // Unique violation
        Some("23505") if constraint == Some(REVIEW_UNIQUE_CONSTRAINT) => {
            StoreError::Conflict(DUPLICATE_REVIEW.to_string())
        }
        Some("23505") => StoreError::Conflict(msg),
        // Foreign key violation: the referenced product is gone.
        Some("23503") => StoreError::NotFound,
        _ => StoreError::Storage(msg),
    }
}
