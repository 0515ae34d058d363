use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use prodreview_catalog::{Product, ProductQuery, Review, ReviewQuery, Window, sort_items};
use prodreview_core::{ProductId, ReviewId, UserId};

use super::{DUPLICATE_REVIEW, ProductStore, ReviewStore, StoreError, StoreResult};

#[derive(Debug, Default)]
struct CatalogState {
    products: HashMap<ProductId, Product>,
    reviews: HashMap<ReviewId, Review>,
}

impl CatalogState {
    fn duplicate_of(&self, review: &Review) -> bool {
        self.reviews
            .values()
            .any(|r| r.id != review.id && r.product == review.product && r.user == review.user)
    }
}

/// In-memory catalog store.
///
/// Intended for tests/dev. Products and reviews share one lock so the
/// review uniqueness check and the insert happen atomically.
#[derive(Debug, Default)]
pub struct InMemoryCatalogStore {
    state: RwLock<CatalogState>,
}

impl InMemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<std::sync::RwLockReadGuard<'_, CatalogState>> {
        self.state
            .read()
            .map_err(|_| StoreError::Storage("lock poisoned".to_string()))
    }

    fn write(&self) -> StoreResult<std::sync::RwLockWriteGuard<'_, CatalogState>> {
        self.state
            .write()
            .map_err(|_| StoreError::Storage("lock poisoned".to_string()))
    }

    fn filtered_reviews(&self, query: &ReviewQuery) -> StoreResult<Vec<Review>> {
        let state = self.read()?;
        Ok(state
            .reviews
            .values()
            .filter(|r| {
                let product_name = state.products.get(&r.product).map(|p| p.name.as_str());
                query.matches(r, product_name)
            })
            .cloned()
            .collect())
    }

    fn filtered_products(&self, query: &ProductQuery) -> StoreResult<Vec<Product>> {
        let state = self.read()?;
        Ok(state.products.values().filter(|p| query.matches(p)).cloned().collect())
    }
}

#[async_trait]
impl ProductStore for InMemoryCatalogStore {
    async fn insert_product(&self, product: Product) -> StoreResult<Product> {
        let mut state = self.write()?;
        if state.products.contains_key(&product.id) {
            return Err(StoreError::Conflict(format!("product {} already exists", product.id)));
        }
        state.products.insert(product.id, product.clone());
        Ok(product)
    }

    async fn get_product(&self, id: ProductId) -> StoreResult<Option<Product>> {
        Ok(self.read()?.products.get(&id).cloned())
    }

    async fn update_product(&self, product: Product) -> StoreResult<Product> {
        let mut state = self.write()?;
        match state.products.get_mut(&product.id) {
            Some(slot) => {
                *slot = product.clone();
                Ok(product)
            }
            None => Err(StoreError::NotFound),
        }
    }

    async fn delete_product(&self, id: ProductId) -> StoreResult<bool> {
        let mut state = self.write()?;
        if state.products.remove(&id).is_none() {
            return Ok(false);
        }
        state.reviews.retain(|_, r| r.product != id);
        Ok(true)
    }

    async fn count_products(&self, query: &ProductQuery) -> StoreResult<usize> {
        Ok(self.filtered_products(query)?.len())
    }

    async fn list_products(&self, query: &ProductQuery, window: Window) -> StoreResult<Vec<Product>> {
        let mut items = self.filtered_products(query)?;
        sort_items(&mut items, &query.ordering);
        Ok(window.apply(items))
    }
}

#[async_trait]
impl ReviewStore for InMemoryCatalogStore {
    async fn insert_review(&self, review: Review) -> StoreResult<Review> {
        let mut state = self.write()?;
        if !state.products.contains_key(&review.product) {
            return Err(StoreError::NotFound);
        }
        if state.duplicate_of(&review) {
            return Err(StoreError::Conflict(DUPLICATE_REVIEW.to_string()));
        }
        state.reviews.insert(review.id, review.clone());
        Ok(review)
    }

    async fn get_review(&self, id: ReviewId) -> StoreResult<Option<Review>> {
        Ok(self.read()?.reviews.get(&id).cloned())
    }

    async fn update_review(&self, review: Review) -> StoreResult<Review> {
        let mut state = self.write()?;
        if !state.reviews.contains_key(&review.id) || !state.products.contains_key(&review.product) {
            return Err(StoreError::NotFound);
        }
        if state.duplicate_of(&review) {
            return Err(StoreError::Conflict(DUPLICATE_REVIEW.to_string()));
        }
        state.reviews.insert(review.id, review.clone());
        Ok(review)
    }

    async fn delete_review(&self, id: ReviewId) -> StoreResult<bool> {
        Ok(self.write()?.reviews.remove(&id).is_some())
    }

    async fn review_exists(
        &self,
        product: ProductId,
        user: UserId,
        except: Option<ReviewId>,
    ) -> StoreResult<bool> {
        Ok(self
            .read()?
            .reviews
            .values()
            .any(|r| r.product == product && r.user == user && Some(r.id) != except))
    }

    async fn count_reviews(&self, query: &ReviewQuery) -> StoreResult<usize> {
        Ok(self.filtered_reviews(query)?.len())
    }

    async fn list_reviews(&self, query: &ReviewQuery, window: Window) -> StoreResult<Vec<Review>> {
        let mut items = self.filtered_reviews(query)?;
        sort_items(&mut items, &query.ordering);
        Ok(window.apply(items))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use prodreview_catalog::{OrderBy, ProductInput, ReviewInput, ReviewOrderField, WriteMode};
    use serde_json::json;

    fn product(name: &str, owner: Option<UserId>) -> Product {
        let input: ProductInput = serde_json::from_value(json!({ "name": name, "price": "9.99" })).unwrap();
        Product::create(input.validate(WriteMode::Create).unwrap(), owner, Utc::now()).unwrap()
    }

    fn review(product: ProductId, user: UserId, username: &str, rating: i64, minutes_ago: i64) -> Review {
        let input: ReviewInput = serde_json::from_value(json!({
            "product": product.to_string(),
            "rating": rating,
        }))
        .unwrap();
        Review::create(
            input.validate(WriteMode::Create).unwrap(),
            user,
            username,
            Utc::now() - Duration::minutes(minutes_ago),
        )
        .unwrap()
    }

    fn all() -> Window {
        Window { offset: 0, limit: usize::MAX }
    }

    #[tokio::test]
    async fn second_review_for_same_pair_conflicts() {
        let store = InMemoryCatalogStore::new();
        let p = store.insert_product(product("Stylo", None)).await.unwrap();
        let user = UserId::new();

        store.insert_review(review(p.id, user, "alice", 4, 0)).await.unwrap();
        let err = store.insert_review(review(p.id, user, "alice", 2, 0)).await.unwrap_err();

        assert!(matches!(err, StoreError::Conflict(_)));
        assert_eq!(store.count_reviews(&ReviewQuery::default()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn review_of_unknown_product_is_not_found() {
        let store = InMemoryCatalogStore::new();
        let err = store
            .insert_review(review(ProductId::new(), UserId::new(), "bob", 3, 0))
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::NotFound);
    }

    #[tokio::test]
    async fn moving_a_review_onto_an_already_reviewed_product_conflicts() {
        let store = InMemoryCatalogStore::new();
        let a = store.insert_product(product("A", None)).await.unwrap();
        let b = store.insert_product(product("B", None)).await.unwrap();
        let user = UserId::new();

        store.insert_review(review(a.id, user, "alice", 4, 0)).await.unwrap();
        let mut on_b = store.insert_review(review(b.id, user, "alice", 4, 0)).await.unwrap();

        on_b.product = a.id;
        let err = store.update_review(on_b).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn review_exists_ignores_the_excluded_review() {
        let store = InMemoryCatalogStore::new();
        let p = store.insert_product(product("Stylo", None)).await.unwrap();
        let user = UserId::new();
        let r = store.insert_review(review(p.id, user, "alice", 4, 0)).await.unwrap();

        assert!(store.review_exists(p.id, user, None).await.unwrap());
        assert!(!store.review_exists(p.id, user, Some(r.id)).await.unwrap());
        assert!(!store.review_exists(p.id, UserId::new(), None).await.unwrap());
    }

    #[tokio::test]
    async fn deleting_a_product_removes_its_reviews() {
        let store = InMemoryCatalogStore::new();
        let p = store.insert_product(product("Stylo", None)).await.unwrap();
        let r = store.insert_review(review(p.id, UserId::new(), "alice", 5, 0)).await.unwrap();

        assert!(store.delete_product(p.id).await.unwrap());
        assert!(!store.delete_product(p.id).await.unwrap());
        assert_eq!(store.get_review(r.id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn list_reviews_orders_then_windows() {
        let store = InMemoryCatalogStore::new();
        let p = store.insert_product(product("Stylo", None)).await.unwrap();
        for (i, rating) in [3, 5, 1, 4, 2].into_iter().enumerate() {
            store
                .insert_review(review(p.id, UserId::new(), "u", rating, i as i64))
                .await
                .unwrap();
        }

        let query = ReviewQuery {
            ordering: vec![OrderBy::desc(ReviewOrderField::Rating)],
            ..ReviewQuery::default()
        };
        let page = store.list_reviews(&query, Window { offset: 1, limit: 2 }).await.unwrap();
        let ratings: Vec<u8> = page.iter().map(|r| r.rating.value()).collect();
        assert_eq!(ratings, vec![4, 3]);
    }

    #[tokio::test]
    async fn review_search_uses_product_name() {
        let store = InMemoryCatalogStore::new();
        let stylo = store.insert_product(product("Stylo bleu", None)).await.unwrap();
        let cahier = store.insert_product(product("Cahier", None)).await.unwrap();
        store.insert_review(review(stylo.id, UserId::new(), "alice", 5, 0)).await.unwrap();
        store.insert_review(review(cahier.id, UserId::new(), "bob", 5, 0)).await.unwrap();

        let query = ReviewQuery {
            search: Some("stylo".to_string()),
            ..ReviewQuery::default()
        };
        let found = store.list_reviews(&query, all()).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].username, "alice");
    }

    #[tokio::test]
    async fn product_search_and_update() {
        let store = InMemoryCatalogStore::new();
        let mut p = store.insert_product(product("Stylo", None)).await.unwrap();
        store.insert_product(product("Cahier", None)).await.unwrap();

        p.name = "Stylo plume".to_string();
        store.update_product(p.clone()).await.unwrap();

        let query = ProductQuery {
            search: Some("PLUME".to_string()),
            ..ProductQuery::default()
        };
        assert_eq!(store.count_products(&query).await.unwrap(), 1);
        assert_eq!(store.list_products(&query, all()).await.unwrap(), vec![p]);
    }
}
