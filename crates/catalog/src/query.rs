//! List query model: filtering, ordering and page-number pagination.

use core::cmp::Ordering;
use core::str::FromStr;

use prodreview_core::{Entity, ProductId};

use crate::product::Product;
use crate::review::Review;

/// One ordering term, e.g. `-rating`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderBy<F> {
    pub field: F,
    pub descending: bool,
}

impl<F> OrderBy<F> {
    pub fn asc(field: F) -> Self {
        Self { field, descending: false }
    }

    pub fn desc(field: F) -> Self {
        Self { field, descending: true }
    }
}

/// Parse a comma-separated `ordering` parameter. Unknown fields are skipped.
pub fn parse_ordering<F: FromStr>(raw: &str) -> Vec<OrderBy<F>> {
    raw.split(',')
        .map(str::trim)
        .filter(|term| !term.is_empty())
        .filter_map(|term| {
            let (descending, name) = match term.strip_prefix('-') {
                Some(rest) => (true, rest),
                None => (false, term),
            };
            name.parse::<F>().ok().map(|field| OrderBy { field, descending })
        })
        .collect()
}

/// Sortable product columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductOrderField {
    Id,
    Name,
    Price,
    CreatedAt,
}

impl FromStr for ProductOrderField {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "id" => Ok(Self::Id),
            "name" => Ok(Self::Name),
            "price" => Ok(Self::Price),
            "created_at" => Ok(Self::CreatedAt),
            _ => Err(()),
        }
    }
}

/// Sortable review columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewOrderField {
    Id,
    Product,
    Rating,
    Title,
    CreatedAt,
}

impl FromStr for ReviewOrderField {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "id" => Ok(Self::Id),
            "product" => Ok(Self::Product),
            "rating" => Ok(Self::Rating),
            "title" => Ok(Self::Title),
            "created_at" => Ok(Self::CreatedAt),
            _ => Err(()),
        }
    }
}

/// Per-field comparison used by in-memory ordering.
pub trait Orderable<F>: Entity {
    fn compare_by(&self, other: &Self, field: F) -> Ordering;
}

impl Orderable<ProductOrderField> for Product {
    fn compare_by(&self, other: &Self, field: ProductOrderField) -> Ordering {
        match field {
            ProductOrderField::Id => self.id.cmp(&other.id),
            ProductOrderField::Name => self.name.cmp(&other.name),
            ProductOrderField::Price => self.price.cmp(&other.price),
            ProductOrderField::CreatedAt => self.created_at.cmp(&other.created_at),
        }
    }
}

impl Orderable<ReviewOrderField> for Review {
    fn compare_by(&self, other: &Self, field: ReviewOrderField) -> Ordering {
        match field {
            ReviewOrderField::Id => self.id.cmp(&other.id),
            ReviewOrderField::Product => self.product.cmp(&other.product),
            ReviewOrderField::Rating => self.rating.cmp(&other.rating),
            ReviewOrderField::Title => nulls_last(self.title.as_deref(), other.title.as_deref()),
            ReviewOrderField::CreatedAt => self.created_at.cmp(&other.created_at),
        }
    }
}

// Matches SQL semantics: NULL sorts after values ascending, before them descending.
fn nulls_last<T: Ord>(a: Option<T>, b: Option<T>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => a.cmp(&b),
    }
}

/// Stable multi-key sort; ties fall back to ascending id.
pub fn sort_items<T, F>(items: &mut [T], ordering: &[OrderBy<F>])
where
    T: Orderable<F>,
    F: Copy,
{
    items.sort_by(|a, b| {
        ordering
            .iter()
            .map(|term| {
                let ord = a.compare_by(b, term.field);
                if term.descending { ord.reverse() } else { ord }
            })
            .find(|ord| *ord != Ordering::Equal)
            .unwrap_or_else(|| a.id().cmp(&b.id()))
    });
}

/// Product list filters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductQuery {
    /// Case-insensitive substring of the product name.
    pub search: Option<String>,
    pub ordering: Vec<OrderBy<ProductOrderField>>,
}

impl Default for ProductQuery {
    fn default() -> Self {
        Self {
            search: None,
            ordering: vec![OrderBy::desc(ProductOrderField::CreatedAt)],
        }
    }
}

impl ProductQuery {
    pub fn matches(&self, product: &Product) -> bool {
        match &self.search {
            Some(term) => contains_ignore_case(&product.name, term),
            None => true,
        }
    }
}

/// Review list filters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewQuery {
    /// Case-insensitive substring of the product name or the author's username.
    pub search: Option<String>,
    pub product: Option<ProductId>,
    pub ordering: Vec<OrderBy<ReviewOrderField>>,
}

impl Default for ReviewQuery {
    fn default() -> Self {
        Self {
            search: None,
            product: None,
            ordering: vec![OrderBy::desc(ReviewOrderField::CreatedAt)],
        }
    }
}

impl ReviewQuery {
    /// `product_name` is the name of the reviewed product, when known.
    pub fn matches(&self, review: &Review, product_name: Option<&str>) -> bool {
        if let Some(product) = self.product {
            if review.product != product {
                return false;
            }
        }
        match &self.search {
            Some(term) => {
                contains_ignore_case(&review.username, term)
                    || product_name.is_some_and(|name| contains_ignore_case(name, term))
            }
            None => true,
        }
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Offset/limit slice handed to the stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub offset: usize,
    pub limit: usize,
}

impl Window {
    /// Slice an already-ordered list.
    pub fn apply<T>(&self, items: Vec<T>) -> Vec<T> {
        items.into_iter().skip(self.offset).take(self.limit).collect()
    }
}

/// Requested page, before the total count is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageSelector {
    Number(usize),
    Last,
}

impl FromStr for PageSelector {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s == "last" {
            return Ok(Self::Last);
        }
        match s.parse::<usize>() {
            Ok(n) if n >= 1 => Ok(Self::Number(n)),
            _ => Err(()),
        }
    }
}

/// A page request resolved against the page-size settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: PageSelector,
    pub page_size: usize,
}

impl PageRequest {
    /// Number of pages for `count` items; an empty collection still has one (empty) page.
    pub fn num_pages(&self, count: usize) -> usize {
        count.div_ceil(self.page_size).max(1)
    }

    /// Resolve to a concrete 1-based page number, or `None` when out of range.
    pub fn resolve(&self, count: usize) -> Option<usize> {
        let num_pages = self.num_pages(count);
        match self.page {
            PageSelector::Last => Some(num_pages),
            PageSelector::Number(n) if n <= num_pages => Some(n),
            PageSelector::Number(_) => None,
        }
    }

    pub fn window(&self, page: usize) -> Window {
        Window {
            offset: (page - 1) * self.page_size,
            limit: self.page_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::WriteMode;
    use crate::review::ReviewInput;
    use chrono::{Duration, Utc};
    use prodreview_core::UserId;
    use serde_json::json;

    fn review(rating: i64, title: Option<&str>, minutes_ago: i64) -> Review {
        let input: ReviewInput = serde_json::from_value(json!({
            "product": ProductId::new().to_string(),
            "rating": rating,
            "title": title,
        }))
        .unwrap();
        let changes = input.validate(WriteMode::Create).unwrap();
        Review::create(changes, UserId::new(), "u", Utc::now() - Duration::minutes(minutes_ago)).unwrap()
    }

    #[test]
    fn parses_descending_and_skips_unknown_fields() {
        let ordering: Vec<OrderBy<ReviewOrderField>> = parse_ordering("-rating, password,created_at,");
        assert_eq!(
            ordering,
            vec![
                OrderBy::desc(ReviewOrderField::Rating),
                OrderBy::asc(ReviewOrderField::CreatedAt),
            ]
        );
    }

    #[test]
    fn sorts_descending_by_rating_then_by_secondary_key() {
        let mut items = vec![review(3, None, 1), review(5, None, 2), review(5, None, 3), review(1, None, 4)];
        sort_items(
            &mut items,
            &[OrderBy::desc(ReviewOrderField::Rating), OrderBy::asc(ReviewOrderField::CreatedAt)],
        );

        let ratings: Vec<u8> = items.iter().map(|r| r.rating.value()).collect();
        assert_eq!(ratings, vec![5, 5, 3, 1]);
        assert!(items[0].created_at < items[1].created_at);
    }

    #[test]
    fn missing_titles_sort_last_ascending() {
        let mut items = vec![review(1, None, 0), review(1, Some("b"), 0), review(1, Some("a"), 0)];
        sort_items(&mut items, &[OrderBy::asc(ReviewOrderField::Title)]);

        let titles: Vec<Option<&str>> = items.iter().map(|r| r.title.as_deref()).collect();
        assert_eq!(titles, vec![Some("a"), Some("b"), None]);
    }

    #[test]
    fn search_matches_username_or_product_name() {
        let r = review(4, None, 0);
        let query = ReviewQuery {
            search: Some("STY".to_string()),
            ..ReviewQuery::default()
        };
        assert!(query.matches(&r, Some("Stylo")));
        assert!(!query.matches(&r, Some("Cahier")));

        let by_user = ReviewQuery {
            search: Some("U".to_string()),
            ..ReviewQuery::default()
        };
        assert!(by_user.matches(&r, None));
    }

    #[test]
    fn product_filter_excludes_other_products() {
        let r = review(4, None, 0);
        let query = ReviewQuery {
            product: Some(ProductId::new()),
            ..ReviewQuery::default()
        };
        assert!(!query.matches(&r, None));
    }

    #[test]
    fn page_selector_parsing() {
        assert_eq!("2".parse::<PageSelector>(), Ok(PageSelector::Number(2)));
        assert_eq!("last".parse::<PageSelector>(), Ok(PageSelector::Last));
        assert!("0".parse::<PageSelector>().is_err());
        assert!("-1".parse::<PageSelector>().is_err());
        assert!("two".parse::<PageSelector>().is_err());
    }

    #[test]
    fn resolve_rejects_pages_past_the_end() {
        let req = PageRequest { page: PageSelector::Number(4), page_size: 5 };
        assert_eq!(req.resolve(15), None);
        assert_eq!(req.resolve(16), Some(4));

        let first = PageRequest { page: PageSelector::Number(1), page_size: 5 };
        assert_eq!(first.resolve(0), Some(1));

        let last = PageRequest { page: PageSelector::Last, page_size: 5 };
        assert_eq!(last.resolve(11), Some(3));
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: walking every page yields each item exactly once, in order.
            #[test]
            fn pages_partition_the_collection(count in 0usize..200, page_size in 1usize..30) {
                let items: Vec<usize> = (0..count).collect();
                let req = PageRequest { page: PageSelector::Last, page_size };
                let mut seen = Vec::new();
                for page in 1..=req.num_pages(count) {
                    let chunk = req.window(page).apply(items.clone());
                    prop_assert!(chunk.len() <= page_size);
                    seen.extend(chunk);
                }
                prop_assert_eq!(seen, items);
            }
        }
    }
}
