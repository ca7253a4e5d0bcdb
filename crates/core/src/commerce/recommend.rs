use std::cmp::Ordering;
use std::collections::HashSet;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::catalog::{Category, Product};
use crate::domain::conversation::CartItem;
use crate::domain::customer::PurchaseRecord;

const FALLBACK_CATALOGUE_SIZE: usize = 10;
const COLLABORATIVE_POOL: usize = 20;
const COMPLEMENTARY_LIMIT: usize = 3;

/// Shopping preferences gleaned from the conversation.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub favorite_categories: Vec<Category>,
    pub max_price: Option<Decimal>,
    pub min_rating: Option<f64>,
    pub keywords: Vec<String>,
}

impl Preferences {
    pub fn is_empty(&self) -> bool {
        self.favorite_categories.is_empty()
            && self.max_price.is_none()
            && self.min_rating.is_none()
            && self.keywords.is_empty()
    }
}

/// A product paired with the reason it was suggested.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    #[serde(flatten)]
    pub product: Product,
    pub recommendation_reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selling_point: Option<String>,
}

/// Applies category, price and rating filters. When nothing survives, the
/// first ten catalogue entries are returned instead.
pub fn filter_products(products: &[Product], preferences: &Preferences) -> Vec<Product> {
    let filtered: Vec<Product> = products
        .iter()
        .filter(|product| {
            preferences.favorite_categories.is_empty()
                || preferences.favorite_categories.contains(&product.category)
        })
        .filter(|product| preferences.max_price.map_or(true, |max| product.price <= max))
        .filter(|product| preferences.min_rating.map_or(true, |min| product.rating >= min))
        .cloned()
        .collect();

    if filtered.is_empty() {
        products.iter().take(FALLBACK_CATALOGUE_SIZE).cloned().collect()
    } else {
        filtered
    }
}

/// Scores unpurchased candidates against the customer's history and returns
/// the best twenty SKUs, highest score first.
pub fn collaborative_scores(past_purchases: &[PurchaseRecord], candidates: &[Product]) -> Vec<String> {
    let purchased_categories: HashSet<Category> =
        past_purchases.iter().map(|purchase| purchase.category).collect();
    let purchased_skus: HashSet<&str> =
        past_purchases.iter().map(|purchase| purchase.sku.as_str()).collect();

    let mut scored: Vec<(&str, u32)> = candidates
        .iter()
        .filter(|product| !purchased_skus.contains(product.sku.as_str()))
        .map(|product| {
            let mut score = 0;
            if purchased_categories.contains(&product.category) {
                score += 3;
            }
            if product.is_featured {
                score += 2;
            }
            if product.rating >= 4.5 {
                score += 2;
            }
            if product.reviews_count > 200 {
                score += 1;
            }
            (product.sku.as_str(), score)
        })
        .collect();

    // stable sort keeps catalogue order among ties
    scored.sort_by(|left, right| right.1.cmp(&left.1));
    scored.into_iter().take(COLLABORATIVE_POOL).map(|(sku, _)| sku.to_string()).collect()
}

fn by_rating_then_reviews(left: &Product, right: &Product) -> Ordering {
    right
        .rating
        .partial_cmp(&left.rating)
        .unwrap_or(Ordering::Equal)
        .then_with(|| right.reviews_count.cmp(&left.reviews_count))
}

/// Deterministic ranking used when model ranking is unavailable.
pub fn rank_by_rating(candidates: &[Product], count: usize) -> Vec<Recommendation> {
    let mut ranked = candidates.to_vec();
    ranked.sort_by(by_rating_then_reviews);
    ranked
        .into_iter()
        .take(count)
        .map(|product| Recommendation {
            recommendation_reason: format!("Highly rated with {:.1}⭐", product.rating),
            selling_point: None,
            product,
        })
        .collect()
}

/// Featured items from categories that pair with the cart, top three by rating.
pub fn complementary(cart: &[CartItem], products: &[Product]) -> Vec<Product> {
    let wanted: HashSet<Category> = cart
        .iter()
        .filter_map(|item| item.category)
        .flat_map(|category| category.complements().iter().copied())
        .collect();
    if wanted.is_empty() {
        return Vec::new();
    }

    let mut matches: Vec<Product> = products
        .iter()
        .filter(|product| product.is_featured && wanted.contains(&product.category))
        .cloned()
        .collect();
    matches.sort_by(|left, right| right.rating.partial_cmp(&left.rating).unwrap_or(Ordering::Equal));
    matches.truncate(COMPLEMENTARY_LIMIT);
    matches
}

/// Most-reviewed products, rating as the tie-breaker.
pub fn trending(products: &[Product], category: Option<Category>, count: usize) -> Vec<Product> {
    let mut pool: Vec<Product> = products
        .iter()
        .filter(|product| category.map_or(true, |category| product.category == category))
        .cloned()
        .collect();
    pool.sort_by(|left, right| {
        right
            .reviews_count
            .cmp(&left.reviews_count)
            .then_with(|| right.rating.partial_cmp(&left.rating).unwrap_or(Ordering::Equal))
    });
    pool.truncate(count);
    pool
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use super::{
        collaborative_scores, complementary, filter_products, rank_by_rating, trending,
        Preferences,
    };
    use crate::domain::catalog::{Category, Product};
    use crate::domain::conversation::CartItem;
    use crate::domain::customer::{CustomerId, PurchaseRecord};

    fn product(sku: &str, category: Category, price: i64, rating: f64, reviews: u32) -> Product {
        Product {
            sku: sku.to_string(),
            name: format!("Product {sku}"),
            category,
            brand: "Brand".to_string(),
            description: String::new(),
            price: Decimal::new(price, 0),
            original_price: None,
            discount_percentage: None,
            rating,
            reviews_count: reviews,
            is_featured: false,
            is_available: true,
            tags: Vec::new(),
            image_url: String::new(),
        }
    }

    fn catalogue() -> Vec<Product> {
        let mut featured_watch = product("ACC1080", Category::Accessories, 2_999, 4.8, 120);
        featured_watch.is_featured = true;
        let mut featured_belt = product("ACC1081", Category::Accessories, 999, 4.1, 40);
        featured_belt.is_featured = true;
        vec![
            product("FOO1000", Category::Footwear, 4_999, 4.6, 250),
            product("FOO1001", Category::Footwear, 8_999, 3.9, 80),
            product("CLO1025", Category::Clothing, 1_499, 4.2, 310),
            product("ELE1069", Category::Electronics, 24_999, 4.7, 480),
            featured_watch,
            featured_belt,
        ]
    }

    #[test]
    fn filter_applies_every_preference() {
        let preferences = Preferences {
            favorite_categories: vec![Category::Footwear],
            max_price: Some(Decimal::new(5_000, 0)),
            min_rating: Some(4.0),
            keywords: Vec::new(),
        };
        let skus: Vec<String> =
            filter_products(&catalogue(), &preferences).into_iter().map(|p| p.sku).collect();
        assert_eq!(skus, vec!["FOO1000".to_string()]);
    }

    #[test]
    fn filter_falls_back_to_catalogue_head() {
        let preferences =
            Preferences { max_price: Some(Decimal::new(10, 0)), ..Preferences::default() };
        assert_eq!(filter_products(&catalogue(), &preferences).len(), catalogue().len());
    }

    #[test]
    fn collaborative_scoring_skips_purchased_and_favours_history() {
        let history = vec![PurchaseRecord {
            customer_id: CustomerId("CUST1000".to_string()),
            order_id: "ORD1".to_string(),
            sku: "FOO1001".to_string(),
            product_name: "Old shoes".to_string(),
            category: Category::Footwear,
            brand: "Brand".to_string(),
            quantity: 1,
            price: Decimal::new(8_999, 0),
            order_date: Utc::now(),
        }];

        let skus = collaborative_scores(&history, &catalogue());
        assert!(!skus.contains(&"FOO1001".to_string()));
        // same category (3) + rating (2) + reviews (1)
        assert_eq!(skus.first().map(String::as_str), Some("FOO1000"));
    }

    #[test]
    fn rating_fallback_orders_by_rating() {
        let ranked = rank_by_rating(&catalogue(), 2);
        assert_eq!(ranked[0].product.sku, "ACC1080");
        assert_eq!(ranked[0].recommendation_reason, "Highly rated with 4.8⭐");
        assert_eq!(ranked[1].product.sku, "ELE1069");
    }

    #[test]
    fn complementary_uses_featured_pairings() {
        let cart = vec![CartItem {
            sku: "FOO1000".to_string(),
            name: "Shoes".to_string(),
            price: Decimal::new(4_999, 0),
            quantity: 1,
            category: Some(Category::Footwear),
        }];
        let skus: Vec<String> =
            complementary(&cart, &catalogue()).into_iter().map(|p| p.sku).collect();
        assert_eq!(skus, vec!["ACC1080".to_string(), "ACC1081".to_string()]);
        assert!(complementary(&[], &catalogue()).is_empty());
    }

    #[test]
    fn trending_sorts_by_reviews() {
        let top = trending(&catalogue(), None, 2);
        assert_eq!(top[0].sku, "ELE1069");
        assert_eq!(top[1].sku, "CLO1025");
        assert_eq!(trending(&catalogue(), Some(Category::Footwear), 5).len(), 2);
    }
}
