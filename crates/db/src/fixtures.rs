//! Deterministic demo data: a catalogue across four categories, stock at
//! every location, a handful of customers with purchase history, and the
//! standing promotions.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;

use shopwise_core::domain::catalog::{Category, Product};
use shopwise_core::domain::customer::{Address, CustomerId, CustomerProfile, PurchaseRecord};
use shopwise_core::domain::inventory::{LocationKind, StockRecord, LOCATIONS};
use shopwise_core::domain::loyalty::{Coupon, DiscountType};

use crate::repositories::RepositoryError;
use crate::storage::Storage;

pub const DEFAULT_SEED: u64 = 42;
pub const PRODUCTS_PER_CATEGORY: usize = 25;
pub const CUSTOMER_COUNT: usize = 15;
const FIRST_SKU_NUMBER: usize = 1000;
const FIRST_CUSTOMER_NUMBER: usize = 1000;
const MAX_SEEDED_ORDERS: u32 = 8;
const DISCOUNT_CHOICES: [u32; 8] = [0, 0, 0, 5, 10, 15, 20, 25];

struct CategorySpec {
    category: Category,
    brands: &'static [&'static str],
    kinds: &'static [&'static str],
    price_range: (i64, i64),
}

const CATEGORY_SPECS: [CategorySpec; 4] = [
    CategorySpec {
        category: Category::Footwear,
        brands: &["Nike", "Adidas", "Puma", "Reebok", "New Balance", "Woodland", "Bata"],
        kinds: &[
            "Running Shoes",
            "Casual Shoes",
            "Sneakers",
            "Formal Shoes",
            "Sports Shoes",
            "Sandals",
        ],
        price_range: (999, 15_999),
    },
    CategorySpec {
        category: Category::Clothing,
        brands: &["Zara", "H&M", "Levi's", "Allen Solly", "Van Heusen", "Peter England", "Wrangler"],
        kinds: &["T-Shirt", "Shirt", "Jeans", "Trousers", "Jacket", "Sweatshirt", "Hoodie"],
        price_range: (499, 7_999),
    },
    CategorySpec {
        category: Category::Electronics,
        brands: &["Apple", "Samsung", "OnePlus", "Xiaomi", "Sony", "JBL", "boAt"],
        kinds: &["Smartphone", "Smartwatch", "Earbuds", "Headphones", "Speaker", "Power Bank"],
        price_range: (999, 99_999),
    },
    CategorySpec {
        category: Category::Accessories,
        brands: &["Fossil", "Tommy Hilfiger", "Ray-Ban", "Titan", "Fastrack", "Skagen"],
        kinds: &["Watch", "Wallet", "Belt", "Sunglasses", "Bag", "Cap", "Tie"],
        price_range: (299, 19_999),
    },
];

const CUSTOMER_NAMES: [&str; CUSTOMER_COUNT] = [
    "Rahul Sharma",
    "Priya Iyer",
    "Arjun Mehta",
    "Sneha Reddy",
    "Vikram Singh",
    "Ananya Gupta",
    "Karthik Nair",
    "Meera Joshi",
    "Rohan Kapoor",
    "Divya Menon",
    "Aditya Rao",
    "Kavya Pillai",
    "Siddharth Bose",
    "Neha Kulkarni",
    "Imran Khan",
];

const CITIES: [(&str, &str, &str); 5] = [
    ("Mumbai", "MH", "4000"),
    ("Delhi", "DL", "1100"),
    ("Bangalore", "KA", "5600"),
    ("Hyderabad", "TS", "5000"),
    ("Chennai", "TN", "6000"),
];

const STREETS: [&str; 6] =
    ["MG Road", "Linking Road", "Park Street", "Residency Road", "Anna Salai", "Jubilee Hills"];

#[derive(Clone, Debug)]
pub struct DemoDataset {
    pub products: Vec<Product>,
    pub stock: Vec<StockRecord>,
    pub customers: Vec<CustomerProfile>,
    pub coupons: Vec<Coupon>,
    pub purchases: Vec<PurchaseRecord>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub products: usize,
    pub stock_records: usize,
    pub customers: usize,
    pub coupons: usize,
    pub purchases: usize,
}

impl DemoDataset {
    /// The standard dataset, anchored at `now`.
    pub fn standard(now: DateTime<Utc>) -> Self {
        Self::generate(DEFAULT_SEED, now)
    }

    pub fn generate(seed: u64, now: DateTime<Utc>) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let products = generate_products(&mut rng);
        let stock = generate_stock(&mut rng, &products);
        let customers = generate_customers(&mut rng, now);
        let purchases = generate_purchases(&mut rng, &customers, &products, now);
        let coupons = standing_coupons(now);
        Self { products, stock, customers, coupons, purchases }
    }

    /// Writes the dataset through the repositories. Rows are upserted, and
    /// purchase history is only written for customers that have none, so
    /// loading twice leaves the store unchanged.
    pub async fn load(&self, storage: &Storage) -> Result<SeedSummary, RepositoryError> {
        let mut summary = SeedSummary::default();

        for product in &self.products {
            storage.catalog.save_product(product.clone()).await?;
            summary.products += 1;
        }
        for record in &self.stock {
            storage.inventory.save_stock(record.clone()).await?;
            summary.stock_records += 1;
        }
        for coupon in &self.coupons {
            storage.coupons.save(coupon.clone()).await?;
            summary.coupons += 1;
        }
        for customer in &self.customers {
            let has_history =
                !storage.customers.purchase_history(&customer.customer_id).await?.is_empty();
            storage.customers.save_profile(customer.clone()).await?;
            summary.customers += 1;
            if has_history {
                continue;
            }
            for purchase in
                self.purchases.iter().filter(|purchase| purchase.customer_id == customer.customer_id)
            {
                storage.customers.record_purchase(purchase.clone()).await?;
                summary.purchases += 1;
            }
        }

        Ok(summary)
    }
}

fn pick<'a, R: Rng>(rng: &mut R, values: &'a [&'a str]) -> &'a str {
    values[rng.gen_range(0..values.len())]
}

fn generate_products<R: Rng>(rng: &mut R) -> Vec<Product> {
    let mut products = Vec::with_capacity(CATEGORY_SPECS.len() * PRODUCTS_PER_CATEGORY);
    let mut sku_number = FIRST_SKU_NUMBER;

    for spec in &CATEGORY_SPECS {
        for _ in 0..PRODUCTS_PER_CATEGORY {
            let brand = pick(rng, spec.brands);
            let kind = pick(rng, spec.kinds);
            let base_price = rng.gen_range(spec.price_range.0..=spec.price_range.1);
            let discount = DISCOUNT_CHOICES[rng.gen_range(0..DISCOUNT_CHOICES.len())];
            let price = (Decimal::from(base_price) * Decimal::from(100 - discount)
                / Decimal::ONE_HUNDRED)
                .round_dp(2);
            let rating = f64::from(rng.gen_range(35_u32..=50)) / 10.0;
            let reviews_count = rng.gen_range(10..=500);

            let mut tags = Vec::new();
            if discount > 0 {
                tags.push("On Sale".to_string());
            }
            if rating >= 4.5 {
                tags.push("Best Seller".to_string());
            }
            if reviews_count > 300 {
                tags.push("Popular".to_string());
            }
            if rng.gen_bool(0.2) {
                tags.push("New Arrival".to_string());
            }

            products.push(Product {
                sku: format!("{}{}", spec.category.sku_prefix(), sku_number),
                name: format!("{brand} {kind}"),
                category: spec.category,
                brand: brand.to_string(),
                description: format!(
                    "Premium quality {} from {brand}. Perfect for everyday use.",
                    kind.to_lowercase()
                ),
                price,
                original_price: (discount > 0).then(|| Decimal::from(base_price)),
                discount_percentage: (discount > 0).then_some(discount),
                rating,
                reviews_count,
                is_featured: rng.gen_bool(0.3),
                is_available: true,
                tags,
                image_url: format!(
                    "https://via.placeholder.com/300x300.png?text={}+{}",
                    brand.replace(' ', "+"),
                    kind.replace(' ', "+")
                ),
            });
            sku_number += 1;
        }
    }

    products
}

fn generate_stock<R: Rng>(rng: &mut R, products: &[Product]) -> Vec<StockRecord> {
    let mut stock = Vec::new();
    for product in products {
        for location in LOCATIONS {
            let (quantity, reserved) = match location.kind {
                LocationKind::Warehouse => {
                    let quantity = rng.gen_range(50..=500);
                    (quantity, rng.gen_range(0..=10))
                }
                LocationKind::Store => {
                    if !rng.gen_bool(0.7) {
                        continue;
                    }
                    let quantity = rng.gen_range(5..=50);
                    (quantity, rng.gen_range(0..=3))
                }
            };
            stock.push(StockRecord {
                sku: product.sku.clone(),
                location_id: location.id.to_string(),
                quantity,
                reserved,
            });
        }
    }
    stock
}

fn generate_customers<R: Rng>(rng: &mut R, now: DateTime<Utc>) -> Vec<CustomerProfile> {
    CUSTOMER_NAMES
        .iter()
        .enumerate()
        .map(|(index, name)| {
            let (city, state, pin_prefix) = CITIES[rng.gen_range(0..CITIES.len())];
            let first = rng.gen_range(0..Category::ALL.len());
            let second = (first + rng.gen_range(1..Category::ALL.len())) % Category::ALL.len();
            let handle = name.to_lowercase().replace(' ', ".");

            CustomerProfile {
                customer_id: CustomerId(format!("CUST{}", FIRST_CUSTOMER_NUMBER + index)),
                name: (*name).to_string(),
                email: format!("{handle}@example.com"),
                phone: format!("+91 9{:09}", rng.gen_range(0..1_000_000_000_u64)),
                loyalty_points: rng.gen_range(0..=20_000),
                total_orders: rng.gen_range(1..=50),
                total_spent: Decimal::from(rng.gen_range(5_000..=200_000_i64)),
                birthday: NaiveDate::from_ymd_opt(
                    rng.gen_range(1970..=2004),
                    rng.gen_range(1..=12),
                    rng.gen_range(1..=28),
                ),
                favorite_categories: vec![Category::ALL[first], Category::ALL[second]],
                address: Some(Address {
                    street: format!("{} {}", rng.gen_range(1..=250), pick(rng, &STREETS)),
                    city: city.to_string(),
                    state: state.to_string(),
                    pincode: format!("{pin_prefix}{:02}", rng.gen_range(1..=99)),
                }),
                created_at: now - Duration::days(rng.gen_range(30..=730)),
            }
        })
        .collect()
}

fn generate_purchases<R: Rng>(
    rng: &mut R,
    customers: &[CustomerProfile],
    products: &[Product],
    now: DateTime<Utc>,
) -> Vec<PurchaseRecord> {
    let mut purchases = Vec::new();
    for customer in customers {
        for _ in 0..customer.total_orders.min(MAX_SEEDED_ORDERS) {
            let order_id = format!("ORD{}", rng.gen_range(10_000..=99_999));
            let order_date = now - Duration::days(rng.gen_range(1..=365));
            let item_count = rng.gen_range(1..=4);
            for _ in 0..item_count {
                let product = &products[rng.gen_range(0..products.len())];
                purchases.push(PurchaseRecord {
                    customer_id: customer.customer_id.clone(),
                    order_id: order_id.clone(),
                    sku: product.sku.clone(),
                    product_name: product.name.clone(),
                    category: product.category,
                    brand: product.brand.clone(),
                    quantity: rng.gen_range(1..=3),
                    price: product.price,
                    order_date,
                });
            }
        }
    }
    purchases
}

fn standing_coupons(now: DateTime<Utc>) -> Vec<Coupon> {
    let coupon = |code: &str,
                  description: &str,
                  discount_type: DiscountType,
                  value: i64,
                  max_discount: i64,
                  min_purchase: i64,
                  from_days: i64,
                  until_days: i64| Coupon {
        code: code.to_string(),
        description: description.to_string(),
        discount_type,
        discount_value: Decimal::from(value),
        max_discount: Some(Decimal::from(max_discount)),
        min_purchase: Decimal::from(min_purchase),
        min_tier_required: 0,
        valid_from: now - Duration::days(from_days),
        valid_until: now + Duration::days(until_days),
        active: true,
    };

    vec![
        coupon(
            "FLAT500",
            "Flat ₹500 off on orders above ₹2000",
            DiscountType::Flat,
            500,
            500,
            2_000,
            10,
            20,
        ),
        coupon("SAVE20", "20% off on Electronics", DiscountType::Percentage, 20, 5_000, 0, 5, 15),
        coupon("FOOT15", "15% off on Footwear", DiscountType::Percentage, 15, 2_000, 0, 7, 23),
        coupon("FIRST100", "₹100 off on first purchase", DiscountType::Flat, 100, 100, 500, 30, 60),
    ]
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use shopwise_core::domain::catalog::{Category, ProductQuery};
    use shopwise_core::domain::customer::CustomerId;

    use super::{DemoDataset, CUSTOMER_COUNT, PRODUCTS_PER_CATEGORY};
    use crate::storage::Storage;

    #[test]
    fn dataset_is_deterministic_for_a_seed() {
        let now = Utc::now();
        let first = DemoDataset::generate(7, now);
        let second = DemoDataset::generate(7, now);
        assert_eq!(first.products, second.products);
        assert_eq!(first.stock, second.stock);
    }

    #[test]
    fn skus_run_sequentially_across_categories() {
        let dataset = DemoDataset::standard(Utc::now());
        assert_eq!(dataset.products.len(), 4 * PRODUCTS_PER_CATEGORY);
        assert_eq!(dataset.products[0].sku, "FOO1000");
        assert_eq!(dataset.products[25].sku, "CLO1025");
        assert_eq!(dataset.products[69].sku, "ELE1069");
        assert_eq!(dataset.products[80].sku, "ACC1080");
        assert_eq!(dataset.products[80].category, Category::Accessories);
    }

    #[test]
    fn every_product_has_warehouse_stock() {
        let dataset = DemoDataset::standard(Utc::now());
        for product in &dataset.products {
            let warehouse = dataset
                .stock
                .iter()
                .find(|record| record.sku == product.sku && record.location_id == "WH_CENTRAL");
            assert!(warehouse.is_some_and(|record| record.quantity >= 50));
        }
    }

    #[test]
    fn customers_have_two_distinct_favourites() {
        let dataset = DemoDataset::standard(Utc::now());
        assert_eq!(dataset.customers.len(), CUSTOMER_COUNT);
        assert_eq!(dataset.customers[0].customer_id.0, "CUST1000");
        for customer in &dataset.customers {
            assert_eq!(customer.favorite_categories.len(), 2);
            assert_ne!(customer.favorite_categories[0], customer.favorite_categories[1]);
        }
    }

    #[tokio::test]
    async fn loading_twice_is_idempotent() -> Result<(), String> {
        let storage = Storage::in_memory();
        let dataset = DemoDataset::standard(Utc::now());

        let first = dataset.load(&storage).await.map_err(|e| e.to_string())?;
        let second = dataset.load(&storage).await.map_err(|e| e.to_string())?;
        assert_eq!(first.purchases, dataset.purchases.len());
        assert_eq!(second.purchases, 0);

        let products = storage
            .catalog
            .list_products(&ProductQuery::default())
            .await
            .map_err(|e| e.to_string())?;
        assert_eq!(products.len(), dataset.products.len());

        let history = storage
            .customers
            .purchase_history(&CustomerId("CUST1000".to_string()))
            .await
            .map_err(|e| e.to_string())?;
        let expected =
            dataset.purchases.iter().filter(|p| p.customer_id.0 == "CUST1000").count();
        assert_eq!(history.len(), expected);
        Ok(())
    }
}
