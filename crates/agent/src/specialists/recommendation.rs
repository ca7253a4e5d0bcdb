use std::collections::HashSet;
use std::sync::Arc;

use rand::seq::SliceRandom;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use shopwise_core::commerce::loyalty::format_inr_whole;
use shopwise_core::commerce::recommend::{
    collaborative_scores, complementary, filter_products, rank_by_rating, trending, Preferences,
    Recommendation,
};
use shopwise_core::domain::catalog::{Category, Product, ProductQuery};
use shopwise_core::domain::conversation::CartItem;
use shopwise_core::domain::customer::{CustomerId, PurchaseRecord};
use shopwise_db::Storage;

use crate::llm::{complete_json, LlmClient, LlmRequest};
use crate::prompts::PromptLibrary;
use crate::tools::{object_schema, tool, ToolError, ToolRegistry};

pub const NAME: &str = "recommendation";

pub const ROLE: &str = "You are a specialist product recommendation assistant.
Your job is to help customers find products they'll love.

When recommending products:
1. ALWAYS use the recommend_products tool with proper parameters
2. Extract categories from the user's message (Footwear, Clothing, Electronics, Accessories)
3. Set reasonable preferences (max_price, min_rating if mentioned)
4. Include the user's context in the context parameter
5. Present the results in a friendly, conversational way with product names, prices, and why they're great

NEVER just say you'll help: ALWAYS call the tool and show actual products.

Be friendly, enthusiastic, and helpful!";

const RANKING_SYSTEM: &str =
    "You are a helpful product recommendation assistant that always returns valid JSON.";
const RANKING_CANDIDATES: usize = 10;
const PAST_PURCHASE_SUMMARY: usize = 5;

pub struct RecommendationTools {
    storage: Storage,
    llm: Arc<dyn LlmClient>,
    prompts: Arc<PromptLibrary>,
}

/// Preferences as the model sends them. Category names are matched
/// case-insensitively and unknown ones are dropped.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct PreferenceArgs {
    #[serde(alias = "categories")]
    pub favorite_categories: Vec<String>,
    pub max_price: Option<Decimal>,
    pub min_rating: Option<f64>,
    pub keywords: Vec<String>,
}

impl From<PreferenceArgs> for Preferences {
    fn from(args: PreferenceArgs) -> Self {
        Self {
            favorite_categories: args
                .favorite_categories
                .iter()
                .filter_map(|name| name.parse().ok())
                .collect(),
            max_price: args.max_price,
            min_rating: args.min_rating,
            keywords: args.keywords,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RecommendArgs {
    #[serde(default)]
    pub preferences: PreferenceArgs,
    #[serde(default)]
    pub context: String,
    #[serde(default)]
    pub customer_id: Option<String>,
    #[serde(default = "default_count")]
    pub count: usize,
}

fn default_count() -> usize {
    5
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RankedBy {
    Model,
    Rating,
}

#[derive(Debug, Serialize)]
pub struct RecommendReport {
    pub recommendations: Vec<Recommendation>,
    pub ranked_by: RankedBy,
    pub message: String,
}

#[derive(Debug, Deserialize)]
struct RankingReply {
    recommendations: Vec<RankedPick>,
}

#[derive(Debug, Deserialize)]
struct RankedPick {
    sku: String,
    reason: String,
    #[serde(default)]
    selling_point: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CartEntry {
    pub sku: String,
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ComplementaryArgs {
    #[serde(default)]
    pub cart_items: Vec<CartEntry>,
}

#[derive(Debug, Deserialize)]
pub struct TrendingArgs {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default = "default_count")]
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct ProductList {
    pub products: Vec<Product>,
    pub message: String,
}

impl RecommendationTools {
    pub fn new(storage: Storage, llm: Arc<dyn LlmClient>, prompts: Arc<PromptLibrary>) -> Self {
        Self { storage, llm, prompts }
    }

    async fn catalogue(&self) -> Result<Vec<Product>, ToolError> {
        Ok(self.storage.catalog.list_products(&ProductQuery::default()).await?)
    }

    /// Filter, pick candidates (purchase-history scoring for known
    /// customers, a random sample otherwise), then rank with the model.
    pub async fn recommend(&self, args: RecommendArgs) -> Result<RecommendReport, ToolError> {
        let count = args.count.clamp(1, 20);
        let preferences = Preferences::from(args.preferences);
        let catalogue = self.catalogue().await?;
        let filtered = filter_products(&catalogue, &preferences);

        let past_purchases = match args.customer_id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => {
                self.storage.customers.purchase_history(&CustomerId(id.to_string())).await?
            }
            _ => Vec::new(),
        };

        let chosen: HashSet<String> = if past_purchases.is_empty() {
            let mut rng = rand::thread_rng();
            filtered
                .choose_multiple(&mut rng, (count * 2).min(filtered.len()))
                .map(|product| product.sku.clone())
                .collect()
        } else {
            collaborative_scores(&past_purchases, &filtered).into_iter().collect()
        };
        let candidates: Vec<Product> =
            filtered.into_iter().filter(|product| chosen.contains(&product.sku)).collect();

        debug!(
            event_name = "agent.recommendation.candidates",
            candidates = candidates.len(),
            history = past_purchases.len(),
            "recommendation candidates selected"
        );

        let (recommendations, ranked_by) = if candidates.is_empty() {
            (Vec::new(), RankedBy::Rating)
        } else {
            match self.rank(&candidates, &preferences, &args.context, &past_purchases, count).await {
                Some(ranked) => (ranked, RankedBy::Model),
                None => (rank_by_rating(&candidates, count), RankedBy::Rating),
            }
        };

        let message = recommendation_message(&recommendations);
        Ok(RecommendReport { recommendations, ranked_by, message })
    }

    /// Model ranking. `None` when the model fails or picks nothing usable.
    async fn rank(
        &self,
        candidates: &[Product],
        preferences: &Preferences,
        context: &str,
        past_purchases: &[PurchaseRecord],
        count: usize,
    ) -> Option<Vec<Recommendation>> {
        let summary = past_purchases
            .iter()
            .take(PAST_PURCHASE_SUMMARY)
            .map(|purchase| purchase.product_name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let listing: Vec<Value> = candidates
            .iter()
            .take(RANKING_CANDIDATES)
            .map(|product| {
                json!({
                    "sku": product.sku,
                    "name": product.name,
                    "category": product.category,
                    "price": product.price,
                    "rating": product.rating,
                    "tags": product.tags,
                })
            })
            .collect();
        let preferences = serde_json::to_value(preferences).unwrap_or(Value::Null);

        let prompt = match self.prompts.ranking(
            count,
            context,
            &preferences,
            &summary,
            &Value::Array(listing),
        ) {
            Ok(prompt) => prompt,
            Err(error) => {
                warn!(event_name = "agent.recommendation.prompt_failed", error = %error, "ranking prompt failed");
                return None;
            }
        };

        let request = LlmRequest::new(RANKING_SYSTEM).with_user(prompt).json();
        let reply: RankingReply = match complete_json(self.llm.as_ref(), &request).await {
            Ok(reply) => reply,
            Err(error) => {
                warn!(
                    event_name = "agent.recommendation.ranking_failed",
                    error = %error,
                    "model ranking failed, ranking by rating"
                );
                return None;
            }
        };

        let ranked: Vec<Recommendation> = reply
            .recommendations
            .into_iter()
            .filter_map(|pick| {
                let sku = pick.sku.trim().to_ascii_uppercase();
                candidates.iter().find(|product| product.sku == sku).map(|product| Recommendation {
                    product: product.clone(),
                    recommendation_reason: pick.reason,
                    selling_point: pick.selling_point,
                })
            })
            .take(count)
            .collect();

        (!ranked.is_empty()).then_some(ranked)
    }

    pub async fn complementary(&self, args: ComplementaryArgs) -> Result<ProductList, ToolError> {
        let catalogue = self.catalogue().await?;
        let cart: Vec<CartItem> = args
            .cart_items
            .iter()
            .filter_map(|entry| {
                let sku = super::inventory::normalize_sku(&entry.sku);
                if let Some(product) = catalogue.iter().find(|product| product.sku == sku) {
                    return Some(CartItem::from_product(product, 1));
                }
                let category = entry.category.as_deref()?.parse::<Category>().ok()?;
                Some(CartItem {
                    sku,
                    name: String::new(),
                    price: Decimal::ZERO,
                    quantity: 1,
                    category: Some(category),
                })
            })
            .collect();

        let products = complementary(&cart, &catalogue);
        let message = if products.is_empty() {
            "No complementary products found for this cart.".to_string()
        } else {
            product_lines("✨ **Goes well with your cart:**", &products)
        };
        Ok(ProductList { products, message })
    }

    pub async fn trending(&self, args: TrendingArgs) -> Result<ProductList, ToolError> {
        let category = match args.category.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(name) => Some(name.parse::<Category>().map_err(|error| {
                ToolError::InvalidArguments {
                    tool: "get_trending_products".to_string(),
                    message: error.to_string(),
                }
            })?),
        };
        let products = trending(&self.catalogue().await?, category, args.count.clamp(1, 20));
        let heading = match category {
            Some(category) => format!("🔥 **Trending in {category}:**"),
            None => "🔥 **Trending now:**".to_string(),
        };
        Ok(ProductList { message: product_lines(&heading, &products), products })
    }
}

fn product_lines(heading: &str, products: &[Product]) -> String {
    let mut lines = vec![heading.to_string()];
    lines.extend(products.iter().map(|product| {
        format!(
            "- **{}** ({}) {} ⭐ {:.1}",
            product.name,
            product.sku,
            format_inr_whole(product.price),
            product.rating
        )
    }));
    lines.join("\n")
}

fn recommendation_message(recommendations: &[Recommendation]) -> String {
    if recommendations.is_empty() {
        return "I couldn't find products matching that. Could you tell me more about what you're looking for?"
            .to_string();
    }

    let mut lines = vec!["Here are my top picks for you:".to_string()];
    for (index, recommendation) in recommendations.iter().enumerate() {
        let product = &recommendation.product;
        lines.push(format!(
            "\n{}. **{}** ({}) {} ⭐ {:.1}\n   {}",
            index + 1,
            product.name,
            product.sku,
            format_inr_whole(product.price),
            product.rating,
            recommendation.recommendation_reason
        ));
        if let Some(point) = &recommendation.selling_point {
            lines.push(format!("   💡 {point}"));
        }
    }
    lines.join("\n")
}

/// Products from the most recent `recommend_products` output.
pub fn products_from_output(output: &Value) -> Vec<Product> {
    output
        .get("recommendations")
        .cloned()
        .and_then(|value| serde_json::from_value::<Vec<Recommendation>>(value).ok())
        .map(|recommendations| recommendations.into_iter().map(|r| r.product).collect())
        .unwrap_or_default()
}

tool! {
    RecommendProducts on RecommendationTools {
        name: "recommend_products",
        description: "Personalized product recommendations from preferences, conversation context and purchase history.",
        parameters: object_schema(
            &[
                (
                    "preferences",
                    "object",
                    "favorite_categories (list), max_price, min_rating, keywords (list)",
                ),
                ("context", "string", "What the customer said they are looking for"),
                ("customer_id", "string", "Customer ID for purchase history"),
                ("count", "integer", "Number of products (default 5)"),
            ],
            &["preferences", "context"],
        ),
        call: recommend(RecommendArgs),
    }
}

tool! {
    FindComplementary on RecommendationTools {
        name: "find_complementary_products",
        description: "Find products that complement items already in the cart.",
        parameters: object_schema(
            &[("cart_items", "array", "Cart items, each with sku and optionally category")],
            &["cart_items"],
        ),
        call: complementary(ComplementaryArgs),
    }
}

tool! {
    TrendingProducts on RecommendationTools {
        name: "get_trending_products",
        description: "Get trending products, optionally within one category.",
        parameters: object_schema(
            &[
                ("category", "string", "Footwear | Clothing | Electronics | Accessories"),
                ("count", "integer", "Number of products (default 5)"),
            ],
            &[],
        ),
        call: trending(TrendingArgs),
    }
}

pub fn registry(tools: Arc<RecommendationTools>) -> ToolRegistry {
    ToolRegistry::default()
        .with(RecommendProducts(tools.clone()))
        .with(FindComplementary(tools.clone()))
        .with(TrendingProducts(tools))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rust_decimal::Decimal;
    use serde_json::json;

    use super::{
        products_from_output, ComplementaryArgs, CartEntry, PreferenceArgs, RankedBy,
        RecommendArgs, RecommendationTools, TrendingArgs,
    };
    use crate::llm::{OfflineLlmClient, ScriptedLlmClient};
    use crate::prompts::PromptLibrary;
    use shopwise_core::domain::catalog::{Category, Product};
    use shopwise_db::Storage;

    fn product(sku: &str, category: Category, price: i64, rating: f64, featured: bool) -> Product {
        Product {
            sku: sku.to_string(),
            name: format!("Item {sku}"),
            category,
            brand: "Acme".to_string(),
            description: String::new(),
            price: Decimal::new(price, 0),
            original_price: None,
            discount_percentage: None,
            rating,
            reviews_count: (rating * 100.0) as u32,
            is_featured: featured,
            is_available: true,
            tags: vec!["demo".to_string()],
            image_url: String::new(),
        }
    }

    async fn storage() -> Result<Storage, String> {
        let storage = Storage::in_memory();
        for item in [
            product("FOO1000", Category::Footwear, 3_499, 4.2, false),
            product("FOO1001", Category::Footwear, 5_999, 4.7, false),
            product("FOO1002", Category::Footwear, 2_499, 3.8, false),
            product("ACC1075", Category::Accessories, 1_299, 4.5, true),
            product("ELE1050", Category::Electronics, 19_999, 4.4, true),
        ] {
            storage.catalog.save_product(item).await.map_err(|e| e.to_string())?;
        }
        Ok(storage)
    }

    fn footwear() -> RecommendArgs {
        RecommendArgs {
            preferences: PreferenceArgs {
                favorite_categories: vec!["footwear".to_string()],
                ..PreferenceArgs::default()
            },
            context: "running shoes".to_string(),
            customer_id: None,
            count: 2,
        }
    }

    #[tokio::test]
    async fn model_ranking_keeps_known_skus_only() -> Result<(), String> {
        let llm = Arc::new(ScriptedLlmClient::new([r#"{"recommendations": [
            {"sku": "FOO1002", "reason": "Budget friendly", "selling_point": "Light"},
            {"sku": "ELE9999", "reason": "Not a candidate"},
            {"sku": "foo1000", "reason": "Great cushioning"}
        ]}"#]));
        let prompts = Arc::new(PromptLibrary::new().map_err(|e| e.to_string())?);
        let tools = RecommendationTools::new(storage().await?, llm.clone(), prompts);

        let report = tools.recommend(footwear()).await.map_err(|e| e.to_string())?;
        assert_eq!(report.ranked_by, RankedBy::Model);
        let skus: Vec<&str> =
            report.recommendations.iter().map(|r| r.product.sku.as_str()).collect();
        assert_eq!(skus, vec!["FOO1002", "FOO1000"]);
        assert_eq!(report.recommendations[0].selling_point.as_deref(), Some("Light"));

        let requests = llm.requests().await;
        assert!(requests[0].messages[0].content.contains("select the top 2"));
        Ok(())
    }

    #[tokio::test]
    async fn offline_model_falls_back_to_rating() -> Result<(), String> {
        let prompts = Arc::new(PromptLibrary::new().map_err(|e| e.to_string())?);
        let tools = RecommendationTools::new(storage().await?, Arc::new(OfflineLlmClient), prompts);

        let report = tools.recommend(footwear()).await.map_err(|e| e.to_string())?;
        assert_eq!(report.ranked_by, RankedBy::Rating);
        assert_eq!(report.recommendations[0].product.sku, "FOO1001");
        assert!(report.recommendations[0].recommendation_reason.contains("4.7"));

        let output = serde_json::to_value(&report).map_err(|e| e.to_string())?;
        let products = products_from_output(&output);
        assert_eq!(products.len(), 2);
        assert_eq!(products[0].category, Category::Footwear);
        Ok(())
    }

    #[tokio::test]
    async fn complementary_and_trending() -> Result<(), String> {
        let prompts = Arc::new(PromptLibrary::new().map_err(|e| e.to_string())?);
        let tools = RecommendationTools::new(storage().await?, Arc::new(OfflineLlmClient), prompts);

        let paired = tools
            .complementary(ComplementaryArgs {
                cart_items: vec![CartEntry { sku: "foo1000".to_string(), category: None }],
            })
            .await
            .map_err(|e| e.to_string())?;
        let skus: Vec<&str> = paired.products.iter().map(|p| p.sku.as_str()).collect();
        assert_eq!(skus, vec!["ACC1075"]);

        let hot = tools
            .trending(TrendingArgs { category: Some("Footwear".to_string()), count: 1 })
            .await
            .map_err(|e| e.to_string())?;
        assert_eq!(hot.products[0].sku, "FOO1001");

        let bad = tools.trending(TrendingArgs { category: Some("Toys".to_string()), count: 1 }).await;
        assert!(bad.is_err());

        assert!(products_from_output(&json!({ "message": "nothing" })).is_empty());
        Ok(())
    }
}
