use std::sync::Arc;

use serde::{Deserialize, Serialize};

use shopwise_core::commerce::loyalty::format_inr_whole;
use shopwise_core::commerce::stock::{
    availability, delivery_estimate_text, nearest_store, Availability, LocationStock,
};
use shopwise_core::domain::catalog::Product;
use shopwise_core::domain::inventory::FulfillmentType;
use shopwise_db::Storage;

use crate::tools::{object_schema, tool, ToolError, ToolRegistry};

pub const NAME: &str = "inventory";

pub const ROLE: &str = "You are a specialist retail inventory and fulfillment assistant.
Your tasks:
- Check stock availability
- Suggest nearest store for pickup
- Provide delivery time estimates
- Return clear markdown with emojis and formatting.
Always use tools where relevant (e.g. for SKUs like 'ELE1069').";

const FULFILLMENT_OPTIONS: [&str; 3] = [
    "🚚 *Ship to Home* (2-5 days)",
    "🛒 *Click & Collect* (Ready within 24h)",
    "🏬 *Buy In Store* (Immediate availability)",
];

pub struct InventoryTools {
    storage: Storage,
}

#[derive(Debug, Deserialize)]
pub struct AvailabilityArgs {
    pub sku: String,
    #[serde(default = "one")]
    pub quantity: u32,
}

fn one() -> u32 {
    1
}

#[derive(Debug, Serialize)]
pub struct AvailabilityReport {
    pub sku: String,
    pub requested_quantity: u32,
    pub can_fulfill: bool,
    pub availability: Availability,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct NearestStoreArgs {
    pub sku: String,
    pub customer_city: String,
}

#[derive(Debug, Serialize)]
pub struct NearestStoreReport {
    pub sku: String,
    pub store: Option<LocationStock>,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct DeliveryArgs {
    #[serde(default)]
    pub fulfillment_type: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DeliveryReport {
    pub fulfillment_type: Option<FulfillmentType>,
    pub estimate: &'static str,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct PriceArgs {
    pub sku: String,
}

#[derive(Debug, Serialize)]
pub struct PriceReport {
    pub sku: String,
    pub found: bool,
    pub product: Option<Product>,
    pub message: String,
}

impl InventoryTools {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    pub async fn check_availability(
        &self,
        args: AvailabilityArgs,
    ) -> Result<AvailabilityReport, ToolError> {
        let sku = normalize_sku(&args.sku);
        let records = self.storage.inventory.stock_for_sku(&sku).await?;
        let availability = availability(&records);
        let requested_quantity = args.quantity.max(1);

        let message = match &availability {
            Availability::Unknown => format!("❌ No product found for SKU `{sku}`."),
            Availability::OutOfStock => {
                format!("⚠️ The product with SKU `{sku}` is currently out of stock.")
            }
            Availability::InStock { total_available, locations } => {
                let mut lines = vec![
                    format!("### 📦 Stock Availability for **{sku}**"),
                    format!("**Total Stock:** {total_available} units\n"),
                    "**Available Locations:**".to_string(),
                ];
                lines.extend(locations.iter().map(|location| {
                    format!(
                        "🏬 **{}**: {} units (📍 {})",
                        location.location_name,
                        location.available,
                        location.city.as_deref().unwrap_or("-")
                    )
                }));
                if *total_available < requested_quantity {
                    lines.push(format!(
                        "\n⚠️ Only {total_available} units available, {requested_quantity} requested."
                    ));
                }
                lines.push("\n**✅ Fulfillment Options:**".to_string());
                lines.extend(FULFILLMENT_OPTIONS.iter().map(|option| format!("- {option}")));
                lines.join("\n")
            }
        };

        Ok(AvailabilityReport {
            can_fulfill: availability.can_fulfill(requested_quantity),
            sku,
            requested_quantity,
            availability,
            message,
        })
    }

    pub async fn nearest_store_with_stock(
        &self,
        args: NearestStoreArgs,
    ) -> Result<NearestStoreReport, ToolError> {
        let sku = normalize_sku(&args.sku);
        let records = self.storage.inventory.stock_for_sku(&sku).await?;
        let store = nearest_store(&records, &args.customer_city);

        let message = match &store {
            Some(store) => format!(
                "✅ {} units of `{sku}` available at **{}** in {}.",
                store.available,
                store.location_name,
                store.city.as_deref().unwrap_or("N/A")
            ),
            None => format!("❌ No stores currently have SKU `{sku}` in stock."),
        };
        Ok(NearestStoreReport { sku, store, message })
    }

    pub async fn estimated_delivery(&self, args: DeliveryArgs) -> Result<DeliveryReport, ToolError> {
        let fulfillment_type =
            args.fulfillment_type.as_deref().and_then(|value| value.parse::<FulfillmentType>().ok());
        let estimate = delivery_estimate_text(fulfillment_type);
        let message = match fulfillment_type {
            Some(FulfillmentType::ShipToHome) => format!("🚚 Delivery in {estimate}."),
            Some(FulfillmentType::ClickAndCollect) => format!("🛒 {estimate}."),
            Some(FulfillmentType::BuyInStore) => format!("🏬 {estimate}."),
            None => format!("Standard delivery within {estimate}."),
        };
        Ok(DeliveryReport { fulfillment_type, estimate, message })
    }

    pub async fn price_for_sku(&self, args: PriceArgs) -> Result<PriceReport, ToolError> {
        let sku = normalize_sku(&args.sku);
        let product = self.storage.catalog.find_product(&sku).await?;
        let message = match &product {
            Some(product) => {
                let mut text = format!(
                    "💰 The price for `{sku}` ({}) is {}.",
                    product.name,
                    format_inr_whole(product.price)
                );
                if let (Some(original), Some(discount)) =
                    (product.original_price, product.discount_percentage)
                {
                    text.push_str(&format!(
                        " Was {}, {discount}% off.",
                        format_inr_whole(original)
                    ));
                }
                text
            }
            None => format!("💰 No pricing info found for SKU `{sku}`."),
        };
        Ok(PriceReport { found: product.is_some(), sku, product, message })
    }

    /// Fixed-width stock table for a product list, one row per SKU with up to
    /// three store cities underneath.
    pub async fn stock_table(&self, label: &str, products: &[Product]) -> Result<String, ToolError> {
        let mut table = format!(
            "📦 **STOCK AVAILABILITY - {}**\n\n```\n{:<30} | {:<10} | {:<10} | {:<15}\n{}\n",
            label.to_uppercase(),
            "Product",
            "SKU",
            "Price",
            "Stock",
            "-".repeat(75)
        );

        for product in products {
            let name: String = product.name.chars().take(28).collect();
            let price = format_inr_whole(product.price);
            let stock = availability(&self.storage.inventory.stock_for_sku(&product.sku).await?);
            match &stock {
                Availability::InStock { total_available, .. } => {
                    table.push_str(&format!(
                        "{name:<30} | {:<10} | {price:<10} | {total_available} units\n",
                        product.sku
                    ));
                    let cities = stock.store_cities();
                    if !cities.is_empty() {
                        let shown: Vec<&str> = cities.iter().take(3).map(String::as_str).collect();
                        table.push_str(&format!(
                            "{:30} | {:10} | {:10} | 📍 {}\n",
                            "",
                            "",
                            "",
                            shown.join(", ")
                        ));
                    }
                }
                Availability::Unknown | Availability::OutOfStock => {
                    table.push_str(&format!(
                        "{name:<30} | {:<10} | {price:<10} | ❌ Out of Stock\n",
                        product.sku
                    ));
                }
            }
        }

        table.push_str("```\n\n💡 **Next Steps:**\n");
        table.push_str("• Add to cart: 'Add [product name] to cart'\n");
        table.push_str("• Check specific SKU: 'Check stock for SKU [code]'\n");
        table.push_str("• Checkout: 'I want to checkout'\n");
        Ok(table)
    }
}

pub(crate) fn normalize_sku(sku: &str) -> String {
    sku.trim().to_ascii_uppercase()
}

tool! {
    CheckAvailability on InventoryTools {
        name: "check_availability",
        description: "Check product availability across all stores and warehouses.",
        parameters: object_schema(
            &[("sku", "string", "Product SKU"), ("quantity", "integer", "Quantity to check")],
            &["sku"],
        ),
        call: check_availability(AvailabilityArgs),
    }
}

tool! {
    NearestStoreWithStock on InventoryTools {
        name: "get_nearest_store_with_stock",
        description: "Find the nearest store that has the SKU in stock.",
        parameters: object_schema(
            &[("sku", "string", "Product SKU"), ("customer_city", "string", "Customer's city")],
            &["sku", "customer_city"],
        ),
        call: nearest_store_with_stock(NearestStoreArgs),
    }
}

tool! {
    EstimatedDelivery on InventoryTools {
        name: "get_estimated_delivery",
        description: "Delivery estimate for ship_to_home, click_and_collect or buy_in_store.",
        parameters: object_schema(
            &[("fulfillment_type", "string", "ship_to_home | click_and_collect | buy_in_store")],
            &["fulfillment_type"],
        ),
        call: estimated_delivery(DeliveryArgs),
    }
}

tool! {
    PriceForSku on InventoryTools {
        name: "get_price_for_sku",
        description: "Look up the current price of a SKU.",
        parameters: object_schema(&[("sku", "string", "Product SKU")], &["sku"]),
        call: price_for_sku(PriceArgs),
    }
}

pub fn registry(tools: Arc<InventoryTools>) -> ToolRegistry {
    ToolRegistry::default()
        .with(CheckAvailability(tools.clone()))
        .with(NearestStoreWithStock(tools.clone()))
        .with(EstimatedDelivery(tools.clone()))
        .with(PriceForSku(tools))
}
