//! Prompt templates rendered with tera.
//!
//! Templates are compiled into the binary and registered under `.txt` names so
//! tera applies no HTML escaping.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;
use tera::{Context, Tera};

use shopwise_core::commerce::loyalty::format_inr;
use shopwise_core::domain::catalog::Category;
use shopwise_core::domain::conversation::Intent;

use crate::tools::ToolSpec;

const TEMPLATES: [(&str, &str); 8] = [
    ("intent.txt", include_str!("../prompts/intent.txt")),
    ("preferences.txt", include_str!("../prompts/preferences.txt")),
    ("specialist.txt", include_str!("../prompts/specialist.txt")),
    ("ranking.txt", include_str!("../prompts/ranking.txt")),
    ("recommend_request.txt", include_str!("../prompts/recommend_request.txt")),
    ("inventory_request.txt", include_str!("../prompts/inventory_request.txt")),
    ("fulfillment_request.txt", include_str!("../prompts/fulfillment_request.txt")),
    ("support_request.txt", include_str!("../prompts/support_request.txt")),
];

pub struct PromptLibrary {
    tera: Tera,
}

#[derive(Serialize)]
struct RenderedTool {
    name: String,
    description: String,
    parameters: String,
}

impl PromptLibrary {
    pub fn new() -> Result<Self, tera::Error> {
        let mut tera = Tera::default();
        tera.register_filter("inr", inr_filter);
        for (name, body) in TEMPLATES {
            tera.add_raw_template(name, body)?;
        }
        Ok(Self { tera })
    }

    pub fn intent(
        &self,
        message: &str,
        cart_items: usize,
        previous: Intent,
    ) -> Result<String, tera::Error> {
        let mut context = Context::new();
        context.insert("message", message);
        context.insert("cart_items", &cart_items);
        context.insert("previous_intent", previous.as_str());
        self.tera.render("intent.txt", &context)
    }

    pub fn preferences(&self, message: &str) -> Result<String, tera::Error> {
        let mut context = Context::new();
        context.insert("message", message);
        context.insert(
            "categories",
            &Category::ALL.iter().map(|category| category.as_str()).collect::<Vec<_>>(),
        );
        self.tera.render("preferences.txt", &context)
    }

    /// A specialist's role text followed by its tool catalogue and the JSON
    /// reply protocol.
    pub fn specialist(&self, role: &str, tools: &[ToolSpec]) -> Result<String, tera::Error> {
        let tools: Vec<RenderedTool> = tools
            .iter()
            .map(|tool| RenderedTool {
                name: tool.name.clone(),
                description: tool.description.clone(),
                parameters: tool.parameters.to_string(),
            })
            .collect();

        let mut context = Context::new();
        context.insert("role", role);
        context.insert("tools", &tools);
        self.tera.render("specialist.txt", &context)
    }

    pub fn ranking(
        &self,
        count: usize,
        conversation: &str,
        preferences: &Value,
        past_purchases: &str,
        candidates: &Value,
    ) -> Result<String, tera::Error> {
        let mut context = Context::new();
        context.insert("count", &count);
        context.insert("context", conversation);
        context.insert("preferences", &preferences.to_string());
        context.insert(
            "past_purchases",
            if past_purchases.is_empty() { "None" } else { past_purchases },
        );
        context.insert(
            "candidates",
            &serde_json::to_string_pretty(candidates).unwrap_or_else(|_| candidates.to_string()),
        );
        self.tera.render("ranking.txt", &context)
    }

    pub fn recommend_request(
        &self,
        message: &str,
        categories: &[Category],
        max_price: Option<String>,
        min_rating: Option<f64>,
        customer_id: Option<&str>,
    ) -> Result<String, tera::Error> {
        let mut context = Context::new();
        context.insert("message", message);
        context.insert("categories", &categories.iter().map(|c| c.as_str()).collect::<Vec<_>>());
        context.insert("max_price", &max_price);
        context.insert("min_rating", &min_rating);
        context.insert("customer_id", &customer_id);
        self.tera.render("recommend_request.txt", &context)
    }

    pub fn inventory_request(
        &self,
        message: &str,
        customer_city: Option<&str>,
    ) -> Result<String, tera::Error> {
        let mut context = Context::new();
        context.insert("message", message);
        context.insert("customer_city", &customer_city);
        self.tera.render("inventory_request.txt", &context)
    }

    pub fn fulfillment_request(
        &self,
        customer_id: &str,
        items: &Value,
        total: &Value,
        fulfillment_type: &str,
        delivery_address: Option<&Value>,
    ) -> Result<String, tera::Error> {
        let mut context = Context::new();
        context.insert("customer_id", customer_id);
        context.insert("items", &items.to_string());
        context.insert("total", total);
        context.insert("fulfillment_type", fulfillment_type);
        context.insert("delivery_address", &delivery_address.map(Value::to_string));
        self.tera.render("fulfillment_request.txt", &context)
    }

    pub fn support_request(&self, message: &str, customer_id: &str) -> Result<String, tera::Error> {
        let mut context = Context::new();
        context.insert("message", message);
        context.insert("customer_id", customer_id);
        self.tera.render("support_request.txt", &context)
    }
}

/// Formats a decimal (number or numeric string) as rupees, e.g. `₹1,234.50`.
fn inr_filter(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
    let text = match value {
        Value::String(text) => text.clone(),
        Value::Number(number) => number.to_string(),
        _ => return Err(tera::Error::msg("inr filter expects a number or numeric string")),
    };
    let amount = text
        .parse::<rust_decimal::Decimal>()
        .map_err(|error| tera::Error::msg(format!("inr filter: {error}")))?;
    Ok(Value::String(format_inr(amount)))
}
