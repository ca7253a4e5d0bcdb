//! Deterministic message understanding: intent keywords, shopping
//! preferences, SKUs, quantities and cart commands.

use std::str::FromStr;

use rust_decimal::Decimal;

use shopwise_core::commerce::recommend::Preferences;
use shopwise_core::domain::catalog::{Category, Product};
use shopwise_core::domain::conversation::Intent;

const CHECKOUT_PHRASES: &[&str] = &["coupon", "discount", "checkout", "check out", "pay now", "promo"];
const CHECKOUT_TOKENS: &[&str] = &["buy", "pay", "payment"];
const INQUIRY_PHRASES: &[&str] = &["stock", "available", "availability"];
const SUPPORT_PHRASES: &[&str] = &["order status", "where is my order", "support"];
const SUPPORT_TOKENS: &[&str] =
    &["track", "tracking", "return", "returns", "refund", "refunds", "cancel", "ticket", "complaint"];
const END_TOKENS: &[&str] = &["bye", "goodbye", "thanks", "thank", "done"];
const GREETING_TOKENS: &[&str] = &["hi", "hello", "hey", "hola", "namaste"];
const GREETING_PHRASES: &[&str] = &["good morning", "good afternoon", "good evening"];

const CATEGORY_STEMS: [(Category, &[&str]); 4] = [
    (Category::Footwear, &["footwear", "shoe", "sneaker", "boot", "sandal", "slipper"]),
    (
        Category::Electronics,
        &["electronic", "phone", "headphone", "earbud", "laptop", "speaker", "gadget", "tablet"],
    ),
    (
        Category::Clothing,
        &["clothing", "clothes", "shirt", "tshirt", "jean", "jacket", "dress", "hoodie", "kurta"],
    ),
    (Category::Accessories, &["accessor", "watch", "bag", "wallet", "sunglass", "belt", "backpack"]),
];

const PRICE_CONTEXT: &[&str] = &["under", "below", "within", "max", "maximum", "budget", "upto"];
const CURRENCY_TOKENS: &[&str] = &["rs", "inr", "rupees", "rupee"];
const QUANTITY_UNITS: &[&str] =
    &["x", "units", "unit", "pieces", "piece", "pcs", "items", "item", "pairs", "pair", "of"];

const STOPWORDS: &[&str] = &[
    "the", "and", "for", "with", "show", "me", "want", "need", "looking", "look", "some", "any",
    "please", "can", "you", "find", "get", "have", "has", "that", "this", "are", "is", "what",
    "which", "something", "good", "best", "under", "below", "within", "max", "maximum", "budget",
    "upto", "less", "than", "rating", "rated", "above", "over", "stars", "star", "least", "rs",
    "inr", "rupees", "rupee", "price", "priced", "cheap", "from", "like", "would", "love", "buy",
    "shop", "shopping", "recommend", "recommendations", "suggest", "items", "products", "product",
];

/// Keyword fallback for intent classification. Rules are checked in a
/// fixed order; unmatched text is treated as browsing.
#[derive(Clone, Copy, Debug, Default)]
pub struct KeywordIntentClassifier;

impl KeywordIntentClassifier {
    pub fn new() -> Self {
        Self
    }

    pub fn classify(&self, text: &str) -> Intent {
        let normalized = normalize_text(text);
        let tokens = tokenize(&normalized);
        let has_token = |words: &[&str]| tokens.iter().any(|token| words.contains(&token.as_str()));
        let has_phrase = |phrases: &[&str]| phrases.iter().any(|phrase| normalized.contains(phrase));

        if has_phrase(CHECKOUT_PHRASES) || has_token(CHECKOUT_TOKENS) {
            Intent::Checkout
        } else if has_phrase(INQUIRY_PHRASES) {
            Intent::ProductInquiry
        } else if normalized.contains("cart") {
            Intent::CartManagement
        } else if has_phrase(SUPPORT_PHRASES) || has_token(SUPPORT_TOKENS) {
            Intent::Support
        } else if has_token(END_TOKENS) {
            Intent::End
        } else if has_token(GREETING_TOKENS) || has_phrase(GREETING_PHRASES) {
            Intent::Greeting
        } else {
            Intent::Browsing
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct PreferenceExtractor;

impl PreferenceExtractor {
    pub fn new() -> Self {
        Self
    }

    pub fn extract(&self, text: &str) -> Preferences {
        let tokens: Vec<String> = tokenize(&normalize_text(text))
            .into_iter()
            .filter(|token| !CURRENCY_TOKENS.contains(&token.as_str()))
            .collect();

        Preferences {
            favorite_categories: mentioned_categories(&tokens),
            max_price: extract_max_price(&tokens),
            min_rating: extract_min_rating(&tokens),
            keywords: extract_keywords(&tokens),
        }
    }
}

/// Categories named in `text`, in catalogue order.
pub fn mentioned_categories_in(text: &str) -> Vec<Category> {
    mentioned_categories(&tokenize(&normalize_text(text)))
}

fn mentioned_categories(tokens: &[String]) -> Vec<Category> {
    CATEGORY_STEMS
        .iter()
        .filter(|(_, stems)| tokens.iter().any(|token| matches_stem(token, stems)))
        .map(|(category, _)| *category)
        .collect()
}

fn matches_stem(token: &str, stems: &[&str]) -> bool {
    stems.iter().any(|stem| token.starts_with(stem))
}

fn is_category_word(token: &str) -> bool {
    CATEGORY_STEMS.iter().any(|(_, stems)| matches_stem(token, stems))
}

fn extract_max_price(tokens: &[String]) -> Option<Decimal> {
    for (index, token) in tokens.iter().enumerate() {
        let previous = index.checked_sub(1).map(|i| tokens[i].as_str());
        let before_previous = index.checked_sub(2).map(|i| tokens[i].as_str());
        let in_context = match (before_previous, previous) {
            (_, Some(word)) if PRICE_CONTEXT.contains(&word) => true,
            (Some("less"), Some("than")) | (Some("up"), Some("to")) => true,
            _ => false,
        };
        if in_context {
            if let Some(amount) = parse_money_token(token) {
                return Some(amount);
            }
        }
    }
    None
}

/// `5000`, `4999.50` or `3k`. Commas are already stripped by the tokenizer.
fn parse_money_token(token: &str) -> Option<Decimal> {
    let (number, multiplier) = match token.strip_suffix('k') {
        Some(prefix) => (prefix, Decimal::from(1_000)),
        None => (token, Decimal::ONE),
    };
    let amount = Decimal::from_str(number).ok()?;
    (amount > Decimal::ZERO).then_some(amount * multiplier)
}

fn extract_min_rating(tokens: &[String]) -> Option<f64> {
    let valid = |value: f64| (0.0..=5.0).contains(&value).then_some(value);

    for window in tokens.windows(2) {
        if let [value, unit] = window {
            if matches!(unit.as_str(), "star" | "stars") {
                if let Some(rating) = value.parse::<f64>().ok().and_then(valid) {
                    return Some(rating);
                }
            }
        }
    }

    for (index, token) in tokens.iter().enumerate() {
        if matches!(token.as_str(), "rating" | "rated" | "ratings") {
            let rating = tokens
                .iter()
                .skip(index + 1)
                .take(3)
                .find_map(|candidate| candidate.parse::<f64>().ok())
                .and_then(valid);
            if rating.is_some() {
                return rating;
            }
        }
    }
    None
}

fn extract_keywords(tokens: &[String]) -> Vec<String> {
    let mut keywords: Vec<String> = Vec::new();
    for token in tokens {
        let keep = token.len() > 2
            && !STOPWORDS.contains(&token.as_str())
            && !is_category_word(token)
            && parse_money_token(token).is_none()
            && !keywords.contains(token);
        if keep {
            keywords.push(token.clone());
        }
    }
    keywords
}

/// SKUs of the form `ABC1234`, upper-cased, in order of appearance.
pub fn extract_skus(text: &str) -> Vec<String> {
    let mut skus: Vec<String> = Vec::new();
    for word in text.split(|c: char| !c.is_ascii_alphanumeric()) {
        if is_sku(word) {
            let sku = word.to_ascii_uppercase();
            if !skus.contains(&sku) {
                skus.push(sku);
            }
        }
    }
    skus
}

fn is_sku(word: &str) -> bool {
    let bytes = word.as_bytes();
    bytes.len() == 7
        && bytes[..3].iter().all(u8::is_ascii_alphabetic)
        && bytes[3..].iter().all(u8::is_ascii_digit)
}

/// Order ids minted by fulfillment (`ORD` + date + hex), upper-cased.
pub fn extract_order_id(text: &str) -> Option<String> {
    text.split(|c: char| !c.is_ascii_alphanumeric())
        .find(|word| {
            word.len() > 11
                && word[..3].eq_ignore_ascii_case("ord")
                && word[3..11].bytes().all(|b| b.is_ascii_digit())
        })
        .map(str::to_ascii_uppercase)
}

/// First explicit quantity such as `2 units`, `qty 3`, `x2` or `2 FOO1000`.
pub fn extract_quantity(text: &str) -> Option<u32> {
    let tokens = tokenize(&normalize_text(text));
    let plausible = |value: u32| (1..=99).contains(&value).then_some(value);

    for (index, token) in tokens.iter().enumerate() {
        if matches!(token.as_str(), "qty" | "quantity") {
            if let Some(value) = tokens.get(index + 1).and_then(|next| next.parse::<u32>().ok()) {
                return plausible(value);
            }
        }
        if let Some(value) = token
            .strip_prefix('x')
            .or_else(|| token.strip_suffix('x'))
            .and_then(|digits| digits.parse::<u32>().ok())
        {
            return plausible(value);
        }
        if let Ok(value) = token.parse::<u32>() {
            let next = tokens.get(index + 1).map(String::as_str);
            let quantified = next.is_some_and(|next| {
                QUANTITY_UNITS.contains(&next) || is_sku(next) || is_category_word(next)
            });
            if quantified {
                return plausible(value);
            }
        }
    }
    None
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CartCommand {
    Add { sku: Option<String>, quantity: u32 },
    Remove { sku: Option<String>, quantity: Option<u32> },
    Clear,
    View,
}

pub fn parse_cart_command(text: &str) -> CartCommand {
    let normalized = normalize_text(text);
    let tokens = tokenize(&normalized);
    let has = |words: &[&str]| tokens.iter().any(|token| words.contains(&token.as_str()));
    let sku = extract_skus(text).into_iter().next();

    if has(&["clear", "empty", "reset"]) {
        CartCommand::Clear
    } else if has(&["remove", "delete", "drop"]) {
        CartCommand::Remove { sku, quantity: extract_quantity(text) }
    } else if has(&["add", "put", "include"]) {
        CartCommand::Add { sku, quantity: extract_quantity(text).unwrap_or(1) }
    } else {
        CartCommand::View
    }
}

/// Best catalogue match for a product named in free text: an exact name
/// substring wins, otherwise the product sharing the most name words (at
/// least two).
pub fn match_product<'a>(text: &str, products: &'a [Product]) -> Option<&'a Product> {
    let normalized = normalize_text(text);
    if let Some(product) =
        products.iter().find(|product| normalized.contains(&normalize_text(&product.name)))
    {
        return Some(product);
    }

    let tokens = tokenize(&normalized);
    products
        .iter()
        .map(|product| {
            let overlap = tokenize(&normalize_text(&product.name))
                .iter()
                .filter(|word| word.len() > 2 && tokens.contains(word))
                .count();
            (product, overlap)
        })
        .filter(|(_, overlap)| *overlap >= 2)
        .max_by_key(|(_, overlap)| *overlap)
        .map(|(product, _)| product)
}

fn normalize_text(text: &str) -> String {
    text.to_lowercase()
}

/// Splits on anything but ASCII alphanumerics and `.`; commas between digits
/// are dropped so `5,000` stays one token.
fn tokenize(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut sanitized = String::with_capacity(text.len());
    for (index, &character) in chars.iter().enumerate() {
        let between_digits = index > 0
            && chars[index - 1].is_ascii_digit()
            && chars.get(index + 1).is_some_and(char::is_ascii_digit);
        if character.is_ascii_alphanumeric() || character == '.' {
            sanitized.push(character);
        } else if character == ',' && between_digits {
            continue;
        } else {
            sanitized.push(' ');
        }
    }
    sanitized
        .split_whitespace()
        .map(|token| token.trim_matches('.').to_string())
        .filter(|token| !token.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{
        extract_order_id, extract_quantity, extract_skus, match_product, parse_cart_command,
        CartCommand, KeywordIntentClassifier, PreferenceExtractor,
    };
    use shopwise_core::domain::catalog::{Category, Product};
    use shopwise_core::domain::conversation::Intent;

    #[test]
    fn classifies_common_phrases() {
        let classifier = KeywordIntentClassifier::new();
        let cases = [
            ("Hello there", Intent::Greeting),
            ("good morning!", Intent::Greeting),
            ("Show me running shoes", Intent::Browsing),
            ("Is ELE1069 in stock?", Intent::ProductInquiry),
            ("which sizes are available", Intent::ProductInquiry),
            ("what's in my cart", Intent::CartManagement),
            ("apply coupon FLAT500", Intent::Checkout),
            ("any discount on this?", Intent::Checkout),
            ("I'm ready to checkout", Intent::Checkout),
            ("track my order", Intent::Support),
            ("I want a refund", Intent::Support),
            ("thanks, bye", Intent::End),
            ("something for my brother", Intent::Browsing),
        ];
        for (text, expected) in cases {
            assert_eq!(classifier.classify(text), expected, "text: {text}");
        }
    }

    #[test]
    fn coupon_and_stock_words_take_priority() {
        let classifier = KeywordIntentClassifier::new();
        assert_eq!(classifier.classify("hi, is there a discount on stock items"), Intent::Checkout);
        assert_eq!(classifier.classify("hey, is my cart item available"), Intent::ProductInquiry);
        assert_eq!(classifier.classify("this is the chip I wanted"), Intent::Browsing);
    }

    #[test]
    fn extracts_categories_price_and_rating() {
        let prefs = PreferenceExtractor::new()
            .extract("Need running shoes and a watch under ₹5,000 with rating above 4.5");

        assert_eq!(prefs.favorite_categories, vec![Category::Footwear, Category::Accessories]);
        assert_eq!(prefs.max_price, Some(Decimal::new(5_000, 0)));
        assert_eq!(prefs.min_rating, Some(4.5));
        assert!(prefs.keywords.contains(&"running".to_string()));
        assert!(!prefs.keywords.contains(&"shoes".to_string()));
    }

    #[test]
    fn price_caps_accept_shorthand_and_phrases() {
        let extractor = PreferenceExtractor::new();
        assert_eq!(extractor.extract("phones below rs 3k").max_price, Some(Decimal::new(3_000, 0)));
        assert_eq!(
            extractor.extract("jeans for less than 1499.50").max_price,
            Some(Decimal::new(149_950, 2))
        );
        assert_eq!(extractor.extract("4 stars or more").min_rating, Some(4.0));
        assert_eq!(extractor.extract("rated 9 out of 10").min_rating, None);
        let open = extractor.extract("surprise me");
        assert_eq!(open.max_price, None);
        assert!(open.favorite_categories.is_empty());
    }

    #[test]
    fn finds_skus_and_order_ids() {
        assert_eq!(
            extract_skus("compare ele1069 with FOO1000, and ele1069 again"),
            vec!["ELE1069".to_string(), "FOO1000".to_string()]
        );
        assert!(extract_skus("order 12345 please").is_empty());
        assert_eq!(
            extract_order_id("where is ord20260301a1b2c3?").as_deref(),
            Some("ORD20260301A1B2C3")
        );
        assert_eq!(extract_order_id("my order please"), None);
    }

    #[test]
    fn parses_quantities_and_cart_commands() {
        assert_eq!(extract_quantity("add 2 FOO1000 to my cart"), Some(2));
        assert_eq!(extract_quantity("qty 3"), Some(3));
        assert_eq!(extract_quantity("make it x4"), Some(4));
        assert_eq!(extract_quantity("add FOO1000"), None);

        assert_eq!(
            parse_cart_command("Add 2 foo1000 to cart"),
            CartCommand::Add { sku: Some("FOO1000".to_string()), quantity: 2 }
        );
        assert_eq!(
            parse_cart_command("remove ELE1069 from my cart"),
            CartCommand::Remove { sku: Some("ELE1069".to_string()), quantity: None }
        );
        assert_eq!(parse_cart_command("empty my cart"), CartCommand::Clear);
        assert_eq!(parse_cart_command("show my cart"), CartCommand::View);
    }

    fn product(sku: &str, name: &str) -> Product {
        Product {
            sku: sku.to_string(),
            name: name.to_string(),
            category: Category::Footwear,
            brand: "Nike".to_string(),
            description: String::new(),
            price: Decimal::new(2_999, 0),
            original_price: None,
            discount_percentage: None,
            rating: 4.2,
            reviews_count: 10,
            is_featured: false,
            is_available: true,
            tags: Vec::new(),
            image_url: String::new(),
        }
    }

    #[test]
    fn product_names_match_by_substring_or_overlap() {
        let products =
            vec![product("FOO1000", "Nike Running Shoes"), product("FOO1001", "Puma Casual Sneakers")];

        assert_eq!(
            match_product("add the nike running shoes to cart", &products).map(|p| p.sku.as_str()),
            Some("FOO1000")
        );
        assert_eq!(
            match_product("I'll take the casual puma pair", &products).map(|p| p.sku.as_str()),
            Some("FOO1001")
        );
        assert_eq!(match_product("add it", &products), None);
    }
}
