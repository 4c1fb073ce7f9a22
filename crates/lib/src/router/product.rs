//! Product analytics: pulls a product name out of the question and picks the
//! facet the question asks about.

use super::{rules::RuleInput, strip_qualifiers, Decision};
use crate::{
    templates::product::{self, ProductFacet},
    types::{Entities, Intent},
};
use regex::Regex;
use std::sync::LazyLock;

const TRIGGER_PHRASES: &[&str] = &[
    "product name",
    "product details",
    "product info",
    "product stock",
    "find product",
    "search product",
];
const TRIGGER_SUFFIXES: &[&str] = &[
    " stock", " sales", " data", " list", " info", " details", " price", " profit", " revenue",
];
/// Questions about these belong to other rules or to the generator.
const EXCLUDED: &[&str] = &["customer", "supplier", "invoice", "payment method", "who is"];

/// Words never part of a product name.
const PRODUCT_QUALIFIERS: &[&str] = &[
    "current", "stock", "purchased", "total", "sales", "sale", "count", "amount", "sold",
    "selling", "price", "details", "info", "data", "list", "history", "the", "for", "of", "show",
    "me", "what", "is", "in", "this", "last", "past", "previous", "month", "months", "week",
    "weeks", "year", "years", "today", "yesterday", "complete", "profit", "revenue",
];

static EXPLICIT_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?:product name|product details for|product info for|product stock for|find product|search product|products|product)\s+(.+?)(?:\s+(?:current stock|stock purchased|total sales|sales count|amount sold|selling price|details|info|sales|purchases?|history|supplier|customers?|profit|revenue|data|list))?$",
    )
    .expect("product name regex is valid")
});
static LEADING_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(.+?)\s+(?:current stock|stock|sales|sold|data|list|info|details|price|profit|margin|revenue|purchases?|history|buyers|payments?)\b",
    )
    .expect("leading product name regex is valid")
});

/// Product questions that are not about customers, suppliers or invoices.
pub fn product_lookup(input: &RuleInput<'_>) -> Option<Decision> {
    let q = input.question;
    let triggered = q.starts_with("product ")
        || q.starts_with("products ")
        || input.has_any(TRIGGER_PHRASES)
        || input.has_any(TRIGGER_SUFFIXES);
    if !triggered || input.has_any(EXCLUDED) {
        return None;
    }

    let name = product_name(q)?;
    let sales_date = input.date("i.created_at");
    let facet = facet_for(input, sales_date.is_some());
    let date = (facet == ProductFacet::PeriodSales)
        .then_some(sales_date)
        .flatten();
    let query = product::query(facet, &name, date.as_deref());
    let entities = Entities {
        name: Some(name),
        date_predicate: date,
        ..input.base_entities()
    };
    Some(input.template(Intent::ProductAnalytics, entities, query))
}

/// The product name, without facet and date words. `None` when nothing
/// meaningful is left.
fn product_name(question: &str) -> Option<String> {
    let raw = EXPLICIT_NAME_RE
        .captures(question)
        .or_else(|| LEADING_NAME_RE.captures(question))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())?;
    let name = strip_qualifiers(raw, PRODUCT_QUALIFIERS);
    (name.chars().count() > 1).then_some(name)
}

fn facet_for(input: &RuleInput<'_>, has_sales_period: bool) -> ProductFacet {
    let has = |needle: &str| input.has(needle);
    if has("current stock") || (has("stock") && !has("purchased") && !has("history")) {
        ProductFacet::CurrentStock
    } else if input.has_any(&["stock purchased", "total purchased", "was purchased"]) {
        ProductFacet::StockPurchased
    } else if input.has_any(&["sales count", "how many times"]) {
        ProductFacet::SalesCount
    } else if input.has_any(&["amount sold", "total sold", "revenue"]) {
        ProductFacet::AmountSold
    } else if has("price") {
        ProductFacet::Price
    } else if input.has_any(&[
        "purchase history",
        "purchases",
        "purchase orders",
        "when did we buy",
    ]) {
        ProductFacet::PurchaseHistory
    } else if input.has_any(&["sales history", "sales list"]) {
        ProductFacet::SalesHistory
    } else if input.has_any(&["who supplies", "supplied by", "vendor"]) {
        ProductFacet::Supplier
    } else if input.has_any(&["buyers", "who bought", "who purchased"]) {
        ProductFacet::Customers
    } else if input.has_any(&["payment", "paid for"]) {
        ProductFacet::Payments
    } else if input.has_any(&["profit", "margin"]) {
        ProductFacet::Profit
    } else if has_sales_period && (has("sales") || has("sold")) {
        ProductFacet::PeriodSales
    } else {
        ProductFacet::Overview
    }
}
