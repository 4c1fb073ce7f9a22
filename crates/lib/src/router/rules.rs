//! The ordered rule list and every rule except product lookup.

use super::{product, strip_qualifiers, Decision};
use crate::{
    constants::BYPASS_CONTEXT_EXAMPLES,
    dates::DateResolver,
    question::{extract_email, extract_phone, strip_punctuation},
    templates::{
        analytics,
        customer::{self, CustomerKey},
        supplier::{self, SupplierKey},
    },
    types::{Entities, Intent, IntentMatch, SqlQuery},
};
use regex::Regex;
use std::sync::LazyLock;

/// A rule either claims the question or passes it on.
pub type Rule = fn(&RuleInput<'_>) -> Option<Decision>;

/// Rules in evaluation order. The first `Some` wins.
pub const RULES: &[(&str, Rule)] = &[
    ("conversational", conversational),
    ("stock_alerts", stock_alerts),
    ("purchase_relationship", purchase_relationship),
    ("pending_credit", pending_credit),
    ("customer_invoices", customer_invoices),
    ("customer_place", customer_place),
    ("customer_credit", customer_credit),
    ("customer_lookup", customer_lookup),
    ("revenue", revenue),
    ("supplier_lookup", supplier_lookup),
    ("top_sold", top_sold),
    ("product_lookup", product::product_lookup),
];

const GREETINGS: &[&str] = &[
    "hi",
    "hello",
    "hey",
    "good morning",
    "good afternoon",
    "good evening",
    "howdy",
    "hola",
];
const IDENTITY_PHRASES: &[&str] = &[
    "who are you",
    "what are you",
    "who is this",
    "what is this",
    "introduce yourself",
    "tell me about yourself",
];
const FAREWELLS: &[&str] = &["thank you", "thanks", "bye", "goodbye", "see you", "take care"];
const HELP_PHRASES: &[&str] = &["help", "what can you do", "how to use", "commands", "features"];

const GREETING_REPLY: &str = "Hello! How can I help you today? You can ask me about products, customers, suppliers, invoices, or sales analytics.";
const FAREWELL_REPLY: &str =
    "You're welcome! Feel free to ask if you need anything else. Have a great day!";
const HELP_REPLY: &str = "I can help you with:
• **Products**: Stock levels, prices, top sellers, product details
• **Customers**: Customer info, purchase history, credit balances
• **Suppliers**: Supplier details, pending payments
• **Sales**: Revenue, invoices, payment methods, trends
• **Analytics**: Top products, customer spending, sales reports

Just ask naturally, like \"Show top 5 sold products\" or \"Customer John details\"!";

/// Known towns and cities matched as a customer's place.
const PLACES: &[&str] = &[
    "kurnool",
    "hyderabad",
    "bangalore",
    "chennai",
    "mumbai",
    "delhi",
    "pune",
    "kolkata",
    "nandyal",
    "kadapa",
    "anantapur",
    "tirupati",
    "vijayawada",
    "visakhapatnam",
    "guntur",
    "warangal",
    "nizamabad",
    "karimnagar",
    "khammam",
    "rajahmundry",
    "kakinada",
    "eluru",
    "ongole",
    "nellore",
    "chittoor",
    "srikakulam",
    "vizianagaram",
    "machilipatnam",
];
const PLACE_MARKERS: &[&str] = &["place", "city", "town", "district", "state"];
/// Words after "customer" that are never a place.
const NOT_A_PLACE: &[&str] = &[
    "credit", "list", "all", "invoice", "invoices", "month", "week", "year", "today",
    "yesterday", "last", "this", "current", "in", "from", "at", "of", "with", "details",
    "info", "name",
];

/// Words that turn a customer or supplier lookup into a list view.
const LIST_WORDS: &[&str] = &["list", "all", "data", "details", "detail", "info"];
/// Filler around a person or company name.
const NAME_FILLER: &[&str] = &[
    "list", "all", "data", "details", "detail", "info", "the", "for", "of", "please", "show",
    "me", "about",
];

static INVOICE_LIST_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bcustomers?\s+(\w+)\s+invoices?\b").expect("invoice list regex is valid")
});
static CUSTOMER_WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bcustomers?\s+(\w+)").expect("customer word regex is valid"));
static CUSTOMER_CREDIT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:customer credit|credit for customer)\s+(\w+)")
        .expect("customer credit regex is valid")
});
static CUSTOMER_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?:customer name|customer details for|customer info for|who is customer|customers|customer|name)\s+(.+)",
    )
    .expect("customer name regex is valid")
});
static SUPPLIER_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?:supplier name|supplier details for|supplier info for|who is supplier|suppliers|supplier)\s+(.+)",
    )
    .expect("supplier name regex is valid")
});

/// The normalized question plus everything rules share.
#[derive(Debug)]
pub struct RuleInput<'a> {
    /// Normalized question text.
    pub question: &'a str,
    /// Normalized text without `! ? . ,`.
    pub clean: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub dates: &'a DateResolver,
}

impl<'a> RuleInput<'a> {
    pub fn new(question: &'a str, dates: &'a DateResolver) -> Self {
        Self {
            question,
            clean: strip_punctuation(question),
            phone: extract_phone(question),
            email: extract_email(question),
            dates,
        }
    }

    pub fn has(&self, needle: &str) -> bool {
        self.question.contains(needle)
    }

    pub fn has_any(&self, needles: &[&str]) -> bool {
        needles.iter().any(|n| self.question.contains(n))
    }

    /// Whole-word containment.
    pub fn has_word(&self, word: &str) -> bool {
        self.words().any(|w| w == word)
    }

    pub fn words(&self) -> impl Iterator<Item = &str> {
        self.question
            .split(|c: char| !(c.is_alphanumeric() || c == '@' || c == '.' || c == '-' || c == '_'))
            .map(|w| w.trim_matches('.'))
            .filter(|w| !w.is_empty())
    }

    /// The date predicate over `column`, if the question carries one.
    pub fn date(&self, column: &str) -> Option<String> {
        Some(self.dates.resolve(self.question, column)).filter(|p| !p.is_empty())
    }

    /// Phone and email plus the "complete" modifier.
    pub fn base_entities(&self) -> Entities {
        Entities {
            phone: self.phone.clone(),
            email: self.email.clone(),
            complete: self.has_word("complete"),
            ..Default::default()
        }
    }

    pub(crate) fn template(&self, intent: Intent, entities: Entities, query: SqlQuery) -> Decision {
        Decision::Template {
            intent_match: IntentMatch::new(intent, entities),
            query,
        }
    }

    pub(crate) fn delegate(&self, intent: Intent, examples: usize) -> Decision {
        Decision::Delegate {
            intent,
            entities: self.base_entities(),
            examples,
        }
    }
}

fn conversational(input: &RuleInput<'_>) -> Option<Decision> {
    let clean = input.clean.as_str();
    if GREETINGS
        .iter()
        .any(|g| clean == *g || clean.starts_with(&format!("{g} ")))
    {
        return Some(Decision::Reply {
            intent: Intent::Greeting,
            text: GREETING_REPLY,
        });
    }
    if IDENTITY_PHRASES.iter().any(|p| clean.contains(p)) {
        return Some(Decision::Identity);
    }
    if input.has_any(FAREWELLS) {
        return Some(Decision::Reply {
            intent: Intent::Farewell,
            text: FAREWELL_REPLY,
        });
    }
    if clean.chars().count() < 50 && HELP_PHRASES.iter().any(|p| clean.contains(p)) {
        return Some(Decision::Reply {
            intent: Intent::Help,
            text: HELP_REPLY,
        });
    }
    None
}

fn stock_alerts(input: &RuleInput<'_>) -> Option<Decision> {
    if input.has_any(&["low stock", "running low"]) {
        return Some(input.template(Intent::LowStock, Entities::default(), analytics::low_stock()));
    }
    if input.has_any(&["out of stock", "no stock", "zero stock"]) {
        return Some(input.template(
            Intent::OutOfStock,
            Entities::default(),
            analytics::out_of_stock(),
        ));
    }
    None
}

/// Customer-to-product relationships need joins no single template covers.
fn purchase_relationship(input: &RuleInput<'_>) -> Option<Decision> {
    if input.has("sold to customer") {
        return None;
    }
    let is_purchase = input.has_any(&[
        "bought",
        "sales with",
        "customers for",
        "who purchased",
        "by customers",
    ]) || (input.has("kisses") && input.has("customer"))
        || (input.has("product") && input.has("customer") && !input.has("sold"));
    is_purchase.then(|| input.delegate(Intent::PurchaseRelationship, BYPASS_CONTEXT_EXAMPLES))
}

fn pending_credit(input: &RuleInput<'_>) -> Option<Decision> {
    input
        .has_any(&[
            "customers with credit",
            "customer with credit",
            "pending credit",
            "credit pending",
        ])
        .then(|| {
            input.template(
                Intent::CreditPending,
                Entities::default(),
                analytics::pending_credit(),
            )
        })
}

fn customer_invoices(input: &RuleInput<'_>) -> Option<Decision> {
    let name = match INVOICE_LIST_RE.captures(input.question) {
        Some(caps) => caps.get(1)?.as_str().to_string(),
        None if input.has("invoice list") && input.has("customer") => {
            CUSTOMER_WORD_RE.captures(input.question)?.get(1)?.as_str().to_string()
        }
        None => return None,
    };
    if ["invoice", "invoices", "list", "all"].contains(&name.as_str()) {
        return None;
    }
    let entities = Entities {
        name: Some(name.clone()),
        ..input.base_entities()
    };
    Some(input.template(
        Intent::CustomerInvoices,
        entities,
        customer::invoices(&name),
    ))
}

/// The place a customer question filters on, if any.
fn place_of(input: &RuleInput<'_>) -> Option<String> {
    if let Some(known) = input.words().find(|w| PLACES.contains(w)) {
        return Some(known.to_string());
    }
    if !PLACE_MARKERS.iter().any(|m| input.has_word(m)) {
        return None;
    }
    // "customers in town nandyal": the word after the marker, else the word after "customer".
    let words: Vec<&str> = input.words().collect();
    let after_marker = words
        .windows(2)
        .find(|pair| PLACE_MARKERS.contains(&pair[0]))
        .map(|pair| pair[1]);
    let after_customer = CUSTOMER_WORD_RE
        .captures(input.question)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str());
    [after_marker, after_customer]
        .into_iter()
        .flatten()
        .find(|w| !NOT_A_PLACE.contains(w) && !PLACE_MARKERS.contains(w))
        .map(str::to_string)
}

fn customer_place(input: &RuleInput<'_>) -> Option<Decision> {
    if !input.has("customer") {
        return None;
    }
    let place = place_of(input)?;
    let date = input.date("i.created_at");
    let query = customer::report_for_place(&place, date.as_deref());
    let entities = Entities {
        name: Some(place),
        date_predicate: date,
        ..input.base_entities()
    };
    Some(input.template(Intent::CustomerPlace, entities, query))
}

fn customer_credit(input: &RuleInput<'_>) -> Option<Decision> {
    if !input.has_any(&["customer credit", "credit for customer"]) {
        return None;
    }
    let (key, entities) = match (&input.phone, &input.email) {
        (Some(phone), _) => (CustomerKey::Phone(phone), input.base_entities()),
        (None, Some(email)) => (CustomerKey::Email(email), input.base_entities()),
        (None, None) => {
            let name = CUSTOMER_CREDIT_RE
                .captures(input.question)
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str())
                .or_else(|| input.question.split_whitespace().last())?;
            let entities = Entities {
                name: Some(name.to_string()),
                ..input.base_entities()
            };
            return Some(input.template(
                Intent::CustomerCredit,
                entities,
                customer::profile(CustomerKey::Name(name)),
            ));
        }
    };
    Some(input.template(Intent::CustomerCredit, entities, customer::profile(key)))
}

fn customer_lookup(input: &RuleInput<'_>) -> Option<Decision> {
    let q = input.question;
    let triggered = q.starts_with("customer ")
        || q.starts_with("customers ")
        || (q.starts_with("name ") && !input.has("product") && !input.has("supplier"))
        || input.has_any(&[
            "customer name",
            "customer details",
            "customer info",
            "who is customer",
        ]);
    if !triggered {
        return None;
    }

    if let Some(phone) = &input.phone {
        return Some(input.template(
            Intent::CustomerLookup,
            input.base_entities(),
            customer::profile(CustomerKey::Phone(phone)),
        ));
    }
    if let Some(email) = &input.email {
        return Some(input.template(
            Intent::CustomerLookup,
            input.base_entities(),
            customer::profile(CustomerKey::Email(email)),
        ));
    }

    if let Some(date) = input.date("i.created_at") {
        let query = customer::report_for_period(&date);
        let entities = Entities {
            date_predicate: Some(date),
            ..input.base_entities()
        };
        return Some(input.template(Intent::CustomerLookup, entities, query));
    }

    let raw = CUSTOMER_NAME_RE
        .captures(q)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .unwrap_or_default();
    let wants_list = raw.split_whitespace().any(|w| LIST_WORDS.contains(&w));
    let name = strip_qualifiers(raw, NAME_FILLER);

    if wants_list || name.is_empty() {
        let entities = Entities {
            list: true,
            ..input.base_entities()
        };
        return Some(input.template(Intent::CustomerLookup, entities, customer::list(None)));
    }

    let query = customer::profile(CustomerKey::Name(&name));
    let entities = Entities {
        name: Some(name),
        ..input.base_entities()
    };
    Some(input.template(Intent::CustomerLookup, entities, query))
}

fn revenue(input: &RuleInput<'_>) -> Option<Decision> {
    if !input.has_any(&["revenue", "sales", "income"]) {
        return None;
    }
    if let Some(date) = input.date("created_at") {
        let query = analytics::revenue(Some(&date));
        let entities = Entities {
            date_predicate: Some(date),
            ..input.base_entities()
        };
        return Some(input.template(Intent::Revenue, entities, query));
    }
    input.has("total").then(|| {
        input.template(
            Intent::Revenue,
            input.base_entities(),
            analytics::revenue(None),
        )
    })
}

fn supplier_lookup(input: &RuleInput<'_>) -> Option<Decision> {
    let q = input.question;
    let triggered = q.starts_with("supplier ")
        || q.starts_with("suppliers ")
        || input.has_any(&[
            "supplier name",
            "supplier details",
            "supplier info",
            "who is supplier",
        ]);
    if !triggered {
        return None;
    }

    if let Some(phone) = &input.phone {
        return Some(input.template(
            Intent::SupplierLookup,
            input.base_entities(),
            supplier::profile(SupplierKey::Phone(phone)),
        ));
    }
    if let Some(email) = &input.email {
        return Some(input.template(
            Intent::SupplierLookup,
            input.base_entities(),
            supplier::profile(SupplierKey::Email(email)),
        ));
    }

    let raw = SUPPLIER_NAME_RE
        .captures(q)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .unwrap_or_default();
    let name = strip_qualifiers(raw, NAME_FILLER);
    if name.is_empty() {
        let entities = Entities {
            list: true,
            ..input.base_entities()
        };
        return Some(input.template(
            Intent::SupplierLookup,
            entities,
            supplier::profile(SupplierKey::All),
        ));
    }
    let query = supplier::profile(SupplierKey::Name(&name));
    let entities = Entities {
        name: Some(name),
        ..input.base_entities()
    };
    Some(input.template(Intent::SupplierLookup, entities, query))
}

/// Ranking and cross-entity analytics are left to the generator.
fn top_sold(input: &RuleInput<'_>) -> Option<Decision> {
    let is_top_sold = input.has_any(&[
        "top sold",
        "top selling",
        "most sold",
        "best seller",
        "products sold to customer",
        "customer wise product",
        "products count by customer",
        "customers who bought most",
        "top customers by product",
        "products taken by customer",
    ]) || (input.has("top") && input.has("products"))
        || (input.has("product") && input.has("sold to customer"));
    is_top_sold.then(|| input.delegate(Intent::TopSold, BYPASS_CONTEXT_EXAMPLES))
}
