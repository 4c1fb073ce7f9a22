use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Sentinel prefix of a conversational reply returned in place of SQL.
pub const CONVERSATIONAL_PREFIX: &str = "CONVERSATIONAL:";

/// Sentinel prefix of an identity payload returned in place of SQL.
pub const IDENTITY_PREFIX: &str = "IDENTITY:";

/// A single result row: field name to value, in the statement's column order.
pub type Row = serde_json::Map<String, Value>;

/// The recognized category of a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Greeting,
    Identity,
    Farewell,
    Help,
    LowStock,
    OutOfStock,
    PurchaseRelationship,
    CreditPending,
    CustomerInvoices,
    CustomerPlace,
    CustomerCredit,
    CustomerLookup,
    Revenue,
    SupplierLookup,
    TopSold,
    ProductAnalytics,
    Fallback,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Greeting => "greeting",
            Intent::Identity => "identity",
            Intent::Farewell => "farewell",
            Intent::Help => "help",
            Intent::LowStock => "low_stock",
            Intent::OutOfStock => "out_of_stock",
            Intent::PurchaseRelationship => "purchase_relationship",
            Intent::CreditPending => "credit_pending",
            Intent::CustomerInvoices => "customer_invoices",
            Intent::CustomerPlace => "customer_place",
            Intent::CustomerCredit => "customer_credit",
            Intent::CustomerLookup => "customer_lookup",
            Intent::Revenue => "revenue",
            Intent::SupplierLookup => "supplier_lookup",
            Intent::TopSold => "top_sold",
            Intent::ProductAnalytics => "product_analytics",
            Intent::Fallback => "fallback",
        }
    }

    /// Whether a question with this intent is answered without touching the database.
    pub fn is_conversational(&self) -> bool {
        matches!(
            self,
            Intent::Greeting | Intent::Identity | Intent::Farewell | Intent::Help
        )
    }
}

/// Structured values extracted from the question text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Entities {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub date_predicate: Option<String>,
    /// The question asks for an aggregate list view ("list", "all", ...).
    pub list: bool,
    /// The question carries the "complete" period modifier.
    pub complete: bool,
}

/// A recognized intent together with the entities it was matched with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntentMatch {
    pub intent: Intent,
    pub entities: Entities,
}

impl IntentMatch {
    pub fn new(intent: Intent, entities: Entities) -> Self {
        Self { intent, entities }
    }
}

/// A SQL statement plus the values bound to its `?` parameters, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlQuery {
    pub sql: String,
    pub params: Vec<String>,
}

impl SqlQuery {
    /// A statement without bound parameters.
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    pub fn with_params(sql: impl Into<String>, params: Vec<String>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }

    pub fn is_parameterized(&self) -> bool {
        !self.params.is_empty()
    }
}

/// Company details returned for "who are you" style questions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityPayload {
    #[serde(rename = "type")]
    pub kind: String,
    pub company_name: String,
    pub address: String,
    pub phone: String,
    pub email: String,
    pub message: String,
}

/// What the router produced for a question.
///
/// Only `Query` may be handed to the executor. The two sentinel variants are
/// rendered with their `CONVERSATIONAL:` / `IDENTITY:` prefixes for callers
/// that transport the candidate as a plain string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlCandidate {
    Query(SqlQuery),
    Conversational(String),
    Identity(IdentityPayload),
}

impl SqlCandidate {
    pub fn is_sentinel(&self) -> bool {
        !matches!(self, SqlCandidate::Query(_))
    }

    pub fn as_query(&self) -> Option<&SqlQuery> {
        match self {
            SqlCandidate::Query(query) => Some(query),
            _ => None,
        }
    }

    /// Renders the candidate as the string carried in `QueryResponse::sql`.
    pub fn to_wire_string(&self) -> Result<String, serde_json::Error> {
        Ok(match self {
            SqlCandidate::Query(query) => query.sql.clone(),
            SqlCandidate::Conversational(text) => format!("{CONVERSATIONAL_PREFIX}{text}"),
            SqlCandidate::Identity(payload) => {
                format!("{IDENTITY_PREFIX}{}", serde_json::to_string(payload)?)
            }
        })
    }
}

/// Where the SQL of a response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QuerySource {
    Cache,
    Template,
    Conversational,
    Generated,
}

/// The router's full answer for one question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutedQuery {
    pub intent_match: IntentMatch,
    pub candidate: SqlCandidate,
    pub source: QuerySource,
}

impl RoutedQuery {
    /// True when the SQL embeds dates computed from the current time.
    pub fn is_time_sensitive(&self) -> bool {
        self.intent_match.entities.date_predicate.is_some()
    }
}

/// The failure classes surfaced by `QueryEngine::ask`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    UnsafeQuery,
    Generation,
    Execution,
}

/// The structured result of answering one question.
#[derive(Debug, Clone, Serialize)]
pub struct QueryResponse {
    pub sql: String,
    pub results: Vec<Row>,
    pub sql_extraction_time_ms: f64,
    pub execution_time_ms: f64,
    pub total_time_ms: f64,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<QuerySource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intent: Option<Intent>,
}

/// Sampling parameters passed to the generative model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationOptions {
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            max_tokens: 512,
            temperature: 0.1,
        }
    }
}

/// One unit of training data for the example store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrainingItem {
    Ddl(String),
    Documentation(String),
    QuestionSql { question: String, sql: String },
}

impl TrainingItem {
    pub fn kind(&self) -> &'static str {
        match self {
            TrainingItem::Ddl(_) => "ddl",
            TrainingItem::Documentation(_) => "documentation",
            TrainingItem::QuestionSql { .. } => crate::constants::QUESTION_SQL_KIND,
        }
    }
}

/// A question/SQL pair as stored in `question_sql_pairs/*.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionSqlPair {
    pub question: String,
    pub sql: String,
}

/// Metadata attached to an example when it is added to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExampleMetadata {
    pub kind: String,
    pub question: Option<String>,
}

/// A snapshot of the engine's readiness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EngineStatus {
    pub generator_ready: bool,
    pub trained: bool,
    pub cached_queries: usize,
}

/// Configuration of the generative model provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// `local` (OpenAI-compatible endpoint) or `gemini`.
    pub provider: String,
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    pub model_name: Option<String>,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        let options = GenerationOptions::default();
        Self {
            provider: "local".to_string(),
            api_url: None,
            api_key: None,
            model_name: None,
            max_tokens: options.max_tokens,
            temperature: options.temperature,
        }
    }
}

impl GeneratorConfig {
    pub fn options(&self) -> GenerationOptions {
        GenerationOptions {
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        }
    }
}

/// Application configuration shared by the library and the binary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub db_path: String,
    pub cache_dir: String,
    pub row_limit: u32,
    pub context_examples: usize,
    pub generator: GeneratorConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: crate::constants::DEFAULT_DB_FILE.to_string(),
            cache_dir: crate::constants::DEFAULT_CACHE_DIR.to_string(),
            row_limit: crate::constants::DEFAULT_ROW_LIMIT,
            context_examples: crate::constants::DEFAULT_CONTEXT_EXAMPLES,
            generator: GeneratorConfig::default(),
        }
    }
}
