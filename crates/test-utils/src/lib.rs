use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::{Arc, Mutex};
use stockquery::{
    dates::{Clock, FixedClock},
    errors::EngineError,
    providers::{
        ai::AiProvider,
        db::{
            sqlite::SqliteProvider,
            storage::{ExampleStore, SettingsStore, Storage},
        },
    },
    types::{ExampleMetadata, GenerationOptions, Row},
};

// --- Fixture data ---

/// The day every fixture clock is frozen on. Seeded invoices fall in
/// January, February and March of 2025 relative to it.
pub fn fixture_today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 15).expect("valid fixture date")
}

/// A clock frozen at noon (IST) on [`fixture_today`].
pub fn fixed_clock() -> Arc<dyn Clock> {
    Arc::new(FixedClock::on(fixture_today()))
}

/// A small but complete inventory dataset.
///
/// Credit: Ravi Kumar owes 250 (300 given, 50 repaid; the 100 "Initial
/// payment" does not count). Sita Devi's 100 credit is fully repaid.
/// Stock: KitKat 5 (low), Dairy Milk 0 (out), Five Star 9 (low), Munch 80.
pub const SEED_DATA: &str = "
INSERT INTO suppliers (id, name, contact_info, address, email, town) VALUES (1, 'Acme Foods', '9000000001', 'Industrial Area', 'orders@acmefoods.in', 'Kurnool');
INSERT INTO suppliers (id, name, contact_info, address, email, town) VALUES (2, 'Sweet Traders', '9000000002', 'Market Road', 'hello@sweettraders.in', 'Hyderabad');

INSERT INTO products (id, name, sku, price, selling_price, initial_stock, stock_quantity, quantity_sold, supplier_id, category) VALUES (1, 'KitKat', 'KK01', 10, 15, 50, 5, 30, 1, 'chocolate');
INSERT INTO products (id, name, sku, price, selling_price, initial_stock, stock_quantity, quantity_sold, supplier_id, category) VALUES (2, 'Dairy Milk', 'DM01', 20, 30, 40, 0, 8, 1, 'chocolate');
INSERT INTO products (id, name, sku, price, selling_price, initial_stock, stock_quantity, quantity_sold, supplier_id, category) VALUES (3, 'Munch', 'MU01', 5, 8, 100, 80, 0, 2, 'wafer');
INSERT INTO products (id, name, sku, price, selling_price, initial_stock, stock_quantity, quantity_sold, supplier_id, category) VALUES (4, 'Five Star', 'FS01', 8, 12, 30, 9, 0, 2, 'chocolate');

INSERT INTO customers (id, name, email, phone, address, place, town, district, state) VALUES (1, 'Ravi Kumar', 'ravi@example.com', '9876543210', 'MG Road', 'Kurnool', 'Kurnool', 'Kurnool', 'Andhra Pradesh');
INSERT INTO customers (id, name, email, phone, address, place, town, district, state) VALUES (2, 'Sita Devi', 'sita@example.com', '9123456780', 'Station Road', 'Nandyal', 'Nandyal', 'Nandyal', 'Andhra Pradesh');
INSERT INTO customers (id, name, email, phone, address, place, town, district, state) VALUES (3, 'Arjun Rao', 'arjun@example.com', '9988776655', 'Banjara Hills', 'Hyderabad', 'Hyderabad', 'Hyderabad', 'Telangana');

INSERT INTO invoices (id, invoice_number, customer_id, total_amount, payment_method, credit_amount, created_at) VALUES (1, 'INV-001', 1, 300, 'Credit', 300, '2025-03-10 10:00:00');
INSERT INTO invoices (id, invoice_number, customer_id, total_amount, payment_method, credit_amount, created_at) VALUES (2, 'INV-002', 1, 150, 'Cash', 0, '2025-02-05 11:30:00');
INSERT INTO invoices (id, invoice_number, customer_id, total_amount, payment_method, credit_amount, created_at) VALUES (3, 'INV-003', 2, 240, 'Credit', 100, '2025-01-20 16:45:00');

INSERT INTO invoice_items (invoice_id, product_id, quantity, unit_price, product_name) VALUES (1, 1, 20, 15, 'KitKat');
INSERT INTO invoice_items (invoice_id, product_id, quantity, unit_price, product_name) VALUES (2, 1, 10, 15, 'KitKat');
INSERT INTO invoice_items (invoice_id, product_id, quantity, unit_price, product_name) VALUES (3, 2, 8, 30, 'Dairy Milk');

INSERT INTO customer_payments (customer_id, invoice_id, amount, payment_method, note, paid_at) VALUES (1, 1, 100, 'Cash', 'Initial payment', '2025-03-10 10:00:00');
INSERT INTO customer_payments (customer_id, invoice_id, amount, payment_method, note, paid_at) VALUES (1, 1, 50, 'UPI', 'Part repayment', '2025-03-12 09:00:00');
INSERT INTO customer_payments (customer_id, invoice_id, amount, payment_method, note, paid_at) VALUES (2, 3, 100, 'Cash', 'Credit cleared', '2025-02-01 12:00:00');

INSERT INTO purchase_orders (id, po_number, supplier_id, order_date, status) VALUES (1, 'PO-001', 1, '2025-02-01 09:00:00', 'received');
INSERT INTO purchase_orders (id, po_number, supplier_id, order_date, status) VALUES (2, 'PO-002', 2, '2025-03-01 09:00:00', 'pending');
INSERT INTO purchase_order_items (po_id, product_id, quantity, unit_cost, total_cost) VALUES (1, 1, 20, 10, 200);
INSERT INTO purchase_order_items (po_id, product_id, quantity, unit_cost, total_cost) VALUES (2, 3, 50, 5, 250);

INSERT INTO supplier_payments (supplier_id, product_id, amount, payment_method, note, paid_at) VALUES (1, 1, 300, 'Bank', 'Opening stock', '2025-01-05 10:00:00');

INSERT INTO app_settings (key, value) VALUES ('invoice_company_name', 'Sri Lakshmi Traders');
INSERT INTO app_settings (key, value) VALUES ('invoice_company_phone', '08518-222333');
INSERT INTO app_settings (key, value) VALUES ('unrelated_setting', 'x');
";

// --- Test Setup ---

/// A helper struct to manage database creation for each test.
pub struct TestSetup {
    pub provider: SqliteProvider,
}

impl TestSetup {
    /// Creates a new, isolated in-memory database with the inventory schema,
    /// the engine's own tables and [`SEED_DATA`].
    pub async fn new() -> Result<Self> {
        let setup = Self::empty().await?;
        setup.provider.initialize_with_data(SEED_DATA).await?;
        Ok(setup)
    }

    /// Same schema as [`TestSetup::new`], no rows.
    pub async fn empty() -> Result<Self> {
        let provider = SqliteProvider::new(":memory:").await?;
        provider.initialize_inventory_schema().await?;
        provider.initialize_schema().await?;
        Ok(Self { provider })
    }

    /// Runs a single statement directly against the fixture database.
    pub async fn execute(&self, sql: &str) -> Result<u64> {
        let conn = self.provider.db.connect()?;
        Ok(conn.execute(sql, ()).await?)
    }

    pub fn storage(&self) -> Box<dyn Storage> {
        Box::new(self.provider.clone())
    }

    pub fn settings(&self) -> Box<dyn SettingsStore> {
        Box::new(self.provider.clone())
    }

    pub fn examples(&self) -> Box<dyn ExampleStore> {
        Box::new(self.provider.clone())
    }
}

// --- Mock AI Provider ---

/// Replays canned responses in order and records every call.
/// Once the responses run out, calls fail with `EngineError::AiApi`.
#[derive(Clone, Debug, Default)]
pub struct MockAiProvider {
    responses: Arc<Mutex<Vec<String>>>,
    calls: Arc<Mutex<Vec<(String, String)>>>,
}

impl MockAiProvider {
    pub fn new(responses: Vec<&str>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(
                responses.into_iter().rev().map(String::from).collect(),
            )),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// A provider whose every call fails.
    pub fn failing() -> Self {
        Self::default()
    }

    /// Recorded `(system_prompt, user_prompt)` pairs.
    pub fn get_calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl AiProvider for MockAiProvider {
    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        _options: &GenerationOptions,
    ) -> Result<String, EngineError> {
        self.calls
            .lock()
            .unwrap()
            .push((system_prompt.to_string(), user_prompt.to_string()));

        self.responses.lock().unwrap().pop().ok_or_else(|| {
            EngineError::AiApi("MockAiProvider: no response programmed".to_string())
        })
    }
}

// --- Mock Example Store ---

/// An in-memory example store returning examples in insertion order.
#[derive(Clone, Debug, Default)]
pub struct MockExampleStore {
    examples: Arc<Mutex<Vec<(String, String, ExampleMetadata)>>>,
    queries: Arc<Mutex<Vec<(String, usize)>>>,
    fail_queries: bool,
}

impl MockExampleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose similarity searches always fail.
    pub fn failing() -> Self {
        Self {
            fail_queries: true,
            ..Self::default()
        }
    }

    /// Recorded `(question, k)` searches.
    pub fn get_queries(&self) -> Vec<(String, usize)> {
        self.queries.lock().unwrap().clone()
    }

    pub fn contents(&self) -> Vec<String> {
        self.examples
            .lock()
            .unwrap()
            .iter()
            .map(|(_, content, _)| content.clone())
            .collect()
    }
}

#[async_trait]
impl ExampleStore for MockExampleStore {
    async fn add_example(
        &self,
        id: &str,
        content: &str,
        metadata: &ExampleMetadata,
    ) -> Result<(), EngineError> {
        let mut examples = self.examples.lock().unwrap();
        if !examples.iter().any(|(existing, _, _)| existing == id) {
            examples.push((id.to_string(), content.to_string(), metadata.clone()));
        }
        Ok(())
    }

    async fn query_similar(
        &self,
        question: &str,
        k: usize,
        kind: Option<&str>,
    ) -> Result<Vec<String>, EngineError> {
        self.queries
            .lock()
            .unwrap()
            .push((question.to_string(), k));
        if self.fail_queries {
            return Err(EngineError::StorageOperationFailed(
                "MockExampleStore: search unavailable".to_string(),
            ));
        }
        Ok(self
            .examples
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, _, meta)| kind.is_none_or(|kind| meta.kind == kind))
            .take(k)
            .map(|(_, content, _)| content.clone())
            .collect())
    }

    async fn count(&self) -> Result<usize, EngineError> {
        Ok(self.examples.lock().unwrap().len())
    }
}

// --- Mock Settings ---

#[derive(Clone, Debug, Default)]
pub struct MockSettings {
    values: HashMap<String, String>,
}

impl MockSettings {
    pub fn new(values: &[(&str, &str)]) -> Self {
        Self {
            values: values
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}

#[async_trait]
impl SettingsStore for MockSettings {
    async fn settings_with_prefix(
        &self,
        prefix: &str,
    ) -> Result<HashMap<String, String>, EngineError> {
        Ok(self
            .values
            .iter()
            .filter(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}

// --- Recording Storage ---

/// A storage backend that records statements and returns fixed rows.
#[derive(Clone, Debug, Default)]
pub struct RecordingStorage {
    rows: Vec<Row>,
    executed: Arc<Mutex<Vec<(String, Vec<String>)>>>,
}

impl RecordingStorage {
    pub fn new(rows: Vec<Row>) -> Self {
        Self {
            rows,
            executed: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Recorded `(sql, params)` pairs, in execution order.
    pub fn executed(&self) -> Vec<(String, Vec<String>)> {
        self.executed.lock().unwrap().clone()
    }
}

#[async_trait]
impl Storage for RecordingStorage {
    fn name(&self) -> &str {
        "Recording"
    }

    async fn query_rows(&self, sql: &str, params: &[String]) -> Result<Vec<Row>, EngineError> {
        self.executed
            .lock()
            .unwrap()
            .push((sql.to_string(), params.to_vec()));
        Ok(self.rows.clone())
    }
}
