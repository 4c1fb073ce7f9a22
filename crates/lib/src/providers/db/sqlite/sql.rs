//! # SQLite Specific SQL Queries
//!
//! This module centralizes SQL strings for the SQLite provider: the inventory
//! schema the engine queries, and the tables the engine owns itself.

/// The inventory schema, one `CREATE TABLE` per entry.
///
/// The engine never writes these tables. The statements double as the schema
/// text embedded in the generation prompt and as the fixture schema in tests.
pub const INVENTORY_TABLES: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS suppliers (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    contact_info TEXT,
    address TEXT,
    email TEXT,
    comments TEXT,
    state TEXT,
    district TEXT,
    town TEXT,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
    updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
)",
    "CREATE TABLE IF NOT EXISTS products (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    sku TEXT,
    price REAL NOT NULL,
    selling_price REAL,
    initial_stock INTEGER DEFAULT 0,
    stock_quantity INTEGER DEFAULT 0,
    quantity_sold INTEGER DEFAULT 0,
    sold_revenue REAL DEFAULT 0,
    supplier_id INTEGER REFERENCES suppliers(id),
    category TEXT,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
    updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
)",
    "CREATE TABLE IF NOT EXISTS customers (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    email TEXT,
    phone TEXT,
    address TEXT,
    place TEXT,
    state TEXT,
    district TEXT,
    town TEXT,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
    updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
)",
    "CREATE TABLE IF NOT EXISTS invoices (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    invoice_number TEXT NOT NULL,
    customer_id INTEGER REFERENCES customers(id),
    total_amount REAL NOT NULL,
    tax_amount REAL DEFAULT 0,
    discount_amount REAL DEFAULT 0,
    payment_method TEXT,
    credit_amount REAL DEFAULT 0,
    state TEXT,
    district TEXT,
    town TEXT,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP
)",
    "CREATE TABLE IF NOT EXISTS invoice_items (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    invoice_id INTEGER NOT NULL REFERENCES invoices(id),
    product_id INTEGER NOT NULL REFERENCES products(id),
    quantity INTEGER NOT NULL,
    unit_price REAL NOT NULL,
    product_name TEXT
)",
    "CREATE TABLE IF NOT EXISTS supplier_payments (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    supplier_id INTEGER NOT NULL REFERENCES suppliers(id),
    product_id INTEGER REFERENCES products(id),
    amount REAL NOT NULL,
    payment_method TEXT,
    note TEXT,
    paid_at DATETIME DEFAULT CURRENT_TIMESTAMP,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP
)",
    "CREATE TABLE IF NOT EXISTS customer_payments (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    customer_id INTEGER NOT NULL REFERENCES customers(id),
    invoice_id INTEGER REFERENCES invoices(id),
    amount REAL NOT NULL,
    payment_method TEXT,
    note TEXT,
    paid_at DATETIME DEFAULT CURRENT_TIMESTAMP,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP
)",
    "CREATE TABLE IF NOT EXISTS purchase_orders (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    po_number TEXT NOT NULL,
    supplier_id INTEGER NOT NULL REFERENCES suppliers(id),
    order_date DATETIME DEFAULT CURRENT_TIMESTAMP,
    status TEXT
)",
    "CREATE TABLE IF NOT EXISTS purchase_order_items (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    po_id INTEGER NOT NULL REFERENCES purchase_orders(id),
    product_id INTEGER NOT NULL REFERENCES products(id),
    quantity INTEGER NOT NULL,
    unit_cost REAL NOT NULL,
    total_cost REAL NOT NULL
)",
    "CREATE TABLE IF NOT EXISTS app_settings (
    key TEXT PRIMARY KEY,
    value TEXT
)",
];

/// SQL to create the table holding training examples for few-shot retrieval.
pub const CREATE_TRAINING_EXAMPLES_TABLE: &str = "
CREATE TABLE IF NOT EXISTS training_examples (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    id TEXT NOT NULL UNIQUE,
    kind TEXT NOT NULL,
    question TEXT,
    content TEXT NOT NULL,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP
)";

/// Tables owned by the engine itself, created on startup.
pub const ALL_TABLE_CREATION_SQL: &[&str] = &[CREATE_TRAINING_EXAMPLES_TABLE];

/// Inserts an example unless one with the same id already exists.
/// Parameters: id, kind, question, content.
pub const INSERT_TRAINING_EXAMPLE: &str =
    "INSERT OR IGNORE INTO training_examples (id, kind, question, content) VALUES (?, ?, ?, ?)";

/// All examples in insertion order. Parameter: none.
pub const SELECT_ALL_EXAMPLES: &str =
    "SELECT content, question FROM training_examples ORDER BY seq ASC";

/// Examples of one kind in insertion order. Parameter: kind.
pub const SELECT_EXAMPLES_BY_KIND: &str =
    "SELECT content, question FROM training_examples WHERE kind = ? ORDER BY seq ASC";

pub const COUNT_EXAMPLES: &str = "SELECT COUNT(*) FROM training_examples";

/// Settings rows whose key matches a `LIKE` pattern. Parameter: pattern.
pub const SELECT_SETTINGS_LIKE: &str = "SELECT key, value FROM app_settings WHERE key LIKE ?";

/// The inventory schema as one DDL script.
pub fn inventory_schema_ddl() -> String {
    INVENTORY_TABLES
        .iter()
        .map(|statement| format!("{statement};"))
        .collect::<Vec<_>>()
        .join("\n\n")
}
