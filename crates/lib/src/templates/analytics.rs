//! Whole-store analytics: stock alerts, pending credit and revenue.

use super::{credit_joins, where_date};
use crate::types::SqlQuery;

const STOCK_COLUMNS: &str = r#"SELECT p.name AS "PRODUCT NAME", p.sku AS "SKU", p.stock_quantity AS "CURRENT STOCK",
    p.price AS "COST PRICE", s.name AS "SUPPLIER"
FROM products p
LEFT JOIN suppliers s ON p.supplier_id = s.id"#;

/// Products with fewer than 10 units left, scarcest first.
pub fn low_stock() -> SqlQuery {
    SqlQuery::new(format!(
        "{STOCK_COLUMNS}\nWHERE p.stock_quantity < 10\nORDER BY p.stock_quantity ASC"
    ))
}

/// Products with no units left, by name.
pub fn out_of_stock() -> SqlQuery {
    SqlQuery::new(format!(
        "{STOCK_COLUMNS}\nWHERE p.stock_quantity = 0\nORDER BY p.name ASC"
    ))
}

/// Customers whose credit given exceeds their credit repaid.
pub fn pending_credit() -> SqlQuery {
    SqlQuery::new(format!(
        r#"SELECT c.name AS "NAME", c.phone AS "CONTACT INFO", c.address AS "ADDRESS", c.email AS "EMAIL",
    COALESCE(cg.given, 0) AS "CREDIT GIVEN",
    COALESCE(cr.repaid, 0) AS "CREDIT REPAID",
    COALESCE(cg.given, 0) - COALESCE(cr.repaid, 0) AS "PENDING CREDIT"
FROM customers c
{credit}
WHERE COALESCE(cg.given, 0) - COALESCE(cr.repaid, 0) > 0
ORDER BY "PENDING CREDIT" DESC"#,
        credit = credit_joins()
    ))
}

/// Total invoiced amount, optionally within a date predicate over `created_at`.
pub fn revenue(date_predicate: Option<&str>) -> SqlQuery {
    SqlQuery::new(format!(
        r#"SELECT SUM(total_amount) AS "TOTAL REVENUE" FROM invoices{}"#,
        where_date(date_predicate)
    ))
}
