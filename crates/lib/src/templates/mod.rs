//! # SQL Template Library
//!
//! Fixed analytical query shapes over the inventory schema. Each template is a
//! pure function from already-extracted entities to a `SqlQuery`.
//!
//! Entity values (names, phones, emails, places) never appear in the SQL text;
//! they are bound to `?` parameters as `%value%` patterns. Date predicates come
//! from `DateResolver` and are spliced in as trusted structural text.
//!
//! Shared rules:
//! - name filters are case-insensitive substring matches,
//! - aggregate templates group by the owning entity's primary key,
//! - templates reporting money order by that total, descending,
//! - credit is always `credit_given - credit_repaid`, where repayments
//!   recorded as the invoice's initial payment are not counted.

pub mod analytics;
pub mod customer;
pub mod product;
pub mod supplier;

/// Per-customer quantity of items bought across all invoices.
pub(crate) const PRODUCTS_BOUGHT_JOIN: &str = "LEFT JOIN (
    SELECT inv.customer_id, SUM(ii.quantity) AS quantity
    FROM invoice_items ii
    JOIN invoices inv ON ii.invoice_id = inv.id
    GROUP BY inv.customer_id
) pb ON pb.customer_id = c.id";

/// Invoices that extended credit to the customer.
const CREDIT_INVOICE: &str = "(credit_amount > 0 OR payment_method = 'Credit')";

/// Per-customer credit given and credit repaid, joined as `cg` and `cr`.
pub(crate) fn credit_joins() -> String {
    format!(
        "LEFT JOIN (
    SELECT customer_id, SUM(credit_amount) AS given
    FROM invoices
    WHERE {CREDIT_INVOICE}
    GROUP BY customer_id
) cg ON cg.customer_id = c.id
LEFT JOIN (
    SELECT cp.customer_id, SUM(cp.amount) AS repaid
    FROM customer_payments cp
    JOIN invoices inv ON cp.invoice_id = inv.id
    WHERE (inv.credit_amount > 0 OR inv.payment_method = 'Credit')
      AND (cp.note IS NULL OR cp.note NOT LIKE '%Initial payment%')
    GROUP BY cp.customer_id
) cr ON cr.customer_id = c.id"
    )
}

/// Wraps a value into a `LIKE` substring pattern.
pub(crate) fn contains(value: &str) -> String {
    format!("%{}%", value.trim())
}

/// Appends ` AND {predicate}` when a date predicate was resolved.
pub(crate) fn and_date(predicate: Option<&str>) -> String {
    match predicate {
        Some(p) if !p.is_empty() => format!(" AND {p}"),
        _ => String::new(),
    }
}

/// ` WHERE {predicate}` when a date predicate was resolved.
pub(crate) fn where_date(predicate: Option<&str>) -> String {
    match predicate {
        Some(p) if !p.is_empty() => format!(" WHERE {p}"),
        _ => String::new(),
    }
}
