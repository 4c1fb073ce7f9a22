//! Customer templates: profile, report, list, invoices and place filters.

use super::{and_date, contains, credit_joins, where_date, PRODUCTS_BOUGHT_JOIN};
use crate::types::SqlQuery;

/// How a single customer is identified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CustomerKey<'a> {
    Phone(&'a str),
    Email(&'a str),
    Name(&'a str),
}

impl CustomerKey<'_> {
    fn filter(&self) -> (&'static str, String) {
        match self {
            CustomerKey::Phone(phone) => ("c.phone LIKE ?", contains(phone)),
            CustomerKey::Email(email) => ("c.email LIKE ?", contains(email)),
            CustomerKey::Name(name) => ("LOWER(c.name) LIKE LOWER(?)", contains(name)),
        }
    }
}

/// Full profile of the matching customer(s): stored fields, invoice totals
/// and the current credit balance.
pub fn profile(key: CustomerKey<'_>) -> SqlQuery {
    let (filter, param) = key.filter();
    let sql = format!(
        r#"SELECT c.*,
    COUNT(DISTINCT i.id) AS "TOTAL INVOICES",
    COALESCE(SUM(i.total_amount), 0) AS "TOTAL SPENT",
    MAX(i.created_at) AS "LAST BILLED",
    COALESCE(MAX(pb.quantity), 0) AS "PRODUCTS BOUGHT",
    COALESCE(MAX(cg.given), 0) AS credit_given,
    COALESCE(MAX(cr.repaid), 0) AS credit_repaid,
    COALESCE(MAX(cg.given), 0) - COALESCE(MAX(cr.repaid), 0) AS current_credit
FROM customers c
LEFT JOIN invoices i ON c.id = i.customer_id
{PRODUCTS_BOUGHT_JOIN}
{credit}
WHERE {filter}
GROUP BY c.id
ORDER BY "TOTAL SPENT" DESC"#,
        credit = credit_joins()
    );
    SqlQuery::with_params(sql, vec![param])
}

/// The fixed customer report shape: name, contact, address, email, last
/// invoice date and time (IST), items bought, total spent and invoice count.
fn report(conditions: &str, params: Vec<String>) -> SqlQuery {
    let sql = format!(
        r#"SELECT c.name AS "NAME", c.phone AS "CONTACT INFO", c.address AS "ADDRESS", c.email AS "EMAIL",
    date(MAX(i.created_at), '+5 hours', '30 minutes') AS "INVOICE DATE",
    datetime(MAX(i.created_at), '+5 hours', '30 minutes') AS "LAST BILLED",
    COALESCE(MAX(pb.quantity), 0) AS "PRODUCTS BOUGHT",
    SUM(i.total_amount) AS "TOTAL SPENT",
    COUNT(i.id) AS "TOTAL INVOICES"
FROM customers c
JOIN invoices i ON c.id = i.customer_id
{PRODUCTS_BOUGHT_JOIN}
WHERE {conditions}
GROUP BY c.id
ORDER BY "TOTAL SPENT" DESC"#
    );
    SqlQuery::with_params(sql, params)
}

/// Customers who were invoiced within the date predicate.
pub fn report_for_period(date_predicate: &str) -> SqlQuery {
    report(date_predicate, Vec::new())
}

/// Customers located in `place` (place, town, district, state or address),
/// optionally restricted to invoices within a date predicate.
pub fn report_for_place(place: &str, date_predicate: Option<&str>) -> SqlQuery {
    let conditions = format!(
        "(LOWER(c.place) LIKE LOWER(?1) OR LOWER(c.town) LIKE LOWER(?1) OR LOWER(c.district) LIKE LOWER(?1) OR LOWER(c.state) LIKE LOWER(?1) OR LOWER(c.address) LIKE LOWER(?1)){}",
        and_date(date_predicate)
    );
    report(&conditions, vec![contains(place)])
}

/// Every customer with aggregate purchase figures.
pub fn list(date_predicate: Option<&str>) -> SqlQuery {
    let sql = format!(
        r#"SELECT c.id, c.name, c.phone, c.email, c.address, c.place,
    COALESCE(MAX(pb.quantity), 0) AS "PRODUCTS BOUGHT",
    COUNT(DISTINCT i.id) AS "TOTAL INVOICES",
    COALESCE(SUM(i.total_amount), 0) AS "TOTAL SPENT",
    MAX(i.created_at) AS "LAST BILLED"
FROM customers c
LEFT JOIN invoices i ON c.id = i.customer_id
{PRODUCTS_BOUGHT_JOIN}{date}
GROUP BY c.id
ORDER BY "TOTAL SPENT" DESC"#,
        date = where_date(date_predicate)
    );
    SqlQuery::new(sql)
}

/// Invoices of the customers whose name matches, newest first.
pub fn invoices(name: &str) -> SqlQuery {
    let sql = r#"SELECT c.name AS "CUSTOMER NAME", i.invoice_number AS "INVOICE NUMBER",
    i.total_amount AS "TOTAL SPENT",
    date(i.created_at, '+5 hours', '30 minutes') AS "INVOICE DATE"
FROM customers c
JOIN invoices i ON c.id = i.customer_id
WHERE LOWER(c.name) LIKE LOWER(?)
ORDER BY i.created_at DESC"#;
    SqlQuery::with_params(sql, vec![contains(name)])
}
