//! Product analytics templates, one per facet of a product question.

use super::{and_date, contains};
use crate::types::SqlQuery;

/// The aspect of a product a question asks about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductFacet {
    CurrentStock,
    StockPurchased,
    SalesCount,
    AmountSold,
    Price,
    PurchaseHistory,
    SalesHistory,
    Supplier,
    Customers,
    Payments,
    Profit,
    /// Sales within a resolved date predicate over `i.created_at`.
    PeriodSales,
    Overview,
}

/// Quantity received through purchase orders, per product.
const RECEIVED_JOIN: &str = "LEFT JOIN (
    SELECT poi.product_id, SUM(poi.quantity) AS quantity
    FROM purchase_order_items poi
    JOIN purchase_orders po ON poi.po_id = po.id
    WHERE po.status = 'received'
    GROUP BY poi.product_id
) received ON received.product_id = p.id";

const NAME_FILTER: &str = "LOWER(p.name) LIKE LOWER(?)";

/// Builds the query for `facet` over products whose name contains `name`.
pub fn query(facet: ProductFacet, name: &str, date_predicate: Option<&str>) -> SqlQuery {
    let sql = match facet {
        ProductFacet::CurrentStock => format!(
            "SELECT p.name, p.sku, p.stock_quantity AS current_stock
FROM products p
WHERE {NAME_FILTER}"
        ),
        ProductFacet::StockPurchased => format!(
            "SELECT p.name, p.initial_stock,
    COALESCE(MAX(received.quantity), 0) AS purchased_via_po,
    COALESCE(p.initial_stock, 0) + COALESCE(MAX(received.quantity), 0) AS total_stock_purchased
FROM products p
{RECEIVED_JOIN}
WHERE {NAME_FILTER}
GROUP BY p.id"
        ),
        ProductFacet::SalesCount => format!(
            "SELECT p.name,
    COUNT(DISTINCT i.id) AS total_sales_count,
    COALESCE(SUM(ii.quantity), 0) AS total_quantity_sold
FROM products p
LEFT JOIN invoice_items ii ON p.id = ii.product_id
LEFT JOIN invoices i ON ii.invoice_id = i.id
WHERE {NAME_FILTER}
GROUP BY p.id
ORDER BY total_quantity_sold DESC"
        ),
        ProductFacet::AmountSold => format!(
            "SELECT p.name,
    COALESCE(SUM(ii.quantity * ii.unit_price), 0) AS total_amount_sold,
    COALESCE(SUM(ii.quantity), 0) AS total_quantity_sold
FROM products p
LEFT JOIN invoice_items ii ON p.id = ii.product_id
WHERE {NAME_FILTER}
GROUP BY p.id
ORDER BY total_amount_sold DESC"
        ),
        ProductFacet::Price => format!(
            "SELECT p.name, p.price AS cost_price, p.selling_price,
    (p.selling_price - p.price) AS profit_margin
FROM products p
WHERE {NAME_FILTER}"
        ),
        ProductFacet::PurchaseHistory => format!(
            "SELECT p.name AS product, po.po_number, po.order_date,
    poi.quantity, poi.unit_cost, poi.total_cost,
    s.name AS supplier, po.status
FROM products p
JOIN purchase_order_items poi ON p.id = poi.product_id
JOIN purchase_orders po ON poi.po_id = po.id
JOIN suppliers s ON po.supplier_id = s.id
WHERE {NAME_FILTER}
ORDER BY po.order_date DESC"
        ),
        ProductFacet::SalesHistory => format!(
            "SELECT p.name AS product, i.invoice_number, i.created_at AS sale_date,
    ii.quantity, ii.unit_price, (ii.quantity * ii.unit_price) AS line_total,
    c.name AS customer
FROM products p
JOIN invoice_items ii ON p.id = ii.product_id
JOIN invoices i ON ii.invoice_id = i.id
LEFT JOIN customers c ON i.customer_id = c.id
WHERE {NAME_FILTER}
ORDER BY i.created_at DESC"
        ),
        ProductFacet::Supplier => format!(
            "SELECT p.name AS product, s.name AS supplier, s.contact_info, s.email
FROM products p
LEFT JOIN suppliers s ON p.supplier_id = s.id
WHERE {NAME_FILTER}"
        ),
        ProductFacet::Customers => format!(
            "SELECT c.name AS customer, c.phone,
    COUNT(DISTINCT i.id) AS purchase_count,
    SUM(ii.quantity) AS total_quantity,
    SUM(ii.quantity * ii.unit_price) AS total_amount
FROM products p
JOIN invoice_items ii ON p.id = ii.product_id
JOIN invoices i ON ii.invoice_id = i.id
JOIN customers c ON i.customer_id = c.id
WHERE {NAME_FILTER}
GROUP BY c.id
ORDER BY total_amount DESC"
        ),
        ProductFacet::Payments => format!(
            "SELECT p.name AS product, sp.amount, sp.payment_method,
    sp.paid_at, sp.note, s.name AS supplier
FROM products p
JOIN supplier_payments sp ON p.id = sp.product_id
JOIN suppliers s ON sp.supplier_id = s.id
WHERE {NAME_FILTER}
ORDER BY sp.paid_at DESC"
        ),
        ProductFacet::Profit => format!(
            "SELECT p.name, p.price AS cost_price, p.selling_price,
    (p.selling_price - p.price) AS profit_per_unit,
    COALESCE(p.quantity_sold, 0) * (p.selling_price - p.price) AS total_profit
FROM products p
WHERE {NAME_FILTER}
ORDER BY total_profit DESC"
        ),
        ProductFacet::PeriodSales => format!(
            "SELECT p.name, SUM(ii.quantity) AS quantity_sold,
    SUM(ii.quantity * ii.unit_price) AS revenue
FROM products p
JOIN invoice_items ii ON p.id = ii.product_id
JOIN invoices i ON ii.invoice_id = i.id
WHERE {NAME_FILTER}{date}
GROUP BY p.id
ORDER BY revenue DESC",
            date = and_date(date_predicate)
        ),
        ProductFacet::Overview => format!(
            "SELECT p.id, p.name, p.sku,
    p.price AS cost_price, p.selling_price,
    p.stock_quantity AS current_stock,
    COALESCE(p.initial_stock, 0) + COALESCE(MAX(received.quantity), 0) AS total_stock_purchased,
    COALESCE(SUM(ii.quantity), 0) AS quantity_sold,
    COUNT(DISTINCT i.id) AS sales_invoice_count,
    COALESCE(SUM(ii.quantity * ii.unit_price), 0) AS total_amount_sold,
    p.category,
    s.name AS supplier_name
FROM products p
LEFT JOIN suppliers s ON p.supplier_id = s.id
LEFT JOIN invoice_items ii ON p.id = ii.product_id
LEFT JOIN invoices i ON ii.invoice_id = i.id
{RECEIVED_JOIN}
WHERE {NAME_FILTER}
GROUP BY p.id
ORDER BY total_amount_sold DESC"
        ),
    };
    SqlQuery::with_params(sql, vec![contains(name)])
}
