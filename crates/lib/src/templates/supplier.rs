//! Supplier templates. Mirrors the customer profile against products,
//! purchase orders and supplier payments.

use super::contains;
use crate::types::SqlQuery;

/// How suppliers are selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupplierKey<'a> {
    /// Matched against `contact_info`, which holds the phone number.
    Phone(&'a str),
    Email(&'a str),
    Name(&'a str),
    All,
}

/// Supplier rows with product count, opening stock and its value, and the
/// amount still owed (purchase orders plus opening stock value, minus payments).
pub fn profile(key: SupplierKey<'_>) -> SqlQuery {
    let (filter, params) = match key {
        SupplierKey::Phone(phone) => ("\nWHERE s.contact_info LIKE ?", vec![contains(phone)]),
        SupplierKey::Email(email) => ("\nWHERE s.email LIKE ?", vec![contains(email)]),
        SupplierKey::Name(name) => ("\nWHERE LOWER(s.name) LIKE LOWER(?)", vec![contains(name)]),
        SupplierKey::All => ("", Vec::new()),
    };
    let sql = format!(
        "SELECT s.*,
    COUNT(DISTINCT p.id) AS total_products,
    COALESCE(SUM(p.initial_stock), 0) AS total_stock,
    COALESCE(SUM(p.initial_stock * p.price), 0) AS stock_value,
    COALESCE(MAX(po_cost.cost), 0) + COALESCE(SUM(p.initial_stock * p.price), 0) - COALESCE(MAX(paid.amount), 0) AS pending_amount
FROM suppliers s
LEFT JOIN products p ON s.id = p.supplier_id
LEFT JOIN (
    SELECT po.supplier_id, SUM(poi.total_cost) AS cost
    FROM purchase_order_items poi
    JOIN purchase_orders po ON poi.po_id = po.id
    GROUP BY po.supplier_id
) po_cost ON po_cost.supplier_id = s.id
LEFT JOIN (
    SELECT supplier_id, SUM(amount) AS amount
    FROM supplier_payments
    GROUP BY supplier_id
) paid ON paid.supplier_id = s.id{filter}
GROUP BY s.id
ORDER BY pending_amount DESC"
    );
    SqlQuery::with_params(sql, params)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phone_matches_contact_info() {
        let q = profile(SupplierKey::Phone("9988776655"));
        assert!(q.sql.contains("s.contact_info LIKE ?"));
        assert_eq!(q.params, vec!["%9988776655%".to_string()]);
    }

    #[test]
    fn list_has_no_filter() {
        let q = profile(SupplierKey::All);
        assert!(!q.sql.contains("WHERE"));
        assert!(!q.is_parameterized());
        assert!(q.sql.contains("GROUP BY s.id"));
    }
}
