//! # Generation Prompts
//!
//! The fixed system instruction handed to the generative model, and the
//! post-processing applied to whatever the model sends back.

use crate::providers::db::sqlite::sql::inventory_schema_ddl;
use regex::Regex;
use std::sync::LazyLock;

static FENCED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)```(?:sql)?[ \t]*\n?([\s\S]*?)```").expect("fence regex is valid")
});

/// Persona, dialect rules and IST date idioms. The schema and examples are appended.
const SQL_EXPERT_INSTRUCTION: &str = r#"You are a SQL expert for an inventory management database running on SQLite.
Write ONE valid, read-only SQLite query. Return only the query: no markdown and no explanations.

# Dialect
This is SQLite. Never use MONTH(), YEAR(), CURDATE() or NOW().
All timestamps are stored in UTC; business time is IST (UTC+5:30). Shift with modifiers:
- Current IST time: datetime('now', '+5 hours', '30 minutes')
- Current IST date: date('now', '+5 hours', '30 minutes')
- Shifting a column: datetime(i.created_at, '+5 hours', '30 minutes')
- Days since: CAST(julianday('now') - julianday(i.created_at) AS INTEGER)

# Date filters
- Today: date(created_at) = date('now', '+5 hours', '30 minutes')
- This month: strftime('%Y-%m', created_at) = strftime('%Y-%m', 'now', '+5 hours', '30 minutes')
- Week N of the year: strftime('%W', created_at) = 'NN'
- Weekday: strftime('%w', created_at) = 'N' (0 = Sunday, 3 = Wednesday)
- Month: strftime('%m', created_at) = 'MM'
- Year: strftime('%Y', created_at) = 'YYYY'
- "last month" / "last week" means exactly the previous full period.
- "2 months" / "2 weeks" means the current period plus the previous ones, up to now.
- "2 complete months" / "2 complete weeks" means the previous periods only, excluding the current one.

# Matching
Match names case-insensitively: WHERE LOWER(name) LIKE LOWER('%term%')

# Customer reports
Whenever the user asks for customer data, a customer list or customer details, return exactly these columns:
"NAME" (c.name), "CONTACT INFO" (c.phone), "ADDRESS" (c.address), "EMAIL" (c.email),
"INVOICE DATE" (date(MAX(i.created_at), '+5 hours', '30 minutes')),
"LAST BILLED" (datetime(MAX(i.created_at), '+5 hours', '30 minutes')),
"PRODUCTS BOUGHT" (total quantity over the customer's invoice_items),
"TOTAL SPENT" (SUM(i.total_amount)), "TOTAL INVOICES" (COUNT(i.id)).
Join customers c with invoices i ON c.id = i.customer_id, GROUP BY c.id and ORDER BY "TOTAL SPENT" DESC."#;

/// Builds the system instruction, appending retrieved examples when present.
pub fn build_system_prompt(context: &str) -> String {
    let mut prompt = format!(
        "{SQL_EXPERT_INSTRUCTION}\n\n# Database schema\n{}",
        inventory_schema_ddl()
    );
    if !context.trim().is_empty() {
        prompt.push_str("\n\nRELEVANT EXAMPLES:\n");
        prompt.push_str(context);
    }
    prompt
}

/// Extracts the bare SQL from a model response.
///
/// Removes a triple-backtick fence (optionally tagged `sql`) and a leading
/// `SQL:` label, then trims.
pub fn clean_generated_sql(raw: &str) -> String {
    let unfenced = match FENCED_RE.captures(raw) {
        Some(caps) => caps.get(1).map_or("", |m| m.as_str()).to_string(),
        None => raw
            .trim()
            .trim_start_matches("```")
            .trim_end_matches("```")
            .to_string(),
    };
    let trimmed = unfenced.trim();
    let without_label = match trimmed.get(..4) {
        Some(label) if label.eq_ignore_ascii_case("sql:") => &trimmed[4..],
        _ => trimmed,
    };
    without_label.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_tagged_fence() {
        assert_eq!(
            clean_generated_sql("```sql\nSELECT * FROM products\n```"),
            "SELECT * FROM products"
        );
    }

    #[test]
    fn strips_untagged_fence_and_label() {
        assert_eq!(
            clean_generated_sql("```\nSQL: SELECT 1\n```"),
            "SELECT 1"
        );
        assert_eq!(clean_generated_sql("sql: SELECT 2"), "SELECT 2");
    }

    #[test]
    fn strips_surrounding_prose_around_fence() {
        assert_eq!(
            clean_generated_sql("Here you go:\n```SQL\nSELECT name FROM customers;\n```\nEnjoy"),
            "SELECT name FROM customers;"
        );
    }

    #[test]
    fn plain_sql_is_only_trimmed() {
        assert_eq!(clean_generated_sql("  SELECT 1  \n"), "SELECT 1");
    }

    #[test]
    fn system_prompt_embeds_schema_and_examples() {
        let without = build_system_prompt("");
        assert!(without.contains("CREATE TABLE IF NOT EXISTS invoices"));
        assert!(without.contains("'+5 hours', '30 minutes'"));
        assert!(!without.contains("RELEVANT EXAMPLES"));

        let with = build_system_prompt("Question: q\nSQL: SELECT 1");
        assert!(with.ends_with("RELEVANT EXAMPLES:\nQuestion: q\nSQL: SELECT 1"));
    }
}
