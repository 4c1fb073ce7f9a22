//! # Shared Constants
//!
//! This module provides a centralized location for constants that are shared across
//! the `stockquery` workspace, so the library and the binary agree on defaults.

/// The default path for the inventory SQLite database.
pub const DEFAULT_DB_FILE: &str = "db/inventory.db";

/// The default directory holding the persisted query cache.
pub const DEFAULT_CACHE_DIR: &str = "db/ai_cache";

/// The file name of the persisted query cache inside the cache directory.
pub const CACHE_FILE_NAME: &str = "query_cache.json";

/// Row cap appended to statements that carry no `LIMIT` clause.
pub const DEFAULT_ROW_LIMIT: u32 = 100;

/// Number of question/SQL examples retrieved for the generic fallback.
pub const DEFAULT_CONTEXT_EXAMPLES: usize = 2;

/// Number of examples retrieved for questions that bypass the templates.
pub const BYPASS_CONTEXT_EXAMPLES: usize = 3;

/// Offset of the business timezone (UTC+5:30) in seconds.
pub const IST_OFFSET_SECONDS: i32 = 5 * 3600 + 30 * 60;

/// Separator placed between retrieved examples in the generation context.
pub const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

/// Metadata kind of question/SQL training pairs.
pub const QUESTION_SQL_KIND: &str = "question_sql";

/// Prefix of the settings rows that describe the company.
pub const COMPANY_SETTINGS_PREFIX: &str = "invoice_company_";

/// Company name used when the settings table does not provide one.
pub const DEFAULT_COMPANY_NAME: &str = "Inventory Management System";
