//! Loads training material from a directory laid out as:
//!
//! ```text
//! training/
//!   ddl/*.sql
//!   documentation/*.md
//!   question_sql_pairs/*.json   (arrays of {"question": .., "sql": ..})
//! ```
//!
//! Missing sub-directories are skipped. Files are read in name order so the
//! example store sees the same insertion order on every run.

use crate::{
    errors::EngineError,
    types::{QuestionSqlPair, TrainingItem},
};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Reads every training item under `dir`.
pub async fn load_training_dir(dir: impl AsRef<Path>) -> Result<Vec<TrainingItem>, EngineError> {
    let dir = dir.as_ref();
    if !tokio::fs::try_exists(dir).await.unwrap_or(false) {
        return Err(EngineError::Training(format!(
            "training directory {} does not exist",
            dir.display()
        )));
    }

    let mut items = Vec::new();
    for path in files_with_extension(&dir.join("ddl"), "sql").await? {
        items.push(TrainingItem::Ddl(read(&path).await?));
    }
    for path in files_with_extension(&dir.join("documentation"), "md").await? {
        items.push(TrainingItem::Documentation(read(&path).await?));
    }
    for path in files_with_extension(&dir.join("question_sql_pairs"), "json").await? {
        let pairs: Vec<QuestionSqlPair> = serde_json::from_str(&read(&path).await?)
            .map_err(|e| EngineError::Training(format!("{}: {e}", path.display())))?;
        items.extend(pairs.into_iter().map(|p| TrainingItem::QuestionSql {
            question: p.question,
            sql: p.sql,
        }));
    }
    info!(dir = %dir.display(), count = items.len(), "Loaded training items");
    Ok(items)
}

async fn read(path: &Path) -> Result<String, EngineError> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| EngineError::Training(format!("{}: {e}", path.display())))
}

async fn files_with_extension(dir: &Path, extension: &str) -> Result<Vec<PathBuf>, EngineError> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(dir = %dir.display(), "Training sub-directory not found, skipping");
            return Ok(Vec::new());
        }
        Err(e) => return Err(EngineError::Training(format!("{}: {e}", dir.display()))),
    };

    let mut files = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| EngineError::Training(format!("{}: {e}", dir.display())))?
    {
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == extension) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
