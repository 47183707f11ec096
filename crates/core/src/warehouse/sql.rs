//! SQL statement builders.

use super::WarehouseError;

/// Validate a (possibly dotted) identifier such as `db.schema.table`.
fn identifier(name: &str) -> Result<&str, WarehouseError> {
    let valid = !name.is_empty()
        && name.split('.').all(|part| {
            !part.is_empty()
                && part
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
                && !part.starts_with(|c: char| c.is_ascii_digit())
        });

    if valid {
        Ok(name)
    } else {
        Err(WarehouseError::InvalidIdentifier(name.to_string()))
    }
}

fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// `TRUNCATE TABLE <table>;`
pub fn truncate_table(table: &str) -> Result<String, WarehouseError> {
    Ok(format!("TRUNCATE TABLE {};", identifier(table)?))
}

/// Options for `COPY INTO` from an external stage.
#[derive(Debug, Clone)]
pub struct CopyIntoOptions {
    /// Stage name without the leading `@`.
    pub stage: String,
    /// Optional path under the stage.
    pub prefix: Option<String>,
    pub files: Vec<String>,
    pub pattern: Option<String>,
    /// Inline file format, e.g. `(TYPE=CSV, SKIP_HEADER=1)`.
    pub file_format: String,
}

impl CopyIntoOptions {
    /// CSV with one header line, matching `.*[.]csv`.
    pub fn csv(stage: impl Into<String>, file: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            prefix: None,
            files: vec![file.into()],
            pattern: Some(".*[.]csv".to_string()),
            file_format: "(TYPE=CSV, SKIP_HEADER=1)".to_string(),
        }
    }
}

/// `COPY INTO <table> FROM @<stage>[/<prefix>] FILES=(...) PATTERN='...' FILE_FORMAT=...`
pub fn copy_into(table: &str, options: &CopyIntoOptions) -> Result<String, WarehouseError> {
    let table = identifier(table)?;
    let stage = identifier(options.stage.trim_start_matches('@'))?;

    let location = match options.prefix.as_deref().map(|p| p.trim_matches('/')) {
        Some(prefix) if !prefix.is_empty() => format!("@{}/{}", stage, prefix),
        _ => format!("@{}", stage),
    };

    let mut sql = format!("COPY INTO {}\nFROM {}", table, location);

    if !options.files.is_empty() {
        let files: Vec<String> = options.files.iter().map(|f| quote_literal(f)).collect();
        sql.push_str(&format!("\nFILES=({})", files.join(",")));
    }

    if let Some(pattern) = &options.pattern {
        sql.push_str(&format!("\nPATTERN={}", quote_literal(pattern)));
    }

    sql.push_str(&format!("\nFILE_FORMAT={}", options.file_format));
    Ok(sql)
}
