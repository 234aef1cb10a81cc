//! Per-export configuration
//!
//! Options are expressed as a list of field setters applied in order to a
//! base [`ExportOptions`], the last setter for a field winning. The resulting
//! value is immutable for the duration of one export.

use super::formatters::FormatKind;

/// A single configuration setter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOption {
    /// Output notation
    Format(FormatKind),
    /// Explicit destination key; bypasses extension logic
    Key(String),
    /// Extension used to build the key when no explicit key is set
    Extension(String),
    /// Bytes substituted for every absent value
    Null(Vec<u8>),
    /// Columns requested from the table, in order
    Columns(Vec<String>),
}

impl ExportOption {
    pub fn format(kind: FormatKind) -> Self {
        ExportOption::Format(kind)
    }

    pub fn key(key: impl Into<String>) -> Self {
        ExportOption::Key(key.into())
    }

    pub fn extension(ext: impl Into<String>) -> Self {
        ExportOption::Extension(ext.into())
    }

    pub fn null(sentinel: impl AsRef<[u8]>) -> Self {
        ExportOption::Null(sentinel.as_ref().to_vec())
    }

    pub fn columns<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ExportOption::Columns(columns.into_iter().map(Into::into).collect())
    }
}

/// Effective configuration of one export
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportOptions {
    pub format: FormatKind,
    pub key: Option<String>,
    pub extension: Option<String>,
    pub null: Option<Vec<u8>>,
    pub columns: Vec<String>,
}

impl ExportOptions {
    /// Apply setters on top of this configuration
    ///
    /// # Arguments
    /// * `options` - Setters applied in order
    ///
    /// # Returns
    /// * `ExportOptions` - New configuration; `self` is left untouched
    pub fn apply(&self, options: &[ExportOption]) -> ExportOptions {
        let mut merged = self.clone();
        for option in options {
            match option {
                ExportOption::Format(kind) => merged.format = *kind,
                ExportOption::Key(key) => merged.key = Some(key.clone()),
                ExportOption::Extension(ext) => merged.extension = Some(ext.clone()),
                ExportOption::Null(sentinel) => merged.null = Some(sentinel.clone()),
                ExportOption::Columns(columns) => merged.columns = columns.clone(),
            }
        }
        merged
    }

    /// Resolve the destination key
    ///
    /// # Arguments
    /// * `table` - Table name, if the export has one
    /// * `declared_extension` - Default extension of the selected formatter
    ///
    /// # Returns
    /// * `Option<String>` - Resolved key, or None when no table name and no
    ///   explicit key are available
    pub fn resolve_key(
        &self,
        table: Option<&str>,
        declared_extension: Option<&str>,
    ) -> Option<String> {
        if let Some(key) = &self.key {
            return Some(key.clone());
        }

        let table = table?;
        let extension = self
            .extension
            .as_deref()
            .or(declared_extension)
            .map(|ext| ext.trim_start_matches('.'))
            .filter(|ext| !ext.is_empty());

        Some(match extension {
            Some(ext) => format!("{table}.{ext}"),
            None => table.to_string(),
        })
    }

    /// Build the selection statement for a table
    ///
    /// # Arguments
    /// * `table` - Table to select from
    /// * `quote` - Quotes a table or column name for the target dialect
    pub fn select_statement(&self, table: &str, quote: impl Fn(&str) -> String) -> String {
        let columns = if self.columns.is_empty() {
            "*".to_string()
        } else {
            self.columns
                .iter()
                .map(|c| quote(c))
                .collect::<Vec<_>>()
                .join(", ")
        };

        format!("SELECT {} FROM {}", columns, quote(table))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_setter_wins() {
        let options = ExportOptions::default().apply(&[
            ExportOption::format(FormatKind::Json),
            ExportOption::key("first"),
            ExportOption::key("second"),
        ]);

        assert_eq!(options.format, FormatKind::Json);
        assert_eq!(options.key.as_deref(), Some("second"));
        assert!(options.null.is_none());
    }

    #[test]
    fn test_overrides_inherit_base() {
        let base = ExportOptions::default().apply(&[
            ExportOption::format(FormatKind::Yaml),
            ExportOption::null("NULL"),
        ]);
        let call = base.apply(&[ExportOption::extension("yml")]);

        assert_eq!(call.format, FormatKind::Yaml);
        assert_eq!(call.null.as_deref(), Some(&b"NULL"[..]));
        assert_eq!(call.extension.as_deref(), Some("yml"));
        assert!(base.extension.is_none());
    }

    #[test]
    fn test_resolve_key() {
        let defaults = ExportOptions::default();
        assert_eq!(
            defaults.resolve_key(Some("orders"), Some("csv")).as_deref(),
            Some("orders.csv")
        );
        assert_eq!(
            defaults.resolve_key(Some("orders"), None).as_deref(),
            Some("orders")
        );
        assert_eq!(defaults.resolve_key(None, Some("csv")), None);

        let explicit = defaults.apply(&[ExportOption::key("archive.dat")]);
        assert_eq!(
            explicit.resolve_key(Some("orders"), Some("json")).as_deref(),
            Some("archive.dat")
        );
        assert_eq!(
            explicit.resolve_key(None, None).as_deref(),
            Some("archive.dat")
        );

        let extension = defaults.apply(&[ExportOption::extension(".txt")]);
        assert_eq!(
            extension.resolve_key(Some("orders"), Some("csv")).as_deref(),
            Some("orders.txt")
        );
    }

    fn double_quote(name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    #[test]
    fn test_select_statement() {
        let options = ExportOptions::default();
        assert_eq!(
            options.select_statement("orders", double_quote),
            r#"SELECT * FROM "orders""#
        );

        let options = options.apply(&[ExportOption::columns(["id", "we\"ird"])]);
        assert_eq!(
            options.select_statement("orders", double_quote),
            r#"SELECT "id", "we""ird" FROM "orders""#
        );
        assert_eq!(
            options.select_statement("orders", |name| format!("`{name}`")),
            "SELECT `id`, `we\"ird` FROM `orders`"
        );
    }
}
