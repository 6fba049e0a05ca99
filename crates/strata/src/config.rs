//! Column layout and behavior switches for the tree index.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Configuration of the mirror tree.
///
/// Every column role is optional; a disabled role produces no column. The
/// column count is one past the highest enabled column, so gaps are allowed
/// and simply render empty cells.
///
/// # Example
///
/// ```
/// use strata::IndexConfig;
///
/// let config = IndexConfig::from_toml_str(r#"
///     name_column = 0
///     visibility_column = 1
///     id_column = 3
/// "#).unwrap();
///
/// assert_eq!(config.column_count(), 4);
/// assert_eq!(config.transform_column, None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Column showing the display name, tooltip and owner icon.
    pub name_column: Option<usize>,
    /// Column showing the visibility state and icon.
    pub visibility_column: Option<usize>,
    /// Column showing the parent transform of the associated object.
    pub transform_column: Option<usize>,
    /// Column showing the associated object's identifier.
    pub id_column: Option<usize>,
    /// Skip per-item work while the store is inside a batch window and rely
    /// on the rebuild at the end of the batch.
    pub suppress_during_batch: bool,
    /// Text shown for the mirror root row.
    pub root_label: String,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            name_column: Some(0),
            visibility_column: Some(1),
            transform_column: Some(2),
            id_column: None,
            suppress_during_batch: true,
            root_label: "Root".to_string(),
        }
    }
}

impl IndexConfig {
    /// A single-column layout showing only names.
    pub fn names_only() -> Self {
        Self {
            name_column: Some(0),
            visibility_column: None,
            transform_column: None,
            id_column: None,
            ..Default::default()
        }
    }

    /// Parses a configuration from a TOML document.
    ///
    /// Missing keys take their default values.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that no two roles share a column.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let roles = self.roles();
        for (i, (first, a)) in roles.iter().enumerate() {
            for (second, b) in &roles[i + 1..] {
                if a == b {
                    return Err(ConfigError::DuplicateColumn {
                        column: *a,
                        first: *first,
                        second: *second,
                    });
                }
            }
        }
        Ok(())
    }

    /// Number of columns in the mirror tree (at least one).
    pub fn column_count(&self) -> usize {
        self.roles()
            .iter()
            .map(|(_, column)| column + 1)
            .max()
            .unwrap_or(1)
    }

    fn roles(&self) -> Vec<(&'static str, usize)> {
        [
            ("name", self.name_column),
            ("visibility", self.visibility_column),
            ("transform", self.transform_column),
            ("id", self.id_column),
        ]
        .into_iter()
        .filter_map(|(role, column)| column.map(|c| (role, c)))
        .collect()
    }
}
