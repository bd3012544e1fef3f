//! Category template loading from config.toml
//!
//! When a leader sets a total budget without listing categories, the budget is
//! split across the templates defined here, each taking its `share` of the total.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Default categories offered for a new budget
    pub categories: Vec<CategoryTemplate>,
}

/// Configuration for a single default category
#[derive(Debug, Deserialize, Clone)]
pub struct CategoryTemplate {
    /// Name of the category
    pub name: String,
    /// Display color (hex)
    #[serde(default = "default_color")]
    pub color: String,
    /// Fraction of the total budget this category receives (0.0-1.0)
    pub share: f64,
}

fn default_color() -> String {
    "#64748b".to_string()
}

impl Config {
    /// Built-in templates used when no config.toml is present.
    #[must_use]
    pub fn builtin() -> Self {
        let template = |name: &str, color: &str, share: f64| CategoryTemplate {
            name: name.to_string(),
            color: color.to_string(),
            share,
        };
        Self {
            categories: vec![
                template("Accommodation", "#4f46e5", 0.35),
                template("Food", "#16a34a", 0.25),
                template("Transport", "#0891b2", 0.2),
                template("Activities", "#ea580c", 0.15),
                template("Miscellaneous", "#64748b", 0.05),
            ],
        }
    }

    /// Checks that every share is within 0..=1 and that the shares sum to 1.
    ///
    /// # Errors
    /// Returns `Error::Config` if the templates cannot split a budget exactly.
    pub fn validate(&self) -> Result<()> {
        if self.categories.is_empty() {
            return Err(Error::Config {
                message: "config.toml must define at least one category".to_string(),
            });
        }
        if let Some(bad) = self
            .categories
            .iter()
            .find(|c| !(0.0..=1.0).contains(&c.share) || c.name.trim().is_empty())
        {
            return Err(Error::Config {
                message: format!("Invalid category template '{}'", bad.name),
            });
        }
        let total: f64 = self.categories.iter().map(|c| c.share).sum();
        if (total - 1.0).abs() > 0.0001 {
            return Err(Error::Config {
                message: format!("Category shares must sum to 1.0, got {total:.4}"),
            });
        }
        Ok(())
    }
}

/// Loads category templates from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - The shares don't add up to 1.0
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| Error::Config {
        message: format!("Failed to read config file: {e}"),
    })?;

    let config: Config = toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })?;
    config.validate()?;
    Ok(config)
}

/// Loads category templates from ./config.toml, falling back to the built-in set
/// when the file does not exist.
///
/// # Errors
/// Returns an error if the file exists but is invalid.
pub fn load_default_config() -> Result<Config> {
    let path = Path::new("config.toml");
    if path.exists() {
        load_config(path)
    } else {
        tracing::info!("No config.toml found, using built-in category templates");
        Ok(Config::builtin())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;

    #[test]
    fn test_parse_category_config() {
        let toml_str = r##"
            [[categories]]
            name = "Lodging"
            color = "#111111"
            share = 0.6

            [[categories]]
            name = "Food"
            share = 0.4
        "##;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.categories.len(), 2);
        assert_eq!(config.categories[0].name, "Lodging");
        assert_eq!(config.categories[0].share, 0.6);
        assert_eq!(config.categories[1].color, "#64748b");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_shares_must_sum_to_one() {
        let toml_str = r#"
            [[categories]]
            name = "Lodging"
            share = 0.5
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert!(matches!(config.validate(), Err(Error::Config { .. })));
    }

    #[test]
    fn test_builtin_templates_are_valid() {
        assert!(Config::builtin().validate().is_ok());
    }
}
