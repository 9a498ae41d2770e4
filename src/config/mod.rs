use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Models offered in the preferences popup.
pub const MODELS: [&str; 2] = ["gpt-3.5-turbo", "gpt-4o"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DateFormat {
    #[default]
    YearMonthDay,
    DayMonthYear,
    MonthDayYear,
}

impl DateFormat {
    pub fn label(&self) -> &'static str {
        match self {
            DateFormat::YearMonthDay => "YYYY-MM-DD",
            DateFormat::DayMonthYear => "DD/MM/YYYY",
            DateFormat::MonthDayYear => "MM/DD/YYYY",
        }
    }

    pub fn pattern(&self) -> &'static str {
        match self {
            DateFormat::YearMonthDay => "%Y-%m-%d",
            DateFormat::DayMonthYear => "%d/%m/%Y",
            DateFormat::MonthDayYear => "%m/%d/%Y",
        }
    }

    pub fn next(&self) -> Self {
        match self {
            DateFormat::YearMonthDay => DateFormat::DayMonthYear,
            DateFormat::DayMonthYear => DateFormat::MonthDayYear,
            DateFormat::MonthDayYear => DateFormat::YearMonthDay,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct UsageStats {
    #[serde(default)]
    pub messages: u64,
    #[serde(default)]
    pub tokens: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Preferences {
    /// Chat model used for ask requests
    #[serde(default = "default_model")]
    pub model: String,

    /// How dates render in the file table
    #[serde(default)]
    pub date_format: DateFormat,

    /// Category preselected in the upload form
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_category: Option<String>,

    /// Cumulative chat usage
    #[serde(default)]
    pub usage: UsageStats,
}

fn default_model() -> String {
    MODELS[0].to_string()
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            model: default_model(),
            date_format: DateFormat::default(),
            last_category: None,
            usage: UsageStats::default(),
        }
    }
}

impl Preferences {
    /// Get the config file path
    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?
            .join("filedeck");

        if let Err(e) = std::fs::create_dir_all(&config_dir) {
            tracing::warn!("Could not create config directory: {}", e);
        }

        Ok(config_dir.join("config.toml"))
    }

    /// Load preferences from file, or create defaults
    pub fn load() -> Result<Self> {
        let path = match Self::config_path() {
            Ok(p) => p,
            Err(_) => return Ok(Preferences::default()),
        };

        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(content) => match toml::from_str(&content) {
                    Ok(prefs) => return Ok(prefs),
                    Err(e) => tracing::warn!("Failed to parse preferences: {}", e),
                },
                Err(e) => tracing::warn!("Failed to read preferences: {}", e),
            }
        }

        let prefs = Preferences::default();
        let _ = prefs.save();
        Ok(prefs)
    }

    /// Save preferences to file
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;

        // An unknown model name (hand-edited config) falls back to the default
        let mut clean = self.clone();
        if !MODELS.contains(&clean.model.as_str()) {
            clean.model = default_model();
        }

        let content = toml::to_string_pretty(&clean)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn record_usage(&mut self, tokens: u64) {
        self.usage.messages += 1;
        self.usage.tokens += tokens;
    }

    pub fn cycle_model(&mut self) {
        let idx = MODELS.iter().position(|m| *m == self.model).unwrap_or(0);
        self.model = MODELS[(idx + 1) % MODELS.len()].to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preferences_serialization() {
        let prefs = Preferences {
            model: "gpt-4o".to_string(),
            date_format: DateFormat::DayMonthYear,
            last_category: Some("Finance".to_string()),
            usage: UsageStats { messages: 3, tokens: 1200 },
        };

        let serialized = toml::to_string_pretty(&prefs).unwrap();
        let deserialized: Preferences = toml::from_str(&serialized).unwrap();

        assert_eq!(prefs.model, deserialized.model);
        assert_eq!(prefs.date_format, deserialized.date_format);
        assert_eq!(prefs.usage.tokens, deserialized.usage.tokens);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let prefs: Preferences = toml::from_str("").unwrap();
        assert_eq!(prefs.model, "gpt-3.5-turbo");
        assert_eq!(prefs.date_format, DateFormat::YearMonthDay);
        assert_eq!(prefs.usage.messages, 0);
    }

    #[test]
    fn model_cycles_through_known_models() {
        let mut prefs = Preferences::default();
        prefs.cycle_model();
        assert_eq!(prefs.model, "gpt-4o");
        prefs.cycle_model();
        assert_eq!(prefs.model, "gpt-3.5-turbo");
    }
}
