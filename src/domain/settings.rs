//! User settings domain types
//!
//! Company details and pricing defaults for one user.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ai::AiProvider;
use super::pricing::check_amount;

pub const DEFAULT_COMPANY_NAME: &str = "My Electrical Company";
pub const DEFAULT_HOURLY_RATE: f64 = 75.0;
pub const DEFAULT_MARKUP_PERCENTAGE: f64 = 20.0;

/// UI theme preference
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dark => "dark",
            Self::Light => "light",
        }
    }

    pub fn from_db(s: &str) -> Self {
        match s {
            "light" => Self::Light,
            _ => Self::Dark,
        }
    }
}

/// Response DTO for user settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSettingsResponse {
    pub company_name: String,
    pub company_email: Option<String>,
    pub company_phone: Option<String>,
    pub company_address: Option<String>,
    pub default_hourly_rate: f64,
    pub default_markup_percentage: f64,
    pub preferred_ai_provider: AiProvider,
    pub theme: Theme,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Default for UserSettingsResponse {
    fn default() -> Self {
        Self {
            company_name: DEFAULT_COMPANY_NAME.to_string(),
            company_email: None,
            company_phone: None,
            company_address: None,
            default_hourly_rate: DEFAULT_HOURLY_RATE,
            default_markup_percentage: DEFAULT_MARKUP_PERCENTAGE,
            preferred_ai_provider: AiProvider::default(),
            theme: Theme::default(),
            updated_at: None,
        }
    }
}

/// Request DTO for updating user settings (partial)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateUserSettingsRequest {
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub company_email: Option<String>,
    #[serde(default)]
    pub company_phone: Option<String>,
    #[serde(default)]
    pub company_address: Option<String>,
    #[serde(default)]
    pub default_hourly_rate: Option<f64>,
    #[serde(default)]
    pub default_markup_percentage: Option<f64>,
    #[serde(default)]
    pub preferred_ai_provider: Option<AiProvider>,
    #[serde(default)]
    pub theme: Option<Theme>,
}

impl UpdateUserSettingsRequest {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if let Some(name) = &self.company_name {
            if name.trim().is_empty() {
                errors.push("company_name must not be empty".to_string());
            }
        }
        if let Some(rate) = self.default_hourly_rate {
            check_amount(&mut errors, "default_hourly_rate", rate);
        }
        if let Some(markup) = self.default_markup_percentage {
            check_amount(&mut errors, "default_markup_percentage", markup);
            if markup > 100.0 {
                errors.push("default_markup_percentage must be at most 100".to_string());
            }
        }

        errors
    }

    /// Apply the provided fields over `current`.
    pub fn apply(&self, current: UserSettingsResponse) -> UserSettingsResponse {
        UserSettingsResponse {
            company_name: self
                .company_name
                .as_ref()
                .map(|s| s.trim().to_string())
                .unwrap_or(current.company_name),
            company_email: self.company_email.clone().or(current.company_email),
            company_phone: self.company_phone.clone().or(current.company_phone),
            company_address: self.company_address.clone().or(current.company_address),
            default_hourly_rate: self
                .default_hourly_rate
                .unwrap_or(current.default_hourly_rate),
            default_markup_percentage: self
                .default_markup_percentage
                .unwrap_or(current.default_markup_percentage),
            preferred_ai_provider: self
                .preferred_ai_provider
                .unwrap_or(current.preferred_ai_provider),
            theme: self.theme.unwrap_or(current.theme),
            updated_at: current.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_new_account_values() {
        let settings = UserSettingsResponse::default();
        assert_eq!(settings.company_name, "My Electrical Company");
        assert_eq!(settings.default_hourly_rate, 75.0);
        assert_eq!(settings.default_markup_percentage, 20.0);
        assert_eq!(settings.preferred_ai_provider, AiProvider::Openai);
        assert_eq!(settings.theme, Theme::Dark);
    }

    #[test]
    fn markup_is_capped_at_one_hundred() {
        let req = UpdateUserSettingsRequest {
            default_markup_percentage: Some(120.0),
            ..Default::default()
        };
        assert_eq!(req.validate().len(), 1);
    }

    #[test]
    fn apply_keeps_unspecified_fields() {
        let req = UpdateUserSettingsRequest {
            default_hourly_rate: Some(95.0),
            preferred_ai_provider: Some(AiProvider::Anthropic),
            ..Default::default()
        };
        let updated = req.apply(UserSettingsResponse::default());

        assert_eq!(updated.default_hourly_rate, 95.0);
        assert_eq!(updated.preferred_ai_provider, AiProvider::Anthropic);
        assert_eq!(updated.default_markup_percentage, 20.0);
        assert_eq!(updated.company_name, DEFAULT_COMPANY_NAME);
    }
}
