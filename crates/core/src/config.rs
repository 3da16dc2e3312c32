use serde::{Deserialize, Serialize};

/// Knowledge-base policy settings shared by every core component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KbConfig {
    /// Locale of origin documents; the only locale that may be localizable.
    pub default_locale: String,
    /// Titles starting with this prefix mark template documents.
    pub template_title_prefix: String,
    /// Title template for redirect stubs, with `{old}` and `{number}` placeholders.
    pub redirect_title_template: String,
    /// Slug template for redirect stubs, with `{old}` and `{number}` placeholders.
    pub redirect_slug_template: String,
    /// Channel capacity of the `DocumentChanged` event bus.
    pub event_bus_capacity: usize,
}

impl Default for KbConfig {
    fn default() -> Self {
        Self {
            default_locale: "en-US".to_string(),
            template_title_prefix: "Template:".to_string(),
            redirect_title_template: "{old} Redirect {number}".to_string(),
            redirect_slug_template: "{old}-redirect-{number}".to_string(),
            event_bus_capacity: 1024,
        }
    }
}

impl KbConfig {
    pub fn with_default_locale(mut self, locale: impl Into<String>) -> Self {
        self.default_locale = locale.into();
        self
    }
}
