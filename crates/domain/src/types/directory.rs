//! Display names for calendar events

use serde::{Deserialize, Serialize};

/// Name fields of a patient or professional
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonName {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl PersonName {
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            first_name: Some(first_name.into()),
            last_name: Some(last_name.into()),
            display_name: None,
        }
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    /// `display_name` if present, else `"first last"`. `None` when every
    /// part is blank.
    pub fn display(&self) -> Option<String> {
        if let Some(display) = non_blank(self.display_name.as_deref()) {
            return Some(display.to_string());
        }

        let parts: Vec<&str> = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .filter_map(non_blank)
            .collect();
        (!parts.is_empty()).then(|| parts.join(" "))
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

/// Names resolved for one calendar event, fallbacks already applied
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedNames {
    pub patient: String,
    pub professional: String,
    pub service: String,
}
