//! Tenant profile as reported by the backend's tenant info endpoint.

use serde::{Deserialize, Serialize};

/// Tenant profile returned by `/api/v1/tenant/info`.
///
/// Only the fields the dashboard reads are modelled; anything else the
/// backend sends is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantInfo {
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default = "default_plan")]
    pub plan_type: String,
    #[serde(default)]
    pub is_active: bool,
}

fn default_plan() -> String {
    "free".to_string()
}

impl TenantInfo {
    /// Name to show in the UI, preferring the display name.
    pub fn label(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(&self.name)
    }

    pub fn is_on_plan(&self, plan: &str) -> bool {
        self.plan_type.eq_ignore_ascii_case(plan)
    }

    pub fn is_pro_or_higher(&self) -> bool {
        self.is_on_plan("pro") || self.is_on_plan("enterprise")
    }
}
