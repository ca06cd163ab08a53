//! Health check infrastructure for AppContext components
//!
//! Provides HealthStatus and ComponentHealth types for monitoring service health.

use serde::{Deserialize, Serialize};

/// Share of healthy components required for an overall healthy status
const HEALTHY_THRESHOLD: f64 = 0.8;

/// Overall health status of the service
///
/// # Example
/// ```
/// use careline_api::utils::health::{ComponentHealth, HealthStatus};
///
/// let mut status = HealthStatus::new()
///     .add_component(ComponentHealth::healthy("database"))
///     .add_component(ComponentHealth::unhealthy("calendar", "gateway unreachable"));
/// status.calculate_score();
///
/// assert_eq!(status.score, 0.5);
/// assert!(!status.is_healthy);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    /// Overall health indicator
    pub is_healthy: bool,

    /// Health score from 0.0 (completely unhealthy) to 1.0 (fully healthy)
    pub score: f64,

    /// Optional message describing overall health state
    pub message: Option<String>,

    /// Individual component health checks
    pub components: Vec<ComponentHealth>,

    /// Unix timestamp when health check was performed
    pub timestamp: i64,
}

impl HealthStatus {
    /// Healthy with score 1.0 and no components.
    pub fn new() -> Self {
        Self {
            is_healthy: true,
            score: 1.0,
            message: None,
            components: Vec::new(),
            timestamp: chrono::Utc::now().timestamp(),
        }
    }

    /// Add a component health check to the status
    pub fn add_component(mut self, component: ComponentHealth) -> Self {
        self.components.push(component);
        self
    }

    /// Score = healthy / total; healthy when the score reaches 80%.
    ///
    /// Call after all components have been added.
    pub fn calculate_score(&mut self) {
        if self.components.is_empty() {
            return;
        }

        let healthy_count = self.components.iter().filter(|c| c.is_healthy).count();

        self.score = healthy_count as f64 / self.components.len() as f64;
        self.is_healthy = self.score >= HEALTHY_THRESHOLD;
        if !self.is_healthy {
            let failing: Vec<&str> = self
                .components
                .iter()
                .filter(|c| !c.is_healthy)
                .map(|c| c.name.as_str())
                .collect();
            self.message = Some(format!("unhealthy components: {}", failing.join(", ")));
        }
    }
}

impl Default for HealthStatus {
    fn default() -> Self {
        Self::new()
    }
}

/// Health status of an individual component
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    /// Component identifier (e.g., "database", "calendar")
    pub name: String,

    pub is_healthy: bool,

    /// Optional message describing health state or error
    pub message: Option<String>,
}

impl ComponentHealth {
    pub fn healthy(name: impl Into<String>) -> Self {
        Self { name: name.into(), is_healthy: true, message: None }
    }

    /// Healthy, with an informational note.
    pub fn healthy_with(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self { name: name.into(), is_healthy: true, message: Some(message.into()) }
    }

    pub fn unhealthy(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self { name: name.into(), is_healthy: false, message: Some(message.into()) }
    }
}
