// ============================================================================
// Service Discovery
// ============================================================================
//
// Maps a route's service name to a base URL. Static (config-backed) today;
// the trait keeps the seam for registry-backed discovery.
//
// ============================================================================

use anyhow::Result;

use crate::config::ServiceEndpoints;

pub trait ServiceDiscovery: Send + Sync {
    /// Base URL for a given service name.
    fn service_url(&self, service_name: &str) -> Result<String>;
}

/// Static service discovery backed by configured endpoints.
pub struct StaticServiceDiscovery {
    endpoints: ServiceEndpoints,
}

impl StaticServiceDiscovery {
    pub fn new(endpoints: ServiceEndpoints) -> Self {
        Self { endpoints }
    }
}

impl ServiceDiscovery for StaticServiceDiscovery {
    fn service_url(&self, service_name: &str) -> Result<String> {
        match service_name {
            "user" => Ok(self.endpoints.user_service_url.clone()),
            "freelancer" => Ok(self.endpoints.freelancer_service_url.clone()),
            "project" => Ok(self.endpoints.project_service_url.clone()),
            "payment" => Ok(self.endpoints.payment_service_url.clone()),
            "notification" => Ok(self.endpoints.notification_service_url.clone()),
            _ => anyhow::bail!("unknown service: {}", service_name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_configured_urls_and_rejects_unknown_names() {
        let discovery = StaticServiceDiscovery::new(ServiceEndpoints {
            user_service_url: "http://user:8081".to_string(),
            freelancer_service_url: "http://freelancer:8082".to_string(),
            project_service_url: "http://project:8083".to_string(),
            payment_service_url: "http://payment:8084".to_string(),
            notification_service_url: "http://notification:8085".to_string(),
        });
        assert_eq!(discovery.service_url("user").unwrap(), "http://user:8081");
        assert_eq!(
            discovery.service_url("project").unwrap(),
            "http://project:8083"
        );
        assert!(discovery.service_url("billing").is_err());
    }
}
