//! Provider registry and acquisition ordering.
//!
//! The registry holds every known backend with its reliability tier and the
//! domains it serves. Acquisition tries providers serving a requested domain
//! first, then everyone else; within each of those groups providers are
//! ordered by reliability tier (high first).

use crate::provider::{ProviderDescriptor, Reliability};
use tracing::debug;

/// Aggregate statistics about registered providers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceStats {
    /// Number of registered providers.
    pub total_providers: usize,
    /// Number of distinct domains across all providers.
    pub total_domains: usize,
    /// Number of providers in the high-reliability tier.
    pub high_reliability_providers: usize,
    /// Every known domain, registration order, deduplicated.
    pub domains: Vec<String>,
}

/// Ordered collection of backend descriptors.
#[derive(Debug, Clone, Default)]
pub struct ProviderRegistry {
    providers: Vec<ProviderDescriptor>,
}

impl ProviderRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry pre-populated with the built-in backends.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(crate::providers::mailtm::descriptor());
        registry.register(crate::providers::guerrilla::descriptor());
        registry
    }

    /// Creates a registry with the built-in backends using explicit HTTP settings.
    #[must_use]
    pub fn with_defaults_for(settings: &crate::providers::HttpSettings) -> Self {
        let mut registry = Self::new();
        registry.register(crate::providers::mailtm::descriptor_with(settings.clone()));
        registry.register(crate::providers::guerrilla::descriptor_with(settings.clone()));
        registry
    }

    /// Appends a provider. Later registrations sort after earlier ones within
    /// the same reliability tier.
    pub fn register(&mut self, descriptor: ProviderDescriptor) {
        debug!(
            provider = descriptor.name,
            reliability = %descriptor.reliability,
            "Registered provider"
        );
        self.providers.push(descriptor);
    }

    /// Returns the registered descriptors in registration order.
    #[must_use]
    pub fn providers(&self) -> &[ProviderDescriptor] {
        &self.providers
    }

    /// Returns true when no providers are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Returns descriptors in acquisition order.
    ///
    /// When `preferred_domain` is given, every provider serving that domain
    /// comes before every provider that does not, regardless of tier. Each
    /// group is then sorted by reliability tier; the stable sort keeps
    /// registration order within a tier.
    #[must_use]
    pub fn ordered_for(&self, preferred_domain: Option<&str>) -> Vec<ProviderDescriptor> {
        let mut ordered = self.providers.clone();
        ordered.sort_by_key(|desc| {
            let serves_preferred = preferred_domain
                .is_some_and(|domain| desc.domains.iter().any(|d| d == domain));
            (u8::from(!serves_preferred), desc.reliability.rank())
        });
        ordered
    }

    /// Every domain served by any provider, registration order, deduplicated.
    #[must_use]
    pub fn domains(&self) -> Vec<String> {
        let mut seen = Vec::new();
        for desc in &self.providers {
            for domain in &desc.domains {
                if !seen.contains(domain) {
                    seen.push(domain.clone());
                }
            }
        }
        seen
    }

    /// Aggregate statistics for diagnostics.
    #[must_use]
    pub fn stats(&self) -> ServiceStats {
        let domains = self.domains();
        ServiceStats {
            total_providers: self.providers.len(),
            total_domains: domains.len(),
            high_reliability_providers: self
                .providers
                .iter()
                .filter(|desc| desc.reliability == Reliability::High)
                .count(),
            domains,
        }
    }
}
