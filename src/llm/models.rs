use super::retry::RetryPolicy;
use crate::config::Config;

/// One model in a fallback chain, with its own retry budget
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelStep {
    pub model: String,
    pub policy: RetryPolicy,
}

/// Ordered list of models to try. Later entries only run once every earlier
/// entry has exhausted its retries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelChain {
    steps: Vec<ModelStep>,
}

impl ModelChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then(mut self, model: impl Into<String>, policy: RetryPolicy) -> Self {
        self.steps.push(ModelStep {
            model: model.into(),
            policy,
        });
        self
    }

    /// Primary then fallback, each with the full retry budget.
    pub fn analysis(config: &Config, policy: RetryPolicy) -> Self {
        Self::new()
            .then(&config.primary_model, policy)
            .then(&config.fallback_model, policy)
    }

    /// Verifier primary then fallback, one attempt each.
    pub fn verification(config: &Config) -> Self {
        Self::new()
            .then(&config.verifier_model, RetryPolicy::none())
            .then(&config.verifier_fallback_model, RetryPolicy::none())
    }

    pub fn steps(&self) -> &[ModelStep] {
        &self.steps
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analysis_chain_order() {
        let config = Config::default();
        let chain = ModelChain::analysis(&config, RetryPolicy::default());
        let models: Vec<_> = chain.steps().iter().map(|s| s.model.as_str()).collect();
        assert_eq!(
            models,
            vec![config.primary_model.as_str(), config.fallback_model.as_str()]
        );
        assert!(chain.steps().iter().all(|s| s.policy.retries == 2));
    }

    #[test]
    fn test_verification_chain_has_no_retries() {
        let chain = ModelChain::verification(&Config::default());
        assert_eq!(chain.steps().len(), 2);
        assert!(chain.steps().iter().all(|s| s.policy.retries == 0));
    }
}
