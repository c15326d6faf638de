use crate::UnifyError;

/// Model name that marks a routing endpoint such as `router@q:1|c:4e-07`.
pub const ROUTER_MODEL: &str = "router";

/// Split `model@provider` into its two parts.
pub fn split_endpoint(endpoint: &str) -> Result<(&str, &str), UnifyError> {
    match endpoint.split_once('@') {
        Some((model, provider)) if !model.is_empty() && !provider.is_empty() => {
            Ok((model, provider))
        }
        _ => Err(UnifyError::usage(format!(
            "endpoint '{endpoint}' must be of the form 'model@provider'"
        ))),
    }
}

/// Routing endpoints pick the provider per request and are never listed.
pub fn is_router(endpoint: &str) -> bool {
    endpoint
        .split('@')
        .next()
        .is_some_and(|model| model.starts_with(ROUTER_MODEL))
}

/// The `endpoint` / `model` / `provider` triple kept in sync by the clients.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EndpointIdentity {
    endpoint: Option<String>,
    model: Option<String>,
    provider: Option<String>,
}

impl EndpointIdentity {
    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }

    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    pub fn provider(&self) -> Option<&str> {
        self.provider.as_deref()
    }

    /// An endpoint fixes both model and provider, so it cannot be combined with either.
    pub(crate) fn check_exclusive(
        endpoint: Option<&str>,
        model: Option<&str>,
        provider: Option<&str>,
    ) -> Result<(), UnifyError> {
        if endpoint.is_some() && (model.is_some() || provider.is_some()) {
            return Err(UnifyError::usage(
                "if the endpoint is provided, neither the model nor the provider should be",
            ));
        }
        Ok(())
    }

    /// Set the endpoint, checking it against `valid` unless `valid` is `None`.
    pub(crate) fn apply_endpoint(
        &mut self,
        endpoint: &str,
        valid: Option<&[String]>,
    ) -> Result<(), UnifyError> {
        let (model, provider) = split_endpoint(endpoint)?;
        if let Some(valid) = valid {
            ensure_listed("endpoint", endpoint, valid)?;
        }
        self.model = Some(model.to_string());
        self.provider = Some(provider.to_string());
        self.endpoint = Some(endpoint.to_string());
        Ok(())
    }

    pub(crate) fn apply_model(&mut self, model: &str, valid: &[String]) -> Result<(), UnifyError> {
        ensure_listed("model", model, valid)?;
        self.model = Some(model.to_string());
        self.rederive();
        Ok(())
    }

    pub(crate) fn apply_provider(
        &mut self,
        provider: &str,
        valid: &[String],
    ) -> Result<(), UnifyError> {
        ensure_listed("provider", provider, valid)?;
        self.provider = Some(provider.to_string());
        self.rederive();
        Ok(())
    }

    /// Record the provider that served a response, read from its `model` field.
    ///
    /// Routing endpoints keep their routing string; ids without `@` are ignored.
    pub(crate) fn record_served_by(&mut self, served_model: &str) {
        if self.endpoint.as_deref().is_some_and(is_router) {
            return;
        }
        let Some((_, provider)) = served_model.rsplit_once('@') else {
            return;
        };
        if provider.is_empty() || self.provider.as_deref() == Some(provider) {
            return;
        }
        log::debug!("response served by provider {provider}");
        self.provider = Some(provider.to_string());
        self.rederive();
    }

    fn rederive(&mut self) {
        if let (Some(model), Some(provider)) = (&self.model, &self.provider) {
            self.endpoint = Some(format!("{model}@{provider}"));
        }
    }
}

fn ensure_listed(what: &str, value: &str, valid: &[String]) -> Result<(), UnifyError> {
    if valid.iter().any(|v| v == value) {
        Ok(())
    } else {
        Err(UnifyError::usage(format!(
            "Current {what} '{value}' is not one of the supported values: {}",
            valid.join(", ")
        )))
    }
}
