//! Provider endpoint configuration with Sage Accounting v3.1 defaults.
//!
//! The client targets a single provider, so configuration is a small validated
//! struct rather than a descriptor registry: HTTPS-only endpoints, the
//! resource API base, and the fixed scope requested during authorization.
//! [`ProviderConfig::sage_accounting`] returns the stock production endpoints;
//! the builder exists so tests can point every URL at a mock server.

// self
use crate::_prelude::*;

/// Stock Sage authorization endpoint, pre-filtered to the v3.1 API.
const SAGE_AUTHORIZATION_ENDPOINT: &str = "https://www.sageone.com/oauth2/auth/central?filter=apiv3.1";
/// Stock Sage token endpoint.
const SAGE_TOKEN_ENDPOINT: &str = "https://oauth.accounting.sage.com/token";
/// Stock Sage Accounting v3.1 resource API base.
const SAGE_API_BASE: &str = "https://api.accounting.sage.com/v3.1/";
/// Scope granting full read/write access to the accounting data.
const SAGE_SCOPE: &str = "full_access";

/// Errors raised while constructing or validating a provider configuration.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum ProviderConfigError {
	/// Authorization endpoint is required for the authorization-code flow.
	#[error("Missing authorization endpoint.")]
	MissingAuthorizationEndpoint,
	/// Token endpoint is mandatory for every grant.
	#[error("Missing token endpoint.")]
	MissingTokenEndpoint,
	/// API base URL is required by the request facade.
	#[error("Missing API base URL.")]
	MissingApiBase,
	/// Endpoints must use HTTPS.
	#[error("The {endpoint} endpoint must use HTTPS: {url}.")]
	InsecureEndpoint {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Endpoint URL that failed validation.
		url: String,
	},
	/// Scope must not be empty or contain whitespace.
	#[error("Invalid scope: {scope:?}.")]
	InvalidScope {
		/// The rejected scope value.
		scope: String,
	},
}

/// Immutable provider configuration consumed by flows and the API facade.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
	/// Authorization endpoint used for the browser redirect.
	pub authorization_endpoint: Url,
	/// Token endpoint used for exchanges and refreshes.
	pub token_endpoint: Url,
	/// Base URL of the resource API.
	pub api_base: Url,
	/// Scope requested during authorization.
	pub scope: String,
}
impl ProviderConfig {
	/// Returns the stock Sage Accounting v3.1 configuration.
	pub fn sage_accounting() -> Self {
		// The constants are well-formed by construction.
		Self {
			authorization_endpoint: Url::parse(SAGE_AUTHORIZATION_ENDPOINT)
				.expect("Stock authorization endpoint must parse."),
			token_endpoint: Url::parse(SAGE_TOKEN_ENDPOINT)
				.expect("Stock token endpoint must parse."),
			api_base: Url::parse(SAGE_API_BASE).expect("Stock API base must parse."),
			scope: SAGE_SCOPE.into(),
		}
	}

	/// Creates an empty builder for custom endpoints (e.g., a mock server).
	pub fn builder() -> ProviderConfigBuilder {
		ProviderConfigBuilder::default()
	}

	fn validate(&self) -> Result<(), ProviderConfigError> {
		validate_endpoint("authorization", &self.authorization_endpoint)?;
		validate_endpoint("token", &self.token_endpoint)?;
		validate_endpoint("API base", &self.api_base)?;
		validate_scope(&self.scope)?;

		Ok(())
	}
}

/// Builder for [`ProviderConfig`] values.
#[derive(Debug, Default)]
pub struct ProviderConfigBuilder {
	/// Optional authorization endpoint.
	pub authorization_endpoint: Option<Url>,
	/// Optional token endpoint.
	pub token_endpoint: Option<Url>,
	/// Optional resource API base URL.
	pub api_base: Option<Url>,
	/// Scope requested during authorization; defaults to `full_access`.
	pub scope: Option<String>,
}
impl ProviderConfigBuilder {
	/// Sets the authorization endpoint.
	pub fn authorization_endpoint(mut self, url: Url) -> Self {
		self.authorization_endpoint = Some(url);

		self
	}

	/// Sets the token endpoint.
	pub fn token_endpoint(mut self, url: Url) -> Self {
		self.token_endpoint = Some(url);

		self
	}

	/// Sets the resource API base URL.
	pub fn api_base(mut self, url: Url) -> Self {
		self.api_base = Some(url);

		self
	}

	/// Overrides the requested scope.
	pub fn scope(mut self, scope: impl Into<String>) -> Self {
		self.scope = Some(scope.into());

		self
	}

	/// Consumes the builder and validates the resulting configuration.
	pub fn build(self) -> Result<ProviderConfig, ProviderConfigError> {
		let authorization_endpoint = self
			.authorization_endpoint
			.ok_or(ProviderConfigError::MissingAuthorizationEndpoint)?;
		let token_endpoint =
			self.token_endpoint.ok_or(ProviderConfigError::MissingTokenEndpoint)?;
		let api_base = self.api_base.ok_or(ProviderConfigError::MissingApiBase)?;
		let config = ProviderConfig {
			authorization_endpoint,
			token_endpoint,
			api_base,
			scope: self.scope.unwrap_or_else(|| SAGE_SCOPE.into()),
		};

		config.validate()?;

		Ok(config)
	}
}

fn validate_endpoint(name: &'static str, url: &Url) -> Result<(), ProviderConfigError> {
	if url.scheme() != "https" {
		Err(ProviderConfigError::InsecureEndpoint { endpoint: name, url: url.to_string() })
	} else {
		Ok(())
	}
}

fn validate_scope(scope: &str) -> Result<(), ProviderConfigError> {
	if scope.is_empty() || scope.chars().any(char::is_whitespace) {
		Err(ProviderConfigError::InvalidScope { scope: scope.to_owned() })
	} else {
		Ok(())
	}
}
