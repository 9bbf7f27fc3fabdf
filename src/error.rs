//! Client-level error types shared across flows, stores, and the API facade.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical client error exposed by public APIs.
///
/// Every variant is recoverable from the caller's perspective; a failed token
/// operation never mutates the persisted credential record, so the previous
/// token keeps working until a refresh succeeds.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),

	/// Provider rejected the grant (bad or expired code/refresh token).
	#[error("Provider rejected the grant: {reason}.")]
	InvalidGrant {
		/// Provider- or client-supplied reason string.
		reason: String,
	},
	/// The `state` returned by the authorization redirect did not match the generated value.
	#[error("Authorization state mismatch.")]
	StateMismatch,
	/// No credential record exists, or its refresh token has expired.
	#[error("No valid refresh token is available.")]
	NoValidRefreshToken,
	/// Transport failure (DNS, TCP, TLS, timeout); no HTTP status is available.
	#[error("Network error occurred while calling the provider.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Provider returned a body that could not be parsed as a token response.
	#[error("Provider returned a malformed token response.")]
	MalformedResponse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::error::Error>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Provider answered with an error status that is not a grant rejection.
	#[error("Provider returned HTTP {status}: {message}.")]
	ProviderHttp {
		/// HTTP status code returned by the token endpoint.
		status: u16,
		/// Provider- or client-supplied message summarizing the failure.
		message: String,
	},
}
impl Error {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}

/// Configuration and validation failures raised by the client.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// Provider configuration contains an invalid URL.
	#[error("Provider configuration contains an invalid URL.")]
	InvalidEndpoint {
		/// Underlying parsing failure.
		#[source]
		source: oauth2::url::ParseError,
	},
	/// Redirect URI cannot be parsed.
	#[error("Redirect URI is invalid.")]
	InvalidRedirect {
		/// Underlying parsing failure.
		#[source]
		source: oauth2::url::ParseError,
	},

	/// No credential record exists yet; the installation has not been authorized.
	#[error("No credential record is available; complete the authorization flow first.")]
	Unauthenticated,
	/// Token endpoint response omitted `expires_in`.
	#[error("Token endpoint response is missing expires_in.")]
	MissingExpiresIn,
	/// Token endpoint response omitted the refresh token.
	#[error("Token endpoint response is missing the refresh token.")]
	MissingRefreshToken,
	/// Token endpoint response omitted `refresh_token_expires_in`.
	#[error("Token endpoint response is missing refresh_token_expires_in.")]
	MissingRefreshExpiresIn,
	/// Token endpoint returned an excessively large expiry delta.
	#[error("The expires_in value exceeds the supported range.")]
	ExpiresInOutOfRange,
	/// Token endpoint returned a non-positive duration.
	#[error("The expires_in value must be positive.")]
	NonPositiveExpiresIn,
	/// Credential record builder validation failed.
	#[error("Unable to build credential record.")]
	RecordBuild(#[from] crate::auth::CredentialRecordBuilderError),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<reqwest::Error> for ConfigError {
	fn from(e: reqwest::Error) -> Self {
		Self::http_client_build(e)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::store::StoreError;
	use std::error::Error as StdError;

	#[test]
	fn store_error_converts_into_client_error_with_source() {
		let store_error = StoreError::Backend { message: "disk unreachable".into() };
		let client_error: Error = store_error.clone().into();

		assert!(matches!(client_error, Error::Storage(_)));
		assert!(client_error.to_string().contains("disk unreachable"));

		let source = StdError::source(&client_error)
			.expect("Client error should expose the original store error as its source.");

		assert_eq!(source.to_string(), store_error.to_string());
	}

	#[test]
	fn provider_http_error_reports_status() {
		let err = Error::ProviderHttp { status: 503, message: "upstream maintenance".into() };

		assert!(err.to_string().contains("503"));
		assert!(err.to_string().contains("upstream maintenance"));
	}
}
