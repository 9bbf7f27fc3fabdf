//! Bearer-authenticated request facade for the resource API.
//!
//! The facade performs one call against the configured API base and always
//! hands back a structured result: provider-returned error statuses (4xx/5xx)
//! are ordinary [`ApiResponse`] values for the caller to interpret, while
//! connection-level failures with no response surface as [`Error::Network`].
//! Token refresh is deliberately not triggered here; callers check
//! [`TokenManager::expires_at`](crate::flows::TokenManager::expires_at) and
//! refresh proactively, or retry once after a 401.

// std
use std::time::Instant;
// crates.io
use reqwest::{Method, header};
// self
use crate::{
	_prelude::*,
	error::ConfigError,
	flows::ReqwestTokenManager,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

/// HTTP methods supported by the resource API.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ApiMethod {
	/// Fetch a resource.
	Get,
	/// Create a resource; carries a JSON body.
	Post,
	/// Update a resource; carries a JSON body.
	Put,
	/// Delete a resource.
	Delete,
}
impl ApiMethod {
	/// Returns `true` when the method carries a request body.
	pub fn allows_body(self) -> bool {
		matches!(self, ApiMethod::Post | ApiMethod::Put)
	}

	fn as_reqwest(self) -> Method {
		match self {
			ApiMethod::Get => Method::GET,
			ApiMethod::Post => Method::POST,
			ApiMethod::Put => Method::PUT,
			ApiMethod::Delete => Method::DELETE,
		}
	}
}
impl Display for ApiMethod {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_reqwest().as_str())
	}
}

/// Uniform response envelope returned by [`ReqwestTokenManager::request`].
#[derive(Clone, Debug)]
pub struct ApiResponse {
	/// HTTP status code returned by the API.
	pub status: u16,
	/// Raw response body.
	pub body: Vec<u8>,
	/// Wall-clock duration of the call, for observability.
	pub elapsed: std::time::Duration,
}
impl ApiResponse {
	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}

	/// Returns the body as UTF-8 text, lossily converted.
	pub fn text(&self) -> String {
		String::from_utf8_lossy(&self.body).into_owned()
	}

	/// Deserializes the body as JSON.
	pub fn json<T>(&self) -> Result<T, serde_json::Error>
	where
		T: serde::de::DeserializeOwned,
	{
		serde_json::from_slice(&self.body)
	}
}

impl ReqwestTokenManager {
	/// Performs one authenticated call against the resource API.
	///
	/// Attaches `Authorization: Bearer <access_token>` and
	/// `Content-Type: application/json`; the body is only sent for POST/PUT.
	/// Requires an existing credential record
	/// ([`ConfigError::Unauthenticated`] otherwise); whether that record's
	/// access token is still fresh is the caller's concern.
	pub async fn request(
		&self,
		resource_path: &str,
		method: ApiMethod,
		body: Option<Vec<u8>>,
	) -> Result<ApiResponse> {
		const KIND: FlowKind = FlowKind::ApiRequest;

		let span = FlowSpan::new(KIND, "request");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span.instrument(self.request_inner(resource_path, method, body)).await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(err) => {
				self.report_failure("API request", err);
				obs::record_flow_outcome(KIND, FlowOutcome::Failure);
			},
		}

		result
	}

	async fn request_inner(
		&self,
		resource_path: &str,
		method: ApiMethod,
		body: Option<Vec<u8>>,
	) -> Result<ApiResponse> {
		let access_token =
			self.access_token().await?.ok_or(ConfigError::Unauthenticated)?;
		let url = self
			.config
			.api_base
			.join(resource_path.trim_start_matches('/'))
			.map_err(|source| ConfigError::InvalidEndpoint { source })?;
		let mut request = self
			.http_client
			.request(method.as_reqwest(), url)
			.bearer_auth(access_token.expose())
			.header(header::CONTENT_TYPE, "application/json");

		if method.allows_body()
			&& let Some(payload) = body
		{
			request = request.body(payload);
		}

		let started = Instant::now();
		let response = request.send().await.map_err(map_send_error)?;
		let status = response.status().as_u16();
		let body = response.bytes().await.map_err(map_send_error)?.to_vec();
		let elapsed = started.elapsed();

		Ok(ApiResponse { status, body, elapsed })
	}
}

fn map_send_error(err: ReqwestError) -> Error {
	if err.is_builder() {
		ConfigError::from(err).into()
	} else {
		Error::network(err)
	}
}
