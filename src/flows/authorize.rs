//! Authorization-code flow: CSRF state generation, authorize URL assembly, and
//! the code exchange.

// crates.io
use rand::{Rng, distr::Alphanumeric};
// self
use crate::{
	_prelude::*,
	auth::CredentialRecord,
	error::ConfigError,
	flows::TokenManager,
	http::TokenHttpClient,
	oauth::{TokenEndpoint, TransportErrorMapper},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

const STATE_LEN: usize = 30;

/// Authorization handshake metadata returned by [`TokenManager::start_authorization`].
///
/// The session must be held server-side until the provider's callback arrives;
/// the embedded `state` is the anti-CSRF nonce that the callback has to echo.
#[derive(Clone)]
pub struct AuthorizationSession {
	/// Opaque state value that must round-trip via the redirect handler.
	pub state: String,
	/// Redirect URI supplied when constructing the authorize URL.
	pub redirect_uri: Url,
	/// Fully-formed authorize URL that callers should send end-users to.
	pub authorize_url: Url,
}
impl AuthorizationSession {
	/// Validates the returned `state` parameter after the authorization redirect.
	///
	/// Comparison is byte-for-byte; any mismatch is a hard authentication
	/// failure and the token endpoint is never contacted.
	pub fn validate_state(&self, returned_state: &str) -> Result<()> {
		if returned_state.as_bytes() == self.state.as_bytes() {
			Ok(())
		} else {
			Err(Error::StateMismatch)
		}
	}
}
impl Debug for AuthorizationSession {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AuthorizationSession")
			.field("state", &self.state)
			.field("redirect_uri", &self.redirect_uri)
			.field("authorize_url", &self.authorize_url)
			.finish()
	}
}

/// Parameters delivered by the provider's redirect callback.
#[derive(Clone, Debug)]
pub struct AuthorizationCallback {
	/// One-time authorization code to exchange.
	pub code: String,
	/// Echoed anti-CSRF state value.
	pub state: String,
}

impl<C, M> TokenManager<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Starts an authorization attempt: generates a fresh CSRF state and the authorize URL.
	pub fn start_authorization(&self, redirect_uri: Url) -> AuthorizationSession {
		let state = random_state();
		let authorize_url = build_authorize_url(
			&self.config.authorization_endpoint,
			&self.client_id,
			&redirect_uri,
			&self.config.scope,
			&state,
		);

		AuthorizationSession { state, redirect_uri, authorize_url }
	}

	/// Exchanges the callback's authorization code for a credential record.
	///
	/// The echoed state is validated first; on mismatch the provider is never
	/// contacted. A successful exchange persists the record wholesale; on any
	/// failure the store is left untouched and the admin sink is notified.
	pub async fn exchange_authorization_code(
		&self,
		session: &AuthorizationSession,
		callback: &AuthorizationCallback,
	) -> Result<CredentialRecord> {
		const KIND: FlowKind = FlowKind::AuthorizationCode;

		let span = FlowSpan::new(KIND, "exchange_authorization_code");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span.instrument(self.exchange_inner(session, callback)).await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(err) => {
				self.report_failure("authorization-code exchange", err);
				obs::record_flow_outcome(KIND, FlowOutcome::Failure);
			},
		}

		result
	}

	async fn exchange_inner(
		&self,
		session: &AuthorizationSession,
		callback: &AuthorizationCallback,
	) -> Result<CredentialRecord> {
		session.validate_state(&callback.state)?;

		let endpoint = <TokenEndpoint<C, M>>::from_config(
			&self.config,
			&self.client_id,
			&self.client_secret,
			self.http_client.clone(),
			self.transport_mapper.clone(),
		)?;
		let grant = endpoint.exchange_code(&callback.code, &session.redirect_uri).await?;
		let refresh_token = grant.refresh_token.ok_or(ConfigError::MissingRefreshToken)?;
		let refresh_expires_in =
			grant.refresh_expires_in.ok_or(ConfigError::MissingRefreshExpiresIn)?;
		let record = CredentialRecord::builder()
			.access_token(grant.access_token)
			.issued_at(OffsetDateTime::now_utc())
			.access_expires_in(grant.expires_in)
			.refresh_token(refresh_token)
			.refresh_expires_in(refresh_expires_in)
			.build()
			.map_err(ConfigError::from)?;

		self.persist(record.clone()).await?;

		Ok(record)
	}
}

fn build_authorize_url(
	authorization_endpoint: &Url,
	client_id: &str,
	redirect_uri: &Url,
	scope: &str,
	state: &str,
) -> Url {
	let mut url = authorization_endpoint.clone();
	let mut pairs = url.query_pairs_mut();

	pairs.append_pair("response_type", "code");
	pairs.append_pair("client_id", client_id);
	pairs.append_pair("redirect_uri", redirect_uri.as_str());
	pairs.append_pair("scope", scope);
	pairs.append_pair("state", state);

	drop(pairs);

	url
}

/// Generates a 30-character alphanumeric CSRF state from a CSPRNG.
fn random_state() -> String {
	rand::rng().sample_iter(Alphanumeric).take(STATE_LEN).map(char::from).collect()
}
