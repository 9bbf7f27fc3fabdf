//! Internal facade over the `oauth2` crate for the provider's token endpoint.
//!
//! Sage's token endpoint returns a non-standard `refresh_token_expires_in`
//! field alongside the RFC 6749 ones, so the facade configures the `oauth2`
//! client with [`SageTokenFields`] as extra token fields and normalizes every
//! response into a [`TokenGrant`] before the flows turn it into a credential
//! record. Client authentication uses `client_secret_post`, matching the
//! provider.

pub use oauth2;

// std
use std::borrow::Cow;
// crates.io
use oauth2::{
	AuthType, AuthUrl, AuthorizationCode, Client, ClientId, ClientSecret, EndpointNotSet,
	EndpointSet, ExtraTokenFields, HttpClientError, RedirectUrl, RefreshToken, RequestTokenError,
	StandardRevocableToken, StandardTokenResponse, TokenResponse, TokenUrl,
	basic::{
		BasicErrorResponse, BasicRevocationErrorResponse, BasicTokenIntrospectionResponse,
		BasicTokenType,
	},
};
// self
use crate::{
	_prelude::*,
	error::ConfigError,
	http::{ResponseMetadata, ResponseMetadataSlot, TokenHttpClient},
	provider::ProviderConfig,
};

/// Non-standard fields Sage attaches to its token responses.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SageTokenFields {
	/// Lifetime of the freshly issued refresh token, in seconds.
	pub refresh_token_expires_in: Option<u64>,
}
impl ExtraTokenFields for SageTokenFields {}

/// Token response type carrying the provider's extra fields.
pub type SageTokenResponse = StandardTokenResponse<SageTokenFields, BasicTokenType>;

type ConfiguredSageClient = Client<
	BasicErrorResponse,
	SageTokenResponse,
	BasicTokenIntrospectionResponse,
	StandardRevocableToken,
	BasicRevocationErrorResponse,
	EndpointSet,
	EndpointNotSet,
	EndpointNotSet,
	EndpointNotSet,
	EndpointSet,
>;
type SageRequestTokenError<E> = RequestTokenError<HttpClientError<E>, BasicErrorResponse>;

/// OAuth 2.0 grant types exercised by this client.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GrantType {
	/// Authorization Code grant.
	AuthorizationCode,
	/// Refresh Token grant.
	RefreshToken,
}
impl GrantType {
	/// Returns the RFC 6749 identifier for the grant type.
	pub fn as_str(self) -> &'static str {
		match self {
			GrantType::AuthorizationCode => "authorization_code",
			GrantType::RefreshToken => "refresh_token",
		}
	}
}
impl Display for GrantType {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Maps HTTP transport failures into client [`Error`] values.
pub trait TransportErrorMapper<E>
where
	Self: 'static + Send + Sync,
	E: 'static + Send + Sync + StdError,
{
	/// Converts an [`HttpClientError`] emitted by the transport into a client error.
	fn map_transport_error(
		&self,
		grant: GrantType,
		metadata: Option<&ResponseMetadata>,
		error: HttpClientError<E>,
	) -> Error;
}

/// Default mapper for reqwest-backed transports.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransportErrorMapper;
#[cfg(feature = "reqwest")]
impl TransportErrorMapper<ReqwestError> for ReqwestTransportErrorMapper {
	fn map_transport_error(
		&self,
		grant: GrantType,
		meta: Option<&ResponseMetadata>,
		err: HttpClientError<ReqwestError>,
	) -> Error {
		let _ = (grant, meta);

		match err {
			HttpClientError::Reqwest(inner) =>
				if inner.is_builder() {
					ConfigError::from(*inner).into()
				} else {
					Error::network(*inner)
				},
			HttpClientError::Http(inner) => ConfigError::HttpRequest(inner).into(),
			HttpClientError::Io(inner) => Error::network(inner),
			HttpClientError::Other(message) => Error::Network { source: message.into() },
			_ => Error::Network { source: "Unknown transport failure.".into() },
		}
	}
}

/// Normalized token endpoint result, prior to record assembly.
#[derive(Clone, Debug)]
pub(crate) struct TokenGrant {
	/// Freshly issued access token.
	pub access_token: String,
	/// Access token lifetime reported by the provider.
	pub expires_in: Duration,
	/// Rotated refresh token, when the provider issued one.
	pub refresh_token: Option<String>,
	/// Refresh token lifetime, when the provider reported one.
	pub refresh_expires_in: Option<Duration>,
}

pub(crate) struct TokenEndpoint<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	oauth_client: ConfiguredSageClient,
	http_client: Arc<C>,
	error_mapper: Arc<M>,
}
impl<C, M> TokenEndpoint<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	pub(crate) fn from_config(
		config: &ProviderConfig,
		client_id: &str,
		client_secret: &str,
		http_client: Arc<C>,
		error_mapper: Arc<M>,
	) -> Result<Self> {
		let auth_url = AuthUrl::new(config.authorization_endpoint.to_string())
			.map_err(|source| ConfigError::InvalidEndpoint { source })?;
		let token_url = TokenUrl::new(config.token_endpoint.to_string())
			.map_err(|source| ConfigError::InvalidEndpoint { source })?;
		// Sage expects client_id/client_secret in the POST body.
		let oauth_client = Client::new(ClientId::new(client_id.to_owned()))
			.set_client_secret(ClientSecret::new(client_secret.to_owned()))
			.set_auth_uri(auth_url)
			.set_token_uri(token_url)
			.set_auth_type(AuthType::RequestBody);

		Ok(Self { oauth_client, http_client, error_mapper })
	}

	/// Performs the `authorization_code` grant for the provided callback code.
	pub(crate) async fn exchange_code(&self, code: &str, redirect_uri: &Url) -> Result<TokenGrant> {
		let meta = ResponseMetadataSlot::default();
		let instrumented = self.http_client.with_metadata(meta.clone());
		let redirect_url = RedirectUrl::new(redirect_uri.to_string())
			.map_err(|source| ConfigError::InvalidRedirect { source })?;
		let response = self
			.oauth_client
			.exchange_code(AuthorizationCode::new(code.to_owned()))
			.set_redirect_uri(Cow::Owned(redirect_url))
			.request_async(&instrumented)
			.await
			.map_err(|err| {
				map_request_error(
					GrantType::AuthorizationCode,
					meta.take(),
					err,
					self.error_mapper.as_ref(),
				)
			})?;

		map_token_response(response)
	}

	/// Performs the `refresh_token` grant for the provided refresh secret.
	pub(crate) async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant> {
		let meta = ResponseMetadataSlot::default();
		let instrumented = self.http_client.with_metadata(meta.clone());
		let refresh_secret = RefreshToken::new(refresh_token.to_owned());
		let response = self
			.oauth_client
			.exchange_refresh_token(&refresh_secret)
			.request_async(&instrumented)
			.await
			.map_err(|err| {
				map_request_error(GrantType::RefreshToken, meta.take(), err, self.error_mapper.as_ref())
			})?;

		map_token_response(response)
	}
}

fn map_token_response(response: SageTokenResponse) -> Result<TokenGrant> {
	let expires_in = response.expires_in().ok_or(ConfigError::MissingExpiresIn)?.as_secs();
	let expires_in = i64::try_from(expires_in).map_err(|_| ConfigError::ExpiresInOutOfRange)?;

	if expires_in <= 0 {
		return Err(ConfigError::NonPositiveExpiresIn.into());
	}

	let refresh_expires_in = response
		.extra_fields()
		.refresh_token_expires_in
		.map(|secs| i64::try_from(secs).map_err(|_| ConfigError::ExpiresInOutOfRange))
		.transpose()?
		.map(Duration::seconds);

	Ok(TokenGrant {
		access_token: response.access_token().secret().to_owned(),
		expires_in: Duration::seconds(expires_in),
		refresh_token: response.refresh_token().map(|token| token.secret().to_owned()),
		refresh_expires_in,
	})
}

fn map_request_error<E, M>(
	grant: GrantType,
	meta: Option<ResponseMetadata>,
	err: SageRequestTokenError<E>,
	mapper: &M,
) -> Error
where
	E: 'static + Send + Sync + StdError,
	M: ?Sized + TransportErrorMapper<E>,
{
	let meta_ref = meta.as_ref();

	match err {
		RequestTokenError::ServerResponse(response) => {
			let code = response.error().as_ref().to_string();
			let message = match response.error_description() {
				Some(description) => format!("{code}: {description}"),
				None => code.clone(),
			};

			if is_grant_rejection(&code) {
				Error::InvalidGrant { reason: message }
			} else {
				Error::ProviderHttp { status: meta_status(meta_ref).unwrap_or(400), message }
			}
		},
		RequestTokenError::Request(error) => mapper.map_transport_error(grant, meta_ref, error),
		RequestTokenError::Parse(error, _body) =>
			Error::MalformedResponse { source: error, status: meta_status(meta_ref) },
		RequestTokenError::Other(message) => Error::ProviderHttp {
			status: meta_status(meta_ref).unwrap_or(0),
			message: format!("Token endpoint returned an unexpected response: {message}"),
		},
	}
}

fn is_grant_rejection(code: &str) -> bool {
	code.eq_ignore_ascii_case("invalid_grant") || code.eq_ignore_ascii_case("access_denied")
}

fn meta_status(meta: Option<&ResponseMetadata>) -> Option<u16> {
	meta.and_then(|value| value.status)
}
