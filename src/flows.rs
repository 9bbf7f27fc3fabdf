//! Token lifecycle orchestration: authorization, refresh, and cached access.

pub mod authorize;
pub mod refresh;

pub use authorize::*;
pub use refresh::RefreshMetrics;

// self
use crate::{
	_prelude::*,
	auth::{CredentialRecord, TokenSecret},
	http::TokenHttpClient,
	notify::{AdminNotifier, default_notifier},
	oauth::TransportErrorMapper,
	provider::ProviderConfig,
	store::CredentialStore,
};
#[cfg(feature = "reqwest")]
use crate::{http::ReqwestHttpClient, oauth::ReqwestTransportErrorMapper};

#[cfg(feature = "reqwest")]
/// Manager specialized for the crate's default reqwest transport stack.
pub type ReqwestTokenManager = TokenManager<ReqwestHttpClient, ReqwestTransportErrorMapper>;

/// Coordinates the credential lifecycle for one Sage installation.
///
/// The manager owns the HTTP client, credential store, provider configuration,
/// and notification sink so the individual flows can focus on grant-specific
/// logic. It memoizes the loaded record for its own lifetime; a store miss is
/// re-checked on the next access rather than cached as a failure. Refresh
/// policy stays with the caller: nothing here refreshes implicitly, so check
/// [`expires_at`](Self::expires_at) before API calls (or retry once after a
/// 401) and invoke [`refresh_access_token`](Self::refresh_access_token)
/// explicitly.
#[derive(Clone)]
pub struct TokenManager<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// HTTP client wrapper used for every outbound provider request.
	pub http_client: Arc<C>,
	/// Mapper applied to transport-layer errors before surfacing them to callers.
	pub transport_mapper: Arc<M>,
	/// Credential store that persists the singleton record.
	pub store: Arc<dyn CredentialStore>,
	/// Provider endpoint configuration.
	pub config: ProviderConfig,
	/// OAuth 2.0 client identifier used in every grant.
	pub client_id: String,
	/// OAuth 2.0 client secret sent in the token request body.
	pub client_secret: String,
	/// Sink notified about every recoverable token-operation failure.
	pub notifier: Arc<dyn AdminNotifier>,
	/// Shared metrics recorder for refresh flow outcomes.
	pub refresh_metrics: Arc<RefreshMetrics>,
	cache: Arc<Mutex<Option<CredentialRecord>>>,
	refresh_guard: Arc<AsyncMutex<()>>,
}
impl<C, M> TokenManager<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a manager that reuses the caller-provided transport + mapper pair.
	pub fn with_http_client(
		store: Arc<dyn CredentialStore>,
		config: ProviderConfig,
		client_id: impl Into<String>,
		client_secret: impl Into<String>,
		http_client: impl Into<Arc<C>>,
		mapper: impl Into<Arc<M>>,
	) -> Self {
		Self {
			http_client: http_client.into(),
			transport_mapper: mapper.into(),
			store,
			config,
			client_id: client_id.into(),
			client_secret: client_secret.into(),
			notifier: default_notifier(),
			refresh_metrics: Default::default(),
			cache: Default::default(),
			refresh_guard: Default::default(),
		}
	}

	/// Sets or replaces the admin notification sink.
	pub fn with_notifier(mut self, notifier: Arc<dyn AdminNotifier>) -> Self {
		self.notifier = notifier;

		self
	}

	/// Returns the current credential record, loading it from the store on first use.
	///
	/// Only a present record is memoized; `None` is re-checked against the
	/// store on every call so a concurrent authorization becomes visible.
	pub async fn current_record(&self) -> Result<Option<CredentialRecord>> {
		if let Some(record) = self.cache.lock().clone() {
			return Ok(Some(record));
		}

		let loaded = self.store.load().await?;

		if let Some(record) = &loaded {
			*self.cache.lock() = Some(record.clone());
		}

		Ok(loaded)
	}

	/// Returns the current access token, or `None` when unauthenticated.
	pub async fn access_token(&self) -> Result<Option<TokenSecret>> {
		Ok(self.current_record().await?.map(|record| record.access_token))
	}

	/// Returns the absolute access token expiry, or `None` when unauthenticated.
	pub async fn expires_at(&self) -> Result<Option<OffsetDateTime>> {
		Ok(self.current_record().await?.map(|record| record.access_token_expires_at))
	}

	/// Returns the current refresh token, or `None` when unauthenticated.
	pub async fn refresh_token(&self) -> Result<Option<TokenSecret>> {
		Ok(self.current_record().await?.map(|record| record.refresh_token))
	}

	/// Persists a replacement record and updates the memo cache.
	pub(crate) async fn persist(&self, record: CredentialRecord) -> Result<()> {
		self.store.save(record.clone()).await?;
		*self.cache.lock() = Some(record);

		Ok(())
	}

	pub(crate) fn refresh_guard(&self) -> Arc<AsyncMutex<()>> {
		self.refresh_guard.clone()
	}

	pub(crate) fn report_failure(&self, operation: &str, err: &Error) {
		self.notifier.warn(&format!("Sage OAuth {operation} failed: {err}"));
	}
}
#[cfg(feature = "reqwest")]
impl TokenManager<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Creates a manager with the default reqwest transport (10-second timeout,
	/// redirects disabled).
	pub fn new(
		store: Arc<dyn CredentialStore>,
		config: ProviderConfig,
		client_id: impl Into<String>,
		client_secret: impl Into<String>,
	) -> Result<Self> {
		let http_client = ReqwestHttpClient::new()?;

		Ok(Self::with_http_client(
			store,
			config,
			client_id,
			client_secret,
			http_client,
			Arc::new(ReqwestTransportErrorMapper),
		))
	}
}
impl<C, M> Debug for TokenManager<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenManager")
			.field("config", &self.config)
			.field("client_id", &self.client_id)
			.field("client_secret", &"<redacted>")
			.finish()
	}
}
