//! Refresh-token flow with a singleflight guard around check-and-refresh.
//!
//! Sage invalidates a refresh token on first use, so two callers racing
//! through `grant_type=refresh_token` would strand the loser with a dead
//! secret. [`TokenManager::refresh_access_token`] therefore holds an async
//! mutex for the whole load-validate-exchange-persist sequence; a caller that
//! was queued behind a successful refresh re-reads the freshly stored record
//! instead of spending the rotated token again.

mod metrics;

pub use metrics::RefreshMetrics;

// self
use crate::{
	_prelude::*,
	auth::CredentialRecord,
	flows::TokenManager,
	http::TokenHttpClient,
	oauth::{TokenEndpoint, TransportErrorMapper},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

impl<C, M> TokenManager<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Renews the access token via the `refresh_token` grant.
	///
	/// Requires a persisted record whose refresh token has not expired;
	/// otherwise [`Error::NoValidRefreshToken`] is returned and the store is
	/// left as-is. On success the record is replaced wholesale, including a
	/// rotated refresh token when the provider issued one (a response that
	/// omits it retains the previous secret and its expiry). On failure the
	/// previous record stays untouched so the old token keeps working until
	/// the next successful refresh.
	pub async fn refresh_access_token(&self) -> Result<CredentialRecord> {
		const KIND: FlowKind = FlowKind::Refresh;

		let span = FlowSpan::new(KIND, "refresh_access_token");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);
		self.refresh_metrics.record_attempt();

		let guard = self.refresh_guard();
		let result = span
			.instrument(async {
				let _singleflight = guard.lock().await;

				self.refresh_inner().await
			})
			.await;

		match &result {
			Ok(_) => {
				self.refresh_metrics.record_success();
				obs::record_flow_outcome(KIND, FlowOutcome::Success);
			},
			Err(err) => {
				self.refresh_metrics.record_failure();
				self.report_failure("token refresh", err);
				obs::record_flow_outcome(KIND, FlowOutcome::Failure);
			},
		}

		result
	}

	async fn refresh_inner(&self) -> Result<CredentialRecord> {
		let now = OffsetDateTime::now_utc();
		let current = self
			.current_record()
			.await?
			.filter(|record| record.refresh_token_valid_at(now))
			.ok_or(Error::NoValidRefreshToken)?;
		let endpoint = <TokenEndpoint<C, M>>::from_config(
			&self.config,
			&self.client_id,
			&self.client_secret,
			self.http_client.clone(),
			self.transport_mapper.clone(),
		)?;
		let grant = endpoint.refresh(current.refresh_token.expose()).await?;
		let issued_at = OffsetDateTime::now_utc();
		let mut builder = CredentialRecord::builder()
			.access_token(grant.access_token)
			.issued_at(issued_at)
			.access_expires_in(grant.expires_in);

		// Providers may rotate the refresh token; keep the previous one when they do not.
		builder = match grant.refresh_token {
			Some(rotated) => {
				let builder = builder.refresh_token(rotated);

				match grant.refresh_expires_in {
					Some(delta) => builder.refresh_expires_in(delta),
					None => builder.refresh_expires_at(current.refresh_token_expires_at),
				}
			},
			None => builder
				.refresh_token(current.refresh_token.expose())
				.refresh_expires_at(current.refresh_token_expires_at),
		};

		let record = builder.build().map_err(crate::error::ConfigError::from)?;

		self.persist(record.clone()).await?;

		Ok(record)
	}
}
