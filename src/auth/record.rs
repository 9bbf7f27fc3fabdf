//! The persisted credential record, its lifecycle helpers, and a builder.

// self
use crate::{_prelude::*, auth::secret::TokenSecret};

/// Errors produced by [`CredentialRecordBuilder`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum CredentialRecordBuilderError {
	/// Issued when no access token value was provided.
	#[error("Access token is required.")]
	MissingAccessToken,
	/// Issued when no refresh token value was provided.
	#[error("Refresh token is required.")]
	MissingRefreshToken,
	/// Issued when no access token expiry (absolute or relative) was configured.
	#[error("Access token expiry must be supplied via expires_at or expires_in.")]
	MissingAccessExpiry,
	/// Issued when no refresh token expiry (absolute or relative) was configured.
	#[error("Refresh token expiry must be supplied via expires_at or expires_in.")]
	MissingRefreshExpiry,
}

/// Immutable record describing the tokens issued for one installation.
///
/// Exactly zero or one record exists per store; absence means the installation
/// has never completed the authorization flow. Both expiry instants are
/// absolute and always derived from provider-issued `expires_in` deltas at the
/// moment of issuance, never guessed. Records are replaced wholesale on every
/// successful exchange or refresh.
#[derive(Serialize, Deserialize, Clone)]
pub struct CredentialRecord {
	/// Access token secret; callers must avoid logging it.
	pub access_token: TokenSecret,
	/// Absolute access token expiry instant.
	pub access_token_expires_at: OffsetDateTime,
	/// Refresh token secret used to mint replacement access tokens.
	pub refresh_token: TokenSecret,
	/// Absolute refresh token expiry instant.
	pub refresh_token_expires_at: OffsetDateTime,
	/// Issued-at instant recorded when the provider response was processed.
	pub issued_at: OffsetDateTime,
}
impl CredentialRecord {
	/// Returns a builder for constructing replacement records.
	pub fn builder() -> CredentialRecordBuilder {
		CredentialRecordBuilder::new()
	}

	/// Returns `true` if the access token has expired at the provided instant.
	pub fn access_token_expired_at(&self, instant: OffsetDateTime) -> bool {
		instant >= self.access_token_expires_at
	}

	/// Returns `true` if the access token is expired relative to the current clock.
	pub fn access_token_expired(&self) -> bool {
		self.access_token_expired_at(OffsetDateTime::now_utc())
	}

	/// Returns `true` if the refresh token is still usable at the provided instant.
	pub fn refresh_token_valid_at(&self, instant: OffsetDateTime) -> bool {
		instant < self.refresh_token_expires_at
	}

	/// Returns `true` if the refresh token is still usable right now.
	pub fn refresh_token_valid(&self) -> bool {
		self.refresh_token_valid_at(OffsetDateTime::now_utc())
	}
}
impl Debug for CredentialRecord {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CredentialRecord")
			.field("access_token", &"<redacted>")
			.field("access_token_expires_at", &self.access_token_expires_at)
			.field("refresh_token", &"<redacted>")
			.field("refresh_token_expires_at", &self.refresh_token_expires_at)
			.field("issued_at", &self.issued_at)
			.finish()
	}
}

/// Builder for [`CredentialRecord`].
#[derive(Clone, Debug, Default)]
pub struct CredentialRecordBuilder {
	access_token: Option<TokenSecret>,
	refresh_token: Option<TokenSecret>,
	issued_at: Option<OffsetDateTime>,
	access_expires_at: Option<OffsetDateTime>,
	access_expires_in: Option<Duration>,
	refresh_expires_at: Option<OffsetDateTime>,
	refresh_expires_in: Option<Duration>,
}
impl CredentialRecordBuilder {
	fn new() -> Self {
		Self::default()
	}

	/// Sets the issued-at instant.
	pub fn issued_at(mut self, instant: OffsetDateTime) -> Self {
		self.issued_at = Some(instant);

		self
	}

	/// Provides the access token value.
	pub fn access_token(mut self, token: impl Into<String>) -> Self {
		self.access_token = Some(TokenSecret::new(token));

		self
	}

	/// Provides the refresh token value.
	pub fn refresh_token(mut self, token: impl Into<String>) -> Self {
		self.refresh_token = Some(TokenSecret::new(token));

		self
	}

	/// Sets an absolute access token expiry instant.
	pub fn access_expires_at(mut self, instant: OffsetDateTime) -> Self {
		self.access_expires_at = Some(instant);

		self
	}

	/// Sets the access token expiry relative to the issued instant.
	pub fn access_expires_in(mut self, delta: Duration) -> Self {
		self.access_expires_in = Some(delta);

		self
	}

	/// Sets an absolute refresh token expiry instant.
	pub fn refresh_expires_at(mut self, instant: OffsetDateTime) -> Self {
		self.refresh_expires_at = Some(instant);

		self
	}

	/// Sets the refresh token expiry relative to the issued instant.
	pub fn refresh_expires_in(mut self, delta: Duration) -> Self {
		self.refresh_expires_in = Some(delta);

		self
	}

	/// Consumes the builder and produces a [`CredentialRecord`].
	pub fn build(self) -> Result<CredentialRecord, CredentialRecordBuilderError> {
		let access_token =
			self.access_token.ok_or(CredentialRecordBuilderError::MissingAccessToken)?;
		let refresh_token =
			self.refresh_token.ok_or(CredentialRecordBuilderError::MissingRefreshToken)?;
		let issued_at = self.issued_at.unwrap_or_else(OffsetDateTime::now_utc);
		let access_token_expires_at = match (self.access_expires_at, self.access_expires_in) {
			(Some(instant), _) => instant,
			(None, Some(delta)) => issued_at + delta,
			(None, None) => return Err(CredentialRecordBuilderError::MissingAccessExpiry),
		};
		let refresh_token_expires_at = match (self.refresh_expires_at, self.refresh_expires_in) {
			(Some(instant), _) => instant,
			(None, Some(delta)) => issued_at + delta,
			(None, None) => return Err(CredentialRecordBuilderError::MissingRefreshExpiry),
		};

		Ok(CredentialRecord {
			access_token,
			access_token_expires_at,
			refresh_token,
			refresh_token_expires_at,
			issued_at,
		})
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	#[test]
	fn builder_derives_absolute_expiries_from_deltas() {
		let issued = macros::datetime!(2025-06-01 12:00 UTC);
		let record = CredentialRecord::builder()
			.access_token("access")
			.refresh_token("refresh")
			.issued_at(issued)
			.access_expires_in(Duration::seconds(300))
			.refresh_expires_in(Duration::days(31))
			.build()
			.expect("Record builder should accept relative expiries.");

		assert_eq!(record.access_token_expires_at, issued + Duration::seconds(300));
		assert_eq!(record.refresh_token_expires_at, issued + Duration::days(31));
	}

	#[test]
	fn builder_rejects_missing_fields() {
		let err = CredentialRecord::builder()
			.refresh_token("refresh")
			.access_expires_in(Duration::hours(1))
			.refresh_expires_in(Duration::days(1))
			.build()
			.expect_err("Missing access token should fail.");

		assert_eq!(err, CredentialRecordBuilderError::MissingAccessToken);

		let err = CredentialRecord::builder()
			.access_token("access")
			.refresh_token("refresh")
			.refresh_expires_in(Duration::days(1))
			.build()
			.expect_err("Missing access expiry should fail.");

		assert_eq!(err, CredentialRecordBuilderError::MissingAccessExpiry);
	}

	#[test]
	fn expiry_helpers_track_the_clock() {
		let issued = macros::datetime!(2025-06-01 00:00 UTC);
		let record = CredentialRecord::builder()
			.access_token("access")
			.refresh_token("refresh")
			.issued_at(issued)
			.access_expires_in(Duration::minutes(5))
			.refresh_expires_in(Duration::days(1))
			.build()
			.expect("Record builder should succeed for expiry helper coverage.");

		assert!(!record.access_token_expired_at(macros::datetime!(2025-06-01 00:04 UTC)));
		assert!(record.access_token_expired_at(macros::datetime!(2025-06-01 00:05 UTC)));
		assert!(record.refresh_token_valid_at(macros::datetime!(2025-06-01 23:59 UTC)));
		assert!(!record.refresh_token_valid_at(macros::datetime!(2025-06-02 00:00 UTC)));
	}

	#[test]
	fn debug_output_redacts_secrets() {
		let record = CredentialRecord::builder()
			.access_token("visible-access")
			.refresh_token("visible-refresh")
			.access_expires_in(Duration::hours(1))
			.refresh_expires_in(Duration::days(1))
			.build()
			.expect("Record builder should succeed for redaction coverage.");
		let rendered = format!("{record:?}");

		assert!(!rendered.contains("visible-access"));
		assert!(!rendered.contains("visible-refresh"));
		assert!(rendered.contains("<redacted>"));
	}
}
