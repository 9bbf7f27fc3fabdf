#![cfg(feature = "reqwest")]

// crates.io
use httpmock::prelude::*;
// self
use sage_oauth::{
	_preludet::*,
	flows::AuthorizationCallback,
	provider::ProviderConfig,
	store::CredentialStore,
};

const CLIENT_ID: &str = "client-auth-code";
const CLIENT_SECRET: &str = "secret-auth-code";

fn build_config(server: &MockServer) -> ProviderConfig {
	ProviderConfig::builder()
		.authorization_endpoint(
			Url::parse(&server.url("/authorize"))
				.expect("Mock authorize endpoint should parse successfully."),
		)
		.token_endpoint(
			Url::parse(&server.url("/token"))
				.expect("Mock token endpoint should parse successfully."),
		)
		.api_base(
			Url::parse(&server.url("/api/")).expect("Mock API base should parse successfully."),
		)
		.build()
		.expect("Provider config should build successfully.")
}

fn redirect_uri() -> Url {
	Url::parse("https://example.com/callback").expect("Redirect fixture should parse successfully.")
}

#[tokio::test]
async fn exchange_persists_a_full_credential_record() {
	let server = MockServer::start_async().await;
	let config = build_config(&server);
	let (manager, store) = build_reqwest_test_manager(config, CLIENT_ID, CLIENT_SECRET);
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200)
				.header("content-type", "application/json")
				.body(
					"{\"access_token\":\"access-fresh\",\"refresh_token\":\"refresh-fresh\",\"token_type\":\"bearer\",\"expires_in\":300,\"refresh_token_expires_in\":2678400}",
				);
		})
		.await;
	let session = manager.start_authorization(redirect_uri());
	let callback =
		AuthorizationCallback { code: "one-time-code".into(), state: session.state.clone() };
	let before = OffsetDateTime::now_utc();
	let record = manager
		.exchange_authorization_code(&session, &callback)
		.await
		.expect("Authorization-code exchange should succeed.");

	mock.assert_async().await;

	assert_eq!(record.access_token.expose(), "access-fresh");
	assert_eq!(record.refresh_token.expose(), "refresh-fresh");

	// Expiries are derived from the provider-issued deltas at issuance time.
	let access_delta = record.access_token_expires_at - before;

	assert!(access_delta >= Duration::seconds(295) && access_delta <= Duration::seconds(305));

	let refresh_delta = record.refresh_token_expires_at - before;

	assert!(
		refresh_delta >= Duration::seconds(2_678_395) && refresh_delta <= Duration::seconds(2_678_405)
	);

	let persisted = store
		.load()
		.await
		.expect("Store load should succeed after the exchange.")
		.expect("Record should be persisted after the exchange.");

	assert_eq!(persisted.access_token.expose(), "access-fresh");

	let memoized = manager
		.access_token()
		.await
		.expect("Access token accessor should succeed.")
		.expect("Access token should be available after the exchange.");

	assert_eq!(memoized.expose(), "access-fresh");
}

#[tokio::test]
async fn state_mismatch_never_contacts_the_token_endpoint() {
	let server = MockServer::start_async().await;
	let config = build_config(&server);
	let (manager, store) = build_reqwest_test_manager(config, CLIENT_ID, CLIENT_SECRET);
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"never\",\"token_type\":\"bearer\",\"expires_in\":300}");
		})
		.await;
	let session = manager.start_authorization(redirect_uri());
	let callback =
		AuthorizationCallback { code: "one-time-code".into(), state: "forged-state".into() };
	let err = manager
		.exchange_authorization_code(&session, &callback)
		.await
		.expect_err("A forged state must be rejected.");

	assert!(matches!(err, Error::StateMismatch));

	mock.assert_calls_async(0).await;

	assert!(
		store.load().await.expect("Store load should succeed.").is_none(),
		"A rejected exchange must leave the store empty.",
	);
}

#[tokio::test]
async fn rejected_code_surfaces_invalid_grant_and_leaves_store_untouched() {
	let server = MockServer::start_async().await;
	let config = build_config(&server);
	let (manager, store) = build_reqwest_test_manager(config, CLIENT_ID, CLIENT_SECRET);
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(400)
				.header("content-type", "application/json")
				.body("{\"error\":\"invalid_grant\",\"error_description\":\"code expired\"}");
		})
		.await;
	let session = manager.start_authorization(redirect_uri());
	let callback =
		AuthorizationCallback { code: "expired-code".into(), state: session.state.clone() };
	let err = manager
		.exchange_authorization_code(&session, &callback)
		.await
		.expect_err("An expired code must surface a typed error.");

	assert!(matches!(err, Error::InvalidGrant { .. }));
	assert!(err.to_string().contains("code expired"));

	mock.assert_async().await;

	assert!(
		store.load().await.expect("Store load should succeed.").is_none(),
		"A failed exchange must leave the store empty.",
	);
}

#[tokio::test]
async fn authorize_url_embeds_the_session_state() {
	let server = MockServer::start_async().await;
	let config = build_config(&server);
	let (manager, _store) = build_reqwest_test_manager(config, CLIENT_ID, CLIENT_SECRET);
	let session = manager.start_authorization(redirect_uri());

	assert_eq!(session.state.len(), 30);

	let state_param = session
		.authorize_url
		.query_pairs()
		.find(|(key, _)| key == "state")
		.map(|(_, value)| value.into_owned())
		.expect("Authorize URL should carry a state parameter.");

	assert_eq!(state_param, session.state);
}
