use std::sync::Arc;
use std::time::Duration as StdDuration;

use backoffice_api::app::{AppServices, build_app};
use backoffice_auth::{Hs256JwtCodec, Permissions};
use backoffice_client::{BackofficeClient, ClientError, Session};
use backoffice_infra::seed::seed_admin;
use backoffice_infra::{InMemoryOutbox, InMemoryStore, SeedAdmin};
use chrono::{Duration, Utc};

const ADMIN_EMAIL: &str = "admin@example.com";
const ADMIN_PASSWORD: &str = "Adm1n@pass";

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn(access_ttl: Duration, refresh_ttl: Duration) -> Self {
        let store = Arc::new(InMemoryStore::with_sample_locations());
        let admin = SeedAdmin {
            email: ADMIN_EMAIL.into(),
            password: ADMIN_PASSWORD.into(),
        };
        seed_admin(store.as_ref(), &admin, Utc::now())
            .await
            .expect("failed to seed admin");

        let jwt = Hs256JwtCodec::new(b"client-test-secret", access_ttl, refresh_ttl);
        let services = Arc::new(AppServices::new(store, Arc::new(InMemoryOutbox::new()), jwt));
        let app = build_app(services, None);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[tokio::test]
async fn login_then_typed_calls() {
    let srv = TestServer::spawn(Duration::minutes(15), Duration::days(7)).await;
    let client = BackofficeClient::new(&srv.base_url);

    let session = client.login(ADMIN_EMAIL, ADMIN_PASSWORD).await.unwrap();
    assert_eq!(session.roles, ["Administrator"]);
    assert!(session.has(Permissions::all()));

    let me = client.whoami().await.unwrap();
    assert_eq!(me.user_id, session.user_id);
    assert_eq!(client.countries().await.unwrap().len(), 3);

    let err = client.login(ADMIN_EMAIL, "wrong").await.unwrap_err();
    assert_eq!(err.status(), Some(401));
}

#[tokio::test]
async fn access_token_is_renewed_then_session_expires_with_refresh_token() {
    // The margin exceeds the access lifetime, so every authenticated call
    // renews first.
    let srv = TestServer::spawn(Duration::seconds(1), Duration::seconds(2)).await;
    let client = BackofficeClient::new(&srv.base_url).refresh_margin(Duration::seconds(5));

    let first = client.login(ADMIN_EMAIL, ADMIN_PASSWORD).await.unwrap();
    let me = client.whoami().await.unwrap();
    assert_eq!(me.user_id, first.user_id);

    let renewed = client.session().await.unwrap();
    assert_ne!(renewed.access_token, first.access_token);
    assert!(renewed.refresh_expires_at >= first.refresh_expires_at);

    tokio::time::sleep(StdDuration::from_millis(2_500)).await;

    let err = client.whoami().await.unwrap_err();
    assert!(matches!(err, ClientError::SessionExpired), "{err:?}");
    assert!(client.session().await.is_none());
    assert!(matches!(client.whoami().await.unwrap_err(), ClientError::NotAuthenticated));
}

#[tokio::test]
async fn rejected_refresh_token_ends_the_session() {
    let srv = TestServer::spawn(Duration::minutes(15), Duration::days(7)).await;
    let client = BackofficeClient::new(&srv.base_url);
    let session = client.login(ADMIN_EMAIL, ADMIN_PASSWORD).await.unwrap();

    let now = Utc::now();
    client
        .restore(Session {
            access_token: session.access_token.clone(),
            refresh_token: "not-a-jwt".into(),
            access_expires_at: now - Duration::seconds(1),
            refresh_expires_at: now + Duration::days(1),
            ..session
        })
        .await;

    let err = client.countries().await.unwrap_err();
    assert!(matches!(err, ClientError::SessionExpired), "{err:?}");
    assert!(client.session().await.is_none());
}
