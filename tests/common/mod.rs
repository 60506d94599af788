//! Common test utilities for E2E tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use stockwatch::{
    app::build_app,
    auth::provider::{
        build_authorization_url, IdentityClaims, IdentityProvider, ProviderError, ProviderLogin,
    },
    config::AppConfig,
    db::{MemoryStore, NewUser, Store, User},
    session::MemorySessionStore,
    state::AppState,
};
use tokio::net::TcpListener;
use url::Url;

/// Stands in for the identity provider.
///
/// Codes registered with `register_code` exchange successfully; any other code
/// is rejected with `invalid_grant`. Bearer tokens of the form
/// `id-token:<email>` verify to that email.
#[derive(Default)]
pub struct FakeProvider {
    codes: Mutex<HashMap<String, IdentityClaims>>,
    exchanges: AtomicUsize,
}

impl FakeProvider {
    pub fn register_code(&self, code: &str, claims: IdentityClaims) {
        self.codes
            .lock()
            .unwrap()
            .insert(code.to_string(), claims);
    }

    pub fn exchange_count(&self) -> usize {
        self.exchanges.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityProvider for FakeProvider {
    fn authorization_url(&self, state: &str) -> Result<Url, ProviderError> {
        build_authorization_url(&AppConfig::for_tests().oauth, state)
    }

    async fn exchange_code(&self, code: &str) -> Result<ProviderLogin, ProviderError> {
        self.exchanges.fetch_add(1, Ordering::SeqCst);
        let claims = self.codes.lock().unwrap().get(code).cloned();
        match claims {
            Some(claims) => Ok(ProviderLogin {
                access_token: format!("access-{code}"),
                claims,
            }),
            None => Err(ProviderError::Rejected {
                error: "invalid_grant".into(),
                description: Some("Malformed auth code.".into()),
            }),
        }
    }

    async fn verify_token(&self, token: &str) -> Result<IdentityClaims, ProviderError> {
        token
            .strip_prefix("id-token:")
            .map(IdentityClaims::with_email)
            .ok_or(ProviderError::MalformedToken("unknown test token"))
    }
}

pub fn bearer_for(email: &str) -> String {
    format!("Bearer id-token:{email}")
}

pub fn google_claims(email: &str, sub: &str) -> IdentityClaims {
    IdentityClaims {
        sub: Some(sub.to_string()),
        email_verified: Some(true),
        name: Some("Test User".to_string()),
        ..IdentityClaims::with_email(email)
    }
}

/// Test server instance
pub struct TestServer {
    pub addr: String,
    pub store: Arc<MemoryStore>,
    pub provider: Arc<FakeProvider>,
    pub client: reqwest::Client,
}

impl TestServer {
    pub async fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let provider = Arc::new(FakeProvider::default());
        let state = AppState::from_parts(
            store.clone(),
            Arc::new(MemorySessionStore::new()),
            provider.clone(),
            Arc::new(AppConfig::for_tests()),
        );

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = build_app(state);
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(Duration::from_secs(10))
            .build()
            .expect("failed to build no-redirect client");

        Self {
            addr: format!("http://{}", addr),
            store,
            provider,
            client,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    pub async fn create_user(&self, email: &str) -> User {
        self.store
            .create_user(NewUser::from_oauth(email, None))
            .await
            .expect("create user")
    }

    /// GET /login and return the session cookie plus the issued state.
    pub async fn begin_login(&self) -> (String, String) {
        let res = self.client.get(self.url("/login")).send().await.unwrap();
        assert_eq!(res.status(), 302);
        let cookie = session_cookie(&res).expect("login sets session cookie");
        let state = query_param(location(&res), "state").expect("state in redirect");
        (cookie, state)
    }

    pub async fn get_with_cookie(&self, path: &str, cookie: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .header("Cookie", cookie)
            .send()
            .await
            .unwrap()
    }
}

pub fn location(res: &reqwest::Response) -> &str {
    res.headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .expect("location header")
}

pub fn query_param(url: &str, name: &str) -> Option<String> {
    Url::parse(url)
        .ok()?
        .query_pairs()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.into_owned())
}

/// `session=<value>` from the response's Set-Cookie header.
pub fn session_cookie(res: &reqwest::Response) -> Option<String> {
    res.headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("session="))
        .and_then(|v| v.split(';').next())
        .map(str::to_string)
}
