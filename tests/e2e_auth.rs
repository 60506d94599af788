//! E2E tests for the OAuth login flow and session pages

mod common;

use common::{google_claims, location, query_param, session_cookie, TestServer};
use stockwatch::{auth::provider::IdentityClaims, db::Store};

#[tokio::test]
async fn test_landing_page_for_anonymous_visitor() {
    let server = TestServer::new().await;

    let res = server.client.get(server.url("/")).send().await.unwrap();
    assert_eq!(res.status(), 200);
    let body = res.text().await.unwrap();
    assert!(body.contains(r#"href="/login""#));
}

#[tokio::test]
async fn test_welcome_without_session_redirects_to_login() {
    let server = TestServer::new().await;

    let res = server.client.get(server.url("/welcome")).send().await.unwrap();
    assert_eq!(res.status(), 302);
    assert_eq!(location(&res), "/login");
}

#[tokio::test]
async fn test_login_redirects_to_provider_with_state() {
    let server = TestServer::new().await;

    let res = server.client.get(server.url("/login")).send().await.unwrap();
    assert_eq!(res.status(), 302);

    let loc = location(&res);
    assert!(loc.starts_with("https://provider.test/authorize?"));
    assert_eq!(query_param(loc, "client_id").as_deref(), Some("test-client-id"));
    assert_eq!(query_param(loc, "scope").as_deref(), Some("openid email profile"));
    assert_eq!(query_param(loc, "prompt").as_deref(), Some("consent"));
    assert_eq!(
        query_param(loc, "redirect_uri").as_deref(),
        Some("http://localhost:8000/auth")
    );
    let state = query_param(loc, "state").expect("state");
    assert!(!state.is_empty());

    let cookie = res
        .headers()
        .get("set-cookie")
        .and_then(|v| v.to_str().ok())
        .expect("set-cookie header");
    assert!(cookie.starts_with("session="));
    assert!(cookie.contains("HttpOnly"));
}

#[tokio::test]
async fn test_each_login_issues_a_fresh_state() {
    let server = TestServer::new().await;
    let (_, first) = server.begin_login().await;
    let (_, second) = server.begin_login().await;
    assert_ne!(first, second);
}

#[tokio::test]
async fn test_full_login_flow_creates_user_and_session() {
    let server = TestServer::new().await;
    server
        .provider
        .register_code("good-code", google_claims("alice@example.com", "sub-alice"));

    let (cookie, state) = server.begin_login().await;
    let res = server
        .get_with_cookie(&format!("/auth?state={state}&code=good-code"), &cookie)
        .await;
    assert_eq!(res.status(), 302);
    assert_eq!(location(&res), "/welcome");
    let cookie = session_cookie(&res).unwrap_or(cookie);

    let user = server
        .store
        .find_user_by_email("alice@example.com")
        .await
        .unwrap()
        .expect("user created");
    assert_eq!(user.username, "alice@example.com");
    assert_eq!(user.google_oauth_id.as_deref(), Some("sub-alice"));

    let res = server.get_with_cookie("/welcome", &cookie).await;
    assert_eq!(res.status(), 200);
    assert!(res.text().await.unwrap().contains("alice@example.com"));

    let res = server.get_with_cookie("/", &cookie).await;
    assert_eq!(res.status(), 302);
    assert_eq!(location(&res), "/welcome");
}

#[tokio::test]
async fn test_second_login_reuses_existing_user() {
    let server = TestServer::new().await;
    server
        .provider
        .register_code("code", google_claims("bob@example.com", "sub-bob"));

    for _ in 0..2 {
        let (cookie, state) = server.begin_login().await;
        let res = server
            .get_with_cookie(&format!("/auth?state={state}&code=code"), &cookie)
            .await;
        assert_eq!(res.status(), 302);
    }
    assert_eq!(server.store.user_count(), 1);
}

#[tokio::test]
async fn test_mismatched_state_is_rejected_before_exchange() {
    let server = TestServer::new().await;
    server
        .provider
        .register_code("good-code", google_claims("eve@example.com", "sub-eve"));

    let (cookie, _state) = server.begin_login().await;
    let res = server
        .get_with_cookie("/auth?state=forged&code=good-code", &cookie)
        .await;

    assert_eq!(res.status(), 400);
    assert_eq!(server.provider.exchange_count(), 0);
    assert_eq!(server.store.user_count(), 0);
}

#[tokio::test]
async fn test_callback_without_login_is_rejected() {
    let server = TestServer::new().await;

    let res = server
        .client
        .get(server.url("/auth?state=anything&code=x"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 400);

    let res = server.client.get(server.url("/auth")).send().await.unwrap();
    assert_eq!(res.status(), 400);
    assert_eq!(server.provider.exchange_count(), 0);
}

#[tokio::test]
async fn test_state_cannot_be_replayed() {
    let server = TestServer::new().await;
    server
        .provider
        .register_code("code", google_claims("carol@example.com", "sub-carol"));

    let (cookie, state) = server.begin_login().await;
    let path = format!("/auth?state={state}&code=code");
    assert_eq!(server.get_with_cookie(&path, &cookie).await.status(), 302);
    assert_eq!(server.get_with_cookie(&path, &cookie).await.status(), 400);
    assert_eq!(server.provider.exchange_count(), 1);
}

#[tokio::test]
async fn test_provider_rejection_renders_error_page() {
    let server = TestServer::new().await;

    let (cookie, state) = server.begin_login().await;
    let res = server
        .get_with_cookie(&format!("/auth?state={state}&code=expired"), &cookie)
        .await;

    assert_eq!(res.status(), 200);
    assert!(res.text().await.unwrap().contains("invalid_grant"));
    assert_eq!(server.provider.exchange_count(), 1);
    assert_eq!(server.store.user_count(), 0);

    let res = server.get_with_cookie("/welcome", &cookie).await;
    assert_eq!(res.status(), 302);
    assert_eq!(location(&res), "/login");
}

#[tokio::test]
async fn test_provider_denied_consent_renders_error_page() {
    let server = TestServer::new().await;

    let (cookie, state) = server.begin_login().await;
    let res = server
        .get_with_cookie(&format!("/auth?state={state}&error=access_denied"), &cookie)
        .await;

    assert_eq!(res.status(), 200);
    assert!(res.text().await.unwrap().contains("access_denied"));
    assert_eq!(server.provider.exchange_count(), 0);
}

#[tokio::test]
async fn test_missing_email_claim_creates_no_user() {
    let server = TestServer::new().await;
    server.provider.register_code(
        "no-email",
        IdentityClaims {
            sub: Some("sub-anon".into()),
            ..Default::default()
        },
    );

    let (cookie, state) = server.begin_login().await;
    let res = server
        .get_with_cookie(&format!("/auth?state={state}&code=no-email"), &cookie)
        .await;

    assert_eq!(res.status(), 401);
    assert_eq!(server.store.user_count(), 0);
    let res = server.get_with_cookie("/welcome", &cookie).await;
    assert_eq!(res.status(), 302);
}

#[tokio::test]
async fn test_concurrent_first_logins_create_one_user() {
    let server = TestServer::new().await;
    server
        .provider
        .register_code("same", google_claims("dup@example.com", "sub-dup"));

    let (cookie_a, state_a) = server.begin_login().await;
    let (cookie_b, state_b) = server.begin_login().await;
    let path_a = format!("/auth?state={state_a}&code=same");
    let path_b = format!("/auth?state={state_b}&code=same");

    let (a, b) = tokio::join!(
        server.get_with_cookie(&path_a, &cookie_a),
        server.get_with_cookie(&path_b, &cookie_b),
    );

    assert_eq!(a.status(), 302);
    assert_eq!(b.status(), 302);
    assert_eq!(server.store.user_count(), 1);
}

#[tokio::test]
async fn test_logout_clears_session_and_is_idempotent() {
    let server = TestServer::new().await;
    server
        .provider
        .register_code("code", google_claims("dave@example.com", "sub-dave"));

    let (cookie, state) = server.begin_login().await;
    let res = server
        .get_with_cookie(&format!("/auth?state={state}&code=code"), &cookie)
        .await;
    let cookie = session_cookie(&res).unwrap_or(cookie);

    for _ in 0..2 {
        let res = server.get_with_cookie("/logout", &cookie).await;
        assert_eq!(res.status(), 302);
        assert_eq!(location(&res), "/");
    }

    let res = server.get_with_cookie("/welcome", &cookie).await;
    assert_eq!(res.status(), 302);
    assert_eq!(location(&res), "/login");

    // The account itself stays.
    assert_eq!(server.store.user_count(), 1);
}

#[tokio::test]
async fn test_tampered_session_cookie_is_ignored() {
    let server = TestServer::new().await;
    server
        .provider
        .register_code("code", google_claims("mallory@example.com", "sub-m"));

    let (cookie, state) = server.begin_login().await;
    let tampered = format!("{}x", cookie);
    let res = server
        .get_with_cookie(&format!("/auth?state={state}&code=code"), &tampered)
        .await;
    assert_eq!(res.status(), 400);
    assert_eq!(server.provider.exchange_count(), 0);
}

#[tokio::test]
async fn test_login_rotates_session_id() {
    let server = TestServer::new().await;
    server
        .provider
        .register_code("code", google_claims("frank@example.com", "sub-frank"));

    let (pre_login, state) = server.begin_login().await;
    let res = server
        .get_with_cookie(&format!("/auth?state={state}&code=code"), &pre_login)
        .await;
    assert_eq!(res.status(), 302);
    let authenticated = session_cookie(&res).expect("callback sets a new session cookie");
    assert_ne!(authenticated, pre_login);

    let res = server.get_with_cookie("/welcome", &pre_login).await;
    assert_eq!(res.status(), 302);
    assert_eq!(location(&res), "/login");

    let res = server.get_with_cookie("/welcome", &authenticated).await;
    assert_eq!(res.status(), 200);
}
