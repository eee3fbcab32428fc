use std::{
    collections::HashMap,
    net::SocketAddr,
    path::Path,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use axum::{
    Form, Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::Utc;
use serde_json::json;

use spotify_history::{
    config::Config,
    error::{AuthError, PollError},
    management::{
        Authenticator, Browser, CredentialStore, HistoryCollector, HistoryStore, PollOutcome,
    },
    spotify::{PlaybackSource, SpotifyPlayerClient, SpotifyTokenClient, TokenEndpoint},
    types::CredentialBundle,
    utils::generate_code_challenge,
};

#[derive(Clone, Default)]
struct MockSpotify {
    token_calls: Arc<AtomicUsize>,
    player_calls: Arc<AtomicUsize>,
    forms: Arc<Mutex<Vec<HashMap<String, String>>>>,
}

impl MockSpotify {
    fn last_form(&self) -> HashMap<String, String> {
        self.forms.lock().unwrap().last().cloned().unwrap()
    }
}

async fn token(
    State(mock): State<MockSpotify>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    mock.token_calls.fetch_add(1, Ordering::SeqCst);
    mock.forms.lock().unwrap().push(form.clone());

    let field = |key: &str| form.get(key).map(String::as_str);
    match field("grant_type") {
        Some("authorization_code") if field("code") == Some("good-code") => Json(json!({
            "access_token": "t1",
            "token_type": "Bearer",
            "refresh_token": "r1",
            "expires_in": 3600
        }))
        .into_response(),
        // Spotify may omit the refresh token on refresh
        Some("refresh_token") if field("refresh_token") == Some("r1") => Json(json!({
            "access_token": "t2",
            "token_type": "Bearer",
            "expires_in": 3600
        }))
        .into_response(),
        _ => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "invalid_grant" })),
        )
            .into_response(),
    }
}

async fn currently_playing(State(mock): State<MockSpotify>, headers: HeaderMap) -> Response {
    mock.player_calls.fetch_add(1, Ordering::SeqCst);

    let bearer = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .unwrap_or_default();

    match bearer {
        "t1" | "t2" | "playing" => Json(json!({
            "is_playing": true,
            "item": {
                "id": "track-1",
                "name": "Paranoid Android",
                "artists": [{ "name": "Radiohead" }, { "name": "Someone Else" }],
                "album": { "name": "OK Computer" },
                "duration_ms": 383000,
                "popularity": 77
            }
        }))
        .into_response(),
        "ad" => Json(json!({ "is_playing": true, "item": null })).into_response(),
        "idle" => StatusCode::NO_CONTENT.into_response(),
        "broken" => (StatusCode::INTERNAL_SERVER_ERROR, "upstream failure").into_response(),
        _ => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": { "status": 401, "message": "The access token expired" } })),
        )
            .into_response(),
    }
}

async fn spawn_mock() -> (SocketAddr, MockSpotify) {
    let mock = MockSpotify::default();
    let app = Router::new()
        .route("/api/token", post(token))
        .route("/v1/me/player/currently-playing", get(currently_playing))
        .with_state(mock.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, mock)
}

fn free_port() -> u16 {
    let probe = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    probe.local_addr().unwrap().port()
}

fn test_config(mock: SocketAddr, base: &Path) -> Config {
    let port = free_port();
    let vars: HashMap<&str, String> = HashMap::from([
        ("SPOTIFY_CLIENT_ID", "test-client".to_string()),
        ("SPOTIFY_AUTH_URL", format!("http://{}/authorize", mock)),
        ("SPOTIFY_TOKEN_URL", format!("http://{}/api/token", mock)),
        ("SPOTIFY_API_URL", format!("http://{}/v1/", mock)),
        ("SPOTIFY_HISTORY_CALLBACK_ADDR", format!("127.0.0.1:{}", port)),
        (
            "SPOTIFY_HISTORY_REDIRECT_URI",
            format!("http://127.0.0.1:{}/callback", port),
        ),
        ("SPOTIFY_HISTORY_LOGIN_TIMEOUT_SECS", "5".to_string()),
    ]);
    Config::from_lookup(|k| vars.get(k).cloned(), base.to_path_buf()).unwrap()
}

fn direct_client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

/// Approves the login by calling the redirect URI with a fixed code.
struct ApprovingBrowser {
    opened: Mutex<Vec<String>>,
}

impl Browser for ApprovingBrowser {
    fn open(&self, url: &str) {
        self.opened.lock().unwrap().push(url.to_string());

        let parsed = url::Url::parse(url).unwrap();
        let redirect = parsed
            .query_pairs()
            .find(|(k, _)| k == "redirect_uri")
            .map(|(_, v)| v.into_owned())
            .unwrap();
        tokio::spawn(async move {
            let _ = direct_client()
                .get(format!("{}?code=good-code", redirect))
                .send()
                .await;
        });
    }
}

#[tokio::test]
async fn test_exchange_code_pkce_posts_expected_form() {
    let (addr, mock) = spawn_mock().await;
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(addr, dir.path());
    let client = SpotifyTokenClient::with_client(direct_client(), &config);

    let response = client
        .exchange_code_pkce("good-code", "the-verifier")
        .await
        .unwrap();
    assert_eq!(response.access_token, "t1");
    assert_eq!(response.refresh_token.as_deref(), Some("r1"));
    assert_eq!(response.expires_in, 3600);

    let form = mock.last_form();
    assert_eq!(form["grant_type"], "authorization_code");
    assert_eq!(form["code"], "good-code");
    assert_eq!(form["code_verifier"], "the-verifier");
    assert_eq!(form["client_id"], "test-client");
    assert_eq!(form["redirect_uri"], config.redirect_uri);
}

#[tokio::test]
async fn test_exchange_code_pkce_rejected() {
    let (addr, _mock) = spawn_mock().await;
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(addr, dir.path());
    let client = SpotifyTokenClient::with_client(direct_client(), &config);

    let err = client
        .exchange_code_pkce("bad-code", "the-verifier")
        .await
        .unwrap_err();
    match err {
        AuthError::TokenExchange(msg) => {
            assert!(msg.starts_with("400"));
            assert!(msg.contains("invalid_grant"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_refresh_token_without_new_refresh_token() {
    let (addr, mock) = spawn_mock().await;
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(addr, dir.path());
    let client = SpotifyTokenClient::with_client(direct_client(), &config);

    let response = client.refresh_token("r1").await.unwrap();
    assert_eq!(response.access_token, "t2");
    assert_eq!(response.refresh_token, None);

    let form = mock.last_form();
    assert_eq!(form["grant_type"], "refresh_token");
    assert_eq!(form["refresh_token"], "r1");
    assert_eq!(form["client_id"], "test-client");

    // The bundle keeps the refresh token it already had
    let bundle = CredentialBundle::from_response(response, Some("r1"), Utc::now()).unwrap();
    assert_eq!(bundle.refresh_token, "r1");
}

#[tokio::test]
async fn test_currently_playing_statuses() {
    let (addr, mock) = spawn_mock().await;
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(addr, dir.path());
    let client = SpotifyPlayerClient::with_client(direct_client(), &config);

    let item = client.currently_playing("playing").await.unwrap().unwrap();
    assert_eq!(item.id.as_deref(), Some("track-1"));
    assert_eq!(item.name, "Paranoid Android");
    assert_eq!(item.artists[0].name, "Radiohead");
    assert_eq!(item.album.as_ref().unwrap().name, "OK Computer");
    assert_eq!(item.duration_ms, 383000);
    assert_eq!(item.popularity, Some(77));

    assert!(client.currently_playing("idle").await.unwrap().is_none());
    assert!(client.currently_playing("ad").await.unwrap().is_none());

    assert!(matches!(
        client.currently_playing("stale").await,
        Err(PollError::Unauthorized)
    ));
    match client.currently_playing("broken").await {
        Err(PollError::Status { status, body }) => {
            assert_eq!(status, 500);
            assert_eq!(body, "upstream failure");
        }
        other => panic!("unexpected result: {:?}", other),
    }

    assert_eq!(mock.player_calls.load(Ordering::SeqCst), 5);
}

#[tokio::test]
async fn test_login_end_to_end() {
    let (addr, mock) = spawn_mock().await;
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(addr, dir.path());
    let browser = Arc::new(ApprovingBrowser {
        opened: Mutex::new(Vec::new()),
    });
    let auth = Authenticator::new(
        &config,
        CredentialStore::new(config.token_path.clone()),
        Arc::new(SpotifyTokenClient::with_client(direct_client(), &config)),
        browser.clone(),
    );

    let before = Utc::now();
    let bundle = auth.get_valid_credentials().await.unwrap();
    assert_eq!(bundle.access_token, "t1");
    assert_eq!(bundle.refresh_token, "r1");
    let lifetime = (bundle.expires_at - before).num_seconds();
    assert!((3590..=3610).contains(&lifetime), "lifetime {}", lifetime);

    // The verifier sent to the token endpoint matches the challenge in the URL
    let opened = browser.opened.lock().unwrap().clone();
    assert_eq!(opened.len(), 1);
    let challenge = url::Url::parse(&opened[0])
        .unwrap()
        .query_pairs()
        .find(|(k, _)| k == "code_challenge")
        .map(|(_, v)| v.into_owned())
        .unwrap();
    assert_eq!(
        generate_code_challenge(&mock.last_form()["code_verifier"]),
        challenge
    );

    let stored = CredentialStore::new(config.token_path.clone())
        .load()
        .await
        .unwrap();
    assert_eq!(stored, Some(bundle.clone()));

    // Second call is served from the store
    let again = auth.get_valid_credentials().await.unwrap();
    assert_eq!(again, bundle);
    assert_eq!(mock.token_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_collector_records_after_rejected_token() {
    let (addr, mock) = spawn_mock().await;
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(addr, dir.path());

    // Valid by its expiry, but the API no longer accepts it
    let store = CredentialStore::new(config.token_path.clone());
    store
        .persist(&CredentialBundle {
            access_token: "revoked".to_string(),
            refresh_token: "r1".to_string(),
            expires_at: Utc::now() + chrono::Duration::hours(1),
        })
        .await
        .unwrap();

    let auth = Authenticator::new(
        &config,
        store,
        Arc::new(SpotifyTokenClient::with_client(direct_client(), &config)),
        Arc::new(ApprovingBrowser {
            opened: Mutex::new(Vec::new()),
        }),
    );
    let history = HistoryStore::new(config.data_path.clone());
    history.initialize().await.unwrap();

    let mut collector = HistoryCollector::new(
        auth,
        SpotifyPlayerClient::with_client(direct_client(), &config),
        history,
        &config,
    );

    let outcome = tokio::time::timeout(Duration::from_secs(10), collector.poll_once())
        .await
        .unwrap()
        .unwrap();
    let PollOutcome::Recorded(observation) = outcome else {
        panic!("expected a recorded play, got {:?}", outcome);
    };
    assert_eq!(observation.track_id, "track-1");
    assert_eq!(observation.artist_name, "Radiohead");

    assert_eq!(collector.poll_once().await.unwrap(), PollOutcome::Unchanged);

    // One refresh, no login
    assert_eq!(mock.token_calls.load(Ordering::SeqCst), 1);
    assert_eq!(mock.last_form()["grant_type"], "refresh_token");

    let rows = collector.sink().load().await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].track_name, "Paranoid Android");
    assert_eq!(rows[0].album_name, "OK Computer");
    assert_eq!(rows[0].popularity, Some(77));

    let refreshed = CredentialStore::new(config.token_path.clone())
        .load()
        .await
        .unwrap()
        .unwrap();
    assert_eq!(refreshed.access_token, "t2");
    assert_eq!(refreshed.refresh_token, "r1");
}
