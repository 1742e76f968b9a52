use std::future::Future;
use std::io::Cursor;
use std::net::SocketAddr;
use std::time::Duration;

use assert_matches::*;
use axum::Router;
use axum::http::{StatusCode, header};
use axum::routing::get;
use image::{DynamicImage, ImageFormat};
use libnowplaying_bridge::MockDisplay;
use libnowplaying_bridge::now_playing::{
    ArtworkFetcher, BridgeEvent, FetchError, HttpArtworkFetcher, MediaUpdate, NowPlayingBridge,
    Settings,
};
use reqwest::Url;
use tokio::net::TcpListener;
use tokio::time::{error::Elapsed, timeout};

#[ctor::ctor]
fn init() {
    tracing_subscriber::fmt()
        .pretty()
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_test_writer()
        .init();
}

async fn timed_await<T>(future: T) -> Result<T::Output, Elapsed>
where
    T: Future,
{
    timeout(Duration::from_secs(10), future).await
}

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let mut encoded = vec![];
    DynamicImage::new_rgba8(width, height)
        .write_to(&mut Cursor::new(&mut encoded), ImageFormat::Png)
        .unwrap();
    encoded
}

async fn serve_artwork() -> SocketAddr {
    let app = Router::new()
        .route(
            "/cover.png",
            get(|| async { ([(header::CONTENT_TYPE, "image/png")], png_bytes(8, 6)) }),
        )
        .route(
            "/missing.png",
            get(|| async { (StatusCode::NOT_FOUND, "not found") }),
        )
        .route(
            "/garbage.png",
            get(|| async { ([(header::CONTENT_TYPE, "image/png")], "definitely not a png") }),
        );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn test_settings() -> Settings {
    Settings {
        fetch_retries: 0,
        fetch_timeout: Duration::from_secs(5),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_fetch_http_artwork() {
    let addr = serve_artwork().await;
    let fetcher = HttpArtworkFetcher::new(&test_settings()).unwrap();
    let url = format!("http://{addr}/cover.png");

    let artwork = timed_await(fetcher.fetch(&url)).await.unwrap().unwrap();

    assert_eq!(url, artwork.source_url());
    assert_eq!(8, artwork.width());
    assert_eq!(6, artwork.height());
    assert_eq!(png_bytes(8, 6), artwork.encoded());
}

#[tokio::test]
async fn test_fetch_http_error_status() {
    let addr = serve_artwork().await;
    let fetcher = HttpArtworkFetcher::new(&test_settings()).unwrap();

    assert_matches!(
        timed_await(fetcher.fetch(&format!("http://{addr}/missing.png")))
            .await
            .unwrap(),
        Err(FetchError::Status(StatusCode::NOT_FOUND))
    );
}

#[tokio::test]
async fn test_fetch_undecodable_artwork() {
    let addr = serve_artwork().await;
    let fetcher = HttpArtworkFetcher::new(&test_settings()).unwrap();

    assert_matches!(
        timed_await(fetcher.fetch(&format!("http://{addr}/garbage.png")))
            .await
            .unwrap(),
        Err(FetchError::Decode(_))
    );
}

#[tokio::test]
async fn test_fetch_oversized_artwork() {
    let addr = serve_artwork().await;
    let fetcher = HttpArtworkFetcher::new(&Settings {
        max_artwork_bytes: 16,
        ..test_settings()
    })
    .unwrap();

    assert_matches!(
        timed_await(fetcher.fetch(&format!("http://{addr}/cover.png")))
            .await
            .unwrap(),
        Err(FetchError::TooLarge { limit: 16 })
    );
}

#[tokio::test]
async fn test_fetch_file_artwork() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cover.png");
    std::fs::write(&path, png_bytes(3, 3)).unwrap();
    let url = Url::from_file_path(&path).unwrap().to_string();
    let fetcher = HttpArtworkFetcher::new(&test_settings()).unwrap();

    let artwork = fetcher.fetch(&url).await.unwrap();

    assert_eq!(3, artwork.width());
}

#[tokio::test]
async fn test_fetch_rejects_bad_urls() {
    let fetcher = HttpArtworkFetcher::new(&test_settings()).unwrap();

    assert_matches!(
        fetcher.fetch("not a url").await,
        Err(FetchError::InvalidUrl { .. })
    );
    assert_matches!(
        fetcher.fetch("ftp://example.com/cover.png").await,
        Err(FetchError::UnsupportedScheme(scheme)) if scheme == "ftp"
    );
}

#[tokio::test]
async fn test_bridge_resolves_http_artwork() {
    let addr = serve_artwork().await;
    let display = MockDisplay::new();
    let bridge = NowPlayingBridge::with_http_fetcher(display.clone(), test_settings()).unwrap();
    let mut events = bridge.subscribe();
    let url = format!("http://{addr}/cover.png");

    bridge
        .publish(
            MediaUpdate::new("Sun of Nothing", "Between the Buried and Me")
                .with_artwork_url(&url)
                .with_playing(true),
        )
        .await
        .unwrap();

    let state = timed_await(async {
        loop {
            if let BridgeEvent::ArtworkApplied(state) = events.recv().await.unwrap() {
                return state;
            }
        }
    })
    .await
    .unwrap();

    assert_eq!("Sun of Nothing", state.title);
    assert_eq!(Some(8), state.artwork.as_ref().map(|a| a.width()));
    assert_eq!(Some(state), display.current());

    bridge.shutdown().await.unwrap();
    assert_eq!(None, display.current());
}
