//! Integration tests for the image cache over a real HTTP fetcher.
//!
//! A wiremock server stands in for the image CDN; `expect(n)` on each mock
//! asserts how many transport calls the cache actually made.

use reviewfeed::images::{HttpImageFetcher, ImageCache, ImageError};
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let pixels = image::DynamicImage::ImageRgba8(image::RgbaImage::new(width, height));
    let mut out = Cursor::new(Vec::new());
    pixels
        .write_to(&mut out, image::ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

fn cache() -> ImageCache {
    ImageCache::new(Arc::new(HttpImageFetcher::new(reqwest::Client::new())))
}

fn url(server: &MockServer, name: &str) -> Url {
    Url::parse(&format!("{}/{}", server.uri(), name)).unwrap()
}

#[tokio::test]
async fn test_concurrent_requests_share_one_download() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/avatar.png"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(png_bytes(8, 6))
                .set_delay(Duration::from_millis(100)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let cache = cache();
    let target = url(&server, "avatar.png");

    let handles: Vec<_> = (0..5)
        .map(|_| {
            let cache = cache.clone();
            let target = target.clone();
            tokio::spawn(async move { cache.get_or_fetch(&target).await })
        })
        .collect();

    let mut images = Vec::new();
    for handle in handles {
        images.push(handle.await.unwrap().unwrap());
    }

    assert_eq!((images[0].width(), images[0].height()), (8, 6));
    assert!(images.iter().all(|image| image.same_as(&images[0])));

    // Later calls are answered from memory
    let again = cache.get_or_fetch(&target).await.unwrap();
    assert!(again.same_as(&images[0]));

    let stats = cache.stats();
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.entries, 1);
    assert_eq!(stats.in_flight, 0);
    assert!(stats.hits >= 1);
}

#[tokio::test]
async fn test_http_error_is_retried_on_next_call() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/photo.jpg"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/photo.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(png_bytes(2, 2)))
        .expect(1)
        .mount(&server)
        .await;

    let cache = cache();
    let target = url(&server, "photo.jpg");

    let err = cache.get_or_fetch(&target).await.unwrap_err();
    assert_eq!(err, ImageError::BadStatus(503));
    assert!(cache.get(&target).is_none());

    assert!(cache.get_or_fetch(&target).await.is_ok());
    assert!(cache.get(&target).is_some());
}

#[tokio::test]
async fn test_non_image_body_is_bad_data() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>login</html>"))
        .mount(&server)
        .await;

    let cache = cache();
    let err = cache
        .get_or_fetch(&url(&server, "avatar.png"))
        .await
        .unwrap_err();
    assert!(matches!(err, ImageError::BadData(_)));
    assert!(cache.is_empty());
}

#[tokio::test]
async fn test_distinct_urls_download_separately() {
    let server = MockServer::start().await;
    for name in ["/a.png", "/b.png"] {
        Mock::given(method("GET"))
            .and(path(name))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(png_bytes(1, 1)))
            .expect(1)
            .mount(&server)
            .await;
    }

    let cache = cache();
    let (a_url, b_url) = (url(&server, "a.png"), url(&server, "b.png"));
    let (a, b) = tokio::join!(cache.get_or_fetch(&a_url), cache.get_or_fetch(&b_url));

    assert!(!a.unwrap().same_as(&b.unwrap()));
    assert_eq!(cache.len(), 2);
}
