use httpmock::prelude::*;
use pa_core::prelude::*;

use super::*;

#[rstest(tokio::test)]
async fn test_fetch_success() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/metrics").header("accept", SCRAPE_ACCEPT_HEADER);
            then.status(200).body(SIMPLE_GAUGE_BODY);
        })
        .await;

    let scraper = HttpScraper::new();
    let target = make_target("t1", &server.url("/metrics"));

    let response = scraper.fetch(&target).await.unwrap();
    assert_eq!(response.body, SIMPLE_GAUGE_BODY);
    assert!(response.collected_at_ms > 0);

    mock.assert_async().await;
}

#[rstest(tokio::test)]
async fn test_fetch_forwards_url_params() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/metrics").query_param("format", "prometheus");
            then.status(200).body("up 1\n");
        })
        .await;

    let scraper = HttpScraper::new();
    let mut target = make_target("t1", &server.url("/metrics"));
    target
        .metadata
        .params
        .insert("format".into(), vec!["prometheus".into()]);

    scraper.fetch(&target).await.unwrap();
    mock.assert_async().await;
}

#[rstest(tokio::test)]
async fn test_non_2xx_is_an_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/metrics");
            then.status(503).body("busy");
        })
        .await;

    let scraper = HttpScraper::new();
    let target = make_target("t1", &server.url("/metrics"));

    let err = scraper.fetch(&target).await.unwrap_err();
    assert!(err.to_string().contains("503"));
}

#[rstest(tokio::test)]
async fn test_clients_are_reused_across_fetches() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/metrics");
            then.status(200).body("up 1\n");
        })
        .await;

    let scraper = HttpScraper::new();
    let target = make_target("t1", &server.url("/metrics"));

    scraper.fetch(&target).await.unwrap();
    scraper.fetch(&target).await.unwrap();

    assert_eq!(mock.hits_async().await, 2);
}
