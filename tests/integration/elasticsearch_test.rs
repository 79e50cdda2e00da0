// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use searchrs::domain::search::index::{IndexError, SearchIndex};
use searchrs::infrastructure::search::elasticsearch::ElasticsearchIndex;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn index_for(server: &MockServer) -> ElasticsearchIndex {
    ElasticsearchIndex::new(&server.uri(), "web_pages", Duration::from_secs(2)).unwrap()
}

#[tokio::test]
async fn test_query_maps_hits_and_total() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/web_pages/_search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "hits": {
                "total": { "value": 247, "relation": "eq" },
                "hits": [
                    {
                        "_score": 8.5,
                        "_source": {
                            "url": "https://docs.python.org/3/tutorial/",
                            "title": "The Python Tutorial",
                            "content": "Python is an easy to learn language",
                            "domain": "docs.python.org",
                            "crawl_date": "2025-05-01"
                        },
                        "highlight": { "content": ["<em>Python</em> is an easy"] }
                    },
                    {
                        "_score": 3.0,
                        "_source": {
                            "url": "https://example.com/py",
                            "title": "Another page",
                            "content": "plain body",
                            "domain": "example.com"
                        }
                    }
                ]
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let page = index_for(&server).query("python tutorial", 10, 0).await.unwrap();

    assert_eq!(page.total, 247);
    assert_eq!(page.hits.len(), 2);
    assert_eq!(page.hits[0].title, "The Python Tutorial");
    assert_eq!(page.hits[0].snippet_source, "<em>Python</em> is an easy");
    assert_eq!(page.hits[0].date.as_deref(), Some("2025-05-01"));
    assert_eq!(page.hits[1].snippet_source, "plain body");
    assert!(page.hits[1].date.is_none());
}

#[tokio::test]
async fn test_untitled_document_gets_placeholder_title() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/web_pages/_search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "hits": {
                "total": { "value": 1 },
                "hits": [
                    {
                        "_score": 1.0,
                        "_source": { "url": "https://example.com/untitled", "content": "body" }
                    }
                ]
            }
        })))
        .mount(&server)
        .await;

    let page = index_for(&server).query("body", 10, 0).await.unwrap();
    assert_eq!(page.hits[0].title, "No title");
}

#[tokio::test]
async fn test_numeric_total_is_accepted() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/web_pages/_search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "hits": { "total": 12, "hits": [] }
        })))
        .mount(&server)
        .await;

    let page = index_for(&server).query("rust", 10, 20).await.unwrap();
    assert_eq!(page.total, 12);
    assert!(page.hits.is_empty());
}

#[tokio::test]
async fn test_credentials_are_sent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header_exists("authorization"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "hits": { "total": { "value": 0 }, "hits": [] }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let index = index_for(&server).with_credentials("elastic".to_string(), "secret".to_string());
    assert!(index.query("rust", 10, 0).await.is_ok());
}

#[tokio::test]
async fn test_engine_error_status_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("shard failure"))
        .mount(&server)
        .await;

    let err = index_for(&server).query("rust", 10, 0).await.unwrap_err();
    match err {
        IndexError::EngineError { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "shard failure");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_malformed_body_is_a_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = index_for(&server).query("rust", 10, 0).await.unwrap_err();
    assert!(matches!(err, IndexError::DecodeError(_)));
}
