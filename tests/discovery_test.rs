// Copyright (c) 2025 netzscout developers
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use netzscout::config::settings::{CrawlerSettings, DiscoverySettings, HttpSettings};
use netzscout::domain::models::document::{DataType, DiscoveryStrategy, FileType};
use netzscout::domain::services::bfs_crawler::BfsCrawler;
use netzscout::domain::services::discovery_manager::{DiscoveryManager, DiscoveryRequest};
use netzscout::domain::services::sitemap::SitemapDiscovery;
use netzscout::engines::reqwest_engine::ReqwestEngine;
use netzscout::engines::traits::FetchEngine;
use netzscout::utils::politeness::HostLimiter;
use netzscout::utils::retry_policy::RetryPolicy;
use netzscout::utils::robots::{RobotsChecker, RobotsCheckerTrait};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn http_settings() -> HttpSettings {
    HttpSettings {
        timeout_secs: 5,
        connect_timeout_secs: 2,
        robots_timeout_secs: 2,
        user_agent: "netzscout-bot/0.1 (+tariff document discovery)".to_string(),
    }
}

fn crawler_settings() -> CrawlerSettings {
    CrawlerSettings {
        max_depth: 2,
        max_pages: 20,
        fetch_concurrency: 2,
        politeness_delay_ms: 0,
        early_stop_score: 1000.0,
        min_content_length: 30,
        max_page_bytes: 1_048_576,
        html_candidate_confidence: 0.3,
        html_score_scale: 100.0,
    }
}

fn discovery_settings() -> DiscoverySettings {
    DiscoverySettings {
        min_sitemap_score: 30.0,
        verify_candidates: 3,
        sitemap_child_limit: 5,
    }
}

fn build_manager() -> DiscoveryManager {
    std::env::set_var("NETZSCOUT_DISABLE_SSRF_PROTECTION", "true");

    let engine: Arc<dyn FetchEngine> =
        Arc::new(ReqwestEngine::new(&http_settings()).expect("client"));
    let robots: Arc<dyn RobotsCheckerTrait> =
        Arc::new(RobotsChecker::new(engine.clone(), Duration::from_secs(2)));
    let limiter = Arc::new(HostLimiter::new(Duration::ZERO));

    let crawler = BfsCrawler::new(
        engine.clone(),
        robots,
        limiter,
        crawler_settings(),
        http_settings().user_agent,
        RetryPolicy::fast(),
    );
    let sitemap = SitemapDiscovery::new(engine, &discovery_settings());
    DiscoveryManager::new(sitemap, crawler, discovery_settings())
}

fn request(start_url: String) -> DiscoveryRequest {
    DiscoveryRequest {
        start_url,
        data_type: DataType::Netzentgelte,
        target_year: Some(2025),
        hint_url: None,
        force_bfs: false,
    }
}

#[tokio::test]
async fn sitemap_discovery_ranks_target_year_first() {
    let server = MockServer::start().await;
    let sitemap_body = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
        <urlset>
          <url><loc>{0}/downloads/netzentgelte-2025.pdf</loc></url>
          <url><loc>{0}/downloads/netzentgelte-2023.pdf</loc></url>
          <url><loc>{0}/kontakt</loc></url>
        </urlset>"#,
        server.uri()
    );
    Mock::given(method("GET"))
        .and(path("/sitemap.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(sitemap_body))
        .mount(&server)
        .await;

    let manager = build_manager();
    let result = manager.discover(&request(server.uri())).await;

    assert_eq!(result.strategy, DiscoveryStrategy::Sitemap);
    assert_eq!(result.pages_crawled, 0, "sitemap path must not crawl");
    assert_eq!(result.sitemap_urls_checked, 3);
    assert_eq!(result.documents.len(), 2, "kontakt is noise, both PDFs kept");

    let top = result.top_document().expect("top candidate");
    assert!(top.url.ends_with("/downloads/netzentgelte-2025.pdf"));
    assert!(top.has_target_year);
    assert_eq!(top.file_type, FileType::Pdf);

    let second = &result.sorted_documents()[1];
    assert!(second.url.ends_with("/downloads/netzentgelte-2023.pdf"));
    // The gap is exactly the URL year bonus.
    assert_eq!(top.score - second.score, 25.0);
}

#[tokio::test]
async fn bfs_fallback_finds_documents_and_respects_robots() {
    let server = MockServer::start().await;
    let uri = server.uri();

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /intern/\n"),
        )
        .mount(&server)
        .await;

    let home = r#"<html><body style="padding:1em">
          <a href="/downloads">Downloads</a>
          <a href="/intern/geheim.html">Intern</a>
          <a href="/">Start</a>
        </body></html>"#;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .set_body_string(home),
        )
        .expect(1)
        .mount(&server)
        .await;

    let downloads = r#"<html><body>
          <p>Veröffentlichungen unseres Netzgebiets, Preisblätter und mehr.</p>
          <a href="/downloads/netzentgelte-2025.pdf">Netzentgelte 2025</a>
          <a href="/files/preisblatt-netzentgelte">Preisblatt Netzentgelte</a>
          <a href="/">Zurück</a>
        </body></html>"#;
    Mock::given(method("GET"))
        .and(path("/downloads"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .set_body_string(downloads),
        )
        .expect(1)
        .mount(&server)
        .await;

    // Extensionless document: detected by the HEAD probe, body never fetched.
    Mock::given(method("HEAD"))
        .and(path("/files/preisblatt-netzentgelte"))
        .respond_with(ResponseTemplate::new(200).insert_header("content-type", "application/pdf"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/files/preisblatt-netzentgelte"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    // Never fetched: robots-disallowed page and the PDF found by extension.
    Mock::given(method("GET"))
        .and(path("/intern/geheim.html"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/downloads/netzentgelte-2025.pdf"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let manager = build_manager();
    let result = manager.discover(&request(uri.clone())).await;

    assert_eq!(result.strategy, DiscoveryStrategy::Bfs);
    assert!(result.pages_crawled >= 2);

    let top = result.top_document().expect("top candidate");
    assert!(top.url.ends_with("/downloads/netzentgelte-2025.pdf"));
    assert!(top.has_target_year);

    let urls: Vec<&str> = result.documents.iter().map(|d| d.url.as_str()).collect();
    assert!(urls
        .iter()
        .any(|u| u.ends_with("/files/preisblatt-netzentgelte")));
    let probe_doc = result
        .documents
        .iter()
        .find(|d| d.url.ends_with("/files/preisblatt-netzentgelte"))
        .expect("probed document");
    assert_eq!(probe_doc.file_type, FileType::Pdf);
    // Mock expectations (verified on drop) prove /intern/ and both documents
    // were never downloaded.
}

#[tokio::test]
async fn bfs_records_html_page_with_embedded_data() {
    let server = MockServer::start().await;

    let home = r#"<html><body>
      <p>Willkommen beim Netzbetreiber. Informationen zur Netznutzung finden Sie hier.</p>
      <a href="/netz/hochlastzeitfenster">Hochlastzeitfenster</a>
    </body></html>"#;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .set_body_string(home),
        )
        .mount(&server)
        .await;

    let hlzf_page = r#"<html><body>
      <h1>Hochlastzeitfenster für atypische Netznutzung</h1>
      <p>Gültig ab 01.01.2025</p>
      <table>
        <tr><th>Jahreszeit</th><th>Zeitfenster</th></tr>
        <tr><td>Winter</td><td>16:00 - 20:00 Uhr</td></tr>
        <tr><td>Übergangszeit</td><td>17:00 - 19:00 Uhr</td></tr>
      </table>
    </body></html>"#;
    Mock::given(method("GET"))
        .and(path("/netz/hochlastzeitfenster"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .set_body_string(hlzf_page),
        )
        .mount(&server)
        .await;

    let manager = build_manager();
    let result = manager
        .discover(&DiscoveryRequest {
            start_url: server.uri(),
            data_type: DataType::Hlzf,
            target_year: Some(2025),
            hint_url: None,
            force_bfs: false,
        })
        .await;

    let top = result.top_document().expect("top candidate");
    assert!(top.url.ends_with("/netz/hochlastzeitfenster"));
    assert!(top.is_html_data);
    assert_eq!(top.file_type, FileType::Html);
    assert!(top.has_target_year, "page year must count for HTML data");
    assert!(top.years_in_page.contains(&2025));
    assert!(top.score > 50.0, "content score was {}", top.score);
}

#[tokio::test]
async fn bfs_stops_at_max_depth() {
    let server = MockServer::start().await;

    let page = |next: &str| {
        format!(
            r#"<html><body>
              <p>Informationen zur Netznutzung und zu Entgelten unseres Netzgebiets.</p>
              <a href="{}">Weiter</a>
            </body></html>"#,
            next
        )
    };
    for (route, next, times) in [
        ("/", "/ebene1", 1u64),
        ("/ebene1", "/ebene1/ebene2", 1),
        ("/ebene1/ebene2", "/ebene1/ebene2/ebene3", 1),
        // Depth 3 exceeds max_depth 2 and must never be fetched.
        ("/ebene1/ebene2/ebene3", "/", 0),
    ] {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html")
                    .set_body_string(page(next)),
            )
            .expect(times)
            .mount(&server)
            .await;
    }

    let manager = build_manager();
    let result = manager.discover(&request(server.uri())).await;

    // Depths 0..=2 were fetched, depth 3 was not.
    assert_eq!(result.pages_crawled, 3);
}

#[tokio::test]
async fn hint_url_short_circuits_discovery() {
    let server = MockServer::start().await;
    let hint = format!("{}/bekannt/netzentgelte-2025.pdf", server.uri());

    let manager = build_manager();
    let result = manager
        .discover(&DiscoveryRequest {
            start_url: server.uri(),
            data_type: DataType::Netzentgelte,
            target_year: Some(2025),
            hint_url: Some(hint.clone()),
            force_bfs: false,
        })
        .await;

    assert_eq!(result.strategy, DiscoveryStrategy::HintUrl);
    assert_eq!(result.documents.len(), 1);
    assert_eq!(result.documents[0].url, hint);
    assert_eq!(server.received_requests().await.unwrap().len(), 0);
}

#[tokio::test]
async fn empty_site_yields_empty_result_not_error() {
    let server = MockServer::start().await;
    // Everything 404s: no sitemap, no homepage.

    let manager = build_manager();
    let result = manager.discover(&request(server.uri())).await;

    assert!(result.top_document().is_none());
    assert!(result.documents.is_empty());
    assert!(!result.errors.is_empty(), "fetch failures are recorded");
}

#[tokio::test]
async fn spa_shell_records_soft_warning() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .set_body_string("<div id=\"app\"></div>"),
        )
        .mount(&server)
        .await;

    let manager = build_manager();
    let result = manager.discover(&request(server.uri())).await;

    assert!(result.documents.is_empty());
    assert!(
        result.errors.iter().any(|e| e.contains("js-rendered")),
        "errors were: {:?}",
        result.errors
    );
}
