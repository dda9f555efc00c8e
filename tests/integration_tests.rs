//! Integration tests for bibdl
//!
//! These run the request builder, parser and client together against canned
//! Scholar pages, both through the mock transport and over a local HTTP server.

use bibdl::bibliography::Bibliography;
use bibdl::config::{load_config, Config, ScholarConfig};
use bibdl::fetcher::{FetchOutcome, Fetcher};
use bibdl::models::{SearchQuery, YearRange};
use bibdl::scholar::{
    MockTransport, ParserRules, RequestBuilder, ResultParser, ScholarClient, ScholarError,
    SeededRandom, ThreadRandom, UserAgentPool, DEFAULT_USER_AGENTS,
};
use bibdl::utils::{HttpClient, StatusReporter};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

const RESULTS: &str = include_str!("fixtures/results.html");
const CAPTCHA: &str = include_str!("fixtures/captcha.html");
const NO_RESULTS: &str = include_str!("fixtures/no_results.html");

fn parser() -> ResultParser {
    ResultParser::new(&ParserRules::default(), "https://scholar.google.com").unwrap()
}

fn config_for(base_url: &str) -> ScholarConfig {
    ScholarConfig {
        base_url: base_url.to_string(),
        ..ScholarConfig::default()
    }
}

#[test]
fn test_user_agent_varies_across_requests() {
    let builder = RequestBuilder::from_config(&ScholarConfig::default(), Box::new(ThreadRandom))
        .unwrap();
    let query = SearchQuery::new("deep learning");

    let mut seen = HashSet::new();
    let mut previous: Option<String> = None;
    for _ in 0..200 {
        let request = builder.build(&query).unwrap();
        let agent = request.user_agent().unwrap().to_string();

        assert!(DEFAULT_USER_AGENTS.contains(&agent.as_str()));
        assert_ne!(previous.as_deref(), Some(agent.as_str()));

        seen.insert(agent.clone());
        previous = Some(agent);
    }

    assert!(seen.len() >= 2);
}

#[test]
fn test_seeded_pool_is_reproducible() {
    let draw = |seed| {
        let random = Box::new(SeededRandom::new(seed));
        let pool = UserAgentPool::new(DEFAULT_USER_AGENTS.iter().copied(), random).unwrap();
        (0..50).map(|_| pool.pick().to_string()).collect::<Vec<_>>()
    };

    let first = draw(7);
    assert_eq!(first, draw(7));
    assert!(first.iter().collect::<HashSet<_>>().len() > 1);
}

#[test]
fn test_request_parameters() {
    let random = Box::new(SeededRandom::new(1));
    let builder = RequestBuilder::from_config(&ScholarConfig::default(), random).unwrap();
    let query = SearchQuery::new("attention is all you need")
        .author("Vaswani")
        .years(YearRange::new(Some(2016), Some(2018)))
        .include_citations(false)
        .max_results(5);

    let request = builder.build(&query).unwrap();
    assert_eq!(request.url().host_str(), Some("scholar.google.com"));
    assert_eq!(request.url().path(), "/scholar");
    assert_eq!(request.param("as_epq").as_deref(), Some("attention is all you need"));
    assert_eq!(request.param("as_sauthors").as_deref(), Some("Vaswani"));
    assert_eq!(request.param("as_ylo").as_deref(), Some("2016"));
    assert_eq!(request.param("as_yhi").as_deref(), Some("2018"));
    assert_eq!(request.param("as_vis").as_deref(), Some("1"));
    assert_eq!(request.param("num").as_deref(), Some("5"));
    assert_eq!(request.timeout(), Duration::from_secs(30));
}

#[test]
fn test_empty_query_rejected() {
    let builder = RequestBuilder::from_config(&ScholarConfig::default(), Box::new(ThreadRandom))
        .unwrap();

    let result = builder.build(&SearchQuery::new("   "));
    assert!(matches!(result, Err(ScholarError::InvalidQuery(_))));
}

#[test]
fn test_parse_results_fixture() {
    let page = parser().parse(RESULTS).unwrap();
    let records: Vec<_> = page.records().collect();

    assert_eq!(records.len(), 3);
    let titles: Vec<_> = records.iter().map(|r| r.title()).collect();
    assert_eq!(
        titles,
        [
            "Attention is all you need",
            "The art of computer programming",
            "Deep learning"
        ]
    );

    let attention = &records[0];
    assert_eq!(attention.authors(), ["A Vaswani", "N Shazeer", "N Parmar"]);
    assert_eq!(
        attention.venue(),
        Some("Advances in neural information processing systems")
    );
    assert_eq!(attention.year(), Some("2017"));
    assert_eq!(attention.citation_count(), 120_345);
    assert_eq!(attention.versions(), 57);
    assert_eq!(attention.cluster_id(), Some("2960712678066186980"));
    assert!(attention.pdf_url().unwrap().ends_with("-Paper.pdf"));
    assert_eq!(
        attention.cited_by_url(),
        Some("https://scholar.google.com/scholar?cites=2960712678066186980&as_sdt=2005&sciodt=0,5&hl=en")
    );

    // No "Cited by" link
    let book = &records[1];
    assert_eq!(book.citation_count(), 0);
    assert_eq!(book.cited_by_url(), None);
    assert_eq!(book.year(), Some("1997"));
    assert_eq!(book.url(), Some("https://books.google.com/books?id=1"));

    let deep = &records[2];
    assert_eq!(deep.venue(), Some("Nature"));
    assert_eq!(deep.citation_count(), 80_123);
    assert!(deep.url().unwrap().starts_with("https://scholar.google.com/"));
}

#[test]
fn test_records_restartable() {
    let page = parser().parse(RESULTS).unwrap();
    let first: Vec<_> = page.records().collect();
    let second: Vec<_> = page.records().collect();
    assert_eq!(first, second);
}

#[test]
fn test_captcha_fixture_is_malformed() {
    let result = parser().parse(CAPTCHA);
    assert!(matches!(result, Err(ScholarError::MalformedPage(_))));
}

#[test]
fn test_no_results_fixture_is_empty() {
    let page = parser().parse(NO_RESULTS).unwrap();
    assert_eq!(page.records().count(), 0);
}

#[tokio::test]
async fn test_client_with_mock_transport() {
    let transport = Arc::new(MockTransport::new().with_route("/scholar?", 200, RESULTS));
    let client = ScholarClient::with_random(
        &ScholarConfig::default(),
        transport.clone(),
        Box::new(SeededRandom::new(3)),
    )
    .unwrap();

    let records = client.search(&SearchQuery::new("attention")).await.unwrap();
    assert_eq!(records.len(), 3);

    let requests = transport.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].param("as_epq").as_deref(), Some("attention"));
}

#[tokio::test]
async fn test_client_over_http() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/scholar")
        .match_query(mockito::Matcher::UrlEncoded(
            "as_epq".into(),
            "deep learning".into(),
        ))
        .match_header("user-agent", mockito::Matcher::Regex("^Mozilla/5.0 ".into()))
        .with_status(200)
        .with_header("content-type", "text/html; charset=UTF-8")
        .with_body(RESULTS)
        .create_async()
        .await;

    let client = ScholarClient::new(
        &config_for(&server.url()),
        Arc::new(HttpClient::new().unwrap()),
    )
    .unwrap();

    let records = client.search(&SearchQuery::new("deep learning")).await.unwrap();
    mock.assert_async().await;
    assert_eq!(records.len(), 3);

    // Relative links resolve against the configured base URL
    assert!(records[0]
        .cited_by_url()
        .unwrap()
        .starts_with(&server.url()));
}

#[tokio::test]
async fn test_client_over_http_block_page() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/scholar")
        .match_query(mockito::Matcher::Any)
        .with_status(200)
        .with_body(CAPTCHA)
        .create_async()
        .await;

    let client = ScholarClient::new(
        &config_for(&server.url()),
        Arc::new(HttpClient::new().unwrap()),
    )
    .unwrap();

    let result = client.search(&SearchQuery::new("anything")).await;
    assert!(matches!(result, Err(ScholarError::MalformedPage(_))));
}

#[tokio::test]
async fn test_client_over_http_error_status() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/scholar")
        .match_query(mockito::Matcher::Any)
        .with_status(429)
        .create_async()
        .await;

    let client = ScholarClient::new(
        &config_for(&server.url()),
        Arc::new(HttpClient::new().unwrap()),
    )
    .unwrap();

    let result = client.search(&SearchQuery::new("anything")).await;
    assert!(matches!(result, Err(ScholarError::Http { status: 429, .. })));
}

#[tokio::test]
async fn test_fetch_bibliography_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let mut server = mockito::Server::new_async().await;

    let page = RESULTS.replace(
        "https://proceedings.neurips.cc/paper/2017/file/3f5ee243547dee91fbd053c1c4a845aa-Paper.pdf",
        &format!("{}/files/attention.pdf", server.url()),
    );
    let _search = server
        .mock("GET", "/scholar")
        .match_query(mockito::Matcher::Any)
        .with_status(200)
        .with_body(page)
        .create_async()
        .await;
    let _pdf = server
        .mock("GET", "/files/attention.pdf")
        .with_status(200)
        .with_body(b"%PDF-1.4 test")
        .create_async()
        .await;

    let mut config = Config::default();
    config.scholar.base_url = server.url();
    config.downloads.output_dir = dir.path().to_path_buf();
    config.downloads.delay_secs = 0.0;
    config.downloads.min_delay_secs = 0.0;

    let mut bibliography = Bibliography::new();
    bibliography.parse_str(
        "[VSP17] A. Vaswani, N. Shazeer, and N. Parmar. Attention is all you need. In NIPS, 2017.",
    );

    let client = ScholarClient::new(&config.scholar, Arc::new(HttpClient::new().unwrap())).unwrap();
    let status = StatusReporter::new(false, false, Box::new(std::io::sink()));
    let mut fetcher = Fetcher::new(client, &config.downloads, status).unwrap();

    let outcome = fetcher.single(&bibliography, "VSP17").await.unwrap();
    let FetchOutcome::Downloaded(path) = outcome else {
        panic!("expected a download, got {:?}", outcome);
    };
    assert!(path.starts_with(dir.path()));
    assert_eq!(std::fs::read(&path).unwrap(), b"%PDF-1.4 test");
}

#[test]
fn test_config_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bibdl.toml");

    let mut config = Config::default();
    config.scholar.language = "de".to_string();
    config.scholar.user_agents = vec!["agent-a".to_string(), "agent-b".to_string()];
    config.save(&path).unwrap();

    let loaded = load_config(Some(&path)).unwrap();
    assert_eq!(loaded, config);
}
