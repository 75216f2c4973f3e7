use job_feed::core::{ManualClock, RateLimiter};
use job_feed::linkedin::filter::DEFAULT_ROLE_KEYWORDS;
use job_feed::linkedin::{
    filter_records, DatePosted, LocationPolicy, RequestStatus, SearchCriteria, SearchStatus,
};
use job_feed::{JobFeed, ScoutConfig, ScoutError};
use mockito::Matcher;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn feed(base_url: &str, api_key: Option<&str>) -> JobFeed {
    let mut env: HashMap<String, String> = HashMap::from([
        ("RAPIDAPI_BASE_URL".to_string(), base_url.to_string()),
        ("JOBFEED_RETRY_BACKOFF_MS".to_string(), "1".to_string()),
        ("JOBFEED_RATE_MAX_CALLS".to_string(), "100".to_string()),
    ]);
    if let Some(key) = api_key {
        env.insert("RAPIDAPI_KEY".to_string(), key.to_string());
    }
    let config = ScoutConfig::from_lookup(move |key| env.get(key).cloned()).unwrap();
    JobFeed::new(config).unwrap()
}

fn job(title: &str, location: &str, n: usize, posted: &str) -> Value {
    json!({
        "job_title": title,
        "company": format!("Firm {}", n),
        "job_url": format!("https://www.linkedin.com/jobs/view/{}", n),
        "location": location,
        "posted_time": posted,
        "remote": "On-site",
    })
}

async fn mock_search(server: &mut mockito::ServerGuard, items: Vec<Value>) -> mockito::Mock {
    server
        .mock("POST", "/search-jobs")
        .match_header("x-rapidapi-key", "test-key")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "data": items }).to_string())
        .create_async()
        .await
}

fn criteria(feed: &JobFeed, city: &str) -> SearchCriteria {
    SearchCriteria::for_city("financial advisor", city, &feed.config().geo)
        .unwrap()
        .with_date_posted(DatePosted::Past24Hours)
}

#[tokio::test]
async fn melbourne_keeps_every_title() {
    let mut server = mockito::Server::new_async().await;
    let titles = [
        "Financial Planner",
        "Software Engineer",
        "Receptionist",
        "Paraplanner",
        "Barista",
        "Data Analyst",
        "Nurse",
        "Client Service Officer",
    ];
    let items = titles
        .iter()
        .enumerate()
        .map(|(n, title)| job(title, "Melbourne, Victoria, Australia", n, "3 hours ago"))
        .collect();
    mock_search(&mut server, items).await;

    let feed = feed(&server.url(), Some("test-key"));
    let outcome = feed.jobs().search(&criteria(&feed, "Melbourne")).await;

    assert_eq!(outcome.status, SearchStatus::Complete);
    assert_eq!(outcome.records.len(), 8);
}

#[tokio::test]
async fn perth_keeps_only_listed_roles() {
    let mut server = mockito::Server::new_async().await;
    let titles = [
        "Senior Financial Advisor",
        "Software Engineer",
        "Accountant",
        "Receptionist",
        "Marketing Lead",
    ];
    let items = titles
        .iter()
        .enumerate()
        .map(|(n, title)| job(title, "Perth, Western Australia", n, "5 hours ago"))
        .collect();
    mock_search(&mut server, items).await;

    let feed = feed(&server.url(), Some("test-key"));
    let outcome = feed.jobs().search(&criteria(&feed, "Perth")).await;

    assert_eq!(outcome.status, SearchStatus::Complete);
    assert_eq!(outcome.records.len(), 1);
    assert_eq!(outcome.records[0].title, "Senior Financial Advisor");
    assert_eq!(outcome.report.excluded_by_policy, 4);
}

#[tokio::test]
async fn recency_window_drops_old_postings() {
    let mut server = mockito::Server::new_async().await;
    mock_search(
        &mut server,
        vec![
            job("Paraplanner", "Melbourne VIC", 1, "20 hours ago"),
            job("Paraplanner", "Melbourne VIC", 2, "9 days ago"),
        ],
    )
    .await;

    let feed = feed(&server.url(), Some("test-key"));
    let outcome = feed.jobs().search(&criteria(&feed, "Melbourne")).await;

    assert_eq!(outcome.records.len(), 1);
    assert_eq!(outcome.records[0].posted_recency_hours, 20.0);
    assert_eq!(outcome.report.outside_window, 1);
}

#[tokio::test]
async fn missing_key_yields_empty_unavailable_outcome() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/search-jobs")
        .expect(0)
        .create_async()
        .await;

    let feed = feed(&server.url(), None);
    let outcome = feed.jobs().search(&criteria(&feed, "Perth")).await;

    assert!(outcome.records.is_empty());
    assert_eq!(outcome.status, SearchStatus::Unavailable);
    mock.assert_async().await;
}

#[tokio::test]
async fn search_never_returns_duplicate_urls() {
    let mut server = mockito::Server::new_async().await;
    let items = (0..20)
        .map(|n| job("Paraplanner", "Melbourne VIC", n % 7, "1 hour ago"))
        .collect();
    mock_search(&mut server, items).await;

    let feed = feed(&server.url(), Some("test-key"));
    let outcome = feed.jobs().search(&criteria(&feed, "Melbourne")).await;

    let urls: HashSet<&str> = outcome.records.iter().map(|r| r.url.as_str()).collect();
    assert_eq!(urls.len(), outcome.records.len());
    assert_eq!(outcome.records.len(), 7);
}

#[tokio::test]
async fn decision_maker_request_lifecycle() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/search-decision-makers")
        .match_body(Matcher::PartialJson(json!({"limit": "5", "geo_codes": [101452733]})))
        .with_status(200)
        .with_body(r#"{"request_id": "dm-42"}"#)
        .create_async()
        .await;

    let polls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&polls);
    server
        .mock("GET", "/check-search-status")
        .match_query(Matcher::UrlEncoded("request_id".into(), "dm-42".into()))
        .with_status(200)
        .with_body_from_request(move |_| {
            let status = ["pending", "running", "completed"]
                [counter.fetch_add(1, Ordering::SeqCst).min(2)];
            json!({ "status": status }).to_string().into_bytes()
        })
        .create_async()
        .await;

    server
        .mock("GET", "/get-search-results")
        .match_query(Matcher::UrlEncoded("request_id".into(), "dm-42".into()))
        .with_status(200)
        .with_body(r#"{"results": [{"full_name": "Alex Chen", "title": "Managing Director"}]}"#)
        .create_async()
        .await;

    let feed = feed(&server.url(), Some("test-key"));
    let client = feed.decision_makers();
    let request_id = client.submit(&[], &[], &[]).await.unwrap();

    let mut seen = Vec::new();
    for _ in 0..3 {
        let status = client.poll(&request_id).await.unwrap();
        if status != RequestStatus::Complete {
            assert!(matches!(
                client.fetch(&request_id).await,
                Err(ScoutError::NotReady { .. })
            ));
        }
        seen.push(status);
    }

    assert_eq!(
        seen,
        vec![
            RequestStatus::Pending,
            RequestStatus::Running,
            RequestStatus::Complete
        ]
    );
    assert_eq!(polls.load(Ordering::SeqCst), 3);

    let people = client.fetch(&request_id).await.unwrap();
    assert_eq!(people.len(), 1);
    assert_eq!(people[0].title.as_deref(), Some("Managing Director"));
}

#[tokio::test]
async fn shared_limiter_gates_both_clients() {
    let clock = Arc::new(ManualClock::new());
    let limiter = Arc::new(RateLimiter::with_clock(2, 60, clock.clone()).unwrap());

    let mut server = mockito::Server::new_async().await;
    mock_search(&mut server, vec![]).await;
    server
        .mock("POST", "/search-decision-makers")
        .with_status(200)
        .with_body(r#"{"request_id": "dm-1"}"#)
        .create_async()
        .await;

    let config = {
        let env: HashMap<String, String> = HashMap::from([
            ("RAPIDAPI_BASE_URL".to_string(), server.url()),
            ("RAPIDAPI_KEY".to_string(), "test-key".to_string()),
        ]);
        ScoutConfig::from_lookup(move |key| env.get(key).cloned()).unwrap()
    };
    let feed = JobFeed::with_limiter(config, Arc::clone(&limiter)).unwrap();

    feed.jobs().search(&criteria(&feed, "Perth")).await;
    feed.decision_makers().submit(&[], &[], &[]).await.unwrap();
    assert!(!limiter.allow());

    clock.advance(Duration::from_secs(60));
    assert!(limiter.allow());
}

#[test]
fn filtering_is_idempotent_over_mixed_batches() {
    let policy = LocationPolicy::default_with_roles(DEFAULT_ROLE_KEYWORDS).unwrap();
    let locations = ["Melbourne VIC", "Perth WA", "Sydney NSW", "Brisbane", "Adelaide SA", "Darwin"];
    let titles = ["Paraplanner", "Chef", "Wealth Advisor", "Financial Planner", "Engineer"];

    let parser = job_feed::linkedin::RecencyParser::now();
    let items: Vec<Value> = (0..30)
        .map(|n| job(titles[n % titles.len()], locations[n % locations.len()], n, "1 hour ago"))
        .collect();
    let (records, _) = job_feed::linkedin::job_search::normalize_batch(items, &parser);

    let once = filter_records(records, &policy);
    let twice = filter_records(once.clone(), &policy);
    assert_eq!(once, twice);
    assert!(once.iter().all(|r| !r.location.contains("Sydney") && !r.location.contains("Darwin")));
}
