//! In-memory repository fixture and HTTP helpers for integration tests.
//!
//! `MemoryStore` applies the same selection rules as the PostgreSQL store:
//! withdrawn items and deleted bitstreams never count, bundles are matched by
//! their title metadata, and the MIME filter is a prefix match.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Request, StatusCode},
};
use dspace_repository_statistics::{
    AppState,
    error::{AppError, AppResult},
    models::{AggregateQuery, AggregateRow},
    repository::{ReadContext, StatisticsStore},
    routes::create_router,
};
use http_body_util::BodyExt;
use quick_xml::Reader;
use quick_xml::events::Event;
use tower::ServiceExt;

pub const TITLE_FIELD_ID: i32 = 64;

// =============================================================================
// Repository fixture
// =============================================================================

#[derive(Debug, Clone)]
pub struct TestBitstream {
    pub size_bytes: Option<i64>,
    pub mime_type: &'static str,
    pub deleted: bool,
}

impl TestBitstream {
    pub fn new(size_bytes: i64, mime_type: &'static str) -> Self {
        Self {
            size_bytes: Some(size_bytes),
            mime_type,
            deleted: false,
        }
    }

    pub fn deleted(mut self) -> Self {
        self.deleted = true;
        self
    }
}

#[derive(Debug, Clone)]
pub struct TestBundle {
    pub name: &'static str,
    pub bitstreams: Vec<TestBitstream>,
}

impl TestBundle {
    pub fn original(bitstreams: Vec<TestBitstream>) -> Self {
        Self {
            name: "ORIGINAL",
            bitstreams,
        }
    }

    pub fn named(name: &'static str, bitstreams: Vec<TestBitstream>) -> Self {
        Self { name, bitstreams }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TestItem {
    pub withdrawn: bool,
    pub bundles: Vec<TestBundle>,
}

impl TestItem {
    pub fn new(bundles: Vec<TestBundle>) -> Self {
        Self {
            withdrawn: false,
            bundles,
        }
    }

    pub fn withdrawn(mut self) -> Self {
        self.withdrawn = true;
        self
    }
}

/// Store operations that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Begin,
    CountCommunities,
    CountCollections,
    CountItems,
    CountWithdrawnItems,
    FindMetadataField,
    RunAggregate,
    Abort,
    Ping,
}

#[derive(Debug, Clone)]
pub struct RepositoryFixture {
    pub communities: i64,
    pub collections: i64,
    pub items: Vec<TestItem>,
    pub title_field_id: Option<i32>,
}

impl Default for RepositoryFixture {
    fn default() -> Self {
        Self {
            communities: 0,
            collections: 0,
            items: Vec::new(),
            title_field_id: Some(TITLE_FIELD_ID),
        }
    }
}

impl RepositoryFixture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_communities(mut self, communities: i64) -> Self {
        self.communities = communities;
        self
    }

    pub fn with_collections(mut self, collections: i64) -> Self {
        self.collections = collections;
        self
    }

    pub fn with_item(mut self, item: TestItem) -> Self {
        self.items.push(item);
        self
    }

    pub fn without_title_field(mut self) -> Self {
        self.title_field_id = None;
        self
    }
}

// =============================================================================
// MemoryStore
// =============================================================================

#[derive(Default)]
struct Counters {
    begins: AtomicUsize,
    releases: AtomicUsize,
    title_lookups: AtomicUsize,
}

#[derive(Clone)]
pub struct MemoryStore {
    fixture: Arc<RepositoryFixture>,
    failure: Arc<Mutex<Option<(Operation, String)>>>,
    counters: Arc<Counters>,
}

impl MemoryStore {
    pub fn new(fixture: RepositoryFixture) -> Self {
        Self {
            fixture: Arc::new(fixture),
            failure: Arc::new(Mutex::new(None)),
            counters: Arc::new(Counters::default()),
        }
    }

    /// Makes every later call of `operation` fail with `message`.
    pub fn fail_on(&self, operation: Operation, message: &str) {
        *self.failure.lock().unwrap() = Some((operation, message.to_string()));
    }

    pub fn clear_failure(&self) {
        *self.failure.lock().unwrap() = None;
    }

    pub fn begins(&self) -> usize {
        self.counters.begins.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> usize {
        self.counters.releases.load(Ordering::SeqCst)
    }

    pub fn title_lookups(&self) -> usize {
        self.counters.title_lookups.load(Ordering::SeqCst)
    }

    fn check(&self, operation: Operation) -> AppResult<()> {
        match self.failure.lock().unwrap().as_ref() {
            Some((failing, message)) if *failing == operation => {
                Err(AppError::Query(sqlx::Error::Protocol(message.clone())))
            }
            _ => Ok(()),
        }
    }
}

impl StatisticsStore for MemoryStore {
    type Context = MemoryContext;

    async fn begin(&self) -> AppResult<MemoryContext> {
        self.check(Operation::Begin)?;
        self.counters.begins.fetch_add(1, Ordering::SeqCst);

        Ok(MemoryContext {
            store: self.clone(),
        })
    }

    async fn ping(&self) -> AppResult<()> {
        self.check(Operation::Ping)
    }
}

pub struct MemoryContext {
    store: MemoryStore,
}

impl MemoryContext {
    fn fixture(&self) -> &RepositoryFixture {
        &self.store.fixture
    }
}

impl ReadContext for MemoryContext {
    async fn count_communities(&mut self) -> AppResult<i64> {
        self.store.check(Operation::CountCommunities)?;
        Ok(self.fixture().communities)
    }

    async fn count_collections(&mut self) -> AppResult<i64> {
        self.store.check(Operation::CountCollections)?;
        Ok(self.fixture().collections)
    }

    async fn count_items(&mut self) -> AppResult<i64> {
        self.store.check(Operation::CountItems)?;
        Ok(self.fixture().items.len() as i64)
    }

    async fn count_withdrawn_items(&mut self) -> AppResult<i64> {
        self.store.check(Operation::CountWithdrawnItems)?;
        Ok(self.fixture().items.iter().filter(|i| i.withdrawn).count() as i64)
    }

    async fn find_metadata_field(
        &mut self,
        schema: &'static str,
        element: &'static str,
    ) -> AppResult<Option<i32>> {
        self.store.check(Operation::FindMetadataField)?;
        self.store
            .counters
            .title_lookups
            .fetch_add(1, Ordering::SeqCst);

        if schema == "dc" && element == "title" {
            Ok(self.fixture().title_field_id)
        } else {
            Ok(None)
        }
    }

    async fn run_aggregate(&mut self, query: &AggregateQuery) -> AppResult<Option<AggregateRow>> {
        self.store.check(Operation::RunAggregate)?;

        if self.fixture().title_field_id != Some(query.title_field_id) {
            return Ok(None);
        }

        let matching: Vec<&TestBitstream> = self
            .fixture()
            .items
            .iter()
            .filter(|item| !item.withdrawn)
            .flat_map(|item| item.bundles.iter())
            .filter(|bundle| bundle.name == query.bundle_name)
            .flat_map(|bundle| bundle.bitstreams.iter())
            .filter(|bs| !bs.deleted && query.matches_mime_type(bs.mime_type))
            .collect();

        if matching.is_empty() {
            return Ok(None);
        }

        let sizes: Vec<i64> = matching.iter().filter_map(|bs| bs.size_bytes).collect();
        let total_size = if sizes.is_empty() {
            None
        } else {
            Some(sizes.iter().sum())
        };

        Ok(Some(AggregateRow::new(matching.len() as i64, total_size)))
    }

    async fn abort(self) -> AppResult<()> {
        self.store.counters.releases.fetch_add(1, Ordering::SeqCst);
        self.store.check(Operation::Abort)
    }
}

// =============================================================================
// HTTP helpers
// =============================================================================

pub fn router_for(store: &MemoryStore) -> Router {
    create_router(AppState::new(store.clone()), "/statistics")
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

pub async fn get(router: Router, uri: &str) -> TestResponse {
    let response = router
        .oneshot(
            Request::builder()
                .uri(uri)
                .body(Body::empty())
                .expect("request should build"),
        )
        .await
        .expect("request should succeed");

    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body should be readable")
        .to_bytes();

    TestResponse {
        status,
        headers,
        body: String::from_utf8(bytes.to_vec()).expect("body should be UTF-8"),
    }
}

/// Parsed `<dspace-repository-statistics>` document.
#[derive(Debug, Default)]
pub struct ParsedReport {
    pub date: String,
    pub statistics: Vec<(String, i64)>,
}

impl ParsedReport {
    pub fn get(&self, name: &str) -> Option<i64> {
        self.statistics
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }

    pub fn names(&self) -> Vec<&str> {
        self.statistics.iter().map(|(n, _)| n.as_str()).collect()
    }
}

pub fn parse_report(xml: &str) -> ParsedReport {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut report = ParsedReport::default();
    let mut current: Option<String> = None;

    loop {
        match reader.read_event().expect("document should be well-formed") {
            Event::Start(e) => match e.name().as_ref() {
                b"dspace-repository-statistics" => {
                    let date = e
                        .try_get_attribute("date")
                        .expect("attribute should parse")
                        .expect("date attribute should be present");
                    report.date = date
                        .unescape_value()
                        .expect("date should unescape")
                        .into_owned();
                }
                b"statistic" => {
                    let name = e
                        .try_get_attribute("name")
                        .expect("attribute should parse")
                        .expect("name attribute should be present");
                    current = Some(
                        name.unescape_value()
                            .expect("name should unescape")
                            .into_owned(),
                    );
                }
                other => panic!("unexpected element {}", String::from_utf8_lossy(other)),
            },
            Event::Text(text) => {
                if let Some(name) = current.take() {
                    let value = text
                        .unescape()
                        .expect("text should unescape")
                        .parse()
                        .expect("statistic should be an integer");
                    report.statistics.push((name, value));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    report
}
