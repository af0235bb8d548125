//! Live warning/advisory aggregation from the JMA bulletin feed.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use futures::future::join_all;

use crate::areas::AreaCodeMapper;
use crate::cache::Cache;
use crate::errors::{EngineError, Result};
use crate::hazard::USER_AGENT;
use crate::jma::{self, BulletinEntry, FeedEntry};
use crate::models::{GeoPoint, WarningInfo};
use crate::outcome::Gathered;

const ALL_WARNINGS_KEY: &str = "warnings:all";

#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch_text(&self, url: &str) -> Result<String>;
}

pub struct HttpFeedSource {
    client: reqwest::Client,
}

impl HttpFeedSource {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|err| EngineError::Configuration(format!("feed HTTP client: {err}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl FeedSource for HttpFeedSource {
    async fn fetch_text(&self, url: &str) -> Result<String> {
        Ok(self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?)
    }
}

pub struct WarningAggregator {
    source: Arc<dyn FeedSource>,
    feed_url: String,
    max_entries: usize,
    areas: Arc<AreaCodeMapper>,
    cache: Cache<String, Vec<WarningInfo>>,
}

impl WarningAggregator {
    pub fn new(
        source: Arc<dyn FeedSource>,
        feed_url: &str,
        max_entries: usize,
        areas: Arc<AreaCodeMapper>,
        cache: Cache<String, Vec<WarningInfo>>,
    ) -> Self {
        Self {
            source,
            feed_url: feed_url.to_string(),
            max_entries,
            areas,
            cache,
        }
    }

    /// Every warning from the most recent bulletins, cached for the
    /// configured TTL. Fails only when the feed itself is unreachable or
    /// every selected bulletin failed.
    pub async fn fetch_all_warnings(&self) -> Result<Vec<WarningInfo>> {
        let key = ALL_WARNINGS_KEY.to_string();
        if let Some(hit) = self.cache.get(&key) {
            return Ok(hit);
        }

        let feed = self.source.fetch_text(&self.feed_url).await?;
        let entries = jma::select_warning_entries(jma::parse_feed(&feed)?, self.max_entries);
        let selected = entries.len();

        let details = join_all(entries.into_iter().map(|entry| async move {
            let result = self.fetch_bulletin(&entry).await;
            (entry.link, result)
        }))
        .await;
        let gathered = Gathered::from_results(details);
        gathered.log_failures("warnings", &self.feed_url);

        if selected > 0 && gathered.values.is_empty() {
            return Err(EngineError::Network(format!(
                "all {selected} warning bulletins failed"
            )));
        }

        let warnings = merge(gathered.values.into_iter().flatten().collect());
        log::info!(
            "Fetched {} active warnings from {selected} bulletins",
            warnings.len()
        );
        self.cache.insert(key, warnings.clone());
        Ok(warnings)
    }

    async fn fetch_bulletin(&self, entry: &FeedEntry) -> Result<Vec<BulletinEntry>> {
        let xml = self.source.fetch_text(&entry.link).await?;
        jma::parse_bulletin(&xml, entry.updated.unwrap_or_else(Utc::now))
    }

    /// All warnings, or those whose area code matches exactly or shares the
    /// two-digit prefecture prefix.
    pub async fn get_latest_warnings(&self, area_code: Option<&str>) -> Result<Vec<WarningInfo>> {
        let warnings = self.fetch_all_warnings().await?;
        Ok(match area_code {
            Some(code) => warnings.into_iter().filter(|w| w.applies_to(code)).collect(),
            None => warnings,
        })
    }

    /// Warnings for the area containing `point`; empty when the point is
    /// outside the area table.
    pub async fn get_warnings_for_location(&self, point: &GeoPoint) -> Result<Vec<WarningInfo>> {
        match self.areas.area_code_for(point) {
            Some(code) => self.get_latest_warnings(Some(&code)).await,
            None => {
                log::warn!("No area code for {}, no warnings can apply", point.key(4));
                Ok(Vec::new())
            }
        }
    }

    pub async fn get_warnings_near(&self, point: &GeoPoint, radius_km: f64) -> Result<Vec<WarningInfo>> {
        let codes = self.areas.nearby_area_codes(point, radius_km)?;
        let warnings = self.fetch_all_warnings().await?;
        Ok(warnings
            .into_iter()
            .filter(|w| codes.iter().any(|code| w.applies_to(code)))
            .collect())
    }
}

/// Newest first. Only the newest entry for each (code, area) counts, and a
/// pair whose newest entry is a lift is dropped altogether.
fn merge(mut entries: Vec<BulletinEntry>) -> Vec<WarningInfo> {
    entries.sort_by(|a, b| b.warning.issued_at.cmp(&a.warning.issued_at));
    let mut seen = HashSet::new();
    entries
        .into_iter()
        .filter(|e| seen.insert((e.warning.warning_code.clone(), e.warning.area_code.clone())))
        .filter(|e| !e.lifted)
        .map(|e| e.warning)
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::jma::tests::{FEED, TOKYO_DETAIL};

    pub(crate) const FEED_URL: &str = "https://example.jma/feed.xml";

    pub(crate) const OSAKA_DETAIL: &str = r#"<Report>
      <Head><ReportDateTime>2024-05-01T12:15:00+09:00</ReportDateTime><InfoType>発表</InfoType></Head>
      <Body><Warning><Item>
        <Kind><Name>大雨特別警報</Name><Code>33</Code><Status>発表</Status></Kind>
        <Area><Name>大阪市</Name><Code>2710000</Code></Area>
      </Item></Warning></Body>
    </Report>"#;

    pub(crate) struct FakeFeed {
        pub docs: HashMap<String, String>,
        pub calls: AtomicUsize,
    }

    impl FakeFeed {
        pub fn new(docs: Vec<(&str, &str)>) -> Self {
            Self {
                docs: docs.into_iter().map(|(u, d)| (u.to_string(), d.to_string())).collect(),
                calls: AtomicUsize::new(0),
            }
        }

        pub fn standard() -> Self {
            Self::new(vec![
                (FEED_URL, FEED),
                ("https://example.jma/data/tokyo_warning.xml", TOKYO_DETAIL),
                ("https://example.jma/data/osaka_warning.xml", OSAKA_DETAIL),
            ])
        }
    }

    #[async_trait]
    impl FeedSource for FakeFeed {
        async fn fetch_text(&self, url: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.docs
                .get(url)
                .cloned()
                .ok_or_else(|| EngineError::Network(format!("404 {url}")))
        }
    }

    pub(crate) fn aggregator(feed: Arc<FakeFeed>) -> WarningAggregator {
        WarningAggregator::new(
            feed,
            FEED_URL,
            5,
            Arc::new(AreaCodeMapper::bundled().unwrap()),
            Cache::new(Duration::from_secs(300)),
        )
    }

    fn p(lat: f64, lon: f64) -> GeoPoint {
        GeoPoint::new(lat, lon).unwrap()
    }

    #[tokio::test]
    async fn merges_all_bulletins() {
        let warnings = aggregator(Arc::new(FakeFeed::standard()))
            .fetch_all_warnings()
            .await
            .unwrap();
        assert_eq!(warnings.len(), 5);
        // Osaka bulletin is newest.
        assert_eq!(warnings[0].warning_code, "33");
    }

    #[tokio::test]
    async fn cached_within_ttl() {
        let feed = Arc::new(FakeFeed::standard());
        let agg = aggregator(feed.clone());
        agg.fetch_all_warnings().await.unwrap();
        agg.get_latest_warnings(Some("13")).await.unwrap();
        assert_eq!(feed.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn filters_by_prefecture_prefix() {
        let agg = aggregator(Arc::new(FakeFeed::standard()));
        let tokyo = agg.get_latest_warnings(Some("13101")).await.unwrap();
        assert_eq!(tokyo.len(), 4);
        assert!(tokyo.iter().all(|w| w.area_code.starts_with("13")));
        let osaka = agg.get_latest_warnings(Some("27")).await.unwrap();
        assert_eq!(osaka.len(), 1);
        assert!(agg.get_latest_warnings(Some("04")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn location_resolves_area_code() {
        let agg = aggregator(Arc::new(FakeFeed::standard()));
        let warnings = agg.get_warnings_for_location(&p(34.69, 135.50)).await.unwrap();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].area_name, "大阪市");
        // Sapporo is outside the table.
        assert!(agg.get_warnings_for_location(&p(43.06, 141.35)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn near_spans_prefectures() {
        let agg = aggregator(Arc::new(FakeFeed::standard()));
        let warnings = agg.get_warnings_near(&p(35.58, 139.70), 10.0).await.unwrap();
        assert_eq!(warnings.len(), 4);
    }

    #[tokio::test]
    async fn one_broken_bulletin_is_skipped() {
        let feed = Arc::new(FakeFeed::new(vec![
            (FEED_URL, FEED),
            ("https://example.jma/data/tokyo_warning.xml", "<Report><Body>"),
            ("https://example.jma/data/osaka_warning.xml", OSAKA_DETAIL),
        ]));
        let warnings = aggregator(feed).fetch_all_warnings().await.unwrap();
        assert_eq!(warnings.len(), 1);
    }

    #[tokio::test]
    async fn feed_outage_is_an_error() {
        let feed = Arc::new(FakeFeed::new(vec![]));
        let err = aggregator(feed).fetch_all_warnings().await.unwrap_err();
        assert!(matches!(err, EngineError::Network(_)));
    }

    #[tokio::test]
    async fn all_bulletins_failing_is_an_error() {
        let feed = Arc::new(FakeFeed::new(vec![(FEED_URL, FEED)]));
        assert!(aggregator(feed).fetch_all_warnings().await.is_err());
    }

    #[test]
    fn merge_keeps_newest_duplicate() {
        let mut older = jma::parse_bulletin(OSAKA_DETAIL, Utc::now()).unwrap();
        let mut newer = older.clone();
        newer[0].warning.issued_at = older[0].warning.issued_at + chrono::Duration::hours(1);
        newer[0].warning.condition = Some("浸水害".into());
        older.append(&mut newer);
        let merged = merge(older);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].condition.as_deref(), Some("浸水害"));
    }

    #[test]
    fn older_lift_does_not_retire_newer_issue() {
        let mut issued = jma::parse_bulletin(OSAKA_DETAIL, Utc::now()).unwrap();
        let mut lifted = issued.clone();
        lifted[0].lifted = true;
        lifted[0].warning.issued_at = issued[0].warning.issued_at - chrono::Duration::hours(1);
        issued.append(&mut lifted);
        assert_eq!(merge(issued).len(), 1);
    }

    const CHIYODA_FEED: &str = r#"<feed xmlns="http://www.w3.org/2005/Atom">
      <entry>
        <title>気象警報・注意報（Ｈ２７）</title>
        <updated>2024-05-01T03:12:00Z</updated>
        <link href="https://example.jma/data/chiyoda_issued.xml"/>
      </entry>
      <entry>
        <title>気象警報・注意報（Ｈ２７）</title>
        <updated>2024-05-01T05:40:00Z</updated>
        <link href="https://example.jma/data/chiyoda_lifted.xml"/>
      </entry>
    </feed>"#;

    const CHIYODA_ISSUED: &str = r#"<Report>
      <Head><ReportDateTime>2024-05-01T12:12:00+09:00</ReportDateTime><InfoType>発表</InfoType></Head>
      <Body><Warning><Item>
        <Kind><Name>大雨警報</Name><Code>03</Code><Status>発表</Status></Kind>
        <Area><Name>千代田区</Name><Code>1310100</Code></Area>
      </Item></Warning></Body>
    </Report>"#;

    const CHIYODA_LIFTED: &str = r#"<Report>
      <Head><ReportDateTime>2024-05-01T14:40:00+09:00</ReportDateTime><InfoType>発表</InfoType></Head>
      <Body><Warning><Item>
        <Kind><Name>大雨警報</Name><Code>03</Code><Status>解除</Status></Kind>
        <Area><Name>千代田区</Name><Code>1310100</Code></Area>
      </Item></Warning></Body>
    </Report>"#;

    #[tokio::test]
    async fn newer_lift_retires_older_issue() {
        let feed = Arc::new(FakeFeed::new(vec![
            (FEED_URL, CHIYODA_FEED),
            ("https://example.jma/data/chiyoda_issued.xml", CHIYODA_ISSUED),
            ("https://example.jma/data/chiyoda_lifted.xml", CHIYODA_LIFTED),
        ]));
        let agg = aggregator(feed);
        assert!(agg.get_latest_warnings(Some("13101")).await.unwrap().is_empty());
        assert!(agg.fetch_all_warnings().await.unwrap().is_empty());
    }
}
