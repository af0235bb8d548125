//! Extraction from the JMA Atom feed and its warning bulletins.
//!
//! Both documents go through `quick_xml::de`. Every element is optional and
//! unknown elements are ignored, so small schema changes upstream only drop
//! fields instead of failing the whole bulletin.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::errors::Result;
use crate::models::{WarningInfo, WarningSeverity};

const WARNING_TITLE_TERMS: &[&str] = &["警報", "注意報", "warning", "advisory"];

/// Kind status for a warning that has been lifted.
const STATUS_LIFTED: &str = "解除";

/// Head/InfoType for a cancelled bulletin.
const INFO_TYPE_CANCELLED: &str = "取消";

#[derive(Debug, Deserialize)]
struct AtomFeed {
    #[serde(rename = "entry", default)]
    entries: Vec<AtomEntry>,
}

#[derive(Debug, Deserialize)]
struct AtomEntry {
    #[serde(default)]
    title: String,
    #[serde(default)]
    id: String,
    #[serde(default)]
    updated: Option<String>,
    #[serde(default)]
    link: Vec<AtomLink>,
}

#[derive(Debug, Deserialize)]
struct AtomLink {
    #[serde(rename = "@href", default)]
    href: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeedEntry {
    pub title: String,
    pub link: String,
    pub updated: Option<DateTime<Utc>>,
}

pub fn parse_feed(xml: &str) -> Result<Vec<FeedEntry>> {
    let feed: AtomFeed = quick_xml::de::from_str(xml)?;
    Ok(feed
        .entries
        .into_iter()
        .filter_map(|entry| {
            let link = entry
                .link
                .into_iter()
                .map(|l| l.href)
                .find(|href| !href.is_empty())
                .or_else(|| Some(entry.id).filter(|id| id.starts_with("http")))?;
            Some(FeedEntry {
                title: entry.title.trim().to_string(),
                link,
                updated: entry.updated.as_deref().and_then(parse_timestamp),
            })
        })
        .collect())
}

pub fn is_warning_title(title: &str) -> bool {
    let lower = title.to_lowercase();
    WARNING_TITLE_TERMS.iter().any(|term| lower.contains(term))
}

/// Warning/advisory entries, newest first, at most `max`.
pub fn select_warning_entries(entries: Vec<FeedEntry>, max: usize) -> Vec<FeedEntry> {
    let mut matching: Vec<FeedEntry> = entries
        .into_iter()
        .filter(|e| is_warning_title(&e.title))
        .collect();
    matching.sort_by(|a, b| b.updated.cmp(&a.updated));
    matching.truncate(max);
    matching
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Report {
    #[serde(default)]
    control: Option<Control>,
    #[serde(default)]
    head: Option<Head>,
    #[serde(default)]
    body: Option<Body>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Control {
    #[serde(default)]
    date_time: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Head {
    #[serde(default)]
    report_date_time: Option<String>,
    #[serde(default)]
    valid_date_time: Option<String>,
    #[serde(default)]
    info_type: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Body {
    #[serde(default)]
    warning: Vec<WarningBlock>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WarningBlock {
    #[serde(default)]
    item: Vec<Item>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Item {
    #[serde(default)]
    kind: Vec<Kind>,
    #[serde(default)]
    area: Vec<Area>,
    #[serde(default)]
    areas: Option<Areas>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Kind {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    condition: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Areas {
    #[serde(default)]
    area: Vec<Area>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Area {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    code: Option<String>,
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// A (kind, area) pair read from a bulletin, in force or lifted.
#[derive(Debug, Clone)]
pub struct BulletinEntry {
    pub warning: WarningInfo,
    pub lifted: bool,
}

/// One entry per (kind, area) pair in the bulletin body, lifted kinds
/// included so a newer lift can retire an older issue of the same pair.
///
/// Kinds and areas without a code are skipped. A cancelled bulletin yields
/// nothing. `issued_at` falls back to `Control/DateTime`, then to
/// `fallback_issued_at`.
pub fn parse_bulletin(xml: &str, fallback_issued_at: DateTime<Utc>) -> Result<Vec<BulletinEntry>> {
    let report: Report = quick_xml::de::from_str(xml)?;
    let head = report.head.unwrap_or_default();

    if head.info_type.as_deref().map(str::trim) == Some(INFO_TYPE_CANCELLED) {
        return Ok(Vec::new());
    }

    let issued_at = head
        .report_date_time
        .as_deref()
        .and_then(parse_timestamp)
        .or_else(|| {
            report
                .control
                .and_then(|c| c.date_time)
                .as_deref()
                .and_then(parse_timestamp)
        })
        .unwrap_or(fallback_issued_at);
    let expires_at = head.valid_date_time.as_deref().and_then(parse_timestamp);

    let mut entries = Vec::new();
    for block in report.body.unwrap_or_default().warning {
        for item in block.item {
            let areas: Vec<(String, String)> = item
                .area
                .into_iter()
                .chain(item.areas.into_iter().flat_map(|a| a.area))
                .filter_map(|area| {
                    let code = non_empty(area.code)?;
                    Some((non_empty(area.name).unwrap_or_default(), code))
                })
                .collect();

            for kind in item.kind {
                let lifted = non_empty(kind.status).as_deref() == Some(STATUS_LIFTED);
                let Some(code) = non_empty(kind.code) else {
                    continue;
                };
                let name = non_empty(kind.name).unwrap_or_else(|| code.clone());
                let condition = non_empty(kind.condition);
                for (area_name, area_code) in &areas {
                    entries.push(BulletinEntry {
                        warning: WarningInfo {
                            warning_type: name.clone(),
                            warning_code: code.clone(),
                            area_name: area_name.clone(),
                            area_code: area_code.clone(),
                            severity: WarningSeverity::from_code(&code),
                            condition: condition.clone(),
                            issued_at,
                            expires_at,
                        },
                        lifted,
                    });
                }
            }
        }
    }
    Ok(entries)
}

/// The warnings a bulletin puts in force: [`parse_bulletin`] without the
/// lifted kinds.
pub fn parse_detail(xml: &str, fallback_issued_at: DateTime<Utc>) -> Result<Vec<WarningInfo>> {
    Ok(parse_bulletin(xml, fallback_issued_at)?
        .into_iter()
        .filter(|entry| !entry.lifted)
        .map(|entry| entry.warning)
        .collect())
}
