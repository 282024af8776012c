// src/tracker/feed.rs
//! RSS document parsing for the bills feeds. The aggregate feed and the
//! per-bill publication feeds share one wire shape; they differ in which
//! fields are present per item (stage attribute and `a10:updated` on the
//! aggregate feed, `pubDate` on publication feeds).

use chrono::{DateTime, Utc};
use quick_xml::de::from_str;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::model::de;

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "lastBuildDate")]
    last_build_date: Option<String>,
    #[serde(rename = "item", default)]
    items: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Guid {
    #[serde(rename = "$text")]
    value: String,
}

#[derive(Debug, Deserialize)]
struct Item {
    #[serde(rename = "@stage")]
    stage: Option<String>,
    guid: Option<Guid>,
    title: Option<String>,
    description: Option<String>,
    #[serde(rename = "category", default)]
    categories: Vec<String>,
    #[serde(rename = "updated")]
    updated: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
}

/// One entry of the aggregate bills feed: a bill whose sub-feed advanced.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedUpdate {
    pub guid: String,
    pub bill_id: u32,
    /// Stage attribute, when the feed reports one.
    pub stage: Option<String>,
    /// Lowercased category tags.
    pub categories: Vec<String>,
    pub title: String,
    pub description: String,
    pub updated: DateTime<Utc>,
}

/// One entry of a per-bill publication feed.
#[derive(Debug, Clone, PartialEq)]
pub struct PublicationUpdate {
    pub guid: String,
    pub category: Option<String>,
    pub title: String,
    pub description: String,
    pub published: DateTime<Utc>,
}

/// Parsed aggregate feed: channel build date plus entries in feed order
/// (newest first upstream).
#[derive(Debug, Clone)]
pub struct FeedDocument {
    pub last_build: Option<DateTime<Utc>>,
    pub items: Vec<FeedUpdate>,
}

/// Parsed per-bill publication feed.
#[derive(Debug, Clone)]
pub struct PublicationFeedDocument {
    pub last_build: Option<DateTime<Utc>>,
    pub items: Vec<PublicationUpdate>,
}

fn parse_build_date(channel: &Channel) -> Result<Option<DateTime<Utc>>> {
    channel
        .last_build_date
        .as_deref()
        .map(|s| de::parse_datetime(s).map_err(Error::Malformed))
        .transpose()
}

fn field<T>(value: Option<T>, name: &str) -> Result<T> {
    value.ok_or_else(|| Error::malformed(format!("feed item missing {name}")))
}

impl FeedUpdate {
    fn from_item(item: Item) -> Result<Self> {
        let guid = field(item.guid, "guid")?.value;
        let bill_id = guid
            .rsplit('/')
            .next()
            .and_then(|tail| tail.parse().ok())
            .ok_or_else(|| Error::malformed(format!("guid {guid:?} has no bill id")))?;
        let updated = field(item.updated, "a10:updated")?;
        Ok(Self {
            bill_id,
            stage: item.stage,
            categories: item
                .categories
                .into_iter()
                .map(|c| c.to_lowercase())
                .collect(),
            title: field(item.title, "title")?,
            description: de::strip_markup(&item.description.unwrap_or_default()),
            updated: de::parse_datetime(&updated).map_err(Error::Malformed)?,
            guid,
        })
    }
}

impl PublicationUpdate {
    fn from_item(item: Item) -> Result<Self> {
        let pub_date = field(item.pub_date, "pubDate")?;
        Ok(Self {
            guid: field(item.guid, "guid")?.value,
            category: item.categories.into_iter().next(),
            title: field(item.title, "title")?,
            description: de::strip_markup(&item.description.unwrap_or_default()),
            published: de::parse_datetime(&pub_date).map_err(Error::Malformed)?,
        })
    }
}

/// Parse the aggregate bills feed. Items keep feed order.
pub fn parse_feed(xml: &str) -> Result<FeedDocument> {
    let rss: Rss = from_str(xml)?;
    let last_build = parse_build_date(&rss.channel)?;
    let items = rss
        .channel
        .items
        .into_iter()
        .map(FeedUpdate::from_item)
        .collect::<Result<Vec<_>>>()?;
    Ok(FeedDocument { last_build, items })
}

/// Parse a per-bill publication feed. Items keep feed order.
pub fn parse_publication_feed(xml: &str) -> Result<PublicationFeedDocument> {
    let rss: Rss = from_str(xml)?;
    let last_build = parse_build_date(&rss.channel)?;
    let items = rss
        .channel
        .items
        .into_iter()
        .map(PublicationUpdate::from_item)
        .collect::<Result<Vec<_>>>()?;
    Ok(PublicationFeedDocument { last_build, items })
}

/// Watermark record for one tracked bill. Owned exclusively by the bills
/// tracker; the watermark only ever moves forward, and only after the update
/// that moved it was fully handled.
#[derive(Debug, Clone)]
pub struct Feed {
    bill_id: u32,
    bill_url: String,
    feed_url: String,
    last_update: Option<DateTime<Utc>>,
}

impl Feed {
    pub(crate) fn new(bill_id: u32, bill_url: String, feed_url: String) -> Self {
        Self {
            bill_id,
            bill_url,
            feed_url,
            last_update: None,
        }
    }

    pub fn bill_id(&self) -> u32 {
        self.bill_id
    }

    pub fn bill_url(&self) -> &str {
        &self.bill_url
    }

    pub fn feed_url(&self) -> &str {
        &self.feed_url
    }

    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        self.last_update
    }

    /// An update is worth handling when the feed has never been seen, or when
    /// it is strictly newer than the watermark.
    pub(crate) fn is_new(&self, updated: DateTime<Utc>) -> bool {
        match self.last_update {
            None => true,
            Some(watermark) => updated > watermark,
        }
    }

    pub(crate) fn commit(&mut self, updated: DateTime<Utc>) {
        if self.is_new(updated) {
            self.last_update = Some(updated);
        }
    }
}
