// src/fetch.rs
//! Reconstruction of complete result sets from paginated REST endpoints. One
//! request learns the declared total, then every page is requested
//! concurrently and the pages are stitched together in page order.

use futures::future::try_join_all;
use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;
use serde_json::Value;

use crate::error::{Error, Result};

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "page_fetch_requests_total",
            "Individual page requests issued to paginated endpoints."
        );
        describe_counter!(
            "page_fetch_errors_total",
            "Page requests that returned a non-success status."
        );
    });
}

/// How the skip/take parameters are spelled. The commons votes service nests
/// them under a `queryParameters.` prefix; everything else takes them bare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipStyle {
    Bare,
    QueryParameters,
}

/// Fetch a JSON body, mapping any non-success status to `Error::Fetch`.
pub(crate) async fn get_json(client: &reqwest::Client, url: &str) -> Result<Value> {
    ensure_metrics_described();
    counter!("page_fetch_requests_total").increment(1);
    let resp = client.get(url).send().await?;
    let status = resp.status();
    if !status.is_success() {
        counter!("page_fetch_errors_total").increment(1);
        return Err(Error::Fetch {
            url: url.to_string(),
            status,
        });
    }
    Ok(resp.json::<Value>().await?)
}

/// Fetch a text body (feeds), mapping any non-success status to `Error::Fetch`.
pub(crate) async fn get_text(client: &reqwest::Client, url: &str) -> Result<String> {
    ensure_metrics_described();
    counter!("page_fetch_requests_total").increment(1);
    let resp = client.get(url).send().await?;
    let status = resp.status();
    if !status.is_success() {
        counter!("page_fetch_errors_total").increment(1);
        return Err(Error::Fetch {
            url: url.to_string(),
            status,
        });
    }
    Ok(resp.text().await?)
}

/// Pull the declared total out of a list response. The field name varies by
/// provider.
fn extract_total(body: &Value) -> Option<usize> {
    body.get("totalResults")
        .or_else(|| body.get("totalItems"))
        .and_then(Value::as_u64)
        .map(|v| v as usize)
}

/// The votes services answer with a bare array; the members/bills services
/// wrap the page in an object with an `items` field.
pub(crate) fn extract_items(body: Value) -> Result<Vec<Value>> {
    match body {
        Value::Array(items) => Ok(items),
        Value::Object(mut map) => match map.remove("items") {
            Some(Value::Array(items)) => Ok(items),
            _ => Err(Error::malformed("list response has no items array")),
        },
        _ => Err(Error::malformed("list response is neither array nor object")),
    }
}

fn page_count(total: usize, page_size: usize) -> usize {
    total.div_ceil(page_size.max(1)).max(1)
}

/// Build the request URL for one page. Page 0 is the bare URL; later pages
/// append skip/take, with `?` or `&` depending on the base URL's query string.
fn page_url(base: &str, style: SkipStyle, page: usize, page_size: usize) -> String {
    if page == 0 {
        return base.to_string();
    }
    let sep = if base.contains('?') { '&' } else { '?' };
    let skip = page * page_size;
    match style {
        SkipStyle::Bare => format!("{base}{sep}skip={skip}&take={page_size}"),
        SkipStyle::QueryParameters => format!(
            "{base}{sep}queryParameters.skip={skip}&queryParameters.take={page_size}"
        ),
    }
}

/// Fetch every page of `url` and return exactly `total` items in page order.
///
/// The first request learns the total unless the caller already knows it (some
/// endpoints report totals out-of-band). When no total can be determined the
/// first page's raw contents are returned verbatim. Any page failing fails the
/// whole call; partial results are never returned.
pub async fn fetch_paginated(
    client: &reqwest::Client,
    url: &str,
    page_size: usize,
    style: SkipStyle,
    total_override: Option<usize>,
) -> Result<Vec<Value>> {
    let total = match total_override {
        Some(t) => t,
        None => {
            let probe = get_json(client, url).await?;
            extract_total(&probe).unwrap_or(0)
        }
    };

    let pages = page_count(total, page_size);
    tracing::debug!(url, total, pages, "fetching paginated endpoint");

    let page_bodies = try_join_all((0..pages).map(|page| {
        let page_url = page_url(url, style, page, page_size);
        async move { get_json(client, &page_url).await }
    }))
    .await?;

    stitch_pages(page_bodies, total)
}

/// Concatenate page bodies in page order and cut the result to the declared
/// total. Upstream over-return is truncated away; a zero total means
/// "unknown" and passes everything through.
fn stitch_pages(page_bodies: Vec<Value>, total: usize) -> Result<Vec<Value>> {
    let mut items = Vec::new();
    for body in page_bodies {
        items.extend(extract_items(body)?);
    }
    if total > 0 {
        items.truncate(total);
    }
    Ok(items)
}
