use std::time::Duration;

use anyhow::Context;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::header::{self, HeaderMap, HeaderValue};
use serde::Deserialize;
use tracing::{error, info, warn};

use crate::error::{HarvestError, Result};
use crate::record::ExhibitorRecord;
use crate::settings::Settings;

const SORT_ORDER: &str = "corder-asc~Name-asc";
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded; charset=UTF-8";
const ORIGIN: &str = "https://conxemar.net";
const REFERER: &str = "https://conxemar.net/Conxemar2022/en/company/search";
const USER_AGENT: &str = "Mozilla/5.0 (Linux; Android 11.0; Surface Duo) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/137.0.0.0 Mobile Safari/537.36";

/// Filter flags the listing endpoint expects on every request.
const QUERY_PARAMS: &[(&str, &str)] = &[
    ("Sector1", "0"),
    ("Sector2", "0"),
    ("Sector3", "0"),
    ("Index", "System.Collections.Generic.List`1[System.String]"),
    ("IsNew", "false"),
    ("IsSpecial", "false"),
    ("HasProducts", "false"),
    ("hasActivities", "false"),
    ("Tags", "System.Collections.Generic.List`1[System.Web.Mvc.SelectListItem]"),
    (
        "AvailableSubindustries",
        "System.Collections.Generic.List`1[System.Web.Mvc.SelectListItem]",
    ),
    ("SelectedSubindustryID", "0"),
    ("ProductTag1", "false"),
    ("ProductTag2", "false"),
    ("FilterByCountry", "true"),
    ("FilterByState", "false"),
    ("AnyFilterAddress", "true"),
    ("Feat_Avoid_Sector_Propagation", "false"),
    ("IdCompany", "0"),
    ("idEvent", "0"),
    ("iFrameMode", "false"),
    (
        "Features",
        "System.Collections.Generic.Dictionary`2[System.String,System.Object]",
    ),
    (
        "HelpTexts",
        "System.Collections.Generic.Dictionary`2[System.String,IventPublicPortal.Models.HelpTextModelView]",
    ),
];

/// One page of the remote listing.
#[allow(async_fn_in_trait)]
pub trait PageSource {
    async fn fetch_page(&self, page: u32, page_size: u32) -> Result<Vec<ExhibitorRecord>>;
}

pub struct FetchOptions {
    pub page_size: u32,
    pub delay: Duration,
    pub max_pages: Option<u32>,
}

impl From<&Settings> for FetchOptions {
    fn from(s: &Settings) -> Self {
        FetchOptions {
            page_size: s.page_size,
            delay: s.page_delay(),
            max_pages: s.max_pages,
        }
    }
}

/// Fetch pages 1.. until a short or empty page, or the first failure.
///
/// Failures end the loop but keep everything collected so far.
pub async fn fetch_all<S: PageSource>(source: &S, opts: &FetchOptions) -> Vec<ExhibitorRecord> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );

    let mut records: Vec<ExhibitorRecord> = Vec::new();
    let mut page = 1u32;

    loop {
        pb.set_message(format!("page {} ({} records so far)", page, records.len()));
        let batch = match source.fetch_page(page, opts.page_size).await {
            Ok(batch) => batch,
            Err(e) => {
                error!("Stopping collection at page {}: {}", page, e);
                break;
            }
        };

        let n = batch.len();
        info!("Page {}: {} records", page, n);
        if n == 0 {
            break;
        }
        records.extend(batch);
        pb.tick();

        if n < opts.page_size as usize {
            break;
        }
        if opts.max_pages.is_some_and(|max| page >= max) {
            warn!("Reached page cap ({}), stopping collection", page);
            break;
        }

        page += 1;
        tokio::time::sleep(opts.delay).await;
    }

    pb.finish_and_clear();
    info!("Collected {} records", records.len());
    records
}

/// `PageSource` backed by the live listing endpoint.
pub struct HttpPageSource {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpPageSource {
    pub fn new(settings: &Settings) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static("*/*"));
        headers.insert(header::ORIGIN, HeaderValue::from_static(ORIGIN));
        headers.insert(header::REFERER, HeaderValue::from_static(REFERER));
        headers.insert(
            "X-Requested-With",
            HeaderValue::from_static("XMLHttpRequest"),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(USER_AGENT)
            .timeout(settings.request_timeout())
            .build()
            .context("Failed to build HTTP client")?;

        Ok(HttpPageSource {
            client,
            endpoint: settings.endpoint_url.clone(),
        })
    }

    /// POST for one page: fixed filter query plus the paging form body.
    fn request(&self, page: u32, page_size: u32) -> reqwest::RequestBuilder {
        let body = format!(
            "sort={}&page={}&pageSize={}&group=&filter=",
            SORT_ORDER, page, page_size
        );
        self.client
            .post(&self.endpoint)
            .query(QUERY_PARAMS)
            .header(header::CONTENT_TYPE, FORM_CONTENT_TYPE)
            .body(body)
    }
}

impl PageSource for HttpPageSource {
    async fn fetch_page(&self, page: u32, page_size: u32) -> Result<Vec<ExhibitorRecord>> {
        info!("Requesting page {}", page);
        let response = self
            .request(page, page_size)
            .send()
            .await
            .map_err(|source| HarvestError::Network { page, source })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|source| HarvestError::Network { page, source })?;

        parse_page(page, status, &body)
    }
}

#[derive(Deserialize)]
struct PageResponse {
    #[serde(rename = "Data")]
    data: Option<Vec<ExhibitorRecord>>,
}

fn parse_page(page: u32, status: u16, body: &str) -> Result<Vec<ExhibitorRecord>> {
    if status != 200 {
        return Err(HarvestError::InvalidResponse {
            page,
            reason: format!("HTTP {}", status),
        });
    }
    let parsed: PageResponse =
        serde_json::from_str(body).map_err(|e| HarvestError::InvalidResponse {
            page,
            reason: format!("malformed body: {}", e),
        })?;
    parsed.data.ok_or_else(|| HarvestError::InvalidResponse {
        page,
        reason: "missing Data array".into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::time::Instant;

    /// Serves pages of the given sizes; any page past the script fails.
    struct ScriptedSource {
        pages: Vec<Option<usize>>,
        requested: RefCell<Vec<u32>>,
    }

    impl ScriptedSource {
        fn new(pages: Vec<Option<usize>>) -> Self {
            ScriptedSource {
                pages,
                requested: RefCell::new(Vec::new()),
            }
        }

        fn requests(&self) -> Vec<u32> {
            self.requested.borrow().clone()
        }
    }

    impl PageSource for ScriptedSource {
        async fn fetch_page(&self, page: u32, _page_size: u32) -> Result<Vec<ExhibitorRecord>> {
            self.requested.borrow_mut().push(page);
            match self.pages.get(page as usize - 1).copied().flatten() {
                Some(n) => Ok((0..n)
                    .map(|i| {
                        serde_json::from_value(serde_json::json!({
                            "Name": format!("p{}-{}", page, i)
                        }))
                        .unwrap()
                    })
                    .collect()),
                None => Err(HarvestError::InvalidResponse {
                    page,
                    reason: "scripted failure".into(),
                }),
            }
        }
    }

    fn opts(max_pages: Option<u32>) -> FetchOptions {
        FetchOptions {
            page_size: 20,
            delay: Duration::ZERO,
            max_pages,
        }
    }

    fn names(records: &[ExhibitorRecord]) -> Vec<String> {
        records
            .iter()
            .map(|r| r.get("Name").unwrap().as_str().unwrap().to_string())
            .collect()
    }

    #[tokio::test]
    async fn short_page_ends_collection() {
        let source = ScriptedSource::new(vec![Some(20), Some(5), Some(20)]);
        let records = fetch_all(&source, &opts(None)).await;
        assert_eq!(records.len(), 25);
        assert_eq!(source.requests(), vec![1, 2]);
    }

    #[tokio::test]
    async fn empty_page_ends_collection() {
        let source = ScriptedSource::new(vec![Some(20), Some(20), Some(0)]);
        let records = fetch_all(&source, &opts(None)).await;
        assert_eq!(records.len(), 40);
        assert_eq!(source.requests(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn failure_keeps_partial_results() {
        let source = ScriptedSource::new(vec![Some(20), None]);
        let records = fetch_all(&source, &opts(None)).await;
        assert_eq!(records.len(), 20);
        assert_eq!(source.requests(), vec![1, 2]);
    }

    #[tokio::test]
    async fn first_page_failure_yields_nothing() {
        let source = ScriptedSource::new(vec![None]);
        assert!(fetch_all(&source, &opts(None)).await.is_empty());
    }

    #[tokio::test]
    async fn records_keep_response_order() {
        let source = ScriptedSource::new(vec![Some(20), Some(2)]);
        let records = fetch_all(&source, &opts(None)).await;
        let names = names(&records);
        assert_eq!(names[0], "p1-0");
        assert_eq!(names[19], "p1-19");
        assert_eq!(names[20], "p2-0");
        assert_eq!(names[21], "p2-1");
    }

    #[tokio::test]
    async fn page_cap_stops_full_pages() {
        let source = ScriptedSource::new(vec![Some(20); 10]);
        let records = fetch_all(&source, &opts(Some(3))).await;
        assert_eq!(records.len(), 60);
        assert_eq!(source.requests(), vec![1, 2, 3]);
    }

    async fn timed_fetch(pages: Vec<Option<usize>>, delay: Duration) -> (usize, Duration) {
        let source = ScriptedSource::new(pages);
        let opts = FetchOptions {
            page_size: 20,
            delay,
            max_pages: None,
        };
        let t0 = Instant::now();
        let records = fetch_all(&source, &opts).await;
        (records.len(), t0.elapsed())
    }

    #[tokio::test]
    async fn pauses_once_between_full_and_short_page() {
        let delay = Duration::from_millis(150);
        let (n, elapsed) = timed_fetch(vec![Some(20), Some(5)], delay).await;
        assert_eq!(n, 25);
        assert!(elapsed >= delay, "no pause after page 1: {:?}", elapsed);
        assert!(elapsed < delay * 2, "paused after the last page: {:?}", elapsed);
    }

    #[tokio::test]
    async fn no_pause_after_single_short_page() {
        let delay = Duration::from_millis(300);
        let (n, elapsed) = timed_fetch(vec![Some(3)], delay).await;
        assert_eq!(n, 3);
        assert!(elapsed < delay, "paused after the last page: {:?}", elapsed);
    }

    #[test]
    fn request_carries_filters_and_paging_form() {
        let source = HttpPageSource::new(&Settings::default()).unwrap();
        let req = source.request(3, 20).build().unwrap();

        assert_eq!(req.method(), reqwest::Method::POST);
        assert!(req.url().as_str().starts_with(crate::settings::DEFAULT_ENDPOINT));

        let query: Vec<(String, String)> = req
            .url()
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        let expected: Vec<(String, String)> = QUERY_PARAMS
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        assert_eq!(query, expected);

        assert_eq!(
            req.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/x-www-form-urlencoded; charset=UTF-8"
        );
        let body = req.body().and_then(|b| b.as_bytes()).unwrap();
        assert_eq!(
            body,
            b"sort=corder-asc~Name-asc&page=3&pageSize=20&group=&filter=".as_slice()
        );
    }

    #[test]
    fn parse_page_reads_data_array() {
        let body = r#"{"Data":[{"Name":"Acme","HasLogo":true}],"Total":1}"#;
        let records = parse_page(1, 200, body).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("Name").unwrap(), "Acme");
    }

    #[test]
    fn parse_page_rejects_bad_responses() {
        assert!(matches!(
            parse_page(2, 500, r#"{"Data":[]}"#),
            Err(HarvestError::InvalidResponse { page: 2, .. })
        ));
        assert!(matches!(
            parse_page(1, 200, r#"{"Errors":"boom"}"#),
            Err(HarvestError::InvalidResponse { .. })
        ));
        assert!(matches!(
            parse_page(1, 200, "<html>"),
            Err(HarvestError::InvalidResponse { .. })
        ));
    }
}
