//! The tick loop itself (NewsAgent §4.6 steps 1-7).

use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use tokio::sync::{Mutex, Semaphore};
use tracing::{debug, error, info, warn};
use url::Url;

use crate::browser_pool::BrowserPool;
use crate::governance::GovernanceGatekeeper;
use crate::models::Source;
use crate::notifier::ErrorNotifier;
use crate::pipeline::stages::extract_links::is_valid_link;
use crate::store::Store;

const TICK_INTERVAL: Duration = Duration::from_secs(60);
const LISTING_NAV_TIMEOUT: Duration = Duration::from_secs(60);

/// Runs [`tick_once`] every minute, forever. A tick still running when the
/// next one comes due is never cancelled — the next tick is simply skipped
/// (NewsAgent §5).
pub async fn run_tick_loop(
    store: Store,
    governance: Arc<Mutex<GovernanceGatekeeper>>,
    browser_pool: Arc<BrowserPool>,
    notifier: Arc<ErrorNotifier>,
    submission_source_id: String,
    main_api_url: String,
    api_key: String,
    concurrency: usize,
) {
    let mut interval = tokio::time::interval(TICK_INTERVAL);
    loop {
        interval.tick().await;
        tick_once(
            &store,
            Arc::clone(&governance),
            Arc::clone(&browser_pool),
            Arc::clone(&notifier),
            &submission_source_id,
            &main_api_url,
            &api_key,
            concurrency,
        )
        .await;
    }
}

/// One discovery pass over every active, due source (NewsAgent §4.6).
pub async fn tick_once(
    store: &Store,
    governance: Arc<Mutex<GovernanceGatekeeper>>,
    browser_pool: Arc<BrowserPool>,
    notifier: Arc<ErrorNotifier>,
    submission_source_id: &str,
    main_api_url: &str,
    api_key: &str,
    concurrency: usize,
) {
    let sources = match store.active_sources().await {
        Ok(s) => s,
        Err(e) => {
            error!("scheduler tick: failed to load active sources: {e}");
            return;
        }
    };

    let now = chrono::Utc::now();
    let due: Vec<Source> = sources.into_iter().filter(|s| s.is_due(now)).collect();
    if due.is_empty() {
        return;
    }
    info!("scheduler tick: {} due sources", due.len());

    let semaphore = Arc::new(Semaphore::new(concurrency));
    let mut handles = Vec::new();

    for source in due {
        let permit = Arc::clone(&semaphore);
        let store = store.clone();
        let governance = Arc::clone(&governance);
        let browser_pool = Arc::clone(&browser_pool);
        let notifier = Arc::clone(&notifier);
        let submission_source_id = submission_source_id.to_string();
        let main_api_url = main_api_url.to_string();
        let api_key = api_key.to_string();

        handles.push(tokio::spawn(async move {
            let _permit = permit.acquire_owned().await.expect("semaphore never closed");
            process_source(
                &store,
                governance,
                browser_pool,
                notifier,
                source,
                &submission_source_id,
                &main_api_url,
                &api_key,
            )
            .await;
        }));
    }

    for handle in handles {
        let _ = handle.await;
    }
}

async fn process_source(
    store: &Store,
    governance: Arc<Mutex<GovernanceGatekeeper>>,
    browser_pool: Arc<BrowserPool>,
    notifier: Arc<ErrorNotifier>,
    source: Source,
    submission_source_id: &str,
    main_api_url: &str,
    api_key: &str,
) {
    let result = run_source_check(store, Arc::clone(&governance), Arc::clone(&browser_pool), &source, submission_source_id, main_api_url, api_key).await;

    if let Err(e) = result {
        error!("scheduler: source {} check failed: {e}", source.id);
        let job_id = format!("scheduler-{}", source.id);
        notifier.notify(&job_id, &source.listing_url, &e.to_string(), None).await;
    }

    if let Err(e) = store.touch_source_last_run(&source.id).await {
        warn!("scheduler: failed to update last_run_at for {}: {e}", source.id);
    }
}

async fn run_source_check(
    store: &Store,
    governance: Arc<Mutex<GovernanceGatekeeper>>,
    browser_pool: Arc<BrowserPool>,
    source: &Source,
    submission_source_id: &str,
    main_api_url: &str,
    api_key: &str,
) -> anyhow::Result<()> {
    let allowed = governance.lock().await.can_fetch(&source.listing_url).await?;
    if !allowed {
        debug!("scheduler: {} blocked by robots.txt", source.listing_url);
        return Ok(());
    }
    governance.lock().await.wait_for_slot(&source.listing_url).await;

    let html = fetch_listing_html(&browser_pool, &source.listing_url).await?;
    let candidates = extract_candidate_urls(&html, &source.listing_url, source.url_pattern.as_deref());
    if candidates.is_empty() {
        return Ok(());
    }

    let existing = store.existing_urls(&candidates).await?;
    let existing_set: std::collections::HashSet<&String> = existing.iter().collect();
    let new_urls: Vec<&String> = candidates.iter().filter(|u| !existing_set.contains(u)).collect();

    let client = reqwest::Client::new();
    for url in new_urls {
        let article = store.insert_discovered(&source.id, url).await?;

        let submission = client
            .post(format!("{main_api_url}/submit-job"))
            .header("X-API-Key", api_key)
            .json(&serde_json::json!({ "source_url": url, "max_retries": 3 }))
            .send()
            .await;

        match submission {
            Ok(resp) if resp.status().is_success() => {}
            _ => {
                if let Err(e) = store.mark_submission_failed(&article.id).await {
                    warn!("scheduler: failed to mark submission_failed for {}: {e}", article.id);
                }
            }
        }
    }

    // `submission_source_id` is the catch-all source attributed to
    // manually-submitted URLs that never came through a listing page; kept
    // here only to document that relationship for readers of this module.
    let _ = submission_source_id;

    Ok(())
}

async fn fetch_listing_html(browser_pool: &Arc<BrowserPool>, listing_url: &str) -> anyhow::Result<String> {
    let guard = browser_pool.acquire().await?;
    let page = guard.browser().new_page("about:blank").await?;
    tokio::time::timeout(LISTING_NAV_TIMEOUT, page.goto(listing_url)).await??;
    let html = page.content().await?;
    Ok(html)
}

/// URL path/query patterns indicating ads or trackers (ground truth:
/// `scheduler/link_discovery.py`'s `AD_PATTERNS`), checked in addition to
/// the domain/text blocklist shared with `extract_links::is_valid_link`.
static AD_URL_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"/ads/",
        r"/ad/",
        r"doubleclick",
        r"googlead",
        r"outbrain",
        r"taboola",
        r"click\?",
        r"campaign",
        r"sponsored",
        r"promotion",
    ]
    .iter()
    .map(|p| Regex::new(&format!("(?i){p}")).expect("static ad url pattern"))
    .collect()
});

fn is_ad_url(url: &str) -> bool {
    AD_URL_PATTERNS.iter().any(|re| re.is_match(url))
}

fn extract_candidate_urls(html: &str, listing_url: &str, url_pattern: Option<&str>) -> Vec<String> {
    let Ok(base) = Url::parse(listing_url) else {
        return Vec::new();
    };
    let Some(base_host) = base.host_str().map(str::to_string) else {
        return Vec::new();
    };

    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse("a") else {
        return Vec::new();
    };

    // Noise elements (nav chrome, ad/sponsored containers) are excluded by
    // ancestor membership rather than removed from the tree, matching
    // `scheduler/link_discovery.py`'s decompose-then-find_all pass.
    let Ok(noise_selector) = Selector::parse("header, footer, nav, .ad, .advertisement, .sponsored, aside") else {
        return Vec::new();
    };
    let noise_ids: std::collections::HashSet<_> = document.select(&noise_selector).map(|el| el.id()).collect();

    let mut urls = Vec::new();
    for el in document.select(&selector) {
        if el.ancestors().any(|a| noise_ids.contains(&a.id())) {
            continue;
        }

        let href = el.value().attr("href").unwrap_or_default();
        let text: String = el.text().collect::<Vec<_>>().join(" ").trim().to_string();

        if !is_valid_link(href, &text) {
            continue;
        }
        let Ok(absolute) = base.join(href) else {
            continue;
        };
        if absolute.host_str() != Some(base_host.as_str()) {
            continue;
        }
        if is_ad_url(absolute.as_str()) {
            continue;
        }
        if let Some(pattern) = url_pattern {
            if !absolute.as_str().contains(pattern) {
                continue;
            }
        }
        urls.push(absolute.to_string());
    }

    urls.sort();
    urls.dedup();
    urls
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_only_same_host_links() {
        let html = r#"<html><body>
            <a href="/articles/one">One</a>
            <a href="https://other.example/articles/two">Two</a>
        </body></html>"#;
        let urls = extract_candidate_urls(html, "https://news.example/listing", None);
        assert_eq!(urls, vec!["https://news.example/articles/one".to_string()]);
    }

    #[test]
    fn applies_url_pattern_filter() {
        let html = r#"<html><body>
            <a href="/articles/one">One</a>
            <a href="/videos/two">Two</a>
        </body></html>"#;
        let urls = extract_candidate_urls(html, "https://news.example/listing", Some("/articles/"));
        assert_eq!(urls, vec!["https://news.example/articles/one".to_string()]);
    }

    #[test]
    fn rejects_ad_url_substrings() {
        let html = r#"<html><body>
            <a href="/articles/one">One</a>
            <a href="/sponsored/two">Two</a>
        </body></html>"#;
        let urls = extract_candidate_urls(html, "https://news.example/listing", None);
        assert_eq!(urls, vec!["https://news.example/articles/one".to_string()]);
    }

    #[test]
    fn excludes_links_nested_in_noise_elements() {
        let html = r#"<html><body>
            <nav><a href="/articles/nav-link">Nav link</a></nav>
            <aside class="sponsored"><a href="/articles/aside-link">Aside link</a></aside>
            <a href="/articles/real">Real article</a>
        </body></html>"#;
        let urls = extract_candidate_urls(html, "https://news.example/listing", None);
        assert_eq!(urls, vec!["https://news.example/articles/real".to_string()]);
    }
}
