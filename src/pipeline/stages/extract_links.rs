//! Stage 2: extract_links (grounded in `graph/nodes/extract_links.py`).

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use url::Url;

use crate::models::{EmbeddedLink, WorkflowState};

const DOMAIN_BLOCKLIST: &[&str] = &[
    "doubleclick.net",
    "googleadservices.com",
    "googlesyndication.com",
    "adservice.google.com",
    "analytics.google.com",
    "facebook.com",
    "twitter.com",
    "linkedin.com",
    "instagram.com",
    "pinterest.com",
    "ad.doubleclick.net",
    "c.ad.doubleclick.net",
    "platform.twitter.com",
    "syndication.twitter.com",
    "adobedtm.com",
    "omtrdc.net",
    "outbrain.com",
    "taboola.com",
    "sharethrough.com",
    "adsrvr.org",
];

static TEXT_BLOCKLIST_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"^share$",
        r"^tweet$",
        r"^post$",
        r"^facebook$",
        r"^twitter$",
        r"^linkedin$",
        r"^pinterest$",
        r"^advertisement$",
        r"^related:$",
        r"share on.*",
        r"share to.*",
    ]
    .iter()
    .map(|p| Regex::new(&format!("(?i){p}")).expect("static blocklist pattern"))
    .collect()
});

pub(crate) fn is_valid_link(href: &str, text: &str) -> bool {
    if href.is_empty() || text.is_empty() {
        return false;
    }
    if href.starts_with('#') {
        return false;
    }
    if href.starts_with("javascript:") || href.starts_with("mailto:") {
        return false;
    }
    if TEXT_BLOCKLIST_PATTERNS.iter().any(|re| re.is_match(text)) {
        return false;
    }
    if let Ok(parsed) = Url::parse(href) {
        if let Some(domain) = parsed.host_str() {
            if DOMAIN_BLOCKLIST.iter().any(|blocked| domain.contains(blocked)) {
                return false;
            }
        }
    }
    true
}

pub fn extract_links(mut state: WorkflowState) -> WorkflowState {
    if state.is_failed() {
        return state;
    }

    let (Some(html), base_url) = (state.cleaned_article_html.clone(), state.source_url.clone()) else {
        return state;
    };
    if html.is_empty() {
        return state;
    }

    let Some(mut article) = state.article.clone() else {
        state.fail("Link extractor ran before Article was initialized.");
        return state;
    };

    let Ok(base) = Url::parse(&base_url) else {
        return state;
    };

    let document = Html::parse_document(&html);
    let Ok(a_selector) = Selector::parse("a") else {
        return state;
    };

    let mut links = Vec::new();
    for el in document.select(&a_selector) {
        let href = el.value().attr("href").unwrap_or_default();
        let text: String = el.text().collect::<Vec<_>>().join("").trim().to_string();

        if !is_valid_link(href, &text) {
            continue;
        }

        let Ok(absolute) = base.join(href) else {
            continue;
        };

        links.push(EmbeddedLink {
            hyperlink_text: text,
            absolute_url: absolute.to_string(),
            surrounding_context: text_of_parent(&el),
            relevance_score: None,
        });
    }

    article.embedded_links = links;
    state.article = Some(article);
    state
}

fn text_of_parent(el: &scraper::ElementRef) -> String {
    el.parent()
        .and_then(scraper::ElementRef::wrap)
        .map(|parent| parent.text().collect::<Vec<_>>().join(" ").trim().to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_fragment_and_mailto() {
        assert!(!is_valid_link("#comments", "Comments"));
        assert!(!is_valid_link("mailto:a@b.com", "Email us"));
    }

    #[test]
    fn rejects_blocklisted_domain() {
        assert!(!is_valid_link("https://www.facebook.com/share", "Open"));
    }

    #[test]
    fn rejects_share_text_pattern() {
        assert!(!is_valid_link("https://example.com/x", "Share on Facebook"));
    }

    #[test]
    fn accepts_plain_article_link() {
        assert!(is_valid_link("https://news.example.com/a/b", "Read more"));
    }

    #[test]
    fn surrounding_context_is_the_parent_text_not_the_anchor_text() {
        let html = r#"<html><body>
            <p>Officials announced the plan yesterday, see <a href="/a/b">this report</a> for details.</p>
        </body></html>"#;
        let document = Html::parse_document(html);
        let a_selector = Selector::parse("a").unwrap();
        let anchor = document.select(&a_selector).next().unwrap();
        let context = text_of_parent(&anchor);
        assert!(context.contains("Officials announced the plan"));
        assert!(context.contains("this report"));
    }
}
