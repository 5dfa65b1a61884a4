use std::collections::HashSet;
use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use tracing::{debug, warn};
use url::Url;

use crate::error::SourceError;

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36";

/// Substring marker in the lower-cased home page → platform label.
pub const TECH_MARKERS: &[(&[&str], &str)] = &[
    (&["data-wf-domain", "webflow"], "Webflow"),
    (&["data-framer-hydrate-v2", "framer"], "Framer"),
    (&["shopify"], "Shopify"),
    (&["wordpress"], "WordPress"),
    (&["next.js", "nextjs"], "Next.js"),
    (&["react"], "React"),
    (&["vue"], "Vue"),
    (&["angular"], "Angular"),
];

pub const BLOG_PATHS: &[&str] = &[
    "/blog",
    "/articles",
    "/news",
    "/insights",
    "/resources",
    "/content",
    "/stories",
    "/updates",
    "/journal",
];

pub const CUSTOMER_PATHS: &[&str] = &[
    "/customers",
    "/case-studies",
    "/partners",
    "/clients",
    "/success-stories",
    "/testimonials",
    "/trusted-by",
    "/who-uses",
    "/customers-success",
    "/partners-customers",
];

const CUSTOMER_INDICATORS: &[&str] = &[
    "trusted by",
    "used by",
    "powering",
    "customers include",
    "partners include",
    "clients include",
    "success stories",
    "case studies",
    "testimonials",
];

const FALSE_POSITIVES: &[&str] = &[
    "home", "about", "contact", "privacy", "terms", "login", "signup", "menu", "search",
];

const MAX_CUSTOMERS: usize = 10;
const INDICATOR_WINDOW: usize = 250;
const NAMES_PER_INDICATOR: usize = 5;

static CAPITALIZED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[A-Z][a-z]+(?:\s+[A-Z][a-z]+)*\b").unwrap());
static CUSTOMER_ELEMENT_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)<h[1-6][^>]*>([^<]+)</h[1-6]>",
        r#"(?i)<div[^>]*class="[^"]*logo[^"]*"[^>]*>([^<]+)</div>"#,
        r#"(?i)<span[^>]*class="[^"]*company[^"]*"[^>]*>([^<]+)</span>"#,
        r#"(?i)<img[^>]*alt="([^"]*)"[^>]*>"#,
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});
static NON_WORD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w\s]").unwrap());
static INDICATOR_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    CUSTOMER_INDICATORS
        .iter()
        .map(|i| Regex::new(&format!("(?i){}", regex::escape(i))).unwrap())
        .collect()
});

pub struct PageResponse {
    pub status: u16,
    pub body: String,
}

/// GET a page. Any status is a response; only transport failures are errors.
#[async_trait]
pub trait PageClient: Send + Sync {
    async fn get(&self, url: &str) -> Result<PageResponse, SourceError>;
}

pub struct HttpClient {
    client: reqwest::Client,
}

impl HttpClient {
    pub fn new(timeout: Duration) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|source| SourceError::Http {
                url: String::new(),
                source,
            })?;
        Ok(HttpClient { client })
    }
}

#[async_trait]
impl PageClient for HttpClient {
    async fn get(&self, url: &str) -> Result<PageResponse, SourceError> {
        let http = |source| SourceError::Http {
            url: url.to_string(),
            source,
        };
        let response = self.client.get(url).send().await.map_err(http)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(http)?;
        Ok(PageResponse { status, body })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlogPresence {
    /// First candidate path that answered 200.
    Page(String),
    /// No blog page, but the sitemap mentions one.
    SitemapOnly,
}

impl BlogPresence {
    pub fn as_cell(&self) -> &str {
        match self {
            BlogPresence::Page(url) => url,
            BlogPresence::SitemapOnly => "sitemap_blog",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SiteProbe {
    pub tech_stack: Vec<String>,
    pub blog_url: Option<String>,
    pub customers: Vec<String>,
}

/// Platform labels whose markers occur in the page, in `TECH_MARKERS` order.
pub fn tech_stack(body: &str) -> Vec<String> {
    let html = body.to_lowercase();
    TECH_MARKERS
        .iter()
        .filter(|(markers, _)| markers.iter().any(|m| html.contains(m)))
        .map(|(_, label)| label.to_string())
        .collect()
}

/// Website cell as a fetchable URL: trimmed, `https://` added when no scheme is given.
pub fn normalize_website(website: &str) -> Option<String> {
    let website = website.trim();
    if website.is_empty() {
        None
    } else if website.starts_with("http") {
        Some(website.to_string())
    } else {
        Some(format!("https://{}", website))
    }
}

fn join(website: &Url, path: &str) -> Option<String> {
    website.join(path).ok().map(String::from)
}

fn parse_site(website: &str) -> Result<Url, SourceError> {
    Url::parse(website).map_err(|source| SourceError::Url {
        url: website.to_string(),
        source,
    })
}

pub async fn blog_presence<C: PageClient + ?Sized>(client: &C, website: &str) -> Option<BlogPresence> {
    let base = parse_site(website).ok()?;

    for path in BLOG_PATHS {
        let Some(url) = join(&base, path) else { continue };
        match client.get(&url).await {
            Ok(r) if r.status == 200 => return Some(BlogPresence::Page(url)),
            Ok(r) => debug!(url = %url, status = r.status, "no blog here"),
            Err(e) => debug!("blog probe {} failed: {}", url, e),
        }
    }

    let sitemap = join(&base, "/sitemap.xml")?;
    match client.get(&sitemap).await {
        Ok(r) if r.status == 200 && r.body.to_lowercase().contains("blog") => Some(BlogPresence::SitemapOnly),
        _ => None,
    }
}

/// Capitalized names near customer indicators on the home page.
fn indicator_mentions(body: &str) -> Vec<String> {
    let mut found = Vec::new();
    for re in INDICATOR_RES.iter() {
        let Some(m) = re.find(body) else { continue };
        let start = floor_char_boundary(body, m.start().saturating_sub(INDICATOR_WINDOW));
        let end = floor_char_boundary(body, m.start() + INDICATOR_WINDOW);
        found.extend(
            CAPITALIZED_RE
                .find_iter(&body[start..end])
                .take(NAMES_PER_INDICATOR)
                .map(|m| m.as_str().to_string()),
        );
    }
    found
}

// Window edges are byte offsets and may land inside a multi-byte char
fn floor_char_boundary(s: &str, mut idx: usize) -> usize {
    idx = idx.min(s.len());
    while !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

/// Headings, logo and company elements, and image alt text on a customers page.
fn element_mentions(body: &str) -> Vec<String> {
    CUSTOMER_ELEMENT_RES
        .iter()
        .flat_map(|re| re.captures_iter(body).map(|c| c[1].to_string()).collect::<Vec<_>>())
        .map(|m| NON_WORD_RE.replace_all(&m, "").trim().to_string())
        .filter(|m| m.len() > 2 && m.len() < 50)
        .collect()
}

/// Cleaned, de-duplicated mentions with navigation words dropped.
pub fn dedup_customers(found: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    found
        .into_iter()
        .map(|c| c.trim().to_string())
        .filter(|c| c.len() > 2 && !FALSE_POSITIVES.contains(&c.to_lowercase().as_str()))
        .filter(|c| seen.insert(c.clone()))
        .take(MAX_CUSTOMERS)
        .collect()
}

/// Customer mentions from an already fetched home page plus the candidate customer pages.
pub async fn customers_from<C: PageClient + ?Sized>(client: &C, base: &Url, home: Option<&str>) -> Vec<String> {
    let mut found = home.map(indicator_mentions).unwrap_or_default();

    for path in CUSTOMER_PATHS {
        let Some(url) = join(base, path) else { continue };
        match client.get(&url).await {
            Ok(r) if r.status == 200 => found.extend(element_mentions(&r.body)),
            Ok(_) => {}
            Err(e) => debug!("customer page {} failed: {}", url, e),
        }
    }

    dedup_customers(found)
}

/// Tech stack, blog and customers for one website. The home page is fetched once
/// and shared. Never fails: an unreachable site is an empty result.
pub async fn probe_site<C: PageClient + ?Sized>(client: &C, website: &str) -> SiteProbe {
    let Some(website) = normalize_website(website) else {
        return SiteProbe::default();
    };
    let base = match parse_site(&website) {
        Ok(base) => base,
        Err(e) => {
            warn!("Skipping {}: {}", website, e);
            return SiteProbe::default();
        }
    };

    let home = match client.get(&website).await {
        Ok(home) => Some(home.body),
        Err(e) => {
            warn!("Error fetching {}: {}", website, e);
            None
        }
    };
    let blog = blog_presence(client, &website).await;
    let customers = customers_from(client, &base, home.as_deref()).await;

    SiteProbe {
        tech_stack: home.as_deref().map(tech_stack).unwrap_or_default(),
        blog_url: blog.map(|b| b.as_cell().to_string()),
        customers,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Answers from a fixed url → (status, body) table; unknown urls fail.
    /// Every requested url is recorded.
    #[derive(Default)]
    pub(crate) struct FakeClient {
        pages: HashMap<String, (u16, String)>,
        requested: Mutex<Vec<String>>,
    }

    impl FakeClient {
        pub(crate) fn page(mut self, url: &str, status: u16, body: &str) -> Self {
            self.pages.insert(url.to_string(), (status, body.to_string()));
            self
        }

        pub(crate) fn requests_for(&self, url: &str) -> usize {
            self.requested.lock().unwrap().iter().filter(|u| *u == url).count()
        }

        pub(crate) fn requests(&self) -> Vec<String> {
            self.requested.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PageClient for FakeClient {
        async fn get(&self, url: &str) -> Result<PageResponse, SourceError> {
            self.requested.lock().unwrap().push(url.to_string());
            match self.pages.get(url) {
                Some((status, body)) => Ok(PageResponse {
                    status: *status,
                    body: body.clone(),
                }),
                None => Err(SourceError::Empty(url.to_string())),
            }
        }
    }

    #[test]
    fn tech_stack_in_marker_order() {
        let body = r#"<html data-wf-domain="x"><script src="/_next/static/react.js"></script>"#;
        assert_eq!(tech_stack(body), vec!["Webflow", "React"]);
        assert!(tech_stack("<html>plain</html>").is_empty());
    }

    #[test]
    fn tech_stack_case_insensitive() {
        assert_eq!(tech_stack("Built with Next.js and WordPress"), vec!["WordPress", "Next.js"]);
    }

    #[tokio::test]
    async fn first_blog_candidate_wins() {
        let client = FakeClient::default()
            .page("https://site.test/blog", 404, "")
            .page("https://site.test/articles", 200, "posts")
            .page("https://site.test/news", 200, "news");
        assert_eq!(
            blog_presence(&client, "https://site.test").await,
            Some(BlogPresence::Page("https://site.test/articles".into()))
        );
    }

    #[tokio::test]
    async fn sitemap_mention_is_sentinel() {
        let client = FakeClient::default().page(
            "https://site.test/sitemap.xml",
            200,
            "<urlset><url><loc>https://site.test/Blog/post-1</loc></url></urlset>",
        );
        let presence = blog_presence(&client, "https://site.test").await;
        assert_eq!(presence, Some(BlogPresence::SitemapOnly));
        assert_eq!(presence.unwrap().as_cell(), "sitemap_blog");
    }

    #[tokio::test]
    async fn no_blog_anywhere() {
        let client = FakeClient::default().page("https://site.test/sitemap.xml", 200, "<urlset/>");
        assert_eq!(blog_presence(&client, "https://site.test").await, None);
        assert_eq!(blog_presence(&client, "not a url").await, None);
    }

    #[tokio::test]
    async fn customers_from_home_and_customer_pages() {
        let client = FakeClient::default()
            .page(
                "https://site.test",
                200,
                "<p>Trusted by teams at Stripe and Notion</p>",
            )
            .page(
                "https://site.test/customers",
                200,
                r#"<h2>Home</h2><h3>Linear</h3><div class="logo-grid">Ramp!</div><img src="x.png" alt="Vercel logo">"#,
            );
        let base = Url::parse("https://site.test").unwrap();
        let home = client.get("https://site.test").await.unwrap().body;
        let found = customers_from(&client, &base, Some(&home)).await;
        assert!(found.contains(&"Stripe".to_string()));
        assert!(found.contains(&"Linear".to_string()));
        assert!(found.contains(&"Ramp".to_string()));
        assert!(found.contains(&"Vercel logo".to_string()));
        assert!(!found.iter().any(|c| c == "Home"));
    }

    #[test]
    fn customers_capped_and_deduplicated() {
        let mut names: Vec<String> = (0..15).map(|i| format!("Company{}", i)).collect();
        names.push("Company1".into());
        let out = dedup_customers(names);
        assert_eq!(out.len(), MAX_CUSTOMERS);
        assert_eq!(out[1], "Company1");
    }

    #[tokio::test]
    async fn unreachable_site_is_empty_result() {
        let probe = probe_site(&FakeClient::default(), "https://down.test").await;
        assert_eq!(probe, SiteProbe::default());
        assert_eq!(probe_site(&FakeClient::default(), "  ").await, SiteProbe::default());
    }

    #[tokio::test]
    async fn every_page_requested_at_most_once() {
        let client = FakeClient::default()
            .page(
                "https://site.test",
                200,
                "<html data-framer-hydrate-v2><p>Used by Linear</p></html>",
            )
            .page("https://site.test/blog", 200, "posts");
        let site = probe_site(&client, "https://site.test").await;

        assert_eq!(site.tech_stack, vec!["Framer"]);
        assert_eq!(site.customers, vec!["Used", "Linear"]);
        assert_eq!(client.requests_for("https://site.test"), 1);
        let requested = client.requests();
        let unique: HashSet<_> = requested.iter().collect();
        assert_eq!(unique.len(), requested.len());
        // home, first blog candidate, every customer page
        assert_eq!(requested.len(), 1 + 1 + CUSTOMER_PATHS.len());
    }

    #[test]
    fn bare_domains_get_https() {
        assert_eq!(normalize_website("acme.com").as_deref(), Some("https://acme.com"));
        assert_eq!(normalize_website(" http://acme.com ").as_deref(), Some("http://acme.com"));
        assert_eq!(normalize_website("https://acme.com").as_deref(), Some("https://acme.com"));
        assert_eq!(normalize_website(""), None);
    }

    #[tokio::test]
    async fn scheme_less_website_is_still_checked() {
        let client = FakeClient::default()
            .page("https://acme.com", 200, "<script>window.__NEXT_DATA__ nextjs</script>")
            .page("https://acme.com/blog", 200, "posts");
        let site = probe_site(&client, "acme.com").await;
        assert_eq!(site.tech_stack, vec!["Next.js"]);
        assert_eq!(site.blog_url.as_deref(), Some("https://acme.com/blog"));
    }

    #[test]
    fn indicator_window_uses_unlowered_text() {
        // "İ" grows by a byte when lower-cased
        let body = format!("{} Trusted by Stripe", "İ".repeat(300));
        assert_eq!(indicator_mentions(&body), vec!["Trusted", "Stripe"]);
        assert_eq!(indicator_mentions("<p>TRUSTED BY Acme Robotics</p>"), vec!["Acme Robotics"]);
    }
}
