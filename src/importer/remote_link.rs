// ==========================================
// Cadet Roster - Remote link resolver
// ==========================================
// Share link → direct download URL → Blob
// Network errors are retried with exponential backoff; content errors
// (HTTP 4xx, sign-in pages, HTML without a preview image) fail at once.
// ==========================================

use crate::domain::Blob;
use crate::importer::error::{ImportError, ImporterResult};
use crate::importer::importer_trait::BlobResolver;
use async_trait::async_trait;
use regex::Regex;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

const USER_AGENT: &str = concat!("cadet-roster/", env!("CARGO_PKG_VERSION"));

/// Rewrites known share-link shapes to their direct-download form.
/// Unknown links are returned unchanged.
pub fn rewrite_share_link(raw: &str) -> ImporterResult<Url> {
    let mut url = Url::parse(raw.trim())
        .map_err(|e| ImportError::UnresolvableLink(format!("{}: {}", raw, e)))?;
    let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
    let segments: Vec<String> = url
        .path_segments()
        .map(|s| s.map(str::to_string).collect())
        .unwrap_or_default();

    match host.as_str() {
        "drive.google.com" => {
            let file_id = match segments.as_slice() {
                [file, d, id, ..] if file == "file" && d == "d" => Some(id.clone()),
                _ => url
                    .query_pairs()
                    .find(|(k, _)| k == "id")
                    .map(|(_, v)| v.into_owned()),
            };
            if let Some(id) = file_id {
                url = Url::parse(&format!(
                    "https://drive.google.com/uc?export=download&id={}",
                    id
                ))
                .map_err(|e| ImportError::UnresolvableLink(e.to_string()))?;
            }
        }
        "docs.google.com" => {
            if let [kind, d, id, ..] = segments.as_slice() {
                if kind == "spreadsheets" && d == "d" {
                    url = Url::parse(&format!(
                        "https://docs.google.com/spreadsheets/d/{}/export?format=xlsx",
                        id
                    ))
                    .map_err(|e| ImportError::UnresolvableLink(e.to_string()))?;
                }
            }
        }
        "www.dropbox.com" | "dropbox.com" => {
            let pairs: Vec<(String, String)> = url
                .query_pairs()
                .filter(|(k, _)| k != "dl")
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect();
            url.query_pairs_mut()
                .clear()
                .extend_pairs(pairs)
                .append_pair("dl", "1");
        }
        "imgur.com" | "www.imgur.com" => {
            if let [id] = segments.as_slice() {
                url = Url::parse(&format!("https://i.imgur.com/{}.png", id))
                    .map_err(|e| ImportError::UnresolvableLink(e.to_string()))?;
            }
        }
        _ => {}
    }
    Ok(url)
}

/// `og:image` content from an HTML preview page (screenshot hosts).
pub fn scrape_og_image(html: &str) -> Option<String> {
    let pattern = Regex::new(
        r#"(?i)<meta[^>]+property\s*=\s*["']og:image["'][^>]*content\s*=\s*["']([^"']+)["']"#,
    )
    .ok()?;
    pattern
        .captures(html)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().replace("&amp;", "&"))
}

fn filename_from(url: &Url, disposition: Option<&str>) -> Option<String> {
    if let Some(d) = disposition {
        if let Some(idx) = d.find("filename=") {
            let name = d[idx + "filename=".len()..]
                .split(';')
                .next()
                .unwrap_or_default()
                .trim()
                .trim_matches('"');
            if !name.is_empty() {
                return Some(name.to_string());
            }
        }
    }
    url.path_segments()
        .and_then(|mut s| s.next_back())
        .filter(|s| s.contains('.'))
        .map(str::to_string)
}

// ==========================================
// HttpBlobResolver
// ==========================================
pub struct HttpBlobResolver {
    client: reqwest::Client,
    retry_budget: u32,
}

impl HttpBlobResolver {
    pub fn new(
        connect_timeout: Duration,
        read_timeout: Duration,
        retry_budget: u32,
    ) -> ImporterResult<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(read_timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ImportError::InternalError(format!("HTTP client: {}", e)))?;
        Ok(Self {
            client,
            retry_budget,
        })
    }

    /// GET with retries on network failures only.
    async fn fetch(&self, url: &Url) -> ImporterResult<Blob> {
        let mut backoff = Duration::from_millis(500);
        let mut attempt = 0;

        let response = loop {
            match self.client.get(url.clone()).send().await {
                Ok(resp) => break resp,
                Err(e) if attempt < self.retry_budget && (e.is_connect() || e.is_timeout() || e.is_request()) => {
                    attempt += 1;
                    warn!(url = %url, attempt, error = %e, "remote fetch failed, retrying");
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                }
                Err(e) => return Err(ImportError::UnresolvableLink(format!("{}: {}", url, e))),
            }
        };

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(ImportError::UnresolvableLink(format!(
                "{} requires sign-in ({})",
                url, status
            )));
        }
        if !status.is_success() {
            return Err(ImportError::UnresolvableLink(format!("{} returned {}", url, status)));
        }

        let header = |name: reqwest::header::HeaderName| {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        let content_type = header(reqwest::header::CONTENT_TYPE);
        let disposition = header(reqwest::header::CONTENT_DISPOSITION);
        let final_url = response.url().clone();
        let bytes = response.bytes().await?;

        debug!(url = %final_url, bytes = bytes.len(), content_type = ?content_type, "remote blob fetched");
        Ok(Blob::new(
            bytes.to_vec(),
            filename_from(&final_url, disposition.as_deref()).as_deref(),
            content_type.as_deref(),
        ))
    }
}

fn is_html(blob: &Blob) -> bool {
    blob.content_type
        .as_deref()
        .is_some_and(|ct| ct.to_ascii_lowercase().starts_with("text/html"))
}

#[async_trait]
impl BlobResolver for HttpBlobResolver {
    async fn resolve_share_link(&self, url: &str) -> ImporterResult<Blob> {
        let direct = rewrite_share_link(url)?;
        let blob = self.fetch(&direct).await?;
        if !is_html(&blob) {
            return Ok(blob);
        }

        // preview page: follow its og:image once
        let html = String::from_utf8_lossy(&blob.bytes);
        let Some(image) = scrape_og_image(&html) else {
            return Err(ImportError::UnresolvableLink(format!(
                "{} is a web page, not a file",
                url
            )));
        };
        let image_url = direct
            .join(&image)
            .map_err(|e| ImportError::UnresolvableLink(e.to_string()))?;
        let blob = self.fetch(&image_url).await?;
        if is_html(&blob) {
            return Err(ImportError::UnresolvableLink(format!(
                "{} does not lead to a downloadable file",
                url
            )));
        }
        Ok(blob)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_google_drive_rewrite() {
        let url = rewrite_share_link("https://drive.google.com/file/d/ABC123/view?usp=sharing").unwrap();
        assert_eq!(
            url.as_str(),
            "https://drive.google.com/uc?export=download&id=ABC123"
        );
        let url = rewrite_share_link("https://drive.google.com/open?id=XYZ").unwrap();
        assert_eq!(url.as_str(), "https://drive.google.com/uc?export=download&id=XYZ");
    }

    #[test]
    fn test_sheets_and_dropbox_rewrite() {
        let url = rewrite_share_link("https://docs.google.com/spreadsheets/d/S1/edit#gid=0").unwrap();
        assert_eq!(
            url.as_str(),
            "https://docs.google.com/spreadsheets/d/S1/export?format=xlsx"
        );
        let url = rewrite_share_link("https://www.dropbox.com/s/abc/roster.xlsx?dl=0").unwrap();
        assert_eq!(url.as_str(), "https://www.dropbox.com/s/abc/roster.xlsx?dl=1");
    }

    #[test]
    fn test_imgur_and_passthrough() {
        let url = rewrite_share_link("https://imgur.com/aBcD").unwrap();
        assert_eq!(url.as_str(), "https://i.imgur.com/aBcD.png");
        let url = rewrite_share_link("https://example.com/files/roster.csv").unwrap();
        assert_eq!(url.as_str(), "https://example.com/files/roster.csv");
        assert!(rewrite_share_link("not a url").is_err());
    }

    #[test]
    fn test_scrape_og_image() {
        let html = r#"<html><head><meta property="og:image" content="https://i.host/x.png?a=1&amp;b=2"/></head></html>"#;
        assert_eq!(scrape_og_image(html).as_deref(), Some("https://i.host/x.png?a=1&b=2"));
        assert_eq!(scrape_og_image("<html></html>"), None);
    }

    #[test]
    fn test_filename_from_disposition_then_path() {
        let url = Url::parse("https://example.com/dl/roster.xlsx").unwrap();
        assert_eq!(
            filename_from(&url, Some("attachment; filename=\"day1.csv\"")).as_deref(),
            Some("day1.csv")
        );
        assert_eq!(filename_from(&url, None).as_deref(), Some("roster.xlsx"));
    }
}
