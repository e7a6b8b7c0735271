//! Pattern-based extraction of item identifiers and asset links from page text.
//!
//! Pages are never parsed as HTML. Listing pages are scanned for detail links
//! (`/sharedfiles/filedetails/?id=<digits>"`), detail pages for the first anchor
//! pointing at the asset CDN (`<a href="<cdn>/ugc/..."`). Both patterns are
//! case-insensitive and let `.` cross line breaks.

use crate::error::{Error, Result};
use crate::types::ItemId;
use regex::{Regex, RegexBuilder};

/// Path marker that precedes the local identifier in asset URLs
const UGC_MARKER: &str = "ugc/";

/// Detail link on a listing page; the capture is the numeric item id
const IDENTIFIER_PATTERN: &str = r#"/sharedfiles/filedetails/\?id=([0-9]+)""#;

/// Fixed MIME type to file extension map
const MIME_TO_EXTENSION: &[(&str, &str)] = &[
    ("image/jpeg", ".jpg"),
    ("image/png", ".png"),
    ("image/gif", ".gif"),
    ("image/webp", ".webp"),
];

/// Compiled extraction patterns
#[derive(Clone, Debug)]
pub struct AssetExtractor {
    identifier: Regex,
    asset_link: Regex,
}

impl AssetExtractor {
    /// Build an extractor for asset links hosted under `cdn_prefix`
    /// (scheme and host, e.g. `https://steamuserimages-a.akamaihd.net`)
    pub fn new(cdn_prefix: &str) -> Result<Self> {
        let identifier = compile(IDENTIFIER_PATTERN)?;
        let asset_link = compile(&format!(
            r#"<a href="({}/{}[A-Z0-9/].+?)""#,
            regex::escape(cdn_prefix.trim_end_matches('/')),
            UGC_MARKER
        ))
        .map_err(|e| Error::config("endpoints.cdn_prefix", e.to_string()))?;

        Ok(Self {
            identifier,
            asset_link,
        })
    }

    /// All item identifiers linked from a listing page, in document order.
    ///
    /// An empty result is the normal "no more data" signal. Ids that do not fit in
    /// a u64 are ignored.
    pub fn extract_identifiers(&self, page_text: &str) -> Vec<ItemId> {
        self.identifier
            .captures_iter(page_text)
            .filter_map(|caps| caps.get(1)?.as_str().parse::<u64>().ok())
            .map(ItemId)
            .collect()
    }

    /// The first asset URL linked from a detail page, if any
    pub fn extract_asset_url(&self, detail_page_text: &str) -> Option<String> {
        self.asset_link
            .captures(detail_page_text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    }
}

fn compile(pattern: &str) -> Result<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .dot_matches_new_line(true)
        .size_limit(1024 * 1024)
        .build()
        .map_err(|e| Error::Other(format!("invalid extraction pattern: {}", e)))
}

/// Segment of an asset URL between the `ugc/` marker and the next `/`
///
/// `https://cdn.example/ugc/AB12CD34/image.jpg` yields `AB12CD34`.
pub fn local_identifier(asset_url: &str) -> Option<&str> {
    let start = asset_url.find(UGC_MARKER)? + UGC_MARKER.len();
    let rest = &asset_url[start..];
    let end = rest.find('/')?;
    let id = &rest[..end];
    (!id.is_empty()).then_some(id)
}

/// File extension (with leading dot) for a `Content-Type` value.
///
/// Parameters such as `; charset=binary` and letter case are ignored.
pub fn extension_for(content_type: &str) -> Option<&'static str> {
    let mime = content_type.split(';').next()?.trim();
    MIME_TO_EXTENSION
        .iter()
        .find(|(known, _)| known.eq_ignore_ascii_case(mime))
        .map(|(_, ext)| *ext)
}
