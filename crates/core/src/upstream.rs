//! Construction of requests sent to the upstream places API.

use crate::ApiKey;
use anyhow::{Result, anyhow};
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://maps.googleapis.com/maps/api";

const TEXT_SEARCH_PATH: [&str; 3] = ["place", "textsearch", "json"];
const PHOTO_PATH: [&str; 2] = ["place", "photo"];

/// Parameters forwarded to the text search endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextSearch<'a> {
    pub query: &'a str,
    pub location: Option<&'a str>,
    pub radius: Option<&'a str>,
}

/// Parameters forwarded to the photo endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhotoLookup<'a> {
    pub maxwidth: &'a str,
    pub photo_reference: &'a str,
}

/// Build the upstream text search URL, attaching `key` when one is configured.
pub fn text_search_url(base: &Url, key: Option<&ApiKey>, search: &TextSearch) -> Result<Url> {
    let mut url = endpoint(base, &TEXT_SEARCH_PATH)?;
    {
        let mut pairs = url.query_pairs_mut();
        pairs.append_pair("query", search.query);
        if let Some(key) = key {
            pairs.append_pair("key", key.expose());
        }
        if let Some(location) = search.location {
            pairs.append_pair("location", location);
        }
        if let Some(radius) = search.radius {
            pairs.append_pair("radius", radius);
        }
    }
    Ok(url)
}

/// Build the upstream photo URL, attaching `key` when one is configured.
pub fn photo_url(base: &Url, key: Option<&ApiKey>, lookup: &PhotoLookup) -> Result<Url> {
    let mut url = endpoint(base, &PHOTO_PATH)?;
    {
        let mut pairs = url.query_pairs_mut();
        pairs
            .append_pair("maxwidth", lookup.maxwidth)
            .append_pair("photo_reference", lookup.photo_reference);
        if let Some(key) = key {
            pairs.append_pair("key", key.expose());
        }
    }
    Ok(url)
}

fn endpoint(base: &Url, path: &[&str]) -> Result<Url> {
    let mut url = base.clone();
    url.set_query(None);
    url.set_fragment(None);
    url.path_segments_mut()
        .map_err(|_| anyhow!("upstream url cannot be used as a base"))?
        .pop_if_empty()
        .extend(path);
    Ok(url)
}
