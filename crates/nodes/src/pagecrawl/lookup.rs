//! Lookup resolvers backing the interactive pickers.
//!
//! Each resolver issues one GET, unwraps the list envelope, maps entries to
//! [`ListSearchResult`] and applies a case-insensitive substring filter. The
//! page search propagates failures; the secondary lookups degrade to an empty
//! result.

use std::str::FromStr;

use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use super::params::{scalar_string, ListEnvelope};
use super::types::{Frequency, FREQUENCIES};
use crate::{ApiRequest, HttpClient, NodeError};

const APP_PAGE_URL: &str = "https://pagecrawl.io/app/pages";
const FOLDER_PATH_SEPARATOR: &str = " → ";

/// One picker entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListSearchResult {
    pub name: String,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl ListSearchResult {
    fn new(name: String, value: String) -> Self {
        Self {
            name,
            value,
            url: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupKind {
    Pages,
    Templates,
    Workspaces,
    Folders,
    Auths,
}

impl FromStr for LookupKind {
    type Err = NodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pages" | "page" => Ok(Self::Pages),
            "templates" | "template" => Ok(Self::Templates),
            "workspaces" | "workspace" => Ok(Self::Workspaces),
            "folders" | "folder" => Ok(Self::Folders),
            "auths" | "auth" => Ok(Self::Auths),
            other => Err(NodeError::invalid_parameter(
                "lookup",
                format!("unknown lookup '{other}'"),
            )),
        }
    }
}

impl LookupKind {
    fn path(self) -> &'static str {
        match self {
            Self::Pages => "/api/pages",
            Self::Templates => "/api/templates",
            Self::Workspaces => "/api/workspaces",
            Self::Folders => "/api/folders",
            Self::Auths => "/api/auths",
        }
    }

    /// Envelope key tried after `data`.
    fn envelope_key(self) -> &'static str {
        match self {
            Self::Pages => "pages",
            Self::Templates => "templates",
            Self::Workspaces => "workspaces",
            Self::Folders => "folders",
            Self::Auths => "auths",
        }
    }

    fn fallback_label(self) -> &'static str {
        match self {
            Self::Pages => "Page",
            Self::Templates => "Template",
            Self::Workspaces => "Workspace",
            Self::Folders => "Folder",
            Self::Auths => "Auth",
        }
    }
}

/// Run the resolver for `kind`.
pub async fn search(
    http: &dyn HttpClient,
    kind: LookupKind,
    filter: Option<&str>,
) -> Result<Vec<ListSearchResult>, NodeError> {
    match kind {
        LookupKind::Pages => search_pages(http, filter).await,
        secondary => Ok(search_secondary(http, secondary, filter).await),
    }
}

/// Pages: value is the slug, name falls back to the URL.
pub async fn search_pages(
    http: &dyn HttpClient,
    filter: Option<&str>,
) -> Result<Vec<ListSearchResult>, NodeError> {
    let response = http
        .request(ApiRequest::get(LookupKind::Pages.path()))
        .await?
        .into_json();
    let pages = ListEnvelope::parse(response, &[LookupKind::Pages.envelope_key()])
        .ok_or_else(|| NodeError::UnexpectedResponse("page list is not an array".into()))?
        .into_items();

    let results = pages
        .iter()
        .map(|page| {
            let slug = field(page, "slug").or_else(|| field(page, "id")).unwrap_or_default();
            let name = field(page, "name")
                .or_else(|| field(page, "url"))
                .unwrap_or_else(|| slug.clone());
            ListSearchResult {
                url: Some(format!("{APP_PAGE_URL}/{slug}")),
                name,
                value: slug,
            }
        })
        .filter(|result| matches_filter(filter, &[&result.name, &result.value]))
        .collect();
    Ok(results)
}

async fn search_secondary(
    http: &dyn HttpClient,
    kind: LookupKind,
    filter: Option<&str>,
) -> Vec<ListSearchResult> {
    let mut request = ApiRequest::get(kind.path());
    if kind == LookupKind::Folders {
        request = request.with_query("all", true);
    }

    let response = match http.request(request).await {
        Ok(response) => response.into_json(),
        Err(err) => {
            warn!(lookup = ?kind, error = %err, "lookup failed, returning no results");
            return Vec::new();
        }
    };
    let Some(entries) = ListEnvelope::parse(response, &[kind.envelope_key()]) else {
        warn!(lookup = ?kind, "lookup answered with no list");
        return Vec::new();
    };

    entries
        .into_items()
        .iter()
        .map(|entry| {
            let id = field(entry, "id").unwrap_or_default();
            let name = field(entry, "name")
                .unwrap_or_else(|| format!("{} {id}", kind.fallback_label()));
            let name = if kind == LookupKind::Folders {
                folder_path(entry, name)
            } else {
                name
            };
            ListSearchResult::new(name, id)
        })
        .filter(|result| matches_filter(filter, &[&result.name]))
        .collect()
}

/// `Parent → Child → Folder` when the folder carries its ancestor `tree`.
fn folder_path(folder: &Value, name: String) -> String {
    match folder.get("tree").and_then(Value::as_array) {
        Some(ancestors) if !ancestors.is_empty() => ancestors
            .iter()
            .map(|ancestor| field(ancestor, "name").unwrap_or_default())
            .chain(std::iter::once(name))
            .collect::<Vec<_>>()
            .join(FOLDER_PATH_SEPARATOR),
        _ => name,
    }
}

/// Frequencies the account may use; the full catalogue when the account
/// does not say or the lookup fails.
pub async fn frequencies(http: &dyn HttpClient) -> Vec<Frequency> {
    let allowed: Vec<u64> = match http.request(ApiRequest::get("/api/user")).await {
        Ok(response) => {
            let user = response.into_json();
            user.get("frequencies")
                .or_else(|| user.get("data").and_then(|d| d.get("frequencies")))
                .and_then(Value::as_array)
                .map(|list| list.iter().filter_map(Value::as_u64).collect())
                .unwrap_or_default()
        }
        Err(err) => {
            warn!(error = %err, "frequency lookup failed, offering the full catalogue");
            Vec::new()
        }
    };

    FREQUENCIES
        .iter()
        .filter(|f| allowed.is_empty() || allowed.contains(&f.minutes))
        .copied()
        .collect()
}

fn field(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .map(scalar_string)
        .filter(|s| !s.is_empty())
}

fn matches_filter(filter: Option<&str>, haystacks: &[&str]) -> bool {
    match filter.map(str::trim).filter(|f| !f.is_empty()) {
        None => true,
        Some(needle) => {
            let needle = needle.to_lowercase();
            haystacks
                .iter()
                .any(|hay| hay.to_lowercase().contains(&needle))
        }
    }
}
