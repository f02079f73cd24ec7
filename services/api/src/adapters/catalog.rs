//! services/api/src/adapters/catalog.rs
//!
//! The Google Books adapter: the concrete implementation of the
//! `BookCatalog` port. Volume responses are mapped into the core's
//! `BookMetadata` here, so catalog schema quirks never leave this module.

use async_trait::async_trait;
use serde::Deserialize;

use chapterly_core::domain::BookMetadata;
use chapterly_core::ports::{BookCatalog, PortError, PortResult};

/// Shown when a volume has no cover image of its own.
const FALLBACK_COVER: &str =
    "https://images.pexels.com/photos/159866/books-book-pages-read-literature-159866.jpeg?auto=compress&cs=tinysrgb&w=400";

const POPULAR_RESULT_LIMIT: u32 = 10;

//=========================================================================================
// Volume Response Structs
//=========================================================================================

#[derive(Deserialize)]
struct VolumesResponse {
    items: Option<Vec<Volume>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Volume {
    id: String,
    volume_info: VolumeInfo,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct VolumeInfo {
    title: Option<String>,
    authors: Option<Vec<String>>,
    description: Option<String>,
    page_count: Option<u32>,
    published_date: Option<String>,
    image_links: Option<ImageLinks>,
    categories: Option<Vec<String>>,
    industry_identifiers: Option<Vec<IndustryIdentifier>>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct ImageLinks {
    thumbnail: Option<String>,
    small_thumbnail: Option<String>,
}

#[derive(Deserialize)]
struct IndustryIdentifier {
    #[serde(rename = "type")]
    kind: String,
    identifier: String,
}

/// Maps one volume into the core's metadata shape: best available cover
/// (upgraded to https), ISBN-13 preferred over ISBN-10, authors joined
/// for display.
fn to_metadata(volume: Volume) -> BookMetadata {
    let info = volume.volume_info;

    let cover = info
        .image_links
        .and_then(|links| links.thumbnail.or(links.small_thumbnail))
        .unwrap_or_else(|| FALLBACK_COVER.to_string());

    let isbn = info.industry_identifiers.as_ref().and_then(|ids| {
        ids.iter()
            .find(|id| id.kind == "ISBN_13")
            .or_else(|| ids.iter().find(|id| id.kind == "ISBN_10"))
            .map(|id| id.identifier.clone())
    });

    BookMetadata {
        id: volume.id,
        title: info.title.unwrap_or_else(|| "Unknown Title".to_string()),
        author: info
            .authors
            .map(|a| a.join(", "))
            .unwrap_or_else(|| "Unknown Author".to_string()),
        cover_url: cover.replace("http://", "https://"),
        total_pages: info.page_count.unwrap_or(0),
        description: info.description,
        published_date: info.published_date,
        categories: info.categories.unwrap_or_default(),
        isbn,
    }
}

//=========================================================================================
// The Adapter
//=========================================================================================

/// A `BookCatalog` implementation backed by the Google Books volumes API.
#[derive(Clone)]
pub struct GoogleBooksAdapter {
    http: reqwest::Client,
    base_url: String,
    search_limit: u32,
}

impl GoogleBooksAdapter {
    pub fn new(base_url: String, search_limit: u32) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            search_limit,
        }
    }

    async fn search_volumes(&self, query: &str, limit: u32) -> PortResult<Vec<BookMetadata>> {
        let url = format!("{}/volumes", self.base_url);
        let response = self
            .http
            .get(&url)
            .query(&[
                ("q", query),
                ("maxResults", &limit.to_string()),
                ("printType", "books"),
            ])
            .send()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?
            .error_for_status()
            .map_err(|e| PortError::Unexpected(format!("Book catalog error: {}", e)))?;

        let volumes: VolumesResponse = response
            .json()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        Ok(volumes
            .items
            .unwrap_or_default()
            .into_iter()
            .map(to_metadata)
            .collect())
    }
}

#[async_trait]
impl BookCatalog for GoogleBooksAdapter {
    async fn search(&self, query: &str) -> PortResult<Vec<BookMetadata>> {
        self.search_volumes(query, self.search_limit).await
    }

    async fn by_id(&self, volume_id: &str) -> PortResult<Option<BookMetadata>> {
        let url = format!("{}/volumes/{}", self.base_url, volume_id);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = response
            .error_for_status()
            .map_err(|e| PortError::Unexpected(format!("Book catalog error: {}", e)))?;

        let volume: Volume = response
            .json()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(Some(to_metadata(volume)))
    }

    async fn by_isbn(&self, isbn: &str) -> PortResult<Option<BookMetadata>> {
        let results = self.search_volumes(&format!("isbn:{}", isbn), 1).await?;
        Ok(results.into_iter().next())
    }

    async fn popular(&self, category: Option<&str>) -> PortResult<Vec<BookMetadata>> {
        let query = match category {
            Some(category) => format!("subject:{}", category),
            None => "bestseller".to_string(),
        };
        self.search_volumes(&query, POPULAR_RESULT_LIMIT).await
    }
}
