//! Read side: typed, display-ready entities for public pages and the admin UI

pub mod legacy;

use clubsite_common::api::redact_secrets;
use clubsite_common::models::{BoardMember, NewsArticle, Pilot, SiteContent, SiteSettings, Sponsor};
use clubsite_common::sanitize::{normalize_slug, quoted_variant, strip_matching_quotes};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use crate::db::{DocumentStore, OrderBy, StoreError, StoredDocument};
use crate::orchestrator::resources::{is_content_page, GENERAL_SETTINGS};
pub use legacy::{LegacyCsv, LegacyKind, LegacyRow};

#[derive(Debug, Error)]
pub enum ReaderError {
    #[error("Document store not configured: {0}")]
    NotConfigured(String),

    #[error("Document store unavailable: {0}")]
    Unavailable(String),

    #[error("Failed to read documents: {0}")]
    Backend(String),

    #[error("Stored document {collection}/{id} is invalid: {message}")]
    Decode {
        collection: String,
        id: String,
        message: String,
    },

    #[error("Legacy data error: {0}")]
    Legacy(String),
}

/// List resources served by the reader
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    News,
    Board,
    Pilots,
    Sponsors,
}

impl ResourceKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "news" => Some(ResourceKind::News),
            "board" => Some(ResourceKind::Board),
            "pilots" => Some(ResourceKind::Pilots),
            "sponsors" => Some(ResourceKind::Sponsors),
            _ => None,
        }
    }

    pub fn collection(self) -> &'static str {
        match self {
            ResourceKind::News => "news",
            ResourceKind::Board => "boardMembers",
            ResourceKind::Pilots => "pilots",
            ResourceKind::Sponsors => "sponsors",
        }
    }
}

/// Who the list is for; the public site sees active sponsors only
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    Public,
    Admin,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Entity {
    News(NewsArticle),
    Board(BoardMember),
    Pilot(Pilot),
    Sponsor(Sponsor),
}

pub struct ContentReader {
    store: Arc<dyn DocumentStore>,
    legacy: LegacyCsv,
    secrets: Vec<String>,
}

impl ContentReader {
    pub fn new(store: Arc<dyn DocumentStore>, legacy: LegacyCsv, secrets: Vec<String>) -> Self {
        Self {
            store,
            legacy,
            secrets,
        }
    }

    pub fn legacy(&self) -> &LegacyCsv {
        &self.legacy
    }

    fn store_error(&self, err: StoreError) -> ReaderError {
        let secrets: Vec<&str> = self.secrets.iter().map(String::as_str).collect();
        match err {
            StoreError::NotConfigured(msg) => ReaderError::NotConfigured(msg),
            StoreError::Unavailable(msg) => ReaderError::Unavailable(redact_secrets(&msg, &secrets)),
            other => ReaderError::Backend(redact_secrets(&other.to_string(), &secrets)),
        }
    }

    /// All entities of a kind in display order
    pub async fn list(&self, kind: ResourceKind, audience: Audience) -> Result<Vec<Entity>, ReaderError> {
        let collection = kind.collection();
        let docs = match kind {
            ResourceKind::News => self.store.list(collection, Some(&OrderBy::desc("date"))).await,
            ResourceKind::Pilots => self.store.list(collection, Some(&OrderBy::asc("name"))).await,
            ResourceKind::Board | ResourceKind::Sponsors => self.store.list(collection, None).await,
        }
        .map_err(|e| self.store_error(e))?;

        let entities: Vec<Entity> = docs
            .into_iter()
            .filter_map(|doc| match to_entity(kind, doc) {
                Ok(entity) => Some(entity),
                Err(e) => {
                    warn!(error = %e, "Skipping undecodable document");
                    None
                }
            })
            .collect();

        Ok(match kind {
            ResourceKind::Board => {
                let mut members: Vec<BoardMember> = entities
                    .into_iter()
                    .filter_map(|e| match e {
                        Entity::Board(m) => Some(m),
                        _ => None,
                    })
                    .collect();
                members.sort_by(|a, b| {
                    a.order
                        .unwrap_or(i64::MAX)
                        .cmp(&b.order.unwrap_or(i64::MAX))
                        .then_with(|| a.name.cmp(&b.name))
                });
                members.into_iter().map(Entity::Board).collect()
            }
            ResourceKind::Sponsors => {
                let mut sponsors: Vec<Sponsor> = entities
                    .into_iter()
                    .filter_map(|e| match e {
                        Entity::Sponsor(s) => Some(s),
                        _ => None,
                    })
                    .filter(|s| audience == Audience::Admin || s.is_active)
                    .collect();
                sponsors.sort_by(|a, b| {
                    a.display_order
                        .cmp(&b.display_order)
                        .then_with(|| a.name.cmp(&b.name))
                });
                sponsors.into_iter().map(Entity::Sponsor).collect()
            }
            ResourceKind::News | ResourceKind::Pilots => entities,
        })
    }

    /// Single entity by its public slug
    pub async fn get_by_slug(&self, kind: ResourceKind, slug: &str) -> Result<Option<Entity>, ReaderError> {
        let collection = kind.collection();
        let doc = match kind {
            ResourceKind::News => self.find_news(slug).await?,
            ResourceKind::Board => {
                match self.find_first(collection, "slug", slug).await? {
                    Some(doc) => Some(doc),
                    // Members saved before slugs existed: slug is the normalized id
                    None => self
                        .store
                        .list(collection, None)
                        .await
                        .map_err(|e| self.store_error(e))?
                        .into_iter()
                        .find(|doc| !doc.data.contains_key("slug") && normalize_slug(&doc.id) == slug),
                }
            }
            ResourceKind::Pilots => self.find_first(collection, "profileSlug", slug).await?,
            ResourceKind::Sponsors => self
                .store
                .get(collection, slug)
                .await
                .map_err(|e| self.store_error(e))?,
        };

        doc.map(|doc| to_entity(kind, doc)).transpose()
    }

    async fn find_first(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Result<Option<StoredDocument>, ReaderError> {
        let mut found = self
            .store
            .find_by_field(collection, field, value)
            .await
            .map_err(|e| self.store_error(e))?;
        if found.len() > 1 {
            warn!(collection = %collection, field = %field, value = %value, matches = found.len(), "Ambiguous lookup, using first match");
        }
        Ok(if found.is_empty() { None } else { Some(found.swap_remove(0)) })
    }

    async fn find_news(&self, slug: &str) -> Result<Option<StoredDocument>, ReaderError> {
        if let Some(doc) = self.find_first("news", "slug", slug).await? {
            return Ok(Some(doc));
        }

        let quoted = quoted_variant(slug);
        let doc = self.find_first("news", "slug", &quoted).await?;
        if let Some(doc) = &doc {
            warn!(id = %doc.id, slug = %slug, "News article found only by its quoted legacy slug");
        }
        Ok(doc)
    }

    /// Site settings singleton; defaults when never saved
    pub async fn site_settings(&self) -> Result<SiteSettings, ReaderError> {
        let doc = self
            .store
            .get("siteSettings", GENERAL_SETTINGS)
            .await
            .map_err(|e| self.store_error(e))?;
        match doc {
            Some(doc) => decode("siteSettings", doc),
            None => {
                debug!("Site settings not saved yet, using defaults");
                Ok(SiteSettings::default())
            }
        }
    }

    /// Content of a known page; `None` for unknown or never saved pages
    pub async fn site_content(&self, page: &str) -> Result<Option<SiteContent>, ReaderError> {
        if !is_content_page(page) {
            return Ok(None);
        }
        let doc = self
            .store
            .get("siteContent", page)
            .await
            .map_err(|e| self.store_error(e))?;
        doc.map(|doc| decode("siteContent", doc)).transpose()
    }

    pub async fn legacy_rows(&self, kind: LegacyKind) -> Result<Option<Vec<LegacyRow>>, ReaderError> {
        self.legacy.rows(kind).await
    }
}

fn decode<T: DeserializeOwned>(collection: &str, doc: StoredDocument) -> Result<T, ReaderError> {
    serde_json::from_value(Value::Object(doc.data)).map_err(|e| ReaderError::Decode {
        collection: collection.to_string(),
        id: doc.id.clone(),
        message: e.to_string(),
    })
}

/// Decode a stored document with its id injected and apply display fixes
fn to_entity(kind: ResourceKind, mut doc: StoredDocument) -> Result<Entity, ReaderError> {
    doc.data.insert("id".to_string(), Value::String(doc.id.clone()));
    let collection = kind.collection();

    Ok(match kind {
        ResourceKind::News => {
            let mut article: NewsArticle = decode(collection, doc)?;
            article.slug = strip_matching_quotes(&article.slug).to_string();
            Entity::News(article)
        }
        ResourceKind::Board => {
            let mut member: BoardMember = decode(collection, doc)?;
            if member.slug.as_deref().map_or(true, str::is_empty) {
                member.slug = Some(normalize_slug(&member.id));
            }
            Entity::Board(member)
        }
        ResourceKind::Pilots => Entity::Pilot(decode(collection, doc)?),
        ResourceKind::Sponsors => Entity::Sponsor(decode(collection, doc)?),
    })
}
