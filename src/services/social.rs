//! Footer social links: public read, admin read and batch update.

use serde::Deserialize;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use crate::model::{SocialLink, SocialPlatform};
use crate::validation::FieldErrors;

#[derive(Debug, thiserror::Error)]
pub enum SocialError {
    #[error("unknown platform: {0}")]
    UnknownPlatform(String),
    #[error(transparent)]
    Validation(#[from] FieldErrors),
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
}

impl crate::frame::ErrorCode for SocialError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::UnknownPlatform(_) => "E_UNKNOWN_PLATFORM",
            Self::Validation(_) => "E_VALIDATION",
            Self::Db(_) => "E_DATABASE",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SocialLinkUpdate {
    pub id: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidUpdate {
    pub platform: SocialPlatform,
    pub url: String,
    pub enabled: bool,
}

fn is_http_url(url: &str) -> bool {
    ["https://", "http://"]
        .iter()
        .any(|scheme| url.strip_prefix(scheme).is_some_and(|rest| !rest.is_empty()))
}

/// Resolve platforms and check URLs. An empty URL is allowed (link hidden).
///
/// # Errors
///
/// [`SocialError::UnknownPlatform`] first; otherwise every bad URL keyed by
/// platform id.
pub fn validate_updates(updates: &[SocialLinkUpdate]) -> Result<Vec<ValidUpdate>, SocialError> {
    let mut out = Vec::with_capacity(updates.len());
    let mut errors = FieldErrors::new();
    for update in updates {
        let platform =
            SocialPlatform::parse(update.id.trim()).ok_or_else(|| SocialError::UnknownPlatform(update.id.clone()))?;
        let url = update.url.trim().to_string();
        if !url.is_empty() && !is_http_url(&url) {
            errors.add(platform.as_str(), "Please enter a valid URL starting with http:// or https://");
        }
        out.push(ValidUpdate { platform, url, enabled: update.enabled });
    }
    errors.into_result()?;
    Ok(out)
}

/// Links shown in the public footer.
#[must_use]
pub fn visible(links: Vec<SocialLink>) -> Vec<SocialLink> {
    links.into_iter().filter(|l| l.enabled && !l.url.trim().is_empty()).collect()
}

fn link_from_row(row: &PgRow) -> Result<SocialLink, sqlx::Error> {
    let id: String = row.try_get("id")?;
    let platform = SocialPlatform::parse(&id)
        .ok_or_else(|| sqlx::Error::Decode(format!("unexpected social platform: {id}").into()))?;
    Ok(SocialLink {
        id: platform,
        label: platform.label().to_string(),
        url: row.try_get("url")?,
        enabled: row.try_get("enabled")?,
    })
}

/// All platforms, ordered by id.
pub async fn list_all(pool: &PgPool) -> Result<Vec<SocialLink>, SocialError> {
    let rows = sqlx::query("SELECT id, url, enabled FROM social_links ORDER BY id")
        .fetch_all(pool)
        .await?;
    let links = rows.iter().map(link_from_row).collect::<Result<Vec<_>, _>>()?;
    Ok(links)
}

pub async fn list_public(pool: &PgPool) -> Result<Vec<SocialLink>, SocialError> {
    Ok(visible(list_all(pool).await?))
}

/// Apply every update in one transaction and return the new full list.
pub async fn apply_updates(pool: &PgPool, updates: &[ValidUpdate]) -> Result<Vec<SocialLink>, SocialError> {
    let mut tx = pool.begin().await?;
    for update in updates {
        sqlx::query("UPDATE social_links SET url = $1, enabled = $2, updated_at = now() WHERE id = $3")
            .bind(&update.url)
            .bind(update.enabled)
            .bind(update.platform.as_str())
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;
    list_all(pool).await
}
