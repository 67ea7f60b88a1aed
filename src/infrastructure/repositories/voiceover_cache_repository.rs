use crate::domain::voiceover::model::{CachedVoiceover, TokenOffset};
use crate::error::AppResult;
use crate::infrastructure::db::DbPool;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::FromRow;
use std::sync::Arc;

/// Durable store for cached voiceovers, keyed by
/// (text_hash, language_accent_code, provider).
///
/// The orchestrator treats retrieval failures as a cache miss; this
/// trait only reports them.
#[async_trait]
pub trait VoiceoverCacheRepository: Send + Sync {
    /// Exact lookup on the composite key.
    async fn find_by_key(
        &self,
        text_hash: &str,
        language_accent_code: &str,
        provider: &str,
    ) -> AppResult<Option<CachedVoiceover>>;

    /// Insert the entry, or overwrite the single slot for its key.
    async fn upsert(&self, entry: &CachedVoiceover) -> AppResult<()>;
}

#[derive(Debug, FromRow)]
struct CachedVoiceoverRow {
    text_hash: String,
    language_accent_code: String,
    provider: String,
    plaintext: String,
    voiceover_filename: String,
    token_offsets: Json<Vec<TokenOffset>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CachedVoiceoverRow> for CachedVoiceover {
    fn from(row: CachedVoiceoverRow) -> Self {
        Self {
            text_hash: row.text_hash,
            language_accent_code: row.language_accent_code,
            provider: row.provider,
            plaintext: row.plaintext,
            voiceover_filename: row.voiceover_filename,
            token_offsets: row.token_offsets.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Postgres implementation of the voiceover cache store.
pub struct PgVoiceoverCacheRepository {
    pool: Arc<DbPool>,
}

impl PgVoiceoverCacheRepository {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VoiceoverCacheRepository for PgVoiceoverCacheRepository {
    async fn find_by_key(
        &self,
        text_hash: &str,
        language_accent_code: &str,
        provider: &str,
    ) -> AppResult<Option<CachedVoiceover>> {
        let pool = self.pool.as_ref();

        let row = sqlx::query_as::<_, CachedVoiceoverRow>(
            r#"
            SELECT text_hash, language_accent_code, provider, plaintext,
                   voiceover_filename, token_offsets, created_at, updated_at
            FROM cached_voiceovers
            WHERE text_hash = $1 AND language_accent_code = $2 AND provider = $3
            "#,
        )
        .bind(text_hash)
        .bind(language_accent_code)
        .bind(provider)
        .fetch_optional(pool)
        .await?;

        Ok(row.map(CachedVoiceover::from))
    }

    async fn upsert(&self, entry: &CachedVoiceover) -> AppResult<()> {
        let pool = self.pool.as_ref();

        sqlx::query(
            r#"
            INSERT INTO cached_voiceovers
                (text_hash, language_accent_code, provider, plaintext,
                 voiceover_filename, token_offsets, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (text_hash, language_accent_code, provider)
            DO UPDATE SET
                plaintext = EXCLUDED.plaintext,
                voiceover_filename = EXCLUDED.voiceover_filename,
                token_offsets = EXCLUDED.token_offsets,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(&entry.text_hash)
        .bind(&entry.language_accent_code)
        .bind(&entry.provider)
        .bind(&entry.plaintext)
        .bind(&entry.voiceover_filename)
        .bind(Json(&entry.token_offsets))
        .bind(entry.created_at)
        .bind(entry.updated_at)
        .execute(pool)
        .await?;

        Ok(())
    }
}
