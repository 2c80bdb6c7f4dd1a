// Episode descriptions with a local cache
//
// Generated text is cached per (series, season, episode number). Fallback text
// is never cached, so a later request tries generation again.

use anyhow::Result;
use sqlx::SqlitePool;

use super::gemini::{title_from_filename, GeminiClient};
use crate::models::EpisodeDescription;

pub struct DescriptionService {
    db: SqlitePool,
    generator: Option<GeminiClient>,
}

impl DescriptionService {
    pub fn new(db: SqlitePool, generator: Option<GeminiClient>) -> Self {
        Self { db, generator }
    }

    /// Cached or freshly generated description, or the fallback text
    pub async fn describe(&self, series: &str, season: &str, number: usize, filename: &str) -> String {
        match self.cached(series, season, number).await {
            Ok(Some(description)) => return description,
            Ok(None) => {}
            Err(e) => tracing::warn!("Failed to read description cache: {}", e),
        }

        let Some(ref generator) = self.generator else {
            tracing::debug!("No description generator configured, using fallback");
            return fallback_description(series, number, filename);
        };

        match generator
            .generate_description(series, season, number, filename)
            .await
        {
            Ok(description) => {
                if let Err(e) = self.store(series, season, number, &description).await {
                    tracing::warn!("Failed to cache description: {}", e);
                }
                tracing::info!("Generated description for {} / {} / {}", series, season, number);
                description
            }
            Err(e) => {
                tracing::warn!("Description generation failed, using fallback: {}", e);
                fallback_description(series, number, filename)
            }
        }
    }

    async fn cached(&self, series: &str, season: &str, number: usize) -> Result<Option<String>> {
        let row: Option<EpisodeDescription> = sqlx::query_as(
            r#"SELECT * FROM episode_descriptions
               WHERE series_name = ? AND season_name = ? AND episode_number = ?"#,
        )
        .bind(series)
        .bind(season)
        .bind(number as i64)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(|d| d.description))
    }

    async fn store(&self, series: &str, season: &str, number: usize, description: &str) -> Result<()> {
        sqlx::query(
            r#"INSERT OR REPLACE INTO episode_descriptions
               (series_name, season_name, episode_number, description)
               VALUES (?, ?, ?, ?)"#,
        )
        .bind(series)
        .bind(season)
        .bind(number as i64)
        .bind(description)
        .execute(&self.db)
        .await?;

        Ok(())
    }
}

/// Text shown when no generated description is available
pub fn fallback_description(series: &str, number: usize, filename: &str) -> String {
    format!(
        "Episódio {} da série {}: \"{}\".",
        number,
        series,
        title_from_filename(filename)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    #[test]
    fn test_fallback_text() {
        assert_eq!(
            fallback_description("Dark", 2, "S01E02 - Mentiras.mp4"),
            "Episódio 2 da série Dark: \"S01E02 - Mentiras\"."
        );
    }

    #[tokio::test]
    async fn test_fallback_is_not_cached() {
        let pool = test_pool().await;
        let service = DescriptionService::new(pool.clone(), None);

        let text = service.describe("Dark", "Temporada 01", 1, "ep1.mkv").await;
        assert_eq!(text, "Episódio 1 da série Dark: \"ep1\".");

        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM episode_descriptions")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count.0, 0);
    }

    #[tokio::test]
    async fn test_cached_description_wins() {
        let pool = test_pool().await;
        let service = DescriptionService::new(pool.clone(), None);

        service
            .store("Dark", "Temporada 01", 1, "Jonas volta à escola.")
            .await
            .unwrap();

        let text = service.describe("Dark", "Temporada 01", 1, "ep1.mkv").await;
        assert_eq!(text, "Jonas volta à escola.");

        // Other episodes of the same season are not affected
        let other = service.describe("Dark", "Temporada 01", 2, "ep2.mkv").await;
        assert_eq!(other, "Episódio 2 da série Dark: \"ep2\".");

        let rows: Vec<EpisodeDescription> = sqlx::query_as("SELECT * FROM episode_descriptions")
            .fetch_all(&pool)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].episode_number, 1);
    }

    #[tokio::test]
    async fn test_store_replaces_existing() {
        let pool = test_pool().await;
        let service = DescriptionService::new(pool, None);

        service.store("S", "T", 1, "old").await.unwrap();
        service.store("S", "T", 1, "new").await.unwrap();

        assert_eq!(
            service.cached("S", "T", 1).await.unwrap().as_deref(),
            Some("new")
        );
    }
}
