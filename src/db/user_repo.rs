use uuid::Uuid;

use crate::error::Result;
use crate::models::{DataUsage, User, UserPreferences};

pub struct UserRepo {
    pool: sqlx::PgPool,
}

impl UserRepo {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    /// Resolves effective preferences for a request: stored preferences,
    /// overlaid with the per-request `overrideGenre`/`overrideLanguage`
    /// query params when present (§4.1 cache-key / preference rules). An
    /// anonymous caller (`user` is `None`) gets empty preferred lists,
    /// which candidate queries treat as "no genre/language filter".
    pub fn effective_preferences(
        user: Option<&User>,
        override_genre: Option<&str>,
        override_language: Option<&str>,
    ) -> UserPreferences {
        let mut prefs = user.map(User::preferences).unwrap_or_default();
        if let Some(genre) = override_genre {
            prefs.preferred_genres = vec![genre.to_string()];
        }
        if let Some(language) = override_language {
            prefs.preferred_languages = vec![language.to_string()];
        }
        prefs
    }

    pub async fn update_preferences(
        &self,
        user_id: Uuid,
        preferred_genres: &[String],
        preferred_languages: &[String],
        auto_play: bool,
        data_usage: DataUsage,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE users SET preferred_genres = $1, preferred_languages = $2, \
             auto_play = $3, data_usage = $4 WHERE id = $5",
        )
        .bind(preferred_genres)
        .bind(preferred_languages)
        .bind(data_usage)
        .bind(auto_play)
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn record_engagement(
        &self,
        user_id: Uuid,
        likes_delta: i64,
        shares_delta: i64,
        swipe_right_delta: i64,
        swipe_left_delta: i64,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE users SET \
             likes = GREATEST(0, likes + $1), \
             shares = GREATEST(0, shares + $2), \
             swipe_right = swipe_right + $3, \
             swipe_left = swipe_left + $4 \
             WHERE id = $5",
        )
        .bind(likes_delta)
        .bind(shares_delta)
        .bind(swipe_right_delta)
        .bind(swipe_left_delta)
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
