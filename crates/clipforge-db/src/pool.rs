//! Connection pool and repository accessors.

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

use crate::candidates::CandidateRepo;
use crate::error::{DbError, DbResult};
use crate::jobs::JobRepo;
use crate::renders::RenderRepo;
use crate::transcripts::TranscriptRepo;
use crate::users::UserRepo;
use crate::videos::VideoRepo;

/// Shared database handle.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Connect with a bounded pool.
    pub async fn connect(url: &str) -> DbResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(url)
            .await?;
        Ok(Self { pool })
    }

    /// Connect using `DATABASE_URL`.
    pub async fn from_env() -> DbResult<Self> {
        let url = std::env::var("DATABASE_URL")
            .map_err(|_| DbError::Config("DATABASE_URL not set".to_string()))?;
        Self::connect(&url).await
    }

    /// Run embedded migrations.
    pub async fn migrate(&self) -> DbResult<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Database migrations applied");
        Ok(())
    }

    /// Raw pool access for cross-repo transactions.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn users(&self) -> UserRepo {
        UserRepo::new(self.pool.clone())
    }

    pub fn videos(&self) -> VideoRepo {
        VideoRepo::new(self.pool.clone())
    }

    pub fn jobs(&self) -> JobRepo {
        JobRepo::new(self.pool.clone())
    }

    pub fn transcripts(&self) -> TranscriptRepo {
        TranscriptRepo::new(self.pool.clone())
    }

    pub fn candidates(&self) -> CandidateRepo {
        CandidateRepo::new(self.pool.clone())
    }

    pub fn renders(&self) -> RenderRepo {
        RenderRepo::new(self.pool.clone())
    }
}
