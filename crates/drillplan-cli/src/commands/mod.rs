pub mod init;
pub mod plan;
pub mod progress;
pub mod score;
pub mod tune;
pub mod validate;

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, SubsecRound, Utc};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use drillplan_core::model::LessonId;
use drillplan_store::{load_catalog_path, load_config_from, load_profiles, Catalog, DrillplanConfig, Journal, Profiles};

/// Everything a command reads from a drillplan workspace.
pub struct Workspace {
    pub config: DrillplanConfig,
    pub catalog: Catalog,
    pub profiles: Profiles,
    pub journal: Journal,
}

impl Workspace {
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let config = load_config_from(config_path)?;
        let catalog = load_catalog_path(&config.catalog)?;
        let profiles = load_profiles(&config.profiles)?;
        let journal = Journal::load(&config.journal)?;
        tracing::debug!(
            items = catalog.len(),
            users = profiles.users.len(),
            records = journal.len(),
            "loaded workspace"
        );
        Ok(Self {
            config,
            catalog,
            profiles,
            journal,
        })
    }

    pub fn save_journal(&self) -> Result<()> {
        self.journal.save(&self.config.journal)
    }

    pub fn save_profiles(&self) -> Result<()> {
        self.profiles.save(&self.config.profiles)
    }

    /// Subject named on the command line, or the configured default.
    pub fn subject_name(&self, subject: Option<String>) -> String {
        subject.unwrap_or_else(|| self.config.default_subject.clone())
    }

    /// Seeded from the command line, then the config, else from entropy.
    pub fn rng(&self, seed: Option<u64>) -> ChaCha8Rng {
        match seed.or(self.config.seed) {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        }
    }
}

/// Parse a comma-separated lesson list such as `1,2,5`.
pub fn parse_lessons(s: &str) -> Result<Vec<LessonId>> {
    s.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<LessonId>()
                .with_context(|| format!("invalid lesson number: {part}"))
        })
        .collect()
}

/// Parse an RFC 3339 timestamp, or use the current second.
pub fn timestamp_or_now(at: Option<&str>) -> Result<DateTime<Utc>> {
    match at {
        Some(s) => Ok(DateTime::parse_from_rfc3339(s)
            .with_context(|| format!("invalid timestamp: {s}"))?
            .with_timezone(&Utc)),
        None => Ok(Utc::now().trunc_subsecs(0)),
    }
}
