//! Runtime knobs for catalog behaviour.

use core_config::{env_or_default, env_parse_or, ConfigError, FromEnv};
use strum::{Display, EnumString};

/// What a rename onto an already existing category does.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum CategoryMergePolicy {
    /// Products of both categories end up under the new name
    #[default]
    Allow,
    /// Renaming onto a different existing category is a conflict
    Reject,
}

/// What happens to the featured flags when a book is updated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum FlagPolicy {
    /// Keep the flags drawn at creation
    #[default]
    Preserve,
    /// Draw fresh flags on every update
    Reroll,
}

/// Backing store selected at startup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum StoreKind {
    #[default]
    Mongodb,
    Memory,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogSettings {
    pub store: StoreKind,
    pub merge_policy: CategoryMergePolicy,
    pub flag_policy: FlagPolicy,
    /// Insert attempts when a freshly allocated id is already taken
    pub id_max_retries: u32,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            store: StoreKind::default(),
            merge_policy: CategoryMergePolicy::default(),
            flag_policy: FlagPolicy::default(),
            id_max_retries: 5,
        }
    }
}

impl CatalogSettings {
    pub fn with_merge_policy(mut self, policy: CategoryMergePolicy) -> Self {
        self.merge_policy = policy;
        self
    }

    pub fn with_flag_policy(mut self, policy: FlagPolicy) -> Self {
        self.flag_policy = policy;
        self
    }

    pub fn with_id_max_retries(mut self, retries: u32) -> Self {
        self.id_max_retries = retries.max(1);
        self
    }
}

impl FromEnv for CatalogSettings {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let retries: u32 = env_parse_or("CATALOG_ID_MAX_RETRIES", defaults.id_max_retries)?;
        if retries == 0 {
            return Err(ConfigError::ParseError {
                key: "CATALOG_ID_MAX_RETRIES".to_string(),
                details: "must be at least 1".to_string(),
            });
        }

        Ok(Self {
            store: parse_choice("CATALOG_STORE", defaults.store)?,
            merge_policy: parse_choice("CATALOG_CATEGORY_MERGE", defaults.merge_policy)?,
            flag_policy: parse_choice("CATALOG_UPDATE_FLAGS", defaults.flag_policy)?,
            id_max_retries: retries,
        })
    }
}

fn parse_choice<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr + ToString,
{
    let raw = env_or_default(key, &default.to_string());
    raw.trim().parse().map_err(|_| ConfigError::ParseError {
        key: key.to_string(),
        details: format!("unsupported value '{}'", raw),
    })
}
