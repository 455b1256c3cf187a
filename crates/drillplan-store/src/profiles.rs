//! TOML user profiles and class registrations.
//!
//! ```toml
//! [[classes]]
//! class_id = "lychee"
//! grade = 3
//! volume = 1
//!
//! [[users]]
//! username = "kid"
//! identity = "student"
//! class_id = "lychee"
//!
//! [users.settings]
//! ch_zici_max_num = 10
//! ```
//!
//! Teachers list one `[[users.roles]]` table per (role, class) they hold.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use drillplan_core::profile::{Identity, RoleProfile, Settings, UserProfile};
use drillplan_core::subject::SubjectTable;
use drillplan_core::traits::ClassRegistry;

use crate::error::StoreError;

#[derive(Debug, Default, Serialize, Deserialize)]
struct TomlProfilesFile {
    #[serde(default)]
    classes: Vec<ClassInfo>,
    #[serde(default)]
    users: Vec<TomlUser>,
}

#[derive(Debug, Serialize, Deserialize)]
struct TomlUser {
    username: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    display_name: String,
    identity: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    class_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    settings: Option<Settings>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    roles: Vec<RoleProfile>,
}

/// A class and the textbook grade/volume it studies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassInfo {
    pub class_id: String,
    pub grade: u32,
    pub volume: u32,
}

/// Every user and class of a workspace.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Profiles {
    pub classes: BTreeMap<String, ClassInfo>,
    pub users: Vec<UserProfile>,
}

impl Profiles {
    pub fn user(&self, username: &str) -> Result<&UserProfile, StoreError> {
        self.users
            .iter()
            .find(|u| u.username == username)
            .ok_or_else(|| StoreError::UnknownUser(username.to_string()))
    }

    pub fn user_mut(&mut self, username: &str) -> Result<&mut UserProfile, StoreError> {
        self.users
            .iter_mut()
            .find(|u| u.username == username)
            .ok_or_else(|| StoreError::UnknownUser(username.to_string()))
    }

    /// Usernames of the students registered in `class_id`.
    pub fn roster(&self, class_id: &str) -> Vec<String> {
        self.users
            .iter()
            .filter(|u| u.identity == Identity::Student && u.class_id.as_deref() == Some(class_id))
            .map(|u| u.username.clone())
            .collect()
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let file = TomlProfilesFile {
            classes: self.classes.values().cloned().collect(),
            users: self.users.iter().map(to_toml_user).collect(),
        };
        let content = toml::to_string_pretty(&file).context("failed to serialize profiles")?;
        std::fs::write(path, content).with_context(|| format!("failed to write profiles: {}", path.display()))?;
        Ok(())
    }
}

impl ClassRegistry for Profiles {
    fn grade_and_volume(&self, class_id: &str) -> Result<Option<(u32, u32)>> {
        Ok(self.classes.get(class_id).map(|c| (c.grade, c.volume)))
    }
}

fn to_toml_user(user: &UserProfile) -> TomlUser {
    let (settings, roles) = match user.identity {
        Identity::Student => (user.roles.first().map(|r| r.settings.clone()), Vec::new()),
        Identity::Teacher => (None, user.roles.clone()),
    };
    TomlUser {
        username: user.username.clone(),
        display_name: user.display_name.clone(),
        identity: user.identity.to_string(),
        class_id: user.class_id.clone(),
        settings,
        roles,
    }
}

fn from_toml_user(user: TomlUser) -> Result<UserProfile> {
    let identity: Identity = user
        .identity
        .parse()
        .map_err(|e: String| anyhow::anyhow!("user `{}`: {}", user.username, e))?;

    let roles = match identity {
        Identity::Student => {
            let class_id = user
                .class_id
                .clone()
                .with_context(|| format!("student `{}` has no class_id", user.username))?;
            vec![RoleProfile {
                role_id: Identity::Student.to_string(),
                class_id,
                settings: user.settings.unwrap_or_default(),
            }]
        }
        Identity::Teacher => user.roles,
    };

    Ok(UserProfile {
        username: user.username,
        display_name: user.display_name,
        identity,
        class_id: user.class_id,
        roles,
    })
}

/// Load a profiles file.
pub fn load_profiles(path: &Path) -> Result<Profiles> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read profiles file: {}", path.display()))?;
    parse_profiles_str(&content, path)
}

/// Parse profiles from a TOML string.
pub fn parse_profiles_str(content: &str, source_path: &Path) -> Result<Profiles> {
    let parsed: TomlProfilesFile = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;

    let mut classes = BTreeMap::new();
    for class in parsed.classes {
        if classes.contains_key(&class.class_id) {
            tracing::warn!("duplicate class `{}` in {}", class.class_id, source_path.display());
        }
        classes.insert(class.class_id.clone(), class);
    }

    let users = parsed
        .users
        .into_iter()
        .map(from_toml_user)
        .collect::<Result<Vec<_>>>()
        .with_context(|| format!("invalid user in {}", source_path.display()))?;

    Ok(Profiles { classes, users })
}

/// A problem found in a profiles file.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileWarning {
    pub username: Option<String>,
    pub message: String,
}

/// Check class references and the per-subject settings of every role.
///
/// Settings are only checked for subjects the role mentions at all.
pub fn validate_profiles(profiles: &Profiles, subjects: &SubjectTable) -> Vec<ProfileWarning> {
    let mut warnings = Vec::new();
    let mut warn = |user: &UserProfile, message: String| {
        warnings.push(ProfileWarning {
            username: Some(user.username.clone()),
            message,
        })
    };

    for user in &profiles.users {
        if user.identity == Identity::Teacher && user.roles.is_empty() {
            warn(user, "teacher holds no roles".into());
        }
        for role in &user.roles {
            if !profiles.classes.contains_key(&role.class_id) {
                warn(user, format!("class `{}` is not registered", role.class_id));
            }
            for name in subjects.names() {
                let prefix = format!("{name}_");
                let Ok(subject) = subjects.get(name) else {
                    continue;
                };
                if !role.settings.keys().any(|k| k.starts_with(&prefix)) {
                    continue;
                }
                let checks = [
                    role.settings.max_num(subject).err(),
                    role.settings.ratios(subject).err(),
                    role.settings.learning_speed(subject).err(),
                    role.settings.learning_path(subject).err(),
                    role.settings.pass_ratio(subject).err(),
                ];
                for err in checks.into_iter().flatten() {
                    warn(user, err.to_string());
                }
            }
        }
    }
    warnings
}
