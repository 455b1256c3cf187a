//! User profiles, role bindings, and per-role scheduling settings.
//!
//! A learner carries one [`RoleProfile`]. A teacher may hold several (one per
//! class and role); binding a role is a filter over that list.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::allocator::Ratios;
use crate::error::ScheduleError;
use crate::model::LessonId;
use crate::subject::Subject;

/// Flat key/value settings of one role, e.g. `ch_zici_max_num = 15`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Settings(BTreeMap<String, Value>);

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn required(&self, key: &str) -> Result<&Value, ScheduleError> {
        self.get(key)
            .ok_or_else(|| ScheduleError::config(format!("missing setting `{key}`")))
    }

    fn required_u64(&self, key: &str) -> Result<u64, ScheduleError> {
        self.required(key)?
            .as_u64()
            .ok_or_else(|| ScheduleError::config(format!("`{key}` must be a non-negative integer")))
    }

    fn required_f64(&self, key: &str) -> Result<f64, ScheduleError> {
        self.required(key)?
            .as_f64()
            .ok_or_else(|| ScheduleError::config(format!("`{key}` must be a number")))
    }

    /// Session size (`{subject}_max_num`).
    pub fn max_num(&self, subject: &Subject) -> Result<usize, ScheduleError> {
        Ok(self.required_u64(&subject.key("max_num"))? as usize)
    }

    /// Bucket ratios (`{subject}_incorrect_ratio`, `_correct_ratio`, `_new_ratio`).
    pub fn ratios(&self, subject: &Subject) -> Result<Ratios, ScheduleError> {
        Ok(Ratios {
            incorrect: self.required_f64(&subject.key("incorrect_ratio"))?,
            correct: self.required_f64(&subject.key("correct_ratio"))?,
            new: self.required_f64(&subject.key("new_ratio"))?,
        })
    }

    /// New lessons a learner may have open at once (`{subject}_learning_speed`).
    pub fn learning_speed(&self, subject: &Subject) -> Result<usize, ScheduleError> {
        Ok(self.required_u64(&subject.key("learning_speed"))? as usize)
    }

    /// Ordered lesson progression (`{subject}_learning_path`).
    pub fn learning_path(&self, subject: &Subject) -> Result<Vec<LessonId>, ScheduleError> {
        let key = subject.key("learning_path");
        let invalid = || ScheduleError::config(format!("`{key}` must be a list of lesson numbers"));
        self.required(&key)?
            .as_array()
            .ok_or_else(invalid)?
            .iter()
            .map(|v| {
                v.as_u64()
                    .and_then(|n| LessonId::try_from(n).ok())
                    .ok_or_else(invalid)
            })
            .collect()
    }

    /// Session pass threshold in `[0, 1]` (`{subject}_pass_ratio`).
    pub fn pass_ratio(&self, subject: &Subject) -> Result<f64, ScheduleError> {
        let key = subject.key("pass_ratio");
        let ratio = self.required_f64(&key)?;
        if !(0.0..=1.0).contains(&ratio) {
            return Err(ScheduleError::config(format!(
                "`{key}` must be between 0 and 1, got {ratio}"
            )));
        }
        Ok(ratio)
    }

    /// Boolean toggle such as `{subject}_total_wins`, if set.
    pub fn toggle(&self, subject: &Subject, name: &str) -> Option<bool> {
        self.get(&subject.key(name)).and_then(Value::as_bool)
    }
}

/// Account kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Identity {
    Student,
    Teacher,
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identity::Student => write!(f, "student"),
            Identity::Teacher => write!(f, "teacher"),
        }
    }
}

impl FromStr for Identity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "student" => Ok(Identity::Student),
            "teacher" => Ok(Identity::Teacher),
            other => Err(format!("unknown identity: {other}")),
        }
    }
}

/// Settings a user holds in one (role, class) capacity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleProfile {
    pub role_id: String,
    pub class_id: String,
    #[serde(default)]
    pub settings: Settings,
}

/// A registered user and every role they hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub username: String,
    #[serde(default)]
    pub display_name: String,
    pub identity: Identity,
    /// Class a student is registered in.
    #[serde(default)]
    pub class_id: Option<String>,
    #[serde(default)]
    pub roles: Vec<RoleProfile>,
}

impl UserProfile {
    /// A student with a single role in `class_id`.
    pub fn student(username: impl Into<String>, class_id: impl Into<String>, settings: Settings) -> Self {
        let class_id = class_id.into();
        Self {
            username: username.into(),
            display_name: String::new(),
            identity: Identity::Student,
            class_id: Some(class_id.clone()),
            roles: vec![RoleProfile {
                role_id: Identity::Student.to_string(),
                class_id,
                settings,
            }],
        }
    }

    /// Select the active role.
    ///
    /// Students always bind their own profile. Teachers filter by role and/or
    /// class; with neither given, the profile list must hold exactly one entry.
    pub fn bind_role(&self, role: Option<&str>, class_id: Option<&str>) -> Result<&RoleProfile, ScheduleError> {
        if self.identity == Identity::Student {
            return self.roles.first().ok_or_else(|| {
                ScheduleError::config(format!("student `{}` has no settings profile", self.username))
            });
        }

        let found = match (role, class_id) {
            (Some(role), Some(class)) => self
                .roles
                .iter()
                .find(|p| p.role_id == role && p.class_id == class),
            (Some(role), None) => self.roles.iter().find(|p| p.role_id == role),
            (None, Some(class)) => self.roles.iter().find(|p| p.class_id == class),
            (None, None) => {
                if self.roles.len() == 1 {
                    self.roles.first()
                } else {
                    return Err(ScheduleError::config(format!(
                        "`{}` holds {} roles; a role or class is required",
                        self.username,
                        self.roles.len()
                    )));
                }
            }
        };
        found.ok_or_else(|| {
            ScheduleError::config(format!(
                "no role of `{}` matches role={} class={}",
                self.username,
                role.unwrap_or("*"),
                class_id.unwrap_or("*")
            ))
        })
    }

    /// Mutable variant of [`UserProfile::bind_role`].
    pub fn bind_role_mut(
        &mut self,
        role: Option<&str>,
        class_id: Option<&str>,
    ) -> Result<&mut RoleProfile, ScheduleError> {
        let bound = self.bind_role(role, class_id)?;
        let (role_id, class) = (bound.role_id.clone(), bound.class_id.clone());
        self.roles
            .iter_mut()
            .find(|p| p.role_id == role_id && p.class_id == class)
            .ok_or_else(|| ScheduleError::config("role vanished while binding"))
    }

    /// Decide which learners this user may request sessions for.
    ///
    /// A teacher may target any learner; an empty target list means the whole
    /// `roster` of the bound class. A student may only target themselves.
    pub fn authorize_targets(&self, targets: &[String], roster: &[String]) -> Result<Vec<String>, ScheduleError> {
        match self.identity {
            Identity::Teacher if targets.is_empty() => Ok(roster.to_vec()),
            Identity::Teacher => Ok(targets.to_vec()),
            Identity::Student => match targets {
                [] => Ok(vec![self.username.clone()]),
                [only] if *only == self.username => Ok(vec![only.clone()]),
                _ => Err(ScheduleError::PermissionDenied(format!(
                    "student `{}` may only request their own sessions",
                    self.username
                ))),
            },
        }
    }
}
