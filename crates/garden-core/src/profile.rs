//! Player profiles, cumulative stats, and achievement unlocks.
//!
//! A [`ProfileTracker`] holds the active profile and the collection of every
//! profile on the device. The active profile is mirrored into the collection
//! by id after every change, so the leaderboard always sees current stats.

use garden_logic::achievements::{self, Achievement, ProfileStats, StatsDelta};
use garden_logic::constants::{USERNAME_MAX_LEN, USERNAME_MIN_LEN};
use garden_logic::leaderboard;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::persistence::{
    self, PersistenceError, PersistenceGateway, SaveBatch, ALL_PROFILES_KEY, PROFILE_KEY,
};

/// Avatars handed out when the player does not pick one.
pub const AVATARS: &[&str] = &[
    "👨‍🌾", "👩‍🌾", "🧑‍🌾", "🌱", "🌻", "🌺", "🌸", "🌼", "🌷", "🌹",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub username: String,
    pub avatar: String,
    pub created_at: u64,
    pub stats: ProfileStats,
    pub achievements: Vec<Achievement>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProfileError {
    #[error("username must be {min}-{max} characters", min = USERNAME_MIN_LEN, max = USERNAME_MAX_LEN)]
    InvalidUsername,
    #[error("no profile with id {0}")]
    UnknownProfile(String),
}

/// Trim and length-check a username.
pub fn validate_username(raw: &str) -> Result<String, ProfileError> {
    let name = raw.trim();
    let len = name.chars().count();
    if (USERNAME_MIN_LEN..=USERNAME_MAX_LEN).contains(&len) {
        Ok(name.to_string())
    } else {
        Err(ProfileError::InvalidUsername)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProfileTracker {
    current: Option<UserProfile>,
    all: Vec<UserProfile>,
}

impl ProfileTracker {
    pub fn new(current: Option<UserProfile>, all: Vec<UserProfile>) -> Self {
        let mut tracker = Self { current, all };
        for profile in tracker.current.iter_mut().chain(tracker.all.iter_mut()) {
            achievements::sync_definitions(&mut profile.achievements);
        }
        tracker
    }

    pub fn current(&self) -> Option<&UserProfile> {
        self.current.as_ref()
    }

    pub fn all(&self) -> &[UserProfile] {
        &self.all
    }

    /// Create a profile, make it current, and add it to the collection.
    ///
    /// The id is the creation time in milliseconds, bumped past any id
    /// already taken.
    pub fn create_profile(
        &mut self,
        username: &str,
        avatar: Option<&str>,
        starting: ProfileStats,
        now_ms: u64,
    ) -> Result<&UserProfile, ProfileError> {
        let username = validate_username(username)?;
        let avatar = match avatar.filter(|a| !a.trim().is_empty()) {
            Some(a) => a.to_string(),
            None => AVATARS
                .choose(&mut rand::thread_rng())
                .copied()
                .unwrap_or("🌱")
                .to_string(),
        };

        let mut stamp = now_ms;
        while self.all.iter().any(|p| p.id == stamp.to_string()) {
            stamp += 1;
        }

        let profile = UserProfile {
            id: stamp.to_string(),
            username,
            avatar,
            created_at: now_ms,
            stats: starting,
            achievements: achievements::fresh_achievements(),
        };
        info!(id = %profile.id, username = %profile.username, "profile created");
        self.upsert(profile.clone());
        Ok(&*self.current.insert(profile))
    }

    /// Fold a stats delta into the current profile and re-check achievements.
    /// Returns the achievement ids unlocked by this update.
    pub fn update_stats(&mut self, delta: &StatsDelta, now_ms: u64) -> Vec<&'static str> {
        let Some(profile) = self.current.as_mut() else {
            return Vec::new();
        };
        profile.stats.apply(delta);
        let unlocked = achievements::evaluate(&mut profile.achievements, &profile.stats, now_ms);
        for id in &unlocked {
            info!(profile = %profile.id, achievement = *id, "achievement unlocked");
        }
        let snapshot = profile.clone();
        self.upsert(snapshot);
        unlocked
    }

    pub fn switch_profile(&mut self, id: &str) -> Result<(), ProfileError> {
        let profile = self
            .all
            .iter()
            .find(|p| p.id == id)
            .ok_or_else(|| ProfileError::UnknownProfile(id.to_string()))?;
        debug!(id, "switched profile");
        self.current = Some(profile.clone());
        Ok(())
    }

    /// Remove a profile. Deleting the current profile switches to the first
    /// remaining one, or leaves no current profile.
    pub fn delete_profile(&mut self, id: &str) -> Result<(), ProfileError> {
        let before = self.all.len();
        self.all.retain(|p| p.id != id);
        if self.all.len() == before {
            return Err(ProfileError::UnknownProfile(id.to_string()));
        }
        if self.current.as_ref().is_some_and(|p| p.id == id) {
            self.current = self.all.first().cloned();
        }
        info!(id, remaining = self.all.len(), "profile deleted");
        Ok(())
    }

    /// Forget the current profile without deleting it.
    pub fn clear_profile(&mut self) {
        self.current = None;
    }

    /// All profiles, best score first.
    pub fn leaderboard(&self) -> Vec<&UserProfile> {
        leaderboard::rank(&self.all, |p| &p.stats)
    }

    fn upsert(&mut self, profile: UserProfile) {
        match self.all.iter_mut().find(|p| p.id == profile.id) {
            Some(existing) => *existing = profile,
            None => self.all.push(profile),
        }
    }

    /// Serialized writes for both profile keys.
    pub fn save_batch(&self) -> Result<SaveBatch, PersistenceError> {
        let current = self
            .current
            .as_ref()
            .map(|p| persistence::to_blob(PROFILE_KEY, p))
            .transpose()?;
        Ok(vec![
            (PROFILE_KEY, current),
            (ALL_PROFILES_KEY, Some(persistence::to_blob(ALL_PROFILES_KEY, &self.all)?)),
        ])
    }

    pub async fn load(gateway: &dyn PersistenceGateway) -> Result<Self, PersistenceError> {
        let current = match gateway.get(PROFILE_KEY).await? {
            Some(blob) => Some(persistence::from_blob(PROFILE_KEY, &blob)?),
            None => None,
        };
        let all = match gateway.get(ALL_PROFILES_KEY).await? {
            Some(blob) => persistence::from_blob(ALL_PROFILES_KEY, &blob)?,
            None => Vec::new(),
        };
        Ok(Self::new(current, all))
    }

    pub async fn save_current(&self, gateway: &dyn PersistenceGateway) -> Result<(), PersistenceError> {
        match &self.current {
            Some(profile) => {
                gateway
                    .set(PROFILE_KEY, persistence::to_blob(PROFILE_KEY, profile)?)
                    .await
            }
            None => gateway.remove(PROFILE_KEY).await,
        }
    }

    pub async fn save_all(&self, gateway: &dyn PersistenceGateway) -> Result<(), PersistenceError> {
        gateway
            .set(ALL_PROFILES_KEY, persistence::to_blob(ALL_PROFILES_KEY, &self.all)?)
            .await
    }
}
