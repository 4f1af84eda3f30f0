use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Publication state of a content item.
///
/// `Processing` is the only non-terminal state: it may move to `Published`
/// or `Rejected`, and nothing ever moves back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentStatus {
    Processing,
    Published,
    Rejected,
}

impl ContentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentStatus::Processing => "processing",
            ContentStatus::Published => "published",
            ContentStatus::Rejected => "rejected",
        }
    }

    pub fn can_transition_to(&self, next: ContentStatus) -> bool {
        matches!(
            (self, next),
            (ContentStatus::Processing, ContentStatus::Published)
                | (ContentStatus::Processing, ContentStatus::Rejected)
        )
    }
}

impl fmt::Display for ContentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "processing" => Ok(ContentStatus::Processing),
            "published" => Ok(ContentStatus::Published),
            "rejected" => Ok(ContentStatus::Rejected),
            other => Err(format!("unknown content status '{}'", other)),
        }
    }
}

/// A video or short-form clip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentItem {
    pub id: String,
    pub title: String,
    pub description: String,
    pub media_url: String,
    pub thumbnail_url: Option<String>,
    pub duration_secs: i64,
    pub category: String,
    pub tags: Vec<String>,
    pub is_premium: bool,
    pub is_short: bool,
    pub status: ContentStatus,
    pub owner_id: String,
    pub views: i64,
    pub likes: i64,
    pub dislikes: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ContentItem {
    /// Case-insensitive substring match over title, description and tags.
    /// `needle` must already be lowercased.
    pub fn matches_text(&self, needle: &str) -> bool {
        self.title.to_lowercase().contains(needle)
            || self.description.to_lowercase().contains(needle)
            || self.tags.iter().any(|t| t.to_lowercase().contains(needle))
    }
}

/// Editable fields of a content item. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
    pub is_premium: Option<bool>,
}

impl ContentPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.tags.is_none()
            && self.is_premium.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactionKind {
    Like,
    Dislike,
}

impl ReactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReactionKind::Like => "like",
            ReactionKind::Dislike => "dislike",
        }
    }
}

impl FromStr for ReactionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "like" => Ok(ReactionKind::Like),
            "dislike" => Ok(ReactionKind::Dislike),
            other => Err(format!("unknown reaction kind '{}'", other)),
        }
    }
}

/// What a reaction is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubjectKind {
    Video,
    Comment,
}

impl SubjectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubjectKind::Video => "video",
            SubjectKind::Comment => "comment",
        }
    }

    /// Table holding the denormalized like/dislike counters.
    pub fn counter_table(&self) -> &'static str {
        match self {
            SubjectKind::Video => "videos",
            SubjectKind::Comment => "comments",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    pub kind: SubjectKind,
    pub id: String,
}

impl Subject {
    pub fn video(id: impl Into<String>) -> Self {
        Self {
            kind: SubjectKind::Video,
            id: id.into(),
        }
    }

    pub fn comment(id: impl Into<String>) -> Self {
        Self {
            kind: SubjectKind::Comment,
            id: id.into(),
        }
    }
}

/// A user's active reaction on a subject. Absence means no reaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionRecord {
    pub subject: Subject,
    pub user_id: String,
    pub kind: ReactionKind,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub video_id: String,
    pub author_id: String,
    pub parent_id: Option<String>,
    pub body: String,
    pub likes: i64,
    pub dislikes: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
    Free,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
            Role::Free => "free",
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "user" => Ok(Role::User),
            "free" => Ok(Role::Free),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub role: Role,
    pub is_premium: bool,
    pub premium_expires_at: Option<DateTime<Utc>>,
    pub videos_watched: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchEntry {
    pub id: String,
    pub user_id: String,
    pub video_id: String,
    pub watched_at: DateTime<Utc>,
}

/// Timestamps are persisted as microseconds since the epoch so that
/// `created_at` sorts and compares as a plain integer.
pub fn to_micros(dt: &DateTime<Utc>) -> i64 {
    dt.timestamp_micros()
}

pub fn from_micros(us: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_micros(us).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_only_leaves_processing() {
        use ContentStatus::*;
        assert!(Processing.can_transition_to(Published));
        assert!(Processing.can_transition_to(Rejected));
        assert!(!Published.can_transition_to(Processing));
        assert!(!Published.can_transition_to(Rejected));
        assert!(!Rejected.can_transition_to(Published));
        assert!(!Processing.can_transition_to(Processing));
    }

    #[test]
    fn enum_strings_round_trip_through_from_str() {
        for s in ["processing", "published", "rejected"] {
            assert_eq!(s.parse::<ContentStatus>().unwrap().as_str(), s);
        }
        assert!("deleted".parse::<ContentStatus>().is_err());
        assert!("heart".parse::<ReactionKind>().is_err());
        assert_eq!("free".parse::<Role>().unwrap(), Role::Free);
    }

    #[test]
    fn micros_preserve_ordering() {
        use chrono::SubsecRound;
        let a = Utc::now();
        let b = a + chrono::Duration::microseconds(1);
        assert!(to_micros(&a) < to_micros(&b));
        assert_eq!(from_micros(to_micros(&a)), a.trunc_subsecs(6));
    }

    #[test]
    fn text_match_is_case_insensitive_over_tags() {
        let now = Utc::now();
        let item = ContentItem {
            id: "v1".into(),
            title: "Sunset".into(),
            description: "".into(),
            media_url: "m".into(),
            thumbnail_url: None,
            duration_secs: 0,
            category: "Müzik".into(),
            tags: vec!["Jazz".into()],
            is_premium: false,
            is_short: false,
            status: ContentStatus::Published,
            owner_id: "u1".into(),
            views: 0,
            likes: 0,
            dislikes: 0,
            created_at: now,
            updated_at: now,
        };
        assert!(item.matches_text("jazz"));
        assert!(item.matches_text("sun"));
        assert!(!item.matches_text("rock"));
    }
}
