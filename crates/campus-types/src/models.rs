use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const USER_ID_MIN_LEN: usize = 3;
pub const USER_ID_MAX_LEN: usize = 30;
pub const PASSWORD_MIN_LEN: usize = 6;
pub const STATUS_MAX_LEN: usize = 150;
pub const POST_TITLE_MAX_LEN: usize = 100;
pub const POST_CONTENT_MAX_LEN: usize = 5000;
pub const COMMENT_MAX_LEN: usize = 1000;
pub const CHAT_MAX_LEN: usize = 2000;

pub const DEFAULT_AVATAR: &str = "/profile_picture_user_icon_153847.ico";
pub const DEFAULT_STATUS: &str = "Hey there! I am using CampusConnect.";
pub const DEFAULT_TITLE: &str = "Newbie";

/// Case-fold a user identity the same way registration stores it.
pub fn normalize_user_id(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// 3–30 characters of `[A-Za-z0-9_]`. Expects an already normalized id.
pub fn is_valid_user_id(id: &str) -> bool {
    (USER_ID_MIN_LEN..=USER_ID_MAX_LEN).contains(&id.chars().count())
        && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// A set of user identities.
///
/// Stored as a JSON array inside the owning document. Ordered so that
/// serialization is stable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdSet(BTreeSet<String>);

impl IdSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the id was not already present.
    pub fn insert(&mut self, id: &str) -> bool {
        if self.0.contains(id) {
            return false;
        }
        self.0.insert(id.to_string())
    }

    /// Returns `true` if the id was present.
    pub fn remove(&mut self, id: &str) -> bool {
        self.0.remove(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.0.contains(id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn union(&self, other: &IdSet) -> IdSet {
        IdSet(self.0.union(&other.0).cloned().collect())
    }

    pub fn difference(&self, other: &IdSet) -> IdSet {
        IdSet(self.0.difference(&other.0).cloned().collect())
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.0.iter().cloned().collect()
    }
}

impl<S: Into<String>> FromIterator<S> for IdSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        IdSet(iter.into_iter().map(Into::into).collect())
    }
}

/// The relationship sets carried on every user document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relations {
    pub followers: IdSet,
    pub following: IdSet,
    pub friends: IdSet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteType {
    Upvote,
    Downvote,
}

impl VoteType {
    pub fn opposite(self) -> Self {
        match self {
            Self::Upvote => Self::Downvote,
            Self::Downvote => Self::Upvote,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Upvote => "upvote",
            Self::Downvote => "downvote",
        }
    }
}

impl fmt::Display for VoteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("invalid vote type: {0:?}")]
pub struct InvalidVoteType(pub String);

impl FromStr for VoteType {
    type Err = InvalidVoteType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "upvote" => Ok(Self::Upvote),
            "downvote" => Ok(Self::Downvote),
            other => Err(InvalidVoteType(other.to_string())),
        }
    }
}

/// Vote ledger embedded in posts and comments. The two sets are disjoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Votes {
    pub upvoted_by: IdSet,
    pub downvoted_by: IdSet,
}

impl Votes {
    pub fn voters(&self, vote: VoteType) -> &IdSet {
        match vote {
            VoteType::Upvote => &self.upvoted_by,
            VoteType::Downvote => &self.downvoted_by,
        }
    }

    pub fn voters_mut(&mut self, vote: VoteType) -> &mut IdSet {
        match vote {
            VoteType::Upvote => &mut self.upvoted_by,
            VoteType::Downvote => &mut self.downvoted_by,
        }
    }

    /// The current vote of `voter`, if any.
    pub fn vote_of(&self, voter: &str) -> Option<VoteType> {
        if self.upvoted_by.contains(voter) {
            Some(VoteType::Upvote)
        } else if self.downvoted_by.contains(voter) {
            Some(VoteType::Downvote)
        } else {
            None
        }
    }

    pub fn upvotes(&self) -> usize {
        self.upvoted_by.len()
    }

    pub fn downvotes(&self) -> usize {
        self.downvoted_by.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_set_insert_is_idempotent() {
        let mut set = IdSet::new();
        assert!(set.insert("alice"));
        assert!(!set.insert("alice"));
        assert_eq!(set.len(), 1);
        assert!(set.remove("alice"));
        assert!(!set.remove("alice"));
        assert!(set.is_empty());
    }

    #[test]
    fn id_set_union_and_difference() {
        let a: IdSet = ["alice", "bob"].into_iter().collect();
        let b: IdSet = ["bob", "carol"].into_iter().collect();
        assert_eq!(a.union(&b).to_vec(), vec!["alice", "bob", "carol"]);
        assert_eq!(a.difference(&b).to_vec(), vec!["alice"]);
    }

    #[test]
    fn id_set_serializes_as_sorted_array() {
        let set: IdSet = ["zed", "amy"].into_iter().collect();
        assert_eq!(serde_json::to_string(&set).unwrap(), r#"["amy","zed"]"#);

        let back: IdSet = serde_json::from_str(r#"["amy","amy","zed"]"#).unwrap();
        assert_eq!(back.len(), 2);
    }

    #[test]
    fn user_id_rules() {
        assert!(is_valid_user_id("abc"));
        assert!(is_valid_user_id("student_42"));
        assert!(!is_valid_user_id("ab"));
        assert!(!is_valid_user_id(&"a".repeat(31)));
        assert!(!is_valid_user_id("has space"));
        assert!(!is_valid_user_id("dash-ed"));
        assert_eq!(normalize_user_id("  Alice_01 "), "alice_01");
    }

    #[test]
    fn vote_type_parsing() {
        assert_eq!("upvote".parse::<VoteType>().unwrap(), VoteType::Upvote);
        assert_eq!("downvote".parse::<VoteType>().unwrap(), VoteType::Downvote);
        assert!("Upvote".parse::<VoteType>().is_err());
        assert!("".parse::<VoteType>().is_err());
        assert_eq!(VoteType::Upvote.opposite(), VoteType::Downvote);
    }

    #[test]
    fn vote_of_reads_either_set() {
        let mut votes = Votes::default();
        assert_eq!(votes.vote_of("amy"), None);
        votes.downvoted_by.insert("amy");
        assert_eq!(votes.vote_of("amy"), Some(VoteType::Downvote));
        assert_eq!(votes.downvotes(), 1);
        assert_eq!(votes.upvotes(), 0);
    }
}
