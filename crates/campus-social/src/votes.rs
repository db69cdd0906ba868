//! Three-state toggle voting on posts and comments.

use campus_db::Database;
use campus_types::models::{VoteType, Votes};
use tracing::debug;

use crate::SocialError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteTarget<'a> {
    Post(&'a str),
    Comment(&'a str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteOutcome {
    pub upvotes: usize,
    pub downvotes: usize,
    /// `None` when the call toggled the voter's vote off.
    pub user_vote: Option<VoteType>,
}

impl VoteOutcome {
    fn of(votes: &Votes, user_vote: Option<VoteType>) -> Self {
        Self {
            upvotes: votes.upvotes(),
            downvotes: votes.downvotes(),
            user_vote,
        }
    }
}

pub fn parse_vote_type(raw: &str) -> Result<VoteType, SocialError> {
    raw.parse().map_err(|_| SocialError::InvalidInput("Invalid vote type"))
}

/// Clear any opposite vote, then toggle `vote` for `voter`.
/// Returns the voter's resulting vote.
pub fn apply_vote(votes: &mut Votes, voter: &str, vote: VoteType) -> Option<VoteType> {
    votes.voters_mut(vote.opposite()).remove(voter);

    let target = votes.voters_mut(vote);
    if target.remove(voter) {
        None
    } else {
        target.insert(voter);
        Some(vote)
    }
}

/// Hidden posts, and comments under them, can only be voted on by the
/// post's author; everyone else gets `NotFound`.
pub fn vote(
    db: &Database,
    target: VoteTarget<'_>,
    voter: &str,
    vote_type: &str,
) -> Result<VoteOutcome, SocialError> {
    let vote = parse_vote_type(vote_type)?;

    let outcome = match target {
        VoteTarget::Post(id) => {
            let mut post = db
                .get_post(id)?
                .filter(|post| post.visible_to(Some(voter)))
                .ok_or(SocialError::NotFound("Post"))?;
            let user_vote = apply_vote(&mut post.votes, voter, vote);
            if !db.save_post_votes(id, &post.votes)? {
                return Err(SocialError::NotFound("Post"));
            }
            VoteOutcome::of(&post.votes, user_vote)
        }
        VoteTarget::Comment(id) => {
            let mut comment = db.get_comment(id)?.ok_or(SocialError::NotFound("Comment"))?;
            // comments under a post hidden from the voter read as missing
            let parent_visible = db
                .get_post(&comment.post_id)?
                .is_some_and(|post| post.visible_to(Some(voter)));
            if !parent_visible {
                return Err(SocialError::NotFound("Comment"));
            }
            let user_vote = apply_vote(&mut comment.votes, voter, vote);
            if !db.save_comment_votes(id, &comment.votes)? {
                return Err(SocialError::NotFound("Comment"));
            }
            VoteOutcome::of(&comment.votes, user_vote)
        }
    };

    debug!("{} voted {} on {:?} -> {:?}", voter, vote, target, outcome.user_vote);
    Ok(outcome)
}
