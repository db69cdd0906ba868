//! Follow / unfollow / friend transitions.
//!
//! Each operation loads two user documents, applies a pure transition to
//! their [`Relations`], then writes both back one after the other. The two
//! writes are not atomic together: two concurrent operations on the same
//! pair can interleave and the later write of each document wins.

use campus_db::Database;
use campus_types::models::Relations;
use tracing::info;

use crate::SocialError;

/// One side of a relationship transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub id: String,
    pub relations: Relations,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FollowOutcome {
    pub became_friends: bool,
}

// -- Transitions --

/// Add the `follower -> followee` edge. Returns whether the pair is mutual
/// (and therefore friends) afterwards.
pub fn apply_follow(follower: &mut Member, followee: &mut Member) -> Result<bool, SocialError> {
    if follower.id == followee.id {
        return Err(SocialError::InvalidOperation("You cannot follow yourself."));
    }
    if follower.relations.following.contains(&followee.id) {
        return Err(SocialError::AlreadyExists("You are already following this user."));
    }

    follower.relations.following.insert(&followee.id);
    followee.relations.followers.insert(&follower.id);

    let mutual = followee.relations.following.contains(&follower.id);
    if mutual {
        befriend(follower, followee);
    }
    Ok(mutual)
}

/// Remove the `follower -> followee` edge and any friendship between them.
pub fn apply_unfollow(follower: &mut Member, followee: &mut Member) -> Result<(), SocialError> {
    if !follower.relations.following.contains(&followee.id) {
        return Err(SocialError::InvalidState("You are not following this user."));
    }

    follower.relations.following.remove(&followee.id);
    followee.relations.followers.remove(&follower.id);
    unfriend(follower, followee);
    Ok(())
}

pub fn apply_add_friend(a: &mut Member, b: &mut Member) -> Result<(), SocialError> {
    if a.id == b.id {
        return Err(SocialError::InvalidOperation("You cannot befriend yourself."));
    }
    if !a.relations.following.contains(&b.id) || !b.relations.following.contains(&a.id) {
        return Err(SocialError::Precondition(
            "Both users must follow each other before becoming friends.",
        ));
    }
    befriend(a, b);
    Ok(())
}

/// Friend-list mutation only; follow edges are left as they are.
pub fn apply_remove_friend(a: &mut Member, b: &mut Member) -> Result<(), SocialError> {
    if a.id == b.id {
        return Err(SocialError::InvalidOperation("You cannot unfriend yourself."));
    }
    unfriend(a, b);
    Ok(())
}

fn befriend(a: &mut Member, b: &mut Member) {
    a.relations.friends.insert(&b.id);
    b.relations.friends.insert(&a.id);
}

fn unfriend(a: &mut Member, b: &mut Member) {
    a.relations.friends.remove(&b.id);
    b.relations.friends.remove(&a.id);
}

// -- Store-backed operations --

pub fn follow(db: &Database, follower_id: &str, followee_id: &str) -> Result<FollowOutcome, SocialError> {
    if follower_id == followee_id {
        return Err(SocialError::InvalidOperation("You cannot follow yourself."));
    }

    let (mut follower, mut followee) = load_pair(db, follower_id, followee_id)?;
    let became_friends = apply_follow(&mut follower, &mut followee)?;
    store_pair(db, &follower, &followee)?;

    info!("{} followed {} (friends: {})", follower_id, followee_id, became_friends);
    Ok(FollowOutcome { became_friends })
}

pub fn unfollow(db: &Database, follower_id: &str, followee_id: &str) -> Result<(), SocialError> {
    let (mut follower, mut followee) = load_pair(db, follower_id, followee_id)?;
    apply_unfollow(&mut follower, &mut followee)?;
    store_pair(db, &follower, &followee)?;

    info!("{} unfollowed {}", follower_id, followee_id);
    Ok(())
}

pub fn add_friend(db: &Database, user_id1: &str, user_id2: &str) -> Result<(), SocialError> {
    let (mut a, mut b) = load_pair(db, user_id1, user_id2)?;
    apply_add_friend(&mut a, &mut b)?;
    store_pair(db, &a, &b)?;
    Ok(())
}

pub fn remove_friend(db: &Database, user_id1: &str, user_id2: &str) -> Result<(), SocialError> {
    let (mut a, mut b) = load_pair(db, user_id1, user_id2)?;
    apply_remove_friend(&mut a, &mut b)?;
    store_pair(db, &a, &b)?;
    Ok(())
}

/// Whether `recipient` is in `sender`'s friend set. A missing sender has no
/// friends.
pub fn are_friends(db: &Database, sender: &str, recipient: &str) -> Result<bool, SocialError> {
    Ok(db
        .get_user(sender)?
        .is_some_and(|user| user.relations.friends.contains(recipient)))
}

pub fn friends_of(db: &Database, user_id: &str) -> Result<Vec<String>, SocialError> {
    let user = db.get_user(user_id)?.ok_or(SocialError::NotFound("User"))?;
    Ok(user.relations.friends.to_vec())
}

fn load_member(db: &Database, id: &str) -> Result<Member, SocialError> {
    let user = db.get_user(id)?.ok_or(SocialError::NotFound("User"))?;
    Ok(Member {
        id: user.id,
        relations: user.relations,
    })
}

fn load_pair(db: &Database, a: &str, b: &str) -> Result<(Member, Member), SocialError> {
    Ok((load_member(db, a)?, load_member(db, b)?))
}

fn store_pair(db: &Database, a: &Member, b: &Member) -> Result<(), SocialError> {
    for member in [a, b] {
        if !db.save_relations(&member.id, &member.relations)? {
            return Err(SocialError::NotFound("User"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    fn db_with(users: &[&str]) -> Database {
        let db = Database::open_in_memory().unwrap();
        for user in users {
            db.create_user(user, "hash").unwrap();
        }
        db
    }

    fn relations(db: &Database, id: &str) -> Relations {
        db.get_user(id).unwrap().unwrap().relations
    }

    fn member(id: &str) -> Member {
        Member {
            id: id.to_string(),
            relations: Relations::default(),
        }
    }

    #[test]
    fn one_way_follow_is_not_friendship() {
        let db = db_with(&["amy", "bob"]);
        let outcome = follow(&db, "amy", "bob").unwrap();
        assert!(!outcome.became_friends);

        let amy = relations(&db, "amy");
        let bob = relations(&db, "bob");
        assert_eq!(amy.following.to_vec(), vec!["bob"]);
        assert!(amy.followers.is_empty());
        assert_eq!(bob.followers.to_vec(), vec!["amy"]);
        assert!(bob.friends.is_empty());
        assert!(amy.friends.is_empty());
    }

    #[test]
    fn reciprocal_follow_makes_friends() {
        let db = db_with(&["amy", "bob"]);
        follow(&db, "amy", "bob").unwrap();
        let outcome = follow(&db, "bob", "amy").unwrap();
        assert!(outcome.became_friends);

        assert_eq!(relations(&db, "amy").friends.to_vec(), vec!["bob"]);
        assert_eq!(relations(&db, "bob").friends.to_vec(), vec!["amy"]);
        assert!(are_friends(&db, "amy", "bob").unwrap());
        assert!(are_friends(&db, "bob", "amy").unwrap());
    }

    #[test]
    fn self_follow_fails_without_touching_state() {
        let db = db_with(&["amy"]);
        let err = follow(&db, "amy", "amy").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidOperation);
        assert_eq!(relations(&db, "amy"), Relations::default());

        let mut a = member("amy");
        let mut a2 = member("amy");
        assert_eq!(
            apply_follow(&mut a, &mut a2).unwrap_err().kind(),
            ErrorKind::InvalidOperation
        );
        assert_eq!(a, member("amy"));
    }

    #[test]
    fn follow_errors() {
        let db = db_with(&["amy", "bob"]);
        assert_eq!(follow(&db, "amy", "ghost").unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(follow(&db, "ghost", "amy").unwrap_err().kind(), ErrorKind::NotFound);

        follow(&db, "amy", "bob").unwrap();
        assert_eq!(follow(&db, "amy", "bob").unwrap_err().kind(), ErrorKind::AlreadyExists);
        assert_eq!(relations(&db, "bob").followers.len(), 1);
    }

    #[test]
    fn unfollow_breaks_friendship_but_keeps_reverse_edge() {
        let db = db_with(&["amy", "bob"]);
        follow(&db, "amy", "bob").unwrap();
        follow(&db, "bob", "amy").unwrap();

        unfollow(&db, "amy", "bob").unwrap();

        let amy = relations(&db, "amy");
        let bob = relations(&db, "bob");
        assert!(amy.following.is_empty());
        assert!(bob.followers.is_empty());
        assert!(amy.friends.is_empty());
        assert!(bob.friends.is_empty());
        // bob still follows amy
        assert!(bob.following.contains("amy"));
        assert!(amy.followers.contains("bob"));
    }

    #[test]
    fn unfollow_when_not_following_is_invalid_state() {
        let db = db_with(&["amy", "bob"]);
        assert_eq!(unfollow(&db, "amy", "bob").unwrap_err().kind(), ErrorKind::InvalidState);
        assert_eq!(unfollow(&db, "amy", "ghost").unwrap_err().kind(), ErrorKind::NotFound);
    }

    #[test]
    fn refollow_after_unfollow_restores_friendship() {
        let db = db_with(&["amy", "bob"]);
        follow(&db, "amy", "bob").unwrap();
        follow(&db, "bob", "amy").unwrap();
        unfollow(&db, "amy", "bob").unwrap();

        assert!(follow(&db, "amy", "bob").unwrap().became_friends);
        assert!(are_friends(&db, "amy", "bob").unwrap());
    }

    #[test]
    fn add_friend_requires_mutual_following() {
        let db = db_with(&["amy", "bob"]);
        follow(&db, "amy", "bob").unwrap();
        assert_eq!(add_friend(&db, "amy", "bob").unwrap_err().kind(), ErrorKind::Precondition);

        follow(&db, "bob", "amy").unwrap();
        remove_friend(&db, "amy", "bob").unwrap();
        assert!(!are_friends(&db, "amy", "bob").unwrap());

        add_friend(&db, "amy", "bob").unwrap();
        add_friend(&db, "bob", "amy").unwrap();
        assert_eq!(relations(&db, "amy").friends.len(), 1);
        assert_eq!(relations(&db, "bob").friends.len(), 1);
    }

    #[test]
    fn remove_friend_is_idempotent_and_leaves_follow_edges() {
        let db = db_with(&["amy", "bob"]);
        follow(&db, "amy", "bob").unwrap();
        follow(&db, "bob", "amy").unwrap();

        remove_friend(&db, "amy", "bob").unwrap();
        remove_friend(&db, "amy", "bob").unwrap();

        let amy = relations(&db, "amy");
        assert!(amy.friends.is_empty());
        assert!(amy.following.contains("bob"));
        assert!(amy.followers.contains("bob"));
        assert_eq!(remove_friend(&db, "amy", "ghost").unwrap_err().kind(), ErrorKind::NotFound);
    }

    #[test]
    fn friendship_stays_symmetric_across_transitions() {
        let mut a = member("amy");
        let mut b = member("bob");

        apply_follow(&mut a, &mut b).unwrap();
        apply_follow(&mut b, &mut a).unwrap();
        apply_unfollow(&mut b, &mut a).unwrap();
        apply_follow(&mut b, &mut a).unwrap();
        apply_remove_friend(&mut a, &mut b).unwrap();
        apply_add_friend(&mut b, &mut a).unwrap();

        assert_eq!(a.relations.friends.contains("bob"), b.relations.friends.contains("amy"));
        assert!(a.relations.friends.contains("bob"));
    }

    #[test]
    fn friends_of_lists_friend_ids() {
        let db = db_with(&["amy", "bob", "cal"]);
        for (x, y) in [("amy", "bob"), ("bob", "amy"), ("amy", "cal"), ("cal", "amy")] {
            follow(&db, x, y).unwrap();
        }
        assert_eq!(friends_of(&db, "amy").unwrap(), vec!["bob", "cal"]);
        assert_eq!(friends_of(&db, "ghost").unwrap_err().kind(), ErrorKind::NotFound);
        assert!(!are_friends(&db, "ghost", "amy").unwrap());
    }
}
