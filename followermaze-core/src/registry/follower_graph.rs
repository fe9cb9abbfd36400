//! Who follows whom.
//!
//! The graph has no internal synchronization. It is owned by value by the
//! fan-out logic, which in turn is only ever driven by the sequencing
//! engine, so reads and writes are serialized by construction.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::events::UserId;

/// Directed relation `followed -> {followers}`.
///
/// A followed user only has an entry while it has at least one follower.
#[derive(Debug, Default)]
pub struct FollowerGraph {
    followers: HashMap<UserId, HashSet<UserId>>,
}

impl FollowerGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `follower` follows `followed`. Returns `false` if it
    /// already did.
    pub fn add_follower(&mut self, followed: UserId, follower: UserId) -> bool {
        let added = self.followers.entry(followed).or_default().insert(follower);
        if !added {
            debug!(followed, follower, "Already following");
        }
        added
    }

    /// Record that `follower` no longer follows `followed`. Returns `false`
    /// if it did not follow in the first place.
    pub fn remove_follower(&mut self, followed: UserId, follower: UserId) -> bool {
        let Entry::Occupied(mut entry) = self.followers.entry(followed) else {
            debug!(followed, follower, "Unfollow without any followers");
            return false;
        };

        let removed = entry.get_mut().remove(&follower);
        if !removed {
            debug!(followed, follower, "Unfollow by a non-follower");
        }
        if entry.get().is_empty() {
            entry.remove();
        }
        removed
    }

    /// Current followers of `followed`, in no particular order.
    pub fn followers_of(&self, followed: UserId) -> impl Iterator<Item = UserId> + '_ {
        self.followers
            .get(&followed)
            .into_iter()
            .flat_map(|set| set.iter().copied())
    }

    pub fn follower_count(&self, followed: UserId) -> usize {
        self.followers.get(&followed).map_or(0, HashSet::len)
    }

    pub fn is_following(&self, followed: UserId, follower: UserId) -> bool {
        self.followers
            .get(&followed)
            .is_some_and(|set| set.contains(&follower))
    }

    /// Number of users that currently have at least one follower.
    pub fn followed_count(&self) -> usize {
        self.followers.len()
    }
}
