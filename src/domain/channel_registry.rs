//! Concurrent registry of live channels, indexed by user and by group.
//!
//! [`ChannelRegistry`] maps each [`UserId`] and each [`GroupId`] to the set
//! of channels currently open for it. A single coarse
//! [`parking_lot::RwLock`] guards both maps; it is only ever held for map
//! mutation or for copying a snapshot out, never across a channel write.
//!
//! # Invariants
//!
//! - A key whose channel set becomes empty is removed immediately.
//! - Registering an already registered channel and unregistering an absent
//!   one are both no-ops.
//! - Lookups return owned snapshots; later registry changes never affect a
//!   snapshot already handed out.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use parking_lot::RwLock;
use serde::Serialize;
use utoipa::ToSchema;

use super::{Channel, GroupId, UserId};

/// Number of keys currently present in each index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct ConnectionCounts {
    /// Distinct users with at least one live channel.
    pub users: usize,
    /// Distinct groups with at least one live channel.
    pub groups: usize,
}

#[derive(Debug, Default)]
struct Indexes {
    users: HashMap<UserId, HashSet<Channel>>,
    groups: HashMap<GroupId, HashSet<Channel>>,
}

/// Central store of live channels.
///
/// Constructed once at startup and shared as `Arc<ChannelRegistry>` by the
/// dispatcher and every session.
#[derive(Debug, Default)]
pub struct ChannelRegistry {
    inner: RwLock<Indexes>,
}

fn insert<K: Eq + Hash>(map: &mut HashMap<K, HashSet<Channel>>, key: K, channel: Channel) {
    map.entry(key).or_default().insert(channel);
}

fn remove<K: Eq + Hash>(map: &mut HashMap<K, HashSet<Channel>>, key: &K, channel: &Channel) {
    if let Some(set) = map.get_mut(key) {
        set.remove(channel);
        if set.is_empty() {
            map.remove(key);
        }
    }
}

fn snapshot<K: Eq + Hash>(map: &HashMap<K, HashSet<Channel>>, key: &K) -> Vec<Channel> {
    map.get(key)
        .map(|set| set.iter().cloned().collect())
        .unwrap_or_default()
}

impl ChannelRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `channel` to the user's channel set, creating the set if absent.
    pub fn register_individual(&self, user_id: &UserId, channel: Channel) {
        insert(&mut self.inner.write().users, user_id.clone(), channel);
    }

    /// Adds `channel` to the group's channel set, creating the set if absent.
    pub fn register_group(&self, group_id: &GroupId, channel: Channel) {
        insert(&mut self.inner.write().groups, group_id.clone(), channel);
    }

    /// Removes `channel` from the user's set; drops the key when it empties.
    pub fn unregister_individual(&self, user_id: &UserId, channel: &Channel) {
        remove(&mut self.inner.write().users, user_id, channel);
    }

    /// Removes `channel` from the group's set; drops the key when it empties.
    pub fn unregister_group(&self, group_id: &GroupId, channel: &Channel) {
        remove(&mut self.inner.write().groups, group_id, channel);
    }

    /// Registers `channel` under `user_id` and every group in one step.
    pub fn register_session(&self, user_id: &UserId, groups: &[GroupId], channel: &Channel) {
        let mut indexes = self.inner.write();
        insert(&mut indexes.users, user_id.clone(), channel.clone());
        for group_id in groups {
            insert(&mut indexes.groups, group_id.clone(), channel.clone());
        }
    }

    /// Removes `channel` from the user and every listed group in one step.
    ///
    /// Safe to call any number of times.
    pub fn unregister_session(&self, user_id: &UserId, groups: &[GroupId], channel: &Channel) {
        let mut indexes = self.inner.write();
        remove(&mut indexes.users, user_id, channel);
        for group_id in groups {
            remove(&mut indexes.groups, group_id, channel);
        }
    }

    /// Snapshot of the user's live channels; empty when none.
    #[must_use]
    pub fn lookup_individual(&self, user_id: &UserId) -> Vec<Channel> {
        snapshot(&self.inner.read().users, user_id)
    }

    /// Snapshot of the group's live channels; empty when none.
    #[must_use]
    pub fn lookup_group(&self, group_id: &GroupId) -> Vec<Channel> {
        snapshot(&self.inner.read().groups, group_id)
    }

    /// Snapshot of every registered channel, each listed once even when it
    /// is indexed under a user and several groups.
    #[must_use]
    pub fn all_channels(&self) -> Vec<Channel> {
        let indexes = self.inner.read();
        let mut seen = HashSet::new();
        indexes
            .users
            .values()
            .chain(indexes.groups.values())
            .flatten()
            .filter(|channel| seen.insert(channel.session_id()))
            .cloned()
            .collect()
    }

    /// Number of user keys and group keys currently present.
    #[must_use]
    pub fn counts(&self) -> ConnectionCounts {
        let indexes = self.inner.read();
        ConnectionCounts {
            users: indexes.users.len(),
            groups: indexes.groups.len(),
        }
    }

    /// Returns `true` if no channel is registered anywhere.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        let indexes = self.inner.read();
        indexes.users.is_empty() && indexes.groups.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::domain::channel::testing::open_channel;

    fn user(id: &str) -> UserId {
        UserId::from(id)
    }

    fn group(id: &str) -> GroupId {
        GroupId::from(id)
    }

    #[test]
    fn lookup_unknown_key_is_empty() {
        let registry = ChannelRegistry::new();
        assert!(registry.lookup_individual(&user("nobody")).is_empty());
        assert!(registry.lookup_group(&group("nowhere")).is_empty());
        assert!(registry.all_channels().is_empty());
    }

    #[test]
    fn multiple_devices_per_user() {
        let registry = ChannelRegistry::new();
        let (phone, _rx1) = open_channel(1);
        let (laptop, _rx2) = open_channel(1);

        registry.register_individual(&user("userA"), phone.clone());
        registry.register_individual(&user("userA"), laptop.clone());

        let channels = registry.lookup_individual(&user("userA"));
        assert_eq!(channels.len(), 2);
        assert!(channels.contains(&phone));
        assert!(channels.contains(&laptop));
        assert_eq!(registry.counts().users, 1);
    }

    #[test]
    fn registering_twice_keeps_one_entry() {
        let registry = ChannelRegistry::new();
        let (channel, _rx) = open_channel(1);
        registry.register_individual(&user("u"), channel.clone());
        registry.register_individual(&user("u"), channel);
        assert_eq!(registry.lookup_individual(&user("u")).len(), 1);
    }

    #[test]
    fn empty_sets_are_pruned() {
        let registry = ChannelRegistry::new();
        let (channel, _rx) = open_channel(1);
        registry.register_individual(&user("u"), channel.clone());
        registry.register_group(&group("g"), channel.clone());

        registry.unregister_individual(&user("u"), &channel);
        registry.unregister_group(&group("g"), &channel);

        assert_eq!(registry.counts(), ConnectionCounts::default());
        assert!(registry.is_empty());
    }

    #[test]
    fn unregistering_absent_channel_is_noop() {
        let registry = ChannelRegistry::new();
        let (present, _rx1) = open_channel(1);
        let (absent, _rx2) = open_channel(1);
        registry.register_individual(&user("u"), present.clone());

        registry.unregister_individual(&user("u"), &absent);
        registry.unregister_individual(&user("other"), &present);
        registry.unregister_group(&group("g"), &present);

        assert_eq!(registry.lookup_individual(&user("u")), vec![present]);
        assert_eq!(
            registry.counts(),
            ConnectionCounts {
                users: 1,
                groups: 0
            }
        );
    }

    #[test]
    fn unregister_individual_leaves_groups_intact() {
        let registry = ChannelRegistry::new();
        let (channel, _rx) = open_channel(1);
        registry.register_individual(&user("u"), channel.clone());
        registry.register_group(&group("g1"), channel.clone());
        registry.register_group(&group("g2"), channel.clone());

        registry.unregister_individual(&user("u"), &channel);

        assert!(registry.lookup_individual(&user("u")).is_empty());
        assert_eq!(registry.lookup_group(&group("g1")), vec![channel.clone()]);
        assert_eq!(registry.lookup_group(&group("g2")), vec![channel]);
    }

    #[test]
    fn session_helpers_cover_all_maps() {
        let registry = ChannelRegistry::new();
        let (channel, _rx) = open_channel(1);
        let groups = vec![group("g1"), group("g2")];

        registry.register_session(&user("u"), &groups, &channel);
        assert_eq!(
            registry.counts(),
            ConnectionCounts {
                users: 1,
                groups: 2
            }
        );

        registry.unregister_session(&user("u"), &groups, &channel);
        registry.unregister_session(&user("u"), &groups, &channel);
        assert!(registry.is_empty());
    }

    #[test]
    fn all_channels_deduplicates_across_maps() {
        let registry = ChannelRegistry::new();
        let (a, _rx1) = open_channel(1);
        let (b, _rx2) = open_channel(1);
        registry.register_session(&user("ua"), &[group("g")], &a);
        registry.register_session(&user("ub"), &[group("g")], &b);

        let all = registry.all_channels();
        assert_eq!(all.len(), 2);
        assert!(all.contains(&a));
        assert!(all.contains(&b));
    }

    #[test]
    fn snapshot_is_not_a_live_view() {
        let registry = ChannelRegistry::new();
        let (channel, _rx) = open_channel(1);
        registry.register_individual(&user("u"), channel.clone());

        let before = registry.lookup_individual(&user("u"));
        registry.unregister_individual(&user("u"), &channel);

        assert_eq!(before.len(), 1);
        assert!(registry.lookup_individual(&user("u")).is_empty());
    }

    #[test]
    fn random_register_unregister_sequences_never_leave_empty_sets() {
        let registry = ChannelRegistry::new();
        let mut channels = Vec::new();
        let mut receivers = Vec::new();
        for _ in 0..6 {
            let (channel, rx) = open_channel(1);
            channels.push(channel);
            receivers.push(rx);
        }
        let users = [user("u0"), user("u1"), user("u2")];
        let groups = [group("g0"), group("g1")];

        // Deterministic pseudo-random walk over register/unregister calls.
        let mut seed: u64 = 0x9E37_79B9_7F4A_7C15;
        for _ in 0..500 {
            seed ^= seed << 13;
            seed ^= seed >> 7;
            seed ^= seed << 17;
            let pick = |n: usize, shift: u32| (seed >> shift) as usize % n;
            let Some(channel) = channels.get(pick(channels.len(), 3)) else {
                panic!("index in range");
            };
            let Some(u) = users.get(pick(users.len(), 11)) else {
                panic!("index in range");
            };
            let Some(g) = groups.get(pick(groups.len(), 19)) else {
                panic!("index in range");
            };
            match pick(4, 29) {
                0 => registry.register_individual(u, channel.clone()),
                1 => registry.unregister_individual(u, channel),
                2 => registry.register_group(g, channel.clone()),
                _ => registry.unregister_group(g, channel),
            }

            let counts = registry.counts();
            let non_empty_users = users
                .iter()
                .filter(|u| !registry.lookup_individual(u).is_empty())
                .count();
            let non_empty_groups = groups
                .iter()
                .filter(|g| !registry.lookup_group(g).is_empty())
                .count();
            assert_eq!(counts.users, non_empty_users);
            assert_eq!(counts.groups, non_empty_groups);
        }
    }

    #[tokio::test]
    async fn concurrent_sessions_register_and_unregister() {
        let registry = Arc::new(ChannelRegistry::new());
        let mut tasks = Vec::new();
        for i in 0..32 {
            let registry = Arc::clone(&registry);
            tasks.push(tokio::spawn(async move {
                let (channel, _rx) = open_channel(1);
                let user_id = UserId::new(format!("user-{}", i % 4));
                let groups = vec![GroupId::new(format!("group-{}", i % 3))];
                registry.register_session(&user_id, &groups, &channel);
                let _ = registry.all_channels();
                tokio::task::yield_now().await;
                registry.unregister_session(&user_id, &groups, &channel);
            }));
        }
        for task in tasks {
            assert!(task.await.is_ok());
        }
        assert!(registry.is_empty());
    }
}
