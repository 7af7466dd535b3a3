//! Maps a recipient descriptor to the channels that should receive it.

use std::sync::Arc;

use crate::domain::{Channel, ChannelRegistry, RecipientDescriptor};

/// Resolves [`RecipientDescriptor`]s against the live registry.
///
/// Always returns an owned snapshot. A channel that closes after
/// resolution is still in the returned set; writing to it fails cleanly.
#[derive(Debug, Clone)]
pub struct RecipientResolver {
    registry: Arc<ChannelRegistry>,
}

impl RecipientResolver {
    /// Creates a resolver over the shared registry.
    #[must_use]
    pub fn new(registry: Arc<ChannelRegistry>) -> Self {
        Self { registry }
    }

    /// Returns the channels targeted by `descriptor`.
    #[must_use]
    pub fn resolve(&self, descriptor: &RecipientDescriptor) -> Vec<Channel> {
        match descriptor {
            RecipientDescriptor::Individual(user_id) => self.registry.lookup_individual(user_id),
            RecipientDescriptor::Group(group_id) => self.registry.lookup_group(group_id),
            RecipientDescriptor::Broadcast => self.registry.all_channels(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::channel::testing::open_channel;
    use crate::domain::{GroupId, UserId};

    #[test]
    fn resolves_each_descriptor_kind() {
        let registry = Arc::new(ChannelRegistry::new());
        let (alice, _rx1) = open_channel(1);
        let (bob, _rx2) = open_channel(1);
        registry.register_session(&UserId::from("alice"), &[GroupId::from("ops")], &alice);
        registry.register_session(&UserId::from("bob"), &[], &bob);

        let resolver = RecipientResolver::new(Arc::clone(&registry));

        let individual = resolver.resolve(&RecipientDescriptor::Individual(UserId::from("bob")));
        assert_eq!(individual, vec![bob.clone()]);

        let group = resolver.resolve(&RecipientDescriptor::Group(GroupId::from("ops")));
        assert_eq!(group, vec![alice.clone()]);

        let all = resolver.resolve(&RecipientDescriptor::Broadcast);
        assert_eq!(all.len(), 2);

        let nobody = resolver.resolve(&RecipientDescriptor::Individual(UserId::from("carol")));
        assert!(nobody.is_empty());
    }
}
