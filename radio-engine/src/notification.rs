//! Foreground notification lease
//!
//! A background playback host must keep a visible notification to stay
//! alive. The engine only asks a `NotificationHost` to hold or drop that
//! lease; building the notification content is the host's business.

use serde::{Deserialize, Serialize};

use crate::error::LeaseError;

/// Identifier of a foreground notification
pub type LeaseId = i32;

/// Notification id used when the engine creates its own notification
pub const DEFAULT_NOTIFICATION_ID: LeaseId = 20190517;
/// Notification id of the media-control feature the lease can be inherited from
pub const MEDIA_CONTROL_NOTIFICATION_ID: LeaseId = 7824;

/// Channel and content the host should use for the lease
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    pub channel_id: String,
    pub channel_name: String,
    pub channel_description: String,
    pub title: String,
    pub text: String,
    /// Id of the notification created when nothing can be inherited
    pub notification_id: LeaseId,
    /// Id of an existing foreground notification to reuse, if showing
    pub inherit_notification_id: Option<LeaseId>,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            channel_id: "radio-session".to_string(),
            channel_name: "Radio playback".to_string(),
            channel_description: "Keeps live radio playing in the background".to_string(),
            title: "Radio".to_string(),
            text: "Playing live stream".to_string(),
            notification_id: DEFAULT_NOTIFICATION_ID,
            inherit_notification_id: Some(MEDIA_CONTROL_NOTIFICATION_ID),
        }
    }
}

/// How a lease was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaseOrigin {
    /// Created for this engine
    Fresh,
    /// Borrowed from another foreground feature already showing one
    Inherited,
}

/// Ownership of the foreground notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotificationLease {
    pub id: LeaseId,
    pub origin: LeaseOrigin,
}

impl NotificationLease {
    /// Whether destroying the engine should release this lease
    ///
    /// An inherited lease stays with its owner unless auto-kill is set.
    pub fn releases_on_destroy(&self, auto_kill: bool) -> bool {
        auto_kill || self.origin == LeaseOrigin::Fresh
    }
}

/// Host primitive that shows and removes the foreground notification
pub trait NotificationHost: Send + Sync {
    fn acquire_lease(&self, channel: &ChannelConfig) -> Result<NotificationLease, LeaseError>;
    fn release_lease(&self, id: LeaseId);
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(LeaseOrigin::Fresh, false, true)]
    #[case(LeaseOrigin::Fresh, true, true)]
    #[case(LeaseOrigin::Inherited, false, false)]
    #[case(LeaseOrigin::Inherited, true, true)]
    fn test_release_policy(
        #[case] origin: LeaseOrigin,
        #[case] auto_kill: bool,
        #[case] releases: bool,
    ) {
        let lease = NotificationLease { id: 1, origin };
        assert_eq!(lease.releases_on_destroy(auto_kill), releases);
    }

    #[test]
    fn test_channel_defaults() {
        let config = ChannelConfig::default();
        assert_eq!(config.notification_id, 20190517);
        assert_eq!(config.inherit_notification_id, Some(7824));
        assert!(!config.channel_id.is_empty());
    }

    #[test]
    fn test_channel_partial_json() {
        let config: ChannelConfig =
            serde_json::from_str(r#"{"title":"Night FM","inherit_notification_id":null}"#)
                .unwrap();
        assert_eq!(config.title, "Night FM");
        assert_eq!(config.inherit_notification_id, None);
        assert_eq!(config.notification_id, DEFAULT_NOTIFICATION_ID);
    }
}
