//! Action strings attached to definition buttons
//!
//! Grammar:
//! - `toggle-role:<role id>`
//! - `toggle-role:<group>:<role id>`
//! - `toggle-channel:<channel id>`

use crate::constants::definitions::{
	ACTION_DELIMITER, TOGGLE_CHANNEL_PREFIX, TOGGLE_ROLE_PREFIX,
};
use poise::serenity_prelude::{ChannelId, RoleId};

/// A parsed button action
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Action {
	/// Give or take a role, removing the other roles of `group` when given
	RoleToggle {
		/// The toggled role
		role_id: RoleId,
		/// The uniqueness group the role belongs to
		group: Option<String>,
	},
	/// Show or hide a channel to the user
	ChannelToggle {
		/// The toggled channel
		channel_id: ChannelId,
	},
	/// Unknown prefix or malformed arguments
	Invalid,
}

/// Parses a Discord snowflake, rejecting `0` which is not a valid id
fn parse_id(raw: &str) -> Option<u64> {
	raw.parse::<u64>().ok().filter(|id| *id != 0)
}

impl Action {
	/// Parse an action string, never fails but may return [`Action::Invalid`]
	pub(crate) fn parse(raw: &str) -> Self {
		let mut parts = raw.trim().split(ACTION_DELIMITER);
		let prefix = parts.next().unwrap_or_default();
		let args: Vec<&str> = parts.collect();

		match (prefix, args.as_slice()) {
			(TOGGLE_ROLE_PREFIX, [role_id]) => parse_id(role_id).map_or(Self::Invalid, |id| {
				Self::RoleToggle {
					role_id: RoleId::new(id),
					group: None,
				}
			}),
			(TOGGLE_ROLE_PREFIX, [group, role_id]) if !group.is_empty() => parse_id(role_id)
				.map_or(Self::Invalid, |id| Self::RoleToggle {
					role_id: RoleId::new(id),
					group: Some((*group).to_owned()),
				}),
			(TOGGLE_CHANNEL_PREFIX, [channel_id]) => {
				parse_id(channel_id).map_or(Self::Invalid, |id| Self::ChannelToggle {
					channel_id: ChannelId::new(id),
				})
			}
			_ => Self::Invalid,
		}
	}

	/// The group of a role toggle, if any
	pub(crate) fn group(&self) -> Option<&str> {
		match self {
			Self::RoleToggle { group, .. } => group.as_deref(),
			_ => None,
		}
	}
}
