//! Role and channel toggling state machine behind definition buttons

use crate::{
	actions::Action,
	definitions::{resolve_unique_group_members, DefinitionError, DefinitionSource},
	translation::Translate,
};
use fluent::fluent_args;
use poise::serenity_prelude::{
	self as serenity, ChannelId, Mentionable, PermissionOverwrite, PermissionOverwriteType,
	Permissions, RoleId, UserId,
};

mod guild;

pub(crate) use guild::{DiscordGuild, GuildAccess};

/// The outcome of an applied action, shown to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Notice {
	/// The role was given, `removed` are the roles of the same group taken back
	RoleAdded {
		/// The given role
		role: RoleId,
		/// Conflicting roles removed from the user
		removed: Vec<RoleId>,
	},
	/// The role was taken back
	RoleRemoved {
		/// The removed role
		role: RoleId,
	},
	/// The channel is now visible to the user
	ChannelShown {
		/// The toggled channel
		channel: ChannelId,
	},
	/// The channel is now hidden from the user
	ChannelHidden {
		/// The toggled channel
		channel: ChannelId,
	},
	/// The action string could not be understood
	InvalidAction,
}

impl Notice {
	/// Render the notice in the user language
	pub(crate) fn render(&self, translator: &impl Translate) -> String {
		match self {
			Self::RoleAdded { role, removed } => {
				let added = translator.translate(
					"toggle-role-added",
					Some(fluent_args!["role" => role.mention().to_string()]),
				);

				if removed.is_empty() {
					added
				} else {
					let roles = removed
						.iter()
						.map(|role| role.mention().to_string())
						.collect::<Vec<_>>()
						.join(", ");

					format!(
						"{added} {}",
						translator.translate(
							"toggle-role-added-removed",
							Some(fluent_args!["roles" => roles]),
						)
					)
				}
			}
			Self::RoleRemoved { role } => translator.translate(
				"toggle-role-removed",
				Some(fluent_args!["role" => role.mention().to_string()]),
			),
			Self::ChannelShown { channel } => translator.translate(
				"toggle-channel-shown",
				Some(fluent_args!["channel" => channel.mention().to_string()]),
			),
			Self::ChannelHidden { channel } => translator.translate(
				"toggle-channel-hidden",
				Some(fluent_args!["channel" => channel.mention().to_string()]),
			),
			Self::InvalidAction => translator.translate("toggle-invalid-action", None),
		}
	}
}

/// Errors that abort a toggle
#[derive(Debug, thiserror::Error)]
pub(crate) enum ToggleError {
	/// The definitions could not be read, nothing was mutated
	#[error(transparent)]
	Definitions(#[from] DefinitionError),
	/// A `Discord` call failed
	#[error(transparent)]
	Serenity(#[from] serenity::Error),
}

/// Set the `VIEW_CHANNEL` bit of a member overwrite, leaving every other bit untouched
pub(crate) fn set_read(
	current: Option<PermissionOverwrite>,
	user: UserId,
	allowed: bool,
) -> PermissionOverwrite {
	let mut overwrite = current.unwrap_or(PermissionOverwrite {
		allow: Permissions::empty(),
		deny: Permissions::empty(),
		kind: PermissionOverwriteType::Member(user),
	});

	overwrite.allow.set(Permissions::VIEW_CHANNEL, allowed);
	overwrite.deny.set(Permissions::VIEW_CHANNEL, !allowed);

	overwrite
}

/// Flip the `VIEW_CHANNEL` bit of a member overwrite, returns whether it is now allowed
///
/// A missing overwrite counts as not granted.
pub(crate) fn toggle_read(
	current: Option<PermissionOverwrite>,
	user: UserId,
) -> (PermissionOverwrite, bool) {
	let granted = current
		.as_ref()
		.is_some_and(|overwrite| overwrite.allow.contains(Permissions::VIEW_CHANNEL));

	(set_read(current, user, !granted), !granted)
}

/// Find the overwrite targeting `user`
pub(crate) fn member_overwrite(
	overwrites: Vec<PermissionOverwrite>,
	user: UserId,
) -> Option<PermissionOverwrite> {
	overwrites.into_iter().find(
		|overwrite| matches!(overwrite.kind, PermissionOverwriteType::Member(id) if id == user),
	)
}

/// Explicitly allow or deny `user` to read `channel`, returns `false` if the channel is missing
pub(crate) async fn set_member_read(
	guild: &impl GuildAccess,
	channel: ChannelId,
	user: UserId,
	allowed: bool,
) -> Result<bool, serenity::Error> {
	let Some(overwrites) = guild.channel_overwrites(channel).await? else {
		return Ok(false);
	};

	guild
		.set_overwrite(
			channel,
			set_read(member_overwrite(overwrites, user), user, allowed),
		)
		.await?;

	Ok(true)
}

/// Applies parsed actions on behalf of a user
pub(crate) struct ToggleEngine<'a, G, D> {
	/// The guild mutated
	guild: &'a G,
	/// Where uniqueness groups are looked up
	definitions: &'a D,
}

impl<'a, G: GuildAccess, D: DefinitionSource> ToggleEngine<'a, G, D> {
	/// Create an engine over a guild and a definition source
	pub(crate) const fn new(guild: &'a G, definitions: &'a D) -> Self {
		Self { guild, definitions }
	}

	/// Apply `action`, which comes from the definition `key`, for `user`
	///
	/// Returns `None` when the targeted role or channel does not exist, in which case
	/// nothing is mutated and the user is not notified.
	pub(crate) async fn apply(
		&self,
		user: UserId,
		key: &str,
		action: &Action,
	) -> Result<Option<Notice>, ToggleError> {
		match action {
			Action::RoleToggle { role_id, group } => {
				self.toggle_role(user, key, *role_id, group.as_deref())
					.await
			}
			Action::ChannelToggle { channel_id } => self.toggle_channel(user, *channel_id).await,
			Action::Invalid => Ok(Some(Notice::InvalidAction)),
		}
	}

	/// Give or take a role, enforcing its uniqueness group on add
	async fn toggle_role(
		&self,
		user: UserId,
		key: &str,
		role: RoleId,
		group: Option<&str>,
	) -> Result<Option<Notice>, ToggleError> {
		if !self.guild.role_exists(role).await? {
			tracing::debug!(role_id = role.get(), "toggled role does not exist");
			return Ok(None);
		}

		let held = self.guild.member_roles(user).await?;

		if held.contains(&role) {
			self.guild.remove_roles(user, &[role]).await?;

			return Ok(Some(Notice::RoleRemoved { role }));
		}

		// Resolved before mutating so that unreadable definitions leave the member untouched
		let conflicting: Vec<RoleId> = match group {
			Some(group) => {
				let members = resolve_unique_group_members(self.definitions, key, group)?;

				held.into_iter()
					.filter(|held| *held != role && members.contains(held))
					.collect()
			}
			None => Vec::new(),
		};

		self.guild.add_role(user, role).await?;

		if !conflicting.is_empty() {
			self.guild.remove_roles(user, &conflicting).await?;
		}

		Ok(Some(Notice::RoleAdded {
			role,
			removed: conflicting,
		}))
	}

	/// Flip the read access of the user's own overwrite on a channel
	pub(crate) async fn toggle_channel(
		&self,
		user: UserId,
		channel: ChannelId,
	) -> Result<Option<Notice>, ToggleError> {
		let Some(overwrites) = self.guild.channel_overwrites(channel).await? else {
			tracing::debug!(channel_id = channel.get(), "toggled channel does not exist");
			return Ok(None);
		};

		let (overwrite, granted) = toggle_read(member_overwrite(overwrites, user), user);
		self.guild.set_overwrite(channel, overwrite).await?;

		Ok(Some(if granted {
			Notice::ChannelShown { channel }
		} else {
			Notice::ChannelHidden { channel }
		}))
	}
}

#[cfg(test)]
pub(crate) mod tests {
	use super::*;
	use crate::definitions::tests::{MemoryDefinitions, LANGUAGES};
	use poise::async_trait;
	use std::{
		collections::{HashMap, HashSet},
		sync::Mutex,
	};

	/// Mutation performed on a [`FakeGuild`]
	#[derive(Debug, Clone, PartialEq, Eq)]
	pub(crate) enum Mutation {
		AddRole(RoleId),
		RemoveRoles(Vec<RoleId>),
		SetOverwrite(ChannelId),
	}

	/// An in-memory guild with a single member
	#[derive(Default)]
	pub(crate) struct FakeGuild {
		pub(crate) roles: HashSet<RoleId>,
		pub(crate) held: Mutex<Vec<RoleId>>,
		pub(crate) channels: Mutex<HashMap<ChannelId, Vec<PermissionOverwrite>>>,
		pub(crate) mutations: Mutex<Vec<Mutation>>,
	}

	impl FakeGuild {
		pub(crate) fn with_roles(roles: &[u64], held: &[u64]) -> Self {
			Self {
				roles: roles.iter().copied().map(RoleId::new).collect(),
				held: Mutex::new(held.iter().copied().map(RoleId::new).collect()),
				..Self::default()
			}
		}

		pub(crate) fn with_channel(channel: u64, overwrites: Vec<PermissionOverwrite>) -> Self {
			Self {
				channels: Mutex::new(HashMap::from([(ChannelId::new(channel), overwrites)])),
				..Self::default()
			}
		}

		fn held(&self) -> HashSet<u64> {
			self.held.lock().unwrap().iter().map(|role| role.get()).collect()
		}

		fn mutations(&self) -> Vec<Mutation> {
			self.mutations.lock().unwrap().clone()
		}

		fn overwrite_of(&self, channel: u64, user: UserId) -> Option<PermissionOverwrite> {
			let channels = self.channels.lock().unwrap();
			member_overwrite(channels[&ChannelId::new(channel)].clone(), user)
		}
	}

	#[async_trait]
	impl GuildAccess for FakeGuild {
		async fn role_exists(&self, role: RoleId) -> Result<bool, serenity::Error> {
			Ok(self.roles.contains(&role))
		}

		async fn member_roles(&self, _user: UserId) -> Result<Vec<RoleId>, serenity::Error> {
			Ok(self.held.lock().unwrap().clone())
		}

		async fn add_role(&self, _user: UserId, role: RoleId) -> Result<(), serenity::Error> {
			self.held.lock().unwrap().push(role);
			self.mutations.lock().unwrap().push(Mutation::AddRole(role));
			Ok(())
		}

		async fn remove_roles(
			&self,
			_user: UserId,
			roles: &[RoleId],
		) -> Result<(), serenity::Error> {
			self.held.lock().unwrap().retain(|role| !roles.contains(role));
			self.mutations
				.lock()
				.unwrap()
				.push(Mutation::RemoveRoles(roles.to_vec()));
			Ok(())
		}

		async fn channel_overwrites(
			&self,
			channel: ChannelId,
		) -> Result<Option<Vec<PermissionOverwrite>>, serenity::Error> {
			Ok(self.channels.lock().unwrap().get(&channel).cloned())
		}

		async fn set_overwrite(
			&self,
			channel: ChannelId,
			overwrite: PermissionOverwrite,
		) -> Result<(), serenity::Error> {
			let mut channels = self.channels.lock().unwrap();
			let overwrites = channels.entry(channel).or_default();
			overwrites.retain(|existing| {
				!matches!(
					(&existing.kind, &overwrite.kind),
					(PermissionOverwriteType::Member(a), PermissionOverwriteType::Member(b)) if a == b
				)
			});
			overwrites.push(overwrite);
			self.mutations
				.lock()
				.unwrap()
				.push(Mutation::SetOverwrite(channel));
			Ok(())
		}
	}

	const USER: UserId = UserId::new(42);

	fn languages() -> MemoryDefinitions {
		MemoryDefinitions::with("languages", LANGUAGES)
	}

	#[tokio::test]
	async fn grouped_add_removes_other_group_members() {
		let guild = FakeGuild::with_roles(&[111, 222, 333, 444], &[222, 444]);
		let definitions = languages();
		let engine = ToggleEngine::new(&guild, &definitions);

		let notice = engine
			.apply(USER, "languages", &Action::parse("toggle-role:grp1:111"))
			.await
			.unwrap();

		assert_eq!(
			notice,
			Some(Notice::RoleAdded {
				role: RoleId::new(111),
				removed: vec![RoleId::new(222)],
			})
		);
		assert_eq!(guild.held(), HashSet::from([111, 444]));
		assert_eq!(
			guild.mutations(),
			vec![
				Mutation::AddRole(RoleId::new(111)),
				Mutation::RemoveRoles(vec![RoleId::new(222)]),
			]
		);
	}

	#[tokio::test]
	async fn grouped_add_leaves_user_with_exactly_one_group_role() {
		let guild = FakeGuild::with_roles(&[111, 222, 333], &[111, 333]);
		let definitions = languages();
		let engine = ToggleEngine::new(&guild, &definitions);

		let notice = engine
			.apply(USER, "languages", &Action::parse("toggle-role:grp1:222"))
			.await
			.unwrap();

		assert_eq!(guild.held(), HashSet::from([222]));
		let Some(Notice::RoleAdded { removed, .. }) = notice else {
			panic!("expected a role added notice, got {notice:?}");
		};
		assert_eq!(
			removed.into_iter().collect::<HashSet<_>>(),
			HashSet::from([RoleId::new(111), RoleId::new(333)])
		);
	}

	#[tokio::test]
	async fn removal_never_touches_group_members() {
		let guild = FakeGuild::with_roles(&[111, 222, 333], &[111, 222]);
		let definitions = languages();
		let engine = ToggleEngine::new(&guild, &definitions);

		let notice = engine
			.apply(USER, "languages", &Action::parse("toggle-role:grp1:111"))
			.await
			.unwrap();

		assert_eq!(
			notice,
			Some(Notice::RoleRemoved {
				role: RoleId::new(111)
			})
		);
		assert_eq!(guild.held(), HashSet::from([222]));
		assert_eq!(
			guild.mutations(),
			vec![Mutation::RemoveRoles(vec![RoleId::new(111)])]
		);
	}

	#[tokio::test]
	async fn ungrouped_toggle_twice_restores_membership() {
		let guild = FakeGuild::with_roles(&[111, 444], &[111]);
		let definitions = languages();
		let engine = ToggleEngine::new(&guild, &definitions);
		let action = Action::parse("toggle-role:444");

		let first = engine.apply(USER, "languages", &action).await.unwrap();
		let second = engine.apply(USER, "languages", &action).await.unwrap();

		assert_eq!(
			first,
			Some(Notice::RoleAdded {
				role: RoleId::new(444),
				removed: vec![]
			})
		);
		assert_eq!(
			second,
			Some(Notice::RoleRemoved {
				role: RoleId::new(444)
			})
		);
		assert_eq!(guild.held(), HashSet::from([111]));
	}

	#[tokio::test]
	async fn missing_role_is_ignored() {
		let guild = FakeGuild::with_roles(&[222], &[222]);
		let definitions = languages();
		let engine = ToggleEngine::new(&guild, &definitions);

		let notice = engine
			.apply(USER, "languages", &Action::parse("toggle-role:grp1:111"))
			.await
			.unwrap();

		assert_eq!(notice, None);
		assert!(guild.mutations().is_empty());
	}

	#[tokio::test]
	async fn unreadable_group_definition_mutates_nothing() {
		let guild = FakeGuild::with_roles(&[111, 222], &[222]);
		let definitions = MemoryDefinitions::with("broken", "<message><button");
		let engine = ToggleEngine::new(&guild, &definitions);

		let result = engine
			.apply(USER, "broken", &Action::parse("toggle-role:grp1:111"))
			.await;

		assert!(matches!(result, Err(ToggleError::Definitions(_))));
		assert!(guild.mutations().is_empty());
	}

	#[tokio::test]
	async fn invalid_action_only_notifies() {
		let guild = FakeGuild::default();
		let definitions = languages();
		let engine = ToggleEngine::new(&guild, &definitions);

		let notice = engine
			.apply(USER, "languages", &Action::parse("toggle-emoji:1"))
			.await
			.unwrap();

		assert_eq!(notice, Some(Notice::InvalidAction));
		assert!(guild.mutations().is_empty());
	}

	#[tokio::test]
	async fn missing_channel_is_ignored() {
		let guild = FakeGuild::with_channel(1, vec![]);
		let definitions = languages();
		let engine = ToggleEngine::new(&guild, &definitions);

		let notice = engine
			.apply(USER, "languages", &Action::parse("toggle-channel:555"))
			.await
			.unwrap();

		assert_eq!(notice, None);
		assert!(guild.mutations().is_empty());
	}

	#[tokio::test]
	async fn channel_toggle_flips_only_read_bit() {
		let original = PermissionOverwrite {
			allow: Permissions::VIEW_CHANNEL | Permissions::SEND_MESSAGES,
			deny: Permissions::ATTACH_FILES,
			kind: PermissionOverwriteType::Member(USER),
		};
		let guild = FakeGuild::with_channel(555, vec![original.clone()]);
		let definitions = languages();
		let engine = ToggleEngine::new(&guild, &definitions);
		let action = Action::parse("toggle-channel:555");

		let first = engine.apply(USER, "languages", &action).await.unwrap();
		let hidden = guild.overwrite_of(555, USER).unwrap();

		assert_eq!(
			first,
			Some(Notice::ChannelHidden {
				channel: ChannelId::new(555)
			})
		);
		assert_eq!(hidden.allow, Permissions::SEND_MESSAGES);
		assert_eq!(
			hidden.deny,
			Permissions::ATTACH_FILES | Permissions::VIEW_CHANNEL
		);

		let second = engine.apply(USER, "languages", &action).await.unwrap();
		let restored = guild.overwrite_of(555, USER).unwrap();

		assert_eq!(
			second,
			Some(Notice::ChannelShown {
				channel: ChannelId::new(555)
			})
		);
		assert_eq!(restored.allow, original.allow);
		assert_eq!(restored.deny, original.deny);
	}

	#[test]
	fn missing_overwrite_is_not_granted() {
		let (overwrite, granted) = toggle_read(None, USER);

		assert!(granted);
		assert_eq!(overwrite.allow, Permissions::VIEW_CHANNEL);
		assert_eq!(overwrite.deny, Permissions::empty());
		assert!(matches!(overwrite.kind, PermissionOverwriteType::Member(id) if id == USER));
	}

	#[test]
	fn other_members_overwrites_are_ignored() {
		let other = PermissionOverwrite {
			allow: Permissions::VIEW_CHANNEL,
			deny: Permissions::empty(),
			kind: PermissionOverwriteType::Member(UserId::new(7)),
		};

		assert!(member_overwrite(vec![other], USER).is_none());
	}

	#[test]
	fn notices_render_with_translations() {
		let translations = crate::translation::tests::english();

		let text = Notice::RoleAdded {
			role: RoleId::new(111),
			removed: vec![RoleId::new(222)],
		}
		.render(&translations);

		assert!(text.contains("<@&111>"));
		assert!(text.contains("<@&222>"));
		assert!(Notice::InvalidAction
			.render(&translations)
			.to_lowercase()
			.contains("invalid"));
	}

	#[tokio::test]
	async fn set_member_read_keeps_other_bits() {
		let existing = PermissionOverwrite {
			allow: Permissions::SEND_MESSAGES,
			deny: Permissions::VIEW_CHANNEL,
			kind: PermissionOverwriteType::Member(USER),
		};
		let guild = FakeGuild::with_channel(555, vec![existing]);

		assert!(set_member_read(&guild, ChannelId::new(555), USER, true)
			.await
			.unwrap());

		let overwrite = guild.overwrite_of(555, USER).unwrap();
		assert_eq!(
			overwrite.allow,
			Permissions::SEND_MESSAGES | Permissions::VIEW_CHANNEL
		);
		assert_eq!(overwrite.deny, Permissions::empty());
	}

	#[tokio::test]
	async fn set_member_read_on_missing_channel_does_nothing() {
		let guild = FakeGuild::default();

		assert!(!set_member_read(&guild, ChannelId::new(555), USER, false)
			.await
			.unwrap());
		assert!(guild.mutations().is_empty());
	}
}
