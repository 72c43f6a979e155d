//! Access to the guild roles and channels the toggle engine mutates

use poise::{
	async_trait,
	serenity_prelude::{
		self as serenity, ChannelId, EditMember, GuildId, Http, PermissionOverwrite, RoleId,
		UserId,
	},
};

/// The guild state the toggle engine reads and mutates
#[async_trait]
pub(crate) trait GuildAccess: Send + Sync {
	/// Whether the role exists in the guild
	async fn role_exists(&self, role: RoleId) -> Result<bool, serenity::Error>;

	/// The roles currently held by a member
	async fn member_roles(&self, user: UserId) -> Result<Vec<RoleId>, serenity::Error>;

	/// Give a role to a member
	async fn add_role(&self, user: UserId, role: RoleId) -> Result<(), serenity::Error>;

	/// Take several roles from a member in a single edit
	async fn remove_roles(&self, user: UserId, roles: &[RoleId]) -> Result<(), serenity::Error>;

	/// The permission overwrites of a channel, `None` if the channel is not in the guild
	async fn channel_overwrites(
		&self,
		channel: ChannelId,
	) -> Result<Option<Vec<PermissionOverwrite>>, serenity::Error>;

	/// Create or replace a permission overwrite
	async fn set_overwrite(
		&self,
		channel: ChannelId,
		overwrite: PermissionOverwrite,
	) -> Result<(), serenity::Error>;
}

/// [`GuildAccess`] backed by the `Discord` HTTP API
pub(crate) struct DiscordGuild<'a> {
	/// The HTTP client
	http: &'a Http,
	/// The guild mutated
	guild_id: GuildId,
	/// Audit log reason attached to the mutations
	reason: &'a str,
}

impl<'a> DiscordGuild<'a> {
	/// Wrap a guild
	pub(crate) const fn new(http: &'a Http, guild_id: GuildId, reason: &'a str) -> Self {
		Self {
			http,
			guild_id,
			reason,
		}
	}
}

#[async_trait]
impl GuildAccess for DiscordGuild<'_> {
	async fn role_exists(&self, role: RoleId) -> Result<bool, serenity::Error> {
		Ok(self.guild_id.roles(self.http).await?.contains_key(&role))
	}

	async fn member_roles(&self, user: UserId) -> Result<Vec<RoleId>, serenity::Error> {
		Ok(self.guild_id.member(self.http, user).await?.roles)
	}

	async fn add_role(&self, user: UserId, role: RoleId) -> Result<(), serenity::Error> {
		self.http
			.add_member_role(self.guild_id, user, role, Some(self.reason))
			.await
	}

	async fn remove_roles(&self, user: UserId, roles: &[RoleId]) -> Result<(), serenity::Error> {
		let remaining: Vec<RoleId> = self
			.member_roles(user)
			.await?
			.into_iter()
			.filter(|role| !roles.contains(role))
			.collect();

		self.guild_id
			.edit_member(
				self.http,
				user,
				EditMember::new()
					.roles(remaining)
					.audit_log_reason(self.reason),
			)
			.await?;

		Ok(())
	}

	async fn channel_overwrites(
		&self,
		channel: ChannelId,
	) -> Result<Option<Vec<PermissionOverwrite>>, serenity::Error> {
		Ok(self
			.guild_id
			.channels(self.http)
			.await?
			.remove(&channel)
			.map(|channel| channel.permission_overwrites))
	}

	async fn set_overwrite(
		&self,
		channel: ChannelId,
		overwrite: PermissionOverwrite,
	) -> Result<(), serenity::Error> {
		channel.create_permission(self.http, overwrite).await
	}
}
