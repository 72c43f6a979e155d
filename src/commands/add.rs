//! Let a member into a managed channel

use crate::{
	states::{
		ApplicationContext, ApplicationContextPolyfill, Context, InteractionError,
		InteractionResult, ManagedChannel,
	},
	toggle::{set_member_read, DiscordGuild},
	translation::Translate,
};
use poise::{
	command,
	serenity_prelude::{ChannelId, Member},
};

/// Whether `channel` is one of the channels toggled by reactions
pub(super) fn is_managed(managed: &[ManagedChannel], channel: ChannelId) -> bool {
	managed.iter().any(|managed| managed.channel_id == channel)
}

/// Only run in a managed channel
async fn in_managed_channel(ctx: Context<'_>) -> Result<bool, InteractionError> {
	Ok(is_managed(
		&ctx.data().config.managed_channels,
		ctx.channel_id(),
	))
}

/// Give a member read access to the current channel
#[command(
	slash_command,
	guild_only,
	default_member_permissions = "MANAGE_CHANNELS",
	required_permissions = "MANAGE_CHANNELS",
	required_bot_permissions = "MANAGE_ROLES",
	check = "in_managed_channel"
)]
#[tracing::instrument(skip_all, fields(caller_id = %ctx.interaction.user.id, member_id = %member.user.id))]
pub(crate) async fn add(ctx: ApplicationContext<'_>, member: Member) -> InteractionResult {
	let guild_id = ctx.guild_only_id();
	let channel_id = ctx.interaction.channel_id;

	let reason = format!(
		"Added by {} in https://discord.com/channels/{guild_id}/{channel_id}",
		ctx.interaction.user.name
	);
	let guild = DiscordGuild::new(&ctx.serenity_context.http, guild_id, &reason);

	if !set_member_read(&guild, channel_id, member.user.id, true).await? {
		tracing::debug!(channel_id = channel_id.get(), "channel is not in the guild");
		return Ok(());
	}

	ctx.announce(ctx.translate("done", None)).await?;

	Ok(())
}
