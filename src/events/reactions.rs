//! Channels shown or hidden by reacting to a message

use crate::{
	states::{ArcData, InteractionResult, ManagedChannel},
	toggle::{DiscordGuild, ToggleEngine},
};
use poise::serenity_prelude::{self as serenity, ChannelId, MessageId, Reaction, ReactionType};

/// The managed channels toggled by this emoji on this message
pub(crate) fn matching_channels<'a>(
	managed: &'a [ManagedChannel],
	channel_id: ChannelId,
	message_id: MessageId,
	emoji: &'a ReactionType,
) -> impl Iterator<Item = ChannelId> + 'a {
	managed
		.iter()
		.filter(move |managed| {
			managed.reaction_channel == channel_id
				&& managed.reaction_message == message_id
				&& matches!(emoji, ReactionType::Unicode(emoji) if *emoji == managed.reaction_emoji)
		})
		.map(|managed| managed.channel_id)
}

/// Toggle the managed channels matching the reaction and clear it
#[tracing::instrument(skip_all, fields(message_id = %reaction.message_id))]
pub(crate) async fn reaction_add(
	ctx: &serenity::Context,
	data: &ArcData,
	reaction: &Reaction,
) -> InteractionResult {
	let (Some(guild_id), Some(member)) = (reaction.guild_id, &reaction.member) else {
		return Ok(());
	};

	if member.user.bot {
		return Ok(());
	}

	if let Some(prerequisite) = data.config.prerequisite_role {
		if !member.roles.contains(&prerequisite) {
			tracing::debug!(
				user_id = member.user.id.get(),
				"member lacks the prerequisite role"
			);
			return Ok(());
		}
	}

	let channels: Vec<ChannelId> = matching_channels(
		&data.config.managed_channels,
		reaction.channel_id,
		reaction.message_id,
		&reaction.emoji,
	)
	.collect();

	if channels.is_empty() {
		return Ok(());
	}

	let guild = DiscordGuild::new(&ctx.http, guild_id, "Emoji React");
	let engine = ToggleEngine::new(&guild, &data.definitions);

	for channel in channels {
		let notice = engine
			.toggle_channel(member.user.id, channel)
			.await
			.map_err(anyhow::Error::from)?;
		tracing::info!(
			user_id = member.user.id.get(),
			channel_id = channel.get(),
			notice = ?notice,
			"toggled managed channel",
		);
	}

	reaction.delete(ctx).await?;

	Ok(())
}
