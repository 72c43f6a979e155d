//! Buttons described by the definition files

use crate::{
	definitions::{definition_key, resolve_action},
	states::{InteractionResult, MessageComponentContext},
	toggle::{DiscordGuild, ToggleEngine, ToggleError},
};

/// Apply the action bound to the clicked button and notify the user
#[tracing::instrument(skip_all, fields(caller_id = %ctx.interaction.user.id))]
pub(crate) async fn button(ctx: MessageComponentContext<'_>) -> InteractionResult {
	let Some(guild_id) = ctx.interaction.guild_id else {
		return Ok(());
	};

	let button_id = ctx.interaction.data.custom_id.as_str();
	let key = definition_key(button_id);

	let action = match resolve_action(&ctx.data.definitions, key, button_id) {
		Ok(Some(action)) => action,
		Ok(None) => {
			tracing::debug!(button_id, "no action defined for button");
			return Ok(());
		}
		Err(error) => {
			tracing::warn!(error = %error, "definitions unavailable");
			return Ok(());
		}
	};

	tracing::debug!(action = ?action, group = action.group(), "resolved button action");

	let reason = format!("Button `{button_id}`");
	let guild = DiscordGuild::new(&ctx.discord.http, guild_id, &reason);
	let engine = ToggleEngine::new(&guild, &ctx.data.definitions);

	match engine.apply(ctx.interaction.user.id, key, &action).await {
		Ok(Some(notice)) => ctx.shout(notice.render(&ctx)).await?,
		Ok(None) => {}
		Err(ToggleError::Definitions(error)) => {
			tracing::warn!(error = %error, "definitions unavailable");
		}
		Err(ToggleError::Serenity(error)) => return Err(error.into()),
	}

	Ok(())
}
