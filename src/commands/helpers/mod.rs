//! Act on discord client metadata

use crate::states::Command;
use poise::serenity_prelude::{self as serenity, GuildId, Http};

/// Register the slash commands in the configured guild
pub(crate) async fn register_(
	http: &Http,
	guild_id: &GuildId,
	commands: &[Command],
) -> Result<(), serenity::Error> {
	let mut commands_collector = Vec::new();

	for command in commands {
		if let Some(slash_command) = command.create_as_slash_command() {
			commands_collector.push(slash_command);
		}

		if let Some(context_menu_command) = command.create_as_context_menu_command() {
			commands_collector.push(context_menu_command);
		}
	}

	guild_id.set_commands(http, commands_collector).await?;

	Ok(())
}
