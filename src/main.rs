//! Society community Discord bot

mod actions;
mod commands;
mod constants;
mod definitions;
mod events;
mod expiry;
mod logging;
mod polyfill;
mod states;
mod status;
mod toggle;
mod translation;

use crate::{
	commands::{command_on_error, post_command, pre_command},
	events::event_handler,
	logging::setup_logging,
	states::{ArcData, Data, Framework},
};
use anyhow::anyhow;
use poise::serenity_prelude::{ClientBuilder, GatewayIntents};
use secrecy::ExposeSecret;
use std::sync::Arc;
use tracing::instrument;

/// Build the `poise` [framework](poise::Framework)
#[instrument]
fn build_framework(data: ArcData) -> Framework {
	Framework::builder()
		.setup({
			let data = Arc::clone(&data);
			move |ctx, _ready, _framework| {
				Box::pin(async move {
					let _handle = expiry::spawn(Arc::clone(&ctx.http), Arc::clone(&data));

					Ok(data)
				})
			}
		})
		.options(poise::FrameworkOptions {
			pre_command,
			on_error: command_on_error,
			post_command,
			event_handler: |ctx, event, fw, data| Box::pin(event_handler(ctx, event, fw, data)),
			commands: {
				use commands::{add, report};

				let mut commands = vec![add(), report()];

				data.translations.localize_commands(&mut commands);

				commands
			},
			..Default::default()
		})
		.build()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let data = Arc::new(Data::new()?);

	setup_logging(&data)?;

	if let Err(reason) = &data.config.votes {
		tracing::warn!(%reason, "vote reactions are disabled");
	}
	if let Err(reason) = &data.config.status_probes {
		tracing::warn!(%reason, "status probes are disabled");
	}
	if data.config.managed_channels.is_empty() {
		tracing::info!("no managed channel configured");
	}

	let mut client = ClientBuilder::new(
		data.config.discord_token.expose_secret(),
		GatewayIntents::GUILDS
			| GatewayIntents::GUILD_MEMBERS
			| GatewayIntents::GUILD_MESSAGES
			| GatewayIntents::GUILD_MESSAGE_REACTIONS
			| GatewayIntents::MESSAGE_CONTENT,
	)
	.framework(build_framework(Arc::clone(&data)))
	.await?;

	if let Err(error) = client.start().await {
		return Err(anyhow!("Client exited with error: {}", error));
	}

	Ok(())
}
