//! `Discord` client events handlers

use crate::{
	commands::helpers::register_,
	states::{ArcData, FrameworkContext, InteractionResult, MessageComponentContext},
};
use anyhow::Context;
use poise::{
	serenity_prelude::{self, ComponentInteractionDataKind, FullEvent, Interaction},
	BoxFuture,
};
use std::sync::atomic::AtomicBool;

mod buttons;
mod messages;
mod reactions;

/// Serenity listener to react to `Discord` events
pub(crate) async fn event_handler(
	ctx: &serenity_prelude::Context,
	event: &FullEvent,
	framework: FrameworkContext<'_>,
	data: &ArcData,
) -> InteractionResult {
	match event {
		FullEvent::Ready { data_about_bot } => {
			register_(
				&ctx.http,
				&data.config.discord_guild,
				&framework.options.commands,
			)
			.await
			.context("Could not register guild commands")?;

			tracing::info!("`{}` is ready!", data_about_bot.user.name);

			Ok(())
		}

		FullEvent::InteractionCreate {
			interaction: Interaction::Component(interaction),
		} => {
			let ctx = MessageComponentContext {
				interaction,
				data,
				discord: ctx,
				has_sent_initial_response: &AtomicBool::new(false),
			};

			tracing::info!(
				user_id = ctx.interaction.user.id.get(),
				custom_id = ctx.interaction.data.custom_id,
				"`{}` interacted with a component",
				ctx.interaction.user.name,
			);

			match interaction.data.kind {
				ComponentInteractionDataKind::Button => buttons::button(ctx).await,
				_ => Ok(()),
			}
		}

		FullEvent::ReactionAdd { add_reaction } => {
			reactions::reaction_add(ctx, data, add_reaction).await
		}

		FullEvent::Message { new_message } => {
			if new_message.author.bot {
				return Ok(());
			}

			let features: [BoxFuture<'_, InteractionResult>; 2] = [
				Box::pin(messages::vote(ctx, data, new_message)),
				Box::pin(messages::status(ctx, data, new_message)),
			];

			messages::run_all(features).await
		}

		_ => {
			tracing::trace!(event = ?event, "missed event");

			Ok(())
		}
	}
}
