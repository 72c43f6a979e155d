//! `Discord` client commands

use crate::{
	states::{Context, ContextPolyfill, FrameworkError, InteractionError},
	translation::Translate,
};
use anyhow::Context as _;
use fluent::fluent_args;
use poise::{serenity_prelude, BoxFuture};
use uuid::Uuid;

mod add;
mod report;

pub(crate) use add::add;
pub(crate) use report::report;
pub(crate) mod helpers;

/// Execute before each command
pub(crate) fn pre_command(ctx: Context) -> BoxFuture<()> {
	Box::pin(async move {
		tracing::info!(
			user_id = ctx.author().id.get(),
			username = &ctx.author().name,
			command_id = ctx.command().identifying_name,
			"Command invocation",
		);
	})
}

/// Execute on a error during code execution
pub(crate) fn command_on_error(error: FrameworkError) -> BoxFuture<()> {
	Box::pin(async move {
		let error = match error {
			FrameworkError::Command { error, ctx, .. } => handle_interaction_error(ctx, error)
				.await
				.context("failed to send error message"),

			FrameworkError::EventHandler { error, event, .. } => {
				tracing::error!(
					error = ?error,
					event = ?event,
					"event handler",
				);

				Ok(())
			}

			FrameworkError::CommandCheckFailed { ctx, error, .. } => match error {
				Some(error) => handle_interaction_error(ctx, error)
					.await
					.context("failed to send error message"),
				None => {
					tracing::warn!(
						user_id = ctx.author().id.get(),
						channel_id = ctx.channel_id().get(),
						command_id = ctx.command().identifying_name,
						"permission check failure",
					);

					Ok(())
				}
			},

			FrameworkError::MissingBotPermissions {
				ctx,
				missing_permissions,
				..
			} => ctx
				.shout(ctx.translate(
					"error-bot-missing-permissions",
					Some(fluent_args!["permissions" => missing_permissions.to_string()]),
				))
				.await
				.map(|_| ())
				.context("Failed to send missing bot permissions message"),

			FrameworkError::MissingUserPermissions {
				ctx,
				missing_permissions,
				..
			} => {
				tracing::warn!(
					user_id = ctx.author().id.get(),
					missing_permissions = ?missing_permissions,
					command_id = ctx.command().identifying_name,
					"permission check failure",
				);

				Ok(())
			}

			FrameworkError::GuildOnly { ctx, .. } => ctx
				.shout(ctx.translate("error-guild-only", None))
				.await
				.map(|_| ())
				.context("Failed to send guild only message"),

			error => {
				tracing::error!(error = ?error, "framework");

				Ok(())
			}
		};

		if let Err(error) = error {
			tracing::error!(error = ?error);
		}
	})
}

/// Execute after every successful command
pub(crate) fn post_command(ctx: Context) -> BoxFuture<()> {
	Box::pin(async move {
		tracing::debug!(
			user_id = ctx.author().id.get(),
			username = &ctx.author().name,
			command_id = ctx.command().identifying_name,
			"Command invocation successful",
		);
	})
}

/// Handle our custom command interaction error
async fn handle_interaction_error(
	ctx: Context<'_>,
	error: InteractionError,
) -> serenity_prelude::Result<()> {
	let error_identifier = Uuid::new_v4().hyphenated().to_string();

	tracing::error!(
		user_id = ctx.author().id.get(),
		username = ctx.author().name,
		error_id = error_identifier,
		error = ?error,
		command_id = ctx.command().identifying_name,
		"interaction body or check",
	);

	ctx.shout(ctx.translate(
		"error-internal-with-id",
		Some(fluent_args!["id" => error_identifier]),
	))
	.await?;

	Ok(())
}
