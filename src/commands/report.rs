//! Quarantine a member and alert the moderators

use crate::{
	constants::QUARANTINE_ROLE_NAME,
	states::{ApplicationContext, ApplicationContextPolyfill, InteractionResult},
	toggle::{set_member_read, DiscordGuild},
	translation::Translate,
};
use fluent::fluent_args;
use poise::{
	command,
	serenity_prelude::{EditMember, Member, Mentionable, RoleId},
};

/// Find the quarantine role by name
fn quarantine_role<'a>(roles: impl IntoIterator<Item = (RoleId, &'a str)>) -> Option<RoleId> {
	roles
		.into_iter()
		.find(|(_, name)| *name == QUARANTINE_ROLE_NAME)
		.map(|(id, _)| id)
}

/// Hide the current channel from a member and replace their roles with the quarantine one
#[command(
	slash_command,
	guild_only,
	default_member_permissions = "MANAGE_CHANNELS",
	required_permissions = "MANAGE_CHANNELS",
	required_bot_permissions = "MANAGE_ROLES"
)]
#[tracing::instrument(skip_all, fields(caller_id = %ctx.interaction.user.id, member_id = %member.user.id))]
pub(crate) async fn report(ctx: ApplicationContext<'_>, member: Member) -> InteractionResult {
	let guild_id = ctx.guild_only_id();

	let roles = guild_id.roles(ctx.serenity_context).await?;
	let Some(quarantine) = quarantine_role(
		roles
			.values()
			.map(|role| (role.id, role.name.as_str())),
	) else {
		ctx.shout(ctx.translate("report-no-quarantine-role", None))
			.await?;

		return Ok(());
	};

	let author = ctx.interaction.user.mention().to_string();
	let reason = ctx.translate(
		"report-reason",
		Some(fluent_args!["author" => ctx.interaction.user.name.as_str()]),
	);
	let guild = DiscordGuild::new(&ctx.serenity_context.http, guild_id, &reason);

	set_member_read(&guild, ctx.interaction.channel_id, member.user.id, false).await?;

	guild_id
		.edit_member(
			ctx.serenity_context,
			member.user.id,
			EditMember::new()
				.roles([quarantine])
				.audit_log_reason(&reason),
		)
		.await?;

	tracing::info!(
		member_id = member.user.id.get(),
		"member moved to quarantine",
	);

	let member = member.mention().to_string();
	let content = match ctx.data.config.moderator_role {
		Some(moderators) => ctx.translate(
			"report-success-with-moderators",
			Some(fluent_args![
				"member" => member,
				"author" => author,
				"moderators" => moderators.mention().to_string()
			]),
		),
		None => ctx.translate(
			"report-success",
			Some(fluent_args!["member" => member, "author" => author]),
		),
	};

	ctx.announce(content).await?;

	Ok(())
}
