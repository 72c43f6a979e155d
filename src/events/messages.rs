//! Features triggered by plain guild messages

use crate::{
	states::{ArcData, InteractionResult, VoteConfig},
	status,
	translation::Translate,
};
use fluent::fluent_args;
use poise::{
	serenity_prelude::{self as serenity, ChannelId, GuildId, Message, ReactionType},
	BoxFuture,
};

impl VoteConfig {
	/// Whether messages posted there get voted on
	fn watches(&self, guild_id: Option<GuildId>, channel_id: ChannelId) -> bool {
		guild_id == Some(self.guild_id) && channel_id == self.channel_id
	}

	/// The reactions added to a watched message, in order
	fn reactions(&self) -> [ReactionType; 2] {
		[(self.upvote, "upvote"), (self.downvote, "downvote")].map(|(id, name)| {
			ReactionType::Custom {
				animated: false,
				id,
				name: Some(name.into()),
			}
		})
	}
}

/// Add the up and down vote reactions to messages of the vote channel
#[tracing::instrument(skip_all, fields(message_id = %message.id))]
pub(crate) async fn vote(
	ctx: &serenity::Context,
	data: &ArcData,
	message: &Message,
) -> InteractionResult {
	let Ok(votes) = &data.config.votes else {
		return Ok(());
	};

	if !votes.watches(message.guild_id, message.channel_id) {
		return Ok(());
	}

	for reaction in votes.reactions() {
		message.react(ctx, reaction).await?;
	}

	Ok(())
}

/// Answer "is it down?" with the state of the two probed websites
#[tracing::instrument(skip_all, fields(message_id = %message.id))]
pub(crate) async fn status(
	ctx: &serenity::Context,
	data: &ArcData,
	message: &Message,
) -> InteractionResult {
	let Ok(probes) = &data.config.status_probes else {
		return Ok(());
	};

	if message.guild_id.is_none() || !status::is_status_query(&message.content, probes) {
		return Ok(());
	}

	tracing::info!(
		user_id = message.author.id.get(),
		"`{}` asked whether it is down",
		message.author.name,
	);

	let checked = match message.channel_id.broadcast_typing(&ctx.http).await {
		Ok(()) => Ok(status::check(&data.http, probes, &data.translations).await),
		Err(error) => Err(error),
	};

	message
		.channel_id
		.say(ctx, status_reply(checked, &data.translations))
		.await?;

	Ok(())
}

/// The status answer, or the error that interrupted the check echoed verbatim
fn status_reply(checked: Result<String, serenity::Error>, translator: &impl Translate) -> String {
	checked.unwrap_or_else(|error| {
		tracing::warn!(error = ?error, "status check interrupted");

		translator.translate(
			"status-error",
			Some(fluent_args!["error" => error.to_string()]),
		)
	})
}

/// Run every message feature, a failing one does not stop the others
///
/// The first error is returned, the following ones are logged.
pub(crate) async fn run_all<const N: usize>(
	features: [BoxFuture<'_, InteractionResult>; N],
) -> InteractionResult {
	let mut outcome = Ok(());

	for feature in features {
		if let Err(error) = feature.await {
			if outcome.is_ok() {
				outcome = Err(error);
			} else {
				tracing::error!(error = ?error, "message feature failed");
			}
		}
	}

	outcome
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::states::Error;
	use poise::serenity_prelude::EmojiId;
	use std::sync::atomic::{AtomicBool, Ordering};

	fn votes() -> VoteConfig {
		VoteConfig {
			guild_id: GuildId::new(1),
			channel_id: ChannelId::new(2),
			upvote: EmojiId::new(3),
			downvote: EmojiId::new(4),
		}
	}

	#[test]
	fn upvote_comes_first() {
		let [first, second] = votes().reactions();

		assert!(matches!(
			first,
			ReactionType::Custom { id, name: Some(ref name), .. }
				if id == EmojiId::new(3) && name == "upvote"
		));
		assert!(matches!(
			second,
			ReactionType::Custom { id, .. } if id == EmojiId::new(4)
		));
	}

	#[test]
	fn watches_only_the_vote_channel() {
		let votes = votes();

		assert!(votes.watches(Some(GuildId::new(1)), ChannelId::new(2)));
		assert!(!votes.watches(Some(GuildId::new(1)), ChannelId::new(5)));
		assert!(!votes.watches(Some(GuildId::new(7)), ChannelId::new(2)));
		assert!(!votes.watches(None, ChannelId::new(2)));
	}

	#[test]
	fn interrupted_check_is_echoed_verbatim() {
		let translations = crate::translation::tests::english();

		let reply = status_reply(
			Err(serenity::Error::Other("Missing Access")),
			&translations,
		);

		assert!(reply.contains("Missing Access"));
		assert_eq!(
			status_reply(Ok("Website is up.".into()), &translations),
			"Website is up."
		);
	}

	#[tokio::test]
	async fn failing_feature_does_not_stop_the_next_one() {
		let ran = AtomicBool::new(false);

		let features: [BoxFuture<'_, InteractionResult>; 2] = [
			Box::pin(async { Err(Error::Other(anyhow::anyhow!("reaction refused"))) }),
			Box::pin(async {
				ran.store(true, Ordering::SeqCst);
				Ok(())
			}),
		];

		let outcome = run_all(features).await;

		assert!(ran.load(Ordering::SeqCst));
		assert!(matches!(outcome, Err(Error::Other(_))));
	}
}
