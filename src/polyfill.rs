//! Polyfill for the [`ComponentInteraction`](poise::serenity_prelude::ComponentInteraction) type

use poise::{
	serenity_prelude::{
		self as serenity, ComponentInteraction, CreateInteractionResponseFollowup,
		CreateInteractionResponseMessage,
	},
	CreateReply,
};
use std::sync::atomic::{AtomicBool, Ordering};

/// The [`poise::Context`] like for Message components interactions
pub(crate) struct MessageComponentContext<'a, U: Send + Sync> {
	/// The underlying interaction
	pub(crate) interaction: &'a ComponentInteraction,
	/// The custom user data
	pub(crate) data: &'a U,
	/// The underlying serenity context
	pub(crate) discord: &'a serenity::Context,
	/// Keeps track of whether an initial response has been sent.
	///
	/// Discord requires different HTTP endpoints for initial and additional responses.
	pub(crate) has_sent_initial_response: &'a AtomicBool,
}

impl<U: Send + Sync> MessageComponentContext<'_, U> {
	/// Send a message to the user, as the initial response or as a followup
	pub(crate) async fn send(&self, reply: CreateReply) -> Result<(), serenity::Error> {
		if self.has_sent_initial_response.load(Ordering::SeqCst) {
			self.interaction
				.create_followup(
					self.discord,
					reply.to_slash_followup_response(CreateInteractionResponseFollowup::default()),
				)
				.await?;
		} else {
			self.interaction
				.create_response(
					self.discord,
					serenity::CreateInteractionResponse::Message(
						reply.to_slash_initial_response(CreateInteractionResponseMessage::default()),
					),
				)
				.await?;
			self.has_sent_initial_response
				.store(true, Ordering::SeqCst);
		}

		Ok(())
	}

	/// Send an ephemeral message to the user
	#[inline]
	pub(crate) async fn shout(
		&self,
		content: impl Into<String> + Send,
	) -> Result<(), serenity::Error> {
		self.send(
			CreateReply::default()
				.content(content.into())
				.ephemeral(true),
		)
		.await
	}
}
