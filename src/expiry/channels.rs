//! Where the domain notifications are posted

use poise::{
	async_trait,
	serenity_prelude::{
		self as serenity, ChannelId, ChannelType, CreateEmbed, CreateMessage, GuildId, Http,
	},
};

/// The guild text channels the notification can be posted in
#[async_trait]
pub(crate) trait NotificationChannels: Send + Sync {
	/// Identifiers and names of the text channels
	async fn text_channels(&self) -> Result<Vec<(ChannelId, String)>, serenity::Error>;

	/// Post an embed in a channel
	async fn post(&self, channel: ChannelId, embed: CreateEmbed) -> Result<(), serenity::Error>;
}

/// [`NotificationChannels`] backed by the `Discord` HTTP API
pub(crate) struct GuildChannels<'a> {
	/// The HTTP client
	http: &'a Http,
	/// The guild posted in
	guild_id: GuildId,
}

impl<'a> GuildChannels<'a> {
	/// Wrap a guild
	pub(crate) const fn new(http: &'a Http, guild_id: GuildId) -> Self {
		Self { http, guild_id }
	}
}

#[async_trait]
impl NotificationChannels for GuildChannels<'_> {
	async fn text_channels(&self) -> Result<Vec<(ChannelId, String)>, serenity::Error> {
		Ok(self
			.guild_id
			.channels(self.http)
			.await?
			.into_values()
			.filter(|channel| channel.kind == ChannelType::Text)
			.map(|channel| (channel.id, channel.name))
			.collect())
	}

	async fn post(&self, channel: ChannelId, embed: CreateEmbed) -> Result<(), serenity::Error> {
		channel
			.send_message(self.http, CreateMessage::new().embed(embed))
			.await?;

		Ok(())
	}
}
