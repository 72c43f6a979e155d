//! Handles all the states of the bot and initial configuration

use crate::{
	constants::expiry::{MAX_INTERVAL_HOURS, MAX_WARNING_DAYS},
	definitions::FolderDefinitions, polyfill, status::StatusProbe, translation::Translations,
};
use anyhow::{anyhow, Context as _};
use dotenvy::dotenv;
use poise::{
	async_trait, send_application_reply,
	serenity_prelude::{self as serenity, ChannelId, EmojiId, GuildId, MessageId, RoleId},
	CreateReply, ReplyHandle,
};
use secrecy::SecretString;
use serde::Deserialize;
use std::{
	env::{self, VarError},
	fmt, fs, io,
	path::PathBuf,
	str::FromStr,
	sync::Arc,
	time::Duration,
};
use unic_langid::LanguageIdentifier;

/// A channel whose read access is toggled by reacting to a message
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ManagedChannel {
	/// The channel shown or hidden
	pub(crate) channel_id: ChannelId,
	/// The channel of the message to react to
	pub(crate) reaction_channel: ChannelId,
	/// The message to react to
	pub(crate) reaction_message: MessageId,
	/// The unicode emoji to react with
	pub(crate) reaction_emoji: String,
}

/// Why an optional feature is turned off
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub(crate) enum FeatureUnavailable {
	/// Explicitly disabled
	#[error("disabled by {0}")]
	Disabled(&'static str),
	/// A required variable is not set
	#[error("{0} is not set")]
	Missing(&'static str),
	/// A required variable does not parse
	#[error("{0} is not valid")]
	Invalid(&'static str),
}

/// Configuration of the up/down-vote reactions
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct VoteConfig {
	/// The guild the vote channel belongs to
	pub(crate) guild_id: GuildId,
	/// The channel whose messages are voted on
	pub(crate) channel_id: ChannelId,
	/// Custom emoji used to upvote
	pub(crate) upvote: EmojiId,
	/// Custom emoji used to downvote
	pub(crate) downvote: EmojiId,
}

impl VoteConfig {
	/// Read the vote configuration through `lookup`, usually the environment
	pub(crate) fn from_lookup(
		lookup: impl Fn(&str) -> Option<String>,
	) -> Result<Self, FeatureUnavailable> {
		let disabled = lookup("VOTE_DISABLED")
			.map(|value| matches!(value.trim(), "1" | "true" | "yes"))
			.unwrap_or(false);
		if disabled {
			return Err(FeatureUnavailable::Disabled("VOTE_DISABLED"));
		}

		let id = |name: &'static str| -> Result<u64, FeatureUnavailable> {
			lookup(name)
				.ok_or(FeatureUnavailable::Missing(name))?
				.trim()
				.parse::<u64>()
				.ok()
				.filter(|id| *id != 0)
				.ok_or(FeatureUnavailable::Invalid(name))
		};

		Ok(Self {
			guild_id: GuildId::new(id("VOTE_GUILD_ID")?),
			channel_id: ChannelId::new(id("VOTE_CHANNEL_ID")?),
			upvote: EmojiId::new(id("VOTE_UPVOTE_EMOJI_ID")?),
			downvote: EmojiId::new(id("VOTE_DOWNVOTE_EMOJI_ID")?),
		})
	}
}

/// Configuration of the domain expiry job
#[derive(Debug, Clone)]
pub(crate) struct ExpiryConfig {
	/// Domains to watch
	pub(crate) domains: Vec<String>,
	/// Domains expiring within this window are reported
	pub(crate) warning_window: chrono::Duration,
	/// Time between two checks
	pub(crate) interval: Duration,
}

impl ExpiryConfig {
	/// Validate the job settings, `domains` is a comma separated list
	pub(crate) fn new(domains: &str, warning_days: i64, interval_hours: u64) -> anyhow::Result<Self> {
		let warning_window = Some(warning_days)
			.filter(|days| (0..=MAX_WARNING_DAYS).contains(days))
			.and_then(chrono::TimeDelta::try_days)
			.ok_or_else(|| {
				anyhow!("EXPIRY_WARNING_DAYS must be between 0 and {MAX_WARNING_DAYS}")
			})?;

		let interval = Some(interval_hours)
			.filter(|hours| (1..=MAX_INTERVAL_HOURS).contains(hours))
			.and_then(|hours| hours.checked_mul(60 * 60))
			.map(Duration::from_secs)
			.ok_or_else(|| {
				anyhow!("EXPIRY_INTERVAL_HOURS must be between 1 and {MAX_INTERVAL_HOURS}")
			})?;

		Ok(Self {
			domains: domains
				.split(',')
				.map(str::trim)
				.filter(|domain| !domain.is_empty())
				.map(str::to_lowercase)
				.collect(),
			warning_window,
			interval,
		})
	}
}

/// App global configuration
#[derive(Debug)]
pub(crate) struct Config {
	/// The token needed to access the `Discord` Api
	pub(crate) discord_token: SecretString,
	/// The guild commands are registered in and the expiry job reports to
	pub(crate) discord_guild: GuildId,

	/// The folder holding buttons definitions
	pub(crate) definitions_folder: PathBuf,
	/// Channels toggled by emoji reactions
	pub(crate) managed_channels: Vec<ManagedChannel>,
	/// A role members must hold to use the emoji reactions
	pub(crate) prerequisite_role: Option<RoleId>,
	/// The role mentioned when a member is reported
	pub(crate) moderator_role: Option<RoleId>,

	/// Up/down-vote reactions, or why they are off
	pub(crate) votes: Result<VoteConfig, FeatureUnavailable>,
	/// The domain expiry job settings
	pub(crate) expiry: ExpiryConfig,
	/// The two websites polled by "is it down?", or why it is off
	pub(crate) status_probes: Result<[StatusProbe; 2], FeatureUnavailable>,

	/// The default locale to use
	pub(crate) default_locale: LanguageIdentifier,
	/// Whether or not to use production defaults
	///
	/// Currently only affects logging
	pub(crate) production: bool,
}

/// Resolve an environment variable or return an appropriate error
fn required_env_var(name: &str) -> anyhow::Result<String> {
	match env::var(name) {
		Ok(val) => Ok(val),
		Err(VarError::NotPresent) => Err(anyhow!("{} must be set in the environnement", name)),
		Err(VarError::NotUnicode(_)) => {
			Err(anyhow!("{} does not contains Unicode valid text", name))
		}
	}
}

/// Resolve an optional environment variable, empty values count as unset
fn optional_env_var(name: &str) -> anyhow::Result<Option<String>> {
	match env::var(name) {
		Ok(val) if val.trim().is_empty() => Ok(None),
		Ok(val) => Ok(Some(val)),
		Err(VarError::NotPresent) => Ok(None),
		Err(VarError::NotUnicode(_)) => {
			Err(anyhow!("{} does not contains Unicode valid text", name))
		}
	}
}

/// Parse an optional environment variable, using `default` when unset
fn parse_env_var<T: FromStr>(name: &str, default: T) -> anyhow::Result<T> {
	optional_env_var(name)?.map_or(Ok(default), |val| {
		val.trim().parse::<T>().map_err(|_| {
			anyhow!(
				"{} environnement variable must be a `{}`",
				name,
				std::any::type_name::<T>()
			)
		})
	})
}

/// Parse an optional role id environment variable
fn role_env_var(name: &str) -> anyhow::Result<Option<RoleId>> {
	Ok(optional_env_var(name)?
		.map(|val| {
			val.trim()
				.parse::<u64>()
				.ok()
				.filter(|id| *id != 0)
				.ok_or_else(|| anyhow!("{} environnement variable must be a role id", name))
		})
		.transpose()?
		.map(RoleId::new))
}

/// Load the managed channels list, a missing file means no managed channels
fn load_managed_channels(path: &str) -> anyhow::Result<Vec<ManagedChannel>> {
	match fs::read_to_string(path) {
		Ok(text) => serde_json::from_str(&text)
			.with_context(|| format!("failed to parse managed channels file `{path}`")),
		Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
		Err(error) => Err(error).with_context(|| format!("failed to read `{path}`")),
	}
}

impl Config {
	/// Parse the config from the environment and the optional `.env` file
	fn from_dotenv() -> anyhow::Result<Self> {
		// The environment may be provided by other means
		let _ = dotenv();

		let discord_guild = required_env_var("DISCORD_GUILD")?
			.parse::<u64>()
			.ok()
			.filter(|id| *id != 0)
			.ok_or_else(|| anyhow!("DISCORD_GUILD environnement variable must be a `u64`"))?;

		let production = parse_env_var("PRODUCTION", false)?;

		let default_locale = optional_env_var("DEFAULT_LOCALE")?
			.unwrap_or_else(|| "en-US".into())
			.parse::<LanguageIdentifier>()
			.map_err(|_| {
				anyhow!("DEFAULT_LOCALE environnement variable must be a `LanguageIdentifier`")
			})?;

		let managed_channels = load_managed_channels(
			&optional_env_var("MANAGED_CHANNELS_FILE")?.unwrap_or_else(|| "channels.json".into()),
		)?;

		let expiry = ExpiryConfig::new(
			optional_env_var("EXPIRY_DOMAINS")?.as_deref().unwrap_or_default(),
			parse_env_var("EXPIRY_WARNING_DAYS", 30)?,
			parse_env_var("EXPIRY_INTERVAL_HOURS", 24)?,
		)?;

		let status_probes = match optional_env_var("STATUS_PROBES")? {
			Some(probes) => StatusProbe::parse_pair(&probes)
				.map_err(|_| FeatureUnavailable::Invalid("STATUS_PROBES")),
			None => Err(FeatureUnavailable::Missing("STATUS_PROBES")),
		};

		Ok(Self {
			discord_token: SecretString::from(required_env_var("DISCORD_TOKEN")?),
			discord_guild: GuildId::new(discord_guild),

			definitions_folder: optional_env_var("DEFINITIONS_FOLDER")?
				.unwrap_or_else(|| "definitions".into())
				.into(),
			managed_channels,
			prerequisite_role: role_env_var("PREREQUISITE_ROLE_ID")?,
			moderator_role: role_env_var("MODERATOR_ROLE_ID")?,

			votes: VoteConfig::from_lookup(|name| env::var(name).ok()),
			expiry,
			status_probes,

			default_locale,
			production,
		})
	}
}

/// App global data
pub(crate) struct Data {
	/// An instance of the parsed initial config
	pub(crate) config: Config,
	/// The translations for the client
	pub(crate) translations: Translations,
	/// The buttons definitions
	pub(crate) definitions: FolderDefinitions,
	/// A client to poll websites
	pub(crate) http: reqwest::Client,
}

impl fmt::Debug for Data {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Data")
			.field("config", &&self.config)
			.field("translations", &&self.translations)
			.field("definitions", &&self.definitions)
			.finish_non_exhaustive()
	}
}

impl Data {
	/// Parse the bot data from the environment
	pub(crate) fn new() -> anyhow::Result<Self> {
		let config = Config::from_dotenv()?;

		let translations = Translations::from_folder("translations", config.default_locale.clone())
			.context("failed to load translations")?;

		let http = reqwest::Client::builder()
			.timeout(crate::constants::status::PROBE_TIMEOUT)
			.build()
			.context("failed to build http client")?;

		Ok(Self {
			definitions: FolderDefinitions::new(&config.definitions_folder),
			config,
			translations,
			http,
		})
	}
}

/// A reply visible to the whole channel
pub(crate) fn announcement(content: impl Into<String>) -> CreateReply {
	CreateReply::default().content(content).ephemeral(false)
}

/// Trait for replying to slash commands
#[async_trait]
pub(crate) trait ApplicationContextPolyfill<'a>: Send + Sync {
	/// Send an ephemeral message to the user
	async fn shout(
		&self,
		content: impl Into<String> + Send,
	) -> Result<ReplyHandle<'_>, serenity::Error>;

	/// Send a message everyone in the channel can see
	async fn announce(
		&self,
		content: impl Into<String> + Send,
	) -> Result<ReplyHandle<'_>, serenity::Error>;

	/// Get a [`GuildId`] in a `guild_only` interaction context
	///
	/// # Panics
	/// If used in a non `guild_only` interaction context
	fn guild_only_id(&self) -> GuildId;
}

#[async_trait]
impl<'a> ApplicationContextPolyfill<'a> for ApplicationContext<'a> {
	#[inline]
	async fn shout(
		&self,
		content: impl Into<String> + Send,
	) -> Result<ReplyHandle<'_>, serenity::Error> {
		send_application_reply(
			*self,
			CreateReply::default().content(content).ephemeral(true),
		)
		.await
	}

	#[inline]
	async fn announce(
		&self,
		content: impl Into<String> + Send,
	) -> Result<ReplyHandle<'_>, serenity::Error> {
		send_application_reply(*self, announcement(content)).await
	}

	#[inline]
	fn guild_only_id(&self) -> GuildId {
		if self.command.guild_only {
			self.interaction.guild_id.expect("guild_only interactions")
		} else {
			panic!("Should be used only in guild_only interactions")
		}
	}
}

/// Trait for sending ephemeral messages
#[async_trait]
pub(crate) trait ContextPolyfill: Send + Sync {
	/// Send an ephemeral message to the user
	async fn shout(
		&self,
		content: impl Into<String> + Send,
	) -> Result<ReplyHandle<'_>, serenity::Error>;
}

#[async_trait]
impl ContextPolyfill for Context<'_> {
	#[inline]
	async fn shout(
		&self,
		content: impl Into<String> + Send,
	) -> Result<ReplyHandle<'_>, serenity::Error> {
		self.send(CreateReply::default().content(content).ephemeral(true))
			.await
	}
}

/// Common wrapper for the [`Data`]
pub(crate) type ArcData = Arc<Data>;
/// Common interaction or event error type
pub(crate) type InteractionError = Error;
/// Common interaction or event return type
pub(crate) type InteractionResult = Result<(), InteractionError>;

/// A [`poise::Command`] type alias with our common types
pub(crate) type Command = poise::Command<ArcData, InteractionError>;
/// A [`poise::Context`] type alias with our common types, provided to each command
pub(crate) type Context<'a> = poise::Context<'a, ArcData, InteractionError>;
/// A [`poise::ApplicationContext`] type alias with our common types, provided to each command, provided to each slash command
pub(crate) type ApplicationContext<'a> = poise::ApplicationContext<'a, ArcData, InteractionError>;
/// A [`polyfill::MessageComponentContext`] type alias with our common types, provided to each message component interaction
pub(crate) type MessageComponentContext<'a> = polyfill::MessageComponentContext<'a, ArcData>;

/// A [`poise::Framework`] type alias with our common types
pub(crate) type Framework = poise::Framework<ArcData, InteractionError>;
/// A [`poise::FrameworkContext`] type alias with our common types
pub(crate) type FrameworkContext<'a> = poise::FrameworkContext<'a, ArcData, InteractionError>;
/// A [`poise::FrameworkError`] type alias with our common types
pub(crate) type FrameworkError<'a> = poise::FrameworkError<'a, ArcData, InteractionError>;

/// An error in an interaction or an event
#[derive(Debug, thiserror::Error)]
pub(crate) enum Error {
	/// A serenity error
	#[error(transparent)]
	Serenity(#[from] serenity::Error),
	/// Collects any other general purpose error
	#[error(transparent)]
	Other(#[from] anyhow::Error),
}
