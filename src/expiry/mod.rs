//! Recurring check of the society domains expiry dates

use crate::{
	constants::expiry::{
		CRITICAL_COLOUR, NOTIFICATION_TITLE, PREFERRED_CHANNELS, RESTART_COOLDOWN, WARNING_COLOUR,
	},
	states::{ArcData, ExpiryConfig},
	translation::Translate,
};
use chrono::{DateTime, Utc};
use fluent::fluent_args;
use poise::serenity_prelude::{self as serenity, ChannelId, CreateEmbed, Http};
use rand::seq::IteratorRandom;
use std::{future::Future, sync::Arc, time::Duration};
use tokio::{task::JoinHandle, time};

mod channels;
mod whois;

pub(crate) use channels::{GuildChannels, NotificationChannels};
pub(crate) use whois::DomainRecord;

/// How close a domain is to expiring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ExpiryStatus {
	/// Expiration date is in the past
	Expired,
	/// Expiration date is within the warning window
	ExpiringSoon,
	/// Nothing to report
	Healthy,
}

/// Classify an expiration date relative to `now`
pub(crate) fn classify(
	expiration: DateTime<Utc>,
	now: DateTime<Utc>,
	warning_window: chrono::Duration,
) -> ExpiryStatus {
	if expiration < now {
		ExpiryStatus::Expired
	} else if expiration < now + warning_window {
		ExpiryStatus::ExpiringSoon
	} else {
		ExpiryStatus::Healthy
	}
}

/// The domains worth a notification
#[derive(Debug, Clone)]
pub(crate) struct ExpiryReport {
	/// Flagged domains, never [`ExpiryStatus::Healthy`]
	entries: Vec<(DomainRecord, ExpiryStatus)>,
	/// When the report was made
	now: DateTime<Utc>,
}

impl ExpiryReport {
	/// Keep the records that are expired or expiring soon
	pub(crate) fn new(
		records: impl IntoIterator<Item = DomainRecord>,
		now: DateTime<Utc>,
		warning_window: chrono::Duration,
	) -> Self {
		let entries = records
			.into_iter()
			.map(|record| {
				let status = classify(record.expiration, now, warning_window);
				(record, status)
			})
			.filter(|(_, status)| *status != ExpiryStatus::Healthy)
			.collect();

		Self { entries, now }
	}

	/// Whether there is nothing to report
	pub(crate) fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Whether a domain already expired
	pub(crate) fn is_critical(&self) -> bool {
		self.entries
			.iter()
			.any(|(_, status)| *status == ExpiryStatus::Expired)
	}

	/// One line per flagged domain
	pub(crate) fn lines(&self, translator: &impl Translate) -> Vec<String> {
		self.entries
			.iter()
			.map(|(record, status)| {
				let date = record.expiration.format("%Y-%m-%d").to_string();
				let mut line = match status {
					ExpiryStatus::Expired => translator.translate(
						"expiry-expired",
						Some(fluent_args!["domain" => record.domain.as_str(), "date" => date]),
					),
					_ => translator.translate(
						"expiry-expiring-soon",
						Some(fluent_args![
							"domain" => record.domain.as_str(),
							"date" => date,
							"days" => (record.expiration - self.now).num_days()
						]),
					),
				};

				if let Some(registrar) = &record.registrar {
					line.push_str(" | ");
					line.push_str(&translator.translate(
						"expiry-registrar",
						Some(fluent_args!["registrar" => registrar.as_str()]),
					));
				}

				line
			})
			.collect()
	}

	/// The embed posted in the guild
	pub(crate) fn embed(&self, translator: &impl Translate) -> CreateEmbed {
		CreateEmbed::new()
			.title(NOTIFICATION_TITLE)
			.description(self.lines(translator).join("\n"))
			.colour(if self.is_critical() {
				CRITICAL_COLOUR
			} else {
				WARNING_COLOUR
			})
	}
}

/// Errors that abort a whole run of the job
#[derive(Debug, thiserror::Error)]
pub(crate) enum ExpiryError {
	/// The guild channels could not be listed
	#[error("could not list guild channels: {0}")]
	Channels(#[from] serenity::Error),
	/// The guild has no text channel to post in
	#[error("guild has no text channel")]
	NoChannel,
}

/// The first preferred channel name found, in preference order
pub(crate) fn preferred_channel(channels: &[(ChannelId, String)]) -> Option<ChannelId> {
	PREFERRED_CHANNELS.iter().find_map(|preferred| {
		channels
			.iter()
			.find(|(_, name)| name == preferred)
			.map(|(id, _)| *id)
	})
}

/// Any channel but `excluded`
fn random_channel(
	channels: &[(ChannelId, String)],
	excluded: Option<ChannelId>,
) -> Option<ChannelId> {
	channels
		.iter()
		.map(|(id, _)| *id)
		.filter(|id| Some(*id) != excluded)
		.choose(&mut rand::rng())
}

/// Post the report, retrying once in a random channel
///
/// A failed retry is logged and swallowed until the next run.
async fn deliver(
	channels: &impl NotificationChannels,
	report: &ExpiryReport,
	translator: &impl Translate,
) -> Result<(), ExpiryError> {
	let text_channels = channels.text_channels().await?;

	let target = preferred_channel(&text_channels)
		.or_else(|| random_channel(&text_channels, None))
		.ok_or(ExpiryError::NoChannel)?;

	let embed = report.embed(translator);

	let Err(error) = channels.post(target, embed.clone()).await else {
		return Ok(());
	};
	tracing::warn!(
		channel_id = target.get(),
		error = ?error,
		"failed to post domain notification",
	);

	let Some(fallback) = random_channel(&text_channels, Some(target)) else {
		tracing::error!("no fallback channel for the domain notification");
		return Ok(());
	};

	if let Err(error) = channels.post(fallback, embed).await {
		tracing::error!(
			channel_id = fallback.get(),
			error = ?error,
			"failed to post domain notification in fallback channel",
		);
	}

	Ok(())
}

/// Look every domain up and post a notification if needed
#[tracing::instrument(skip_all)]
async fn check_domains(http: &Http, data: &ArcData) -> Result<(), ExpiryError> {
	let ExpiryConfig {
		domains,
		warning_window,
		..
	} = &data.config.expiry;

	let mut records = Vec::with_capacity(domains.len());
	for domain in domains {
		match whois::lookup(domain).await {
			Ok(record) => records.push(record),
			Err(error) => {
				tracing::warn!(domain = domain.as_str(), error = %error, "domain lookup failed");
			}
		}
	}

	let report = ExpiryReport::new(records, Utc::now(), *warning_window);
	if report.is_empty() {
		tracing::info!("no domain is about to expire");
		return Ok(());
	}

	deliver(
		&GuildChannels::new(http, data.config.discord_guild),
		&report,
		&data.translations,
	)
	.await
}

/// Run the check on every interval tick until a run fails
async fn run(http: &Http, data: &ArcData) -> Result<(), ExpiryError> {
	let mut interval = time::interval(data.config.expiry.interval);

	loop {
		interval.tick().await;
		check_domains(http, data).await?;
	}
}

/// Run `job` forever, waiting `cooldown` after it returns
async fn supervise<F, Fut>(mut job: F, cooldown: Duration)
where
	F: FnMut() -> Fut,
	Fut: Future<Output = Result<(), ExpiryError>>,
{
	loop {
		if let Err(error) = job().await {
			tracing::error!(
				error = %error,
				cooldown = ?cooldown,
				"domain expiry job failed, restarting after cooldown",
			);
		}

		time::sleep(cooldown).await;
	}
}

/// Start the job, restarting it after a cooldown whenever it fails
pub(crate) fn spawn(http: Arc<Http>, data: ArcData) -> Option<JoinHandle<()>> {
	if data.config.expiry.domains.is_empty() {
		tracing::info!("no domain to watch, expiry job not started");
		return None;
	}

	Some(tokio::spawn(supervise(
		move || {
			let http = Arc::clone(&http);
			let data = Arc::clone(&data);
			async move { run(&http, &data).await }
		},
		RESTART_COOLDOWN,
	)))
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::{Duration, TimeZone};
	use poise::async_trait;
	use std::sync::Mutex;

	/// Text channels whose posts fail for the `failing` ones
	struct FakeChannels {
		channels: Vec<(ChannelId, String)>,
		failing: Vec<ChannelId>,
		attempts: Mutex<Vec<ChannelId>>,
	}

	impl FakeChannels {
		fn new(channels: &[(u64, &str)], failing: &[u64]) -> Self {
			Self {
				channels: channels
					.iter()
					.map(|(id, name)| (ChannelId::new(*id), (*name).to_owned()))
					.collect(),
				failing: failing.iter().copied().map(ChannelId::new).collect(),
				attempts: Mutex::default(),
			}
		}

		fn attempts(&self) -> Vec<ChannelId> {
			self.attempts.lock().unwrap().clone()
		}
	}

	#[async_trait]
	impl NotificationChannels for FakeChannels {
		async fn text_channels(&self) -> Result<Vec<(ChannelId, String)>, serenity::Error> {
			Ok(self.channels.clone())
		}

		async fn post(
			&self,
			channel: ChannelId,
			_embed: CreateEmbed,
		) -> Result<(), serenity::Error> {
			self.attempts.lock().unwrap().push(channel);

			if self.failing.contains(&channel) {
				Err(serenity::Error::Other("missing access"))
			} else {
				Ok(())
			}
		}
	}

	fn expired_report() -> ExpiryReport {
		ExpiryReport::new(
			[record("old.org", now() - Duration::days(2), None)],
			now(),
			Duration::days(30),
		)
	}

	fn now() -> DateTime<Utc> {
		Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap()
	}

	fn record(domain: &str, expiration: DateTime<Utc>, registrar: Option<&str>) -> DomainRecord {
		DomainRecord {
			domain: domain.to_owned(),
			expiration,
			registrar: registrar.map(str::to_owned),
		}
	}

	#[test]
	fn classification_boundaries() {
		let window = Duration::days(30);

		assert_eq!(
			classify(now() - Duration::seconds(1), now(), window),
			ExpiryStatus::Expired
		);
		assert_eq!(classify(now(), now(), window), ExpiryStatus::ExpiringSoon);
		assert_eq!(
			classify(now() + window - Duration::seconds(1), now(), window),
			ExpiryStatus::ExpiringSoon
		);
		assert_eq!(classify(now() + window, now(), window), ExpiryStatus::Healthy);
	}

	#[test]
	fn report_keeps_only_flagged_domains() {
		let translations = crate::translation::tests::english();
		let report = ExpiryReport::new(
			[
				record("old.org", now() - Duration::days(2), Some("Gandi")),
				record("fine.org", now() + Duration::days(300), None),
				record("soon.org", now() + Duration::days(10), None),
			],
			now(),
			Duration::days(30),
		);

		let lines = report.lines(&translations);

		assert!(report.is_critical());
		assert_eq!(lines.len(), 2);
		assert!(lines[0].contains("old.org") && lines[0].contains("Gandi"));
		assert!(lines[1].contains("soon.org") && lines[1].contains("10"));
		assert!(!lines.iter().any(|line| line.contains("fine.org")));
	}

	#[test]
	fn healthy_domains_make_an_empty_report() {
		let report = ExpiryReport::new(
			[record("fine.org", now() + Duration::days(300), None)],
			now(),
			Duration::days(30),
		);

		assert!(report.is_empty());
		assert!(!report.is_critical());
	}

	#[test]
	fn channel_preference_order() {
		let general = (ChannelId::new(1), "general".to_owned());
		let sigweb = (ChannelId::new(2), "sigweb".to_owned());
		let committee = (ChannelId::new(3), "committee".to_owned());

		assert_eq!(
			preferred_channel(&[general.clone(), sigweb.clone(), committee]),
			Some(ChannelId::new(3))
		);
		assert_eq!(
			preferred_channel(&[general.clone(), sigweb]),
			Some(ChannelId::new(2))
		);
		assert_eq!(preferred_channel(&[general]), None);
	}

	#[test]
	fn random_fallback_avoids_failed_channel() {
		let channels = [
			(ChannelId::new(1), "general".to_owned()),
			(ChannelId::new(2), "random".to_owned()),
		];

		assert_eq!(
			random_channel(&channels, Some(ChannelId::new(1))),
			Some(ChannelId::new(2))
		);
		assert_eq!(random_channel(&channels[..1], Some(ChannelId::new(1))), None);
	}

	#[tokio::test]
	async fn delivers_in_the_preferred_channel() {
		let channels = FakeChannels::new(&[(1, "general"), (3, "committee")], &[]);

		deliver(&channels, &expired_report(), &crate::translation::tests::english())
			.await
			.unwrap();

		assert_eq!(channels.attempts(), [ChannelId::new(3)]);
	}

	#[tokio::test]
	async fn failed_post_is_retried_once_elsewhere() {
		let channels = FakeChannels::new(&[(1, "general"), (3, "committee")], &[3]);

		deliver(&channels, &expired_report(), &crate::translation::tests::english())
			.await
			.unwrap();

		assert_eq!(channels.attempts(), [ChannelId::new(3), ChannelId::new(1)]);
	}

	#[tokio::test]
	async fn failed_retry_is_swallowed() {
		let channels = FakeChannels::new(
			&[(1, "general"), (2, "random"), (3, "committee")],
			&[1, 2, 3],
		);

		let delivered =
			deliver(&channels, &expired_report(), &crate::translation::tests::english()).await;

		assert!(delivered.is_ok());
		let attempts = channels.attempts();
		assert_eq!(attempts.len(), 2);
		assert_eq!(attempts[0], ChannelId::new(3));
		assert_ne!(attempts[1], ChannelId::new(3));
	}

	#[tokio::test]
	async fn guild_without_text_channel_fails_the_run() {
		let channels = FakeChannels::new(&[], &[]);

		let delivered =
			deliver(&channels, &expired_report(), &crate::translation::tests::english()).await;

		assert!(matches!(delivered, Err(ExpiryError::NoChannel)));
		assert!(channels.attempts().is_empty());
	}

	#[tokio::test]
	async fn supervisor_restarts_failed_job_after_cooldown() {
		let (sender, mut receiver) = tokio::sync::mpsc::unbounded_channel();
		let cooldown = std::time::Duration::from_millis(20);

		let handle = tokio::spawn(supervise(
			move || {
				let sender = sender.clone();
				async move {
					let _ = sender.send(time::Instant::now());
					Err(ExpiryError::NoChannel)
				}
			},
			cooldown,
		));

		let first = receiver.recv().await.unwrap();
		let second = receiver.recv().await.unwrap();
		let third = receiver.recv().await.unwrap();
		handle.abort();

		assert!(second - first >= cooldown);
		assert!(third - second >= cooldown);
	}
}
