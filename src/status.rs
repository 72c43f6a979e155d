//! "Is it down?" answers, polling two websites

use crate::translation::Translate;
use fluent::fluent_args;
use reqwest::{Client, StatusCode};
use url::Url;

/// A polled website
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct StatusProbe {
	/// Display name, also accepted in the question
	pub(crate) name: String,
	/// The polled url
	pub(crate) url: Url,
}

/// `STATUS_PROBES` could not be parsed
#[derive(Debug, thiserror::Error)]
#[error("expected two `name=url` pairs separated by a comma")]
pub(crate) struct InvalidProbes;

impl StatusProbe {
	/// Parse exactly two comma separated `name=url` pairs
	pub(crate) fn parse_pair(raw: &str) -> Result<[Self; 2], InvalidProbes> {
		let probes = raw
			.split(',')
			.map(|pair| {
				let (name, url) = pair.split_once('=').ok_or(InvalidProbes)?;
				let name = name.trim();
				if name.is_empty() {
					return Err(InvalidProbes);
				}

				Ok(Self {
					name: name.to_owned(),
					url: Url::parse(url.trim()).map_err(|_| InvalidProbes)?,
				})
			})
			.collect::<Result<Vec<_>, _>>()?;

		<[Self; 2]>::try_from(probes).map_err(|_| InvalidProbes)
	}
}

/// Whether a message asks if the first probe is down
pub(crate) fn is_status_query(content: &str, probes: &[StatusProbe; 2]) -> bool {
	let question = content.trim().trim_end_matches('?').trim().to_lowercase();

	question == "is it down" || question == format!("is {} down", probes[0].name.to_lowercase())
}

/// Any failure counts as down
#[tracing::instrument(skip(client))]
pub(crate) async fn probe(client: &Client, url: &Url) -> bool {
	match client.get(url.clone()).send().await {
		Ok(response) => response.status() == StatusCode::OK,
		Err(error) => {
			tracing::debug!(error = ?error, "probe failed");
			false
		}
	}
}

/// Poll both websites one after the other and describe their state
pub(crate) async fn check(
	client: &Client,
	probes: &[StatusProbe; 2],
	translator: &impl Translate,
) -> String {
	let mut lines = Vec::with_capacity(probes.len());

	for StatusProbe { name, url } in probes {
		let key = if probe(client, url).await {
			"status-up"
		} else {
			"status-down"
		};

		lines.push(translator.translate(key, Some(fluent_args!["name" => name.as_str()])));
	}

	lines.join("\n")
}

#[cfg(test)]
mod tests {
	use super::*;

	fn probes() -> [StatusProbe; 2] {
		StatusProbe::parse_pair("Website=https://example.org, Google=https://www.google.com")
			.unwrap()
	}

	#[test]
	fn parses_two_probes() {
		let [website, reference] = probes();

		assert_eq!(website.name, "Website");
		assert_eq!(website.url.as_str(), "https://example.org/");
		assert_eq!(reference.name, "Google");
	}

	#[test]
	fn rejects_other_probe_counts_or_garbage() {
		assert!(StatusProbe::parse_pair("Website=https://example.org").is_err());
		assert!(StatusProbe::parse_pair("a=https://a.org,b=https://b.org,c=https://c.org").is_err());
		assert!(StatusProbe::parse_pair("a=https://a.org,b").is_err());
		assert!(StatusProbe::parse_pair("a=https://a.org,b=not a url").is_err());
		assert!(StatusProbe::parse_pair("=https://a.org,b=https://b.org").is_err());
	}

	#[test]
	fn recognizes_canned_questions() {
		let probes = probes();

		assert!(is_status_query("is it down?", &probes));
		assert!(is_status_query("  Is Website down ?? ", &probes));
		assert!(!is_status_query("is google down", &probes));
		assert!(!is_status_query("why is it down", &probes));
	}

	#[tokio::test]
	async fn unreachable_website_is_down() {
		let client = Client::new();
		let url = Url::parse("http://127.0.0.1:9/").unwrap();

		assert!(!probe(&client, &url).await);
	}
}
