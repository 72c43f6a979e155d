//! Minimal WHOIS client, enough to find when a domain expires

use crate::constants::whois::{IANA_SERVER, PORT, TIMEOUT};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use tokio::{
	io::{AsyncReadExt, AsyncWriteExt},
	net::TcpStream,
	time::timeout,
};

/// Registration data of a domain
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DomainRecord {
	/// The looked up domain
	pub(crate) domain: String,
	/// When the registration ends
	pub(crate) expiration: DateTime<Utc>,
	/// The company the domain is registered with
	pub(crate) registrar: Option<String>,
}

/// Errors while looking a domain up
#[derive(Debug, thiserror::Error)]
pub(crate) enum WhoisError {
	/// The server did not answer in time
	#[error("WHOIS server `{0}` timed out")]
	Timeout(String),
	/// Connection or transmission error
	#[error("WHOIS server `{server}` failed: {source}")]
	Io {
		/// The queried server
		server: String,
		/// The underlying error
		source: std::io::Error,
	},
	/// IANA does not know the registry of this top level domain
	#[error("no WHOIS server for `{0}`")]
	NoReferral(String),
	/// The registry answer has no expiry date
	#[error("no expiry date for `{0}`")]
	NoExpiry(String),
}

/// Labels preceding expiry dates, lowercase, most common first
const EXPIRY_LABELS: [&str; 7] = [
	"registry expiry date",
	"registrar registration expiration date",
	"expiration date",
	"expiry date",
	"expires on",
	"expires",
	"paid-till",
];

/// Send one query and read the whole answer
async fn query(server: &str, request: &str) -> Result<String, WhoisError> {
	let io_error = |source| WhoisError::Io {
		server: server.to_owned(),
		source,
	};

	let exchange = async {
		let mut stream = TcpStream::connect((server, PORT)).await?;
		stream.write_all(format!("{request}\r\n").as_bytes()).await?;

		let mut answer = Vec::new();
		stream.read_to_end(&mut answer).await?;

		Ok::<_, std::io::Error>(answer)
	};

	let answer = timeout(TIMEOUT, exchange)
		.await
		.map_err(|_| WhoisError::Timeout(server.to_owned()))?
		.map_err(io_error)?;

	Ok(String::from_utf8_lossy(&answer).into_owned())
}

/// Split `label: value` lines
fn fields(answer: &str) -> impl Iterator<Item = (String, &str)> {
	answer.lines().filter_map(|line| {
		let (label, value) = line.trim().split_once(':')?;
		let value = value.trim();

		(!value.is_empty()).then(|| (label.trim().to_lowercase(), value))
	})
}

/// The registry WHOIS server given by IANA
pub(crate) fn parse_referral(answer: &str) -> Option<String> {
	fields(answer)
		.find(|(label, _)| label == "refer" || label == "whois")
		.map(|(_, value)| value.to_owned())
}

/// Parse the many date formats used by registries
pub(crate) fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
	let raw = raw.trim();

	if let Ok(date) = DateTime::parse_from_rfc3339(raw) {
		return Some(date.with_timezone(&Utc));
	}

	// Some registries append a timezone name after the date
	let raw = raw.split_whitespace().next().unwrap_or(raw);

	["%Y-%m-%dT%H:%M:%SZ", "%Y-%m-%dT%H:%M:%S%.fZ", "%Y-%m-%dT%H:%M:%S"]
		.iter()
		.find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
		.or_else(|| {
			["%Y-%m-%d", "%Y.%m.%d", "%d-%b-%Y", "%d.%m.%Y", "%Y/%m/%d"]
				.iter()
				.find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
				.and_then(|date| date.and_hms_opt(0, 0, 0))
		})
		.map(|date| date.and_utc())
}

/// Extract the registration data from a registry answer
pub(crate) fn parse_record(domain: &str, answer: &str) -> Result<DomainRecord, WhoisError> {
	let fields: Vec<(String, &str)> = fields(answer).collect();

	let expiration = EXPIRY_LABELS
		.iter()
		.find_map(|expected| {
			fields
				.iter()
				.filter(|(label, _)| label == expected)
				.find_map(|(_, value)| parse_date(value))
		})
		.ok_or_else(|| WhoisError::NoExpiry(domain.to_owned()))?;

	let registrar = fields
		.iter()
		.find(|(label, _)| label == "registrar")
		.map(|(_, value)| (*value).to_owned());

	Ok(DomainRecord {
		domain: domain.to_owned(),
		expiration,
		registrar,
	})
}

/// Ask IANA for the registry of the domain, then ask the registry
#[tracing::instrument]
pub(crate) async fn lookup(domain: &str) -> Result<DomainRecord, WhoisError> {
	let tld = domain.rsplit('.').next().unwrap_or(domain);

	let referral = query(IANA_SERVER, tld).await?;
	let server = parse_referral(&referral).ok_or_else(|| WhoisError::NoReferral(tld.to_owned()))?;

	let answer = query(&server, domain).await?;

	parse_record(domain, &answer)
}
