//! Constant values shared across the bot

use std::time::Duration;

/// Name of the role members are moved into by `/report`
pub(crate) const QUARANTINE_ROLE_NAME: &str = "quarantined";

/// Button definitions storage
pub(crate) mod definitions {
	/// Separates the definition key from the rest of a button custom id
	pub(crate) const KEY_DELIMITER: char = '_';
	/// Extension of the definition files
	pub(crate) const FILE_EXTENSION: &str = "xml";

	/// Prefix of role toggling actions
	pub(crate) const TOGGLE_ROLE_PREFIX: &str = "toggle-role";
	/// Prefix of channel toggling actions
	pub(crate) const TOGGLE_CHANNEL_PREFIX: &str = "toggle-channel";
	/// Separates the parts of an action string
	pub(crate) const ACTION_DELIMITER: char = ':';
}

/// The domain expiry job
pub(crate) mod expiry {
	use super::Duration;

	/// Title of the posted embed
	pub(crate) const NOTIFICATION_TITLE: &str = "Domain Notification";
	/// Embed colour when at least one domain already expired
	pub(crate) const CRITICAL_COLOUR: u32 = 0x00E7_4C3C;
	/// Embed colour when domains are only about to expire
	pub(crate) const WARNING_COLOUR: u32 = 0x00F3_9C12;

	/// Channels names tried in order before falling back on a random one
	pub(crate) const PREFERRED_CHANNELS: [&str; 2] = ["committee", "sigweb"];

	/// Upper bound of the warning window, in days
	pub(crate) const MAX_WARNING_DAYS: i64 = 3650;
	/// Upper bound of the time between two checks, in hours
	pub(crate) const MAX_INTERVAL_HOURS: u64 = 24 * 366;

	/// Time the supervisor waits before restarting a failed job
	pub(crate) const RESTART_COOLDOWN: Duration = Duration::from_secs(60 * 60);
}

/// WHOIS protocol
pub(crate) mod whois {
	use super::Duration;

	/// Root server used to find the registry of a top level domain
	pub(crate) const IANA_SERVER: &str = "whois.iana.org";
	/// WHOIS TCP port
	pub(crate) const PORT: u16 = 43;
	/// Limit for a whole query, connection included
	pub(crate) const TIMEOUT: Duration = Duration::from_secs(10);
}

/// The "is it down?" probes
pub(crate) mod status {
	use super::Duration;

	/// Time given to each website to answer
	pub(crate) const PROBE_TIMEOUT: Duration = Duration::from_secs(5);
}
