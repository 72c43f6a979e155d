//! Operator authored button definitions
//!
//! Each message carrying buttons is described by a `<key>.xml` file where `key` is the
//! prefix of the buttons custom ids.

use crate::{
	actions::Action,
	constants::definitions::{FILE_EXTENSION, KEY_DELIMITER},
};
use poise::serenity_prelude::RoleId;
use serde::Deserialize;
use std::{
	collections::HashSet,
	fs, io,
	path::{Path, PathBuf},
};

/// A button entry of a [`MessageDefinition`]
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ButtonDefinition {
	/// Custom id of the button, unique in its message
	#[serde(rename = "@id")]
	pub(crate) id: String,
	/// Raw action string
	#[serde(rename = "@action", default)]
	pub(crate) action: Option<String>,
}

/// All the buttons of one message
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct MessageDefinition {
	/// Buttons in file order
	#[serde(rename = "button", default)]
	pub(crate) buttons: Vec<ButtonDefinition>,
}

impl MessageDefinition {
	/// Parse a definition from its XML representation
	pub(crate) fn from_xml(text: &str) -> Result<Self, quick_xml::DeError> {
		quick_xml::de::from_str(text)
	}

	/// Parsed actions of every button that carries one
	fn actions(&self) -> impl Iterator<Item = (&str, Action)> + '_ {
		self.buttons.iter().filter_map(|button| {
			button
				.action
				.as_deref()
				.map(|action| (button.id.as_str(), Action::parse(action)))
		})
	}
}

/// The definition storage could not be read
#[derive(Debug, thiserror::Error)]
pub(crate) enum DefinitionError {
	/// The file exists but could not be read
	#[error("could not read definition `{key}`: {source}")]
	Io {
		/// The requested definition
		key: String,
		/// The underlying error
		source: io::Error,
	},
	/// The file is not a valid definition
	#[error("definition `{key}` is malformed: {source}")]
	Malformed {
		/// The requested definition
		key: String,
		/// The underlying error
		source: quick_xml::DeError,
	},
}

/// A place definitions are loaded from
pub(crate) trait DefinitionSource: Send + Sync {
	/// Load the definition identified by `key`, `None` if there is none
	fn load(&self, key: &str) -> Result<Option<MessageDefinition>, DefinitionError>;
}

/// Reads definitions from a folder, on every lookup
#[derive(Debug, Clone)]
pub(crate) struct FolderDefinitions {
	/// The folder holding `<key>.xml` files
	folder: PathBuf,
}

impl FolderDefinitions {
	/// Create a source over the given folder
	pub(crate) fn new(folder: impl Into<PathBuf>) -> Self {
		Self {
			folder: folder.into(),
		}
	}

	/// Path of the definition file for `key`
	fn path_of(&self, key: &str) -> PathBuf {
		self.folder.join(Path::new(key).with_extension(FILE_EXTENSION))
	}
}

/// Whether a key can be safely mapped to a file name
fn is_valid_key(key: &str) -> bool {
	!key.is_empty()
		&& key
			.chars()
			.all(|char| char.is_ascii_alphanumeric() || char == '-')
}

impl DefinitionSource for FolderDefinitions {
	fn load(&self, key: &str) -> Result<Option<MessageDefinition>, DefinitionError> {
		if !is_valid_key(key) {
			return Ok(None);
		}

		let text = match fs::read_to_string(self.path_of(key)) {
			Ok(text) => text,
			Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(None),
			Err(source) => {
				return Err(DefinitionError::Io {
					key: key.to_owned(),
					source,
				})
			}
		};

		MessageDefinition::from_xml(&text)
			.map(Some)
			.map_err(|source| DefinitionError::Malformed {
				key: key.to_owned(),
				source,
			})
	}
}

/// The definition key of a button: everything before the first `_`
pub(crate) fn definition_key(button_id: &str) -> &str {
	button_id
		.split_once(KEY_DELIMITER)
		.map_or(button_id, |(key, _)| key)
}

/// Find the action of the button `button_id` in the definition `key`
pub(crate) fn resolve_action(
	source: &impl DefinitionSource,
	key: &str,
	button_id: &str,
) -> Result<Option<Action>, DefinitionError> {
	let Some(definition) = source.load(key)? else {
		return Ok(None);
	};

	Ok(definition
		.buttons
		.iter()
		.find(|button| button.id == button_id)
		.and_then(|button| button.action.as_deref())
		.map(Action::parse))
}

/// Collect the roles toggled by the buttons of `key` that share the group `group_name`
pub(crate) fn resolve_unique_group_members(
	source: &impl DefinitionSource,
	key: &str,
	group_name: &str,
) -> Result<HashSet<RoleId>, DefinitionError> {
	let Some(definition) = source.load(key)? else {
		return Ok(HashSet::new());
	};

	Ok(definition
		.actions()
		.filter_map(|(_, action)| match action {
			Action::RoleToggle {
				role_id,
				group: Some(group),
			} if group == group_name => Some(role_id),
			_ => None,
		})
		.collect())
}
