//! Fluent Project translation system

use crate::states::{ApplicationContext, Command, Context, MessageComponentContext};
use anyhow::{anyhow, Context as _};
use fluent::{bundle, FluentArgs, FluentMessage, FluentResource};
use fluent_syntax::ast::Pattern;
use intl_memoizer::concurrent::IntlLangMemoizer as ConcurrentIntlLangMemoizer;
use std::{borrow::Cow, collections::HashMap, fmt, fs, path::Path};
use unic_langid::LanguageIdentifier;

/// The concurrent Fluent bundle used to cache the language results
type FluentBundle = bundle::FluentBundle<FluentResource, ConcurrentIntlLangMemoizer>;

/// One bundle per locale found in the translations folder
pub(crate) struct Translations {
	/// Used for unknown user locales and outside interactions
	fallback: LanguageIdentifier,
	/// The available locales
	bundles: HashMap<LanguageIdentifier, FluentBundle>,
}

impl fmt::Debug for Translations {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Translations")
			.field("fallback", &self.fallback)
			.field("locales", &self.bundles.keys())
			.finish()
	}
}

/// Parse a `<locale>.ftl` file
fn load_bundle(path: &Path) -> anyhow::Result<(LanguageIdentifier, FluentBundle)> {
	let locale = path
		.file_stem()
		.and_then(|stem| stem.to_str())
		.ok_or_else(|| anyhow!("invalid translation file name {path:?}"))?
		.parse::<LanguageIdentifier>()
		.with_context(|| format!("{path:?} is not named after a locale"))?;

	let source =
		fs::read_to_string(path).with_context(|| format!("failed to read {path:?}"))?;
	let resource = FluentResource::try_new(source)
		.map_err(|(_, errors)| anyhow!("failed to parse {path:?}: {errors:?}"))?;

	let mut bundle = FluentBundle::new_concurrent(vec![locale.clone()]);
	// Unicode isolation marks show up as garbage around mentions in `Discord`
	bundle.set_use_isolating(false);
	bundle
		.add_resource(resource)
		.map_err(|errors| anyhow!("duplicated messages in {path:?}: {errors:?}"))?;

	Ok((locale, bundle))
}

/// Render a pattern, formatting errors are logged and rendered inline by fluent
fn render<'bundle>(
	bundle: &'bundle FluentBundle,
	pattern: &'bundle Pattern<&str>,
	args: Option<&'bundle FluentArgs>,
) -> Cow<'bundle, str> {
	let mut errors = Vec::new();
	let text = bundle.format_pattern(pattern, args, &mut errors);

	for error in errors {
		tracing::error!(error = %error, "fluent format error");
	}

	text
}

/// Render the attribute of a message without arguments
fn attribute(bundle: &FluentBundle, message: &FluentMessage, name: &str) -> Option<String> {
	message
		.get_attribute(name)
		.map(|attribute| render(bundle, attribute.value(), None).into_owned())
}

impl Translations {
	/// Load every `.ftl` file of `folder`, `fallback` must be one of them
	pub(crate) fn from_folder(folder: &str, fallback: LanguageIdentifier) -> anyhow::Result<Self> {
		let mut bundles = HashMap::new();

		for entry in fs::read_dir(folder).with_context(|| format!("failed to list `{folder}`"))? {
			let path = entry?.path();
			if path.extension().is_some_and(|extension| extension == "ftl") {
				let (locale, bundle) = load_bundle(&path)?;
				bundles.insert(locale, bundle);
			}
		}

		if !bundles.contains_key(&fallback) {
			return Err(anyhow!("no translation file for the fallback locale `{fallback}`"));
		}

		Ok(Self { fallback, bundles })
	}

	/// Translate `key` for a user locale as sent by `Discord`
	///
	/// Unknown or unparsable locales use the fallback bundle.
	pub(crate) fn translate_for<'bundle>(
		&'bundle self,
		locale: Option<&str>,
		key: &'bundle str,
		args: Option<&'bundle FluentArgs>,
	) -> anyhow::Result<Cow<'bundle, str>> {
		let bundle = locale
			.and_then(|locale| locale.parse::<LanguageIdentifier>().ok())
			.and_then(|locale| self.bundles.get(&locale))
			.or_else(|| self.bundles.get(&self.fallback))
			.ok_or_else(|| anyhow!("fallback locale bundle not loaded"))?;

		let message = bundle
			.get_message(key)
			.ok_or_else(|| anyhow!("unknown fluent key `{key}`"))?;
		let pattern = message
			.value()
			.ok_or_else(|| anyhow!("message `{key}` has no value"))?;

		Ok(render(bundle, pattern, args))
	}

	/// Localize the slash commands names, descriptions and parameters in every locale
	///
	/// The command `add` reads the message `add`, its `.description` attribute
	/// and for each parameter `member` the `.member` and `.member-description` attributes.
	pub(crate) fn localize_commands(&self, commands: &mut [Command]) {
		for command in commands {
			for (locale, bundle) in &self.bundles {
				let Some(message) = bundle.get_message(&command.name) else {
					tracing::error!(command = command.name, %locale, "command is not translated");
					continue;
				};
				let locale = locale.to_string();

				if let Some(name) = message.value() {
					command
						.name_localizations
						.insert(locale.clone(), render(bundle, name, None).into_owned());
				}

				match attribute(bundle, &message, "description") {
					Some(description) => {
						command
							.description_localizations
							.insert(locale.clone(), description);
					}
					None => tracing::warn!(
						command = command.name,
						%locale,
						"command description is not translated"
					),
				}

				for parameter in &mut command.parameters {
					let name = attribute(bundle, &message, &parameter.name);
					let description =
						attribute(bundle, &message, &format!("{}-description", parameter.name));

					match (name, description) {
						(Some(name), Some(description)) => {
							parameter.name_localizations.insert(locale.clone(), name);
							parameter
								.description_localizations
								.insert(locale.clone(), description);
						}
						_ => tracing::warn!(
							command = command.name,
							parameter = parameter.name,
							%locale,
							"parameter is not fully translated"
						),
					}
				}
			}
		}
	}
}

/// Trait for client internationalisation
pub(crate) trait Translate {
	/// Translate `key` in the locale of the context
	fn try_translate<'bundle>(
		&'bundle self,
		key: &'bundle str,
		args: Option<&'bundle FluentArgs>,
	) -> anyhow::Result<Cow<'bundle, str>>;

	/// Translate `key`, or return the key itself when it cannot be translated
	fn translate<'b>(&'b self, key: &'b str, args: Option<FluentArgs<'b>>) -> String {
		match self.try_translate(key, args.as_ref()) {
			Ok(text) => text.into_owned(),
			Err(error) => {
				tracing::error!(key, args = ?args, error = ?error, "translation error");
				key.to_owned()
			}
		}
	}
}

impl Translate for ApplicationContext<'_> {
	fn try_translate<'bundle>(
		&'bundle self,
		key: &'bundle str,
		args: Option<&'bundle FluentArgs>,
	) -> anyhow::Result<Cow<'bundle, str>> {
		self.data
			.translations
			.translate_for(Some(&self.interaction.locale), key, args)
	}
}

impl Translate for Context<'_> {
	fn try_translate<'bundle>(
		&'bundle self,
		key: &'bundle str,
		args: Option<&'bundle FluentArgs>,
	) -> anyhow::Result<Cow<'bundle, str>> {
		self.data()
			.translations
			.translate_for(self.locale(), key, args)
	}
}

impl Translate for MessageComponentContext<'_> {
	fn try_translate<'bundle>(
		&'bundle self,
		key: &'bundle str,
		args: Option<&'bundle FluentArgs>,
	) -> anyhow::Result<Cow<'bundle, str>> {
		self.data
			.translations
			.translate_for(Some(&self.interaction.locale), key, args)
	}
}

/// Used outside of interactions, where there is no user locale
impl Translate for Translations {
	fn try_translate<'bundle>(
		&'bundle self,
		key: &'bundle str,
		args: Option<&'bundle FluentArgs>,
	) -> anyhow::Result<Cow<'bundle, str>> {
		self.translate_for(None, key, args)
	}
}
