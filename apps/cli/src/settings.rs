//! Layered settings: defaults, then `trellis.toml`, then `TRELLIS_*`
//! environment variables, then command-line flags.

use std::path::Path;

use anyhow::Context;
use clap::ValueEnum;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

/// Default settings file, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "trellis.toml";

/// How results are printed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// `EnvFilter` directive for diagnostics on stderr.
    pub log_level: String,
    pub format: OutputFormat,
    /// Submit without clearing fields missing from the data.
    pub partial: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: "warn".to_owned(),
            format: OutputFormat::Text,
            partial: false,
        }
    }
}

/// Values given on the command line; unset flags leave lower layers alone.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FlagOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<OutputFormat>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub partial: bool,
}

impl Settings {
    /// Merges every layer. A missing default file is fine; a missing
    /// explicitly named file is not.
    pub fn load(config_file: Option<&Path>, flags: &FlagOverrides) -> anyhow::Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Settings::default()));
        match config_file {
            Some(path) => {
                anyhow::ensure!(path.is_file(), "settings file {} does not exist", path.display());
                figment = figment.merge(Toml::file(path));
            }
            None => figment = figment.merge(Toml::file(DEFAULT_CONFIG_FILE)),
        }
        figment
            .merge(Env::prefixed("TRELLIS_"))
            .merge(Serialized::defaults(flags))
            .extract()
            .context("invalid settings")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_apply_without_any_layer() {
        Jail::expect_with(|_| {
            let settings = Settings::load(None, &FlagOverrides::default()).unwrap();
            assert_eq!(settings, Settings::default());
            Ok(())
        });
    }

    #[test]
    fn layers_override_in_order() {
        Jail::expect_with(|jail| {
            jail.create_file(
                DEFAULT_CONFIG_FILE,
                r#"
                    log_level = "debug"
                    format = "json"
                "#,
            )?;
            let settings = Settings::load(None, &FlagOverrides::default()).unwrap();
            assert_eq!(settings.log_level, "debug");
            assert_eq!(settings.format, OutputFormat::Json);

            jail.set_env("TRELLIS_LOG_LEVEL", "trace");
            let settings = Settings::load(None, &FlagOverrides::default()).unwrap();
            assert_eq!(settings.log_level, "trace");

            let flags = FlagOverrides {
                format: Some(OutputFormat::Text),
                partial: true,
                ..FlagOverrides::default()
            };
            let settings = Settings::load(None, &flags).unwrap();
            assert_eq!(settings.log_level, "trace");
            assert_eq!(settings.format, OutputFormat::Text);
            assert!(settings.partial);
            Ok(())
        });
    }

    #[test]
    fn named_file_must_exist() {
        Jail::expect_with(|_| {
            let err = Settings::load(Some(Path::new("nope.toml")), &FlagOverrides::default())
                .unwrap_err();
            assert!(err.to_string().contains("nope.toml"));
            Ok(())
        });
    }
}
