// src/config.rs
//
// TOML configuration.
//
//   [normalize]     pipeline options (see options.rs)
//   [palettes]      name = ["red", "fdd", ...]   bare hex colours get a '#'
//   [fonts]         "css family" = "Display title"
//
// Palettes and fonts from the file are added on top of the built-in ones; a palette with a
// built-in name replaces it.

use crate::error::ConfigError;
use crate::options::NormalizeOptions;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub normalize: NormalizeOptions,
    pub palettes: BTreeMap<String, Vec<String>>,
    pub fonts: BTreeMap<String, String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    normalize: NormalizeOptions,
    palettes: BTreeMap<String, Vec<String>>,
    fonts: BTreeMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        let mut config = Config {
            normalize: NormalizeOptions::default(),
            palettes: BTreeMap::new(),
            fonts: BTreeMap::new(),
        };
        config
            .add_palette(
                "main",
                ["red", "yellow", "orange", "purple", "green", "blue", "pink", "magenta"],
            )
            .add_palette("highlight", ["yellow", "lime", "#ddd", "#fdd"]);
        for (family, title) in [
            ("arial", "Arial"),
            ("verdana", "Verdana"),
            ("courier", "Courier"),
            ("calibri", "Calibri"),
            ("helvetica", "Helvetica"),
            ("arial narrow", "Arial narrow"),
        ] {
            config.add_font(family, title);
        }
        config
    }
}

impl Config {
    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Option<Self>, ConfigError> {
        let config_path = config_path.as_ref();
        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(config_path).map_err(|source| {
            ConfigError::ConfigReadError {
                config_path: config_path.to_path_buf(),
                source,
            }
        })?;

        let file: ConfigFile =
            toml::from_str(&content).map_err(|source| ConfigError::ConfigParseError {
                config_path: config_path.to_path_buf(),
                source,
            })?;

        debug!(
            path = %config_path.display(),
            palettes = file.palettes.len(),
            fonts = file.fonts.len(),
            "loaded config file"
        );
        Ok(Some(Self::from_file(file)))
    }

    fn from_file(file: ConfigFile) -> Self {
        let mut config = Config {
            normalize: file.normalize,
            ..Config::default()
        };
        for (name, colours) in file.palettes {
            config.add_palette(&name, colours);
        }
        for (family, title) in file.fonts {
            config.add_font(&family, &title);
        }
        config
    }

    /// Register (or replace) a colour palette.
    pub fn add_palette<I, S>(&mut self, name: &str, colours: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let colours = colours.into_iter().map(|c| format_hex(c.as_ref())).collect();
        self.palettes.insert(name.to_string(), colours);
        self
    }

    pub fn add_font(&mut self, family: &str, title: &str) -> &mut Self {
        self.fonts.insert(family.to_string(), title.to_string());
        self
    }

    pub fn palette(&self, name: &str) -> Option<&[String]> {
        self.palettes.get(name).map(Vec::as_slice)
    }
}

/// `fdd` -> `#fdd`. Only 3 to 6 lowercase hex digits qualify; named colours pass through.
pub fn format_hex(colour: &str) -> String {
    let is_bare_hex = (3..=6).contains(&colour.len())
        && colour.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
    if is_bare_hex {
        format!("#{colour}")
    } else {
        colour.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::LineEnding;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use std::fs;
    use tempfile::TempDir;

    #[rstest]
    #[case("fdd", "#fdd")]
    #[case("00ff00", "#00ff00")]
    #[case("#ddd", "#ddd")]
    #[case("red", "red")]
    #[case("ABC", "ABC")]
    #[case("1234567", "1234567")]
    #[case("ab", "ab")]
    fn formats_bare_hex(#[case] colour: &str, #[case] expected: &str) {
        assert_eq!(format_hex(colour), expected);
    }

    #[test]
    fn defaults_carry_builtin_palettes_and_fonts() {
        let config = Config::default();
        let highlight: Vec<String> = ["yellow", "lime", "#ddd", "#fdd"].map(String::from).into();
        assert_eq!(config.palette("highlight"), Some(&highlight[..]));
        assert_eq!(config.palettes["main"].len(), 8);
        assert_eq!(config.fonts["arial narrow"], "Arial narrow");
        assert_eq!(config.normalize, NormalizeOptions::default());
    }

    #[test]
    fn missing_file_is_none() {
        let dir = TempDir::new().unwrap();
        let loaded = Config::load_from_path(dir.path().join("absent.toml")).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn file_values_merge_over_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("canonhtml.toml");
        fs::write(
            &path,
            r#"
[normalize]
div_to_paragraph = true
code_line_ending = "lf"

[palettes]
brand = ["fa0", "navy"]
highlight = ["lime"]

[fonts]
georgia = "Georgia"
"#,
        )
        .unwrap();

        let config = Config::load_from_path(&path).unwrap().unwrap();
        assert!(config.normalize.apply_div_to_paragraph_fixup);
        assert_eq!(config.normalize.code_line_ending, LineEnding::Lf);
        assert_eq!(config.palette("brand"), Some(&["#fa0".to_string(), "navy".into()][..]));
        assert_eq!(config.palette("highlight"), Some(&["lime".to_string()][..]));
        assert!(config.palette("main").is_some());
        assert_eq!(config.fonts["georgia"], "Georgia");
        assert_eq!(config.fonts["verdana"], "Verdana");
    }

    #[test]
    fn parse_error_names_the_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "[normalize]\npreserve = [\"code.\"]\n").unwrap();

        let err = Config::load_from_path(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ConfigParseError { .. }));
        assert!(err.to_string().contains("bad.toml"));
    }

    #[test]
    fn unknown_sections_are_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("typo.toml");
        fs::write(&path, "[normalise]\ncompact = true\n").unwrap();
        assert!(Config::load_from_path(&path).is_err());
    }
}
