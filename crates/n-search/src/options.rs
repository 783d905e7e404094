//! Search options — `ignorecase`, `smartcase`, `wrapscan`, `gdefault`, `magic`.
//!
//! The engine reads options through [`OptionSource::is_set`], so a host
//! editor can answer from its own option table. [`SearchOptions`] is the
//! stock table: loadable from TOML and adjustable with `:set` directives.
//!
//! # Option names
//!
//! | Full name    | Abbrev | Default |
//! |--------------|--------|---------|
//! | `ignorecase` | `ic`   | false   |
//! | `smartcase`  | `scs`  | false   |
//! | `wrapscan`   | `ws`   | true    |
//! | `gdefault`   | `gd`   | false   |
//! | `magic`      | —      | true    |
//!
//! # Config file
//!
//! ```toml
//! [search]
//! ignorecase = true
//! smartcase = true
//! wrapscan = false
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::info;

use crate::error::SearchError;

// ---------------------------------------------------------------------------
// OptionSource
// ---------------------------------------------------------------------------

/// Read access to boolean options by name (full name or abbreviation).
pub trait OptionSource {
    /// True when the option is on. Unknown names are off.
    fn is_set(&self, name: &str) -> bool;
}

/// Map an abbreviation to its full option name. Unknown names come back as
/// `None`.
#[must_use]
pub fn canonical_name(name: &str) -> Option<&'static str> {
    match name {
        "ignorecase" | "ic" => Some("ignorecase"),
        "smartcase" | "scs" => Some("smartcase"),
        "wrapscan" | "ws" => Some("wrapscan"),
        "gdefault" | "gd" => Some("gdefault"),
        "magic" => Some("magic"),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// SearchOptions
// ---------------------------------------------------------------------------

/// The boolean options that steer searching and substitution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SearchOptions {
    pub ignorecase: bool,
    pub smartcase: bool,
    pub wrapscan: bool,
    pub gdefault: bool,
    pub magic: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            ignorecase: false,
            smartcase: false,
            wrapscan: true,
            gdefault: false,
            magic: true,
        }
    }
}

/// Top-level shape of the config file. Unknown tables are ignored.
#[derive(Debug, Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    search: SearchOptions,
}

impl SearchOptions {
    /// Parse options from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Config`] if the text is not valid TOML or a
    /// field has the wrong type.
    pub fn from_toml(text: &str) -> Result<Self, SearchError> {
        let file: ConfigFile =
            toml::from_str(text).map_err(|e| SearchError::Config(e.to_string()))?;
        Ok(file.search)
    }

    /// Load options from a TOML file. A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Config`] if the file exists but cannot be read
    /// or parsed.
    pub fn load_from(path: &Path) -> Result<Self, SearchError> {
        if !path.exists() {
            info!(target: "config", path = %path.display(), "config_absent_defaults");
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path)
            .map_err(|e| SearchError::Config(format!("{}: {e}", path.display())))?;
        let opts = Self::from_toml(&text)?;
        info!(target: "config", path = %path.display(), ?opts, "config_loaded");
        Ok(opts)
    }

    fn slot(&mut self, name: &str) -> Option<&mut bool> {
        match canonical_name(name)? {
            "ignorecase" => Some(&mut self.ignorecase),
            "smartcase" => Some(&mut self.smartcase),
            "wrapscan" => Some(&mut self.wrapscan),
            "gdefault" => Some(&mut self.gdefault),
            "magic" => Some(&mut self.magic),
            _ => None,
        }
    }

    /// Apply one `:set` directive. Queries return a display string such as
    /// `"noignorecase"`; other directives return `None`.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::UnknownOption`] for names that are not search
    /// options, or for value assignments (all search options are boolean).
    pub fn apply(&mut self, directive: &SetDirective) -> Result<Option<String>, SearchError> {
        let unknown = |name: &str| SearchError::UnknownOption(name.to_string());
        match directive {
            SetDirective::On(name) => {
                *self.slot(name).ok_or_else(|| unknown(name))? = true;
                Ok(None)
            }
            SetDirective::Off(name) => {
                *self.slot(name).ok_or_else(|| unknown(name))? = false;
                Ok(None)
            }
            SetDirective::Toggle(name) => {
                let slot = self.slot(name).ok_or_else(|| unknown(name))?;
                *slot = !*slot;
                Ok(None)
            }
            SetDirective::Query(name) => {
                let full = canonical_name(name).ok_or_else(|| unknown(name))?;
                Ok(Some(format_bool(full, self.is_set(full))))
            }
            SetDirective::Assign(name, value) => Err(unknown(&format!("{name}={value}"))),
            SetDirective::ShowAll => Ok(Some(
                ["ignorecase", "smartcase", "wrapscan", "gdefault", "magic"]
                    .iter()
                    .map(|n| format_bool(n, self.is_set(n)))
                    .collect::<Vec<_>>()
                    .join("  "),
            )),
        }
    }
}

impl OptionSource for SearchOptions {
    fn is_set(&self, name: &str) -> bool {
        match canonical_name(name) {
            Some("ignorecase") => self.ignorecase,
            Some("smartcase") => self.smartcase,
            Some("wrapscan") => self.wrapscan,
            Some("gdefault") => self.gdefault,
            Some("magic") => self.magic,
            _ => false,
        }
    }
}

/// Best-effort config path: `n-ex.toml` in the working directory, then the
/// platform config dir.
#[must_use]
pub fn discover() -> PathBuf {
    let local = PathBuf::from("n-ex.toml");
    if local.exists() {
        return local;
    }
    if let Some(dir) = dirs::config_dir() {
        return dir.join("n-ex").join("n-ex.toml");
    }
    local
}

// ---------------------------------------------------------------------------
// :set parsing
// ---------------------------------------------------------------------------

/// A parsed `:set` argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetDirective {
    /// `:set option`
    On(String),
    /// `:set nooption`
    Off(String),
    /// `:set option!` or `:set invoption`
    Toggle(String),
    /// `:set option?`
    Query(String),
    /// `:set option=value`, parsed so it can be rejected with a message.
    Assign(String, String),
    /// `:set` or `:set all`
    ShowAll,
}

/// Parse the arguments of `:set` into directives.
#[must_use]
pub fn parse_set(args: &str) -> Vec<SetDirective> {
    let trimmed = args.trim();
    if trimmed.is_empty() {
        return vec![SetDirective::ShowAll];
    }
    trimmed.split_whitespace().map(parse_set_arg).collect()
}

/// Parse a single `:set` argument.
#[must_use]
pub fn parse_set_arg(arg: &str) -> SetDirective {
    if arg == "all" {
        return SetDirective::ShowAll;
    }
    if let Some((name, value)) = arg.split_once('=') {
        return SetDirective::Assign(name.to_string(), value.to_string());
    }
    if let Some(name) = arg.strip_suffix('?') {
        return SetDirective::Query(name.to_string());
    }
    if let Some(name) = arg.strip_suffix('!') {
        return SetDirective::Toggle(name.to_string());
    }
    // `no`/`inv` prefixes only when the rest is a real option, so a future
    // option whose name starts with "no" is not misread.
    if let Some(name) = arg.strip_prefix("no") {
        if canonical_name(name).is_some() {
            return SetDirective::Off(name.to_string());
        }
    }
    if let Some(name) = arg.strip_prefix("inv") {
        if canonical_name(name).is_some() {
            return SetDirective::Toggle(name.to_string());
        }
    }
    SetDirective::On(arg.to_string())
}

/// `"name"` when on, `"noname"` when off.
#[must_use]
pub fn format_bool(name: &str, value: bool) -> String {
    if value {
        name.to_string()
    } else {
        format!("no{name}")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    // -- Defaults and lookup ------------------------------------------------

    #[test]
    fn defaults_match_vim() {
        let o = SearchOptions::default();
        assert!(!o.is_set("ignorecase"));
        assert!(!o.is_set("smartcase"));
        assert!(o.is_set("wrapscan"));
        assert!(!o.is_set("gdefault"));
        assert!(o.is_set("magic"));
    }

    #[test]
    fn abbreviations_resolve() {
        let o = SearchOptions {
            ignorecase: true,
            ..SearchOptions::default()
        };
        assert!(o.is_set("ic"));
        assert!(o.is_set("ws"));
        assert!(!o.is_set("scs"));
        assert!(!o.is_set("hlsearch"));
    }

    // -- :set parsing -------------------------------------------------------

    #[test]
    fn parse_set_forms() {
        assert_eq!(parse_set_arg("ic"), SetDirective::On("ic".into()));
        assert_eq!(parse_set_arg("noic"), SetDirective::Off("ic".into()));
        assert_eq!(parse_set_arg("ws!"), SetDirective::Toggle("ws".into()));
        assert_eq!(parse_set_arg("invscs"), SetDirective::Toggle("scs".into()));
        assert_eq!(parse_set_arg("gd?"), SetDirective::Query("gd".into()));
        assert_eq!(
            parse_set_arg("ic=1"),
            SetDirective::Assign("ic".into(), "1".into())
        );
        assert_eq!(parse_set_arg("all"), SetDirective::ShowAll);
    }

    #[test]
    fn parse_set_multiple() {
        assert_eq!(
            parse_set("ic scs nows"),
            vec![
                SetDirective::On("ic".into()),
                SetDirective::On("scs".into()),
                SetDirective::Off("ws".into()),
            ]
        );
        assert_eq!(parse_set("  "), vec![SetDirective::ShowAll]);
    }

    #[test]
    fn no_prefix_needs_known_option() {
        assert_eq!(parse_set_arg("nofoo"), SetDirective::On("nofoo".into()));
    }

    // -- apply --------------------------------------------------------------

    #[test]
    fn apply_directives() {
        let mut o = SearchOptions::default();
        for d in parse_set("ic scs nows gd!") {
            assert_eq!(o.apply(&d).unwrap(), None);
        }
        assert!(o.ignorecase && o.smartcase && o.gdefault);
        assert!(!o.wrapscan);

        let q = o.apply(&SetDirective::Query("ws".into())).unwrap();
        assert_eq!(q.as_deref(), Some("nowrapscan"));
    }

    #[test]
    fn apply_rejects_unknown_and_assignment() {
        let mut o = SearchOptions::default();
        assert!(matches!(
            o.apply(&SetDirective::On("number".into())),
            Err(SearchError::UnknownOption(_))
        ));
        assert!(matches!(
            o.apply(&SetDirective::Assign("ic".into(), "1".into())),
            Err(SearchError::UnknownOption(_))
        ));
    }

    #[test]
    fn show_all_lists_every_option() {
        let mut o = SearchOptions::default();
        let all = o.apply(&SetDirective::ShowAll).unwrap().unwrap();
        assert_eq!(all, "noignorecase  nosmartcase  wrapscan  nogdefault  magic");
    }

    // -- Config file --------------------------------------------------------

    #[test]
    fn toml_partial_table_keeps_defaults() {
        let o = SearchOptions::from_toml("[search]\nignorecase = true\n").unwrap();
        assert!(o.ignorecase);
        assert!(o.wrapscan);
    }

    #[test]
    fn toml_missing_table_is_default() {
        let o = SearchOptions::from_toml("[other]\nx = 1\n").unwrap();
        assert_eq!(o, SearchOptions::default());
    }

    #[test]
    fn toml_wrong_type_is_error() {
        assert!(matches!(
            SearchOptions::from_toml("[search]\nwrapscan = \"yes\"\n"),
            Err(SearchError::Config(_))
        ));
    }

    #[test]
    fn load_from_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let o = SearchOptions::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(o, SearchOptions::default());
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("n-ex.toml");
        fs::write(&path, "[search]\nsmartcase = true\ngdefault = true\n").unwrap();
        let o = SearchOptions::load_from(&path).unwrap();
        assert!(o.smartcase && o.gdefault);
    }
}
