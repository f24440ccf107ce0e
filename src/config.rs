//! Reader for the `config.dat` option file.
//!
//! Lines are stored verbatim (trimmed). Lookups always scan the raw lines
//! and then apply a per-option filter against the current filesystem, so
//! values never go stale and filtering never mutates the store.

use directories::BaseDirs;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

static LINE_GRAMMAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\A(((\w+\s*=\s*(?:\w|/|\.|-)+)?\s*(!.*))|((\w+\s*=\s*(?:\w|/|\.|-)*)\s*(!.*)?)|(\s*))\z",
    )
    .expect("configuration line grammar is valid")
});

/// Every option the runtime understands, in listing order.
pub const OPTION_NAMES: [&str; 20] = [
    "project",
    "uut",
    "usecache",
    "rdfversions",
    "sysdbfpath",
    "sysdbf",
    "sysmacpath",
    "sysmacfile",
    "syslibpath",
    "syslibfile",
    "usrdbfpath",
    "usrdbf",
    "usrmacpath",
    "usrmacfile",
    "usrlibpath",
    "usrlibfile",
    "tpfpath",
    "rdfpath",
    "downloadpath",
    "uploadpath",
];

const IDENTITY_OPTIONS: [&str; 2] = ["project", "uut"];

const PATH_OPTIONS: [&str; 6] = [
    "sysdbfpath",
    "sysmacpath",
    "syslibpath",
    "usrdbfpath",
    "usrmacpath",
    "usrlibpath",
];

const DIRECTORY_OPTIONS: [&str; 4] = ["tpfpath", "rdfpath", "downloadpath", "uploadpath"];

const BOOLEAN_OPTIONS: [&str; 2] = ["usecache", "rdfversions"];

/// File option paired with the path option it lives under.
const FILE_OPTIONS: [(&str, &str); 6] = [
    ("sysdbf", "sysdbfpath"),
    ("sysmacfile", "sysmacpath"),
    ("syslibfile", "syslibpath"),
    ("usrdbf", "usrdbfpath"),
    ("usrmacfile", "usrmacpath"),
    ("usrlibfile", "usrlibpath"),
];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Syntax error on line number {line} in configuration file")]
    Syntax { line: usize },
    #[error("unable to read configuration file '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Hardware classification the runtime is configured against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitUnderTest {
    Adc,
    Ladc,
    DfccMk1,
    DfccMk1a,
    DfccMk2,
}

impl UnitUnderTest {
    /// Case-sensitive match against the tags accepted in `config.dat`.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "adc" => Some(Self::Adc),
            "ladc" => Some(Self::Ladc),
            "dfcc" | "dfcc_mk1" => Some(Self::DfccMk1),
            "dfcc_mk1a" => Some(Self::DfccMk1a),
            "dfcc_mk2" => Some(Self::DfccMk2),
            _ => None,
        }
    }

    /// Code handed to the hardware transport.
    pub fn code(self) -> u8 {
        match self {
            Self::Adc => 1,
            Self::DfccMk1 | Self::DfccMk1a | Self::DfccMk2 => 2,
            Self::Ladc => 3,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Adc => "ADC",
            Self::Ladc => "LADC",
            Self::DfccMk1 => "DFCC Mk1",
            Self::DfccMk1a => "DFCC Mk1A",
            Self::DfccMk2 => "DFCC Mk2",
        }
    }
}

impl fmt::Display for UnitUnderTest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Parsed `config.dat`.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
    lines: Vec<String>,
    home: PathBuf,
}

impl ConfigStore {
    /// Read and validate the file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut store = Self::parse(&text)?;
        store.path = path.to_path_buf();
        tracing::debug!(path = %path.display(), lines = store.lines.len(), "configuration loaded");
        Ok(store)
    }

    /// Validate `text` line by line; the first bad line fails the whole store.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let mut lines = Vec::new();
        for (index, line) in text.lines().enumerate() {
            let line = line.trim();
            if !LINE_GRAMMAR.is_match(line) {
                return Err(ConfigError::Syntax { line: index + 1 });
            }
            lines.push(line.to_string());
        }
        Ok(Self {
            path: PathBuf::new(),
            lines,
            home: home_dir(),
        })
    }

    /// Replace the directory used for `~` expansion and directory fallbacks.
    pub fn with_home(mut self, home: impl Into<PathBuf>) -> Self {
        self.home = home.into();
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Value of `option`, filtered unless `filter` is false.
    ///
    /// Unknown options yield an empty string.
    pub fn get_value(&self, option: &str, filter: bool) -> String {
        let option = option.to_lowercase();
        let raw = self.raw_value(&option);
        if filter && !IDENTITY_OPTIONS.contains(&option.as_str()) {
            self.filter(&option, &raw)
        } else {
            raw
        }
    }

    pub fn value(&self, option: &str) -> String {
        self.get_value(option, true)
    }

    pub fn raw_value(&self, option: &str) -> String {
        let option = option.to_lowercase();
        for line in &self.lines {
            let assignment = line.split('!').next().unwrap_or_default();
            let mut parts = assignment.split('=');
            let key = parts.next().unwrap_or_default().trim().to_lowercase();
            if key != option {
                continue;
            }
            if let Some(value) = parts.next() {
                return value.trim().to_string();
            }
        }
        String::new()
    }

    /// Contextual filter for one option; consults sibling options as they
    /// currently resolve.
    pub fn filter(&self, option: &str, value: &str) -> String {
        if let Some((_, companion)) = FILE_OPTIONS.iter().find(|(file, _)| *file == option) {
            let directory = self.value(companion);
            if directory.is_empty() || !Path::new(&format!("{directory}{value}")).exists() {
                return String::new();
            }
            return value.to_string();
        }
        if PATH_OPTIONS.contains(&option) {
            return if Path::new(value).exists() {
                value.to_string()
            } else {
                String::new()
            };
        }
        if DIRECTORY_OPTIONS.contains(&option) {
            return if Path::new(value).exists() {
                value.to_string()
            } else {
                format!("{}/", self.home.display())
            };
        }
        if BOOLEAN_OPTIONS.contains(&option) {
            return if value.eq_ignore_ascii_case("true") {
                "true".to_string()
            } else {
                "false".to_string()
            };
        }
        value.to_string()
    }

    pub fn use_cache(&self) -> bool {
        self.value("usecache") == "true"
    }

    pub fn rdf_versions(&self) -> bool {
        self.value("rdfversions") == "true"
    }

    pub fn is_uut_recognized(&self) -> bool {
        UnitUnderTest::from_tag(&self.value("uut")).is_some()
    }

    /// Configured unit under test; anything unrecognized counts as LADC.
    pub fn unit_under_test(&self) -> UnitUnderTest {
        UnitUnderTest::from_tag(&self.value("uut")).unwrap_or(UnitUnderTest::Ladc)
    }

    pub fn is_configured_for_adc(&self) -> bool {
        self.unit_under_test() == UnitUnderTest::Adc
    }

    pub fn is_configured_for_ladc(&self) -> bool {
        self.unit_under_test() == UnitUnderTest::Ladc
    }

    pub fn is_configured_for_dfcc(&self) -> bool {
        self.unit_under_test() == UnitUnderTest::DfccMk1
    }

    pub fn is_configured_for_dfcc_mk1a(&self) -> bool {
        self.unit_under_test() == UnitUnderTest::DfccMk1a
    }

    pub fn is_configured_for_dfcc_mk2(&self) -> bool {
        self.unit_under_test() == UnitUnderTest::DfccMk2
    }

    pub fn resolve_tpf_path(&self, filename: &str) -> PathBuf {
        self.resolve_with_expansion(filename, "tpfpath")
    }

    pub fn resolve_rdf_path(&self, filename: &str) -> PathBuf {
        self.resolve_with_expansion(filename, "rdfpath")
    }

    pub fn resolve_download_path(&self, filename: &str) -> PathBuf {
        self.resolve_plain(filename, "downloadpath")
    }

    pub fn resolve_upload_path(&self, filename: &str) -> PathBuf {
        self.resolve_plain(filename, "uploadpath")
    }

    fn resolve_with_expansion(&self, filename: &str, directory_option: &str) -> PathBuf {
        let expanded = self.expand_home(filename);
        if let Some(relative) = expanded.strip_prefix("./") {
            let cwd = std::env::current_dir().unwrap_or_default();
            return cwd.join(relative);
        }
        self.resolve_plain(&expanded, directory_option)
    }

    fn resolve_plain(&self, filename: &str, directory_option: &str) -> PathBuf {
        if filename.starts_with('/') {
            PathBuf::from(filename)
        } else {
            PathBuf::from(format!("{}{filename}", self.value(directory_option)))
        }
    }

    fn expand_home(&self, filename: &str) -> String {
        if filename == "~" {
            return self.home.display().to_string();
        }
        match filename.strip_prefix("~/") {
            Some(rest) => format!("{}/{rest}", self.home.display()),
            None => filename.to_string(),
        }
    }

    /// One notice per path or file option whose filtered value differs from
    /// what the file says.
    pub fn check_configuration(&self) -> Vec<String> {
        let file_name = self
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "config.dat".to_string());
        OPTION_NAMES
            .iter()
            .filter(|option| {
                PATH_OPTIONS.contains(option)
                    || DIRECTORY_OPTIONS.contains(option)
                    || FILE_OPTIONS.iter().any(|(file, _)| file == *option)
            })
            .filter_map(|option| {
                let raw = self.raw_value(option);
                let filtered = self.value(option);
                (raw != filtered).then(|| {
                    format!(
                        "{file_name}: '{option}={}' => '{option}={}'",
                        raw,
                        nil_if_empty(&filtered)
                    )
                })
            })
            .collect()
    }

    /// `(option, filtered value)` rows in listing order.
    pub fn listing(&self) -> Vec<(&'static str, String)> {
        OPTION_NAMES
            .iter()
            .map(|option| (*option, self.value(option)))
            .collect()
    }
}

fn nil_if_empty(value: &str) -> &str {
    if value.is_empty() {
        "«nil»"
    } else {
        value
    }
}

fn home_dir() -> PathBuf {
    BaseDirs::new()
        .map(|dirs| dirs.home_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("/"))
}
