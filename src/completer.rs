//! Tab completion for the interactive prompt.

use parking_lot::RwLock;
use rustyline::completion::{Completer, Pair};
use rustyline::highlight::Highlighter;
use rustyline::hint::{Hint, Hinter};
use rustyline::validate::Validator;
use rustyline::{Context as ReadlineContext, Helper};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use walkdir::WalkDir;

/// Characters that end a completion word.
const WORD_DELIMITERS: &str = "`~!@#$%^&*()-=+[{]}\\|;:'\",<>? \t\n";

/// Words offered for completion; refreshed by the engine before every prompt.
#[derive(Debug, Clone, Default)]
pub struct Vocabulary(Arc<RwLock<BTreeSet<String>>>);

impl Vocabulary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&self) {
        self.0.write().clear();
    }

    pub fn extend<I, S>(&self, words: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.0.write().extend(words.into_iter().map(Into::into));
    }

    pub fn len(&self) -> usize {
        self.0.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.read().is_empty()
    }

    pub fn contains(&self, word: &str) -> bool {
        self.0.read().contains(word)
    }

    /// Known words starting with `fragment` as typed or lower-cased.
    pub fn matches(&self, fragment: &str) -> Vec<String> {
        let lowered = fragment.to_lowercase();
        self.0
            .read()
            .iter()
            .filter(|word| word.starts_with(fragment) || word.starts_with(&lowered))
            .cloned()
            .collect()
    }
}

/// Names of the files directly inside each directory prefix.
///
/// Directory options carry their trailing separator, so the prefix is used
/// verbatim.
pub fn path_file_names<'a>(directories: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut names = BTreeSet::new();
    for dir in directories {
        if dir.is_empty() || !Path::new(dir).is_dir() {
            continue;
        }
        for entry in WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(Result::ok)
        {
            if let Some(name) = entry.file_name().to_str() {
                names.insert(name.to_string());
            }
        }
    }
    names.into_iter().collect()
}

/// Filesystem entries whose path starts with `fragment`.
fn filesystem_matches(fragment: &str) -> Vec<String> {
    let (dir, prefix, display_dir) = match fragment.rfind('/') {
        Some(idx) => {
            let dir = &fragment[..=idx];
            (dir.to_string(), &fragment[idx + 1..], dir.to_string())
        }
        None => (".".to_string(), fragment, String::new()),
    };
    if !Path::new(&dir).is_dir() {
        return Vec::new();
    }
    WalkDir::new(&dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(Result::ok)
        .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
        .filter(|name| name.starts_with(prefix))
        .map(|name| format!("{display_dir}{name}"))
        .collect()
}

#[derive(Clone, Debug)]
pub struct SuffixHint(String);

impl Hint for SuffixHint {
    fn display(&self) -> &str {
        &self.0
    }

    fn completion(&self) -> Option<&str> {
        Some(&self.0)
    }
}

/// Rustyline helper backed by the shared [`Vocabulary`].
#[derive(Clone, Debug)]
pub struct AitessHelper {
    vocabulary: Vocabulary,
}

impl AitessHelper {
    pub fn new(vocabulary: Vocabulary) -> Self {
        Self { vocabulary }
    }

    fn candidates(&self, fragment: &str) -> Vec<String> {
        let mut words: BTreeSet<String> = self.vocabulary.matches(fragment).into_iter().collect();
        words.extend(filesystem_matches(fragment));
        words.into_iter().collect()
    }
}

impl Helper for AitessHelper {}

impl Completer for AitessHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &ReadlineContext<'_>,
    ) -> Result<(usize, Vec<Pair>), rustyline::error::ReadlineError> {
        let start = line[..pos]
            .rfind(|c: char| WORD_DELIMITERS.contains(c))
            .map(|idx| idx + 1)
            .unwrap_or(0);
        let fragment = &line[start..pos];
        let candidates = self
            .candidates(fragment)
            .into_iter()
            .map(|word| Pair {
                display: word.clone(),
                replacement: word,
            })
            .collect();
        Ok((start, candidates))
    }
}

impl Hinter for AitessHelper {
    type Hint = SuffixHint;

    fn hint(&self, line: &str, pos: usize, ctx: &ReadlineContext<'_>) -> Option<Self::Hint> {
        if pos < line.len() {
            return None;
        }
        let (start, mut candidates) = self.complete(line, pos, ctx).ok()?;
        if candidates.len() != 1 || pos == start {
            return None;
        }
        let completion = candidates.remove(0).replacement;
        completion
            .get(pos - start..)
            .filter(|suffix| !suffix.is_empty())
            .map(|suffix| SuffixHint(suffix.to_string()))
    }
}

impl Highlighter for AitessHelper {}

impl Validator for AitessHelper {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn matches_typed_or_lowercased_prefix() {
        let vocabulary = Vocabulary::new();
        vocabulary.extend(["purge_file", "purge_configuration", "print", "ALT"]);
        assert_eq!(
            vocabulary.matches("PURGE_F"),
            vec!["purge_file".to_string()]
        );
        assert_eq!(vocabulary.matches("AL"), vec!["ALT".to_string()]);
        vocabulary.clear();
        assert!(vocabulary.is_empty());
    }

    #[test]
    fn lists_files_of_configured_directories() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.tpf"), "").unwrap();
        fs::write(dir.path().join("a.tpf"), "").unwrap();
        let prefix = format!("{}/", dir.path().display());
        assert_eq!(
            path_file_names([prefix.as_str(), "", "/nonexistent/"]),
            vec!["a.tpf".to_string(), "b.tpf".to_string()]
        );
    }

    #[test]
    fn completes_paths_with_directory_prefix() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("plan.tpf"), "").unwrap();
        let fragment = format!("{}/pl", dir.path().display());
        assert_eq!(
            filesystem_matches(&fragment),
            vec![format!("{}/plan.tpf", dir.path().display())]
        );
    }
}
