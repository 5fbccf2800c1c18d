//! Maps raw changed paths back to artifact kinds.

use std::path::Path;

use glob::Pattern;

use crate::types::{ArtifactKind, ChangeEvent, ChangeType};

use super::target::{WatchMode, WatchTarget, file_names_equal, glob_options};

#[derive(Debug)]
enum Matcher {
    Exact(String),
    Glob(Pattern),
}

#[derive(Debug)]
struct Rule {
    kind: ArtifactKind,
    matcher: Matcher,
}

/// Reverse lookup from file name to artifact kind.
///
/// Built from the same targets the registrar watched, so any path a backend
/// can report maps back to exactly the kind that requested it.
#[derive(Debug, Default)]
pub struct Classifier {
    rules: Vec<Rule>,
}

impl Classifier {
    pub fn new(targets: &[WatchTarget]) -> Self {
        let mut rules = Vec::with_capacity(targets.len());

        for target in targets {
            let matcher = match target.mode {
                WatchMode::SingleFile => Matcher::Exact(target.filter.clone()),
                WatchMode::DirectoryGlob => match Pattern::new(&target.filter) {
                    Ok(pattern) => Matcher::Glob(pattern),
                    Err(e) => {
                        tracing::error!(
                            "[classifier] invalid filter '{}' for {}: {e}",
                            target.filter,
                            target.kind
                        );
                        continue;
                    }
                },
            };
            rules.push(Rule {
                kind: target.kind,
                matcher,
            });
        }

        Self { rules }
    }

    /// Build a change record for `path`. Unplaceable paths yield `Unknown`.
    pub fn classify(&self, path: &Path, change: ChangeType) -> ChangeEvent {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return ChangeEvent::unknown(path, change);
        };

        let kind = self
            .rules
            .iter()
            .find(|rule| match &rule.matcher {
                Matcher::Exact(expected) => file_names_equal(expected, name),
                Matcher::Glob(pattern) => pattern.matches_with(name, glob_options()),
            })
            .map(|rule| rule.kind);

        match kind {
            Some(kind) => ChangeEvent {
                kind,
                name: name.to_string(),
                change,
                path: path.to_path_buf(),
            },
            None => ChangeEvent::unknown(path, change),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::watcher::target::{ArtifactNames, DefaultArtifactNames, TargetResolver};
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::sync::Arc;

    fn default_classifier() -> Classifier {
        let resolver = TargetResolver::new(
            Arc::new(DefaultArtifactNames),
            Arc::new(HashMap::<String, String>::new()),
        );
        Classifier::new(&resolver.resolve_all())
    }

    #[test]
    fn test_known_file() {
        let classifier = default_classifier();
        let path = PathBuf::from("/srv/settings/SiteManagerSettings.xml");

        let event = classifier.classify(&path, ChangeType::Changed);
        assert_eq!(event.kind, ArtifactKind::SiteManagerSettings);
        assert_eq!(event.name, "SiteManagerSettings.xml");
        assert_eq!(event.path, path);
        assert_eq!(event.change, ChangeType::Changed);
    }

    #[test]
    fn test_every_single_file_kind_round_trips() {
        let classifier = default_classifier();
        for kind in ArtifactKind::ALL {
            let Some(name) = DefaultArtifactNames.filename_for(kind) else {
                continue;
            };
            let event = classifier.classify(&Path::new("/any").join(&name), ChangeType::Changed);
            assert_eq!(event.kind, kind);
        }
    }

    #[test]
    fn test_glob_kind() {
        let classifier = default_classifier();
        let event = classifier.classify(Path::new("/dcc/chiller-3.spo"), ChangeType::Deleted);
        assert_eq!(event.kind, ArtifactKind::DataCollectionConfiguration);
        assert_eq!(event.change, ChangeType::Deleted);
        assert_eq!(event.name, "chiller-3.spo");
    }

    #[test]
    fn test_unrecognised_path_is_unknown() {
        let classifier = default_classifier();
        for path in ["/srv/settings/notes.txt", "/dcc/chiller.spo.bak", "/"] {
            let event = classifier.classify(Path::new(path), ChangeType::Created);
            assert!(event.kind.is_unknown(), "{path}");
        }
    }

    #[test]
    fn test_empty_classifier_knows_nothing() {
        let classifier = Classifier::default();
        let event = classifier.classify(Path::new("/x/SiteManagerSettings.xml"), ChangeType::Changed);
        assert!(event.kind.is_unknown());
    }
}
