//! Saving episodes to disk.
//!
//! Saved envelopes are written as pretty-printed JSON, one episode per
//! file. How the envelope was produced (standard or compact) is preserved;
//! format detection on load happens through the envelope's own `format`
//! tag.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use duet_events::SavedEpisode;

/// Errors that can occur while reading or writing episode files.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Writes a saved episode to the given path, overwriting any existing
/// file.
pub fn save_episode(saved: &SavedEpisode, path: &Path) -> Result<(), PersistenceError> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, saved)?;
    Ok(())
}

/// Reads a saved episode back from the given path.
pub fn load_episode(path: &Path) -> Result<SavedEpisode, PersistenceError> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    Ok(serde_json::from_reader(reader)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use duet_events::fixtures::fixture_registry;
    use duet_events::{AgentId, Event};

    use crate::episode::{Episode, SaveFormat};

    fn sample_episode() -> Episode {
        let mut episode = Episode::new(
            AgentId::new("a").unwrap(),
            AgentId::new("b").unwrap(),
        );
        episode.append(Event::utterance(Utc::now(), AgentId::new("a").unwrap(), "hi"));
        episode
    }

    #[test]
    fn test_file_round_trip_standard() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("episode.json");

        let episode = sample_episode();
        save_episode(&episode.save(SaveFormat::Standard), &path).unwrap();

        let loaded = Episode::load(load_episode(&path).unwrap(), &fixture_registry()).unwrap();
        assert_eq!(loaded, episode);
    }

    #[test]
    fn test_file_round_trip_compact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("episode.json");

        let episode = sample_episode();
        save_episode(&episode.save(SaveFormat::Compact), &path).unwrap();

        let saved = load_episode(&path).unwrap();
        assert!(saved.is_compact());
        let loaded = Episode::load(saved, &fixture_registry()).unwrap();
        assert_eq!(loaded, episode);
    }

    #[test]
    fn test_overwrites_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("episode.json");

        let first = sample_episode();
        let second = sample_episode();
        save_episode(&first.save(SaveFormat::Standard), &path).unwrap();
        save_episode(&second.save(SaveFormat::Standard), &path).unwrap();

        let loaded = Episode::load(load_episode(&path).unwrap(), &fixture_registry()).unwrap();
        assert_eq!(loaded, second);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_episode(Path::new("no/such/episode.json")).unwrap_err();
        assert!(matches!(err, PersistenceError::Io(_)));
    }

    #[test]
    fn test_garbage_file_is_json_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("episode.json");
        std::fs::write(&path, "not json at all").unwrap();

        let err = load_episode(&path).unwrap_err();
        assert!(matches!(err, PersistenceError::Json(_)));
    }
}
