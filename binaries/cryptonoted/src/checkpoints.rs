//! Loads a checkpoints file: one `height,hash` pair per line, `#`-prefixed
//! lines and blank lines ignored, matching the reference daemon's
//! `checkpoints.txt` format.

use std::path::Path;

use cryptonote_consensus_rules::Checkpoints;
use cryptonote_types::Hash;

/// A checkpoints file line could not be parsed.
#[derive(Debug, thiserror::Error)]
pub enum CheckpointsFileError {
    #[error("failed to read checkpoints file {path}: {source}")]
    Read {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed checkpoints line {line_number}: {line:?}")]
    Malformed { line_number: usize, line: String },
    #[error("checkpoints line {line_number} conflicts with an earlier one: {source}")]
    Conflict {
        line_number: usize,
        #[source]
        source: cryptonote_consensus_rules::CheckpointConflict,
    },
}

/// Loads a [`Checkpoints`] set from `path`. Returns an empty set if `path`
/// is `None`.
pub fn load(path: Option<&Path>) -> Result<Checkpoints, CheckpointsFileError> {
    let Some(path) = path else {
        return Ok(Checkpoints::new());
    };

    let text = std::fs::read_to_string(path).map_err(|source| CheckpointsFileError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let mut checkpoints = Checkpoints::new();
    for (index, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let line_number = index + 1;
        let (height, hash) = line.split_once(',').ok_or_else(|| CheckpointsFileError::Malformed {
            line_number,
            line: line.to_owned(),
        })?;
        let height: u64 = height.trim().parse().map_err(|_| CheckpointsFileError::Malformed {
            line_number,
            line: line.to_owned(),
        })?;
        let hash: Hash = hash.trim().parse().map_err(|_| CheckpointsFileError::Malformed {
            line_number,
            line: line.to_owned(),
        })?;

        checkpoints
            .add(height, hash)
            .map_err(|source| CheckpointsFileError::Conflict { line_number, source })?;
    }

    Ok(checkpoints)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn no_path_is_an_empty_set() {
        let checkpoints = load(None).unwrap();
        assert!(checkpoints.is_empty());
    }

    #[test]
    fn parses_height_hash_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("checkpoints.txt");
        std::fs::write(
            &path,
            "# a comment\n\n1000,0000000000000000000000000000000000000000000000000000000000000001\n",
        )
        .unwrap();

        let checkpoints = load(Some(&path)).unwrap();
        assert_eq!(
            checkpoints.hash_at(1000),
            Some(Hash([
                0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
                0, 0, 0, 1
            ]))
        );
    }

    #[test]
    fn rejects_malformed_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("checkpoints.txt");
        std::fs::write(&path, "not-a-valid-line\n").unwrap();

        assert!(matches!(
            load(Some(&path)),
            Err(CheckpointsFileError::Malformed { line_number: 1, .. })
        ));
    }
}
