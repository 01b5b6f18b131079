use crate::config::atomic_rename;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

/// Two integers: the best score and the time it was achieved in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct HighScore {
    pub(crate) score: u32,
    pub(crate) time: u32,
}

impl HighScore {
    /// Score is primary; equal scores are broken by the lower time.
    pub(crate) fn beaten_by(&self, score: u32, time: u32) -> bool {
        score > self.score || (score == self.score && time < self.time)
    }
}

/// A missing or unreadable file reads as "no prior high score".
pub(crate) fn load_high_score(path: &Path) -> HighScore {
    if let Ok(s) = fs::read_to_string(path) {
        if let Ok(v) = serde_json::from_str::<HighScore>(&s) {
            return v;
        }
    }
    HighScore::default()
}

pub(crate) fn save_high_score_atomic(path: &Path, hs: &HighScore) -> Result<()> {
    let tmp = path.with_extension("json.tmp");
    let data = serde_json::to_vec_pretty(hs)?;
    fs::write(&tmp, data)?;
    atomic_rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_file_reads_as_zero_zero() {
        let dir = tempfile::tempdir().unwrap();
        let hs = load_high_score(&dir.path().join("highscore.json"));
        assert_eq!(hs, HighScore { score: 0, time: 0 });
    }

    #[test]
    fn garbage_file_reads_as_zero_zero() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("highscore.json");
        fs::write(&path, "not json").unwrap();
        assert_eq!(load_high_score(&path), HighScore::default());
    }

    #[test]
    fn first_finish_always_beats_the_empty_record() {
        let best = HighScore::default();
        assert!(best.beaten_by(3, 10));
    }

    #[test]
    fn tiebreak_prefers_lower_time() {
        let best = HighScore { score: 3, time: 10 };
        assert!(best.beaten_by(3, 9));
        assert!(!best.beaten_by(3, 10));
        assert!(!best.beaten_by(3, 11));
        assert!(best.beaten_by(4, 99));
        assert!(!best.beaten_by(2, 1));
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("highscore.json");
        let hs = HighScore { score: 7, time: 42 };
        save_high_score_atomic(&path, &hs).unwrap();
        assert_eq!(load_high_score(&path), hs);
        assert!(!path.with_extension("json.tmp").exists());
    }
}
