use anyhow::{ensure, Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::model::{COIN_COUNT, OBSTACLE_COUNT};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub(crate) struct Settings {
    pub(crate) rows: i32,
    pub(crate) cols: i32,
    pub(crate) lanes: usize,
    pub(crate) frog_sign: char,
    pub(crate) car_sign: char,
    pub(crate) car_speed: u32,
    pub(crate) car_length: i32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            rows: 20,
            cols: 30,
            lanes: 9,
            frog_sign: '@',
            car_sign: '#',
            car_speed: 3,
            car_length: 3,
        }
    }
}

pub(crate) struct Paths {
    pub(crate) settings_path: PathBuf,
    pub(crate) high_score_path: PathBuf,
}

pub(crate) fn project_paths() -> Result<Paths> {
    let proj = ProjectDirs::from("com", "roadhopper", "Roadhopper")
        .context("could not resolve project directories")?;
    let dir = proj.data_local_dir().to_path_buf();
    fs::create_dir_all(&dir).ok();
    Ok(Paths {
        settings_path: dir.join("settings.json"),
        high_score_path: dir.join("highscore.json"),
    })
}

/// All-or-nothing: any read or parse failure yields the complete default set,
/// never a partial mix.
pub(crate) fn load_settings(path: &Path) -> Settings {
    if let Ok(s) = fs::read_to_string(path) {
        if let Ok(v) = serde_json::from_str::<Settings>(&s) {
            return v;
        }
    }
    Settings::default()
}

/// Rejects geometry the round generator could not terminate on. Runs once at
/// startup, before anything is drawn.
pub(crate) fn validate(s: &Settings) -> Result<()> {
    ensure!(
        s.rows >= 6 && s.cols >= 5,
        "playfield too small: {}x{} (need at least 6x5)",
        s.rows,
        s.cols
    );
    ensure!(
        s.lanes >= 1 && (s.lanes as i32) <= s.rows - 4,
        "lane count {} does not fit {} rows",
        s.lanes,
        s.rows
    );
    ensure!(s.car_speed >= 1, "car speed must be at least 1");
    ensure!(
        s.car_length >= 1 && s.car_length < s.cols - 2,
        "car length {} does not fit {} columns",
        s.car_length,
        s.cols
    );

    // Interior rows minus the destination row and the road rows must leave
    // strictly more grass than the obstacle and coin scatter consumes.
    let grass_capacity = (s.rows - 3 - s.lanes as i32) * (s.cols - 2);
    ensure!(
        grass_capacity > (OBSTACLE_COUNT + COIN_COUNT) as i32,
        "not enough grass for {} obstacles and {} coins ({} cells free)",
        OBSTACLE_COUNT,
        COIN_COUNT,
        grass_capacity
    );
    Ok(())
}

// Best-effort atomic replace on same filesystem.
pub(crate) fn atomic_rename(from: &Path, to: &Path) -> Result<()> {
    if to.exists() {
        let _ = fs::remove_file(to);
    }
    fs::rename(from, to)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let s = Settings::default();
        assert_eq!(s.rows, 20);
        assert_eq!(s.cols, 30);
        assert_eq!(s.lanes, 9);
        assert_eq!(s.frog_sign, '@');
        assert_eq!(s.car_sign, '#');
        assert_eq!(s.car_speed, 3);
        assert_eq!(s.car_length, 3);
        assert!(validate(&s).is_ok());
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let s = load_settings(&dir.path().join("nope.json"));
        assert_eq!(s.rows, Settings::default().rows);
    }

    #[test]
    fn malformed_file_falls_back_to_full_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        // rows present but the rest missing: serde rejects the whole file
        fs::write(&path, r#"{"rows": 40}"#).unwrap();
        let s = load_settings(&path);
        assert_eq!(s.rows, 20);
        assert_eq!(s.cols, 30);
    }

    #[test]
    fn valid_file_is_honored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let mut custom = Settings::default();
        custom.rows = 24;
        custom.frog_sign = 'F';
        fs::write(&path, serde_json::to_string(&custom).unwrap()).unwrap();
        let s = load_settings(&path);
        assert_eq!(s.rows, 24);
        assert_eq!(s.frog_sign, 'F');
    }

    #[test]
    fn validation_rejects_bad_geometry() {
        let mut s = Settings::default();
        s.lanes = 17; // 20 rows fit at most 16 lanes
        assert!(validate(&s).is_err());

        let mut s = Settings::default();
        s.car_length = 28; // cols - 2
        assert!(validate(&s).is_err());

        let mut s = Settings::default();
        s.car_speed = 0;
        assert!(validate(&s).is_err());

        // 9 lanes in 12 rows leaves no grass for the scatter
        let mut s = Settings::default();
        s.rows = 12;
        s.lanes = 8;
        assert!(validate(&s).is_err());
    }
}
