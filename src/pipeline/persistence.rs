// to be called on main startup and quit; saves the pad session so we can reload it later,
// and stores exported beats in a little json library next to it
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::pipeline::pattern::{CornerSet, Pattern};
use crate::pipeline::project::{EngineConfig, ProjectState};

pub const BLENDPAD_DIR: &str = ".blendpad";
const PROJECT_FILE: &str = "project.json";
const CONFIG_FILE: &str = "config.json";
const BEATS_DIR: &str = "beats";

// <project_dir>/.blendpad
pub fn data_dir(project_dir: &Path) -> PathBuf {
    project_dir.join(BLENDPAD_DIR)
}

// <project_dir>/.blendpad/project.json
fn project_file_path(project_dir: &Path) -> PathBuf {
    data_dir(project_dir).join(PROJECT_FILE)
}

pub fn beats_dir(project_dir: &Path) -> PathBuf {
    data_dir(project_dir).join(BEATS_DIR)
}

pub fn load_project(project_dir: &Path) -> Option<ProjectState> {
    let path = project_file_path(project_dir);
    let data = std::fs::read_to_string(&path).ok()?;
    match serde_json::from_str(&data) {
        Ok(state) => Some(state),
        Err(e) => {
            log::warn!("ignoring unreadable session {}: {e}", path.display());
            None
        }
    }
}

// Save the session to disk, making the files if they don't exist already
pub fn save_project(project_dir: &Path, state: &ProjectState) -> anyhow::Result<()> {
    let path = project_file_path(project_dir);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?; // create .blendpad/ if needed
    }
    let json = serde_json::to_string_pretty(state)?;
    std::fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

// Missing config is fine (defaults); a broken one is an error so typos don't go unnoticed.
pub fn load_config(project_dir: &Path) -> anyhow::Result<EngineConfig> {
    let path = data_dir(project_dir).join(CONFIG_FILE);
    if !path.exists() {
        return Ok(EngineConfig::default());
    }
    let data = std::fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
    let config: EngineConfig =
        serde_json::from_str(&data).with_context(|| format!("parsing {}", path.display()))?;
    Ok(config.sanitized())
}

// What gets stored for an exported beat. The engine only fills in musical
// metadata; where it ends up is the writer's business.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BeatDescriptor {
    pub title: String,
    pub bpm: f32,
    pub duration: f64, // seconds, 2 decimals
    pub bars: u32,
    pub pattern: Pattern,
    pub genres: Vec<String>,
    pub moods: Vec<String>,
    pub description: String,
    pub corner_presets: CornerSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_file: Option<String>,
}

pub trait PersistenceWriter {
    // Returns the id the beat was stored under.
    fn save(&mut self, beat: &BeatDescriptor) -> anyhow::Result<String>;
}

static NEXT_BEAT: AtomicU64 = AtomicU64::new(0);

pub fn unix_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
}

// fresh id per export, unique even when two land in the same millisecond
pub fn next_beat_id() -> String {
    format!("beat-{}-{}", unix_millis(), NEXT_BEAT.fetch_add(1, Ordering::Relaxed))
}

// One json file per beat in <project_dir>/.blendpad/beats/
pub struct JsonLibrary {
    dir: PathBuf,
}

impl JsonLibrary {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn load(&self, id: &str) -> anyhow::Result<BeatDescriptor> {
        let path = self.dir.join(format!("{id}.json"));
        let data = std::fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
        Ok(serde_json::from_str(&data)?)
    }
}

impl PersistenceWriter for JsonLibrary {
    fn save(&mut self, beat: &BeatDescriptor) -> anyhow::Result<String> {
        std::fs::create_dir_all(&self.dir)?;
        let id = next_beat_id();
        let path = self.dir.join(format!("{id}.json"));
        let json = serde_json::to_string_pretty(beat)?;
        std::fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
        log::info!("saved beat {:?} as {id}", beat.title);
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("beatblend-{name}-{}", next_beat_id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn session_survives_a_save_load_cycle() {
        let dir = scratch_dir("session");
        let mut state = ProjectState::default();
        state.bpm = 97.0;
        state.corner_presets.b = "Funk".to_string();
        save_project(&dir, &state).unwrap();
        assert_eq!(load_project(&dir), Some(state));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn missing_session_and_config_use_defaults() {
        let dir = scratch_dir("empty");
        assert!(load_project(&dir).is_none());
        assert_eq!(load_config(&dir).unwrap(), EngineConfig::default());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn broken_config_is_an_error() {
        let dir = scratch_dir("config");
        std::fs::create_dir_all(data_dir(&dir)).unwrap();
        std::fs::write(data_dir(&dir).join(CONFIG_FILE), "{ steps: ").unwrap();
        assert!(load_config(&dir).is_err());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn library_writes_one_file_per_beat() {
        let dir = scratch_dir("library");
        let mut library = JsonLibrary::new(beats_dir(&dir));
        let state = ProjectState::default();
        let beat = BeatDescriptor {
            title: "test".to_string(),
            bpm: 120.0,
            duration: 2.0,
            bars: 1,
            pattern: state.pattern.clone(),
            genres: vec!["Rock 1".to_string()],
            moods: vec![],
            description: "120 BPM · grid beat".to_string(),
            corner_presets: state.corner_presets.clone(),
            audio_file: None,
        };
        let first = library.save(&beat).unwrap();
        let second = library.save(&beat).unwrap();
        assert_ne!(first, second);
        assert_eq!(library.load(&first).unwrap(), beat);
        std::fs::remove_dir_all(&dir).ok();
    }
}
