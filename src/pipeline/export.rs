// Bounce the current beat to a WAV and file it in the beat library.
use std::path::Path;

use crate::audio::render::{render_offline, write_wav};
use crate::loader::sample_loader::Kit;
use crate::middle::Middle;
use crate::pipeline::persistence::PersistenceWriter;

// Renders one bar into `audio_path`, then stores the descriptor through
// `writer`. Returns the id the writer assigned.
pub fn export_beat(
    middle: &Middle,
    title: &str,
    kit: &Kit,
    sample_rate: u32,
    audio_path: &Path,
    writer: &mut impl PersistenceWriter,
) -> anyhow::Result<String> {
    let frames = render_offline(kit, &middle.bar_schedule(), middle.bar_duration(), sample_rate);
    write_wav(audio_path, &frames, sample_rate)?;

    let mut beat = middle.beat_descriptor(title);
    beat.audio_file = audio_path.file_name().map(|n| n.to_string_lossy().into_owned());
    let id = writer.save(&beat)?;
    log::info!("exported {:?} ({} s, {} frames) as {id}", beat.title, beat.duration, frames.len());
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModelClient;
    use crate::pipeline::persistence::{BeatDescriptor, JsonLibrary, next_beat_id};
    use crate::pipeline::project::{EngineConfig, ProjectState};

    #[derive(Default)]
    struct Recorder(Vec<BeatDescriptor>);

    impl PersistenceWriter for Recorder {
        fn save(&mut self, beat: &BeatDescriptor) -> anyhow::Result<String> {
            self.0.push(beat.clone());
            Ok(format!("beat-{}", self.0.len()))
        }
    }

    fn offline_middle() -> Middle {
        let (tx, _rx) = crossbeam_channel::unbounded();
        let (_reply_tx, reply_rx) = crossbeam_channel::unbounded();
        Middle::new(
            EngineConfig::default(),
            ProjectState::default(),
            ModelClient::from_channels(tx, reply_rx),
        )
    }

    #[test]
    fn export_writes_audio_and_descriptor() {
        let dir = std::env::temp_dir().join(format!("beatblend-export-{}", next_beat_id()));
        let audio = dir.join("first.wav");
        let middle = offline_middle();
        let kit = Kit::synthesized(8000);
        let mut recorder = Recorder::default();

        let id = export_beat(&middle, "First", &kit, 8000, &audio, &mut recorder).unwrap();
        assert_eq!(id, "beat-1");
        let beat = &recorder.0[0];
        assert_eq!(beat.title, "First");
        assert_eq!(beat.audio_file.as_deref(), Some("first.wav"));
        assert_eq!(beat.duration, 4.0);

        let reader = hound::WavReader::open(&audio).unwrap();
        assert_eq!(reader.duration(), 4 * 8000); // one bar at 60 bpm
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn json_library_stores_exports() {
        let dir = std::env::temp_dir().join(format!("beatblend-library-{}", next_beat_id()));
        let middle = offline_middle();
        let kit = Kit::synthesized(8000);
        let mut library = JsonLibrary::new(&dir);

        let id = export_beat(&middle, "", &kit, 8000, &dir.join("x.wav"), &mut library).unwrap();
        let loaded = library.load(&id).unwrap();
        assert!(loaded.title.starts_with("Beat "));
        assert_eq!(loaded.pattern, *middle.static_pattern());
        std::fs::remove_dir_all(&dir).ok();
    }
}
