//! TOML configuration: timings, the caption table and the phase looks.

use crate::caption::{CaptionEntry, CaptionTable};
use crate::error::{Result, SerenataError};
use crate::hold::HoldVisuals;
use crate::parser::parse_srt;
use crate::phase::{Phase, PhaseTable, PhaseThreshold, PhaseVisual};
use crate::processor::{self, ProcessOpts};
use crate::stage::StageConfig;

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, info};

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub poll_interval_ms: u64,
    pub frame_interval_ms: u64,
    pub hold_duration_ms: u64,
    pub fade_out_ms: u64,
    pub fade_in_ms: u64,
    /// Length of the song in seconds, used by the simulated player.
    pub song_length: f64,
    /// SRT file with the captions, relative to the config file.
    pub captions: Option<PathBuf>,
    /// Text before the first SRT caption; `""` for a blank caption.
    pub leader: Option<String>,
    pub clear_gaps: bool,
    #[serde(rename = "caption")]
    pub inline_captions: Vec<CaptionEntry>,
    #[serde(rename = "phase")]
    pub phases: Vec<PhaseConfig>,
    pub hold: HoldConfig,
    pub message: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            poll_interval_ms: 500,
            frame_interval_ms: 16,
            hold_duration_ms: 3000,
            fade_out_ms: 500,
            fade_in_ms: 800,
            song_length: 225.0,
            captions: None,
            leader: None,
            clear_gaps: false,
            inline_captions: Vec::new(),
            phases: Vec::new(),
            hold: HoldConfig::default(),
            message: String::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PhaseConfig {
    pub phase: Phase,
    /// Ignored for the initial phase, which applies before any threshold.
    #[serde(default)]
    pub min_time: f64,
    pub ambient: [String; 2],
    pub light_origin: [f32; 2],
    #[serde(default = "default_phase_transition_ms")]
    pub transition_ms: u64,
}

fn default_phase_transition_ms() -> u64 {
    4000
}

impl PhaseConfig {
    fn visual(&self) -> PhaseVisual {
        PhaseVisual::new(
            &self.ambient[0],
            &self.ambient[1],
            (self.light_origin[0], self.light_origin[1]),
            Duration::from_millis(self.transition_ms),
        )
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HoldConfig {
    pub ring_radius: f64,
    pub max_scale: f64,
}

impl Default for HoldConfig {
    fn default() -> Self {
        let visuals = HoldVisuals::default();
        Self {
            ring_radius: visuals.ring_radius,
            max_scale: visuals.max_scale,
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading configuration from {}", path.display());
        let text = std::fs::read_to_string(path)?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_toml_str(&text, base_dir)
    }

    /// Parses a configuration; relative caption paths resolve against `base_dir`.
    pub fn from_toml_str(text: &str, base_dir: &Path) -> Result<Self> {
        let mut config: Config = toml::from_str(text)?;
        if let Some(captions) = config.captions.take() {
            config.captions = Some(base_dir.join(captions));
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("poll_interval_ms", self.poll_interval_ms),
            ("frame_interval_ms", self.frame_interval_ms),
            ("hold_duration_ms", self.hold_duration_ms),
        ];
        if let Some((name, _)) = positive.iter().find(|(_, v)| *v == 0) {
            return Err(SerenataError::Config(format!("{} must be greater than 0", name)));
        }
        if !(self.song_length.is_finite() && self.song_length > 0.0) {
            return Err(SerenataError::Config(format!(
                "song_length must be a positive number of seconds, got {}",
                self.song_length
            )));
        }
        if self.captions.is_some() && !self.inline_captions.is_empty() {
            return Err(SerenataError::Config(
                "captions are given both as a file and inline".to_string(),
            ));
        }
        if !(self.hold.ring_radius > 0.0 && self.hold.max_scale > 0.0) {
            return Err(SerenataError::Config(
                "hold ring_radius and max_scale must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn caption_table(&self) -> Result<CaptionTable> {
        let Some(path) = &self.captions else {
            return CaptionTable::new(self.inline_captions.clone());
        };
        debug!("Reading captions from {}", path.display());
        let data = std::fs::read_to_string(path)?;
        let subs = parse_srt(&data)?;
        let opts = ProcessOpts {
            leader: self.leader.clone(),
            clear_gaps: self.clear_gaps,
        };
        processor::process(subs, &opts)
    }

    pub fn phase_table(&self) -> Result<PhaseTable> {
        if self.phases.is_empty() {
            return Ok(PhaseTable::default());
        }
        let initial = self
            .phases
            .iter()
            .find(|p| p.phase == Phase::Initial)
            .map(PhaseConfig::visual)
            .unwrap_or_else(|| PhaseVisual::default_for(Phase::Initial));
        let thresholds = self
            .phases
            .iter()
            .filter(|p| p.phase != Phase::Initial)
            .map(|p| PhaseThreshold {
                min_time: p.min_time,
                phase: p.phase,
                visual: p.visual(),
            })
            .collect();
        PhaseTable::new(thresholds, initial)
    }

    pub fn hold_duration(&self) -> Duration {
        Duration::from_millis(self.hold_duration_ms)
    }

    pub fn hold_visuals(&self) -> HoldVisuals {
        HoldVisuals {
            ring_radius: self.hold.ring_radius,
            max_scale: self.hold.max_scale,
        }
    }

    pub fn stage_config(&self) -> StageConfig {
        StageConfig {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            frame_interval: Duration::from_millis(self.frame_interval_ms),
            fade_out: Duration::from_millis(self.fade_out_ms),
            fade_in: Duration::from_millis(self.fade_in_ms),
            message: self.message.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Write;

    const BUNDLED: &str = include_str!("../assets/serenata.toml");

    #[test]
    fn empty_config_uses_defaults() {
        let config = Config::from_toml_str("", Path::new(".")).unwrap();

        assert_eq!(config.hold_duration(), Duration::from_millis(3000));
        assert_eq!(config.stage_config(), StageConfig::default());
        assert_eq!(config.phase_table().unwrap(), PhaseTable::default());
        assert!(config.caption_table().unwrap().is_empty());
    }

    #[test]
    fn bundled_config_loads() {
        let config = Config::from_toml_str(BUNDLED, Path::new("assets")).unwrap();

        let captions = config.caption_table().unwrap();
        let phases = config.phase_table().unwrap();

        assert_eq!(captions.entries()[0], CaptionEntry::new(0.0, ""));
        assert_eq!(captions.locate(30.0), Some(1));
        assert!(captions.entries().last().unwrap().is_blank());
        assert_eq!(phases.map_phase(85.0), Phase::Middle);
        assert_eq!(phases.map_phase(170.0), Phase::Final);
        assert!(!config.message.is_empty());
    }

    #[test]
    fn rejects_zero_hold_duration() {
        let err = Config::from_toml_str("hold_duration_ms = 0", Path::new(".")).unwrap_err();

        assert!(matches!(err, SerenataError::Config(_)));
    }

    #[test]
    fn rejects_unknown_keys() {
        let err = Config::from_toml_str("hold_duration = 3000", Path::new(".")).unwrap_err();

        assert!(matches!(err, SerenataError::Toml(_)));
    }

    #[test]
    fn loads_captions_from_srt_next_to_config() {
        let dir = tempfile::tempdir().unwrap();
        let srt = "1\n00:00:27,000 --> 00:00:34,000\nThe world was on fire...\nO mundo estava um caos...\n\n2\n00:00:35,000 --> 00:00:43,000\nIt's strange\n";
        std::fs::write(dir.path().join("lyrics.srt"), srt).unwrap();
        let config_path = dir.path().join("serenata.toml");
        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "captions = \"lyrics.srt\"\nleader = \"\"\nclear_gaps = true").unwrap();

        let config = Config::load(&config_path).unwrap();
        let table = config.caption_table().unwrap();
        let times: Vec<f64> = table.entries().iter().map(|e| e.time).collect();

        assert_eq!(times, vec![0.0, 27.0, 34.0, 35.0, 43.0]);
        assert_eq!(
            table.entries()[1].text,
            "The world was on fire...<br>O mundo estava um caos..."
        );
    }

    #[test]
    fn rejects_captions_in_two_places() {
        let text = "captions = \"lyrics.srt\"\n[[caption]]\ntime = 0.0\ntext = \"\"\n";

        let err = Config::from_toml_str(text, Path::new(".")).unwrap_err();

        assert!(matches!(err, SerenataError::Config(_)));
    }
}
