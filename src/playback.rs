use std::fmt::Display;

use serde::Serialize;

use crate::config::SpeedConfig;

/// Whether videos are forced to the fast rate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeedMode {
    #[default]
    Normal,
    Fast,
}

impl SpeedMode {
    pub fn toggled(self) -> Self {
        match self {
            Self::Normal => Self::Fast,
            Self::Fast => Self::Normal,
        }
    }

    pub fn is_fast(self) -> bool {
        self == Self::Fast
    }

    pub fn rate(self, speed: &SpeedConfig) -> f64 {
        match self {
            Self::Normal => speed.normal,
            Self::Fast => speed.fast,
        }
    }
}

/// Label for the outcome of a pause toggle. Only used for feedback; every video is flipped
/// individually regardless.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PauseState {
    Paused,
    Playing,
}

impl PauseState {
    pub fn is_paused(self) -> bool {
        self == Self::Paused
    }
}

impl Display for PauseState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Paused => write!(f, "Paused"),
            Self::Playing => write!(f, "Playing"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PauseTally {
    pub paused: usize,
    pub played: usize,
}

impl PauseTally {
    pub fn total(&self) -> usize {
        self.paused + self.played
    }

    /// "Paused" only on a strict majority; a tie reads as playing.
    pub fn classify(&self) -> PauseState {
        if self.paused > self.played {
            PauseState::Paused
        } else {
            PauseState::Playing
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpeedReport {
    pub mode: SpeedMode,
    pub rate: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PauseReport {
    pub state: PauseState,
    pub tally: PauseTally,
}

impl PauseReport {
    pub fn count(&self) -> usize {
        self.tally.total()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_alternate_between_modes() {
        // given
        let mode = SpeedMode::default();

        // when
        let once = mode.toggled();
        let twice = once.toggled();

        // then
        assert_eq!(mode, SpeedMode::Normal);
        assert_eq!(once, SpeedMode::Fast);
        assert_eq!(twice, SpeedMode::Normal);
    }

    #[test]
    fn should_map_modes_to_configured_rates() {
        // given
        let speed = SpeedConfig::default();

        // then
        assert_eq!(SpeedMode::Normal.rate(&speed), 1.0);
        assert_eq!(SpeedMode::Fast.rate(&speed), 2.0);
    }

    #[test]
    fn should_classify_strict_majority_as_paused() {
        assert_eq!(
            PauseTally { paused: 2, played: 1 }.classify(),
            PauseState::Paused
        );
        assert_eq!(
            PauseTally { paused: 1, played: 1 }.classify(),
            PauseState::Playing
        );
        assert_eq!(
            PauseTally { paused: 0, played: 0 }.classify(),
            PauseState::Playing
        );
    }
}
