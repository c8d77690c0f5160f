//! Engine configuration: per-variant game rules, with optional JSON overrides
//! loaded from disk.

use std::{env, fs, io::ErrorKind, path::PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the engine looks for rule overrides.
const DEFAULT_CONFIG_PATH: &str = "config/rules.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "PARTY_ROOMS_CONFIG_PATH";

/// Which of the three party games a room runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameVariant {
    /// Elimination quiz: one responder per round, wrong answer or timeout
    /// eliminates, last participant standing wins.
    Survival,
    /// Anonymous-explanation game: everyone writes, everyone votes, the
    /// tally crowns a round winner.
    ExplainOff,
    /// Category-and-points trivia grid cleared cell by cell.
    Board,
}

/// Countdown settings for act phases.
///
/// The per-round duration shrinks by `step_secs` each round but never drops
/// below `floor_secs`. A `base_secs` of zero disables the countdown entirely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerRules {
    /// Seconds granted in the first round.
    pub base_secs: u64,
    /// Seconds removed per subsequent round.
    pub step_secs: u64,
    /// Lower bound the duration never drops below.
    pub floor_secs: u64,
}

impl TimerRules {
    /// Countdown duration for the given zero-based round index.
    pub fn duration_for_round(&self, round: usize) -> u64 {
        let reduction = self.step_secs.saturating_mul(round as u64);
        self.base_secs.saturating_sub(reduction).max(self.floor_secs)
    }

    /// Whether act phases run under a countdown at all.
    pub fn is_enabled(&self) -> bool {
        self.base_secs > 0
    }

    /// Rules with the countdown switched off.
    pub const fn disabled() -> Self {
        Self {
            base_secs: 0,
            step_secs: 0,
            floor_secs: 0,
        }
    }
}

/// Grid shape for the board variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardRules {
    /// Number of category columns.
    pub category_count: usize,
    /// Point value per row, top to bottom.
    pub point_ladder: Vec<i64>,
}

impl BoardRules {
    /// Total number of cells a full grid requires.
    pub fn cell_count(&self) -> usize {
        self.category_count * self.point_ladder.len()
    }
}

impl Default for BoardRules {
    fn default() -> Self {
        Self {
            category_count: 5,
            point_ladder: vec![100, 200, 300, 400, 500],
        }
    }
}

/// Host-supplied rules fixed at room creation.
#[derive(Debug, Clone, PartialEq)]
pub struct GameRules {
    /// Game variant the room runs.
    pub variant: GameVariant,
    /// Minimum roster size required to start.
    pub min_players: usize,
    /// Maximum number of rounds; zero means "use every available item".
    pub round_cap: usize,
    /// Answer choices per quiz question (2 or 4 in practice).
    pub choice_count: usize,
    /// Fraction of wrong answerers eliminated per round. Only `>= 1.0` has
    /// implemented behavior; lower values are a named no-op (see scoring).
    pub elimination_rate: f32,
    /// Countdown settings for act phases.
    pub timer: TimerRules,
    /// Grid shape, used by the board variant only.
    pub board: BoardRules,
}

impl GameRules {
    /// Default rules for the elimination quiz.
    pub fn survival() -> Self {
        Self {
            variant: GameVariant::Survival,
            min_players: 2,
            round_cap: 0,
            choice_count: 4,
            elimination_rate: 1.0,
            timer: TimerRules {
                base_secs: 15,
                step_secs: 1,
                floor_secs: 5,
            },
            board: BoardRules::default(),
        }
    }

    /// Default rules for the explanation game.
    pub fn explain_off() -> Self {
        Self {
            variant: GameVariant::ExplainOff,
            min_players: 2,
            round_cap: 0,
            choice_count: 0,
            elimination_rate: 1.0,
            timer: TimerRules {
                base_secs: 20,
                step_secs: 0,
                floor_secs: 5,
            },
            board: BoardRules::default(),
        }
    }

    /// Default rules for the trivia board. The countdown is off by default;
    /// the host awards answers at its own pace.
    pub fn board() -> Self {
        let board = BoardRules::default();
        Self {
            variant: GameVariant::Board,
            min_players: 2,
            round_cap: board.cell_count(),
            choice_count: 0,
            elimination_rate: 1.0,
            timer: TimerRules::disabled(),
            board,
        }
    }
}

/// Default rules for each variant, optionally overridden from JSON on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Rules applied to survival-quiz rooms.
    pub survival: GameRules,
    /// Rules applied to explanation-game rooms.
    pub explain_off: GameRules,
    /// Rules applied to board rooms.
    pub board: GameRules,
}

impl EngineConfig {
    /// Load the configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let config: Self = raw.into();
                    info!(path = %path.display(), "loaded game rule overrides from config");
                    config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Rules for the requested variant.
    pub fn rules_for(&self, variant: GameVariant) -> &GameRules {
        match variant {
            GameVariant::Survival => &self.survival,
            GameVariant::ExplainOff => &self.explain_off,
            GameVariant::Board => &self.board,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            survival: GameRules::survival(),
            explain_off: GameRules::explain_off(),
            board: GameRules::board(),
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of the configuration file.
struct RawConfig {
    survival: Option<RawRules>,
    explain_off: Option<RawRules>,
    board: Option<RawRules>,
}

#[derive(Debug, Deserialize)]
/// Partial per-variant overrides; absent fields keep their defaults.
struct RawRules {
    min_players: Option<usize>,
    round_cap: Option<usize>,
    choice_count: Option<usize>,
    elimination_rate: Option<f32>,
    timer_base_secs: Option<u64>,
    timer_step_secs: Option<u64>,
    timer_floor_secs: Option<u64>,
}

impl From<RawConfig> for EngineConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = Self::default();
        Self {
            survival: apply_overrides(defaults.survival, value.survival),
            explain_off: apply_overrides(defaults.explain_off, value.explain_off),
            board: apply_overrides(defaults.board, value.board),
        }
    }
}

fn apply_overrides(mut base: GameRules, raw: Option<RawRules>) -> GameRules {
    let Some(raw) = raw else {
        return base;
    };

    if let Some(min_players) = raw.min_players {
        base.min_players = min_players;
    }
    if let Some(round_cap) = raw.round_cap {
        base.round_cap = round_cap;
    }
    if let Some(choice_count) = raw.choice_count {
        base.choice_count = choice_count;
    }
    if let Some(rate) = raw.elimination_rate {
        base.elimination_rate = rate;
    }
    if let Some(secs) = raw.timer_base_secs {
        base.timer.base_secs = secs;
    }
    if let Some(secs) = raw.timer_step_secs {
        base.timer.step_secs = secs;
    }
    if let Some(secs) = raw.timer_floor_secs {
        base.timer.floor_secs = secs;
    }
    base
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_shrinks_to_the_floor_and_holds() {
        let timer = TimerRules {
            base_secs: 15,
            step_secs: 1,
            floor_secs: 5,
        };
        assert_eq!(timer.duration_for_round(0), 15);
        assert_eq!(timer.duration_for_round(10), 5);
        assert_eq!(timer.duration_for_round(20), 5);
    }

    #[test]
    fn duration_is_non_increasing() {
        let timer = TimerRules {
            base_secs: 30,
            step_secs: 3,
            floor_secs: 4,
        };
        let mut previous = timer.duration_for_round(0);
        for round in 1..40 {
            let current = timer.duration_for_round(round);
            assert!(current <= previous, "duration grew at round {round}");
            assert!(current >= timer.floor_secs);
            previous = current;
        }
    }

    #[test]
    fn zero_base_disables_the_countdown() {
        assert!(!TimerRules::disabled().is_enabled());
        assert!(
            TimerRules {
                base_secs: 20,
                step_secs: 0,
                floor_secs: 5
            }
            .is_enabled()
        );
    }

    #[test]
    fn overrides_apply_on_top_of_defaults() {
        let raw: RawConfig = serde_json::from_str(
            r#"{"survival": {"min_players": 3, "timer_base_secs": 30}, "board": {"round_cap": 10}}"#,
        )
        .unwrap();
        let config: EngineConfig = raw.into();

        assert_eq!(config.survival.min_players, 3);
        assert_eq!(config.survival.timer.base_secs, 30);
        assert_eq!(config.survival.timer.floor_secs, 5);
        assert_eq!(config.board.round_cap, 10);
        assert_eq!(config.explain_off, GameRules::explain_off());
    }

    #[test]
    fn board_defaults_fill_a_five_by_five_grid() {
        let rules = GameRules::board();
        assert_eq!(rules.board.cell_count(), 25);
        assert_eq!(rules.round_cap, 25);
        assert!(!rules.timer.is_enabled());
    }
}
