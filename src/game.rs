//! Game phase tracking and pause/play toggle resolution.
//!
//! The server only understands discrete phase names, while the operator has a
//! single pause control that must behave as a toggle. [`GameStateMachine`]
//! translates operator requests into the phase that actually goes on the
//! wire and tracks the `is_paused` / `is_playing` flags for both operator
//! requests and server pushes.

use crate::protocol::GamePhase;

/// The result of resolving one operator phase request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseChange {
    /// The phase to send to the server. A second pause becomes [`GamePhase::Play`].
    pub outgoing: GamePhase,
    /// Set when the operator requested a game start; the caller must stamp a
    /// fresh game id into the configuration before republishing it.
    pub starts_new_game: bool,
}

/// Current game phase plus the pause/play flags derived from it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GameStateMachine {
    current: Option<GamePhase>,
    is_paused: bool,
    is_playing: bool,
}

impl GameStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    /// The current phase, or `None` before the first push or request.
    pub fn current(&self) -> Option<GamePhase> {
        self.current
    }

    pub fn is_paused(&self) -> bool {
        self.is_paused
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    /// Resolve an operator request and apply it locally.
    ///
    /// Any request other than pause clears the pause flag, and only play sets
    /// the playing flag. Pause toggles: requested while running it pauses,
    /// requested while already paused it resumes and goes out as `play`.
    /// Only an explicit play request counts as a game start; resuming does not.
    pub fn request(&mut self, requested: GamePhase) -> PhaseChange {
        if requested != GamePhase::Pause {
            self.is_paused = false;
        }
        self.is_playing = requested == GamePhase::Play;

        let outgoing = match requested {
            GamePhase::Pause if self.is_paused => {
                self.is_paused = false;
                self.is_playing = true;
                GamePhase::Play
            }
            GamePhase::Pause => {
                self.is_paused = true;
                GamePhase::Pause
            }
            other => other,
        };

        self.current = Some(outgoing);

        PhaseChange {
            outgoing,
            starts_new_game: requested == GamePhase::Play,
        }
    }

    /// Apply a server `state` push. Returns the phase if the name is known.
    ///
    /// Unknown names leave everything untouched. `play` and `pause` also set
    /// the flags; other phases keep whatever flags were in effect.
    pub fn apply_push(&mut self, name: &str) -> Option<GamePhase> {
        let phase = GamePhase::from_name(name)?;
        self.current = Some(phase);
        match phase {
            GamePhase::Play => {
                self.is_paused = false;
                self.is_playing = true;
            }
            GamePhase::Pause => {
                self.is_paused = true;
                self.is_playing = false;
            }
            _ => {}
        }
        Some(phase)
    }
}

/// Generate a fresh game identifier.
///
/// Five hyphen-separated lowercase hex groups (8-4-4-4-12), random on every
/// call.
pub fn new_game_id() -> String {
    uuid::Uuid::new_v4().hyphenated().to_string()
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;

    fn machine_at(phase: GamePhase) -> GameStateMachine {
        let mut machine = GameStateMachine::new();
        machine.apply_push(phase.name());
        machine
    }

    #[test]
    fn non_pause_requests_clear_pause_and_set_playing_only_for_play() {
        for requested in GamePhase::ALL
            .into_iter()
            .filter(|p| *p != GamePhase::Pause)
        {
            let mut machine = machine_at(GamePhase::Pause);
            let change = machine.request(requested);
            assert_eq!(change.outgoing, requested);
            assert!(!machine.is_paused(), "{requested:?} must clear pause");
            assert_eq!(machine.is_playing(), requested == GamePhase::Play);
            assert_eq!(machine.current(), Some(requested));
        }
    }

    #[test]
    fn pause_from_play_pauses() {
        let mut machine = machine_at(GamePhase::Play);
        let change = machine.request(GamePhase::Pause);
        assert_eq!(change.outgoing, GamePhase::Pause);
        assert!(!change.starts_new_game);
        assert!(machine.is_paused());
        assert!(!machine.is_playing());
        assert_eq!(machine.current(), Some(GamePhase::Pause));
    }

    #[test]
    fn second_pause_resumes_as_play() {
        let mut machine = machine_at(GamePhase::Play);
        machine.request(GamePhase::Pause);
        let change = machine.request(GamePhase::Pause);
        assert_eq!(change.outgoing, GamePhase::Play);
        assert!(!change.starts_new_game, "resuming is not a game start");
        assert!(!machine.is_paused());
        assert!(machine.is_playing());
        assert_eq!(machine.current(), Some(GamePhase::Play));
    }

    #[test]
    fn pause_toggles_back_and_forth() {
        let mut machine = GameStateMachine::new();
        let outgoing: Vec<GamePhase> = (0..4)
            .map(|_| machine.request(GamePhase::Pause).outgoing)
            .collect();
        assert_eq!(
            outgoing,
            vec![
                GamePhase::Pause,
                GamePhase::Play,
                GamePhase::Pause,
                GamePhase::Play
            ]
        );
    }

    #[test]
    fn pause_after_pushed_pause_resumes() {
        let mut machine = machine_at(GamePhase::Pause);
        assert_eq!(machine.request(GamePhase::Pause).outgoing, GamePhase::Play);
    }

    #[test]
    fn play_request_starts_a_new_game() {
        let mut machine = machine_at(GamePhase::Title);
        assert!(machine.request(GamePhase::Play).starts_new_game);
        assert!(!machine.request(GamePhase::GameOver).starts_new_game);
    }

    #[test]
    fn push_play_sets_flags() {
        let mut machine = machine_at(GamePhase::Pause);
        assert_eq!(machine.apply_push("play"), Some(GamePhase::Play));
        assert!(machine.is_playing());
        assert!(!machine.is_paused());
    }

    #[test]
    fn push_other_phase_keeps_flags() {
        let mut machine = machine_at(GamePhase::Play);
        machine.apply_push("game-over");
        assert_eq!(machine.current(), Some(GamePhase::GameOver));
        assert!(machine.is_playing());
    }

    #[test]
    fn push_unknown_phase_is_ignored() {
        let mut machine = machine_at(GamePhase::Demo);
        assert_eq!(machine.apply_push("intermission"), None);
        assert_eq!(machine.current(), Some(GamePhase::Demo));
    }

    #[test]
    fn game_ids_are_hyphenated_hex_and_unique() {
        let first = new_game_id();
        let second = new_game_id();
        assert_ne!(first, second);

        let groups: Vec<&str> = first.split('-').collect();
        let lengths: Vec<usize> = groups.iter().map(|g| g.len()).collect();
        assert_eq!(lengths, vec![8, 4, 4, 4, 12]);
        assert!(groups
            .iter()
            .all(|g| g.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase())));
    }
}
