//! The configuration store.
//!
//! Holds the latest snapshot the server pushed. The store is empty until the
//! first `configuration` push; edits before that are rejected rather than
//! applied to a structure that does not exist yet.

use crate::error::{AdminError, Result};
use crate::protocol::{
    Configuration, BACKGROUND, BYPASS, GAME_ID, GOLDEN_SNITCH, OPACITY, SCALE, SPEED,
};

/// A single-field configuration edit made by the operator.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigEdit {
    Opacity(f64),
    Scale(f64),
    Background(String),
    Speed(f64),
    GoldenSnitch(bool),
    Bypass(bool),
}

impl ConfigEdit {
    /// The wire name of the field this edit touches.
    pub fn field(&self) -> &'static str {
        match self {
            Self::Opacity(_) => OPACITY,
            Self::Scale(_) => SCALE,
            Self::Background(_) => BACKGROUND,
            Self::Speed(_) => SPEED,
            Self::GoldenSnitch(_) => GOLDEN_SNITCH,
            Self::Bypass(_) => BYPASS,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigurationStore {
    snapshot: Option<Configuration>,
}

impl ConfigurationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The current snapshot, if the server has pushed one.
    pub fn snapshot(&self) -> Option<&Configuration> {
        self.snapshot.as_ref()
    }

    /// Replace the snapshot with a pushed one.
    ///
    /// `bp` normalization already happened during decoding.
    pub fn replace(&mut self, configuration: Configuration) {
        self.snapshot = Some(configuration);
    }

    /// Apply one field edit and return the updated snapshot for republishing.
    ///
    /// # Errors
    ///
    /// Returns [`AdminError::NoConfiguration`] before the first push.
    pub fn edit(&mut self, edit: ConfigEdit) -> Result<&Configuration> {
        let snapshot = self.snapshot.as_mut().ok_or(AdminError::NoConfiguration)?;
        let field = edit.field();
        match edit {
            ConfigEdit::Opacity(value) | ConfigEdit::Scale(value) | ConfigEdit::Speed(value) => {
                snapshot.set(field, value);
            }
            ConfigEdit::Background(value) => snapshot.set(field, value),
            ConfigEdit::GoldenSnitch(value) => snapshot.set(field, value),
            ConfigEdit::Bypass(value) => snapshot.bp = value,
        }
        Ok(snapshot)
    }

    /// Stamp a new game id into the snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`AdminError::NoConfiguration`] before the first push.
    pub fn set_game_id(&mut self, game_id: String) -> Result<&Configuration> {
        let snapshot = self.snapshot.as_mut().ok_or(AdminError::NoConfiguration)?;
        snapshot.set(GAME_ID, game_id);
        Ok(snapshot)
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pushed() -> ConfigurationStore {
        let mut store = ConfigurationStore::new();
        store.replace(
            serde_json::from_value(json!({ "opacity": 85, "scale": "0.3", "theme": "dark" }))
                .unwrap(),
        );
        store
    }

    #[test]
    fn edit_before_first_push_is_rejected() {
        let mut store = ConfigurationStore::new();
        let err = store.edit(ConfigEdit::Bypass(true)).unwrap_err();
        assert!(matches!(err, AdminError::NoConfiguration));
        assert!(store.snapshot().is_none());
    }

    #[test]
    fn edit_changes_exactly_one_field() {
        let mut store = pushed();
        let before = store.snapshot().cloned().unwrap();
        let after = store.edit(ConfigEdit::Speed(3.0)).unwrap().clone();
        assert_eq!(after.speed(), Some(3.0));
        assert_eq!(after.bp, before.bp);
        for (key, value) in before.fields() {
            assert_eq!(after.get(key), Some(value), "{key} must be untouched");
        }
        assert_eq!(after.fields().len(), before.fields().len() + 1);
    }

    #[test]
    fn bypass_and_flags() {
        let mut store = pushed();
        assert!(store.edit(ConfigEdit::Bypass(true)).unwrap().bp);
        let snapshot = store.edit(ConfigEdit::GoldenSnitch(false)).unwrap();
        assert_eq!(snapshot.golden_snitch(), Some(false));
        assert!(snapshot.bp);
    }

    #[test]
    fn push_replaces_local_edits() {
        let mut store = pushed();
        store.edit(ConfigEdit::Background("space".into())).unwrap();
        store.replace(Configuration::default());
        assert_eq!(store.snapshot(), Some(&Configuration::default()));
    }

    #[test]
    fn game_id_requires_snapshot() {
        let mut empty = ConfigurationStore::new();
        assert!(matches!(
            empty.set_game_id("x".into()),
            Err(AdminError::NoConfiguration)
        ));

        let mut store = pushed();
        let snapshot = store.set_game_id("abc".into()).unwrap();
        assert_eq!(snapshot.game_id(), Some("abc"));
    }

    #[test]
    fn edit_field_names_match_wire_keys() {
        assert_eq!(ConfigEdit::GoldenSnitch(true).field(), "goldenSnitch");
        assert_eq!(ConfigEdit::Bypass(true).field(), "bp");
    }
}
