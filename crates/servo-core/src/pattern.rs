use crate::error::{Result, ServoError};
use crate::types::Pattern;
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::info;

/// Named pattern definitions. Saves overwrite; steps are not validated
/// until playback.
#[derive(Default)]
pub struct PatternStore {
    patterns: RwLock<HashMap<String, Pattern>>,
}

impl PatternStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn save(&self, pattern: Pattern) -> Result<()> {
        if pattern.name.trim().is_empty() {
            return Err(ServoError::Validation("pattern name is required".into()));
        }
        info!(pattern = %pattern.name, steps = pattern.steps.len(), "saved pattern");
        self.patterns
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(pattern.name.clone(), pattern);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<Pattern> {
        self.patterns
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(name)
            .cloned()
            .ok_or_else(|| ServoError::PatternNotFound(name.to_string()))
    }

    /// All saved patterns, sorted by name.
    pub fn list(&self) -> Vec<Pattern> {
        let mut all: Vec<Pattern> = self
            .patterns
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .cloned()
            .collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all
    }
}
