use std::time::Duration;

use thiserror::Error;

use crate::naming::sanitize_folder_name;

pub const MIN_OUTPUTS_PER_PROMPT: u8 = 1;
pub const MAX_OUTPUTS_PER_PROMPT: u8 = 4;
pub const DEFAULT_FOLDER_NAME: &str = "scene-batch";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingsError {
    #[error("outputs per prompt must be between {MIN_OUTPUTS_PER_PROMPT} and {MAX_OUTPUTS_PER_PROMPT}, got {0}")]
    OutputsOutOfRange(u32),
    #[error("dispatch interval must be greater than zero")]
    ZeroInterval,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    outputs_per_prompt: u8,
    download_folder_name: String,
    interval: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            outputs_per_prompt: 1,
            download_folder_name: DEFAULT_FOLDER_NAME.to_string(),
            interval: Duration::from_secs(30),
        }
    }
}

impl Settings {
    /// Validates the bounds and sanitizes the folder name. An empty or
    /// fully-forbidden folder name falls back to the default.
    pub fn new(
        outputs_per_prompt: u32,
        download_folder_name: &str,
        interval: Duration,
    ) -> Result<Self, SettingsError> {
        let outputs = u8::try_from(outputs_per_prompt)
            .ok()
            .filter(|n| (MIN_OUTPUTS_PER_PROMPT..=MAX_OUTPUTS_PER_PROMPT).contains(n))
            .ok_or(SettingsError::OutputsOutOfRange(outputs_per_prompt))?;
        if interval.is_zero() {
            return Err(SettingsError::ZeroInterval);
        }
        Ok(Self {
            outputs_per_prompt: outputs,
            download_folder_name: sanitize_folder_name(download_folder_name),
            interval,
        })
    }

    pub fn outputs_per_prompt(&self) -> u8 {
        self.outputs_per_prompt
    }

    pub fn download_folder_name(&self) -> &str {
        &self.download_folder_name
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

/// Bounded waits applied by the coordinator itself, independent of whatever
/// timeouts the page collaborator uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadlines {
    /// A submitted prompt with no detected outputs fails after this long.
    pub generation: Duration,
    /// A prompt whose downloads have not all been confirmed fails after this long.
    pub download: Duration,
}

impl Default for Deadlines {
    fn default() -> Self {
        Self {
            generation: Duration::from_secs(180),
            download: Duration::from_secs(120),
        }
    }
}
