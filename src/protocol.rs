use std::{fs, path::Path};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use crate::{events::ReadyCheckEvent, roster::RosterSnapshot, status::RawStatusEntry};

/// What the host exposes at one instant. Missing sources stay `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostState {
    pub logged_in: bool,
    #[serde(default)]
    pub roster: Option<RosterSnapshot>,
    #[serde(default)]
    pub statuses: Option<Vec<RawStatusEntry>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureMessage {
    Event(ReadyCheckEvent),
    HostState(HostState),
}

pub fn parse_capture_line(text: &str) -> Result<CaptureMessage> {
    if let Ok(event) = serde_json::from_str::<ReadyCheckEvent>(text) {
        return Ok(CaptureMessage::Event(event));
    }

    if let Ok(state) = serde_json::from_str::<HostState>(text) {
        return Ok(CaptureMessage::HostState(state));
    }

    Err(anyhow!("line did not match a ready check event or host state"))
}

/// Parses a JSON-lines capture. Blank lines and lines starting with `#` are
/// skipped.
pub fn parse_capture(text: &str) -> Result<Vec<CaptureMessage>> {
    text.lines()
        .enumerate()
        .map(|(index, line)| (index + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
        .map(|(line_number, line)| {
            parse_capture_line(line).with_context(|| format!("capture line {line_number}"))
        })
        .collect()
}

/// Reads a capture file. See [`take_bootstrap_frame`] for how the first host
/// state is treated on replay.
pub fn load_capture(path: &Path) -> Result<Vec<CaptureMessage>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read capture {}", path.display()))?;
    parse_capture(&raw).with_context(|| format!("invalid capture {}", path.display()))
}

/// Removes the first `HostState` so it can be applied before replay starts.
/// Events listed ahead of it in the capture will see this frame too.
pub fn take_bootstrap_frame(messages: &mut Vec<CaptureMessage>) -> Option<HostState> {
    let position = messages
        .iter()
        .position(|message| matches!(message, CaptureMessage::HostState(_)))?;
    match messages.remove(position) {
        CaptureMessage::HostState(state) => Some(state),
        CaptureMessage::Event(_) => None,
    }
}
