//! Compact text format for recorded sessions
//!
//! Format: `T:NNNNN|CODE|data...`
//! - T:NNNNN = timestamp in milliseconds from the start of the recording
//! - CODE = 2-char action code
//! - data = pipe-separated values specific to the action
//!
//! Examples:
//! ```text
//! # lines starting with '#' are comments
//! T:00000|MV|0.0,0.40999973,0.0
//! T:00016|IN|W|D
//! T:00600|BB|0,-2,0
//! T:00900|BP|33,86,-122|Oak Log
//! T:01200|DM|4
//! ```

use bevy::math::{IVec3, Vec3};

use super::RecordingError;
use super::data::{RecordedAction, RecordedEvent, Recording};

fn fmt_vec3(v: Vec3) -> String {
    format!("{},{},{}", v.x, v.y, v.z)
}

fn fmt_cell(c: IVec3) -> String {
    format!("{},{},{}", c.x, c.y, c.z)
}

/// Serialize one event to a log line
pub fn serialize_event(event: &RecordedEvent) -> String {
    let data = match &event.action {
        RecordedAction::Input { key, pressed } => {
            format!("{}|{}", key, if *pressed { "D" } else { "U" })
        }
        RecordedAction::Move { position } => fmt_vec3(*position),
        RecordedAction::BreakBlock { cell } => fmt_cell(*cell),
        RecordedAction::PlaceBlock { cell, block } => format!("{}|{}", fmt_cell(*cell), block),
        RecordedAction::Damage { amount } => amount.to_string(),
    };
    format!("T:{:05}|{}|{}", event.time_ms, event.action.type_code(), data)
}

/// Serialize a whole recording, one event per line
pub fn serialize_recording(recording: &Recording) -> String {
    let mut out = String::new();
    for event in &recording.events {
        out.push_str(&serialize_event(event));
        out.push('\n');
    }
    out
}

fn parse_triple<T: std::str::FromStr>(s: &str) -> Option<[T; 3]> {
    let mut parts = s.split(',').map(|p| p.trim().parse::<T>().ok());
    let x = parts.next()??;
    let y = parts.next()??;
    let z = parts.next()??;
    if parts.next().is_some() {
        return None;
    }
    Some([x, y, z])
}

/// Parse a single non-comment log line
pub fn parse_line(line: &str) -> Result<RecordedEvent, String> {
    let parts: Vec<&str> = line.split('|').collect();
    if parts.len() < 3 {
        return Err(format!("expected at least 3 fields, found {}", parts.len()));
    }

    let time_ms = parts[0]
        .strip_prefix("T:")
        .and_then(|t| t.parse::<u32>().ok())
        .ok_or_else(|| format!("bad timestamp '{}'", parts[0]))?;

    let action = match (parts[1], &parts[2..]) {
        ("IN", [key, state]) => RecordedAction::Input {
            key: key.to_string(),
            pressed: match *state {
                "D" => true,
                "U" => false,
                other => return Err(format!("bad key state '{}'", other)),
            },
        },
        ("MV", [pos]) => {
            let [x, y, z] =
                parse_triple::<f32>(pos).ok_or_else(|| format!("bad position '{}'", pos))?;
            RecordedAction::Move {
                position: Vec3::new(x, y, z),
            }
        }
        ("BB", [cell]) => {
            let [x, y, z] = parse_triple::<i32>(cell).ok_or_else(|| format!("bad cell '{}'", cell))?;
            RecordedAction::BreakBlock {
                cell: IVec3::new(x, y, z),
            }
        }
        ("BP", [cell, block]) => {
            let [x, y, z] = parse_triple::<i32>(cell).ok_or_else(|| format!("bad cell '{}'", cell))?;
            RecordedAction::PlaceBlock {
                cell: IVec3::new(x, y, z),
                block: block.parse()?,
            }
        }
        ("DM", [amount]) => RecordedAction::Damage {
            amount: amount
                .parse()
                .map_err(|_| format!("bad damage amount '{}'", amount))?,
        },
        (code, data) => {
            return Err(format!(
                "unknown action '{}' with {} data fields",
                code,
                data.len()
            ));
        }
    };

    Ok(RecordedEvent { time_ms, action })
}

/// Parse a complete event log.
///
/// Blank lines and `#` comments are skipped. Errors carry the 1-based line number.
pub fn parse_recording(content: &str) -> Result<Recording, RecordingError> {
    let mut events = Vec::new();

    for (i, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let event = parse_line(line).map_err(|message| RecordingError::Parse {
            line: i + 1,
            message,
        })?;
        events.push(event);
    }

    Recording::new(events)
}
