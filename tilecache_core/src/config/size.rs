//! Human-readable byte sizes (e.g. "600MB", "1 GB", "512k").

use anyhow::{Result, bail};
use serde::{Deserialize, Deserializer};

const UNITS: [(&str, u64); 4] = [("GB", 1 << 30), ("MB", 1 << 20), ("KB", 1 << 10), ("B", 1)];

/// Parse a size string into bytes.
///
/// Accepts bare numbers (bytes) and the suffixes `K`/`KB`, `M`/`MB`, `G`/`GB`
/// (powers of 1024), case-insensitive, with optional whitespace.
///
/// # Examples
///
/// ```
/// use tilecache_core::config::parse_size;
///
/// assert_eq!(parse_size("1024").unwrap(), 1024);
/// assert_eq!(parse_size("1 KB").unwrap(), 1024);
/// assert_eq!(parse_size("500mb").unwrap(), 500 * 1024 * 1024);
/// ```
pub fn parse_size(text: &str) -> Result<u64> {
	let trimmed = text.trim();
	let upper = trimmed.to_ascii_uppercase();

	let (number, multiplier) = UNITS
		.iter()
		.find_map(|(unit, multiplier)| {
			upper
				.strip_suffix(unit)
				.or_else(|| (unit.len() == 2).then(|| upper.strip_suffix(&unit[..1])).flatten())
				.map(|number| (number.trim().to_owned(), *multiplier))
		})
		.unwrap_or_else(|| (upper.clone(), 1));

	let Ok(number) = number.parse::<u64>() else {
		bail!("invalid size '{text}', expected a format like '600MB', '1GB' or '1024'");
	};
	let Some(bytes) = number.checked_mul(multiplier) else {
		bail!("size '{text}' is too large");
	};
	Ok(bytes)
}

/// Format a byte count for humans, e.g. `1.5 MB`.
#[must_use]
pub fn format_size(bytes: u64) -> String {
	for (unit, multiplier) in UNITS {
		if multiplier > 1 && bytes >= multiplier {
			return format!("{:.1} {unit}", bytes as f64 / multiplier as f64);
		}
	}
	format!("{bytes} B")
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SizeValue {
	Bytes(u64),
	Text(String),
}

/// Serde helper for fields that accept either a byte count or a size string.
pub(crate) fn deserialize_size<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<u64, D::Error> {
	match SizeValue::deserialize(deserializer)? {
		SizeValue::Bytes(bytes) => Ok(bytes),
		SizeValue::Text(text) => parse_size(&text).map_err(serde::de::Error::custom),
	}
}
