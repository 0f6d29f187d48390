use std::sync::OnceLock;

use regex::Regex;

use crate::model::Coordinates;

static DATE_RE: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();

/// Accepts `YYYY-MM-DD`, which is what the search service parses for
/// `start` (inclusive) and `end` (exclusive).
pub fn validate_date(value: &str) -> Result<String, String> {
    let trimmed = value.trim();
    let re = DATE_RE
        .get_or_init(|| Regex::new(r"^(\d{4})-(\d{2})-(\d{2})$"))
        .as_ref()
        .map_err(|e| e.to_string())?;
    let caps = re
        .captures(trimmed)
        .ok_or_else(|| "expected format YYYY-MM-DD".to_string())?;
    let month: u32 = caps[2].parse().map_err(|_| "invalid month".to_string())?;
    let day: u32 = caps[3].parse().map_err(|_| "invalid day".to_string())?;
    if !(1..=12).contains(&month) {
        return Err("month must be between 01 and 12".to_string());
    }
    if !(1..=31).contains(&day) {
        return Err("day must be between 01 and 31".to_string());
    }
    Ok(trimmed.to_string())
}

/// Parses `LON,LAT`.
pub fn parse_coordinates(value: &str) -> Result<Coordinates, String> {
    let parts: Vec<&str> = value.split(',').map(str::trim).collect();
    if parts.len() != 2 {
        return Err("expected format LON,LAT".to_string());
    }
    let lon: f64 = parts[0]
        .parse()
        .map_err(|_| "invalid longitude".to_string())?;
    let lat: f64 = parts[1]
        .parse()
        .map_err(|_| "invalid latitude".to_string())?;
    if !(-180.0..=180.0).contains(&lon) {
        return Err("longitude must be within -180..180".to_string());
    }
    if !(-90.0..=90.0).contains(&lat) {
        return Err("latitude must be within -90..90".to_string());
    }
    Ok([lon, lat])
}

pub fn parse_viewport(value: &str) -> Result<(f64, f64), String> {
    let (w, h) = value
        .split_once(['x', 'X'])
        .ok_or_else(|| "expected format WIDTHxHEIGHT".to_string())?;
    let w: f64 = w.trim().parse().map_err(|_| "invalid width".to_string())?;
    let h: f64 = h.trim().parse().map_err(|_| "invalid height".to_string())?;
    if w <= 0.0 || h <= 0.0 {
        return Err("viewport dimensions must be positive".to_string());
    }
    Ok((w, h))
}

pub fn truncate_chars(value: &str, max: usize) -> String {
    if value.chars().count() <= max {
        return value.to_string();
    }
    let mut out: String = value.chars().take(max.saturating_sub(3)).collect();
    out.push_str("...");
    out
}
