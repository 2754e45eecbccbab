use chrono::{DateTime, Duration, Local, NaiveDateTime, SecondsFormat, TimeZone};
use crossterm::event::{KeyCode, KeyModifiers};
use directories::{BaseDirs, ProjectDirs};
use std::path::PathBuf;

/// Profile mode for the application (dev or prod)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    Dev,
    Prod,
}

impl Profile {
    fn app_name(self) -> &'static str {
        match self {
            Profile::Dev => "rmd-dev",
            Profile::Prod => "rmd",
        }
    }
}

/// Get the configuration directory for the given profile
pub fn get_config_dir(profile: Profile) -> Option<PathBuf> {
    ProjectDirs::from("com", "rmd", profile.app_name())
        .map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the data directory (storage file and logs) for the given profile
pub fn get_data_dir(profile: Profile) -> Option<PathBuf> {
    ProjectDirs::from("com", "rmd", profile.app_name())
        .map(|dirs| dirs.data_dir().to_path_buf())
}

/// Expand `~` in a path string to the user's home directory
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = BaseDirs::new().map(|d| d.home_dir().to_path_buf()) {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Naive formats accepted for absolute times, interpreted in local time.
/// The first one is what an HTML `datetime-local` input produces.
const LOCAL_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d %H:%M:%S",
];

/// Parse an absolute reminder time (RFC 3339 or one of the local formats)
pub fn parse_absolute_time(value: &str) -> Option<DateTime<Local>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Local));
    }

    LOCAL_TIME_FORMATS.iter().find_map(|fmt| {
        NaiveDateTime::parse_from_str(value, fmt)
            .ok()
            // Nonexistent local times (DST gaps) do not parse
            .and_then(|naive| Local.from_local_datetime(&naive).earliest())
    })
}

/// Parse a time typed by the user: an absolute time, or an offset from
/// `now` such as `+30s`, `+10m`, `+2h` or `+1d`
pub fn parse_time_input(input: &str, now: DateTime<Local>) -> Option<DateTime<Local>> {
    let input = input.trim();
    match input.strip_prefix('+') {
        Some(offset) => parse_offset(offset).and_then(|offset| now.checked_add_signed(offset)),
        None => parse_absolute_time(input),
    }
}

fn parse_offset(offset: &str) -> Option<Duration> {
    let unit = offset.chars().last()?;
    let amount: i64 = offset[..offset.len() - unit.len_utf8()].parse().ok()?;
    if amount < 0 {
        return None;
    }
    match unit {
        's' => Duration::try_seconds(amount),
        'm' => Duration::try_minutes(amount),
        'h' => Duration::try_hours(amount),
        'd' => Duration::try_days(amount),
        _ => None,
    }
}

/// Milliseconds since the epoch for a stored time string
pub fn timestamp_millis(value: &str) -> Option<i64> {
    parse_absolute_time(value).map(|t| t.timestamp_millis())
}

/// Canonical stored representation: RFC 3339, millisecond precision, local offset
pub fn canonical_time(time: DateTime<Local>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Millis, false)
}

/// Format a stored time for display; unparseable values are shown as-is
pub fn format_time(value: &str, format: &str) -> String {
    match parse_absolute_time(value) {
        Some(time) => time.format(format).to_string(),
        None => value.to_string(),
    }
}

/// Parsed key binding information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedKeyBinding {
    pub key_code: KeyCode,
    pub requires_ctrl: bool,
}

impl ParsedKeyBinding {
    pub fn matches(&self, code: KeyCode, modifiers: KeyModifiers) -> bool {
        self.key_code == code && self.requires_ctrl == modifiers.contains(KeyModifiers::CONTROL)
    }
}

/// Parse a key binding string from config, e.g. `"q"`, `"Enter"`, `"F1"` or `"Ctrl+s"`
pub fn parse_key_binding(key_str: &str) -> Result<ParsedKeyBinding, String> {
    let key_str = key_str.trim();
    let (key_part, requires_ctrl) = match key_str.strip_prefix("Ctrl+") {
        Some(rest) => (rest, true),
        None => (key_str, false),
    };
    Ok(ParsedKeyBinding {
        key_code: parse_key_code(key_part)?,
        requires_ctrl,
    })
}

fn parse_key_code(key_str: &str) -> Result<KeyCode, String> {
    let code = match key_str {
        "Enter" => KeyCode::Enter,
        "Esc" | "Escape" => KeyCode::Esc,
        "Backspace" => KeyCode::Backspace,
        "Tab" => KeyCode::Tab,
        "Space" | " " => KeyCode::Char(' '),
        "Up" => KeyCode::Up,
        "Down" => KeyCode::Down,
        "Delete" => KeyCode::Delete,
        _ => {
            if let Some(n) = key_str.strip_prefix('F').and_then(|n| n.parse::<u8>().ok()) {
                if (1..=12).contains(&n) {
                    return Ok(KeyCode::F(n));
                }
            }
            let mut chars = key_str.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => KeyCode::Char(c),
                _ => return Err(format!("Unknown key binding: {}", key_str)),
            }
        }
    };
    Ok(code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn parses_datetime_local_input_in_local_time() {
        let parsed = parse_absolute_time("2030-05-17T08:45").unwrap();
        assert_eq!(parsed.format("%Y-%m-%d %H:%M").to_string(), "2030-05-17 08:45");
    }

    #[test]
    fn canonical_time_round_trips_to_the_millisecond() {
        let now = Local::now();
        let stored = canonical_time(now);
        assert_eq!(timestamp_millis(&stored), Some(now.timestamp_millis()));
    }

    #[test]
    fn relative_offsets_are_added_to_now() {
        let now = parse_absolute_time("2030-01-01T10:00").unwrap();
        let later = parse_time_input("+90m", now).unwrap();
        assert_eq!(later.hour(), 11);
        assert_eq!(later.minute(), 30);
        assert_eq!(
            parse_time_input("+2d", now).unwrap() - now,
            Duration::days(2)
        );
    }

    #[test]
    fn garbage_times_do_not_parse() {
        let now = Local::now();
        for input in ["", "   ", "{not a time", "+", "+10x", "+-5m", "2030-13-40T99:99"] {
            assert!(parse_time_input(input, now).is_none(), "accepted {:?}", input);
        }
        assert_eq!(timestamp_millis("Invalid Date"), None);
    }

    #[test]
    fn format_time_falls_back_to_raw_value() {
        assert_eq!(format_time("2030-05-17T08:45", "%d/%m/%Y, %H:%M"), "17/05/2030, 08:45");
        assert_eq!(format_time("soon", "%d/%m/%Y"), "soon");
    }

    #[test]
    fn key_bindings_parse_with_modifiers() {
        assert_eq!(
            parse_key_binding("Ctrl+s").unwrap(),
            ParsedKeyBinding { key_code: KeyCode::Char('s'), requires_ctrl: true }
        );
        assert_eq!(parse_key_binding("F1").unwrap().key_code, KeyCode::F(1));
        assert!(parse_key_binding("Hyper+x").is_err());
        assert!(parse_key_binding("q").unwrap().matches(KeyCode::Char('q'), KeyModifiers::NONE));
    }
}
