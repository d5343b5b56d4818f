use std::{
    fmt::Display,
    sync::{LazyLock, RwLock},
};

use nu_ansi_term::Color;
use ureq::http::{HeaderMap, HeaderName, HeaderValue};

pub struct Icons;

impl Icons {
    pub const ARROW: &str = "→";
    pub const CHECK: &str = "✓";
    pub const CROSS: &str = "✗";
    pub const PACKAGE: &str = "📦";
    pub const WARNING: &str = "⚠";
}

pub fn term_width() -> usize {
    terminal_size::terminal_size()
        .map(|(w, _)| w.0 as usize)
        .unwrap_or(80)
}

pub static COLOR: LazyLock<RwLock<bool>> = LazyLock::new(|| RwLock::new(true));
pub static PROGRESS: LazyLock<RwLock<bool>> = LazyLock::new(|| RwLock::new(true));

pub fn progress_enabled() -> bool {
    *PROGRESS.read().unwrap()
}

pub struct Colored<T: Display>(pub Color, pub T);

impl<T: Display> Display for Colored<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let color = COLOR.read().unwrap();
        if *color {
            write!(f, "{}", self.0.prefix())?;
            self.1.fmt(f)?;
            write!(f, "{}", self.0.suffix())
        } else {
            self.1.fmt(f)
        }
    }
}

/// Parses `Name: value` pairs given with `--header`.
pub fn parse_headers(headers: &[String]) -> Result<HeaderMap, String> {
    headers
        .iter()
        .map(|header| -> Result<(HeaderName, HeaderValue), String> {
            let (key, value) = header
                .split_once(':')
                .ok_or_else(|| format!("invalid header `{header}`, expected `Name: value`"))?;
            let key = key
                .trim()
                .parse::<HeaderName>()
                .map_err(|err| format!("invalid header name in `{header}`: {err}"))?;
            let value = value
                .trim()
                .parse::<HeaderValue>()
                .map_err(|err| format!("invalid header value in `{header}`: {err}"))?;
            Ok((key, value))
        })
        .collect()
}
