use std::io::IsTerminal;
use std::str::FromStr;

use tracing::Level;

/// Maps a configured `log.level` to a tracing level. Unknown names fall back
/// to `INFO`.
pub fn parse_level(name: &str) -> Level {
    let name = name.trim();
    if name.eq_ignore_ascii_case("warning") {
        return Level::WARN;
    }
    Level::from_str(name).unwrap_or(Level::INFO)
}

/// Installs the process-wide fmt subscriber at `level`.
///
/// Returns `false` when a subscriber was already installed; the first one
/// stays in place.
pub fn init(level: &str) -> bool {
    tracing_subscriber::fmt()
        .with_max_level(parse_level(level))
        .with_target(false)
        .with_ansi(std::io::stdout().is_terminal())
        .try_init()
        .is_ok()
}
