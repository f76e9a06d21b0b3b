//! Log subscriber construction.
//!
//! The subscriber is returned as a [`Dispatch`] and installed by `main` for
//! the duration of one command with `tracing::dispatcher::with_default`.

use tracing::level_filters::LevelFilter;
use tracing::Dispatch;
use tracing_subscriber::EnvFilter;

/// Level for `-v` count plus the `JIRA_DEBUG` environment value.
///
/// Zero is WARN; each step raises one level, topping out at TRACE. A
/// non-numeric `JIRA_DEBUG` is ignored.
pub fn level_for(verbose: u8, jira_debug: Option<&str>) -> LevelFilter {
    let extra = jira_debug
        .and_then(|value| value.trim().parse::<u8>().ok())
        .unwrap_or(0);
    match verbose.saturating_add(extra) {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

/// Build the stderr subscriber. `RUST_LOG`, when set, overrides the level.
pub fn dispatch(level: LevelFilter) -> Dispatch {
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .with_env_filter(filter)
        .finish();
    Dispatch::new(subscriber)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_ladder() {
        assert_eq!(level_for(0, None), LevelFilter::WARN);
        assert_eq!(level_for(1, None), LevelFilter::INFO);
        assert_eq!(level_for(2, None), LevelFilter::DEBUG);
        assert_eq!(level_for(3, None), LevelFilter::TRACE);
        assert_eq!(level_for(9, None), LevelFilter::TRACE);
    }

    #[test]
    fn test_jira_debug_adds_levels() {
        assert_eq!(level_for(0, Some("1")), LevelFilter::INFO);
        assert_eq!(level_for(1, Some(" 1 ")), LevelFilter::DEBUG);
        assert_eq!(level_for(1, Some("yes")), LevelFilter::INFO);
        assert_eq!(level_for(255, Some("255")), LevelFilter::TRACE);
    }
}
