use std::io::IsTerminal;
use std::sync::OnceLock;

use crate::cli::{GlobalFlags, OutputFormat};

/// Terminal decisions made once at startup and read by output and progress.
#[derive(Clone, Copy, Debug, Default)]
pub struct UiPrefs {
    pub table_color: bool,
    pub progress: bool,
    pub term_width: Option<usize>,
}

static UI_PREFS: OnceLock<UiPrefs> = OnceLock::new();

pub fn init(flags: &GlobalFlags) {
    // Decorations only make sense for a human reading table output.
    let interactive =
        std::io::stdout().is_terminal() && flags.format == OutputFormat::Table && !flags.quiet;

    let _ = UI_PREFS.set(UiPrefs {
        table_color: interactive && std::env::var_os("NO_COLOR").is_none(),
        progress: interactive,
        term_width: std::env::var("COLUMNS")
            .ok()
            .and_then(|value| value.parse::<usize>().ok())
            .filter(|width| *width >= 40),
    });
}

#[must_use]
pub fn prefs() -> UiPrefs {
    UI_PREFS.get().copied().unwrap_or_default()
}
