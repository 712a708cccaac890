//! Dialoguer theme and banner for the interactive editor.

use console::{style, Style};
use dialoguer::theme::ColorfulTheme;
use tagdock_core::LabelStyle;

/// Returns a `ColorfulTheme` configured with tagdock's look.
///
/// - Prompt prefix: cyan `?`
/// - Active item indicator: cyan `▸`
/// - Success prefix: green `✓`
/// - Error prefix: red `✗`
pub fn tagdock_theme() -> ColorfulTheme {
    ColorfulTheme {
        prompt_prefix: style("?".to_string()).for_stderr().cyan(),
        prompt_style: Style::new().for_stderr().bold(),
        prompt_suffix: style("›".to_string()).for_stderr().bright().black(),
        active_item_prefix: style("▸".to_string()).for_stderr().cyan(),
        active_item_style: Style::new().for_stderr().cyan(),
        checked_item_prefix: style("■".to_string()).for_stderr().green(),
        unchecked_item_prefix: style("□".to_string()).for_stderr().black(),
        success_prefix: style("✓".to_string()).for_stderr().green(),
        success_suffix: style("·".to_string()).for_stderr().bright().black(),
        error_prefix: style("✗".to_string()).for_stderr().red(),
        error_style: Style::new().for_stderr().red(),
        values_style: Style::new().for_stderr().green(),
        ..ColorfulTheme::default()
    }
}

/// Style for the token budget label.
pub fn token_label_style(label: LabelStyle) -> Style {
    match label {
        LabelStyle::Normal => Style::new().for_stderr().dim(),
        LabelStyle::Warning => Style::new().for_stderr().red().bold(),
    }
}

/// Prints the banner to stderr.
pub fn print_banner(session_name: &str) {
    let version_line = format!("tagdock v{}", tagdock_core::VERSION);
    let inner_width = version_line.len().max(session_name.chars().count()) + 4;

    let top = format!("  ╔{:═<width$}╗", "", width = inner_width);
    let mid1 = format!("  ║{:^width$}║", version_line, width = inner_width);
    let mid2 = format!("  ║{:^width$}║", session_name, width = inner_width);
    let bot = format!("  ╚{:═<width$}╝", "", width = inner_width);

    let cyan = Style::new().for_stderr().cyan();

    eprintln!();
    eprintln!("{}", cyan.apply_to(&top));
    eprintln!("{}", cyan.apply_to(&mid1));
    eprintln!("{}", cyan.apply_to(&mid2));
    eprintln!("{}", cyan.apply_to(&bot));
    eprintln!();
}
