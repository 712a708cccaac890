//! The `tagdock tokens` command.

use clap::Args;
use console::Style;
use tagdock_core::types::split_tags;
use tagdock_core::{load_tokenizer, Config, LabelStyle, TokenBudget};

#[derive(Args, Debug)]
pub struct TokensArgs {
    /// Caption text, tags joined by the separator
    pub text: String,

    /// Tag separator (defaults to `editor.separator`)
    #[arg(long)]
    pub separator: Option<String>,
}

pub async fn execute(args: TokensArgs, config: &Config) -> anyhow::Result<()> {
    let separator = args
        .separator
        .as_deref()
        .unwrap_or(&config.editor.separator);
    let tags = split_tags(&args.text, separator);

    let tokenizer = load_tokenizer(&config.tokenizer_path())?;
    let budget = TokenBudget::measure(
        tokenizer.as_ref(),
        &tags,
        separator,
        config.editor.token_overhead,
        config.editor.max_token_count,
    )?;

    println!("{}", label_style(budget.style()).apply_to(budget.label()));
    if budget.is_over() {
        tracing::warn!(
            "Caption is {} tokens over the budget",
            budget.count - budget.limit
        );
    }
    Ok(())
}

/// Terminal style for the token label.
pub fn label_style(style: LabelStyle) -> Style {
    match style {
        LabelStyle::Normal => Style::new(),
        LabelStyle::Warning => Style::new().red().bold(),
    }
}
