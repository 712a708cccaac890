//! The `tagdock edit` command: an interactive tag editor over a session file.

mod completion;
mod interactive;
mod theme;

use std::path::PathBuf;

use clap::Args;
use dialoguer::Confirm;
use tagdock_core::{load_tokenizer, Config, TaggingSession};

use super::{expand_path, load_session, save_session};
use interactive::Exit;

#[derive(Args, Debug)]
pub struct EditArgs {
    /// Session file (`[{"path": ..., "tags": [...]}]`)
    pub session: PathBuf,

    /// Don't write changes back to the session file
    #[arg(long)]
    pub dry_run: bool,

    /// Only show images carrying this tag
    #[arg(long)]
    pub filter: Option<String>,
}

pub async fn execute(args: EditArgs, config: &Config) -> anyhow::Result<()> {
    let path = expand_path(&args.session);
    let images = load_session(&path)?;
    if images.is_empty() {
        anyhow::bail!("Session {} has no images", path.display());
    }
    let tokenizer = load_tokenizer(&config.tokenizer_path())?;

    let mut session = TaggingSession::new(images, tokenizer, config, confirm_dialog);
    theme::print_banner(&path.display().to_string());

    let exit = interactive::run(&mut session, args.filter)?;
    match exit {
        Exit::Save if args.dry_run => {
            tracing::info!("Dry run, not writing {}", path.display());
        }
        Exit::Save => save_session(&path, &session.images())?,
        Exit::Discard => tracing::info!("Changes discarded"),
    }
    Ok(())
}

/// Yes/no dialog for batched edits. An interrupted dialog counts as "no".
fn confirm_dialog(title: &str, question: &str) -> bool {
    let theme = theme::tagdock_theme();
    Confirm::with_theme(&theme)
        .with_prompt(format!("{title}: {question}"))
        .default(false)
        .interact_opt()
        .ok()
        .flatten()
        .unwrap_or(false)
}
