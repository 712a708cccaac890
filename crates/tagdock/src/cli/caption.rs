//! The `tagdock caption` command.
//!
//! Captions run on the worker's blocking pool; outcomes stream back over a
//! channel and are printed (and optionally applied to a session) as they
//! arrive.

use std::collections::HashMap;
use std::io::{self, BufWriter};
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, ValueEnum};
use tagdock_core::{
    load_tokenizer, CaptionOptions, CaptionOutcome, CaptionRecord, CaptionWorker, Config,
    JoyCaption, OutputFormat as WriterFormat, OutputWriter, TaggingSession,
};

use super::{expand_path, load_session, save_session};

/// Supported output formats.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OutputFormat {
    /// Single JSON array
    Json,
    /// One JSON object per line (newline-delimited)
    Jsonl,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Jsonl => write!(f, "jsonl"),
        }
    }
}

impl From<OutputFormat> for WriterFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Json => WriterFormat::Json,
            OutputFormat::Jsonl => WriterFormat::JsonLines,
        }
    }
}

#[derive(Args, Debug)]
pub struct CaptionArgs {
    /// Images to caption
    #[arg(required = true)]
    pub images: Vec<PathBuf>,

    /// Prompt for the model (defaults to `captioning.prompt`)
    #[arg(long)]
    pub prompt: Option<String>,

    /// Text the caption starts with
    #[arg(long)]
    pub caption_start: Option<String>,

    /// Upper bound on generated tokens
    #[arg(long)]
    pub max_new_tokens: Option<usize>,

    /// Images captioned at once
    #[arg(short, long, default_value_t = 1)]
    pub parallel: usize,

    /// Output format
    #[arg(short, long, value_enum, default_value = "jsonl")]
    pub format: OutputFormat,

    /// Session file to add the captions to
    #[arg(long)]
    pub session: Option<PathBuf>,
}

pub async fn execute(args: CaptionArgs, config: &Config) -> anyhow::Result<()> {
    let mut settings = config.captioning.clone();
    if let Some(prompt) = args.prompt {
        settings.prompt = prompt;
    }
    if let Some(caption_start) = args.caption_start {
        settings.caption_start = caption_start;
    }
    if let Some(max_new_tokens) = args.max_new_tokens {
        settings.max_new_tokens = max_new_tokens;
    }

    // Fail on unsupported settings before loading anything.
    if let Some(message) = JoyCaption::additional_error_message(&settings) {
        anyhow::bail!(message);
    }

    let mut target = match &args.session {
        Some(path) => Some(SessionTarget::open(&expand_path(path), config)?),
        None => None,
    };

    let model_dir = config.caption_model_dir();
    let separator = config.editor.separator.clone();
    let captioner = tokio::task::spawn_blocking(move || {
        JoyCaption::load(&settings, &model_dir, &separator)
    })
    .await??;

    let paths: Vec<PathBuf> = args.images.iter().map(|p| expand_path(p)).collect();
    let worker = CaptionWorker::new(
        Arc::new(captioner),
        CaptionOptions {
            parallel: args.parallel,
        },
    );
    let pb = create_progress_bar(paths.len() as u64);
    let (mut rx, handle) = worker.spawn(paths);

    let mut writer = OutputWriter::new(BufWriter::new(io::stdout()), args.format.into(), true);
    let mut records = Vec::new();
    while let Some((index, outcome)) = rx.recv().await {
        pb.inc(1);
        pb.set_message(
            outcome
                .path()
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
        );
        if let Some(target) = target.as_mut() {
            target.apply(&outcome)?;
        }
        let record = CaptionRecord::from(&outcome);
        match args.format {
            OutputFormat::Jsonl => writer.write(&record)?,
            OutputFormat::Json => records.push((index, record)),
        }
    }
    let (succeeded, failed) = handle.await?;
    pb.finish_and_clear();

    if matches!(args.format, OutputFormat::Json) {
        records.sort_by_key(|(index, _)| *index);
        let records: Vec<CaptionRecord> = records.into_iter().map(|(_, r)| r).collect();
        writer.write_all(&records)?;
    }
    writer.flush()?;

    if let Some(target) = target {
        target.save()?;
    }

    tracing::info!("Captioned {} images ({} failed)", succeeded, failed);
    if failed > 0 && succeeded == 0 {
        anyhow::bail!("No image could be captioned");
    }
    Ok(())
}

/// A session receiving captions by image path.
struct SessionTarget {
    path: PathBuf,
    session: TaggingSession,
    rows: HashMap<PathBuf, Vec<usize>>,
}

impl SessionTarget {
    fn open(path: &std::path::Path, config: &Config) -> anyhow::Result<Self> {
        let images = load_session(path)?;
        let mut rows: HashMap<PathBuf, Vec<usize>> = HashMap::new();
        for (row, image) in images.iter().enumerate() {
            rows.entry(expand_path(&image.path)).or_default().push(row);
        }
        let tokenizer = load_tokenizer(&config.tokenizer_path())?;
        // Captions are applied without prompting.
        let session = TaggingSession::new(images, tokenizer, config, |_: &str, _: &str| true);
        Ok(Self {
            path: path.to_path_buf(),
            session,
            rows,
        })
    }

    fn apply(&mut self, outcome: &CaptionOutcome) -> anyhow::Result<()> {
        let CaptionOutcome::Success { path, caption } = outcome else {
            return Ok(());
        };
        let Some(rows) = self.rows.get(path) else {
            tracing::warn!("{} is not part of the session", path.display());
            return Ok(());
        };
        for &row in rows {
            self.session.apply_caption(row, caption)?;
            self.warn_if_over_budget(row)?;
        }
        Ok(())
    }

    fn warn_if_over_budget(&self, row: usize) -> anyhow::Result<()> {
        let state = self.session.state();
        let Some(image) = state.images.get(row) else {
            return Ok(());
        };
        let budget = state.editor.measure(&image.tags)?;
        if budget.is_over() {
            tracing::warn!(
                "{} is over the token budget after captioning: {}",
                image.display_name(),
                budget.label()
            );
        }
        Ok(())
    }

    fn save(self) -> anyhow::Result<()> {
        save_session(&self.path, &self.session.images())
    }
}

fn create_progress_bar(total: u64) -> indicatif::ProgressBar {
    use indicatif::{ProgressBar, ProgressStyle};

    let pb = ProgressBar::new(total);
    if let Ok(style) = ProgressStyle::default_bar().template(
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}",
    ) {
        pb.set_style(style.progress_chars("##-"));
    }
    pb.set_message("loading...");
    pb
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_format_maps_to_writer_format() {
        assert_eq!(WriterFormat::from(OutputFormat::Json), WriterFormat::Json);
        assert_eq!(
            WriterFormat::from(OutputFormat::Jsonl),
            WriterFormat::JsonLines
        );
        assert_eq!(OutputFormat::Jsonl.to_string(), "jsonl");
    }
}
