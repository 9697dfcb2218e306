//! daybook export/import command implementation

use std::path::PathBuf;

use serde::Serialize;
use tracing::info;

use super::Session;
use crate::error::Result;
use crate::output::{emit_success, HumanOutput, OutputOptions};
use crate::transfer;

/// Options for `daybook export`
pub struct ExportOptions {
    pub file: Option<PathBuf>,
    pub data_dir: Option<PathBuf>,
    pub output: OutputOptions,
}

/// Options for `daybook import`
pub struct ImportOptions {
    pub file: PathBuf,
    pub data_dir: Option<PathBuf>,
    pub output: OutputOptions,
}

#[derive(Serialize)]
struct TransferReport {
    path: PathBuf,
    days: usize,
    tasks: usize,
    day_tasks: usize,
    templates: usize,
    images: usize,
}

impl TransferReport {
    fn new(path: PathBuf, session: &Session) -> Self {
        Self {
            path,
            days: session.db.days().len(),
            tasks: session.db.tasks().len(),
            day_tasks: session.db.day_tasks().len(),
            templates: session.db.templates().len(),
            images: session.db.images().len(),
        }
    }

    fn human(&self, header: String) -> HumanOutput {
        let mut human = HumanOutput::new(header);
        human.push_summary("days", self.days.to_string());
        human.push_summary("tasks", self.tasks.to_string());
        human.push_summary("day tasks", self.day_tasks.to_string());
        human.push_summary("templates", self.templates.to_string());
        human.push_summary("images", self.images.to_string());
        human
    }
}

/// Without `--output` the document itself goes to stdout.
pub async fn run_export(options: ExportOptions) -> Result<()> {
    let session = Session::open(options.data_dir).await?;
    let document = session.db.export_json(transfer::ExportOptions {
        pretty: session.config.export.pretty,
        include_images: session.config.export.include_images,
    })?;

    let Some(path) = options.file else {
        println!("{document}");
        return Ok(());
    };

    tokio::fs::write(&path, document.as_bytes()).await?;
    info!(path = %path.display(), "wrote export");

    let report = TransferReport::new(path, &session);
    let human = report.human(format!("export: {}", report.path.display()));
    emit_success(options.output, "export", &report, Some(&human))
}

pub async fn run_import(options: ImportOptions) -> Result<()> {
    let document = tokio::fs::read_to_string(&options.file).await?;
    let mut session = Session::open(options.data_dir).await?;
    session.db.import_json(&document).await?;
    session.save().await?;

    let report = TransferReport::new(options.file, &session);
    let human = report.human(format!("import: {}", report.path.display()));
    emit_success(options.output, "import", &report, Some(&human))
}
