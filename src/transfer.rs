//! Whole-database export and transactional import.
//!
//! An import replaces every register from a bundle. If any register fails to
//! load, the pre-import snapshot is loaded back; if even that fails, every
//! register is reloaded from the storage medium. The import error is returned
//! either way.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info, warn};

use crate::database::{
    day_spec, day_task_spec, image_spec, task_spec, template_spec, Database,
};
use crate::error::{Error, Result};
use crate::model::{Day, DayTask, Task, TaskId, Template, TemplateId};
use crate::persistence::RegisterSource;

/// Every register's entries, as written to an export file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportBundle {
    pub days: Vec<(String, Day)>,
    pub tasks: Vec<(TaskId, Task)>,
    pub day_tasks: Vec<(String, DayTask)>,
    pub templates: Vec<(TemplateId, Template)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<(String, String)>>,
}

impl ExportBundle {
    pub fn into_import(self) -> Result<ImportBundle> {
        Ok(ImportBundle {
            days: serde_json::to_value(self.days)?,
            tasks: serde_json::to_value(self.tasks)?,
            day_tasks: serde_json::to_value(self.day_tasks)?,
            templates: Some(serde_json::to_value(self.templates)?),
            images: self.images.map(serde_json::to_value).transpose()?,
        })
    }
}

/// Unvalidated bundle handed to [`Database::import_snapshot`].
///
/// `templates` and `images` are optional; a register left out keeps its
/// current contents.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportBundle {
    #[serde(default)]
    pub days: Value,
    #[serde(default)]
    pub tasks: Value,
    #[serde(default)]
    pub day_tasks: Value,
    #[serde(default)]
    pub templates: Option<Value>,
    #[serde(default)]
    pub images: Option<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportOptions {
    pub pretty: bool,
    pub include_images: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            pretty: true,
            include_images: true,
        }
    }
}

fn owned<K: Clone, V: Clone>(entries: Vec<(K, std::sync::Arc<V>)>) -> Vec<(K, V)> {
    entries
        .into_iter()
        .map(|(key, value)| (key, (*value).clone()))
        .collect()
}

impl Database {
    pub fn export_snapshot(&self) -> ExportBundle {
        ExportBundle {
            days: owned(self.days.entries()),
            tasks: owned(self.tasks.entries()),
            day_tasks: owned(self.day_tasks.entries()),
            templates: owned(self.templates.entries()),
            images: Some(owned(self.images.entries())),
        }
    }

    pub fn export_json(&self, options: ExportOptions) -> Result<String> {
        let mut bundle = self.export_snapshot();
        if !options.include_images {
            bundle.images = None;
        }
        let text = if options.pretty {
            serde_json::to_string_pretty(&bundle)?
        } else {
            serde_json::to_string(&bundle)?
        };
        Ok(text)
    }

    /// Parse an export file and import it. A document that is not JSON is
    /// rejected before anything is touched.
    pub async fn import_json(&mut self, text: &str) -> Result<()> {
        let bundle: ImportBundle = serde_json::from_str(text)?;
        self.import_snapshot(bundle).await
    }

    /// Replace every register with the bundle's contents, all or nothing.
    ///
    /// Taking `&mut self` means no other import (or any other write) can run
    /// until this one has finished or rolled back.
    pub async fn import_snapshot(&mut self, bundle: ImportBundle) -> Result<()> {
        let backup = self.export_snapshot();

        let err = match self.load_bundle(bundle).await {
            Ok(()) => {
                info!(
                    days = self.days.len(),
                    tasks = self.tasks.len(),
                    day_tasks = self.day_tasks.len(),
                    "imported snapshot"
                );
                return Ok(());
            }
            Err(err) => err,
        };

        warn!(error = %err, "import failed, restoring previous state");
        let restored = match backup.into_import() {
            Ok(bundle) => self.load_bundle(bundle).await,
            Err(backup_err) => Err(backup_err),
        };
        self.roll_back_import(err, restored).await
    }

    /// Finish a failed import once the backup has been loaded back (or not).
    /// A failed restore falls back to the persisted registers. Always returns
    /// the import error.
    pub(crate) async fn roll_back_import(
        &mut self,
        err: Error,
        restored: Result<()>,
    ) -> Result<()> {
        if let Err(restore_err) = restored {
            error!(error = %restore_err, "restoring snapshot failed, reloading from storage");
            if let Err(reload_err) = self.load_all().await {
                error!(error = %reload_err, "reloading from storage failed");
            }
        }
        Err(err)
    }

    async fn load_bundle(&mut self, bundle: ImportBundle) -> Result<()> {
        let gateway = self.gateway.clone();
        gateway
            .load_register(&mut self.days, &day_spec(), RegisterSource::Value(bundle.days))
            .await?;
        gateway
            .load_register(&mut self.tasks, &task_spec(), RegisterSource::Value(bundle.tasks))
            .await?;
        gateway
            .load_register(
                &mut self.day_tasks,
                &day_task_spec(),
                RegisterSource::Value(bundle.day_tasks),
            )
            .await?;
        if let Some(templates) = bundle.templates.filter(|value| !value.is_null()) {
            gateway
                .load_register(
                    &mut self.templates,
                    &template_spec(),
                    RegisterSource::Value(templates),
                )
                .await?;
        }
        if let Some(images) = bundle.images.filter(|value| !value.is_null()) {
            gateway
                .load_register(&mut self.images, &image_spec(), RegisterSource::Value(images))
                .await?;
        }
        self.sync_id_counters();
        Ok(())
    }
}
