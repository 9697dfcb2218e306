use std::sync::Arc;

use super::{write_if_changed, Database};
use crate::error::{Error, Result};
use crate::model::{Template, TemplateId, TemplateUpdate};

impl Database {
    pub fn get_template_info(&self, id: TemplateId) -> Option<Arc<Template>> {
        self.templates.get(&id)
    }

    pub fn get_all_template_info(&self) -> Vec<Arc<Template>> {
        self.templates.values()
    }

    pub fn add_template(&mut self, update: TemplateUpdate) -> Arc<Template> {
        let id = self.next_template_id();
        let template = Arc::new(update.merge_into(Template::new(id)));
        self.templates.set(id, Arc::clone(&template));
        template
    }

    /// Update an existing template. Templates are only created by
    /// [`Database::add_template`].
    pub fn set_template_info(
        &mut self,
        id: TemplateId,
        update: TemplateUpdate,
    ) -> Result<Arc<Template>> {
        let existing = self
            .templates
            .get(&id)
            .ok_or(Error::TemplateNotFound(id))?;
        let merged = update.merge_into((*existing).clone());
        Ok(write_if_changed(&mut self.templates, id, merged))
    }

    pub fn delete_template(&mut self, id: TemplateId) -> bool {
        self.templates.delete(&id)
    }
}
