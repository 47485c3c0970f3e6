use serde::{Deserialize, Serialize};
use warden_core::Auditable;

/// Audit columns to embed in a model with `#[serde(flatten)]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Audit {
    pub created_by: String,
    pub updated_by: String,
}

impl Audit {
    pub fn new(created_by: impl Into<String>, updated_by: impl Into<String>) -> Self {
        Self {
            created_by: created_by.into(),
            updated_by: updated_by.into(),
        }
    }
}

impl Auditable for Audit {
    fn set_created_by(&mut self, actor: &str) {
        self.created_by = actor.to_string();
    }

    fn created_by(&self) -> &str {
        &self.created_by
    }

    fn set_updated_by(&mut self, actor: &str) {
        self.updated_by = actor.to_string();
    }

    fn updated_by(&self) -> &str {
        &self.updated_by
    }
}
