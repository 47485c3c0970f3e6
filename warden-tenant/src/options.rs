use warden_core::WardenConfigSnapshot;

/// Config key for [`TenantOptions::strict`].
pub const STRICT_KEY: &str = "tenant.strict";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TenantOptions {
    /// Reject calls on tenant-scoped models that carry no tenant id
    /// (unless scoping is disabled) instead of running them unfiltered.
    pub strict: bool,
}

impl TenantOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Read options from app config. Unset or unparsable keys keep their
    /// defaults.
    pub fn from_config(config: &WardenConfigSnapshot) -> Self {
        let mut opts = Self::default();
        if let Some(strict) = config.get_bool(STRICT_KEY) {
            opts.strict = strict;
        }
        opts
    }
}
