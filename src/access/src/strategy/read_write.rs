//! Static read / write switch strategy

use async_trait::async_trait;

use super::{digest_token, AccessLimitsStrategy};
use crate::error::Result;
use crate::limits::AccessLimits;
use crate::predicate::Predicate;
use crate::types::{CatalogMode, Principal, Resource, StrategyOptions};

/// Grants or denies reading and writing as a whole; ignores options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadWriteStrategy {
    can_read: bool,
    can_write: bool,
}

impl ReadWriteStrategy {
    pub fn new(can_read: bool, can_write: bool) -> Self {
        Self {
            can_read,
            can_write,
        }
    }

    pub fn allow_all() -> Self {
        Self::new(true, true)
    }

    pub fn read_only() -> Self {
        Self::new(true, false)
    }

    pub fn deny_all() -> Self {
        Self::new(false, false)
    }

    pub fn read_filter(&self) -> Predicate {
        switch(self.can_read)
    }

    pub fn write_filter(&self) -> Predicate {
        switch(self.can_write)
    }
}

impl Default for ReadWriteStrategy {
    fn default() -> Self {
        Self::read_only()
    }
}

fn switch(allowed: bool) -> Predicate {
    if allowed {
        Predicate::Include
    } else {
        Predicate::Exclude
    }
}

#[async_trait]
impl AccessLimitsStrategy for ReadWriteStrategy {
    async fn build_access_limits(
        &self,
        _principal: Option<&Principal>,
        resource: &Resource,
        catalog_mode: CatalogMode,
        _options: &StrategyOptions,
    ) -> Result<AccessLimits> {
        AccessLimits::for_kind(
            &resource.kind,
            catalog_mode,
            self.read_filter(),
            self.write_filter(),
            None,
        )
    }

    async fn security_token(
        &self,
        _principal: Option<&Principal>,
        _resource: &Resource,
        _options: &StrategyOptions,
    ) -> Result<String> {
        Ok(digest_token(&format!(
            "{}_{}",
            self.read_filter(),
            self.write_filter()
        )))
    }
}
