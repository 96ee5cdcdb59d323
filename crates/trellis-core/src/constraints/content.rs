//! Config/state content filtering
//!
//! Uses the schema's config inheritance: a container with `config false`
//! makes every descendant non-config unless explicitly overridden.

use crate::constraints::Constraint;
use crate::errors::{Result, TrellisError};
use crate::node::{ChildRequest, FieldRequest, ListRequest, ValueHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Content {
    All,
    Config,
    NonConfig,
}

pub struct ContentConstraint {
    mode: Content,
}

impl ContentConstraint {
    pub fn new(mode: Content) -> Self {
        ContentConstraint { mode }
    }

    pub fn parse(mode: &str) -> Result<Self> {
        let mode = match mode {
            "all" => Content::All,
            "config" => Content::Config,
            "nonconfig" => Content::NonConfig,
            other => {
                return Err(TrellisError::PathSyntax {
                    reason: format!("invalid content mode {}", other),
                })
            }
        };
        Ok(ContentConstraint { mode })
    }
}

impl Constraint for ContentConstraint {
    fn check_container_pre(&self, r: &ChildRequest) -> Result<bool> {
        match self.mode {
            // a config=false container has only non-config descendants
            Content::Config => Ok(r.sel.schema().config(r.meta)),
            // non-config data can sit inside config containers, keep
            // descending and filter at the leaves
            Content::NonConfig | Content::All => Ok(true),
        }
    }

    fn check_list_pre(&self, r: &mut ListRequest) -> Result<bool> {
        match self.mode {
            Content::Config => Ok(r.sel.schema().config(r.meta)),
            Content::NonConfig | Content::All => Ok(true),
        }
    }

    fn check_field_pre(&self, r: &FieldRequest, _hnd: &mut ValueHandle) -> Result<bool> {
        let config = r.sel.schema().config(r.meta);
        match self.mode {
            Content::All => Ok(true),
            Content::Config => Ok(config),
            Content::NonConfig => Ok(!config),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert!(ContentConstraint::parse("config").is_ok());
        assert!(ContentConstraint::parse("nonconfig").is_ok());
        assert!(ContentConstraint::parse("all").is_ok());
        assert!(ContentConstraint::parse("everything").is_err());
    }
}
