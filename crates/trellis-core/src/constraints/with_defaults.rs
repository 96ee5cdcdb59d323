//! Default value reporting modes
//!
//! Controls whether reads synthesize schema defaults. Writes are never
//! affected. `report-all-tagged` reports the same wire payload as
//! `report-all`; the tag is not emitted as payload metadata.

use crate::constraints::Constraint;
use crate::errors::{Result, TrellisError};
use crate::node::{FieldRequest, ValueHandle};
use trellis_core_types::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WithDefaultsMode {
    ReportAll,
    Trim,
    Explicit,
    ReportAllTagged,
}

pub struct WithDefaults {
    mode: WithDefaultsMode,
}

impl WithDefaults {
    pub fn new(mode: WithDefaultsMode) -> Self {
        WithDefaults { mode }
    }

    pub fn parse(mode: &str) -> Result<Self> {
        let mode = match mode {
            "report-all" => WithDefaultsMode::ReportAll,
            "trim" => WithDefaultsMode::Trim,
            "explicit" => WithDefaultsMode::Explicit,
            "report-all-tagged" => WithDefaultsMode::ReportAllTagged,
            other => {
                return Err(TrellisError::PathSyntax {
                    reason: format!("invalid with-defaults mode {}", other),
                })
            }
        };
        Ok(WithDefaults { mode })
    }
}

impl Constraint for WithDefaults {
    fn check_field_post(&self, r: &FieldRequest, hnd: &mut ValueHandle) -> Result<bool> {
        if r.write {
            return Ok(true);
        }
        match self.mode {
            WithDefaultsMode::ReportAll | WithDefaultsMode::ReportAllTagged => {}
            WithDefaultsMode::Explicit => {
                // only values the provider actually reported
                if hnd.from_default {
                    hnd.val = None;
                }
            }
            WithDefaultsMode::Trim => {
                // elide values equal to the schema default
                if hnd.from_default {
                    hnd.val = None;
                } else if let (Some(val), Some(default)) =
                    (&hnd.val, r.sel.schema().default_for(r.meta))
                {
                    if let Ok(d) = Value::from_str_form(val.data_type(), default) {
                        if val.equal(&d) {
                            hnd.val = None;
                        }
                    }
                }
            }
        }
        Ok(true)
    }
}
