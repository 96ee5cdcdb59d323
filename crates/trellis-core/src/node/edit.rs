//! The editor
//!
//! Walks two selections in lockstep: `from` drives enumeration, `to`
//! receives. The strategy decides how existing destination data is
//! treated. Ordering guarantees: key leaves precede non-key leaves, all
//! leaves at a level precede recursion into children, and begin/end
//! edit events bracket every read and write of the walk.

use crate::errors::{Result, TrellisError};
use crate::meta::DefId;
use crate::node::FieldRequest;
use crate::node::{Selection, ValueHandle};
use trellis_core_types::schema::EVENT_EDIT;

/// Edit mode
///
/// | mode | destination exists | destination absent |
/// |---|---|---|
/// | Insert | conflict | create |
/// | Upsert | merge | create |
/// | Update | merge | not-found |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Insert,
    Upsert,
    Update,
}

impl Strategy {
    fn creates(&self) -> bool {
        matches!(self, Strategy::Insert | Strategy::Upsert)
    }
}

/// Run one edit between two selections at the same schema position.
///
/// Begin-edit fires on the destination root (bubbling so every ancestor
/// observes) before any write, then on the source; end-edit fires in
/// reverse order, and still fires for cleanup when the walk fails.
pub(crate) fn edit(from: &Selection, to: &Selection, strategy: Strategy) -> Result<()> {
    crate::log_engine_event!(EVENT_EDIT, to.path(), edit_mode = ?strategy);
    to.begin_edit(strategy.creates(), true)?;
    from.begin_edit(false, false)?;

    // entry at a list node iterates its items; anything else copies in
    // place
    let walk = if from.schema().is_list(from.meta()) && !from.inside_list() {
        edit_list_items(from, to, strategy)
    } else {
        edit_node(from, to, strategy)
    };

    // end-edit is cleanup and must reach both sides even on error
    let from_end = from.end_edit(false, false);
    let to_end = to.end_edit(strategy.creates(), true);
    walk.and(from_end).and(to_end)
}

/// Copy one node level: leaves first (keys leading), then containers,
/// lists, and the active case of each choice.
fn edit_node(from: &Selection, to: &Selection, strategy: Strategy) -> Result<()> {
    let schema = std::rc::Rc::clone(from.schema());
    let children = schema.data_definitions(from.meta());

    let key_meta: Vec<DefId> = if from.inside_list() {
        schema.key_meta(from.meta()).to_vec()
    } else {
        Vec::new()
    };

    let mut leaves: Vec<DefId> = Vec::new();
    let mut rest: Vec<DefId> = Vec::new();
    for def in children {
        if schema.is_leaf(def) && !key_meta.contains(&def) {
            leaves.push(def);
        } else if !schema.is_leaf(def) {
            rest.push(def);
        }
    }

    for &key in &key_meta {
        copy_key_leaf(from, to, key)?;
    }
    for leaf in leaves {
        copy_leaf(from, to, leaf)?;
    }

    for def in rest {
        if schema.is_rpc(def) || schema.is_notification(def) {
            continue;
        }
        if schema.is_choice(def) {
            if let Some(case) = from.node().choose(from, def)? {
                check_case_change(from, to, def, case, strategy)?;
                edit_case(from, to, case, strategy)?;
            }
            continue;
        }
        if schema.is_list(def) {
            edit_list(from, to, def, strategy)?;
        } else if schema.has_children(def) {
            edit_container(from, to, def, strategy)?;
        }
    }
    Ok(())
}

/// Updating across cases requires an explicit delete of the old case
fn check_case_change(
    from: &Selection,
    to: &Selection,
    choice: DefId,
    case: DefId,
    strategy: Strategy,
) -> Result<()> {
    if strategy != Strategy::Update {
        return Ok(());
    }
    if let Some(active) = to.node().choose(to, choice)? {
        if active != case {
            return Err(TrellisError::CaseChange {
                choice: from.schema().ident(choice).to_string(),
            });
        }
    }
    Ok(())
}

/// Recurse into the members of a choice's active case at this level
fn edit_case(from: &Selection, to: &Selection, case: DefId, strategy: Strategy) -> Result<()> {
    let schema = std::rc::Rc::clone(from.schema());
    for def in schema.data_definitions(case) {
        if schema.is_rpc(def) || schema.is_notification(def) {
            continue;
        }
        if schema.is_leaf(def) {
            copy_leaf(from, to, def)?;
        } else if schema.is_choice(def) {
            if let Some(inner) = from.node().choose(from, def)? {
                check_case_change(from, to, def, inner, strategy)?;
                edit_case(from, to, inner, strategy)?;
            }
        } else if schema.is_list(def) {
            edit_list(from, to, def, strategy)?;
        } else if schema.has_children(def) {
            edit_container(from, to, def, strategy)?;
        }
    }
    Ok(())
}

fn copy_leaf(from: &Selection, to: &Selection, leaf: DefId) -> Result<()> {
    let mut r = FieldRequest {
        sel: from.clone(),
        meta: leaf,
        write: false,
    };
    let mut hnd = ValueHandle::default();
    from.get_value_hnd(&mut r, &mut hnd, true)?;
    if let Some(v) = hnd.val {
        to.set_value(leaf, v)?;
    }
    Ok(())
}

/// Key leaves are written before everything else; once an item exists,
/// a key write disagreeing with the creation key is a conflict.
fn copy_key_leaf(from: &Selection, to: &Selection, leaf: DefId) -> Result<()> {
    let schema = from.schema();
    let mut r = FieldRequest {
        sel: from.clone(),
        meta: leaf,
        write: false,
    };
    let mut hnd = ValueHandle::default();
    from.get_value_hnd(&mut r, &mut hnd, true)?;
    let Some(v) = hnd.val else {
        return Ok(());
    };
    if !to.key().is_empty() {
        let key_meta = schema.key_meta(to.meta());
        if let Some(pos) = key_meta.iter().position(|&k| k == leaf) {
            if let Some(existing) = to.key().get(pos) {
                if !existing.equal(&v) {
                    return Err(TrellisError::KeyConflict {
                        path: to.path().to_string(),
                    });
                }
            }
        }
    }
    to.set_value(leaf, v)
}

fn edit_container(from: &Selection, to: &Selection, def: DefId, strategy: Strategy) -> Result<()> {
    let Some(from_child) = from.select(def, false)? else {
        return Ok(());
    };
    let existing = to.select(def, false)?;
    let to_child = match (existing, strategy) {
        (Some(_), Strategy::Insert) => {
            return Err(TrellisError::InsertExists {
                path: from_child.path().to_string(),
            });
        }
        (Some(child), _) => child,
        (None, Strategy::Update) => {
            return Err(TrellisError::UpdateMissing {
                path: from_child.path().to_string(),
            });
        }
        (None, _) => to
            .select(def, true)?
            .ok_or_else(|| TrellisError::Internal {
                message: format!(
                    "node refused to create {}",
                    from_child.path()
                ),
            })?,
    };
    edit_node(&from_child, &to_child, strategy)
}

fn edit_list(from: &Selection, to: &Selection, def: DefId, strategy: Strategy) -> Result<()> {
    let schema = std::rc::Rc::clone(from.schema());
    let Some(from_list) = from.select(def, false)? else {
        return Ok(());
    };
    let to_list = match to.select(def, false)? {
        Some(list) => list,
        None if strategy == Strategy::Update => {
            return Err(TrellisError::UpdateMissing {
                path: from_list.path().to_string(),
            });
        }
        None => to
            .select(def, true)?
            .ok_or_else(|| TrellisError::Internal {
                message: format!("node refused to create {}", from_list.path()),
            })?,
    };

    edit_list_items(&from_list, &to_list, strategy)
}

/// Align and copy list items between two list node selections
fn edit_list_items(from_list: &Selection, to_list: &Selection, strategy: Strategy) -> Result<()> {
    let schema = std::rc::Rc::clone(from_list.schema());
    let def = from_list.meta();
    let keyed = !schema.key_meta(def).is_empty();
    let mut lr = from_list.list_request();
    loop {
        let Some((from_item, key)) = from_list.select_list_item(&mut lr)? else {
            break;
        };
        if keyed && key.is_empty() {
            return Err(TrellisError::MissingKey {
                list: schema.ident(def).to_string(),
            });
        }

        // keyed items can be probed in the destination; unkeyed items
        // cannot be addressed and are treated as absent
        let existing = if keyed {
            let mut probe = to_list.list_request();
            probe.key = key.clone();
            to_list.select_list_item(&mut probe)?
        } else {
            None
        };

        let to_item = match (existing, strategy) {
            (Some(_), Strategy::Insert) => {
                return Err(TrellisError::InsertExists {
                    path: from_item.path().to_string(),
                });
            }
            (Some((item, _)), _) => item,
            (None, Strategy::Update) => {
                return Err(TrellisError::UpdateMissing {
                    path: from_item.path().to_string(),
                });
            }
            (None, _) => {
                let mut create = to_list.list_request();
                create.key = key.clone();
                create.new = true;
                to_list
                    .select_list_item(&mut create)?
                    .map(|(item, _)| item)
                    .ok_or_else(|| TrellisError::Internal {
                        message: format!("node refused to create {}", from_item.path()),
                    })?
            }
        };

        edit_node(&from_item, &to_item, strategy)?;
        lr.increment_row();
    }
    Ok(())
}
