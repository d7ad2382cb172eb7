//! Row reassembly from repetition and definition levels.
//!
//! A leaf column decodes into a flat run of non-null values plus one definition
//! and (for repeated leaves) one repetition level per slot. This module turns that
//! back into exactly one [`RawValue`] per row: a scalar (or `Null`) for flat
//! leaves, a nested [`RawValue::List`] with one nesting level per repeated
//! ancestor otherwise.

use crate::value::RawValue;
use parquet::basic::Repetition;
use parquet::schema::types::{ColumnDescriptor, Type};

/// Level layout of a single leaf.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LevelInfo {
    pub max_def: i16,
    pub max_rep: i16,
    /// Definition level reached once the k-th repeated ancestor holds an element.
    pub repeated_def: Vec<i16>,
}

impl LevelInfo {
    /// Walk `root` along the leaf's path, recording where each repeated ancestor sits.
    #[must_use]
    pub fn new(root: &Type, descr: &ColumnDescriptor) -> Self {
        let mut node = root;
        let mut def = 0i16;
        let mut repeated_def = Vec::new();
        for part in descr.path().parts() {
            if node.is_primitive() {
                break;
            }
            let Some(child) = node.get_fields().iter().find(|f| f.name() == part) else {
                break;
            };
            let info = child.get_basic_info();
            if info.has_repetition() {
                match info.repetition() {
                    Repetition::OPTIONAL => def += 1,
                    Repetition::REPEATED => {
                        def += 1;
                        repeated_def.push(def);
                    }
                    Repetition::REQUIRED => {}
                }
            }
            node = child.as_ref();
        }
        Self {
            max_def: descr.max_def_level(),
            max_rep: descr.max_rep_level(),
            repeated_def,
        }
    }
}

/// Rebuild per-row values.
///
/// `values` holds only the non-null leaf values; `def_levels`/`rep_levels` may be
/// empty when the corresponding maximum level is zero.
#[must_use]
pub fn assemble(
    values: Vec<RawValue>,
    def_levels: &[i16],
    rep_levels: &[i16],
    info: &LevelInfo,
) -> Vec<RawValue> {
    if info.max_rep == 0 || info.repeated_def.is_empty() {
        if info.max_def == 0 {
            return values;
        }
        let mut values = values.into_iter();
        return def_levels
            .iter()
            .map(|&d| {
                if d == info.max_def {
                    values.next().unwrap_or(RawValue::Null)
                } else {
                    RawValue::Null
                }
            })
            .collect();
    }

    let depth = info.repeated_def.len();
    let mut rows = Vec::new();
    let mut open: Vec<Vec<RawValue>> = Vec::with_capacity(depth);
    let mut values = values.into_iter();

    for (i, &d) in def_levels.iter().enumerate() {
        let r = rep_levels.get(i).copied().unwrap_or(0);
        let r = usize::try_from(r).unwrap_or(0);
        if r == 0 {
            if let Some(row) = close_all(&mut open) {
                rows.push(row);
            }
        } else {
            close_to(&mut open, r.min(depth));
        }

        let mut reached_leaf = true;
        while open.len() < depth {
            let k = open.len();
            open.push(Vec::new());
            if d < info.repeated_def[k] {
                reached_leaf = false;
                break;
            }
        }
        if reached_leaf && let Some(innermost) = open.last_mut() {
            let leaf = if d == info.max_def {
                values.next().unwrap_or(RawValue::Null)
            } else {
                RawValue::Null
            };
            innermost.push(leaf);
        }
    }
    if let Some(row) = close_all(&mut open) {
        rows.push(row);
    }
    rows
}

fn close_to(open: &mut Vec<Vec<RawValue>>, keep: usize) {
    while open.len() > keep.max(1) {
        if let Some(list) = open.pop()
            && let Some(parent) = open.last_mut()
        {
            parent.push(RawValue::List(list));
        }
    }
}

fn close_all(open: &mut Vec<Vec<RawValue>>) -> Option<RawValue> {
    close_to(open, 1);
    open.pop().map(RawValue::List)
}
