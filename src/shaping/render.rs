//! Rendering of grouped and flat results into response JSON.
//!
//! # Responsibilities
//! - Turn a [`GroupNode`] tree into a [`Shaped`] tree whose child lists live
//!   in a dedicated slot, separate from the key fields
//! - Serialize that tree, choosing a wire name for the child slot that never
//!   collides with a field name on the same object
//! - Apply `map`/`exclude` rules per property
//!
//! # Design Decisions
//! - The child slot is part of the type, not a naming convention; the wire
//!   name `GroupByLevel_<n>` is picked only at serialization time
//! - Rename and exclude are local to one property, so the pass gives the same
//!   answer top-down or bottom-up
//! - Leaf records drop every grouping field of their path; those values are
//!   already carried by the enclosing group objects

use std::collections::{BTreeMap, BTreeSet};

use serde_json::{Map, Value};

use crate::definition::OutputRules;
use crate::shaping::error::ShapingResult;
use crate::shaping::group::{group_levels, GroupNode};
use crate::shaping::record::Record;

/// Grouped result with an explicit child slot.
#[derive(Debug, Clone, PartialEq)]
pub enum Shaped {
    /// Deepest level: records with grouping fields removed.
    Records(Vec<Record>),
    Groups(Vec<ShapedGroup>),
}

/// One bucket of one level.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapedGroup {
    pub keys: Record,
    pub children: Shaped,
}

impl Shaped {
    /// Convert a grouping tree, stripping grouping fields from leaf records.
    pub fn from_tree(root: &GroupNode) -> Self {
        let mut path = Vec::new();
        Self::build(root, &mut path)
    }

    fn build(node: &GroupNode, path: &mut Vec<String>) -> Self {
        let mark = path.len();
        path.extend(node.fields().iter().cloned());

        let groups = node
            .buckets()
            .iter()
            .enumerate()
            .map(|(i, bucket)| {
                let keys: Record = bucket
                    .key
                    .pairs()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect();
                let children = match node.children() {
                    Some(children) => Self::build(&children[i], path),
                    None => Shaped::Records(
                        bucket
                            .records
                            .iter()
                            .map(|r| strip_fields(r, path))
                            .collect(),
                    ),
                };
                ShapedGroup { keys, children }
            })
            .collect();

        path.truncate(mark);
        Shaped::Groups(groups)
    }
}

fn strip_fields(record: &Record, fields: &[String]) -> Record {
    record
        .iter()
        .filter(|(k, _)| !fields.iter().any(|f| f == *k))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// Renders results according to one definition's output rules.
#[derive(Debug, Clone, Copy)]
pub struct ResponseShaper<'a> {
    rename: &'a BTreeMap<String, String>,
    exclude: &'a BTreeSet<String>,
}

impl<'a> ResponseShaper<'a> {
    pub fn new(rules: &'a OutputRules) -> Self {
        Self {
            rename: &rules.rename,
            exclude: &rules.exclude,
        }
    }

    /// Group `records` by the rules' levels and render; flat when no levels
    /// are configured.
    pub fn shape(&self, records: Vec<Record>, levels: &[Vec<String>]) -> ShapingResult<Value> {
        if levels.is_empty() {
            return Ok(self.render_records(&records));
        }
        match group_levels(records, levels)? {
            Some(root) => Ok(self.render_tree(&root)),
            None => Ok(Value::Array(Vec::new())),
        }
    }

    /// Flat array of records with rename/exclude applied.
    pub fn render_records(&self, records: &[Record]) -> Value {
        Value::Array(
            records
                .iter()
                .map(|r| Value::Object(self.apply(r.clone())))
                .collect(),
        )
    }

    pub fn render_tree(&self, root: &GroupNode) -> Value {
        self.render_shaped(&Shaped::from_tree(root), 1)
    }

    pub fn render_shaped(&self, shaped: &Shaped, level: usize) -> Value {
        match shaped {
            Shaped::Records(records) => self.render_records(records),
            Shaped::Groups(groups) => Value::Array(
                groups
                    .iter()
                    .map(|g| {
                        let mut object = self.apply(g.keys.clone());
                        let slot = child_slot_name(level, &object);
                        object.insert(slot, self.render_shaped(&g.children, level + 1));
                        Value::Object(object)
                    })
                    .collect(),
            ),
        }
    }

    /// Apply rename/exclude to every object property inside `value`.
    pub fn post_process(&self, value: &mut Value) {
        match value {
            Value::Object(map) => {
                let taken = std::mem::take(map);
                *map = self.apply(taken);
                for v in map.values_mut() {
                    self.post_process(v);
                }
            }
            Value::Array(items) => {
                for v in items.iter_mut() {
                    self.post_process(v);
                }
            }
            _ => {}
        }
    }

    fn apply(&self, record: Map<String, Value>) -> Map<String, Value> {
        if self.rename.is_empty() && self.exclude.is_empty() {
            return record;
        }
        record
            .into_iter()
            .filter(|(k, _)| !self.exclude.contains(k))
            .map(|(k, v)| match self.rename.get(&k) {
                Some(target) => (target.clone(), v),
                None => (k, v),
            })
            .collect()
    }
}

/// `GroupByLevel_<level>`, suffixed with `_` until it is not a field name.
fn child_slot_name(level: usize, object: &Map<String, Value>) -> String {
    let mut name = format!("GroupByLevel_{level}");
    while object.contains_key(&name) {
        name.push('_');
    }
    name
}
