//! Multi-level grouping of flat records.
//!
//! # Responsibilities
//! - Partition records into buckets keyed by a [`GroupKey`]
//! - Extend every leaf of an existing tree by one more level
//!
//! # Design Decisions
//! - Buckets keep first-appearance order; records keep input order inside a
//!   bucket (stable partition)
//! - A blake3 digest speeds up key hashing, but equality always compares the
//!   exact field and value tuples, so a digest collision never merges groups
//! - A child node knows the key that selected it; the parent link is the
//!   ownership edge itself

use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde_json::Value;

use crate::shaping::error::{ShapingError, ShapingResult};
use crate::shaping::record::Record;

/// Composite key for one bucket at one grouping level.
#[derive(Debug, Clone)]
pub struct GroupKey {
    fields: Arc<[String]>,
    values: Vec<Value>,
    digest: [u8; 32],
}

impl GroupKey {
    pub fn new(fields: Arc<[String]>, values: Vec<Value>) -> Self {
        let digest = digest(&fields, &values);
        Self {
            fields,
            values,
            digest,
        }
    }

    /// Read the key fields out of `record`.
    pub fn extract(fields: &Arc<[String]>, record: &Record) -> ShapingResult<Self> {
        let values = fields
            .iter()
            .map(|f| {
                record
                    .get(f)
                    .cloned()
                    .ok_or_else(|| ShapingError::MissingField { field: f.clone() })
            })
            .collect::<ShapingResult<Vec<_>>>()?;
        Ok(Self::new(Arc::clone(fields), values))
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn digest(&self) -> &[u8; 32] {
        &self.digest
    }

    /// `(field, value)` pairs in key order.
    pub fn pairs(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter().zip(self.values.iter())
    }

    #[cfg(test)]
    fn with_digest(fields: Arc<[String]>, values: Vec<Value>, digest: [u8; 32]) -> Self {
        Self {
            fields,
            values,
            digest,
        }
    }
}

impl PartialEq for GroupKey {
    fn eq(&self, other: &Self) -> bool {
        self.digest == other.digest && self.fields == other.fields && self.values == other.values
    }
}

impl Eq for GroupKey {}

impl Hash for GroupKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.digest.hash(state);
    }
}

fn digest(fields: &[String], values: &[Value]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();
    for field in fields {
        hasher.update(&(field.len() as u64).to_le_bytes());
        hasher.update(field.as_bytes());
    }
    for value in values {
        let text = value.to_string();
        hasher.update(&(text.len() as u64).to_le_bytes());
        hasher.update(text.as_bytes());
    }
    *hasher.finalize().as_bytes()
}

/// Records sharing one key at one level.
#[derive(Debug, Clone)]
pub struct Bucket {
    pub key: GroupKey,
    pub records: Vec<Record>,
}

/// One level of the grouping tree.
#[derive(Debug, Clone)]
pub struct GroupNode {
    fields: Arc<[String]>,
    buckets: Vec<Bucket>,
    parent_key: Option<GroupKey>,
    /// `children[i]` partitions `buckets[i]`; `None` at the deepest level.
    children: Option<Vec<GroupNode>>,
}

impl GroupNode {
    /// Partition `records` by `key_fields`.
    pub fn group(records: Vec<Record>, key_fields: &[String]) -> ShapingResult<Self> {
        Self::partition(records, key_fields.into(), None)
    }

    fn partition(
        records: Vec<Record>,
        fields: Arc<[String]>,
        parent_key: Option<GroupKey>,
    ) -> ShapingResult<Self> {
        let mut index: HashMap<GroupKey, usize> = HashMap::new();
        let mut buckets: Vec<Bucket> = Vec::new();

        for record in records {
            let key = GroupKey::extract(&fields, &record)?;
            match index.get(&key) {
                Some(&i) => buckets[i].records.push(record),
                None => {
                    index.insert(key.clone(), buckets.len());
                    buckets.push(Bucket {
                        key,
                        records: vec![record],
                    });
                }
            }
        }

        Ok(Self {
            fields,
            buckets,
            parent_key,
            children: None,
        })
    }

    /// Add one grouping level below every current leaf.
    ///
    /// A node without children partitions each of its buckets into a child;
    /// a node that already has children forwards the call to all of them.
    pub fn then_by(&mut self, key_fields: &[String]) -> ShapingResult<()> {
        match &mut self.children {
            Some(children) => {
                for child in children.iter_mut() {
                    child.then_by(key_fields)?;
                }
            }
            None => {
                let fields: Arc<[String]> = key_fields.into();
                let children = self
                    .buckets
                    .iter()
                    .map(|b| {
                        Self::partition(
                            b.records.clone(),
                            Arc::clone(&fields),
                            Some(b.key.clone()),
                        )
                    })
                    .collect::<ShapingResult<Vec<_>>>()?;
                self.children = Some(children);
            }
        }
        Ok(())
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn buckets(&self) -> &[Bucket] {
        &self.buckets
    }

    /// The bucket key that selected this node from its parent.
    pub fn parent_key(&self) -> Option<&GroupKey> {
        self.parent_key.as_ref()
    }

    pub fn children(&self) -> Option<&[GroupNode]> {
        self.children.as_deref()
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    /// Number of levels from this node down.
    pub fn depth(&self) -> usize {
        match &self.children {
            Some(children) => 1 + children.iter().map(GroupNode::depth).max().unwrap_or(0),
            None => 1,
        }
    }

    /// Records held by the deepest level, summed over the tree.
    pub fn leaf_record_count(&self) -> usize {
        match &self.children {
            Some(children) => children.iter().map(GroupNode::leaf_record_count).sum(),
            None => self.buckets.iter().map(|b| b.records.len()).sum(),
        }
    }
}

/// Group by the first level, then extend by each following level in order.
///
/// Returns `None` when no levels are configured.
pub fn group_levels(records: Vec<Record>, levels: &[Vec<String>]) -> ShapingResult<Option<GroupNode>> {
    let Some((first, rest)) = levels.split_first() else {
        return Ok(None);
    };
    let mut root = GroupNode::group(records, first)?;
    for level in rest {
        root.then_by(level)?;
    }
    Ok(Some(root))
}
