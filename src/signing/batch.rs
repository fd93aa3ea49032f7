//! Batch Grouping
//!
//! A transaction produces one `DataToSign` per input (or per tapleaf). The
//! device is slow and needs a tap per call, so hashes that share a signing
//! key go out in one call. Grouping key is
//! `(resolved derivation path, script type / chain tag)`; groups keep the
//! order in which their first item appeared, and items keep their relative
//! order inside a group.
//!
//! The plan remembers where every item went (`locations`), so results are
//! scattered back into submission order in O(N).

use crate::error::{SignerError, SignerResult};
use crate::types::{DataToSign, ScriptOrChain};
use crate::wallet::derivation_path::DerivationPath;
use std::collections::HashMap;

/// Hashes that go to the device in one call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningGroup {
    pub derivation_path: DerivationPath,
    pub tag: ScriptOrChain,
    /// Positions in the plan's item list, ascending
    pub item_indices: Vec<usize>,
}

/// Where an item landed: `(group, position inside the group)`
pub type ItemLocation = (usize, usize);

/// Items plus their grouping into device calls
#[derive(Debug, Clone)]
pub struct SigningPlan {
    items: Vec<DataToSign>,
    groups: Vec<SigningGroup>,
    locations: Vec<ItemLocation>,
}

impl SigningPlan {
    /// Group `items` by signing key under `template`.
    ///
    /// `max_per_call` splits a group into consecutive chunks; `None` keeps
    /// each group whole.
    pub fn build(items: Vec<DataToSign>, template: &DerivationPath, max_per_call: Option<usize>) -> Self {
        let mut groups: Vec<SigningGroup> = Vec::new();
        let mut by_key: HashMap<(DerivationPath, ScriptOrChain), usize> = HashMap::new();

        for (index, item) in items.iter().enumerate() {
            let path = item.key.resolve_path(template);
            let key = (path, item.tag);
            match by_key.get(&key) {
                Some(&group) => groups[group].item_indices.push(index),
                None => {
                    by_key.insert(key.clone(), groups.len());
                    groups.push(SigningGroup {
                        derivation_path: key.0,
                        tag: key.1,
                        item_indices: vec![index],
                    });
                }
            }
        }

        if let Some(max) = max_per_call.filter(|&m| m > 0) {
            groups = groups
                .into_iter()
                .flat_map(|group| {
                    group
                        .item_indices
                        .chunks(max)
                        .map(|chunk| SigningGroup {
                            derivation_path: group.derivation_path.clone(),
                            tag: group.tag,
                            item_indices: chunk.to_vec(),
                        })
                        .collect::<Vec<_>>()
                })
                .collect();
        }

        let mut locations = vec![(0, 0); items.len()];
        for (group_index, group) in groups.iter().enumerate() {
            for (position, &item_index) in group.item_indices.iter().enumerate() {
                locations[item_index] = (group_index, position);
            }
        }

        Self {
            items,
            groups,
            locations,
        }
    }

    pub fn items(&self) -> &[DataToSign] {
        &self.items
    }

    pub fn groups(&self) -> &[SigningGroup] {
        &self.groups
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of device taps this plan needs
    pub fn device_call_count(&self) -> usize {
        self.groups.len()
    }

    pub fn location(&self, item_index: usize) -> Option<ItemLocation> {
        self.locations.get(item_index).copied()
    }

    /// Hashes of one group, in call order
    pub fn group_hashes(&self, group: &SigningGroup) -> Vec<[u8; 32]> {
        group
            .item_indices
            .iter()
            .map(|&i| self.items[i].hash)
            .collect()
    }

    /// Put per-group results back into item order.
    ///
    /// `results[g]` must have exactly one entry per item of group `g`.
    pub fn scatter<T: Clone>(&self, results: &[Vec<T>]) -> SignerResult<Vec<T>> {
        if results.len() != self.groups.len() {
            return Err(SignerError::internal(format!(
                "{} result groups for {} device calls",
                results.len(),
                self.groups.len()
            )));
        }
        for (group, result) in self.groups.iter().zip(results) {
            if group.item_indices.len() != result.len() {
                return Err(SignerError::signature_count_mismatch(
                    group.item_indices.len(),
                    result.len(),
                ));
            }
        }

        Ok(self
            .locations
            .iter()
            .map(|&(group, position)| results[group][position].clone())
            .collect())
    }
}
