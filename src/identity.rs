//! Identity registry: stamps every grouped POI with a permanent, zero-based
//! identity in a deterministic, human-auditable order.
//!
//! ## Ordering
//!
//! Groups are walked in ascending `z`. Each group falls into the bucket
//! `floor(z / bucket_size)`; even buckets hand out identities by ascending
//! member `x`, odd buckets by descending `x`. Parity comes from the bucket,
//! never from the group's position in the walk, so two groups sharing a
//! bucket always traverse the same way.

use crate::error::{Result, TelemetryError};
use crate::scene::{PoiKey, Scene};
use log::{info, warn};
use std::collections::HashSet;

pub struct IdentityRegistry {
    bucket_size: f32,
    /// `by_identity[id]` is the POI holding identity `id`.
    by_identity: Vec<PoiKey>,
}

impl IdentityRegistry {
    pub fn new(bucket_size: f32) -> Self {
        Self {
            bucket_size,
            by_identity: Vec::new(),
        }
    }

    pub fn bucket_of(&self, z: f32) -> i64 {
        (z / self.bucket_size).floor() as i64
    }

    /// The order in which identities would be handed out, without touching
    /// the scene. Fails if any marker points outside the scene.
    pub fn assignment_order(&self, scene: &Scene) -> Result<Vec<PoiKey>> {
        let groups = scene.groups();
        let mut walk: Vec<usize> = (0..groups.len()).collect();
        walk.sort_by(|&a, &b| groups[a].position.z.total_cmp(&groups[b].position.z));

        let mut order = Vec::with_capacity(scene.len());
        let mut seen = HashSet::new();

        for gi in walk {
            let group = &groups[gi];
            if group.is_empty() {
                continue;
            }

            let mut members = Vec::with_capacity(group.markers.len());
            for (mi, marker) in group.markers.iter().enumerate() {
                let Some(key) = marker.poi else {
                    continue;
                };
                let Some(poi) = scene.get(key) else {
                    return Err(TelemetryError::GroupMemberOutOfRange {
                        group: gi,
                        marker: mi,
                        key,
                        len: scene.len(),
                    });
                };
                members.push((key, poi.position().x));
            }

            let ascending = self.bucket_of(group.position.z).rem_euclid(2) == 0;
            if ascending {
                members.sort_by(|a, b| a.1.total_cmp(&b.1));
            } else {
                members.sort_by(|a, b| b.1.total_cmp(&a.1));
            }

            for (key, _) in members {
                if seen.insert(key) {
                    order.push(key);
                } else {
                    warn!("POI {} belongs to more than one group; keeping its first identity", key);
                }
            }
        }

        Ok(order)
    }

    /// Reassign every identity from scratch. Returns the number assigned.
    ///
    /// On error nothing in the scene is modified.
    pub fn assign_all(&mut self, scene: &mut Scene) -> Result<usize> {
        let order = self.assignment_order(scene)?;

        for (_, poi) in scene.iter_mut() {
            poi.identity = None;
        }
        for (next_id, key) in order.iter().enumerate() {
            if let Some(poi) = scene.get_mut(*key) {
                poi.identity = Some(next_id as u32);
            }
        }

        self.by_identity = order;
        info!(
            "Assigned {} POI identities across {} groups",
            self.by_identity.len(),
            scene.groups().len()
        );
        Ok(self.by_identity.len())
    }

    pub fn lookup(&self, identity: u32) -> Option<PoiKey> {
        self.by_identity.get(identity as usize).copied()
    }

    pub fn len(&self) -> usize {
        self.by_identity.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_identity.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Label words
// ---------------------------------------------------------------------------

/// Split a CSV word list into words: rows on CR/LF, cells on commas.
///
/// Empty cells are dropped before trimming, so a whitespace-only cell still
/// takes a slot (as an empty word).
pub fn parse_word_list(csv: &str) -> Vec<String> {
    csv.split(['\r', '\n'])
        .filter(|line| !line.is_empty())
        .flat_map(|line| line.split(','))
        .filter(|cell| !cell.is_empty())
        .map(|cell| cell.trim().to_owned())
        .collect()
}

/// Give the `i`-th TEXT POI (by ascending identity) the `i`-th word.
///
/// Stops at whichever runs out first. Returns the number of labels written.
pub fn assign_labels_from_words(scene: &mut Scene, words: &[String]) -> usize {
    let mut text_pois: Vec<(u32, PoiKey)> = scene
        .iter()
        .filter(|(_, p)| p.category.is_text())
        .filter_map(|(k, p)| p.identity().map(|id| (id, k)))
        .collect();
    text_pois.sort_unstable();

    let mut written = 0;
    for ((id, key), word) in text_pois.into_iter().zip(words) {
        let Some(poi) = scene.get_mut(key) else {
            continue;
        };
        if poi.set_label(word) {
            written += 1;
        } else {
            warn!("POI id={} is TEXT but has no label body to assign", id);
        }
    }
    written
}
