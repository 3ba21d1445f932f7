//! Event aggregation: turns a discrete event plus the current observer state
//! and visible set into an immutable [`EventPacket`], flattens it, and hands
//! the row to the sink.

use crate::error::TelemetryError;
use crate::flatten;
use crate::observer::{ObserverSnapshot, ObserverStateProvider};
use crate::scene::PointOfInterest;
use crate::sink::RowSink;
use crate::types::{PoiCategory, Vec3};
use log::{debug, error};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;

// ---------------------------------------------------------------------------
// Event kinds
// ---------------------------------------------------------------------------

/// Everything that can trigger a telemetry row.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Start,
    Straight,
    Corner,
    End,
    /// The participant pressed the attention key.
    AttentionKey,
}

impl EventKind {
    /// Name written to the first column of a row.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Start => "Start",
            EventKind::Straight => "Straight",
            EventKind::Corner => "Corner",
            EventKind::End => "End",
            EventKind::AttentionKey => "Spacebar",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Snapshots
// ---------------------------------------------------------------------------

/// One POI's state copied out at capture time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoiSnapshot {
    /// `None` for a POI that sits outside every group.
    pub identity: Option<u32>,
    pub category: PoiCategory,
    pub label: Option<String>,
    pub position: Vec3,
    pub distance: f32,
    pub alignment: f32,
}

impl PoiSnapshot {
    pub fn capture(poi: &PointOfInterest) -> Self {
        let telemetry = poi.telemetry();
        Self {
            identity: poi.identity(),
            category: poi.category,
            label: poi.label().map(str::to_owned),
            position: poi.position(),
            distance: telemetry.distance,
            alignment: telemetry.alignment,
        }
    }

    /// Ascending distance, ties broken by identity.
    pub fn nearest_first(a: &PoiSnapshot, b: &PoiSnapshot) -> Ordering {
        a.distance
            .total_cmp(&b.distance)
            .then_with(|| a.identity.cmp(&b.identity))
    }
}

/// Source of the currently visible POIs, nearest first.
pub trait PoiProvider {
    fn visible_pois(&self) -> Vec<PoiSnapshot>;
}

// ---------------------------------------------------------------------------
// Packet
// ---------------------------------------------------------------------------

/// Immutable bundle for one event: who triggered it, where the observer
/// was, and the nearest visible POIs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventPacket {
    kind: EventKind,
    observer: ObserverSnapshot,
    pois: Vec<PoiSnapshot>,
}

impl EventPacket {
    /// Sorts `pois` nearest-first and keeps at most `max_pois` of them.
    pub fn new(
        kind: EventKind,
        observer: ObserverSnapshot,
        mut pois: Vec<PoiSnapshot>,
        max_pois: usize,
    ) -> Self {
        pois.sort_by(PoiSnapshot::nearest_first);
        pois.truncate(max_pois);
        Self {
            kind,
            observer,
            pois,
        }
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn observer(&self) -> &ObserverSnapshot {
        &self.observer
    }

    pub fn pois(&self) -> &[PoiSnapshot] {
        &self.pois
    }
}

/// Human-readable read-out of a packet.
impl std::fmt::Display for EventPacket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let o = &self.observer;
        writeln!(f, "{}  {:.2}s", self.kind, o.elapsed)?;
        writeln!(
            f,
            "Pos {:.1}, {:.1}  Yaw {:.0}°",
            o.position.x, o.position.z, o.yaw
        )?;
        if self.pois.is_empty() {
            return write!(f, "No POIs in view");
        }
        write!(f, "Visible POIs {}:", self.pois.len())?;
        for p in &self.pois {
            let id = p.identity.map(|i| i.to_string()).unwrap_or_default();
            write!(
                f,
                "\n  {:>2} {:<10} [{}]  d={:.1}m  dot={:.2}",
                id,
                p.label.as_deref().unwrap_or(""),
                p.category,
                p.distance,
                p.alignment
            )?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Aggregator
// ---------------------------------------------------------------------------

/// Builds one packet per event and ships its flattened row.
///
/// A missing collaborator turns [`EventAggregator::publish`] into a no-op;
/// each missing collaborator is reported once.
pub struct EventAggregator {
    max_pois: usize,
    sink: Option<Box<dyn RowSink>>,
    reported: HashSet<&'static str>,
    published: u64,
}

impl EventAggregator {
    pub fn new(max_pois: usize, sink: Option<Box<dyn RowSink>>) -> Self {
        Self {
            max_pois,
            sink,
            reported: HashSet::new(),
            published: 0,
        }
    }

    pub fn max_pois(&self) -> usize {
        self.max_pois
    }

    pub fn published(&self) -> u64 {
        self.published
    }

    pub fn has_sink(&self) -> bool {
        self.sink.is_some()
    }

    pub fn publish(
        &mut self,
        kind: EventKind,
        observer: Option<&dyn ObserverStateProvider>,
        pois: Option<&dyn PoiProvider>,
    ) -> Option<EventPacket> {
        let missing = if observer.is_none() {
            Some("observer-state provider")
        } else if pois.is_none() {
            Some("POI provider")
        } else if self.sink.is_none() {
            Some("row sink")
        } else {
            None
        };
        if let Some(what) = missing {
            if self.reported.insert(what) {
                error!(
                    "Telemetry disabled, events will be dropped: {}",
                    TelemetryError::MissingCollaborator(what)
                );
            }
            return None;
        }
        let (Some(observer), Some(pois), Some(sink)) = (observer, pois, self.sink.as_deref())
        else {
            return None;
        };

        let packet = EventPacket::new(
            kind,
            observer.observer_snapshot(),
            pois.visible_pois(),
            self.max_pois,
        );
        sink.post_row(flatten::flatten(&packet, self.max_pois));
        self.published += 1;

        if kind == EventKind::AttentionKey {
            debug!("{}", packet);
        }
        Some(packet)
    }
}
