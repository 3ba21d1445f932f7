//! TelemetrySession – owns every collaborator for one participant run and
//! drives them from the host's frame loop.

use crate::checkpoint::CheckpointTrack;
use crate::error::Result;
use crate::geometry::GlyphLayout;
use crate::identity::{assign_labels_from_words, IdentityRegistry};
use crate::observer::{Observer, ObserverStateProvider, ObserverTracker};
use crate::registry::VisibleSet;
use crate::scene::{CollisionWorld, Scene};
use crate::sink::RowSink;
use crate::telemetry::{EventAggregator, EventKind, EventPacket, PoiProvider, PoiSnapshot};
use crate::types::{SessionStats, TelemetryConfig};
use crate::visibility::{TickReport, VisibilityClassifier};
use log::{debug, info};

pub struct TelemetrySession {
    config: TelemetryConfig,
    scene: Scene,
    world: CollisionWorld,
    identities: IdentityRegistry,
    visible: VisibleSet,
    classifier: VisibilityClassifier,
    tracker: Option<ObserverTracker>,
    aggregator: EventAggregator,
    checkpoints: CheckpointTrack,
    tick_count: u64,
}

impl TelemetrySession {
    /// Validate `config`, then assign identities to every grouped POI.
    ///
    /// With `sink == None` the session still classifies visibility but
    /// every publish is a no-op.
    pub fn new(
        config: TelemetryConfig,
        mut scene: Scene,
        world: CollisionWorld,
        checkpoints: CheckpointTrack,
        layout: Box<dyn GlyphLayout>,
        sink: Option<Box<dyn RowSink>>,
    ) -> Result<Self> {
        config.validate()?;

        let mut identities = IdentityRegistry::new(config.bucket_size);
        identities.assign_all(&mut scene)?;

        info!(
            "Telemetry session ready: {} POIs, {} colliders, {} checkpoints, {} slots per row",
            scene.len(),
            world.len(),
            checkpoints.len(),
            config.max_visible_pois
        );

        Ok(Self {
            classifier: VisibilityClassifier::new(&config, layout),
            aggregator: EventAggregator::new(config.max_visible_pois, sink),
            config,
            scene,
            world,
            identities,
            visible: VisibleSet::new(),
            tracker: None,
            checkpoints,
            tick_count: 0,
        })
    }

    // -----------------------------------------------------------------------
    // Setup
    // -----------------------------------------------------------------------

    /// Write `words` onto TEXT POIs in ascending identity order.
    pub fn assign_labels(&mut self, words: &[String]) -> usize {
        assign_labels_from_words(&mut self.scene, words)
    }

    /// Re-run identity assignment after the scene layout changed.
    pub fn reassign_identities(&mut self) -> Result<usize> {
        self.identities.assign_all(&mut self.scene)
    }

    // -----------------------------------------------------------------------
    // Main tick
    // -----------------------------------------------------------------------

    /// Record the observer pose for this frame and reclassify every POI.
    pub fn tick(&mut self, observer: Observer, now: f64) -> TickReport {
        self.tick_count += 1;
        match &mut self.tracker {
            Some(tracker) => tracker.update(observer, now),
            None => self.tracker = Some(ObserverTracker::new(observer, now)),
        }

        let report = self.classifier.tick(
            &mut self.scene,
            &observer,
            &self.world,
            &mut self.visible,
        );
        if report.transitions() > 0 {
            debug!(
                "Tick {}: +{} -{} visible={}",
                self.tick_count,
                report.appeared.len(),
                report.disappeared.len(),
                self.visible.len()
            );
        }
        report
    }

    // -----------------------------------------------------------------------
    // Events
    // -----------------------------------------------------------------------

    /// Capture and ship one row for `kind`. Returns `None` before the first
    /// tick or when no sink is attached.
    pub fn publish(&mut self, kind: EventKind) -> Option<EventPacket> {
        let observer = self
            .tracker
            .as_ref()
            .map(|t| t as &dyn ObserverStateProvider);
        let view = self.visible.view(&self.scene);
        self.aggregator
            .publish(kind, observer, Some(&view as &dyn PoiProvider))
    }

    /// Publish the event tied to checkpoint `index`.
    pub fn reach_checkpoint(&mut self, index: usize) -> Result<Option<EventPacket>> {
        let kind = self.checkpoints.activate(index)?;
        debug!("Checkpoint {} reached ({})", index, kind);
        Ok(self.publish(kind))
    }

    /// Publish an attention-key event.
    pub fn attention(&mut self) -> Option<EventPacket> {
        self.publish(EventKind::AttentionKey)
    }

    /// Restart the elapsed-time clock from the latest tick.
    pub fn reset_session_time(&mut self) {
        if let Some(tracker) = &mut self.tracker {
            tracker.reset_session_time();
            info!("Session clock reset");
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn visible_pois(&self) -> Vec<PoiSnapshot> {
        self.visible.snapshot(&self.scene)
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn identities(&self) -> &IdentityRegistry {
        &self.identities
    }

    pub fn config(&self) -> &TelemetryConfig {
        &self.config
    }

    pub fn checkpoints(&self) -> &CheckpointTrack {
        &self.checkpoints
    }

    pub fn elapsed(&self) -> f64 {
        self.tracker.as_ref().map_or(0.0, ObserverTracker::elapsed)
    }

    pub fn stats(&self) -> SessionStats {
        SessionStats {
            tracked_pois: self.scene.len(),
            visible_pois: self.visible.len(),
            identities_assigned: self.identities.len(),
            total_ticks: self.tick_count,
            total_transitions: self.classifier.transitions(),
            events_published: self.aggregator.published(),
        }
    }
}
