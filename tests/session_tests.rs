//! TelemetrySession and scene-description tests

#[cfg(test)]
mod tests {
    use poi_telemetry::{
        flatten::column_count,
        geometry::MonospaceLayout,
        observer::Observer,
        protocol::{ReplayEvent, ReplayScript, SceneDescription},
        scene::PoiBody,
        sink::MemorySink,
        telemetry::EventKind,
        types::{TelemetryConfig, Vec3},
        TelemetryError, TelemetrySession,
    };

    const SCENE: &str = r#"{
        "groups": [
            {
                "position": {"x": 0.0, "y": 0.0, "z": 0.0},
                "markers": [
                    {"offset": {"x": -7.5, "y": 0.0, "z": 10.0}, "poi": {"category": "RED"}},
                    {"offset": {"x": -4.5, "y": 0.0, "z": 11.0}, "poi": {"category": "GREEN"}},
                    {"offset": {"x": -1.5, "y": 0.0, "z": 12.0}, "poi": {"category": "YELLOW"}},
                    {"offset": {"x":  1.5, "y": 0.0, "z": 13.0}, "poi": {"category": "RED"}},
                    {"offset": {"x":  4.5, "y": 0.0, "z": 14.0}, "poi": {"category": "GREEN"}},
                    {"offset": {"x":  7.5, "y": 0.0, "z": 15.0}, "poi": {"category": "YELLOW"}},
                    {"offset": {"x": 30.0, "y": 0.0, "z": 0.0}}
                ]
            },
            {
                "position": {"x": 0.0, "y": 0.0, "z": 40.0},
                "markers": [
                    {"offset": {"x": 0.0, "y": 0.0, "z": 0.0},
                     "poi": {"category": "TEXT", "body": {"type": "label", "text": "sign"}}},
                    {"offset": {"x": 4.0, "y": 0.0, "z": 0.0},
                     "poi": {"category": "TEXT"}}
                ]
            }
        ],
        "obstacles": [
            {"center": {"x": 0.0, "y": 0.0, "z": 30.0}, "half_extents": {"x": 20.0, "y": 5.0, "z": 0.5}}
        ],
        "checkpoints": [
            {"position": {"x": 0.0, "y": 0.0, "z": 0.0}, "kind": "start"},
            {"position": {"x": 0.0, "y": 0.0, "z": 20.0}, "kind": "corner"},
            {"position": {"x": 0.0, "y": 0.0, "z": 50.0}, "kind": "end"}
        ]
    }"#;

    fn make_session(config: TelemetryConfig) -> (TelemetrySession, MemorySink) {
        let built = SceneDescription::from_json(SCENE).unwrap().build().unwrap();
        let sink = MemorySink::new();
        let session = TelemetrySession::new(
            config,
            built.scene,
            built.world,
            built.checkpoints,
            Box::new(MonospaceLayout::default()),
            Some(Box::new(sink.clone())),
        )
        .unwrap();
        (session, sink)
    }

    fn origin() -> Observer {
        Observer::new(Vec3::ZERO, 0.0)
    }

    // -----------------------------------------------------------------------
    // Construction
    // -----------------------------------------------------------------------

    #[test]
    fn construction_assigns_identities() {
        let (session, _) = make_session(TelemetryConfig::default());
        let stats = session.stats();
        assert_eq!(stats.tracked_pois, 8);
        assert_eq!(stats.identities_assigned, 8);
        assert_eq!(stats.total_ticks, 0);
        assert_eq!(session.checkpoints().len(), 3);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let built = SceneDescription::from_json(SCENE).unwrap().build().unwrap();
        let config = TelemetryConfig {
            max_visible_pois: 0,
            ..Default::default()
        };
        let result = TelemetrySession::new(
            config,
            built.scene,
            built.world,
            built.checkpoints,
            Box::new(MonospaceLayout::default()),
            None,
        );
        assert!(matches!(result, Err(TelemetryError::InvalidConfig(_))));
    }

    #[test]
    fn scene_builder_rejects_degenerate_boxes() {
        let json = r#"{"groups": [{"position": {"x": 0.0, "y": 0.0, "z": 0.0}, "markers": [
            {"offset": {"x": 0.0, "y": 0.0, "z": 0.0},
             "poi": {"category": "RED", "body": {"type": "box", "half_extents": {"x": 0.0, "y": 1.0, "z": 1.0}}}}
        ]}]}"#;
        let err = SceneDescription::from_json(json).unwrap().build().err().unwrap();
        assert!(matches!(err, TelemetryError::InvalidScene(_)));
    }

    #[test]
    fn malformed_json_is_reported() {
        let err = SceneDescription::from_json("{ not json").unwrap_err();
        assert!(matches!(err, TelemetryError::Json(_)));
    }

    // -----------------------------------------------------------------------
    // Events
    // -----------------------------------------------------------------------

    #[test]
    fn publish_before_first_tick_is_a_no_op() {
        let (mut session, sink) = make_session(TelemetryConfig::default());
        assert!(session.publish(EventKind::Start).is_none());
        assert!(sink.is_empty());
    }

    #[test]
    fn nearest_four_of_six_visible_are_reported() {
        let (mut session, sink) = make_session(TelemetryConfig::default());

        let report = session.tick(origin(), 0.0);
        assert_eq!(report.appeared.len(), 6);
        assert_eq!(session.visible_pois().len(), 6);

        let packet = session.reach_checkpoint(0).unwrap().unwrap();
        assert_eq!(packet.kind(), EventKind::Start);
        let ids: Vec<Option<u32>> = packet.pois().iter().map(|p| p.identity).collect();
        assert_eq!(ids, vec![Some(1), Some(2), Some(0), Some(3)]);
        assert!(packet
            .pois()
            .windows(2)
            .all(|w| w[0].distance <= w[1].distance));

        let rows = sink.rows();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].starts_with("Start,0.000,"));
        assert_eq!(rows[0].split(',').count(), column_count(4));
    }

    #[test]
    fn checkpoint_out_of_range_publishes_nothing() {
        let (mut session, sink) = make_session(TelemetryConfig::default());
        session.tick(origin(), 0.0);

        let err = session.reach_checkpoint(3).unwrap_err();
        assert!(matches!(
            err,
            TelemetryError::CheckpointOutOfRange { index: 3, len: 3 }
        ));
        assert!(sink.is_empty());
        assert_eq!(session.stats().events_published, 0);
    }

    #[test]
    fn obstacle_hides_labels_until_passed() {
        let (mut session, sink) = make_session(TelemetryConfig {
            max_visible_pois: 2,
            ..Default::default()
        });

        // Behind the wall at z=30: only boxes, which are now behind us.
        session.tick(Observer::new(Vec3::new(0.0, 0.0, 20.0), 0.0), 1.0);
        assert!(session.visible_pois().is_empty());

        // Past the wall: the labelled sign is visible, the blank one is not.
        session.tick(Observer::new(Vec3::new(0.0, 0.0, 35.0), 0.0), 2.0);
        let visible = session.visible_pois();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].label.as_deref(), Some("sign"));

        let packet = session.attention().unwrap();
        assert_eq!(packet.kind(), EventKind::AttentionKey);
        assert!(sink.rows()[0].starts_with("Spacebar,1.000,0.000,35.000,0.0,6,TEXT,"));
    }

    #[test]
    fn words_fill_blank_labels() {
        let (mut session, _) = make_session(TelemetryConfig::default());
        let words = vec!["alpha".to_string(), "beta".to_string()];
        assert_eq!(session.assign_labels(&words), 2);

        let texts: Vec<String> = session
            .scene()
            .iter()
            .filter_map(|(_, p)| match &p.body {
                PoiBody::Label { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(texts, vec!["alpha", "beta"]);

        session.tick(Observer::new(Vec3::new(2.0, 0.0, 35.0), 0.0), 0.0);
        assert_eq!(session.visible_pois().len(), 2);
    }

    #[test]
    fn reset_clock_restarts_row_time() {
        let (mut session, sink) = make_session(TelemetryConfig::default());
        session.tick(origin(), 10.0);
        session.tick(origin(), 14.0);
        assert_eq!(session.elapsed(), 4.0);

        session.reset_session_time();
        session.tick(origin(), 15.5);
        session.publish(EventKind::Straight).unwrap();
        assert!(sink.rows()[0].starts_with("Straight,1.500,"));
    }

    // -----------------------------------------------------------------------
    // Replay scripts
    // -----------------------------------------------------------------------

    #[test]
    fn replay_script_drives_session() {
        let script = ReplayScript::from_json(
            r#"{"frames": [
                {"time": 0.0, "observer": {"position": {"x": 0.0, "y": 0.0, "z": 0.0}, "yaw": 0.0},
                 "event": {"type": "checkpoint", "index": 0}},
                {"time": 0.5, "observer": {"position": {"x": 0.0, "y": 0.0, "z": 0.0}, "yaw": 180.0},
                 "event": {"type": "attention"}},
                {"time": 1.0, "observer": {"position": {"x": 0.0, "y": 0.0, "z": 20.0}, "yaw": 0.0},
                 "event": {"type": "checkpoint", "index": 1}},
                {"time": 1.5, "observer": {"position": {"x": 0.0, "y": 0.0, "z": 20.0}, "yaw": 0.0}}
            ]}"#,
        )
        .unwrap();
        assert_eq!(script.frames[1].event, Some(ReplayEvent::Attention));

        let (mut session, sink) = make_session(TelemetryConfig::default());
        for frame in &script.frames {
            session.tick(frame.observer, frame.time);
            match frame.event {
                Some(ReplayEvent::Checkpoint { index }) => {
                    session.reach_checkpoint(index).unwrap();
                }
                Some(ReplayEvent::Attention) => {
                    session.attention();
                }
                Some(ReplayEvent::ResetClock) => session.reset_session_time(),
                None => {}
            }
        }

        let rows = sink.rows();
        let kinds: Vec<&str> = rows.iter().map(|r| r.split(',').next().unwrap()).collect();
        assert_eq!(kinds, vec!["Start", "Spacebar", "Corner"]);

        // Facing away: the attention row carries no POIs.
        assert!(rows[1].split(',').skip(5).all(|f| f.is_empty()));

        let stats = session.stats();
        assert_eq!(stats.total_ticks, 4);
        assert_eq!(stats.events_published, 3);
        assert_eq!(stats.total_transitions, 12);
        assert_eq!(stats.visible_pois, 0);
    }
}
