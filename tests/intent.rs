mod tests {
    use embassy_time::Duration;
    use lightwave_engine::intent::wire_to_unit;
    use lightwave_engine::{
        ChannelId, EngineConfig, EngineError, IntentProcessor, LightEngine, LightIntent, RunKind,
        RunState, intent_queue,
    };

    fn engine() -> LightEngine {
        LightEngine::headless(
            EngineConfig::default()
                .with_tick_period(Duration::from_millis(5))
                .with_grace_period(Duration::from_millis(500)),
        )
        .unwrap()
    }

    #[test]
    fn test_parse_intents() {
        assert_eq!(
            LightIntent::from_json_str(r#"{"type":"run_effect","effect":4}"#).unwrap(),
            LightIntent::RunEffect { effect: 4 }
        );
        assert_eq!(
            LightIntent::from_json_str(r#"{"type":"run_named_effect","name":"calm"}"#).unwrap(),
            LightIntent::RunNamedEffect {
                name: "calm".into()
            }
        );
        assert_eq!(
            LightIntent::from_json_str(r#"{"type":"stop"}"#).unwrap(),
            LightIntent::Stop
        );
        assert_eq!(
            LightIntent::from_json_str(r#"{"type":"set_channel","channel":0,"level":70}"#)
                .unwrap(),
            LightIntent::SetChannel {
                channel: 0,
                level: 70.0
            }
        );
    }

    #[test]
    fn test_malformed_intents_are_rejected() {
        for payload in [
            "",
            "{}",
            r#"{"type":"dance"}"#,
            r#"{"type":"run_effect","effect":-1}"#,
            r#"{"type":"set_channel","channel":"red"}"#,
        ] {
            assert!(
                matches!(
                    LightIntent::from_json_str(payload),
                    Err(EngineError::MalformedIntent(_))
                ),
                "{payload}"
            );
        }
    }

    #[test]
    fn test_wire_levels_are_scaled() {
        assert_eq!(wire_to_unit(0.0), 0.0);
        assert_eq!(wire_to_unit(100.0), 1.0);
        assert_eq!(wire_to_unit(250.0), 1.0);
        assert_eq!(wire_to_unit(-5.0), 0.0);
        assert!((wire_to_unit(70.0) - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_set_channel_out_of_range_is_reported() {
        let engine = engine();
        let before = engine.snapshot();
        let result = engine.handle_intent(&LightIntent::SetChannel {
            channel: 3,
            level: 50.0,
        });
        assert!(matches!(result, Err(EngineError::ChannelOutOfRange(3))));
        assert_eq!(engine.snapshot(), before);
        assert!(engine.live_run().is_none());
    }

    #[test]
    fn test_wire_channel_outside_byte_range_is_out_of_range() {
        let engine = engine();
        for (payload, channel) in [
            (r#"{"type":"set_channel","channel":300,"level":50}"#, 300),
            (r#"{"type":"set_channel","channel":-1,"level":50}"#, -1),
        ] {
            let intent = LightIntent::from_json_str(payload).unwrap();
            let result = engine.handle_intent(&intent);
            assert!(
                matches!(result, Err(EngineError::ChannelOutOfRange(raw)) if raw == channel),
                "{payload}"
            );
        }
        assert!(engine.live_run().is_none());
    }

    #[test]
    fn test_set_channel_intent_scales_level() {
        let engine = engine();
        let run = engine
            .handle_intent(&LightIntent::SetChannel {
                channel: 1,
                level: 70.0,
            })
            .unwrap();
        assert_eq!(run.kind(), RunKind::Manual(ChannelId::Green));
        run.wait();
        assert_eq!(engine.snapshot().percent(ChannelId::Green), 70);
    }

    #[test]
    fn test_processor_drains_queue_in_order() {
        let engine = engine();
        let (sender, receiver) = intent_queue::<8>();
        let mut processor = IntentProcessor::new(receiver);

        sender.try_send(LightIntent::RunEffect { effect: 7 }).unwrap();
        sender.try_send(LightIntent::RunEffect { effect: 42 }).unwrap();
        sender
            .try_send(LightIntent::SetChannel {
                channel: 9,
                level: 10.0,
            })
            .unwrap();
        sender
            .try_send(LightIntent::RunNamedEffect {
                name: "focus".into(),
            })
            .unwrap();

        let results = processor.process_pending(&engine);
        assert_eq!(results.len(), 4);
        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(EngineError::UnknownEffect(42))));
        assert!(matches!(results[2], Err(EngineError::ChannelOutOfRange(9))));

        let focus = results[3].as_ref().unwrap();
        assert_eq!(focus.wait(), RunState::Completed);
        let all_on = results[0].as_ref().unwrap();
        assert!(all_on.is_finished());

        let snapshot = engine.snapshot();
        assert_eq!(snapshot.level(ChannelId::Red), 0.7);
        assert_eq!(snapshot.level(ChannelId::Green), 0.7);

        assert!(processor.process_pending(&engine).is_empty());
    }

    #[test]
    fn test_full_queue_rejects_intent() {
        let (sender, _receiver) = intent_queue::<1>();
        sender.try_send(LightIntent::Stop).unwrap();
        assert!(sender.try_send(LightIntent::Stop).is_err());
    }

    #[test]
    fn test_channel_ids() {
        assert_eq!(ChannelId::from_index(2).unwrap(), ChannelId::Blue);
        assert!(matches!(
            ChannelId::from_index(3),
            Err(EngineError::ChannelOutOfRange(3))
        ));
        assert!(matches!(
            ChannelId::from_index(-1),
            Err(EngineError::ChannelOutOfRange(-1))
        ));
        assert_eq!(ChannelId::parse_from_str("green"), Some(ChannelId::Green));
        assert_eq!(ChannelId::Red.as_str(), "red");
    }
}
