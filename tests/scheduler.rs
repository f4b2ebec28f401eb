mod tests {
    use std::sync::{Arc, Mutex};
    use std::thread;

    use lightwave_engine::{
        Action, ChannelId, DutyCycleDriver, EffectCatalog, EngineConfig, EngineError, Event,
        Instant, LightEngine, NoopDriver, RunKind, RunState, WaveformSpec, mailbox,
    };
    use embassy_time::Duration;

    const ENDLESS_WAVE: u8 = 100;
    const RAMP_ROUND_TRIP: u8 = 101;
    const ENDLESS_PARALLEL: u8 = 102;
    const SLOW_RAMP: u8 = 103;

    fn fast_config() -> EngineConfig {
        EngineConfig::default()
            .with_tick_period(Duration::from_millis(5))
            .with_ramp_steps(10)
            .with_grace_period(Duration::from_millis(500))
    }

    fn test_catalog() -> EffectCatalog {
        EffectCatalog::reference()
            .with_effect(
                ENDLESS_WAVE,
                "endless_wave",
                Action::wave(ChannelId::Red, Duration::from_secs(30), WaveformSpec::sine(0.2)),
            )
            .with_effect(
                RAMP_ROUND_TRIP,
                "ramp_round_trip",
                Action::Sequential(vec![
                    Action::ramp(ChannelId::Green, Duration::from_millis(60), 0.0, 1.0),
                    Action::ramp(ChannelId::Green, Duration::from_millis(60), 1.0, 0.0),
                ]),
            )
            .with_effect(
                ENDLESS_PARALLEL,
                "endless_parallel",
                Action::on_all_channels(|channel| {
                    Action::Sequential(vec![
                        Action::wait(Duration::from_millis(10)),
                        Action::wave(channel, Duration::from_secs(30), WaveformSpec::sine(0.2)),
                    ])
                }),
            )
            .with_effect(
                SLOW_RAMP,
                "slow_ramp",
                Action::ramp(ChannelId::Blue, Duration::from_secs(20), 0.0, 1.0),
            )
    }

    #[derive(Debug, Clone, Copy)]
    enum Trace {
        Write { run: u64, channel: ChannelId },
        Started(u64),
    }

    /// Driver that records which run thread issued each write
    fn tracing_driver(
        channel: ChannelId,
        trace: &Arc<Mutex<Vec<Trace>>>,
    ) -> Box<dyn DutyCycleDriver> {
        let trace = Arc::clone(trace);
        Box::new(move |_level: f32| {
            let run = thread::current()
                .name()
                .and_then(|name| name.strip_prefix("effect-run-"))
                .and_then(|id| id.parse().ok())
                .unwrap_or(0);
            trace.lock().unwrap().push(Trace::Write { run, channel });
        })
    }

    fn engine() -> LightEngine {
        let _ = env_logger::builder().is_test(true).try_init();
        LightEngine::new(
            test_catalog(),
            [Box::new(NoopDriver), Box::new(NoopDriver), Box::new(NoopDriver)],
            fast_config(),
        )
        .unwrap()
    }

    fn settle() {
        thread::sleep(std::time::Duration::from_millis(40));
    }

    #[test]
    fn test_all_off_all_on_and_focus() {
        let engine = engine();

        assert_eq!(engine.start(6).unwrap().wait(), RunState::Completed);
        assert_eq!(engine.snapshot().brightness, [0.0, 0.0, 0.0]);

        assert_eq!(engine.start(7).unwrap().wait(), RunState::Completed);
        assert_eq!(engine.snapshot().brightness, [1.0, 1.0, 1.0]);

        assert_eq!(engine.start(3).unwrap().wait(), RunState::Completed);
        let snapshot = engine.snapshot();
        assert_eq!(snapshot.level(ChannelId::Red), 0.7);
        assert_eq!(snapshot.level(ChannelId::Green), 0.7);
        assert_eq!(snapshot.level(ChannelId::Blue), 1.0);
    }

    #[test]
    fn test_unknown_effect_changes_nothing() {
        let engine = engine();
        let live = engine.start(ENDLESS_WAVE).unwrap();
        settle();

        let revision_before = engine.snapshot().revision;
        let result = engine.start(99);
        assert!(matches!(result, Err(EngineError::UnknownEffect(99))));

        assert_eq!(engine.live_run().map(|run| run.id()), Some(live.id()));
        assert!(!live.is_cancelled());
        assert_eq!(live.state(), RunState::Running);
        // The wave keeps ticking; only its own writes move the revision.
        assert!(engine.snapshot().revision >= revision_before);
        engine.stop().unwrap().wait();
    }

    #[test]
    fn test_unknown_effect_on_idle_engine_keeps_state() {
        let engine = engine();
        let before = engine.snapshot();
        assert!(engine.start(0).is_err());
        assert!(engine.start(250).is_err());
        assert_eq!(engine.snapshot(), before);
        assert!(engine.live_run().is_none());
    }

    #[test]
    fn test_new_start_supersedes_running_effect() {
        let engine = engine();
        let wave = engine.start(ENDLESS_WAVE).unwrap();
        settle();
        assert_eq!(wave.state(), RunState::Running);

        let off = engine.start(6).unwrap();
        // The old run exited inside the grace window before the new one began.
        assert_eq!(wave.state(), RunState::Cancelled);
        assert_eq!(off.wait(), RunState::Completed);

        settle();
        assert_eq!(engine.snapshot().level(ChannelId::Red), 0.0);
    }

    #[test]
    fn test_stop_drives_every_channel_to_zero() {
        let engine = engine();
        let effect = engine.start(ENDLESS_PARALLEL).unwrap();
        settle();
        assert!(engine.snapshot().brightness.iter().any(|&level| level > 0.0));

        let started = Instant::now();
        let stop = engine.stop().unwrap();
        assert!(started.elapsed() < Duration::from_millis(250));
        assert_eq!(stop.kind(), RunKind::Stop);
        assert_eq!(effect.state(), RunState::Cancelled);
        assert_eq!(stop.wait(), RunState::Completed);

        settle();
        assert_eq!(engine.snapshot().brightness, [0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_ramp_round_trip_returns_to_zero() {
        let engine = engine();
        let run = engine.start(RAMP_ROUND_TRIP).unwrap();
        assert_eq!(run.wait(), RunState::Completed);
        assert_eq!(engine.snapshot().level(ChannelId::Green), 0.0);
    }

    #[test]
    fn test_wait_timeout_on_long_run() {
        let engine = engine();
        let run = engine.start(ENDLESS_WAVE).unwrap();
        assert_eq!(run.wait_timeout(Duration::from_millis(20)), None);
        engine.stop().unwrap();
        assert_eq!(
            run.wait_timeout(Duration::from_millis(100)),
            Some(RunState::Cancelled)
        );
    }

    #[test]
    fn test_back_to_back_starts_leave_one_live_run() {
        let engine = Arc::new(engine());
        let callers: Vec<_> = (0..4)
            .map(|caller| {
                let engine = Arc::clone(&engine);
                thread::spawn(move || {
                    (0..5)
                        .map(|i| {
                            let effect = if (caller + i) % 2 == 0 {
                                ENDLESS_WAVE
                            } else {
                                ENDLESS_PARALLEL
                            };
                            engine.start(effect).unwrap()
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let handles: Vec<_> = callers
            .into_iter()
            .flat_map(|caller| caller.join().unwrap())
            .collect();
        let still_running = handles.iter().filter(|run| !run.is_finished()).count();
        assert_eq!(still_running, 1);

        let live = engine.live_run().unwrap();
        assert!(!live.is_finished());
        engine.stop().unwrap().wait();
        assert!(handles.iter().all(|run| run.is_finished()));
    }

    #[test]
    fn test_superseded_run_never_writes_after_start_returns() {
        let trace = Arc::new(Mutex::new(Vec::new()));
        let engine = LightEngine::new(
            test_catalog(),
            ChannelId::ALL.map(|channel| tracing_driver(channel, &trace)),
            fast_config(),
        )
        .unwrap();

        for round in 0..8 {
            let effect = if round % 2 == 0 {
                ENDLESS_PARALLEL
            } else {
                ENDLESS_WAVE
            };
            let run = engine.start(effect).unwrap();
            trace.lock().unwrap().push(Trace::Started(run.id()));
            thread::sleep(std::time::Duration::from_millis(25));
        }
        let stop = engine.stop().unwrap();
        trace.lock().unwrap().push(Trace::Started(stop.id()));
        assert_eq!(stop.wait(), RunState::Completed);

        let trace = trace.lock().unwrap();
        let mut owner = 0;
        let mut writes = 0;
        for entry in trace.iter() {
            match *entry {
                Trace::Started(run) => owner = run,
                Trace::Write { run, channel } => {
                    writes += 1;
                    assert_ne!(run, 0, "write to {channel:?} outside a run thread");
                    assert!(
                        run >= owner,
                        "run {run} wrote {channel:?} after run {owner} took over"
                    );
                }
            }
        }
        assert!(writes > 0);
    }

    #[test]
    fn test_cancel_interrupts_a_long_ramp_step() {
        let engine = engine();
        let ramp = engine.start(SLOW_RAMP).unwrap();
        settle();

        let started = Instant::now();
        engine.start(6).unwrap().wait();
        assert!(started.elapsed() < Duration::from_millis(250));
        assert_eq!(ramp.state(), RunState::Cancelled);
        assert_eq!(engine.snapshot().level(ChannelId::Blue), 0.0);
    }

    #[test]
    fn test_late_subscriber_sees_all_on() {
        let engine = engine();
        engine.start(7).unwrap().wait();

        let (sender, receiver) = mailbox::<Event, 16>();
        engine.subscribe(sender);
        assert_eq!(
            receiver.drain().last(),
            Some(&Event::LedStatus {
                red: 100,
                green: 100,
                blue: 100
            })
        );
    }

    #[test]
    fn test_every_write_is_broadcast() {
        let engine = engine();
        let (sender, receiver) = mailbox::<Event, 64>();
        engine.subscribe(sender);
        // Initial state
        assert_eq!(receiver.len(), 1);

        engine.start(RAMP_ROUND_TRIP).unwrap().wait();
        let greens: Vec<u8> = receiver
            .drain()
            .into_iter()
            .filter_map(|event| match event {
                Event::LedStatus { green, .. } => Some(green),
                Event::VoiceCommand { .. } => None,
            })
            .collect();
        // Two ramps of ten steps each, endpoints included.
        assert_eq!(greens.len(), 1 + 22);
        assert_eq!(greens[11], 100);
        assert_eq!(greens.last(), Some(&0));
    }

    #[test]
    fn test_drivers_receive_levels() {
        let written = Arc::new(Mutex::new(Vec::new()));
        let red_written = Arc::clone(&written);
        let red = move |level: f32| red_written.lock().unwrap().push(level);
        let engine = LightEngine::new(
            test_catalog(),
            [Box::new(red), Box::new(NoopDriver), Box::new(NoopDriver)],
            fast_config(),
        )
        .unwrap();

        engine.start(7).unwrap().wait();
        engine.set_channel(ChannelId::Red, 1.4).unwrap().wait();
        assert_eq!(written.lock().unwrap().as_slice(), [1.0, 1.0]);
    }

    #[test]
    fn test_panicking_driver_fails_the_run() {
        struct BrokenDriver;
        impl DutyCycleDriver for BrokenDriver {
            fn set_duty_cycle(&mut self, _level: f32) {
                panic!("pwm chip went away");
            }
        }

        let engine = LightEngine::new(
            test_catalog(),
            [Box::new(BrokenDriver), Box::new(NoopDriver), Box::new(NoopDriver)],
            fast_config(),
        )
        .unwrap();

        assert_eq!(engine.start(7).unwrap().wait(), RunState::Failed);
        // Siblings of the failed branch still ran to completion.
        assert_eq!(engine.snapshot().level(ChannelId::Green), 1.0);
        assert_eq!(engine.snapshot().level(ChannelId::Blue), 1.0);
    }

    #[test]
    fn test_set_channel_is_a_manual_run() {
        let engine = engine();
        let wave = engine.start(ENDLESS_WAVE).unwrap();
        settle();

        let manual = engine.set_channel(ChannelId::Blue, 0.25).unwrap();
        assert_eq!(manual.kind(), RunKind::Manual(ChannelId::Blue));
        assert_eq!(manual.wait(), RunState::Completed);
        assert_eq!(wave.state(), RunState::Cancelled);
        assert_eq!(engine.snapshot().level(ChannelId::Blue), 0.25);
    }

    #[test]
    fn test_start_named() {
        let engine = engine();
        let run = engine.start_named("all_on").unwrap();
        assert_eq!(run.kind(), RunKind::Effect(7));
        run.wait();
        assert_eq!(engine.snapshot().brightness, [1.0; 3]);
        assert!(matches!(
            engine.start_named("disco"),
            Err(EngineError::UnknownEffectName(_))
        ));
    }

    #[test]
    fn test_voice_command_reaches_subscribers() {
        let engine = engine();
        let (sender, receiver) = mailbox::<String, 8>();
        engine.subscribe(sender);
        engine.announce_voice_command("turn on the lights");
        assert_eq!(
            receiver.drain().last().map(String::as_str),
            Some(r#"{"type":"voice_command","command":"turn on the lights"}"#)
        );
    }
}
