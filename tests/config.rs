mod tests {
    use embassy_time::Duration;
    use lightwave_engine::{EngineConfig, EngineError, LightEngine};

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.tick_period, Duration::from_millis(50));
        assert_eq!(config.ramp_steps, 100);
        assert_eq!(config.grace_period, Duration::from_secs(1));
        assert_eq!(config.subscriber_queue, 64);
        assert_eq!(config.delivery_timeout, Duration::from_millis(250));
    }

    #[test]
    fn test_parse_subscriber_limits() {
        let config = EngineConfig::from_json_str(
            r#"{"subscriber_queue": 8, "delivery_timeout_ms": 40}"#,
        )
        .unwrap();
        assert_eq!(config.subscriber_queue, 8);
        assert_eq!(config.delivery_timeout, Duration::from_millis(40));
    }

    #[test]
    fn test_parse_partial_json() {
        let config = EngineConfig::from_json_str(r#"{"tick_period_ms": 20}"#).unwrap();
        assert_eq!(config.tick_period, Duration::from_millis(20));
        assert_eq!(config.ramp_steps, 100);
        assert_eq!(config.grace_period, Duration::from_secs(1));

        let config = EngineConfig::from_json_str("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_reject_invalid_config() {
        for text in [
            r#"{"tick_period_ms": 0}"#,
            r#"{"ramp_steps": 0}"#,
            r#"{"subscriber_queue": 0}"#,
            r#"{"delivery_timeout_ms": 0}"#,
            r#"{"tick_rate": 5}"#,
            "not json",
        ] {
            assert!(
                matches!(EngineConfig::from_json_str(text), Err(EngineError::Config(_))),
                "{text}"
            );
        }
    }

    #[test]
    fn test_engine_rejects_invalid_config() {
        let config = EngineConfig::default().with_ramp_steps(0);
        assert!(matches!(
            LightEngine::headless(config),
            Err(EngineError::Config(_))
        ));
    }
}
