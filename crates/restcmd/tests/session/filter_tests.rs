use super::test_utilities::{MockTransport, ScriptedPrompt, commands, controller};
use restcmd::{ConfigError, Correlator, SessionConfig};
use std::time::Duration;

#[test]
fn test_absent_filter_command_fails_before_dispatch() {
    let correlator = Correlator::new();
    let transport = MockTransport::new(&correlator);

    let err = commands(&["a", "b"]).restrict_to("x").unwrap_err();

    assert_eq!(
        err,
        ConfigError::CommandNotFound {
            command_id: "x".to_string()
        }
    );
    assert!(transport.sent_ids().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_filter_dispatches_exactly_one_command() {
    let correlator = Correlator::new();
    let transport = MockTransport::new(&correlator);
    let only_b = commands(&["a", "b", "c"]).restrict_to("b").unwrap();
    let mut session = controller(
        only_b,
        transport.clone(),
        correlator,
        SessionConfig::stream(Duration::from_secs(2)),
    );

    session.run(&mut ScriptedPrompt::default()).await;

    assert_eq!(transport.sent_ids(), vec!["b"]);
    assert_eq!(session.finish().dispatched(), 1);
}
