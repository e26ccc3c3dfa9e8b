//! Integration tests from an embedding application's perspective.
//!
//! These exercise the public API the way a UI host would: one shared
//! controller, a transport, an event sink, and several competing callers.
//!
//! Run: `cargo test --test pairing_journey`

// ============================================================================
// 1. Admission Journey
// ============================================================================
mod admission {
    use std::sync::Arc;

    use pairctl::error::PairingError;
    use pairctl::pairing::{ConnectionToken, Release, SessionController, SessionState};

    #[test]
    fn test_retry_after_failure_then_lockout_after_success() {
        let controller = SessionController::new();
        let token = ConnectionToken::from("qr-1");

        controller.start_pairing(&token).unwrap();
        controller.stop_pairing(&token, Some("peer went away".to_string()));
        controller.start_pairing(&token).unwrap();
        assert_eq!(controller.stop_pairing(&token, None), Release::Released);

        assert_eq!(
            controller.start_pairing(&token),
            Err(PairingError::AlreadyPaired { token })
        );
        assert_eq!(controller.state(), SessionState::Idle);
    }

    #[test]
    fn test_restart_forgets_outcomes() {
        let token = ConnectionToken::from("qr-2");
        {
            let controller = SessionController::new();
            controller.start_pairing(&token).unwrap();
            controller.stop_pairing(&token, None);
        }
        let restarted = SessionController::new();
        assert!(restarted.start_pairing(&token).is_ok());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_tasks_admit_exactly_one() {
        const N: usize = 64;
        let controller = Arc::new(SessionController::new());
        let barrier = Arc::new(tokio::sync::Barrier::new(N));

        let mut handles = Vec::with_capacity(N);
        for i in 0..N {
            let controller = Arc::clone(&controller);
            let barrier = Arc::clone(&barrier);
            handles.push(tokio::spawn(async move {
                barrier.wait().await;
                controller.start_pairing(&ConnectionToken::from(format!("t{}", i)))
            }));
        }

        let mut admitted = 0;
        let mut busy = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(()) => admitted += 1,
                Err(PairingError::AlreadyPairing) => busy += 1,
                Err(other) => panic!("unexpected error: {}", other),
            }
        }
        assert_eq!(admitted, 1);
        assert_eq!(busy, N - 1);
    }
}

// ============================================================================
// 2. Orchestrated Pairing Journey
// ============================================================================
mod orchestration {
    use std::sync::Arc;
    use std::time::Duration;

    use pairctl::config::PairingConfig;
    use pairctl::error::{Error, PairingError};
    use pairctl::pairing::{
        AttemptReport, BroadcastSink, EventEmitter, FailurePoint, PairingApi, PairingEvent,
        PairingRequest, SimulatedTransport,
    };
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_ui_observes_full_success_over_broadcast() {
        let sink = BroadcastSink::new(16);
        let mut ui = sink.subscribe();
        let api = PairingApi::from_config(
            &PairingConfig::default(),
            EventEmitter::new(Arc::new(sink)),
            Arc::new(SimulatedTransport::instant()),
        );

        let report = api.start(PairingRequest::new("qr-ok")).unwrap().wait().await;
        assert_eq!(report, AttemptReport::Paired);

        let mut signals = Vec::new();
        while let Ok(event) = ui.try_recv() {
            signals.push(event.to_signal());
        }
        assert_eq!(
            signals,
            vec![
                r#"{"type":"connection-success"}"#.to_string(),
                r#"{"type":"transfer-success"}"#.to_string(),
                r#"{"type":"success"}"#.to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_failed_attempt_can_be_retried_with_same_token() {
        let failing = PairingApi::new(
            Arc::new(pairctl::SessionController::new()),
            EventEmitter::null(),
            Arc::new(SimulatedTransport::instant().failing_at(FailurePoint::Transfer)),
        );
        let report = failing
            .start(PairingRequest::new("qr-retry"))
            .unwrap()
            .wait()
            .await;
        assert!(matches!(report, AttemptReport::Failed(_)));

        // Same controller, working transport.
        let working = PairingApi::new(
            Arc::clone(failing.sessions()),
            EventEmitter::null(),
            Arc::new(SimulatedTransport::instant()),
        );
        let report = working
            .start(PairingRequest::new("qr-retry"))
            .unwrap()
            .wait()
            .await;
        assert!(report.is_paired());

        let err = working.start(PairingRequest::new("qr-retry")).unwrap_err();
        assert!(matches!(
            err,
            Error::Pairing(PairingError::AlreadyPaired { .. })
        ));
    }

    #[tokio::test]
    async fn test_terminal_event_arrives_after_slot_is_free() {
        let sink = BroadcastSink::new(16);
        let mut ui = sink.subscribe();
        let api = PairingApi::new(
            Arc::new(pairctl::SessionController::new()),
            EventEmitter::new(Arc::new(sink)),
            Arc::new(SimulatedTransport::instant().failing_at(FailurePoint::Connect)),
        );

        let _handle = api.start(PairingRequest::new("qr-a")).unwrap();
        let event = ui.recv().await.unwrap();
        assert_eq!(event, PairingEvent::ConnectionError);

        // A UI reacting to the error can start again at once.
        let retry = api.start(PairingRequest::new("qr-b")).unwrap();
        retry.wait().await;
    }

    #[tokio::test]
    async fn test_slow_phase_times_out_and_frees_slot() {
        let config = PairingConfig {
            phase_timeout: Duration::from_millis(25),
            ..PairingConfig::default()
        };
        let api = PairingApi::from_config(
            &config,
            EventEmitter::null(),
            Arc::new(SimulatedTransport::with_phase_delay(Duration::from_secs(30))),
        );

        let report = api.start(PairingRequest::new("qr-slow")).unwrap().wait().await;
        assert!(matches!(report, AttemptReport::Failed(_)));
        assert!(!api.sessions().is_pairing());
    }
}
