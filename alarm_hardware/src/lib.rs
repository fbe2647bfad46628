//! Simulated platform collaborators for running the alarm off-device.
//!
//! Every type here implements one of the `alarm_traits` collaborator traits.
pub mod accelerometer;
pub mod error;
pub mod haptics;
pub mod platform;
pub mod profile;

pub use accelerometer::SimAccelerometer;
pub use haptics::LoggedHaptics;
pub use platform::{SimAuthorization, SimDataSource, SimSensingFactory};
pub use profile::MotionProfile;

#[cfg(test)]
mod tests {
    use super::*;
    use alarm_traits::{
        AuthorizationProvider, AuthorizationStatus, Haptics, PulseKind, SensingSessionFactory,
        SensingState, SessionDelegate,
    };
    use std::sync::{Arc, Mutex};
    use std::time::Instant;

    #[derive(Default)]
    struct StateLog(Mutex<Vec<SensingState>>);

    impl SessionDelegate for StateLog {
        fn on_state_change(&self, state: SensingState, _at: Instant) {
            self.0.lock().unwrap().push(state);
        }
        fn on_error(&self, _error: alarm_traits::BoxError) {}
    }

    #[test]
    fn test_sim_session_lifecycle() {
        let log = Arc::new(StateLog::default());
        let mut session = SimSensingFactory::new().create(log.clone()).unwrap();
        session.start();
        let began = Arc::new(Mutex::new(None));
        let b = began.clone();
        session.begin_collection(Box::new(move |ok| *b.lock().unwrap() = Some(ok)));
        session.stop();
        session.end_collection(Box::new(|_| {}));
        session.finish(Box::new(|_| {}));
        assert_eq!(*began.lock().unwrap(), Some(true));
        assert_eq!(
            *log.0.lock().unwrap(),
            vec![
                SensingState::Prepared,
                SensingState::Running,
                SensingState::Stopped,
                SensingState::Ended
            ]
        );
    }

    #[test]
    fn test_refusing_factory() {
        let log = Arc::new(StateLog::default());
        let err = SimSensingFactory::refusing().create(log).err().unwrap();
        assert!(err.to_string().contains("refused"));
    }

    #[test]
    fn test_sim_authorization_prompt() {
        let mut auth = SimAuthorization::new(AuthorizationStatus::Undetermined, false);
        let answer = Arc::new(Mutex::new(None));
        let a = answer.clone();
        auth.request_authorization(Box::new(move |g| *a.lock().unwrap() = Some(g)));
        assert_eq!(*answer.lock().unwrap(), Some(false));
        assert_eq!(auth.current_status(), AuthorizationStatus::Denied);
    }

    #[test]
    fn test_logged_haptics_counts() {
        let h = LoggedHaptics::new();
        let mut out = h.clone();
        out.play(PulseKind::Notification);
        out.play(PulseKind::DirectionUp);
        assert_eq!(h.played(), 2);
    }
}
