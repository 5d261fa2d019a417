//! Authentication state machine
//!
//! One call to [`AuthOrchestrator::run`] is one session:
//!
//! ```text
//! Idle → WakeWordWait → VoiceAuth → EyeScan → LivenessCheck → IrisAuth → Unlocking → Complete
//!            │              │          │            │             │           │
//!            └──────────────┴──────────┴────────────┴─────────────┴───────────┴──→ Failed(reason)
//! ```
//!
//! Each capture runs under its own deadline and a child of the session's
//! cancellation token. A timeout fails the step and cancels the child token
//! so the collaborator releases its hardware. Cancelling the session token
//! ends the session as `Cancelled`, which is never reported as a failure.
//! There is no automatic retry; a new attempt needs a new `run`.

use super::error::{AuthError, AuthStep};
use super::progress::ProgressSink;
use super::session::{AuthOutcome, AuthSession, AuthState};
use super::AuthConfig;
use crate::biometrics::{
    EnrollmentStore, IrisFeatureExtractor, IrisMatcher, LivenessGate, MatchError, MatchResult,
    Modality, StoreError, VoiceFeatureExtractor, VoiceMatcher,
};
use crate::capture::{CaptureError, EyeCapture, VoiceCapture};
use crate::device::UnlockCapability;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Why `drive` stopped before unlocking
enum Halt {
    Failed(AuthError),
    Cancelled,
    SetupRequired(Modality),
}

pub struct AuthOrchestrator {
    config: AuthConfig,
    liveness: LivenessGate,
    voice_matcher: VoiceMatcher,
    iris_matcher: IrisMatcher,
    voice: Arc<dyn VoiceCapture>,
    eyes: Arc<dyn EyeCapture>,
    device: Arc<dyn UnlockCapability>,
}

impl AuthOrchestrator {
    pub fn new(
        config: AuthConfig,
        liveness: LivenessGate,
        store: Arc<dyn EnrollmentStore>,
        voice: Arc<dyn VoiceCapture>,
        eyes: Arc<dyn EyeCapture>,
        device: Arc<dyn UnlockCapability>,
    ) -> Self {
        let voice_matcher =
            VoiceMatcher::new(VoiceFeatureExtractor, store.clone(), config.voice_threshold);
        let iris_matcher =
            IrisMatcher::new(IrisFeatureExtractor::default(), store, config.iris_threshold);

        Self {
            config,
            liveness,
            voice_matcher,
            iris_matcher,
            voice,
            eyes,
            device,
        }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub fn voice_matcher(&self) -> &VoiceMatcher {
        &self.voice_matcher
    }

    pub fn iris_matcher(&self) -> &IrisMatcher {
        &self.iris_matcher
    }

    /// Run one authentication session to a terminal state
    pub async fn run(&self, sink: &dyn ProgressSink, cancel: &CancellationToken) -> AuthOutcome {
        self.run_session(sink, cancel).await.0
    }

    /// Like [`run`](Self::run), also returning the finished session for diagnostics
    pub async fn run_session(
        &self,
        sink: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> (AuthOutcome, AuthSession) {
        let mut session = AuthSession::new();
        log::info!("Authentication session started");

        let outcome = match self.drive(&mut session, sink, cancel).await {
            Ok(()) => {
                session.transition(AuthState::Complete);
                sink.on_success();
                AuthOutcome::Unlocked
            }
            Err(Halt::Failed(reason)) => {
                log::warn!(
                    "Authentication failed in {:?}: {}",
                    session.state(),
                    reason
                );
                session.transition(AuthState::Failed(reason.clone()));
                sink.on_failure(&reason);
                AuthOutcome::Failed(reason)
            }
            Err(Halt::Cancelled) => {
                log::info!("Authentication cancelled in {:?}", session.state());
                session.transition(AuthState::Cancelled);
                AuthOutcome::Cancelled
            }
            Err(Halt::SetupRequired(modality)) => {
                log::warn!("Authentication needs setup: {} not enrolled", modality);
                session.transition(AuthState::SetupRequired(modality));
                sink.on_setup_required(modality);
                AuthOutcome::SetupRequired(modality)
            }
        };

        for timing in session.step_timings() {
            log::debug!("  {}: {:?}", timing.step, timing.elapsed);
        }

        (outcome, session)
    }

    async fn drive(
        &self,
        session: &mut AuthSession,
        sink: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<(), Halt> {
        self.check_enrollment()?;

        self.advance(session, sink, cancel, AuthState::WakeWordWait, "Listening for wake phrase")?;
        let utterance = self
            .capture(AuthStep::WakeWord, cancel, |timeout, token| {
                self.voice.listen_for_phrase(timeout, token)
            })
            .await?;
        if !contains_wake_phrase(&utterance, &self.config.wake_phrase) {
            log::info!("Wake phrase not found in utterance");
            return Err(Halt::Failed(AuthError::WakeWordNotDetected));
        }

        self.advance(session, sink, cancel, AuthState::VoiceAuth, "Verifying voice")?;
        let print = self
            .capture(AuthStep::VoiceAuth, cancel, |timeout, token| {
                self.voice.capture_print(timeout, token)
            })
            .await?;
        check_match(Modality::Voice, self.voice_matcher.verify(&print))?;

        self.advance(session, sink, cancel, AuthState::EyeScan, "Look at the camera")?;
        let scan = self
            .capture(AuthStep::EyeScan, cancel, |timeout, token| {
                self.eyes.scan_face(timeout, token)
            })
            .await?;

        self.advance(session, sink, cancel, AuthState::LivenessCheck, "Checking liveness")?;
        if let Err(rejection) = self.liveness.evaluate(&scan.signals) {
            log::info!("Liveness rejected: {}", rejection);
            return Err(Halt::Failed(AuthError::LivenessRejected(rejection)));
        }

        self.advance(session, sink, cancel, AuthState::IrisAuth, "Verifying iris")?;
        let frame = self
            .capture(AuthStep::IrisAuth, cancel, |timeout, token| {
                self.eyes.capture_high_res_frame(timeout, token)
            })
            .await?;
        check_match(Modality::Iris, self.iris_matcher.verify(&frame))?;

        self.advance(session, sink, cancel, AuthState::Unlocking, "Unlocking device")?;
        if self.device.device_is_locked() {
            self.device
                .unlock()
                .map_err(|e| Halt::Failed(AuthError::UnlockFailed(e.to_string())))?;
        } else {
            log::info!("Device already unlocked, skipping unlock call");
        }

        Ok(())
    }

    /// Both modalities must be enrolled before any hardware is touched
    fn check_enrollment(&self) -> Result<(), Halt> {
        let voice = self.voice_matcher.is_enrolled();
        let iris = self.iris_matcher.is_enrolled();
        for (modality, enrolled) in [(Modality::Voice, voice), (Modality::Iris, iris)] {
            match enrolled {
                Ok(true) => {}
                Ok(false) => return Err(Halt::SetupRequired(modality)),
                Err(e) => return Err(store_halt(modality, e)),
            }
        }
        Ok(())
    }

    /// Announce `next` and enter it, unless the session was cancelled
    fn advance(
        &self,
        session: &mut AuthSession,
        sink: &dyn ProgressSink,
        cancel: &CancellationToken,
        next: AuthState,
        message: &str,
    ) -> Result<(), Halt> {
        if cancel.is_cancelled() {
            return Err(Halt::Cancelled);
        }
        if let Some(step) = next.step() {
            sink.on_progress(step, message);
        }
        session.transition(next);
        Ok(())
    }

    /// Run one collaborator call under the step deadline and the session token
    async fn capture<T, F, Fut>(
        &self,
        step: AuthStep,
        cancel: &CancellationToken,
        call: F,
    ) -> Result<T, Halt>
    where
        F: FnOnce(Duration, CancellationToken) -> Fut,
        Fut: Future<Output = Result<T, CaptureError>>,
    {
        let timeout = self.config.timeout(step);
        let step_token = cancel.child_token();

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            result = tokio::time::timeout(timeout, call(timeout, step_token.clone())) => {
                Some(result)
            }
        };

        match result {
            None => {
                step_token.cancel();
                Err(Halt::Cancelled)
            }
            Some(Err(_elapsed)) => {
                step_token.cancel();
                log::warn!("{} timed out after {:?}", step, timeout);
                Err(Halt::Failed(AuthError::CaptureTimeout(step)))
            }
            Some(Ok(Err(CaptureError::Cancelled))) => Err(Halt::Cancelled),
            Some(Ok(Err(CaptureError::Unavailable(detail)))) => {
                Err(Halt::Failed(AuthError::CaptureUnavailable { step, detail }))
            }
            Some(Ok(Ok(value))) => Ok(value),
        }
    }
}

/// Case-insensitive substring match
pub(crate) fn contains_wake_phrase(utterance: &str, phrase: &str) -> bool {
    utterance.to_lowercase().contains(&phrase.to_lowercase())
}

fn store_halt(modality: Modality, error: StoreError) -> Halt {
    match error {
        StoreError::Unavailable(detail) => Halt::Failed(AuthError::StorageUnavailable(detail)),
        StoreError::Corrupt(detail) => Halt::Failed(AuthError::CorruptRecord { modality, detail }),
    }
}

fn check_match(modality: Modality, result: Result<MatchResult, MatchError>) -> Result<(), Halt> {
    match result {
        Ok(m) if m.authenticated => Ok(()),
        Ok(m) => Err(Halt::Failed(AuthError::SimilarityBelowThreshold {
            modality,
            score: m.score(),
            threshold: m.threshold,
        })),
        Err(MatchError::NoEnrollment(m)) => Err(Halt::SetupRequired(m)),
        Err(MatchError::EmptySample(m)) => Err(Halt::Failed(AuthError::EmptySample(m))),
        Err(MatchError::Store(e)) => Err(store_halt(modality, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::progress::{ChannelProgressSink, ProgressEvent};
    use crate::biometrics::{
        CaptureSignals, EnrollmentRecord, FeatureVector, Frame, LivenessRejection,
        MemoryEnrollmentStore, SampleDigest,
    };
    use crate::capture::stub::{Script, ScriptedEyeCapture, ScriptedVoiceCapture};
    use crate::capture::FaceScan;
    use crate::device::SimulatedDevice;
    use tokio::sync::mpsc::UnboundedReceiver;

    const VOICE_PRINT: &str = "my voice is my password";

    fn iris_frame() -> Frame {
        Frame::from_fn(48, 48, |x, y| {
            let dx = x as i32 - 24;
            let dy = y as i32 - 24;
            let r = ((dx * dx + dy * dy) as f64).sqrt();
            let v = (128.0 + 100.0 * (r / 3.0).sin()) as u8;
            [v, v / 2, 255 - v]
        })
    }

    fn live_scan() -> FaceScan {
        FaceScan {
            signals: CaptureSignals {
                eye_open_left: 0.95,
                eye_open_right: 0.92,
                pose_angle_deg: 2.0,
            },
            frame: iris_frame(),
        }
    }

    struct Harness {
        store: Arc<MemoryEnrollmentStore>,
        voice: Arc<ScriptedVoiceCapture>,
        eyes: Arc<ScriptedEyeCapture>,
        device: Arc<SimulatedDevice>,
        orchestrator: AuthOrchestrator,
    }

    impl Harness {
        fn new(voice: ScriptedVoiceCapture, eyes: ScriptedEyeCapture) -> Self {
            Self::with(AuthConfig::default(), voice, eyes, SimulatedDevice::locked())
        }

        fn with(
            config: AuthConfig,
            voice: ScriptedVoiceCapture,
            eyes: ScriptedEyeCapture,
            device: SimulatedDevice,
        ) -> Self {
            let store = Arc::new(MemoryEnrollmentStore::new());
            let voice = Arc::new(voice);
            let eyes = Arc::new(eyes);
            let device = Arc::new(device);
            let orchestrator = AuthOrchestrator::new(
                config,
                LivenessGate::default(),
                store.clone(),
                voice.clone(),
                eyes.clone(),
                device.clone(),
            );
            Self {
                store,
                voice,
                eyes,
                device,
                orchestrator,
            }
        }

        fn enrolled(self) -> Self {
            self.orchestrator.voice_matcher().enroll(VOICE_PRINT).unwrap();
            self.orchestrator.iris_matcher().enroll(&iris_frame()).unwrap();
            self
        }

        async fn run(&self) -> (AuthOutcome, Vec<ProgressEvent>) {
            let (sink, rx) = ChannelProgressSink::new();
            let outcome = self.orchestrator.run(&sink, &CancellationToken::new()).await;
            (outcome, drain(rx))
        }
    }

    fn drain(mut rx: UnboundedReceiver<ProgressEvent>) -> Vec<ProgressEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    fn steps(events: &[ProgressEvent]) -> Vec<AuthStep> {
        events
            .iter()
            .filter_map(|e| match e {
                ProgressEvent::Progress { step, .. } => Some(*step),
                _ => None,
            })
            .collect()
    }

    fn happy_voice() -> ScriptedVoiceCapture {
        ScriptedVoiceCapture::new()
            .phrase(Script::Respond("ok OPEN PHONE now".to_string()))
            .print(Script::Respond(VOICE_PRINT.to_string()))
    }

    fn happy_eyes() -> ScriptedEyeCapture {
        ScriptedEyeCapture::new()
            .scan(Script::Respond(live_scan()))
            .frame(Script::Respond(iris_frame()))
    }

    #[tokio::test]
    async fn test_full_pipeline_unlocks() {
        let h = Harness::new(happy_voice(), happy_eyes()).enrolled();
        let (outcome, events) = h.run().await;

        assert_eq!(outcome, AuthOutcome::Unlocked);
        assert!(!h.device.device_is_locked());
        assert_eq!(h.device.unlock_calls(), 1);
        assert_eq!(
            steps(&events),
            vec![
                AuthStep::WakeWord,
                AuthStep::VoiceAuth,
                AuthStep::EyeScan,
                AuthStep::LivenessCheck,
                AuthStep::IrisAuth,
                AuthStep::Unlocking,
            ]
        );
        assert_eq!(events.last(), Some(&ProgressEvent::Success));
    }

    #[tokio::test]
    async fn test_session_records_timings() {
        let h = Harness::new(happy_voice(), happy_eyes()).enrolled();
        let (sink, _rx) = ChannelProgressSink::new();
        let (_, session) = h
            .orchestrator
            .run_session(&sink, &CancellationToken::new())
            .await;

        assert_eq!(session.state(), &AuthState::Complete);
        assert_eq!(session.step_timings().len(), 6);
        assert!(session.last_error().is_none());
    }

    #[tokio::test]
    async fn test_wrong_wake_phrase_skips_voice_match() {
        let voice = ScriptedVoiceCapture::new()
            .phrase(Script::Respond("please unlock now".to_string()))
            .print(Script::Respond(VOICE_PRINT.to_string()));
        let h = Harness::new(voice, happy_eyes()).enrolled();

        let (outcome, events) = h.run().await;
        assert_eq!(outcome, AuthOutcome::Failed(AuthError::WakeWordNotDetected));
        assert_eq!(h.voice.call_count("capture_print"), 0);
        assert_eq!(steps(&events), vec![AuthStep::WakeWord]);
        assert_eq!(
            events.last(),
            Some(&ProgressEvent::Failure {
                reason: "wake word not detected".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_voice_mismatch_stops_before_camera() {
        let voice = ScriptedVoiceCapture::new()
            .phrase(Script::Respond("open phone".to_string()))
            .print(Script::Respond("Someone Else Entirely".to_string()));
        let h = Harness::new(voice, happy_eyes()).enrolled();

        let (outcome, _) = h.run().await;
        match outcome {
            AuthOutcome::Failed(AuthError::SimilarityBelowThreshold {
                modality,
                score,
                threshold,
            }) => {
                assert_eq!(modality, Modality::Voice);
                assert!(score < threshold);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(h.eyes.call_count("scan_face"), 0);
        assert!(h.device.device_is_locked());
    }

    #[tokio::test]
    async fn test_closed_eye_fails_liveness_without_iris_capture() {
        let mut scan = live_scan();
        scan.signals.eye_open_left = 0.40;
        let eyes = ScriptedEyeCapture::new()
            .scan(Script::Respond(scan))
            .frame(Script::Respond(iris_frame()));
        let h = Harness::new(happy_voice(), eyes).enrolled();

        let (outcome, events) = h.run().await;
        assert_eq!(
            outcome,
            AuthOutcome::Failed(AuthError::LivenessRejected(
                LivenessRejection::LeftEyeClosed(0.40)
            ))
        );
        assert_eq!(h.eyes.call_count("capture_high_res_frame"), 0);
        assert_eq!(
            events.last(),
            Some(&ProgressEvent::Failure {
                reason: "liveness detection failed".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_iris_mismatch() {
        let eyes = ScriptedEyeCapture::new()
            .scan(Script::Respond(live_scan()))
            .frame(Script::Respond(Frame::from_fn(48, 48, |_, _| [10, 10, 10])));
        let h = Harness::new(happy_voice(), eyes).enrolled();

        let (outcome, events) = h.run().await;
        assert!(matches!(
            outcome,
            AuthOutcome::Failed(AuthError::SimilarityBelowThreshold {
                modality: Modality::Iris,
                ..
            })
        ));
        assert_eq!(
            events.last(),
            Some(&ProgressEvent::Failure {
                reason: "iris authentication failed".to_string()
            })
        );
        assert!(h.device.device_is_locked());
    }

    #[tokio::test(start_paused = true)]
    async fn test_wake_word_timeout_cancels_capture() {
        let voice = ScriptedVoiceCapture::new().phrase(Script::Hang);
        let h = Harness::new(voice, happy_eyes()).enrolled();

        let (outcome, events) = h.run().await;
        assert_eq!(
            outcome,
            AuthOutcome::Failed(AuthError::CaptureTimeout(AuthStep::WakeWord))
        );
        assert_eq!(
            events.last(),
            Some(&ProgressEvent::Failure {
                reason: "wake word timeout".to_string()
            })
        );
        let tokens = h.voice.tokens();
        assert_eq!(tokens.len(), 1);
        assert!(tokens[0].is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_iris_capture_times_out() {
        let eyes = ScriptedEyeCapture::new()
            .scan(Script::Respond(live_scan()))
            .frame(Script::RespondAfter(Duration::from_secs(6), iris_frame()));
        let h = Harness::new(happy_voice(), eyes).enrolled();

        let (outcome, _) = h.run().await;
        assert_eq!(
            outcome,
            AuthOutcome::Failed(AuthError::CaptureTimeout(AuthStep::IrisAuth))
        );
        assert!(h.eyes.tokens().last().unwrap().is_cancelled());
        assert!(h.device.device_is_locked());
    }

    #[tokio::test(start_paused = true)]
    async fn test_iris_capture_within_budget_succeeds() {
        let eyes = ScriptedEyeCapture::new()
            .scan(Script::RespondAfter(Duration::from_secs(14), live_scan()))
            .frame(Script::RespondAfter(Duration::from_secs(4), iris_frame()));
        let h = Harness::new(happy_voice(), eyes).enrolled();

        let (outcome, _) = h.run().await;
        assert_eq!(outcome, AuthOutcome::Unlocked);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_eye_scan_is_silent() {
        let eyes = ScriptedEyeCapture::new().scan(Script::Hang);
        let h = Harness::new(happy_voice(), eyes).enrolled();

        let cancel = CancellationToken::new();
        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            canceller.cancel();
        });

        let (sink, rx) = ChannelProgressSink::new();
        let (outcome, session) = h.orchestrator.run_session(&sink, &cancel).await;
        let events = drain(rx);

        assert_eq!(outcome, AuthOutcome::Cancelled);
        assert_eq!(session.state(), &AuthState::Cancelled);
        assert!(events
            .iter()
            .all(|e| !matches!(e, ProgressEvent::Failure { .. })));
        assert!(h.eyes.tokens().iter().all(|t| t.is_cancelled()));
        assert!(h.device.device_is_locked());
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let h = Harness::new(happy_voice(), happy_eyes()).enrolled();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let (sink, rx) = ChannelProgressSink::new();
        assert_eq!(h.orchestrator.run(&sink, &cancel).await, AuthOutcome::Cancelled);
        assert!(drain(rx).is_empty());
        assert_eq!(h.voice.call_count("listen_for_phrase"), 0);
    }

    #[tokio::test]
    async fn test_collaborator_reported_cancel() {
        let voice = ScriptedVoiceCapture::new()
            .phrase(Script::Fail(CaptureError::Cancelled));
        let h = Harness::new(voice, happy_eyes()).enrolled();

        let (outcome, _) = h.run().await;
        assert_eq!(outcome, AuthOutcome::Cancelled);
    }

    #[tokio::test]
    async fn test_unenrolled_requires_setup() {
        let h = Harness::new(happy_voice(), happy_eyes());
        h.orchestrator.voice_matcher().enroll(VOICE_PRINT).unwrap();

        let (outcome, events) = h.run().await;
        assert_eq!(outcome, AuthOutcome::SetupRequired(Modality::Iris));
        assert_eq!(
            events,
            vec![ProgressEvent::SetupRequired {
                modality: Modality::Iris
            }]
        );
        assert_eq!(h.voice.call_count("listen_for_phrase"), 0);

        let (sink, _rx) = ChannelProgressSink::new();
        let (_, session) = h
            .orchestrator
            .run_session(&sink, &CancellationToken::new())
            .await;
        assert_eq!(
            session.last_error(),
            Some(&AuthError::NoEnrollment(Modality::Iris))
        );
    }

    #[tokio::test]
    async fn test_reenrollment_uses_newest_record() {
        let voice = ScriptedVoiceCapture::new()
            .phrase(Script::Respond("open phone".to_string()))
            .print(Script::Respond("The Second Phrase".to_string()));
        let h = Harness::new(voice, happy_eyes()).enrolled();
        h.orchestrator
            .voice_matcher()
            .enroll("The Second Phrase")
            .unwrap();

        let (outcome, _) = h.run().await;
        assert_eq!(outcome, AuthOutcome::Unlocked);
    }

    #[tokio::test]
    async fn test_corrupt_record_fails_without_scoring() {
        let h = Harness::new(happy_voice(), happy_eyes()).enrolled();
        h.store
            .put(
                Modality::Iris.storage_key(),
                &EnrollmentRecord::new(
                    Modality::Iris,
                    SampleDigest::from_hex("ff"),
                    FeatureVector::new(vec![1.0; 4]),
                ),
            )
            .unwrap();

        let (outcome, _) = h.run().await;
        match outcome {
            AuthOutcome::Failed(e @ AuthError::CorruptRecord { .. }) => {
                assert!(e.is_non_recoverable());
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert!(h.device.device_is_locked());
    }

    #[tokio::test]
    async fn test_capture_unavailable() {
        let voice = ScriptedVoiceCapture::new()
            .phrase(Script::Fail(CaptureError::Unavailable("mic busy".to_string())));
        let h = Harness::new(voice, happy_eyes()).enrolled();

        let (outcome, _) = h.run().await;
        assert_eq!(
            outcome,
            AuthOutcome::Failed(AuthError::CaptureUnavailable {
                step: AuthStep::WakeWord,
                detail: "mic busy".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_already_unlocked_device_not_unlocked_again() {
        let h = Harness::new(happy_voice(), happy_eyes()).enrolled();
        h.device.unlock().unwrap();

        let (outcome, _) = h.run().await;
        assert_eq!(outcome, AuthOutcome::Unlocked);
        assert_eq!(h.device.unlock_calls(), 1);
    }

    #[tokio::test]
    async fn test_unlock_rejection_fails_session() {
        let h = Harness::with(
            AuthConfig::default(),
            happy_voice(),
            happy_eyes(),
            SimulatedDevice::locked().rejecting_unlock(),
        )
        .enrolled();

        let (outcome, _) = h.run().await;
        assert!(matches!(
            outcome,
            AuthOutcome::Failed(AuthError::UnlockFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_thresholds_come_from_config() {
        let config = AuthConfig {
            voice_threshold: 0.0,
            wake_phrase: "hey ember".to_string(),
            ..AuthConfig::default()
        };
        let voice = ScriptedVoiceCapture::new()
            .phrase(Script::Respond("Hey Ember".to_string()))
            .print(Script::Respond("not the enrolled phrase".to_string()));
        let h = Harness::with(config, voice, happy_eyes(), SimulatedDevice::locked()).enrolled();

        let (outcome, _) = h.run().await;
        assert_eq!(outcome, AuthOutcome::Unlocked);
    }

    #[test]
    fn test_wake_phrase_matching() {
        assert!(contains_wake_phrase("Hey, OPEN PHONE please", "open phone"));
        assert!(contains_wake_phrase("open phone", "Open Phone"));
        assert!(!contains_wake_phrase("please unlock now", "open phone"));
        assert!(!contains_wake_phrase("open the phone", "open phone"));
    }
}
