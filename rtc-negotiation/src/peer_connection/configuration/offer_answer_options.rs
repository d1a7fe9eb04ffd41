/// Options that control the generation of an answer.
#[derive(Default, Debug, PartialEq, Eq, Copy, Clone)]
pub struct RTCAnswerOptions {
    /// Whether voice activity detection should be requested for audio.
    pub voice_activity_detection: bool,
}

/// Options that control the generation of an offer.
#[derive(Default, Debug, PartialEq, Eq, Copy, Clone)]
pub struct RTCOfferOptions {
    /// Regenerate ICE credentials so that the remote side restarts ICE.
    pub ice_restart: bool,

    /// Request a receive-only audio section.
    pub offer_to_receive_audio: bool,

    /// Request a receive-only video section. Fails with
    /// `ConstraintsUnsatisfiable` when the media engine has no video support.
    pub offer_to_receive_video: bool,

    pub voice_activity_detection: bool,
}
