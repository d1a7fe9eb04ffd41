use std::fmt;

use log::debug;
use shared::error::Result;
use shared::util::math_rand_alpha_number;

/// Kind of media a [`MediaEngine`] may be asked to handle.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
pub enum RTCMediaKind {
    #[default]
    Unspecified,
    Audio,
    Video,
}

impl fmt::Display for RTCMediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            RTCMediaKind::Audio => "audio",
            RTCMediaKind::Video => "video",
            RTCMediaKind::Unspecified => crate::peer_connection::configuration::UNSPECIFIED_STR,
        };
        write!(f, "{s}")
    }
}

/// Opaque audio/video capability consumed by the factory.
///
/// Only stream identifiers cross this seam; capture and codecs stay behind it.
pub trait MediaEngine: Send + Sync {
    /// Called once by the factory builder. A failure aborts factory creation.
    fn init(&self) -> Result<()>;

    fn supports(&self, kind: RTCMediaKind) -> bool;

    /// Creates an audio source and returns its stream identifier.
    fn create_audio_source(&self, label: &str) -> Result<String>;
}

/// Audio-only engine backed by no real device.
#[derive(Default, Debug, Clone)]
pub struct DummyMediaEngine;

impl MediaEngine for DummyMediaEngine {
    fn init(&self) -> Result<()> {
        debug!("dummy media engine initialized, audio only");
        Ok(())
    }

    fn supports(&self, kind: RTCMediaKind) -> bool {
        kind == RTCMediaKind::Audio
    }

    fn create_audio_source(&self, label: &str) -> Result<String> {
        Ok(format!("{label}-{}", math_rand_alpha_number(16)))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_dummy_media_engine() -> Result<()> {
        let engine = DummyMediaEngine;
        engine.init()?;

        let tests = vec![
            (RTCMediaKind::Audio, true),
            (RTCMediaKind::Video, false),
            (RTCMediaKind::Unspecified, false),
        ];
        for (kind, expected) in tests {
            assert_eq!(engine.supports(kind), expected, "{kind}");
        }

        let a = engine.create_audio_source("mic")?;
        let b = engine.create_audio_source("mic")?;
        assert!(a.starts_with("mic-"));
        assert_ne!(a, b);

        Ok(())
    }
}
