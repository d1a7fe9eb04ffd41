use serde::{Deserialize, Serialize};

/// Limits the candidates the transport is allowed to gather and use.
#[derive(Default, Debug, PartialEq, Eq, Copy, Clone, Serialize, Deserialize)]
pub enum RTCIceTransportPolicy {
    /// Platform default, all transports allowed.
    #[default]
    Unspecified = 0,

    /// Any type of candidate may be used.
    #[serde(rename = "all")]
    All = 1,

    /// Only relay candidates, e.g. through a TURN server. Host candidates
    /// are not gathered.
    #[serde(rename = "relay")]
    Relay = 2,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_ice_transport_policy_json() {
        let tests = vec![
            ("\"all\"", RTCIceTransportPolicy::All),
            ("\"relay\"", RTCIceTransportPolicy::Relay),
        ];

        for (json, expected_policy) in tests {
            let policy: RTCIceTransportPolicy = serde_json::from_str(json).unwrap();
            assert_eq!(policy, expected_policy);
        }
        assert!(serde_json::from_str::<RTCIceTransportPolicy>("\"none\"").is_err());
    }
}
