//! ISCP message codes for the zone-control subset.
//!
//! An ISCP message is a five-character code (`!1PWR`) followed by a payload
//! (`01`, `QSTN`, `N/A`, a hex value or an XML document).

use onkyo_descriptor::ZoneId;

/// Payload asking the receiver to report the current value
pub const QUERY: &str = "QSTN";

/// Payload meaning the value is currently unavailable
pub const NOT_AVAILABLE: &str = "N/A";

pub const LISTENING_MODE: &str = "!1LMD";
pub const TUNER_PRESET: &str = "!1PRS";
pub const RECEIVER_INFO: &str = "!1NRI";

const CODE_LEN: usize = 5;

/// Message codes addressing one zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoneCodes {
    pub power: &'static str,
    pub mute: &'static str,
    pub volume: &'static str,
    pub source: &'static str,
}

const MAIN: ZoneCodes = ZoneCodes {
    power: "!1PWR",
    mute: "!1AMT",
    volume: "!1MVL",
    source: "!1SLI",
};

const ZONE2: ZoneCodes = ZoneCodes {
    power: "!1ZPW",
    mute: "!1ZMT",
    volume: "!1ZVL",
    source: "!1SLZ",
};

const ZONE3: ZoneCodes = ZoneCodes {
    power: "!1PW3",
    mute: "!1MT3",
    volume: "!1VL3",
    source: "!1SL3",
};

const ZONE4: ZoneCodes = ZoneCodes {
    power: "!1PW4",
    mute: "!1MT4",
    volume: "!1VL4",
    source: "!1SL4",
};

pub fn zone_codes(zone: ZoneId) -> &'static ZoneCodes {
    match zone {
        ZoneId::Main => &MAIN,
        ZoneId::Zone2 => &ZONE2,
        ZoneId::Zone3 => &ZONE3,
        ZoneId::Zone4 => &ZONE4,
    }
}

/// What an inbound message code reports on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Power(ZoneId),
    Mute(ZoneId),
    Volume(ZoneId),
    Source(ZoneId),
    ListeningMode,
    TunerPreset,
    ReceiverInfo,
}

impl MessageKind {
    /// Classify a five-character code. Unknown codes yield `None`.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            LISTENING_MODE => return Some(MessageKind::ListeningMode),
            TUNER_PRESET => return Some(MessageKind::TunerPreset),
            RECEIVER_INFO => return Some(MessageKind::ReceiverInfo),
            _ => {}
        }

        ZoneId::ALL.into_iter().find_map(|zone| {
            let codes = zone_codes(zone);
            if code == codes.power {
                Some(MessageKind::Power(zone))
            } else if code == codes.mute {
                Some(MessageKind::Mute(zone))
            } else if code == codes.volume {
                Some(MessageKind::Volume(zone))
            } else if code == codes.source {
                Some(MessageKind::Source(zone))
            } else {
                None
            }
        })
    }
}

/// A decoded ISCP message split into code and payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IscpMessage<'a> {
    pub code: &'a str,
    pub payload: &'a str,
}

impl<'a> IscpMessage<'a> {
    pub fn parse(message: &'a str) -> Option<Self> {
        if !message.starts_with('!') || !message.is_char_boundary(CODE_LEN) {
            return None;
        }
        let (code, payload) = message.split_at(CODE_LEN);
        Some(Self {
            code,
            payload: payload.trim_end_matches(['\r', '\n', '\0']),
        })
    }

    pub fn kind(&self) -> Option<MessageKind> {
        MessageKind::from_code(self.code)
    }
}

/// Build the ISCP text for `code` with `payload`.
pub fn command(code: &str, payload: &str) -> String {
    format!("{}{}", code, payload)
}

/// Build a status query for `code`.
pub fn query(code: &str) -> String {
    command(code, QUERY)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("!1PWR", MessageKind::Power(ZoneId::Main))]
    #[case("!1AMT", MessageKind::Mute(ZoneId::Main))]
    #[case("!1ZVL", MessageKind::Volume(ZoneId::Zone2))]
    #[case("!1SL3", MessageKind::Source(ZoneId::Zone3))]
    #[case("!1PW4", MessageKind::Power(ZoneId::Zone4))]
    #[case("!1MT4", MessageKind::Mute(ZoneId::Zone4))]
    #[case("!1LMD", MessageKind::ListeningMode)]
    #[case("!1PRS", MessageKind::TunerPreset)]
    #[case("!1NRI", MessageKind::ReceiverInfo)]
    fn test_classify(#[case] code: &str, #[case] expected: MessageKind) {
        assert_eq!(MessageKind::from_code(code), Some(expected));
    }

    #[test]
    fn test_unknown_code() {
        assert_eq!(MessageKind::from_code("!1TUN"), None);
        assert_eq!(IscpMessage::parse("!1TUN08750").unwrap().kind(), None);
    }

    #[test]
    fn test_parse_splits_code_and_payload() {
        let message = IscpMessage::parse("!1MVL2A\r\n").unwrap();
        assert_eq!(message.code, "!1MVL");
        assert_eq!(message.payload, "2A");
    }

    #[rstest]
    #[case("")]
    #[case("!1PW")]
    #[case("PWR01")]
    #[case("!1PWé")]
    fn test_parse_rejects_short_or_foreign(#[case] text: &str) {
        assert!(IscpMessage::parse(text).is_none());
    }

    #[test]
    fn test_query() {
        assert_eq!(query(zone_codes(ZoneId::Zone2).power), "!1ZPWQSTN");
    }
}
