use crate::constants::VERSION_PREFIX;

/// Transform applied by the endpoint under test. Only ASCII letters change.
pub fn to_lower_case(text: &str) -> String {
    text.to_ascii_lowercase()
}

/// What the server should answer to `payload`.
pub fn expected_reply(payload: &str) -> String {
    to_lower_case(payload)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InboundMessage<'a> {
    /// `_<version>` announced once by the server when the connection opens.
    VersionTag(&'a str),
    Reply(&'a str),
}

impl<'a> InboundMessage<'a> {
    pub fn classify(text: &'a str) -> Self {
        match text.strip_prefix(VERSION_PREFIX) {
            Some(version) => InboundMessage::VersionTag(version),
            None => InboundMessage::Reply(text),
        }
    }
}
