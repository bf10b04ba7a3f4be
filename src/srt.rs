use std::time::Duration;

/// A single block of an SRT file, before it is turned into captions.
#[derive(Debug, Clone, PartialEq)]
pub struct Subtitle {
    pub sequence_number: Option<usize>,
    pub show_at: Duration,
    pub hide_at: Duration,
    pub text: Vec<String>,
}
