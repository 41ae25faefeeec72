#[cfg(feature = "ast-json")]
use serde::{Deserialize, Serialize};

/// Identifies one compiled source text.
///
/// Every token carries the id of the text it was lexed from, so errors raised
/// long after compilation (e.g. a failing assertion inside an installed
/// function) can still be rendered against the right source snippet.
#[cfg_attr(feature = "ast-json", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SourceId(u32);

impl SourceId {
    pub const TOP_LEVEL: SourceId = SourceId(0);
}

impl From<u32> for SourceId {
    fn from(id: u32) -> Self {
        SourceId(id)
    }
}

/// Registry of compiled source texts, keyed by [`SourceId`].
#[derive(Debug, Clone, Default)]
pub struct SourceMap {
    texts: Vec<String>,
}

impl SourceMap {
    pub fn add(&mut self, text: impl Into<String>) -> SourceId {
        let id = self.texts.len() as u32;
        self.texts.push(text.into());
        SourceId(id)
    }

    pub fn text(&self, id: SourceId) -> Option<&str> {
        self.texts.get(id.0 as usize).map(String::as_str)
    }
}
