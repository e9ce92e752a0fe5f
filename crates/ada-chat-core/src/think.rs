//! Splitting assistant replies into plain text and `<think>` segments
//!
//! Reasoning models wrap their scratch work in `<think>...</think>`. The
//! front end shows that work collapsed, so every assistant message is
//! projected into an ordered list of [`Segment`]s before rendering.

use regex::Regex;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::OnceLock;

use crate::state::{ChatMessage, ChatRole};

pub const THINK_OPEN: &str = "<think>";
pub const THINK_CLOSE: &str = "</think>";

fn think_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // Lazy `.*?` stops at the first closing marker, so pairs never nest.
    PATTERN.get_or_init(|| Regex::new(r"(?s)<think>(.*?)</think>").expect("think pattern is valid"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SegmentKind {
    Text,
    Thought,
}

/// Identity of a thought segment: which message, and the byte offset of its
/// opening marker within that message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ThoughtId {
    pub message: usize,
    pub offset: usize,
}

impl fmt::Display for ThoughtId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.message, self.offset)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub kind: SegmentKind,
    pub content: String,
    /// Only thought segments carry an id.
    pub id: Option<ThoughtId>,
}

impl Segment {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            kind: SegmentKind::Text,
            content: content.into(),
            id: None,
        }
    }

    pub fn thought(content: impl Into<String>, id: ThoughtId) -> Self {
        Self {
            kind: SegmentKind::Thought,
            content: content.into(),
            id: Some(id),
        }
    }

    pub fn is_thought(&self) -> bool {
        self.kind == SegmentKind::Thought
    }
}

/// Split a message body into ordered segments.
///
/// User messages are never parsed. For assistant messages, matched
/// `<think>` pairs become thought segments (even when empty) and the text
/// around them becomes text segments (only when non-empty). An opening
/// marker without a close is left in the text. Empty input yields a single
/// empty text segment.
pub fn parse_segments(role: ChatRole, message_index: usize, content: &str) -> Vec<Segment> {
    if role == ChatRole::User {
        return vec![Segment::text(content)];
    }

    let mut segments = Vec::new();
    let mut last_end = 0;

    for caps in think_pattern().captures_iter(content) {
        let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
            continue;
        };

        if whole.start() > last_end {
            segments.push(Segment::text(&content[last_end..whole.start()]));
        }
        segments.push(Segment::thought(
            inner.as_str(),
            ThoughtId {
                message: message_index,
                offset: whole.start(),
            },
        ));
        last_end = whole.end();
    }

    if last_end < content.len() || segments.is_empty() {
        segments.push(Segment::text(&content[last_end..]));
    }

    segments
}

/// Convenience wrapper over [`parse_segments`] for a transcript entry.
pub fn segments_for(message_index: usize, message: &ChatMessage) -> Vec<Segment> {
    parse_segments(message.role, message_index, &message.content)
}

/// Memoized segment projection.
///
/// Keyed by message index, role and a hash of the content, so an entry can
/// never disagree with a fresh parse of the same message.
#[derive(Debug, Default)]
pub struct SegmentCache {
    entries: HashMap<(usize, ChatRole, u64), Vec<Segment>>,
}

impl SegmentCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn segments(&mut self, message_index: usize, message: &ChatMessage) -> &[Segment] {
        let mut hasher = DefaultHasher::new();
        message.content.hash(&mut hasher);
        let key = (message_index, message.role, hasher.finish());

        self.entries
            .entry(key)
            .or_insert_with(|| segments_for(message_index, message))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Open/closed flags for thought segments. Unknown ids are closed.
///
/// Entries are only ever added or flipped, never removed.
#[derive(Debug, Clone, Default)]
pub struct ThoughtOpenMap {
    open: HashMap<ThoughtId, bool>,
}

impl ThoughtOpenMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self, id: ThoughtId) -> bool {
        self.open.get(&id).copied().unwrap_or(false)
    }

    /// Flip a thought and return its new state.
    pub fn toggle(&mut self, id: ThoughtId) -> bool {
        let entry = self.open.entry(id).or_insert(false);
        *entry = !*entry;
        tracing::debug!(thought = %id, open = *entry, "toggled thought");
        *entry
    }

    pub fn set(&mut self, id: ThoughtId, open: bool) {
        self.open.insert(id, open);
    }

    pub fn len(&self) -> usize {
        self.open.len()
    }

    pub fn is_empty(&self) -> bool {
        self.open.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assistant(content: &str) -> Vec<Segment> {
        parse_segments(ChatRole::Assistant, 0, content)
    }

    fn strip_markers(content: &str) -> String {
        think_pattern().replace_all(content, "$1").into_owned()
    }

    fn joined(segments: &[Segment]) -> String {
        segments.iter().map(|s| s.content.as_str()).collect()
    }

    #[test]
    fn test_text_thought_text() {
        let segments = assistant("before<think>plan</think>after");
        assert_eq!(
            segments,
            vec![
                Segment::text("before"),
                Segment::thought("plan", ThoughtId { message: 0, offset: 6 }),
                Segment::text("after"),
            ]
        );
    }

    #[test]
    fn test_no_markers_is_single_text() {
        for input in ["", "plain answer", "multi\nline\n", "<thinking>not a marker</thinking>"] {
            assert_eq!(assistant(input), vec![Segment::text(input)]);
        }
    }

    #[test]
    fn test_user_messages_are_never_parsed() {
        let content = "look: <think>secret</think> done";
        let segments = parse_segments(ChatRole::User, 3, content);
        assert_eq!(segments, vec![Segment::text(content)]);
    }

    #[test]
    fn test_concatenation_drops_only_markers() {
        let inputs = [
            "before<think>plan</think>after",
            "<think>a</think><think>b</think>",
            "x<think></think>y",
            "<think>one\ntwo</think>\n\nanswer",
            "open <think>never closed",
            "a<think>b<think>c</think>d</think>e",
            " <think>ü</think> ok",
        ];
        for input in inputs {
            let segments = assistant(input);
            assert_eq!(joined(&segments), strip_markers(input), "input: {input:?}");
        }
    }

    #[test]
    fn test_empty_thought_is_kept() {
        let segments = assistant("x<think></think>y");
        assert_eq!(segments.len(), 3);
        assert!(segments[1].is_thought());
        assert_eq!(segments[1].content, "");
    }

    #[test]
    fn test_leading_and_trailing_thoughts_skip_empty_text() {
        let segments = assistant("<think>a</think><think>b</think>");
        let kinds: Vec<SegmentKind> = segments.iter().map(|s| s.kind).collect();
        assert_eq!(kinds, vec![SegmentKind::Thought, SegmentKind::Thought]);
        assert_eq!(segments[1].id, Some(ThoughtId { message: 0, offset: 16 }));
    }

    #[test]
    fn test_unterminated_open_marker_stays_text() {
        let segments = assistant("answer <think>half a thought");
        assert_eq!(segments, vec![Segment::text("answer <think>half a thought")]);
    }

    #[test]
    fn test_inner_open_marker_is_thought_content() {
        let segments = assistant("a<think>b<think>c</think>d</think>e");
        assert_eq!(
            segments,
            vec![
                Segment::text("a"),
                Segment::thought("b<think>c", ThoughtId { message: 0, offset: 1 }),
                Segment::text("d</think>e"),
            ]
        );
    }

    #[test]
    fn test_ids_are_stable_across_parses() {
        let content = "<think>x</think>mid<think>y</think>";
        let first = parse_segments(ChatRole::Assistant, 7, content);
        let second = parse_segments(ChatRole::Assistant, 7, content);
        assert_eq!(first, second);

        let ids: Vec<String> = first.iter().filter_map(|s| s.id).map(|id| id.to_string()).collect();
        assert_eq!(ids, vec!["7-0", "7-19"]);
    }

    #[test]
    fn test_cache_matches_fresh_parse() {
        let mut cache = SegmentCache::new();
        let message = ChatMessage::assistant("<think>plan</think>done");

        let cached = cache.segments(2, &message).to_vec();
        assert_eq!(cached, segments_for(2, &message));

        cache.segments(2, &message);
        assert_eq!(cache.len(), 1);

        let edited = ChatMessage::assistant("done");
        assert_eq!(cache.segments(2, &edited), segments_for(2, &edited).as_slice());
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_open_map_defaults_closed_and_toggles() {
        let mut map = ThoughtOpenMap::new();
        let id = ThoughtId { message: 1, offset: 0 };
        let other = ThoughtId { message: 1, offset: 40 };

        assert!(!map.is_open(id));
        assert!(map.toggle(id));
        assert!(map.is_open(id));
        assert!(!map.is_open(other));
        assert!(!map.toggle(id));
        assert_eq!(map.len(), 1);

        map.set(other, true);
        assert!(map.is_open(other));
        assert_eq!(map.len(), 2);
    }
}
