//! Duplicate-delivery filter

use crate::config::DedupConfig;
use crate::message::InboundMessage;
use std::collections::{HashSet, VecDeque};
use tracing::debug;

const AUDIO_PREFIX: &str = "audio:";
const TEXT_PREFIX: &str = "text:";

/// Bounded window of recently seen message identities
#[derive(Debug, Clone)]
pub struct DedupFilter {
    order: VecDeque<String>,
    seen: HashSet<String>,
    capacity: usize,
    retain: usize,
}

impl Default for DedupFilter {
    fn default() -> Self {
        Self::new(&DedupConfig::default())
    }
}

impl DedupFilter {
    pub fn new(config: &DedupConfig) -> Self {
        Self {
            order: VecDeque::new(),
            seen: HashSet::new(),
            capacity: config.capacity,
            retain: config.retain.min(config.capacity),
        }
    }

    /// `true` the first time an identity is seen, `false` for repeats.
    /// Repeats are not re-recorded.
    pub fn should_process(&mut self, identity: &str) -> bool {
        if self.seen.contains(identity) {
            debug!("Dropping duplicate message {}", identity);
            return false;
        }

        self.order.push_back(identity.to_string());
        self.seen.insert(identity.to_string());

        if self.order.len() > self.capacity {
            let excess = self.order.len() - self.retain;
            for old in self.order.drain(..excess) {
                self.seen.remove(&old);
            }
            debug!("Dedup window collapsed to {} entries", self.order.len());
        }
        true
    }

    /// Forget identities derived from audio so a re-synthesized utterance
    /// can play again. Text identities are kept.
    pub fn clear_audio_identities(&mut self) -> usize {
        let before = self.order.len();
        let seen = &mut self.seen;
        self.order.retain(|identity| {
            let keep = !identity.starts_with(AUDIO_PREFIX);
            if !keep {
                seen.remove(identity);
            }
            keep
        });
        before - self.order.len()
    }

    pub fn contains(&self, identity: &str) -> bool {
        self.seen.contains(identity)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.seen.clear();
    }
}

/// Identity for an inbound message, in priority order: timestamp plus a
/// text excerpt, a prefix of the audio payload, then the display text.
/// `None` when the message carries nothing identifying.
pub fn derive_identity(message: &InboundMessage, config: &DedupConfig) -> Option<String> {
    let text = message
        .display_text
        .as_ref()
        .map(|d| d.text.as_str())
        .filter(|t| !t.is_empty());
    let audio = message.audio.as_deref().filter(|a| !a.is_empty());
    let prefix = if audio.is_some() { AUDIO_PREFIX } else { TEXT_PREFIX };

    if let (Some(timestamp), Some(text)) = (message.timestamp, text) {
        let excerpt: String = text.chars().take(config.text_excerpt_len).collect();
        return Some(format!("{}{}_{}", prefix, timestamp, excerpt));
    }
    if let Some(audio) = audio {
        let head: String = audio.chars().take(config.payload_prefix_len).collect();
        return Some(format!("{}{}", AUDIO_PREFIX, head));
    }
    text.map(|text| format!("{}{}", TEXT_PREFIX, text))
}
