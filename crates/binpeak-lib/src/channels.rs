use std::collections::BTreeMap;

use crate::signal::{Channel, ValueRange};

/// Decoded channels keyed by file name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChannelSet {
    channels: BTreeMap<String, Channel>,
}

impl ChannelSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a channel, replacing any earlier one with the same name.
    pub fn insert(&mut self, channel: Channel) -> Option<Channel> {
        self.channels.insert(channel.name.clone(), channel)
    }

    pub fn get(&self, name: &str) -> Option<&Channel> {
        self.channels.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.channels.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Channels ordered by lowercased name, ties broken by exact name.
    pub fn sorted(&self) -> Vec<&Channel> {
        let mut out: Vec<&Channel> = self.channels.values().collect();
        out.sort_by(|a, b| {
            a.name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then_with(|| a.name.cmp(&b.name))
        });
        out
    }

    pub fn names(&self) -> Vec<&str> {
        self.sorted().into_iter().map(|c| c.name.as_str()).collect()
    }

    /// Min/max over every non-empty channel.
    pub fn value_range(&self) -> Option<ValueRange> {
        self.channels
            .values()
            .filter_map(|c| {
                Some(ValueRange {
                    min: c.samples.min()?,
                    max: c.samples.max()?,
                })
            })
            .reduce(ValueRange::merge)
    }
}

impl FromIterator<Channel> for ChannelSet {
    fn from_iter<I: IntoIterator<Item = Channel>>(iter: I) -> Self {
        let mut set = ChannelSet::new();
        for channel in iter {
            set.insert(channel);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::Samples;

    fn set() -> ChannelSet {
        [
            Channel::new("beta.bin", Samples::U16(vec![4, 10])),
            Channel::new("Alpha.bin", Samples::U16(vec![2, 3])),
            Channel::new("samples.bin", Samples::U32(vec![100_000, 7])),
            Channel::new("empty.bin", Samples::U16(Vec::new())),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn sorts_case_insensitively() {
        assert_eq!(
            set().names(),
            vec!["Alpha.bin", "beta.bin", "empty.bin", "samples.bin"]
        );
    }

    #[test]
    fn value_range_folds_all_channels() {
        let range = set().value_range().expect("range");
        assert_eq!(range.min, 2.0);
        assert_eq!(range.max, 100_000.0);
        assert!(ChannelSet::new().value_range().is_none());
    }

    #[test]
    fn insert_replaces_same_name() {
        let mut s = set();
        let old = s.insert(Channel::new("beta.bin", Samples::U16(vec![1])));
        assert!(old.is_some());
        assert_eq!(s.len(), 4);
        assert_eq!(s.get("beta.bin").map(|c| c.len()), Some(1));
    }
}
