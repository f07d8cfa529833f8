use std::collections::HashSet;

use osiris_shared::{
    Coordinate, PresenceStatus, RosterEntry, avatar_index, initials, last_seen_label,
};

use crate::config::AVATARS;

/// Render-ready view of one roster record.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct DisplayTile {
    pub id: i64,
    pub name: String,
    pub ip: String,
    pub avatar: &'static str,
    pub initials: String,
    pub status: PresenceStatus,
    pub coordinate: Option<Coordinate>,
    pub last_seen: i64,
    pub last_seen_label: String,
    /// Name was absent from the previous poll; drives the entrance animation.
    pub is_new: bool,
}

impl DisplayTile {
    pub(crate) fn place_label(&self) -> Option<String> {
        self.coordinate.as_ref().and_then(Coordinate::place_label)
    }
}

#[derive(Debug, Default)]
pub(crate) struct RosterViewModel {
    seen: HashSet<String>,
}

impl RosterViewModel {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// One tile per entry, in input order. The remembered name set is replaced by this call's names.
    pub(crate) fn to_tiles(&mut self, entries: &[RosterEntry], now_ms: i64) -> Vec<DisplayTile> {
        let tiles = entries
            .iter()
            .map(|entry| DisplayTile {
                id: entry.id,
                name: entry.name.clone(),
                ip: entry.ip.clone(),
                avatar: AVATARS[avatar_index(&entry.name, AVATARS.len())],
                initials: initials(&entry.name),
                status: PresenceStatus::derive(entry.last_seen, now_ms),
                coordinate: entry.coordinate(),
                last_seen: entry.last_seen,
                last_seen_label: last_seen_label(entry.last_seen, now_ms),
                is_new: !self.seen.contains(&entry.name),
            })
            .collect();
        self.seen = entries.iter().map(|entry| entry.name.clone()).collect();
        tiles
    }
}

pub(crate) fn count_label(count: usize) -> String {
    if count == 1 {
        "1 user worldwide".to_string()
    } else {
        format!("{count} users worldwide")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_760_000_000_000;

    fn entry(name: &str, last_seen: i64) -> RosterEntry {
        RosterEntry {
            id: 0,
            ip: String::new(),
            name: name.to_string(),
            lat: Some(48.85),
            lng: Some(2.35),
            city: Some("Paris".to_string()),
            country: None,
            last_seen,
        }
    }

    #[test]
    fn tiles_follow_input_order_with_derived_status() {
        let mut model = RosterViewModel::new();
        let entries = vec![entry("A", NOW - 5_000), entry("B", NOW - 90_000_000)];
        let tiles = model.to_tiles(&entries, NOW);

        let summary: Vec<(&str, PresenceStatus)> =
            tiles.iter().map(|t| (t.name.as_str(), t.status)).collect();
        assert_eq!(
            summary,
            vec![("A", PresenceStatus::Connected), ("B", PresenceStatus::Offline)]
        );
        assert_eq!(count_label(tiles.len()), "2 users worldwide");
        assert_eq!(tiles[0].place_label().as_deref(), Some("Paris"));
    }

    #[test]
    fn identical_name_set_is_never_new_on_second_call() {
        let mut model = RosterViewModel::new();
        let entries = vec![entry("A", NOW), entry("B", NOW - 120_000)];
        assert!(model.to_tiles(&entries, NOW).iter().all(|t| t.is_new));

        let mut reordered = entries.clone();
        reordered.reverse();
        assert!(model.to_tiles(&reordered, NOW + 5_000).iter().all(|t| !t.is_new));
    }

    #[test]
    fn seen_set_is_replaced_not_merged() {
        let mut model = RosterViewModel::new();
        model.to_tiles(&[entry("A", NOW)], NOW);
        model.to_tiles(&[entry("B", NOW)], NOW);
        let tiles = model.to_tiles(&[entry("A", NOW), entry("B", NOW)], NOW);
        assert!(tiles[0].is_new, "A dropped out of the previous poll");
        assert!(!tiles[1].is_new);
    }

    #[test]
    fn avatar_depends_on_name_not_position() {
        let mut model = RosterViewModel::new();
        let first = model.to_tiles(&[entry("Ada", NOW), entry("Bo", NOW)], NOW);
        let second = model.to_tiles(&[entry("Bo", NOW), entry("Ada", NOW)], NOW);
        assert_eq!(first[0].avatar, second[1].avatar);
        assert_eq!(first[1].avatar, second[0].avatar);
        assert_eq!(first[0].initials, "A");
    }

    #[test]
    fn count_label_is_singular_for_one() {
        assert_eq!(count_label(1), "1 user worldwide");
        assert_eq!(count_label(0), "0 users worldwide");
    }
}
