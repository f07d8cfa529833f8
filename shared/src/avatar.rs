/// Deterministic avatar slot via CRC32 hash of the visitor name.
/// The same name always lands on the same avatar, whatever the roster order.
pub fn avatar_index(name: &str, avatar_count: usize) -> usize {
    if avatar_count == 0 {
        return 0;
    }
    crc32fast::hash(name.as_bytes()) as usize % avatar_count
}

/// Up to two uppercase initials for a display name ("ada lovelace" -> "AL").
pub fn initials(name: &str) -> String {
    let mut out: String = name
        .split_whitespace()
        .filter_map(|part| part.chars().next())
        .take(2)
        .flat_map(char::to_uppercase)
        .collect();
    if out.is_empty() {
        out.push('?');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn avatar_index_is_stable_per_name() {
        let a = avatar_index("Ada", 6);
        assert_eq!(a, avatar_index("Ada", 6));
        assert!(a < 6);
    }

    #[test]
    fn avatar_index_handles_empty_pool() {
        assert_eq!(avatar_index("Ada", 0), 0);
    }

    #[test]
    fn initials_take_first_two_words() {
        assert_eq!(initials("ada lovelace byron"), "AL");
        assert_eq!(initials("Kenji"), "K");
        assert_eq!(initials("   "), "?");
    }
}
