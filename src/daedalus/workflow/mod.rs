// SPDX-License-Identifier: MIT

pub mod builder;
pub mod checkpoint;
pub mod graph;
pub mod loader;
pub mod nodes;
pub mod prompts;
pub mod state;
pub mod types;

#[cfg(test)]
mod testing;

/// Session ids double as file names, so only `[A-Za-z0-9_-]` is accepted
pub fn is_valid_session_id(session_id: &str) -> bool {
    !session_id.is_empty()
        && session_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_id_alphabet() {
        assert!(is_valid_session_id("alpha-1_B"));
        assert!(is_valid_session_id("6f1c2e0a-8d2b-4c39-9a51-0f3b7e2d9c11"));
        assert!(!is_valid_session_id(""));
        assert!(!is_valid_session_id("../etc"));
        assert!(!is_valid_session_id("a b"));
    }
}
