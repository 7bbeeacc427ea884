//! Collaborator boundaries: user identity and character metadata.
//!
//! Both collaborators are **display-only**. They decorate responses and
//! drive name-based browsing filters; validation and settlement never
//! consult them. Authentication has already resolved every request to a
//! verified [`UserId`](crate::UserId) before the core is invoked.

use serde::{Deserialize, Serialize};

use crate::{CharacterId, UserId};

/// Display metadata for a character, sourced from the external catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterProfile {
    pub character_id: CharacterId,
    pub display_name: String,
    /// Portrait location, opaque to the engine.
    pub portrait_url: String,
}

/// Resolves user ids to display names for browsing filters and response
/// decoration.
pub trait UserDirectory: Send + Sync {
    /// The user's display name, if known to the directory.
    fn display_name(&self, user_id: UserId) -> Option<String>;
}

/// Read-only character-metadata lookup.
pub trait CharacterCatalog: Send + Sync {
    /// Display metadata for a character, if the catalog knows it.
    fn character_profile(&self, character_id: CharacterId) -> Option<CharacterProfile>;
}

/// In-memory collaborator stubs for tests and demos.
#[cfg(any(test, feature = "test-helpers"))]
pub mod stubs {
    use std::collections::HashMap;

    use super::{CharacterCatalog, CharacterProfile, UserDirectory};
    use crate::{CharacterId, UserId};

    /// Fixed user → name mapping.
    #[derive(Debug, Default)]
    pub struct StaticDirectory {
        names: HashMap<UserId, String>,
    }

    impl StaticDirectory {
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        pub fn insert(&mut self, user_id: UserId, name: impl Into<String>) {
            self.names.insert(user_id, name.into());
        }
    }

    impl UserDirectory for StaticDirectory {
        fn display_name(&self, user_id: UserId) -> Option<String> {
            self.names.get(&user_id).cloned()
        }
    }

    /// Fixed character → profile mapping.
    #[derive(Debug, Default)]
    pub struct StaticCatalog {
        profiles: HashMap<CharacterId, CharacterProfile>,
    }

    impl StaticCatalog {
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        pub fn insert(&mut self, character_id: CharacterId, display_name: impl Into<String>) {
            self.profiles.insert(
                character_id,
                CharacterProfile {
                    character_id,
                    display_name: display_name.into(),
                    portrait_url: String::new(),
                },
            );
        }
    }

    impl CharacterCatalog for StaticCatalog {
        fn character_profile(&self, character_id: CharacterId) -> Option<CharacterProfile> {
            self.profiles.get(&character_id).cloned()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::stubs::{StaticCatalog, StaticDirectory};
    use super::*;

    #[test]
    fn static_directory_lookup() {
        let mut dir = StaticDirectory::new();
        let user = UserId::new();
        dir.insert(user, "ash");
        assert_eq!(dir.display_name(user), Some("ash".to_string()));
        assert_eq!(dir.display_name(UserId::new()), None);
    }

    #[test]
    fn static_catalog_lookup() {
        let mut catalog = StaticCatalog::new();
        catalog.insert(CharacterId(10), "Crimson Knight");
        let profile = catalog.character_profile(CharacterId(10)).unwrap();
        assert_eq!(profile.display_name, "Crimson Knight");
        assert!(catalog.character_profile(CharacterId(99)).is_none());
    }
}
