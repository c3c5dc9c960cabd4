use std::fmt;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpriteKeyError {
    #[error("sprite key must not be empty")]
    Empty,
    #[error("sprite key must not start with '/'")]
    LeadingSlash,
    #[error("sprite key must not contain '\\\\'")]
    Backslash,
    #[error("sprite key must not contain '..'")]
    ParentTraversal,
    #[error("sprite key contains invalid character '{character}'")]
    InvalidCharacter { character: char },
    #[error("sprite key '{key}' must have the form <category>/<name>")]
    MissingCategory { key: String },
    #[error("unknown asset category '{category}'")]
    UnknownCategory { category: String },
}

/// Top-level asset folder a sprite lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AssetCategory {
    Tiles,
    Player,
    Animal,
    Props,
}

impl AssetCategory {
    pub const ALL: [AssetCategory; 4] = [
        AssetCategory::Tiles,
        AssetCategory::Player,
        AssetCategory::Animal,
        AssetCategory::Props,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            AssetCategory::Tiles => "tiles",
            AssetCategory::Player => "player",
            AssetCategory::Animal => "animal",
            AssetCategory::Props => "props",
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|category| category.as_str() == raw)
    }
}

/// Validated logical asset name, `<category>/<name>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpriteKey {
    category: AssetCategory,
    name: String,
}

impl SpriteKey {
    pub fn new(category: AssetCategory, name: &str) -> Result<Self, SpriteKeyError> {
        validate_sprite_key(name)?;
        Ok(Self {
            category,
            name: name.to_string(),
        })
    }

    /// For names the engine composes itself from fixed lowercase tokens.
    pub(crate) fn builtin(category: AssetCategory, name: String) -> Self {
        debug_assert!(validate_sprite_key(&name).is_ok(), "bad builtin name {name}");
        Self { category, name }
    }

    pub fn parse(key: &str) -> Result<Self, SpriteKeyError> {
        validate_sprite_key(key)?;
        let Some((category, name)) = key.split_once('/') else {
            return Err(SpriteKeyError::MissingCategory {
                key: key.to_string(),
            });
        };
        if name.is_empty() {
            return Err(SpriteKeyError::MissingCategory {
                key: key.to_string(),
            });
        }
        let category =
            AssetCategory::parse(category).ok_or_else(|| SpriteKeyError::UnknownCategory {
                category: category.to_string(),
            })?;
        Ok(Self {
            category,
            name: name.to_string(),
        })
    }

    pub fn category(&self) -> AssetCategory {
        self.category
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for SpriteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.category.as_str(), self.name)
    }
}

pub(crate) fn validate_sprite_key(key: &str) -> Result<(), SpriteKeyError> {
    if key.is_empty() {
        return Err(SpriteKeyError::Empty);
    }
    if key.starts_with('/') {
        return Err(SpriteKeyError::LeadingSlash);
    }
    if key.contains('\\') {
        return Err(SpriteKeyError::Backslash);
    }
    if key.contains("..") {
        return Err(SpriteKeyError::ParentTraversal);
    }
    for ch in key.chars() {
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() || matches!(ch, '_' | '/' | '-') {
            continue;
        }
        return Err(SpriteKeyError::InvalidCharacter { character: ch });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_valid_names() {
        for key in ["grass", "walk_south", "berry_bush", "a-b/c_d"] {
            assert!(validate_sprite_key(key).is_ok(), "key={key}");
        }
    }

    #[test]
    fn rejects_invalid_names() {
        for key in ["", "/a", "..", "a/../b", r"a\b", "A", "a.b"] {
            assert!(validate_sprite_key(key).is_err(), "key={key}");
        }
    }

    #[test]
    fn parse_splits_category_and_name() {
        let key = SpriteKey::parse("player/walk_north").expect("key");
        assert_eq!(key.category(), AssetCategory::Player);
        assert_eq!(key.name(), "walk_north");
        assert_eq!(key.to_string(), "player/walk_north");
    }

    #[test]
    fn parse_rejects_unknown_or_missing_category() {
        assert_eq!(
            SpriteKey::parse("grass"),
            Err(SpriteKeyError::MissingCategory {
                key: "grass".to_string()
            })
        );
        assert_eq!(
            SpriteKey::parse("tiles/"),
            Err(SpriteKeyError::MissingCategory {
                key: "tiles/".to_string()
            })
        );
        assert_eq!(
            SpriteKey::parse("ui/cursor"),
            Err(SpriteKeyError::UnknownCategory {
                category: "ui".to_string()
            })
        );
    }

    #[test]
    fn new_validates_name() {
        assert!(SpriteKey::new(AssetCategory::Tiles, "Water").is_err());
        let key = SpriteKey::new(AssetCategory::Props, "tree").expect("key");
        assert_eq!(key.to_string(), "props/tree");
    }
}
