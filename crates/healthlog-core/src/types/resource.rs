//! Domain collections exposed by the backend.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, InvalidInputError};

/// A REST collection on the backend.
///
/// The client treats every collection as an opaque JSON pass-through; this
/// enum only fixes the path each one lives under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Days,
    Meals,
    Exercises,
    WaterIntakes,
    Sleep,
    Moods,
    Notes,
    Agents,
}

impl Resource {
    pub const ALL: [Resource; 8] = [
        Resource::Days,
        Resource::Meals,
        Resource::Exercises,
        Resource::WaterIntakes,
        Resource::Sleep,
        Resource::Moods,
        Resource::Notes,
        Resource::Agents,
    ];

    /// The name used on the command line and in path segments.
    pub fn name(self) -> &'static str {
        match self {
            Resource::Days => "days",
            Resource::Meals => "meals",
            Resource::Exercises => "exercises",
            Resource::WaterIntakes => "water-intakes",
            Resource::Sleep => "sleep",
            Resource::Moods => "moods",
            Resource::Notes => "notes",
            Resource::Agents => "agents",
        }
    }

    /// The collection path, e.g. `/water-intakes`.
    pub fn path(self) -> String {
        format!("/{}", self.name())
    }

    /// The path of a single item in the collection.
    ///
    /// # Errors
    ///
    /// Returns an error if `id` is not one plain path segment.
    pub fn item_path(self, id: &str) -> Result<String, Error> {
        validate_item_id(id)?;
        Ok(format!("/{}/{}", self.name(), id))
    }
}

/// Item ids are limited to unreserved URL characters and may not be a
/// dot segment, so they can never leave the collection's path.
fn validate_item_id(id: &str) -> Result<(), Error> {
    let reject = |reason: String| -> Result<(), Error> {
        Err(InvalidInputError::ItemId {
            value: id.to_string(),
            reason,
        }
        .into())
    };

    if id.is_empty() {
        return reject("cannot be empty".to_string());
    }

    if id == "." || id == ".." {
        return reject("cannot be '.' or '..'".to_string());
    }

    if let Some(c) = id
        .chars()
        .find(|&c| !c.is_ascii_alphanumeric() && !matches!(c, '.' | '-' | '_' | '~'))
    {
        return reject(format!("contains invalid character '{}'", c));
    }

    Ok(())
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Resource {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().trim_matches('/').to_ascii_lowercase().replace('_', "-");
        Resource::ALL
            .into_iter()
            .find(|r| r.name() == wanted)
            .ok_or_else(|| {
                InvalidInputError::Resource {
                    value: s.to_string(),
                }
                .into()
            })
    }
}
