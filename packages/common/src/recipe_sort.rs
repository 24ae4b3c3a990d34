use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Column a recipe listing can be ordered by.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RecipeSortField {
    #[default]
    CreatedAt,
    Name,
    AverageRating,
    TimeToMake,
}

impl RecipeSortField {
    pub const ALL: &'static [RecipeSortField] = &[
        Self::CreatedAt,
        Self::Name,
        Self::AverageRating,
        Self::TimeToMake,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreatedAt => "created_at",
            Self::Name => "name",
            Self::AverageRating => "average_rating",
            Self::TimeToMake => "time_to_make",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// Error when parsing an unknown sort field or order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseSortError {
    invalid: String,
    expected: &'static str,
}

impl fmt::Display for ParseSortError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' is not one of: {}", self.invalid, self.expected)
    }
}

impl std::error::Error for ParseSortError {}

impl FromStr for RecipeSortField {
    type Err = ParseSortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|field| field.as_str() == s)
            .ok_or_else(|| ParseSortError {
                invalid: s.to_string(),
                expected: "created_at, name, average_rating, time_to_make",
            })
    }
}

impl FromStr for SortOrder {
    type Err = ParseSortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            _ => Err(ParseSortError {
                invalid: s.to_string(),
                expected: "asc, desc",
            }),
        }
    }
}

impl fmt::Display for RecipeSortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
