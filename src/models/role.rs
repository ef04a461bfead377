use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Closed set of capabilities a principal may carry. The identity gateway
/// hands us one of these; authorization matches on it exhaustively instead
/// of comparing role strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Audience,
    Artist,
    Owner,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Audience => "audience",
            Role::Artist => "artist",
            Role::Owner => "owner",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "audience" => Ok(Role::Audience),
            "artist" => Ok(Role::Artist),
            "owner" => Ok(Role::Owner),
            _ => Err(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_roles() {
        assert_eq!("audience".parse(), Ok(Role::Audience));
        assert_eq!("artist".parse(), Ok(Role::Artist));
        assert_eq!("owner".parse(), Ok(Role::Owner));
    }

    #[test]
    fn rejects_unknown_roles() {
        assert_eq!("admin".parse::<Role>(), Err(()));
        assert_eq!("Artist".parse::<Role>(), Err(()));
        assert_eq!("".parse::<Role>(), Err(()));
    }
}
