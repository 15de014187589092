use serde::{Deserialize, Serialize};

/// What a user told us about themselves before (or while) travelling.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    #[serde(default)]
    pub likes: Vec<String>,
    #[serde(default)]
    pub dislikes: Vec<String>,
    /// Opening remark sent to a proposed companion
    #[serde(default)]
    pub hi: String,
}

impl UserProfile {
    /// A profile with nothing declared, used when a user connects without submitting one.
    pub fn anonymous(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// Strips the surrounding newlines and then spaces from the greeting.
    pub fn normalized(mut self) -> Self {
        self.hi = self.hi.trim_matches('\n').trim_matches(' ').to_string();
        self
    }

    /// The greeting, if one was declared.
    pub fn greeting(&self) -> Option<&str> {
        if self.hi.is_empty() { None } else { Some(self.hi.as_str()) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_submission() {
        let profile: UserProfile = serde_json::from_str(
            r#"{"id":"u1","likes":["art","music"],"dislikes":["smoking"],"hi":"\n  hello there \n"}"#,
        )
        .unwrap();
        let profile = profile.normalized();

        assert_eq!(profile.likes, vec!["art", "music"]);
        assert_eq!(profile.dislikes, vec!["smoking"]);
        assert_eq!(profile.greeting(), Some("hello there"));
    }

    #[test]
    fn test_missing_fields_default() {
        let profile: UserProfile = serde_json::from_str(r#"{"id":"u1"}"#).unwrap();
        assert!(profile.likes.is_empty());
        assert_eq!(profile.greeting(), None);
    }
}
