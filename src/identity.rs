use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    #[error("{0} is required")]
    EmptyField(&'static str),
}

/// Who is logged in. Both fields are captured verbatim from the login form;
/// no case or whitespace normalization is applied, so names that differ only
/// in case map to different verb lists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserSession {
    username: String,
    class_name: String,
}

impl UserSession {
    pub fn new(
        username: impl Into<String>,
        class_name: impl Into<String>,
    ) -> Result<Self, IdentityError> {
        let username = username.into();
        let class_name = class_name.into();

        if username.is_empty() {
            return Err(IdentityError::EmptyField("username"));
        }
        if class_name.is_empty() {
            return Err(IdentityError::EmptyField("class name"));
        }

        Ok(Self {
            username,
            class_name,
        })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// Partition key for this user's document in the store. Plain
    /// concatenation, kept for compatibility with documents written by
    /// existing clients; distinct (class, user) pairs that concatenate to
    /// the same string share a list.
    pub fn storage_key(&self) -> String {
        format!("{}_{}", self.class_name, self.username)
    }
}
