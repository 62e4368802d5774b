use serde::{Deserialize, Serialize};

use crate::{AuthResponse, User};

/// Client-held record of who is signed in.
///
/// There is no expiry and no refresh: the session lasts until `sign_out`
/// or until the client throws it away.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    current: Option<SignedIn>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct SignedIn {
    token: String,
    user: User,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces whoever was signed in with the result of a login or signup.
    pub fn sign_in(&mut self, auth: AuthResponse) {
        self.current = Some(SignedIn {
            token: auth.token,
            user: auth.user,
        });
    }

    pub fn sign_out(&mut self) {
        self.current = None;
    }

    pub fn user(&self) -> Option<&User> {
        self.current.as_ref().map(|s| &s.user)
    }

    pub fn token(&self) -> Option<&str> {
        self.current.as_ref().map(|s| s.token.as_str())
    }

    pub fn is_signed_in(&self) -> bool {
        self.current.is_some()
    }

    /// `Authorization` header value for requests made on behalf of the user.
    pub fn bearer(&self) -> Option<String> {
        self.token().map(|t| format!("Bearer {t}"))
    }
}
