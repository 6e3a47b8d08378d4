//! HTTP basic authentication.

use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::{RequestInterceptor, RequestTemplate};

const AUTHORIZATION: &str = "Authorization";

/// Username/password pair. The password never appears in `Debug` output.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BasicAuth {
    username: String,
    password: String,
}

impl BasicAuth {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicAuth")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Sets `Authorization: Basic <base64(username:password)>` on every request.
///
/// The credential is encoded as UTF-8 once, at construction. The header is
/// set rather than appended, so applying the interceptor twice is harmless.
#[derive(Clone, PartialEq, Eq)]
pub struct BasicAuthInterceptor {
    header_value: String,
}

impl BasicAuthInterceptor {
    pub fn new(credential: &BasicAuth) -> Self {
        let token = STANDARD.encode(format!("{}:{}", credential.username, credential.password));
        Self {
            header_value: format!("Basic {token}"),
        }
    }
}

impl fmt::Debug for BasicAuthInterceptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicAuthInterceptor").finish_non_exhaustive()
    }
}

impl From<&BasicAuth> for BasicAuthInterceptor {
    fn from(credential: &BasicAuth) -> Self {
        Self::new(credential)
    }
}

impl RequestInterceptor for BasicAuthInterceptor {
    fn apply(&self, template: &mut RequestTemplate) {
        template.set_header(AUTHORIZATION, self.header_value.clone());
    }
}
