use crate::Error;
use base64::{Engine, engine::general_purpose::STANDARD as B64};
use http::{HeaderMap, HeaderValue, header::AUTHORIZATION};
use std::fmt;

/// A credential that never shows up in `Debug`/`Display` output.
#[derive(Clone, Default, Eq, PartialEq)]
pub struct SecretString(String);

impl SecretString {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<redacted>")
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<redacted>")
    }
}

/// How requests authenticate against the controller.
///
/// Jenkins accepts either a password or an API token as the basic-auth
/// secret; the token is preferred since it is not affected by SSO.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub enum Auth {
    Basic { user: String, secret: SecretString },
    Bearer { token: SecretString },
}

impl Auth {
    #[must_use]
    pub fn basic(user: impl Into<String>, secret: impl Into<String>) -> Self {
        Self::Basic {
            user: user.into(),
            secret: SecretString::new(secret),
        }
    }

    #[must_use]
    pub fn bearer(token: impl Into<String>) -> Self {
        Self::Bearer {
            token: SecretString::new(token),
        }
    }

    pub(crate) fn secret(&self) -> &str {
        match self {
            Self::Basic { secret, .. } => secret.expose(),
            Self::Bearer { token } => token.expose(),
        }
    }

    fn header_value(&self) -> Result<HeaderValue, Error> {
        let raw = match self {
            Self::Basic { user, secret } => {
                format!("Basic {}", B64.encode(format!("{user}:{}", secret.expose())))
            }
            Self::Bearer { token } => format!("Bearer {}", token.expose()),
        };
        let mut value = HeaderValue::from_str(&raw).map_err(|err| Error::InvalidConfig {
            message: "invalid Authorization header value".into(),
            source: Some(Box::new(err)),
        })?;
        value.set_sensitive(true);
        Ok(value)
    }

    pub(crate) fn apply(&self, headers: &mut HeaderMap) -> Result<(), Error> {
        headers.insert(AUTHORIZATION, self.header_value()?);
        Ok(())
    }
}
