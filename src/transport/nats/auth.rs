//! Credential selection for the NATS connection
//!
//! Exactly one strategy is used, picked in a fixed order: token, then
//! username/password, then nkey seed (with or without a user JWT). Anything
//! else connects anonymously.

use crate::config::AuthConfig;
use async_nats::ConnectOptions;
use nkeys::KeyPair;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Authentication strategy, in precedence order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStrategy {
    Anonymous,
    Token,
    UserPassword,
    JwtAndSeed,
    Nkey,
}

impl AuthStrategy {
    /// Pick the strategy an auth section resolves to, without touching key material
    pub fn select(auth: Option<&AuthConfig>) -> Self {
        let Some(auth) = auth else {
            return AuthStrategy::Anonymous;
        };

        if auth.token.is_some() {
            AuthStrategy::Token
        } else if auth.username.is_some() && auth.password.is_some() {
            AuthStrategy::UserPassword
        } else if auth.nkey.is_some() {
            if auth.jwt.is_some() {
                AuthStrategy::JwtAndSeed
            } else {
                AuthStrategy::Nkey
            }
        } else {
            AuthStrategy::Anonymous
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AuthStrategy::Anonymous => "anonymous",
            AuthStrategy::Token => "token",
            AuthStrategy::UserPassword => "username/password",
            AuthStrategy::JwtAndSeed => "jwt",
            AuthStrategy::Nkey => "nkey",
        }
    }
}

impl fmt::Display for AuthStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised while turning credential material into connect options
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("could not derive key pair from seed: {0}")]
    SeedDerivation(String),
    #[error("unable to sign server nonce: {0}")]
    Signing(String),
}

/// Signs server nonces for raw nkey authentication.
///
/// The key pair is rebuilt from the seed for every nonce and dropped as soon
/// as the signature is produced, so no derived key outlives a handshake.
#[derive(Clone)]
pub struct NonceSigner {
    seed: Arc<str>,
}

impl NonceSigner {
    fn new(seed: &str) -> Self {
        Self {
            seed: Arc::from(seed),
        }
    }

    pub fn sign(&self, nonce: &[u8]) -> Result<Vec<u8>, AuthError> {
        let key_pair = KeyPair::from_seed(&self.seed)
            .map_err(|e| AuthError::SeedDerivation(e.to_string()))?;
        let signature = key_pair
            .sign(nonce)
            .map_err(|e| AuthError::Signing(e.to_string()));
        drop(key_pair);

        signature
    }
}

/// Resolved connection credentials
#[derive(Clone)]
pub enum Credentials {
    Anonymous,
    Token(String),
    UserPassword {
        username: String,
        password: String,
    },
    /// User JWT, with the seed used as signing key material by the client
    JwtAndSeed {
        jwt: String,
        seed: String,
    },
    /// Only the public key is sent; nonces go through the signer
    Nkey {
        public_key: String,
        signer: NonceSigner,
    },
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::Anonymous => f.write_str("Anonymous"),
            Credentials::Token(_) => f.write_str("Token(***)"),
            Credentials::UserPassword { username, .. } => f
                .debug_struct("UserPassword")
                .field("username", username)
                .finish_non_exhaustive(),
            Credentials::JwtAndSeed { .. } => f.write_str("JwtAndSeed(***)"),
            Credentials::Nkey { public_key, .. } => f
                .debug_struct("Nkey")
                .field("public_key", public_key)
                .finish_non_exhaustive(),
        }
    }
}

impl Credentials {
    /// Resolve an auth section into credentials.
    ///
    /// A malformed seed is an error; lower-precedence strategies are never
    /// tried in its place.
    pub fn resolve(auth: Option<&AuthConfig>) -> Result<Self, AuthError> {
        let Some(auth) = auth else {
            return Ok(Credentials::Anonymous);
        };

        if let Some(token) = &auth.token {
            debug!("Using token authentication");
            return Ok(Credentials::Token(token.clone()));
        }

        if let (Some(username), Some(password)) = (&auth.username, &auth.password) {
            debug!("Using username-password authentication");
            return Ok(Credentials::UserPassword {
                username: username.clone(),
                password: password.clone(),
            });
        }

        if let Some(seed) = &auth.nkey {
            let key_pair =
                KeyPair::from_seed(seed).map_err(|e| AuthError::SeedDerivation(e.to_string()))?;

            if let Some(jwt) = &auth.jwt {
                debug!("Using jwt authentication");
                return Ok(Credentials::JwtAndSeed {
                    jwt: jwt.clone(),
                    seed: seed.clone(),
                });
            }

            debug!("Using nkey authentication");
            return Ok(Credentials::Nkey {
                public_key: key_pair.public_key(),
                signer: NonceSigner::new(seed),
            });
        }

        Ok(Credentials::Anonymous)
    }

    pub fn strategy(&self) -> AuthStrategy {
        match self {
            Credentials::Anonymous => AuthStrategy::Anonymous,
            Credentials::Token(_) => AuthStrategy::Token,
            Credentials::UserPassword { .. } => AuthStrategy::UserPassword,
            Credentials::JwtAndSeed { .. } => AuthStrategy::JwtAndSeed,
            Credentials::Nkey { .. } => AuthStrategy::Nkey,
        }
    }

    /// Build the client options carrying these credentials
    pub fn into_connect_options(self) -> Result<ConnectOptions, AuthError> {
        let options = match self {
            Credentials::Anonymous => ConnectOptions::new(),
            Credentials::Token(token) => ConnectOptions::new().token(token),
            Credentials::UserPassword { username, password } => {
                ConnectOptions::new().user_and_password(username, password)
            }
            Credentials::JwtAndSeed { jwt, seed } => {
                let key_pair = Arc::new(
                    KeyPair::from_seed(&seed)
                        .map_err(|e| AuthError::SeedDerivation(e.to_string()))?,
                );
                ConnectOptions::new().jwt(jwt, move |nonce| {
                    let key_pair = key_pair.clone();
                    async move { key_pair.sign(&nonce).map_err(async_nats::AuthError::new) }
                })
            }
            Credentials::Nkey { public_key, signer } => {
                ConnectOptions::with_auth_callback(move |nonce| {
                    let public_key = public_key.clone();
                    let signer = signer.clone();
                    async move {
                        let signature = signer.sign(&nonce).map_err(async_nats::AuthError::new)?;
                        let mut auth = async_nats::Auth::new();
                        auth.nkey = Some(public_key);
                        auth.signature = Some(signature);
                        Ok(auth)
                    }
                })
            }
        };

        Ok(options)
    }
}
