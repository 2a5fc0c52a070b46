use secrecy::SecretString;
use serde::{Deserialize, Deserializer, Serialize};

use super::repo_types::PublicUser;

fn secret<'de, D>(d: D) -> Result<SecretString, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(d).map(SecretString::from)
}

/// Email and plaintext password as sent by the client.
#[derive(Debug, Deserialize)]
pub struct Credentials {
    pub email: String,
    #[serde(deserialize_with = "secret")]
    pub password: SecretString,
}

/// Request body for sign-up.
#[derive(Debug, Deserialize)]
pub struct SignUpRequest {
    #[serde(flatten)]
    pub credentials: Credentials,
    #[serde(default)]
    pub gender: String,
    #[serde(default)]
    pub avatar: Option<String>,
}

/// Request body for sign-in.
#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    #[serde(flatten)]
    pub credentials: Credentials,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
}

/// Response returned after sign-up.
#[derive(Debug, Serialize)]
pub struct SignUpResponse {
    pub token: String,
    pub user: PublicUser,
}
