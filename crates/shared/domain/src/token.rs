//! Access token generation.

use rand::{distributions::Alphanumeric, Rng};

use crate::constants::ACCESS_TOKEN_LENGTH;

/// Generate a random alphanumeric API access token for a new account.
pub fn generate_access_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(ACCESS_TOKEN_LENGTH)
        .map(char::from)
        .collect()
}
