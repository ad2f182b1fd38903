//! VAPID key generation command.
//!
//! ```bash
//! habit-push keygen
//! # {"publicKey": "BN...", "privateKey": "q2..."}
//! ```
//!
//! The public key goes to the web app as `applicationServerKey`; both go
//! to the sender as `VAPID_PUBLIC_KEY` / `VAPID_PRIVATE_KEY`.

use anyhow::Result;

use crate::notifications::VapidKeys;

/// Generates a fresh key pair and returns it as pretty JSON.
pub fn render() -> Result<String> {
    Ok(serde_json::to_string_pretty(&VapidKeys::generate().export())?)
}

/// Prints a fresh key pair to stdout.
pub fn run() -> Result<()> {
    println!("{}", render()?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rendered_keys_load_back() {
        let json: serde_json::Value = serde_json::from_str(&render().unwrap()).unwrap();
        let public = json["publicKey"].as_str().unwrap();
        let private = json["privateKey"].as_str().unwrap();

        let keys = VapidKeys::from_base64url(public, private).unwrap();
        assert_eq!(keys.public_key_base64url(), public);
    }
}
