//! Passphrase prompts. Passphrases are never accepted as arguments.

use anyhow::Context;
use dialoguer::Password;
use secrecy::SecretString;

/// Prompt for an existing passphrase.
pub fn passphrase(label: &str) -> anyhow::Result<SecretString> {
    let value = Password::new()
        .with_prompt(label)
        .interact()
        .context("Failed to read passphrase")?;
    Ok(SecretString::from(value))
}

/// Prompt for a new passphrase, with confirmation.
pub fn new_passphrase(label: &str) -> anyhow::Result<SecretString> {
    let value = Password::new()
        .with_prompt(label)
        .with_confirmation("Confirm passphrase", "Passphrases do not match")
        .interact()
        .context("Failed to read passphrase")?;
    Ok(SecretString::from(value))
}
