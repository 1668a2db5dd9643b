//! Master-passphrase commands: init, unlock, logout, change-passphrase.

use keepsake_core::auth::{AuthGate, AuthResponse};
use keepsake_core::{JsonFileStore, KeepsakeError};
use secrecy::ExposeSecret;

use crate::cli::{ChangePassphraseArgs, InitArgs, UnlockArgs};
use crate::prompt;

pub fn init(gate: &AuthGate<JsonFileStore>, args: &InitArgs) -> anyhow::Result<()> {
    if gate.is_configured()? {
        anyhow::bail!("A master passphrase is already configured; use change-passphrase");
    }

    let passphrase = prompt::new_passphrase("Master passphrase")?;
    gate.set_passphrase(passphrase.expose_secret(), args.hint.as_deref())?;
    println!("Master passphrase configured.");
    Ok(())
}

pub fn unlock(gate: &AuthGate<JsonFileStore>, args: &UnlockArgs) -> anyhow::Result<()> {
    if let Some(hint) = optional_hint(gate)? {
        eprintln!("Hint: {}", hint);
    }

    let passphrase = prompt::passphrase("Master passphrase")?;
    let result = gate.authenticate(passphrase.expose_secret(), None);

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&AuthResponse::from_result(&result))?
        );
        return Ok(());
    }

    match result {
        Ok(session) => {
            println!("{}", session.id);
            Ok(())
        }
        Err(KeepsakeError::Locked { until }) => {
            anyhow::bail!("Locked out until {}. Try again later.", until.to_rfc3339())
        }
        Err(KeepsakeError::IncorrectPassphrase {
            remaining_attempts,
            locked_until,
        }) => match locked_until {
            Some(until) => anyhow::bail!(
                "Incorrect passphrase. Locked out until {}.",
                until.to_rfc3339()
            ),
            None => anyhow::bail!(
                "Incorrect passphrase. {} attempt(s) remaining.",
                remaining_attempts
            ),
        },
        Err(err) => Err(err.into()),
    }
}

pub fn logout(gate: &AuthGate<JsonFileStore>, session_id: &str) -> anyhow::Result<()> {
    if gate.logout(session_id)? {
        println!("Session destroyed.");
    } else {
        println!("No such session.");
    }
    Ok(())
}

pub fn change_passphrase(
    gate: &AuthGate<JsonFileStore>,
    args: &ChangePassphraseArgs,
) -> anyhow::Result<()> {
    let current = prompt::passphrase("Current passphrase")?;
    let new = prompt::new_passphrase("New passphrase")?;
    gate.change_passphrase(
        current.expose_secret(),
        new.expose_secret(),
        args.hint.as_deref(),
    )?;
    println!("Passphrase changed.");
    Ok(())
}

fn optional_hint(gate: &AuthGate<JsonFileStore>) -> anyhow::Result<Option<String>> {
    match gate.recovery_hint() {
        Ok(hint) => Ok(hint),
        Err(KeepsakeError::NotConfigured) => {
            anyhow::bail!("No master passphrase configured; run `keepsake init` first")
        }
        Err(err) => Err(err.into()),
    }
}
