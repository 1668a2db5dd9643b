//! Session maintenance commands.

use keepsake_core::auth::{AuthGate, SessionResponse};
use keepsake_core::JsonFileStore;

pub fn validate(
    gate: &AuthGate<JsonFileStore>,
    session_id: &str,
    json: bool,
) -> anyhow::Result<()> {
    let result = gate.validate_session(session_id);

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&SessionResponse::from_result(&result))?
        );
        return Ok(());
    }

    match result {
        Ok(session) => {
            println!("Valid session for {}", session.user_id);
            Ok(())
        }
        Err(err) if err.requires_reauth() => {
            anyhow::bail!("{}. Re-authenticate with `keepsake unlock`.", err)
        }
        Err(err) => Err(err.into()),
    }
}

pub fn cleanup(gate: &AuthGate<JsonFileStore>) -> anyhow::Result<()> {
    let removed = gate.cleanup_expired_sessions()?;
    println!("Removed {} expired session(s).", removed);
    Ok(())
}
