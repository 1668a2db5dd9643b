//! Encrypted note commands.
//!
//! Records travel as JSON documents; plaintext goes through stdin/stdout or
//! files. Note passwords are independent of the master passphrase.

use std::fs;
use std::io::Read;
use std::path::Path;

use anyhow::Context;
use keepsake_core::envelope::{EncryptedNote, NoteEnvelope};
use keepsake_core::KeepsakeError;
use secrecy::ExposeSecret;

use crate::cli::NoteCommands;
use crate::prompt;

pub fn run(envelope: &NoteEnvelope, command: NoteCommands) -> anyhow::Result<()> {
    match command {
        NoteCommands::Encrypt {
            input,
            output,
            hint,
        } => encrypt(envelope, input.as_deref(), output.as_deref(), hint.as_deref()),
        NoteCommands::Decrypt { input, output } => {
            decrypt(envelope, input.as_deref(), output.as_deref())
        }
        NoteCommands::Rekey {
            input,
            output,
            hint,
        } => rekey(envelope, input.as_deref(), output.as_deref(), hint.as_deref()),
        NoteCommands::Strip { input, output } => {
            strip(envelope, input.as_deref(), output.as_deref())
        }
    }
}

fn encrypt(
    envelope: &NoteEnvelope,
    input: Option<&Path>,
    output: Option<&Path>,
    hint: Option<&str>,
) -> anyhow::Result<()> {
    let plaintext = read_input(input)?;
    let password = prompt::new_passphrase("Note password")?;

    match envelope.encrypt(&plaintext, password.expose_secret(), hint) {
        Ok(note) => write_record(output, &note),
        Err(KeepsakeError::WeakPassword { feedback }) => {
            anyhow::bail!("Password is too weak:\n  - {}", feedback.join("\n  - "))
        }
        Err(err) => Err(err.into()),
    }
}

fn decrypt(
    envelope: &NoteEnvelope,
    input: Option<&Path>,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let note = read_record(input)?;
    if let Some(hint) = &note.hint {
        eprintln!("Hint: {}", hint);
    }

    let password = prompt::passphrase("Note password")?;
    let plaintext = envelope.decrypt(&note, password.expose_secret())?;
    write_output(output, &plaintext)
}

fn rekey(
    envelope: &NoteEnvelope,
    input: Option<&Path>,
    output: Option<&Path>,
    hint: Option<&str>,
) -> anyhow::Result<()> {
    let note = read_record(input)?;
    let current = prompt::passphrase("Current note password")?;
    let new = prompt::new_passphrase("New note password")?;

    match envelope.change_password(&note, current.expose_secret(), new.expose_secret(), hint) {
        Ok(rekeyed) => write_record(output, &rekeyed),
        Err(KeepsakeError::WeakPassword { feedback }) => {
            anyhow::bail!("New password is too weak:\n  - {}", feedback.join("\n  - "))
        }
        Err(err) => Err(err.into()),
    }
}

fn strip(
    envelope: &NoteEnvelope,
    input: Option<&Path>,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let note = read_record(input)?;
    let password = prompt::passphrase("Note password")?;
    let plaintext = envelope.remove_protection(note, password.expose_secret())?;
    write_output(output, &plaintext)
}

fn read_input(path: Option<&Path>) -> anyhow::Result<String> {
    match path {
        Some(path) => {
            fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
        }
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read stdin")?;
            Ok(buffer)
        }
    }
}

fn read_record(path: Option<&Path>) -> anyhow::Result<EncryptedNote> {
    let raw = read_input(path)?;
    serde_json::from_str(&raw).context("Input is not a valid note record")
}

fn write_record(path: Option<&Path>, note: &EncryptedNote) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(note)?;
    write_output(path, &json)
}

fn write_output(path: Option<&Path>, contents: &str) -> anyhow::Result<()> {
    match path {
        Some(path) => fs::write(path, contents)
            .with_context(|| format!("Failed to write {}", path.display())),
        None => {
            if contents.ends_with('\n') {
                print!("{}", contents);
            } else {
                println!("{}", contents);
            }
            Ok(())
        }
    }
}
