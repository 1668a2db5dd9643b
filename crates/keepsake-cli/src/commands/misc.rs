//! Miscellaneous commands.

use keepsake_core::crypto::generate_secure_password;

use crate::cli::PwgenArgs;

pub fn pwgen(args: &PwgenArgs) -> anyhow::Result<()> {
    let password = generate_secure_password(args.length)?;
    println!("{}", password);
    Ok(())
}
