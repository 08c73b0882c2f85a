//! Prints the SQL to create or reset a super-admin by hand.
//!
//! Usage: hashpass <email> <password>

use clinic_booking_server::{auth::hash_password, models::ROLE_SUPER_ADMIN};

fn main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    let (Some(email), Some(password)) = (args.next(), args.next()) else {
        anyhow::bail!("Usage: hashpass <email> <password>");
    };

    let phc = hash_password(&password).map_err(anyhow::Error::msg)?;
    let email = email.trim().to_lowercase().replace('\'', "''");

    println!(
        "INSERT INTO app_user (user_id, email, password_hash, role) \
         VALUES (gen_random_uuid(), '{email}', '{phc}', {ROLE_SUPER_ADMIN}) \
         ON CONFLICT (email) DO UPDATE SET password_hash = EXCLUDED.password_hash, role = EXCLUDED.role;"
    );
    Ok(())
}
