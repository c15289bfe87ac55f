//! Helper for provisioning the first admin account: hashes a password with
//! the same cost the service uses, ready to insert into the users table.

use bcrypt::hash;
use std::env;

use media_cms_backend::auth::HASH_COST;

fn main() {
    let password = env::args().nth(1).unwrap_or_else(|| {
        eprintln!("Usage: cargo run --bin hash-password <PASSWORD>");
        std::process::exit(1);
    });

    match hash(&password, HASH_COST) {
        Ok(hashed) => {
            println!("\nPassword : {}", password);
            println!("Cost     : {}", HASH_COST);
            println!("Hash     : {}\n", hashed);
        }
        Err(e) => {
            eprintln!("Error hashing password: {}", e);
            std::process::exit(1);
        }
    }
}
