//! `versions` and `mint` commands.

use crate::pairing::ConnectionToken;
use crate::version::NegotiatedVersions;

pub fn run_versions_command(json: bool) -> anyhow::Result<()> {
    let latest = NegotiatedVersions::latest();
    if json {
        println!("{}", serde_json::to_string(&latest)?);
    } else {
        println!("connection token version: {}", latest.connection.tag());
        println!("pairing protocol version: {}", latest.pairing.tag());
    }
    Ok(())
}

pub fn run_mint_command(json: bool) -> anyhow::Result<()> {
    let token = ConnectionToken::generate();
    let versions = NegotiatedVersions::latest();
    if json {
        let out = serde_json::json!({
            "token": token,
            "connection": versions.connection,
            "pairing": versions.pairing,
        });
        println!("{}", out);
    } else {
        println!(
            "{} (connection v{}, pairing v{})",
            token,
            versions.connection.tag(),
            versions.pairing.tag()
        );
    }
    Ok(())
}
