use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use memberstack_auth::{parse_bearer, Claims, TokenVerifier, VerificationResult};
use tracing_subscriber::EnvFilter;

mod config;

use config::Options;

fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let opts = Options::parse();
    let token = if opts.token.trim_start().starts_with("Bearer ") {
        parse_bearer(&opts.token)?
    } else {
        opts.token.trim()
    };

    let verifier =
        TokenVerifier::new(opts.verifier_options()).context("failed to build token verifier")?;

    let first = verifier.verify_token(token);
    print_outcome(&first);

    // Served from the cached JWKS, no second fetch.
    let second = verifier.verify_token(token);
    print_outcome(&second);

    if second.is_valid() {
        println!("token details (claims):");
    } else {
        println!("**INVALID** token details (claims):");
    }

    match second.claims() {
        Some(claims) => print_claims(claims)?,
        None => println!("  <payload could not be decoded>"),
    }

    Ok(if second.is_valid() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn print_outcome(result: &VerificationResult) {
    match result.error() {
        Some(err) => println!(
            "token valid: {}, error: {} ({err})",
            result.is_valid(),
            err.kind()
        ),
        None => println!("token valid: {}, error: none", result.is_valid()),
    }
}

fn print_claims(claims: &Claims) -> Result<()> {
    let rendered = serde_json::to_string_pretty(claims).context("failed to render claims")?;
    println!("{rendered}\n");
    match claims.expires_at {
        Some(exp) => println!("  exp: {exp}"),
        None => println!("  exp: <unset>"),
    }
    match claims.issued_at {
        Some(iat) => println!("  iat: {iat}"),
        None => println!("  iat: <unset>"),
    }
    Ok(())
}
