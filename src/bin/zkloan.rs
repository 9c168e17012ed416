//! # zkloan CLI
//!
//! Parse salary emails, check loan eligibility and generate loan proofs from
//! the command line. JSON goes to stdout, progress lines to stderr.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use rand::RngCore;
use tracing_subscriber::EnvFilter;

use zk_payroll_loan::{
    LoanProof, LoanProofPipeline, ProgressEntry, ProofArtifact, ProverConfig, SalaryEmailParser,
};

/// Zero-knowledge salary-backed loans
#[derive(Parser, Debug)]
#[command(name = "zkloan", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// JSON prover config. Defaults to ZKLOAN_* environment variables.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Use the mock backend instead of Groth16.
    #[arg(long, global = true)]
    mock: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Extract salary and DKIM data from an .eml file.
    Parse(EmailArgs),

    /// Check a loan amount against the salary in an .eml file.
    Check(CheckArgs),

    /// Generate a loan proof and contract calldata.
    Prove(ProveArgs),

    /// Verify a proof artifact produced by `prove`.
    Verify(VerifyArgs),
}

#[derive(Args, Debug)]
struct EmailArgs {
    /// Path to the salary email.
    email: PathBuf,
}

#[derive(Args, Debug)]
struct CheckArgs {
    email: PathBuf,

    /// Requested loan amount in whole USDC.
    #[arg(long)]
    amount: u64,
}

#[derive(Args, Debug)]
struct ProveArgs {
    email: PathBuf,

    #[arg(long)]
    amount: u64,

    /// User secret for the nullifier. When omitted a random one is generated
    /// and stored as `userSecret` in the output JSON.
    #[arg(long, env = "ZKLOAN_USER_SECRET", hide_env_values = true)]
    secret: Option<String>,

    /// Write the result here instead of stdout.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct VerifyArgs {
    /// JSON output of `prove`, or a bare proof artifact.
    artifact: PathBuf,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(&cli) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::from(1)
        }
    }
}

fn run(cli: &Cli) -> Result<u8> {
    match &cli.command {
        Commands::Parse(args) => {
            let raw = read_email(&args.email)?;
            let parsed = SalaryEmailParser::parse(&raw)?;
            print_json(&parsed)?;
            Ok(0)
        }
        Commands::Check(args) => {
            let pipeline = LoanProofPipeline::from_config(&load_config(cli)?)?;
            let raw = read_email(&args.email)?;
            let report = pipeline.check_eligibility(&raw, args.amount)?;
            print_json(&report)?;
            Ok(if report.result.is_eligible { 0 } else { 2 })
        }
        Commands::Prove(args) => prove(cli, args),
        Commands::Verify(args) => {
            let pipeline = LoanProofPipeline::from_config(&load_config(cli)?)?;
            let artifact = read_artifact(&args.artifact)?;
            let valid = pipeline.verify_artifact(&artifact)?;
            print_json(&serde_json::json!({ "valid": valid }))?;
            Ok(if valid { 0 } else { 2 })
        }
    }
}

fn prove(cli: &Cli, args: &ProveArgs) -> Result<u8> {
    let config = load_config(cli)?;
    let raw = read_email(&args.email)?;

    let generated = args.secret.is_none().then(random_secret);
    let secret = args.secret.as_deref().or(generated.as_deref()).unwrap_or_default();

    let pipeline = LoanProofPipeline::from_config(&config)?;
    let mut progress = |entry: &ProgressEntry| eprintln!("{entry}");
    let proof = pipeline.prove_loan(&raw, args.amount, secret, &mut progress)?;
    let output = prove_output(&pipeline, &config, &proof, generated.as_deref());

    match &args.out {
        Some(path) => {
            let json = serde_json::to_string_pretty(&output)?;
            std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
            tracing::info!(path = %path.display(), "proof written");
        }
        None => print_json(&output)?,
    }
    if generated.is_some() {
        let target = args
            .out
            .as_ref()
            .map_or("stdout".to_string(), |path| path.display().to_string());
        eprintln!("a user secret was generated; it is stored as userSecret in {target}, keep it to repay the loan");
    }
    Ok(0)
}

/// JSON written by `prove`. A generated secret goes here and nowhere else.
fn prove_output(
    pipeline: &LoanProofPipeline,
    config: &ProverConfig,
    proof: &LoanProof,
    generated_secret: Option<&str>,
) -> serde_json::Value {
    let call = proof.take_loan_call();
    let mut output = serde_json::json!({
        "backend": pipeline.orchestrator().backend_name(),
        "function": call.function_name(),
        "contractAddress": config.chain.contract_address,
        "chainId": config.chain.chain_id,
        "proof": proof,
    });
    if let Some(secret) = generated_secret {
        output["userSecret"] = serde_json::Value::from(secret);
    }
    output
}

fn load_config(cli: &Cli) -> Result<ProverConfig> {
    let mut config = match &cli.config {
        Some(path) => ProverConfig::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => ProverConfig::from_env()?,
    };
    if cli.mock {
        config.use_mock_backend = true;
    }
    Ok(config)
}

fn read_email(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

fn read_artifact(path: &Path) -> Result<ProofArtifact> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&raw)?;
    // `prove` output nests the artifact under proof.artifact.
    let artifact = value
        .pointer("/proof/artifact")
        .cloned()
        .unwrap_or(value);
    serde_json::from_value(artifact).context("not a proof artifact")
}

fn random_secret() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parse_prove() {
        let cli = Cli::try_parse_from([
            "zkloan", "--mock", "prove", "salary.eml", "--amount", "30000", "--secret", "s3cret",
        ])
        .unwrap();
        assert!(cli.mock);
        if let Commands::Prove(args) = cli.command {
            assert_eq!(args.email, PathBuf::from("salary.eml"));
            assert_eq!(args.amount, 30_000);
            assert_eq!(args.secret.as_deref(), Some("s3cret"));
            assert!(args.out.is_none());
        } else {
            panic!("expected prove");
        }
    }

    #[test]
    fn cli_parse_check_requires_amount() {
        assert!(Cli::try_parse_from(["zkloan", "check", "salary.eml"]).is_err());
        let cli = Cli::try_parse_from(["zkloan", "-vv", "check", "salary.eml", "--amount", "5"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Commands::Check(CheckArgs { amount: 5, .. })));
    }

    const EMAIL: &str = include_str!("../../tests/fixtures/salarydoc.eml");

    fn mock_proof(secret: &str) -> (LoanProofPipeline, ProverConfig, LoanProof) {
        let config = ProverConfig::mock();
        let pipeline = LoanProofPipeline::from_config(&config).unwrap();
        let proof = pipeline
            .prove_loan(EMAIL, 30_000, secret, &mut |_: &ProgressEntry| {})
            .unwrap();
        (pipeline, config, proof)
    }

    #[test]
    fn generated_secret_only_in_output() {
        let secret = random_secret();
        let (pipeline, config, proof) = mock_proof(&secret);

        let output = prove_output(&pipeline, &config, &proof, Some(&secret));
        assert_eq!(output["userSecret"], secret.as_str());
        assert_eq!(output["function"], "takeLoan");

        // The secret must still reproduce the nullifier in the output.
        assert_eq!(
            output["proof"]["artifact"]["publicInputs"][1],
            zk_payroll_loan::hash::nullifier(&secret, 120_000).to_hex()
        );
    }

    #[test]
    fn supplied_secret_not_echoed() {
        let (pipeline, config, proof) = mock_proof("s3cret");
        let output = prove_output(&pipeline, &config, &proof, None);

        assert!(output.get("userSecret").is_none());
        assert!(!output.to_string().contains("s3cret"));
    }

    #[test]
    fn random_secret_is_fresh() {
        let a = random_secret();
        assert_eq!(a.len(), 64);
        assert_ne!(a, random_secret());
    }
}
