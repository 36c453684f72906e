use std::{fs, path::PathBuf, time::Instant};

use anyhow::{Context, Result};
use clap::{ArgGroup, Parser};
use tracing_subscriber::filter::LevelFilter;

use dkim_circuit::{
    utils::{convert_public_inputs, to_0x_hex},
    CircuitParameters, DistinguishedHeader, DkimCircuit, DkimWitness, MailTemplate,
};
use email_parser::StaticDnsClient;

/// Build the DKIM circuit for an email and check the witness satisfies it.
#[derive(Parser, Debug)]
#[command(version, about)]
#[command(group(ArgGroup::new("key").required(true).args(["txt_record", "dns"])))]
#[command(group(ArgGroup::new("topology").required(true).args(["template", "params"])))]
struct Args {
    /// raw email file
    email: PathBuf,
    /// TXT record of the signing key, `v=DKIM1; k=rsa; p=...`
    #[arg(long)]
    txt_record: Option<String>,
    /// JSON map from TXT names to records
    #[arg(long)]
    dns: Option<PathBuf>,
    /// gmail, outlook, foxmail or icloud
    #[arg(long)]
    template: Option<String>,
    /// circuit parameters as JSON
    #[arg(long)]
    params: Option<PathBuf>,
    /// from or to
    #[arg(long)]
    distinguished: Option<String>,
    /// write the witness JSON here
    #[arg(long)]
    witness_out: Option<PathBuf>,
    #[arg(short, long)]
    verbose: bool,
}

fn load_params(args: &Args) -> Result<CircuitParameters> {
    let mut params = match (&args.template, &args.params) {
        (Some(template), _) => template.parse::<MailTemplate>()?.parameters(),
        (None, Some(path)) => CircuitParameters::from_json_file(path)
            .with_context(|| format!("loading parameters from {}", path.display()))?,
        (None, None) => anyhow::bail!("either --template or --params is required"),
    };
    if let Some(header) = &args.distinguished {
        params.distinguished_header = header.parse::<DistinguishedHeader>()?;
    }
    params.validate()?;

    Ok(params)
}

fn main() -> Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_max_level(if args.verbose {
            LevelFilter::DEBUG
        } else {
            LevelFilter::INFO
        })
        .init();

    let params = load_params(&args)?;
    let raw = fs::read_to_string(&args.email)
        .with_context(|| format!("reading {}", args.email.display()))?;

    let start = Instant::now();
    let witness = match (&args.txt_record, &args.dns) {
        (Some(record), _) => DkimWitness::prepare(&raw, record, &params)?,
        (None, Some(path)) => {
            let client = StaticDnsClient::from_json_file(path)?;
            DkimWitness::prepare_with_dns(&raw, &client, &params)?
        }
        (None, None) => anyhow::bail!("either --txt-record or --dns is required"),
    };
    println!("[main] witness prepared: d={} s={}", witness.domain, witness.selector);
    let regions = [
        ("prefix", &witness.prefix),
        ("specify", &witness.specify),
        ("suffix", &witness.suffix),
        ("sig prefix", &witness.sig_prefix),
        ("sig suffix", &witness.sig_suffix),
    ];
    for (name, padded) in regions {
        println!(
            "[main]   {:<10} {:>5} / {:>5} bytes",
            name,
            padded.real_bytes().len(),
            padded.capacity()
        );
    }
    println!("[main] header hash: {}", to_0x_hex(&witness.header_hash));
    println!("[main] time cost: {:?} ms", start.elapsed().as_millis());

    if let Some(path) = &args.witness_out {
        witness.save(path)?;
        println!("[main] witness written to {}", path.display());
    }

    let start = Instant::now();
    let circuit = DkimCircuit::new(witness, params)?;
    println!("[main] circuit construct finish");
    let cs = circuit.synthesize()?;
    println!("[main] synthesize finish");
    println!("[main] gates: {}, variables: {}", cs.size(), cs.num_variables());
    println!("[main] shape digest: {}", to_0x_hex(cs.shape_digest()));
    println!(
        "[main] public input: {:?}",
        convert_public_inputs(&cs.compute_public_input())
    );
    println!("[main] synthesize time cost: {:?} ms", start.elapsed().as_millis());

    cs.check_satisfied()?;
    println!("[main] circuit satisfied");

    Ok(())
}
