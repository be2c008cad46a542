//! afip-creds - credential and transport provisioning for the AFIP gateway

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use afip_creds::{
    Result,
    cli::{Cli, Command},
    config::Config,
    credentials::{
        CertificateRequestBuilder, KeyMaterialGenerator, SignedEnvelopeBuilder,
        verify_envelope,
    },
    setup_tracing,
    transport::{Environment, TransportRegistry},
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = setup_tracing(&cli.log_level, cli.log_format.as_deref()) {
        eprintln!("Failed to setup tracing: {e}");
        return ExitCode::FAILURE;
    }

    let config = match Config::load(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to load config: {e}");
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command {
        Command::Keygen { out } => run_keygen(&config, out),
        Command::Csr {
            key,
            out,
            org,
            cn,
            serial,
        } => run_csr(&config, key, out, org, cn, serial),
        Command::Sign {
            payload,
            cert,
            key,
            out,
            base64,
        } => run_sign(&config, &payload, cert, key, out.as_deref(), base64),
        Command::Verify { envelope, payload } => run_verify(&envelope, &payload),
        Command::Resolve {
            service,
            env,
            probe,
        } => run_resolve(&config, &service, env.unwrap_or(config.environment), probe).await,
        Command::Services { env } => {
            run_services(&config, env.unwrap_or(config.environment));
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run_keygen(config: &Config, out: Option<PathBuf>) -> Result<()> {
    let path = out.unwrap_or_else(|| PathBuf::from(&config.credentials.key_path));
    let key = KeyMaterialGenerator::generate()?;
    key.write_private_key(&path)?;
    info!(path = %path.display(), "key generated");
    println!("Wrote {}-bit RSA key to {}", key.bits(), path.display());
    Ok(())
}

fn run_csr(
    config: &Config,
    key: Option<PathBuf>,
    out: Option<PathBuf>,
    org: Option<String>,
    cn: Option<String>,
    serial: Option<String>,
) -> Result<()> {
    let creds = &config.credentials;
    let key_path = key.unwrap_or_else(|| PathBuf::from(&creds.key_path));
    let out_path = out.unwrap_or_else(|| PathBuf::from(&creds.csr_path));

    let organization = required(org.or_else(|| creds.organization.clone()), "--org")?;
    let common_name = required(cn.or_else(|| creds.common_name.clone()), "--cn")?;
    let serial_number = required(serial.or_else(|| creds.serial_number.clone()), "--serial")?;

    let key_pem = fs::read(&key_path)?;
    let csr = CertificateRequestBuilder::build(&key_pem, &organization, &common_name, &serial_number)?;
    write_output(Some(&out_path), &csr)?;

    println!("Wrote certificate request to {}", out_path.display());
    Ok(())
}

fn run_sign(
    config: &Config,
    payload: &Path,
    cert: Option<PathBuf>,
    key: Option<PathBuf>,
    out: Option<&Path>,
    base64: bool,
) -> Result<()> {
    let creds = &config.credentials;
    let cert_path = cert.unwrap_or_else(|| PathBuf::from(&creds.cert_path));
    let key_path = key.unwrap_or_else(|| PathBuf::from(&creds.key_path));

    let payload = fs::read(payload)?;
    let envelope = SignedEnvelopeBuilder::sign(&payload, &fs::read(cert_path)?, &fs::read(key_path)?)?;

    if base64 {
        write_output(out, envelope.to_base64().as_bytes())
    } else {
        write_output(out, envelope.as_der())
    }
}

fn run_verify(envelope: &Path, payload: &Path) -> Result<()> {
    let signer = verify_envelope(&fs::read(envelope)?, &fs::read(payload)?)?;
    let subject: Vec<String> = signer
        .subject_name()
        .entries()
        .map(|entry| {
            let field = entry.object().nid().short_name().unwrap_or("?");
            let value = entry.data().to_string().unwrap_or_else(|_| "?".to_owned());
            format!("{field}={value}")
        })
        .collect();
    println!("Signature OK, signer: {}", subject.join(", "));
    Ok(())
}

async fn run_resolve(config: &Config, service: &str, environment: Environment, probe: bool) -> Result<()> {
    let registry = TransportRegistry::new(config.endpoint_table(), config.transport.clone());
    let resolved = registry.resolve(service, environment)?;

    println!("{} ({}): {}", resolved.endpoint.service, environment, resolved.endpoint.url);
    let tls = resolved.client.tls_config();
    println!(
        "  TLS {}..{}, ciphers {}",
        tls.min_protocol,
        tls.max_protocol,
        tls.cipher_list()
    );

    if probe {
        let response = resolved.client.get(&resolved.endpoint.url).await?;
        println!("  {} ({} bytes)", response.status, response.body.len());
    }
    Ok(())
}

fn run_services(config: &Config, environment: Environment) {
    let table = config.endpoint_table();
    println!("Services ({environment}):");
    for (service, url) in table.services(environment) {
        println!("  {service:<30} {url}");
    }
}

fn required(value: Option<String>, flag: &str) -> Result<String> {
    value.ok_or_else(|| {
        afip_creds::Error::Config(format!("{flag} is required (or set it under `credentials`)"))
    })
}

fn write_output(path: Option<&Path>, bytes: &[u8]) -> Result<()> {
    match path {
        Some(p) => {
            if let Some(parent) = p.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            fs::write(p, bytes)?;
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(bytes)?;
            stdout.flush()?;
        }
    }
    Ok(())
}
