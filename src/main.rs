use clap::{Args, Parser, Subcommand};
use miette::{IntoDiagnostic, Result, miette};
use pacs008_pix::application::pipeline::Pacs008Pipeline;
use pacs008_pix::domain::ports::MessagePublisherBox;
use pacs008_pix::infrastructure::keystore::{
    KeystoreConfig, SigningMaterial, certificate_public_key, load_signing_material,
};
use pacs008_pix::infrastructure::signature::{embedded_certificate, verify};
use pacs008_pix::infrastructure::spool::SpoolDirectoryPublisher;
use pacs008_pix::interfaces::json::request_reader::RequestReader;
use std::fs::File;
use std::path::PathBuf;
use tracing::error;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    keystore: KeystoreArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct KeystoreArgs {
    /// Directory holding `<alias>.key.pem` and `<alias>.crt.pem`
    #[arg(long, env = "PIX_KEYSTORE_PATH", global = true)]
    keystore: Option<PathBuf>,

    /// Keystore password; also decrypts the key when no key password is set
    #[arg(long, env = "PIX_KEYSTORE_PASSWORD", hide_env_values = true, global = true)]
    keystore_password: Option<String>,

    /// Alias of the signing key inside the keystore
    #[arg(long, env = "PIX_KEY_ALIAS", default_value = "spi-signer", global = true)]
    key_alias: String,

    /// Password of the private key
    #[arg(long, env = "PIX_KEY_PASSWORD", hide_env_values = true, global = true)]
    key_password: Option<String>,
}

impl KeystoreArgs {
    fn load(&self) -> Result<SigningMaterial> {
        let path = self
            .keystore
            .clone()
            .ok_or_else(|| miette!("no keystore given (use --keystore or PIX_KEYSTORE_PATH)"))?;
        load_signing_material(&KeystoreConfig {
            path,
            password: self.keystore_password.clone(),
            alias: self.key_alias.clone(),
            key_password: self.key_password.clone(),
        })
        .into_diagnostic()
    }
}

#[derive(Subcommand)]
enum Command {
    /// Build and sign pacs.008 messages from a JSON request file
    Sign {
        /// JSON file with one or more payment requests
        input: PathBuf,

        /// Spool signed messages into this directory instead of printing them
        #[arg(long, requires = "queue")]
        publish_dir: Option<PathBuf>,

        /// Destination queue name, used as the spool subdirectory
        #[arg(long, requires = "publish_dir")]
        queue: Option<String>,
    },
    /// Verify the enveloped signature of a signed message
    Verify {
        /// Signed XML file
        input: PathBuf,

        /// Check against the certificate embedded in the message instead of the keystore
        #[arg(long)]
        embedded: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Sign {
            input,
            publish_dir,
            queue,
        } => sign(&cli.keystore, input, publish_dir.zip(queue)).await,
        Command::Verify { input, embedded } => {
            let xml = std::fs::read(&input).into_diagnostic()?;
            let public_key = if embedded {
                let certificate = embedded_certificate(&xml).into_diagnostic()?;
                certificate_public_key(&certificate).into_diagnostic()?
            } else {
                cli.keystore.load()?.public_key()
            };
            verify(&xml, &public_key).into_diagnostic()?;
            println!("valid");
            Ok(())
        }
    }
}

async fn sign(
    keystore: &KeystoreArgs,
    input: PathBuf,
    spool: Option<(PathBuf, String)>,
) -> Result<()> {
    let material = keystore.load()?;
    let pipeline = Pacs008Pipeline::with_material(&material).into_diagnostic()?;
    let publisher: Option<(MessagePublisherBox, String)> = spool.map(|(dir, queue)| {
        let publisher: MessagePublisherBox = Box::new(SpoolDirectoryPublisher::new(dir));
        (publisher, queue)
    });

    let file = File::open(input).into_diagnostic()?;
    let reader = RequestReader::new(file);
    let (mut total, mut failed) = (0usize, 0usize);
    for request in reader.requests() {
        total += 1;
        let outcome = match (request, &publisher) {
            (Err(e), _) => Err(e),
            (Ok(request), Some((publisher, queue))) => pipeline
                .dispatch(&request, publisher.as_ref(), queue)
                .await
                .map(|(_, ack)| println!("{}", ack.receipt)),
            (Ok(request), None) => pipeline
                .process(&request)
                .map(|message| println!("{}", message.xml)),
        };
        if let Err(e) = outcome {
            failed += 1;
            error!(error = %e, request = total, "request not signed");
        }
    }

    if failed > 0 {
        return Err(miette!("{failed} of {total} requests failed"));
    }
    Ok(())
}
