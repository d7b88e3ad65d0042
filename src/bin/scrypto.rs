//! scrypto CLI - password-based file encryption
//!
//! ```text
//! scrypto -e <in> <out> <password>
//! scrypto -d <in> <out> <password>
//! ```
//!
//! Exit codes: 0 on success, 2 on usage errors, and a distinct code per
//! failure kind otherwise (see `ErrorKind::exit_code`).

use std::io;
use std::path::PathBuf;
use std::process;

use clap::{ArgGroup, Args, Parser};
use tracing_subscriber::EnvFilter;
use zeroize::Zeroizing;

use scrypto::file_ops::{self, DecryptOptions, EncryptOptions};
use scrypto::kdf::{
    DEFAULT_BLOCK_SIZE, DEFAULT_COST_LOG2, DEFAULT_KEY_LENGTH, DEFAULT_PARALLELISM, KdfLimits,
    KdfParams,
};
use scrypto::passphrase::{
    ConstantPassphraseReader, PassphraseReader, ReaderPassphraseReader, TerminalPassphraseReader,
};

#[derive(Parser)]
#[command(name = "scrypto")]
#[command(version)]
#[command(about = "Password-based file encryption.", long_about = None)]
#[command(group(
    ArgGroup::new("mode")
        .required(true)
        .args(["encrypt", "decrypt"])
))]
#[command(group(
    ArgGroup::new("passphrase_source")
        .required(true)
        .args(["password", "passphrase_stdin", "prompt"])
))]
struct Cli {
    /// Encrypt INPUT into OUTPUT
    #[arg(short = 'e', long)]
    encrypt: bool,

    /// Decrypt INPUT into OUTPUT
    #[arg(short = 'd', long)]
    decrypt: bool,

    /// Path to the file to read
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Path to the file to write
    #[arg(value_name = "OUTPUT")]
    output: PathBuf,

    /// Password; visible to other local users via the process list, so
    /// prefer --prompt or --passphrase-stdin
    #[arg(value_name = "PASSWORD")]
    password: Option<String>,

    /// Read passphrase from stdin instead of the command line
    #[arg(long)]
    passphrase_stdin: bool,

    /// Prompt for the passphrase on the terminal without echo
    #[arg(long)]
    prompt: bool,

    /// Write text-safe armor instead of the binary format
    #[arg(long, conflicts_with = "decrypt")]
    armor: bool,

    #[command(flatten)]
    kdf: KdfArgs,

    /// Log debug output to stderr (overrides SCRYPTO_LOG)
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Args)]
struct KdfArgs {
    /// log2 of the scrypt cost factor N used when encrypting
    #[arg(long, env = "SCRYPTO_COST_LOG2", default_value_t = DEFAULT_COST_LOG2)]
    cost_log2: u8,

    /// scrypt block size r used when encrypting
    #[arg(long, env = "SCRYPTO_BLOCK_SIZE", default_value_t = DEFAULT_BLOCK_SIZE)]
    block_size: u32,

    /// scrypt parallelism p used when encrypting
    #[arg(long, env = "SCRYPTO_PARALLELISM", default_value_t = DEFAULT_PARALLELISM)]
    parallelism: u32,

    /// Refuse key derivations that need more memory than this, in MiB
    #[arg(long, env = "SCRYPTO_MAX_KDF_MEMORY_MIB", default_value_t = 1024)]
    max_kdf_memory_mib: u64,
}

impl KdfArgs {
    fn params(&self) -> KdfParams {
        KdfParams::new(
            self.cost_log2,
            self.block_size,
            self.parallelism,
            DEFAULT_KEY_LENGTH,
        )
    }

    fn limits(&self) -> KdfLimits {
        KdfLimits {
            max_memory_bytes: self.max_kdf_memory_mib.saturating_mul(1024 * 1024),
            ..KdfLimits::default()
        }
    }
}

fn main() {
    let mut cli = Cli::parse();
    init_logging(cli.verbose);

    let mut reader = get_passphrase_reader(&mut cli);

    let result = if cli.encrypt {
        let options = EncryptOptions {
            params: cli.kdf.params(),
            limits: cli.kdf.limits(),
            armor: cli.armor,
        };
        file_ops::encrypt_file(&cli.input, &cli.output, &mut *reader, &options)
            .map(|()| "File encrypted")
    } else {
        let options = DecryptOptions {
            limits: cli.kdf.limits(),
        };
        file_ops::decrypt_file(&cli.input, &cli.output, &mut *reader, &options)
            .map(|()| "File decrypted")
    };

    match result {
        Ok(confirmation) => println!("{}", confirmation),
        Err(e) => {
            eprintln!("Error: {}", e.chain_message());
            process::exit(e.kind.exit_code());
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("scrypto=debug")
    } else {
        EnvFilter::try_from_env("SCRYPTO_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .compact()
        .init();
}

fn get_passphrase_reader(cli: &mut Cli) -> Box<dyn PassphraseReader> {
    if let Some(password) = cli.password.take() {
        let password = Zeroizing::new(password);
        Box::new(ConstantPassphraseReader::new(password.as_bytes().to_vec()))
    } else if cli.passphrase_stdin {
        Box::new(ReaderPassphraseReader::new(Box::new(io::stdin())))
    } else {
        Box::new(TerminalPassphraseReader::new())
    }
}
