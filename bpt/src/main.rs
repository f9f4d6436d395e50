use anyhow::Context;
use bpetok::{CachePolicy, TokenId, Tokenizer, TokenizerOptions};
use clap::{Args, Parser, Subcommand};
use std::io::{Read, Write};
use std::path::PathBuf;
use std::process::exit;
use tracing::*;
use tracing_subscriber::{filter::LevelFilter, EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    globals: Globals,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Globals {
    /// Tokenizer description file (`tokenizer.json`)
    #[arg(short, long, value_name = "FILE", env = "BPETOK_TOKENIZER", global = true)]
    tokenizer: Option<PathBuf>,

    /// Maximum number of words to keep in the encode cache.
    ///
    /// 0 disables the cache.  If not specified the cache is unbounded.
    #[arg(long, value_name = "WORDS", env = "BPETOK_CACHE_CAPACITY", global = true)]
    cache_capacity: Option<usize>,

    /// Turn debugging information on
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    debug: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode text into token ids
    Encode {
        /// Text to encode.  Read from stdin if not specified.
        text: Option<String>,

        /// Print the ids as a JSON array instead of space separated
        #[arg(long)]
        json: bool,
    },

    /// Decode token ids back into text
    Decode {
        #[arg(required = true)]
        ids: Vec<TokenId>,
    },

    /// Print the words that text is split into before encoding, one per line
    Words {
        /// Text to split.  Read from stdin if not specified.
        text: Option<String>,
    },

    /// Print a summary of the tokenizer
    Inspect,
}

impl Globals {
    fn load_tokenizer(&self) -> anyhow::Result<Tokenizer> {
        let path = self
            .tokenizer
            .as_deref()
            .context("No tokenizer specified; use --tokenizer or set BPETOK_TOKENIZER")?;

        let options = TokenizerOptions {
            cache: CachePolicy::from_capacity(self.cache_capacity),
        };

        let tokenizer = Tokenizer::from_file_with_options(path, options)
            .with_context(|| format!("Error loading tokenizer '{}'", path.display()))?;
        debug!(path = %path.display(), ?tokenizer, "tokenizer loaded");

        Ok(tokenizer)
    }
}

impl Commands {
    fn execute(self, globals: &Globals) -> anyhow::Result<()> {
        let tokenizer = globals.load_tokenizer()?;
        let mut stdout = std::io::stdout().lock();

        use Commands::*;
        match self {
            Encode { text, json } => {
                let text = text_or_stdin(text)?;
                let ids = tokenizer.encode(&text)?;
                info!(bytes = text.len(), tokens = ids.len(), "encoded");

                if json {
                    writeln!(stdout, "{}", serde_json::to_string(&ids)?)?;
                } else {
                    let ids = ids.iter().map(|id| id.to_string()).collect::<Vec<_>>();
                    writeln!(stdout, "{}", ids.join(" "))?;
                }
            }
            Decode { ids } => {
                let text = tokenizer.decode(&ids)?;

                write!(stdout, "{text}")?;
            }
            Words { text } => {
                let text = text_or_stdin(text)?;

                for word in tokenizer.words(&text) {
                    writeln!(stdout, "{}", serde_json::to_string(word?.as_str())?)?;
                }
            }
            Inspect => {
                writeln!(stdout, "type: {}", tokenizer.tokenizer_type())?;
                writeln!(stdout, "vocab size: {}", tokenizer.vocab_size())?;
                writeln!(stdout, "merges: {}", tokenizer.merge_count())?;
                writeln!(stdout, "added tokens:")?;
                for token in tokenizer.added_tokens() {
                    let special = if token.special { " (special)" } else { "" };
                    writeln!(
                        stdout,
                        "  {} {}{special}",
                        token.id,
                        serde_json::to_string(&token.content)?
                    )?;
                }
            }
        }

        stdout.flush()?;

        Ok(())
    }
}

fn text_or_stdin(text: Option<String>) -> anyhow::Result<String> {
    match text {
        Some(text) => Ok(text),
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("Error reading text from stdin")?;

            Ok(text)
        }
    }
}

fn main() {
    let cli = Cli::parse();
    let default_log_directive = match cli.globals.debug {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };

    // Log events go to stderr as JSON, so stdout only ever carries command output
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(default_log_directive.into())
                .from_env_lossy(),
        )
        .json()
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set subscriber");

    if let Err(e) = cli.command.execute(&cli.globals) {
        error!("{:#}", e);
        exit(1);
    } else {
        debug!("command executed successfully");
    }
}
