//! epub-locator - EPUB CFI and location tool

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use epub_locator::cfi;
use epub_locator::loader::DirectoryLoader;
use epub_locator::{Config, Locations, PageList};

#[derive(Parser)]
#[command(name = "epub-locator")]
#[command(version, about = "EPUB CFI and location tool", long_about = None)]
#[command(after_help = "EXAMPLES:
    epub-locator parse 'epubcfi(/6/4[chap01ref]!/4/2/1:3)'
    epub-locator compare 'epubcfi(/6/4!/4/2/1:3)' 'epubcfi(/6/6!/4/2)'
    epub-locator locations ./unpacked-book --break-size 300
    epub-locator pages ./unpacked-book")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Parse a CFI and print its structure
    Parse {
        cfi: String,
    },

    /// Compare two CFIs in reading order
    Compare {
        a: String,
        b: String,
    },

    /// Generate the location index of an unpacked publication
    Locations {
        /// Directory containing META-INF/container.xml
        #[arg(value_name = "DIR")]
        publication: PathBuf,

        /// Characters per location (overrides LOCATIONS_BREAK_SIZE)
        #[arg(long)]
        break_size: Option<usize>,

        /// Count words instead of characters
        #[arg(long)]
        words: bool,

        /// Write the index to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the page list of an unpacked publication
    Pages {
        #[arg(value_name = "DIR")]
        publication: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "epub_locator=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::from_env();
    let cli = Cli::parse();

    match cli.command {
        Command::Parse { cfi } => show_cfi(&cfi),
        Command::Compare { a, b } => compare(&a, &b),
        Command::Locations {
            publication,
            break_size,
            words,
            output,
        } => {
            let mut config = config;
            if let Some(break_size) = break_size {
                config.locations.break_size = break_size;
            }
            locations(&config, publication, words, output).await
        }
        Command::Pages { publication } => pages(publication).await,
    }
}

fn show_cfi(input: &str) -> anyhow::Result<()> {
    let address = cfi::parse(input)?;

    println!("CFI: {address}");
    println!("Spine position: {}", address.spine_position);
    println!("Base: {}", address.base);
    println!("Path: {}", address.path);
    if let Some(ref range) = address.range {
        println!("Range start: {}", range.start);
        println!("Range end: {}", range.end);
    }
    println!("XPath: {}", cfi::to_xpath(&address.start_path().steps));

    Ok(())
}

fn compare(a: &str, b: &str) -> anyhow::Result<()> {
    let a = cfi::parse(a).context("first CFI")?;
    let b = cfi::parse(b).context("second CFI")?;

    let relation = match cfi::compare(&a, &b) {
        std::cmp::Ordering::Less => "before",
        std::cmp::Ordering::Equal => "at the same position as",
        std::cmp::Ordering::Greater => "after",
    };
    println!("{a} is {relation} {b}");

    Ok(())
}

async fn locations(
    config: &Config,
    publication: PathBuf,
    words: bool,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let (loader, spine) = DirectoryLoader::open(&publication)
        .await
        .with_context(|| format!("opening {}", publication.display()))?;
    let loader = loader.with_ignore_class(config.cfi.ignore_class.as_deref());

    let mut locations = Locations::new(&config.locations);
    if words {
        locations.generate_from_words(&spine, &loader, None, None).await;
    } else {
        locations.generate(&spine, &loader).await;
    }

    let json = locations.save()?;
    match output {
        Some(path) => {
            tokio::fs::write(&path, json)
                .await
                .with_context(|| format!("writing {}", path.display()))?;
            tracing::info!(path = %path.display(), locations = locations.len(), "Saved locations");
        }
        None => println!("{json}"),
    }

    Ok(())
}

async fn pages(publication: PathBuf) -> anyhow::Result<()> {
    let (loader, spine) = DirectoryLoader::open(&publication)
        .await
        .with_context(|| format!("opening {}", publication.display()))?;

    let Some(href) = spine.nav_href.as_deref().or(spine.ncx_href.as_deref()) else {
        bail!("publication declares no navigation document");
    };
    let list = PageList::parse(&loader.read(href).await?)?;

    println!("Pages: {} ({}-{})", list.entries().len(), list.first_page(), list.last_page());
    for entry in list.entries() {
        match entry.address {
            Some(ref address) => println!("{:>6}  {}", entry.page, address),
            None => println!("{:>6}  {}", entry.page, entry.href),
        }
    }

    Ok(())
}
