use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{ArgGroup, Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use genome_portal::catalogue;
use genome_portal::config::{ConfigLoader, Credential, Settings};
use genome_portal::domain::{ArtifactKind, AssemblyId, ProductId, RecordOutput, SearchMode};
use genome_portal::download::{DownloadOptions, DownloadOutcome};
use genome_portal::error::PortalError;
use genome_portal::http::HttpFetcher;
use genome_portal::output::JsonOutput;
use genome_portal::portal::PortalClient;
use genome_portal::search::{SearchHits, SearchOptions, search_catalogue};
use genome_portal::store::Store;

#[derive(Parser)]
#[command(name = "genome-portal")]
#[command(about = "Search, catalogue and download genome assemblies from the genome portal")]
#[command(version, author)]
struct Cli {
    #[arg(long, global = true)]
    api_key: Option<String>,

    #[arg(long, global = true)]
    config: Option<String>,

    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(subcommand, about = "Search the remote portal")]
    Search(SearchCommand),
    #[command(about = "Show metadata for one assembly")]
    Metadata { id: String },
    #[command(about = "Download an assembly (FASTA)")]
    Assembly(AssemblyArgs),
    #[command(about = "Download annotations (GenBank)")]
    Annotations(AnnotationArgs),
    #[command(subcommand, about = "Build or search the local catalogue cache")]
    Catalogue(CatalogueCommand),
}

#[derive(Subcommand)]
enum SearchCommand {
    #[command(about = "Search by product identifier")]
    Product {
        product_id: String,
        #[arg(long)]
        id_only: bool,
    },
    #[command(about = "Free-text search")]
    Text {
        text: String,
        #[arg(long)]
        id_only: bool,
    },
}

#[derive(Args)]
#[command(group(ArgGroup::new("mode").args(["link_only", "sequences"])))]
struct AssemblyArgs {
    id: String,

    #[arg(long)]
    link_only: bool,

    #[arg(long, help = "Print header/sequence pairs instead of writing a file")]
    sequences: bool,

    #[arg(long)]
    dir: Option<String>,

    #[arg(long)]
    force: bool,
}

#[derive(Args)]
#[command(group(ArgGroup::new("mode").args(["link_only", "print"])))]
struct AnnotationArgs {
    id: String,

    #[arg(long)]
    link_only: bool,

    #[arg(long, help = "Print the GenBank text instead of writing a file")]
    print: bool,

    #[arg(long)]
    dir: Option<String>,

    #[arg(long)]
    force: bool,
}

#[derive(Subcommand)]
enum CatalogueCommand {
    #[command(about = "Fetch every catalogue page and cache it locally")]
    Build {
        #[arg(long)]
        out: Option<String>,
    },
    #[command(about = "Search the cached catalogue")]
    Search(CatalogueSearchArgs),
}

#[derive(Args)]
struct CatalogueSearchArgs {
    term: String,

    #[arg(long)]
    fuzzy: bool,

    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
    threshold: Option<u8>,

    #[arg(long)]
    id_only: bool,

    #[arg(long)]
    catalogue: Option<String>,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(portal) = report.downcast_ref::<PortalError>() {
            return ExitCode::from(map_exit_code(portal));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &PortalError) -> u8 {
    match error {
        PortalError::NotFound(_) | PortalError::EmptyResult(_) => 2,
        PortalError::Transport(_)
        | PortalError::HttpStatus { .. }
        | PortalError::ContentNotReady { .. } => 3,
        PortalError::Authorization(_) | PortalError::MissingCredential(_) => 4,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let settings = ConfigLoader::resolve(cli.config.as_deref())?;

    match cli.command {
        Commands::Catalogue(CatalogueCommand::Search(args)) => {
            run_catalogue_search(args, &settings)
        }
        command => {
            let store = Store::new(&settings)?;
            let credential = Credential::resolve(cli.api_key.as_deref(), &settings)?;
            let fetcher = HttpFetcher::new(settings.timeout())?;
            let client = PortalClient::new(fetcher, credential, settings, store);
            run_remote(command, client)
        }
    }
}

fn run_remote(command: Commands, mut client: PortalClient<HttpFetcher>) -> miette::Result<()> {
    match command {
        Commands::Search(SearchCommand::Product {
            product_id,
            id_only,
        }) => {
            let product: ProductId = product_id.parse()?;
            if id_only {
                let id = client.first_assembly_for_product(&product)?;
                JsonOutput::print_value(&id).into_diagnostic()
            } else {
                let records = client.search_product(&product)?;
                JsonOutput::print_records(&records).into_diagnostic()
            }
        }
        Commands::Search(SearchCommand::Text { text, id_only }) => {
            let records = client.search_text(&text)?;
            if id_only {
                let ids = PortalClient::<HttpFetcher>::assembly_ids(&records);
                JsonOutput::print_value(&ids).into_diagnostic()
            } else {
                JsonOutput::print_records(&records).into_diagnostic()
            }
        }
        Commands::Metadata { id } => {
            let id: AssemblyId = id.parse()?;
            let record = client.metadata(&id)?;
            JsonOutput::print_record(&record).into_diagnostic()
        }
        Commands::Assembly(args) => {
            let id: AssemblyId = args.id.parse()?;
            if args.sequences {
                let entries = client.fetch_assembly(&id)?;
                return JsonOutput::print_sequences(&entries).into_diagnostic();
            }
            let options = DownloadOptions {
                link_only: args.link_only,
                force: args.force,
                directory: args.dir.map(Utf8PathBuf::from),
            };
            download(&client, ArtifactKind::Assembly, &id, &options)
        }
        Commands::Annotations(args) => {
            let id: AssemblyId = args.id.parse()?;
            if args.print {
                let text = client.fetch_annotations(&id)?;
                return JsonOutput::print_text(&text).into_diagnostic();
            }
            let options = DownloadOptions {
                link_only: args.link_only,
                force: args.force,
                directory: args.dir.map(Utf8PathBuf::from),
            };
            download(&client, ArtifactKind::Annotations, &id, &options)
        }
        Commands::Catalogue(CatalogueCommand::Build { out }) => {
            let out = out.map(Utf8PathBuf::from);
            let path = client.cache_catalogue(out.as_deref())?;
            let records = client.catalogue().map(|c| c.len()).unwrap_or(0);
            JsonOutput::print_value(&serde_json::json!({
                "path": path,
                "records": records,
            }))
            .into_diagnostic()
        }
        Commands::Catalogue(CatalogueCommand::Search(_)) => Err(miette::Report::msg(
            "catalogue search runs offline and needs no portal session",
        )),
    }
}

fn download(
    client: &PortalClient<HttpFetcher>,
    kind: ArtifactKind,
    id: &AssemblyId,
    options: &DownloadOptions,
) -> miette::Result<()> {
    let report = client.download(kind, id, options)?;
    JsonOutput::print_report(&report).into_diagnostic()?;
    if let DownloadOutcome::WriteFailed { message } = &report.outcome {
        tracing::warn!("{kind} for {id} was fetched but not saved: {message}");
    }
    Ok(())
}

fn run_catalogue_search(args: CatalogueSearchArgs, settings: &Settings) -> miette::Result<()> {
    let path = catalogue_search_path(args.catalogue.as_deref(), settings)?;
    let loaded = catalogue::load(&path)?;
    let options = SearchOptions {
        mode: if args.fuzzy {
            SearchMode::Fuzzy
        } else {
            SearchMode::Exact
        },
        threshold: args.threshold.unwrap_or(settings.fuzzy_threshold),
        output: if args.id_only {
            RecordOutput::IdOnly
        } else {
            RecordOutput::Full
        },
    };
    let hits: SearchHits = search_catalogue(&loaded, &args.term, &options, &settings.id_prefix);
    JsonOutput::print_hits(&hits).into_diagnostic()
}

fn catalogue_search_path(
    explicit: Option<&str>,
    settings: &Settings,
) -> Result<Utf8PathBuf, PortalError> {
    if let Some(path) = explicit.map(Utf8PathBuf::from) {
        return Ok(path);
    }
    if let Some(path) = settings.catalogue_path.clone() {
        return Ok(path);
    }
    Ok(Store::new(settings)?.default_catalogue_path())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_catalogue_path_needs_no_store() {
        let mut settings = Settings::default();
        settings.catalogue_path = Some(Utf8PathBuf::from("configured.json.gz"));

        let explicit = catalogue_search_path(Some("/data/portal.json.gz"), &settings).unwrap();
        assert_eq!(explicit, Utf8PathBuf::from("/data/portal.json.gz"));

        let configured = catalogue_search_path(None, &settings).unwrap();
        assert_eq!(configured, Utf8PathBuf::from("configured.json.gz"));
    }
}
