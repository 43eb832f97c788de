use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use dotenvy::dotenv;
use serde::Serialize;
use std::process;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use entertainhub::auth::AuthContext;
use entertainhub::backend::BackendClient;
use entertainhub::catalog::{
    AnimeSource, CatalogBrowser, CatalogItem, CatalogQuery, CatalogSource, ContentKind, Endpoint,
    ListingFilter, MoviesSource, MusicSource, Pager, RapidApiClient, SeriesSource, ServerSort,
    SortKey, PAGE_SIZE,
};
use entertainhub::comments::CommentThread;
use entertainhub::config::Config;
use entertainhub::error::ClientError;
use entertainhub::guard::{Navigation, RouteGuard};
use entertainhub::session::{FileSessionStore, Session};
use entertainhub::validation::Registration;
use entertainhub::wishlist::{filter_by_kind, sort_entries, Wishlist, WishlistSort};

#[derive(Debug, Parser)]
#[command(name = "entertainhub", version, about = "Browse movies, series, music and anime; keep a wishlist")]
struct Cli {
    /// Print JSON instead of text.
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "ENTERTAINHUB_PASSWORD", hide_env_values = true)]
        password: String,
    },
    Register(RegisterArgs),
    Logout,
    Whoami,
    /// List a catalog with local filters and sorting.
    Browse(BrowseArgs),
    Show {
        kind: ContentKind,
        id: String,
    },
    /// Genres available for a catalog.
    Genres {
        kind: ContentKind,
    },
    #[command(subcommand)]
    Wishlist(WishlistCommand),
    #[command(subcommand)]
    Comments(CommentsCommand),
    /// Print what the route guard decides for a path.
    Route {
        path: String,
    },
}

#[derive(Debug, Args)]
struct RegisterArgs {
    #[arg(long)]
    name: String,
    #[arg(long)]
    email: String,
    #[arg(long, env = "ENTERTAINHUB_PASSWORD", hide_env_values = true)]
    password: String,
    /// Defaults to the password.
    #[arg(long)]
    confirm_password: Option<String>,
    #[arg(long)]
    accept_terms: bool,
}

#[derive(Debug, Args)]
struct BrowseArgs {
    kind: ContentKind,
    #[arg(long)]
    genre: Option<String>,
    /// First year of a decade, e.g. 1990.
    #[arg(long)]
    decade: Option<i32>,
    #[arg(long, default_value = "popular")]
    sort: SortKey,
    #[arg(long)]
    search: Option<String>,
    #[arg(long, default_value_t = 1)]
    page: u32,
    #[arg(long, default_value_t = PAGE_SIZE)]
    limit: usize,
    /// Try once more when the provider fails.
    #[arg(long)]
    retry: bool,
}

#[derive(Debug, Subcommand)]
enum WishlistCommand {
    List {
        #[arg(long)]
        kind: Option<ContentKind>,
        #[arg(long, default_value = "recent")]
        sort: WishlistSort,
    },
    Add {
        kind: ContentKind,
        id: String,
    },
    /// Remove by wishlist entry id.
    Remove {
        entry_ids: Vec<String>,
    },
    Toggle {
        kind: ContentKind,
        id: String,
    },
}

#[derive(Debug, Subcommand)]
enum CommentsCommand {
    List {
        content_id: String,
    },
    Post {
        content_id: String,
        rating: u8,
        text: String,
    },
    Delete {
        content_id: String,
        comment_id: String,
    },
}

/// Validation problems exit with 2, everything else with 1.
#[derive(Debug)]
enum CliError {
    Validation(String),
    Failure(anyhow::Error),
}

type CliResult<T> = Result<T, CliError>;

impl CliError {
    const fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) => 2,
            Self::Failure(_) => 1,
        }
    }

    fn display_message(&self) -> String {
        match self {
            Self::Validation(message) => message.clone(),
            Self::Failure(error) => format!("{error:#}"),
        }
    }
}

impl From<ClientError> for CliError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Validation(fields) => Self::Validation(fields.to_string()),
            other => Self::Failure(other.into()),
        }
    }
}

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> Self {
        Self::Failure(err)
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

#[tokio::main]
async fn main() {
    let dotenv_result = dotenv();
    init_tracing();
    match dotenv_result {
        Ok(path) => info!("Loaded environment from {:?}", path),
        Err(e) => warn!("No .env file loaded ({}) - relying on environment", e),
    }
    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        eprintln!("error: {}", err.display_message());
        process::exit(err.exit_code());
    }
}

struct App {
    config: Config,
    backend: Arc<BackendClient>,
    auth: AuthContext,
    json: bool,
}

impl App {
    fn new(config: Config, json: bool) -> Result<Self> {
        let backend = Arc::new(BackendClient::from_config(&config)?);
        let store = Arc::new(FileSessionStore::new(&config.session_file));
        let auth = AuthContext::new(backend.clone(), store);
        auth.hydrate();
        Ok(Self {
            config,
            backend,
            auth,
            json,
        })
    }

    fn session(&self) -> CliResult<Session> {
        Ok(self.auth.require_session()?)
    }

    fn source(&self, kind: ContentKind) -> Result<Arc<dyn CatalogSource>> {
        let key = self.config.require_api_key()?;
        let client = RapidApiClient::new(key, self.config.http_timeout)?;
        let source: Arc<dyn CatalogSource> = match kind {
            ContentKind::Movie => Arc::new(MoviesSource::new(
                client,
                Endpoint::new(&self.config.movies_url)?,
            )),
            ContentKind::Series => Arc::new(SeriesSource::new(
                client,
                Endpoint::new(&self.config.movies_url)?,
            )),
            ContentKind::Music => Arc::new(MusicSource::new(
                client,
                Endpoint::new(&self.config.music_url)?,
            )),
            ContentKind::Anime => Arc::new(self.anime()?),
        };
        Ok(source)
    }

    fn anime(&self) -> Result<AnimeSource> {
        let key = self.config.require_api_key()?;
        Ok(AnimeSource::new(
            RapidApiClient::new(key, self.config.http_timeout)?,
            Endpoint::new(&self.config.anime_url)?,
        ))
    }

    fn print<T: Serialize>(&self, value: &T, text: impl FnOnce() -> String) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            println!("{}", text());
        }
        Ok(())
    }
}

async fn run(cli: Cli) -> CliResult<()> {
    let config = Config::from_env()?;
    config.log_summary();
    let app = App::new(config, cli.json)?;

    match cli.command {
        Command::Login { email, password } => {
            let user = app.auth.login(&email, &password).await?;
            app.print(&user, || format!("Logged in as {} <{}>", user.name, user.email))?;
        }
        Command::Register(args) => {
            let confirm = args.confirm_password.as_deref().unwrap_or(&args.password);
            let form = Registration {
                name: &args.name,
                email: &args.email,
                password: &args.password,
                confirm_password: confirm,
                terms_accepted: args.accept_terms,
            };
            let user = app.auth.submit_registration(&form).await?;
            app.print(&user, || format!("Registered and logged in as {}", user.email))?;
        }
        Command::Logout => {
            app.auth.logout();
            println!("Logged out");
        }
        Command::Whoami => match app.auth.user() {
            Some(user) => app.print(&user, || format!("{} <{}> ({})", user.name, user.email, user.id))?,
            None => println!("Not logged in"),
        },
        Command::Browse(args) => browse(&app, args).await?,
        Command::Show { kind, id } => {
            let item = app.source(kind)?.fetch_one(&id).await?;
            app.print(&item, || describe(&item))?;
        }
        Command::Genres { kind } => {
            let genres = match kind {
                ContentKind::Anime => app.anime()?.genres().await?,
                other => {
                    let page = app.source(other)?.fetch(&CatalogQuery::default()).await?;
                    entertainhub::catalog::genres_of(&page.items)
                }
            };
            app.print(&genres, || genres.join("\n"))?;
        }
        Command::Wishlist(cmd) => wishlist(&app, cmd).await?,
        Command::Comments(cmd) => comments(&app, cmd).await?,
        Command::Route { path } => {
            let mut rx = app.auth.subscribe();
            let decision = RouteGuard::resolve(&mut rx, &path).await;
            let text = match &decision {
                Navigation::Loading => "loading".to_string(),
                Navigation::Render(route) => format!("render {}", route.path()),
                Navigation::Redirect(to) => format!("redirect {to}"),
            };
            println!("{text}");
        }
    }
    Ok(())
}

async fn browse(app: &App, args: BrowseArgs) -> CliResult<()> {
    let source = app.source(args.kind)?;
    let server_side = matches!(args.kind, ContentKind::Anime | ContentKind::Music);
    let query = CatalogQuery {
        page: if server_side { args.page.max(1) } else { 1 },
        search: args.search.clone().filter(|_| server_side),
        genre: args.genre.clone().filter(|_| args.kind == ContentKind::Anime),
        sort: anime_sort(args.kind, args.sort),
        ..CatalogQuery::default()
    };
    let mut browser = CatalogBrowser::new(source);
    if let Err(e) = browser.load(query).await {
        if !(args.retry && e.is_retryable()) {
            return Err(e.into());
        }
        warn!("Retrying after: {}", e);
        browser.retry().await?;
    }
    browser.set_filter(ListingFilter {
        genre: args.genre.clone().filter(|_| args.kind != ContentKind::Music),
        decade: args.decade,
        search: args.search.clone().filter(|_| !server_side),
    });
    browser.set_sort(args.sort);

    let listing = browser.listing();
    let matching = listing.len();
    let mut shown = if server_side {
        listing
    } else {
        Pager::default().page(&listing, args.page as usize).to_vec()
    };
    shown.truncate(args.limit);

    app.print(&shown, || {
        let mut lines = shown.iter().map(summary_line).collect::<Vec<_>>();
        let pager = Pager::default();
        let footer = match browser.total_pages() {
            Some(total) if server_side => format!("page {} of {}", browser.page(), total),
            _ if server_side && browser.has_more() => {
                format!("page {} (more available)", browser.page())
            }
            _ if server_side => format!("page {}", browser.page()),
            _ => format!(
                "page {} of {} ({} matching)",
                pager.clamp(args.page as usize, matching),
                pager.total_pages(matching),
                matching
            ),
        };
        lines.push(footer);
        lines.join("\n")
    })?;
    Ok(())
}

fn anime_sort(kind: ContentKind, sort: SortKey) -> Option<ServerSort> {
    if kind != ContentKind::Anime {
        return None;
    }
    let field = match sort {
        SortKey::Rank => "ranking",
        SortKey::Title => "title",
        _ => return None,
    };
    Some(ServerSort {
        field: field.to_string(),
        descending: false,
    })
}

fn summary_line(item: &CatalogItem) -> String {
    let mut parts = vec![format!("[{}] {}", item.id(), item.title())];
    if let Some(year) = item.year_label() {
        parts.push(format!("({year})"));
    }
    if let Some(rating) = item.rating() {
        parts.push(format!("★ {rating:.1}"));
    }
    if let Some(rank) = item.rank() {
        parts.push(format!("#{rank}"));
    }
    if let CatalogItem::Music(track) = item {
        parts.push(format!("by {} · {} plays", track.artist, track.plays));
    }
    parts.join(" ")
}

fn describe(item: &CatalogItem) -> String {
    let mut lines = vec![summary_line(item)];
    if !item.genres().is_empty() {
        lines.push(format!("Genres: {}", item.genres().join(", ")));
    }
    match item {
        CatalogItem::Series(s) => {
            if let Some(seasons) = s.seasons {
                lines.push(format!("Seasons: {seasons}"));
            }
            if let Some(status) = s.status {
                lines.push(format!("Status: {status:?}"));
            }
        }
        CatalogItem::Anime(a) => {
            if let Some(episodes) = a.episodes {
                lines.push(format!("Episodes: {episodes}"));
            }
            if let Some(status) = &a.status {
                lines.push(format!("Status: {status}"));
            }
        }
        CatalogItem::Music(t) => {
            if let Some(album) = &t.album {
                lines.push(format!("Album: {album}"));
            }
        }
        CatalogItem::Movie(_) => {}
    }
    if let Some(description) = item.description() {
        lines.push(String::new());
        lines.push(description.to_string());
    }
    lines.join("\n")
}

async fn wishlist(app: &App, cmd: WishlistCommand) -> CliResult<()> {
    let session = app.session()?;
    let mut list = Wishlist::new(app.backend.clone());
    list.refresh(&session).await?;
    match cmd {
        WishlistCommand::List { kind, sort } => {
            let mut entries = filter_by_kind(list.entries(), kind);
            sort_entries(&mut entries, sort);
            app.print(&entries, || {
                entries
                    .iter()
                    .map(|e| format!("{}  {:<6} {} ({})", e.id, e.source_type, e.title, e.source_id))
                    .collect::<Vec<_>>()
                    .join("\n")
            })?;
        }
        WishlistCommand::Add { kind, id } => {
            let item = app.source(kind)?.fetch_one(&id).await?;
            if list.contains(item.id(), kind) {
                println!("Already in wishlist: {}", item.title());
            } else {
                list.add(&session, &item).await?;
                println!("Added {} ({} items)", item.title(), list.len());
            }
        }
        WishlistCommand::Remove { entry_ids } => {
            if entry_ids.is_empty() {
                return Err(CliError::Validation("no wishlist entry ids given".to_string()));
            }
            let removed = list.remove_many(&session, &entry_ids).await?;
            println!("Removed {removed} ({} left)", list.len());
        }
        WishlistCommand::Toggle { kind, id } => {
            let item = app.source(kind)?.fetch_one(&id).await?;
            let listed = list.toggle(&session, &item).await?;
            let verb = if listed { "Added" } else { "Removed" };
            println!("{verb} {}", item.title());
        }
    }
    Ok(())
}

async fn comments(app: &App, cmd: CommentsCommand) -> CliResult<()> {
    let session = app.session()?;
    match cmd {
        CommentsCommand::List { content_id } => {
            let mut thread = CommentThread::new(app.backend.clone(), content_id);
            thread.load(&session).await?;
            let average = thread.average_rating();
            app.print(&thread.comments(), || {
                let mut lines = thread
                    .comments()
                    .iter()
                    .map(|c| format!("{} [{}/5] {}", c.id, c.rating, c.comment))
                    .collect::<Vec<_>>();
                if let Some(avg) = average {
                    lines.push(format!("average {avg:.1}"));
                }
                lines.join("\n")
            })?;
        }
        CommentsCommand::Post {
            content_id,
            rating,
            text,
        } => {
            let mut thread = CommentThread::new(app.backend.clone(), content_id);
            thread.post(&session, &text, rating).await?;
            println!("Posted ({} comments)", thread.comments().len());
        }
        CommentsCommand::Delete {
            content_id,
            comment_id,
        } => {
            let mut thread = CommentThread::new(app.backend.clone(), content_id);
            thread.load(&session).await?;
            thread.delete(&session, &comment_id).await?;
            println!("Deleted {comment_id}");
        }
    }
    Ok(())
}
