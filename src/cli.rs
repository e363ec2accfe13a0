use std::error::Error;

use atty::Stream;
use benkyou_rs::query::{self, QueryParams, SortDirection};
use benkyou_rs::{GrammarIndex, KanjiIndex, Level};
use clap::{Args, Parser, Subcommand};
use serde_json::json;

#[derive(Parser, Debug)]
#[command(name = "benkyou-rs", about = "Browse the bundled JLPT catalogs", version)]
pub struct Cli {
    /// Emit JSON instead of human-readable tables.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Operations on the grammar catalogs.
    #[command(subcommand)]
    Grammar(CatalogCommand),
    /// Operations on the kanji catalogs.
    #[command(subcommand)]
    Kanji(CatalogCommand),
    /// List the five levels with their catalog sizes.
    Levels,
    /// Serve the web interface.
    #[cfg(feature = "web")]
    Serve(ServeArgs),
}

#[derive(Subcommand, Debug)]
enum CatalogCommand {
    /// Print a filtered page of a level's entries.
    List {
        /// Level label (N5..N1).
        level: String,
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Print one entry with its neighbors in the filtered view.
    Show {
        /// Level label (N5..N1).
        level: String,
        /// Entry identifier, e.g. N5-3.
        id: String,
        #[command(flatten)]
        filter: FilterArgs,
    },
}

#[derive(Args, Debug)]
struct FilterArgs {
    /// Case-insensitive search text.
    #[arg(short, long)]
    query: Option<String>,
    /// Sort direction: asc or desc.
    #[arg(long, default_value = "asc")]
    sort: String,
    /// Lowest ordinal to keep.
    #[arg(long)]
    from: Option<u32>,
    /// Highest ordinal to keep.
    #[arg(long)]
    to: Option<u32>,
    /// Page size (one of 10, 20, 30, 50).
    #[arg(long, default_value_t = query::DEFAULT_PAGE_SIZE)]
    per: u32,
    /// Page number.
    #[arg(long, default_value_t = 1)]
    page: u32,
}

impl FilterArgs {
    fn to_params(&self) -> QueryParams {
        // Same lenient normalization as the URL codec: bad values widen the
        // view instead of failing.
        QueryParams {
            search: self.query.clone().unwrap_or_default(),
            sort: if self.sort == "desc" {
                SortDirection::Desc
            } else {
                SortDirection::Asc
            },
            from: self.from,
            to: self.to,
            per: if query::PAGE_SIZES.contains(&self.per) {
                self.per
            } else {
                query::DEFAULT_PAGE_SIZE
            },
            page: self.page.max(1),
            ..QueryParams::default()
        }
    }
}

#[cfg(feature = "web")]
#[derive(Args, Debug)]
struct ServeArgs {
    /// Address to bind.
    #[arg(long, default_value = "127.0.0.1:8080")]
    addr: std::net::SocketAddr,
    /// Page chrome: tailwind or bootstrap.
    #[arg(long, default_value = "tailwind")]
    theme: String,
    /// Base URL used in absolute links (sitemap).
    #[arg(long, default_value = "http://127.0.0.1:8080")]
    base_url: String,
}

pub fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    match cli.command {
        Command::Grammar(CatalogCommand::List { level, filter }) => {
            handle_grammar_list(&level, &filter, cli.json)
        }
        Command::Grammar(CatalogCommand::Show { level, id, filter }) => {
            handle_grammar_show(&level, &id, &filter, cli.json)
        }
        Command::Kanji(CatalogCommand::List { level, filter }) => {
            handle_kanji_list(&level, &filter, cli.json)
        }
        Command::Kanji(CatalogCommand::Show { level, id, filter }) => {
            handle_kanji_show(&level, &id, &filter, cli.json)
        }
        Command::Levels => handle_levels(cli.json),
        #[cfg(feature = "web")]
        Command::Serve(args) => handle_serve(args),
    }
}

fn handle_grammar_list(
    level: &str,
    filter: &FilterArgs,
    as_json: bool,
) -> Result<(), Box<dyn Error>> {
    let params = filter.to_params();
    let filtered = query::apply(GrammarIndex::entries(level), &params);
    let page = query::paginate(&filtered, params.per, params.page);

    if as_json {
        let payload = json!({
            "level": level,
            "total": page.total,
            "total_pages": page.total_pages,
            "page": page.page,
            "items": page.items,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        let rows: Vec<[String; 3]> = page
            .items
            .iter()
            .map(|entry| {
                [
                    entry.id.clone(),
                    entry.pattern.clone(),
                    entry.meaning.clone(),
                ]
            })
            .collect();
        print_rows(&format!("{level} grammar"), ["ID", "PATTERN", "MEANING"], &rows);
        print_page_footer(page.page, page.total_pages, page.total);
    }
    Ok(())
}

fn handle_kanji_list(
    level: &str,
    filter: &FilterArgs,
    as_json: bool,
) -> Result<(), Box<dyn Error>> {
    let params = filter.to_params();
    let filtered = query::apply(KanjiIndex::entries(level), &params);
    let page = query::paginate(&filtered, params.per, params.page);

    if as_json {
        let payload = json!({
            "level": level,
            "total": page.total,
            "total_pages": page.total_pages,
            "page": page.page,
            "items": page.items,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        let rows: Vec<[String; 3]> = page
            .items
            .iter()
            .map(|entry| {
                [
                    entry.id.clone(),
                    entry.kanji.clone(),
                    format!(
                        "{} (ON: {} / KUN: {})",
                        entry.meaning,
                        entry.onyomi.join("、"),
                        entry.kunyomi.join("、")
                    ),
                ]
            })
            .collect();
        print_rows(&format!("{level} kanji"), ["ID", "KANJI", "MEANING"], &rows);
        print_page_footer(page.page, page.total_pages, page.total);
    }
    Ok(())
}

fn handle_grammar_show(
    level: &str,
    id: &str,
    filter: &FilterArgs,
    as_json: bool,
) -> Result<(), Box<dyn Error>> {
    let params = filter.to_params();
    let filtered = query::apply(GrammarIndex::entries(level), &params);
    let found = query::locate(&filtered, id)
        .ok_or_else(|| format!("No entry {id:?} in the current view of level {level}"))?;

    if as_json {
        let payload = json!({
            "level": level,
            "index": found.index,
            "total": filtered.len(),
            "prev": found.previous.map(|e| &e.id),
            "next": found.next.map(|e| &e.id),
            "entry": found.item,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    let entry = found.item;
    println!("{} [{}]  ({} / {})", entry.pattern, entry.id, found.index + 1, filtered.len());
    println!("Meaning: {}", entry.meaning);
    println!("Usage:   {}", entry.explanation);
    if !entry.examples.is_empty() {
        println!("\nExamples:");
        for example in &entry.examples {
            println!("  {}", example.sentence);
            println!("    {}", example.translation);
        }
    }
    print_neighbors(found.previous.map(|e| e.id.as_str()), found.next.map(|e| e.id.as_str()));
    Ok(())
}

fn handle_kanji_show(
    level: &str,
    id: &str,
    filter: &FilterArgs,
    as_json: bool,
) -> Result<(), Box<dyn Error>> {
    let params = filter.to_params();
    let filtered = query::apply(KanjiIndex::entries(level), &params);
    let found = query::locate(&filtered, id)
        .ok_or_else(|| format!("No entry {id:?} in the current view of level {level}"))?;

    if as_json {
        let payload = json!({
            "level": level,
            "index": found.index,
            "total": filtered.len(),
            "prev": found.previous.map(|e| &e.id),
            "next": found.next.map(|e| &e.id),
            "entry": found.item,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    let entry = found.item;
    println!("{} [{}]  ({} / {})", entry.kanji, entry.id, found.index + 1, filtered.len());
    println!("Meaning: {}", entry.meaning);
    println!("ON:  {}", entry.onyomi.join("、"));
    println!("KUN: {}", entry.kunyomi.join("、"));
    if !entry.vocab.is_empty() {
        println!("\nVocabulary:");
        for word in &entry.vocab {
            println!("  {}（{}） {}", word.word, word.reading, word.translation);
        }
    }
    if !entry.examples.is_empty() {
        println!("\nExamples:");
        for example in &entry.examples {
            println!("  {}", example.sentence);
            println!("    {}", example.translation);
        }
    }
    print_neighbors(found.previous.map(|e| e.id.as_str()), found.next.map(|e| e.id.as_str()));
    Ok(())
}

fn handle_levels(as_json: bool) -> Result<(), Box<dyn Error>> {
    if as_json {
        let payload: Vec<_> = Level::ALL
            .iter()
            .map(|level| {
                json!({
                    "level": level.as_str(),
                    "grammar": GrammarIndex::entries(level.as_str()).len(),
                    "kanji": KanjiIndex::entries(level.as_str()).len(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        let rows: Vec<[String; 3]> = Level::ALL
            .iter()
            .map(|level| {
                [
                    level.to_string(),
                    GrammarIndex::entries(level.as_str()).len().to_string(),
                    KanjiIndex::entries(level.as_str()).len().to_string(),
                ]
            })
            .collect();
        print_rows("Levels", ["LEVEL", "GRAMMAR", "KANJI"], &rows);
    }
    Ok(())
}

#[cfg(feature = "web")]
fn handle_serve(args: ServeArgs) -> Result<(), Box<dyn Error>> {
    use benkyou_rs::web::{self, WebConfig, WebTheme};
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let theme = if args.theme == "bootstrap" {
        WebTheme::Bootstrap
    } else {
        WebTheme::Tailwind
    };
    let config = WebConfig {
        addr: args.addr,
        theme,
        base_url: args.base_url,
    };
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(web::serve(config))?;
    Ok(())
}

fn print_rows<const N: usize>(title: &str, header: [&str; N], rows: &[[String; N]]) {
    if rows.is_empty() {
        println!("{title}: no results.");
        return;
    }
    if !stdout_is_tty() {
        // Keep piped output machine-friendly.
        for row in rows {
            println!("{}", row.join("\t"));
        }
        return;
    }
    let mut widths = header.map(str::len);
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.len());
        }
    }
    println!("{title}:");
    for (&width, cell) in widths.iter().zip(header) {
        print!("{cell:<width$}  ");
    }
    println!();
    for &width in &widths {
        print!("{:-<width$}  ", "");
    }
    println!();
    for row in rows {
        for (&width, cell) in widths.iter().zip(row) {
            print!("{cell:<width$}  ");
        }
        println!();
    }
}

fn print_page_footer(page: u32, total_pages: u32, total: usize) {
    if stdout_is_tty() {
        println!("\nPage {page} of {total_pages} ({total} matching)");
    }
}

fn print_neighbors(prev: Option<&str>, next: Option<&str>) {
    let prev = prev.unwrap_or("—");
    let next = next.unwrap_or("—");
    println!("\nPrev: {prev}  Next: {next}");
}

fn stdout_is_tty() -> bool {
    atty::is(Stream::Stdout)
}
