use crate::query::{self, Page, QueryParams, SortDirection, ViewMode, PAGE_SIZES};
use crate::{GrammarEntry, GrammarIndex, KanjiEntry, KanjiIndex, Level};
use askama::Template;
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
};
use serde::Serialize;
use serde_json::json;
use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::compression::CompressionLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::info;

type SharedState = Arc<AppState>;

#[derive(Clone)]
pub struct AppState {
    pub theme: WebTheme,
    pub base_url: String,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
pub enum WebTheme {
    #[default]
    Tailwind,
    Bootstrap,
}

impl fmt::Display for WebTheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WebTheme::Tailwind => write!(f, "tailwind"),
            WebTheme::Bootstrap => write!(f, "bootstrap"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Chrome {
    use_tailwind: bool,
    use_bootstrap: bool,
    body_class: &'static str,
    main_class: &'static str,
    card_class: &'static str,
    eyebrow_class: &'static str,
    headline_class: &'static str,
    lede_class: &'static str,
    button_class: &'static str,
    input_class: &'static str,
    tile_class: &'static str,
}

impl Chrome {
    fn new(theme: WebTheme) -> Self {
        match theme {
            WebTheme::Tailwind => Self {
                use_tailwind: true,
                use_bootstrap: false,
                body_class: "bg-stone-50 text-stone-900",
                main_class: "min-h-screen flex flex-col items-center py-10 px-4",
                card_class: "max-w-4xl w-full space-y-6",
                eyebrow_class: "uppercase tracking-wide text-sm text-stone-500",
                headline_class: "text-3xl font-extrabold tracking-tight",
                lede_class: "text-base text-stone-600",
                button_class: "inline-flex items-center rounded-md bg-stone-900 px-3 py-2 text-white text-sm font-semibold shadow hover:bg-stone-700 transition-colors",
                input_class: "rounded-md border border-stone-300 px-3 py-2",
                tile_class: "block bg-white rounded-lg border border-stone-200 p-4 shadow-sm hover:shadow transition",
            },
            WebTheme::Bootstrap => Self {
                use_tailwind: false,
                use_bootstrap: true,
                body_class: "bg-light text-dark",
                main_class: "container py-5",
                card_class: "mx-auto col-lg-9",
                eyebrow_class: "text-uppercase text-muted mb-2",
                headline_class: "display-6 fw-bold",
                lede_class: "lead mb-4",
                button_class: "btn btn-dark btn-sm",
                input_class: "form-control",
                tile_class: "card card-body mb-2 text-decoration-none",
            },
        }
    }

    fn head_tags(theme: WebTheme) -> (&'static str, &'static str) {
        match theme {
            WebTheme::Tailwind => (
                r#"<script src="https://cdn.jsdelivr.net/npm/@tailwindcss/browser@4"></script>"#,
                "",
            ),
            WebTheme::Bootstrap => (
                r#"<link href="https://cdn.jsdelivr.net/npm/bootstrap@5.3.8/dist/css/bootstrap.min.css" rel="stylesheet">"#,
                r#"<script src="https://cdn.jsdelivr.net/npm/bootstrap@5.3.8/dist/js/bootstrap.bundle.min.js"></script>"#,
            ),
        }
    }
}

#[derive(Clone)]
pub struct WebConfig {
    pub addr: SocketAddr,
    pub theme: WebTheme,
    pub base_url: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            theme: WebTheme::default(),
            base_url: "http://127.0.0.1:8080".to_string(),
        }
    }
}

#[derive(Debug)]
pub enum WebError {
    Io(std::io::Error),
}

impl fmt::Display for WebError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WebError::Io(err) => write!(f, "io error: {err}"),
        }
    }
}

impl std::error::Error for WebError {}

impl From<std::io::Error> for WebError {
    fn from(value: std::io::Error) -> Self {
        WebError::Io(value)
    }
}

pub async fn serve(config: WebConfig) -> Result<(), WebError> {
    let state = Arc::new(AppState {
        theme: config.theme,
        base_url: config.base_url.clone(),
    });
    let router = build_router(state);
    info!(
        %config.addr,
        theme = ?config.theme,
        base = %config.base_url,
        "Binding HTTP listener"
    );
    let listener = TcpListener::bind(config.addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("HTTP server exited");
    Ok(())
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let payload = json!({ "error": self.message });
        (self.status, Json(payload)).into_response()
    }
}

fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/grammar/:level", get(grammar_list_html))
        .route("/grammar/:level/:id", get(grammar_detail_html))
        .route("/kanji/:level", get(kanji_list_html))
        .route("/kanji/:level/:id", get(kanji_detail_html))
        .route("/api/grammar/:level", get(api_grammar_list))
        .route("/api/grammar/:level/:id", get(api_grammar_detail))
        .route("/api/kanji/:level", get(api_kanji_list))
        .route("/api/kanji/:level/:id", get(api_kanji_detail))
        .route("/healthz", get(health))
        .route("/sitemap.xml", get(sitemap_xml))
        .with_state(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().include_headers(true))
                .on_response(DefaultOnResponse::new().include_headers(true)),
        )
        .layer(CompressionLayer::new())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = signal::ctrl_c().await;
    };
    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        if let Ok(mut stream) = signal(SignalKind::terminate()) {
            let _ = stream.recv().await;
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

fn params_from(raw: &HashMap<String, String>) -> QueryParams {
    QueryParams::parse(raw.iter().map(|(k, v)| (k.as_str(), v.as_str())))
}

async fn home(State(state): State<SharedState>) -> impl IntoResponse {
    Html(render_home(state.theme))
}

fn render_home(theme: WebTheme) -> String {
    let chrome = Chrome::new(theme);
    let (css_tag, js_tag) = Chrome::head_tags(theme);
    let mut cards = String::new();
    for level in Level::ALL {
        let grammar_count = GrammarIndex::entries(level.as_str()).len();
        let kanji_count = KanjiIndex::entries(level.as_str()).len();
        cards.push_str(&format!(
            r#"<div class="{tile}">
              <p class="{eyebrow}">{level}</p>
              <div class="flex gap-3 d-flex">
                <a href="/grammar/{level}" class="{button}">Grammar ({grammar_count})</a>
                <a href="/kanji/{level}" class="{button}">Kanji ({kanji_count})</a>
              </div>
            </div>"#,
            tile = chrome.tile_class,
            eyebrow = chrome.eyebrow_class,
            button = chrome.button_class,
        ));
    }
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="utf-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1" />
    <title>Benkyou • JLPT Study</title>
    {css_tag}
    {js_tag}
  </head>
  <body class="{body_class}">
    <main class="{main_class}">
      <div class="{card_class}">
        <div>
          <p class="{eyebrow_class}">benkyou v{version}</p>
          <h1 class="{headline_class}">JLPT grammar and kanji, level by level.</h1>
          <p class="{lede_class}">Browse the bundled reference catalogs. Search, filter by number, and step through entries one at a time.</p>
        </div>
        <div class="grid gap-3 md:grid-cols-2 row row-cols-1 row-cols-md-2 g-3">{cards}</div>
      </div>
    </main>
  </body>
</html>"#,
        body_class = chrome.body_class,
        main_class = chrome.main_class,
        card_class = chrome.card_class,
        eyebrow_class = chrome.eyebrow_class,
        headline_class = chrome.headline_class,
        lede_class = chrome.lede_class,
        version = env!("CARGO_PKG_VERSION"),
    )
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok", "service": "benkyou-web" }))
}

struct PerOption {
    value: u32,
    selected: bool,
}

struct ListRow {
    number: String,
    href: String,
    title: String,
    subtitle: String,
    detail: String,
    id: String,
}

#[derive(Template)]
#[template(
    source = r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="utf-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1" />
    <title>Benkyou • {{ title }}</title>
    {% if chrome.use_tailwind %}
    <script src="https://cdn.jsdelivr.net/npm/@tailwindcss/browser@4"></script>
    {% endif %}
    {% if chrome.use_bootstrap %}
    <link href="https://cdn.jsdelivr.net/npm/bootstrap@5.3.8/dist/css/bootstrap.min.css" rel="stylesheet">
    <script src="https://cdn.jsdelivr.net/npm/bootstrap@5.3.8/dist/js/bootstrap.bundle.min.js"></script>
    {% endif %}
  </head>
  <body class="{{ chrome.body_class }}">
    <main class="{{ chrome.main_class }}">
      <div class="{{ chrome.card_class }}">
        <div class="flex items-baseline gap-3 d-flex align-items-baseline">
          <a href="/" class="{{ chrome.button_class }}">←</a>
          <div>
            <h1 class="{{ chrome.headline_class }}">{{ title }}</h1>
            <p class="{{ chrome.lede_class }}">Showing {{ shown }} of {{ total }} items</p>
          </div>
          <a href="{{ reset_href }}" class="{{ chrome.button_class }} ml-auto ms-auto">Reset</a>
        </div>

        <form method="get" action="{{ list_path }}" class="bg-white rounded-lg border border-stone-200 p-4 space-y-3 card card-body">
          <div class="flex flex-wrap gap-2 d-flex">
            <input name="q" value="{{ search }}" placeholder="Search… ({{ search_hint }})" class="{{ chrome.input_class }} flex-1" />
            <select name="sort" class="{{ chrome.input_class }}">
              <option value="asc" {% if sort_desc %}{% else %}selected{% endif %}>ID ASC</option>
              <option value="desc" {% if sort_desc %}selected{% endif %}>ID DESC</option>
            </select>
            <select name="per" class="{{ chrome.input_class }}">
              {% for option in per_options %}
              <option value="{{ option.value }}" {% if option.selected %}selected{% endif %}>{{ option.value }} / page</option>
              {% endfor %}
            </select>
            <button type="submit" class="{{ chrome.button_class }}">Apply</button>
          </div>
          <div class="flex flex-wrap gap-2 items-center d-flex align-items-center">
            <span class="text-sm text-stone-500">Range (number after the dash):</span>
            <input name="from" value="{{ from }}" placeholder="From (e.g. 2)" inputmode="numeric" class="{{ chrome.input_class }} w-28" />
            <input name="to" value="{{ to }}" placeholder="To (e.g. 40)" inputmode="numeric" class="{{ chrome.input_class }} w-28" />
            <input type="hidden" name="view" value="{{ view_value }}" />
            <span class="ml-auto ms-auto text-sm">
              <a href="{{ view_list_href }}" class="{{ chrome.button_class }}">List</a>
              <a href="{{ view_grid_href }}" class="{{ chrome.button_class }}">Grid</a>
            </span>
          </div>
        </form>

        {% if rows.len() == 0 %}
        <p>No results.</p>
        {% else %}
        <div class="{{ rows_container_class }}">
          {% for row in rows %}
          <a href="{{ row.href }}" class="{{ chrome.tile_class }}">
            <div class="flex gap-3 items-baseline d-flex align-items-baseline">
              <span class="font-bold text-stone-400">{{ row.number }}</span>
              <span class="flex-1">
                <span class="block font-bold text-lg">{{ row.title }}</span>
                <span class="block text-stone-600">{{ row.subtitle }}</span>
                {% if row.detail.len() > 0 %}
                <span class="block text-xs text-stone-500 mt-1">{{ row.detail }}</span>
                {% endif %}
              </span>
              <span class="text-xs text-stone-400">{{ row.id }}</span>
            </div>
          </a>
          {% endfor %}
        </div>
        {% endif %}

        <div class="flex gap-2 items-center d-flex align-items-center">
          {% if prev_href.is_some() %}
          <a href="{{ prev_href.as_ref().unwrap() }}" class="{{ chrome.button_class }}">← Prev page</a>
          {% endif %}
          <span class="text-sm text-stone-500">Page {{ page }} of {{ total_pages }}</span>
          {% if next_href.is_some() %}
          <a href="{{ next_href.as_ref().unwrap() }}" class="{{ chrome.button_class }}">Next page →</a>
          {% endif %}
        </div>
      </div>
    </main>
  </body>
</html>"#,
    ext = "html"
)]
struct ListTemplate {
    chrome: Chrome,
    title: String,
    list_path: String,
    reset_href: String,
    search: String,
    search_hint: &'static str,
    sort_desc: bool,
    from: String,
    to: String,
    per_options: Vec<PerOption>,
    view_value: &'static str,
    view_list_href: String,
    view_grid_href: String,
    rows_container_class: String,
    rows: Vec<ListRow>,
    shown: usize,
    total: usize,
    page: u32,
    total_pages: u32,
    prev_href: Option<String>,
    next_href: Option<String>,
}

impl ListTemplate {
    fn build(
        chrome: Chrome,
        domain: &'static str,
        search_hint: &'static str,
        level: &str,
        params: &QueryParams,
        page: &Page<'_, impl ListRowSource>,
    ) -> Self {
        let list_path = format!("/{domain}/{level}");
        let effective = params.with_page(page.page);
        let rows = page
            .items
            .iter()
            .enumerate()
            .map(|(i, entry)| {
                let global_index = (page.page as usize - 1) * params.per.max(1) as usize + i + 1;
                entry.list_row(&list_path, &effective, global_index)
            })
            .collect();
        let rows_container_class = match params.view {
            ViewMode::List => "space-y-2".to_string(),
            ViewMode::Grid => "grid gap-2 md:grid-cols-3 row row-cols-1 row-cols-md-3 g-2".to_string(),
        };
        let list_view = QueryParams {
            view: ViewMode::List,
            ..effective.clone()
        };
        let grid_view = QueryParams {
            view: ViewMode::Grid,
            ..effective.clone()
        };
        Self {
            chrome,
            title: format!("{level} {}", capitalize(domain)),
            reset_href: list_path.clone(),
            search: params.search.trim().to_string(),
            search_hint,
            sort_desc: params.sort == SortDirection::Desc,
            from: params.from.map(|n| n.to_string()).unwrap_or_default(),
            to: params.to.map(|n| n.to_string()).unwrap_or_default(),
            per_options: PAGE_SIZES
                .iter()
                .map(|&value| PerOption {
                    value,
                    selected: value == params.per,
                })
                .collect(),
            view_value: params.view.query_value(),
            view_list_href: format!("{list_path}{}", list_view.query_string()),
            view_grid_href: format!("{list_path}{}", grid_view.query_string()),
            rows_container_class,
            rows,
            shown: page.items.len(),
            total: page.total,
            page: page.page,
            total_pages: page.total_pages,
            prev_href: (page.page > 1)
                .then(|| format!("{list_path}{}", effective.with_page(page.page - 1).query_string())),
            next_href: (page.page < page.total_pages)
                .then(|| format!("{list_path}{}", effective.with_page(page.page + 1).query_string())),
            list_path,
        }
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// How an entry presents itself as one row of the list screen.
trait ListRowSource {
    fn list_row(&self, list_path: &str, params: &QueryParams, global_index: usize) -> ListRow;
}

impl ListRowSource for GrammarEntry {
    fn list_row(&self, list_path: &str, params: &QueryParams, global_index: usize) -> ListRow {
        ListRow {
            number: format!("{global_index}."),
            href: format!("{list_path}/{}{}", self.id, params.query_string()),
            title: self.pattern.clone(),
            subtitle: self.meaning.clone(),
            detail: String::new(),
            id: self.id.clone(),
        }
    }
}

impl ListRowSource for KanjiEntry {
    fn list_row(&self, list_path: &str, params: &QueryParams, _global_index: usize) -> ListRow {
        let number = query::ordinal(&self.id)
            .map(|n| format!("{n}."))
            .unwrap_or_else(|| "—".to_string());
        ListRow {
            number,
            href: format!("{list_path}/{}{}", self.id, params.query_string()),
            title: self.kanji.clone(),
            subtitle: self.meaning.clone(),
            detail: format!(
                "ON: {} / KUN: {}",
                self.onyomi.join("、"),
                self.kunyomi.join("、")
            ),
            id: self.id.clone(),
        }
    }
}

async fn grammar_list_html(
    State(state): State<SharedState>,
    Path(level): Path<String>,
    Query(raw): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let params = params_from(&raw);
    let filtered = query::apply(GrammarIndex::entries(&level), &params);
    let page = query::paginate(&filtered, params.per, params.page);
    let template = ListTemplate::build(
        Chrome::new(state.theme),
        "grammar",
        "pattern / meaning / explanation",
        &level,
        &params,
        &page,
    );
    Html(
        template
            .render()
            .unwrap_or_else(|err| render_error_page(state.theme, err.to_string(), "/")),
    )
}

async fn kanji_list_html(
    State(state): State<SharedState>,
    Path(level): Path<String>,
    Query(raw): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let params = params_from(&raw);
    let filtered = query::apply(KanjiIndex::entries(&level), &params);
    let page = query::paginate(&filtered, params.per, params.page);
    let template = ListTemplate::build(
        Chrome::new(state.theme),
        "kanji",
        "kanji / meaning / reading",
        &level,
        &params,
        &page,
    );
    Html(
        template
            .render()
            .unwrap_or_else(|err| render_error_page(state.theme, err.to_string(), "/")),
    )
}

struct DetailNav {
    back_href: String,
    prev_href: Option<String>,
    next_href: Option<String>,
    position: usize,
    total: usize,
    sort_label: String,
}

fn detail_nav<T: query::Queryable>(
    domain: &str,
    level: &str,
    params: &QueryParams,
    filtered: &[&T],
    found: &query::Located<'_, T>,
) -> DetailNav {
    let keep = params.query_string();
    let list_path = format!("/{domain}/{level}");
    DetailNav {
        back_href: format!("{list_path}{keep}"),
        prev_href: found
            .previous
            .map(|entry| format!("{list_path}/{}{keep}", entry.id())),
        next_href: found
            .next
            .map(|entry| format!("{list_path}/{}{keep}", entry.id())),
        position: found.index + 1,
        total: filtered.len(),
        sort_label: params.sort.to_string(),
    }
}

#[derive(Template)]
#[template(
    source = r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="utf-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1" />
    <title>Benkyou • {{ entry.pattern }}</title>
    {% if chrome.use_tailwind %}
    <script src="https://cdn.jsdelivr.net/npm/@tailwindcss/browser@4"></script>
    {% endif %}
    {% if chrome.use_bootstrap %}
    <link href="https://cdn.jsdelivr.net/npm/bootstrap@5.3.8/dist/css/bootstrap.min.css" rel="stylesheet">
    <script src="https://cdn.jsdelivr.net/npm/bootstrap@5.3.8/dist/js/bootstrap.bundle.min.js"></script>
    {% endif %}
  </head>
  <body class="{{ chrome.body_class }}">
    <main class="{{ chrome.main_class }}">
      <div class="{{ chrome.card_class }}">
        <div class="flex flex-wrap gap-2 items-center d-flex align-items-center">
          <a href="{{ nav.back_href }}" class="{{ chrome.button_class }}">← Back to List</a>
          {% if nav.prev_href.is_some() %}
          <a href="{{ nav.prev_href.as_ref().unwrap() }}" class="{{ chrome.button_class }}">← Prev</a>
          {% endif %}
          {% if nav.next_href.is_some() %}
          <a href="{{ nav.next_href.as_ref().unwrap() }}" class="{{ chrome.button_class }}">Next →</a>
          {% endif %}
          <span class="ml-auto ms-auto text-sm text-stone-500">{{ nav.position }} / {{ nav.total }} • Order: {{ nav.sort_label }}</span>
        </div>

        <article class="{{ chrome.tile_class }}">
          <div class="flex justify-between text-xs text-stone-400 d-flex justify-content-between">
            <span>{{ entry.id }}</span>
            <span>{{ level }}</span>
          </div>
          <h2 class="{{ chrome.headline_class }}">{{ entry.pattern }}</h2>

          <section class="mt-3">
            <h4 class="font-semibold">Meaning</h4>
            <p>{{ entry.meaning }}</p>
          </section>

          <section class="mt-3">
            <h4 class="font-semibold">Usage</h4>
            <p>{{ entry.explanation }}</p>
          </section>

          <section class="mt-3">
            <h4 class="font-semibold">Examples</h4>
            {% for example in entry.examples %}
            <div class="rounded border border-stone-200 p-3 mb-2">
              <p class="font-bold mb-0">{{ example.sentence }}</p>
              <p class="mb-0">{{ example.translation }}</p>
            </div>
            {% endfor %}
          </section>
        </article>
      </div>
    </main>
  </body>
</html>"#,
    ext = "html"
)]
struct GrammarDetailTemplate<'a> {
    chrome: Chrome,
    level: &'a str,
    entry: &'a GrammarEntry,
    nav: DetailNav,
}

#[derive(Template)]
#[template(
    source = r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="utf-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1" />
    <title>Benkyou • {{ entry.kanji }}</title>
    {% if chrome.use_tailwind %}
    <script src="https://cdn.jsdelivr.net/npm/@tailwindcss/browser@4"></script>
    {% endif %}
    {% if chrome.use_bootstrap %}
    <link href="https://cdn.jsdelivr.net/npm/bootstrap@5.3.8/dist/css/bootstrap.min.css" rel="stylesheet">
    <script src="https://cdn.jsdelivr.net/npm/bootstrap@5.3.8/dist/js/bootstrap.bundle.min.js"></script>
    {% endif %}
  </head>
  <body class="{{ chrome.body_class }}">
    <main class="{{ chrome.main_class }}">
      <div class="{{ chrome.card_class }}">
        <div class="flex flex-wrap gap-2 items-center d-flex align-items-center">
          <a href="{{ nav.back_href }}" class="{{ chrome.button_class }}">← Back to List</a>
          {% if nav.prev_href.is_some() %}
          <a href="{{ nav.prev_href.as_ref().unwrap() }}" class="{{ chrome.button_class }}">← Prev</a>
          {% endif %}
          {% if nav.next_href.is_some() %}
          <a href="{{ nav.next_href.as_ref().unwrap() }}" class="{{ chrome.button_class }}">Next →</a>
          {% endif %}
          <span class="ml-auto ms-auto text-sm text-stone-500">{{ nav.position }} / {{ nav.total }} • Order: {{ nav.sort_label }}</span>
        </div>

        <article class="{{ chrome.tile_class }}">
          <div class="flex justify-between text-xs text-stone-400 d-flex justify-content-between">
            <span>{{ entry.id }}</span>
            <span>{{ level }}</span>
          </div>
          <p class="text-6xl font-black display-1">{{ entry.kanji }}</p>

          <section class="mt-3">
            <h4 class="font-semibold">Meaning</h4>
            <p>{{ entry.meaning }}</p>
          </section>

          <section class="mt-3">
            <h4 class="font-semibold">Readings</h4>
            <p><b>ON:</b> {{ on_readings }}</p>
            <p><b>KUN:</b> {{ kun_readings }}</p>
          </section>

          <section class="mt-3">
            <h4 class="font-semibold">Vocabulary</h4>
            {% for word in entry.vocab %}
            <div class="rounded border border-stone-200 p-3 mb-2">
              <p class="mb-0"><b>{{ word.word }}</b>（{{ word.reading }}）</p>
              <p class="mb-0 text-stone-600">{{ word.translation }}</p>
            </div>
            {% endfor %}
          </section>

          <section class="mt-3">
            <h4 class="font-semibold">Examples</h4>
            {% for example in entry.examples %}
            <div class="rounded border border-stone-200 p-3 mb-2">
              <p class="font-bold mb-0">{{ example.sentence }}</p>
              <p class="mb-0">{{ example.translation }}</p>
            </div>
            {% endfor %}
          </section>
        </article>
      </div>
    </main>
  </body>
</html>"#,
    ext = "html"
)]
struct KanjiDetailTemplate<'a> {
    chrome: Chrome,
    level: &'a str,
    entry: &'a KanjiEntry,
    on_readings: String,
    kun_readings: String,
    nav: DetailNav,
}

async fn grammar_detail_html(
    State(state): State<SharedState>,
    Path((level, id)): Path<(String, String)>,
    Query(raw): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let params = params_from(&raw);
    let filtered = query::apply(GrammarIndex::entries(&level), &params);
    let Some(found) = query::locate(&filtered, &id) else {
        let back = format!("/grammar/{level}{}", params.query_string());
        return Html(render_not_found_page(state.theme, &id, &back));
    };
    let template = GrammarDetailTemplate {
        chrome: Chrome::new(state.theme),
        level: &level,
        entry: found.item,
        nav: detail_nav("grammar", &level, &params, &filtered, &found),
    };
    Html(
        template
            .render()
            .unwrap_or_else(|err| render_error_page(state.theme, err.to_string(), "/")),
    )
}

async fn kanji_detail_html(
    State(state): State<SharedState>,
    Path((level, id)): Path<(String, String)>,
    Query(raw): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let params = params_from(&raw);
    let filtered = query::apply(KanjiIndex::entries(&level), &params);
    let Some(found) = query::locate(&filtered, &id) else {
        let back = format!("/kanji/{level}{}", params.query_string());
        return Html(render_not_found_page(state.theme, &id, &back));
    };
    let template = KanjiDetailTemplate {
        chrome: Chrome::new(state.theme),
        level: &level,
        entry: found.item,
        on_readings: found.item.onyomi.join("、"),
        kun_readings: found.item.kunyomi.join("、"),
        nav: detail_nav("kanji", &level, &params, &filtered, &found),
    };
    Html(
        template
            .render()
            .unwrap_or_else(|err| render_error_page(state.theme, err.to_string(), "/")),
    )
}

#[derive(Serialize)]
struct ListPayload<T: Serialize> {
    level: String,
    params: QueryParams,
    total: usize,
    total_pages: u32,
    page: u32,
    items: Vec<T>,
}

fn list_payload<'a, T>(
    entries: &'a [T],
    level: String,
    params: QueryParams,
) -> ListPayload<&'a T>
where
    T: query::Queryable + Serialize,
{
    let filtered = query::apply(entries, &params);
    let page = query::paginate(&filtered, params.per, params.page);
    ListPayload {
        level,
        params: params.with_page(page.page),
        total: page.total,
        total_pages: page.total_pages,
        page: page.page,
        items: page.items,
    }
}

#[derive(Serialize)]
struct DetailPayload<T: Serialize> {
    level: String,
    params: QueryParams,
    index: usize,
    total: usize,
    prev: Option<String>,
    next: Option<String>,
    entry: T,
}

fn detail_payload<'a, T>(
    entries: &'a [T],
    level: String,
    id: &str,
    params: QueryParams,
) -> Result<DetailPayload<&'a T>, ApiError>
where
    T: query::Queryable + Serialize,
{
    let filtered = query::apply(entries, &params);
    let found = query::locate(&filtered, id)
        .ok_or_else(|| ApiError::not_found(format!("No entry {id:?} in the current view")))?;
    Ok(DetailPayload {
        total: filtered.len(),
        index: found.index,
        prev: found.previous.map(|entry| entry.id().to_string()),
        next: found.next.map(|entry| entry.id().to_string()),
        entry: found.item,
        level,
        params,
    })
}

async fn api_grammar_list(
    Path(level): Path<String>,
    Query(raw): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let params = params_from(&raw);
    Json(list_payload(GrammarIndex::entries(&level), level, params))
}

async fn api_kanji_list(
    Path(level): Path<String>,
    Query(raw): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let params = params_from(&raw);
    Json(list_payload(KanjiIndex::entries(&level), level, params))
}

async fn api_grammar_detail(
    Path((level, id)): Path<(String, String)>,
    Query(raw): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, ApiError> {
    let params = params_from(&raw);
    let payload = detail_payload(GrammarIndex::entries(&level), level, &id, params)?;
    Ok(Json(payload))
}

async fn api_kanji_detail(
    Path((level, id)): Path<(String, String)>,
    Query(raw): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, ApiError> {
    let params = params_from(&raw);
    let payload = detail_payload(KanjiIndex::entries(&level), level, &id, params)?;
    Ok(Json(payload))
}

async fn sitemap_xml(State(state): State<SharedState>) -> impl IntoResponse {
    let mut body = String::with_capacity(1024);
    body.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    body.push_str(r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">"#);
    let mut push_url = |loc: String, priority: &str| {
        body.push_str("<url><loc>");
        body.push_str(&xml_escape(&loc));
        body.push_str("</loc><changefreq>monthly</changefreq><priority>");
        body.push_str(priority);
        body.push_str("</priority></url>");
    };
    push_url(state.base_url.clone(), "0.8");
    for level in Level::ALL {
        push_url(format!("{}/grammar/{level}", state.base_url), "0.7");
        push_url(format!("{}/kanji/{level}", state.base_url), "0.7");
        for entry in GrammarIndex::entries(level.as_str()) {
            push_url(
                format!("{}/grammar/{level}/{}", state.base_url, entry.id),
                "0.5",
            );
        }
        for entry in KanjiIndex::entries(level.as_str()) {
            push_url(
                format!("{}/kanji/{level}/{}", state.base_url, entry.id),
                "0.5",
            );
        }
    }
    body.push_str("</urlset>");
    Response::builder()
        .header(axum::http::header::CONTENT_TYPE, "application/xml")
        .body(body)
        .unwrap()
}

fn render_not_found_page(theme: WebTheme, id: &str, back_href: &str) -> String {
    render_page_shell(
        theme,
        "Not found",
        &format!("Entry {id} is not in the current view. It may have been filtered out."),
        back_href,
        "Back to list",
    )
}

fn render_error_page(theme: WebTheme, message: impl Into<String>, back_href: &str) -> String {
    render_page_shell(
        theme,
        "Something went wrong",
        &message.into(),
        back_href,
        "Back to home",
    )
}

fn render_page_shell(
    theme: WebTheme,
    headline: &str,
    message: &str,
    back_href: &str,
    back_label: &str,
) -> String {
    let chrome = Chrome::new(theme);
    let (css_tag, js_tag) = Chrome::head_tags(theme);
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="utf-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1" />
    <title>Benkyou • {headline}</title>
    {css_tag}
    {js_tag}
  </head>
  <body class="{body_class}">
    <main class="{main_class}">
      <div class="{card_class}">
        <h1 class="{headline_class}">{headline}</h1>
        <p class="{lede_class}">{message}</p>
        <a href="{back_href}" class="{button_class}">{back_label}</a>
      </div>
    </main>
  </body>
</html>"#,
        body_class = chrome.body_class,
        main_class = chrome.main_class,
        card_class = chrome.card_class,
        headline_class = chrome.headline_class,
        lede_class = chrome.lede_class,
        button_class = chrome.button_class,
    )
}

fn xml_escape(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
