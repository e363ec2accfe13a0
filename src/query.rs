use std::cmp::Ordering;
use std::fmt;

use percent_encoding::{NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use serde::{Deserialize, Serialize};

use crate::data::{GrammarEntry, KanjiEntry};

/// Page sizes the UI offers; anything else in a URL falls back to the default.
pub const PAGE_SIZES: [u32; 4] = [10, 20, 30, 50];
pub const DEFAULT_PAGE_SIZE: u32 = 20;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn query_value(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortDirection::Asc => write!(f, "ASC"),
            SortDirection::Desc => write!(f, "DESC"),
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    List,
    Grid,
}

impl ViewMode {
    pub fn query_value(&self) -> &'static str {
        match self {
            ViewMode::List => "list",
            ViewMode::Grid => "grid",
        }
    }
}

/// The user's current view of a catalog: search text, sort direction, ordinal
/// range bounds, view mode, and pagination. Decoded from the URL query
/// component on every request and serialized back into every link, so the
/// URL stays the single source of truth.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct QueryParams {
    pub search: String,
    pub sort: SortDirection,
    pub from: Option<u32>,
    pub to: Option<u32>,
    pub view: ViewMode,
    pub per: u32,
    pub page: u32,
}

impl Default for QueryParams {
    fn default() -> Self {
        Self {
            search: String::new(),
            sort: SortDirection::default(),
            from: None,
            to: None,
            view: ViewMode::default(),
            per: DEFAULT_PAGE_SIZE,
            page: 1,
        }
    }
}

impl QueryParams {
    /// Builds params from decoded key/value pairs. Unknown keys are ignored
    /// and malformed values fall back to the field default, so a mangled URL
    /// degrades to a wider view instead of an error.
    pub fn parse<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut params = Self::default();
        for (key, value) in pairs {
            match key {
                "q" => params.search = value.to_string(),
                "sort" => {
                    params.sort = if value == "desc" {
                        SortDirection::Desc
                    } else {
                        SortDirection::Asc
                    };
                }
                "from" => params.from = parse_bound(value),
                "to" => params.to = parse_bound(value),
                "view" => {
                    params.view = if value == "grid" {
                        ViewMode::Grid
                    } else {
                        ViewMode::List
                    };
                }
                "per" => {
                    params.per = match value.trim().parse::<u32>() {
                        Ok(n) if PAGE_SIZES.contains(&n) => n,
                        _ => DEFAULT_PAGE_SIZE,
                    };
                }
                "page" => {
                    params.page = value.trim().parse::<u32>().unwrap_or(1).max(1);
                }
                _ => {}
            }
        }
        params
    }

    /// Parses a raw (still percent-encoded) query component, with or without
    /// the leading `?`.
    pub fn from_query_str(raw: &str) -> Self {
        let raw = raw.strip_prefix('?').unwrap_or(raw);
        let pairs: Vec<(String, String)> = raw
            .split('&')
            .filter(|part| !part.is_empty())
            .map(|part| {
                let (key, value) = part.split_once('=').unwrap_or((part, ""));
                (decode_component(key), decode_component(value))
            })
            .collect();
        Self::parse(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
    }

    /// Serializes back into the minimal canonical query string: keys equal to
    /// their default are omitted, so `""` means "default view". Non-empty
    /// output includes the leading `?` and is safe to append to a path.
    pub fn query_string(&self) -> String {
        let mut parts: Vec<String> = Vec::new();
        let search = self.search.trim();
        if !search.is_empty() {
            parts.push(format!("q={}", encode_component(search)));
        }
        if self.sort == SortDirection::Desc {
            parts.push(format!("sort={}", self.sort.query_value()));
        }
        if let Some(from) = self.from {
            parts.push(format!("from={from}"));
        }
        if let Some(to) = self.to {
            parts.push(format!("to={to}"));
        }
        if self.view == ViewMode::Grid {
            parts.push(format!("view={}", self.view.query_value()));
        }
        if self.per != DEFAULT_PAGE_SIZE {
            parts.push(format!("per={}", self.per));
        }
        if self.page != 1 {
            parts.push(format!("page={}", self.page));
        }
        if parts.is_empty() {
            String::new()
        } else {
            format!("?{}", parts.join("&"))
        }
    }

    /// The same view pointed at a different page; used for pagination links.
    pub fn with_page(&self, page: u32) -> Self {
        Self {
            page: page.max(1),
            ..self.clone()
        }
    }
}

fn parse_bound(value: &str) -> Option<u32> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse().ok()
}

fn encode_component(value: &str) -> String {
    utf8_percent_encode(value, NON_ALPHANUMERIC).to_string()
}

fn decode_component(value: &str) -> String {
    percent_decode_str(value)
        .decode_utf8()
        .map(|cow| cow.into_owned())
        .unwrap_or_else(|_| value.to_string())
}

/// Capability both catalog entry types provide to the generic engine: a
/// sortable identifier plus the haystacks the text filter checks
/// independently (a query matches when ANY field contains it).
pub trait Queryable {
    fn id(&self) -> &str;
    fn search_fields(&self) -> Vec<String>;
}

impl Queryable for GrammarEntry {
    fn id(&self) -> &str {
        &self.id
    }

    fn search_fields(&self) -> Vec<String> {
        vec![
            self.pattern.clone(),
            self.meaning.clone(),
            self.explanation.clone(),
        ]
    }
}

impl Queryable for KanjiEntry {
    fn id(&self) -> &str {
        &self.id
    }

    fn search_fields(&self) -> Vec<String> {
        vec![
            self.kanji.clone(),
            self.meaning.clone(),
            self.onyomi.join(" "),
            self.kunyomi.join(" "),
        ]
    }
}

/// Extracts the ordinal after the level prefix (`"N5-12"` → `12`). `None`
/// for identifiers with no parseable number.
pub fn ordinal(id: &str) -> Option<u32> {
    id.split('-').nth(1)?.trim().parse().ok()
}

/// The full pipeline: stable ordinal sort, then range filter, then text
/// filter. Later stages preserve the sort order; nothing re-sorts.
///
/// Entries with a malformed ordinal sort after every well-formed entry in
/// both directions (keeping their relative order) and never satisfy an
/// active range bound.
pub fn apply<'a, T: Queryable>(entries: &'a [T], params: &QueryParams) -> Vec<&'a T> {
    let mut list: Vec<&T> = entries.iter().collect();

    list.sort_by(|a, b| compare_ordinals(ordinal(a.id()), ordinal(b.id()), params.sort));

    if params.from.is_some() || params.to.is_some() {
        list.retain(|entry| in_range(ordinal(entry.id()), params.from, params.to));
    }

    let needle = params.search.trim().to_lowercase();
    if !needle.is_empty() {
        list.retain(|entry| {
            entry
                .search_fields()
                .iter()
                .any(|field| field.to_lowercase().contains(&needle))
        });
    }

    list
}

fn compare_ordinals(a: Option<u32>, b: Option<u32>, sort: SortDirection) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => match sort {
            SortDirection::Asc => a.cmp(&b),
            SortDirection::Desc => b.cmp(&a),
        },
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn in_range(n: Option<u32>, from: Option<u32>, to: Option<u32>) -> bool {
    match n {
        Some(n) => from.is_none_or(|f| n >= f) && to.is_none_or(|t| n <= t),
        None => false,
    }
}

/// One page of a filtered view. `page` is the clamped effective page number,
/// which callers must use for rendering and link generation so an
/// out-of-range request is invisible to the user.
#[derive(Debug)]
pub struct Page<'a, T> {
    pub items: Vec<&'a T>,
    pub page: u32,
    pub total_pages: u32,
    pub total: usize,
}

pub fn paginate<'a, T>(filtered: &[&'a T], per: u32, page: u32) -> Page<'a, T> {
    let per = per.max(1) as usize;
    let total = filtered.len();
    let total_pages = (total.div_ceil(per)).max(1) as u32;
    let page = page.clamp(1, total_pages);
    let start = (page as usize - 1) * per;
    let items = filtered.iter().skip(start).take(per).copied().collect();
    Page {
        items,
        page,
        total_pages,
        total,
    }
}

/// An entry's position in a filtered view, with its sequential neighbors.
#[derive(Debug)]
pub struct Located<'a, T> {
    pub index: usize,
    pub item: &'a T,
    pub previous: Option<&'a T>,
    pub next: Option<&'a T>,
}

/// Finds `target` in the full filtered order (pagination is ignored here so
/// prev/next walk the whole view). `None` when the target was filtered out
/// or never existed — the caller renders that as "not found".
pub fn locate<'a, T: Queryable>(filtered: &[&'a T], target: &str) -> Option<Located<'a, T>> {
    let index = filtered.iter().position(|entry| entry.id() == target)?;
    Some(Located {
        index,
        item: filtered[index],
        previous: index.checked_sub(1).map(|i| filtered[i]),
        next: filtered.get(index + 1).copied(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};

    fn grammar(id: &str, pattern: &str, meaning: &str, explanation: &str) -> GrammarEntry {
        GrammarEntry {
            id: id.to_string(),
            pattern: pattern.to_string(),
            meaning: meaning.to_string(),
            explanation: explanation.to_string(),
            examples: Vec::new(),
        }
    }

    fn five_entries() -> Vec<GrammarEntry> {
        (1..=5)
            .map(|n| {
                let pattern = if n == 3 { "〜ます" } else { "〜です" };
                grammar(&format!("N5-{n}"), pattern, "meaning", "explanation")
            })
            .collect()
    }

    fn ids<T: Queryable>(list: &[&T]) -> Vec<String> {
        list.iter().map(|e| e.id().to_string()).collect()
    }

    #[test]
    fn ordinal_extraction() {
        assert_eq!(ordinal("N5-12"), Some(12));
        assert_eq!(ordinal("N1-1"), Some(1));
        assert_eq!(ordinal("N5"), None);
        assert_eq!(ordinal("N5-abc"), None);
        assert_eq!(ordinal(""), None);
    }

    #[test]
    fn parse_falls_back_to_defaults() {
        let params = QueryParams::parse([
            ("sort", "sideways"),
            ("from", "abc"),
            ("to", "-3"),
            ("view", "mosaic"),
            ("per", "25"),
            ("page", "0"),
            ("bogus", "1"),
        ]);
        assert_eq!(params.sort, SortDirection::Asc);
        assert_eq!(params.from, None);
        assert_eq!(params.to, None);
        assert_eq!(params.view, ViewMode::List);
        assert_eq!(params.per, DEFAULT_PAGE_SIZE);
        assert_eq!(params.page, 1);
    }

    #[test]
    fn parse_accepts_valid_values() {
        let params = QueryParams::parse([
            ("q", " ます "),
            ("sort", "desc"),
            ("from", "2"),
            ("to", "40"),
            ("view", "grid"),
            ("per", "50"),
            ("page", "3"),
        ]);
        assert_eq!(params.search, " ます ");
        assert_eq!(params.sort, SortDirection::Desc);
        assert_eq!(params.from, Some(2));
        assert_eq!(params.to, Some(40));
        assert_eq!(params.view, ViewMode::Grid);
        assert_eq!(params.per, 50);
        assert_eq!(params.page, 3);
    }

    #[test]
    fn default_params_serialize_to_nothing() {
        assert_eq!(QueryParams::default().query_string(), "");
        let whitespace_only = QueryParams {
            search: "   ".to_string(),
            ..QueryParams::default()
        };
        assert_eq!(whitespace_only.query_string(), "");
    }

    #[test]
    fn serialization_omits_defaults_and_encodes_search() {
        let params = QueryParams {
            search: "te form".to_string(),
            sort: SortDirection::Desc,
            from: Some(2),
            to: None,
            view: ViewMode::Grid,
            per: 10,
            page: 2,
        };
        assert_eq!(
            params.query_string(),
            "?q=te%20form&sort=desc&from=2&view=grid&per=10&page=2"
        );
    }

    #[test]
    fn round_trip_preserves_effective_values() {
        let cases = vec![
            QueryParams::default(),
            QueryParams {
                search: "ます".to_string(),
                sort: SortDirection::Desc,
                from: Some(1),
                to: Some(99),
                view: ViewMode::Grid,
                per: 30,
                page: 7,
            },
            QueryParams {
                search: "n & m = x?".to_string(),
                ..QueryParams::default()
            },
        ];
        for params in cases {
            let reparsed = QueryParams::from_query_str(&params.query_string());
            // Leading/trailing whitespace in the search text is not part of
            // the effective value.
            let mut effective = params.clone();
            effective.search = effective.search.trim().to_string();
            assert_eq!(reparsed, effective, "failed for {params:?}");
        }
    }

    #[test]
    fn sort_is_monotonic_in_both_directions() {
        let entries = vec![
            grammar("N5-3", "c", "", ""),
            grammar("N5-1", "a", "", ""),
            grammar("N5-10", "d", "", ""),
            grammar("N5-2", "b", "", ""),
        ];
        let asc = apply(&entries, &QueryParams::default());
        assert_eq!(ids(&asc), ["N5-1", "N5-2", "N5-3", "N5-10"]);

        let desc = apply(
            &entries,
            &QueryParams {
                sort: SortDirection::Desc,
                ..QueryParams::default()
            },
        );
        assert_eq!(ids(&desc), ["N5-10", "N5-3", "N5-2", "N5-1"]);
    }

    #[test]
    fn duplicate_ordinals_keep_original_relative_order() {
        let entries = vec![
            grammar("N5-2", "first two", "", ""),
            grammar("N5-1", "one", "", ""),
            grammar("N5-2", "second two", "", ""),
        ];
        let sorted = apply(&entries, &QueryParams::default());
        assert_eq!(sorted[1].pattern, "first two");
        assert_eq!(sorted[2].pattern, "second two");
    }

    #[test]
    fn malformed_ordinals_sort_last_in_both_directions() {
        let entries = vec![
            grammar("N5-broken", "x", "", ""),
            grammar("N5-2", "b", "", ""),
            grammar("oops", "y", "", ""),
            grammar("N5-1", "a", "", ""),
        ];
        for sort in [SortDirection::Asc, SortDirection::Desc] {
            let sorted = apply(
                &entries,
                &QueryParams {
                    sort,
                    ..QueryParams::default()
                },
            );
            let sorted_ids = ids(&sorted);
            assert_eq!(&sorted_ids[2..], ["N5-broken", "oops"], "direction {sort}");
        }
    }

    #[test]
    fn range_bounds_are_inclusive() {
        let entries = five_entries();
        let params = QueryParams {
            from: Some(2),
            to: Some(4),
            ..QueryParams::default()
        };
        assert_eq!(ids(&apply(&entries, &params)), ["N5-2", "N5-3", "N5-4"]);

        let point = QueryParams {
            from: Some(3),
            to: Some(3),
            ..QueryParams::default()
        };
        assert_eq!(ids(&apply(&entries, &point)), ["N5-3"]);

        let inverted = QueryParams {
            from: Some(4),
            to: Some(2),
            ..QueryParams::default()
        };
        assert!(apply(&entries, &inverted).is_empty());
    }

    #[test]
    fn half_open_ranges() {
        let entries = five_entries();
        let from_only = QueryParams {
            from: Some(4),
            ..QueryParams::default()
        };
        assert_eq!(ids(&apply(&entries, &from_only)), ["N5-4", "N5-5"]);

        let to_only = QueryParams {
            to: Some(2),
            ..QueryParams::default()
        };
        assert_eq!(ids(&apply(&entries, &to_only)), ["N5-1", "N5-2"]);
    }

    #[test]
    fn malformed_ordinals_fail_active_range_bounds() {
        let entries = vec![grammar("N5-x", "a", "", ""), grammar("N5-3", "b", "", "")];
        let params = QueryParams {
            from: Some(1),
            ..QueryParams::default()
        };
        assert_eq!(ids(&apply(&entries, &params)), ["N5-3"]);
    }

    #[test]
    fn search_matches_any_field_case_insensitively() {
        let entries = vec![
            grammar("N5-1", "〜てから", "after doing", "sequence of actions"),
            grammar("N5-2", "〜たい", "want to", "Desire form"),
        ];
        let hit_meaning = QueryParams {
            search: "WANT".to_string(),
            ..QueryParams::default()
        };
        assert_eq!(ids(&apply(&entries, &hit_meaning)), ["N5-2"]);

        let hit_explanation = QueryParams {
            search: "sequence".to_string(),
            ..QueryParams::default()
        };
        assert_eq!(ids(&apply(&entries, &hit_explanation)), ["N5-1"]);

        let miss = QueryParams {
            search: "conditional".to_string(),
            ..QueryParams::default()
        };
        assert!(apply(&entries, &miss).is_empty());
    }

    #[test]
    fn kanji_search_covers_joined_readings() {
        let entry = KanjiEntry {
            id: "N5-1".to_string(),
            kanji: "水".to_string(),
            meaning: "water".to_string(),
            onyomi: vec!["スイ".to_string()],
            kunyomi: vec!["みず".to_string()],
            vocab: Vec::new(),
            examples: Vec::new(),
        };
        let entries = vec![entry];
        for needle in ["水", "water", "スイ", "みず"] {
            let params = QueryParams {
                search: needle.to_string(),
                ..QueryParams::default()
            };
            assert_eq!(apply(&entries, &params).len(), 1, "needle {needle}");
        }
    }

    #[test]
    fn search_on_headword_only_ignores_sort_direction() {
        let entries = five_entries();
        for sort in [SortDirection::Asc, SortDirection::Desc] {
            let params = QueryParams {
                search: "ます".to_string(),
                sort,
                ..QueryParams::default()
            };
            assert_eq!(ids(&apply(&entries, &params)), ["N5-3"]);
        }
    }

    #[test]
    fn random_entries_satisfy_filter_conjunction() {
        let mut rng = SmallRng::seed_from_u64(0x62656e6b796f75);
        let tokens = ["aru", "iru", "tai", "masu", "kara", "node"];
        let entries: Vec<GrammarEntry> = (0..200)
            .map(|i| {
                let ordinal = rng.gen_range(1..=60);
                let token = tokens[rng.gen_range(0..tokens.len())];
                let id = if i % 19 == 0 {
                    format!("N3-bad{i}")
                } else {
                    format!("N3-{ordinal}")
                };
                grammar(&id, token, tokens[rng.gen_range(0..tokens.len())], "")
            })
            .collect();

        for _ in 0..50 {
            let params = QueryParams {
                search: tokens[rng.gen_range(0..tokens.len())].to_string(),
                sort: if rng.gen_bool(0.5) {
                    SortDirection::Asc
                } else {
                    SortDirection::Desc
                },
                from: rng.gen_bool(0.5).then(|| rng.gen_range(1..=60)),
                to: rng.gen_bool(0.5).then(|| rng.gen_range(1..=60)),
                ..QueryParams::default()
            };
            let result = apply(&entries, &params);
            let needle = params.search.to_lowercase();

            for entry in &entries {
                let passes_range = if params.from.is_some() || params.to.is_some() {
                    in_range(ordinal(&entry.id), params.from, params.to)
                } else {
                    true
                };
                let passes_text = entry
                    .search_fields()
                    .iter()
                    .any(|f| f.to_lowercase().contains(&needle));
                let expected = passes_range && passes_text;
                let present = result.iter().filter(|e| std::ptr::eq(**e, entry)).count();
                assert_eq!(present, usize::from(expected), "entry {}", entry.id);
            }

            // Output must be monotonic in ordinal for the chosen direction.
            let ordinals: Vec<u32> = result.iter().filter_map(|e| ordinal(e.id())).collect();
            let mut expected_order = ordinals.clone();
            match params.sort {
                SortDirection::Asc => expected_order.sort(),
                SortDirection::Desc => expected_order.sort_by(|a, b| b.cmp(a)),
            }
            assert_eq!(ordinals, expected_order);
        }
    }

    #[test]
    fn pagination_covers_the_filtered_sequence_exactly_once() {
        for total in [0usize, 1, 9, 10, 11, 37, 50] {
            let entries: Vec<GrammarEntry> = (1..=total)
                .map(|n| grammar(&format!("N4-{n}"), "p", "", ""))
                .collect();
            let filtered = apply(&entries, &QueryParams::default());
            for per in PAGE_SIZES {
                let first = paginate(&filtered, per, 1);
                let expected_pages = (total.div_ceil(per as usize)).max(1) as u32;
                assert_eq!(first.total_pages, expected_pages);

                let mut seen = Vec::new();
                for page in 1..=first.total_pages {
                    seen.extend(ids(&paginate(&filtered, per, page).items));
                }
                assert_eq!(seen, ids(&filtered), "total {total} per {per}");
            }
        }
    }

    #[test]
    fn empty_filtered_input_yields_one_empty_page() {
        let filtered: Vec<&GrammarEntry> = Vec::new();
        let page = paginate(&filtered, 20, 1);
        assert_eq!(page.total_pages, 1);
        assert_eq!(page.page, 1);
        assert!(page.items.is_empty());
        assert_eq!(page.total, 0);
    }

    #[test]
    fn out_of_range_page_clamps_observably() {
        let entries = five_entries();
        let filtered = apply(&entries, &QueryParams::default());
        let page = paginate(&filtered, 2, 99);
        assert_eq!(page.page, 3);
        assert_eq!(page.total_pages, 3);
        assert_eq!(ids(&page.items), ["N5-5"]);
    }

    #[test]
    fn desc_sort_with_range_then_paginate() {
        let entries = five_entries();
        let params = QueryParams {
            sort: SortDirection::Desc,
            from: Some(2),
            to: Some(4),
            ..QueryParams::default()
        };
        let filtered = apply(&entries, &params);
        assert_eq!(ids(&filtered), ["N5-4", "N5-3", "N5-2"]);

        let page = paginate(&filtered, 2, 2);
        assert_eq!(ids(&page.items), ["N5-2"]);
        assert_eq!(page.total_pages, 2);
    }

    #[test]
    fn locate_at_view_boundary() {
        let entries = five_entries();
        let params = QueryParams {
            sort: SortDirection::Desc,
            from: Some(2),
            to: Some(4),
            ..QueryParams::default()
        };
        let filtered = apply(&entries, &params);
        let found = locate(&filtered, "N5-2").expect("present in view");
        assert_eq!(found.index, 2);
        assert_eq!(found.previous.map(|e| e.id()), Some("N5-3"));
        assert!(found.next.is_none());
    }

    #[test]
    fn locate_walks_a_consistent_chain() {
        let entries = five_entries();
        let filtered = apply(&entries, &QueryParams::default());
        for (i, entry) in filtered.iter().enumerate() {
            let found = locate(&filtered, entry.id()).expect("listed entries are locatable");
            assert_eq!(found.index, i);
            assert_eq!(
                found.previous.map(|e| e.id()),
                (i > 0).then(|| filtered[i - 1].id())
            );
            assert_eq!(
                found.next.map(|e| e.id()),
                filtered.get(i + 1).map(|e| e.id())
            );
        }
    }

    #[test]
    fn locate_misses_filtered_out_and_unknown_targets() {
        let entries = five_entries();
        let params = QueryParams {
            to: Some(3),
            ..QueryParams::default()
        };
        let filtered = apply(&entries, &params);
        assert!(locate(&filtered, "N5-5").is_none());
        assert!(locate(&filtered, "N5-999").is_none());
        assert!(locate(&filtered, "").is_none());
    }
}
