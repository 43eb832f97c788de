//! Local filter/sort/paginate over an already fetched catalog list.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use super::CatalogItem;

pub const PAGE_SIZE: usize = 12;
pub const REVEAL_STEP: usize = 12;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortKey {
    /// Upstream order.
    #[default]
    Popular,
    Rating,
    Newest,
    Oldest,
    Rank,
    Title,
}

impl SortKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::Popular => "popular",
            SortKey::Rating => "rating",
            SortKey::Newest => "newest",
            SortKey::Oldest => "oldest",
            SortKey::Rank => "rank",
            SortKey::Title => "title",
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "popular" | "" => Ok(SortKey::Popular),
            "rating" => Ok(SortKey::Rating),
            "newest" | "new" => Ok(SortKey::Newest),
            "oldest" | "old" => Ok(SortKey::Oldest),
            "rank" | "ranking" => Ok(SortKey::Rank),
            "title" | "name" => Ok(SortKey::Title),
            other => Err(format!("unknown sort '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingFilter {
    /// `None` or `"all"` keeps every genre.
    pub genre: Option<String>,
    /// First year of a decade, e.g. `1990`.
    pub decade: Option<i32>,
    pub search: Option<String>,
}

impl ListingFilter {
    pub fn matches(&self, item: &CatalogItem) -> bool {
        self.matches_genre(item) && self.matches_decade(item) && self.matches_search(item)
    }

    fn matches_genre(&self, item: &CatalogItem) -> bool {
        match self.genre.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(g) if g.eq_ignore_ascii_case("all") => true,
            Some(g) => item.genres().iter().any(|ig| ig.eq_ignore_ascii_case(g)),
        }
    }

    fn matches_decade(&self, item: &CatalogItem) -> bool {
        match self.decade {
            None => true,
            Some(decade) => item.year().is_some_and(|y| decade_of(y) == decade),
        }
    }

    fn matches_search(&self, item: &CatalogItem) -> bool {
        let needle = match self.search.as_deref().map(str::trim) {
            None | Some("") => return true,
            Some(s) => s.to_lowercase(),
        };
        item.title().to_lowercase().contains(&needle)
            || item
                .description()
                .is_some_and(|d| d.to_lowercase().contains(&needle))
            || item
                .genres()
                .iter()
                .any(|g| g.to_lowercase().contains(&needle))
    }
}

fn decade_of(year: i32) -> i32 {
    year - year.rem_euclid(10)
}

/// Present values first, in `order`; missing values keep their relative order at the end.
fn by_present<T, F>(a: Option<T>, b: Option<T>, order: F) -> Ordering
where
    F: FnOnce(T, T) -> Ordering,
{
    match (a, b) {
        (Some(a), Some(b)) => order(a, b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Stable, so equal keys keep upstream order and sorting twice changes nothing.
pub fn sort_items(items: &mut [CatalogItem], key: SortKey) {
    match key {
        SortKey::Popular => {}
        SortKey::Rating => items.sort_by(|a, b| {
            by_present(a.rating(), b.rating(), |x, y| y.total_cmp(&x))
        }),
        SortKey::Newest => items.sort_by(|a, b| by_present(a.year(), b.year(), |x, y| y.cmp(&x))),
        SortKey::Oldest => items.sort_by(|a, b| by_present(a.year(), b.year(), |x, y| x.cmp(&y))),
        SortKey::Rank => items.sort_by(|a, b| by_present(a.rank(), b.rank(), |x, y| x.cmp(&y))),
        SortKey::Title => items.sort_by(|a, b| {
            a.title()
                .to_lowercase()
                .cmp(&b.title().to_lowercase())
                .then_with(|| a.title().cmp(b.title()))
        }),
    }
}

pub fn apply(items: &[CatalogItem], filter: &ListingFilter, sort: SortKey) -> Vec<CatalogItem> {
    let mut out = items
        .iter()
        .filter(|item| filter.matches(item))
        .cloned()
        .collect::<Vec<_>>();
    sort_items(&mut out, sort);
    out
}

/// Distinct genres, sorted, for a genre picker.
pub fn genres_of(items: &[CatalogItem]) -> Vec<String> {
    items
        .iter()
        .flat_map(|item| item.genres().iter().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Decades present in the list, newest first.
pub fn decades_of(items: &[CatalogItem]) -> Vec<i32> {
    let decades = items
        .iter()
        .filter_map(CatalogItem::year)
        .map(decade_of)
        .collect::<BTreeSet<_>>();
    decades.into_iter().rev().collect()
}

/// "Load more" window over a filtered list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reveal {
    step: usize,
    visible: usize,
}

impl Default for Reveal {
    fn default() -> Self {
        Self::new(REVEAL_STEP)
    }
}

impl Reveal {
    pub fn new(step: usize) -> Self {
        let step = step.max(1);
        Self {
            step,
            visible: step,
        }
    }

    pub fn visible(&self) -> usize {
        self.visible
    }

    pub fn slice<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        &items[..self.visible.min(items.len())]
    }

    pub fn has_more(&self, total: usize) -> bool {
        self.visible < total
    }

    pub fn load_more(&mut self, total: usize) {
        if self.has_more(total) {
            self.visible += self.step;
        }
    }

    pub fn reset(&mut self) {
        self.visible = self.step;
    }
}

/// Fixed-size pages, 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pager {
    per_page: usize,
}

impl Default for Pager {
    fn default() -> Self {
        Self::new(PAGE_SIZE)
    }
}

impl Pager {
    pub fn new(per_page: usize) -> Self {
        Self {
            per_page: per_page.max(1),
        }
    }

    pub fn total_pages(&self, total: usize) -> usize {
        total.div_ceil(self.per_page).max(1)
    }

    /// Out-of-range pages clamp to the nearest valid page.
    pub fn clamp(&self, page: usize, total: usize) -> usize {
        page.clamp(1, self.total_pages(total))
    }

    pub fn page<'a, T>(&self, items: &'a [T], page: usize) -> &'a [T] {
        let page = self.clamp(page, items.len());
        let start = (page - 1) * self.per_page;
        let end = (start + self.per_page).min(items.len());
        &items[start.min(end)..end]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Movie;

    fn movie(id: &str, title: &str, rating: Option<f64>, year: Option<&str>, genre: &[&str]) -> CatalogItem {
        CatalogItem::Movie(Movie {
            id: id.to_string(),
            rank: id.trim_start_matches('m').parse().ok(),
            title: title.to_string(),
            description: Some(format!("{title} description")),
            image: None,
            big_image: None,
            thumbnail: None,
            rating,
            year: year.map(str::to_string),
            genre: genre.iter().map(|g| g.to_string()).collect(),
            imdbid: None,
            imdb_link: None,
            trailer: None,
        })
    }

    fn sample() -> Vec<CatalogItem> {
        vec![
            movie("m3", "Casablanca", Some(8.5), Some("1942"), &["Drama", "Romance"]),
            movie("m1", "alien", Some(8.5), Some("1979"), &["Horror", "Sci-Fi"]),
            movie("m2", "Brazil", None, Some("1985"), &["Sci-Fi"]),
            movie("m4", "Zodiac", Some(7.7), None, &["Crime"]),
        ]
    }

    fn ids(items: &[CatalogItem]) -> Vec<&str> {
        items.iter().map(CatalogItem::id).collect()
    }

    #[test]
    fn rating_sort_is_descending_stable_and_idempotent() {
        let mut items = sample();
        sort_items(&mut items, SortKey::Rating);
        assert_eq!(ids(&items), ["m3", "m1", "m4", "m2"]);
        let once = items.clone();
        sort_items(&mut items, SortKey::Rating);
        assert_eq!(items, once);
    }

    #[test]
    fn title_sort_ignores_case() {
        let mut items = sample();
        sort_items(&mut items, SortKey::Title);
        assert_eq!(ids(&items), ["m1", "m2", "m3", "m4"]);
    }

    #[test]
    fn year_and_rank_sorts_push_missing_last() {
        let mut items = sample();
        sort_items(&mut items, SortKey::Newest);
        assert_eq!(ids(&items), ["m2", "m1", "m3", "m4"]);
        sort_items(&mut items, SortKey::Oldest);
        assert_eq!(ids(&items), ["m3", "m1", "m2", "m4"]);
        sort_items(&mut items, SortKey::Rank);
        assert_eq!(ids(&items), ["m1", "m2", "m3", "m4"]);
        let before = items.clone();
        sort_items(&mut items, SortKey::Popular);
        assert_eq!(items, before);
    }

    #[test]
    fn filters_by_genre_decade_and_search() {
        let items = sample();
        let scifi = ListingFilter {
            genre: Some("sci-fi".to_string()),
            ..ListingFilter::default()
        };
        assert_eq!(ids(&apply(&items, &scifi, SortKey::Title)), ["m1", "m2"]);

        let all = ListingFilter {
            genre: Some("All".to_string()),
            ..ListingFilter::default()
        };
        assert_eq!(apply(&items, &all, SortKey::Popular).len(), 4);

        let seventies = ListingFilter {
            decade: Some(1970),
            ..ListingFilter::default()
        };
        assert_eq!(ids(&apply(&items, &seventies, SortKey::Popular)), ["m1"]);

        let search = ListingFilter {
            search: Some(" ROMANCE ".to_string()),
            ..ListingFilter::default()
        };
        assert_eq!(ids(&apply(&items, &search, SortKey::Popular)), ["m3"]);
    }

    #[test]
    fn genre_and_decade_pickers() {
        let items = sample();
        assert_eq!(
            genres_of(&items),
            ["Crime", "Drama", "Horror", "Romance", "Sci-Fi"]
        );
        assert_eq!(decades_of(&items), [1980, 1970, 1940]);
    }

    #[test]
    fn reveal_grows_in_steps() {
        let items = (0..30).collect::<Vec<_>>();
        let mut reveal = Reveal::default();
        assert_eq!(reveal.slice(&items).len(), 12);
        reveal.load_more(items.len());
        reveal.load_more(items.len());
        assert_eq!(reveal.slice(&items).len(), 30);
        assert!(!reveal.has_more(items.len()));
        reveal.load_more(items.len());
        assert_eq!(reveal.visible(), 36);
        reveal.reset();
        assert_eq!(reveal.visible(), 12);
    }

    #[test]
    fn pager_clamps_out_of_range_pages() {
        let items = (0..25).collect::<Vec<_>>();
        let pager = Pager::default();
        assert_eq!(pager.total_pages(items.len()), 3);
        assert_eq!(pager.page(&items, 3), &[24]);
        assert_eq!(pager.page(&items, 0), pager.page(&items, 1));
        assert_eq!(pager.page(&items, 99), &[24]);
        assert_eq!(pager.total_pages(0), 1);
        assert!(pager.page::<i32>(&[], 1).is_empty());
    }
}
