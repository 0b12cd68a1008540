//! The built-in movie catalog and the pure queries over it.
//!
//! Nothing in here touches storage. Every function takes snapshots (the
//! catalog, a favorite-id list, a notification log) and returns a new view,
//! preserving the input order wherever the result is not explicitly sorted.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use crate::movie_model::{Movie, MovieQuery, SortKey, UserNotification};

struct CatalogEntry {
    id: &'static str,
    title: &'static str,
    image: &'static str,
    tags: &'static [&'static str],
    description: &'static str,
    release_date: &'static str,
}

const BUILTIN: &[CatalogEntry] = &[
    CatalogEntry {
        id: "1",
        title: "Dune: Part Two",
        image: "asset://posters/dune-part-two.jpg",
        tags: &["Sci-Fi", "Adventure", "Drama"],
        description: "Paul Atreides unites with the Fremen while on a warpath of revenge against the conspirators who destroyed his family.",
        release_date: "2024-03-01",
    },
    CatalogEntry {
        id: "2",
        title: "Oppenheimer",
        image: "asset://posters/oppenheimer.jpg",
        tags: &["Drama", "History"],
        description: "The story of the physicist who led the Manhattan Project and the cost of the weapon it produced.",
        release_date: "2023-07-21",
    },
    CatalogEntry {
        id: "3",
        title: "Inside Out 2",
        image: "asset://posters/inside-out-2.jpg",
        tags: &["Animation", "Comedy", "Family"],
        description: "Riley enters her teenage years and a new set of emotions moves into headquarters.",
        release_date: "2024-06-14",
    },
    CatalogEntry {
        id: "4",
        title: "Gladiator II",
        image: "asset://posters/gladiator-2.jpg",
        tags: &["Action", "Adventure", "Drama"],
        description: "Years after the death of Maximus, Lucius is forced into the Colosseum to fight for the future of Rome.",
        release_date: "2024-11-22",
    },
    CatalogEntry {
        id: "5",
        title: "Wicked",
        image: "asset://posters/wicked.jpg",
        tags: &["Musical", "Fantasy", "Family"],
        description: "Before Dorothy arrives in Oz, two young witches at Shiz University form an unlikely friendship.",
        release_date: "2024-11-22",
    },
    CatalogEntry {
        id: "6",
        title: "Alien: Romulus",
        image: "asset://posters/alien-romulus.jpg",
        tags: &["Sci-Fi", "Horror"],
        description: "Young space colonists scavenging a derelict station come face to face with the most terrifying life form in the universe.",
        release_date: "2024-08-16",
    },
    CatalogEntry {
        id: "7",
        title: "Deadpool & Wolverine",
        image: "asset://posters/deadpool-wolverine.jpg",
        tags: &["Action", "Comedy"],
        description: "A listless Wade Wilson is pulled back into action and recruits a reluctant Wolverine to save his universe.",
        release_date: "2024-07-26",
    },
    CatalogEntry {
        id: "8",
        title: "The Wild Robot",
        image: "asset://posters/the-wild-robot.jpg",
        tags: &["Animation", "Sci-Fi", "Family"],
        description: "A robot shipwrecked on an uninhabited island learns to adapt to its surroundings and raises an orphaned gosling.",
        release_date: "2024-09-27",
    },
];

impl CatalogEntry {
    fn to_movie(&self) -> Movie {
        Movie {
            id: self.id.to_string(),
            title: self.title.to_string(),
            image: self.image.to_string(),
            tags: self.tags.iter().map(|t| t.to_string()).collect(),
            description: self.description.to_string(),
            release_date: self.release_date.to_string(),
        }
    }
}

/// Immutable list of movies known to the application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    movies: Vec<Movie>,
}

impl Catalog {
    /// The catalog compiled into the application.
    pub fn builtin() -> Self {
        Catalog {
            movies: BUILTIN.iter().map(CatalogEntry::to_movie).collect(),
        }
    }

    pub fn from_movies(movies: Vec<Movie>) -> Self {
        Catalog { movies }
    }

    pub fn movies(&self) -> &[Movie] {
        &self.movies
    }

    pub fn find(&self, id: &str) -> Option<&Movie> {
        self.movies.iter().find(|m| m.id == id)
    }

    pub fn len(&self) -> usize {
        self.movies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.movies.is_empty()
    }
}

/// Movies whose title contains `search` (case-insensitively) and that carry
/// every tag in `selected_tags`. An empty tag selection matches everything.
/// Catalog order is preserved.
pub fn filter_movies<'a>(movies: &'a [Movie], search: &str, selected_tags: &[String]) -> Vec<&'a Movie> {
    let needle = search.to_lowercase();
    movies
        .iter()
        .filter(|movie| movie.title.to_lowercase().contains(&needle))
        .filter(|movie| selected_tags.iter().all(|tag| movie.has_tag(tag)))
        .collect()
}

pub fn query_movies<'a>(catalog: &'a Catalog, query: &MovieQuery) -> Vec<&'a Movie> {
    filter_movies(catalog.movies(), &query.search, &query.tags)
}

/// Adds `tag` to the selection when absent, removes it when present.
pub fn toggle_tag(selected: &mut Vec<String>, tag: &str) {
    if let Some(pos) = selected.iter().position(|t| t == tag) {
        selected.remove(pos);
    } else {
        selected.push(tag.to_string());
    }
}

/// Sorted, de-duplicated union of every tag in the catalog.
pub fn all_tags(catalog: &Catalog) -> Vec<String> {
    catalog
        .movies()
        .iter()
        .flat_map(|m| m.tags.iter().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn compare_titles(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(b))
}

fn compare_premieres(a: &Movie, b: &Movie) -> Ordering {
    // Most recent first; undated movies go last.
    match (a.premiere(), b.premiere()) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn compare_by(key: SortKey, a: &Movie, b: &Movie) -> Ordering {
    match key {
        SortKey::Title => compare_titles(&a.title, &b.title),
        SortKey::Date => compare_premieres(a, b),
    }
}

/// Stable sort of a favorites view.
///
/// Titles compare case-insensitively by code point, not by locale
/// collation: accented initials such as "Å" sort after "Z".
pub fn sort_favorites(movies: &mut [Movie], key: SortKey) {
    movies.sort_by(|a, b| compare_by(key, a, b));
}

/// Catalog movies whose id is in `favorite_ids`, sorted by `key`.
/// Ids with no catalog entry are skipped.
pub fn favorite_movies<'a>(catalog: &'a Catalog, favorite_ids: &[String], key: SortKey) -> Vec<&'a Movie> {
    let mut favorites: Vec<&Movie> = catalog
        .movies()
        .iter()
        .filter(|m| favorite_ids.contains(&m.id))
        .collect();
    favorites.sort_by(|a, b| compare_by(key, a, b));
    favorites
}

/// Notification log ordered newest first, as shown on the notifications screen.
pub fn recent_first(mut log: Vec<UserNotification>) -> Vec<UserNotification> {
    log.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    log
}
