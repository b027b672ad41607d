use serde::{Deserialize, Serialize};

/// Фильм в том виде, в каком его отдаёт каталог (TMDB).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movie {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub overview: String,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    #[serde(default)]
    pub vote_average: f64,
    pub release_date: Option<String>,
}

impl Movie {
    pub fn poster_url(&self, image_base_url: &str) -> Option<String> {
        self.poster_path
            .as_deref()
            .map(|path| format!("{}{}", image_base_url.trim_end_matches('/'), path))
    }

    /// Рейтинг с одним знаком после запятой, как на карточке фильма.
    pub fn rating_label(&self) -> String {
        format!("{:.1}", self.vote_average)
    }
}

/// Страница результатов каталога.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoviePage {
    #[serde(default = "first_page")]
    pub page: u32,
    #[serde(default)]
    pub results: Vec<Movie>,
    #[serde(default)]
    pub total_pages: u32,
}

fn first_page() -> u32 {
    1
}
