use rust_stemmers::Algorithm;

/// Languages with a Snowball stemmer, keyed by ISO 639-3 code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Language {
    English,
    German,
    French,
    Italian,
}

impl Language {
    pub const ALL: [Language; 4] = [
        Language::English,
        Language::German,
        Language::French,
        Language::Italian,
    ];

    /// Looks up an ISO 639-3 code such as `eng`. Case and surrounding
    /// whitespace are ignored.
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_lowercase().as_str() {
            "eng" => Some(Language::English),
            "deu" => Some(Language::German),
            "fra" => Some(Language::French),
            "ita" => Some(Language::Italian),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Language::English => "eng",
            Language::German => "deu",
            Language::French => "fra",
            Language::Italian => "ita",
        }
    }

    pub fn algorithm(&self) -> Algorithm {
        match self {
            Language::English => Algorithm::English,
            Language::German => Algorithm::German,
            Language::French => Algorithm::French,
            Language::Italian => Algorithm::Italian,
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Language::English => write!(f, "English"),
            Language::German => write!(f, "German"),
            Language::French => write!(f, "French"),
            Language::Italian => write!(f, "Italian"),
        }
    }
}
