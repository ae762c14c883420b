//! Per-language basic/structural word tables.
//!
//! Per the design notes: "the basic-word and structural-word sets are
//! language-specific tables, not code." Only Russian is populated, ported
//! from the source's tokenizer; other languages fall back to an empty
//! table until a translator supplies one.

pub fn basic_words(language: &str) -> &'static [&'static str] {
    match language {
        "ru" => &["я", "ты", "он", "она", "мы", "вы", "они", "в", "на", "и", "а", "но"],
        _ => &[],
    }
}

pub fn structural_words(language: &str) -> &'static [&'static str] {
    match language {
        "ru" => &["не", "то", "это", "что", "как", "где", "когда", "почему"],
        _ => &[],
    }
}
