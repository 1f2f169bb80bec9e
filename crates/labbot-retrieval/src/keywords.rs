//! Script-aware keyword extraction.
//!
//! A lightweight tokenizer with no morphological-analysis dependency:
//! characters are classified by script (kanji, hiragana, katakana, latin,
//! digit) and consecutive same-class characters merge into one token. This
//! trades recall for simplicity and determinism.

/// Question particles, copulas, and generic filler words that carry no
/// content. Single-character hiragana particles never survive the length
/// filter, so only multi-character forms are listed.
const STOPWORDS: &[&str] = &[
    "から", "まで", "より", "です", "ですか", "ください", "教えて",
    "これは", "それは", "あれは", "どんな", "どの", "どれ",
    "この", "その", "あの", "について",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CharClass {
    Kanji,
    Hiragana,
    Katakana,
    Latin,
    Digit,
    Other,
}

fn char_class(ch: char) -> CharClass {
    match ch {
        '一'..='龠' => CharClass::Kanji,
        'ぁ'..='ゖ' => CharClass::Hiragana,
        'ァ'..='ヺ' | 'ー' => CharClass::Katakana,
        _ if ch.is_ascii_alphabetic() => CharClass::Latin,
        _ if ch.is_numeric() => CharClass::Digit,
        _ => CharClass::Other,
    }
}

/// Merge consecutive same-class characters into tokens. Class boundaries
/// always split; punctuation and whitespace are discarded, never emitted.
fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut current_class = None;

    for ch in text.chars() {
        let class = char_class(ch);
        if class == CharClass::Other {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
                current_class = None;
            }
            continue;
        }

        if !current.is_empty() && Some(class) != current_class {
            tokens.push(std::mem::take(&mut current));
        }
        current.push(ch);
        current_class = Some(class);
    }

    if !current.is_empty() {
        tokens.push(current);
    }

    tokens
}

/// Extract content-bearing keywords from a query.
///
/// Tokens shorter than two characters or in the stopword set are dropped,
/// with one exception: a lone ideograph (e.g. 鍵) carries content on its
/// own and is kept. First-occurrence order is preserved and duplicates are
/// suppressed. Idempotent: extracting from the space-joined result yields
/// the same set.
pub fn extract_keywords(text: &str) -> Vec<String> {
    let mut keywords: Vec<String> = Vec::new();
    for token in tokenize(text) {
        if STOPWORDS.contains(&token.as_str()) {
            continue;
        }
        let char_count = token.chars().count();
        let single_kanji =
            char_count == 1 && token.chars().all(|c| char_class(c) == CharClass::Kanji);
        if char_count < 2 && !single_kanji {
            continue;
        }
        if !keywords.contains(&token) {
            keywords.push(token);
        }
    }
    keywords
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_boundaries_split_tokens() {
        assert_eq!(tokenize("鍵の番号"), vec!["鍵", "の", "番号"]);
        assert_eq!(tokenize("GPUサーバ4台"), vec!["GPU", "サーバ", "4", "台"]);
    }

    #[test]
    fn test_punctuation_never_becomes_a_token() {
        let tokens = tokenize("鍵の番号は？ (重要)");
        assert!(tokens.iter().all(|t| !t.contains('？')));
        assert!(tokens.iter().all(|t| !t.contains('(')));
        assert!(tokens.iter().all(|t| !t.contains(' ')));
    }

    #[test]
    fn test_key_number_question() {
        let keywords = extract_keywords("鍵の番号は？");
        assert!(keywords.contains(&"鍵".to_string()));
        assert!(keywords.contains(&"番号".to_string()));
        // The particles は and の are gone.
        assert!(!keywords.contains(&"は".to_string()));
        assert!(!keywords.contains(&"の".to_string()));
    }

    #[test]
    fn test_stopwords_dropped() {
        let keywords = extract_keywords("研究テーマについて教えてください");
        assert!(keywords.contains(&"研究".to_string()));
        assert!(keywords.contains(&"テーマ".to_string()));
        assert!(!keywords.contains(&"について".to_string()));
        assert!(!keywords.contains(&"教えて".to_string()));
        assert!(!keywords.contains(&"ください".to_string()));
    }

    #[test]
    fn test_order_preserved_duplicates_suppressed() {
        let keywords = extract_keywords("サーバの予約とサーバの管理");
        assert_eq!(keywords.iter().filter(|k| k.as_str() == "サーバ").count(), 1);
        let server = keywords.iter().position(|k| k == "サーバ").unwrap();
        let reservation = keywords.iter().position(|k| k == "予約").unwrap();
        assert!(server < reservation);
    }

    #[test]
    fn test_extraction_is_idempotent() {
        let first = extract_keywords("ミーティングのスケジュールはどこですか");
        let second = extract_keywords(&first.join(" "));
        assert_eq!(first, second);
    }

    #[test]
    fn test_short_latin_tokens_dropped() {
        assert!(extract_keywords("a b c").is_empty());
    }
}
