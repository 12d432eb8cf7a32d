//! Phonetic folding for full-text fields.
//!
//! Tokens of a field configured with a phonetic matcher also emit a sound key,
//! so `smith` and `smyth` meet on the same posting list. The key is a
//! four-character Soundex code.
//!
//! The accepted matcher codes (`dm:en`, `dm:fr`, `dm:pt`, `dm:es`) are aliases:
//! none of them runs Double Metaphone, and all four produce the same Soundex
//! key regardless of the language they name.

/// Prefix that keeps sound keys apart from ordinary tokens
pub const PHONETIC_PREFIX: char = '~';

fn digit(c: char) -> Option<u8> {
    match c {
        'b' | 'f' | 'p' | 'v' => Some(b'1'),
        'c' | 'g' | 'j' | 'k' | 'q' | 's' | 'x' | 'z' => Some(b'2'),
        'd' | 't' => Some(b'3'),
        'l' => Some(b'4'),
        'm' | 'n' => Some(b'5'),
        'r' => Some(b'6'),
        _ => None,
    }
}

/// Soundex code of a token, `None` when it has no ASCII letter.
pub fn soundex(token: &str) -> Option<String> {
    let mut letters = token
        .chars()
        .filter(|c| c.is_ascii_alphabetic())
        .map(|c| c.to_ascii_lowercase());

    let first = letters.next()?;
    let mut code = String::with_capacity(4);
    code.push(first.to_ascii_uppercase());

    let mut last = digit(first);
    for c in letters {
        if code.len() == 4 {
            break;
        }
        match digit(c) {
            Some(d) if Some(d) != last => {
                code.push(d as char);
                last = Some(d);
            }
            Some(_) => {}
            // h and w do not separate equal codes, vowels do
            None if c == 'h' || c == 'w' => {}
            None => last = None,
        }
    }
    while code.len() < 4 {
        code.push('0');
    }
    Some(code)
}

/// Posting-list token for a sound key
pub fn phonetic_token(token: &str) -> Option<String> {
    soundex(token).map(|code| format!("{PHONETIC_PREFIX}{code}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_soundex_classic_codes() {
        assert_eq!(soundex("robert").as_deref(), Some("R163"));
        assert_eq!(soundex("rupert").as_deref(), Some("R163"));
        assert_eq!(soundex("tymczak").as_deref(), Some("T522"));
        assert_eq!(soundex("pfister").as_deref(), Some("P236"));
        assert_eq!(soundex("ashcraft").as_deref(), Some("A261"));
        assert_eq!(soundex("lee").as_deref(), Some("L000"));
    }

    #[test]
    fn test_similar_names_share_a_key() {
        assert_eq!(soundex("smith"), soundex("smyth"));
        assert_ne!(soundex("smith"), soundex("jones"));
    }

    #[test]
    fn test_non_ascii_token() {
        assert!(soundex("123").is_none());
        assert_eq!(phonetic_token("smith").as_deref(), Some("~S530"));
    }
}
