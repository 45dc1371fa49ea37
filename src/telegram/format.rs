//! Text helpers for outgoing messages.

/// Characters MarkdownV2 requires to be escaped outside of entities.
const MARKDOWN_V2_SPECIALS: &[char] = &[
    '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!',
];

/// Escapes text for use inside a MarkdownV2 message.
#[must_use]
pub fn escape_markdown_v2(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len() + text.len() / 8);
    for ch in text.chars() {
        if MARKDOWN_V2_SPECIALS.contains(&ch) {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// Splits text into chunks of at most `limit` characters.
///
/// Cuts happen at line boundaries; a single line longer than `limit` is cut
/// on character boundaries. Empty input yields no chunks.
#[must_use]
pub fn split_message(text: &str, limit: usize) -> Vec<String> {
    let limit = limit.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for line in text.split('\n') {
        let line_len = line.chars().count();
        let needed = if current.is_empty() { line_len } else { line_len + 1 };

        if current_len + needed <= limit {
            if !current.is_empty() {
                current.push('\n');
            }
            current.push_str(line);
            current_len += needed;
            continue;
        }

        if !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }

        if line_len <= limit {
            current.push_str(line);
            current_len = line_len;
        } else {
            let chars: Vec<char> = line.chars().collect();
            let mut pieces = chars.chunks(limit).map(|c| c.iter().collect::<String>()).peekable();
            while let Some(piece) = pieces.next() {
                if pieces.peek().is_some() {
                    chunks.push(piece);
                } else {
                    current_len = piece.chars().count();
                    current = piece;
                }
            }
        }
    }

    if !current.trim().is_empty() {
        chunks.push(current);
    }
    chunks.retain(|c| !c.trim().is_empty());
    chunks
}

/// Truncates a string for logging purposes.
pub(crate) fn truncate_for_log(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_owned()
    } else {
        format!("{}...", s.chars().take(max_len).collect::<String>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_markdown_v2() {
        assert_eq!(escape_markdown_v2("Цена: 1.500!"), "Цена: 1\\.500\\!");
        assert_eq!(escape_markdown_v2("a_b*c"), "a\\_b\\*c");
        assert_eq!(escape_markdown_v2("(x) [y] {z}"), "\\(x\\) \\[y\\] \\{z\\}");
        assert_eq!(escape_markdown_v2(""), "");
    }

    #[test]
    fn test_escape_leaves_plain_text() {
        assert_eq!(escape_markdown_v2("Привет мир"), "Привет мир");
    }

    #[test]
    fn test_split_short_text_is_single_chunk() {
        assert_eq!(split_message("one\ntwo", 100), vec!["one\ntwo".to_owned()]);
    }

    #[test]
    fn test_split_at_line_boundaries() {
        let text = "aaaa\nbbbb\ncccc";
        assert_eq!(split_message(text, 9), vec!["aaaa\nbbbb", "cccc"]);
    }

    #[test]
    fn test_split_long_line_on_chars() {
        let text = "абвгдеж";
        assert_eq!(split_message(text, 3), vec!["абв", "где", "ж"]);
    }

    #[test]
    fn test_split_never_exceeds_limit() {
        let text = "строка\n".repeat(500);
        for chunk in split_message(&text, 100) {
            assert!(chunk.chars().count() <= 100);
        }
    }

    #[test]
    fn test_split_empty() {
        assert!(split_message("", 10).is_empty());
        assert!(split_message("\n\n", 10).is_empty());
    }

    #[test]
    fn test_truncate_for_log() {
        assert_eq!(truncate_for_log("Hello", 10), "Hello");
        assert_eq!(truncate_for_log("Hello, World!", 5), "Hello...");
    }
}
