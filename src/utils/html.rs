// src/utils/html.rs

use ammonia;

/// Clean HTML content using the ammonia library.
///
/// Whitelist-based: safe tags (like <b>, <p>) survive, `<script>` and
/// `<iframe>` are dropped together with their content, event-handler
/// attributes are stripped. `&` and `<` in plain text come back escaped.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}
