use notion_mirror_api::RichText;

/// Flatten a rich-text sequence to plain text.
///
/// Every run is followed by a single space, so `["Hello", "world"]` becomes
/// `"Hello world "`. An empty sequence yields an empty string.
pub fn rich_text_to_string(spans: &[RichText]) -> String {
    let mut result = String::new();
    for span in spans {
        result.push_str(&span.plain_text);
        result.push(' ');
    }
    result
}
