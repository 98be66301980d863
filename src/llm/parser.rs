//! Response cleanup for LLM output.

/// Strips a markdown code fence from an LLM response, returning the bare
/// SQL text.
///
/// Handles a leading ```` ```sql ```` or bare ```` ``` ```` fence and a
/// trailing ```` ``` ````, then trims surrounding whitespace. Responses
/// without fences pass through trimmed but otherwise unchanged, including
/// prose that is not SQL at all.
pub fn strip_sql_fence(response: &str) -> String {
    let mut text = response.trim();

    if let Some(rest) = text.strip_prefix("```sql") {
        text = rest;
    } else if let Some(rest) = text.strip_prefix("```") {
        text = rest;
    }

    if let Some(rest) = text.strip_suffix("```") {
        text = rest;
    }

    text.trim().to_string()
}
