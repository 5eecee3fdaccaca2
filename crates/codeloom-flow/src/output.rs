/// Strip a surrounding markdown code fence from generated text.
///
/// Models frequently wrap code in ```lang fences despite being asked not
/// to; downstream consumers want the bare artifact.
pub fn strip_code_fences(text: &str) -> String {
    let trimmed = text.trim();

    if let Some(rest) = trimmed.strip_prefix("```") {
        // Drop an optional language tag on the opening line
        let body = match rest.find('\n') {
            Some(i) => &rest[i + 1..],
            None => rest,
        };
        if let Some(end) = body.rfind("```") {
            return body[..end].trim().to_string();
        }
    }

    trimmed.to_string()
}
