pub mod dirs;

/// Normalize a company name into the URL-safe slug used as the retrieval
/// partition key: lower-cased, spaces collapsed to dashes.
pub fn slugify(name: &str) -> String {
    name.trim().to_lowercase().replace(' ', "-")
}

#[cfg(test)]
mod tests {
    use super::slugify;

    #[test]
    fn slugs_are_lowercase_and_dashed() {
        assert_eq!(slugify("Dipped Products"), "dipped-products");
        assert_eq!(slugify("  Richard Pieris "), "richard-pieris");
    }
}
