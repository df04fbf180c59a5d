//! Splitting a streamed markdown outline into topics.

/// Split outline text into topic items, each starting with `# `.
///
/// Tries, in order: top-level `# ` headers, indented `# ` headers, and
/// finally blank-line separated paragraphs. Text before the first header is
/// model chatter and is dropped.
pub fn parse_outline(text: &str) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    let items = split_on_headers(text, |line| line.strip_prefix("# "));
    if !items.is_empty() {
        return items;
    }

    let items = split_on_headers(text, |line| line.trim_start().strip_prefix("# "));
    if !items.is_empty() {
        return items;
    }

    split_paragraphs(text)
}

fn split_on_headers<'a>(text: &'a str, header: impl Fn(&'a str) -> Option<&'a str>) -> Vec<String> {
    let mut items = Vec::new();
    let mut current: Option<String> = None;

    for line in text.lines() {
        if let Some(title) = header(line) {
            if let Some(done) = current.take() {
                items.push(done.trim_end().to_string());
            }
            current = Some(format!("# {}", title.trim()));
        } else if let Some(section) = current.as_mut() {
            if !line.trim().is_empty() {
                section.push('\n');
                section.push_str(line.trim_end());
            }
        }
    }
    if let Some(done) = current {
        items.push(done.trim_end().to_string());
    }

    items.retain(|item| item.trim() != "#");
    items
}

fn split_paragraphs(text: &str) -> Vec<String> {
    let mut items = Vec::new();
    let mut paragraph: Vec<&str> = Vec::new();

    let mut flush = |paragraph: &mut Vec<&str>| {
        if let Some(first) = paragraph.first() {
            let first = first.trim();
            if first.starts_with('#') {
                items.push(paragraph.iter().map(|l| l.trim()).collect::<Vec<_>>().join("\n"));
            } else {
                items.push(format!("# {first}"));
            }
        }
        paragraph.clear();
    };

    for line in text.lines() {
        if line.trim().is_empty() {
            flush(&mut paragraph);
        } else {
            paragraph.push(line);
        }
    }
    flush(&mut paragraph);
    items
}

/// Bare topic titles: first line of each item without the `#` marker.
pub fn outline_titles(items: &[String]) -> Vec<String> {
    items
        .iter()
        .filter_map(|item| item.lines().next())
        .map(|line| line.trim_start_matches('#').trim().to_string())
        .filter(|title| !title.is_empty())
        .collect()
}

/// Bullet lines under a topic, without the `- ` marker.
pub fn outline_points(item: &str) -> Vec<String> {
    item.lines()
        .skip(1)
        .map(str::trim)
        .filter_map(|line| line.strip_prefix("- ").or_else(|| line.strip_prefix("* ")))
        .map(|point| point.trim().to_string())
        .filter(|point| !point.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markdown_headers() {
        let text = "Here you go:\n\n# Intro\n- What it is\n- Why now\n\n# Details\n- How\n";
        let items = parse_outline(text);
        assert_eq!(
            items,
            vec![
                "# Intro\n- What it is\n- Why now".to_string(),
                "# Details\n- How".to_string(),
            ]
        );
        assert_eq!(outline_titles(&items), vec!["Intro", "Details"]);
        assert_eq!(outline_points(&items[0]), vec!["What it is", "Why now"]);
    }

    #[test]
    fn test_partial_stream() {
        assert_eq!(parse_outline("# Int"), vec!["# Int".to_string()]);
        assert_eq!(parse_outline("# Intro\n- a\n# "), vec!["# Intro\n- a".to_string()]);
    }

    #[test]
    fn test_indented_headers() {
        let items = parse_outline("  # One\n  - a\n  # Two");
        assert_eq!(items, vec!["# One\n  - a".to_string(), "# Two".to_string()]);
    }

    #[test]
    fn test_paragraph_fallback() {
        let items = parse_outline("First topic\nmore\n\nSecond topic\n\n\n## Third\n- x");
        assert_eq!(
            items,
            vec![
                "# First topic".to_string(),
                "# Second topic".to_string(),
                "## Third\n- x".to_string(),
            ]
        );
    }

    #[test]
    fn test_preamble_is_not_a_topic() {
        let items = parse_outline("Here you go:\n\n# Intro\n- a\n# Details");
        assert_eq!(items, vec!["# Intro\n- a".to_string(), "# Details".to_string()]);
    }

    #[test]
    fn test_headerless_paragraphs_are_separate_topics() {
        let items = parse_outline("First topic\nmore\n\nSecond topic");
        assert_eq!(
            items,
            vec!["# First topic".to_string(), "# Second topic".to_string()]
        );
    }

    #[test]
    fn test_empty_input() {
        assert!(parse_outline("").is_empty());
        assert!(parse_outline(" \n\n ").is_empty());
    }
}
