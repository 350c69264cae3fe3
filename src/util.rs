//! Name helpers shared by component lookup and warnings.

/// `todo-item` → `todoItem`
pub fn camelize(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut upper = false;
    for c in s.chars() {
        if c == '-' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// `todoItem` → `TodoItem`
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `todoItem` → `todo-item`
pub fn hyphenate(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 4);
    for (i, c) in s.chars().enumerate() {
        if c.is_ascii_uppercase() {
            if i > 0 {
                out.push('-');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// `todo-item` / `todo_item` → `TodoItem`
pub fn classify(s: &str) -> String {
    s.split(['-', '_'])
        .filter(|part| !part.is_empty())
        .map(capitalize)
        .collect()
}

/// Keys starting with `$` or `_` belong to the instance itself and are never
/// proxied from data.
pub fn is_reserved(key: &str) -> bool {
    key.starts_with('$') || key.starts_with('_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camelize() {
        assert_eq!(camelize("todo-item"), "todoItem");
        assert_eq!(camelize("plain"), "plain");
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("todoItem"), "TodoItem");
        assert_eq!(capitalize(""), "");
    }

    #[test]
    fn test_hyphenate() {
        assert_eq!(hyphenate("todoItem"), "todo-item");
        assert_eq!(hyphenate("TodoItem"), "todo-item");
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify("todo-item"), "TodoItem");
        assert_eq!(classify("my_widget"), "MyWidget");
        assert_eq!(classify("Counter"), "Counter");
    }

    #[test]
    fn test_is_reserved() {
        assert!(is_reserved("$attrs"));
        assert!(is_reserved("_private"));
        assert!(!is_reserved("count"));
    }
}
