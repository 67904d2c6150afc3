use regex::Regex;
use std::sync::LazyLock;

macro_rules! regex {
    ($name:ident, $regex:expr) => {
        pub(crate) static $name: LazyLock<Regex> = LazyLock::new(|| Regex::new($regex).unwrap());
    };
}

// A whole path segment of the form `{name}`.
regex!(PLACEHOLDER_REGEX, r"^\{\s*([^{}]*?)\s*\}$");
