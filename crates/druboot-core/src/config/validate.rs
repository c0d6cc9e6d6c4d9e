//! Field validators shared by the prompts and the answers-file loader

use regex::Regex;
use std::net::IpAddr;
use std::sync::LazyLock;
use url::Url;

static MACHINE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z][a-z0-9]+$").expect("valid machine name pattern"));

/// `user@host:path`, the scp-like form git accepts for SSH remotes
static SCP_REMOTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._-]+@[A-Za-z0-9.-]+:[^\s]+$").expect("valid remote pattern")
});

/// Non-empty free text
pub fn required(input: &str) -> Result<(), String> {
    if input.trim().is_empty() {
        Err("This option is required".to_string())
    } else {
        Ok(())
    }
}

pub fn machine_name(input: &str) -> Result<(), String> {
    if MACHINE_NAME.is_match(input) {
        Ok(())
    } else {
        Err("Provide a valid machine name, please.".to_string())
    }
}

/// Empty, or a valid IPv4/IPv6 address
pub fn optional_ip(input: &str) -> Result<(), String> {
    if input.is_empty() || input.parse::<IpAddr>().is_ok() {
        Ok(())
    } else {
        Err("Please provide a valid IP address or none at all, please.".to_string())
    }
}

/// A URL, or an scp-like SSH remote such as `git@host:org/repo.git`
pub fn is_git_remote(input: &str) -> bool {
    Url::parse(input).is_ok() || SCP_REMOTE.is_match(input)
}

/// Empty, or a remote accepted by [`is_git_remote`]
pub fn optional_remote(input: &str) -> Result<(), String> {
    if input.is_empty() || is_git_remote(input) {
        Ok(())
    } else {
        Err("Please provide a valid repository URL.".to_string())
    }
}

/// Derive a machine name from a human name.
///
/// Lowercases ASCII letters and digits, drops everything else, then trims
/// leading digits so the result starts with a letter.
pub fn machine_name_from(human_name: &str) -> String {
    let slug: String = human_name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect();

    slug.trim_start_matches(|c: char| c.is_ascii_digit()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_machine_name_pattern() {
        assert!(machine_name("mysite").is_ok());
        assert!(machine_name("site2").is_ok());
        assert!(machine_name("m").is_err());
        assert!(machine_name("2site").is_err());
        assert!(machine_name("my-site").is_err());
        assert!(machine_name("MySite").is_err());
    }

    #[test]
    fn test_machine_name_from_human_name() {
        assert_eq!(machine_name_from("My Site"), "mysite");
        assert_eq!(machine_name_from("42 Bright Ideas!"), "brightideas");
        assert_eq!(machine_name_from("Café 2"), "caf2");
    }

    #[test]
    fn test_required() {
        assert!(required("x").is_ok());
        assert!(required("   ").is_err());
    }

    #[test]
    fn test_optional_ip() {
        assert!(optional_ip("").is_ok());
        assert!(optional_ip("10.0.0.2").is_ok());
        assert!(optional_ip("::1").is_ok());
        assert!(optional_ip("10.0.0").is_err());
    }

    #[test]
    fn test_optional_remote() {
        assert!(optional_remote("").is_ok());
        assert!(optional_remote("https://github.com/me/site.git").is_ok());
        assert!(optional_remote("git@github.com:me/site.git").is_ok());
        assert!(optional_remote("not a remote").is_err());
    }
}
